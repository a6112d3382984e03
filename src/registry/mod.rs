//! Persisted gateway list storage
//!
//! The game keeps its gateway list as a multi-string registry value. A
//! [`GatewayStore`] reads and overwrites that value as a whole; the list
//! itself is never interpreted here.

mod reg_file;
mod wine;

pub use reg_file::{RegFile, RegValue};
pub use wine::{linux_path_to_wine, read_registry_value, wine_path_to_linux, WineRegistryStore};

use crate::error::StoreError;

/// Registry key (under HKEY_CURRENT_USER) holding Warcraft III settings
pub const WARCRAFT_KEY: &str = r"Software\Blizzard Entertainment\Warcraft III";

/// Multi-string value holding the gateway list
pub const GATEWAYS_VALUE: &str = "Battle.net Gateways";

/// String value the installer writes with the game directory
pub const INSTALL_PATH_VALUE: &str = "InstallPath";

/// Read-modify-write access to the persisted gateway list
pub trait GatewayStore {
    /// Fetch the flat slot list
    fn read_gateways(&self) -> Result<Vec<String>, StoreError>;

    /// Overwrite the flat slot list in one write
    fn write_gateways(&mut self, slots: &[String]) -> Result<(), StoreError>;

    /// Human readable location, for logs
    fn describe(&self) -> String;
}

/// In-memory store, used for dry runs and tests
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    slots: Option<Vec<String>>,
    writes: usize,
}

impl MemoryStore {
    pub fn new(slots: Vec<String>) -> Self {
        Self {
            slots: Some(slots),
            writes: 0,
        }
    }

    /// A store with no gateway value at all
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn slots(&self) -> Option<&[String]> {
        self.slots.as_deref()
    }

    /// Number of successful writes
    pub fn writes(&self) -> usize {
        self.writes
    }
}

impl GatewayStore for MemoryStore {
    fn read_gateways(&self) -> Result<Vec<String>, StoreError> {
        self.slots
            .clone()
            .ok_or_else(|| StoreError::ValueMissing(GATEWAYS_VALUE.to_string()))
    }

    fn write_gateways(&mut self, slots: &[String]) -> Result<(), StoreError> {
        self.slots = Some(slots.to_vec());
        self.writes += 1;
        Ok(())
    }

    fn describe(&self) -> String {
        "in-memory gateway list".to_string()
    }
}
