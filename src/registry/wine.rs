//! Wine prefix registry access
//!
//! Reads values from a prefix's system.reg/user.reg and persists the gateway
//! list into user.reg (HKEY_CURRENT_USER).

use std::fs;
use std::path::{Path, PathBuf};

use crate::error::StoreError;
use crate::logging::{log_registry, log_warning};

use super::reg_file::{RegFile, RegValue};
use super::{GatewayStore, GATEWAYS_VALUE, WARCRAFT_KEY};

/// Gateway list stored in a Wine prefix's user.reg
#[derive(Debug, Clone)]
pub struct WineRegistryStore {
    prefix: PathBuf,
}

impl WineRegistryStore {
    pub fn new(prefix: impl Into<PathBuf>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    pub fn prefix(&self) -> &Path {
        &self.prefix
    }

    pub fn user_reg(&self) -> PathBuf {
        self.prefix.join("user.reg")
    }

    fn load(&self) -> Result<RegFile, StoreError> {
        let path = self.user_reg();
        let content = fs::read_to_string(&path).map_err(|e| StoreError::io(&path, e))?;
        Ok(RegFile::from_string(content))
    }
}

impl GatewayStore for WineRegistryStore {
    fn read_gateways(&self) -> Result<Vec<String>, StoreError> {
        let hive = self.load()?;
        match hive.get(WARCRAFT_KEY, GATEWAYS_VALUE)? {
            RegValue::MultiStr(slots) => {
                log_registry(&format!(
                    "Read {} gateway slots from {}",
                    slots.len(),
                    self.user_reg().display()
                ));
                Ok(slots)
            }
            other => Err(StoreError::Undecodable {
                name: GATEWAYS_VALUE.to_string(),
                reason: format!("found {:?}", other),
            }),
        }
    }

    fn write_gateways(&mut self, slots: &[String]) -> Result<(), StoreError> {
        // Re-read so edits made since the last read are kept
        let mut hive = self.load()?;
        hive.set_multi_str(WARCRAFT_KEY, GATEWAYS_VALUE, slots)?;

        let path = self.user_reg();
        write_replacing(&path, hive.as_str()).map_err(|e| StoreError::io(&path, e))?;

        log_registry(&format!(
            "Wrote {} gateway slots to {}",
            slots.len(),
            path.display()
        ));
        Ok(())
    }

    fn describe(&self) -> String {
        format!("Wine registry {}", self.user_reg().display())
    }
}

/// Write to a sibling file, then rename it over `path`
fn write_replacing(path: &Path, content: &str) -> std::io::Result<()> {
    let tmp = path.with_extension("reg.w3lf-tmp");
    fs::write(&tmp, content)?;
    if let Ok(meta) = fs::metadata(path) {
        let _ = fs::set_permissions(&tmp, meta.permissions());
    }
    fs::rename(&tmp, path).inspect_err(|_| {
        let _ = fs::remove_file(&tmp);
    })
}

/// Read a registry value from a Wine prefix registry file
///
/// # Arguments
/// * `prefix_path` - Path to the Wine prefix (containing system.reg, user.reg)
/// * `key_path` - Registry key path (e.g., "Software\\Blizzard Entertainment\\Warcraft III")
/// * `value_name` - Name of the value to read (e.g., "InstallPath")
///
/// Returns the value as a string, or None if not found
pub fn read_registry_value(prefix_path: &Path, key_path: &str, value_name: &str) -> Option<String> {
    // user.reg first: the game records its own HKCU InstallPath
    for hive_name in ["user.reg", "system.reg"] {
        let Ok(content) = fs::read_to_string(prefix_path.join(hive_name)) else {
            continue;
        };
        let hive = RegFile::from_string(content);

        // Also try the Wow6432Node variant for 32-bit installers on 64-bit Wine
        let wow64_key = format!(
            "Software\\Wow6432Node\\{}",
            key_path.strip_prefix("Software\\").unwrap_or(key_path)
        );

        for key in [key_path, wow64_key.as_str()] {
            if let Ok(value) = hive.get(key, value_name) {
                if let Some(s) = value.as_string() {
                    return Some(s);
                }
            }
        }
    }

    None
}

/// Convert a Wine path (Z:\path\to\file, C:\Program Files\...) to a Linux path
///
/// `C:` and other drive letters are resolved through the prefix's
/// `drive_c` and `dosdevices` directories.
pub fn wine_path_to_linux(prefix: &Path, wine_path: &str) -> Option<PathBuf> {
    let path = wine_path.trim();
    let mut chars = path.chars();
    let drive = chars.next()?.to_ascii_lowercase();
    if chars.next() != Some(':') || !drive.is_ascii_alphabetic() {
        log_warning(&format!("Not a drive path: {}", path));
        return None;
    }

    let rest = path[2..].replace('\\', "/");
    let rest = rest.trim_start_matches('/');

    let root = match drive {
        'z' => PathBuf::from("/"),
        'c' => prefix.join("drive_c"),
        _ => prefix.join("dosdevices").join(format!("{}:", drive)),
    };

    if rest.is_empty() {
        Some(root)
    } else {
        Some(root.join(rest))
    }
}

/// Convert an absolute Linux path to the Z: drive path Wine exposes for it
pub fn linux_path_to_wine(path: &Path) -> String {
    format!("Z:{}", path.to_string_lossy().replace('/', "\\"))
}
