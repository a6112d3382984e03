//! Typed view of the game's flat gateway list
//!
//! The game stores its gateways as one multi-string value:
//! slot 0 is an opaque header, slot 1 the two-digit selected index,
//! followed by `(hostname, zone, name)` triplets.

use std::fmt;

use crate::error::GatewayFormatError;

use super::catalog::GatewayDefinition;

/// Number of header slots before the first triplet
pub const HEADER_SLOTS: usize = 2;

/// Strings per gateway entry
pub const TRIPLET_LEN: usize = 3;

/// One gateway triplet, kept exactly as the game wrote it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GatewayEntry {
    pub hostname: String,
    pub zone: String,
    pub name: String,
}

impl GatewayEntry {
    pub fn new(
        hostname: impl Into<String>,
        zone: impl Into<String>,
        name: impl Into<String>,
    ) -> Self {
        Self {
            hostname: hostname.into(),
            zone: zone.into(),
            name: name.into(),
        }
    }

    /// Whether this entry refers to the given catalog gateway.
    ///
    /// Hostnames compare case-insensitively, names exactly.
    pub fn matches(&self, def: &GatewayDefinition) -> bool {
        self.hostname.eq_ignore_ascii_case(&def.hostname) || self.name == def.name
    }
}

impl From<&GatewayDefinition> for GatewayEntry {
    fn from(def: &GatewayDefinition) -> Self {
        Self::new(def.hostname.clone(), def.zone_string(), def.name.clone())
    }
}

impl fmt::Display for GatewayEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (zone {}) - {}", self.hostname, self.zone, self.name)
    }
}

/// The whole gateway list: header slots plus ordered entries
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GatewayList {
    header: String,
    selector: String,
    pub(crate) entries: Vec<GatewayEntry>,
}

impl GatewayList {
    /// Parse the flat slot form. Rejects anything not shaped `2 + 3*N`.
    pub fn from_slots(slots: Vec<String>) -> Result<Self, GatewayFormatError> {
        let count = slots.len();
        if count < HEADER_SLOTS || (count - HEADER_SLOTS) % TRIPLET_LEN != 0 {
            return Err(GatewayFormatError::SlotCount { slots: count });
        }

        let mut iter = slots.into_iter();
        let header = iter.next().unwrap_or_default();
        let selector = iter.next().unwrap_or_default();

        let mut entries = Vec::with_capacity((count - HEADER_SLOTS) / TRIPLET_LEN);
        while let (Some(hostname), Some(zone), Some(name)) = (iter.next(), iter.next(), iter.next()) {
            entries.push(GatewayEntry { hostname, zone, name });
        }

        Ok(Self {
            header,
            selector,
            entries,
        })
    }

    /// Flatten back into the slot form the game reads
    pub fn into_slots(self) -> Vec<String> {
        let mut slots = Vec::with_capacity(HEADER_SLOTS + self.entries.len() * TRIPLET_LEN);
        slots.push(self.header);
        slots.push(self.selector);
        for entry in self.entries {
            slots.push(entry.hostname);
            slots.push(entry.zone);
            slots.push(entry.name);
        }
        slots
    }

    pub fn to_slots(&self) -> Vec<String> {
        self.clone().into_slots()
    }

    /// Opaque slot 0
    pub fn header(&self) -> &str {
        &self.header
    }

    /// Raw slot 1
    pub fn selector(&self) -> &str {
        &self.selector
    }

    /// Slot 1 parsed as a triplet index, if it is numeric
    pub fn selected_index(&self) -> Option<usize> {
        self.selector.trim().parse().ok()
    }

    pub(crate) fn set_selector(&mut self, selector: String) {
        self.selector = selector;
    }

    pub fn entries(&self) -> &[GatewayEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of flat slots this list serializes to
    pub fn slot_count(&self) -> usize {
        HEADER_SLOTS + self.entries.len() * TRIPLET_LEN
    }
}
