//! Known gateway definitions
//!
//! The catalog is the set of gateways the launcher keeps present in the
//! game's gateway list: a direct connection and a proxied (local GProxy) one.

use serde::{Deserialize, Serialize};

/// Zone code shared by the built-in gateways
pub const EUROBATTLE_ZONE: i32 = 8;

/// Which role a catalog entry plays when choosing the default gateway
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GatewayKind {
    Direct,
    Proxied,
}

/// A gateway the launcher knows about
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GatewayDefinition {
    /// Server hostname (compared case-insensitively)
    pub hostname: String,
    /// Time-zone/region code as the game client stores it
    pub zone: i32,
    /// Display label (compared case-sensitively)
    pub name: String,
}

impl GatewayDefinition {
    pub fn new(hostname: impl Into<String>, zone: i32, name: impl Into<String>) -> Self {
        Self {
            hostname: hostname.into(),
            zone,
            name: name.into(),
        }
    }

    /// Zone formatted the way it is stored in the gateway list
    pub fn zone_string(&self) -> String {
        self.zone.to_string()
    }
}

/// The fixed pair of gateways merged into the game's list
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GatewayCatalog {
    pub direct: GatewayDefinition,
    pub proxied: GatewayDefinition,
}

impl Default for GatewayCatalog {
    fn default() -> Self {
        Self::eurobattle()
    }
}

impl GatewayCatalog {
    pub fn new(direct: GatewayDefinition, proxied: GatewayDefinition) -> Self {
        Self { direct, proxied }
    }

    /// The Eurobattle.Net gateways: the realm itself and a GProxy on loopback
    pub fn eurobattle() -> Self {
        Self {
            direct: GatewayDefinition::new("server.eurobattle.net", EUROBATTLE_ZONE, "Eurobattle.Net"),
            proxied: GatewayDefinition::new("localhost", EUROBATTLE_ZONE, "Eurobattle.Net GProxy"),
        }
    }

    /// Catalog entries in merge order (direct first)
    pub fn entries(&self) -> [(GatewayKind, &GatewayDefinition); 2] {
        [
            (GatewayKind::Direct, &self.direct),
            (GatewayKind::Proxied, &self.proxied),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn eurobattle_catalog_shares_zone() {
        let catalog = GatewayCatalog::eurobattle();
        assert_eq!(catalog.direct.zone, catalog.proxied.zone);
        assert_ne!(catalog.direct.hostname, catalog.proxied.hostname);
        assert_ne!(catalog.direct.name, catalog.proxied.name);
    }

    #[test]
    fn entries_are_direct_then_proxied() {
        let catalog = GatewayCatalog::default();
        let entries = catalog.entries();
        assert_eq!(entries[0].0, GatewayKind::Direct);
        assert_eq!(entries[0].1.hostname, "server.eurobattle.net");
        assert_eq!(entries[1].0, GatewayKind::Proxied);
        assert_eq!(entries[1].1.hostname, "localhost");
    }

    #[test]
    fn custom_catalog_keeps_roles() {
        let catalog = GatewayCatalog::new(
            GatewayDefinition::new("pvpgn.example.org", -1, "Example PvPGN"),
            GatewayDefinition::new("127.0.0.1", -1, "Example PvPGN (proxy)"),
        );
        let entries = catalog.entries();
        assert_eq!(entries[0], (GatewayKind::Direct, &catalog.direct));
        assert_eq!(entries[1].1.zone_string(), "-1");
    }
}
