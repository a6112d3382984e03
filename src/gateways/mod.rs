//! Battle.net gateway list handling
//!
//! - `catalog`: the gateways the launcher keeps in the game's list
//! - `list`: typed view over the flat multi-string the game persists
//! - `sync`: the merge that keeps both in agreement

mod catalog;
mod list;
mod sync;

pub use catalog::{GatewayCatalog, GatewayDefinition, GatewayKind, EUROBATTLE_ZONE};
pub use list::{GatewayEntry, GatewayList, HEADER_SLOTS, TRIPLET_LEN};
pub use sync::{synchronize, synchronize_slots, Synchronized};
