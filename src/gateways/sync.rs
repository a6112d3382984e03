//! Merging the catalog into the game's gateway list

use crate::error::GatewayFormatError;
use crate::logging::{log_registry, log_warning};

use super::catalog::{GatewayCatalog, GatewayDefinition, GatewayKind};
use super::list::{GatewayEntry, GatewayList};

/// Largest index the two-character selector slot can hold
const MAX_SELECTOR: usize = 99;

/// Result of a synchronization pass
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Synchronized {
    pub list: GatewayList,
    /// Triplet index of the gateway chosen as default
    pub selected_index: usize,
    /// Whether slot 1 was rewritten
    pub selector_written: bool,
    /// Catalog entries added as new triplets
    pub appended: usize,
    /// Existing triplets whose fields were corrected
    pub reconciled: usize,
}

/// Merge `catalog` into `list` and recompute the selected gateway.
///
/// Each catalog gateway claims the first unclaimed triplet that matches it
/// (hostname ignoring case, or exact name) and has its zone and name corrected
/// in place; gateways without a match are appended. Unrelated triplets and
/// slot 0 are never touched.
pub fn synchronize(mut list: GatewayList, catalog: &GatewayCatalog, prefer_proxy: bool) -> Synchronized {
    let mut claimed: Vec<usize> = Vec::with_capacity(2);
    let mut direct = 0;
    let mut proxied = 0;
    let mut appended = 0;
    let mut reconciled = 0;

    for (kind, def) in catalog.entries() {
        let found = list
            .entries
            .iter()
            .enumerate()
            .position(|(index, entry)| !claimed.contains(&index) && entry.matches(def));

        let position = match found {
            Some(index) => {
                if reconcile(&mut list.entries[index], def) {
                    reconciled += 1;
                    log_registry(&format!("Updated gateway #{} to {}", index, def.name));
                }
                index
            }
            None => {
                list.entries.push(GatewayEntry::from(def));
                appended += 1;
                let index = list.entries.len() - 1;
                log_registry(&format!("Added gateway #{}: {} ({})", index, def.name, def.hostname));
                index
            }
        };

        claimed.push(position);
        match kind {
            GatewayKind::Direct => direct = position,
            GatewayKind::Proxied => proxied = position,
        }
    }

    let selected_index = if prefer_proxy { proxied } else { direct };
    let selector_written = selected_index < list.len() && selected_index <= MAX_SELECTOR;
    if selector_written {
        list.set_selector(format!("{:02}", selected_index));
    } else {
        log_warning(&format!(
            "Selected gateway #{} does not fit the list of {}, leaving selector at {:?}",
            selected_index,
            list.len(),
            list.selector()
        ));
    }

    Synchronized {
        list,
        selected_index,
        selector_written,
        appended,
        reconciled,
    }
}

/// Same as [`synchronize`] on the flat slot form
pub fn synchronize_slots(
    slots: Vec<String>,
    catalog: &GatewayCatalog,
    prefer_proxy: bool,
) -> Result<(Vec<String>, usize), GatewayFormatError> {
    let list = GatewayList::from_slots(slots)?;
    let synced = synchronize(list, catalog, prefer_proxy);
    Ok((synced.list.into_slots(), synced.selected_index))
}

fn reconcile(entry: &mut GatewayEntry, def: &GatewayDefinition) -> bool {
    let mut changed = false;

    // Hostname is only normalized when it differs in case
    if entry.hostname != def.hostname && entry.hostname.eq_ignore_ascii_case(&def.hostname) {
        entry.hostname = def.hostname.clone();
        changed = true;
    }

    let zone = def.zone_string();
    if entry.zone != zone {
        entry.zone = zone;
        changed = true;
    }

    if entry.name != def.name {
        entry.name = def.name.clone();
        changed = true;
    }

    changed
}
