//! Diff classification: turns two inventories into queued actions.

use bucketsync_protocol::{Action, ActionKind, ResourceLocator};

use crate::inventory::Inventory;

/// Work derived from one comparison of source and destination.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Plan {
    pub actions: Vec<Action>,
    /// Sum of the sizes of every copy and verify action.
    pub estimated_bytes: u64,
    /// Every key looked at: all source keys plus destination-only keys.
    pub considered: u64,
}

impl Plan {
    pub fn count(&self, kind: ActionKind) -> usize {
        self.actions.iter().filter(|a| a.kind == kind).count()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }
}

/// Compares the inventories; the source is ground truth.
///
/// Source keys missing from the destination, or present with another size,
/// are copied. Equal sizes are skipped unless `check_content_hash` is set,
/// in which case differing known checksums force a copy and everything
/// else is verified against whichever checksum is known. Destination keys
/// missing from the source are removed.
pub fn classify(
    source_inventory: &Inventory,
    destination_inventory: &Inventory,
    source: &ResourceLocator,
    destination: &ResourceLocator,
    check_content_hash: bool,
) -> Plan {
    let mut plan = Plan::default();

    for (key, src) in source_inventory {
        plan.considered += 1;
        let from = source.with_path(src.name.clone());
        let to = destination.with_path(key.clone());

        let action = match destination_inventory.get(key) {
            None => Action::copy(from, to, src.size),
            Some(dst) if dst.size != src.size => Action::copy(from, to, src.size),
            Some(_) if !check_content_hash => continue,
            Some(dst)
                if !src.checksum.is_empty()
                    && !dst.checksum.is_empty()
                    && src.checksum != dst.checksum =>
            {
                Action::copy(from, to, src.size)
            }
            Some(dst) => {
                let expected = if src.checksum.is_empty() {
                    &dst.checksum
                } else {
                    &src.checksum
                };
                Action::verify(from, to, src.size, expected.clone())
            }
        };

        plan.estimated_bytes += action.size;
        plan.actions.push(action);
    }

    for (key, dst) in destination_inventory {
        if source_inventory.contains_key(key) {
            continue;
        }
        plan.considered += 1;
        plan.actions
            .push(Action::remove(destination.with_path(dst.name.clone())));
    }

    plan
}
