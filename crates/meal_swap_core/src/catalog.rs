//! crates/meal_swap_core/src/catalog.rs
//!
//! Narrows a menu catalog to the items planned for one slot.

use crate::domain::{MenuItem, Slot};

/// Keeps the items whose slot is exactly `slot`, in input order.
/// Items without a slot never match.
pub fn filter_slot(catalog: &[MenuItem], slot: Slot) -> Vec<MenuItem> {
    catalog
        .iter()
        .filter(|item| item.slot == Some(slot))
        .cloned()
        .collect()
}
