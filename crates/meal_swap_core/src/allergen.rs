//! crates/meal_swap_core/src/allergen.rs
//!
//! The allergen guard. Matching is a plain case-insensitive substring check of each
//! allergen token against an item's name, description and category. It over-excludes
//! ("nut" drops "Coconut Curry") and does not know synonyms ("dairy" does not drop
//! "Milkshake"); users must list the ingredient words they want excluded.

use std::ops::Deref;

use crate::domain::{AllergenSet, MenuItem};

/// Candidates that have passed the guard.
///
/// Only [`guard`] can build one, so anything ranked by the selector has been checked.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SafeCandidates(Vec<MenuItem>);

impl SafeCandidates {
    pub fn into_inner(self) -> Vec<MenuItem> {
        self.0
    }
}

impl Deref for SafeCandidates {
    type Target = [MenuItem];

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

/// Returns `false` when any allergen token occurs in the item's text fields.
pub fn is_safe(item: &MenuItem, allergens: &AllergenSet) -> bool {
    if allergens.is_empty() {
        return true;
    }

    let haystack = [
        Some(item.name.as_str()),
        item.description.as_deref(),
        item.category.as_deref(),
    ]
    .into_iter()
    .flatten()
    .collect::<Vec<_>>()
    .join(" ")
    .to_lowercase();

    !allergens.iter().any(|token| haystack.contains(token))
}

/// Drops unsafe items, preserving order.
pub fn guard(items: Vec<MenuItem>, allergens: &AllergenSet) -> SafeCandidates {
    let total = items.len();
    let safe: Vec<MenuItem> = items
        .into_iter()
        .filter(|item| is_safe(item, allergens))
        .collect();

    if safe.len() < total {
        tracing::debug!(
            excluded = total - safe.len(),
            remaining = safe.len(),
            "allergen guard excluded menu items"
        );
    }
    SafeCandidates(safe)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::NutrientProfile;
    use uuid::Uuid;

    fn item(name: &str, description: Option<&str>, category: Option<&str>) -> MenuItem {
        MenuItem {
            id: Uuid::new_v4(),
            name: name.to_string(),
            description: description.map(str::to_string),
            category: category.map(str::to_string),
            nutrients: NutrientProfile::default(),
            slot: None,
        }
    }

    #[test]
    fn peanut_noodles_are_dropped() {
        let allergens = AllergenSet::from_names(["peanut"]);
        let items = vec![
            item("Peanut Noodles", Some("with peanut sauce"), None),
            item("Rice Bowl", None, None),
        ];

        let safe = guard(items, &allergens);
        let names: Vec<_> = safe.iter().map(|i| i.name.as_str()).collect();
        assert_eq!(names, vec!["Rice Bowl"]);
    }

    #[test]
    fn matches_description_and_category_case_insensitively() {
        let allergens = AllergenSet::from_names(["SHRIMP", "Dairy"]);
        assert!(!is_safe(
            &item("House Special", Some("Fried rice with Shrimp"), None),
            &allergens
        ));
        assert!(!is_safe(&item("Latte", None, Some("dairy drinks")), &allergens));
        assert!(is_safe(&item("Green Tea", None, Some("drinks")), &allergens));
    }

    #[test]
    fn substring_matching_over_excludes() {
        let allergens = AllergenSet::from_names(["nut"]);
        assert!(!is_safe(&item("Coconut Curry", None, None), &allergens));
    }

    #[test]
    fn empty_allergen_set_keeps_everything() {
        let items = vec![item("A", None, None), item("B", None, None)];
        assert_eq!(guard(items, &AllergenSet::default()).len(), 2);
    }
}
