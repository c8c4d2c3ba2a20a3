//! crates/meal_swap_core/src/selector.rs
//!
//! Picks the top-ranked safe candidates and explains each swap against the
//! analysed meal.

use std::collections::HashSet;

use crate::allergen::SafeCandidates;
use crate::domain::{Goal, MealEstimate, MenuItem, Nutrient, SwapSuggestion};
use crate::scoring::{self, Emphasis};

pub const DEFAULT_SWAP_COUNT: usize = 3;

/// Stands in for the swapped-out food when nothing was detected in the photo.
pub const UNDETECTED_MEAL_LABEL: &str = "your meal";

/// Returns at most `k` suggestions, one per distinct candidate name, best first.
///
/// Ties keep catalog order. Fewer than `k` safe candidates yields a shorter list.
pub fn select(
    estimate: &MealEstimate,
    candidates: &SafeCandidates,
    goal: Goal,
    k: usize,
) -> Vec<SwapSuggestion> {
    if candidates.is_empty() || k == 0 {
        return Vec::new();
    }

    let mut ranked: Vec<(&MenuItem, f64)> = candidates
        .iter()
        .filter(|item| !item.name.trim().is_empty())
        .map(|item| (item, scoring::score(item, goal)))
        .collect();
    // `sort_by` is stable, so equal scores stay in catalog order.
    ranked.sort_by(|a, b| b.1.total_cmp(&a.1));

    let from_item = estimate
        .detected_items
        .first()
        .map(String::as_str)
        .unwrap_or(UNDETECTED_MEAL_LABEL);

    let mut seen = HashSet::new();
    ranked
        .into_iter()
        .filter(|(item, _)| seen.insert(item.name.trim().to_lowercase()))
        .take(k)
        .map(|(item, _)| suggest(from_item, item, estimate, goal))
        .collect()
}

fn suggest(from_item: &str, item: &MenuItem, estimate: &MealEstimate, goal: Goal) -> SwapSuggestion {
    let (reason, nutritional_benefit) = match scoring::emphasis(goal) {
        Emphasis::Lower(nutrient) => explain_shift(from_item, item, estimate, goal, nutrient, false),
        Emphasis::Higher(nutrient) => explain_shift(from_item, item, estimate, goal, nutrient, true),
        Emphasis::EvenMacros => explain_balance(from_item, item, estimate, goal),
    };

    SwapSuggestion {
        from_item: from_item.to_string(),
        to_item: item.name.clone(),
        reason,
        nutritional_benefit,
    }
}

fn explain_shift(
    from_item: &str,
    item: &MenuItem,
    estimate: &MealEstimate,
    goal: Goal,
    nutrient: Nutrient,
    higher_is_better: bool,
) -> (String, String) {
    let candidate = item.nutrients.value(nutrient);
    let meal = estimate.nutrients.value(nutrient);
    let delta = candidate - meal;
    let unit = nutrient.unit();
    let label = nutrient.label();

    let improves = if higher_is_better { delta > 0.0 } else { delta < 0.0 };
    let direction = if delta < 0.0 { "less" } else { "more" };
    let reason = if improves {
        format!(
            "{} has {:.0} {} {} {} than {}, supporting your {} goal.",
            item.name,
            delta.abs(),
            unit,
            direction,
            label,
            from_item,
            goal.label()
        )
    } else {
        format!(
            "{} is the best match on today's menu for your {} goal.",
            item.name,
            goal.label()
        )
    };

    let mut benefit = format!(
        "{:+.0} {} {} ({:.0} vs. {:.0} {})",
        delta, unit, label, candidate, meal, unit
    );
    if nutrient != Nutrient::Calories {
        let calorie_delta =
            item.nutrients.value(Nutrient::Calories) - estimate.nutrients.value(Nutrient::Calories);
        benefit.push_str(&format!(", {:+.0} kcal", calorie_delta));
    }
    (reason, benefit)
}

fn explain_balance(
    from_item: &str,
    item: &MenuItem,
    estimate: &MealEstimate,
    goal: Goal,
) -> (String, String) {
    let candidate = &item.nutrients;
    let meal = &estimate.nutrients;

    let candidate_imbalance = scoring::macro_imbalance(
        candidate.value(Nutrient::Protein),
        candidate.value(Nutrient::Carbs),
        candidate.value(Nutrient::Fats),
    );
    let meal_imbalance = scoring::macro_imbalance(meal.protein_g, meal.carbs_g, meal.fats_g);

    let reason = if candidate_imbalance < meal_imbalance {
        format!(
            "{} has a more even protein/carbs/fats balance than {}, supporting your {} goal.",
            item.name,
            from_item,
            goal.label()
        )
    } else {
        format!(
            "{} is the best match on today's menu for your {} goal.",
            item.name,
            goal.label()
        )
    };

    let candidate_split = split_text(
        candidate.value(Nutrient::Protein),
        candidate.value(Nutrient::Carbs),
        candidate.value(Nutrient::Fats),
    );
    let meal_split = split_text(meal.protein_g, meal.carbs_g, meal.fats_g);
    let calorie_delta = candidate.value(Nutrient::Calories) - meal.calories;
    let benefit = format!(
        "protein/carbs/fats energy split {} vs. {} in your meal, {:+.0} kcal",
        candidate_split, meal_split, calorie_delta
    );
    (reason, benefit)
}

fn split_text(protein: f64, carbs: f64, fats: f64) -> String {
    match scoring::macro_split(protein, carbs, fats) {
        Some([p, c, f]) => format!("{:.0}/{:.0}/{:.0}%", p * 100.0, c * 100.0, f * 100.0),
        None => "unknown".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::allergen::guard;
    use crate::domain::{AllergenSet, NutrientProfile, Nutrients};
    use uuid::Uuid;

    fn item(name: &str, calories: f64, protein: f64, fiber: f64) -> MenuItem {
        MenuItem {
            id: Uuid::new_v4(),
            name: name.to_string(),
            description: None,
            category: None,
            nutrients: NutrientProfile {
                calories: Some(calories),
                protein_g: Some(protein),
                carbs_g: None,
                fats_g: None,
                fiber_g: Some(fiber),
            },
            slot: None,
        }
    }

    fn safe(items: Vec<MenuItem>) -> SafeCandidates {
        guard(items, &AllergenSet::default())
    }

    #[test]
    fn corrupt_nutrients_rank_as_zero() {
        let candidates = safe(vec![
            item("Mystery Bowl", 400.0, 10.0, f64::NAN),
            item("Lentil Salad", 400.0, 10.0, 9.0),
            item("Bogus Wrap", 400.0, 10.0, -20.0),
        ]);

        let swaps = select(&estimate(&["Burger"]), &candidates, Goal::HighFiber, 3);

        let order: Vec<_> = swaps.iter().map(|s| s.to_item.as_str()).collect();
        assert_eq!(order, vec!["Lentil Salad", "Mystery Bowl", "Bogus Wrap"]);
        for swap in &swaps {
            assert!(!swap.nutritional_benefit.contains("NaN"), "{}", swap.nutritional_benefit);
            assert!(!swap.nutritional_benefit.contains("-20"), "{}", swap.nutritional_benefit);
        }
    }

    fn estimate(detected: &[&str]) -> MealEstimate {
        MealEstimate {
            detected_items: detected.iter().map(|s| s.to_string()).collect(),
            nutrients: Nutrients {
                calories: 650.0,
                protein_g: 20.0,
                carbs_g: 70.0,
                fats_g: 30.0,
                fiber_g: 2.0,
            },
            goal_alignment: String::new(),
        }
    }

    #[test]
    fn lose_weight_picks_salad_over_burger() {
        let candidates = safe(vec![
            item("Salad", 200.0, 5.0, 8.0),
            item("Burger", 700.0, 30.0, 1.0),
        ]);
        let swaps = select(&estimate(&["Pizza"]), &candidates, Goal::LoseWeight, 1);

        assert_eq!(swaps.len(), 1);
        assert_eq!(swaps[0].to_item, "Salad");
        assert_eq!(swaps[0].from_item, "Pizza");
        assert!(swaps[0].nutritional_benefit.starts_with("-450 kcal calories"));
        assert!(swaps[0].reason.contains("450 kcal less calories"));
    }

    #[test]
    fn empty_candidates_yield_no_swaps() {
        let swaps = select(&estimate(&["Pizza"]), &safe(vec![]), Goal::HighFiber, 3);
        assert!(swaps.is_empty());
    }

    #[test]
    fn partial_fulfilment_when_fewer_than_k() {
        let candidates = safe(vec![item("Oats", 300.0, 10.0, 8.0)]);
        let swaps = select(&estimate(&["Toast"]), &candidates, Goal::HighFiber, 3);
        assert_eq!(swaps.len(), 1);
    }

    #[test]
    fn duplicate_names_are_suggested_once() {
        let candidates = safe(vec![
            item("Grilled Chicken", 300.0, 40.0, 0.0),
            item("grilled chicken ", 320.0, 42.0, 0.0),
            item("Tofu Bowl", 400.0, 25.0, 5.0),
        ]);
        let swaps = select(&estimate(&["Fries"]), &candidates, Goal::MoreProtein, 3);
        let names: Vec<_> = swaps.iter().map(|s| s.to_item.as_str()).collect();
        assert_eq!(names, vec!["grilled chicken ", "Tofu Bowl"]);
    }

    #[test]
    fn ties_keep_catalog_order_and_results_are_repeatable() {
        let candidates = safe(vec![
            item("First", 300.0, 10.0, 4.0),
            item("Second", 300.0, 10.0, 4.0),
            item("Third", 300.0, 10.0, 4.0),
        ]);
        let meal = estimate(&[]);
        let first_run = select(&meal, &candidates, Goal::HighFiber, 2);
        let second_run = select(&meal, &candidates, Goal::HighFiber, 2);

        assert_eq!(first_run, second_run);
        let names: Vec<_> = first_run.iter().map(|s| s.to_item.as_str()).collect();
        assert_eq!(names, vec!["First", "Second"]);
    }

    #[test]
    fn empty_detection_uses_placeholder() {
        let candidates = safe(vec![item("Oats", 300.0, 10.0, 8.0)]);
        let swaps = select(&estimate(&[]), &candidates, Goal::HighFiber, 1);
        assert_eq!(swaps[0].from_item, UNDETECTED_MEAL_LABEL);
        assert!(swaps[0].nutritional_benefit.contains("+6 g fiber"));
        assert!(swaps[0].nutritional_benefit.contains("-350 kcal"));
    }

    #[test]
    fn balanced_diet_reports_macro_split() {
        let mut even = item("Poke Bowl", 450.0, 30.0, 3.0);
        even.nutrients.carbs_g = Some(30.0);
        even.nutrients.fats_g = Some(13.0);
        let swaps = select(&estimate(&["Donut"]), &safe(vec![even]), Goal::BalancedDiet, 1);
        assert!(swaps[0].reason.contains("more even"));
        assert!(swaps[0].nutritional_benefit.contains("energy split"));
    }
}
