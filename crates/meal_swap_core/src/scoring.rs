//! crates/meal_swap_core/src/scoring.rs
//!
//! Per-goal ranking of menu items. Scores are only comparable within one goal.
//! Unknown nutrients count as zero.

use crate::domain::{Goal, MenuItem, Nutrient, NutrientProfile};

const KCAL_PER_G_PROTEIN: f64 = 4.0;
const KCAL_PER_G_CARBS: f64 = 4.0;
const KCAL_PER_G_FATS: f64 = 9.0;

/// Largest possible L1 distance between a macro split and the even split.
pub const MAX_MACRO_IMBALANCE: f64 = 4.0 / 3.0;

/// What a goal is trying to move, used when explaining a swap.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Emphasis {
    Lower(Nutrient),
    Higher(Nutrient),
    EvenMacros,
}

pub fn emphasis(goal: Goal) -> Emphasis {
    match goal {
        Goal::LoseWeight => Emphasis::Lower(Nutrient::Calories),
        Goal::LowCarb => Emphasis::Lower(Nutrient::Carbs),
        Goal::GainMuscle | Goal::MoreProtein => Emphasis::Higher(Nutrient::Protein),
        Goal::HighFiber => Emphasis::Higher(Nutrient::Fiber),
        Goal::BalancedDiet => Emphasis::EvenMacros,
    }
}

/// Higher is better.
pub fn score(item: &MenuItem, goal: Goal) -> f64 {
    score_profile(&item.nutrients, goal)
}

pub fn score_profile(profile: &NutrientProfile, goal: Goal) -> f64 {
    let calories = profile.value(Nutrient::Calories);
    let protein = profile.value(Nutrient::Protein);
    let carbs = profile.value(Nutrient::Carbs);
    let fats = profile.value(Nutrient::Fats);
    let fiber = profile.value(Nutrient::Fiber);

    match goal {
        Goal::LoseWeight => lose_weight(calories, carbs, fiber),
        Goal::LowCarb => low_carb(calories, carbs, fiber),
        Goal::GainMuscle => gain_muscle(calories, protein),
        Goal::MoreProtein => more_protein(calories, protein),
        Goal::BalancedDiet => balanced_diet(protein, carbs, fats),
        Goal::HighFiber => high_fiber(calories, fiber),
    }
}

fn lose_weight(calories: f64, carbs: f64, fiber: f64) -> f64 {
    -calories / 100.0 - carbs / 20.0 + fiber / 2.0
}

fn low_carb(calories: f64, carbs: f64, fiber: f64) -> f64 {
    -carbs / 5.0 - calories / 200.0 + fiber / 2.0
}

// Calories help muscle gain up to a generous single-meal ceiling.
fn gain_muscle(calories: f64, protein: f64) -> f64 {
    protein + calories.min(900.0) / 150.0
}

fn more_protein(calories: f64, protein: f64) -> f64 {
    protein * 1.5 + calories.min(600.0) / 300.0
}

fn balanced_diet(protein: f64, carbs: f64, fats: f64) -> f64 {
    -macro_imbalance(protein, carbs, fats) * 10.0
}

fn high_fiber(calories: f64, fiber: f64) -> f64 {
    fiber * 10.0 - calories / 1000.0
}

/// Energy share of protein, carbs and fats, in that order. `None` when all are zero.
pub fn macro_split(protein: f64, carbs: f64, fats: f64) -> Option<[f64; 3]> {
    let energy = [
        protein * KCAL_PER_G_PROTEIN,
        carbs * KCAL_PER_G_CARBS,
        fats * KCAL_PER_G_FATS,
    ];
    let total: f64 = energy.iter().sum();
    if total <= 0.0 {
        return None;
    }
    Some(energy.map(|e| e / total))
}

/// L1 distance of the macro split from an even thirds split. Zero is perfectly even.
pub fn macro_imbalance(protein: f64, carbs: f64, fats: f64) -> f64 {
    match macro_split(protein, carbs, fats) {
        Some(split) => split.iter().map(|share| (share - 1.0 / 3.0).abs()).sum(),
        None => MAX_MACRO_IMBALANCE,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn profile(calories: f64, protein: f64, carbs: f64, fats: f64, fiber: f64) -> NutrientProfile {
        NutrientProfile {
            calories: Some(calories),
            protein_g: Some(protein),
            carbs_g: Some(carbs),
            fats_g: Some(fats),
            fiber_g: Some(fiber),
        }
    }

    #[test]
    fn lose_weight_prefers_light_fibrous_items() {
        let salad = profile(200.0, 5.0, 15.0, 8.0, 8.0);
        let burger = profile(700.0, 30.0, 50.0, 40.0, 1.0);
        assert!(
            score_profile(&salad, Goal::LoseWeight) > score_profile(&burger, Goal::LoseWeight)
        );
    }

    #[test]
    fn low_carb_penalizes_carbs_first() {
        let steak = profile(450.0, 40.0, 2.0, 30.0, 0.0);
        let pasta = profile(400.0, 12.0, 70.0, 8.0, 3.0);
        assert!(score_profile(&steak, Goal::LowCarb) > score_profile(&pasta, Goal::LowCarb));
    }

    #[test]
    fn protein_goals_reward_protein() {
        let chicken = profile(350.0, 45.0, 5.0, 12.0, 0.0);
        let fries = profile(500.0, 5.0, 60.0, 25.0, 4.0);
        for goal in [Goal::GainMuscle, Goal::MoreProtein] {
            assert!(score_profile(&chicken, goal) > score_profile(&fries, goal));
        }
    }

    #[test]
    fn gain_muscle_breaks_protein_ties_with_calories() {
        let light = profile(200.0, 30.0, 5.0, 2.0, 0.0);
        let hearty = profile(650.0, 30.0, 60.0, 20.0, 0.0);
        assert!(score_profile(&hearty, Goal::GainMuscle) > score_profile(&light, Goal::GainMuscle));
    }

    #[test]
    fn balanced_diet_prefers_even_split() {
        // 30g protein, 30g carbs, ~13g fats is close to even energy thirds.
        let even = profile(400.0, 30.0, 30.0, 13.0, 2.0);
        let sugary = profile(400.0, 2.0, 95.0, 1.0, 0.0);
        assert!(
            score_profile(&even, Goal::BalancedDiet) > score_profile(&sugary, Goal::BalancedDiet)
        );
    }

    #[test]
    fn unknown_macros_are_the_least_balanced() {
        let unknown = NutrientProfile::default();
        assert_eq!(
            score_profile(&unknown, Goal::BalancedDiet),
            -MAX_MACRO_IMBALANCE * 10.0
        );
    }

    #[test]
    fn high_fiber_rewards_fiber_directly() {
        let lentils = profile(600.0, 18.0, 40.0, 2.0, 15.0);
        let rice = profile(200.0, 4.0, 45.0, 0.5, 1.0);
        assert!(score_profile(&lentils, Goal::HighFiber) > score_profile(&rice, Goal::HighFiber));
    }

    #[test]
    fn missing_fields_score_as_zero() {
        let partial = NutrientProfile {
            fiber_g: Some(6.0),
            ..Default::default()
        };
        assert_eq!(score_profile(&partial, Goal::HighFiber), 60.0);
    }
}
