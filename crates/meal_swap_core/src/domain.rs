//! crates/meal_swap_core/src/domain.rs
//!
//! Defines the pure, core data structures for the meal-swap engine.
//! These structs are independent of any database or model provider.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

//=========================================================================================
// Parse Errors for the Closed Enumerations
//=========================================================================================

/// Raised when a value from outside the core does not fit one of the closed domain sets.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum DomainError {
    #[error("unknown goal '{0}'")]
    UnknownGoal(String),
    #[error("unknown day of week '{0}'")]
    UnknownDay(String),
    #[error("unknown meal type '{0}'")]
    UnknownMealType(String),
    #[error("unknown gender '{0}'")]
    UnknownGender(String),
    #[error("{field} must be greater than zero, got {value}")]
    NonPositiveMeasurement { field: &'static str, value: f64 },
}

//=========================================================================================
// User Context
//=========================================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Gender {
    Male,
    Female,
    Other,
}

impl FromStr for Gender {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "male" => Ok(Self::Male),
            "female" => Ok(Self::Female),
            "other" => Ok(Self::Other),
            _ => Err(DomainError::UnknownGender(s.to_string())),
        }
    }
}

/// Body measurements captured during onboarding. Read-only to the engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    pub user_id: Uuid,
    pub weight_kg: f64,
    pub height_cm: f64,
    pub gender: Gender,
}

impl UserProfile {
    /// Builds a profile, rejecting non-positive (or non-finite) measurements.
    pub fn new(
        user_id: Uuid,
        weight_kg: f64,
        height_cm: f64,
        gender: Gender,
    ) -> Result<Self, DomainError> {
        if !(weight_kg.is_finite() && weight_kg > 0.0) {
            return Err(DomainError::NonPositiveMeasurement {
                field: "weight",
                value: weight_kg,
            });
        }
        if !(height_cm.is_finite() && height_cm > 0.0) {
            return Err(DomainError::NonPositiveMeasurement {
                field: "height",
                value: height_cm,
            });
        }
        Ok(Self {
            user_id,
            weight_kg,
            height_cm,
            gender,
        })
    }
}

/// The single active dietary objective of a user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Goal {
    LoseWeight,
    GainMuscle,
    MoreProtein,
    BalancedDiet,
    LowCarb,
    HighFiber,
}

impl Goal {
    pub const ALL: [Goal; 6] = [
        Goal::LoseWeight,
        Goal::GainMuscle,
        Goal::MoreProtein,
        Goal::BalancedDiet,
        Goal::LowCarb,
        Goal::HighFiber,
    ];

    /// The stored (wire) form of the goal.
    pub fn as_str(&self) -> &'static str {
        match self {
            Goal::LoseWeight => "lose_weight",
            Goal::GainMuscle => "gain_muscle",
            Goal::MoreProtein => "more_protein",
            Goal::BalancedDiet => "balanced_diet",
            Goal::LowCarb => "low_carb",
            Goal::HighFiber => "high_fiber",
        }
    }

    /// Human-readable label, as shown on the dashboard.
    pub fn label(&self) -> &'static str {
        match self {
            Goal::LoseWeight => "Lose Weight",
            Goal::GainMuscle => "Gain Muscle",
            Goal::MoreProtein => "More Protein",
            Goal::BalancedDiet => "Balanced Diet",
            Goal::LowCarb => "Low Carb",
            Goal::HighFiber => "High Fiber",
        }
    }
}

impl FromStr for Goal {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Goal::ALL
            .into_iter()
            .find(|goal| goal.as_str() == s)
            .ok_or_else(|| DomainError::UnknownGoal(s.to_string()))
    }
}

impl fmt::Display for Goal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Free-text allergen names, lowercased, trimmed and deduplicated.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<String>")]
pub struct AllergenSet(BTreeSet<String>);

impl From<Vec<String>> for AllergenSet {
    fn from(names: Vec<String>) -> Self {
        Self::from_names(names)
    }
}

impl AllergenSet {
    pub fn from_names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let tokens = names
            .into_iter()
            .map(|name| name.as_ref().trim().to_lowercase())
            .filter(|name| !name.is_empty())
            .collect();
        Self(tokens)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }
}

//=========================================================================================
// Menu Slots
//=========================================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DayOfWeek {
    Monday,
    Tuesday,
    Wednesday,
    Thursday,
    Friday,
    Saturday,
    Sunday,
}

impl DayOfWeek {
    pub const ALL: [DayOfWeek; 7] = [
        DayOfWeek::Monday,
        DayOfWeek::Tuesday,
        DayOfWeek::Wednesday,
        DayOfWeek::Thursday,
        DayOfWeek::Friday,
        DayOfWeek::Saturday,
        DayOfWeek::Sunday,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            DayOfWeek::Monday => "Monday",
            DayOfWeek::Tuesday => "Tuesday",
            DayOfWeek::Wednesday => "Wednesday",
            DayOfWeek::Thursday => "Thursday",
            DayOfWeek::Friday => "Friday",
            DayOfWeek::Saturday => "Saturday",
            DayOfWeek::Sunday => "Sunday",
        }
    }
}

impl FromStr for DayOfWeek {
    type Err = DomainError;

    /// Case-insensitive on the full day name; abbreviations are not accepted.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        DayOfWeek::ALL
            .into_iter()
            .find(|day| day.as_str().eq_ignore_ascii_case(trimmed))
            .ok_or_else(|| DomainError::UnknownDay(s.to_string()))
    }
}

impl fmt::Display for DayOfWeek {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MealType {
    Breakfast,
    Lunch,
    Dinner,
    Snacks,
}

impl MealType {
    pub const ALL: [MealType; 4] = [
        MealType::Breakfast,
        MealType::Lunch,
        MealType::Dinner,
        MealType::Snacks,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            MealType::Breakfast => "Breakfast",
            MealType::Lunch => "Lunch",
            MealType::Dinner => "Dinner",
            MealType::Snacks => "Snacks",
        }
    }
}

impl FromStr for MealType {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        MealType::ALL
            .into_iter()
            .find(|meal| meal.as_str().eq_ignore_ascii_case(trimmed))
            .ok_or_else(|| DomainError::UnknownMealType(s.to_string()))
    }
}

impl fmt::Display for MealType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The (day, meal) key that scopes which menu items are eligible for an analysis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Slot {
    pub day_of_week: DayOfWeek,
    pub meal_type: MealType,
}

impl Slot {
    pub fn new(day_of_week: DayOfWeek, meal_type: MealType) -> Self {
        Self {
            day_of_week,
            meal_type,
        }
    }
}

impl fmt::Display for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.day_of_week, self.meal_type)
    }
}

//=========================================================================================
// Nutrients
//=========================================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Nutrient {
    Calories,
    Protein,
    Carbs,
    Fats,
    Fiber,
}

impl Nutrient {
    pub fn label(&self) -> &'static str {
        match self {
            Nutrient::Calories => "calories",
            Nutrient::Protein => "protein",
            Nutrient::Carbs => "carbs",
            Nutrient::Fats => "fats",
            Nutrient::Fiber => "fiber",
        }
    }

    pub fn unit(&self) -> &'static str {
        match self {
            Nutrient::Calories => "kcal",
            _ => "g",
        }
    }
}

/// A menu item's nutrient profile. Every field is independently optional.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NutrientProfile {
    pub calories: Option<f64>,
    pub protein_g: Option<f64>,
    pub carbs_g: Option<f64>,
    pub fats_g: Option<f64>,
    pub fiber_g: Option<f64>,
}

impl NutrientProfile {
    /// Value used for scoring: unknown counts as zero, and so does anything that is not
    /// a finite non-negative number.
    pub fn value(&self, nutrient: Nutrient) -> f64 {
        let field = match nutrient {
            Nutrient::Calories => self.calories,
            Nutrient::Protein => self.protein_g,
            Nutrient::Carbs => self.carbs_g,
            Nutrient::Fats => self.fats_g,
            Nutrient::Fiber => self.fiber_g,
        };
        field
            .filter(|value| value.is_finite() && *value >= 0.0)
            .unwrap_or(0.0)
    }
}

/// Aggregate nutrients of an analysed meal. All fields are known.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Nutrients {
    pub calories: f64,
    pub protein_g: f64,
    pub carbs_g: f64,
    pub fats_g: f64,
    pub fiber_g: f64,
}

impl Nutrients {
    pub fn value(&self, nutrient: Nutrient) -> f64 {
        match nutrient {
            Nutrient::Calories => self.calories,
            Nutrient::Protein => self.protein_g,
            Nutrient::Carbs => self.carbs_g,
            Nutrient::Fats => self.fats_g,
            Nutrient::Fiber => self.fiber_g,
        }
    }
}

//=========================================================================================
// Catalog, Estimates and Results
//=========================================================================================

/// An entry of the user's menu catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MenuItem {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub category: Option<String>,
    pub nutrients: NutrientProfile,
    /// Items without a slot are never swap-eligible.
    pub slot: Option<Slot>,
}

/// A validated estimate of the photographed meal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MealEstimate {
    pub detected_items: Vec<String>,
    pub nutrients: Nutrients,
    pub goal_alignment: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwapSuggestion {
    pub from_item: String,
    pub to_item: String,
    pub reason: String,
    pub nutritional_benefit: String,
}

/// One persisted analysis. Append-only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisRecord {
    pub id: Uuid,
    pub user_id: Uuid,
    pub detected_items: Vec<String>,
    pub nutrients: Nutrients,
    pub goal_alignment: String,
    pub swaps: Vec<SwapSuggestion>,
    pub slot: Slot,
    pub created_at: DateTime<Utc>,
}

/// An inbound analysis request, as received from the presentation layer.
/// Day and meal type arrive unparsed so the engine can fail fast on them.
#[derive(Debug, Clone)]
pub struct AnalysisRequest {
    pub image_reference: String,
    pub user_id: Uuid,
    pub day_of_week: Option<String>,
    pub meal_type: Option<String>,
}

/// The outbound recommendation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalysisResponse {
    pub detected_items: Vec<String>,
    pub calories: f64,
    pub protein: f64,
    pub carbs: f64,
    pub fats: f64,
    pub fiber: f64,
    pub goal_alignment: String,
    pub swaps: Vec<SwapSuggestion>,
}

impl From<&AnalysisRecord> for AnalysisResponse {
    fn from(record: &AnalysisRecord) -> Self {
        Self {
            detected_items: record.detected_items.clone(),
            calories: record.nutrients.calories,
            protein: record.nutrients.protein_g,
            carbs: record.nutrients.carbs_g,
            fats: record.nutrients.fats_g,
            fiber: record.nutrients.fiber_g,
            goal_alignment: record.goal_alignment.clone(),
            swaps: record.swaps.clone(),
        }
    }
}

/// What happened to the analysis record after the response was computed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PersistenceStatus {
    Stored,
    /// The write is still running in the background.
    Pending,
    /// The write failed; the recommendation is still valid.
    Degraded(String),
}

#[derive(Debug, Clone)]
pub struct AnalysisOutcome {
    pub record_id: Uuid,
    pub response: AnalysisResponse,
    pub persistence: PersistenceStatus,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deserialized_allergens_are_normalised() {
        let set: AllergenSet = serde_json::from_str(r#"[" Peanut ", "SESAME", ""]"#).unwrap();
        assert_eq!(set, AllergenSet::from_names(["peanut", "sesame"]));
    }

    #[test]
    fn goal_parsing_is_closed() {
        assert_eq!("low_carb".parse::<Goal>(), Ok(Goal::LowCarb));
        assert!("Low Carb".parse::<Goal>().is_err());
        assert!("keto".parse::<Goal>().is_err());
        for goal in Goal::ALL {
            assert_eq!(goal.as_str().parse::<Goal>(), Ok(goal));
        }
    }

    #[test]
    fn slot_enums_reject_unknown_values() {
        assert_eq!("monday".parse::<DayOfWeek>(), Ok(DayOfWeek::Monday));
        assert_eq!(" Sunday ".parse::<DayOfWeek>(), Ok(DayOfWeek::Sunday));
        assert!("Mon".parse::<DayOfWeek>().is_err());
        assert_eq!("Snacks".parse::<MealType>(), Ok(MealType::Snacks));
        assert!("Brunch".parse::<MealType>().is_err());
    }

    #[test]
    fn allergen_set_normalizes_and_dedupes() {
        let set = AllergenSet::from_names(["Peanut", " peanut ", "", "Shellfish"]);
        assert_eq!(set.len(), 2);
        assert_eq!(set.iter().collect::<Vec<_>>(), vec!["peanut", "shellfish"]);
    }

    #[test]
    fn profile_rejects_non_positive_measurements() {
        let id = Uuid::new_v4();
        assert!(UserProfile::new(id, 70.0, 175.0, Gender::Female).is_ok());
        assert!(UserProfile::new(id, 0.0, 175.0, Gender::Female).is_err());
        assert!(UserProfile::new(id, 70.0, -1.0, Gender::Male).is_err());
        assert!(UserProfile::new(id, f64::NAN, 175.0, Gender::Other).is_err());
    }

    #[test]
    fn missing_menu_nutrients_count_as_zero() {
        let profile = NutrientProfile {
            calories: Some(320.0),
            ..Default::default()
        };
        assert_eq!(profile.value(Nutrient::Calories), 320.0);
        assert_eq!(profile.value(Nutrient::Fiber), 0.0);
    }
}
