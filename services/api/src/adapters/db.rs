//! services/api/src/adapters/db.rs
//!
//! This module contains the database adapter, which is the concrete implementation
//! of the `AnalysisStore` port from the `core` crate. It handles all interactions
//! with the PostgreSQL database using `sqlx`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use meal_swap_core::domain::{
    AllergenSet, AnalysisRecord, DayOfWeek, Gender, Goal, MealType, MenuItem, NutrientProfile,
    Nutrients, Slot, SwapSuggestion, UserProfile,
};
use meal_swap_core::ports::{AnalysisStore, PortError, PortResult};
use sqlx::types::Json;
use sqlx::{FromRow, PgPool};
use tracing::warn;
use uuid::Uuid;

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// A database adapter that implements the `AnalysisStore` port.
#[derive(Clone)]
pub struct DbAdapter {
    pool: PgPool,
}

impl DbAdapter {
    /// Creates a new `DbAdapter`.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// A helper function to run database migrations at startup.
    pub async fn run_migrations(&self) -> Result<(), sqlx::Error> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }
}

fn unexpected(e: sqlx::Error) -> PortError {
    PortError::Unexpected(e.to_string())
}

//=========================================================================================
// "Impure" Database Record Structs
//=========================================================================================

#[derive(FromRow)]
struct ProfileRecord {
    user_id: Uuid,
    weight: f64,
    height: f64,
    gender: String,
}
impl ProfileRecord {
    fn to_domain(self) -> PortResult<UserProfile> {
        let gender = self
            .gender
            .parse::<Gender>()
            .map_err(|e| PortError::Unexpected(e.to_string()))?;
        UserProfile::new(self.user_id, self.weight, self.height, gender)
            .map_err(|e| PortError::Unexpected(e.to_string()))
    }
}

#[derive(FromRow)]
struct MenuItemRecord {
    id: Uuid,
    name: String,
    description: Option<String>,
    calories: Option<f64>,
    protein: Option<f64>,
    carbs: Option<f64>,
    fats: Option<f64>,
    fiber: Option<f64>,
    category: Option<String>,
    day_of_week: Option<String>,
    meal_type: Option<String>,
}
impl MenuItemRecord {
    fn to_domain(self) -> MenuItem {
        let slot = match (self.day_of_week.as_deref(), self.meal_type.as_deref()) {
            (Some(day), Some(meal)) => match (day.parse::<DayOfWeek>(), meal.parse::<MealType>()) {
                (Ok(day), Ok(meal)) => Some(Slot::new(day, meal)),
                _ => {
                    warn!(item_id = %self.id, day, meal, "menu item has an unknown slot; it will never be suggested");
                    None
                }
            },
            _ => None,
        };

        MenuItem {
            id: self.id,
            name: self.name,
            description: self.description,
            category: self.category,
            nutrients: NutrientProfile {
                calories: self.calories,
                protein_g: self.protein,
                carbs_g: self.carbs,
                fats_g: self.fats,
                fiber_g: self.fiber,
            },
            slot,
        }
    }
}

#[derive(FromRow)]
struct AnalysisRecordRow {
    id: Uuid,
    user_id: Uuid,
    detected_items: Vec<String>,
    calories: f64,
    protein: f64,
    carbs: f64,
    fats: f64,
    fiber: f64,
    goal_alignment: String,
    swaps: Json<Vec<SwapSuggestion>>,
    day_of_week: String,
    meal_type: String,
    created_at: DateTime<Utc>,
}
impl AnalysisRecordRow {
    fn to_domain(self) -> PortResult<AnalysisRecord> {
        let day = self
            .day_of_week
            .parse::<DayOfWeek>()
            .map_err(|e| PortError::Unexpected(e.to_string()))?;
        let meal = self
            .meal_type
            .parse::<MealType>()
            .map_err(|e| PortError::Unexpected(e.to_string()))?;

        Ok(AnalysisRecord {
            id: self.id,
            user_id: self.user_id,
            detected_items: self.detected_items,
            nutrients: Nutrients {
                calories: self.calories,
                protein_g: self.protein,
                carbs_g: self.carbs,
                fats_g: self.fats,
                fiber_g: self.fiber,
            },
            goal_alignment: self.goal_alignment,
            swaps: self.swaps.0,
            slot: Slot::new(day, meal),
            created_at: self.created_at,
        })
    }
}

//=========================================================================================
// `AnalysisStore` Trait Implementation
//=========================================================================================

#[async_trait]
impl AnalysisStore for DbAdapter {
    async fn get_profile(&self, user_id: Uuid) -> PortResult<UserProfile> {
        let record = sqlx::query_as::<_, ProfileRecord>(
            "SELECT user_id, weight, height, gender FROM profiles WHERE user_id = $1",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(unexpected)?
        .ok_or_else(|| PortError::NotFound(format!("Profile for user {} not found", user_id)))?;

        record.to_domain()
    }

    async fn get_goal(&self, user_id: Uuid) -> PortResult<Goal> {
        let goal_type: Option<String> = sqlx::query_scalar(
            "SELECT goal_type FROM user_goals WHERE user_id = $1 ORDER BY updated_at DESC LIMIT 1",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(unexpected)?;

        goal_type
            .ok_or_else(|| PortError::NotFound(format!("Goal for user {} not found", user_id)))?
            .parse::<Goal>()
            .map_err(|e| PortError::Unexpected(e.to_string()))
    }

    async fn get_allergens(&self, user_id: Uuid) -> PortResult<AllergenSet> {
        let names: Vec<String> =
            sqlx::query_scalar("SELECT allergy_name FROM user_allergies WHERE user_id = $1")
                .bind(user_id)
                .fetch_all(&self.pool)
                .await
                .map_err(unexpected)?;
        Ok(AllergenSet::from_names(names))
    }

    async fn get_catalog(&self, user_id: Uuid, slot: Slot) -> PortResult<Vec<MenuItem>> {
        let has_menu: bool =
            sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM menus WHERE user_id = $1)")
                .bind(user_id)
                .fetch_one(&self.pool)
                .await
                .map_err(unexpected)?;
        if !has_menu {
            return Err(PortError::NotFound(format!(
                "No menu catalog for user {}",
                user_id
            )));
        }

        let records = sqlx::query_as::<_, MenuItemRecord>(
            r#"SELECT mi.id, mi.name, mi.description, mi.calories, mi.protein, mi.carbs,
                      mi.fats, mi.fiber, mi.category, mi.day_of_week, mi.meal_type
               FROM menu_items mi
               JOIN menus m ON m.id = mi.menu_id
               WHERE m.user_id = $1
                 AND LOWER(mi.day_of_week) = LOWER($2)
                 AND LOWER(mi.meal_type) = LOWER($3)
               ORDER BY m.created_at ASC, mi.created_at ASC, mi.id ASC"#,
        )
        .bind(user_id)
        .bind(slot.day_of_week.as_str())
        .bind(slot.meal_type.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?;

        Ok(records.into_iter().map(|r| r.to_domain()).collect())
    }

    async fn append_analysis_record(&self, record: AnalysisRecord) -> PortResult<()> {
        sqlx::query(
            r#"INSERT INTO food_analyses
                   (id, user_id, detected_items, calories, protein, carbs, fats, fiber,
                    goal_alignment, swaps, day_of_week, meal_type, created_at)
               VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)"#,
        )
        .bind(record.id)
        .bind(record.user_id)
        .bind(&record.detected_items)
        .bind(record.nutrients.calories)
        .bind(record.nutrients.protein_g)
        .bind(record.nutrients.carbs_g)
        .bind(record.nutrients.fats_g)
        .bind(record.nutrients.fiber_g)
        .bind(&record.goal_alignment)
        .bind(Json(&record.swaps))
        .bind(record.slot.day_of_week.as_str())
        .bind(record.slot.meal_type.as_str())
        .bind(record.created_at)
        .execute(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(())
    }

    async fn get_recent_analyses(
        &self,
        user_id: Uuid,
        limit: usize,
    ) -> PortResult<Vec<AnalysisRecord>> {
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let rows = sqlx::query_as::<_, AnalysisRecordRow>(
            r#"SELECT id, user_id, detected_items, calories, protein, carbs, fats, fiber,
                      goal_alignment, swaps, day_of_week, meal_type, created_at
               FROM food_analyses
               WHERE user_id = $1
               ORDER BY created_at DESC
               LIMIT $2"#,
        )
        .bind(user_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?;

        rows.into_iter().map(|r| r.to_domain()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn menu_record(day: Option<&str>, meal: Option<&str>) -> MenuItemRecord {
        MenuItemRecord {
            id: Uuid::new_v4(),
            name: "Lentil Soup".to_string(),
            description: Some("red lentils, cumin".to_string()),
            calories: Some(320.0),
            protein: Some(18.0),
            carbs: None,
            fats: Some(6.0),
            fiber: Some(11.0),
            category: Some("soups".to_string()),
            day_of_week: day.map(str::to_string),
            meal_type: meal.map(str::to_string),
        }
    }

    #[test]
    fn menu_item_keeps_unknown_nutrients_unknown() {
        let item = menu_record(Some("Monday"), Some("Lunch")).to_domain();
        assert_eq!(item.nutrients.carbs_g, None);
        assert_eq!(item.nutrients.fiber_g, Some(11.0));
        assert_eq!(item.slot, Some(Slot::new(DayOfWeek::Monday, MealType::Lunch)));
    }

    #[test]
    fn menu_item_with_partial_or_unknown_slot_has_no_slot() {
        assert_eq!(menu_record(Some("Monday"), None).to_domain().slot, None);
        assert_eq!(menu_record(Some("Funday"), Some("Lunch")).to_domain().slot, None);
    }

    #[test]
    fn profile_with_unknown_gender_is_rejected() {
        let record = ProfileRecord {
            user_id: Uuid::new_v4(),
            weight: 70.0,
            height: 170.0,
            gender: "unspecified".to_string(),
        };
        assert!(matches!(record.to_domain(), Err(PortError::Unexpected(_))));
    }

    #[test]
    fn analysis_row_maps_slot_and_swaps() {
        let row = AnalysisRecordRow {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            detected_items: vec!["Ramen".to_string()],
            calories: 700.0,
            protein: 25.0,
            carbs: 90.0,
            fats: 24.0,
            fiber: 3.0,
            goal_alignment: "Sodium-heavy.".to_string(),
            swaps: Json(vec![SwapSuggestion {
                from_item: "Ramen".to_string(),
                to_item: "Pho".to_string(),
                reason: "Lighter broth.".to_string(),
                nutritional_benefit: "-250 kcal calories".to_string(),
            }]),
            day_of_week: "Friday".to_string(),
            meal_type: "Dinner".to_string(),
            created_at: Utc::now(),
        };

        let record = row.to_domain().unwrap();
        assert_eq!(record.slot, Slot::new(DayOfWeek::Friday, MealType::Dinner));
        assert_eq!(record.swaps[0].to_item, "Pho");
        assert_eq!(record.nutrients.protein_g, 25.0);
    }
}
