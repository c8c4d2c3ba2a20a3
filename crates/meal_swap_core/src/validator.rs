//! crates/meal_swap_core/src/validator.rs
//!
//! Turns the vision model's untrusted JSON into a `MealEstimate`, or a typed error.
//! Nothing here ever fills in a missing value.

use serde_json::{Map, Value};

use crate::domain::{MealEstimate, Nutrients};

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ValidationError {
    #[error("estimate is not JSON: {0}")]
    NotJson(String),
    #[error("estimate is not a JSON object")]
    NotAnObject,
    #[error("estimate is missing required field `{0}`")]
    MissingField(&'static str),
    #[error("field `{field}` must be a number")]
    NotANumber { field: &'static str },
    #[error("field `{field}` must be finite and non-negative, got {value}")]
    OutOfRange { field: &'static str, value: f64 },
    #[error("`detected_items` must be an array")]
    DetectedItemsNotArray,
    #[error("`detected_items[{index}]` must be a non-empty string")]
    InvalidDetectedItem { index: usize },
    #[error("`goal_alignment` must be a string")]
    GoalAlignmentNotText,
}

/// Validates a raw estimate.
///
/// Expected shape:
/// `{ "detected_items": [..], "calories": n, "protein": n, "carbs": n, "fats": n, "fiber": n,
///    "goal_alignment": ".." }`.
/// A `swaps` key, if present, is ignored.
pub fn validate(raw: &Value) -> Result<MealEstimate, ValidationError> {
    let object = raw.as_object().ok_or(ValidationError::NotAnObject)?;

    let detected_items = detected_items(object)?;
    let nutrients = Nutrients {
        calories: nutrient(object, "calories")?,
        protein_g: nutrient(object, "protein")?,
        carbs_g: nutrient(object, "carbs")?,
        fats_g: nutrient(object, "fats")?,
        fiber_g: nutrient(object, "fiber")?,
    };

    // The narrative is optional, but must be text when present.
    let goal_alignment = match object.get("goal_alignment") {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(text)) => text.trim().to_string(),
        Some(_) => return Err(ValidationError::GoalAlignmentNotText),
    };

    Ok(MealEstimate {
        detected_items,
        nutrients,
        goal_alignment,
    })
}

fn nutrient(object: &Map<String, Value>, field: &'static str) -> Result<f64, ValidationError> {
    let value = object
        .get(field)
        .filter(|v| !v.is_null())
        .ok_or(ValidationError::MissingField(field))?;
    let number = value
        .as_f64()
        .ok_or(ValidationError::NotANumber { field })?;
    if !number.is_finite() || number < 0.0 {
        return Err(ValidationError::OutOfRange {
            field,
            value: number,
        });
    }
    Ok(number)
}

fn detected_items(object: &Map<String, Value>) -> Result<Vec<String>, ValidationError> {
    let items = object
        .get("detected_items")
        .ok_or(ValidationError::MissingField("detected_items"))?
        .as_array()
        .ok_or(ValidationError::DetectedItemsNotArray)?;

    items
        .iter()
        .enumerate()
        .map(|(index, item)| match item.as_str().map(str::trim) {
            Some(name) if !name.is_empty() => Ok(name.to_string()),
            _ => Err(ValidationError::InvalidDetectedItem { index }),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn valid_payload() -> Value {
        json!({
            "detected_items": ["Cheeseburger", " Fries "],
            "calories": 950,
            "protein": 35.5,
            "carbs": 90,
            "fats": 48,
            "fiber": 0,
            "goal_alignment": "High in calories for a weight-loss goal."
        })
    }

    #[test]
    fn accepts_a_complete_estimate() {
        let estimate = validate(&valid_payload()).unwrap();
        assert_eq!(estimate.detected_items, vec!["Cheeseburger", "Fries"]);
        assert_eq!(estimate.nutrients.calories, 950.0);
        assert_eq!(estimate.nutrients.protein_g, 35.5);
        assert_eq!(estimate.nutrients.fiber_g, 0.0);
    }

    #[test]
    fn rejects_missing_nutrient() {
        let mut payload = valid_payload();
        payload.as_object_mut().unwrap().remove("fiber");
        assert_eq!(
            validate(&payload),
            Err(ValidationError::MissingField("fiber"))
        );
    }

    #[test]
    fn rejects_null_nutrient_as_missing() {
        let mut payload = valid_payload();
        payload["carbs"] = Value::Null;
        assert_eq!(
            validate(&payload),
            Err(ValidationError::MissingField("carbs"))
        );
    }

    #[test]
    fn rejects_negative_nutrient() {
        let mut payload = valid_payload();
        payload["fats"] = json!(-3);
        assert!(matches!(
            validate(&payload),
            Err(ValidationError::OutOfRange { field: "fats", .. })
        ));
    }

    #[test]
    fn rejects_numeric_strings() {
        let mut payload = valid_payload();
        payload["calories"] = json!("950");
        assert_eq!(
            validate(&payload),
            Err(ValidationError::NotANumber { field: "calories" })
        );
    }

    #[test]
    fn empty_detection_is_propagated() {
        let mut payload = valid_payload();
        payload["detected_items"] = json!([]);
        let estimate = validate(&payload).unwrap();
        assert!(estimate.detected_items.is_empty());
    }

    #[test]
    fn rejects_blank_detected_item() {
        let mut payload = valid_payload();
        payload["detected_items"] = json!(["Rice", "   "]);
        assert_eq!(
            validate(&payload),
            Err(ValidationError::InvalidDetectedItem { index: 1 })
        );
    }

    #[test]
    fn ignores_model_proposed_swaps() {
        let mut payload = valid_payload();
        payload["swaps"] = json!([{ "from_item": "Fries", "to_item": "Anything" }]);
        assert!(validate(&payload).is_ok());
    }

    #[test]
    fn rejects_non_object_payload() {
        assert_eq!(validate(&json!([1, 2])), Err(ValidationError::NotAnObject));
    }
}
