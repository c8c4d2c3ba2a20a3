//! services/api/src/adapters/estimator_llm.rs
//!
//! This module contains the adapter for the vision model that estimates a photographed
//! meal. It implements the `MealEstimator` port from the `core` crate. The model's
//! answer is returned as raw JSON; the core validates it before use.

const SYSTEM_INSTRUCTIONS: &str = r#"You are a nutrition expert. Look at the photo of a meal and estimate what it contains.

Respond with ONE JSON object and nothing else, using exactly these keys:
{
  "detected_items": ["<food name>", ...],
  "calories": <number, kcal for the whole meal>,
  "protein": <number, grams>,
  "carbs": <number, grams>,
  "fats": <number, grams>,
  "fiber": <number, grams>,
  "goal_alignment": "<one or two sentences on how well this meal fits the user's goal>"
}

Rules:
- All five nutrient values are required. Use 0 when a nutrient is truly absent, never leave one out.
- Never use negative numbers or strings for nutrient values.
- If you cannot recognise any food, return an empty "detected_items" list.
- Do NOT propose swaps. Swaps are computed separately from the user's menu."#;

const USER_CONTEXT_TEMPLATE: &str = r#"USER CONTEXT:
- Goal: {goal}
- Weight: {weight}kg, Height: {height}cm
- Allergies: {allergies}
- Meal slot: {slot}
- Planned menu items for this slot: {menu}

Analyze this meal."#;

use async_openai::{
    config::OpenAIConfig,
    error::OpenAIError,
    types::chat::{
        ChatCompletionRequestMessageContentPartImageArgs,
        ChatCompletionRequestMessageContentPartTextArgs, ChatCompletionRequestSystemMessageArgs,
        ChatCompletionRequestUserMessageArgs, ChatCompletionRequestUserMessageContentPart,
        CreateChatCompletionRequestArgs, ImageDetail, ImageUrlArgs, ResponseFormat,
    },
    Client,
};
use async_trait::async_trait;
use meal_swap_core::ports::{EstimationContext, MealEstimator, PortError, PortResult};
use regex::Regex;
use serde_json::Value;
use std::sync::OnceLock;
use tracing::debug;

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// An adapter that implements `MealEstimator` using an OpenAI-compatible vision model.
#[derive(Clone)]
pub struct OpenAiMealEstimator {
    client: Client<OpenAIConfig>,
    model: String,
}

impl OpenAiMealEstimator {
    /// Creates a new `OpenAiMealEstimator`.
    pub fn new(client: Client<OpenAIConfig>, model: String) -> Self {
        Self { client, model }
    }
}

/// Renders the per-user part of the prompt.
pub fn build_user_context(context: &EstimationContext) -> String {
    let allergies = if context.allergens.is_empty() {
        "None".to_string()
    } else {
        context.allergens.iter().collect::<Vec<_>>().join(", ")
    };

    let menu = if context.candidates.is_empty() {
        "None".to_string()
    } else {
        context
            .candidates
            .iter()
            .map(|item| item.name.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    };

    USER_CONTEXT_TEMPLATE
        .replace("{goal}", context.goal.label())
        .replace("{weight}", &format!("{}", context.profile.weight_kg))
        .replace("{height}", &format!("{}", context.profile.height_cm))
        .replace("{allergies}", &allergies)
        .replace("{slot}", &context.slot.to_string())
        .replace("{menu}", &menu)
}

/// Pulls the JSON object out of the model's reply, tolerating a markdown code fence.
pub fn extract_json(content: &str) -> PortResult<Value> {
    static FENCE: OnceLock<Regex> = OnceLock::new();
    let fence = FENCE.get_or_init(|| {
        Regex::new(r"(?s)```(?:json)?\s*(.*?)\s*```").expect("code fence pattern is valid")
    });

    let body = fence
        .captures(content)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str())
        .unwrap_or(content)
        .trim();

    serde_json::from_str(body)
        .map_err(|e| PortError::Malformed(format!("estimator reply is not JSON: {}", e)))
}

//=========================================================================================
// `MealEstimator` Trait Implementation
//=========================================================================================

#[async_trait]
impl MealEstimator for OpenAiMealEstimator {
    /// Sends the image and the user's context to the vision model.
    async fn estimate(
        &self,
        image_reference: &str,
        context: &EstimationContext,
    ) -> PortResult<Value> {
        let text_part = ChatCompletionRequestMessageContentPartTextArgs::default()
            .text(build_user_context(context))
            .build()
            .map_err(|e| PortError::Unexpected(e.to_string()))?;
        let image_part = ChatCompletionRequestMessageContentPartImageArgs::default()
            .image_url(
                ImageUrlArgs::default()
                    .url(image_reference)
                    .detail(ImageDetail::Auto)
                    .build()
                    .map_err(|e| PortError::Unexpected(e.to_string()))?,
            )
            .build()
            .map_err(|e| PortError::Unexpected(e.to_string()))?;

        let messages = vec![
            ChatCompletionRequestSystemMessageArgs::default()
                .content(SYSTEM_INSTRUCTIONS)
                .build()
                .map_err(|e| PortError::Unexpected(e.to_string()))?
                .into(),
            ChatCompletionRequestUserMessageArgs::default()
                .content(vec![
                    ChatCompletionRequestUserMessageContentPart::Text(text_part),
                    ChatCompletionRequestUserMessageContentPart::ImageUrl(image_part),
                ])
                .build()
                .map_err(|e| PortError::Unexpected(e.to_string()))?
                .into(),
        ];

        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.model)
            .messages(messages)
            .response_format(ResponseFormat::JsonObject)
            .n(1)
            .build()
            .map_err(|e| PortError::Unexpected(e.to_string()))?;

        // Call the API and manually map the error if it occurs, which respects the orphan rule.
        let response = self
            .client
            .chat()
            .create(request)
            .await
            .map_err(|e: OpenAIError| PortError::Unexpected(e.to_string()))?;

        let content = response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| {
                PortError::Malformed("vision model returned no text content".to_string())
            })?;
        debug!(chars = content.len(), "vision model replied");

        extract_json(&content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use meal_swap_core::domain::{
        AllergenSet, DayOfWeek, Gender, Goal, MealType, MenuItem, NutrientProfile, Slot,
        UserProfile,
    };
    use uuid::Uuid;

    fn context(allergens: &[&str], menu: &[&str]) -> EstimationContext {
        EstimationContext {
            profile: UserProfile::new(Uuid::new_v4(), 64.5, 168.0, Gender::Female).unwrap(),
            goal: Goal::MoreProtein,
            allergens: AllergenSet::from_names(allergens),
            slot: Slot::new(DayOfWeek::Wednesday, MealType::Dinner),
            candidates: menu
                .iter()
                .map(|name| MenuItem {
                    id: Uuid::new_v4(),
                    name: name.to_string(),
                    description: None,
                    category: None,
                    nutrients: NutrientProfile::default(),
                    slot: Some(Slot::new(DayOfWeek::Wednesday, MealType::Dinner)),
                })
                .collect(),
        }
    }

    #[test]
    fn user_context_lists_goal_allergies_and_menu() {
        let prompt = build_user_context(&context(&["Sesame", "egg"], &["Tofu Stir Fry", "Salmon"]));
        assert!(prompt.contains("Goal: More Protein"));
        assert!(prompt.contains("Weight: 64.5kg, Height: 168cm"));
        assert!(prompt.contains("Allergies: egg, sesame"));
        assert!(prompt.contains("Meal slot: Wednesday Dinner"));
        assert!(prompt.contains("Tofu Stir Fry, Salmon"));
    }

    #[test]
    fn user_context_says_none_when_empty() {
        let prompt = build_user_context(&context(&[], &[]));
        assert!(prompt.contains("Allergies: None"));
        assert!(prompt.contains("for this slot: None"));
    }

    #[test]
    fn extracts_plain_and_fenced_json() {
        let plain = extract_json(r#"{"calories": 500}"#).unwrap();
        assert_eq!(plain["calories"], 500);

        let fenced = extract_json("Here you go:\n```json\n{\"calories\": 420}\n```").unwrap();
        assert_eq!(fenced["calories"], 420);
    }

    #[test]
    fn prose_reply_is_malformed() {
        assert!(matches!(
            extract_json("I think this is a salad."),
            Err(PortError::Malformed(_))
        ));
    }
}
