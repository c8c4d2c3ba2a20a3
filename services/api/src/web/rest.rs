//! services/api/src/web/rest.rs
//!
//! Contains the Axum handlers for the REST API endpoints and the master
//! definition for the OpenAPI specification.

use crate::web::state::AppState;
use axum::{
    extract::{Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Json},
};
use chrono::{DateTime, Utc};
use meal_swap_core::{
    AnalysisError, AnalysisOutcome, AnalysisRecord, AnalysisRequest, PersistenceStatus,
    SwapSuggestion,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::error;
use utoipa::{IntoParams, OpenApi, ToSchema};
use uuid::Uuid;

//=========================================================================================
// OpenAPI Master Definition
//=========================================================================================

#[derive(OpenApi)]
#[openapi(
    paths(
        analyze_meal_handler,
        recent_analyses_handler,
        health_handler,
    ),
    components(
        schemas(AnalyzeMealRequest, AnalyzeMealResponse, SwapSuggestionDto, AnalysisHistoryEntry)
    ),
    tags(
        (name = "Meal Swap API", description = "Meal photo analysis and menu swap recommendations.")
    )
)]
pub struct ApiDoc;

//=========================================================================================
// API Response and Payload Structs
//=========================================================================================

/// The payload for a new meal analysis.
#[derive(Debug, Deserialize, ToSchema)]
pub struct AnalyzeMealRequest {
    /// An image URL or a `data:image/...;base64,` URL.
    #[serde(default)]
    pub image_reference: String,
    /// Monday..Sunday.
    pub day_of_week: Option<String>,
    /// Breakfast, Lunch, Dinner or Snacks.
    pub meal_type: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct SwapSuggestionDto {
    pub from_item: String,
    pub to_item: String,
    pub reason: String,
    pub nutritional_benefit: String,
}

impl From<SwapSuggestion> for SwapSuggestionDto {
    fn from(swap: SwapSuggestion) -> Self {
        Self {
            from_item: swap.from_item,
            to_item: swap.to_item,
            reason: swap.reason,
            nutritional_benefit: swap.nutritional_benefit,
        }
    }
}

/// The response payload sent after a successful analysis.
#[derive(Debug, Serialize, ToSchema)]
pub struct AnalyzeMealResponse {
    pub id: Uuid,
    pub detected_items: Vec<String>,
    pub calories: f64,
    pub protein: f64,
    pub carbs: f64,
    pub fats: f64,
    pub fiber: f64,
    pub goal_alignment: String,
    pub swaps: Vec<SwapSuggestionDto>,
    /// `stored`, `pending` or `degraded`.
    pub persistence: String,
}

impl From<AnalysisOutcome> for AnalyzeMealResponse {
    fn from(outcome: AnalysisOutcome) -> Self {
        let persistence = match outcome.persistence {
            PersistenceStatus::Stored => "stored",
            PersistenceStatus::Pending => "pending",
            PersistenceStatus::Degraded(_) => "degraded",
        };
        let response = outcome.response;
        Self {
            id: outcome.record_id,
            detected_items: response.detected_items,
            calories: response.calories,
            protein: response.protein,
            carbs: response.carbs,
            fats: response.fats,
            fiber: response.fiber,
            goal_alignment: response.goal_alignment,
            swaps: response.swaps.into_iter().map(Into::into).collect(),
            persistence: persistence.to_string(),
        }
    }
}

/// One entry of the analysis history.
#[derive(Debug, Serialize, ToSchema)]
pub struct AnalysisHistoryEntry {
    pub id: Uuid,
    pub day_of_week: String,
    pub meal_type: String,
    pub detected_items: Vec<String>,
    pub calories: f64,
    pub protein: f64,
    pub carbs: f64,
    pub fats: f64,
    pub fiber: f64,
    pub goal_alignment: String,
    pub swaps: Vec<SwapSuggestionDto>,
    pub created_at: DateTime<Utc>,
}

impl From<AnalysisRecord> for AnalysisHistoryEntry {
    fn from(record: AnalysisRecord) -> Self {
        Self {
            id: record.id,
            day_of_week: record.slot.day_of_week.to_string(),
            meal_type: record.slot.meal_type.to_string(),
            detected_items: record.detected_items,
            calories: record.nutrients.calories,
            protein: record.nutrients.protein_g,
            carbs: record.nutrients.carbs_g,
            fats: record.nutrients.fats_g,
            fiber: record.nutrients.fiber_g,
            goal_alignment: record.goal_alignment,
            swaps: record.swaps.into_iter().map(Into::into).collect(),
            created_at: record.created_at,
        }
    }
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct HistoryQuery {
    /// Number of records to return (default 5).
    pub limit: Option<usize>,
}

//=========================================================================================
// Helpers
//=========================================================================================

fn user_id_from_headers(headers: &HeaderMap) -> Result<Uuid, (StatusCode, String)> {
    let user_id_str = headers
        .get("x-user-id")
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| {
            (
                StatusCode::BAD_REQUEST,
                "x-user-id header is required".to_string(),
            )
        })?;

    Uuid::parse_str(user_id_str).map_err(|_| {
        (
            StatusCode::BAD_REQUEST,
            "Invalid x-user-id format".to_string(),
        )
    })
}

/// Maps an analysis failure to the HTTP status the client sees.
pub fn status_for(error: &AnalysisError) -> StatusCode {
    match error {
        AnalysisError::InvalidSlot(_) | AnalysisError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
        AnalysisError::ContextUnavailable(_) => StatusCode::CONFLICT,
        AnalysisError::EstimationUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        AnalysisError::MalformedEstimate(_) => StatusCode::BAD_GATEWAY,
    }
}

//=========================================================================================
// REST API Handlers
//=========================================================================================

/// Analyze a meal photo and suggest swaps from the user's menu for the given slot.
#[utoipa::path(
    post,
    path = "/analyses",
    request_body = AnalyzeMealRequest,
    responses(
        (status = 200, description = "Analysis completed", body = AnalyzeMealResponse),
        (status = 400, description = "Missing header, photo, day or meal type"),
        (status = 409, description = "Onboarding or menu setup incomplete"),
        (status = 502, description = "The vision model returned an unusable estimate"),
        (status = 503, description = "The vision model is unavailable")
    ),
    params(
        ("x-user-id" = Uuid, Header, description = "The unique ID of the user.")
    )
)]
pub async fn analyze_meal_handler(
    State(app_state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(body): Json<AnalyzeMealRequest>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let user_id = user_id_from_headers(&headers)?;

    let request = AnalysisRequest {
        image_reference: body.image_reference,
        user_id,
        day_of_week: body.day_of_week,
        meal_type: body.meal_type,
    };

    match app_state.engine.analyze(request).await {
        Ok(outcome) => Ok((StatusCode::OK, Json(AnalyzeMealResponse::from(outcome)))),
        Err(e) => Err((status_for(&e), e.user_message().to_string())),
    }
}

/// List the user's most recent analyses, newest first.
#[utoipa::path(
    get,
    path = "/analyses/recent",
    responses(
        (status = 200, description = "Recent analyses", body = [AnalysisHistoryEntry]),
        (status = 400, description = "Missing or invalid x-user-id header"),
        (status = 500, description = "Internal server error")
    ),
    params(
        ("x-user-id" = Uuid, Header, description = "The unique ID of the user."),
        HistoryQuery
    )
)]
pub async fn recent_analyses_handler(
    State(app_state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(query): Query<HistoryQuery>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let user_id = user_id_from_headers(&headers)?;

    match app_state.engine.recent_analyses(user_id, query.limit).await {
        Ok(records) => {
            let entries: Vec<AnalysisHistoryEntry> = records.into_iter().map(Into::into).collect();
            Ok(Json(entries))
        }
        Err(e) => {
            error!("Failed to load analysis history: {:?}", e);
            Err((
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to load analysis history".to_string(),
            ))
        }
    }
}

/// Liveness probe.
#[utoipa::path(
    get,
    path = "/health",
    responses((status = 200, description = "Service is up"))
)]
pub async fn health_handler() -> &'static str {
    "ok"
}
