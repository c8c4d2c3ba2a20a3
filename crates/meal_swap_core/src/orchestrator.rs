//! crates/meal_swap_core/src/orchestrator.rs
//!
//! Runs one analysis request end to end:
//! Init -> FetchingContext -> FilteringCandidates -> Estimating -> ValidatingEstimate
//! -> SelectingSwaps -> Persisting -> Done, or Failed from any stage.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::allergen::{self, SafeCandidates};
use crate::catalog;
use crate::domain::{
    AllergenSet, AnalysisOutcome, AnalysisRecord, AnalysisRequest, AnalysisResponse,
    DayOfWeek, Goal, MealEstimate, MealType, MenuItem, PersistenceStatus, Slot, UserProfile,
};
use crate::error::AnalysisError;
use crate::ports::{AnalysisStore, EstimationContext, MealEstimator, PortError, PortResult};
use crate::selector::{self, DEFAULT_SWAP_COUNT};
use crate::validator::{self, ValidationError};

pub const DEFAULT_HISTORY_LIMIT: usize = 5;

/// Upper bound on extra estimator attempts. Larger settings are clamped.
pub const MAX_ESTIMATOR_RETRIES: u32 = 1;

//=========================================================================================
// Settings
//=========================================================================================

#[derive(Debug, Clone)]
pub struct EngineSettings {
    /// Number of swaps to suggest.
    pub max_swaps: usize,
    pub estimator_timeout: Duration,
    /// Extra estimator attempts after the first failure, at most `MAX_ESTIMATOR_RETRIES`.
    pub estimator_retries: u32,
    pub retry_backoff: Duration,
    /// How long the response waits for the record write before reporting it as pending.
    /// Every request pays up to this much when the store is slow; the write itself keeps
    /// running after the wait expires. Zero makes persistence fully fire-and-forget.
    pub persist_wait: Duration,
    pub history_limit_max: usize,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            max_swaps: DEFAULT_SWAP_COUNT,
            estimator_timeout: Duration::from_secs(30),
            estimator_retries: 1,
            retry_backoff: Duration::from_millis(500),
            persist_wait: Duration::from_millis(200),
            history_limit_max: 50,
        }
    }
}

//=========================================================================================
// Request Stages
//=========================================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnalysisStage {
    Init,
    FetchingContext,
    FilteringCandidates,
    Estimating,
    ValidatingEstimate,
    SelectingSwaps,
    Persisting,
    Done,
}

impl fmt::Display for AnalysisStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            AnalysisStage::Init => "init",
            AnalysisStage::FetchingContext => "fetching_context",
            AnalysisStage::FilteringCandidates => "filtering_candidates",
            AnalysisStage::Estimating => "estimating",
            AnalysisStage::ValidatingEstimate => "validating_estimate",
            AnalysisStage::SelectingSwaps => "selecting_swaps",
            AnalysisStage::Persisting => "persisting",
            AnalysisStage::Done => "done",
        };
        f.write_str(name)
    }
}

/// The user data one analysis needs, read concurrently.
struct UserContext {
    profile: UserProfile,
    goal: Goal,
    allergens: AllergenSet,
    catalog: Vec<MenuItem>,
}

//=========================================================================================
// The Engine
//=========================================================================================

/// Composes the pure components around the injected store and estimator.
#[derive(Clone)]
pub struct MealSwapEngine {
    store: Arc<dyn AnalysisStore>,
    estimator: Arc<dyn MealEstimator>,
    settings: EngineSettings,
}

impl MealSwapEngine {
    pub fn new(
        store: Arc<dyn AnalysisStore>,
        estimator: Arc<dyn MealEstimator>,
        settings: EngineSettings,
    ) -> Self {
        Self {
            store,
            estimator,
            settings,
        }
    }

    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    /// Analyses a meal photo and recommends swaps from the user's menu.
    pub async fn analyze(&self, request: AnalysisRequest) -> Result<AnalysisOutcome, AnalysisError> {
        let user_id = request.user_id;
        let mut stage = AnalysisStage::Init;
        let result = self.run(request, &mut stage).await;

        match &result {
            Ok(outcome) => info!(
                %user_id,
                swaps = outcome.response.swaps.len(),
                persistence = ?outcome.persistence,
                "analysis completed"
            ),
            Err(e) => error!(%user_id, %stage, error = %e, "analysis failed"),
        }
        result
    }

    async fn run(
        &self,
        request: AnalysisRequest,
        stage: &mut AnalysisStage,
    ) -> Result<AnalysisOutcome, AnalysisError> {
        let slot = parse_slot(request.day_of_week.as_deref(), request.meal_type.as_deref())?;
        if request.image_reference.trim().is_empty() {
            return Err(AnalysisError::InvalidRequest(
                "image_reference is required".to_string(),
            ));
        }

        advance(stage, AnalysisStage::FetchingContext);
        let context = self.fetch_context(request.user_id, slot).await?;

        advance(stage, AnalysisStage::FilteringCandidates);
        let candidates = allergen::guard(catalog::filter_slot(&context.catalog, slot), &context.allergens);
        debug!(
            catalog = context.catalog.len(),
            candidates = candidates.len(),
            "candidates ready"
        );

        advance(stage, AnalysisStage::Estimating);
        let estimation_context = EstimationContext {
            profile: context.profile,
            goal: context.goal,
            allergens: context.allergens,
            slot,
            candidates: candidates.to_vec(),
        };
        let raw = self
            .estimate_with_retry(&request.image_reference, &estimation_context)
            .await?;

        advance(stage, AnalysisStage::ValidatingEstimate);
        let estimate = validator::validate(&raw)?;

        advance(stage, AnalysisStage::SelectingSwaps);
        let record = self.build_record(request.user_id, slot, estimate, &candidates, context.goal);
        let response = AnalysisResponse::from(&record);

        advance(stage, AnalysisStage::Persisting);
        let record_id = record.id;
        let persistence = self.persist(record).await;

        advance(stage, AnalysisStage::Done);
        Ok(AnalysisOutcome {
            record_id,
            response,
            persistence,
        })
    }

    async fn fetch_context(&self, user_id: Uuid, slot: Slot) -> Result<UserContext, AnalysisError> {
        let (profile, goal, allergens, catalog) = futures::join!(
            self.store.get_profile(user_id),
            self.store.get_goal(user_id),
            self.store.get_allergens(user_id),
            self.store.get_catalog(user_id, slot),
        );

        let allergens = match allergens {
            Ok(set) => set,
            Err(PortError::NotFound(_)) => AllergenSet::default(),
            Err(e) => return Err(context_unavailable("allergens", e)),
        };

        Ok(UserContext {
            profile: profile.map_err(|e| context_unavailable("profile", e))?,
            goal: goal.map_err(|e| context_unavailable("goal", e))?,
            allergens,
            catalog: catalog.map_err(|e| context_unavailable("menu catalog", e))?,
        })
    }

    async fn estimate_with_retry(
        &self,
        image_reference: &str,
        context: &EstimationContext,
    ) -> Result<serde_json::Value, AnalysisError> {
        let attempts = self.settings.estimator_retries.min(MAX_ESTIMATOR_RETRIES) + 1;
        let mut attempt = 1;

        loop {
            let call = self.estimator.estimate(image_reference, context);
            let error = match tokio::time::timeout(self.settings.estimator_timeout, call).await {
                Ok(Ok(raw)) => return Ok(raw),
                Ok(Err(PortError::Malformed(reason))) => {
                    AnalysisError::MalformedEstimate(ValidationError::NotJson(reason))
                }
                Ok(Err(e)) => AnalysisError::EstimationUnavailable(e.to_string()),
                Err(_) => AnalysisError::EstimationUnavailable(format!(
                    "timed out after {:?}",
                    self.settings.estimator_timeout
                )),
            };

            if !error.is_retryable() || attempt >= attempts {
                return Err(error);
            }
            warn!(attempt, attempts, error = %error, "meal estimator call failed, retrying");
            tokio::time::sleep(self.settings.retry_backoff * attempt).await;
            attempt += 1;
        }
    }

    fn build_record(
        &self,
        user_id: Uuid,
        slot: Slot,
        estimate: MealEstimate,
        candidates: &SafeCandidates,
        goal: Goal,
    ) -> AnalysisRecord {
        let swaps = selector::select(&estimate, candidates, goal, self.settings.max_swaps);
        AnalysisRecord {
            id: Uuid::new_v4(),
            user_id,
            detected_items: estimate.detected_items,
            nutrients: estimate.nutrients,
            goal_alignment: estimate.goal_alignment,
            swaps,
            slot,
            created_at: Utc::now(),
        }
    }

    /// Writes the record in its own task so a slow or failing store never withholds
    /// the recommendation.
    async fn persist(&self, record: AnalysisRecord) -> PersistenceStatus {
        let store = Arc::clone(&self.store);
        let record_id = record.id;
        let write = tokio::spawn(async move { store.append_analysis_record(record).await });

        match tokio::time::timeout(self.settings.persist_wait, write).await {
            Ok(Ok(Ok(()))) => PersistenceStatus::Stored,
            Ok(Ok(Err(e))) => {
                warn!(%record_id, error = %e, "analysis record not stored, returning degraded result");
                PersistenceStatus::Degraded(e.to_string())
            }
            Ok(Err(join_error)) => {
                warn!(%record_id, error = %join_error, "analysis record task aborted");
                PersistenceStatus::Degraded(join_error.to_string())
            }
            Err(_) => {
                debug!(%record_id, "analysis record still being written");
                PersistenceStatus::Pending
            }
        }
    }

    /// The user's newest analyses, newest first.
    pub async fn recent_analyses(
        &self,
        user_id: Uuid,
        limit: Option<usize>,
    ) -> PortResult<Vec<AnalysisRecord>> {
        let limit = limit
            .unwrap_or(DEFAULT_HISTORY_LIMIT)
            .clamp(1, self.settings.history_limit_max.max(1));
        self.store.get_recent_analyses(user_id, limit).await
    }
}

//=========================================================================================
// Helpers
//=========================================================================================

/// Parses the request slot. Both parts are required.
pub fn parse_slot(day_of_week: Option<&str>, meal_type: Option<&str>) -> Result<Slot, AnalysisError> {
    let day = day_of_week
        .filter(|d| !d.trim().is_empty())
        .ok_or_else(|| AnalysisError::InvalidSlot("day_of_week is required".to_string()))?
        .parse::<DayOfWeek>()
        .map_err(|e| AnalysisError::InvalidSlot(e.to_string()))?;
    let meal = meal_type
        .filter(|m| !m.trim().is_empty())
        .ok_or_else(|| AnalysisError::InvalidSlot("meal_type is required".to_string()))?
        .parse::<MealType>()
        .map_err(|e| AnalysisError::InvalidSlot(e.to_string()))?;
    Ok(Slot::new(day, meal))
}

fn advance(stage: &mut AnalysisStage, next: AnalysisStage) {
    debug!(from = %stage, to = %next, "analysis stage");
    *stage = next;
}

fn context_unavailable(what: &str, e: PortError) -> AnalysisError {
    match e {
        PortError::NotFound(detail) => {
            AnalysisError::ContextUnavailable(format!("{what} not found: {detail}"))
        }
        PortError::Unexpected(detail) | PortError::Malformed(detail) => {
            AnalysisError::ContextUnavailable(format!("failed to load {what}: {detail}"))
        }
    }
}
