//! crates/meal_swap_core/src/ports.rs
//!
//! Defines the service contracts (traits) the engine depends on.
//! These traits form the boundary of the hexagonal architecture, keeping the core
//! independent of the concrete database and vision-model implementations.

use async_trait::async_trait;
use serde::Serialize;
use uuid::Uuid;

use crate::domain::{
    AllergenSet, AnalysisRecord, Goal, MenuItem, Slot, UserProfile,
};

//=========================================================================================
// Generic Port Error and Result Types
//=========================================================================================

/// A generic error type for all port operations.
/// This abstracts away the specific errors from external services (e.g., database, network).
#[derive(Debug, thiserror::Error)]
pub enum PortError {
    #[error("Item not found: {0}")]
    NotFound(String),
    /// The service answered, but not in a shape the caller can read.
    #[error("Unreadable reply: {0}")]
    Malformed(String),
    #[error("An unexpected error occurred: {0}")]
    Unexpected(String),
}

/// A convenience type alias for `Result<T, PortError>`.
pub type PortResult<T> = Result<T, PortError>;

//=========================================================================================
// Service Ports (Traits)
//=========================================================================================

/// Read/append access to the user's stored context and analysis history.
#[async_trait]
pub trait AnalysisStore: Send + Sync {
    async fn get_profile(&self, user_id: Uuid) -> PortResult<UserProfile>;

    /// Returns the most recently upserted goal.
    async fn get_goal(&self, user_id: Uuid) -> PortResult<Goal>;

    async fn get_allergens(&self, user_id: Uuid) -> PortResult<AllergenSet>;

    /// Returns the user's catalog for a slot. `NotFound` means the user has no catalog at all;
    /// an empty vector means the catalog exists but nothing is planned for this slot.
    async fn get_catalog(&self, user_id: Uuid, slot: Slot) -> PortResult<Vec<MenuItem>>;

    /// Appends a record. Never updates or deletes existing records.
    async fn append_analysis_record(&self, record: AnalysisRecord) -> PortResult<()>;

    /// Newest records first.
    async fn get_recent_analyses(
        &self,
        user_id: Uuid,
        limit: usize,
    ) -> PortResult<Vec<AnalysisRecord>>;
}

/// Everything the vision model is told about the user for one request.
#[derive(Debug, Clone, Serialize)]
pub struct EstimationContext {
    pub profile: UserProfile,
    pub goal: Goal,
    pub allergens: AllergenSet,
    pub slot: Slot,
    /// Slot-filtered and allergen-guarded; never contains unsafe items.
    pub candidates: Vec<MenuItem>,
}

#[async_trait]
pub trait MealEstimator: Send + Sync {
    /// Produces a raw, untrusted estimate for the referenced image.
    async fn estimate(
        &self,
        image_reference: &str,
        context: &EstimationContext,
    ) -> PortResult<serde_json::Value>;
}
