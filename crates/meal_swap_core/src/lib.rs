pub mod allergen;
pub mod catalog;
pub mod domain;
pub mod error;
pub mod orchestrator;
pub mod ports;
pub mod scoring;
pub mod selector;
pub mod validator;

pub use allergen::{guard, is_safe, SafeCandidates};
pub use catalog::filter_slot;
pub use domain::{
    AllergenSet, AnalysisOutcome, AnalysisRecord, AnalysisRequest, AnalysisResponse, DayOfWeek,
    DomainError, Gender, Goal, MealEstimate, MealType, MenuItem, Nutrient, NutrientProfile,
    Nutrients, PersistenceStatus, Slot, SwapSuggestion, UserProfile,
};
pub use error::AnalysisError;
pub use orchestrator::{AnalysisStage, EngineSettings, MealSwapEngine, MAX_ESTIMATOR_RETRIES};
pub use ports::{AnalysisStore, EstimationContext, MealEstimator, PortError, PortResult};
pub use selector::select;
pub use validator::{validate, ValidationError};
