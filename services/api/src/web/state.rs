//! services/api/src/web/state.rs
//!
//! Defines the application's shared state.

use meal_swap_core::MealSwapEngine;

/// The shared application state, created once at startup and passed to all handlers.
/// The engine owns the store and estimator adapters.
#[derive(Clone)]
pub struct AppState {
    pub engine: MealSwapEngine,
}
