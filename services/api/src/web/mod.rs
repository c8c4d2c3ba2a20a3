pub mod rest;
pub mod state;

// Re-export the handlers so the binary can build the router from one place.
pub use rest::{analyze_meal_handler, health_handler, recent_analyses_handler};
