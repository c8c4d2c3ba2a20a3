pub mod db;
pub mod estimator_llm;

pub use db::DbAdapter;
pub use estimator_llm::OpenAiMealEstimator;
