use std::sync::Arc;

use crate::config::Config;
use crate::recommend::scorer::Recommender;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    /// Pluggable ranking backend over the read-only artifact bundle.
    /// Default: CosineRecommender.
    pub recommender: Arc<dyn Recommender>,
}
