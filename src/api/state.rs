use std::sync::Arc;

use crate::services::RecommendationEngine;

/// Shared application state
///
/// Built once at startup; everything inside is read-only or internally
/// synchronized, so handlers only ever clone the `Arc`.
#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<RecommendationEngine>,
    /// Songs returned when a request does not ask for a specific count
    pub default_count: usize,
}

impl AppState {
    pub fn new(engine: RecommendationEngine, default_count: usize) -> Self {
        Self {
            engine: Arc::new(engine),
            default_count,
        }
    }
}
