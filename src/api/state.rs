use std::sync::Arc;

use crate::services::{
    catalog::CatalogClient, profile_store::ProfileStore, recommendations::RecommendationAggregator,
};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub catalog: Arc<dyn CatalogClient>,
    pub profiles: Arc<dyn ProfileStore>,
    pub recommendations: Arc<RecommendationAggregator>,
    /// Base URL poster and backdrop paths are resolved against
    pub image_base_url: String,
}

impl AppState {
    /// Bundles already-built services; `recommendations` should share `catalog`
    pub fn new(
        catalog: Arc<dyn CatalogClient>,
        profiles: Arc<dyn ProfileStore>,
        recommendations: RecommendationAggregator,
        image_base_url: impl Into<String>,
    ) -> Self {
        Self {
            catalog,
            profiles,
            recommendations: Arc::new(recommendations),
            image_base_url: image_base_url.into(),
        }
    }
}
