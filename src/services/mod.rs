pub mod cluster_model;
pub mod providers;
pub mod recommendations;

pub use cluster_model::{ClusterPredictor, KMeansModel};
pub use providers::{CatalogProvider, SpotifyCatalog};
pub use recommendations::{RecommendationEngine, Resources, MAX_RECOMMENDATIONS};
