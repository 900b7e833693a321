pub mod catalog;
pub mod filters;
pub mod profile_store;
pub mod recommendations;

pub use catalog::{CatalogClient, TmdbCatalog};
pub use profile_store::{InMemoryProfileStore, ProfileStore, RedisProfileStore};
pub use recommendations::{FailurePolicy, RecommendationAggregator, ShuffleMode};
