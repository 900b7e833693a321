/// Profile store abstraction
///
/// Profiles live in an external document store keyed by user id. Watched and liked
/// ids are sets: adding an id is an atomic add-to-set at the storage boundary, never a
/// read-modify-write done by callers. Scalar fields are last-write-wins.
use crate::{
    error::{AppError, AppResult},
    models::{user_profile::is_valid_rating, GenreId, MovieId, ProfileDefaults, UserProfile, WatchEvent},
};

pub mod memory;
pub mod redis_store;

pub use memory::InMemoryProfileStore;
pub use redis_store::RedisProfileStore;

/// Trait for user profile stores
///
/// Every mutation bumps `last_updated`. Mutating a profile that does not exist fails
/// with `NotFound`; connectivity failures surface as store errors.
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait ProfileStore: Send + Sync {
    /// Loads a profile, `None` if the user never completed onboarding
    async fn get_profile(&self, user_id: &str) -> AppResult<Option<UserProfile>>;

    /// Writes a fresh profile, replacing any previous document for the user
    async fn create_profile(
        &self,
        user_id: &str,
        email: &str,
        defaults: ProfileDefaults,
    ) -> AppResult<UserProfile>;

    async fn update_preferred_genres(&self, user_id: &str, genres: Vec<GenreId>) -> AppResult<()>;

    async fn update_preferred_rating(&self, user_id: &str, rating: f64) -> AppResult<()>;

    /// Adds to the watched set and records a timestamped watch event
    async fn add_watched_movie(
        &self,
        user_id: &str,
        movie_id: MovieId,
        rating: Option<f64>,
    ) -> AppResult<()>;

    async fn add_liked_movie(&self, user_id: &str, movie_id: MovieId) -> AppResult<()>;

    /// All watch events recorded for the user
    async fn watched_movie_events(&self, user_id: &str) -> AppResult<Vec<WatchEvent>>;

    /// Store name for logging and debugging
    fn name(&self) -> &'static str;
}

/// Key of a watch event document: `{userId}_{movieId}`
pub fn watch_event_key(user_id: &str, movie_id: MovieId) -> String {
    format!("{}_{}", user_id, movie_id)
}

pub(crate) fn validate_rating(rating: f64) -> AppResult<()> {
    if is_valid_rating(rating) {
        Ok(())
    } else {
        Err(AppError::InvalidInput(format!(
            "Rating must be between 0 and 10, got {}",
            rating
        )))
    }
}

pub(crate) fn profile_not_found(user_id: &str) -> AppError {
    AppError::NotFound(format!("No profile for user {}", user_id))
}
