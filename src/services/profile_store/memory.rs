use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use tokio::sync::RwLock;

use crate::{
    error::AppResult,
    models::{GenreId, MovieId, ProfileDefaults, UserProfile, WatchEvent},
    services::profile_store::{profile_not_found, validate_rating, ProfileStore},
};

/// Process-local profile store
///
/// Each mutation runs under a single write lock, so set additions are atomic with
/// respect to concurrent writers.
#[derive(Clone, Default)]
pub struct InMemoryProfileStore {
    inner: Arc<RwLock<InMemoryProfileStoreInner>>,
}

#[derive(Default)]
struct InMemoryProfileStoreInner {
    users: HashMap<String, UserProfile>,
    /// Watch events per user id, one per movie
    watched_movies: HashMap<String, HashMap<MovieId, WatchEvent>>,
}

impl InMemoryProfileStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Applies a mutation to an existing profile under the write lock
    async fn update<F>(&self, user_id: &str, mutate: F) -> AppResult<()>
    where
        F: FnOnce(&mut UserProfile) + Send,
    {
        let mut inner = self.inner.write().await;
        let profile = inner
            .users
            .get_mut(user_id)
            .ok_or_else(|| profile_not_found(user_id))?;
        mutate(profile);
        Ok(())
    }
}

#[async_trait::async_trait]
impl ProfileStore for InMemoryProfileStore {
    async fn get_profile(&self, user_id: &str) -> AppResult<Option<UserProfile>> {
        let inner = self.inner.read().await;
        Ok(inner.users.get(user_id).cloned())
    }

    async fn create_profile(
        &self,
        user_id: &str,
        email: &str,
        defaults: ProfileDefaults,
    ) -> AppResult<UserProfile> {
        if let Some(rating) = defaults.preferred_rating {
            validate_rating(rating)?;
        }

        let profile = UserProfile::new(user_id, email, defaults);
        let mut inner = self.inner.write().await;
        inner.users.insert(user_id.to_string(), profile.clone());

        tracing::info!(user_id = %user_id, store = "memory", "Profile created");
        Ok(profile)
    }

    async fn update_preferred_genres(&self, user_id: &str, genres: Vec<GenreId>) -> AppResult<()> {
        self.update(user_id, |profile| profile.set_preferred_genres(genres))
            .await
    }

    async fn update_preferred_rating(&self, user_id: &str, rating: f64) -> AppResult<()> {
        validate_rating(rating)?;
        self.update(user_id, |profile| profile.set_preferred_rating(rating))
            .await
    }

    async fn add_watched_movie(
        &self,
        user_id: &str,
        movie_id: MovieId,
        rating: Option<f64>,
    ) -> AppResult<()> {
        if let Some(rating) = rating {
            validate_rating(rating)?;
        }

        let mut inner = self.inner.write().await;
        let profile = inner
            .users
            .get_mut(user_id)
            .ok_or_else(|| profile_not_found(user_id))?;
        profile.add_watched(movie_id);

        inner
            .watched_movies
            .entry(user_id.to_string())
            .or_default()
            .insert(
                movie_id,
                WatchEvent {
                    movie_id,
                    watched_at: Utc::now(),
                    rating,
                    review: None,
                },
            );

        Ok(())
    }

    async fn add_liked_movie(&self, user_id: &str, movie_id: MovieId) -> AppResult<()> {
        self.update(user_id, |profile| profile.add_liked(movie_id))
            .await
    }

    async fn watched_movie_events(&self, user_id: &str) -> AppResult<Vec<WatchEvent>> {
        let inner = self.inner.read().await;

        let mut events: Vec<WatchEvent> = inner
            .watched_movies
            .get(user_id)
            .map(|events| events.values().cloned().collect())
            .unwrap_or_default();
        events.sort_by_key(|event| event.watched_at);

        Ok(events)
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AppError;
    use tokio_test::assert_ok;

    async fn store_with_user(user_id: &str) -> InMemoryProfileStore {
        let store = InMemoryProfileStore::new();
        store
            .create_profile(user_id, "viewer@example.com", ProfileDefaults::default())
            .await
            .unwrap();
        store
    }

    #[tokio::test]
    async fn test_get_missing_profile_is_none() {
        let store = InMemoryProfileStore::new();
        assert!(store.get_profile("nobody").await.unwrap().is_none());
        assert!(store.watched_movie_events("nobody").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_create_and_get_profile() {
        let store = store_with_user("uid-1").await;
        let profile = store.get_profile("uid-1").await.unwrap().unwrap();
        assert_eq!(profile.email, "viewer@example.com");
        assert_eq!(profile.preferred_rating, 6.0);
    }

    #[tokio::test]
    async fn test_update_preferred_genres() {
        let store = store_with_user("uid-1").await;
        assert_ok!(store.update_preferred_genres("uid-1", vec![28, 12, 28]).await);

        let profile = store.get_profile("uid-1").await.unwrap().unwrap();
        assert_eq!(profile.preferred_genres, vec![28, 12]);
        assert!(profile.last_updated >= profile.created_at);
    }

    #[tokio::test]
    async fn test_update_preferred_rating_validates() {
        let store = store_with_user("uid-1").await;
        assert_ok!(store.update_preferred_rating("uid-1", 7.5).await);

        let result = store.update_preferred_rating("uid-1", 12.0).await;
        assert!(matches!(result, Err(AppError::InvalidInput(_))));

        let profile = store.get_profile("uid-1").await.unwrap().unwrap();
        assert_eq!(profile.preferred_rating, 7.5);
    }

    #[tokio::test]
    async fn test_add_watched_twice_keeps_one_id_and_one_event() {
        let store = store_with_user("uid-1").await;
        store.add_watched_movie("uid-1", 550, Some(8.0)).await.unwrap();
        store.add_watched_movie("uid-1", 550, Some(9.0)).await.unwrap();

        let profile = store.get_profile("uid-1").await.unwrap().unwrap();
        assert_eq!(profile.watched_movies.len(), 1);

        let events = store.watched_movie_events("uid-1").await.unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].rating, Some(9.0));
    }

    #[tokio::test]
    async fn test_watch_events_scoped_to_user() {
        let store = store_with_user("uid-1").await;
        store
            .create_profile("uid-10", "other@example.com", ProfileDefaults::default())
            .await
            .unwrap();
        store.add_watched_movie("uid-1", 1, None).await.unwrap();
        store.add_watched_movie("uid-10", 2, None).await.unwrap();

        let events = store.watched_movie_events("uid-1").await.unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].movie_id, 1);
    }

    #[tokio::test]
    async fn test_watch_events_not_shared_with_underscore_prefixed_user() {
        let store = store_with_user("alice").await;
        store
            .create_profile("alice_b", "b@example.com", ProfileDefaults::default())
            .await
            .unwrap();
        store.add_watched_movie("alice_b", 550, Some(9.0)).await.unwrap();

        assert!(store.watched_movie_events("alice").await.unwrap().is_empty());
        let profile = store.get_profile("alice").await.unwrap().unwrap();
        assert!(profile.watched_movies.is_empty());

        let events = store.watched_movie_events("alice_b").await.unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].movie_id, 550);
    }

    #[tokio::test]
    async fn test_add_liked_movie() {
        let store = store_with_user("uid-1").await;
        store.add_liked_movie("uid-1", 13).await.unwrap();
        store.add_liked_movie("uid-1", 13).await.unwrap();

        let profile = store.get_profile("uid-1").await.unwrap().unwrap();
        assert_eq!(profile.liked_movies.len(), 1);
    }

    #[tokio::test]
    async fn test_mutating_missing_profile_is_not_found() {
        let store = InMemoryProfileStore::new();
        let result = store.add_liked_movie("ghost", 1).await;
        assert!(matches!(result, Err(AppError::NotFound(_))));

        let result = store.add_watched_movie("ghost", 1, None).await;
        assert!(matches!(result, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_concurrent_adds_are_not_lost() {
        let store = store_with_user("uid-1").await;

        let mut tasks = Vec::new();
        for movie_id in 0..50u64 {
            let store = store.clone();
            tasks.push(tokio::spawn(async move {
                store.add_watched_movie("uid-1", movie_id, None).await
            }));
        }
        for task in tasks {
            task.await.unwrap().unwrap();
        }

        let profile = store.get_profile("uid-1").await.unwrap().unwrap();
        assert_eq!(profile.watched_movies.len(), 50);
    }
}
