/// Redis-backed profile store
///
/// Layout:
/// - `users:{id}`            hash of scalar profile fields (field-level last-write-wins)
/// - `users:{id}:watched`    set of watched movie ids
/// - `users:{id}:liked`      set of liked movie ids
/// - `watched_movies:{id}_{movieId}`  JSON watch event
///
/// Set additions go through `SADD` inside a `MULTI` pipeline together with the
/// `last_updated` bump, so concurrent writers never lose each other's ids.
use std::collections::HashMap;

use chrono::{DateTime, Utc};
use redis::{aio::ConnectionManager, AsyncCommands, Client};

use crate::{
    error::{AppError, AppResult},
    models::{GenreId, MovieId, ProfileDefaults, UserProfile, WatchEvent},
    services::profile_store::{profile_not_found, validate_rating, watch_event_key, ProfileStore},
};

const STORE_NAME: &str = "redis";

#[derive(Clone)]
pub struct RedisProfileStore {
    conn: ConnectionManager,
}

impl RedisProfileStore {
    /// Connects to Redis and keeps a self-reconnecting connection
    pub async fn connect(redis_url: &str) -> AppResult<Self> {
        let client = Client::open(redis_url)?;
        let conn = ConnectionManager::new(client).await?;

        tracing::info!(store = STORE_NAME, "Connected to profile store");
        Ok(Self { conn })
    }

    async fn ensure_exists(&self, user_id: &str) -> AppResult<()> {
        let mut conn = self.conn.clone();
        let exists: bool = conn.exists(profile_key(user_id)).await?;
        if exists {
            Ok(())
        } else {
            Err(profile_not_found(user_id))
        }
    }

    /// Sets scalar fields and bumps `last_updated` in one round trip
    async fn set_fields(&self, user_id: &str, fields: Vec<(&'static str, String)>) -> AppResult<()> {
        self.ensure_exists(user_id).await?;

        let mut fields = fields;
        fields.push(("last_updated", Utc::now().to_rfc3339()));

        let mut conn = self.conn.clone();
        let _: () = conn.hset_multiple(profile_key(user_id), &fields[..]).await?;
        Ok(())
    }

    /// Adds a movie id to one of the profile's sets
    async fn add_to_set(&self, user_id: &str, set_key: String, movie_id: MovieId) -> AppResult<()> {
        self.ensure_exists(user_id).await?;

        let mut conn = self.conn.clone();
        let _: () = redis::pipe()
            .atomic()
            .sadd(set_key, movie_id)
            .ignore()
            .hset(profile_key(user_id), "last_updated", Utc::now().to_rfc3339())
            .ignore()
            .query_async(&mut conn)
            .await?;
        Ok(())
    }
}

fn profile_key(user_id: &str) -> String {
    format!("users:{}", user_id)
}

fn watched_key(user_id: &str) -> String {
    format!("users:{}:watched", user_id)
}

fn liked_key(user_id: &str) -> String {
    format!("users:{}:liked", user_id)
}

fn watch_event_doc_key(user_id: &str, movie_id: MovieId) -> String {
    format!("watched_movies:{}", watch_event_key(user_id, movie_id))
}

/// Flattens the scalar part of a profile into hash fields
fn profile_to_fields(profile: &UserProfile) -> AppResult<Vec<(&'static str, String)>> {
    Ok(vec![
        ("id", profile.id.clone()),
        ("email", profile.email.clone()),
        ("preferred_genres", encode_json(&profile.preferred_genres)?),
        ("favorite_actors", encode_json(&profile.favorite_actors)?),
        ("preferred_rating", profile.preferred_rating.to_string()),
        ("created_at", profile.created_at.to_rfc3339()),
        ("last_updated", profile.last_updated.to_rfc3339()),
    ])
}

/// Rebuilds a profile from its hash fields and id sets
fn profile_from_fields(
    user_id: &str,
    fields: &HashMap<String, String>,
    watched: Vec<MovieId>,
    liked: Vec<MovieId>,
) -> AppResult<UserProfile> {
    let field = |name: &str| {
        fields
            .get(name)
            .ok_or_else(|| AppError::Internal(format!("Profile {} missing field {}", user_id, name)))
    };

    let preferred_rating = field("preferred_rating")?
        .parse::<f64>()
        .map_err(|e| AppError::Internal(format!("Invalid preferred_rating: {}", e)))?;

    Ok(UserProfile {
        id: user_id.to_string(),
        email: field("email")?.clone(),
        preferred_genres: decode_json(field("preferred_genres")?)?,
        watched_movies: watched.into_iter().collect(),
        liked_movies: liked.into_iter().collect(),
        favorite_actors: fields
            .get("favorite_actors")
            .map(|raw| decode_json(raw))
            .transpose()?
            .unwrap_or_default(),
        preferred_rating,
        created_at: parse_timestamp(field("created_at")?)?,
        last_updated: parse_timestamp(field("last_updated")?)?,
    })
}

fn parse_timestamp(raw: &str) -> AppResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|ts| ts.with_timezone(&Utc))
        .map_err(|e| AppError::Internal(format!("Invalid timestamp {}: {}", raw, e)))
}

fn encode_json<T: serde::Serialize>(value: &T) -> AppResult<String> {
    serde_json::to_string(value)
        .map_err(|e| AppError::Internal(format!("Profile serialization error: {}", e)))
}

fn decode_json<T: serde::de::DeserializeOwned>(raw: &str) -> AppResult<T> {
    serde_json::from_str(raw)
        .map_err(|e| AppError::Internal(format!("Profile deserialization error: {}", e)))
}

#[async_trait::async_trait]
impl ProfileStore for RedisProfileStore {
    async fn get_profile(&self, user_id: &str) -> AppResult<Option<UserProfile>> {
        let mut conn = self.conn.clone();
        let fields: HashMap<String, String> = conn.hgetall(profile_key(user_id)).await?;

        if fields.is_empty() {
            return Ok(None);
        }

        let watched: Vec<MovieId> = conn.smembers(watched_key(user_id)).await?;
        let liked: Vec<MovieId> = conn.smembers(liked_key(user_id)).await?;

        profile_from_fields(user_id, &fields, watched, liked).map(Some)
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
        let fields = profile_to_fields(&profile)?;

        let mut pipe = redis::pipe();
        pipe.atomic()
            .del(profile_key(user_id))
            .ignore()
            .del(watched_key(user_id))
            .ignore()
            .del(liked_key(user_id))
            .ignore()
            .hset_multiple(profile_key(user_id), &fields[..])
            .ignore();

        if !profile.watched_movies.is_empty() {
            let ids: Vec<MovieId> = profile.watched_movies.iter().copied().collect();
            pipe.sadd(watched_key(user_id), ids).ignore();
        }
        if !profile.liked_movies.is_empty() {
            let ids: Vec<MovieId> = profile.liked_movies.iter().copied().collect();
            pipe.sadd(liked_key(user_id), ids).ignore();
        }

        let mut conn = self.conn.clone();
        let _: () = pipe.query_async(&mut conn).await?;

        tracing::info!(user_id = %user_id, store = STORE_NAME, "Profile created");
        Ok(profile)
    }

    async fn update_preferred_genres(&self, user_id: &str, genres: Vec<GenreId>) -> AppResult<()> {
        let genres = crate::models::user_profile::dedup_genres(genres);
        self.set_fields(user_id, vec![("preferred_genres", encode_json(&genres)?)])
            .await
    }

    async fn update_preferred_rating(&self, user_id: &str, rating: f64) -> AppResult<()> {
        validate_rating(rating)?;
        self.set_fields(user_id, vec![("preferred_rating", rating.to_string())])
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
        self.ensure_exists(user_id).await?;

        let event = WatchEvent {
            movie_id,
            watched_at: Utc::now(),
            rating,
            review: None,
        };

        let mut conn = self.conn.clone();
        let _: () = redis::pipe()
            .atomic()
            .sadd(watched_key(user_id), movie_id)
            .ignore()
            .hset(profile_key(user_id), "last_updated", event.watched_at.to_rfc3339())
            .ignore()
            .set(watch_event_doc_key(user_id, movie_id), encode_json(&event)?)
            .ignore()
            .query_async(&mut conn)
            .await?;

        tracing::debug!(user_id = %user_id, movie_id = movie_id, "Watched movie recorded");
        Ok(())
    }

    async fn add_liked_movie(&self, user_id: &str, movie_id: MovieId) -> AppResult<()> {
        self.add_to_set(user_id, liked_key(user_id), movie_id).await
    }

    async fn watched_movie_events(&self, user_id: &str) -> AppResult<Vec<WatchEvent>> {
        let mut conn = self.conn.clone();
        let watched: Vec<MovieId> = conn.smembers(watched_key(user_id)).await?;

        if watched.is_empty() {
            return Ok(Vec::new());
        }

        let keys: Vec<String> = watched
            .iter()
            .map(|movie_id| watch_event_doc_key(user_id, *movie_id))
            .collect();
        let docs: Vec<Option<String>> = conn.mget(keys).await?;

        let mut events = docs
            .into_iter()
            .flatten()
            .map(|raw| decode_json::<WatchEvent>(&raw))
            .collect::<AppResult<Vec<_>>>()?;
        events.sort_by_key(|event| event.watched_at);

        Ok(events)
    }

    fn name(&self) -> &'static str {
        STORE_NAME
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keys() {
        assert_eq!(profile_key("uid-1"), "users:uid-1");
        assert_eq!(watched_key("uid-1"), "users:uid-1:watched");
        assert_eq!(liked_key("uid-1"), "users:uid-1:liked");
        assert_eq!(watch_event_doc_key("uid-1", 550), "watched_movies:uid-1_550");
    }

    #[test]
    fn test_profile_fields_round_trip() {
        let defaults = ProfileDefaults {
            preferred_genres: Some(vec![28, 12]),
            favorite_actors: Some(vec!["Keanu Reeves".to_string()]),
            preferred_rating: Some(7.5),
            ..Default::default()
        };
        let profile = UserProfile::new("uid-1", "viewer@example.com", defaults);

        let fields: HashMap<String, String> = profile_to_fields(&profile)
            .unwrap()
            .into_iter()
            .map(|(k, v)| (k.to_string(), v))
            .collect();
        let restored = profile_from_fields("uid-1", &fields, vec![550, 13], vec![13]).unwrap();

        assert_eq!(restored.email, profile.email);
        assert_eq!(restored.preferred_genres, vec![28, 12]);
        assert_eq!(restored.favorite_actors, vec!["Keanu Reeves".to_string()]);
        assert_eq!(restored.preferred_rating, 7.5);
        assert_eq!(restored.watched_movies.len(), 2);
        assert!(restored.liked_movies.contains(&13));
        assert_eq!(restored.created_at, profile.created_at);
    }

    #[test]
    fn test_profile_from_fields_missing_field() {
        let mut fields = HashMap::new();
        fields.insert("email".to_string(), "viewer@example.com".to_string());

        let result = profile_from_fields("uid-1", &fields, vec![], vec![]);
        assert!(matches!(result, Err(AppError::Internal(_))));
    }

    #[test]
    fn test_parse_timestamp_invalid() {
        assert!(parse_timestamp("yesterday").is_err());
        assert!(parse_timestamp("2024-05-01T10:00:00+00:00").is_ok());
    }

    // Requires a running Redis at REDIS_URL (default redis://localhost:6379)
    #[tokio::test]
    #[ignore]
    async fn test_redis_store_add_watched_is_set_add() {
        let url = std::env::var("REDIS_URL").unwrap_or_else(|_| "redis://localhost:6379".to_string());
        let store = RedisProfileStore::connect(&url).await.unwrap();
        let user_id = format!("test-{}", uuid::Uuid::new_v4());

        store
            .create_profile(&user_id, "viewer@example.com", ProfileDefaults::default())
            .await
            .unwrap();
        store.add_watched_movie(&user_id, 550, Some(8.0)).await.unwrap();
        store.add_watched_movie(&user_id, 550, None).await.unwrap();

        let profile = store.get_profile(&user_id).await.unwrap().unwrap();
        assert_eq!(profile.watched_movies.len(), 1);
        assert_eq!(store.watched_movie_events(&user_id).await.unwrap().len(), 1);
    }
}
