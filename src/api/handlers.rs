use std::collections::BTreeMap;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::error::{AppError, AppResult};
use crate::models::{
    Genre, GenreId, Movie, MovieId, MoviesPage, ProfileDefaults, RecommendationSection,
    UserProfile, WatchEvent,
};
use crate::services::catalog::image_url;
use crate::session::CurrentUser;

use super::AppState;

// Request/Response types

fn first_page() -> u32 {
    1
}

#[derive(Debug, Deserialize)]
pub struct PageQuery {
    #[serde(default = "first_page")]
    pub page: u32,
}

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    #[serde(default)]
    pub q: String,
    #[serde(default = "first_page")]
    pub page: u32,
}

/// Comma separated genre ids, e.g. `ids=28,12`
#[derive(Debug, Deserialize)]
pub struct GenreIdsQuery {
    #[serde(default)]
    pub ids: String,
}

#[derive(Debug, Deserialize)]
pub struct UpdateGenresRequest {
    pub genres: Vec<GenreId>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateRatingRequest {
    pub rating: f64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WatchedRequest {
    pub movie_id: MovieId,
    #[serde(default)]
    pub rating: Option<f64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LikedRequest {
    pub movie_id: MovieId,
}

/// Movie with poster and backdrop resolved to absolute URLs
#[derive(Debug, Serialize)]
pub struct MovieResponse {
    #[serde(flatten)]
    pub movie: Movie,
    pub poster_url: Option<String>,
    pub backdrop_url: Option<String>,
}

impl MovieResponse {
    fn new(movie: Movie, image_base_url: &str) -> Self {
        Self {
            poster_url: image_url(image_base_url, movie.poster_path.as_deref()),
            backdrop_url: image_url(image_base_url, movie.backdrop_path.as_deref()),
            movie,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct RecommendationsResponse {
    pub sections: Vec<RecommendationSection>,
}

fn validate_page(page: u32) -> AppResult<u32> {
    if page == 0 {
        Err(AppError::InvalidInput("Page numbers start at 1".to_string()))
    } else {
        Ok(page)
    }
}

fn parse_genre_ids(ids: &str) -> AppResult<Vec<GenreId>> {
    let genre_ids = ids
        .split(',')
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .map(|id| {
            id.parse::<GenreId>()
                .map_err(|_| AppError::InvalidInput(format!("Invalid genre id: {}", id)))
        })
        .collect::<AppResult<Vec<_>>>()?;

    if genre_ids.is_empty() {
        return Err(AppError::InvalidInput(
            "At least one genre id is required".to_string(),
        ));
    }

    Ok(genre_ids)
}

async fn load_profile(state: &AppState, user: &CurrentUser) -> AppResult<UserProfile> {
    state
        .profiles
        .get_profile(&user.id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("No profile for user {}", user.id)))
}

// Handlers

/// Health check endpoint
pub async fn health_check() -> (StatusCode, Json<Value>) {
    (StatusCode::OK, Json(json!({ "status": "healthy" })))
}

/// Get the signed-in user's profile
pub async fn get_profile(
    State(state): State<AppState>,
    user: CurrentUser,
) -> AppResult<Json<UserProfile>> {
    load_profile(&state, &user).await.map(Json)
}

/// Create the signed-in user's profile
///
/// An existing profile is returned unchanged.
pub async fn create_profile(
    State(state): State<AppState>,
    user: CurrentUser,
    defaults: Option<Json<ProfileDefaults>>,
) -> AppResult<(StatusCode, Json<UserProfile>)> {
    if let Some(existing) = state.profiles.get_profile(&user.id).await? {
        return Ok((StatusCode::OK, Json(existing)));
    }

    let defaults = defaults.map(|Json(d)| d).unwrap_or_default();
    let profile = state
        .profiles
        .create_profile(&user.id, &user.email, defaults)
        .await?;

    Ok((StatusCode::CREATED, Json(profile)))
}

/// Replace the preferred genres
pub async fn update_genres(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(request): Json<UpdateGenresRequest>,
) -> AppResult<StatusCode> {
    state
        .profiles
        .update_preferred_genres(&user.id, request.genres)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Set the genre floor
pub async fn update_rating(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(request): Json<UpdateRatingRequest>,
) -> AppResult<StatusCode> {
    state
        .profiles
        .update_preferred_rating(&user.id, request.rating)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Mark a movie as watched
pub async fn add_watched(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(request): Json<WatchedRequest>,
) -> AppResult<StatusCode> {
    state
        .profiles
        .add_watched_movie(&user.id, request.movie_id, request.rating)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Watch history, oldest first
pub async fn get_watched(
    State(state): State<AppState>,
    user: CurrentUser,
) -> AppResult<Json<Vec<WatchEvent>>> {
    let events = state.profiles.watched_movie_events(&user.id).await?;
    Ok(Json(events))
}

pub async fn add_liked(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(request): Json<LikedRequest>,
) -> AppResult<StatusCode> {
    state
        .profiles
        .add_liked_movie(&user.id, request.movie_id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Personalized feed for the signed-in user
///
/// Users without a profile or without preferred genres are sent back to onboarding;
/// the feed is only built once genres have been picked.
pub async fn get_recommendations(
    State(state): State<AppState>,
    user: CurrentUser,
) -> AppResult<Json<RecommendationsResponse>> {
    let profile = state
        .profiles
        .get_profile(&user.id)
        .await?
        .ok_or_else(|| AppError::OnboardingRequired("Create a profile first".to_string()))?;

    if profile.preferred_genres.is_empty() {
        return Err(AppError::OnboardingRequired(
            "Pick at least one genre".to_string(),
        ));
    }

    let sections = state
        .recommendations
        .personalized_recommendations(&profile)
        .await;

    Ok(Json(RecommendationsResponse { sections }))
}

pub async fn popular_movies(
    State(state): State<AppState>,
    Query(query): Query<PageQuery>,
) -> AppResult<Json<MoviesPage>> {
    let page = validate_page(query.page)?;
    Ok(Json(state.catalog.popular_movies(page).await?))
}

pub async fn top_rated_movies(
    State(state): State<AppState>,
    Query(query): Query<PageQuery>,
) -> AppResult<Json<MoviesPage>> {
    let page = validate_page(query.page)?;
    Ok(Json(state.catalog.top_rated_movies(page).await?))
}

pub async fn now_playing_movies(
    State(state): State<AppState>,
    Query(query): Query<PageQuery>,
) -> AppResult<Json<MoviesPage>> {
    let page = validate_page(query.page)?;
    Ok(Json(state.catalog.now_playing_movies(page).await?))
}

pub async fn trending_movies(State(state): State<AppState>) -> AppResult<Json<MoviesPage>> {
    Ok(Json(state.catalog.trending_movies().await?))
}

/// Search movies by title
pub async fn search_movies(
    State(state): State<AppState>,
    Query(query): Query<SearchQuery>,
) -> AppResult<Json<MoviesPage>> {
    let page = validate_page(query.page)?;
    Ok(Json(state.catalog.search_movies(&query.q, page).await?))
}

/// Movie details with absolute image URLs
pub async fn movie_details(
    State(state): State<AppState>,
    Path(movie_id): Path<MovieId>,
) -> AppResult<Json<MovieResponse>> {
    let movie = state.catalog.movie_details(movie_id).await?;
    Ok(Json(MovieResponse::new(movie, &state.image_base_url)))
}

/// Similar movies, filtered by the signed-in user's preferences when there is one
pub async fn similar_movies(
    State(state): State<AppState>,
    Path(movie_id): Path<MovieId>,
    user: Option<CurrentUser>,
) -> AppResult<Json<Vec<Movie>>> {
    let profile = match &user {
        Some(user) => state.profiles.get_profile(&user.id).await?,
        None => None,
    };

    let movies = state
        .recommendations
        .similar_movies(movie_id, profile.as_ref())
        .await;

    Ok(Json(movies))
}

pub async fn list_genres(State(state): State<AppState>) -> AppResult<Json<Vec<Genre>>> {
    Ok(Json(state.catalog.genres().await?))
}

/// A few movies per genre for the genre picker
pub async fn genre_preview(
    State(state): State<AppState>,
    Query(query): Query<GenreIdsQuery>,
) -> AppResult<Json<BTreeMap<GenreId, Vec<Movie>>>> {
    let genre_ids = parse_genre_ids(&query.ids)?;
    let previews = state
        .recommendations
        .genre_selection_movies(&genre_ids)
        .await;
    Ok(Json(previews))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use crate::services::catalog::{CatalogClient, MockCatalogClient};
    use crate::services::profile_store::MockProfileStore;
    use crate::services::recommendations::{RecommendationAggregator, ShuffleMode};

    fn user() -> CurrentUser {
        CurrentUser {
            id: "uid-1".to_string(),
            email: "viewer@example.com".to_string(),
        }
    }

    /// Catalog that fails the test if the feed touches it
    fn untouched_catalog() -> MockCatalogClient {
        let mut catalog = MockCatalogClient::new();
        catalog.expect_movies_by_genre().never();
        catalog.expect_trending_movies().never();
        catalog.expect_popular_movies().never();
        catalog.expect_top_rated_movies().never();
        catalog
    }

    fn state_with(catalog: MockCatalogClient, profiles: MockProfileStore) -> AppState {
        let catalog: Arc<dyn CatalogClient> = Arc::new(catalog);
        let aggregator =
            RecommendationAggregator::new(catalog.clone()).with_shuffle(ShuffleMode::Disabled);
        AppState::new(
            catalog,
            Arc::new(profiles),
            aggregator,
            "https://image.tmdb.org/t/p/w500",
        )
    }

    #[tokio::test]
    async fn test_recommendations_without_profile_skip_catalog() {
        let mut profiles = MockProfileStore::new();
        profiles.expect_get_profile().times(1).returning(|user_id| {
            assert_eq!(user_id, "uid-1");
            Ok(None)
        });

        let state = state_with(untouched_catalog(), profiles);
        let result = get_recommendations(State(state), user()).await;

        assert!(matches!(result, Err(AppError::OnboardingRequired(_))));
    }

    #[tokio::test]
    async fn test_recommendations_without_genres_skip_catalog() {
        let mut profiles = MockProfileStore::new();
        profiles.expect_get_profile().returning(|user_id| {
            Ok(Some(UserProfile::new(
                user_id,
                "viewer@example.com",
                ProfileDefaults::default(),
            )))
        });

        let state = state_with(untouched_catalog(), profiles);
        let result = get_recommendations(State(state), user()).await;

        assert!(matches!(result, Err(AppError::OnboardingRequired(_))));
    }

    #[tokio::test]
    async fn test_create_profile_keeps_existing() {
        let mut profiles = MockProfileStore::new();
        profiles.expect_get_profile().returning(|user_id| {
            Ok(Some(UserProfile::new(
                user_id,
                "viewer@example.com",
                ProfileDefaults {
                    preferred_genres: Some(vec![28]),
                    ..Default::default()
                },
            )))
        });
        profiles.expect_create_profile().never();

        let state = state_with(MockCatalogClient::new(), profiles);
        let (status, Json(profile)) = create_profile(State(state), user(), None).await.unwrap();

        assert_eq!(status, StatusCode::OK);
        assert_eq!(profile.preferred_genres, vec![28]);
    }

    #[tokio::test]
    async fn test_store_failure_propagates() {
        let mut profiles = MockProfileStore::new();
        profiles
            .expect_get_profile()
            .returning(|_| Err(AppError::Internal("store unreachable".to_string())));
        profiles.expect_create_profile().never();

        let state = state_with(MockCatalogClient::new(), profiles);
        let result = create_profile(State(state), user(), None).await;

        assert!(matches!(result, Err(AppError::Internal(_))));
    }

    #[test]
    fn test_parse_genre_ids() {
        assert_eq!(parse_genre_ids("28,12").unwrap(), vec![28, 12]);
        assert_eq!(parse_genre_ids(" 28 , 12 ,").unwrap(), vec![28, 12]);
    }

    #[test]
    fn test_parse_genre_ids_rejects_garbage() {
        assert!(matches!(parse_genre_ids("28,abc"), Err(AppError::InvalidInput(_))));
        assert!(matches!(parse_genre_ids(""), Err(AppError::InvalidInput(_))));
    }

    #[test]
    fn test_validate_page() {
        assert_eq!(validate_page(3).unwrap(), 3);
        assert!(validate_page(0).is_err());
    }

    #[test]
    fn test_movie_response_resolves_images() {
        let movie = Movie {
            id: 603,
            title: "The Matrix".to_string(),
            overview: String::new(),
            poster_path: Some("/matrix.jpg".to_string()),
            backdrop_path: None,
            vote_average: 8.2,
            release_date: Some("1999-03-30".to_string()),
            genre_ids: vec![28, 878],
        };

        let response = MovieResponse::new(movie, "https://image.tmdb.org/t/p/w500");
        let value = serde_json::to_value(&response).unwrap();

        assert_eq!(value["id"], 603);
        assert_eq!(
            value["poster_url"],
            "https://image.tmdb.org/t/p/w500/matrix.jpg"
        );
        assert!(value["backdrop_url"].is_null());
    }
}
