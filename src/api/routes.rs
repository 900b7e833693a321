use axum::{
    middleware,
    routing::{get, post, put},
    Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use super::handlers;
use super::AppState;
use crate::middleware::{make_span_with_request_id, request_id_middleware};

/// Creates the main API router with all routes
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health_check))
        .nest("/api/v1", api_routes())
        .layer(TraceLayer::new_for_http().make_span_with(make_span_with_request_id))
        .layer(middleware::from_fn(request_id_middleware))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// API routes under /api/v1
fn api_routes() -> Router<AppState> {
    Router::new()
        // Signed-in user
        .route(
            "/me/profile",
            get(handlers::get_profile).post(handlers::create_profile),
        )
        .route("/me/genres", put(handlers::update_genres))
        .route("/me/rating", put(handlers::update_rating))
        .route(
            "/me/watched",
            get(handlers::get_watched).post(handlers::add_watched),
        )
        .route("/me/liked", post(handlers::add_liked))
        .route("/me/recommendations", get(handlers::get_recommendations))
        // Catalog
        .route("/movies/popular", get(handlers::popular_movies))
        .route("/movies/top-rated", get(handlers::top_rated_movies))
        .route("/movies/now-playing", get(handlers::now_playing_movies))
        .route("/movies/trending", get(handlers::trending_movies))
        .route("/movies/search", get(handlers::search_movies))
        .route("/movies/:id", get(handlers::movie_details))
        .route("/movies/:id/similar", get(handlers::similar_movies))
        // Genres
        .route("/genres", get(handlers::list_genres))
        .route("/genres/preview", get(handlers::genre_preview))
}
