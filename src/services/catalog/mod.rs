/// Movie catalog abstraction
///
/// The catalog is an external HTTP service returning paginated movie listings.
/// Everything in the crate talks to it through [`CatalogClient`] so the concrete
/// client can be swapped for a test double.
use crate::{
    error::AppResult,
    models::{Genre, GenreId, Movie, MovieId, MoviesPage},
};

pub mod tmdb;

pub use tmdb::TmdbCatalog;

/// Trait for movie catalog clients
///
/// Implementations raise immediately on failure: a configuration error when the
/// credential is unusable, an external API error on a non-success status, and an
/// HTTP client error on network or decode failures. No local recovery.
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait CatalogClient: Send + Sync {
    async fn popular_movies(&self, page: u32) -> AppResult<MoviesPage>;

    async fn top_rated_movies(&self, page: u32) -> AppResult<MoviesPage>;

    async fn now_playing_movies(&self, page: u32) -> AppResult<MoviesPage>;

    /// Movies trending this week
    async fn trending_movies(&self) -> AppResult<MoviesPage>;

    /// Movies of one genre, most popular first
    async fn movies_by_genre(&self, genre_id: GenreId, page: u32) -> AppResult<MoviesPage>;

    /// Movies the catalog considers similar to the given one
    async fn similar_movies(&self, movie_id: MovieId) -> AppResult<MoviesPage>;

    async fn movie_details(&self, movie_id: MovieId) -> AppResult<Movie>;

    /// Search movies by title
    ///
    /// An empty query is rejected without calling the catalog.
    async fn search_movies(&self, query: &str, page: u32) -> AppResult<MoviesPage>;

    /// Full list of catalog genres
    async fn genres(&self) -> AppResult<Vec<Genre>>;

    /// Client name for logging and debugging
    fn name(&self) -> &'static str;
}

/// Resolves a relative poster/backdrop fragment against the image base URL
pub fn image_url(image_base_url: &str, path: Option<&str>) -> Option<String> {
    path.filter(|p| !p.is_empty())
        .map(|p| format!("{}{}", image_base_url.trim_end_matches('/'), p))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_image_url_joins_fragment() {
        assert_eq!(
            image_url("https://image.tmdb.org/t/p/w500", Some("/abc.jpg")),
            Some("https://image.tmdb.org/t/p/w500/abc.jpg".to_string())
        );
    }

    #[test]
    fn test_image_url_trailing_slash() {
        assert_eq!(
            image_url("https://image.tmdb.org/t/p/w500/", Some("/abc.jpg")),
            Some("https://image.tmdb.org/t/p/w500/abc.jpg".to_string())
        );
    }

    #[test]
    fn test_image_url_missing_path() {
        assert_eq!(image_url("https://image.tmdb.org/t/p/w500", None), None);
        assert_eq!(image_url("https://image.tmdb.org/t/p/w500", Some("")), None);
    }
}
