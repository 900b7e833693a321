/// TMDB-compatible catalog client
///
/// Issues authenticated GET requests against the catalog's v3 REST API. The API key
/// travels as the `api_key` query parameter on every request.
///
/// Endpoints used:
/// - Listings: /movie/popular, /movie/top_rated, /movie/now_playing
/// - Trending: /trending/movie/week
/// - By genre: /discover/movie?with_genres={id}
/// - Similar:  /movie/{id}/similar
/// - Details:  /movie/{id}
/// - Search:   /search/movie
/// - Genres:   /genre/movie/list
use crate::{
    config::{is_api_key_usable, Config},
    error::{AppError, AppResult},
    models::{ApiGenreList, ApiMovieDetails, Genre, GenreId, Movie, MovieId, MoviesPage},
    services::catalog::CatalogClient,
};
use reqwest::{Client as HttpClient, StatusCode};
use serde::de::DeserializeOwned;
use std::time::Duration;

const CLIENT_NAME: &str = "tmdb";

#[derive(Clone)]
pub struct TmdbCatalog {
    http_client: HttpClient,
    api_key: Option<String>,
    api_url: String,
}

impl TmdbCatalog {
    /// Creates a catalog client with a per-request timeout
    pub fn new(api_key: Option<String>, api_url: String, timeout: Duration) -> AppResult<Self> {
        let http_client = HttpClient::builder().timeout(timeout).build()?;

        Ok(Self {
            http_client,
            api_key,
            api_url: api_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn from_config(config: &Config) -> AppResult<Self> {
        Self::new(
            config.catalog_api_key.clone(),
            config.catalog_api_url.clone(),
            Duration::from_secs(config.catalog_timeout_secs),
        )
    }

    /// Whether a usable API key is present
    fn is_configured(&self) -> bool {
        is_api_key_usable(self.api_key.as_deref())
    }

    /// Returns the API key or fails before any network call is made
    fn api_key(&self) -> AppResult<&str> {
        match self.api_key.as_deref() {
            Some(key) if self.is_configured() => Ok(key.trim()),
            _ => Err(AppError::Configuration(
                "Catalog API key not configured. Set CATALOG_API_KEY".to_string(),
            )),
        }
    }

    /// Performs a GET request and decodes the JSON body
    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        params: &[(&str, String)],
    ) -> AppResult<T> {
        let api_key = self.api_key()?;
        let url = format!("{}{}", self.api_url, path);

        let response = self
            .http_client
            .get(&url)
            .query(&[("api_key", api_key)])
            .query(params)
            .send()
            .await?;

        if response.status() == StatusCode::NOT_FOUND {
            tracing::debug!(path = %path, provider = CLIENT_NAME, "Catalog resource not found");
            return Err(AppError::NotFound(format!("Catalog has no resource at {}", path)));
        }

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            tracing::error!(
                path = %path,
                status = %status,
                provider = CLIENT_NAME,
                "Catalog request failed"
            );
            return Err(AppError::ExternalApi(format!(
                "Catalog API returned status {}: {}",
                status, body
            )));
        }

        let decoded: T = response.json().await?;
        tracing::debug!(path = %path, provider = CLIENT_NAME, "Catalog request completed");

        Ok(decoded)
    }

    async fn listing(&self, path: &str, page: u32) -> AppResult<MoviesPage> {
        self.get_json(path, &[("page", page.to_string())]).await
    }
}

#[async_trait::async_trait]
impl CatalogClient for TmdbCatalog {
    async fn popular_movies(&self, page: u32) -> AppResult<MoviesPage> {
        self.listing("/movie/popular", page).await
    }

    async fn top_rated_movies(&self, page: u32) -> AppResult<MoviesPage> {
        self.listing("/movie/top_rated", page).await
    }

    async fn now_playing_movies(&self, page: u32) -> AppResult<MoviesPage> {
        self.listing("/movie/now_playing", page).await
    }

    async fn trending_movies(&self) -> AppResult<MoviesPage> {
        self.get_json("/trending/movie/week", &[]).await
    }

    async fn movies_by_genre(&self, genre_id: GenreId, page: u32) -> AppResult<MoviesPage> {
        self.get_json(
            "/discover/movie",
            &[
                ("with_genres", genre_id.to_string()),
                ("sort_by", "popularity.desc".to_string()),
                ("page", page.to_string()),
            ],
        )
        .await
    }

    async fn similar_movies(&self, movie_id: MovieId) -> AppResult<MoviesPage> {
        self.get_json(&format!("/movie/{}/similar", movie_id), &[])
            .await
    }

    async fn movie_details(&self, movie_id: MovieId) -> AppResult<Movie> {
        let details: ApiMovieDetails = self.get_json(&format!("/movie/{}", movie_id), &[]).await?;
        Ok(Movie::from(details))
    }

    async fn search_movies(&self, query: &str, page: u32) -> AppResult<MoviesPage> {
        if query.trim().is_empty() {
            return Err(AppError::InvalidInput(
                "Search query cannot be empty".to_string(),
            ));
        }

        let results: MoviesPage = self
            .get_json(
                "/search/movie",
                &[("query", query.to_string()), ("page", page.to_string())],
            )
            .await?;

        tracing::info!(
            query = %query,
            results = results.results.len(),
            provider = CLIENT_NAME,
            "Movie search completed"
        );

        Ok(results)
    }

    async fn genres(&self) -> AppResult<Vec<Genre>> {
        let list: ApiGenreList = self.get_json("/genre/movie/list", &[]).await?;
        Ok(list.genres)
    }

    fn name(&self) -> &'static str {
        CLIENT_NAME
    }
}
