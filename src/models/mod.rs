use serde::{Deserialize, Serialize};

pub mod recommendation;
pub mod user_profile;

pub use recommendation::{RecommendationSection, SectionType};
pub use user_profile::{ProfileDefaults, UserProfile, WatchEvent, DEFAULT_PREFERRED_RATING};

/// Catalog identifier of a movie
pub type MovieId = u64;

/// Catalog identifier of a genre
pub type GenreId = u32;

/// A movie as returned by the catalog listing endpoints
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Movie {
    pub id: MovieId,
    pub title: String,
    #[serde(default)]
    pub overview: String,
    #[serde(default)]
    pub poster_path: Option<String>,
    #[serde(default)]
    pub backdrop_path: Option<String>,
    #[serde(default)]
    pub vote_average: f64,
    #[serde(default)]
    pub release_date: Option<String>,
    #[serde(default)]
    pub genre_ids: Vec<GenreId>,
}

impl Movie {
    /// True when the movie belongs to at least one of the given genres
    pub fn has_any_genre(&self, genres: &[GenreId]) -> bool {
        self.genre_ids.iter().any(|genre| genres.contains(genre))
    }
}

/// One page of a catalog movie listing
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MoviesPage {
    #[serde(default)]
    pub results: Vec<Movie>,
    #[serde(default)]
    pub page: u32,
    #[serde(default)]
    pub total_pages: u32,
    #[serde(default)]
    pub total_results: u32,
}

impl MoviesPage {
    /// Single page wrapping the given movies
    pub fn single(results: Vec<Movie>) -> Self {
        let total_results = results.len() as u32;
        Self {
            results,
            page: 1,
            total_pages: 1,
            total_results,
        }
    }
}

/// A catalog genre
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Genre {
    pub id: GenreId,
    pub name: String,
}

// ============================================================================
// Catalog API Types
// ============================================================================

/// Raw response from the movie details endpoint
///
/// Details carry full genre objects rather than the `genre_ids` used by listings.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiMovieDetails {
    pub id: MovieId,
    pub title: String,
    #[serde(default)]
    pub overview: Option<String>,
    #[serde(default)]
    pub poster_path: Option<String>,
    #[serde(default)]
    pub backdrop_path: Option<String>,
    #[serde(default)]
    pub vote_average: f64,
    #[serde(default)]
    pub release_date: Option<String>,
    #[serde(default)]
    pub genres: Vec<Genre>,
}

impl From<ApiMovieDetails> for Movie {
    fn from(details: ApiMovieDetails) -> Self {
        Movie {
            id: details.id,
            title: details.title,
            overview: details.overview.unwrap_or_default(),
            poster_path: details.poster_path,
            backdrop_path: details.backdrop_path,
            vote_average: details.vote_average,
            release_date: details.release_date,
            genre_ids: details.genres.into_iter().map(|g| g.id).collect(),
        }
    }
}

/// Raw response from the genre list endpoint
#[derive(Debug, Clone, Deserialize)]
pub struct ApiGenreList {
    pub genres: Vec<Genre>,
}
