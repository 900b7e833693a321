use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use super::{GenreId, MovieId};

/// Minimum acceptable vote average when the user never picked one
pub const DEFAULT_PREFERRED_RATING: f64 = 6.0;

/// A user's discovery preferences and history
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub id: String,
    pub email: String,
    /// Preferred genres in the order the user picked them
    #[serde(default)]
    pub preferred_genres: Vec<GenreId>,
    #[serde(default)]
    pub watched_movies: BTreeSet<MovieId>,
    #[serde(default)]
    pub liked_movies: BTreeSet<MovieId>,
    #[serde(default)]
    pub favorite_actors: Vec<String>,
    /// Genre floor: minimum vote average a movie must reach
    #[serde(default = "default_preferred_rating")]
    pub preferred_rating: f64,
    pub created_at: DateTime<Utc>,
    pub last_updated: DateTime<Utc>,
}

fn default_preferred_rating() -> f64 {
    DEFAULT_PREFERRED_RATING
}

/// Optional initial values supplied when a profile is created
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ProfileDefaults {
    #[serde(default)]
    pub preferred_genres: Option<Vec<GenreId>>,
    #[serde(default)]
    pub watched_movies: Option<Vec<MovieId>>,
    #[serde(default)]
    pub liked_movies: Option<Vec<MovieId>>,
    #[serde(default)]
    pub favorite_actors: Option<Vec<String>>,
    #[serde(default)]
    pub preferred_rating: Option<f64>,
}

/// A single "watched" event, kept alongside the profile's watched set
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct WatchEvent {
    pub movie_id: MovieId,
    pub watched_at: DateTime<Utc>,
    #[serde(default)]
    pub rating: Option<f64>,
    #[serde(default)]
    pub review: Option<String>,
}

impl UserProfile {
    /// Creates a profile, filling anything not supplied with defaults
    pub fn new(id: impl Into<String>, email: impl Into<String>, defaults: ProfileDefaults) -> Self {
        let now = Utc::now();
        Self {
            id: id.into(),
            email: email.into(),
            preferred_genres: dedup_genres(defaults.preferred_genres.unwrap_or_default()),
            watched_movies: defaults.watched_movies.unwrap_or_default().into_iter().collect(),
            liked_movies: defaults.liked_movies.unwrap_or_default().into_iter().collect(),
            favorite_actors: defaults.favorite_actors.unwrap_or_default(),
            preferred_rating: defaults
                .preferred_rating
                .unwrap_or(DEFAULT_PREFERRED_RATING),
            created_at: now,
            last_updated: now,
        }
    }

    /// Replaces the preferred genres, dropping repeats but keeping pick order
    pub fn set_preferred_genres(&mut self, genres: Vec<GenreId>) {
        self.preferred_genres = dedup_genres(genres);
        self.touch();
    }

    pub fn set_preferred_rating(&mut self, rating: f64) {
        self.preferred_rating = rating;
        self.touch();
    }

    /// Adds a watched movie; repeated adds leave the set unchanged
    pub fn add_watched(&mut self, movie_id: MovieId) {
        self.watched_movies.insert(movie_id);
        self.touch();
    }

    /// Adds a liked movie; repeated adds leave the set unchanged
    pub fn add_liked(&mut self, movie_id: MovieId) {
        self.liked_movies.insert(movie_id);
        self.touch();
    }

    pub fn has_watched(&self, movie_id: MovieId) -> bool {
        self.watched_movies.contains(&movie_id)
    }

    fn touch(&mut self) {
        self.last_updated = Utc::now();
    }
}

/// Removes repeated genre ids, first occurrence wins
pub fn dedup_genres(genres: Vec<GenreId>) -> Vec<GenreId> {
    let mut seen = BTreeSet::new();
    genres.into_iter().filter(|g| seen.insert(*g)).collect()
}

/// Validates a rating against the 0-10 catalog scale
pub fn is_valid_rating(rating: f64) -> bool {
    rating.is_finite() && (0.0..=10.0).contains(&rating)
}
