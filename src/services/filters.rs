//! Composable movie filters.
//!
//! Each filter is a single keep/drop predicate over a movie. Filters borrow the data
//! they compare against (the profile's watched set, its preferred genres), so a
//! pipeline is built per request and thrown away afterwards.

use std::collections::BTreeSet;

use crate::models::{GenreId, Movie, MovieId, UserProfile};

/// A single movie predicate
pub trait MovieFilter: Send + Sync {
    /// Filter name for logging
    fn name(&self) -> &'static str;

    /// Returns true when the movie should be kept
    fn keep(&self, movie: &Movie) -> bool;
}

/// Drops movies the user has already watched
pub struct AlreadyWatchedFilter<'a> {
    watched: &'a BTreeSet<MovieId>,
}

impl<'a> AlreadyWatchedFilter<'a> {
    pub fn new(watched: &'a BTreeSet<MovieId>) -> Self {
        Self { watched }
    }
}

impl MovieFilter for AlreadyWatchedFilter<'_> {
    fn name(&self) -> &'static str {
        "AlreadyWatchedFilter"
    }

    fn keep(&self, movie: &Movie) -> bool {
        !self.watched.contains(&movie.id)
    }
}

/// Keeps movies whose vote average reaches the floor (inclusive)
pub struct MinimumRatingFilter {
    min_rating: f64,
}

impl MinimumRatingFilter {
    pub fn new(min_rating: f64) -> Self {
        Self { min_rating }
    }
}

impl MovieFilter for MinimumRatingFilter {
    fn name(&self) -> &'static str {
        "MinimumRatingFilter"
    }

    fn keep(&self, movie: &Movie) -> bool {
        movie.vote_average >= self.min_rating
    }
}

/// Keeps movies sharing at least one genre with the preferred set
///
/// An empty preference set keeps everything.
pub struct GenrePreferenceFilter<'a> {
    preferred: &'a [GenreId],
}

impl<'a> GenrePreferenceFilter<'a> {
    pub fn new(preferred: &'a [GenreId]) -> Self {
        Self { preferred }
    }
}

impl MovieFilter for GenrePreferenceFilter<'_> {
    fn name(&self) -> &'static str {
        "GenrePreferenceFilter"
    }

    fn keep(&self, movie: &Movie) -> bool {
        self.preferred.is_empty() || movie.has_any_genre(self.preferred)
    }
}

/// Chains filters; a movie survives only if every filter keeps it
///
/// ```ignore
/// let pipeline = FilterPipeline::new()
///     .add_filter(AlreadyWatchedFilter::new(&profile.watched_movies))
///     .add_filter(MinimumRatingFilter::new(profile.preferred_rating));
///
/// let kept = pipeline.apply(movies);
/// ```
#[derive(Default)]
pub struct FilterPipeline<'a> {
    filters: Vec<Box<dyn MovieFilter + 'a>>,
}

impl<'a> FilterPipeline<'a> {
    pub fn new() -> Self {
        Self {
            filters: Vec::new(),
        }
    }

    /// Add a filter to the pipeline (builder pattern)
    pub fn add_filter(mut self, filter: impl MovieFilter + 'a) -> Self {
        self.filters.push(Box::new(filter));
        self
    }

    /// Full preference filter for a profile: unwatched, above the genre floor, and in
    /// one of the preferred genres when the profile has any
    pub fn for_profile(profile: &'a UserProfile) -> Self {
        Self::new()
            .add_filter(AlreadyWatchedFilter::new(&profile.watched_movies))
            .add_filter(MinimumRatingFilter::new(profile.preferred_rating))
            .add_filter(GenrePreferenceFilter::new(&profile.preferred_genres))
    }

    pub fn keep(&self, movie: &Movie) -> bool {
        self.filters.iter().all(|filter| filter.keep(movie))
    }

    /// Applies all filters, preserving input order
    pub fn apply(&self, movies: Vec<Movie>) -> Vec<Movie> {
        let input = movies.len();
        let kept: Vec<Movie> = movies.into_iter().filter(|movie| self.keep(movie)).collect();

        tracing::trace!(
            filters = ?self.filters.iter().map(|f| f.name()).collect::<Vec<_>>(),
            input,
            output = kept.len(),
            "Filter pipeline applied"
        );

        kept
    }
}
