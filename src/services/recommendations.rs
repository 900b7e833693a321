//! Personalized recommendation feed.
//!
//! The aggregator combines several catalog listings (trending, popular, top rated,
//! per-genre) into titled sections tailored to a user profile:
//!
//! 1. "Recommended for You": preferred genres filtered by rating floor and watch
//!    history, deduplicated and shuffled
//! 2. "Trending Now"
//! 3. "More Like Your Favorites": the first two preferred genres
//! 4. "Popular Movies You Might Like": popular listing through the preference filter
//! 5. "Top Rated Movies": only for users whose floor is at least 7.0
//!
//! The entry point never fails. Helpers degrade to empty results on catalog errors;
//! step failures are handled according to the configured [`FailurePolicy`].

use std::collections::{BTreeMap, HashSet};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Instant;

use futures::future::join_all;
use rand::{rngs::StdRng, seq::SliceRandom, SeedableRng};
use serde::Deserialize;
use tracing::{debug, error, info, warn};

use crate::{
    config::Config,
    error::AppResult,
    models::{GenreId, Movie, MovieId, MoviesPage, RecommendationSection, SectionType, UserProfile},
    services::{
        catalog::CatalogClient,
        filters::{AlreadyWatchedFilter, FilterPipeline, MinimumRatingFilter},
    },
};

pub const RECOMMENDED_TITLE: &str = "Recommended for You";
pub const TRENDING_TITLE: &str = "Trending Now";
pub const GENRE_BASED_TITLE: &str = "More Like Your Favorites";
pub const POPULAR_TITLE: &str = "Popular Movies You Might Like";
pub const TOP_RATED_TITLE: &str = "Top Rated Movies";
pub const FALLBACK_TITLE: &str = "Trending Movies";

const RECOMMENDED_GENRE_COUNT: usize = 3;
const RECOMMENDED_PER_GENRE: usize = 5;
const RECOMMENDED_LIMIT: usize = 15;

const GENRE_BASED_GENRE_COUNT: usize = 2;
const GENRE_BASED_PER_GENRE: usize = 8;
const GENRE_BASED_LIMIT: usize = 12;

const SECTION_LIMIT: usize = 10;
const SIMILAR_LIMIT: usize = 10;
const GENRE_PREVIEW_LIMIT: usize = 6;

/// Users with a genre floor at or above this also get the top rated section
const TOP_RATED_MIN_PREFERENCE: f64 = 7.0;

const FIRST_PAGE: u32 = 1;

/// What happens to the feed when one of its sections fails to load
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailurePolicy {
    /// Skip the failing section and keep the others. Fall back to trending only if
    /// nothing at all could be produced.
    #[default]
    PerSection,
    /// Abort on the first failing section and replace the whole feed with a single
    /// trending section.
    AllOrFallback,
}

/// Ordering of the "Recommended for You" pool
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShuffleMode {
    /// Fresh entropy on startup, a different order per call
    Random,
    /// Reproducible order for a given seed
    Seeded(u64),
    /// Keep genre order then catalog order
    Disabled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FeedStep {
    Recommended,
    Trending,
    GenreBased,
    Popular,
    TopRated,
}

impl FeedStep {
    const ALL: [FeedStep; 5] = [
        FeedStep::Recommended,
        FeedStep::Trending,
        FeedStep::GenreBased,
        FeedStep::Popular,
        FeedStep::TopRated,
    ];

    fn name(self) -> &'static str {
        match self {
            FeedStep::Recommended => "recommended",
            FeedStep::Trending => "trending",
            FeedStep::GenreBased => "genre_based",
            FeedStep::Popular => "popular",
            FeedStep::TopRated => "top_rated",
        }
    }
}

/// Builds personalized recommendation sections from catalog listings
pub struct RecommendationAggregator {
    catalog: Arc<dyn CatalogClient>,
    rng: Option<Mutex<StdRng>>,
    failure_policy: FailurePolicy,
}

impl RecommendationAggregator {
    /// Aggregator with a random shuffle and per-section failure handling
    pub fn new(catalog: Arc<dyn CatalogClient>) -> Self {
        Self {
            catalog,
            rng: None,
            failure_policy: FailurePolicy::default(),
        }
        .with_shuffle(ShuffleMode::Random)
    }

    pub fn from_config(catalog: Arc<dyn CatalogClient>, config: &Config) -> Self {
        let shuffle = match (config.shuffle_recommendations, config.recommendation_seed) {
            (false, _) => ShuffleMode::Disabled,
            (true, Some(seed)) => ShuffleMode::Seeded(seed),
            (true, None) => ShuffleMode::Random,
        };

        Self::new(catalog)
            .with_shuffle(shuffle)
            .with_failure_policy(config.failure_policy)
    }

    pub fn with_shuffle(mut self, mode: ShuffleMode) -> Self {
        self.rng = match mode {
            ShuffleMode::Random => Some(Mutex::new(StdRng::from_entropy())),
            ShuffleMode::Seeded(seed) => Some(Mutex::new(StdRng::seed_from_u64(seed))),
            ShuffleMode::Disabled => None,
        };
        self
    }

    pub fn with_failure_policy(mut self, policy: FailurePolicy) -> Self {
        self.failure_policy = policy;
        self
    }

    pub fn failure_policy(&self) -> FailurePolicy {
        self.failure_policy
    }

    /// Builds the personalized feed for a profile
    ///
    /// Never fails: the worst case is an empty list of sections. An empty
    /// `preferred_genres` is not rejected here, it simply yields fewer sections.
    pub async fn personalized_recommendations(
        &self,
        profile: &UserProfile,
    ) -> Vec<RecommendationSection> {
        let start = Instant::now();
        let mut sections = Vec::new();
        let mut failures = 0usize;

        for step in FeedStep::ALL {
            match self.run_step(step, profile).await {
                Ok(Some(section)) => sections.push(section),
                Ok(None) => debug!(step = step.name(), "Section skipped"),
                Err(e) => {
                    failures += 1;
                    warn!(
                        user_id = %profile.id,
                        step = step.name(),
                        error = %e,
                        "Recommendation section failed"
                    );

                    if self.failure_policy == FailurePolicy::AllOrFallback {
                        return self.fallback_sections().await;
                    }
                }
            }
        }

        if sections.is_empty() && failures > 0 {
            return self.fallback_sections().await;
        }

        info!(
            user_id = %profile.id,
            sections = sections.len(),
            failed_sections = failures,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Personalized recommendations built"
        );

        sections
    }

    async fn run_step(
        &self,
        step: FeedStep,
        profile: &UserProfile,
    ) -> AppResult<Option<RecommendationSection>> {
        let section = match step {
            FeedStep::Recommended => non_empty_section(
                RECOMMENDED_TITLE,
                self.recommended_movies(profile).await,
                SectionType::Recommended,
            ),
            FeedStep::Trending => {
                let trending = self.catalog.trending_movies().await?;
                Some(RecommendationSection::new(
                    TRENDING_TITLE,
                    first_n(trending.results, SECTION_LIMIT),
                    SectionType::Trending,
                ))
            }
            FeedStep::GenreBased => {
                if profile.preferred_genres.is_empty() {
                    return Ok(None);
                }
                non_empty_section(
                    GENRE_BASED_TITLE,
                    self.genre_based_recommendations(
                        &profile.preferred_genres,
                        profile.preferred_rating,
                    )
                    .await,
                    SectionType::GenreBased,
                )
            }
            FeedStep::Popular => {
                let popular = self.catalog.popular_movies(FIRST_PAGE).await?;
                non_empty_section(
                    POPULAR_TITLE,
                    first_n(
                        filter_movies_by_preferences(popular.results, profile),
                        SECTION_LIMIT,
                    ),
                    SectionType::Recommended,
                )
            }
            FeedStep::TopRated => {
                if profile.preferred_rating < TOP_RATED_MIN_PREFERENCE {
                    return Ok(None);
                }
                let top_rated = self.catalog.top_rated_movies(FIRST_PAGE).await?;
                Some(RecommendationSection::new(
                    TOP_RATED_TITLE,
                    first_n(top_rated.results, SECTION_LIMIT),
                    SectionType::Recommended,
                ))
            }
        };

        Ok(section)
    }

    /// Single trending section, or nothing if trending is unavailable too
    async fn fallback_sections(&self) -> Vec<RecommendationSection> {
        match self.catalog.trending_movies().await {
            Ok(trending) => {
                info!("Serving trending fallback feed");
                vec![RecommendationSection::new(
                    FALLBACK_TITLE,
                    first_n(trending.results, SECTION_LIMIT),
                    SectionType::Trending,
                )]
            }
            Err(e) => {
                error!(error = %e, "Fallback recommendations failed");
                Vec::new()
            }
        }
    }

    /// "Recommended for You" pool
    ///
    /// Up to 5 unwatched movies at or above the genre floor from each of the first 3
    /// preferred genres, deduplicated, shuffled, capped at 15. Empty on any error.
    pub async fn recommended_movies(&self, profile: &UserProfile) -> Vec<Movie> {
        let genres = first_genres(&profile.preferred_genres, RECOMMENDED_GENRE_COUNT);
        if genres.is_empty() {
            return Vec::new();
        }

        let pages = match self.fetch_genre_listings(genres).await {
            Ok(pages) => pages,
            Err(e) => {
                warn!(user_id = %profile.id, error = %e, "Recommended movies unavailable");
                return Vec::new();
            }
        };

        let pipeline = FilterPipeline::new()
            .add_filter(MinimumRatingFilter::new(profile.preferred_rating))
            .add_filter(AlreadyWatchedFilter::new(&profile.watched_movies));

        let pool: Vec<Movie> = pages
            .into_iter()
            .flat_map(|page| first_n(pipeline.apply(page.results), RECOMMENDED_PER_GENRE))
            .collect();

        let mut unique = dedup_by_id(pool);
        self.shuffle(&mut unique);
        unique.truncate(RECOMMENDED_LIMIT);
        unique
    }

    /// Up to 8 movies at or above `min_rating` from each of the first 2 genres,
    /// deduplicated in fetch order and capped at 12. Empty on any error.
    pub async fn genre_based_recommendations(
        &self,
        genre_ids: &[GenreId],
        min_rating: f64,
    ) -> Vec<Movie> {
        let genres = first_genres(genre_ids, GENRE_BASED_GENRE_COUNT);
        if genres.is_empty() {
            return Vec::new();
        }

        let pages = match self.fetch_genre_listings(genres).await {
            Ok(pages) => pages,
            Err(e) => {
                warn!(error = %e, "Genre based recommendations unavailable");
                return Vec::new();
            }
        };

        let pipeline = FilterPipeline::new().add_filter(MinimumRatingFilter::new(min_rating));

        let pool: Vec<Movie> = pages
            .into_iter()
            .flat_map(|page| first_n(pipeline.apply(page.results), GENRE_BASED_PER_GENRE))
            .collect();

        first_n(dedup_by_id(pool), GENRE_BASED_LIMIT)
    }

    /// Movies similar to `movie_id`, preference-filtered when a profile is given
    pub async fn similar_movies(
        &self,
        movie_id: MovieId,
        profile: Option<&UserProfile>,
    ) -> Vec<Movie> {
        let similar = match self.catalog.similar_movies(movie_id).await {
            Ok(page) => page.results,
            Err(e) => {
                warn!(movie_id = movie_id, error = %e, "Similar movies unavailable");
                return Vec::new();
            }
        };

        let movies = match profile {
            Some(profile) => filter_movies_by_preferences(similar, profile),
            None => similar,
        };

        first_n(movies, SIMILAR_LIMIT)
    }

    /// Preview of up to 6 movies per genre, used while picking genres
    ///
    /// Genres are fetched concurrently and fail independently: a genre whose listing
    /// cannot be loaded is left out, the rest are still returned.
    pub async fn genre_selection_movies(
        &self,
        genre_ids: &[GenreId],
    ) -> BTreeMap<GenreId, Vec<Movie>> {
        let fetches = genre_ids.iter().map(|&genre_id| async move {
            (
                genre_id,
                self.catalog.movies_by_genre(genre_id, FIRST_PAGE).await,
            )
        });

        let mut previews = BTreeMap::new();
        for (genre_id, result) in join_all(fetches).await {
            match result {
                Ok(page) => {
                    previews.insert(genre_id, first_n(page.results, GENRE_PREVIEW_LIMIT));
                }
                Err(e) => {
                    warn!(genre_id = genre_id, error = %e, "Genre preview unavailable");
                }
            }
        }

        previews
    }

    /// Fetches the first page of each genre concurrently, results in genre order
    async fn fetch_genre_listings(&self, genre_ids: &[GenreId]) -> AppResult<Vec<MoviesPage>> {
        let fetches = genre_ids
            .iter()
            .map(|&genre_id| self.catalog.movies_by_genre(genre_id, FIRST_PAGE));

        join_all(fetches).await.into_iter().collect()
    }

    fn shuffle(&self, movies: &mut [Movie]) {
        if let Some(rng) = &self.rng {
            let mut rng = rng.lock().unwrap_or_else(PoisonError::into_inner);
            movies.shuffle(&mut *rng);
        }
    }
}

/// Keeps movies that are unwatched, at or above the profile's genre floor and, when
/// the profile has preferred genres, in at least one of them. Order is preserved.
pub fn filter_movies_by_preferences(movies: Vec<Movie>, profile: &UserProfile) -> Vec<Movie> {
    FilterPipeline::for_profile(profile).apply(movies)
}

/// Removes repeated movie ids, first occurrence wins
pub fn dedup_by_id(movies: Vec<Movie>) -> Vec<Movie> {
    let mut seen = HashSet::new();
    movies
        .into_iter()
        .filter(|movie| seen.insert(movie.id))
        .collect()
}

fn first_n(mut movies: Vec<Movie>, n: usize) -> Vec<Movie> {
    movies.truncate(n);
    movies
}

fn first_genres(genres: &[GenreId], n: usize) -> &[GenreId] {
    &genres[..genres.len().min(n)]
}

fn non_empty_section(
    title: &str,
    movies: Vec<Movie>,
    section_type: SectionType,
) -> Option<RecommendationSection> {
    if movies.is_empty() {
        None
    } else {
        Some(RecommendationSection::new(title, movies, section_type))
    }
}
