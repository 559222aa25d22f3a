use std::collections::HashSet;

use async_trait::async_trait;

use crate::{
    error::AppResult,
    models::{Movie, RatingReport, User},
};

pub mod memory;
pub mod postgres;
pub mod redis;

pub use memory::MemoryStore;
pub use postgres::{create_pool, run_migrations, PgStore};
pub use self::redis::create_redis_client;
pub use self::redis::Cache;
pub use self::redis::CacheKey;
pub use self::redis::CacheWriterHandle;

/// Result of attempting to insert one rating row
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InsertOutcome {
    /// A new row was written
    Inserted,
    /// A row for this (user, movie) pair already exists
    Conflict,
    /// The row violates another integrity rule (e.g. unknown movie) and is skipped
    Rejected(String),
}

/// Typed access to the users and movies tables
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Catalog: Send + Sync {
    /// Looks up a user by id
    async fn get_user(&self, user_id: i32) -> AppResult<Option<User>>;

    /// Creates a user, allocating `max(existing) + 1` when no id is given
    async fn create_user(&self, user_id: Option<i32>) -> AppResult<User>;

    /// Looks up a movie by id
    async fn get_movie(&self, movie_id: i32) -> AppResult<Option<Movie>>;

    /// First movie (by id) whose genres start with `genre_label` and whose id is not excluded
    async fn find_unseen_movie_by_genre_prefix(
        &self,
        excluded: &HashSet<i32>,
        genre_label: &str,
    ) -> AppResult<Option<Movie>>;

    /// Recomputes the user's genre profile from the movies they have rated
    async fn refresh_user_features(&self, user_id: i32) -> AppResult<User>;
}

/// The rating history: at most one row per (user, movie) pair
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Ledger: Send + Sync {
    /// Ids of every movie the user has a rating row for
    async fn user_history(&self, user_id: i32) -> AppResult<HashSet<i32>>;

    /// Attempts to insert a new rating row
    ///
    /// Conflicts and integrity violations come back as outcomes; only
    /// unexpected failures (connectivity, SQL errors) are `Err`.
    async fn insert_rating(&self, report: &RatingReport) -> AppResult<InsertOutcome>;

    /// Overwrites rating and timestamp of an existing row; `false` if no row matched
    async fn update_rating(&self, report: &RatingReport) -> AppResult<bool>;

    /// Writes the recommendation itself as a row with no rating
    async fn record_recommendation(&self, user_id: i32, movie_id: i32) -> AppResult<()>;
}
