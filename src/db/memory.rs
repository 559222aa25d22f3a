use std::collections::{BTreeMap, HashSet};
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use chrono::Utc;

use crate::{
    db::{Catalog, InsertOutcome, Ledger},
    error::{AppError, AppResult},
    models::{GenreWeights, Movie, Rating, RatingReport, User},
};

#[derive(Default)]
struct Tables {
    users: BTreeMap<i32, User>,
    movies: BTreeMap<i32, Movie>,
    ratings: BTreeMap<(i32, i32), Rating>,
}

/// In-process catalog and ledger with the same key rules as the PostgreSQL schema
///
/// Used by tests and local demos. Movies are iterated in id order, ratings are
/// keyed by (user, movie) and require both to exist.
#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store preloaded with the given movies
    pub fn with_movies(movies: impl IntoIterator<Item = Movie>) -> Self {
        let store = Self::new();
        for movie in movies {
            store.insert_movie(movie);
        }
        store
    }

    fn tables(&self) -> MutexGuard<'_, Tables> {
        self.tables.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn insert_movie(&self, movie: Movie) {
        self.tables().movies.insert(movie.movie_id, movie);
    }

    pub fn insert_user(&self, user: User) {
        self.tables().users.insert(user.user_id, user);
    }

    /// Current row for a (user, movie) pair
    pub fn rating(&self, user_id: i32, movie_id: i32) -> Option<Rating> {
        self.tables().ratings.get(&(user_id, movie_id)).cloned()
    }

    /// Every row for a user, ordered by movie id
    pub fn ratings_for(&self, user_id: i32) -> Vec<Rating> {
        self.tables()
            .ratings
            .range((user_id, i32::MIN)..=(user_id, i32::MAX))
            .map(|(_, rating)| rating.clone())
            .collect()
    }

    pub fn user_count(&self) -> usize {
        self.tables().users.len()
    }
}

#[async_trait]
impl Catalog for MemoryStore {
    async fn get_user(&self, user_id: i32) -> AppResult<Option<User>> {
        Ok(self.tables().users.get(&user_id).cloned())
    }

    async fn create_user(&self, user_id: Option<i32>) -> AppResult<User> {
        let mut tables = self.tables();
        let user_id = match user_id {
            Some(id) if tables.users.contains_key(&id) => {
                return Err(AppError::Internal(format!(
                    "duplicate key: user {} already exists",
                    id
                )));
            }
            Some(id) => id,
            None => tables.users.keys().next_back().map_or(1, |max| max + 1),
        };

        let user = User::new(user_id);
        tables.users.insert(user_id, user.clone());
        Ok(user)
    }

    async fn get_movie(&self, movie_id: i32) -> AppResult<Option<Movie>> {
        Ok(self.tables().movies.get(&movie_id).cloned())
    }

    async fn find_unseen_movie_by_genre_prefix(
        &self,
        excluded: &HashSet<i32>,
        genre_label: &str,
    ) -> AppResult<Option<Movie>> {
        Ok(self
            .tables()
            .movies
            .values()
            .find(|m| !excluded.contains(&m.movie_id) && m.genres_start_with(genre_label))
            .cloned())
    }

    async fn refresh_user_features(&self, user_id: i32) -> AppResult<User> {
        let mut tables = self.tables();

        let genres: Vec<Option<String>> = tables
            .ratings
            .range((user_id, i32::MIN)..=(user_id, i32::MAX))
            .filter(|(_, rating)| rating.rating.is_some())
            .filter_map(|((_, movie_id), _)| tables.movies.get(movie_id))
            .map(|movie| movie.genres.clone())
            .collect();
        let (weights, count) = GenreWeights::from_genre_fields(genres.iter().map(|g| g.as_deref()));

        let user = tables
            .users
            .get_mut(&user_id)
            .ok_or_else(|| AppError::NotFound(format!("user {} doesn't exist", user_id)))?;
        user.genre_weights = weights;
        user.count_movies = count as i32;
        Ok(user.clone())
    }
}

#[async_trait]
impl Ledger for MemoryStore {
    async fn user_history(&self, user_id: i32) -> AppResult<HashSet<i32>> {
        Ok(self
            .tables()
            .ratings
            .range((user_id, i32::MIN)..=(user_id, i32::MAX))
            .map(|((_, movie_id), _)| *movie_id)
            .collect())
    }

    async fn insert_rating(&self, report: &RatingReport) -> AppResult<InsertOutcome> {
        let mut tables = self.tables();

        if !tables.users.contains_key(&report.user_id) {
            return Ok(InsertOutcome::Rejected(format!(
                "foreign key violation: user {} doesn't exist",
                report.user_id
            )));
        }
        if !tables.movies.contains_key(&report.movie_id) {
            return Ok(InsertOutcome::Rejected(format!(
                "foreign key violation: movie {} doesn't exist",
                report.movie_id
            )));
        }

        let key = (report.user_id, report.movie_id);
        if tables.ratings.contains_key(&key) {
            return Ok(InsertOutcome::Conflict);
        }

        tables.ratings.insert(key, Rating::from(report));
        Ok(InsertOutcome::Inserted)
    }

    async fn update_rating(&self, report: &RatingReport) -> AppResult<bool> {
        let mut tables = self.tables();
        match tables.ratings.get_mut(&(report.user_id, report.movie_id)) {
            Some(row) => {
                row.rating = Some(report.rating);
                row.timestamp = report.timestamp;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn record_recommendation(&self, user_id: i32, movie_id: i32) -> AppResult<()> {
        let mut tables = self.tables();

        if !tables.users.contains_key(&user_id) || !tables.movies.contains_key(&movie_id) {
            return Err(AppError::Internal(format!(
                "foreign key violation: ({}, {})",
                user_id, movie_id
            )));
        }
        let key = (user_id, movie_id);
        if tables.ratings.contains_key(&key) {
            return Err(AppError::Internal(format!(
                "duplicate key: ({}, {})",
                user_id, movie_id
            )));
        }

        tables.ratings.insert(
            key,
            Rating {
                user_id,
                movie_id,
                rating: None,
                timestamp: Utc::now(),
                is_recommended: true,
                is_used_to_train: false,
            },
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Genre;

    fn movie(movie_id: i32, genres: &str) -> Movie {
        Movie {
            movie_id,
            title: Some(format!("Movie {}", movie_id)),
            genres: Some(genres.to_string()),
        }
    }

    #[tokio::test]
    async fn test_create_user_allocates_max_plus_one() {
        let store = MemoryStore::new();
        assert_eq!(store.create_user(None).await.unwrap().user_id, 1);

        store.insert_user(User::new(41));
        assert_eq!(store.create_user(None).await.unwrap().user_id, 42);
        assert!(store.create_user(Some(41)).await.is_err());
    }

    #[tokio::test]
    async fn test_insert_rating_enforces_keys() {
        let store = MemoryStore::with_movies([movie(1, "Drama")]);
        store.insert_user(User::new(1));

        let report = RatingReport::new(1, 1, 4.0);
        assert_eq!(store.insert_rating(&report).await.unwrap(), InsertOutcome::Inserted);
        assert_eq!(store.insert_rating(&report).await.unwrap(), InsertOutcome::Conflict);

        let unknown_movie = RatingReport::new(1, 99, 4.0);
        assert!(matches!(
            store.insert_rating(&unknown_movie).await.unwrap(),
            InsertOutcome::Rejected(_)
        ));
    }

    #[tokio::test]
    async fn test_find_unseen_uses_id_order_and_exclusions() {
        let store = MemoryStore::with_movies([
            movie(3, "Action|Drama"),
            movie(1, "Action"),
            movie(2, "Comedy|Action"),
        ]);

        let first = store
            .find_unseen_movie_by_genre_prefix(&HashSet::new(), "Action")
            .await
            .unwrap();
        assert_eq!(first.map(|m| m.movie_id), Some(1));

        let excluded: HashSet<i32> = [1].into_iter().collect();
        let next = store
            .find_unseen_movie_by_genre_prefix(&excluded, "Action")
            .await
            .unwrap();
        assert_eq!(next.map(|m| m.movie_id), Some(3));
    }

    #[tokio::test]
    async fn test_refresh_user_features_ignores_recommendations() {
        let store = MemoryStore::with_movies([movie(1, "Action"), movie(2, "Comedy")]);
        store.insert_user(User::new(5));
        store.insert_rating(&RatingReport::new(5, 1, 4.0)).await.unwrap();
        store.record_recommendation(5, 2).await.unwrap();

        let user = store.refresh_user_features(5).await.unwrap();
        assert_eq!(user.count_movies, 1);
        assert_eq!(user.genre_weights.get(Genre::Action), 1.0);
        assert_eq!(user.genre_weights.get(Genre::Comedy), 0.0);
    }
}
