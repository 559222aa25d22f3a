//! Genre inference over a precomputed nearest-neighbor index.
//!
//! The training job fits a k-NN index over the genre dummies of every movie
//! and exports it as JSON. At request time a user's genre profile is used as
//! the query point; each neighbor votes for the genres it carries and one of
//! the three most voted genres is picked at random.

use std::path::Path;

use rand::seq::SliceRandom;
use rand::Rng;
use serde::Deserialize;

use crate::{
    error::{AppError, AppResult},
    models::{Genre, User, GENRE_COUNT},
};

/// How many top-voted genres the final pick is sampled from
pub const TOP_GENRES: usize = 3;

/// On-disk layout of the model artifact
#[derive(Debug, Deserialize)]
struct ModelArtifact {
    n_neighbors: usize,
    feature_columns: Vec<String>,
    fit_matrix: Vec<Vec<f64>>,
}

/// Immutable k-NN index over movie genre dummies
///
/// Loaded once at startup and shared read-only between requests.
#[derive(Debug, Clone)]
pub struct GenreModel {
    n_neighbors: usize,
    columns: Vec<Genre>,
    fit_matrix: Vec<Vec<f64>>,
}

impl GenreModel {
    /// Builds a model, checking that its feature columns are exactly the canonical genres
    pub fn new(
        n_neighbors: usize,
        feature_columns: &[String],
        fit_matrix: Vec<Vec<f64>>,
    ) -> AppResult<Self> {
        if n_neighbors == 0 {
            return Err(AppError::Inference("n_neighbors must be positive".to_string()));
        }
        if fit_matrix.is_empty() {
            return Err(AppError::Inference("model has no fitted rows".to_string()));
        }

        let mut columns = Vec::with_capacity(feature_columns.len());
        for name in feature_columns {
            let genre = Genre::from_feature_name(name).ok_or_else(|| {
                AppError::Inference(format!("unknown feature column '{}'", name))
            })?;
            if columns.contains(&genre) {
                return Err(AppError::Inference(format!(
                    "duplicate feature column '{}'",
                    name
                )));
            }
            columns.push(genre);
        }

        if let Some(missing) = Genre::ALL.iter().find(|g| !columns.contains(g)) {
            return Err(AppError::Inference(format!(
                "model lacks feature column '{}'",
                missing.feature_name()
            )));
        }

        if let Some(row) = fit_matrix.iter().position(|r| r.len() != columns.len()) {
            return Err(AppError::Inference(format!(
                "row {} has {} values, expected {}",
                row,
                fit_matrix[row].len(),
                columns.len()
            )));
        }

        Ok(Self {
            n_neighbors,
            columns,
            fit_matrix,
        })
    }

    /// Parses a JSON model artifact
    pub fn from_json(json: &str) -> AppResult<Self> {
        let artifact: ModelArtifact = serde_json::from_str(json)
            .map_err(|e| AppError::Inference(format!("invalid model artifact: {}", e)))?;
        Self::new(
            artifact.n_neighbors,
            &artifact.feature_columns,
            artifact.fit_matrix,
        )
    }

    /// Reads and parses the model artifact at `path`
    pub fn load(path: impl AsRef<Path>) -> AppResult<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)?;
        let model = Self::from_json(&json)?;

        tracing::info!(
            path = %path.display(),
            rows = model.fit_matrix.len(),
            n_neighbors = model.n_neighbors,
            "Loaded genre model"
        );

        Ok(model)
    }

    /// The user's genre weights laid out in the model's column order
    pub fn feature_vector(&self, user: &User) -> Vec<f64> {
        self.columns
            .iter()
            .map(|genre| user.genre_weights.get(*genre))
            .collect()
    }

    /// Exact k nearest fitted rows by Euclidean distance
    ///
    /// Returns `(distances, indices)` ordered by distance; equal distances
    /// keep the lower row index first.
    pub fn kneighbors(&self, vector: &[f64]) -> AppResult<(Vec<f64>, Vec<usize>)> {
        if vector.len() != self.columns.len() {
            return Err(AppError::Inference(format!(
                "feature vector has {} values, model expects {}",
                vector.len(),
                self.columns.len()
            )));
        }

        let mut scored: Vec<(f64, usize)> = self
            .fit_matrix
            .iter()
            .enumerate()
            .map(|(index, row)| {
                let squared: f64 = row.iter().zip(vector).map(|(a, b)| (a - b).powi(2)).sum();
                (squared.sqrt(), index)
            })
            .collect();

        scored.sort_by(|a, b| a.0.total_cmp(&b.0).then_with(|| a.1.cmp(&b.1)));
        scored.truncate(self.n_neighbors);

        Ok(scored.into_iter().unzip())
    }

    /// Ranks genres by how many of the user's nearest neighbors carry them
    pub fn rank_genres(&self, user: &User) -> AppResult<GenreRanking> {
        let (_, indices) = self.kneighbors(&self.feature_vector(user))?;

        let mut votes = [0u32; GENRE_COUNT];
        for index in indices {
            for (genre, value) in self.columns.iter().zip(&self.fit_matrix[index]) {
                if *value > 0.0 {
                    votes[genre.index()] += 1;
                }
            }
        }

        Ok(GenreRanking::from_votes(
            Genre::ALL.into_iter().zip(votes).collect(),
        ))
    }
}

/// Genres ordered by descending vote count
#[derive(Debug, Clone, PartialEq)]
pub struct GenreRanking {
    ranked: Vec<(Genre, u32)>,
}

impl GenreRanking {
    /// Orders votes descending; equal counts keep their input order
    pub fn from_votes(mut votes: Vec<(Genre, u32)>) -> Self {
        votes.sort_by(|a, b| b.1.cmp(&a.1));
        Self { ranked: votes }
    }

    pub fn ranked(&self) -> &[(Genre, u32)] {
        &self.ranked
    }

    /// The `n` most voted genres
    ///
    /// Genres nobody voted for are left out unless no genre got a vote at all.
    pub fn top(&self, n: usize) -> Vec<Genre> {
        let voted: Vec<Genre> = self
            .ranked
            .iter()
            .filter(|(_, count)| *count > 0)
            .take(n)
            .map(|(genre, _)| *genre)
            .collect();

        if voted.is_empty() {
            return self.ranked.iter().take(n).map(|(genre, _)| *genre).collect();
        }
        voted
    }

    /// Picks one of the top [`TOP_GENRES`] genres uniformly at random
    pub fn choose<R: Rng + ?Sized>(&self, rng: &mut R) -> AppResult<Genre> {
        self.top(TOP_GENRES)
            .choose(rng)
            .copied()
            .ok_or_else(|| AppError::Inference("no genre to choose from".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn columns() -> Vec<String> {
        Genre::ALL
            .iter()
            .map(|g| g.feature_name().to_string())
            .collect()
    }

    fn row(genres: &[Genre]) -> Vec<f64> {
        Genre::ALL
            .iter()
            .map(|g| if genres.contains(g) { 1.0 } else { 0.0 })
            .collect()
    }

    fn user_with(weights: &[(Genre, f64)]) -> User {
        let mut user = User::new(1);
        for (genre, weight) in weights {
            user.genre_weights.set(*genre, *weight);
        }
        user
    }

    #[test]
    fn test_new_rejects_unknown_column() {
        let mut cols = columns();
        cols[0] = "Bollywood".to_string();
        let err = GenreModel::new(2, &cols, vec![vec![0.0; 20]]).unwrap_err();
        assert!(matches!(err, AppError::Inference(_)));
    }

    #[test]
    fn test_new_rejects_missing_column() {
        let cols: Vec<String> = columns().into_iter().skip(1).collect();
        let err = GenreModel::new(2, &cols, vec![vec![0.0; 19]]).unwrap_err();
        assert!(matches!(err, AppError::Inference(_)));
    }

    #[test]
    fn test_new_rejects_ragged_rows() {
        let err = GenreModel::new(2, &columns(), vec![vec![0.0; 19]]).unwrap_err();
        assert!(matches!(err, AppError::Inference(_)));
    }

    #[test]
    fn test_from_json_accepts_training_column_order() {
        // Training emits dummies in alphabetical order, lower-case last
        let mut cols = columns();
        cols.sort();
        let json = serde_json::json!({
            "n_neighbors": 1,
            "feature_columns": cols,
            "fit_matrix": [vec![0.0; 20]],
        });

        let model = GenreModel::from_json(&json.to_string()).unwrap();
        let user = user_with(&[(Genre::Action, 0.5)]);
        let vector = model.feature_vector(&user);
        // "Action" sorts first alphabetically
        assert_eq!(vector[0], 0.5);
    }

    #[test]
    fn test_kneighbors_orders_by_distance_then_index() {
        let model = GenreModel::new(
            3,
            &columns(),
            vec![
                row(&[Genre::Drama]),
                row(&[Genre::Action]),
                row(&[Genre::Action]),
                row(&[Genre::Action, Genre::Comedy]),
            ],
        )
        .unwrap();

        let (distances, indices) = model.kneighbors(&row(&[Genre::Action])).unwrap();
        assert_eq!(indices, vec![1, 2, 3]);
        assert_eq!(distances, vec![0.0, 0.0, 1.0]);
    }

    #[test]
    fn test_kneighbors_rejects_wrong_width() {
        let model = GenreModel::new(1, &columns(), vec![row(&[Genre::Drama])]).unwrap();
        assert!(model.kneighbors(&[1.0, 0.0]).is_err());
    }

    #[test]
    fn test_rank_genres_counts_neighbor_votes() {
        let model = GenreModel::new(
            3,
            &columns(),
            vec![
                row(&[Genre::Action, Genre::SciFi]),
                row(&[Genre::Action, Genre::Thriller]),
                row(&[Genre::Action]),
                row(&[Genre::Romance]),
            ],
        )
        .unwrap();

        let ranking = model
            .rank_genres(&user_with(&[(Genre::Action, 1.0)]))
            .unwrap();

        assert_eq!(ranking.ranked()[0], (Genre::Action, 3));
        assert_eq!(
            ranking.top(TOP_GENRES),
            vec![Genre::Action, Genre::SciFi, Genre::Thriller]
        );
    }

    #[test]
    fn test_all_zero_profile_still_ranks() {
        let model = GenreModel::new(
            1,
            &columns(),
            vec![row(&[Genre::Comedy]), row(&[Genre::Drama])],
        )
        .unwrap();

        let ranking = model.rank_genres(&User::new(1)).unwrap();
        assert_eq!(ranking.top(TOP_GENRES), vec![Genre::Comedy]);
    }

    #[test]
    fn test_top_falls_back_when_nobody_voted() {
        let ranking = GenreRanking::from_votes(Genre::ALL.into_iter().map(|g| (g, 0)).collect());
        assert_eq!(
            ranking.top(TOP_GENRES),
            vec![Genre::NoGenresListed, Genre::Action, Genre::Adventure]
        );
    }

    #[test]
    fn test_choose_stays_within_top_three() {
        let ranking = GenreRanking::from_votes(vec![
            (Genre::Drama, 2),
            (Genre::Action, 9),
            (Genre::Comedy, 5),
            (Genre::Horror, 7),
            (Genre::War, 1),
        ]);
        let top = ranking.top(TOP_GENRES);
        assert_eq!(top, vec![Genre::Action, Genre::Horror, Genre::Comedy]);

        let mut rng = StdRng::seed_from_u64(7);
        let mut seen = std::collections::HashSet::new();
        for _ in 0..200 {
            let genre = ranking.choose(&mut rng).unwrap();
            assert!(top.contains(&genre));
            seen.insert(genre);
        }
        // Sampling is not pinned to the top genre
        assert_eq!(seen.len(), 3);
    }

    #[test]
    fn test_choose_is_reproducible_with_seed() {
        let ranking = GenreRanking::from_votes(vec![
            (Genre::Action, 3),
            (Genre::Comedy, 2),
            (Genre::Drama, 1),
        ]);
        let picks = |seed| {
            let mut rng = StdRng::seed_from_u64(seed);
            (0..10)
                .map(|_| ranking.choose(&mut rng).unwrap())
                .collect::<Vec<_>>()
        };
        assert_eq!(picks(42), picks(42));
    }
}
