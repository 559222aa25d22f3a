use serde::Serialize;

use super::genre::GenreWeights;

/// An end-user and the genre profile derived from their ratings
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub user_id: i32,
    pub count_movies: i32,
    pub genre_weights: GenreWeights,
}

impl User {
    /// A freshly created user with no ratings and an all-zero profile
    pub fn new(user_id: i32) -> Self {
        Self {
            user_id,
            count_movies: 0,
            genre_weights: GenreWeights::default(),
        }
    }
}
