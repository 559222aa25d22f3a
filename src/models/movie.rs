use serde::{Deserialize, Serialize};

/// A catalog movie, populated by the offline ingestion job
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Movie {
    pub movie_id: i32,
    pub title: Option<String>,
    /// Pipe-delimited genre labels, e.g. `Action|Sci-Fi`
    pub genres: Option<String>,
}

impl Movie {
    /// Whether the genres field starts with the given label
    pub fn genres_start_with(&self, label: &str) -> bool {
        self.genres
            .as_deref()
            .is_some_and(|genres| genres.starts_with(label))
    }
}
