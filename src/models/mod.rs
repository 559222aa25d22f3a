use serde::{Deserialize, Serialize};

pub mod genre;
pub mod movie;
pub mod rating;
pub mod user;

pub use genre::{Genre, GenreWeights, GENRE_COUNT};
pub use movie::Movie;
pub use rating::{clamp_rating, Rating, RatingReport};
pub use user::User;

// ============================================================================
// Recommendation API Types
// ============================================================================

/// Body of `POST /api/v1/recommendations`
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RecommendationRequest {
    #[serde(default)]
    pub user: UserSelector,
    #[serde(default)]
    pub list_movie: WatchList,
}

/// Identifies an existing user, or asks for a new one when `userId` is null
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserSelector {
    #[serde(default)]
    pub user_id: Option<i32>,
}

/// Movies the user reports having watched
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WatchList {
    #[serde(default, deserialize_with = "null_as_empty")]
    pub list_movie: Vec<WatchedMovie>,
}

/// One watched movie and its rating
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WatchedMovie {
    pub movies_id: i32,
    #[serde(default, deserialize_with = "null_as_zero")]
    pub rating: f64,
}

/// Body returned by a successful recommendation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecommendationResponse {
    pub user_id: i32,
    pub recommendation: RecommendedMovie,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecommendedMovie {
    pub movie_id: i32,
    pub title: Option<String>,
}

impl From<Movie> for RecommendedMovie {
    fn from(movie: Movie) -> Self {
        Self {
            movie_id: movie.movie_id,
            title: movie.title,
        }
    }
}

fn null_as_empty<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: serde::Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Option::<Vec<T>>::deserialize(deserializer)?.unwrap_or_default())
}

fn null_as_zero<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(Option::<f64>::deserialize(deserializer)?.unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_request_deserializes_wire_format() {
        let body = json!({
            "user": { "userId": 42 },
            "list_movie": { "listMovie": [
                { "moviesId": 7, "rating": 3.5 },
                { "moviesId": 9 }
            ] }
        });

        let request: RecommendationRequest = serde_json::from_value(body).unwrap();
        assert_eq!(request.user.user_id, Some(42));
        assert_eq!(
            request.list_movie.list_movie,
            vec![
                WatchedMovie { movies_id: 7, rating: 3.5 },
                WatchedMovie { movies_id: 9, rating: 0.0 },
            ]
        );
    }

    #[test]
    fn test_request_accepts_nulls() {
        let body = json!({
            "user": { "userId": null },
            "list_movie": { "listMovie": null }
        });

        let request: RecommendationRequest = serde_json::from_value(body).unwrap();
        assert_eq!(request.user.user_id, None);
        assert!(request.list_movie.list_movie.is_empty());
    }

    #[test]
    fn test_response_serializes_wire_format() {
        let response = RecommendationResponse {
            user_id: 3,
            recommendation: RecommendedMovie {
                movie_id: 11,
                title: Some("Heat".to_string()),
            },
        };

        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(
            json,
            json!({ "userId": 3, "recommendation": { "movieId": 11, "title": "Heat" } })
        );
    }
}
