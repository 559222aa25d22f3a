use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Lowest rating a user can give
pub const MIN_RATING: f64 = 0.0;
/// Highest rating a user can give
pub const MAX_RATING: f64 = 5.0;

/// Clamps a reported rating into `[MIN_RATING, MAX_RATING]`
///
/// Non-finite input is treated as the lowest rating.
pub fn clamp_rating(rating: f64) -> f64 {
    if rating.is_nan() {
        return MIN_RATING;
    }
    rating.clamp(MIN_RATING, MAX_RATING)
}

/// A single watched-movie report, ready to be written to the ledger
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RatingReport {
    pub user_id: i32,
    pub movie_id: i32,
    pub rating: f64,
    pub timestamp: DateTime<Utc>,
}

impl RatingReport {
    /// Builds a report stamped with the current time and a clamped rating
    pub fn new(user_id: i32, movie_id: i32, rating: f64) -> Self {
        Self {
            user_id,
            movie_id,
            rating: clamp_rating(rating),
            timestamp: Utc::now(),
        }
    }
}

/// A row of the `movies_users_rating` table
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Rating {
    pub user_id: i32,
    pub movie_id: i32,
    pub rating: Option<f64>,
    pub timestamp: DateTime<Utc>,
    pub is_recommended: bool,
    pub is_used_to_train: bool,
}

impl From<&RatingReport> for Rating {
    fn from(report: &RatingReport) -> Self {
        Self {
            user_id: report.user_id,
            movie_id: report.movie_id,
            rating: Some(report.rating),
            timestamp: report.timestamp,
            is_recommended: false,
            is_used_to_train: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clamp_rating_bounds() {
        assert_eq!(clamp_rating(-1.5), 0.0);
        assert_eq!(clamp_rating(7.0), 5.0);
        assert_eq!(clamp_rating(3.5), 3.5);
        assert_eq!(clamp_rating(f64::INFINITY), 5.0);
        assert_eq!(clamp_rating(f64::NEG_INFINITY), 0.0);
        assert_eq!(clamp_rating(f64::NAN), 0.0);
    }

    #[test]
    fn test_report_new_clamps() {
        let report = RatingReport::new(1, 2, 9.0);
        assert_eq!(report.rating, 5.0);
        assert_eq!(report.user_id, 1);
        assert_eq!(report.movie_id, 2);
    }
}
