//! Batch writes of watched-movie reports into the rating history.

use crate::{
    db::{InsertOutcome, Ledger},
    error::AppResult,
    models::{RatingReport, WatchedMovie},
};

/// What happened to each report of a batch
#[derive(Debug, Default)]
pub struct BatchOutcome {
    /// Reports written as new rows
    pub inserted: usize,
    /// Reports whose (user, movie) row already existed; candidates for an update
    pub conflicts: Vec<RatingReport>,
    /// Reports skipped because they broke an integrity rule
    pub rejected: usize,
    /// Reports lost to unexpected database failures
    pub failed: usize,
}

impl BatchOutcome {
    pub fn total(&self) -> usize {
        self.inserted + self.conflicts.len() + self.rejected + self.failed
    }
}

/// Converts the watch list into reports and inserts them one by one
///
/// A failure on one report never aborts the others. The batch only fails
/// when every report hit an unexpected database error.
pub async fn record_ratings(
    ledger: &dyn Ledger,
    user_id: i32,
    watched: &[WatchedMovie],
) -> AppResult<BatchOutcome> {
    let mut outcome = BatchOutcome::default();
    let mut last_error = None;

    for movie in watched {
        let report = RatingReport::new(user_id, movie.movies_id, movie.rating);

        match ledger.insert_rating(&report).await {
            Ok(InsertOutcome::Inserted) => outcome.inserted += 1,
            Ok(InsertOutcome::Conflict) => outcome.conflicts.push(report),
            Ok(InsertOutcome::Rejected(reason)) => {
                tracing::warn!(
                    user_id,
                    movie_id = report.movie_id,
                    reason = %reason,
                    "Skipping rating that violates integrity rules"
                );
                outcome.rejected += 1;
            }
            Err(e) => {
                tracing::error!(
                    user_id,
                    movie_id = report.movie_id,
                    error = %e,
                    "Failed to insert rating"
                );
                outcome.failed += 1;
                last_error = Some(e);
            }
        }
    }

    if outcome.failed > 0 && outcome.failed == outcome.total() {
        if let Some(e) = last_error {
            return Err(e);
        }
    }

    if outcome.failed > 0 || outcome.rejected > 0 {
        tracing::warn!(
            user_id,
            inserted = outcome.inserted,
            conflicts = outcome.conflicts.len(),
            rejected = outcome.rejected,
            failed = outcome.failed,
            "Partial rating batch"
        );
    } else {
        tracing::debug!(
            user_id,
            inserted = outcome.inserted,
            conflicts = outcome.conflicts.len(),
            "Recorded rating batch"
        );
    }

    Ok(outcome)
}

/// Overwrites the existing row for each conflicting report
///
/// Returns the reports that could not be updated.
pub async fn apply_update_fallback(
    ledger: &dyn Ledger,
    conflicts: Vec<RatingReport>,
) -> Vec<RatingReport> {
    let mut still_failed = Vec::new();

    for report in conflicts {
        match ledger.update_rating(&report).await {
            Ok(true) => {}
            Ok(false) => {
                tracing::warn!(
                    user_id = report.user_id,
                    movie_id = report.movie_id,
                    "No existing row to update"
                );
                still_failed.push(report);
            }
            Err(e) => {
                tracing::error!(
                    user_id = report.user_id,
                    movie_id = report.movie_id,
                    error = %e,
                    "Failed to update rating"
                );
                still_failed.push(report);
            }
        }
    }

    still_failed
}
