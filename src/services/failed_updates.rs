use std::fs::{self, OpenOptions};
use std::path::PathBuf;

use chrono::Utc;
use serde::Serialize;

use crate::{error::AppResult, models::RatingReport};

/// CSV layout of a spilled rating
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SpilledRating {
    user_id: i32,
    movie_id: i32,
    rating: f64,
    timestamp: String,
}

impl From<&RatingReport> for SpilledRating {
    fn from(report: &RatingReport) -> Self {
        Self {
            user_id: report.user_id,
            movie_id: report.movie_id,
            rating: report.rating,
            timestamp: report.timestamp.to_rfc3339(),
        }
    }
}

/// Writes ratings that could be neither inserted nor updated to a side file
#[derive(Debug, Clone)]
pub struct FailedUpdateSpill {
    dir: PathBuf,
}

impl FailedUpdateSpill {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Appends the reports to `failed_movie_updates_<unix seconds>.csv`
    ///
    /// Returns the file written, or `None` when there was nothing to spill.
    pub fn persist(&self, reports: &[RatingReport]) -> AppResult<Option<PathBuf>> {
        if reports.is_empty() {
            return Ok(None);
        }

        fs::create_dir_all(&self.dir)?;
        let path = self
            .dir
            .join(format!("failed_movie_updates_{}.csv", Utc::now().timestamp()));

        let is_new = !path.exists();
        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        let mut writer = csv::WriterBuilder::new()
            .has_headers(is_new)
            .from_writer(file);

        for report in reports {
            writer
                .serialize(SpilledRating::from(report))
                .map_err(std::io::Error::from)?;
        }
        writer.flush()?;

        tracing::warn!(
            path = %path.display(),
            count = reports.len(),
            "Spilled ratings that could not be updated"
        );

        Ok(Some(path))
    }
}
