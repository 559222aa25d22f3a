//! The recommendation request flow.
//!
//! One request walks through these steps, any of which may end it early:
//!
//! 1. resolve the user, creating one when the caller has no id yet
//! 2. persist the reported ratings, updating rows that already exist
//! 3. infer a genre from the user's refreshed genre profile
//! 4. pick the first movie of that genre the user has no row for
//! 5. record the recommendation itself in the rating history
//!
//! Step 5 is best effort: its failure is logged and the response is still sent.

use std::sync::Arc;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::{
    db::{Catalog, Ledger},
    error::{AppError, AppResult},
    models::{RecommendationRequest, RecommendationResponse, RatingReport, User},
    services::{
        failed_updates::FailedUpdateSpill,
        inference::GenreModel,
        ledger::{apply_update_fallback, record_ratings},
    },
};

/// Drives a recommendation request against the catalog, ledger and model
pub struct RecommendationService {
    catalog: Arc<dyn Catalog>,
    ledger: Arc<dyn Ledger>,
    model: Arc<GenreModel>,
    spill: FailedUpdateSpill,
}

impl RecommendationService {
    pub fn new(
        catalog: Arc<dyn Catalog>,
        ledger: Arc<dyn Ledger>,
        model: Arc<GenreModel>,
        spill: FailedUpdateSpill,
    ) -> Self {
        Self {
            catalog,
            ledger,
            model,
            spill,
        }
    }

    /// Handles a request with a freshly seeded random generator
    pub async fn recommend(
        &self,
        request: &RecommendationRequest,
    ) -> AppResult<RecommendationResponse> {
        let mut rng = StdRng::from_entropy();
        self.recommend_with_rng(request, &mut rng).await
    }

    /// Handles a request, drawing the genre choice from `rng`
    pub async fn recommend_with_rng<R: Rng + Send>(
        &self,
        request: &RecommendationRequest,
        rng: &mut R,
    ) -> AppResult<RecommendationResponse> {
        let watched = &request.list_movie.list_movie;
        let (user, is_new_user) = self.resolve_user(request.user.user_id, watched.len()).await?;
        let user_id = user.user_id;

        let user = if watched.is_empty() {
            user
        } else {
            let outcome = record_ratings(self.ledger.as_ref(), user_id, watched).await?;
            if is_new_user && outcome.inserted == 0 {
                return Err(AppError::InvalidInput(
                    "Missing movie history (movie ids provided don't exist)".to_string(),
                ));
            }

            let still_failed = apply_update_fallback(self.ledger.as_ref(), outcome.conflicts).await;
            self.spill_failed_updates(still_failed).await;

            self.catalog.refresh_user_features(user_id).await?
        };

        let genre = self.model.rank_genres(&user)?.choose(rng)?;
        tracing::debug!(user_id, genre = %genre, "Inferred genre");

        let history = self.ledger.user_history(user_id).await?;
        let movie = self
            .catalog
            .find_unseen_movie_by_genre_prefix(&history, genre.label())
            .await?
            .ok_or_else(|| AppError::NotFound("No new movies to recommend".to_string()))?;

        if let Err(e) = self
            .ledger
            .record_recommendation(user_id, movie.movie_id)
            .await
        {
            tracing::error!(
                user_id,
                movie_id = movie.movie_id,
                error = %e,
                "Failed to record recommendation"
            );
        }

        tracing::info!(
            user_id,
            movie_id = movie.movie_id,
            genre = %genre,
            new_user = is_new_user,
            "Recommended movie"
        );

        Ok(RecommendationResponse {
            user_id,
            recommendation: movie.into(),
        })
    }

    /// A `userId` of 0 means the caller has no account yet
    async fn resolve_user(&self, user_id: Option<i32>, reports: usize) -> AppResult<(User, bool)> {
        match user_id.filter(|id| *id != 0) {
            None if reports == 0 => Err(AppError::InvalidInput(
                "Missing movie history".to_string(),
            )),
            None => Ok((self.catalog.create_user(None).await?, true)),
            Some(id) => self
                .catalog
                .get_user(id)
                .await?
                .map(|user| (user, false))
                .ok_or_else(|| AppError::InvalidInput("User doesn't exist".to_string())),
        }
    }

    async fn spill_failed_updates(&self, reports: Vec<RatingReport>) {
        if reports.is_empty() {
            return;
        }

        let spill = self.spill.clone();
        let result = tokio::task::spawn_blocking(move || {
            let written = spill.persist(&reports);
            (written, reports)
        })
        .await;

        match result {
            Ok((Ok(_), _)) => {}
            Ok((Err(e), reports)) => {
                for report in &reports {
                    tracing::error!(
                        user_id = report.user_id,
                        movie_id = report.movie_id,
                        rating = report.rating,
                        error = %e,
                        "Lost rating update, spill file not writable"
                    );
                }
            }
            Err(e) => tracing::error!(error = %e, "Spill task failed"),
        }
    }
}
