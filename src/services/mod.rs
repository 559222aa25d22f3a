pub mod failed_updates;
pub mod inference;
pub mod ingest;
pub mod ledger;
pub mod recommendations;

pub use failed_updates::FailedUpdateSpill;
pub use inference::{GenreModel, GenreRanking};
pub use recommendations::RecommendationService;
