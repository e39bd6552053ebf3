pub mod episode;
pub mod show;

pub use episode::{EpisodeRecord, EpisodeStatus, VariantOutcome};
pub use show::{ShowDetails, ShowLink, ShowRecord};
