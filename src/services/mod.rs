pub mod catalog;
pub mod pagination;
pub mod retry;
pub mod scheduler;
pub mod show_scraper;
pub mod sync;
pub mod validator;
pub mod variants;

pub use catalog::CatalogStats;
pub use pagination::{PageLayout, PaginationMapper};
pub use retry::{Attempt, Operation, RetryPolicy, with_retry};
pub use scheduler::EpisodeScheduler;
pub use show_scraper::ShowScraper;
pub use sync::{SyncDriver, SyncError, SyncReport};
pub use validator::ResourceValidator;
pub use variants::{Resolution, VariantPriority, VariantResolver};
