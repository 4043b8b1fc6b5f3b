pub mod mirror_fetcher;
pub mod sheet_feed;

pub use mirror_fetcher::{Attempt, Fetched, MirrorFetcher, RetryPolicy};
pub use sheet_feed::{CsvSheetFeed, OrderFeed};
