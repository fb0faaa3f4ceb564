pub mod encoding;
pub mod fetcher;
pub mod models;
pub mod pagination;
pub mod parser;
pub mod service;

pub use fetcher::{HttpFetcher, PageFetcher};
pub use models::{ListingCard, RawListing};
pub use service::CrawlService;
