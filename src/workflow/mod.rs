pub mod crawl_ctx;
pub mod crawl_flow;
pub mod progress;

pub use crawl_ctx::ParseCtx;
pub use crawl_flow::{CodeAttempt, CodeOutcome, CrawlFlow, CrawlResult};
pub use progress::FetchProgress;
