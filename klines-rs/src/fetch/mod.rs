//! Chunked kline fetching

pub mod chunker;
pub mod events;
pub mod fetcher;
pub mod report;

pub use chunker::*;
pub use events::*;
pub use fetcher::*;
pub use report::*;
