//! Market data access

pub mod feed;

pub use feed::{BarFeed, FeedError, MemoryFeed};
