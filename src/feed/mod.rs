mod client;
mod error;
mod parse;

pub use client::{FeedConfig, RawFeeds, fetch_feeds};
pub use error::{FeedKind, LoadError};
pub use parse::{ParsedFeeds, RiskFactors, parse_feeds};
