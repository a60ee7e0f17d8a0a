//! Keeps filtered copies of podcast and news feeds in sync with their sources.
//!
//! Each configured destination pairs a source URL with an output file and
//! keyword filters. A [`sync::FeedSynchronizer`] pass fetches the source,
//! appends entries that are new and pass the filters, and rewrites the
//! output as RSS 2.0.

pub mod config;
pub mod feed;
pub mod sync;
pub mod util;

pub use config::{
    apply_private_override, Config, ConfigError, DescriptionPolicy, DestinationConfig,
};
pub use sync::{FeedSynchronizer, SyncError, SyncOutcome};
