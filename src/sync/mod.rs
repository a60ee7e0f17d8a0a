//! One synchronization pass per destination.
//!
//! A pass loads the existing output, fetches the source (conditionally when
//! the output exists and `check_modified` is on), appends new entries that
//! pass the keyword filters, and rewrites the output atomically.
//!
//! # Timestamps
//!
//! The output's mtime doubles as the `If-Modified-Since` value of the next
//! pass. It is set to the server's `Last-Modified` only when a conditional
//! fetch added at least one entry; every other write leaves the natural
//! write time.

pub mod channel;
pub mod filter;
pub mod merge;

use chrono::{DateTime, Utc};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

use crate::config::DestinationConfig;
use crate::feed::{
    fetch_feed, CodecError, FeedCodec, FeedEntry, FetchError, FetchOutcome, RssCodec,
};
use crate::util::{atomic_write, modified_time, set_modified_time};

pub use channel::{resolve_channel, FALLBACK_TITLE};
pub use filter::{entry_passes, text_matches};
pub use merge::MergedFeed;

/// Errors that abort a pass for one destination.
#[derive(Debug, Error)]
pub enum SyncError {
    /// The source could not be fetched (after any fallback)
    #[error("Failed to fetch feed: {0}")]
    Fetch(#[from] FetchError),
    /// The fetched source is not a readable feed
    #[error("Failed to decode remote feed: {0}")]
    Decode(#[source] CodecError),
    #[error("Failed to render output feed: {0}")]
    Render(#[source] CodecError),
    /// Reading or writing the output file failed
    #[error("I/O error on '{}': {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl SyncError {
    fn io(path: &Path, source: std::io::Error) -> Self {
        SyncError::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// How a pass ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncOutcome {
    /// The server answered 304; nothing was touched.
    NotModified,
    /// No existing and no new entries; no file was written.
    NothingToWrite,
    /// The output was rewritten.
    Written {
        existing: usize,
        added: usize,
        /// mtime applied from `Last-Modified`, if any.
        stamped: Option<DateTime<Utc>>,
    },
}

/// Runs synchronization passes against a shared HTTP client.
pub struct FeedSynchronizer<C: FeedCodec = RssCodec> {
    client: reqwest::Client,
    codec: C,
    check_modified: bool,
    timeout: Duration,
}

impl FeedSynchronizer<RssCodec> {
    pub fn new(client: reqwest::Client) -> Self {
        Self::with_codec(client, RssCodec)
    }
}

impl<C: FeedCodec> FeedSynchronizer<C> {
    pub fn with_codec(client: reqwest::Client, codec: C) -> Self {
        Self {
            client,
            codec,
            check_modified: true,
            timeout: crate::feed::FETCH_TIMEOUT,
        }
    }

    /// Globally enables or disables conditional fetching.
    ///
    /// When disabled, per-destination `check_modified` is ignored.
    pub fn check_modified(mut self, enabled: bool) -> Self {
        self.check_modified = enabled;
        self
    }

    /// Overrides the per-request timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Runs one pass for `dest`.
    ///
    /// # Errors
    ///
    /// - [`SyncError::Fetch`] for HTTP error statuses, oversized bodies, and
    ///   transport failures of the unconditional fetch
    /// - [`SyncError::Decode`] when the fetched content is not a feed
    /// - [`SyncError::Io`] / [`SyncError::Render`] when the output cannot be produced
    ///
    /// A malformed existing output is not an error; it is replaced.
    pub async fn sync(&self, dest: &DestinationConfig) -> Result<SyncOutcome, SyncError> {
        let output = dest.output.as_path();
        let (existing, output_mtime) = self.load_existing(output)?;

        let since = output_mtime.filter(|_| self.check_modified && dest.check_modified);
        let conditional = since.is_some();

        let fetched = match since {
            Some(since) => self.fetch_conditional(&dest.url, since).await?,
            None => self.fetch_unconditional(&dest.url).await?,
        };

        let (body, server_modified) = match fetched {
            FetchOutcome::NotModified => {
                tracing::info!(url = %dest.url, output = %output.display(), "Feed not modified");
                return Ok(SyncOutcome::NotModified);
            }
            FetchOutcome::Fetched {
                body,
                last_modified,
            } => (body, last_modified),
        };

        let remote = self.codec.decode(&body).map_err(SyncError::Decode)?;

        let mut merged = MergedFeed::from_existing(existing);
        let added = merged.absorb(remote.entries, &dest.include, &dest.exclude);

        if merged.is_empty() {
            tracing::info!(
                url = %dest.url,
                output = %output.display(),
                "No entries to write"
            );
            return Ok(SyncOutcome::NothingToWrite);
        }

        let channel = resolve_channel(dest, &remote.channel);
        let retained = merged.existing().len();
        let document = self
            .codec
            .render(&channel, &merged.into_entries())
            .map_err(SyncError::Render)?;
        atomic_write(output, &document).map_err(|e| SyncError::io(output, e))?;

        let stamped = match server_modified {
            Some(ts) if conditional && added > 0 => {
                set_modified_time(output, ts).map_err(|e| SyncError::io(output, e))?;
                Some(ts)
            }
            _ => None,
        };

        tracing::info!(
            url = %dest.url,
            output = %output.display(),
            existing = retained,
            added = added,
            "Wrote feed"
        );
        Ok(SyncOutcome::Written {
            existing: retained,
            added,
            stamped,
        })
    }

    /// Entries and mtime of the current output, if it exists.
    fn load_existing(
        &self,
        output: &Path,
    ) -> Result<(Vec<FeedEntry>, Option<DateTime<Utc>>), SyncError> {
        let Some(mtime) = modified_time(output).map_err(|e| SyncError::io(output, e))? else {
            return Ok((Vec::new(), None));
        };

        let bytes = std::fs::read(output).map_err(|e| SyncError::io(output, e))?;
        let entries = match self.codec.decode(&bytes) {
            Ok(feed) => feed.entries,
            Err(e) => {
                tracing::warn!(
                    path = %output.display(),
                    error = %e,
                    "Existing output is not a readable feed, starting empty"
                );
                Vec::new()
            }
        };
        tracing::debug!(
            path = %output.display(),
            entries = entries.len(),
            "Loaded existing output"
        );
        Ok((entries, Some(mtime)))
    }

    /// Falls back to an unconditional fetch on transport failure only.
    async fn fetch_conditional(
        &self,
        url: &str,
        since: DateTime<Utc>,
    ) -> Result<FetchOutcome, SyncError> {
        match fetch_feed(&self.client, url, Some(since), self.timeout).await {
            Ok(outcome) => Ok(outcome),
            Err(e) if e.is_transport() => {
                tracing::warn!(
                    url = %url,
                    error = %e,
                    "Conditional fetch failed, retrying without If-Modified-Since"
                );
                self.fetch_unconditional(url).await
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Plain GET. `Last-Modified` is discarded.
    async fn fetch_unconditional(&self, url: &str) -> Result<FetchOutcome, SyncError> {
        let outcome = match fetch_feed(&self.client, url, None, self.timeout).await? {
            FetchOutcome::Fetched { body, .. } => FetchOutcome::Fetched {
                body,
                last_modified: None,
            },
            FetchOutcome::NotModified => FetchOutcome::NotModified,
        };
        Ok(outcome)
    }
}
