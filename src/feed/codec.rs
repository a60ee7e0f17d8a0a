use thiserror::Error;

use super::parser::parse_feed;
use super::render::render_rss;
use super::types::{DecodedFeed, FeedEntry, OutputChannel};

/// Errors raised while turning bytes into a feed or a feed into bytes.
#[derive(Debug, Error)]
pub enum CodecError {
    /// Content parsed as neither RSS 2.0 nor Atom
    #[error("Feed is neither RSS nor Atom (RSS: {rss}; Atom: {atom})")]
    Unrecognized { rss: String, atom: String },
    /// XML writer failure while rendering
    #[error("Failed to render feed: {0}")]
    Render(String),
}

/// Serialization boundary between the merge engine and concrete feed formats.
pub trait FeedCodec: Send + Sync {
    /// Parses a feed document into channel metadata and entries.
    fn decode(&self, bytes: &[u8]) -> Result<DecodedFeed, CodecError>;

    /// Renders a complete feed document, entries in the given order.
    fn render(&self, channel: &OutputChannel, entries: &[FeedEntry])
        -> Result<Vec<u8>, CodecError>;
}

/// Reads RSS 2.0 or Atom, writes RSS 2.0 with iTunes extensions.
#[derive(Debug, Clone, Copy, Default)]
pub struct RssCodec;

impl FeedCodec for RssCodec {
    fn decode(&self, bytes: &[u8]) -> Result<DecodedFeed, CodecError> {
        parse_feed(bytes)
    }

    fn render(
        &self,
        channel: &OutputChannel,
        entries: &[FeedEntry],
    ) -> Result<Vec<u8>, CodecError> {
        render_rss(channel, entries)
    }
}
