//! Feed model, decoding, rendering and fetching.
//!
//! - [`types`] - Format-neutral entry and channel records
//! - [`author`] - Author normalization over heterogeneous input shapes
//! - [`parser`] - RSS 2.0 / Atom decoding via the `rss` and `atom_syndication` crates
//! - [`render`] - RSS 2.0 output via `quick-xml`
//! - [`codec`] - The [`FeedCodec`] seam the synchronizer is written against
//! - [`fetcher`] - Single conditional HTTP GET

pub mod author;
pub mod codec;
pub mod fetcher;
pub mod parser;
pub mod render;
pub mod types;

pub use codec::{CodecError, FeedCodec, RssCodec};
pub use fetcher::{fetch_feed, FetchError, FetchOutcome, FETCH_TIMEOUT};
pub use types::{
    AuthorRecord, ContentBlock, DecodedFeed, Enclosure, FeedEntry, OutputChannel, RemoteChannel,
};
