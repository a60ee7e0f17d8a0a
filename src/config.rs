//! Destination configuration, loaded from YAML (default) or TOML.
//!
//! The document holds a `feeds` list. Each item names a source `url` and
//! may define a base destination plus any number of `splits`, each split
//! being another destination fed from the same source:
//!
//! ```yaml
//! feeds:
//!   - url: https://example.com/podcast.xml
//!     output: out/tech.xml
//!     include: [tech]
//!     splits:
//!       - output: out/politics.xml
//!         include: [election]
//!         private: false
//! ```
use serde::de::{self, Deserializer, IgnoredAny, MapAccess, SeqAccess, Visitor};
use serde::Deserialize;
use std::fmt;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::util::{validate_url, UrlValidationError};

/// Output path used when a destination does not name one.
pub const DEFAULT_OUTPUT: &str = "filtered.xml";

// ============================================================================
// Error Types
// ============================================================================

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid YAML in config file: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Invalid TOML in config file: {0}")]
    Toml(#[from] toml::de::Error),

    /// Config file exceeds maximum allowed size.
    #[error("Config file too large: {0}")]
    TooLarge(String),

    #[error("Invalid feed url '{url}': {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: UrlValidationError,
    },
}

// ============================================================================
// Destination model
// ============================================================================

/// How the output channel description is chosen.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum DescriptionPolicy {
    /// Use the remote feed's description, subtitle or summary.
    #[default]
    Remote,
    /// Omit the description element.
    Suppress,
    /// Use this text.
    Literal(String),
}

impl DescriptionPolicy {
    /// Unset follows the remote feed, empty suppresses, anything else is literal.
    pub fn from_override(value: Option<String>) -> Self {
        match value {
            None => DescriptionPolicy::Remote,
            Some(text) if text.is_empty() => DescriptionPolicy::Suppress,
            Some(text) => DescriptionPolicy::Literal(text),
        }
    }
}

/// One synchronization target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DestinationConfig {
    pub url: String,
    pub output: PathBuf,
    pub include: Vec<String>,
    pub exclude: Vec<String>,
    pub title: Option<String>,
    pub description: DescriptionPolicy,
    /// Send `If-Modified-Since` based on the output file's mtime.
    pub check_modified: bool,
    /// Mark the output with `<itunes:block>yes</itunes:block>`.
    pub private: bool,
}

impl DestinationConfig {
    /// A destination for `url` with every other field at its default.
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            output: PathBuf::from(DEFAULT_OUTPUT),
            include: Vec::new(),
            exclude: Vec::new(),
            title: None,
            description: DescriptionPolicy::Remote,
            check_modified: true,
            private: true,
        }
    }
}

/// Forces `private` on every destination when `value` is set.
pub fn apply_private_override(feeds: &mut [DestinationConfig], value: Option<bool>) {
    if let Some(private) = value {
        for feed in feeds.iter_mut() {
            feed.private = private;
        }
    }
}

// ============================================================================
// Raw document
// ============================================================================

/// A boolean read permissively from any scalar or collection.
///
/// `null`, `false`, zero, empty strings and empty collections are false.
/// The YAML 1.1 words `no`/`off`/`false` are false and `yes`/`on`/`true`
/// are true. Any other value is true.
#[derive(Debug, Clone, PartialEq)]
struct Truthy {
    value: bool,
    /// Rendering of the original value when it was not a plain boolean.
    coerced_from: Option<String>,
}

impl Truthy {
    fn coerced(value: bool, original: impl fmt::Display) -> Self {
        Self {
            value,
            coerced_from: Some(original.to_string()),
        }
    }
}

struct TruthyVisitor;

impl<'de> Visitor<'de> for TruthyVisitor {
    type Value = Truthy;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a boolean or any value with a truthiness")
    }

    fn visit_bool<E: de::Error>(self, v: bool) -> Result<Truthy, E> {
        Ok(Truthy {
            value: v,
            coerced_from: None,
        })
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<Truthy, E> {
        Ok(Truthy::coerced(v != 0, v))
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<Truthy, E> {
        Ok(Truthy::coerced(v != 0, v))
    }

    fn visit_f64<E: de::Error>(self, v: f64) -> Result<Truthy, E> {
        Ok(Truthy::coerced(v != 0.0, v))
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<Truthy, E> {
        let value = match v.trim().to_ascii_lowercase().as_str() {
            "" | "false" | "no" | "off" => false,
            _ => true,
        };
        Ok(Truthy::coerced(value, format!("{:?}", v)))
    }

    fn visit_unit<E: de::Error>(self) -> Result<Truthy, E> {
        Ok(Truthy::coerced(false, "null"))
    }

    fn visit_none<E: de::Error>(self) -> Result<Truthy, E> {
        self.visit_unit()
    }

    fn visit_some<D: Deserializer<'de>>(self, deserializer: D) -> Result<Truthy, D::Error> {
        deserializer.deserialize_any(TruthyVisitor)
    }

    fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<Truthy, A::Error> {
        let mut len = 0usize;
        while seq.next_element::<IgnoredAny>()?.is_some() {
            len += 1;
        }
        Ok(Truthy::coerced(len > 0, format!("a list of {} items", len)))
    }

    fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Truthy, A::Error> {
        let mut len = 0usize;
        while map.next_entry::<IgnoredAny, IgnoredAny>()?.is_some() {
            len += 1;
        }
        Ok(Truthy::coerced(len > 0, format!("a mapping of {} entries", len)))
    }
}

/// Present keys, `null` included, always yield `Some`.
fn present_truthy<'de, D>(deserializer: D) -> Result<Option<Truthy>, D::Error>
where
    D: Deserializer<'de>,
{
    deserializer.deserialize_any(TruthyVisitor).map(Some)
}

/// Keywords may be written as bare numbers or booleans.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum Keyword {
    Text(String),
    Integer(i64),
    Float(f64),
    Bool(bool),
}

impl From<Keyword> for String {
    fn from(keyword: Keyword) -> Self {
        match keyword {
            Keyword::Text(s) => s,
            Keyword::Integer(i) => i.to_string(),
            Keyword::Float(f) => f.to_string(),
            Keyword::Bool(b) => b.to_string(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct RawDocument {
    #[serde(default)]
    feeds: Option<Vec<RawFeed>>,
}

/// Fields shared by a feed item and its splits.
#[derive(Debug, Default, Deserialize)]
struct RawDestination {
    #[serde(default)]
    output: Option<PathBuf>,
    #[serde(default)]
    include: Option<Vec<Keyword>>,
    #[serde(default)]
    exclude: Option<Vec<Keyword>>,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default, deserialize_with = "present_truthy")]
    check_modified: Option<Truthy>,
    #[serde(default, deserialize_with = "present_truthy")]
    private: Option<Truthy>,
}

#[derive(Debug, Deserialize)]
struct RawFeed {
    url: String,
    #[serde(flatten)]
    base: RawDestination,
    #[serde(default)]
    splits: Option<Vec<RawDestination>>,
    /// Older spelling of `splits`.
    #[serde(default)]
    split: Option<Vec<RawDestination>>,
}

const FEED_KEYS: [&str; 10] = [
    "url",
    "output",
    "include",
    "exclude",
    "title",
    "description",
    "check_modified",
    "private",
    "splits",
    "split",
];
const SPLIT_KEYS: [&str; 7] = [
    "output",
    "include",
    "exclude",
    "title",
    "description",
    "check_modified",
    "private",
];

fn keywords(raw: Option<Vec<Keyword>>, field: &str, url: &str) -> Vec<String> {
    let words: Vec<String> = raw.unwrap_or_default().into_iter().map(String::from).collect();
    if words.iter().any(String::is_empty) {
        tracing::warn!(url = %url, field = field, "Empty keyword matches every entry");
    }
    words
}

fn flag(raw: Option<Truthy>, default: bool, field: &str, url: &str) -> bool {
    match raw {
        None => default,
        Some(Truthy {
            value,
            coerced_from: None,
        }) => value,
        Some(Truthy {
            value,
            coerced_from: Some(original),
        }) => {
            tracing::warn!(
                url = %url,
                field = field,
                original = %original,
                value = value,
                "Non-boolean config value coerced"
            );
            value
        }
    }
}

impl RawDestination {
    /// A base destination exists only when the item says something about one.
    fn defines_destination(&self) -> bool {
        self.output.is_some()
            || self.include.as_ref().is_some_and(|v| !v.is_empty())
            || self.exclude.as_ref().is_some_and(|v| !v.is_empty())
            || self.title.as_ref().is_some_and(|t| !t.is_empty())
            || self.description.as_ref().is_some_and(|d| !d.is_empty())
    }

    fn into_destination(self, url: &str, inherited_check_modified: bool) -> DestinationConfig {
        DestinationConfig {
            url: url.to_string(),
            output: self.output.unwrap_or_else(|| PathBuf::from(DEFAULT_OUTPUT)),
            include: keywords(self.include, "include", url),
            exclude: keywords(self.exclude, "exclude", url),
            title: self.title,
            description: DescriptionPolicy::from_override(self.description),
            check_modified: flag(
                self.check_modified,
                inherited_check_modified,
                "check_modified",
                url,
            ),
            private: flag(self.private, true, "private", url),
        }
    }
}

impl RawFeed {
    fn into_destinations(mut self) -> Result<Vec<DestinationConfig>, ConfigError> {
        let url = self.url.trim().to_string();
        validate_url(&url).map_err(|source| ConfigError::InvalidUrl {
            url: url.clone(),
            source,
        })?;

        let check_modified = flag(self.base.check_modified.take(), true, "check_modified", &url);
        let mut destinations = Vec::new();

        if self.base.defines_destination() {
            destinations.push(self.base.into_destination(&url, check_modified));
        }

        let splits = self
            .splits
            .filter(|s| !s.is_empty())
            .or(self.split)
            .unwrap_or_default();
        for split in splits {
            destinations.push(split.into_destination(&url, check_modified));
        }

        if destinations.is_empty() {
            tracing::warn!(url = %url, "Feed entry defines no output, skipping");
        }
        Ok(destinations)
    }
}

/// Warns about keys that the loader ignores.
fn warn_unknown_keys(raw: &serde_json::Value) {
    let Some(root) = raw.as_object() else {
        return;
    };
    for key in root.keys().filter(|k| k.as_str() != "feeds") {
        tracing::warn!(key = %key, "Unknown key in config file, ignoring");
    }

    let feeds = root.get("feeds").and_then(|f| f.as_array());
    for feed in feeds.into_iter().flatten().filter_map(|f| f.as_object()) {
        for key in feed.keys().filter(|k| !FEED_KEYS.contains(&k.as_str())) {
            tracing::warn!(key = %key, "Unknown key in feed entry, ignoring");
        }
        let splits = ["splits", "split"]
            .iter()
            .filter_map(|name| feed.get(*name).and_then(|s| s.as_array()))
            .flatten()
            .filter_map(|s| s.as_object());
        for split in splits {
            for key in split.keys().filter(|k| !SPLIT_KEYS.contains(&k.as_str())) {
                tracing::warn!(key = %key, "Unknown key in split, ignoring");
            }
        }
    }
}

// ============================================================================
// Loading
// ============================================================================

/// File format, chosen by extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    Yaml,
    Toml,
}

impl ConfigFormat {
    pub fn for_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("toml") => ConfigFormat::Toml,
            _ => ConfigFormat::Yaml,
        }
    }
}

/// All destinations declared in a config file, in declaration order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Config {
    pub feeds: Vec<DestinationConfig>,
}

impl Config {
    /// Maximum config file size (1 MB).
    const MAX_FILE_SIZE: u64 = 1_048_576;

    /// Load configuration from a YAML or TOML file.
    ///
    /// - Missing file → `Err(ConfigError::Io)`
    /// - Empty file, missing or empty `feeds` → no destinations
    /// - Feed item without `url` → parse error
    /// - Unknown keys → ignored, logged as warning
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let meta = std::fs::metadata(path)?;
        if meta.len() > Self::MAX_FILE_SIZE {
            return Err(ConfigError::TooLarge(format!(
                "Config file is {} bytes (max {} bytes)",
                meta.len(),
                Self::MAX_FILE_SIZE
            )));
        }

        let content = std::fs::read_to_string(path)?;
        let config = Self::parse(&content, ConfigFormat::for_path(path))?;
        tracing::info!(
            path = %path.display(),
            destinations = config.feeds.len(),
            "Loaded configuration"
        );
        Ok(config)
    }

    /// Parses config text in the given format.
    pub fn parse(content: &str, format: ConfigFormat) -> Result<Self, ConfigError> {
        let blank = content.lines().all(|line| {
            let line = line.trim();
            line.is_empty() || line.starts_with('#')
        });
        if blank {
            tracing::debug!("Config is empty, no destinations");
            return Ok(Self::default());
        }

        let document = match format {
            ConfigFormat::Yaml => {
                if let Ok(raw) = serde_yaml::from_str::<serde_json::Value>(content) {
                    warn_unknown_keys(&raw);
                }
                serde_yaml::from_str::<Option<RawDocument>>(content)?.unwrap_or_default()
            }
            ConfigFormat::Toml => {
                if let Ok(raw) = toml::from_str::<serde_json::Value>(content) {
                    warn_unknown_keys(&raw);
                }
                toml::from_str::<RawDocument>(content)?
            }
        };

        let mut feeds = Vec::new();
        for item in document.feeds.unwrap_or_default() {
            feeds.extend(item.into_destinations()?);
        }
        Ok(Self { feeds })
    }
}

// ============================================================================
// Tests
// ============================================================================
