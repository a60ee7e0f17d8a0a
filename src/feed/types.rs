/// A normalized author: at least one of `name` or `email` is always set.
///
/// Construct through [`AuthorRecord::new`], which returns `None` when both
/// fields would be empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthorRecord {
    pub name: Option<String>,
    pub email: Option<String>,
}

impl AuthorRecord {
    /// Placeholder shown when a record has neither name nor email.
    pub const UNKNOWN: &'static str = "Unknown Author";

    pub fn new(name: Option<String>, email: Option<String>) -> Option<Self> {
        let name = name.filter(|n| !n.is_empty());
        let email = email.filter(|e| !e.is_empty());
        if name.is_none() && email.is_none() {
            return None;
        }
        Some(Self { name, email })
    }

    pub fn named(name: impl Into<String>) -> Option<Self> {
        Self::new(Some(name.into()), None)
    }

    /// Formats as `name <email>`, falling back to whichever field is present.
    pub fn format_for_display(&self) -> String {
        match (self.name.as_deref(), self.email.as_deref()) {
            (Some(name), Some(email)) => format!("{} <{}>", name, email),
            (Some(name), None) => name.to_string(),
            (None, Some(email)) => email.to_string(),
            (None, None) => Self::UNKNOWN.to_string(),
        }
    }
}

/// Inline item content (RSS `content:encoded`, Atom `<content>`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentBlock {
    pub value: String,
    pub mime_type: Option<String>,
}

/// A media attachment. Only `href` is required.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Enclosure {
    pub href: String,
    pub length: Option<u64>,
    pub mime_type: Option<String>,
}

/// One decoded feed item, either from the remote source or from the
/// previously written output.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FeedEntry {
    /// Explicit identifier (RSS `guid`, Atom `id`).
    pub id: Option<String>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub summary: Option<String>,
    pub link: Option<String>,
    /// Publication date exactly as the source wrote it.
    pub published: Option<String>,
    pub authors: Vec<AuthorRecord>,
    pub content: Vec<ContentBlock>,
    pub enclosures: Vec<Enclosure>,
}

impl FeedEntry {
    /// Deduplication key: the explicit id if present, else the link.
    ///
    /// Returns `None` for unidentifiable entries.
    pub fn identity(&self) -> Option<&str> {
        self.id
            .as_deref()
            .filter(|id| !id.is_empty())
            .or_else(|| self.link.as_deref().filter(|link| !link.is_empty()))
    }
}

/// Channel-level metadata of a decoded feed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RemoteChannel {
    pub title: Option<String>,
    pub link: Option<String>,
    pub description: Option<String>,
    pub subtitle: Option<String>,
    pub summary: Option<String>,
}

/// Result of decoding a feed document.
#[derive(Debug, Clone, Default)]
pub struct DecodedFeed {
    pub channel: RemoteChannel,
    pub entries: Vec<FeedEntry>,
}

/// Channel metadata handed to the renderer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputChannel {
    pub title: String,
    pub link: Option<String>,
    /// `None` omits the `<description>` element entirely.
    pub description: Option<String>,
    /// Emits `<itunes:block>yes</itunes:block>` when set.
    pub private: bool,
}
