//! Author extraction for feed items.
//!
//! Feeds describe authors in many shapes: a bare name, an RSS-style
//! `email (Name)` string, Atom person records, Dublin Core creator lists,
//! or arbitrary JSON values. [`AuthorValue`] captures those shapes and
//! [`extract_authors`] folds them into a list of [`AuthorRecord`]s.

use regex::Regex;
use std::collections::HashMap;
use std::sync::OnceLock;

use super::types::AuthorRecord;

/// Item fields searched for authors, in priority order.
pub const AUTHOR_FIELDS: [&str; 4] = ["author", "authors", "dc_creator", "creator"];

const NAME_KEYS: [&str; 5] = ["name", "title", "displayName", "full_name", "author_name"];
const EMAIL_KEYS: [&str; 4] = ["email", "email_address", "author_email", "mail"];

/// String forms of empty or meaningless values that never name an author.
const NOISE_TOKENS: [&str; 6] = ["None", "[]", "{}", "()", "True", "False"];

/// An author-bearing value as found in a feed item.
#[derive(Debug, Clone, PartialEq)]
pub enum AuthorValue {
    Null,
    Bool(bool),
    Text(String),
    /// Any other scalar (numbers, dates), already in string form.
    Scalar(String),
    Mapping(Vec<(String, AuthorValue)>),
    List(Vec<AuthorValue>),
}

impl AuthorValue {
    pub fn text(value: impl Into<String>) -> Self {
        AuthorValue::Text(value.into())
    }

    /// Builds a mapping value from key/value pairs, skipping absent values.
    pub fn mapping<'a>(pairs: impl IntoIterator<Item = (&'a str, Option<&'a str>)>) -> Self {
        AuthorValue::Mapping(
            pairs
                .into_iter()
                .filter_map(|(k, v)| v.map(|v| (k.to_string(), AuthorValue::text(v))))
                .collect(),
        )
    }

    fn get(&self, key: &str) -> Option<&AuthorValue> {
        match self {
            AuthorValue::Mapping(pairs) => pairs.iter().find(|(k, _)| k == key).map(|(_, v)| v),
            _ => None,
        }
    }

    /// String form of a truthy scalar. Collections, null and `false` yield `None`.
    fn scalar_text(&self) -> Option<String> {
        let s = match self {
            AuthorValue::Text(s) | AuthorValue::Scalar(s) => s.trim().to_string(),
            AuthorValue::Bool(true) => "True".to_string(),
            _ => return None,
        };
        if s.is_empty() {
            None
        } else {
            Some(s)
        }
    }
}

impl From<&serde_json::Value> for AuthorValue {
    fn from(value: &serde_json::Value) -> Self {
        use serde_json::Value;
        match value {
            Value::Null => AuthorValue::Null,
            Value::Bool(b) => AuthorValue::Bool(*b),
            Value::Number(n) => AuthorValue::Scalar(n.to_string()),
            Value::String(s) => AuthorValue::Text(s.clone()),
            Value::Array(items) => AuthorValue::List(items.iter().map(AuthorValue::from).collect()),
            Value::Object(map) => AuthorValue::Mapping(
                map.iter()
                    .map(|(k, v)| (k.clone(), AuthorValue::from(v)))
                    .collect(),
            ),
        }
    }
}

fn email_with_name_pattern() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN
        .get_or_init(|| Regex::new(r"^([^@\s]+@[^@\s]+)\s*\(([^)]+)\)$").ok())
        .as_ref()
}

fn bare_email_pattern() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN
        .get_or_init(|| Regex::new(r"^[^@\s]+@[^@\s]+$").ok())
        .as_ref()
}

/// Parses `addr@host (Name)`, a bare `addr@host`, or a plain name.
pub fn parse_author_string(input: &str) -> Option<AuthorRecord> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return None;
    }

    if let Some(caps) = email_with_name_pattern().and_then(|re| re.captures(trimmed)) {
        return AuthorRecord::new(
            Some(caps[2].trim().to_string()),
            Some(caps[1].trim().to_string()),
        );
    }

    if bare_email_pattern().is_some_and(|re| re.is_match(trimmed)) {
        return AuthorRecord::new(None, Some(trimmed.to_string()));
    }

    AuthorRecord::named(trimmed)
}

fn normalize_mapping(value: &AuthorValue) -> Option<AuthorRecord> {
    let name = NAME_KEYS
        .iter()
        .find_map(|key| value.get(key).and_then(AuthorValue::scalar_text));

    let email = EMAIL_KEYS.iter().find_map(|key| {
        value
            .get(key)
            .and_then(AuthorValue::scalar_text)
            .filter(|s| s.contains('@'))
    });

    AuthorRecord::new(name, email)
}

/// Normalizes a single (non-list) author value.
pub fn normalize_single(value: &AuthorValue) -> Option<AuthorRecord> {
    match value {
        AuthorValue::Null | AuthorValue::Bool(_) => None,
        AuthorValue::Text(s) => parse_author_string(s),
        AuthorValue::Mapping(pairs) if pairs.is_empty() => None,
        AuthorValue::Mapping(_) => normalize_mapping(value),
        AuthorValue::Scalar(s) => {
            let s = s.trim();
            if NOISE_TOKENS.contains(&s) {
                return None;
            }
            parse_author_string(s)
        }
        AuthorValue::List(_) => normalize(value).into_iter().next(),
    }
}

/// Normalizes a value that may be a list, preserving element order.
///
/// Nested lists are flattened.
pub fn normalize(value: &AuthorValue) -> Vec<AuthorRecord> {
    match value {
        AuthorValue::List(items) => items.iter().flat_map(normalize).collect(),
        other => normalize_single(other).into_iter().collect(),
    }
}

/// Extracts authors from the first field in [`AUTHOR_FIELDS`] that yields any.
pub fn extract_authors(fields: &HashMap<&str, AuthorValue>) -> Vec<AuthorRecord> {
    for field in AUTHOR_FIELDS {
        let Some(value) = fields.get(field) else {
            continue;
        };
        let authors = normalize(value);
        if !authors.is_empty() {
            return authors;
        }
    }
    Vec::new()
}
