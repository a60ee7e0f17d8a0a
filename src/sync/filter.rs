use crate::feed::FeedEntry;

/// Case-insensitive substring match of any needle against `haystack`.
///
/// An empty needle list never matches. An empty needle matches anything.
pub fn text_matches(haystack: &str, needles: &[String]) -> bool {
    if needles.is_empty() {
        return false;
    }
    let haystack = haystack.to_lowercase();
    needles
        .iter()
        .any(|needle| haystack.contains(&needle.to_lowercase()))
}

/// Text searched by the keyword filters: title, description and summary
/// joined by single spaces, missing fields as empty strings.
fn searchable_text(entry: &FeedEntry) -> String {
    [&entry.title, &entry.description, &entry.summary]
        .iter()
        .map(|field| field.as_deref().unwrap_or(""))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Applies exclude, then include, to an entry.
pub fn entry_passes(entry: &FeedEntry, include: &[String], exclude: &[String]) -> bool {
    let text = searchable_text(entry);
    if !exclude.is_empty() && text_matches(&text, exclude) {
        return false;
    }
    if !include.is_empty() && !text_matches(&text, include) {
        return false;
    }
    true
}
