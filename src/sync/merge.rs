use std::collections::HashSet;

use super::filter::entry_passes;
use crate::feed::FeedEntry;

/// The ordered item sequence of one pass: retained entries, then new ones.
#[derive(Debug, Clone, Default)]
pub struct MergedFeed {
    existing: Vec<FeedEntry>,
    added: Vec<FeedEntry>,
}

impl MergedFeed {
    /// Starts from the entries already in the output.
    ///
    /// Entries without an identity, and later duplicates of an identity,
    /// are not retained.
    pub fn from_existing(entries: Vec<FeedEntry>) -> Self {
        let mut seen = HashSet::new();
        let mut existing = Vec::with_capacity(entries.len());
        for entry in entries {
            let Some(id) = entry.identity().map(str::to_string) else {
                tracing::debug!("Dropping existing entry without id or link");
                continue;
            };
            if seen.contains(&id) {
                tracing::debug!(identity = %id, "Dropping duplicate existing entry");
                continue;
            }
            seen.insert(id);
            existing.push(entry);
        }
        Self {
            existing,
            added: Vec::new(),
        }
    }

    /// Identities of every entry currently in the merged set.
    pub fn identities(&self) -> HashSet<&str> {
        self.entries().filter_map(FeedEntry::identity).collect()
    }

    /// Appends the remote entries that are identifiable, unseen and pass
    /// the keyword filters. Returns how many were added.
    pub fn absorb(
        &mut self,
        remote: Vec<FeedEntry>,
        include: &[String],
        exclude: &[String],
    ) -> usize {
        let mut known: HashSet<String> =
            self.identities().into_iter().map(str::to_string).collect();
        let before = self.added.len();

        for entry in remote {
            let Some(id) = entry.identity().map(str::to_string) else {
                tracing::debug!(title = ?entry.title, "Skipping remote entry without id or link");
                continue;
            };
            if known.contains(&id) {
                continue;
            }
            if !entry_passes(&entry, include, exclude) {
                tracing::debug!(identity = %id, "Entry rejected by keyword filters");
                continue;
            }
            known.insert(id);
            self.added.push(entry);
        }

        self.added.len() - before
    }

    pub fn existing(&self) -> &[FeedEntry] {
        &self.existing
    }

    pub fn is_empty(&self) -> bool {
        self.existing.is_empty() && self.added.is_empty()
    }

    pub fn entries(&self) -> impl Iterator<Item = &FeedEntry> {
        self.existing.iter().chain(self.added.iter())
    }

    /// Flattens into the render order.
    pub fn into_entries(self) -> Vec<FeedEntry> {
        let mut entries = self.existing;
        entries.extend(self.added);
        entries
    }
}
