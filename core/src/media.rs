use std::collections::HashMap;

use chrono::NaiveDate;
use serde::Serialize;

/// One uploaded file attached to a day.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaItem {
    pub name: String,
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

/// Metadata about a [`MediaItem`], without the payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MediaSummary {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,
    pub size_bytes: usize,
}

impl From<&MediaItem> for MediaSummary {
    fn from(item: &MediaItem) -> Self {
        Self {
            name: item.name.clone(),
            content_type: item.content_type.clone(),
            size_bytes: item.bytes.len(),
        }
    }
}

/// Uploaded media per `(user, date)`, held for the life of the process only.
///
/// Nothing here is written to disk; a restart drops every item.
#[derive(Debug, Default)]
pub struct MediaCache {
    items: HashMap<(String, NaiveDate), Vec<MediaItem>>,
}

impl MediaCache {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace whatever was attached to `(user_id, date)` with `items`.
    /// An empty `items` leaves the existing attachments alone.
    pub fn store(&mut self, user_id: &str, date: NaiveDate, items: Vec<MediaItem>) {
        if items.is_empty() {
            return;
        }
        self.items.insert((user_id.to_string(), date), items);
    }

    /// Add one item after whatever is already attached.
    pub fn append(&mut self, user_id: &str, date: NaiveDate, item: MediaItem) {
        self.items
            .entry((user_id.to_string(), date))
            .or_default()
            .push(item);
    }

    #[must_use]
    pub fn get(&self, user_id: &str, date: NaiveDate) -> &[MediaItem] {
        self.items
            .get(&(user_id.to_string(), date))
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    #[must_use]
    pub fn summaries(&self, user_id: &str, date: NaiveDate) -> Vec<MediaSummary> {
        self.get(user_id, date).iter().map(MediaSummary::from).collect()
    }
}
