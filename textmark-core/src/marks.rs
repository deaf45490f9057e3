use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MarkId(Uuid);

impl MarkId {
    fn generate() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for MarkId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.simple())
    }
}

impl std::str::FromStr for MarkId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarkedText {
    pub id: MarkId,
    pub content: String,
    pub page_number: usize,
    pub timestamp: DateTime<Utc>,
}

/// Append-only list of marked passages. Entries are never merged, edited
/// or removed one by one; `clear` drops all of them.
#[derive(Debug, Default, Clone, Serialize)]
pub struct MarkedTextStore {
    entries: Vec<MarkedText>,
}

impl MarkedTextStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, content: impl Into<String>, page_number: usize) -> &MarkedText {
        self.entries.push(MarkedText {
            id: MarkId::generate(),
            content: content.into(),
            page_number,
            timestamp: Utc::now(),
        });
        let index = self.entries.len() - 1;
        &self.entries[index]
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn find(&self, id: MarkId) -> Option<&MarkedText> {
        self.entries.iter().find(|entry| entry.id == id)
    }

    /// Looks up by the textual id shown to the user. Accepts any unique
    /// prefix of at least four characters.
    pub fn find_by_label(&self, label: &str) -> Option<&MarkedText> {
        let label = label.trim().to_ascii_lowercase();
        if let Ok(id) = label.parse::<MarkId>() {
            return self.find(id);
        }
        if label.len() < 4 {
            return None;
        }
        let mut matches = self
            .entries
            .iter()
            .filter(|entry| entry.id.to_string().starts_with(&label));
        match (matches.next(), matches.next()) {
            (Some(entry), None) => Some(entry),
            _ => None,
        }
    }

    pub fn entries(&self) -> &[MarkedText] {
        &self.entries
    }

    pub fn iter(&self) -> impl Iterator<Item = &MarkedText> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_then_clear_empties_the_store() {
        let mut store = MarkedTextStore::new();
        store.add("first", 1);
        assert_eq!(store.len(), 1);
        store.clear();
        assert!(store.is_empty());
    }

    #[test]
    fn entries_keep_insertion_order_and_distinct_ids() {
        let mut store = MarkedTextStore::new();
        let first = store.add("alpha", 2).id;
        let second = store.add("beta", 5).id;

        assert_ne!(first, second);
        let contents: Vec<_> = store.iter().map(|e| e.content.as_str()).collect();
        assert_eq!(contents, ["alpha", "beta"]);
        assert_eq!(store.entries()[1].page_number, 5);
    }

    #[test]
    fn repeated_content_is_not_deduplicated() {
        let mut store = MarkedTextStore::new();
        for _ in 0..50 {
            store.add("same", 1);
        }
        assert_eq!(store.len(), 50);

        let mut ids: Vec<_> = store.iter().map(|e| e.id).collect();
        ids.sort_by_key(|id| id.to_string());
        ids.dedup();
        assert_eq!(ids.len(), 50);
    }

    #[test]
    fn find_locates_entries_by_id_and_label() {
        let mut store = MarkedTextStore::new();
        let id = store.add("needle", 3).id;
        store.add("hay", 3);

        assert_eq!(store.find(id).unwrap().content, "needle");

        let label = id.to_string();
        assert_eq!(store.find_by_label(&label).unwrap().content, "needle");
        assert_eq!(store.find_by_label(&label[..8]).unwrap().id, id);
        assert!(store.find_by_label("ab").is_none());
    }

    #[test]
    fn entries_serialize_with_plain_ids() {
        let mut store = MarkedTextStore::new();
        let id = store.add("json", 7).id;
        let value = serde_json::to_value(store.entries()).unwrap();
        assert_eq!(value[0]["page_number"], 7);
        assert_eq!(value[0]["id"].as_str().unwrap().replace('-', ""), id.to_string());
    }
}
