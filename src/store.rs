//! In-memory record store.
//!
//! Holds the records of the most recently applied feed snapshot. The feed is
//! always consumed whole, so the only mutator is [`RecordStore::replace_all`].

use crate::models::Record;

/// Current snapshot of normalized earthquake records, in feed order.
#[derive(Debug, Default)]
pub struct RecordStore {
    records: Vec<Record>,
}

impl RecordStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Swap in a complete new snapshot. Nothing from the previous one survives.
    pub fn replace_all(&mut self, records: Vec<Record>) {
        self.records = records;
    }

    /// All records, in feed order.
    #[must_use]
    pub fn all(&self) -> &[Record] {
        &self.records
    }

    #[must_use]
    pub fn find_by_id(&self, id: &str) -> Option<&Record> {
        self.records.iter().find(|r| r.id == id)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::fixtures::record;

    #[test]
    fn test_starts_empty() {
        let store = RecordStore::new();
        assert!(store.is_empty());
        assert_eq!(store.len(), 0);
        assert!(store.find_by_id("anything").is_none());
    }

    #[test]
    fn test_replace_keeps_feed_order() {
        let mut store = RecordStore::new();
        store.replace_all(vec![
            record("c", Some(3.0)),
            record("a", Some(5.0)),
            record("b", Some(4.0)),
        ]);

        let ids: Vec<&str> = store.all().iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, ["c", "a", "b"]);
    }

    #[test]
    fn test_replace_is_wholesale() {
        let mut store = RecordStore::new();
        store.replace_all(vec![record("old1", Some(3.0)), record("old2", None)]);
        store.replace_all(vec![record("new", Some(6.0))]);

        assert_eq!(store.len(), 1);
        assert!(store.find_by_id("old1").is_none());
        assert!(store.find_by_id("old2").is_none());
        assert_eq!(
            store.find_by_id("new").and_then(|r| r.magnitude),
            Some(6.0)
        );
    }

    #[test]
    fn test_replace_with_empty() {
        let mut store = RecordStore::new();
        store.replace_all(vec![record("a", Some(3.0))]);
        store.replace_all(Vec::new());
        assert!(store.is_empty());
    }
}
