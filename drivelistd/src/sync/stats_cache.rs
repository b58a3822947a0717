use std::collections::HashMap;

use drivelist_core::FolderCount;

#[derive(Debug, Default, Clone)]
pub struct StatsCache {
    counts: HashMap<String, FolderCount>,
}

impl StatsCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, id: &str) -> Option<FolderCount> {
        self.counts.get(id).copied()
    }

    pub fn count(&self, id: &str) -> Option<u32> {
        self.get(id).and_then(FolderCount::counted)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.counts.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.counts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    pub(crate) fn merge<I>(&mut self, results: I)
    where
        I: IntoIterator<Item = (String, FolderCount)>,
    {
        self.counts.extend(results);
    }

    pub(crate) fn clear(&mut self) {
        self.counts.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn absent_and_unknown_are_both_uncounted() {
        let mut cache = StatsCache::new();
        cache.merge([
            ("a".to_string(), FolderCount::Counted(0)),
            ("b".to_string(), FolderCount::Unknown),
        ]);
        assert_eq!(cache.count("a"), Some(0));
        assert_eq!(cache.count("b"), None);
        assert!(cache.contains("b"));
        assert_eq!(cache.get("c"), None);
    }

    #[test]
    fn clear_resets_everything() {
        let mut cache = StatsCache::new();
        cache.merge([("a".to_string(), FolderCount::Counted(4))]);
        cache.clear();
        assert!(cache.is_empty());
    }
}
