//! Results cache for one committed query

use gymdesk_core::types::{Client, ClientStats};
use std::collections::HashMap;

/// A search hit, enriched with statistics once they arrive
#[derive(Debug, Clone, PartialEq)]
pub struct SearchEntry {
    pub client: Client,
    pub stats: Option<ClientStats>,
}

impl SearchEntry {
    pub fn id(&self) -> &str {
        &self.client.id
    }
}

/// Search hits in backend order, addressable by client id
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResultsCache {
    entries: Vec<SearchEntry>,
    index: HashMap<String, usize>,
}

impl ResultsCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from search hits; a repeated id keeps its first position
    pub fn from_clients(clients: impl IntoIterator<Item = Client>) -> Self {
        let mut cache = Self::new();
        for client in clients {
            if cache.index.contains_key(&client.id) {
                continue;
            }
            cache.index.insert(client.id.clone(), cache.entries.len());
            cache.entries.push(SearchEntry {
                client,
                stats: None,
            });
        }
        cache
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    pub fn get(&self, id: &str) -> Option<&SearchEntry> {
        self.index.get(id).map(|&i| &self.entries[i])
    }

    pub fn entries(&self) -> &[SearchEntry] {
        &self.entries
    }

    /// Ids of the first `k` entries
    pub fn top_ids(&self, k: usize) -> Vec<String> {
        self.entries
            .iter()
            .take(k)
            .map(|entry| entry.client.id.clone())
            .collect()
    }

    /// Attach statistics to `id`; returns false if `id` is not cached
    pub fn merge_stats(&mut self, id: &str, stats: ClientStats) -> bool {
        match self.index.get(id) {
            Some(&i) => {
                self.entries[i].stats = Some(stats);
                true
            }
            None => false,
        }
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.index.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn client(id: &str) -> Client {
        Client {
            id: id.to_string(),
            full_name: format!("Client {}", id),
            email: None,
            phone: None,
            is_active: true,
            join_date: Utc::now(),
        }
    }

    #[test]
    fn test_keeps_backend_order_and_drops_duplicates() {
        let cache = ResultsCache::from_clients(vec![client("b"), client("a"), client("b")]);
        let ids: Vec<&str> = cache.entries().iter().map(SearchEntry::id).collect();
        assert_eq!(ids, vec!["b", "a"]);
        assert_eq!(cache.top_ids(1), vec!["b".to_string()]);
    }

    #[test]
    fn test_merge_stats_only_for_cached_ids() {
        let mut cache = ResultsCache::from_clients(vec![client("a")]);
        let stats = ClientStats {
            last_payment: None,
            attendance_count: 4,
        };

        assert!(!cache.merge_stats("zzz", stats.clone()));
        assert!(cache.merge_stats("a", stats.clone()));
        assert_eq!(cache.get("a").unwrap().stats, Some(stats));
    }

    #[test]
    fn test_clear() {
        let mut cache = ResultsCache::from_clients(vec![client("a")]);
        cache.clear();
        assert!(cache.is_empty());
        assert!(!cache.contains("a"));
    }
}
