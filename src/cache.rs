//! Memoization of computed payloads.
//!
//! Entries never expire; a hit is served as-is even if the warehouse has
//! changed since it was stored.

use dashmap::DashMap;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::Result;
use crate::model::EntityKind;

pub trait Cache: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&self, key: &str, value: String);
}

/// Process-wide concurrent map. Concurrent writers of the same key race and
/// the last one wins.
#[derive(Debug, Default)]
pub struct MemoryCache {
    entries: DashMap<String, String>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Cache for MemoryCache {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.get(key).map(|v| v.value().clone())
    }

    fn set(&self, key: &str, value: String) {
        self.entries.insert(key.to_string(), value);
    }
}

/// Never stores anything; every lookup misses.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopCache;

impl Cache for NoopCache {
    fn get(&self, _key: &str) -> Option<String> {
        None
    }

    fn set(&self, _key: &str, _value: String) {}
}

pub fn get_json<T: DeserializeOwned>(cache: &dyn Cache, key: &str) -> Result<Option<T>> {
    match cache.get(key) {
        Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
        None => Ok(None),
    }
}

pub fn set_json<T: Serialize>(cache: &dyn Cache, key: &str, value: &T) -> Result<()> {
    cache.set(key, serde_json::to_string(value)?);
    Ok(())
}

/// Keys embed the range tokens exactly as the caller sent them.
///
/// Fields are separated by `|`, which a parsed range token never contains.
/// The id goes last so an id containing `|` still maps to one key.
pub fn detail_key(kind: EntityKind, id: &str, range_token: &str, comparison_token: &str) -> String {
    format!("{kind}-details|{range_token}|{comparison_token}|{id}")
}

pub const PROJECTS_HOME_KEY: &str = "projects-home";

pub fn tasks_home_key(range_token: &str) -> String {
    format!("tasks-home-{range_token}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_memory_cache_last_write_wins() {
        let cache = MemoryCache::new();
        assert!(cache.get("k").is_none());
        cache.set("k", "1".into());
        cache.set("k", "2".into());
        assert_eq!(cache.get("k").as_deref(), Some("2"));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_noop_cache_never_hits() {
        let cache = NoopCache;
        cache.set("k", "1".into());
        assert!(cache.get("k").is_none());
    }

    #[test]
    fn test_json_helpers() {
        let cache = MemoryCache::new();
        set_json(&cache, "nums", &vec![1, 2, 3]).unwrap();
        let back: Option<Vec<i32>> = get_json(&cache, "nums").unwrap();
        assert_eq!(back, Some(vec![1, 2, 3]));

        cache.set("bad", "{not json".into());
        assert!(get_json::<Vec<i32>>(&cache, "bad").is_err());
    }

    #[test]
    fn test_keys() {
        assert_eq!(
            detail_key(
                EntityKind::Project,
                "p1",
                "2024-03-01/2024-03-31",
                "2024-02-01/2024-02-29"
            ),
            "project-details|2024-03-01/2024-03-31|2024-02-01/2024-02-29|p1"
        );
        assert_eq!(
            tasks_home_key("2024-03-01T00:00:00Z/2024-03-31"),
            "tasks-home-2024-03-01T00:00:00Z/2024-03-31"
        );
    }

    #[test]
    fn test_detail_keys_do_not_collide() {
        let a = detail_key(
            EntityKind::Page,
            "p-2024-01-01/2024-01-31",
            "2024-02-01/2024-02-29",
            "2024-03-01/2024-03-31",
        );
        let b = detail_key(
            EntityKind::Page,
            "p",
            "2024-01-01/2024-01-31-2024-02-01/2024-02-29",
            "2024-03-01/2024-03-31",
        );
        assert_ne!(a, b);
    }

    #[tokio::test]
    async fn test_memory_cache_shared_across_tasks() {
        let cache = Arc::new(MemoryCache::new());
        let mut handles = Vec::new();
        for i in 0..8 {
            let cache = cache.clone();
            handles.push(tokio::spawn(async move {
                cache.set(&format!("k{i}"), i.to_string());
            }));
        }
        for h in handles {
            h.await.unwrap();
        }
        assert_eq!(cache.len(), 8);
    }
}
