use super::backend::KvStore;
use crate::error::{FolioError, Result};
use std::collections::BTreeMap;

/// In-memory store for tests and session-only ledgers.
#[derive(Debug, Default)]
pub struct MemKv {
    entries: BTreeMap<String, Vec<u8>>,
    simulate_write_error: bool,
}

impl MemKv {
    pub fn new() -> Self {
        Self::default()
    }

    /// Enable write error simulation for testing error handling.
    pub fn set_simulate_write_error(&mut self, simulate: bool) {
        self.simulate_write_error = simulate;
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl KvStore for MemKv {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        Ok(self.entries.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &[u8]) -> Result<()> {
        if self.simulate_write_error {
            return Err(FolioError::Store("Simulated write error".to_string()));
        }
        self.entries.insert(key.to_string(), value.to_vec());
        Ok(())
    }

    fn delete(&mut self, key: &str) -> Result<()> {
        self.entries.remove(key);
        Ok(())
    }

    fn keys(&self, prefix: &str) -> Result<Vec<String>> {
        Ok(self
            .entries
            .range(prefix.to_string()..)
            .take_while(|(k, _)| k.starts_with(prefix))
            .map(|(k, _)| k.clone())
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_are_filtered_by_prefix_in_order() {
        let mut kv = MemKv::new();
        kv.set("task-2", b"b").unwrap();
        kv.set("other", b"x").unwrap();
        kv.set("task-1", b"a").unwrap();
        assert_eq!(kv.keys("task-").unwrap(), vec!["task-1", "task-2"]);
        assert_eq!(kv.keys("").unwrap().len(), 3);
    }

    #[test]
    fn delete_is_idempotent() {
        let mut kv = MemKv::new();
        kv.set("k", b"v").unwrap();
        kv.delete("k").unwrap();
        kv.delete("k").unwrap();
        assert_eq!(kv.get("k").unwrap(), None);
    }

    #[test]
    fn simulated_write_error() {
        let mut kv = MemKv::new();
        kv.set_simulate_write_error(true);
        assert!(matches!(kv.set("k", b"v"), Err(FolioError::Store(_))));
        assert!(kv.is_empty());
    }
}
