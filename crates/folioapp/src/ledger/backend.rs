use crate::error::Result;

/// Raw key-value persistence underneath the ledger.
///
/// The ledger serializes access to the store itself, so implementations do not
/// need interior locking. Reads take `&self`, writes take `&mut self`.
pub trait KvStore: Send {
    /// Returns `Ok(None)` when the key does not exist.
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>>;

    /// Creates or replaces a value. MUST NOT leave a partially written value behind.
    fn set(&mut self, key: &str, value: &[u8]) -> Result<()>;

    /// Deleting an absent key is not an error.
    fn delete(&mut self, key: &str) -> Result<()>;

    /// All keys starting with `prefix`, in ascending order.
    fn keys(&self, prefix: &str) -> Result<Vec<String>>;
}
