//! A store that keeps nothing.

use crate::{CapabilityStore, Result, Ttl};

/// Accepts every write and answers every read with a miss.
///
/// Useful to disable lookup memoization without special-casing callers.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullStore;

impl CapabilityStore for NullStore {
    fn name(&self) -> &'static str {
        "null"
    }

    fn put(&self, _key: &str, _value: &[u8], _ttl: Ttl) -> Result<()> {
        Ok(())
    }

    fn get(&self, _key: &str) -> Result<Option<Vec<u8>>> {
        Ok(None)
    }

    fn remove(&self, _key: &str) -> Result<()> {
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        Ok(())
    }
}
