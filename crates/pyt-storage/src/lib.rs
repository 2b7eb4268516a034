//! # Perpetual Yield Storage
//!
//! Key-value persistence for engine state.
//!
//! ## Storage Layout
//!
//! - `kv` - the `KvStore` trait every backend implements
//! - `memory_db` - in-memory backend with atomic batch apply
//! - `transaction` - read-your-writes overlay committed as one batch
//!
//! An operation stages all of its writes in a [`Transaction`]; nothing
//! touches the backend until `commit`, which applies the batch under a single
//! write lock. Dropping an uncommitted transaction discards it.

pub mod kv {
    //! Backend abstraction

    use pyt_core::error::Result;

    /// A single staged write
    #[derive(Clone, Debug, PartialEq, Eq)]
    pub enum WriteOp {
        Put { key: Vec<u8>, value: Vec<u8> },
        Delete { key: Vec<u8> },
    }

    /// Ordered set of writes applied all-or-nothing
    #[derive(Clone, Debug, Default, PartialEq, Eq)]
    pub struct WriteBatch {
        ops: Vec<WriteOp>,
    }

    impl WriteBatch {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn put(&mut self, key: Vec<u8>, value: Vec<u8>) {
            self.ops.push(WriteOp::Put { key, value });
        }

        pub fn delete(&mut self, key: Vec<u8>) {
            self.ops.push(WriteOp::Delete { key });
        }

        pub fn len(&self) -> usize {
            self.ops.len()
        }

        pub fn is_empty(&self) -> bool {
            self.ops.is_empty()
        }

        pub fn into_ops(self) -> Vec<WriteOp> {
            self.ops
        }
    }

    /// Persistence backend
    pub trait KvStore: Send + Sync {
        /// Read a value
        fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>>;

        /// Apply every write in `batch` atomically
        fn apply_batch(&self, batch: WriteBatch) -> Result<()>;
    }

    impl<T: KvStore + ?Sized> KvStore for std::sync::Arc<T> {
        fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
            (**self).get(key)
        }

        fn apply_batch(&self, batch: WriteBatch) -> Result<()> {
            (**self).apply_batch(batch)
        }
    }
}

pub mod memory_db {
    //! In-memory backend

    use super::kv::{KvStore, WriteBatch, WriteOp};
    use parking_lot::RwLock;
    use pyt_core::error::Result;
    use std::collections::HashMap;

    /// Hash map behind a reader-writer lock
    pub struct MemoryStore {
        data: RwLock<HashMap<Vec<u8>, Vec<u8>>>,
    }

    impl MemoryStore {
        pub fn new() -> Self {
            Self {
                data: RwLock::new(HashMap::new()),
            }
        }

        pub fn len(&self) -> usize {
            self.data.read().len()
        }

        pub fn is_empty(&self) -> bool {
            self.data.read().is_empty()
        }

        pub fn contains(&self, key: &[u8]) -> bool {
            self.data.read().contains_key(key)
        }
    }

    impl Default for MemoryStore {
        fn default() -> Self {
            Self::new()
        }
    }

    impl KvStore for MemoryStore {
        fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
            Ok(self.data.read().get(key).cloned())
        }

        fn apply_batch(&self, batch: WriteBatch) -> Result<()> {
            let mut data = self.data.write();
            for op in batch.into_ops() {
                match op {
                    WriteOp::Put { key, value } => {
                        data.insert(key, value);
                    }
                    WriteOp::Delete { key } => {
                        data.remove(&key);
                    }
                }
            }
            Ok(())
        }
    }
}

pub mod transaction {
    //! Read-your-writes overlay

    use super::kv::{KvStore, WriteBatch};
    use pyt_core::error::{PytError, Result};
    use serde::{de::DeserializeOwned, Serialize};
    use std::collections::BTreeMap;

    /// Staged writes over a backend; `None` marks a deletion
    pub struct Transaction<'a, S: KvStore + ?Sized> {
        store: &'a S,
        writes: BTreeMap<Vec<u8>, Option<Vec<u8>>>,
    }

    impl<'a, S: KvStore + ?Sized> Transaction<'a, S> {
        pub fn begin(store: &'a S) -> Self {
            Self {
                store,
                writes: BTreeMap::new(),
            }
        }

        /// Read through the overlay
        pub fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
            match self.writes.get(key) {
                Some(staged) => Ok(staged.clone()),
                None => self.store.get(key),
            }
        }

        pub fn put(&mut self, key: Vec<u8>, value: Vec<u8>) {
            self.writes.insert(key, Some(value));
        }

        pub fn delete(&mut self, key: Vec<u8>) {
            self.writes.insert(key, None);
        }

        /// Read and decode a bincode value
        pub fn get_typed<T: DeserializeOwned>(&self, key: &[u8]) -> Result<Option<T>> {
            match self.get(key)? {
                Some(bytes) => bincode::deserialize(&bytes)
                    .map(Some)
                    .map_err(|e| PytError::Serialization(e.to_string())),
                None => Ok(None),
            }
        }

        /// Encode and stage a bincode value
        pub fn put_typed<T: Serialize>(&mut self, key: Vec<u8>, value: &T) -> Result<()> {
            let bytes =
                bincode::serialize(value).map_err(|e| PytError::Serialization(e.to_string()))?;
            self.put(key, bytes);
            Ok(())
        }

        /// Number of staged keys
        pub fn len(&self) -> usize {
            self.writes.len()
        }

        pub fn is_empty(&self) -> bool {
            self.writes.is_empty()
        }

        /// Apply every staged write as one batch
        pub fn commit(self) -> Result<()> {
            if self.writes.is_empty() {
                return Ok(());
            }
            let mut batch = WriteBatch::new();
            for (key, staged) in self.writes {
                match staged {
                    Some(value) => batch.put(key, value),
                    None => batch.delete(key),
                }
            }
            self.store.apply_batch(batch)
        }
    }
}

// Re-export for convenience
pub use kv::{KvStore, WriteBatch, WriteOp};
pub use memory_db::MemoryStore;
pub use transaction::Transaction;
