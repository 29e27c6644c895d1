//! LMDB-backed storage engine.
//!
//! Uses the heed crate to keep one named LMDB database per collection inside a
//! single memory-mapped environment. LMDB serialises write transactions, so
//! concurrent writers never produce torn records.
//!
//! heed is synchronous; every operation runs on tokio's blocking pool so the
//! async caller only suspends.

use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use heed::types::{Bytes, Str};
use heed::{Database, Env, EnvOpenOptions};

use crate::durable::{DurableError, StorageEngine, StorageUsage};

/// Upper bound on named databases in one environment.
const MAX_COLLECTIONS: u32 = 32;

type Collection = Database<Str, Bytes>;

/// LMDB engine handle. Cheap to clone; clones share the environment.
#[derive(Clone)]
pub struct LmdbEngine {
    env: Env,
    path: PathBuf,
    collections: Arc<RwLock<HashMap<String, Collection>>>,
}

impl fmt::Debug for LmdbEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LmdbEngine")
            .field("path", &self.path)
            .finish_non_exhaustive()
    }
}

impl LmdbEngine {
    /// Opens (or creates) an environment under `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The directory cannot be created
    /// - The LMDB environment cannot be opened
    pub fn open<P: AsRef<Path>>(path: P, map_size_mb: usize) -> Result<Self, DurableError> {
        std::fs::create_dir_all(&path)?;

        // SAFETY: the environment directory is owned by this process and is
        // opened once per path.
        let env = unsafe {
            EnvOpenOptions::new()
                .map_size(map_size_mb * 1024 * 1024)
                .max_dbs(MAX_COLLECTIONS)
                .open(path.as_ref())
        }?;

        Ok(Self {
            env,
            path: path.as_ref().to_path_buf(),
            collections: Arc::new(RwLock::new(HashMap::new())),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Resolves a collection handle, opening or creating it in LMDB.
    ///
    /// Returns `None` only when `create` is false and the collection has
    /// never been written.
    fn collection(&self, name: &str, create: bool) -> Result<Option<Collection>, DurableError> {
        if let Some(db) = self.cached_handle(name) {
            return Ok(Some(db));
        }

        let mut wtxn = self.env.write_txn()?;
        let db = if create {
            Some(self.env.create_database::<Str, Bytes>(&mut wtxn, Some(name))?)
        } else {
            self.env.open_database::<Str, Bytes>(&wtxn, Some(name))?
        };
        wtxn.commit()?;

        if let Some(db) = db {
            if let Ok(mut handles) = self.collections.write() {
                handles.insert(name.to_string(), db);
            }
        }
        Ok(db)
    }

    fn cached_handle(&self, name: &str) -> Option<Collection> {
        self.collections
            .read()
            .ok()
            .and_then(|handles| handles.get(name).copied())
    }

    /// Runs `op` against a clone of this engine on the blocking pool.
    async fn blocking<T, F>(&self, op: F) -> Result<T, DurableError>
    where
        T: Send + 'static,
        F: FnOnce(LmdbEngine) -> Result<T, DurableError> + Send + 'static,
    {
        let engine = self.clone();
        tokio::task::spawn_blocking(move || op(engine)).await?
    }
}

#[async_trait]
impl StorageEngine for LmdbEngine {
    async fn ensure_collections(&self, names: &[&str]) -> Result<(), DurableError> {
        let names: Vec<String> = names.iter().map(|n| n.to_string()).collect();
        self.blocking(move |engine| {
            for name in &names {
                engine.collection(name, true)?;
            }
            Ok(())
        })
        .await
    }

    async fn put(&self, collection: &str, key: &str, value: Vec<u8>) -> Result<(), DurableError> {
        let (collection, key) = (collection.to_string(), key.to_string());
        self.blocking(move |engine| {
            let Some(db) = engine.collection(&collection, true)? else {
                return Ok(());
            };
            let mut wtxn = engine.env.write_txn()?;
            db.put(&mut wtxn, &key, &value)?;
            wtxn.commit()?;
            Ok(())
        })
        .await
    }

    async fn get(&self, collection: &str, key: &str) -> Result<Option<Vec<u8>>, DurableError> {
        let (collection, key) = (collection.to_string(), key.to_string());
        self.blocking(move |engine| {
            let Some(db) = engine.collection(&collection, false)? else {
                return Ok(None);
            };
            let rtxn = engine.env.read_txn()?;
            let value = db.get(&rtxn, &key)?.map(|bytes| bytes.to_vec());
            Ok(value)
        })
        .await
    }

    async fn delete(&self, collection: &str, key: &str) -> Result<bool, DurableError> {
        let (collection, key) = (collection.to_string(), key.to_string());
        self.blocking(move |engine| {
            let Some(db) = engine.collection(&collection, false)? else {
                return Ok(false);
            };
            let mut wtxn = engine.env.write_txn()?;
            let deleted = db.delete(&mut wtxn, &key)?;
            wtxn.commit()?;
            Ok(deleted)
        })
        .await
    }

    async fn delete_many(
        &self,
        collection: &str,
        keys: Vec<String>,
    ) -> Result<usize, DurableError> {
        let collection = collection.to_string();
        self.blocking(move |engine| {
            let Some(db) = engine.collection(&collection, false)? else {
                return Ok(0);
            };
            let mut wtxn = engine.env.write_txn()?;
            let mut deleted = 0;
            for key in &keys {
                if db.delete(&mut wtxn, key)? {
                    deleted += 1;
                }
            }
            wtxn.commit()?;
            Ok(deleted)
        })
        .await
    }

    async fn list(&self, collection: &str) -> Result<Vec<(String, Vec<u8>)>, DurableError> {
        let collection = collection.to_string();
        self.blocking(move |engine| {
            let Some(db) = engine.collection(&collection, false)? else {
                return Ok(Vec::new());
            };
            let rtxn = engine.env.read_txn()?;
            let mut records = Vec::new();
            for item in db.iter(&rtxn)? {
                let (key, value) = item?;
                records.push((key.to_string(), value.to_vec()));
            }
            Ok(records)
        })
        .await
    }

    async fn clear(&self, collection: &str) -> Result<(), DurableError> {
        let collection = collection.to_string();
        self.blocking(move |engine| {
            let Some(db) = engine.collection(&collection, false)? else {
                return Ok(());
            };
            let mut wtxn = engine.env.write_txn()?;
            db.clear(&mut wtxn)?;
            wtxn.commit()?;
            Ok(())
        })
        .await
    }

    async fn replace_all(
        &self,
        collection: &str,
        records: Vec<(String, Vec<u8>)>,
    ) -> Result<(), DurableError> {
        let collection = collection.to_string();
        self.blocking(move |engine| {
            let Some(db) = engine.collection(&collection, true)? else {
                return Ok(());
            };
            let mut wtxn = engine.env.write_txn()?;
            db.clear(&mut wtxn)?;
            for (key, value) in &records {
                db.put(&mut wtxn, key, value)?;
            }
            wtxn.commit()?;
            Ok(())
        })
        .await
    }

    async fn usage(&self) -> Result<Option<StorageUsage>, DurableError> {
        self.blocking(|engine| {
            let map_size = engine.env.info().map_size as u64;
            let used = engine.env.real_disk_size()?;
            Ok(Some(StorageUsage {
                used,
                available: map_size.saturating_sub(used),
            }))
        })
        .await
    }
}
