//! Durable tier shared across process runs.
//!
//! Entries are written once and never overwritten. Concurrent writers racing
//! on the same key all succeed: the first one to land wins and the others
//! read back what it stored.

use std::{
    fs,
    io::{ErrorKind, Write},
    path::{Path, PathBuf},
};

use bytes::Bytes;
use tempfile::NamedTempFile;
use thiserror::Error;
use tracing::debug;

use super::keys::CacheKey;

#[derive(Debug, Clone, Error)]
pub enum StoreError {
    #[error("failed to prepare cache directory {path}: {message}")]
    Init { path: String, message: String },
    #[error("failed to read cache entry {key}: {message}")]
    Read { key: String, message: String },
    #[error("failed to write cache entry {key}: {message}")]
    Write { key: String, message: String },
}

impl StoreError {
    fn read(key: &CacheKey, err: impl ToString) -> Self {
        Self::Read {
            key: key.to_string(),
            message: err.to_string(),
        }
    }

    fn write(key: &CacheKey, err: impl ToString) -> Self {
        Self::Write {
            key: key.to_string(),
            message: err.to_string(),
        }
    }
}

/// Keyed byte store safe for concurrent readers and writers.
pub trait PersistentStore: Send + Sync {
    fn get(&self, key: &CacheKey) -> Result<Option<Bytes>, StoreError>;

    /// Store `value` unless `key` already has an entry, then return the bytes
    /// the store now holds for `key`.
    fn put_if_absent(&self, key: &CacheKey, value: Bytes) -> Result<Bytes, StoreError>;
}

/// Filesystem-backed store laid out as `<root>/<namespace>/<shard>/<leaf>`.
#[derive(Debug, Clone)]
pub struct FileStore {
    root: PathBuf,
}

impl FileStore {
    pub fn new(root: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let root = root.into();
        fs::create_dir_all(&root).map_err(|err| StoreError::Init {
            path: root.display().to_string(),
            message: err.to_string(),
        })?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn path_for(&self, key: &CacheKey) -> PathBuf {
        self.root.join(key.relative_path())
    }
}

impl PersistentStore for FileStore {
    fn get(&self, key: &CacheKey) -> Result<Option<Bytes>, StoreError> {
        match fs::read(self.path_for(key)) {
            Ok(bytes) => Ok(Some(Bytes::from(bytes))),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
            Err(err) => Err(StoreError::read(key, err)),
        }
    }

    fn put_if_absent(&self, key: &CacheKey, value: Bytes) -> Result<Bytes, StoreError> {
        let path = self.path_for(key);
        let parent = path
            .parent()
            .ok_or_else(|| StoreError::write(key, "entry path has no parent directory"))?;
        fs::create_dir_all(parent).map_err(|err| StoreError::write(key, err))?;

        // Stage next to the destination so the final link is a same-filesystem rename.
        let mut staged = NamedTempFile::new_in(parent).map_err(|err| StoreError::write(key, err))?;
        staged
            .write_all(&value)
            .and_then(|()| staged.flush())
            .map_err(|err| StoreError::write(key, err))?;

        match staged.persist_noclobber(&path) {
            Ok(_) => Ok(value),
            Err(err) if err.error.kind() == ErrorKind::AlreadyExists => {
                debug!(
                    target = "diagram_cache::cache::persistent",
                    op = "persistent::put_if_absent",
                    result = "already_exists",
                    cache_key = %key,
                    "Entry written concurrently by another writer; reading it back"
                );
                fs::read(&path)
                    .map(Bytes::from)
                    .map_err(|err| StoreError::read(key, err))
            }
            Err(err) => Err(StoreError::write(key, err.error)),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::{sync::Arc, thread};

    use tempfile::TempDir;

    use super::*;
    use crate::cache::keys::build_key;
    use crate::domain::options::DiagramOptions;

    fn key(source: &str) -> CacheKey {
        build_key(source, &DiagramOptions::default())
    }

    #[test]
    fn missing_entries_read_as_none() {
        let dir = TempDir::new().expect("temp dir");
        let store = FileStore::new(dir.path()).expect("store");
        assert!(store.get(&key("a")).expect("get").is_none());
    }

    #[test]
    fn entries_land_in_sharded_paths() {
        let dir = TempDir::new().expect("temp dir");
        let store = FileStore::new(dir.path()).expect("store");
        let key = key("a");

        let stored = store
            .put_if_absent(&key, Bytes::from_static(b"payload"))
            .expect("put");

        assert_eq!(stored, Bytes::from_static(b"payload"));
        let path = dir
            .path()
            .join("diagrams")
            .join("d2")
            .join(key.shard())
            .join(key.leaf());
        assert_eq!(fs::read(&path).expect("read entry"), b"payload");
        assert_eq!(
            store.get(&key).expect("get"),
            Some(Bytes::from_static(b"payload"))
        );
    }

    #[test]
    fn first_writer_wins() {
        let dir = TempDir::new().expect("temp dir");
        let store = FileStore::new(dir.path()).expect("store");
        let key = key("a");

        store
            .put_if_absent(&key, Bytes::from_static(b"first"))
            .expect("first put");
        let stored = store
            .put_if_absent(&key, Bytes::from_static(b"second"))
            .expect("second put");

        assert_eq!(stored, Bytes::from_static(b"first"));
        assert_eq!(
            store.get(&key).expect("get"),
            Some(Bytes::from_static(b"first"))
        );
    }

    #[test]
    fn concurrent_writers_agree_on_one_entry() {
        let dir = TempDir::new().expect("temp dir");
        let store = Arc::new(FileStore::new(dir.path()).expect("store"));
        let key = key("race");

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let store = Arc::clone(&store);
                let key = key.clone();
                thread::spawn(move || {
                    store
                        .put_if_absent(&key, Bytes::from(format!("writer-{i}")))
                        .expect("put")
                })
            })
            .collect();

        let results: Vec<Bytes> = handles
            .into_iter()
            .map(|handle| handle.join().expect("writer thread"))
            .collect();
        let stored = store.get(&key).expect("get").expect("entry exists");
        assert!(results.iter().all(|result| *result == stored));

        let shard_dir = store.path_for(&key);
        let siblings = fs::read_dir(shard_dir.parent().expect("shard dir"))
            .expect("list shard")
            .count();
        assert_eq!(siblings, 1, "staging files must not be left behind");
    }
}
