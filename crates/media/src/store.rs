use std::{
    collections::HashMap,
    fs,
    path::{Path, PathBuf},
    sync::{
        Mutex,
        atomic::{AtomicBool, Ordering},
    },
};

use {async_trait::async_trait, tracing::debug};

use crate::{Error, Result, mime::sanitize_file_name};

/// Persist a byte payload, returning a stable reference for later sends.
#[async_trait]
pub trait MediaStore: Send + Sync {
    async fn persist(&self, file_name: &str, data: &[u8]) -> Result<String>;
}

/// Stores media as plain files under one directory.
pub struct FileMediaStore {
    base_dir: PathBuf,
}

impl FileMediaStore {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// Read a stored file back by reference.
    pub async fn read(&self, reference: &str) -> Result<Vec<u8>> {
        let name = sanitize_file_name(reference)
            .ok_or_else(|| Error::invalid_input(format!("bad media reference: {reference}")))?;
        let path = self.base_dir.join(name);
        let data = tokio::task::spawn_blocking(move || fs::read(path)).await??;
        Ok(data)
    }
}

#[async_trait]
impl MediaStore for FileMediaStore {
    async fn persist(&self, file_name: &str, data: &[u8]) -> Result<String> {
        let name = sanitize_file_name(file_name)
            .ok_or_else(|| Error::invalid_input(format!("bad media file name: {file_name}")))?;
        let dir = self.base_dir.clone();
        let path = dir.join(&name);
        let data = data.to_vec();

        tokio::task::spawn_blocking(move || -> Result<()> {
            fs::create_dir_all(&dir)?;
            fs::write(&path, &data)?;
            Ok(())
        })
        .await??;

        debug!(file = %name, dir = %self.base_dir.display(), "media stored");
        Ok(name)
    }
}

/// In-memory media store, for tests only.
#[derive(Default)]
pub struct MemoryMediaStore {
    files: Mutex<HashMap<String, Vec<u8>>>,
    failing: AtomicBool,
}

impl MemoryMediaStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every following `persist` fail.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn get(&self, reference: &str) -> Option<Vec<u8>> {
        self.files
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(reference)
            .cloned()
    }
}

#[async_trait]
impl MediaStore for MemoryMediaStore {
    async fn persist(&self, file_name: &str, data: &[u8]) -> Result<String> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(Error::Io(std::io::Error::other("media store set to fail")));
        }
        let name = sanitize_file_name(file_name)
            .ok_or_else(|| Error::invalid_input(format!("bad media file name: {file_name}")))?;
        self.files
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(name.clone(), data.to_vec());
        Ok(name)
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn file_store_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileMediaStore::new(dir.path().join("media"));

        let reference = store.persist("photo.jpg", b"jpeg bytes").await.unwrap();
        assert_eq!(reference, "photo.jpg");
        assert!(dir.path().join("media/photo.jpg").exists());
        assert_eq!(store.read(&reference).await.unwrap(), b"jpeg bytes");
    }

    #[tokio::test]
    async fn file_store_strips_directories() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileMediaStore::new(dir.path());
        let reference = store.persist("../escape.txt", b"x").await.unwrap();
        assert_eq!(reference, "escape.txt");
        assert!(dir.path().join("escape.txt").exists());
    }

    #[tokio::test]
    async fn file_store_rejects_empty_name() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileMediaStore::new(dir.path());
        assert!(matches!(
            store.persist("", b"x").await,
            Err(Error::InvalidInput { .. })
        ));
    }

    #[tokio::test]
    async fn reading_missing_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileMediaStore::new(dir.path());
        assert!(store.read("nope.png").await.is_err());
    }

    #[tokio::test]
    async fn memory_store_can_fail() {
        let store = MemoryMediaStore::new();
        store.persist("a.txt", b"a").await.unwrap();
        assert_eq!(store.get("a.txt").unwrap(), b"a");
        store.set_failing(true);
        assert!(store.persist("b.txt", b"b").await.is_err());
    }
}
