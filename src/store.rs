//! Retrieval of key material, certificates and configuration.
//!
//! Everything the pipeline reads comes out of a per-domain hierarchy of
//! named text blobs. The real implementation is a directory tree; tests
//! and embedders can substitute an in-memory one.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Mutex;

use crate::error::{Error, Result};

//------------ Path layout ---------------------------------------------------

/// Blob paths under the store root, keyed by the dot-less domain name.
pub mod paths {
    /// The per-domain configuration file.
    pub fn config(domain: &str) -> String {
        format!("{domain}/output.toml")
    }

    /// The TLS certificate.
    pub fn certificate(domain: &str) -> String {
        format!("{domain}/tls/{domain}.crt")
    }

    /// A key file inside the ksk/ or zsk/ subdirectory.
    pub fn key_file(domain: &str, role_dir: &str, name: &str) -> String {
        format!("{domain}/{role_dir}/{name}")
    }

    /// The exported signed zone.
    pub fn signed_zone(domain: &str) -> String {
        format!("{domain}/zone.signed")
    }
}

//------------ BlobStore -----------------------------------------------------

/// Named text blob retrieval and storage.
///
/// Callers are generic over the store, so the desugared futures never
/// need to be nameable.
#[allow(async_fn_in_trait)]
pub trait BlobStore {
    /// Read the blob at a store-relative path.
    async fn read(&self, path: &str) -> Result<String>;

    /// Write a blob, replacing any previous content in one step.
    async fn write(&self, path: &str, data: &str) -> Result<()>;
}

impl<S: BlobStore> BlobStore for &S {
    async fn read(&self, path: &str) -> Result<String> {
        (**self).read(path).await
    }

    async fn write(&self, path: &str, data: &str) -> Result<()> {
        (**self).write(path, data).await
    }
}

//------------ FileStore -----------------------------------------------------

/// A blob store backed by a directory tree.
pub struct FileStore {
    root: PathBuf,
}

impl FileStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        FileStore { root: root.into() }
    }
}

impl BlobStore for FileStore {
    async fn read(&self, path: &str) -> Result<String> {
        let full = self.root.join(path);
        tokio::fs::read_to_string(&full)
            .await
            .map_err(|err| Error::new(&format!("cannot read '{}': {err}", full.display())))
    }

    async fn write(&self, path: &str, data: &str) -> Result<()> {
        let full = self.root.join(path);
        if let Some(parent) = full.parent() {
            tokio::fs::create_dir_all(parent).await.map_err(|err| {
                format!("cannot create directory '{}': {err}", parent.display())
            })?;
        }

        // Write to a temp file and rename into place so a reader never
        // sees a partially written blob.
        let mut temp = full.clone();
        temp.as_mut_os_string().push(".new");
        tokio::fs::write(&temp, data)
            .await
            .map_err(|err| format!("cannot write '{}': {err}", temp.display()))?;
        tokio::fs::rename(&temp, &full).await.map_err(|err| {
            format!(
                "could not move '{}' to '{}': {err}",
                temp.display(),
                full.display()
            )
        })?;
        Ok(())
    }
}

//------------ MemStore ------------------------------------------------------

/// An in-memory blob store for tests and embedders.
#[derive(Default)]
pub struct MemStore {
    blobs: Mutex<HashMap<String, String>>,
}

impl MemStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a blob, builder style.
    pub fn with(self, path: &str, data: &str) -> Self {
        self.blobs
            .lock()
            .expect("poisoned")
            .insert(path.into(), data.into());
        self
    }

    /// Look at a stored blob.
    pub fn get(&self, path: &str) -> Option<String> {
        self.blobs.lock().expect("poisoned").get(path).cloned()
    }
}

impl BlobStore for MemStore {
    async fn read(&self, path: &str) -> Result<String> {
        self.blobs
            .lock()
            .expect("poisoned")
            .get(path)
            .cloned()
            .ok_or_else(|| Error::new(&format!("cannot read '{path}': no such blob")))
    }

    async fn write(&self, path: &str, data: &str) -> Result<()> {
        self.blobs
            .lock()
            .expect("poisoned")
            .insert(path.into(), data.into());
        Ok(())
    }
}

//============ Tests =========================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn path_layout() {
        assert_eq!(paths::config("example.test"), "example.test/output.toml");
        assert_eq!(
            paths::certificate("example.test"),
            "example.test/tls/example.test.crt"
        );
        assert_eq!(
            paths::key_file("example.test", "zsk", "Kexample.key"),
            "example.test/zsk/Kexample.key"
        );
        assert_eq!(
            paths::signed_zone("example.test"),
            "example.test/zone.signed"
        );
    }

    #[tokio::test]
    async fn file_store_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path());
        store.write("example.test/zone.signed", "zone data\n").await.unwrap();
        let back = store.read("example.test/zone.signed").await.unwrap();
        assert_eq!(back, "zone data\n");
    }

    #[tokio::test]
    async fn file_store_missing_blob_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path());
        assert!(store.read("nowhere/nothing").await.is_err());
    }

    #[tokio::test]
    async fn mem_store_round_trip() {
        let store = MemStore::new().with("a/b", "one");
        assert_eq!(store.read("a/b").await.unwrap(), "one");
        store.write("a/b", "two").await.unwrap();
        assert_eq!(store.read("a/b").await.unwrap(), "two");
        assert!(store.read("a/c").await.is_err());
    }
}
