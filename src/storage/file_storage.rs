use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

use log::{debug, error, info};

use crate::error_handling::types::StorageError;
use crate::storage::storage_trait::Storage;
use crate::storage::types::Digest;

/// Content-addressed job store backed by a flat directory.
///
/// Each payload is written to `<base_path>/<sha256 hex>`, with no extension and
/// no manifest. An existing file with the same name is overwritten in place; no
/// temporary file is used, so a concurrent reader may observe a partial write.
pub struct FileStorage {
    base_path: PathBuf,
}

impl FileStorage {
    /// The directory is not created here: the daemon creates it once the
    /// process has dropped to its run-as identity.
    pub fn new<P: AsRef<Path>>(base_path: P) -> Self {
        let base_path = base_path.as_ref().to_path_buf();
        debug!("FileStorage using {}", base_path.display());
        Self { base_path }
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    pub fn path_for(&self, digest: &Digest) -> PathBuf {
        self.base_path.join(digest.to_hex())
    }
}

impl Storage for FileStorage {
    fn store(&self, data: &[u8]) -> Result<Digest, StorageError> {
        let digest = Digest::of(data);
        let path = self.path_for(&digest);
        info!("intercepted {}", digest);
        let mut f = File::create(&path).map_err(|e| {
            error!("Failed to create {}: {}", path.display(), e);
            StorageError::WriteFailed(path.clone(), e)
        })?;
        f.write_all(data).map_err(|e| {
            error!("Failed to write {}: {}", path.display(), e);
            StorageError::WriteFailed(path.clone(), e)
        })?;
        debug!("Wrote {} byte(s) to {}", data.len(), path.display());
        Ok(digest)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_store_names_file_by_digest() {
        let dir = TempDir::new().unwrap();
        let storage = FileStorage::new(dir.path());
        let digest = storage.store(b"hello").unwrap();
        let path = dir.path().join(digest.to_hex());
        assert_eq!(fs::read(&path).unwrap(), b"hello");
        assert_eq!(storage.path_for(&digest), path);
    }

    #[test]
    fn test_store_is_idempotent() {
        let dir = TempDir::new().unwrap();
        let storage = FileStorage::new(dir.path());
        let first = storage.store(b"%!PS\nshowpage\n").unwrap();
        let second = storage.store(b"%!PS\nshowpage\n").unwrap();
        assert_eq!(first, second);
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 1);
        assert_eq!(fs::read(storage.path_for(&first)).unwrap(), b"%!PS\nshowpage\n");
    }

    #[test]
    fn test_store_overwrites_existing_file() {
        let dir = TempDir::new().unwrap();
        let storage = FileStorage::new(dir.path());
        let digest = Digest::of(b"payload");
        fs::write(storage.path_for(&digest), b"trunc").unwrap();
        storage.store(b"payload").unwrap();
        assert_eq!(fs::read(storage.path_for(&digest)).unwrap(), b"payload");
    }

    #[test]
    fn test_store_empty_payload() {
        let dir = TempDir::new().unwrap();
        let storage = FileStorage::new(dir.path());
        let digest = storage.store(b"").unwrap();
        assert_eq!(fs::metadata(storage.path_for(&digest)).unwrap().len(), 0);
    }

    #[test]
    fn test_store_into_missing_directory_fails() {
        let dir = TempDir::new().unwrap();
        let storage = FileStorage::new(dir.path().join("absent"));
        let err = storage.store(b"hello").unwrap_err();
        assert!(matches!(err, StorageError::WriteFailed(_, _)));
    }
}
