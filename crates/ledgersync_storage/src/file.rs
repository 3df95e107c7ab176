//! File-based storage backend for persistent storage.

use crate::backend::StorageBackend;
use crate::error::{StorageError, StorageResult};
use fs2::FileExt;
use sha2::{Digest, Sha256};
use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

/// Magic bytes at the start of every store file.
const MAGIC: &[u8; 4] = b"LSYN";
/// Length of the SHA-256 checksum following the magic.
const CHECKSUM_LEN: usize = 32;
const HEADER_LEN: usize = MAGIC.len() + CHECKSUM_LEN;

/// A file-based storage backend.
///
/// The image lives in a single file laid out as:
///
/// ```text
/// +------+-----------------+-----------+
/// | LSYN | SHA-256(image)  | image ... |
/// +------+-----------------+-----------+
/// ```
///
/// # Durability
///
/// `store` writes the new image to `<path>.tmp`, calls `sync_all`, and
/// renames it over the old file, so a crash leaves either the old or the
/// new image, never a mix.
///
/// # Locking
///
/// An advisory exclusive lock on `<path>.lock` is held for the lifetime of
/// the backend. Opening a second backend on the same path fails with
/// [`StorageError::Locked`].
///
/// # Example
///
/// ```no_run
/// use ledgersync_storage::{FileBackend, StorageBackend};
/// use std::path::Path;
///
/// let mut backend = FileBackend::open(Path::new("ledger.store")).unwrap();
/// backend.store(b"{}").unwrap();
/// ```
#[derive(Debug)]
pub struct FileBackend {
    path: PathBuf,
    temp_path: PathBuf,
    _lock_file: File,
}

impl FileBackend {
    /// Opens a file backend at the given path.
    ///
    /// The store file itself is created lazily on the first `store`.
    ///
    /// # Errors
    ///
    /// Returns an error if the lock file cannot be created or another
    /// process holds the lock.
    pub fn open(path: &Path) -> StorageResult<Self> {
        let lock_path = sibling(path, "lock");
        let lock_file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&lock_path)?;

        if lock_file.try_lock_exclusive().is_err() {
            return Err(StorageError::Locked {
                path: path.to_path_buf(),
            });
        }

        Ok(Self {
            path: path.to_path_buf(),
            temp_path: sibling(path, "tmp"),
            _lock_file: lock_file,
        })
    }

    /// Opens a file backend, creating parent directories if needed.
    ///
    /// # Errors
    ///
    /// Returns an error if directories cannot be created or the file cannot be locked.
    pub fn open_with_create_dirs(path: &Path) -> StorageResult<Self> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        Self::open(path)
    }

    /// Returns the path to the store file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

fn sibling(path: &Path, extension: &str) -> PathBuf {
    let mut name = path.as_os_str().to_os_string();
    name.push(".");
    name.push(extension);
    PathBuf::from(name)
}

fn checksum(data: &[u8]) -> [u8; CHECKSUM_LEN] {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hasher.finalize().into()
}

impl StorageBackend for FileBackend {
    fn load(&self) -> StorageResult<Option<Vec<u8>>> {
        if !self.path.exists() {
            return Ok(None);
        }

        let raw = fs::read(&self.path)?;
        if raw.len() < HEADER_LEN || &raw[..MAGIC.len()] != MAGIC {
            return Err(StorageError::Corrupted(format!(
                "{:?} is not a ledgersync store file",
                self.path
            )));
        }

        let (header, image) = raw.split_at(HEADER_LEN);
        if header[MAGIC.len()..] != checksum(image)[..] {
            return Err(StorageError::Corrupted(format!(
                "checksum mismatch in {:?}",
                self.path
            )));
        }

        Ok(Some(image.to_vec()))
    }

    fn store(&mut self, data: &[u8]) -> StorageResult<()> {
        {
            let mut temp = File::create(&self.temp_path)?;
            temp.write_all(MAGIC)?;
            temp.write_all(&checksum(data))?;
            temp.write_all(data)?;
            temp.sync_all()?;
        }
        fs::rename(&self.temp_path, &self.path)?;
        Ok(())
    }

    fn size(&self) -> StorageResult<u64> {
        if !self.path.exists() {
            return Ok(0);
        }
        let len = fs::metadata(&self.path)?.len();
        Ok(len.saturating_sub(HEADER_LEN as u64))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn file_open_does_not_create_store() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("ledger.store");

        let backend = FileBackend::open(&path).unwrap();
        assert!(backend.load().unwrap().is_none());
        assert_eq!(backend.size().unwrap(), 0);
        assert!(!path.exists());
    }

    #[test]
    fn file_store_and_load() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("ledger.store");

        let mut backend = FileBackend::open(&path).unwrap();
        backend.store(b"hello world").unwrap();

        assert_eq!(backend.load().unwrap().unwrap(), b"hello world");
        assert_eq!(backend.size().unwrap(), 11);
    }

    #[test]
    fn file_persistence() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("ledger.store");

        {
            let mut backend = FileBackend::open(&path).unwrap();
            backend.store(b"persistent image").unwrap();
        }

        {
            let backend = FileBackend::open(&path).unwrap();
            assert_eq!(backend.load().unwrap().unwrap(), b"persistent image");
        }
    }

    #[test]
    fn file_second_open_is_locked() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("ledger.store");

        let _first = FileBackend::open(&path).unwrap();
        let second = FileBackend::open(&path);
        assert!(matches!(second, Err(StorageError::Locked { .. })));
    }

    #[test]
    fn file_detects_corruption() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("ledger.store");

        let mut backend = FileBackend::open(&path).unwrap();
        backend.store(b"original").unwrap();

        let mut raw = fs::read(&path).unwrap();
        let last = raw.len() - 1;
        raw[last] ^= 0xFF;
        fs::write(&path, raw).unwrap();

        assert!(matches!(backend.load(), Err(StorageError::Corrupted(_))));
    }

    #[test]
    fn file_rejects_foreign_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("ledger.store");
        fs::write(&path, b"not a store").unwrap();

        let backend = FileBackend::open(&path).unwrap();
        assert!(matches!(backend.load(), Err(StorageError::Corrupted(_))));
    }

    #[test]
    fn file_create_with_dirs() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("path").join("ledger.store");

        let mut backend = FileBackend::open_with_create_dirs(&path).unwrap();
        backend.store(b"x").unwrap();
        assert!(path.exists());
        assert_eq!(backend.path(), path);
    }
}
