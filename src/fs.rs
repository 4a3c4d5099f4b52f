//! Filesystem capability used by the persistence layer.
//!
//! The store only ever needs five primitives. Keeping them behind a trait
//! lets tests inject failures without touching a real disk.

use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

/// The filesystem primitives the store relies on.
pub trait FileSystem: Send + Sync {
    /// Read the full content of a file.
    fn read(&self, path: &Path) -> io::Result<Vec<u8>>;

    /// Replace the full content of a file, creating it if needed.
    fn write(&self, path: &Path, contents: &[u8]) -> io::Result<()>;

    /// Create a single directory. The parent must already exist.
    fn create_dir(&self, path: &Path) -> io::Result<()>;

    /// Remove a file.
    fn remove_file(&self, path: &Path) -> io::Result<()>;

    fn exists(&self, path: &Path) -> bool;
}

/// The real filesystem.
///
/// Writes go to a hidden sibling file which is synced and then renamed over
/// the target, so readers see either the old or the new document.
#[derive(Clone, Copy, Debug, Default)]
pub struct OsFileSystem;

impl OsFileSystem {
    fn staging_path(path: &Path) -> PathBuf {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        path.with_file_name(format!(".{}.tmp", name))
    }
}

impl FileSystem for OsFileSystem {
    fn read(&self, path: &Path) -> io::Result<Vec<u8>> {
        fs::read(path)
    }

    fn write(&self, path: &Path, contents: &[u8]) -> io::Result<()> {
        let staging = Self::staging_path(path);

        let result = (|| {
            let mut file = File::create(&staging)?;
            file.write_all(contents)?;
            file.sync_all()?;
            fs::rename(&staging, path)
        })();

        if result.is_err() {
            let _ = fs::remove_file(&staging);
        }
        result
    }

    fn create_dir(&self, path: &Path) -> io::Result<()> {
        fs::create_dir(path)
    }

    fn remove_file(&self, path: &Path) -> io::Result<()> {
        fs::remove_file(path)
    }

    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_write_replaces_content() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("db.fdb");
        let fs = OsFileSystem;

        fs.write(&path, b"{\"a\":1,\"long\":\"value\"}").unwrap();
        fs.write(&path, b"{}").unwrap();

        assert_eq!(fs.read(&path).unwrap(), b"{}");
        assert!(!OsFileSystem::staging_path(&path).exists());
    }

    #[test]
    fn test_write_into_missing_directory_fails_cleanly() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("missing").join("db.fdb");

        let err = OsFileSystem.write(&path, b"{}").unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::NotFound);
        assert!(!OsFileSystem.exists(&path));
    }

    #[test]
    fn test_staging_path_is_sibling() {
        let staging = OsFileSystem::staging_path(Path::new("/data/store/db.fdb"));
        assert_eq!(staging, PathBuf::from("/data/store/.db.fdb.tmp"));
    }

    #[test]
    fn test_create_and_remove() {
        let dir = TempDir::new().unwrap();
        let sub = dir.path().join("sub");
        let fs = OsFileSystem;

        fs.create_dir(&sub).unwrap();
        assert!(fs.exists(&sub));
        assert_eq!(
            fs.create_dir(&sub).unwrap_err().kind(),
            io::ErrorKind::AlreadyExists
        );

        let file = sub.join("x.fdb");
        fs.write(&file, b"{}").unwrap();
        fs.remove_file(&file).unwrap();
        assert!(!fs.exists(&file));
        assert_eq!(
            fs.remove_file(&file).unwrap_err().kind(),
            io::ErrorKind::NotFound
        );
    }
}
