use crate::file::File;
use crate::util::{already_exists, make_relative, normalize_path};
use crate::{Result, StorageBackend};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

/// A [`StorageBackend`] over the local disk, rooted at a directory.
/// Backend-relative paths are resolved beneath the root; rooting at `/` makes
/// them plain host paths.
#[derive(Debug, Clone)]
pub struct LocalBackend {
    root: PathBuf,
}

impl LocalBackend {
    /// Creates a backend rooted at `root`.
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self {
            root: normalize_path(root),
        }
    }

    fn resolve(&self, path: &str) -> PathBuf {
        self.root.join(make_relative(path))
    }
}

impl StorageBackend for LocalBackend {
    fn open_read(&self, path: &str) -> Result<Box<dyn File>> {
        let file = fs::File::open(self.resolve(path))?;
        Ok(Box::new(file))
    }

    fn open_write(&self, path: &str) -> Result<Box<dyn File>> {
        let file = fs::OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(self.resolve(path))?;
        Ok(Box::new(file))
    }

    fn exists(&self, path: &str) -> Result<bool> {
        Ok(self.resolve(path).try_exists()?)
    }

    fn is_dir(&self, path: &str) -> Result<bool> {
        match fs::metadata(self.resolve(path)) {
            Ok(metadata) => Ok(metadata.is_dir()),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(false),
            Err(err) => Err(err.into()),
        }
    }

    fn is_file(&self, path: &str) -> Result<bool> {
        match fs::metadata(self.resolve(path)) {
            Ok(metadata) => Ok(metadata.is_file()),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(false),
            Err(err) => Err(err.into()),
        }
    }

    fn make_dirs(&self, path: &str, exist_ok: bool) -> Result<()> {
        let resolved = self.resolve(path);
        if !exist_ok && resolved.try_exists()? {
            return Err(already_exists().into());
        }

        Ok(fs::create_dir_all(resolved)?)
    }

    fn rename(&self, src: &str, dst: &str) -> Result<()> {
        Ok(fs::rename(self.resolve(src), self.resolve(dst))?)
    }

    fn copy(&self, src: &str, dst: &str) -> Result<()> {
        fs::copy(self.resolve(src), self.resolve(dst))?;
        Ok(())
    }

    fn remove(&self, path: &str) -> Result<()> {
        Ok(fs::remove_file(self.resolve(path))?)
    }

    fn supports_atomic_rename(&self) -> bool {
        true
    }
}
