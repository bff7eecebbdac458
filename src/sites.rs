use crate::file::{File, OpenOptions};
use crate::util::already_exists;
use crate::Result;
use enumflags2::bitflags;
use std::fs;
use std::io::ErrorKind;
use std::path::Path;

/// A group of related call sites that is installed and restored as a unit.
#[bitflags]
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
#[repr(u8)]
pub enum SiteGroup {
    /// File opens: [`OpenSite`].
    Open,
    /// Path predicates: [`ProbeSite`].
    Probe,
    /// Directory creation: [`DirSite`].
    Dir,
    /// Copy, rename, and removal: [`TransferSite`].
    Transfer,
}

/// The file-open call site.
pub trait OpenSite: Send + Sync {
    /// Opens a file at `path` with options `options`.
    fn open_file_options(&self, path: &Path, options: &OpenOptions) -> Result<Box<dyn File>>;
}

/// The path-predicate call sites.
pub trait ProbeSite: Send + Sync {
    /// Returns `Ok(true)` or `Ok(false)` if anything at `path` does or does not exist, and
    /// `Err(_)` if the presence cannot be verified.
    fn exists(&self, path: &Path) -> Result<bool>;
    /// Returns whether `path` names a directory. A missing path is `Ok(false)`.
    fn is_dir(&self, path: &Path) -> Result<bool>;
    /// Returns whether `path` names a regular file. A missing path is `Ok(false)`.
    fn is_file(&self, path: &Path) -> Result<bool>;
}

/// The directory-creation call site.
pub trait DirSite: Send + Sync {
    /// Creates the directory at `path` and all of its parents.
    ///
    /// # Arguments
    /// `exist_ok`: If true, an already-existing directory is not an error.
    fn make_dirs(&self, path: &Path, exist_ok: bool) -> Result<()>;
}

/// The copy/rename/remove call sites.
pub trait TransferSite: Send + Sync {
    /// Copies the file at `src` to `dst`.
    fn copy(&self, src: &Path, dst: &Path) -> Result<()>;
    /// Renames `src` to `dst`.
    fn rename(&self, src: &Path, dst: &Path) -> Result<()>;
    /// Removes the file at `path`.
    fn remove(&self, path: &Path) -> Result<()>;
}

/// The untouched file-open call site, backed by `std::fs`.
#[derive(Debug, Default)]
pub struct StdOpenSite;

impl OpenSite for StdOpenSite {
    fn open_file_options(&self, path: &Path, options: &OpenOptions) -> Result<Box<dyn File>> {
        let file = fs::OpenOptions::from(options).open(path)?;
        Ok(Box::new(file))
    }
}

/// The untouched path predicates, backed by `std::fs`.
#[derive(Debug, Default)]
pub struct StdProbeSite;

impl ProbeSite for StdProbeSite {
    fn exists(&self, path: &Path) -> Result<bool> {
        Ok(path.try_exists()?)
    }

    fn is_dir(&self, path: &Path) -> Result<bool> {
        match fs::metadata(path) {
            Ok(metadata) => Ok(metadata.is_dir()),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(false),
            Err(err) => Err(err.into()),
        }
    }

    fn is_file(&self, path: &Path) -> Result<bool> {
        match fs::metadata(path) {
            Ok(metadata) => Ok(metadata.is_file()),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(false),
            Err(err) => Err(err.into()),
        }
    }
}

/// The untouched directory-creation call site, backed by `std::fs`.
#[derive(Debug, Default)]
pub struct StdDirSite;

impl DirSite for StdDirSite {
    fn make_dirs(&self, path: &Path, exist_ok: bool) -> Result<()> {
        if !exist_ok && path.try_exists()? {
            return Err(already_exists().into());
        }

        Ok(fs::create_dir_all(path)?)
    }
}

/// The untouched copy/rename/remove call sites, backed by `std::fs`.
#[derive(Debug, Default)]
pub struct StdTransferSite;

impl TransferSite for StdTransferSite {
    fn copy(&self, src: &Path, dst: &Path) -> Result<()> {
        fs::copy(src, dst)?;
        Ok(())
    }

    fn rename(&self, src: &Path, dst: &Path) -> Result<()> {
        Ok(fs::rename(src, dst)?)
    }

    fn remove(&self, path: &Path) -> Result<()> {
        Ok(fs::remove_file(path)?)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::io::{Read, Write};

    #[test]
    fn std_sites_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/file.txt");

        StdDirSite.make_dirs(path.parent().unwrap(), true).unwrap();
        let mut file = StdOpenSite
            .open_file_options(&path, &OpenOptions::default().create(true).truncate(true))
            .unwrap();
        file.write_all(b"contents").unwrap();
        drop(file);

        assert!(StdProbeSite.exists(&path).unwrap());
        assert!(StdProbeSite.is_file(&path).unwrap());
        assert!(!StdProbeSite.is_dir(&path).unwrap());

        let mut file = StdOpenSite
            .open_file_options(&path, &OpenOptions::default())
            .unwrap();
        assert_eq!(file.read_into_string().unwrap(), "contents");
        drop(file);

        let copied = dir.path().join("copy.txt");
        StdTransferSite.copy(&path, &copied).unwrap();
        let renamed = dir.path().join("renamed.txt");
        StdTransferSite.rename(&copied, &renamed).unwrap();
        StdTransferSite.remove(&renamed).unwrap();
        assert!(!StdProbeSite.exists(&renamed).unwrap());
    }

    #[test]
    fn make_dirs_respects_exist_ok() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a/b");

        StdDirSite.make_dirs(&path, false).unwrap();
        assert!(StdDirSite.make_dirs(&path, false).is_err());
        StdDirSite.make_dirs(&path, true).unwrap();
    }

    #[test]
    fn probes_report_false_for_missing_paths() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing");

        assert!(!StdProbeSite.exists(&path).unwrap());
        assert!(!StdProbeSite.is_dir(&path).unwrap());
        assert!(!StdProbeSite.is_file(&path).unwrap());
    }
}
