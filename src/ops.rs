//! The crate-owned file-system surface. Application code calls these free
//! functions instead of `std::fs`; each dispatches through the process-wide
//! [`registry`](crate::registry::registry) and behaves exactly like `std::fs`
//! until a [`RedirectionContext`](crate::context::RedirectionContext) installs
//! a replacement.

use crate::file::{File, OpenOptions};
use crate::registry::registry;
use crate::Result;
use std::path::Path;

/// Opens a file at `path` for reading.
pub fn open_file<P: AsRef<Path>>(path: P) -> Result<Box<dyn File>> {
    open_file_options(path, &OpenOptions::default())
}

/// Creates a file at `path` in write mode. The file will be opened in truncate mode, so all
/// contents will be overwritten. If this is not desirable, use `open_file_options` directly.
pub fn create_file<P: AsRef<Path>>(path: P) -> Result<Box<dyn File>> {
    open_file_options(path, &OpenOptions::default().create(true).truncate(true))
}

/// Opens a file at `path` with options `options`.
pub fn open_file_options<P: AsRef<Path>>(path: P, options: &OpenOptions) -> Result<Box<dyn File>> {
    registry().open.current().open_file_options(path.as_ref(), options)
}

/// Returns `Ok(true)` or `Ok(false)` if anything at `path` does or does not exist, and `Err(_)`
/// if the presence cannot be verified.
pub fn exists<P: AsRef<Path>>(path: P) -> Result<bool> {
    registry().probe.current().exists(path.as_ref())
}

/// Returns whether `path` names a directory.
pub fn is_dir<P: AsRef<Path>>(path: P) -> Result<bool> {
    registry().probe.current().is_dir(path.as_ref())
}

/// Returns whether `path` names a regular file.
pub fn is_file<P: AsRef<Path>>(path: P) -> Result<bool> {
    registry().probe.current().is_file(path.as_ref())
}

/// Creates the directory at `path` and all of its parents.
pub fn make_dirs<P: AsRef<Path>>(path: P, exist_ok: bool) -> Result<()> {
    registry().dir.current().make_dirs(path.as_ref(), exist_ok)
}

/// Copies the file at `src` to `dst`.
pub fn copy<P: AsRef<Path>, Q: AsRef<Path>>(src: P, dst: Q) -> Result<()> {
    registry().transfer.current().copy(src.as_ref(), dst.as_ref())
}

/// Renames `src` to `dst`.
pub fn rename<P: AsRef<Path>, Q: AsRef<Path>>(src: P, dst: Q) -> Result<()> {
    registry().transfer.current().rename(src.as_ref(), dst.as_ref())
}

/// Removes the file at `path`.
pub fn remove<P: AsRef<Path>>(path: P) -> Result<()> {
    registry().transfer.current().remove(path.as_ref())
}
