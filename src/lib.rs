//! # Scoped File-System Redirection for Rust
//! This crate redirects file-system calls whose target path falls under a configured
//! prefix to an alternate storage backend, leaving every other call untouched.
//! Application code goes through the [`ops`] module, whose call sites dispatch
//! through a process-wide registry and default to `std::fs`. A
//! [`RedirectionContext`](context::RedirectionContext) installs redirecting
//! adapters for the duration of a scope; [`MappedFs`](mapped_fs::MappedFs) offers
//! the same mapping as plain methods with no global state.
//!
//! Redirected writes are atomic: bytes land in a temporary sibling of the final
//! path and are published with a single rename once the handle is closed.
//!
//! ```no_run
//! use redirect_fs::context::{with_redirection, RedirectionConfig};
//! use redirect_fs::ops;
//! use std::io::Write;
//!
//! # fn main() -> redirect_fs::Result<()> {
//! let config = RedirectionConfig::new("/outputs", "/tmp/real");
//! with_redirection(config, || {
//!     let mut file = ops::create_file("/outputs/report.csv")?;
//!     file.write_all(b"a,b\n1,2\n")?;
//!     file.close()
//! })??;
//! # Ok(())
//! # }
//! ```

use crate::file::File;
use mockall::automock;

pub use error::*;

/// The capability set a redirection target must provide. Paths are
/// backend-relative and slash-separated.
#[automock]
pub trait StorageBackend: Send + Sync {
    /// Opens the file at `path` for reading.
    fn open_read(&self, path: &str) -> Result<Box<dyn File>>;
    /// Opens the file at `path` for writing, creating it and truncating any
    /// previous contents. The parent directory must already exist.
    fn open_write(&self, path: &str) -> Result<Box<dyn File>>;
    /// Returns whether anything exists at `path`.
    fn exists(&self, path: &str) -> Result<bool>;
    /// Returns whether `path` names a directory.
    fn is_dir(&self, path: &str) -> Result<bool>;
    /// Returns whether `path` names a regular file.
    fn is_file(&self, path: &str) -> Result<bool>;
    /// Creates the directory at `path` and all of its parents. With `exist_ok`,
    /// an existing directory is not an error.
    fn make_dirs(&self, path: &str, exist_ok: bool) -> Result<()>;
    /// Renames `src` to `dst`.
    fn rename(&self, src: &str, dst: &str) -> Result<()>;
    /// Copies the file at `src` to `dst`.
    fn copy(&self, src: &str, dst: &str) -> Result<()>;
    /// Removes the file at `path`.
    fn remove(&self, path: &str) -> Result<()>;
    /// Returns whether [`rename`](Self::rename) is a single atomic operation.
    /// When false, atomic publishes degrade to copy-then-delete.
    fn supports_atomic_rename(&self) -> bool;
}

pub mod atomic;
pub mod context;
mod dispatch;
pub mod error;
pub mod file;
pub mod local_backend;
pub mod mapped_fs;
pub mod mapping;
pub mod ops;
pub mod registry;
pub mod sites;
pub mod util;
