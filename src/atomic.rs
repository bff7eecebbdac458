use crate::file::File;
use crate::util::{not_supported, split_parent};
use crate::{Error, Result, StorageBackend, TempArtifact};
use log::warn;
use rand::distributions::Alphanumeric;
use rand::{thread_rng, Rng};
use std::io;
use std::io::{Read, Seek, SeekFrom, Write};
use std::sync::Arc;

const TOKEN_LEN: usize = 8;

/// How temporary siblings of a final path are named:
/// `{prefix}{basename}{suffix}.{token}`.
#[derive(Debug, Clone)]
pub struct TempNaming {
    /// Prepended to the base name. Defaults to `"."`.
    pub prefix: String,
    /// Appended to the base name, before the uniqueness token. Defaults to `".tmp"`.
    pub suffix: String,
}

impl Default for TempNaming {
    fn default() -> Self {
        Self {
            prefix: ".".to_owned(),
            suffix: ".tmp".to_owned(),
        }
    }
}

/// Writes files atomically on a [`StorageBackend`]: bytes land in a temporary
/// sibling of the final path and are published with a single rename. Backends
/// without atomic rename degrade to copy-then-delete, which is surfaced
/// through [`Error::AtomicPublish`] on failure.
pub struct AtomicWriter {
    backend: Arc<dyn StorageBackend>,
    naming: TempNaming,
}

impl AtomicWriter {
    /// Creates a writer with the default temp naming.
    pub fn new(backend: Arc<dyn StorageBackend>) -> Self {
        Self::with_naming(backend, TempNaming::default())
    }

    /// Creates a writer with custom temp naming.
    pub fn with_naming(backend: Arc<dyn StorageBackend>, naming: TempNaming) -> Self {
        Self { backend, naming }
    }

    /// Begins an atomic write of `final_path`. Parent directories are created
    /// up front; nothing appears at the final path until
    /// [`publish`](AtomicWriteHandle::publish).
    pub fn begin_write(&self, final_path: &str) -> Result<AtomicWriteHandle> {
        let (parent, _) = split_parent(final_path);
        if !parent.is_empty() {
            self.backend.make_dirs(parent, true)?;
        }

        let temp_path = self.temp_path(final_path)?;
        let stream = self.backend.open_write(&temp_path)?;

        Ok(AtomicWriteHandle {
            final_path: final_path.to_owned(),
            temp_path,
            backend: self.backend.clone(),
            stream: Some(stream),
            state: HandleState::Open,
        })
    }

    /// Runs `f` with a write handle, publishing on `Ok` and discarding on
    /// `Err`. The closure's error is returned unchanged; a failed discard is
    /// logged, not raised.
    pub fn write_with<R, F: FnOnce(&mut AtomicWriteHandle) -> Result<R>>(
        &self,
        final_path: &str,
        f: F,
    ) -> Result<R> {
        let mut handle = self.begin_write(final_path)?;
        match f(&mut handle) {
            Ok(value) => {
                handle.publish()?;
                Ok(value)
            }
            Err(err) => {
                if let Err(cleanup) = handle.discard() {
                    warn!("failed to discard temporary file for `{final_path}`: {cleanup}");
                }
                Err(err)
            }
        }
    }

    /// Derives a temp path next to `final_path` that nothing currently occupies.
    fn temp_path(&self, final_path: &str) -> Result<String> {
        let (parent, base) = split_parent(final_path);

        loop {
            let token: String = thread_rng()
                .sample_iter(&Alphanumeric)
                .take(TOKEN_LEN)
                .map(char::from)
                .collect();
            let name = format!("{}{base}{}.{token}", self.naming.prefix, self.naming.suffix);
            let candidate = if parent.is_empty() {
                name
            } else {
                format!("{}/{name}", parent.trim_end_matches('/'))
            };

            if !self.backend.exists(&candidate)? {
                return Ok(candidate);
            }
        }
    }
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
enum HandleState {
    Open,
    Published,
    Discarded,
}

/// A writable handle to an in-flight atomic write. [`publish`](Self::publish)
/// moves the temporary file into place; [`discard`](Self::discard) or dropping
/// an unpublished handle removes it without ever touching the final path.
pub struct AtomicWriteHandle {
    final_path: String,
    temp_path: String,
    backend: Arc<dyn StorageBackend>,
    stream: Option<Box<dyn File>>,
    state: HandleState,
}

impl AtomicWriteHandle {
    /// Returns the path the contents will be published to.
    pub fn final_path(&self) -> &str {
        &self.final_path
    }

    /// Returns the temporary path the contents are staged at.
    pub fn temp_path(&self) -> &str {
        &self.temp_path
    }

    /// Closes the stream and moves the temporary file to the final path. May
    /// be called at most once; a second call returns
    /// [`Error::AlreadyPublished`] and leaves the final path untouched.
    pub fn publish(&mut self) -> Result<()> {
        if self.state != HandleState::Open {
            return Err(Error::AlreadyPublished(self.final_path.clone()));
        }
        self.state = HandleState::Published;

        if let Err(source) = self.finish() {
            self.state = HandleState::Discarded;
            let temp_state = match self.backend.remove(&self.temp_path) {
                Ok(()) => TempArtifact::Absent,
                Err(err) => {
                    warn!(
                        "failed to remove temporary file `{}`: {err}",
                        self.temp_path
                    );
                    TempArtifact::Present
                }
            };

            return Err(Error::AtomicPublish {
                path: self.final_path.clone(),
                temp_state,
                source: Box::new(source),
            });
        }

        Ok(())
    }

    /// Removes the temporary file without publishing. The final path is never
    /// touched.
    pub fn discard(mut self) -> Result<()> {
        if self.state != HandleState::Open {
            return Err(Error::AlreadyPublished(self.final_path.clone()));
        }
        self.state = HandleState::Discarded;
        self.stream = None;

        self.backend.remove(&self.temp_path)
    }

    fn finish(&mut self) -> Result<()> {
        if let Some(mut stream) = self.stream.take() {
            stream.flush()?;
            stream.close()?;
        }

        if self.backend.supports_atomic_rename() {
            self.backend.rename(&self.temp_path, &self.final_path)
        } else {
            // narrowed guarantee: a crash between the copy and the delete
            // leaves both paths populated
            self.backend.copy(&self.temp_path, &self.final_path)?;
            self.backend.remove(&self.temp_path)
        }
    }

    fn stream_mut(&mut self) -> io::Result<&mut Box<dyn File>> {
        self.stream.as_mut().ok_or_else(not_supported)
    }
}

impl Write for AtomicWriteHandle {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.stream_mut()?.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.stream_mut()?.flush()
    }
}

impl Seek for AtomicWriteHandle {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        self.stream_mut()?.seek(pos)
    }
}

impl Read for AtomicWriteHandle {
    fn read(&mut self, _buf: &mut [u8]) -> io::Result<usize> {
        Err(not_supported())
    }
}

impl File for AtomicWriteHandle {
    fn close(mut self: Box<Self>) -> Result<()> {
        self.publish()
    }
}

impl Drop for AtomicWriteHandle {
    fn drop(&mut self) {
        if self.state != HandleState::Open {
            return;
        }
        self.stream = None;

        if let Err(err) = self.backend.remove(&self.temp_path) {
            warn!(
                "failed to remove temporary file `{}`: {err}",
                self.temp_path
            );
        }
    }
}
