use crate::atomic::{AtomicWriter, TempNaming};
use crate::file::{File, OpenOptions};
use crate::mapping::PathMapper;
use crate::sites::{DirSite, OpenSite, ProbeSite, TransferSite};
use crate::util::split_parent;
use crate::{Result, StorageBackend};
use std::io;
use std::path::Path;
use std::sync::Arc;
use std::{fs, io::Write};

/// The shared redirection core: one mapper, one backend, and the optional
/// atomic writer. Each call-site adapter consults it independently.
pub(crate) struct Redirector {
    mapper: PathMapper,
    backend: Arc<dyn StorageBackend>,
    atomic: Option<AtomicWriter>,
}

impl Redirector {
    pub(crate) fn new(
        mapper: PathMapper,
        backend: Arc<dyn StorageBackend>,
        atomic_writes: bool,
        naming: TempNaming,
    ) -> Self {
        let atomic = atomic_writes.then(|| AtomicWriter::with_naming(backend.clone(), naming));

        Self {
            mapper,
            backend,
            atomic,
        }
    }

    pub(crate) fn decide(&self, path: &Path) -> Option<String> {
        self.mapper.decide(path)
    }

    /// Opens a redirected path on the backend. Writable opens are whole-file
    /// replacements; with atomic writes enabled they stage into a temporary
    /// sibling and publish on close.
    pub(crate) fn open_redirected(
        &self,
        path: &str,
        options: &OpenOptions,
    ) -> Result<Box<dyn File>> {
        if options.write {
            match &self.atomic {
                Some(writer) => Ok(Box::new(writer.begin_write(path)?)),
                None => {
                    self.ensure_parent(path)?;
                    self.backend.open_write(path)
                }
            }
        } else {
            self.backend.open_read(path)
        }
    }

    fn ensure_parent(&self, path: &str) -> Result<()> {
        let (parent, _) = split_parent(path);
        if !parent.is_empty() {
            self.backend.make_dirs(parent, true)?;
        }

        Ok(())
    }
}

pub(crate) struct RedirectingOpen {
    pub(crate) core: Arc<Redirector>,
    pub(crate) fallthrough: Arc<dyn OpenSite>,
}

impl OpenSite for RedirectingOpen {
    fn open_file_options(&self, path: &Path, options: &OpenOptions) -> Result<Box<dyn File>> {
        match self.core.decide(path) {
            Some(target) => self.core.open_redirected(&target, options),
            None => self.fallthrough.open_file_options(path, options),
        }
    }
}

pub(crate) struct RedirectingProbe {
    pub(crate) core: Arc<Redirector>,
    pub(crate) fallthrough: Arc<dyn ProbeSite>,
}

impl ProbeSite for RedirectingProbe {
    fn exists(&self, path: &Path) -> Result<bool> {
        match self.core.decide(path) {
            Some(target) => self.core.backend.exists(&target),
            None => self.fallthrough.exists(path),
        }
    }

    fn is_dir(&self, path: &Path) -> Result<bool> {
        match self.core.decide(path) {
            Some(target) => self.core.backend.is_dir(&target),
            None => self.fallthrough.is_dir(path),
        }
    }

    fn is_file(&self, path: &Path) -> Result<bool> {
        match self.core.decide(path) {
            Some(target) => self.core.backend.is_file(&target),
            None => self.fallthrough.is_file(path),
        }
    }
}

pub(crate) struct RedirectingDir {
    pub(crate) core: Arc<Redirector>,
    pub(crate) fallthrough: Arc<dyn DirSite>,
}

impl DirSite for RedirectingDir {
    fn make_dirs(&self, path: &Path, exist_ok: bool) -> Result<()> {
        match self.core.decide(path) {
            Some(target) => self.core.backend.make_dirs(&target, exist_ok),
            None => self.fallthrough.make_dirs(path, exist_ok),
        }
    }
}

pub(crate) struct RedirectingTransfer {
    pub(crate) core: Arc<Redirector>,
    pub(crate) fallthrough: Arc<dyn TransferSite>,
}

impl TransferSite for RedirectingTransfer {
    fn copy(&self, src: &Path, dst: &Path) -> Result<()> {
        match (self.core.decide(src), self.core.decide(dst)) {
            (Some(src), Some(dst)) => {
                self.core.ensure_parent(&dst)?;
                self.core.backend.copy(&src, &dst)
            }
            // one side redirects: stream the bytes across the domain boundary
            (Some(src), None) => {
                let mut from = self.core.backend.open_read(&src)?;
                let mut to = fs::File::create(dst)?;
                io::copy(&mut from, &mut to)?;
                Ok(to.flush()?)
            }
            (None, Some(dst)) => {
                let mut from = fs::File::open(src)?;
                let mut to = self
                    .core
                    .open_redirected(&dst, &OpenOptions::default().create(true).truncate(true))?;
                io::copy(&mut from, &mut to)?;
                to.close()
            }
            (None, None) => self.fallthrough.copy(src, dst),
        }
    }

    fn rename(&self, src: &Path, dst: &Path) -> Result<()> {
        match (self.core.decide(src), self.core.decide(dst)) {
            (Some(src), Some(dst)) => {
                self.core.ensure_parent(&dst)?;
                self.core.backend.rename(&src, &dst)
            }
            (None, None) => self.fallthrough.rename(src, dst),
            // one side redirects: copy across the boundary, then drop the source
            _ => {
                self.copy(src, dst)?;
                match self.core.decide(src) {
                    Some(src) => self.core.backend.remove(&src),
                    None => Ok(fs::remove_file(src)?),
                }
            }
        }
    }

    fn remove(&self, path: &Path) -> Result<()> {
        match self.core.decide(path) {
            Some(target) => self.core.backend.remove(&target),
            None => self.fallthrough.remove(path),
        }
    }
}
