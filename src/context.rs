use crate::atomic::TempNaming;
use crate::dispatch::{
    RedirectingDir, RedirectingOpen, RedirectingProbe, RedirectingTransfer, Redirector,
};
use crate::local_backend::LocalBackend;
use crate::mapping::PathMapper;
use crate::registry::registry;
use crate::sites::SiteGroup;
use crate::{Error, Result, StorageBackend};
use enumflags2::BitFlags;
use log::{debug, warn};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Configuration for a redirection scope. The default redirects every
/// call-site group, writes atomically, and targets the local disk.
#[derive(Clone)]
pub struct RedirectionConfig {
    path_prefix: PathBuf,
    target_root: String,
    backend: Option<Arc<dyn StorageBackend>>,
    atomic_writes: bool,
    temp_naming: TempNaming,
    sites: BitFlags<SiteGroup>,
}

impl RedirectionConfig {
    /// # Arguments
    /// `path_prefix`: The absolute path prefix that selects redirection.
    /// `target_root`: The backend-relative root redirected paths are rebased onto.
    pub fn new<P: AsRef<Path>>(path_prefix: P, target_root: &str) -> Self {
        Self {
            path_prefix: path_prefix.as_ref().to_owned(),
            target_root: target_root.to_owned(),
            backend: None,
            atomic_writes: true,
            temp_naming: TempNaming::default(),
            sites: BitFlags::all(),
        }
    }

    /// # Arguments
    /// `backend`: The storage backend redirected calls are served by. Defaults
    /// to the local disk rooted at `/`, so backend-relative paths are plain
    /// host paths.
    pub fn backend(mut self, backend: Arc<dyn StorageBackend>) -> Self {
        self.backend = Some(backend);
        self
    }

    /// # Arguments
    /// `atomic_writes`: If true, redirected writes stage into a temporary
    /// sibling and publish on close. Defaults to true.
    pub fn atomic_writes(mut self, atomic_writes: bool) -> Self {
        self.atomic_writes = atomic_writes;
        self
    }

    /// # Arguments
    /// `prefix`: Prepended to temporary file names. Defaults to `"."`.
    pub fn atomic_temp_prefix(mut self, prefix: &str) -> Self {
        self.temp_naming.prefix = prefix.to_owned();
        self
    }

    /// # Arguments
    /// `suffix`: Appended to temporary file names, before the uniqueness
    /// token. Defaults to `".tmp"`.
    pub fn atomic_temp_suffix(mut self, suffix: &str) -> Self {
        self.temp_naming.suffix = suffix.to_owned();
        self
    }

    /// # Arguments
    /// `sites`: The call-site groups to redirect. Defaults to all of them.
    pub fn sites(mut self, sites: BitFlags<SiteGroup>) -> Self {
        self.sites = sites;
        self
    }

    pub(crate) fn build_redirector(&self) -> Result<Redirector> {
        let mapper = PathMapper::new(&self.path_prefix, &self.target_root)?;
        let backend = self
            .backend
            .clone()
            .unwrap_or_else(|| Arc::new(LocalBackend::new("/")));

        Ok(Redirector::new(
            mapper,
            backend,
            self.atomic_writes,
            self.temp_naming.clone(),
        ))
    }
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
enum ContextState {
    Created,
    Active,
    Closed,
}

/// A scoped redirection of the process-wide call sites. [`enter`](Self::enter)
/// installs one adapter per enabled group; [`exit`](Self::exit) restores them
/// in reverse order. A context is single-use. Dropping an active context
/// restores best-effort, so call sites are recovered even during unwinding.
///
/// Two simultaneously active contexts with overlapping prefixes are not
/// supported; the most recently entered one wins.
pub struct RedirectionContext {
    core: Arc<Redirector>,
    sites: BitFlags<SiteGroup>,
    state: ContextState,
    installed: Vec<SiteGroup>,
}

impl RedirectionContext {
    /// Validates `config` and prepares a context. No call site is touched
    /// until [`enter`](Self::enter).
    pub fn new(config: RedirectionConfig) -> Result<Self> {
        if config.sites.is_empty() {
            return Err(Error::Config(
                "at least one call-site group must be enabled".to_owned(),
            ));
        }

        Ok(Self {
            core: Arc::new(config.build_redirector()?),
            sites: config.sites,
            state: ContextState::Created,
            installed: Vec::new(),
        })
    }

    /// Installs the redirecting adapters. Entering twice, or after
    /// [`exit`](Self::exit), returns [`Error::ReuseAfterClose`].
    pub fn enter(&mut self) -> Result<()> {
        if self.state != ContextState::Created {
            return Err(Error::ReuseAfterClose);
        }
        self.state = ContextState::Active;

        let registry = registry();
        for group in self.sites.iter() {
            debug!("installing redirection for {group:?}");
            match group {
                SiteGroup::Open => registry.open.install(|fallthrough| {
                    Arc::new(RedirectingOpen {
                        core: self.core.clone(),
                        fallthrough,
                    })
                }),
                SiteGroup::Probe => registry.probe.install(|fallthrough| {
                    Arc::new(RedirectingProbe {
                        core: self.core.clone(),
                        fallthrough,
                    })
                }),
                SiteGroup::Dir => registry.dir.install(|fallthrough| {
                    Arc::new(RedirectingDir {
                        core: self.core.clone(),
                        fallthrough,
                    })
                }),
                SiteGroup::Transfer => registry.transfer.install(|fallthrough| {
                    Arc::new(RedirectingTransfer {
                        core: self.core.clone(),
                        fallthrough,
                    })
                }),
            }
            self.installed.push(group);
        }

        Ok(())
    }

    /// Restores every installed call site in reverse install order. Every
    /// restoration is attempted; failures are aggregated into
    /// [`Error::RestoreAggregate`].
    pub fn exit(&mut self) -> Result<()> {
        if self.state != ContextState::Active {
            return Err(Error::ReuseAfterClose);
        }
        self.state = ContextState::Closed;

        let registry = registry();
        let mut failures = Vec::new();
        while let Some(group) = self.installed.pop() {
            debug!("restoring call sites for {group:?}");
            if let Err(err) = registry.restore(group) {
                failures.push((group, err));
            }
        }

        if failures.is_empty() {
            Ok(())
        } else {
            Err(Error::RestoreAggregate(failures))
        }
    }
}

impl Drop for RedirectionContext {
    fn drop(&mut self) {
        if self.state != ContextState::Active {
            return;
        }

        if let Err(err) = self.exit() {
            warn!("failed to restore call sites: {err}");
        }
    }
}

/// Runs `f` with `config`'s redirection active, restoring the call sites on
/// every path out, including unwinding panics.
pub fn with_redirection<R, F: FnOnce() -> R>(config: RedirectionConfig, f: F) -> Result<R> {
    let mut context = RedirectionContext::new(config)?;
    context.enter()?;
    let result = f();
    context.exit()?;

    Ok(result)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::ops;
    use parking_lot::Mutex;
    use std::fs;
    use std::io::Write;
    use std::panic::{catch_unwind, AssertUnwindSafe};
    use std::path::Path;

    // the registry is process-wide, so tests that enter contexts serialize here
    static SCOPE_LOCK: Mutex<()> = Mutex::new(());

    fn config_for(root: &Path) -> RedirectionConfig {
        RedirectionConfig::new("/outputs", root.to_str().unwrap())
    }

    #[test]
    fn round_trip_through_a_context() {
        let _guard = SCOPE_LOCK.lock();
        let real = tempfile::tempdir().unwrap();

        with_redirection(config_for(real.path()), || {
            let mut file = ops::create_file("/outputs/report.csv")?;
            file.write_all(b"a,b\n1,2\n")?;
            file.close()?;

            assert!(ops::exists("/outputs/report.csv")?);
            let mut file = ops::open_file("/outputs/report.csv")?;
            assert_eq!(file.read_into_string()?, "a,b\n1,2\n");
            Ok::<_, Error>(())
        })
        .unwrap()
        .unwrap();

        // the redirected write landed at the mapped location
        assert_eq!(
            fs::read_to_string(real.path().join("report.csv")).unwrap(),
            "a,b\n1,2\n"
        );
    }

    #[test]
    fn non_matching_paths_pass_through() {
        let _guard = SCOPE_LOCK.lock();
        let real = tempfile::tempdir().unwrap();
        let local = tempfile::tempdir().unwrap();
        let untouched = local.path().join("other.csv");
        fs::write(&untouched, "local").unwrap();

        with_redirection(config_for(real.path()), || {
            let mut file = ops::open_file(&untouched)?;
            assert_eq!(file.read_into_string()?, "local");
            assert!(ops::is_file(&untouched)?);
            Ok::<_, Error>(())
        })
        .unwrap()
        .unwrap();

        assert!(fs::read_dir(real.path()).unwrap().next().is_none());
    }

    #[test]
    fn exit_restores_the_original_call_sites() {
        let _guard = SCOPE_LOCK.lock();
        let real = tempfile::tempdir().unwrap();

        assert!(registry().is_pristine());

        let mut context = RedirectionContext::new(config_for(real.path())).unwrap();
        context.enter().unwrap();
        assert!(!registry().is_pristine());

        context.exit().unwrap();
        assert!(registry().is_pristine());
    }

    #[test]
    fn nested_contexts_unwind_independently() {
        let _guard = SCOPE_LOCK.lock();
        let outer_root = tempfile::tempdir().unwrap();
        let inner_root = tempfile::tempdir().unwrap();

        let mut outer = RedirectionContext::new(RedirectionConfig::new(
            "/outer",
            outer_root.path().to_str().unwrap(),
        ))
        .unwrap();
        let mut inner = RedirectionContext::new(RedirectionConfig::new(
            "/inner",
            inner_root.path().to_str().unwrap(),
        ))
        .unwrap();

        outer.enter().unwrap();
        inner.enter().unwrap();

        let mut file = ops::create_file("/inner/i.txt").unwrap();
        file.write_all(b"inner").unwrap();
        file.close().unwrap();
        assert!(inner_root.path().join("i.txt").is_file());

        inner.exit().unwrap();

        // the outer redirection is intact after the inner exit
        let mut file = ops::create_file("/outer/o.txt").unwrap();
        file.write_all(b"outer").unwrap();
        file.close().unwrap();
        assert!(outer_root.path().join("o.txt").is_file());

        outer.exit().unwrap();
        assert!(registry().is_pristine());
    }

    #[test]
    fn nested_contexts_with_identical_prefixes_unwind_to_the_outer() {
        let _guard = SCOPE_LOCK.lock();
        let outer_root = tempfile::tempdir().unwrap();
        let inner_root = tempfile::tempdir().unwrap();

        let mut outer = RedirectionContext::new(config_for(outer_root.path())).unwrap();
        let mut inner = RedirectionContext::new(config_for(inner_root.path())).unwrap();

        outer.enter().unwrap();
        inner.enter().unwrap();

        // the most recently entered context wins for matching calls
        let mut file = ops::create_file("/outputs/winner.txt").unwrap();
        file.write_all(b"inner").unwrap();
        file.close().unwrap();
        assert!(inner_root.path().join("winner.txt").is_file());
        assert!(!outer_root.path().join("winner.txt").exists());

        inner.exit().unwrap();

        let mut file = ops::create_file("/outputs/after.txt").unwrap();
        file.write_all(b"outer").unwrap();
        file.close().unwrap();
        assert!(outer_root.path().join("after.txt").is_file());

        outer.exit().unwrap();
        assert!(registry().is_pristine());
    }

    #[test]
    fn selective_groups_leave_the_rest_untouched() {
        let _guard = SCOPE_LOCK.lock();
        let real = tempfile::tempdir().unwrap();
        let config = config_for(real.path()).sites(SiteGroup::Open.into());

        with_redirection(config, || {
            let mut file = ops::create_file("/outputs/only-open.txt")?;
            file.write_all(b"x")?;
            file.close()?;

            // predicates are not redirected, so they see the host filesystem
            assert!(!ops::exists("/outputs/only-open.txt")?);
            Ok::<_, Error>(())
        })
        .unwrap()
        .unwrap();

        assert!(real.path().join("only-open.txt").is_file());
    }

    #[test]
    fn contexts_are_single_use() {
        let _guard = SCOPE_LOCK.lock();
        let real = tempfile::tempdir().unwrap();

        let mut context = RedirectionContext::new(config_for(real.path())).unwrap();
        context.enter().unwrap();
        assert!(matches!(context.enter(), Err(Error::ReuseAfterClose)));

        context.exit().unwrap();
        assert!(matches!(context.exit(), Err(Error::ReuseAfterClose)));
        assert!(matches!(context.enter(), Err(Error::ReuseAfterClose)));
    }

    #[test]
    fn empty_site_sets_are_rejected_before_installation() {
        let real = tempfile::tempdir().unwrap();
        let config = config_for(real.path()).sites(BitFlags::empty());

        assert!(matches!(
            RedirectionContext::new(config),
            Err(Error::Config(_))
        ));
    }

    #[test]
    fn panics_inside_the_scope_still_restore() {
        let _guard = SCOPE_LOCK.lock();
        let real = tempfile::tempdir().unwrap();
        let config = config_for(real.path());

        let result = catch_unwind(AssertUnwindSafe(|| {
            with_redirection(config, || panic!("boom")).unwrap()
        }));

        assert!(result.is_err());
        assert!(registry().is_pristine());
    }
}
