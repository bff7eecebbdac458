use crate::sites::{
    DirSite, OpenSite, ProbeSite, SiteGroup, StdDirSite, StdOpenSite, StdProbeSite,
    StdTransferSite, TransferSite,
};
use crate::{Error, Result};
use parking_lot::Mutex;
use std::sync::{Arc, OnceLock};

struct SlotState<T: ?Sized> {
    original: Arc<T>,
    layers: Vec<Arc<T>>,
}

/// One call-site group's dispatch slot. The original implementation is captured
/// at construction and never overwritten; replacements stack on top of it.
pub struct CallSiteSlot<T: ?Sized> {
    state: Mutex<SlotState<T>>,
}

impl<T: ?Sized> CallSiteSlot<T> {
    fn new(original: Arc<T>) -> Self {
        Self {
            state: Mutex::new(SlotState {
                original,
                layers: Vec::new(),
            }),
        }
    }

    /// Returns the implementation calls currently dispatch to. The lock is held
    /// only for the clone; the call itself runs unlocked.
    pub fn current(&self) -> Arc<T> {
        let state = self.state.lock();
        state.layers.last().unwrap_or(&state.original).clone()
    }

    /// Returns the original implementation captured at construction.
    pub fn original(&self) -> Arc<T> {
        self.state.lock().original.clone()
    }

    /// Returns the number of installed replacements.
    pub fn depth(&self) -> usize {
        self.state.lock().layers.len()
    }

    /// Builds a replacement from the original implementation and installs it.
    /// The factory receives the original, not the currently dispatched layer,
    /// so nested replacements fall through to the untouched call site.
    pub fn install<F: FnOnce(Arc<T>) -> Arc<T>>(&self, factory: F) {
        let original = self.original();
        let replacement = factory(original);
        self.state.lock().layers.push(replacement);
    }

    /// Removes the most recently installed replacement.
    pub fn restore(&self) -> Result<()> {
        self.state
            .lock()
            .layers
            .pop()
            .map(|_| ())
            .ok_or_else(|| Error::Config("restore without a matching install".to_owned()))
    }
}

/// The process-wide dispatch table for every interceptable call-site group.
pub struct InterceptionRegistry {
    /// The file-open slot.
    pub open: CallSiteSlot<dyn OpenSite>,
    /// The path-predicate slot.
    pub probe: CallSiteSlot<dyn ProbeSite>,
    /// The directory-creation slot.
    pub dir: CallSiteSlot<dyn DirSite>,
    /// The copy/rename/remove slot.
    pub transfer: CallSiteSlot<dyn TransferSite>,
}

impl InterceptionRegistry {
    fn new() -> Self {
        Self {
            open: CallSiteSlot::new(Arc::new(StdOpenSite)),
            probe: CallSiteSlot::new(Arc::new(StdProbeSite)),
            dir: CallSiteSlot::new(Arc::new(StdDirSite)),
            transfer: CallSiteSlot::new(Arc::new(StdTransferSite)),
        }
    }

    /// Returns the replacement depth of `group`.
    pub fn depth(&self, group: SiteGroup) -> usize {
        match group {
            SiteGroup::Open => self.open.depth(),
            SiteGroup::Probe => self.probe.depth(),
            SiteGroup::Dir => self.dir.depth(),
            SiteGroup::Transfer => self.transfer.depth(),
        }
    }

    /// Removes the most recently installed replacement for `group`.
    pub fn restore(&self, group: SiteGroup) -> Result<()> {
        match group {
            SiteGroup::Open => self.open.restore(),
            SiteGroup::Probe => self.probe.restore(),
            SiteGroup::Dir => self.dir.restore(),
            SiteGroup::Transfer => self.transfer.restore(),
        }
    }

    /// Returns whether every group dispatches to its original implementation.
    pub fn is_pristine(&self) -> bool {
        Arc::ptr_eq(&self.open.current(), &self.open.original())
            && Arc::ptr_eq(&self.probe.current(), &self.probe.original())
            && Arc::ptr_eq(&self.dir.current(), &self.dir.original())
            && Arc::ptr_eq(&self.transfer.current(), &self.transfer.original())
    }
}

/// Returns the process-wide interception registry.
pub fn registry() -> &'static InterceptionRegistry {
    static REGISTRY: OnceLock<InterceptionRegistry> = OnceLock::new();
    REGISTRY.get_or_init(InterceptionRegistry::new)
}
