use crate::context::RedirectionConfig;
use crate::dispatch::{RedirectingDir, RedirectingOpen, RedirectingProbe, RedirectingTransfer};
use crate::file::{File, OpenOptions};
use crate::sites::{
    DirSite, OpenSite, ProbeSite, StdDirSite, StdOpenSite, StdProbeSite, StdTransferSite,
    TransferSite,
};
use crate::Result;
use std::path::Path;
use std::sync::Arc;

/// The explicit-use entry point: the same mapping, backend, and atomic-write
/// behavior as a [`RedirectionContext`](crate::context::RedirectionContext),
/// exposed as plain methods with no process-wide interception. Non-matching
/// paths fall through to `std::fs`. The configured site groups are ignored;
/// every method is always available.
pub struct MappedFs {
    open: RedirectingOpen,
    probe: RedirectingProbe,
    dir: RedirectingDir,
    transfer: RedirectingTransfer,
}

impl MappedFs {
    /// Validates `config` and builds the mapped view.
    pub fn new(config: RedirectionConfig) -> Result<Self> {
        let core = Arc::new(config.build_redirector()?);

        Ok(Self {
            open: RedirectingOpen {
                core: core.clone(),
                fallthrough: Arc::new(StdOpenSite),
            },
            probe: RedirectingProbe {
                core: core.clone(),
                fallthrough: Arc::new(StdProbeSite),
            },
            dir: RedirectingDir {
                core: core.clone(),
                fallthrough: Arc::new(StdDirSite),
            },
            transfer: RedirectingTransfer {
                core,
                fallthrough: Arc::new(StdTransferSite),
            },
        })
    }

    /// Opens a file at `path` for reading.
    pub fn open_file<P: AsRef<Path>>(&self, path: P) -> Result<Box<dyn File>> {
        self.open_file_options(path, &OpenOptions::default())
    }

    /// Creates a file at `path` in write mode. The file will be opened in truncate mode, so all
    /// contents will be overwritten.
    pub fn create_file<P: AsRef<Path>>(&self, path: P) -> Result<Box<dyn File>> {
        self.open_file_options(path, &OpenOptions::default().create(true).truncate(true))
    }

    /// Opens a file at `path` with options `options`.
    pub fn open_file_options<P: AsRef<Path>>(
        &self,
        path: P,
        options: &OpenOptions,
    ) -> Result<Box<dyn File>> {
        self.open.open_file_options(path.as_ref(), options)
    }

    /// Returns whether anything exists at `path`.
    pub fn exists<P: AsRef<Path>>(&self, path: P) -> Result<bool> {
        self.probe.exists(path.as_ref())
    }

    /// Returns whether `path` names a directory.
    pub fn is_dir<P: AsRef<Path>>(&self, path: P) -> Result<bool> {
        self.probe.is_dir(path.as_ref())
    }

    /// Returns whether `path` names a regular file.
    pub fn is_file<P: AsRef<Path>>(&self, path: P) -> Result<bool> {
        self.probe.is_file(path.as_ref())
    }

    /// Creates the directory at `path` and all of its parents.
    pub fn make_dirs<P: AsRef<Path>>(&self, path: P, exist_ok: bool) -> Result<()> {
        self.dir.make_dirs(path.as_ref(), exist_ok)
    }

    /// Copies the file at `src` to `dst`. When exactly one side is redirected,
    /// the bytes are streamed between the backend and the local filesystem.
    pub fn copy<P: AsRef<Path>, Q: AsRef<Path>>(&self, src: P, dst: Q) -> Result<()> {
        self.transfer.copy(src.as_ref(), dst.as_ref())
    }

    /// Renames `src` to `dst`. When exactly one side is redirected, this
    /// degrades to a copy followed by removal of the source.
    pub fn rename<P: AsRef<Path>, Q: AsRef<Path>>(&self, src: P, dst: Q) -> Result<()> {
        self.transfer.rename(src.as_ref(), dst.as_ref())
    }

    /// Removes the file at `path`.
    pub fn remove<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        self.transfer.remove(path.as_ref())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::Error;
    use std::fs;
    use std::io::Write;
    use std::path::Path;

    fn mapped(root: &Path) -> MappedFs {
        MappedFs::new(RedirectionConfig::new("/outputs", root.to_str().unwrap())).unwrap()
    }

    #[test]
    fn redirects_matching_paths_without_global_state() {
        let real = tempfile::tempdir().unwrap();
        let fs = mapped(real.path());

        let mut file = fs.create_file("/outputs/report.csv").unwrap();
        file.write_all(b"a,b\n1,2\n").unwrap();
        file.close().unwrap();

        assert!(fs.exists("/outputs/report.csv").unwrap());
        assert!(fs.is_file("/outputs/report.csv").unwrap());
        assert_eq!(
            fs::read_to_string(real.path().join("report.csv")).unwrap(),
            "a,b\n1,2\n"
        );

        let mut file = fs.open_file("/outputs/report.csv").unwrap();
        assert_eq!(file.read_into_string().unwrap(), "a,b\n1,2\n");
    }

    #[test]
    fn non_matching_paths_fall_through() {
        let real = tempfile::tempdir().unwrap();
        let local = tempfile::tempdir().unwrap();
        let fs = mapped(real.path());

        let path = local.path().join("other.csv");
        fs::write(&path, "local").unwrap();

        assert!(fs.is_file(&path).unwrap());
        let mut file = fs.open_file(&path).unwrap();
        assert_eq!(file.read_into_string().unwrap(), "local");
    }

    #[test]
    fn make_dirs_lands_on_the_backend() {
        let real = tempfile::tempdir().unwrap();
        let fs = mapped(real.path());

        fs.make_dirs("/outputs/a/b", false).unwrap();
        assert!(real.path().join("a/b").is_dir());
        assert!(fs.is_dir("/outputs/a/b").unwrap());
    }

    #[test]
    fn copy_streams_from_the_backend_to_the_local_filesystem() {
        let real = tempfile::tempdir().unwrap();
        let local = tempfile::tempdir().unwrap();
        let fs = mapped(real.path());

        fs::write(real.path().join("src.txt"), "backend bytes").unwrap();

        let dst = local.path().join("dst.txt");
        fs.copy("/outputs/src.txt", &dst).unwrap();
        assert_eq!(fs::read_to_string(&dst).unwrap(), "backend bytes");
        assert!(fs.exists("/outputs/src.txt").unwrap());
    }

    #[test]
    fn copy_streams_from_the_local_filesystem_to_the_backend() {
        let real = tempfile::tempdir().unwrap();
        let local = tempfile::tempdir().unwrap();
        let fs = mapped(real.path());

        let src = local.path().join("src.txt");
        fs::write(&src, "local bytes").unwrap();

        fs.copy(&src, "/outputs/nested/dst.txt").unwrap();
        assert_eq!(
            fs::read_to_string(real.path().join("nested/dst.txt")).unwrap(),
            "local bytes"
        );
        assert!(src.is_file());
    }

    #[test]
    fn mixed_rename_degrades_to_copy_and_remove() {
        let real = tempfile::tempdir().unwrap();
        let local = tempfile::tempdir().unwrap();
        let fs = mapped(real.path());

        let src = local.path().join("src.txt");
        fs::write(&src, "moved").unwrap();

        fs.rename(&src, "/outputs/moved.txt").unwrap();
        assert_eq!(
            fs::read_to_string(real.path().join("moved.txt")).unwrap(),
            "moved"
        );
        assert!(!src.exists());

        let back = local.path().join("back.txt");
        fs.rename("/outputs/moved.txt", &back).unwrap();
        assert_eq!(fs::read_to_string(&back).unwrap(), "moved");
        assert!(!fs.exists("/outputs/moved.txt").unwrap());
    }

    #[test]
    fn both_sides_redirected_stay_on_the_backend() {
        let real = tempfile::tempdir().unwrap();
        let fs = mapped(real.path());

        fs::write(real.path().join("a.txt"), "x").unwrap();

        fs.copy("/outputs/a.txt", "/outputs/b.txt").unwrap();
        fs.rename("/outputs/b.txt", "/outputs/c.txt").unwrap();
        fs.remove("/outputs/a.txt").unwrap();

        assert!(!real.path().join("a.txt").exists());
        assert!(!real.path().join("b.txt").exists());
        assert!(real.path().join("c.txt").is_file());
    }

    #[test]
    fn atomic_writes_can_be_disabled() {
        let real = tempfile::tempdir().unwrap();
        let fs = MappedFs::new(
            RedirectionConfig::new("/outputs", real.path().to_str().unwrap())
                .atomic_writes(false),
        )
        .unwrap();

        let mut file = fs.create_file("/outputs/plain.txt").unwrap();
        file.write_all(b"direct").unwrap();
        file.close().unwrap();

        assert_eq!(
            fs::read_to_string(real.path().join("plain.txt")).unwrap(),
            "direct"
        );
    }

    #[test]
    fn invalid_prefixes_are_rejected_at_construction() {
        assert!(matches!(
            MappedFs::new(RedirectionConfig::new("relative", "root")),
            Err(Error::Config(_))
        ));
    }
}
