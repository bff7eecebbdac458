use normalize_path::NormalizePath;
use path_slash::PathBufExt;
use std::io;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

/// Normalizes a path by stripping redundant slashes, resolving backtracking, and using forward
/// slashes. No symlink resolution is performed.
///
/// # Arguments
/// `path`: The path to normalize.
///
/// # Example
/// ```
/// use std::path::Path;
/// use redirect_fs::util::normalize_path;
///
/// assert_eq!(normalize_path("///////"), Path::new("/"));
/// assert_eq!(normalize_path("./test/something/../"), Path::new("test"));
/// assert_eq!(normalize_path("/outputs//run/../report.csv"), Path::new("/outputs/report.csv"));
/// ```
pub fn normalize_path<P: AsRef<Path>>(path: P) -> PathBuf {
    Path::new(path.as_ref().normalize().to_slash_lossy().as_ref()).to_owned()
}

/// Trims the `/` and `\\` roots off of the beginning path, making it relative.
pub(crate) fn make_relative<P: AsRef<Path>>(path: P) -> PathBuf {
    let path = path.as_ref().to_str().unwrap_or("");
    path.trim_start_matches('/').trim_start_matches('\\').into()
}

/// Splits a slash-separated path into its parent directory and base name. The parent of a
/// root-level path is `"/"`, and the parent of a bare name is `""`.
pub(crate) fn split_parent(path: &str) -> (&str, &str) {
    match path.rfind('/') {
        Some(0) => ("/", &path[1..]),
        Some(idx) => (&path[..idx], &path[idx + 1..]),
        None => ("", path),
    }
}

/// Returns an error indicating that the path already exists.
pub(crate) fn already_exists() -> io::Error {
    io::Error::new(ErrorKind::AlreadyExists, "Already exists")
}

/// Returns an error indicating that the operation is not supported.
pub(crate) fn not_supported() -> io::Error {
    io::Error::new(ErrorKind::Unsupported, "Not supported")
}

#[cfg(test)]
mod test {
    use crate::util::{normalize_path, split_parent};
    use std::path::Path;

    #[test]
    fn normalize() {
        assert_eq!(normalize_path("///////"), Path::new("/"));
        assert_eq!(normalize_path("./test/something/../"), Path::new("test"));
        assert_eq!(normalize_path("../test"), Path::new("test"));
        assert_eq!(normalize_path("/a/./b//c"), Path::new("/a/b/c"));
    }

    #[test]
    fn parent_split() {
        assert_eq!(split_parent("tmp/real/report.csv"), ("tmp/real", "report.csv"));
        assert_eq!(split_parent("/report.csv"), ("/", "report.csv"));
        assert_eq!(split_parent("report.csv"), ("", "report.csv"));
    }
}
