use crate::util::normalize_path;
use crate::{Error, Result};
use path_slash::PathExt;
use std::path::{Path, PathBuf};

/// A single prefix-to-root rewrite rule.
#[derive(Debug, Clone)]
pub struct PathPrefixRule {
    /// The absolute, normalized path prefix that selects redirection.
    pub prefix: PathBuf,
    /// The backend-relative root that replaces the prefix.
    pub target_root: String,
}

/// Decides, per call, whether a path is redirected and where it lands.
///
/// Matching is lexical. Paths are normalized (redundant slashes and dot
/// segments removed, no symlink resolution) and compared against the prefix on
/// whole-segment boundaries, so `/outputs2/x` does not match `/outputs`.
/// Decisions are never cached.
#[derive(Debug, Clone)]
pub struct PathMapper {
    rule: PathPrefixRule,
}

impl PathMapper {
    /// Creates a mapper for a single prefix rule.
    ///
    /// # Arguments
    /// `prefix`: The absolute path prefix to redirect. Trailing slashes are ignored.
    /// `target_root`: The backend-relative root redirected paths are rebased onto.
    pub fn new<P: AsRef<Path>>(prefix: P, target_root: &str) -> Result<Self> {
        let prefix = prefix.as_ref();
        if prefix.as_os_str().is_empty() {
            return Err(Error::Config("path prefix must not be empty".to_owned()));
        }
        if !prefix.is_absolute() {
            return Err(Error::Config(format!(
                "path prefix `{}` must be absolute",
                prefix.display()
            )));
        }

        Ok(Self {
            rule: PathPrefixRule {
                prefix: normalize_path(prefix),
                target_root: target_root.trim_end_matches('/').to_owned(),
            },
        })
    }

    /// Returns the rule this mapper applies.
    pub fn rule(&self) -> &PathPrefixRule {
        &self.rule
    }

    /// Returns the backend-relative target path if `path` falls under the
    /// prefix, or `None` if the call should pass through untouched.
    pub fn decide<P: AsRef<Path>>(&self, path: P) -> Option<String> {
        let normalized = normalize_path(path);
        let remainder = normalized.strip_prefix(&self.rule.prefix).ok()?;

        if remainder.as_os_str().is_empty() {
            return Some(self.rule.target_root.clone());
        }

        let remainder = remainder.to_slash_lossy();
        if self.rule.target_root.is_empty() {
            Some(remainder.into_owned())
        } else {
            Some(format!("{}/{remainder}", self.rule.target_root))
        }
    }
}
