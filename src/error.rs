use crate::sites::SiteGroup;
use itertools::Itertools;
use std::fmt::{self, Display, Formatter};
use std::io;

/// The result of a redirection operation.
pub type Result<T> = std::result::Result<T, Error>;

/// Whether the temporary artifact of a failed publish remained on the backend.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum TempArtifact {
    /// The temporary file is still present and may be inspected or removed.
    Present,
    /// The temporary file was cleaned up.
    Absent,
}

impl Display for TempArtifact {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::Present => f.write_str("present"),
            Self::Absent => f.write_str("absent"),
        }
    }
}

/// An error raised by a redirection operation.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The configuration is invalid. Raised before any call site is touched.
    #[error("invalid configuration: {0}")]
    Config(String),
    /// An underlying storage operation failed.
    #[error(transparent)]
    Backend(#[from] io::Error),
    /// Publishing an atomic write failed. `temp_state` reports whether the
    /// temporary artifact survived the cleanup attempt.
    #[error("failed to publish `{path}` (temp artifact {temp_state}): {source}")]
    AtomicPublish {
        path: String,
        temp_state: TempArtifact,
        source: Box<Error>,
    },
    /// The write handle was already published or discarded.
    #[error("write handle for `{0}` was already published")]
    AlreadyPublished(String),
    /// The context was entered twice or used after exit.
    #[error("redirection context was already entered or closed")]
    ReuseAfterClose,
    /// One or more call-site restorations failed. Every restoration was
    /// attempted before this was raised.
    #[error("restore failed for call site group(s) {}", format_failures(.0))]
    RestoreAggregate(Vec<(SiteGroup, Error)>),
}

fn format_failures(failures: &[(SiteGroup, Error)]) -> String {
    failures
        .iter()
        .map(|(group, err)| format!("{group:?}: {err}"))
        .join("; ")
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn aggregate_names_every_group() {
        let err = Error::RestoreAggregate(vec![
            (SiteGroup::Open, Error::Config("bad".to_owned())),
            (SiteGroup::Probe, Error::ReuseAfterClose),
        ]);

        let message = err.to_string();
        assert!(message.contains("Open"));
        assert!(message.contains("Probe"));
    }

    #[test]
    fn temp_artifact_display() {
        assert_eq!(TempArtifact::Present.to_string(), "present");
        assert_eq!(TempArtifact::Absent.to_string(), "absent");
    }
}
