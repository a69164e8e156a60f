use std::cmp::Ordering;
use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::Serialize;
use thiserror::Error;
use tracing::{info, warn};

pub const CURRENT_FILENAME: &str = "current";
pub const REVISIONS_DIRNAME: &str = "revisions";

/// A revision number kept in its on-disk spelling.
///
/// Only strings made entirely of ASCII digits are revision ids. Ordering is
/// numeric and works on the digits directly, so ids longer than any machine
/// integer still compare correctly.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct RevisionId(String);

impl RevisionId {
    pub fn parse(raw: &str) -> Option<Self> {
        if raw.is_empty() || !raw.bytes().all(|byte| byte.is_ascii_digit()) {
            return None;
        }
        Some(Self(raw.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    fn significant_digits(&self) -> &str {
        let trimmed = self.0.trim_start_matches('0');
        if trimmed.is_empty() { "0" } else { trimmed }
    }
}

impl Ord for RevisionId {
    fn cmp(&self, other: &Self) -> Ordering {
        let left = self.significant_digits();
        let right = other.significant_digits();
        left.len()
            .cmp(&right.len())
            .then_with(|| left.cmp(right))
            .then_with(|| self.0.cmp(&other.0))
    }
}

impl PartialOrd for RevisionId {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for RevisionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("missing file {}", .path.display())]
    NotFound { path: PathBuf },
    #[error("permission denied for {}", .path.display())]
    PermissionDenied { path: PathBuf },
    #[error("failed to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl SourceError {
    pub fn from_io(path: &Path, source: io::Error) -> Self {
        let path = path.to_path_buf();
        match source.kind() {
            io::ErrorKind::NotFound => Self::NotFound { path },
            io::ErrorKind::PermissionDenied => Self::PermissionDenied { path },
            _ => Self::Io { path, source },
        }
    }

    pub fn path(&self) -> &Path {
        match self {
            Self::NotFound { path } | Self::PermissionDenied { path } | Self::Io { path, .. } => {
                path
            }
        }
    }
}

/// Read-only view of one article's revision history.
pub trait RevisionSource {
    /// Revision named by the `current` sentinel: first non-blank line, trimmed.
    /// `Ok(None)` means the sentinel exists but is blank.
    fn read_pointer(&self) -> Result<Option<String>, SourceError>;

    /// Every revision id found under `revisions/`, non-numeric names excluded.
    fn list_numeric_revisions(&self) -> Result<Vec<RevisionId>, SourceError>;

    fn read_revision(&self, revision: &RevisionId) -> Result<String, SourceError>;
}

#[derive(Debug, Clone)]
pub struct FsRevisionSource {
    root: PathBuf,
}

impl FsRevisionSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn pointer_path(&self) -> PathBuf {
        self.root.join(CURRENT_FILENAME)
    }

    pub fn revisions_dir(&self) -> PathBuf {
        self.root.join(REVISIONS_DIRNAME)
    }

    pub fn revision_path(&self, revision: &RevisionId) -> PathBuf {
        self.revisions_dir().join(revision.as_str())
    }
}

impl RevisionSource for FsRevisionSource {
    fn read_pointer(&self) -> Result<Option<String>, SourceError> {
        let content = read_text(&self.pointer_path())?;
        Ok(content
            .trim()
            .lines()
            .next()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(str::to_string))
    }

    fn list_numeric_revisions(&self) -> Result<Vec<RevisionId>, SourceError> {
        let dir = self.revisions_dir();
        let entries = fs::read_dir(&dir).map_err(|err| SourceError::from_io(&dir, err))?;
        let mut revisions = Vec::new();
        for entry in entries.flatten() {
            if !entry.path().is_file() {
                continue;
            }
            let name = entry.file_name();
            if let Some(revision) = name.to_str().and_then(RevisionId::parse) {
                revisions.push(revision);
            }
        }
        revisions.sort();
        Ok(revisions)
    }

    fn read_revision(&self, revision: &RevisionId) -> Result<String, SourceError> {
        read_text(&self.revision_path(revision))
    }
}

fn read_text(path: &Path) -> Result<String, SourceError> {
    let bytes = fs::read(path).map_err(|err| SourceError::from_io(path, err))?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

/// Why the `current` sentinel could not be used.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FallbackReason {
    PointerMissing,
    PointerEmpty,
    PointerUnreadable { detail: String },
    PointerNotNumeric { value: String },
    PointedRevisionUnreadable { revision: RevisionId, detail: String },
}

impl fmt::Display for FallbackReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PointerMissing => f.write_str("no current pointer"),
            Self::PointerEmpty => f.write_str("current pointer is empty"),
            Self::PointerUnreadable { detail } => write!(f, "current pointer unreadable ({detail})"),
            Self::PointerNotNumeric { value } => {
                write!(f, "current pointer {value:?} is not a revision number")
            }
            Self::PointedRevisionUnreadable { revision, detail } => {
                write!(f, "revision {revision} named by current pointer unreadable ({detail})")
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ResolvedVia {
    Pointer,
    Fallback { reason: FallbackReason },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    pub revision: RevisionId,
    pub content: String,
    pub via: ResolvedVia,
}

#[derive(Debug, Error)]
pub enum ResolutionExhausted {
    #[error("no numeric revisions found")]
    NoRevisions,
    #[error("revisions could not be listed: {0}")]
    ListingFailed(#[source] SourceError),
    #[error("fallback revision {revision} could not be read: {source}")]
    FallbackReadFailed {
        revision: RevisionId,
        #[source]
        source: SourceError,
    },
}

/// Pick the revision that holds an article's content.
///
/// A readable revision named by the `current` sentinel wins outright, even when
/// higher numbered revisions exist. Otherwise the highest numbered revision is
/// read, and that single fallback read is the last attempt.
pub fn resolve<S>(article: &str, source: &S) -> Result<Resolution, ResolutionExhausted>
where
    S: RevisionSource + ?Sized,
{
    let reason = match source.read_pointer() {
        Ok(Some(pointer)) => match RevisionId::parse(&pointer) {
            Some(revision) => match source.read_revision(&revision) {
                Ok(content) => {
                    return Ok(Resolution {
                        revision,
                        content,
                        via: ResolvedVia::Pointer,
                    });
                }
                Err(err) => {
                    warn!(article, path = %err.path().display(), "ignoring unreadable revision: {err}");
                    FallbackReason::PointedRevisionUnreadable {
                        revision,
                        detail: err.to_string(),
                    }
                }
            },
            None => {
                warn!(article, pointer = %pointer, "ignoring non-numeric current pointer");
                FallbackReason::PointerNotNumeric { value: pointer }
            }
        },
        Ok(None) => {
            warn!(article, "ignoring empty current pointer");
            FallbackReason::PointerEmpty
        }
        Err(SourceError::NotFound { path }) => {
            info!(article, path = %path.display(), "ignoring missing current pointer");
            FallbackReason::PointerMissing
        }
        Err(err) => {
            warn!(article, path = %err.path().display(), "ignoring unreadable current pointer: {err}");
            FallbackReason::PointerUnreadable {
                detail: err.to_string(),
            }
        }
    };

    resolve_latest(article, source, reason)
}

fn resolve_latest<S>(
    article: &str,
    source: &S,
    reason: FallbackReason,
) -> Result<Resolution, ResolutionExhausted>
where
    S: RevisionSource + ?Sized,
{
    let candidates = match source.list_numeric_revisions() {
        Ok(candidates) => candidates,
        Err(SourceError::NotFound { .. }) => Vec::new(),
        Err(err) => return Err(ResolutionExhausted::ListingFailed(err)),
    };
    let Some(revision) = candidates.into_iter().max() else {
        return Err(ResolutionExhausted::NoRevisions);
    };

    info!(article, revision = %revision, "instead using highest numbered revision");
    match source.read_revision(&revision) {
        Ok(content) => Ok(Resolution {
            revision,
            content,
            via: ResolvedVia::Fallback { reason },
        }),
        Err(source) => Err(ResolutionExhausted::FallbackReadFailed { revision, source }),
    }
}
