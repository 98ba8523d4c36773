//! Result-file name classification.
//!
//! The worker writes dated, unindexed output files; the only signal about what
//! a file holds is its name. The convention is fragile, so the heuristic lives
//! in this one function and unknown variants fail closed: anything not
//! recognizably a detail payload or a comment dump is `Other`, which is still
//! scanned, just last.

/// What a result file holds, inferred from its name
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FileKind {
    /// Detail payloads; scanned first
    PrimaryContent,
    /// Comment dumps; excluded from record scans
    CommentOnly,
    /// Unrecognized; scanned after primary content
    Other,
}

/// Marker the worker puts in detail-payload file names
const PRIMARY_MARKER: &str = "detail_contents";

/// Marker for comment dumps
const COMMENT_MARKER: &str = "comment";

/// Classify a result file by name
pub fn classify_file(name: &str) -> FileKind {
    if name.contains(PRIMARY_MARKER) {
        return FileKind::PrimaryContent;
    }
    if name.contains(COMMENT_MARKER) {
        return FileKind::CommentOnly;
    }
    FileKind::Other
}
