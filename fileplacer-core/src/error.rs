use std::path::PathBuf;
use thiserror::Error;

/// Conditions that stop a run before any file is touched.
///
/// Everything else (no matching rule, extraction trouble, a failed move)
/// is isolated to the file it concerns and reported through `FileOutcome`.
#[derive(Debug, Error)]
pub enum OrganizerError {
    #[error("source folder not found: {}", .0.display())]
    SourceMissing(PathBuf),

    #[error("no usable rules in {}: fill in at least one sheet with a pattern and a destination, then run again", .0.display())]
    NoRules(PathBuf),

    #[error("failed to read rule document {}: {source}", .path.display())]
    RuleDocument {
        path: PathBuf,
        #[source]
        source: anyhow::Error,
    },
}
