//! Report types for batch conversation curation.
//!
//! A curation run over many files collects one outcome per file instead of
//! aborting on the first bad one; the report carries the tallies and every
//! per-file finding in a displayable, programmatically filterable form.

use std::fmt;
use std::path::PathBuf;

/// The severity of a curation issue.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CurationSeverity {
    /// A recoverable oddity; the file was still curated.
    Warning,
    /// The file could not be curated and was skipped.
    Error,
}

/// A stable code identifying the type of curation issue.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CurationIssueCode {
    /// The file could not be read or was not valid conversation JSON.
    UnreadableConversation,
    /// Assistant text contained fragments the decoder had to skip.
    MalformedAnnotations,
    /// Decoded coordinates fell outside the normalized [0, 1] range.
    OutOfRangeCoordinates,
}

/// A single per-file finding from a curation run.
#[derive(Clone, Debug)]
pub struct CurationIssue {
    pub severity: CurationSeverity,
    pub code: CurationIssueCode,
    pub path: PathBuf,
    pub message: String,
}

impl CurationIssue {
    /// Creates a new error-severity issue.
    pub fn error(code: CurationIssueCode, path: PathBuf, message: impl Into<String>) -> Self {
        Self {
            severity: CurationSeverity::Error,
            code,
            path,
            message: message.into(),
        }
    }

    /// Creates a new warning-severity issue.
    pub fn warning(code: CurationIssueCode, path: PathBuf, message: impl Into<String>) -> Self {
        Self {
            severity: CurationSeverity::Warning,
            code,
            path,
            message: message.into(),
        }
    }
}

impl fmt::Display for CurationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let severity = match self.severity {
            CurationSeverity::Error => "ERROR",
            CurationSeverity::Warning => "WARN ",
        };
        write!(
            f,
            "[{}] {:?} in {}: {}",
            severity,
            self.code,
            self.path.display(),
            self.message
        )
    }
}

/// The result of curating a directory of conversation files.
#[derive(Clone, Debug, Default)]
pub struct CurationReport {
    /// Conversation files found and attempted.
    pub files_scanned: usize,
    /// Files whose assistant turns carry at least one annotation.
    pub grounding: usize,
    /// Files with no decodable annotation.
    pub pure_text: usize,
    /// Total annotations recovered across all files.
    pub annotations: usize,
    /// Per-file findings, in scan order.
    pub issues: Vec<CurationIssue>,
}

impl CurationReport {
    /// Creates a new empty report.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an issue to the report.
    pub fn add(&mut self, issue: CurationIssue) {
        self.issues.push(issue);
    }

    /// Returns the number of error-severity issues.
    pub fn error_count(&self) -> usize {
        self.issues
            .iter()
            .filter(|i| i.severity == CurationSeverity::Error)
            .count()
    }

    /// Returns the number of warning-severity issues.
    pub fn warning_count(&self) -> usize {
        self.issues
            .iter()
            .filter(|i| i.severity == CurationSeverity::Warning)
            .count()
    }

    /// Returns true if there are no issues at all.
    pub fn is_clean(&self) -> bool {
        self.issues.is_empty()
    }
}

impl fmt::Display for CurationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Curated {} file(s): {} grounding, {} pure-text, {} annotation(s)",
            self.files_scanned, self.grounding, self.pure_text, self.annotations
        )?;

        if self.issues.is_empty() {
            return Ok(());
        }

        writeln!(
            f,
            "{} error(s), {} warning(s):",
            self.error_count(),
            self.warning_count()
        )?;
        for issue in &self.issues {
            writeln!(f, "  {}", issue)?;
        }
        Ok(())
    }
}
