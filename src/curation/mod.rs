//! Conversation curation: grounding vs pure-text partitioning.
//!
//! Training datasets mix grounded dialogues (assistant turns that embed
//! spatial coordinates) with plain caption dialogues. Curation partitions
//! them without rewriting anything: a conversation is *grounding* iff any
//! of its assistant turns decodes to at least one annotation.

pub mod io;
pub mod report;

pub use report::{CurationIssue, CurationIssueCode, CurationReport, CurationSeverity};

use std::path::Path;

use walkdir::WalkDir;

use crate::codec;
use crate::error::LabelbridgeError;
use crate::ir::Conversation;

/// Returns true if any assistant turn carries at least one annotation.
pub fn has_grounding(conversation: &Conversation) -> bool {
    conversation
        .assistant_turns()
        .any(|turn| codec::decode(&turn.text).has_annotations())
}

/// A stable partition of conversations by grounding content.
///
/// Both halves preserve the relative order of the input.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Classified {
    /// Conversations with at least one decodable annotation.
    pub grounding: Vec<Conversation>,
    /// Conversations whose assistant turns are plain text.
    pub pure_text: Vec<Conversation>,
}

/// Partitions conversations into grounding and pure-text groups.
///
/// Classification is read-only: conversation content is never rewritten,
/// and each half keeps the input's relative order.
pub fn classify(conversations: Vec<Conversation>) -> Classified {
    let mut classified = Classified::default();
    for conversation in conversations {
        if has_grounding(&conversation) {
            classified.grounding.push(conversation);
        } else {
            classified.pure_text.push(conversation);
        }
    }
    classified
}

/// Aggregate counts over a conversation set.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CurationStats {
    /// Total conversations seen.
    pub conversations: usize,
    /// Conversations with at least one annotation.
    pub grounding: usize,
    /// Conversations without any annotation.
    pub pure_text: usize,
    /// Total annotations decoded across all assistant turns.
    pub annotations: usize,
}

/// Tallies grounding content without partitioning.
pub fn stats(conversations: &[Conversation]) -> CurationStats {
    let mut stats = CurationStats {
        conversations: conversations.len(),
        ..CurationStats::default()
    };

    for conversation in conversations {
        let decoded_total: usize = conversation
            .assistant_turns()
            .map(|turn| codec::decode(&turn.text).annotations.len())
            .sum();
        if decoded_total > 0 {
            stats.grounding += 1;
            stats.annotations += decoded_total;
        } else {
            stats.pure_text += 1;
        }
    }

    stats
}

/// Curates every `.json` conversation file under `dir`.
///
/// Files are visited in path order for deterministic reports. A file that
/// cannot be read or parsed is recorded as an error-severity issue and the
/// batch continues; decode warnings inside a readable file are recorded as
/// warning-severity issues. Only a failure to walk the directory itself
/// aborts the whole call.
pub fn curate_directory(dir: &Path) -> Result<CurationReport, LabelbridgeError> {
    let mut files = Vec::new();
    for entry in WalkDir::new(dir) {
        let entry = entry.map_err(|err| {
            LabelbridgeError::Io(err.into_io_error().unwrap_or_else(|| {
                std::io::Error::other(format!("unreadable entry under {}", dir.display()))
            }))
        })?;
        if entry.file_type().is_file()
            && entry.path().extension().is_some_and(|ext| ext == "json")
        {
            files.push(entry.into_path());
        }
    }
    files.sort();

    let mut report = CurationReport::new();
    for path in files {
        report.files_scanned += 1;

        let conversation = match io::read_conversation_json(&path) {
            Ok(conversation) => conversation,
            Err(error) => {
                log::warn!("skipping {}: {}", path.display(), error);
                report.add(CurationIssue::error(
                    CurationIssueCode::UnreadableConversation,
                    path,
                    error.to_string(),
                ));
                continue;
            }
        };

        let mut annotations = 0;
        let mut malformed = 0;
        let mut out_of_range = 0;
        for turn in conversation.assistant_turns() {
            let decoded = codec::decode(&turn.text);
            annotations += decoded.annotations.len();
            for warning in &decoded.warnings {
                match warning {
                    codec::ParseWarning::MalformedGroundingAnnotation { .. } => malformed += 1,
                    codec::ParseWarning::CoordinateOutOfRange { .. } => out_of_range += 1,
                }
            }
        }

        if annotations > 0 {
            report.grounding += 1;
            report.annotations += annotations;
        } else {
            report.pure_text += 1;
        }

        if malformed > 0 {
            report.add(CurationIssue::warning(
                CurationIssueCode::MalformedAnnotations,
                path.clone(),
                format!("{malformed} grounding fragment(s) skipped"),
            ));
        }
        if out_of_range > 0 {
            report.add(CurationIssue::warning(
                CurationIssueCode::OutOfRangeCoordinates,
                path,
                format!("{out_of_range} coordinate(s) outside [0, 1]"),
            ));
        }
    }

    log::info!(
        "curated {} file(s) under {}: {} grounding, {} pure-text",
        report.files_scanned,
        dir.display(),
        report.grounding,
        report.pure_text
    );

    Ok(report)
}
