//! Classification of merged text into clean or conflicted outcomes.

use std::sync::OnceLock;

use comfy_table::{Cell, ContentArrangement, Table, presets::UTF8_FULL};
use regex::Regex;
use serde::Serialize;

use crate::{codec, error::MarkerError};

static BEGIN_REGEX: OnceLock<Regex> = OnceLock::new();
static SEPARATOR_REGEX: OnceLock<Regex> = OnceLock::new();
static END_REGEX: OnceLock<Regex> = OnceLock::new();

fn begin_regex() -> &'static Regex {
    BEGIN_REGEX.get_or_init(|| Regex::new(r"^<{7}(?:\s|$)").expect("valid begin marker regex"))
}

fn separator_regex() -> &'static Regex {
    SEPARATOR_REGEX.get_or_init(|| Regex::new(r"^={7}\s*$").expect("valid separator regex"))
}

fn end_regex() -> &'static Regex {
    END_REGEX.get_or_init(|| Regex::new(r"^>{7}(?:\s|$)").expect("valid end marker regex"))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Marker {
    Begin,
    Separator,
    End,
}

fn marker(line: &str) -> Option<Marker> {
    if begin_regex().is_match(line) {
        Some(Marker::Begin)
    } else if separator_regex().is_match(line) {
        Some(Marker::Separator)
    } else if end_regex().is_match(line) {
        Some(Marker::End)
    } else {
        None
    }
}

/// One conflicting region: the checked-out side and the merged-in side.
///
/// Both sides hold encoded lines joined with `\n`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConflictSection {
    pub ours: String,
    pub theirs: String,
}

/// Result of classifying a merged file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum MergeOutcome {
    /// No conflict markers; carries the encoded text unchanged.
    Clean { resolved: String },
    /// At least one conflict region, in file order.
    Conflicted { sections: Vec<ConflictSection> },
}

impl MergeOutcome {
    pub fn is_clean(&self) -> bool {
        matches!(self, Self::Clean { .. })
    }
}

enum Region {
    Outside,
    Ours(Vec<String>),
    Theirs(Vec<String>, Vec<String>),
}

/// Classifies `text`, extracting every conflict region.
///
/// Marker structure is checked strictly: anything other than
/// begin → separator → end, non-nested, is a [`MarkerError`].
pub fn analyze(text: &str) -> Result<MergeOutcome, MarkerError> {
    let mut sections = Vec::new();
    let mut region = Region::Outside;
    let mut last_begin = 0;

    for (index, line) in text.lines().enumerate() {
        let line_no = index + 1;
        region = match (region, marker(line)) {
            (Region::Outside, Some(Marker::Begin)) => {
                last_begin = line_no;
                Region::Ours(Vec::new())
            }
            (Region::Outside, Some(Marker::Separator)) => {
                return Err(MarkerError::StraySeparator { line: line_no });
            }
            (Region::Outside, Some(Marker::End)) => {
                return Err(MarkerError::StrayEnd { line: line_no });
            }
            (Region::Outside, None) => Region::Outside,

            (Region::Ours(_) | Region::Theirs(..), Some(Marker::Begin)) => {
                return Err(MarkerError::NestedBegin { line: line_no });
            }
            (Region::Ours(ours), Some(Marker::Separator)) => Region::Theirs(ours, Vec::new()),
            (Region::Ours(_), Some(Marker::End)) => {
                return Err(MarkerError::MissingSeparator { line: line_no });
            }
            (Region::Ours(mut ours), None) => {
                ours.push(line.to_string());
                Region::Ours(ours)
            }

            (Region::Theirs(..), Some(Marker::Separator)) => {
                return Err(MarkerError::DuplicateSeparator { line: line_no });
            }
            (Region::Theirs(ours, theirs), Some(Marker::End)) => {
                sections.push(ConflictSection {
                    ours: ours.join("\n"),
                    theirs: theirs.join("\n"),
                });
                Region::Outside
            }
            (Region::Theirs(ours, mut theirs), None) => {
                theirs.push(line.to_string());
                Region::Theirs(ours, theirs)
            }
        };
    }

    if !matches!(region, Region::Outside) {
        return Err(MarkerError::Unterminated { line: last_begin });
    }

    if sections.is_empty() {
        Ok(MergeOutcome::Clean {
            resolved: text.to_string(),
        })
    } else {
        Ok(MergeOutcome::Conflicted { sections })
    }
}

/// Renders conflict sections as a two-column table for human review.
pub fn render_table(sections: &[ConflictSection], ours_label: &str, theirs_label: &str) -> String {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec![ours_label, theirs_label]);

    for section in sections {
        table.add_row(vec![
            Cell::new(codec::readable(&section.ours)),
            Cell::new(codec::readable(&section.theirs)),
        ]);
    }

    table.to_string()
}
