//! Summary parsing - narrative answer plus structured citations
//!
//! The summarization prompt asks the model for a textual answer followed by a
//! "References" section holding a JSON list of citation records. Models
//! follow that loosely, so `parse_summary` is total: worst case the whole
//! response becomes the text summary and the reference list stays empty.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

/// One citation record
///
/// Pass-through from the model: no uniqueness is enforced, duplicates are
/// permitted.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Reference {
    #[serde(default)]
    pub title: String,

    #[serde(default)]
    pub description: String,

    #[serde(default)]
    pub url: String,

    #[serde(rename = "type", default)]
    pub r#type: String,
}

/// Structured final result of a run
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct FinalSummary {
    pub text_summary: String,
    pub references: Vec<Reference>,
}

/// Section markers scanned for, in fixed priority order
///
/// The iteration order decides which marker wins when several appear; the
/// earlier entry in this list takes precedence regardless of position in the
/// text.
const REFERENCE_MARKERS: [&str; 4] = ["References", "참고 자료", "Sources", "출처"];

/// Split raw model text into a narrative answer and citation records
pub fn parse_summary(raw: &str) -> FinalSummary {
    debug!(raw_len = raw.len(), "parse_summary: called");

    let Some((text_before_marker, candidate_block)) = find_reference_block(raw) else {
        debug!("parse_summary: no reference section found");
        return FinalSummary {
            text_summary: raw.to_string(),
            references: Vec::new(),
        };
    };

    match parse_references(&candidate_block) {
        Some(references) => {
            debug!(count = references.len(), "parse_summary: parsed references");
            FinalSummary {
                text_summary: text_before_marker,
                references,
            }
        }
        None => {
            // Do not silently drop content - keep the whole response
            warn!("parse_summary: reference block did not parse, keeping full text");
            FinalSummary {
                text_summary: raw.to_string(),
                references: Vec::new(),
            }
        }
    }
}

/// Locate the citation block after the highest-priority marker
///
/// Per marker, the *last* occurrence wins; a marker on its own line is tried
/// before a bare substring match. Returns (text before marker, candidate
/// block) only when the text after the marker actually looks like structured
/// data - otherwise the next marker is tried.
fn find_reference_block(raw: &str) -> Option<(String, String)> {
    for marker in REFERENCE_MARKERS {
        let lined = format!("\n{}\n", marker);
        let (marker_pos, after_pos) = match raw.rfind(&lined) {
            Some(pos) => (pos, pos + 1 + marker.len()),
            None => match raw.rfind(marker) {
                Some(pos) => (pos, pos + marker.len()),
                None => continue,
            },
        };

        let tail = raw[after_pos..].trim();

        if let Some(inner) = fenced_json_inner(tail) {
            debug!(%marker, "find_reference_block: fenced block after marker");
            return Some((raw[..marker_pos].trim().to_string(), inner.to_string()));
        }

        if tail.starts_with('[') && tail.ends_with(']') {
            debug!(%marker, "find_reference_block: bare list after marker");
            return Some((raw[..marker_pos].trim().to_string(), tail.to_string()));
        }
    }
    None
}

/// Inner text of a ```json fenced block, if present
fn fenced_json_inner(text: &str) -> Option<&str> {
    let start = text.find("```json")?;
    let inner_start = start + "```json".len();
    let end = text[inner_start..].find("```")?;
    Some(text[inner_start..inner_start + end].trim())
}

/// Parse a candidate block into citation records
///
/// A value that is not a list counts as a parse failure.
fn parse_references(block: &str) -> Option<Vec<Reference>> {
    let value: Value = serde_json::from_str(block).ok()?;
    if !value.is_array() {
        warn!("parse_references: reference data is not a list");
        return None;
    }
    serde_json::from_value(value).ok()
}
