//! Response Parser — recovers the structured report from a noisy model reply.
//!
//! Models wrap payloads in prose and code fences despite instructions, so
//! parsing is layered: strict parse of the fence-stripped text first, then a
//! scan for balanced `{...}` spans, taking the first candidate that
//! deserializes as the report. Nothing is ever fabricated from unparseable
//! text.

use thiserror::Error;

use crate::analysis::report::AnalysisReport;

/// No structured payload could be recovered. Carries the raw reply so the
/// failure path can keep it available for diagnostics.
#[derive(Debug, Error)]
#[error("model reply did not contain a valid analysis payload")]
pub struct MalformedReply {
    pub raw: String,
}

/// Parses the model reply into an `AnalysisReport`.
///
/// Pure and idempotent: parsing the reserialized output of a successful parse
/// yields the same report.
pub fn parse_report(raw: &str) -> Result<AnalysisReport, MalformedReply> {
    let stripped = strip_code_fences(raw);
    if let Ok(report) = serde_json::from_str::<AnalysisReport>(stripped) {
        return Ok(report);
    }

    for candidate in balanced_object_spans(raw) {
        if let Ok(report) = serde_json::from_str::<AnalysisReport>(candidate) {
            return Ok(report);
        }
    }

    Err(MalformedReply {
        raw: raw.to_string(),
    })
}

/// Strips ```json ... ``` or ``` ... ``` code fences from model output.
fn strip_code_fences(text: &str) -> &str {
    let text = text.trim();
    if let Some(stripped) = text.strip_prefix("```json") {
        stripped
            .trim_start()
            .strip_suffix("```")
            .map(|s| s.trim())
            .unwrap_or(stripped.trim_start())
    } else if let Some(stripped) = text.strip_prefix("```") {
        stripped
            .trim_start()
            .strip_suffix("```")
            .map(|s| s.trim())
            .unwrap_or(stripped.trim_start())
    } else {
        text
    }
}

/// Balanced `{...}` spans in order of closing, string-aware so braces inside
/// JSON string literals do not unbalance the scan. Every `{` opens its own
/// candidate, so a stray unmatched brace in prose cannot swallow a balanced
/// payload that follows it. Braces are ASCII, so slicing at their byte
/// offsets stays on char boundaries.
fn balanced_object_spans(text: &str) -> Vec<&str> {
    let bytes = text.as_bytes();
    let mut spans = Vec::new();
    let mut opens: Vec<usize> = Vec::new();
    let mut in_string = false;
    let mut escaped = false;

    for (i, &b) in bytes.iter().enumerate() {
        if in_string {
            if escaped {
                escaped = false;
            } else if b == b'\\' {
                escaped = true;
            } else if b == b'"' {
                in_string = false;
            }
            continue;
        }
        match b {
            b'"' if !opens.is_empty() => in_string = true,
            b'{' => opens.push(i),
            b'}' => {
                if let Some(s) = opens.pop() {
                    spans.push(&text[s..=i]);
                }
            }
            _ => {}
        }
    }

    spans
}
