//! Document Extractor — turns an uploaded resume (PDF or DOCX) into plain text.
//!
//! Extraction is CPU-bound; callers run it under `spawn_blocking`. Identical
//! input bytes always produce identical text.

use std::io::Read;

use once_cell::sync::Lazy;
use regex::Regex;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("document is {size} bytes; maximum allowed is {max}")]
    TooLarge { size: usize, max: usize },

    #[error("unsupported document format: {0}")]
    Unsupported(String),

    #[error("document contains no extractable text")]
    Empty,

    #[error("failed to extract text: {0}")]
    Failed(String),
}

/// Supported upload formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentFormat {
    Pdf,
    Docx,
}

impl DocumentFormat {
    /// Resolves the format from the declared filename extension.
    pub fn from_filename(name: &str) -> Option<Self> {
        let lower = name.to_lowercase();
        if lower.ends_with(".pdf") {
            Some(Self::Pdf)
        } else if lower.ends_with(".docx") {
            Some(Self::Docx)
        } else {
            None
        }
    }

    /// Sniffs the format from magic bytes when no filename was supplied.
    pub fn sniff(bytes: &[u8]) -> Option<Self> {
        if bytes.starts_with(b"%PDF-") {
            Some(Self::Pdf)
        } else if bytes.starts_with(b"PK\x03\x04") {
            Some(Self::Docx)
        } else {
            None
        }
    }
}

/// Extracts plain text from an uploaded resume document.
///
/// The size guard runs before any decoding. A declared filename decides the
/// format; uploads without one are sniffed from magic bytes. Corrupt or
/// password-protected documents fail with the cause preserved for logging.
pub fn extract_text(
    bytes: &[u8],
    filename: Option<&str>,
    max_bytes: usize,
) -> Result<String, ExtractError> {
    if bytes.len() > max_bytes {
        return Err(ExtractError::TooLarge {
            size: bytes.len(),
            max: max_bytes,
        });
    }

    let format = match filename.filter(|name| !name.trim().is_empty()) {
        Some(name) => DocumentFormat::from_filename(name)
            .ok_or_else(|| ExtractError::Unsupported(name.to_string()))?,
        None => DocumentFormat::sniff(bytes)
            .ok_or_else(|| ExtractError::Unsupported("unnamed upload".to_string()))?,
    };

    let text = match format {
        DocumentFormat::Pdf => pdf_to_text(bytes)?,
        DocumentFormat::Docx => docx_to_text(bytes)?,
    };

    let text = text.trim().to_string();
    if text.is_empty() {
        return Err(ExtractError::Empty);
    }
    Ok(text)
}

/// Raw-text passthrough for the JSON request path: trim only.
pub fn normalize_raw_text(text: &str) -> Result<String, ExtractError> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(ExtractError::Empty);
    }
    Ok(trimmed.to_string())
}

fn pdf_to_text(bytes: &[u8]) -> Result<String, ExtractError> {
    pdf_extract::extract_text_from_mem(bytes).map_err(|e| ExtractError::Failed(format!("pdf: {e}")))
}

/// Reads `word/document.xml` out of the DOCX container and strips the markup.
fn docx_to_text(bytes: &[u8]) -> Result<String, ExtractError> {
    let mut archive = zip::ZipArchive::new(std::io::Cursor::new(bytes))
        .map_err(|e| ExtractError::Failed(format!("docx container: {e}")))?;

    let mut xml = String::new();
    archive
        .by_name("word/document.xml")
        .map_err(|e| ExtractError::Failed(format!("docx container: {e}")))?
        .read_to_string(&mut xml)
        .map_err(|e| ExtractError::Failed(format!("docx read: {e}")))?;

    Ok(wordprocessingml_to_text(&xml))
}

static XML_TAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[^>]+>").expect("tag pattern compiles"));

/// Strips WordprocessingML down to plain text, one line per paragraph.
fn wordprocessingml_to_text(xml: &str) -> String {
    // Paragraph ends and explicit breaks become newlines, tabs become tabs.
    let xml = xml
        .replace("</w:p>", "\n")
        .replace("<w:br/>", "\n")
        .replace("<w:tab/>", "\t");

    let text = XML_TAG.replace_all(&xml, "");

    // `&amp;` must be unescaped last so it cannot re-form another entity.
    let text = text
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&amp;", "&");

    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}
