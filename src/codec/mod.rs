//! Conversion between rich-text documents, HTML and plain text.
//!
//! Question and option text arrive as one of three shapes: a serialized
//! editor document, previously rendered HTML, or plain text. The functions
//! here never fail. Anything that looks like a document but does not parse
//! is treated as plain text.

mod document;

pub use document::{Block, Document, Format, TextRun, ROOT_MARKER};

/// Extract the plain text of `raw`.
///
/// Structured documents yield their run texts, blocks separated by a single
/// space. Anything else (including a document that fails to parse) yields the
/// trimmed input.
pub fn decode_to_plain_text(raw: &str) -> String {
    if raw.is_empty() {
        return String::new();
    }
    let trimmed = raw.trim();
    if Document::looks_structured(trimmed) {
        if let Some(document) = Document::parse(trimmed) {
            return document.plain_text();
        }
    }
    trimmed.to_string()
}

/// Render `raw` as HTML, one `<p>` per block.
///
/// Non-structured input is escaped and wrapped in a single `<p>`.
pub fn decode_to_html(raw: &str) -> String {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return String::new();
    }
    if Document::looks_structured(trimmed) {
        if let Some(document) = Document::parse(trimmed) {
            return document.to_html();
        }
    }
    format!("<p>{}</p>", escape_html(trimmed))
}

/// Produce an editable document from a plain string or a serialized document.
pub fn encode_from_seed(seed: &str) -> Document {
    if !seed.trim().is_empty() && Document::looks_structured(seed) {
        if let Some(document) = Document::parse(seed) {
            return document;
        }
    }
    Document::from_plain(seed)
}

/// Plain text for display, substituting `fallback` when there is none.
pub fn display_text(raw: &str, fallback: &str) -> String {
    let text = decode_to_plain_text(raw);
    if text.is_empty() {
        fallback.to_string()
    } else {
        text
    }
}

// Only &, < and > are escaped; quotes pass through
pub(crate) fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            _ => escaped.push(c),
        }
    }
    escaped
}
