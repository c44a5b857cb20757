use serde::{Deserialize, Serialize};

use super::escape_html;

// Key that every serialized editor state carries at the top level
pub const ROOT_MARKER: &str = "\"root\"";

/// Inline formatting bitmask carried by each text run.
///
/// Only bold, italic and underline affect rendering. Any other bits the
/// editor sets (strikethrough, code, ...) are preserved but ignored.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Format(pub u32);

impl Format {
    pub const PLAIN: Format = Format(0);
    pub const BOLD: Format = Format(1);
    pub const ITALIC: Format = Format(2);
    pub const UNDERLINE: Format = Format(8);

    pub fn contains(self, other: Format) -> bool {
        other.0 != 0 && self.0 & other.0 == other.0
    }
}

impl std::ops::BitOr for Format {
    type Output = Format;

    fn bitor(self, rhs: Format) -> Format {
        Format(self.0 | rhs.0)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TextRun {
    pub text: String,
    pub format: Format,
}

impl TextRun {
    pub fn plain(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            format: Format::PLAIN,
        }
    }

    pub fn formatted(text: impl Into<String>, format: Format) -> Self {
        Self {
            text: text.into(),
            format,
        }
    }

    // Escaped text wrapped bold innermost, then italic, then underline outermost.
    // Other clients render the cached HTML directly, so this nesting must not change.
    pub fn to_html(&self) -> String {
        let mut segment = escape_html(&self.text);
        if self.format.contains(Format::BOLD) {
            segment = format!("<strong>{}</strong>", segment);
        }
        if self.format.contains(Format::ITALIC) {
            segment = format!("<em>{}</em>", segment);
        }
        if self.format.contains(Format::UNDERLINE) {
            segment = format!("<u>{}</u>", segment);
        }
        segment
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Block {
    pub runs: Vec<TextRun>,
}

impl Block {
    pub fn new(runs: Vec<TextRun>) -> Self {
        Self { runs }
    }

    pub fn text(&self) -> String {
        self.runs.iter().map(|run| run.text.as_str()).collect()
    }

    pub fn to_html(&self) -> String {
        let inner: String = self.runs.iter().map(TextRun::to_html).collect();
        format!("<p>{}</p>", inner)
    }
}

/// Structured rich-text content: ordered blocks of formatted runs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Document {
    pub blocks: Vec<Block>,
}

impl Document {
    pub fn new(blocks: Vec<Block>) -> Self {
        Self { blocks }
    }

    /// A document holding a single unformatted run.
    pub fn from_plain(text: impl Into<String>) -> Self {
        Self {
            blocks: vec![Block::new(vec![TextRun::plain(text)])],
        }
    }

    /// Whether `raw` has the shape of a serialized document. This is only a
    /// shape check; the content may still fail to parse.
    pub fn looks_structured(raw: &str) -> bool {
        let trimmed = raw.trim();
        trimmed.starts_with('{') && trimmed.contains(ROOT_MARKER)
    }

    /// Parse a serialized document. Returns `None` when the JSON is invalid
    /// or has no `root` object.
    pub fn parse(raw: &str) -> Option<Document> {
        let serialized: SerializedDocument = serde_json::from_str(raw.trim()).ok()?;
        Some(serialized.into())
    }

    /// Block texts joined by a single space, trimmed.
    pub fn plain_text(&self) -> String {
        self.blocks
            .iter()
            .map(Block::text)
            .collect::<Vec<_>>()
            .join(" ")
            .trim()
            .to_string()
    }

    pub fn to_html(&self) -> String {
        self.blocks.iter().map(Block::to_html).collect()
    }

    /// Serialize into the editor's JSON state format.
    pub fn to_json(&self) -> String {
        let serialized = SerializedDocument::from(self);
        // Plain structs of strings and integers always serialize
        serde_json::to_string(&serialized).unwrap_or_default()
    }
}

// Editor state wire format:
// {"root":{"type":"root","children":[{"type":"paragraph","children":[{"type":"text","text":"..","format":1}]}]}}

#[derive(Debug, Serialize, Deserialize)]
struct SerializedDocument {
    root: SerializedRoot,
}

#[derive(Debug, Serialize, Deserialize)]
struct SerializedRoot {
    #[serde(rename = "type", default = "root_kind")]
    kind: String,
    #[serde(default)]
    children: Vec<SerializedBlock>,
    #[serde(default = "format_version")]
    version: u32,
}

#[derive(Debug, Serialize, Deserialize)]
struct SerializedBlock {
    #[serde(rename = "type", default = "paragraph_kind")]
    kind: String,
    // Non-array children (or none at all) read as an empty block
    #[serde(default, deserialize_with = "lenient_runs")]
    children: Vec<SerializedRun>,
    #[serde(default = "format_version")]
    version: u32,
}

#[derive(Debug, Serialize, Deserialize)]
struct SerializedRun {
    #[serde(rename = "type", default = "text_kind")]
    kind: String,
    #[serde(default)]
    text: Option<String>,
    #[serde(default)]
    format: Option<u32>,
    #[serde(default = "format_version")]
    version: u32,
}

fn root_kind() -> String {
    "root".to_string()
}

fn paragraph_kind() -> String {
    "paragraph".to_string()
}

fn text_kind() -> String {
    "text".to_string()
}

fn format_version() -> u32 {
    1
}

fn lenient_runs<'de, D>(deserializer: D) -> Result<Vec<SerializedRun>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    match value {
        serde_json::Value::Array(items) => Ok(items
            .into_iter()
            .filter_map(|item| serde_json::from_value(item).ok())
            .collect()),
        _ => Ok(Vec::new()),
    }
}

impl From<SerializedDocument> for Document {
    fn from(serialized: SerializedDocument) -> Self {
        let blocks = serialized
            .root
            .children
            .into_iter()
            .map(|block| {
                Block::new(
                    block
                        .children
                        .into_iter()
                        .map(|run| TextRun {
                            text: run.text.unwrap_or_default(),
                            format: Format(run.format.unwrap_or(0)),
                        })
                        .collect(),
                )
            })
            .collect();
        Document { blocks }
    }
}

impl From<&Document> for SerializedDocument {
    fn from(document: &Document) -> Self {
        SerializedDocument {
            root: SerializedRoot {
                kind: root_kind(),
                version: format_version(),
                children: document
                    .blocks
                    .iter()
                    .map(|block| SerializedBlock {
                        kind: paragraph_kind(),
                        version: format_version(),
                        children: block
                            .runs
                            .iter()
                            .map(|run| SerializedRun {
                                kind: text_kind(),
                                text: Some(run.text.clone()),
                                format: Some(run.format.0),
                                version: format_version(),
                            })
                            .collect(),
                    })
                    .collect(),
            },
        }
    }
}
