//! Front-matter parsing for content description files.
//!
//! A document starts with a `---` line, followed by a YAML mapping, closed by
//! another `---` (or `...`) line. Only the mapping matters; text after the
//! closing delimiter is ignored.

use serde::Deserialize;

use crate::domain::{non_empty, ContentType, SourceDocument};
use crate::error::SyncError;

/// Raw front-matter keys as written by content authors (snake_case or camelCase)
#[derive(Debug, Default, Deserialize)]
struct FrontMatter {
    #[serde(default)]
    title: Option<Scalar>,
    #[serde(default)]
    image: Option<Scalar>,
    #[serde(default, alias = "imageText")]
    image_text: Option<Scalar>,
    #[serde(default)]
    tags: Option<Tags>,
    #[serde(default, alias = "bodyContent")]
    body_content: Option<Scalar>,
    #[serde(default, alias = "contentType")]
    content_type: Option<Scalar>,
    #[serde(default)]
    url: Option<Scalar>,
}

/// Any YAML scalar; `title: 2024` or `tags: [1, 2]` read as text
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Scalar {
    Text(String),
    Int(i64),
    Float(f64),
    Bool(bool),
}

impl From<Scalar> for String {
    fn from(scalar: Scalar) -> Self {
        match scalar {
            Scalar::Text(s) => s,
            Scalar::Int(n) => n.to_string(),
            Scalar::Float(n) => n.to_string(),
            Scalar::Bool(b) => b.to_string(),
        }
    }
}

fn text(value: Option<Scalar>) -> Option<String> {
    non_empty(value.map(String::from))
}

/// `tags: [a, b]` or a lone `tags: a`
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Tags {
    List(Vec<Scalar>),
    Single(Scalar),
}

impl Tags {
    fn into_vec(self) -> Vec<String> {
        match self {
            Tags::List(tags) => tags.into_iter().map(String::from).collect(),
            Tags::Single(tag) => vec![tag.into()],
        }
    }
}

/// Split the YAML block off the top of a document
fn extract_block(input: &str) -> Option<String> {
    let mut lines = input.lines();

    let first = lines.next()?.trim_start_matches('\u{feff}').trim_end();
    if first != "---" {
        return None;
    }

    let mut yaml_lines = Vec::new();
    for line in lines {
        let trimmed = line.trim_end();
        if trimmed == "---" || trimmed == "..." {
            return Some(yaml_lines.join("\n"));
        }
        yaml_lines.push(line);
    }

    // Unterminated block
    None
}

/// Parse a raw document into a normalized candidate.
///
/// Empty optional values become `None`; a missing title or content type, an
/// unknown content type, or invalid YAML is a parse error for this item.
pub fn parse_document(filename: &str, raw: &str) -> Result<SourceDocument, SyncError> {
    let block = extract_block(raw)
        .ok_or_else(|| SyncError::parse(filename, "no front-matter block"))?;

    let front: FrontMatter = if block.trim().is_empty() {
        FrontMatter::default()
    } else {
        serde_yaml::from_str(&block)
            .map_err(|e| SyncError::parse(filename, format!("invalid front-matter: {}", e)))?
    };

    let title = text(front.title)
        .ok_or_else(|| SyncError::parse(filename, "missing title"))?;

    let content_type = text(front.content_type)
        .ok_or_else(|| SyncError::parse(filename, "missing content_type"))?
        .parse::<ContentType>()
        .map_err(|e| SyncError::parse(filename, e.to_string()))?;

    let tags = front.tags.map(Tags::into_vec).unwrap_or_default();

    Ok(SourceDocument {
        filename: filename.to_string(),
        title,
        content_type,
        tags,
        image: text(front.image),
        image_text: text(front.image_text),
        url: text(front.url),
        body_content: text(front.body_content),
    })
}
