//! Materialized MIME part tree and body reconstruction

use serde::{Deserialize, Serialize};
use std::fmt::Write as _;

/// Content type used when a part does not declare one
pub const DEFAULT_CONTENT_TYPE: &str = "text/plain";

/// Trees nested deeper than this contribute nothing to the body
const MAX_BODY_DEPTH: usize = 64;

/// A single header line. Order is preserved and names may repeat.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Header {
    pub name: String,
    pub value: String,
}

impl Header {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// The mime-type categories the body and walker logic dispatch on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MimeKind {
    Text,
    MultipartAlternative,
    MultipartRelated,
    Multipart,
    Application,
    Message,
    Other,
}

impl MimeKind {
    /// Resolve a lower-cased mime type by prefix
    #[must_use]
    pub fn of(mime_type: &str) -> Self {
        if mime_type.starts_with("text") {
            Self::Text
        } else if mime_type.starts_with("multipart/alternative") {
            Self::MultipartAlternative
        } else if mime_type.starts_with("multipart/related") {
            Self::MultipartRelated
        } else if mime_type.starts_with("multipart") {
            Self::Multipart
        } else if mime_type.starts_with("application") {
            Self::Application
        } else if mime_type.starts_with("message") {
            Self::Message
        } else {
            Self::Other
        }
    }
}

/// The `name=` parameter of a content type, up to the next `;`.
///
/// `application/pdf; name="f.pdf"` gives `"f.pdf"` with its quotes.
#[must_use]
pub fn name_param(content_type: &str) -> Option<&str> {
    let start = content_type.find("name=")? + 5;
    let rest = &content_type[start..];
    Some(rest.find(';').map_or(rest, |end| &rest[..end]))
}

/// One node of the materialized message structure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartNode {
    pub content_type: String,
    /// `inline`, `attachment` or absent, parameters stripped
    pub disposition: Option<String>,
    pub description: Option<String>,
    pub file_name: Option<String>,
    pub payload: Option<Vec<u8>>,
    pub size: usize,
    pub headers: Vec<Header>,
    pub children: Vec<PartNode>,
}

impl Default for PartNode {
    fn default() -> Self {
        Self::new(DEFAULT_CONTENT_TYPE)
    }
}

impl PartNode {
    #[must_use]
    pub fn new(content_type: &str) -> Self {
        Self {
            content_type: content_type.to_string(),
            disposition: None,
            description: None,
            file_name: None,
            payload: None,
            size: 0,
            headers: Vec::new(),
            children: Vec::new(),
        }
    }

    /// A text leaf, handy for building trees by hand
    #[must_use]
    pub fn text(content_type: &str, text: &str) -> Self {
        Self {
            payload: Some(text.as_bytes().to_vec()),
            size: text.len(),
            ..Self::new(content_type)
        }
    }

    #[must_use]
    pub fn with_children(content_type: &str, children: Vec<Self>) -> Self {
        Self {
            children,
            ..Self::new(content_type)
        }
    }

    /// Content type up to the first `;`, lower-cased
    #[must_use]
    pub fn mime_type(&self) -> String {
        let base = self
            .content_type
            .trim()
            .split(';')
            .next()
            .unwrap_or_default()
            .trim();
        if base.is_empty() {
            "unknown".to_string()
        } else {
            base.to_lowercase()
        }
    }

    #[must_use]
    pub fn mime_subtype(&self) -> String {
        let mime = self.mime_type();
        match mime.find('/') {
            Some(pos) if pos > 0 => mime[pos + 1..].to_string(),
            _ => String::new(),
        }
    }

    #[must_use]
    pub fn kind(&self) -> MimeKind {
        MimeKind::of(&self.mime_type())
    }

    /// Payload decoded as text, lossily
    #[must_use]
    pub fn payload_text(&self) -> Option<String> {
        self.payload
            .as_deref()
            .map(|bytes| String::from_utf8_lossy(bytes).into_owned())
    }

    fn disposition_is(&self, value: &str) -> bool {
        self.disposition
            .as_deref()
            .is_some_and(|d| d.trim().eq_ignore_ascii_case(value))
    }

    /// Counted as an attachment: explicit `attachment`, `inline` with a
    /// description, or a content type naming a file
    #[must_use]
    pub fn is_attachment(&self) -> bool {
        self.disposition_is("attachment")
            || (self.disposition_is("inline") && self.description.is_some())
            || name_param(&self.content_type).is_some()
    }

    /// The child of a `multipart/alternative` whose text becomes the body.
    ///
    /// Every textual child replaces the current choice, so the last one
    /// wins. A `multipart/related` child only counts when its own body
    /// resolves to a textual content type.
    fn alternative_winner(&self, level: usize) -> Option<&Self> {
        let mut winner = None;
        for child in &self.children {
            match child.kind() {
                MimeKind::Text => winner = Some(child),
                MimeKind::MultipartRelated => {
                    if child
                        .body_content_type(level + 1)
                        .is_some_and(|ct| ct.starts_with("text"))
                    {
                        winner = Some(child);
                    }
                }
                _ => {}
            }
        }
        winner
    }

    /// Best human-readable text for this node.
    ///
    /// The root call uses level 0.
    #[must_use]
    pub fn body(&self, level: usize) -> String {
        if level > MAX_BODY_DEPTH {
            return String::new();
        }
        match self.kind() {
            MimeKind::Text => {
                if self.disposition_is("attachment") {
                    String::new()
                } else {
                    self.payload_text().unwrap_or_default()
                }
            }
            MimeKind::MultipartAlternative => match self.alternative_winner(level) {
                Some(child) if child.kind() == MimeKind::Text => {
                    child.payload_text().unwrap_or_default()
                }
                Some(related) => related.body(level + 1),
                None => String::new(),
            },
            MimeKind::MultipartRelated | MimeKind::Multipart => self
                .children
                .iter()
                .map(|child| child.body(level + 1))
                .collect(),
            MimeKind::Message => {
                let mut out = String::new();
                for header in &self.headers {
                    let _ = writeln!(out, "{}: {}", header.name, header.value);
                }
                if let Some(text) = self.payload_text()
                    && !text.trim().is_empty()
                {
                    out.push_str(&text);
                }
                for child in &self.children {
                    let text = child.body(level + 1);
                    if !text.trim().is_empty() {
                        out.push_str(&text);
                    }
                }
                out
            }
            MimeKind::Application | MimeKind::Other => String::new(),
        }
    }

    /// Content type of the part [`Self::body`] draws its text from
    #[must_use]
    pub fn body_content_type(&self, level: usize) -> Option<String> {
        if level > MAX_BODY_DEPTH {
            return None;
        }
        match self.kind() {
            MimeKind::Text => {
                (!self.disposition_is("attachment")).then(|| self.content_type.clone())
            }
            MimeKind::MultipartAlternative => match self.alternative_winner(level) {
                Some(child) if child.kind() == MimeKind::Text => Some(child.content_type.clone()),
                Some(related) => related.body_content_type(level + 1),
                None => None,
            },
            MimeKind::MultipartRelated | MimeKind::Multipart => self
                .children
                .iter()
                .find_map(|child| child.body_content_type(level + 1)),
            MimeKind::Message | MimeKind::Application | MimeKind::Other => None,
        }
    }

    /// The node [`Self::body`] draws its text from
    #[must_use]
    pub fn body_node(&self, level: usize) -> Option<&Self> {
        if level > MAX_BODY_DEPTH {
            return None;
        }
        match self.kind() {
            MimeKind::Text => (!self.disposition_is("attachment")).then_some(self),
            MimeKind::MultipartAlternative => match self.alternative_winner(level) {
                Some(child) if child.kind() == MimeKind::Text => Some(child),
                Some(related) => related.body_node(level + 1),
                None => None,
            },
            MimeKind::MultipartRelated | MimeKind::Multipart => self
                .children
                .iter()
                .find_map(|child| child.body_node(level + 1)),
            MimeKind::Message | MimeKind::Application | MimeKind::Other => None,
        }
    }

    /// Indented dump of the tree for logs and debugging
    #[must_use]
    pub fn describe(&self, level: usize) -> String {
        let indent = ".".repeat(level);
        let mut out = format!(
            "{indent}{level} {} disposition={} description={} size={}",
            self.mime_type(),
            self.disposition.as_deref().unwrap_or("-"),
            self.description.as_deref().unwrap_or("-"),
            self.size,
        );
        if let Some(name) = &self.file_name {
            let _ = write!(out, " file={name}");
        }
        out.push('\n');
        for child in &self.children {
            out.push_str(&child.describe(level + 1));
        }
        out
    }
}
