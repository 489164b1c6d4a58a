//! The parsed-part contract consumed by the tree materializer.
//!
//! Decoding raw MIME bytes is the job of a collaborator. Whatever does it
//! hands the materializer something implementing [`SourcePart`]; the crate
//! ships [`MimeSource`], an owned snapshot of a `mailparse` parse.

use crate::part::Header;
use mailparse::body::Body;
use mailparse::{MailHeaderMap, ParsedMail};
use std::fmt;

/// Embedded messages nested deeper than this are kept as raw bytes
const MAX_EMBED_DEPTH: usize = 16;

/// A decode failure at a single part.
///
/// Each kind carries the numeric tag written into the diagnostic payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    /// Child index or count out of bounds
    Bounds(String),
    /// The collaborator could not read the part
    Protocol(String),
    /// Unsupported or broken content encoding
    Encoding(String),
    /// Reading the part's stream failed
    Io(String),
    /// Anything else
    Unknown(String),
}

impl DecodeError {
    #[must_use]
    pub const fn code(&self) -> u16 {
        match self {
            Self::Bounds(_) => 1,
            Self::Protocol(_) => 3,
            Self::Encoding(_) => 4,
            Self::Io(_) => 5,
            Self::Unknown(_) => 6,
        }
    }

    #[must_use]
    pub fn detail(&self) -> &str {
        match self {
            Self::Bounds(d) | Self::Protocol(d) | Self::Encoding(d) | Self::Io(d) | Self::Unknown(d) => d,
        }
    }

    const fn label(&self) -> &'static str {
        match self {
            Self::Bounds(_) => "bounds anomaly",
            Self::Protocol(_) => "protocol read failure",
            Self::Encoding(_) => "encoding failure",
            Self::Io(_) => "I/O failure",
            Self::Unknown(_) => "unknown failure",
        }
    }

    /// Tagged diagnostic written in place of the part's content
    #[must_use]
    pub fn diagnostic(&self) -> String {
        format!("{:03}: {} caught during process.", self.code(), self.label())
    }
}

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}): {}", self.label(), self.code(), self.detail())
    }
}

impl std::error::Error for DecodeError {}

/// Decoded content of a part
pub enum Content<'a> {
    Text(String),
    Bytes(Vec<u8>),
    /// Children of a multipart; a slot may fail on its own
    Parts(Vec<Result<&'a dyn SourcePart, DecodeError>>),
    /// The single message embedded in a `message/rfc822` part
    Message(&'a dyn SourcePart),
    Empty,
}

/// A part as exposed by the MIME decoder
pub trait SourcePart {
    fn content_type(&self) -> Result<String, DecodeError>;
    fn disposition(&self) -> Option<String>;
    fn description(&self) -> Option<String>;
    fn file_name(&self) -> Option<String>;
    fn size(&self) -> usize;
    fn headers(&self) -> Vec<Header>;
    fn content(&self) -> Result<Content<'_>, DecodeError>;
    /// Undecoded bytes, used to salvage a part whose content failed
    fn raw_stream(&self) -> Result<Vec<u8>, DecodeError>;
}

/// Body of a [`MimeSource`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceBody {
    Text(String),
    Bytes(Vec<u8>),
    Parts(Vec<Result<MimeSource, DecodeError>>),
    Message(Box<MimeSource>),
    Empty,
}

/// Owned, already-decoded part tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MimeSource {
    pub content_type: Option<String>,
    pub disposition: Option<String>,
    pub description: Option<String>,
    pub file_name: Option<String>,
    /// Body length before transfer decoding
    pub size: usize,
    pub headers: Vec<Header>,
    pub body: Result<SourceBody, DecodeError>,
    pub raw: Option<Vec<u8>>,
}

impl Default for MimeSource {
    fn default() -> Self {
        Self {
            content_type: None,
            disposition: None,
            description: None,
            file_name: None,
            size: 0,
            headers: Vec::new(),
            body: Ok(SourceBody::Empty),
            raw: None,
        }
    }
}

impl MimeSource {
    /// A `text/*` leaf
    #[must_use]
    pub fn text(content_type: &str, text: &str) -> Self {
        Self {
            content_type: Some(content_type.to_string()),
            size: text.len(),
            body: Ok(SourceBody::Text(text.to_string())),
            ..Self::default()
        }
    }

    /// A binary leaf
    #[must_use]
    pub fn bytes(content_type: &str, data: &[u8]) -> Self {
        Self {
            content_type: Some(content_type.to_string()),
            size: data.len(),
            body: Ok(SourceBody::Bytes(data.to_vec())),
            ..Self::default()
        }
    }

    /// A multipart container
    #[must_use]
    pub fn multipart(content_type: &str, parts: Vec<Self>) -> Self {
        Self {
            content_type: Some(content_type.to_string()),
            body: Ok(SourceBody::Parts(parts.into_iter().map(Ok).collect())),
            ..Self::default()
        }
    }

    /// A `message/rfc822` wrapper around `inner`
    #[must_use]
    pub fn embedded(inner: Self) -> Self {
        Self {
            content_type: Some("message/rfc822".to_string()),
            body: Ok(SourceBody::Message(Box::new(inner))),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_disposition(mut self, disposition: &str) -> Self {
        self.disposition = Some(disposition.to_string());
        self
    }

    #[must_use]
    pub fn with_description(mut self, description: &str) -> Self {
        self.description = Some(description.to_string());
        self
    }

    #[must_use]
    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.headers.push(Header::new(name, value));
        self
    }

    /// Snapshot a `mailparse` parse, recursing into embedded messages
    #[must_use]
    pub fn from_parsed(mail: &ParsedMail<'_>) -> Self {
        Self::from_parsed_at(mail, 0)
    }

    fn from_parsed_at(mail: &ParsedMail<'_>, depth: usize) -> Self {
        let mimetype = mail.ctype.mimetype.to_lowercase();
        let content_type = mail
            .headers
            .get_first_value("Content-Type")
            .unwrap_or_else(|| mail.ctype.mimetype.clone());
        let file_name = mail
            .get_content_disposition()
            .params
            .get("filename")
            .or_else(|| mail.ctype.params.get("name"))
            .cloned();
        let raw = mail.get_body_raw().ok();

        let body = if !mail.subparts.is_empty() || mimetype.starts_with("multipart/") {
            Ok(SourceBody::Parts(
                mail.subparts
                    .iter()
                    .map(|p| Ok(Self::from_parsed_at(p, depth + 1)))
                    .collect(),
            ))
        } else if mimetype == "message/rfc822" && depth < MAX_EMBED_DEPTH {
            embedded_message(mail, depth)
        } else if mimetype.starts_with("text/") {
            mail.get_body()
                .map(SourceBody::Text)
                .map_err(|e| DecodeError::Encoding(e.to_string()))
        } else {
            mail.get_body_raw()
                .map(SourceBody::Bytes)
                .map_err(|e| DecodeError::Encoding(e.to_string()))
        };

        Self {
            content_type: Some(content_type),
            disposition: mail.headers.get_first_value("Content-Disposition"),
            description: mail.headers.get_first_value("Content-Description"),
            file_name,
            size: encoded_size(mail),
            headers: mail
                .headers
                .iter()
                .map(|h| Header::new(h.get_key(), h.get_value()))
                .collect(),
            body,
            raw,
        }
    }
}

/// Body length as written in the message, before any transfer decoding
fn encoded_size(mail: &ParsedMail<'_>) -> usize {
    match mail.get_body_encoded() {
        Body::Base64(body) | Body::QuotedPrintable(body) => body.get_raw().len(),
        Body::SevenBit(body) | Body::EightBit(body) => body.get_raw().len(),
        Body::Binary(body) => body.get_raw().len(),
    }
}

fn embedded_message(mail: &ParsedMail<'_>, depth: usize) -> Result<SourceBody, DecodeError> {
    let bytes = mail
        .get_body_raw()
        .map_err(|e| DecodeError::Encoding(e.to_string()))?;
    let inner = mailparse::parse_mail(&bytes).map_err(|e| DecodeError::Protocol(e.to_string()))?;
    Ok(SourceBody::Message(Box::new(MimeSource::from_parsed_at(
        &inner,
        depth + 1,
    ))))
}

impl SourcePart for MimeSource {
    fn content_type(&self) -> Result<String, DecodeError> {
        self.content_type
            .clone()
            .ok_or_else(|| DecodeError::Protocol("missing content type".into()))
    }

    fn disposition(&self) -> Option<String> {
        self.disposition.clone()
    }

    fn description(&self) -> Option<String> {
        self.description.clone()
    }

    fn file_name(&self) -> Option<String> {
        self.file_name.clone()
    }

    fn size(&self) -> usize {
        self.size
    }

    fn headers(&self) -> Vec<Header> {
        self.headers.clone()
    }

    fn content(&self) -> Result<Content<'_>, DecodeError> {
        match &self.body {
            Ok(SourceBody::Text(text)) => Ok(Content::Text(text.clone())),
            Ok(SourceBody::Bytes(bytes)) => Ok(Content::Bytes(bytes.clone())),
            Ok(SourceBody::Parts(parts)) => Ok(Content::Parts(
                parts
                    .iter()
                    .map(|slot| match slot {
                        Ok(part) => Ok(part as &dyn SourcePart),
                        Err(e) => Err(e.clone()),
                    })
                    .collect(),
            )),
            Ok(SourceBody::Message(inner)) => Ok(Content::Message(inner.as_ref())),
            Ok(SourceBody::Empty) => Ok(Content::Empty),
            Err(e) => Err(e.clone()),
        }
    }

    fn raw_stream(&self) -> Result<Vec<u8>, DecodeError> {
        self.raw
            .clone()
            .ok_or_else(|| DecodeError::Io("no raw stream available".into()))
    }
}
