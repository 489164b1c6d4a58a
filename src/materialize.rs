//! Build a [`PartNode`] tree from a decoded source part.
//!
//! A decode failure anywhere in the source never removes data from the
//! tree. The failing node keeps a tagged diagnostic as its payload and
//! containers gain a synthetic `text/plain` child, so downstream walkers
//! always see well-formed leaves.

use crate::message::Message;
use crate::part::{DEFAULT_CONTENT_TYPE, PartNode, name_param};
use crate::source::{Content, DecodeError, SourcePart};
use tracing::error;

/// Diagnostic carried by the synthetic child of a bounds failure
const BOUNDS_CHILD_DIAGNOSTIC: &str = "002: bounds anomaly thrown while reading child parts.";

/// Attachment count and component sizes gathered below a node
#[derive(Debug, Default)]
struct Tally {
    attachments: usize,
    sizes: Vec<usize>,
}

impl Tally {
    fn merge(&mut self, other: Self) {
        self.attachments += other.attachments;
        self.sizes.extend(other.sizes);
    }
}

/// Materialize a whole message.
///
/// Envelope fields are left empty; see [`crate::parse_message`] for the
/// path that fills them from raw bytes.
#[must_use]
pub fn materialize(source: &dyn SourcePart) -> Message {
    let (root, tally) = build(source, 0);
    let mut message = Message::new(root);
    message.attachment_count = tally.attachments;
    message.component_sizes = tally.sizes;
    message
}

/// Materialize a single part and everything below it
#[must_use]
pub fn materialize_part(source: &dyn SourcePart) -> PartNode {
    build(source, 0).0
}

/// Drop `;`-delimited parameters from a disposition value
fn strip_params(value: &str) -> String {
    match value.find(';') {
        Some(pos) if pos > 0 => value[..pos].trim().to_string(),
        _ => value.trim().to_string(),
    }
}

fn build(part: &dyn SourcePart, level: usize) -> (PartNode, Tally) {
    let content_type = part.content_type().unwrap_or_else(|e| {
        error!(level, error = %e, "Failed to read content type, using default");
        DEFAULT_CONTENT_TYPE.to_string()
    });
    let description = part.description().or_else(|| {
        name_param(&content_type).map(|name| name.trim().trim_matches('"').to_string())
    });

    let mut node = PartNode {
        disposition: part.disposition().map(|d| strip_params(&d)),
        description,
        file_name: part.file_name(),
        size: part.size(),
        headers: part.headers(),
        ..PartNode::new(&content_type)
    };

    let mut tally = Tally::default();
    if node.is_attachment() {
        tally.attachments += 1;
    }

    if let Err(e) = fill(part, &mut node, level, &mut tally) {
        error!(
            level,
            code = e.code(),
            content_type = %node.content_type,
            error = %e,
            "Decode failure while materializing part"
        );
        contain(part, &mut node, &e, &mut tally);
    }
    (node, tally)
}

/// Copy content into `node`. Child slots that fail are skipped so their
/// siblings survive; the first such failure is returned once all slots
/// have been visited.
fn fill(
    part: &dyn SourcePart,
    node: &mut PartNode,
    level: usize,
    tally: &mut Tally,
) -> Result<(), DecodeError> {
    let is_text = node.mime_type().starts_with("text");
    match part.content()? {
        Content::Text(text) => {
            let bytes = text.into_bytes();
            tally
                .sizes
                .push(if is_text { node.size } else { bytes.len() });
            node.payload = Some(bytes);
        }
        Content::Bytes(bytes) => {
            tally
                .sizes
                .push(if is_text { node.size } else { bytes.len() });
            node.payload = Some(bytes);
        }
        Content::Parts(slots) => {
            if slots.is_empty() && node.mime_type().starts_with("multipart/") {
                return Err(DecodeError::Bounds("multipart without parts".into()));
            }
            let mut failure = None;
            for (index, slot) in slots.into_iter().enumerate() {
                match slot {
                    Ok(child) => {
                        let (child, child_tally) = build(child, level + 1);
                        node.children.push(child);
                        tally.merge(child_tally);
                    }
                    Err(e) => {
                        error!(level, index, error = %e, "Failed to read child part");
                        failure.get_or_insert(e);
                    }
                }
            }
            if let Some(e) = failure {
                return Err(e);
            }
        }
        Content::Message(inner) => {
            let (child, child_tally) = build(inner, level + 1);
            node.children.push(child);
            tally.merge(child_tally);
        }
        Content::Empty => {}
    }
    Ok(())
}

/// Apply the failure policy to a node whose content could not be read
fn contain(part: &dyn SourcePart, node: &mut PartNode, err: &DecodeError, tally: &mut Tally) {
    let diagnostic = err.diagnostic();
    let mime = node.mime_type();
    if mime.starts_with("multipart/") || mime.starts_with("message/rfc822") {
        let child_text = match err {
            DecodeError::Bounds(_) => BOUNDS_CHILD_DIAGNOSTIC.to_string(),
            _ => diagnostic.clone(),
        };
        let child = PartNode {
            disposition: node.disposition.clone(),
            description: node.description.clone(),
            ..PartNode::text(DEFAULT_CONTENT_TYPE, &child_text)
        };
        tally.sizes.push(child_text.len());
        node.payload = Some(diagnostic.into_bytes());
        node.children.push(child);
    } else {
        let payload = part
            .raw_stream()
            .unwrap_or_else(|_| diagnostic.into_bytes());
        tally.sizes.push(payload.len());
        node.payload = Some(payload);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn disposition_parameters_are_stripped() {
        assert_eq!(strip_params("attachment; filename=a.txt"), "attachment");
        assert_eq!(strip_params(" inline "), "inline");
    }
}
