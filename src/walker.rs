//! Locate attachments, reports and embedded messages in a part tree.
//!
//! [`retrieve_attachments`] must run before anything reads the cached
//! `rfc822`/`report` pointers of a [`Message`]; the classifier does this
//! itself. The `find_*` helpers only look at the direct children of a node.

use crate::message::{Message, NodeRef};
use crate::part::{MimeKind, PartNode};
use tracing::{debug, info};

/// Result of a walk below one node
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Located {
    /// Attachments in pre-order
    pub attachments: Vec<NodeRef>,
    /// First `message/rfc822` part
    pub rfc822: Option<NodeRef>,
    /// First `multipart/report` part, possibly the root itself
    pub report: Option<NodeRef>,
}

/// Walk the tree below `root` without touching any message
#[must_use]
pub fn locate(root: &PartNode) -> Located {
    walk(root, &NodeRef::root())
}

fn walk(node: &PartNode, at: &NodeRef) -> Located {
    let mut out = Located::default();
    for (index, child) in node.children.iter().enumerate() {
        let child_at = at.child(index);
        if child.is_attachment() {
            out.attachments.push(child_at.clone());
        }

        let below = walk(child, &child_at);
        out.attachments.extend(below.attachments);
        out.rfc822 = out.rfc822.or(below.rfc822);
        out.report = out.report.or(below.report);

        let mime = child.mime_type();
        if mime.starts_with("message/rfc822") && out.rfc822.is_none() {
            out.rfc822 = Some(child_at.clone());
        }
        if mime.starts_with("multipart/report") && out.report.is_none() {
            out.report = Some(child_at);
        }
    }
    // a one-level report message is itself the report
    if node.mime_type().starts_with("multipart/report") && out.report.is_none() {
        out.report = Some(at.clone());
    }
    out
}

/// Reset and repopulate the message's attachment list and its cached
/// rfc822/report pointers.
pub fn retrieve_attachments(message: &mut Message) -> &[NodeRef] {
    let located = locate(&message.root);
    debug!(
        attachments = located.attachments.len(),
        rfc822 = located.rfc822.is_some(),
        report = located.report.is_some(),
        "Walked message tree"
    );
    message.attachments = located.attachments;
    message.rfc822 = located.rfc822;
    message.report = located.report;
    &message.attachments
}

fn find_child<'a>(node: &'a PartNode, prefix: &str) -> Option<(usize, &'a PartNode)> {
    node.children
        .iter()
        .enumerate()
        .find(|(_, child)| child.mime_type().starts_with(prefix))
}

/// The `message/delivery-status` child of a report
#[must_use]
pub fn find_delivery_status(node: &PartNode) -> Option<(usize, &PartNode)> {
    let found = find_child(node, "message/delivery-status");
    if found.is_none() {
        info!("No message/delivery-status part under report");
    }
    found
}

/// The `message/disposition-notification` child of a report
#[must_use]
pub fn find_disposition_notification(node: &PartNode) -> Option<(usize, &PartNode)> {
    find_child(node, "message/disposition-notification")
}

#[must_use]
pub fn find_message_rfc822(node: &PartNode) -> Option<(usize, &PartNode)> {
    find_child(node, "message/rfc822")
}

#[must_use]
pub fn find_rfc822_headers(node: &PartNode) -> Option<(usize, &PartNode)> {
    find_child(node, "text/rfc822-headers")
}

/// Textual children of a report other than `text/rfc822-headers`
#[must_use]
pub fn find_report_text(node: &PartNode) -> Vec<&PartNode> {
    node.children
        .iter()
        .filter(|child| {
            let mime = child.mime_type();
            mime.starts_with("text") && !mime.starts_with("text/rfc822-headers")
        })
        .collect()
}

/// The textual part inside an embedded message.
///
/// Follows first children down to the first textual one. A node without
/// children is returned as is, whether or not it is `text/rfc822-headers`.
#[must_use]
pub fn rfc822_text(node: &PartNode) -> &PartNode {
    match node.children.first() {
        Some(first) if first.kind() == MimeKind::Text => first,
        Some(first) => rfc822_text(first),
        None => {
            if !node.mime_type().starts_with("text/rfc822-headers") {
                info!(
                    mime_type = %node.mime_type(),
                    "Embedded message has no text part or rfc822 headers, using it anyway"
                );
            }
            node
        }
    }
}

/// The alternative renditions of the message body.
///
/// Children of a top-level `multipart/alternative`, or of the last such
/// part directly under a `multipart/mixed` root; otherwise the root alone.
#[must_use]
pub fn alternatives(message: &Message) -> Vec<&PartNode> {
    let root = &message.root;
    let mime = root.mime_type();
    let found: Vec<&PartNode> = if mime.starts_with("multipart/alternative") {
        root.children.iter().collect()
    } else if mime.starts_with("multipart/mixed") {
        root.children
            .iter()
            .rev()
            .find(|child| child.mime_type().starts_with("multipart/alternative"))
            .map(|alt| alt.children.iter().collect())
            .unwrap_or_default()
    } else {
        Vec::new()
    };
    if found.is_empty() { vec![root] } else { found }
}
