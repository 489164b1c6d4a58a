//! The message value populated by the materializer and the classifier

use crate::config::{SizeLimits, SizeViolation};
use crate::part::{DEFAULT_CONTENT_TYPE, Header, PartNode};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Pointer to a node of a message tree: child indices from the root plus
/// the depth the walker saw it at.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NodeRef {
    pub path: Vec<usize>,
    pub depth: usize,
}

impl NodeRef {
    #[must_use]
    pub const fn root() -> Self {
        Self {
            path: Vec::new(),
            depth: 0,
        }
    }

    /// Pointer to the `index`-th child of this node, one level deeper
    #[must_use]
    pub fn child(&self, index: usize) -> Self {
        let mut path = self.path.clone();
        path.push(index);
        Self {
            path,
            depth: self.depth + 1,
        }
    }

    /// Follow the path from `root`
    #[must_use]
    pub fn resolve<'a>(&self, root: &'a PartNode) -> Option<&'a PartNode> {
        self.path
            .iter()
            .try_fold(root, |node, &index| node.children.get(index))
    }
}

/// Addresses and envelope headers of a message.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Envelope {
    pub from: Vec<String>,
    /// Where the message was actually delivered
    pub to: Vec<String>,
    pub cc: Vec<String>,
    pub bcc: Vec<String>,
    pub reply_to: Vec<String>,
    pub forward: Vec<String>,
    /// Addresses from the `To` header
    pub to_envelope: Vec<String>,
    pub return_path: Option<String>,
    pub subject: Option<String>,
    pub sent_date: Option<DateTime<Utc>>,
    pub x_mailer: Vec<String>,
    pub priority: Vec<String>,
    pub smtp_message_id: Option<String>,
}

/// Fields recovered from delivery and disposition reports.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BounceDetails {
    pub original_recipient: Option<String>,
    pub final_recipient: Option<String>,
    pub action: Option<String>,
    pub status: Option<String>,
    pub diagnostic_code: Option<String>,
    pub rfc_message_id: Option<String>,
    pub original_subject: Option<String>,
    pub dsn_text: Option<String>,
    pub dsn_rfc822: Option<String>,
    pub dsn_delivery_status: Option<String>,
}

/// Message priority from `X-Priority`
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum Priority {
    Highest,
    High,
    Normal,
    Low,
    Lowest,
}

impl Priority {
    /// Accepts `1` to `5` (optionally followed by a comment such as
    /// `1 (Highest)`) and the words `HIGH`, `NORM` and `LOW`
    #[must_use]
    pub fn from_header(value: &str) -> Self {
        let token = value.split_whitespace().next().unwrap_or_default();
        match token.to_ascii_uppercase().as_str() {
            "1" => Self::Highest,
            "2" | "HIGH" => Self::High,
            "4" | "LOW" => Self::Low,
            "5" => Self::Lowest,
            _ => Self::Normal,
        }
    }
}

/// A materialized message: the part tree plus everything derived from it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub root: PartNode,
    pub envelope: Envelope,
    pub details: BounceDetails,
    pub attachment_count: usize,
    pub component_sizes: Vec<usize>,
    pub rfc822: Option<NodeRef>,
    pub report: Option<NodeRef>,
    pub attachments: Vec<NodeRef>,
    pub mailbox_host: Option<String>,
    pub mailbox_user: Option<String>,
    pub processed: bool,
}

impl Message {
    #[must_use]
    pub fn new(root: PartNode) -> Self {
        Self {
            root,
            ..Self::default()
        }
    }

    /// Top-level headers
    #[must_use]
    pub fn headers(&self) -> &[Header] {
        &self.root.headers
    }

    /// First top-level header named `name`, case-insensitively
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.root
            .headers
            .iter()
            .find(|h| h.name.eq_ignore_ascii_case(name))
            .map(|h| h.value.as_str())
    }

    #[must_use]
    pub fn body(&self) -> String {
        self.root.body(0)
    }

    #[must_use]
    pub fn body_content_type(&self) -> String {
        self.root
            .body_content_type(0)
            .unwrap_or_else(|| DEFAULT_CONTENT_TYPE.to_string())
    }

    #[must_use]
    pub fn body_node(&self) -> Option<&PartNode> {
        self.root.body_node(0)
    }

    #[must_use]
    pub fn node(&self, at: &NodeRef) -> Option<&PartNode> {
        at.resolve(&self.root)
    }

    /// Nodes of the located attachments, in walker order
    pub fn attachment_nodes(&self) -> impl Iterator<Item = &PartNode> {
        self.attachments.iter().filter_map(|at| self.node(at))
    }

    /// Priority from the first `X-Priority` value
    #[must_use]
    pub fn priority_level(&self) -> Option<Priority> {
        self.envelope
            .priority
            .first()
            .map(|value| Priority::from_header(value))
    }

    /// First limit the message exceeds, if any
    #[must_use]
    pub fn check_size(&self, limits: &SizeLimits) -> Option<SizeViolation> {
        let body = self.body().len();
        if body > limits.max_body {
            return Some(SizeViolation::Body { size: body });
        }
        if let Some((index, &size)) = self
            .component_sizes
            .iter()
            .enumerate()
            .find(|&(_, &size)| size > limits.max_component)
        {
            return Some(SizeViolation::Component { index, size });
        }
        let total = body + self.component_sizes.iter().sum::<usize>();
        if total > limits.max_total {
            return Some(SizeViolation::Total { size: total });
        }
        None
    }
}

fn join(addrs: &[String]) -> String {
    if addrs.is_empty() {
        "-".to_string()
    } else {
        addrs.join(",")
    }
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let env = &self.envelope;
        writeln!(f, "From: {}", join(&env.from))?;
        writeln!(f, "To: {}", join(&env.to))?;
        writeln!(f, "To (envelope): {}", join(&env.to_envelope))?;
        writeln!(f, "Cc: {}", join(&env.cc))?;
        writeln!(f, "Subject: {}", env.subject.as_deref().unwrap_or("-"))?;
        writeln!(
            f,
            "Message-Id: {}",
            env.smtp_message_id.as_deref().unwrap_or("-")
        )?;
        writeln!(f, "Attachments: {}", self.attachment_count)?;
        if let Some(rcpt) = &self.details.final_recipient {
            writeln!(f, "Final-Recipient: {rcpt}")?;
        }
        if let Some(rcpt) = &self.details.original_recipient {
            writeln!(f, "Original-Recipient: {rcpt}")?;
        }
        if let Some(status) = &self.details.status {
            writeln!(f, "Status: {status}")?;
        }
        write!(f, "{}", self.root.describe(0))
    }
}
