//! Bounce classification pipeline.
//!
//! Stages run in a fixed order and the first one that yields a category
//! decides it. Later stages still run for the recipient and diagnostic
//! data they collect:
//!
//! 1. delivery-status, disposition-notification or text parts of a
//!    `multipart/report`
//! 2. the embedded original message
//! 3. the whole body, when an embedded message was present
//! 4. implicit carbon copy
//! 5. the VERP header
//! 6. provider body patterns, for recipient recovery only

use crate::address::same_address;
use crate::config::BounceConfig;
use crate::error::Result;
use crate::message::{BounceDetails, Message};
use crate::part::PartNode;
use crate::patterns::KnownPatternMatcher;
use crate::scanner::EnhancedCodeScanner;
use crate::status::{BounceType, StatusCodeTable};
use crate::walker;
use std::fmt::Write as _;
use tracing::{debug, error, info, warn};

fn is_blank(value: Option<&String>) -> bool {
    value.is_none_or(|v| v.trim().is_empty())
}

/// First `;`/space separated token holding an `@` past its first byte
fn recipient_token(line: &str) -> Option<String> {
    line.split([' ', ';'])
        .map(str::trim)
        .find(|token| token.find('@').is_some_and(|pos| pos > 0))
        .map(str::to_string)
}

/// Read DSN fields (RFC 3464) from delivery-status or
/// disposition-notification text. Lines that are not recognized are
/// skipped.
pub fn parse_dsn(text: &str, details: &mut BounceDetails) {
    for line in text.lines() {
        let line = line.trim();
        let lower = line.to_ascii_lowercase();
        if lower.starts_with("final-recipient:") {
            if let Some(rcpt) = recipient_token(line) {
                details.final_recipient = Some(rcpt);
            }
        } else if lower.starts_with("original-recipient:") {
            if let Some(rcpt) = recipient_token(line) {
                details.original_recipient = Some(rcpt);
            }
        } else if lower.starts_with("action:") {
            details.action = Some(line[7..].trim().to_string());
        } else if lower.starts_with("status:") {
            let status = line[7..].trim();
            let status = status.split(' ').next().unwrap_or(status);
            details.status = Some(status.to_string());
        } else if lower.starts_with("diagnostic-code:") {
            details.diagnostic_code = Some(line[16..].trim().to_string());
        }
    }
}

/// Read `To`, `Subject` and `Message-Id` of the original message.
///
/// Values already present in `details` are kept. Returns `true` once all
/// three headers have been seen. After `scan_lines` lines, the first line
/// without a colon ends the scan.
pub fn parse_rfc822(text: &str, details: &mut BounceDetails, scan_lines: usize) -> bool {
    let (mut got_to, mut got_subject, mut got_id) = (false, false, false);
    for (count, line) in text.lines().enumerate() {
        let line = line.trim();
        let lower = line.to_ascii_lowercase();
        if lower.starts_with("to:") {
            let token = line[3..].trim();
            match details.final_recipient.as_deref() {
                Some(existing) if !existing.trim().is_empty() => {
                    if !same_address(existing, token) {
                        error!(
                            rfc822_to = token,
                            final_recipient = existing,
                            "RFC822 To differs from DSN final recipient"
                        );
                    }
                }
                _ => details.final_recipient = Some(token.to_string()),
            }
            got_to = true;
        } else if lower.starts_with("subject:") {
            let token = line[8..].trim();
            if is_blank(details.original_subject.as_ref()) {
                details.original_subject = Some(token.to_string());
            }
            debug!(subject = token, "Original subject found");
            got_subject = true;
        } else if lower.starts_with("message-id:") {
            let token = line[11..].trim();
            if is_blank(details.rfc_message_id.as_ref()) {
                details.rfc_message_id = Some(token.to_string());
            }
            debug!(message_id = token, "Original message id found");
            got_id = true;
        }
        if got_to && got_subject && got_id {
            return true;
        }
        if count + 1 > scan_lines && !line.contains(':') {
            break;
        }
    }
    false
}

/// Decides whether a message is a bounce and recovers its recipient.
///
/// Built once and shared; classification only reads it.
#[derive(Debug)]
pub struct BounceClassifier {
    scanner: EnhancedCodeScanner,
    patterns: KnownPatternMatcher,
    config: BounceConfig,
}

impl BounceClassifier {
    pub fn new(table: StatusCodeTable) -> Result<Self> {
        Ok(Self {
            scanner: EnhancedCodeScanner::new(table),
            patterns: KnownPatternMatcher::new()?,
            config: BounceConfig::default(),
        })
    }

    #[must_use]
    pub fn with_config(self, config: BounceConfig) -> Self {
        let table = self.scanner.table().clone();
        Self {
            scanner: EnhancedCodeScanner::with_config(table, &config),
            patterns: self.patterns,
            config,
        }
    }

    #[must_use]
    pub fn with_patterns(self, patterns: KnownPatternMatcher) -> Self {
        Self { patterns, ..self }
    }

    #[must_use]
    pub const fn config(&self) -> &BounceConfig {
        &self.config
    }

    #[must_use]
    pub const fn scanner(&self) -> &EnhancedCodeScanner {
        &self.scanner
    }

    /// Classify `message`, filling its bounce details along the way.
    ///
    /// `None` means the message is not recognized as a bounce.
    pub fn classify(&self, message: &mut Message) -> Option<BounceType> {
        walker::retrieve_attachments(message);
        let Message {
            root,
            envelope,
            details,
            rfc822,
            report,
            ..
        } = message;
        let root: &PartNode = root;
        let mut kind = None;

        if let Some(report_at) = report.as_ref()
            && let Some(report_node) = report_at.resolve(root)
        {
            kind = self.inspect_report(report_node, details);
            if rfc822.is_none() {
                let embedded = walker::find_message_rfc822(report_node)
                    .or_else(|| walker::find_rfc822_headers(report_node));
                if let Some((index, _)) = embedded {
                    *rfc822 = Some(report_at.child(index));
                }
            }
        }

        if let Some(node) = rfc822.as_ref().and_then(|at| at.resolve(root)) {
            let found = self.inspect_rfc822(node, details);
            kind = kind.or(found);
        }

        let body = root.body(0);
        if rfc822.is_some() && kind.is_none() {
            kind = self.scanner.scan(&body);
        }

        if kind.is_none() {
            let cc_user = envelope.to.iter().any(|to| {
                !envelope.to_envelope.iter().any(|e| same_address(e, to))
                    && (envelope.cc.iter().any(|c| same_address(c, to))
                        || envelope.bcc.iter().any(|b| same_address(b, to)))
            });
            if cc_user {
                kind = Some(BounceType::CcUser);
            }
        }

        let verp_header = root
            .headers
            .iter()
            .find(|h| h.name.eq_ignore_ascii_case(&self.config.verp_header));
        if let Some(header) = verp_header {
            let value = header.value.trim();
            info!(recipient = value, "VERP recipient found");
            if let Some(existing) = details.original_recipient.as_deref()
                && !value.is_empty()
                && !existing.eq_ignore_ascii_case(value)
            {
                warn!(
                    original_recipient = existing,
                    verp_recipient = value,
                    "Replacing original recipient with VERP recipient"
                );
            }
            if value.is_empty() {
                warn!(header = %header.name, "VERP header found, but it has no value");
            } else {
                details.original_recipient = Some(value.to_string());
            }
            if kind.is_none() {
                let return_path = envelope.return_path.as_deref().unwrap_or_default().trim();
                if return_path.is_empty() || return_path == "<>" {
                    kind = Some(BounceType::SoftBounce);
                }
            }
        }

        if kind.as_ref().is_some_and(BounceType::is_delivery_failure)
            && is_blank(details.final_recipient.as_ref())
            && is_blank(details.original_recipient.as_ref())
            && let Some(rcpt) = self.patterns.find(&body)
        {
            info!(recipient = %rcpt, "Final recipient found in message body");
            details.final_recipient = Some(rcpt);
        }

        debug!(bounce_type = ?kind, "Classification finished");
        kind
    }

    /// Delivery status, then disposition notification, then plain report text
    fn inspect_report(&self, report: &PartNode, details: &mut BounceDetails) -> Option<BounceType> {
        if let Some((_, status)) = walker::find_delivery_status(report) {
            let text = status.payload_text()?;
            let kind = self.scanner.scan(&text);
            parse_dsn(&text, details);
            details.dsn_delivery_status = Some(text);
            return kind;
        }

        if let Some((_, mdn)) = walker::find_disposition_notification(report) {
            let text = mdn.payload_text()?;
            parse_dsn(&text, details);
            details.dsn_delivery_status = Some(text);
            return Some(BounceType::MdnReceipt);
        }

        let parts = walker::find_report_text(report);
        if parts.is_empty() {
            return None;
        }
        let text: String = parts.iter().filter_map(|p| p.payload_text()).collect();
        let kind = self.scanner.scan(&text);
        parse_dsn(&text, details);
        details.dsn_text = Some(text);
        kind
    }

    /// Headers and text of the embedded original message
    fn inspect_rfc822(&self, node: &PartNode, details: &mut BounceDetails) -> Option<BounceType> {
        let text_node = walker::rfc822_text(node);
        let scan_lines = self.config.rfc822_header_scan_lines;

        let mut combined = String::new();
        for header in &text_node.headers {
            let _ = writeln!(combined, "{}: {}", header.name, header.value);
        }
        let mut found_all = false;
        if !combined.trim().is_empty() {
            found_all = parse_rfc822(&combined, details, scan_lines);
            details.dsn_rfc822 = Some(combined.clone());
        }

        if let Some(text) = text_node.payload_text() {
            combined.push_str(&text);
            let mime = text_node.mime_type();
            if (mime.starts_with("text/") || mime.starts_with("message/")) && !found_all {
                parse_rfc822(&text, details, scan_lines);
                details.dsn_rfc822 = Some(combined.clone());
            }
            details.dsn_text = Some(match details.dsn_text.take() {
                Some(existing) => format!("{existing}\n\nRFC822 Text:\n{text}"),
                None => text,
            });
        }

        self.scanner.scan(&combined)
    }
}
