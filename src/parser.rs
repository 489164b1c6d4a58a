//! Raw message parsing and envelope extraction

use crate::address::{is_verp_address, parse_address_list, verp_destination};
use crate::error::{BounceError, Result};
use crate::materialize::materialize;
use crate::message::{Envelope, Message};
use crate::source::MimeSource;
use chrono::{DateTime, Utc};
use mailparse::{MailHeader, MailHeaderMap};
use tracing::{debug, warn};

/// Parse raw message bytes into a materialized [`Message`] with its
/// envelope filled in
pub fn parse_message(raw: &[u8]) -> Result<Message> {
    let parsed = mailparse::parse_mail(raw).map_err(|e| BounceError::Structure(e.to_string()))?;

    let source = MimeSource::from_parsed(&parsed);
    let mut message = materialize(&source);
    message.envelope = extract_envelope(&parsed.headers);

    debug!(
        subject = message.envelope.subject.as_deref().unwrap_or_default(),
        parts = message.root.children.len(),
        attachments = message.attachment_count,
        "Parsed message"
    );
    Ok(message)
}

/// Envelope fields from top-level headers
#[must_use]
pub fn extract_envelope(headers: &[MailHeader]) -> Envelope {
    let to_envelope = extract_addresses(headers, "To");
    let to = extract_recipients(headers, &to_envelope);

    Envelope {
        from: extract_from(headers),
        to,
        cc: extract_addresses(headers, "Cc"),
        bcc: extract_addresses(headers, "Bcc"),
        reply_to: extract_addresses(headers, "Reply-To"),
        forward: Vec::new(),
        to_envelope,
        return_path: headers.get_all_values("Return-Path").pop(),
        subject: headers.get_first_value("Subject"),
        sent_date: Some(extract_date(headers)),
        x_mailer: headers.get_all_values("X-Mailer"),
        priority: headers.get_all_values("X-Priority"),
        smtp_message_id: headers.get_all_values("Message-ID").pop(),
    }
}

fn extract_addresses(headers: &[MailHeader], name: &str) -> Vec<String> {
    headers
        .get_all_values(name)
        .iter()
        .flat_map(|value| parse_address_list(value))
        .collect()
}

fn extract_from(headers: &[MailHeader]) -> Vec<String> {
    let from = extract_addresses(headers, "From");
    if !from.is_empty() {
        return from;
    }
    let return_path = extract_addresses(headers, "Return-Path");
    if !return_path.is_empty() {
        warn!("From is missing, using Return-Path");
    }
    return_path
}

fn extract_date(headers: &[MailHeader]) -> DateTime<Utc> {
    headers
        .get_first_value("Date")
        .and_then(|value| DateTime::parse_from_rfc2822(value.trim()).ok())
        .map_or_else(Utc::now, |dt| dt.with_timezone(&Utc))
}

/// Where the message was actually delivered.
///
/// The `for` clause of the oldest `Received` header wins unless it is a
/// VERP address, then `Delivered-To`, then the VERP-decoded `for` address,
/// then the `To` header.
fn extract_recipients(headers: &[MailHeader], to_envelope: &[String]) -> Vec<String> {
    let received_to = headers
        .get_all_values("Received")
        .iter()
        .rev()
        .find_map(|value| analyze_received(value))
        .and_then(|addr| parse_address_list(&addr).into_iter().next());

    if let Some(dest) = &received_to
        && !dest.trim().is_empty()
        && !is_verp_address(dest)
    {
        return vec![dest.clone()];
    }

    let delivered_to = extract_addresses(headers, "Delivered-To");
    if !delivered_to.is_empty() {
        return delivered_to;
    }

    if let Some(dest) = &received_to
        && is_verp_address(dest)
    {
        let decoded = parse_address_list(&verp_destination(dest));
        if !decoded.is_empty() {
            return decoded;
        }
    }

    to_envelope.to_vec()
}

/// Byte offset of `needle` at or after `from`, `-1` when absent
fn index_of(haystack: &str, needle: &str, from: isize) -> isize {
    let start = usize::try_from(from).unwrap_or(0);
    haystack
        .get(start..)
        .and_then(|rest| rest.find(needle))
        .and_then(|pos| isize::try_from(start + pos).ok())
        .unwrap_or(-1)
}

fn tail_after(text: &str, pos: isize) -> Option<String> {
    let start = usize::try_from(pos).ok()?;
    text.get(start..).map(|s| s.trim().to_string())
}

/// The `for` address of a `Received` header, if it names one.
///
/// The clause must follow the `from`/`by` pair and any `via`, `with` or
/// `id` clauses that come after them.
fn analyze_received(received: &str) -> Option<String> {
    let semicolon = received.find(';').filter(|&pos| pos > 0)?;
    let text: String = received[..semicolon]
        .chars()
        .map(|c| if matches!(c, '\n' | '\r' | '\t') { ' ' } else { c })
        .collect();

    let from_pos = index_of(&text, "from ", 0);
    let by_pos = index_of(&text, " by ", from_pos + 1);
    let low_pos = from_pos.min(by_pos);
    let high_pos = from_pos.max(by_pos);
    let mut max_pos = high_pos;

    let via_pos = index_of(&text, " via ", max_pos + 1);
    max_pos = max_pos.max(via_pos);
    let with_pos = index_of(&text, " with ", max_pos + 1);
    max_pos = max_pos.max(with_pos);
    let id_pos = index_of(&text, " id ", max_pos + 1);
    max_pos = max_pos.max(id_pos);

    let for_pos = index_of(&text, " for ", max_pos + 1);
    if (low_pos >= 0 && for_pos > high_pos)
        || (by_pos >= 0 && with_pos > by_pos && for_pos > with_pos)
    {
        return tail_after(&text, for_pos + 4);
    }
    if low_pos >= 0 && max_pos > high_pos {
        let last_for = text
            .rfind(" for ")
            .and_then(|pos| isize::try_from(pos).ok())
            .unwrap_or(-1);
        if last_for > high_pos {
            return tail_after(&text, last_for + 4);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn received_for_clause() {
        let value = "from mx.example.com by mail.test.com with ESMTP id 123 for <jsmith@test.com>; Tue, 1 Jan 2024 00:00:00 +0000";
        assert_eq!(
            analyze_received(value).as_deref(),
            Some("<jsmith@test.com>")
        );
    }

    #[test]
    fn received_without_for_or_semicolon() {
        assert_eq!(analyze_received("from a by b with SMTP; date"), None);
        assert_eq!(analyze_received("from a by b for <x@y.com>"), None);
    }

    #[test]
    fn index_of_clamps_start() {
        assert_eq!(index_of("abc", "c", -1), 2);
        assert_eq!(index_of("abc", "c", 10), -1);
        assert_eq!(index_of("abc", "z", 0), -1);
    }
}
