//! Provider-specific bounce body patterns.
//!
//! When a bounce carries no machine-readable report, the failed recipient
//! usually still appears in the prose of the bounce body. Each pattern
//! captures the address as its last group. Patterns are tried in
//! registration order and the first match wins.

use crate::address::email_regex;
use crate::error::{BounceError, Result};
use regex::{Regex, RegexBuilder};
use tracing::{debug, info};

/// Compiled size cap; some patterns carry wide counted repetitions
const PATTERN_SIZE_LIMIT: usize = 1 << 24;

struct NamedPattern {
    name: String,
    regex: Regex,
}

/// Ordered library of bounce body patterns.
pub struct KnownPatternMatcher {
    patterns: Vec<NamedPattern>,
}

impl std::fmt::Debug for KnownPatternMatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KnownPatternMatcher")
            .field("patterns", &self.names())
            .finish()
    }
}

fn builtin_patterns() -> Vec<(&'static str, String)> {
    let email = email_regex();
    vec![
        (
            "Gmail",
            format!(
                r"Delivery .{{4,10}} following recipient(?:s)? failed[\.|\s](?:permanently:)?\s+<?({email})>?\s+"
            ),
        ),
        (
            "AOL",
            format!(
                r"\-{{3,6}} The following address(?:es|\(es\))? had (?:permanent fatal errors|delivery problems) \-{{3,6}}\s+<?({email})>?(?:\s|;)"
            ),
        ),
        (
            "Yahoo",
            format!(
                r"This .{{1,10}} permanent error.\s+I(?:'ve| have) given up\. Sorry it did(?:n't| not) work out\.\s+<?({email})>?"
            ),
        ),
        (
            "Postfix",
            format!(
                r"message\s.*could\s+not\s+be\s+.{{0,10}}delivered\s+to\s.*(?:recipient(?:s)?|destination(?:s)?).{{80,180}}\sinclude\s+this\s+problem\s+report.{{60,120}}\s+<({email})>"
            ),
        ),
        (
            "Failed",
            format!(r"Failed\s+to\s+deliver\s+to\s+'({email})'.{{1,20}}\smodule.{{5,100}}\sreports"),
        ),
        (
            "SpamFirewall",
            format!(
                r"Your\s+message\s+to:\s+({email})\s+.{{1,10}}\sblocked\s+by\s.{{1,20}}\sSpam\s+Firewall"
            ),
        ),
        (
            "Failure",
            format!(
                r"message\s.{{8,20}}\scould\s+not\s+be\s+delivered\s.{{10,40}}\srecipients.{{6,20}}\spermanent\s+error.{{10,20}}\saddress(?:\(es\))?\s+failed:\s+({email})\s"
            ),
        ),
        (
            "Unable",
            format!(
                r"Unable to deliver message to the following address(?:\(es\))?.{{0,5}}\s+<({email})>"
            ),
        ),
        (
            "eTrust",
            format!(
                r"\scould not deliver the e(?:\-)?mail below because\s.{{10,20}}\srecipient(?:s)?\s.{{1,10}}\srejected.{{60,200}}\s({email})"
            ),
        ),
        (
            "Report",
            format!(
                r"\scollection of report(?:s)? about email delivery\s.+\sFAILED:\s.{{1,1000}}Final Recipient:.{{0,20}};\s*({email})"
            ),
        ),
        (
            "NotReach",
            format!(
                r"Your message.{{1,400}}did not reach the following recipient(?:\(s\))?:\s+({email})"
            ),
        ),
        (
            "Failed2",
            format!(
                r"Could not deliver message to the following recipient(?:\(s\))?:\s+Failed Recipient:\s+({email})\s"
            ),
        ),
        (
            "Exceeds",
            format!(r"User(?:'s)?\s+mailbox\s+exceeds\s+allowed\s+size:\s+({email})\s+"),
        ),
        (
            "Delayed",
            format!(
                r"Message\s+delivery\s+to\s+'({email})'\s+delayed.{{1,20}}\smodule.{{5,100}}\sreports"
            ),
        ),
        (
            "Invalid",
            format!(r"Invalid\s+Address(?:es)?.{{1,20}}\b(?:TO|addr)\b.{{1,20}}\s+<?({email})>?\s+"),
        ),
    ]
}

impl KnownPatternMatcher {
    /// The built-in provider library
    pub fn new() -> Result<Self> {
        let mut matcher = Self::empty();
        for (name, pattern) in builtin_patterns() {
            matcher.register(name, &pattern)?;
        }
        Ok(matcher)
    }

    /// A library with no patterns
    #[must_use]
    pub const fn empty() -> Self {
        Self {
            patterns: Vec::new(),
        }
    }

    /// Append a pattern. It is compiled case-insensitively with `.`
    /// matching newlines, and must capture the address in its last group.
    pub fn register(&mut self, name: &str, pattern: &str) -> Result<()> {
        let regex = RegexBuilder::new(pattern)
            .case_insensitive(true)
            .dot_matches_new_line(true)
            .size_limit(PATTERN_SIZE_LIMIT)
            .build()
            .map_err(|source| BounceError::InvalidPattern {
                name: name.to_string(),
                source,
            })?;
        self.patterns.push(NamedPattern {
            name: name.to_string(),
            regex,
        });
        Ok(())
    }

    /// Pattern names in match order
    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        self.patterns.iter().map(|p| p.name.as_str()).collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    /// Recipient address captured by the first matching pattern
    #[must_use]
    pub fn find(&self, body: &str) -> Option<String> {
        if body.trim().is_empty() {
            return None;
        }
        self.patterns.iter().find_map(|pattern| {
            let caps = pattern.regex.captures(body)?;
            let address = caps.get(caps.len() - 1)?.as_str().to_string();
            debug!(pattern = %pattern.name, groups = caps.len() - 1, "Bounce pattern matched");
            info!(pattern = %pattern.name, address = %address, "Recipient found in bounce body");
            Some(address)
        })
    }
}
