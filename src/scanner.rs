//! Enhanced status code scanning

use crate::config::BounceConfig;
use crate::status::{BounceType, StatusCodeTable};
use regex::Regex;
use std::sync::LazyLock;
use tracing::debug;

// Whitespace-delimited x.y.z token, class 2, 4 or 5
static CODE_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s([245]\.[0-9]{1,3}\.[0-9]{1,3})\s").unwrap());

/// Snap a byte index down to the nearest UTF-8 char boundary.
const fn snap_to_char_boundary(s: &str, idx: usize) -> usize {
    if idx >= s.len() {
        return s.len();
    }
    let mut i = idx;
    while !s.is_char_boundary(i) && i > 0 {
        i -= 1;
    }
    i
}

/// Finds the first enhanced status code in free text and maps it through
/// a [`StatusCodeTable`].
#[derive(Debug, Clone)]
pub struct EnhancedCodeScanner {
    table: StatusCodeTable,
    max_scan_len: usize,
}

impl EnhancedCodeScanner {
    #[must_use]
    pub fn new(table: StatusCodeTable) -> Self {
        Self::with_config(table, &BounceConfig::default())
    }

    #[must_use]
    pub const fn with_config(table: StatusCodeTable, config: &BounceConfig) -> Self {
        Self {
            table,
            max_scan_len: config.max_scan_len,
        }
    }

    #[must_use]
    pub const fn table(&self) -> &StatusCodeTable {
        &self.table
    }

    /// First code token in the scanned prefix of `text`
    #[must_use]
    pub fn find_code<'t>(&self, text: &'t str) -> Option<&'t str> {
        let end = snap_to_char_boundary(text, self.max_scan_len);
        let caps = CODE_REGEX.captures(&text[..end])?;
        let token = caps.get(caps.len() - 1)?.as_str();
        debug!(token, "Enhanced status code found");
        Some(token)
    }

    /// Category of the first code token, `None` when there is no token or
    /// the table does not map it
    #[must_use]
    pub fn scan(&self, text: &str) -> Option<BounceType> {
        self.find_code(text)
            .and_then(|code| self.table.category(code))
            .cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scanner() -> EnhancedCodeScanner {
        EnhancedCodeScanner::new(StatusCodeTable::bundled().unwrap())
    }

    #[test]
    fn first_token_only() {
        let s = scanner();
        assert_eq!(s.find_code("Status: 4.2.2 then 5.1.1 here"), Some("4.2.2"));
        assert_eq!(
            s.scan("Status: 4.2.2 then 5.1.1 here"),
            Some(BounceType::MailboxFull)
        );
    }

    #[test]
    fn token_needs_surrounding_whitespace() {
        let s = scanner();
        assert_eq!(s.find_code("version 5.1.1."), None);
        assert_eq!(s.find_code("5.1.1 at start"), None);
        assert_eq!(s.find_code("ip 10.5.1.1 here"), None);
    }

    #[test]
    fn scan_window_is_char_safe() {
        let config = BounceConfig {
            max_scan_len: 4,
            ..BounceConfig::default()
        };
        let s = EnhancedCodeScanner::with_config(StatusCodeTable::bundled().unwrap(), &config);
        assert_eq!(s.find_code("ééé 5.1.1 "), None);
        assert_eq!(snap_to_char_boundary("ééé", 3), 2);
    }
}
