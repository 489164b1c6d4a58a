//! Address normalization, comparison and VERP helpers

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::sync::LazyLock;

/// Prefix of the token embedded in VERP bounce addresses
pub const VERP_TOKEN_BEGIN: &str = "10.";
/// Suffix of the token embedded in VERP bounce addresses
pub const VERP_TOKEN_END: &str = ".0";

const LOCAL_PART: &str = r"[a-z0-9!#$%&'*+/=?^_`{|}~-]+(?:\.[a-z0-9!#$%&'*+/=?^_`{|}~-]+)*";
const REMOTE_PART: &str = r"@(?:[a-z0-9](?:[a-z0-9-]*[a-z0-9])?\.)+[a-z0-9](?:[a-z0-9-]*[a-z0-9])+";
const INTRA_PART: &str = r"@[a-z0-9](?:[a-z0-9-]*[a-z0-9])+";

static REMOTE_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!("(?i)^{LOCAL_PART}{REMOTE_PART}$")).expect("valid remote address regex")
});

static INTRA_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!("(?i)^{LOCAL_PART}{INTRA_PART}$")).expect("valid intranet address regex")
});

// bounce-10.07410251.0-jsmith=test.com@localhost
static BOUNCE_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*\W?((\w+)-(10\.\d+\.0)-(.+=.+)@(.+\w))\W?\s*$").expect("valid VERP regex")
});

// remove-testlist-jsmith=test.com@localhost
static REMOVE_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*\W?((\w+)-(\w+)-(.+=.+)@(.+\w))\W?\s*$").expect("valid VERP regex")
});

/// Regex source for a remote address, without anchors or flags.
///
/// Callers embedding it must compile case-insensitively.
#[must_use]
pub fn email_regex() -> String {
    format!("{LOCAL_PART}{REMOTE_PART}")
}

#[must_use]
pub fn is_remote_email_address(s: &str) -> bool {
    REMOTE_REGEX.is_match(s)
}

/// Remote address, or an intranet one whose host has no dots (`john@localhost`)
#[must_use]
pub fn is_remote_or_intranet_email_address(s: &str) -> bool {
    is_remote_email_address(s) || INTRA_REGEX.is_match(s)
}

/// Locate the `<...>` span around the last `@`, as byte offsets
fn angle_span(addr: &str) -> Option<(usize, usize)> {
    let at = addr.rfind('@').filter(|&p| p > 0)?;
    let open = addr[..at].rfind('<')?;
    let close = addr[at + 1..].find('>')? + at + 1;
    Some((open, close))
}

/// Strip the display name and angle brackets, lower-casing the result.
///
/// `"Joe" <Joe@Example.com>` becomes `joe@example.com`.
#[must_use]
pub fn remove_display_name(addr: &str) -> String {
    if addr.trim().is_empty() {
        return addr.to_string();
    }
    angle_span(addr)
        .map_or(addr, |(open, close)| &addr[open + 1..close])
        .to_lowercase()
}

#[must_use]
pub fn display_name(addr: &str) -> Option<String> {
    if addr.trim().is_empty() {
        return None;
    }
    angle_span(addr).map(|(open, _)| addr[..open].trim().to_string())
}

#[must_use]
pub fn has_display_name(addr: &str) -> bool {
    display_name(addr).is_some_and(|name| !name.is_empty())
}

/// Domain of an address, `None` for local addresses
#[must_use]
pub fn domain_name(addr: &str) -> Option<String> {
    let at = addr.rfind('@').filter(|&p| p > 0)?;
    let domain = addr[at + 1..].trim();
    let domain = domain.strip_suffix('>').unwrap_or(domain);
    if domain.is_empty() {
        None
    } else {
        Some(domain.to_string())
    }
}

/// Compare two addresses ignoring display names, brackets and case
#[must_use]
pub fn compare_addresses(a: &str, b: &str) -> Ordering {
    remove_display_name(a).cmp(&remove_display_name(b))
}

#[must_use]
pub fn same_address(a: &str, b: &str) -> bool {
    compare_addresses(a, b) == Ordering::Equal
}

/// Does `addrs` hold an address equal to `addr`
#[must_use]
pub fn contains_address(addrs: &[String], addr: &str) -> bool {
    addrs.iter().any(|a| same_address(a, addr))
}

#[must_use]
pub fn is_verp_address(addr: &str) -> bool {
    if addr.trim().is_empty() {
        return false;
    }
    BOUNCE_REGEX.is_match(addr) || REMOVE_REGEX.is_match(addr)
}

fn verp_captures(addr: &str) -> Option<regex::Captures<'_>> {
    BOUNCE_REGEX
        .captures(addr)
        .or_else(|| REMOVE_REGEX.captures(addr))
}

/// Recover the intended recipient from a VERP address.
///
/// `bounce-10.00001.0-jsmith=test.com@localhost` gives `jsmith@test.com`.
/// Anything that is not a VERP address is returned unchanged.
#[must_use]
pub fn verp_destination(addr: &str) -> String {
    verp_captures(addr)
        .and_then(|caps| caps.get(4))
        .map_or_else(|| addr.to_string(), |m| m.as_str().replace('=', "@"))
}

/// The return mailbox a VERP address routes to (`bounce@localhost`).
#[must_use]
pub fn verp_return_address(addr: &str) -> String {
    verp_captures(addr)
        .and_then(|caps| Some(format!("{}@{}", caps.get(2)?.as_str(), caps.get(5)?.as_str())))
        .unwrap_or_else(|| addr.to_string())
}

/// Build a VERP bounce address for `recipient`.
///
/// `encode_verp("bounce", 1, "jsmith@test.com", "localhost")` gives
/// `bounce-10.00001.0-jsmith=test.com@localhost`. A recipient without a
/// domain is returned unchanged.
#[must_use]
pub fn encode_verp(prefix: &str, token: u64, recipient: &str, host: &str) -> String {
    let bare = remove_display_name(recipient);
    match bare.rsplit_once('@') {
        Some((local, domain)) if !local.is_empty() && !domain.is_empty() => {
            format!("{prefix}-{VERP_TOKEN_BEGIN}{token:05}{VERP_TOKEN_END}-{local}={domain}@{host}")
        }
        _ => recipient.to_string(),
    }
}

/// Bare addresses from an address header value, in order.
#[must_use]
pub fn parse_address_list(value: &str) -> Vec<String> {
    if value.trim().is_empty() {
        return Vec::new();
    }
    match mailparse::addrparse(value) {
        Ok(list) => list
            .iter()
            .flat_map(|addr| match addr {
                mailparse::MailAddr::Single(info) => vec![info.addr.clone()],
                mailparse::MailAddr::Group(group) => {
                    group.addrs.iter().map(|info| info.addr.clone()).collect()
                }
            })
            .collect(),
        Err(_) => value
            .split(',')
            .filter_map(|addr| EmailAddress::parse(addr.trim()))
            .map(|addr| addr.address)
            .collect(),
    }
}

/// Email address with optional display name
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct EmailAddress {
    /// Display name (e.g., "John Doe")
    pub name: Option<String>,

    /// Email address (e.g., "john@example.com")
    pub address: String,

    /// Local part (before @)
    pub local_part: String,

    /// Domain extracted from address
    pub domain: String,
}

impl EmailAddress {
    /// Parse an email address from a string
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        let s = s.trim();

        // Try to match "Name <email@domain.com>" format
        if let Some(start) = s.find('<')
            && let Some(end) = s.find('>')
            && start < end
        {
            let name_part = s[..start].trim().trim_matches('"');
            let address = s[start + 1..end].trim().to_string();

            if let Some((local, domain)) = address.split_once('@') {
                return Some(Self {
                    name: if name_part.is_empty() {
                        None
                    } else {
                        Some(name_part.to_string())
                    },
                    local_part: local.to_string(),
                    domain: domain.to_string(),
                    address,
                });
            }
        }

        // Plain email address
        if let Some((local, domain)) = s.split_once('@') {
            return Some(Self {
                name: None,
                local_part: local.to_string(),
                domain: domain.to_string(),
                address: s.to_string(),
            });
        }

        None
    }
}

impl fmt::Display for EmailAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.name {
            Some(name) => write!(f, "{} <{}>", name, self.address),
            None => write!(f, "{}", self.address),
        }
    }
}
