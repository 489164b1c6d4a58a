//! Enhanced status code table and bounce categories

use crate::error::{BounceError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::io::BufRead;
use std::path::Path;
use std::str::FromStr;

/// Status table bundled with the crate (RFC 3463 codes)
const BUNDLED_TABLE: &str = include_str!("../resources/status_codes.txt");

/// Bounce category assigned to a message
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum BounceType {
    /// Permanent failure
    HardBounce,
    /// Transient failure
    SoftBounce,
    /// Recipient mailbox over quota
    MailboxFull,
    /// Received as a carbon copy of a message addressed to someone else
    CcUser,
    /// Read receipt
    MdnReceipt,
    /// Any other label carried by the status table
    Other(String),
}

impl BounceType {
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::HardBounce => "HARD_BOUNCE",
            Self::SoftBounce => "SOFT_BOUNCE",
            Self::MailboxFull => "MAILBOX_FULL",
            Self::CcUser => "CC_USER",
            Self::MdnReceipt => "MDN_RECEIPT",
            Self::Other(label) => label,
        }
    }

    /// Hard and soft bounces are the categories that need a recipient
    #[must_use]
    pub const fn is_delivery_failure(&self) -> bool {
        matches!(self, Self::HardBounce | Self::SoftBounce)
    }
}

impl FromStr for BounceType {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(match s.trim() {
            "HARD_BOUNCE" => Self::HardBounce,
            "SOFT_BOUNCE" => Self::SoftBounce,
            "MAILBOX_FULL" => Self::MailboxFull,
            "CC_USER" => Self::CcUser,
            "MDN_RECEIPT" => Self::MdnReceipt,
            other => Self::Other(other.to_string()),
        })
    }
}

impl From<String> for BounceType {
    fn from(s: String) -> Self {
        match s.parse() {
            Ok(kind) => kind,
            Err(never) => match never {},
        }
    }
}

impl From<BounceType> for String {
    fn from(kind: BounceType) -> Self {
        kind.as_str().to_string()
    }
}

impl fmt::Display for BounceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Immutable mapping from enhanced status code (`5.1.1`) to category.
#[derive(Debug, Clone, Default)]
pub struct StatusCodeTable {
    codes: HashMap<String, BounceType>,
}

impl StatusCodeTable {
    /// The table shipped with the crate
    pub fn bundled() -> Result<Self> {
        Self::parse(BUNDLED_TABLE)
    }

    /// Load a table from a `code=description` file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = std::fs::File::open(path).map_err(|source| BounceError::StatusTableIo {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_reader(std::io::BufReader::new(file)).map_err(|e| match e {
            BounceError::StatusTableIo { source, .. } => BounceError::StatusTableIo {
                path: path.to_path_buf(),
                source,
            },
            other => other,
        })
    }

    pub fn from_reader<R: BufRead>(reader: R) -> Result<Self> {
        let mut table = Self::default();
        for (idx, line) in reader.lines().enumerate() {
            let line = line.map_err(|source| BounceError::StatusTableIo {
                path: "<reader>".into(),
                source,
            })?;
            table.insert_line(idx + 1, &line)?;
        }
        Ok(table)
    }

    pub fn parse(text: &str) -> Result<Self> {
        let mut table = Self::default();
        for (idx, line) in text.lines().enumerate() {
            table.insert_line(idx + 1, line)?;
        }
        Ok(table)
    }

    fn insert_line(&mut self, line_no: usize, line: &str) -> Result<()> {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            return Ok(());
        }
        let (code, desc) = trimmed
            .split_once('=')
            .ok_or_else(|| BounceError::InvalidStatusEntry {
                line: line_no,
                content: trimmed.to_string(),
            })?;
        let (code, desc) = (code.trim(), desc.trim());
        if !code.is_empty() && !desc.is_empty() {
            self.codes.insert(code.to_string(), BounceType::from(desc.to_string()));
        }
        Ok(())
    }

    /// Category for a status code token, `None` when unmapped
    #[must_use]
    pub fn category(&self, code: &str) -> Option<&BounceType> {
        self.codes.get(code)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.codes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.codes.is_empty()
    }
}
