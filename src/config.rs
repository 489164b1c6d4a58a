//! Classifier configuration.
//!
//! Every field has a default matching the behavior of the bundled
//! classifier, so a partial JSON document only overrides what it names:
//!
//! ```rust
//! use mail_bounce::BounceConfig;
//!
//! let config = BounceConfig::from_json(r#"{ "max_scan_len": 4096 }"#).unwrap();
//! assert_eq!(config.max_scan_len, 4096);
//! assert_eq!(config.verp_header, "X-VERP_Bounce_Addr");
//! ```

use crate::error::Result;
use serde::{Deserialize, Serialize};

/// Header carrying the VERP-decoded original recipient
pub const VERP_BOUNCE_ADDR_XHEADER: &str = "X-VERP_Bounce_Addr";

/// Top-level configuration for [`crate::BounceClassifier`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BounceConfig {
    /// Header name checked by the VERP override stage
    pub verp_header: String,
    /// Bytes of text examined when scanning for an enhanced status code
    pub max_scan_len: usize,
    /// Lines after which RFC822 header parsing gives up on non-header text
    pub rfc822_header_scan_lines: usize,
    /// Message admission limits
    pub size_limits: SizeLimits,
}

impl Default for BounceConfig {
    fn default() -> Self {
        Self {
            verp_header: VERP_BOUNCE_ADDR_XHEADER.to_string(),
            max_scan_len: 8192 * 4,
            rfc822_header_scan_lines: 100,
            size_limits: SizeLimits::default(),
        }
    }
}

impl BounceConfig {
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

/// Size limits applied before a message is accepted for processing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SizeLimits {
    /// Maximum length of the reconstructed body
    pub max_body: usize,
    /// Maximum size of any single component
    pub max_component: usize,
    /// Maximum body plus components
    pub max_total: usize,
}

impl Default for SizeLimits {
    fn default() -> Self {
        Self {
            max_body: 150 * 1024,
            max_component: 1024 * 1024,
            max_total: 10 * 1024 * 1024,
        }
    }
}

/// Which limit a message broke
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SizeViolation {
    Body { size: usize },
    Component { index: usize, size: usize },
    Total { size: usize },
}
