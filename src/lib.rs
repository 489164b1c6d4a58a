// Enforce at crate level
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![allow(clippy::missing_errors_doc, clippy::missing_panics_doc)]

//! Bounce-aware Mail Materializer
//!
//! Turns a parsed e-mail into a portable, serializable part tree and
//! decides whether it is an automated delivery-failure notification.
//!
//! # Features
//!
//! - Part trees that stay well-formed when parts fail to decode
//! - Body reconstruction with last-wins `multipart/alternative` selection
//! - DSN (RFC 3464) and MDN report inspection
//! - Enhanced status code (RFC 3463) classification
//! - VERP address encoding and decoding
//! - Failed recipient recovery from common provider bounce texts
//!
//! # Example
//!
//! ```rust
//! use mail_bounce::{BounceClassifier, BounceType, StatusCodeTable, parse_message};
//!
//! let raw = b"From: MAILER-DAEMON@example.com\r\n\
//!             To: sender@example.com\r\n\
//!             Subject: Undelivered Mail\r\n\
//!             Content-Type: multipart/report; report-type=delivery-status; boundary=\"b\"\r\n\
//!             \r\n\
//!             --b\r\n\
//!             Content-Type: text/plain\r\n\
//!             \r\n\
//!             Delivery failed.\r\n\
//!             --b\r\n\
//!             Content-Type: message/delivery-status\r\n\
//!             \r\n\
//!             Final-Recipient: rfc822; a@b.com\r\n\
//!             Action: failed\r\n\
//!             Status: 5.1.1\r\n\
//!             Diagnostic-Code: smtp; 550 user unknown\r\n\
//!             --b--\r\n";
//!
//! let mut message = parse_message(raw).unwrap();
//! let classifier = BounceClassifier::new(StatusCodeTable::bundled().unwrap()).unwrap();
//!
//! assert_eq!(classifier.classify(&mut message), Some(BounceType::HardBounce));
//! assert_eq!(message.details.final_recipient.as_deref(), Some("a@b.com"));
//! ```

pub mod address;
mod classifier;
mod config;
mod error;
mod materialize;
mod message;
mod parser;
mod part;
mod patterns;
mod scanner;
mod source;
mod status;
pub mod walker;

pub use classifier::{BounceClassifier, parse_dsn, parse_rfc822};
pub use config::{BounceConfig, SizeLimits, SizeViolation, VERP_BOUNCE_ADDR_XHEADER};
pub use error::{BounceError, Result};
pub use materialize::{materialize, materialize_part};
pub use message::{BounceDetails, Envelope, Message, NodeRef, Priority};
pub use parser::{extract_envelope, parse_message};
pub use part::{DEFAULT_CONTENT_TYPE, Header, MimeKind, PartNode, name_param};
pub use patterns::KnownPatternMatcher;
pub use scanner::EnhancedCodeScanner;
pub use source::{Content, DecodeError, MimeSource, SourceBody, SourcePart};
pub use status::{BounceType, StatusCodeTable};
