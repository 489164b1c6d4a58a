use mail_bounce::{
    BounceConfig, BounceError, BounceType, EnhancedCodeScanner, SizeLimits, StatusCodeTable,
};
use std::io::Write;

#[test]
fn test_bundled_table() {
    let table = StatusCodeTable::bundled().unwrap();
    assert!(!table.is_empty());
    assert_eq!(table.category("5.1.1"), Some(&BounceType::HardBounce));
    assert_eq!(table.category("5.2.2"), Some(&BounceType::MailboxFull));
    assert_eq!(table.category("9.9.9"), None);
}

#[test]
fn test_load_from_file() {
    let path = std::env::temp_dir().join(format!("mail-bounce-status-{}.txt", std::process::id()));
    let mut file = std::fs::File::create(&path).unwrap();
    writeln!(file, "# custom table").unwrap();
    writeln!(file, "5.7.1=BLOCKED").unwrap();
    writeln!(file, "4.4.7 = SOFT_BOUNCE").unwrap();
    writeln!(file, "5.0.0=").unwrap();
    drop(file);

    let table = StatusCodeTable::load(&path).unwrap();
    std::fs::remove_file(&path).unwrap();

    assert_eq!(table.len(), 2);
    assert_eq!(
        table.category("5.7.1"),
        Some(&BounceType::Other("BLOCKED".into()))
    );
    assert_eq!(table.category("4.4.7"), Some(&BounceType::SoftBounce));
}

#[test]
fn test_missing_table_is_an_error() {
    let err = StatusCodeTable::load("/nonexistent/mail-bounce/status.txt").unwrap_err();
    assert!(matches!(err, BounceError::StatusTableIo { .. }));
    assert!(err.to_string().contains("/nonexistent/mail-bounce/status.txt"));
}

#[test]
fn test_line_without_separator_is_rejected() {
    let err = StatusCodeTable::parse("5.1.1=HARD_BOUNCE\nnot a pair\n").unwrap_err();
    match err {
        BounceError::InvalidStatusEntry { line, content } => {
            assert_eq!(line, 2);
            assert_eq!(content, "not a pair");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn test_bounce_type_labels() {
    assert_eq!(BounceType::CcUser.to_string(), "CC_USER");
    assert_eq!(BounceType::from("MDN_RECEIPT".to_string()), BounceType::MdnReceipt);
    assert!(BounceType::SoftBounce.is_delivery_failure());
    assert!(!BounceType::MailboxFull.is_delivery_failure());

    let json = serde_json::to_string(&BounceType::HardBounce).unwrap();
    assert_eq!(json, "\"HARD_BOUNCE\"");
    let other: BounceType = serde_json::from_str("\"GENERIC\"").unwrap();
    assert_eq!(other, BounceType::Other("GENERIC".into()));
}

#[test]
fn test_scanner_maps_first_code() {
    let scanner = EnhancedCodeScanner::new(StatusCodeTable::bundled().unwrap());
    let text = "Remote server said: 550 5.1.1 <a@b.com>: Recipient address rejected";
    assert_eq!(scanner.find_code(text), Some("5.1.1"));
    assert_eq!(scanner.scan(text), Some(BounceType::HardBounce));
    assert_eq!(scanner.scan("all good, 2.0.0 accepted"), None);
    assert_eq!(scanner.scan("no codes at all"), None);
}

#[test]
fn test_scanner_respects_window() {
    let config = BounceConfig {
        max_scan_len: 16,
        ..BounceConfig::default()
    };
    let scanner = EnhancedCodeScanner::with_config(StatusCodeTable::bundled().unwrap(), &config);
    let text = format!("{} 5.1.1 ", "x".repeat(32));
    assert_eq!(scanner.scan(&text), None);
}

#[test]
fn test_config_from_json() {
    let config =
        BounceConfig::from_json(r#"{ "verp_header": "X-Bounce", "size_limits": { "max_body": 10 } }"#)
            .unwrap();
    assert_eq!(config.verp_header, "X-Bounce");
    assert_eq!(config.max_scan_len, 32768);
    assert_eq!(config.size_limits.max_body, 10);
    assert_eq!(
        config.size_limits.max_component,
        SizeLimits::default().max_component
    );

    assert!(matches!(
        BounceConfig::from_json("{ not json"),
        Err(BounceError::Config(_))
    ));
}
