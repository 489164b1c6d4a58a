use mail_bounce::address::*;
use std::cmp::Ordering;

#[test]
fn test_verp_destination() {
    assert_eq!(
        verp_destination("bounce-10.00001.0-jsmith=test.com@localhost"),
        "jsmith@test.com"
    );
    assert_eq!(
        verp_destination("remove-testlist-jsmith=test.com@localhost"),
        "jsmith@test.com"
    );
}

#[test]
fn test_verp_return_address() {
    assert_eq!(
        verp_return_address("bounce-10.00001.0-jsmith=test.com@localhost"),
        "bounce@localhost"
    );
}

#[test]
fn test_non_verp_unchanged() {
    assert!(!is_verp_address("jsmith@test.com"));
    assert!(!is_verp_address("   "));
    assert_eq!(verp_destination("jsmith@test.com"), "jsmith@test.com");
    assert_eq!(verp_return_address("jsmith@test.com"), "jsmith@test.com");
    assert_eq!(encode_verp("bounce", 1, "jsmith", "localhost"), "jsmith");
}

#[test]
fn test_encode_verp() {
    let verp = encode_verp("bounce", 1, "Joe <jsmith@test.com>", "localhost");
    assert_eq!(verp, "bounce-10.00001.0-jsmith=test.com@localhost");
    assert!(is_verp_address(&verp));
    assert_eq!(verp_destination(&verp), "jsmith@test.com");
}

#[test]
fn test_remove_display_name() {
    assert_eq!(
        remove_display_name("\"Joe\" <Joe@Example.com>"),
        "joe@example.com"
    );
    assert_eq!(remove_display_name("Plain@Example.com"), "plain@example.com");
    assert_eq!(remove_display_name(""), "");
}

#[test]
fn test_display_name() {
    assert_eq!(
        display_name("Joe Smith <j@x.com>").as_deref(),
        Some("Joe Smith")
    );
    assert!(has_display_name("Joe Smith <j@x.com>"));
    assert!(!has_display_name("<j@x.com>"));
    assert!(!has_display_name("j@x.com"));
}

#[test]
fn test_address_comparison() {
    assert!(same_address("Joe <JOE@x.com>", "joe@x.com"));
    assert_eq!(compare_addresses("a@x.com", "b@x.com"), Ordering::Less);
    let list = vec!["Cc User <x@y.com>".to_string()];
    assert!(contains_address(&list, "X@Y.COM"));
    assert!(!contains_address(&list, "z@y.com"));
}

#[test]
fn test_domain_name() {
    assert_eq!(domain_name("jsmith@test.com").as_deref(), Some("test.com"));
    assert_eq!(domain_name("@test.com"), None);
}

#[test]
fn test_remote_addresses() {
    assert!(is_remote_email_address("a.b@mail.example.com"));
    assert!(!is_remote_email_address("a@localhost"));
    assert!(is_remote_or_intranet_email_address("a@localhost"));
    assert!(!is_remote_or_intranet_email_address("not an address"));
}

#[test]
fn test_parse_address_list() {
    assert_eq!(
        parse_address_list("Joe <j@x.com>, k@y.com"),
        vec!["j@x.com".to_string(), "k@y.com".to_string()]
    );
    assert!(parse_address_list("  ").is_empty());
}

#[test]
fn test_email_address_parse() {
    let addr = EmailAddress::parse("John Doe <john@example.com>").unwrap();
    assert_eq!(addr.name.as_deref(), Some("John Doe"));
    assert_eq!(addr.local_part, "john");
    assert_eq!(addr.domain, "example.com");
    assert_eq!(addr.to_string(), "John Doe <john@example.com>");
    assert!(EmailAddress::parse("no-at-sign").is_none());
}
