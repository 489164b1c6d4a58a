use mail_bounce::{
    BounceClassifier, BounceConfig, BounceDetails, BounceType, Header, KnownPatternMatcher, Message, PartNode,
    StatusCodeTable,
};

fn classifier() -> BounceClassifier {
    BounceClassifier::new(StatusCodeTable::bundled().unwrap()).unwrap()
}

fn report(children: Vec<PartNode>) -> PartNode {
    PartNode::with_children("multipart/report; report-type=delivery-status", children)
}

const DSN_511: &str = "Reporting-MTA: dns; mx.example.com\n\n\
                       Final-Recipient: rfc822; a@b.com\n\
                       Action: failed\n\
                       Status: 5.1.1\n\
                       Diagnostic-Code: smtp; 550 user unknown\n";

fn dsn_message() -> Message {
    Message::new(report(vec![
        PartNode::text("text/plain", "Your message could not be delivered.\n"),
        PartNode::text("message/delivery-status", DSN_511),
    ]))
}

#[test]
fn test_delivery_status_report() {
    let mut message = dsn_message();
    let kind = classifier().classify(&mut message);

    assert_eq!(kind, Some(BounceType::HardBounce));
    let details = &message.details;
    assert_eq!(details.final_recipient.as_deref(), Some("a@b.com"));
    assert_eq!(details.action.as_deref(), Some("failed"));
    assert_eq!(details.status.as_deref(), Some("5.1.1"));
    assert_eq!(details.diagnostic_code.as_deref(), Some("smtp; 550 user unknown"));
    assert_eq!(details.dsn_delivery_status.as_deref(), Some(DSN_511));

    let at = message.report.as_ref().unwrap();
    assert!(at.path.is_empty());
    assert_eq!(at.depth, 0);
}

#[test]
fn test_report_beats_verp_soft_bounce() {
    let mut message = dsn_message();
    message
        .root
        .headers
        .push(Header::new("X-VERP_Bounce_Addr", "orig@example.com"));

    let kind = classifier().classify(&mut message);
    assert_eq!(kind, Some(BounceType::HardBounce));
    assert_eq!(
        message.details.original_recipient.as_deref(),
        Some("orig@example.com")
    );
}

#[test]
fn test_disposition_notification() {
    let mut message = Message::new(PartNode::with_children(
        "multipart/report; report-type=disposition-notification",
        vec![
            PartNode::text("text/plain", "Your message was displayed."),
            PartNode::text(
                "message/disposition-notification",
                "Final-Recipient: rfc822; reader@example.com\nDisposition: manual-action/MDN-sent-manually; displayed\n",
            ),
        ],
    ));
    let kind = classifier().classify(&mut message);
    assert_eq!(kind, Some(BounceType::MdnReceipt));
    assert_eq!(
        message.details.final_recipient.as_deref(),
        Some("reader@example.com")
    );
}

#[test]
fn test_report_text_and_rfc822_headers() {
    let mut message = Message::new(report(vec![
        PartNode::text("text/plain", "Delivery failed: 5.2.2 mailbox full\n"),
        PartNode::text(
            "text/rfc822-headers",
            "To: a@b.com\nSubject: hi there\nMessage-Id: <m1@example.com>\n",
        ),
    ]));

    let kind = classifier().classify(&mut message);
    assert_eq!(kind, Some(BounceType::MailboxFull));

    let at = message.rfc822.as_ref().unwrap();
    assert_eq!(at.path, vec![1]);
    assert_eq!(at.depth, 1);

    let details = &message.details;
    assert_eq!(details.final_recipient.as_deref(), Some("a@b.com"));
    assert_eq!(details.original_subject.as_deref(), Some("hi there"));
    assert_eq!(details.rfc_message_id.as_deref(), Some("<m1@example.com>"));
    let dsn_text = details.dsn_text.as_deref().unwrap();
    assert!(dsn_text.starts_with("Delivery failed: 5.2.2 mailbox full\n"));
    assert!(dsn_text.contains("\n\nRFC822 Text:\nTo: a@b.com"));
}

#[test]
fn test_embedded_message_headers_are_read() {
    let mut original = PartNode::text("text/plain", "Hello Bob");
    original.headers = vec![
        Header::new("To", "bob@example.com"),
        Header::new("Subject", "Lunch"),
        Header::new("Message-Id", "<lunch@example.com>"),
    ];
    let mut message = Message::new(report(vec![
        PartNode::text("text/plain", "Mail delivery failed.\n"),
        PartNode::text("message/delivery-status", "Status: 4.4.1 \nAction: delayed\n"),
        PartNode::with_children("message/rfc822", vec![original]),
    ]));

    let kind = classifier().classify(&mut message);
    assert_eq!(kind, Some(BounceType::SoftBounce));

    let details = &message.details;
    assert_eq!(details.final_recipient.as_deref(), Some("bob@example.com"));
    assert_eq!(details.original_subject.as_deref(), Some("Lunch"));
    assert_eq!(details.rfc_message_id.as_deref(), Some("<lunch@example.com>"));
    assert_eq!(
        details.dsn_rfc822.as_deref(),
        Some("To: bob@example.com\nSubject: Lunch\nMessage-Id: <lunch@example.com>\n")
    );
    assert_eq!(details.dsn_text.as_deref(), Some("Hello Bob"));
    assert_eq!(message.rfc822.as_ref().unwrap().path, vec![2]);
}

#[test]
fn test_whole_body_fallback_with_embedded_message() {
    let mut original = PartNode::text("text/plain", "see you");
    original.headers = vec![Header::new("To", "c@d.com")];
    let mut message = Message::new(PartNode::with_children(
        "multipart/mixed",
        vec![
            PartNode::text("text/plain", "Returned mail: 5.1.1 user unknown\n"),
            PartNode::with_children("message/rfc822", vec![original]),
        ],
    ));

    let kind = classifier().classify(&mut message);
    assert_eq!(kind, Some(BounceType::HardBounce));
    assert_eq!(message.details.final_recipient.as_deref(), Some("c@d.com"));
}

#[test]
fn test_plain_mail_is_not_a_bounce() {
    let mut message = Message::new(PartNode::text(
        "text/plain",
        "Meeting moved to 5.1.1 room.",
    ));
    assert_eq!(classifier().classify(&mut message), None);
    assert_eq!(message.details, BounceDetails::default());
}

#[test]
fn test_implicit_cc_user() {
    let mut message = Message::new(PartNode::text("text/plain", "fyi"));
    message.envelope.to = vec!["x@y.com".into()];
    message.envelope.cc = vec!["X <x@y.com>".into()];
    assert_eq!(classifier().classify(&mut message), Some(BounceType::CcUser));

    let mut addressed = Message::new(PartNode::text("text/plain", "fyi"));
    addressed.envelope.to = vec!["x@y.com".into()];
    addressed.envelope.to_envelope = vec!["x@y.com".into()];
    addressed.envelope.cc = vec!["x@y.com".into()];
    assert_eq!(classifier().classify(&mut addressed), None);
}

#[test]
fn test_verp_header_soft_bounce() {
    let mut message = Message::new(PartNode::text("text/plain", "bounced"));
    message
        .root
        .headers
        .push(Header::new("x-verp_bounce_addr", " jsmith@test.com "));
    message.envelope.return_path = Some("<>".into());

    assert_eq!(classifier().classify(&mut message), Some(BounceType::SoftBounce));
    assert_eq!(
        message.details.original_recipient.as_deref(),
        Some("jsmith@test.com")
    );
}

#[test]
fn test_verp_header_with_return_path() {
    let mut message = Message::new(PartNode::text("text/plain", "reply"));
    message
        .root
        .headers
        .push(Header::new("X-VERP_Bounce_Addr", "jsmith@test.com"));
    message.envelope.return_path = Some("<sender@example.com>".into());

    assert_eq!(classifier().classify(&mut message), None);
    assert_eq!(
        message.details.original_recipient.as_deref(),
        Some("jsmith@test.com")
    );
}

#[test]
fn test_custom_verp_header_name() {
    let config = BounceConfig {
        verp_header: "X-Bounce-Rcpt".into(),
        ..BounceConfig::default()
    };
    let classifier = classifier().with_config(config);
    let mut message = Message::new(PartNode::text("text/plain", "bounced"));
    message
        .root
        .headers
        .push(Header::new("X-Bounce-Rcpt", "r@example.com"));

    assert_eq!(classifier.classify(&mut message), Some(BounceType::SoftBounce));
    assert_eq!(classifier.config().verp_header, "X-Bounce-Rcpt");
}

#[test]
fn test_body_pattern_recovers_recipient() {
    let mut message = Message::new(PartNode::text(
        "text/plain",
        "Delivery to the following recipient failed permanently:\n\n    jsmith@test.com\n\n",
    ));
    message
        .root
        .headers
        .push(Header::new("X-VERP_Bounce_Addr", ""));

    assert_eq!(classifier().classify(&mut message), Some(BounceType::SoftBounce));
    assert!(message.details.original_recipient.is_none());
    assert_eq!(
        message.details.final_recipient.as_deref(),
        Some("jsmith@test.com")
    );
}

#[test]
fn test_body_patterns_skipped_when_recipient_known() {
    let mut message = Message::new(PartNode::text(
        "text/plain",
        "Delivery to the following recipient failed permanently:\n\n    other@test.com\n\n",
    ));
    message
        .root
        .headers
        .push(Header::new("X-VERP_Bounce_Addr", "jsmith@test.com"));

    let classifier = classifier().with_patterns(KnownPatternMatcher::new().unwrap());
    assert_eq!(classifier.classify(&mut message), Some(BounceType::SoftBounce));
    assert!(message.details.final_recipient.is_none());
}

#[test]
fn test_classify_is_repeatable() {
    let classifier = classifier();
    let mut message = dsn_message();
    let first = classifier.classify(&mut message);
    let attachments = message.attachments.clone();
    let second = classifier.classify(&mut message);
    assert_eq!(first, second);
    assert_eq!(attachments, message.attachments);
}

#[test]
fn test_classifier_is_shareable() {
    fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<BounceClassifier>();
}
