//! Message immutability tests.
//!
//! Covers:
//! - `with_*` derivation leaving the source message untouched
//! - header merge semantics through the message surface
//! - the body stream staying shared across derived messages

use httpentry::message::{Message, ProtocolVersion};
use httpentry::stream::ByteStream;
use httpentry::Error;

#[test]
fn test_derivation_chain_builds_up_a_message() {
    let message = Message::default()
        .with_protocol_version("2.0")
        .unwrap()
        .with_header("Host", "example.com")
        .with_header("Accept", ["text/html", "text/plain"])
        .with_added_header("Accept", "text/css");

    assert_eq!(message.protocol_version(), ProtocolVersion::V2_0);
    assert_eq!(message.header_line("host"), "example.com");
    assert_eq!(
        message.header("accept"),
        vec![
            "text/html".to_owned(),
            "text/plain".to_owned(),
            "text/css".to_owned(),
        ]
    );
}

#[test]
fn test_each_step_leaves_its_source_alone() {
    let base = Message::default().with_header("X-Step", "0");
    let first = base.with_header("X-Step", "1");
    let second = first.without_header("X-Step");

    assert_eq!(base.header_line("X-Step"), "0");
    assert_eq!(first.header_line("X-Step"), "1");
    assert!(!second.has_header("X-Step"));
    assert!(first.has_header("X-Step"));
}

#[test]
fn test_set_through_message_merges_positionally() {
    let message = Message::default().with_header("Accept", ["a", "b"]);
    let merged = message.with_header("Accept", ["x"]);
    assert_eq!(merged.header("Accept"), vec!["x".to_owned(), "b".to_owned()]);
    // The source still holds the full pair.
    assert_eq!(
        message.header("Accept"),
        vec!["a".to_owned(), "b".to_owned()]
    );
}

#[test]
fn test_cache_control_survives_message_derivation_independently() {
    let message = Message::default().with_header("Cache-Control", "max-age=100");
    let tightened = message.with_added_header("Cache-Control", "no-store");

    assert_eq!(message.header_line("cache-control"), "max-age=100");
    assert_eq!(
        tightened.header_line("cache-control"),
        "max-age=100, no-store"
    );
    assert!(tightened
        .headers()
        .has_cache_control_directive("no-store"));
    assert!(!message.headers().has_cache_control_directive("no-store"));
}

#[test]
fn test_body_is_shared_until_with_body_swaps_it() {
    let message = Message::default();
    let derived = message.with_header("Content-Type", "text/plain");

    // One underlying stream: a write through either is seen by both.
    derived.body().borrow_mut().write(b"shared").unwrap();
    assert_eq!(message.body().borrow_mut().to_string_lossy(), "shared");

    let replaced = derived.with_body(ByteStream::from_memory(b"own".to_vec()).into_shared());
    replaced.body().borrow_mut().write(b"!").unwrap();
    assert_eq!(message.body().borrow_mut().to_string_lossy(), "shared");
    assert_eq!(replaced.body().borrow_mut().to_string_lossy(), "!wn");
}

#[test]
fn test_unknown_protocol_version_is_a_validation_error() {
    let err = Message::default().with_protocol_version("0.9").unwrap_err();
    assert!(matches!(err, Error::InvalidProtocolVersion { .. }));
    assert!(err.is_validation());
    assert!(err.to_string().contains("0.9"));
}

#[test]
fn test_absent_headers_read_as_empty() {
    let message = Message::default();
    assert!(!message.has_header("Via"));
    assert!(message.header("Via").is_empty());
    assert_eq!(message.header_line("Via"), "");
}
