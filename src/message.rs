//! The HTTP message base: protocol version, headers, body.
//!
//! Messages are immutable from the outside. Every `with_*` mutator returns
//! a new message whose header collection is an independent copy, so no two
//! messages can ever observe each other's header mutations. The body is
//! the one deliberately shared piece of state, replaced only through
//! [`Message::with_body`].

use std::fmt;
use std::rc::Rc;
use std::str::FromStr;

use crate::base::error::Error;
use crate::headers::{HeaderCollection, IntoHeaderValues};
use crate::stream::{ByteStream, SharedStream};

/// HTTP protocol version of a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProtocolVersion {
    V1_0,
    V1_1,
    V2_0,
}

impl ProtocolVersion {
    pub fn as_str(self) -> &'static str {
        match self {
            ProtocolVersion::V1_0 => "1.0",
            ProtocolVersion::V1_1 => "1.1",
            ProtocolVersion::V2_0 => "2.0",
        }
    }
}

impl FromStr for ProtocolVersion {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "1.0" => Ok(ProtocolVersion::V1_0),
            "1.1" => Ok(ProtocolVersion::V1_1),
            "2.0" => Ok(ProtocolVersion::V2_0),
            other => Err(Error::InvalidProtocolVersion {
                version: other.to_owned(),
            }),
        }
    }
}

impl fmt::Display for ProtocolVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An HTTP message: the shared base of requests and responses.
#[derive(Debug, Clone)]
pub struct Message {
    version: ProtocolVersion,
    headers: HeaderCollection,
    body: SharedStream,
}

impl Default for Message {
    /// An HTTP/1.1 message with no headers and an empty in-memory body.
    fn default() -> Self {
        Self {
            version: ProtocolVersion::V1_1,
            headers: HeaderCollection::new(),
            body: ByteStream::from_memory(Vec::new()).into_shared(),
        }
    }
}

impl Message {
    pub fn new(version: ProtocolVersion, headers: HeaderCollection, body: SharedStream) -> Self {
        Self {
            version,
            headers,
            body,
        }
    }

    pub fn protocol_version(&self) -> ProtocolVersion {
        self.version
    }

    /// Read-only view of the message's headers.
    pub fn headers(&self) -> &HeaderCollection {
        &self.headers
    }

    pub fn has_header(&self, name: &str) -> bool {
        self.headers.has(name)
    }

    /// The header's values; empty when the header is absent.
    pub fn header(&self, name: &str) -> Vec<String> {
        self.headers.get(name).unwrap_or_default()
    }

    /// The header's values joined with `,`; empty when absent.
    pub fn header_line(&self, name: &str) -> String {
        self.header(name).join(",")
    }

    /// Handle to the message body. Shared: reads and writes through it are
    /// visible to every holder.
    pub fn body(&self) -> SharedStream {
        Rc::clone(&self.body)
    }

    /// A new message with the given protocol version.
    pub fn with_protocol_version(&self, version: &str) -> Result<Self, Error> {
        let version = version.parse()?;
        let mut message = self.clone();
        message.version = version;
        Ok(message)
    }

    /// A new message with the header set (merging positionally with any
    /// existing values, as [`HeaderCollection::set`] does).
    pub fn with_header(&self, name: &str, values: impl IntoHeaderValues) -> Self {
        let mut message = self.clone();
        message.headers.set(name, values);
        message
    }

    /// A new message with the value(s) appended to the header.
    pub fn with_added_header(&self, name: &str, values: impl IntoHeaderValues) -> Self {
        let mut message = self.clone();
        message.headers.add(name, values);
        message
    }

    /// A new message without the named header.
    pub fn without_header(&self, name: &str) -> Self {
        let mut message = self.clone();
        message.headers.remove(name);
        message
    }

    /// A new message with `body` as its body stream.
    pub fn with_body(&self, body: SharedStream) -> Self {
        let mut message = self.clone();
        message.body = body;
        message
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_protocol_version_round_trips() {
        for text in ["1.0", "1.1", "2.0"] {
            let version: ProtocolVersion = text.parse().unwrap();
            assert_eq!(version.as_str(), text);
        }
    }

    #[test]
    fn test_invalid_protocol_version_is_rejected() {
        let err = Message::default().with_protocol_version("3.0").unwrap_err();
        assert!(matches!(err, Error::InvalidProtocolVersion { .. }));
    }

    #[test]
    fn test_with_protocol_version_leaves_the_original_untouched() {
        let message = Message::default();
        let upgraded = message.with_protocol_version("2.0").unwrap();
        assert_eq!(message.protocol_version(), ProtocolVersion::V1_1);
        assert_eq!(upgraded.protocol_version(), ProtocolVersion::V2_0);
    }

    #[test]
    fn test_with_header_does_not_mutate_the_original() {
        let message = Message::default().with_header("X-Foo", "a");
        let changed = message.with_header("X-Foo", "b");
        assert_eq!(message.header("X-Foo"), vec!["a".to_owned()]);
        assert_eq!(changed.header("X-Foo"), vec!["b".to_owned()]);
    }

    #[test]
    fn test_with_added_header_appends() {
        let message = Message::default()
            .with_header("Accept", "text/html")
            .with_added_header("Accept", "text/plain");
        assert_eq!(message.header_line("accept"), "text/html,text/plain");
    }

    #[test]
    fn test_without_header_removes_only_in_the_copy() {
        let message = Message::default().with_header("X-Foo", "a");
        let stripped = message.without_header("x-foo");
        assert!(message.has_header("X-Foo"));
        assert!(!stripped.has_header("X-Foo"));
    }

    #[test]
    fn test_body_is_shared_until_replaced() {
        let message = Message::default();
        let copy = message.with_header("X-Foo", "a");
        copy.body().borrow_mut().write(b"hello").unwrap();
        assert_eq!(message.body().borrow_mut().to_string_lossy(), "hello");

        let rebodied = message.with_body(ByteStream::from_memory(b"new".to_vec()).into_shared());
        assert_eq!(rebodied.body().borrow_mut().to_string_lossy(), "new");
        assert_eq!(message.body().borrow_mut().to_string_lossy(), "hello");
    }

    #[test]
    fn test_header_of_absent_name_is_empty() {
        let message = Message::default();
        assert!(message.header("X-Missing").is_empty());
        assert_eq!(message.header_line("X-Missing"), "");
    }
}
