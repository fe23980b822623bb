//! Request-URI reconstruction.
//!
//! Gateways and rewrite layers disagree about where the original request
//! URI lives. Five conventions are checked in a fixed order; the first
//! match wins and removes the signals it consumed, so a later consumer of
//! the same bags cannot act on them twice.

use tracing::debug;

use crate::base::bag::ParamBag;
use crate::headers::HeaderCollection;
use crate::uri::Uri;

impl Uri {
    /// Reconstruct the canonical request URI from the header and
    /// server-parameter collaborators.
    ///
    /// Resolution order:
    /// 1. the `X-Original-Url` header (rewrite module passing the
    ///    pre-rewrite URL);
    /// 2. the `X-Rewrite-Url` header;
    /// 3. `IIS_WasUrlRewritten == "1"` with a non-empty `UNENCODED_URL`
    ///    (taken unencoded so doubled slashes survive);
    /// 4. `REQUEST_URI`, with a reverse proxy's `scheme://host[:port]`
    ///    prefix stripped when it matches this request's own authority;
    /// 5. `ORIG_PATH_INFO` plus `QUERY_STRING`;
    /// and the empty string when nothing matches.
    ///
    /// The canonical value is written back to `REQUEST_URI` so that
    /// derived requests resolve to the same result. The deployment script
    /// prefix (`SCRIPT_NAME`, falling back to `ORIG_SCRIPT_NAME`) is
    /// stripped from the front of the URI and recorded as `base_path`.
    ///
    /// Never fails: a remainder that does not parse as a URI degrades to a
    /// path-only value.
    pub fn from_request(headers: &mut HeaderCollection, server: &mut ParamBag) -> Uri {
        let request_uri = resolve_raw(headers, server);
        server.set("REQUEST_URI", request_uri.as_str());

        let script = server
            .get("SCRIPT_NAME")
            .or_else(|| server.get("ORIG_SCRIPT_NAME"))
            .unwrap_or("")
            .to_owned();
        let remainder = match request_uri.strip_prefix(script.as_str()) {
            Some(rest) if !script.is_empty() => rest.to_owned(),
            _ => request_uri,
        };

        let mut uri = Uri::parse(&remainder).unwrap_or_else(|_| Uri {
            path: remainder.clone(),
            ..Uri::default()
        });
        uri.base_path = script;
        uri
    }
}

fn resolve_raw(headers: &mut HeaderCollection, server: &mut ParamBag) -> String {
    if let Some(value) = headers.first("X-Original-Url") {
        headers.remove("X-Original-Url");
        server.remove("HTTP_X_ORIGINAL_URL");
        server.remove("UNENCODED_URL");
        server.remove("IIS_WasUrlRewritten");
        debug!(uri = %value, "request URI taken from X-Original-Url");
        return value;
    }

    if let Some(value) = headers.first("X-Rewrite-Url") {
        headers.remove("X-Rewrite-Url");
        debug!(uri = %value, "request URI taken from X-Rewrite-Url");
        return value;
    }

    if server.get("IIS_WasUrlRewritten") == Some("1")
        && server.get("UNENCODED_URL").is_some_and(|v| !v.is_empty())
    {
        let value = server.get("UNENCODED_URL").unwrap_or("").to_owned();
        server.remove("UNENCODED_URL");
        server.remove("IIS_WasUrlRewritten");
        debug!(uri = %value, "request URI taken from UNENCODED_URL");
        return value;
    }

    if server.has("REQUEST_URI") {
        let mut value = server.get("REQUEST_URI").unwrap_or("").to_owned();
        if let Some(authority) = expected_authority(headers, server) {
            match value.strip_prefix(&authority) {
                // Only strip at a path boundary: `https://h` is a textual
                // prefix of `https://h:8443/x` without being its authority.
                Some(rest) if rest.is_empty() || rest.starts_with('/') || rest.starts_with('?') => {
                    debug!(prefix = %authority, "stripping proxy authority from REQUEST_URI");
                    value = rest.to_owned();
                }
                _ => {}
            }
        }
        debug!(uri = %value, "request URI taken from REQUEST_URI");
        return value;
    }

    if server.has("ORIG_PATH_INFO") {
        let mut value = server.get("ORIG_PATH_INFO").unwrap_or("").to_owned();
        if let Some(query) = server.get("QUERY_STRING").filter(|q| !q.is_empty()) {
            value.push('?');
            value.push_str(query);
        }
        server.remove("ORIG_PATH_INFO");
        debug!(uri = %value, "request URI taken from ORIG_PATH_INFO");
        return value;
    }

    debug!("no request URI signal present");
    String::new()
}

/// The authority a reverse proxy would have prefixed onto `REQUEST_URI`:
/// scheme from `HTTPS`, host from the `Host` header falling back to
/// `SERVER_NAME`, port from `SERVER_PORT` with the scheme default left
/// out. `None` when no host is known.
fn expected_authority(headers: &HeaderCollection, server: &ParamBag) -> Option<String> {
    let https = server.get("HTTPS").unwrap_or("");
    let scheme = if !https.is_empty() && !https.eq_ignore_ascii_case("off") {
        "https"
    } else {
        "http"
    };

    let host = headers
        .first("Host")
        .or_else(|| server.get("SERVER_NAME").map(str::to_owned))?;
    if host.is_empty() {
        return None;
    }
    if host.contains(':') {
        return Some(format!("{scheme}://{host}"));
    }

    let default_port = if scheme == "https" { 443 } else { 80 };
    match server.get("SERVER_PORT").and_then(|p| p.parse::<u16>().ok()) {
        Some(port) if port != default_port => Some(format!("{scheme}://{host}:{port}")),
        _ => Some(format!("{scheme}://{host}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_proxy_authority_is_stripped_from_request_uri() {
        let mut headers: HeaderCollection =
            [("Host", "example.com")].into_iter().collect();
        let mut server: ParamBag = [
            ("REQUEST_URI", "http://example.com/a/b?q=1"),
            ("SERVER_PORT", "80"),
        ]
        .into_iter()
        .collect();

        let uri = Uri::from_request(&mut headers, &mut server);
        assert_eq!(uri.path(), "/a/b");
        assert_eq!(uri.query(), "q=1");
        assert_eq!(server.get("REQUEST_URI"), Some("/a/b?q=1"));
    }

    #[test]
    fn test_https_and_explicit_port_shape_the_expected_authority() {
        let mut headers: HeaderCollection =
            [("Host", "example.com")].into_iter().collect();
        let mut server: ParamBag = [
            ("HTTPS", "on"),
            ("SERVER_PORT", "8443"),
            ("REQUEST_URI", "https://example.com:8443/x"),
        ]
        .into_iter()
        .collect();

        let uri = Uri::from_request(&mut headers, &mut server);
        assert_eq!(uri.path(), "/x");
    }

    #[test]
    fn test_foreign_authority_is_not_stripped() {
        let mut headers: HeaderCollection =
            [("Host", "example.com")].into_iter().collect();
        let mut server: ParamBag = [("REQUEST_URI", "http://other.test/x")]
            .into_iter()
            .collect();

        let uri = Uri::from_request(&mut headers, &mut server);
        // Not our authority, so the value stays as supplied and parses as
        // an absolute URI.
        assert_eq!(uri.host(), "other.test");
        assert_eq!(uri.path(), "/x");
    }

    #[test]
    fn test_server_name_backs_up_a_missing_host_header() {
        let mut headers = HeaderCollection::new();
        let mut server: ParamBag = [
            ("SERVER_NAME", "internal.test"),
            ("REQUEST_URI", "http://internal.test/y"),
        ]
        .into_iter()
        .collect();

        let uri = Uri::from_request(&mut headers, &mut server);
        assert_eq!(uri.path(), "/y");
        assert_eq!(uri.host(), "");
    }
}
