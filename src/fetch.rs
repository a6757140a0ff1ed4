//! Fetching input documents from a remote location.
//!
//! The response's `Content-Type` header decides how the body is decoded. If
//! it names a charset, that charset is used; otherwise the body is UTF-8.
//! The decoded text must be a single JSON document.

use std::{borrow::Cow, io::Read, time::Duration};

use encoding_rs::Encoding;
use lazy_static::lazy_static;
use regex::Regex;
use serde_json::Value;

use crate::errors::QueryError;

pub const DEFAULT_CHARSET: &str = "utf-8";

lazy_static! {
    static ref CHARSET: Regex = Regex::new(r"(?i)charset\s*=\s*(\S+)").unwrap();
}

/// Retrieves and decodes the document at a location.
///
/// Any `Fn(&str) -> Result<Value, QueryError>` is a `Fetcher`.
pub trait Fetcher {
    fn fetch(&self, location: &str) -> Result<Value, QueryError>;
}

impl<F> Fetcher for F
where
    F: Fn(&str) -> Result<Value, QueryError>,
{
    fn fetch(&self, location: &str) -> Result<Value, QueryError> {
        self(location)
    }
}

/// The charset named by a `Content-Type` header value, or `utf-8`.
pub fn charset(content_type: Option<&str>) -> &str {
    content_type
        .and_then(|content_type| CHARSET.captures(content_type))
        .and_then(|captures| captures.get(1))
        .map(|m| m.as_str())
        .unwrap_or(DEFAULT_CHARSET)
}

/// Labels, in the form [`normalize_label`] produces, that name ISO-8859-1.
/// These decode each byte to the code point of the same value, which the
/// WHATWG label table would instead treat as windows-1252.
const LATIN1_LABELS: &[&str] = &[
    "iso_8859_1",
    "iso8859_1",
    "iso_8859_1:1987",
    "iso_ir_100",
    "8859",
    "latin",
    "latin1",
    "latin_1",
    "l1",
    "cp819",
    "ibm819",
    "csisolatin1",
];

/// Labels naming 7-bit ASCII. Bytes above 0x7F are rejected.
const ASCII_LABELS: &[&str] = &[
    "ascii",
    "us_ascii",
    "us",
    "646",
    "ansi_x3.4_1968",
    "ansi_x3.4_1986",
    "iso646_us",
    "iso_ir_6",
    "cp367",
    "ibm367",
    "csascii",
];

fn normalize_label(label: &str) -> String {
    label
        .trim()
        .to_ascii_lowercase()
        .replace(['-', ' '], "_")
}

/// Decode `body` as the charset named by `label`.
fn decode_text<'b>(label: &str, body: &'b [u8]) -> Result<Cow<'b, str>, QueryError> {
    let normalized = normalize_label(label);

    if LATIN1_LABELS.contains(&normalized.as_str()) {
        tracing::debug!("decoding {} byte(s) as ISO-8859-1", body.len());
        return Ok(Cow::Owned(body.iter().map(|&b| char::from(b)).collect()));
    }

    if ASCII_LABELS.contains(&normalized.as_str()) {
        tracing::debug!("decoding {} byte(s) as ASCII", body.len());
        return match body.iter().position(|b| !b.is_ascii()) {
            Some(offset) => Err(QueryError::decode(format!(
                "response body is not valid ASCII (byte {:#04x} at offset {})",
                body[offset], offset
            ))),
            None => Ok(String::from_utf8_lossy(body)),
        };
    }

    let encoding = Encoding::for_label(label.as_bytes())
        .ok_or_else(|| QueryError::decode(format!("unknown charset \"{label}\"")))?;

    tracing::debug!(
        "decoding {} byte(s) as {} (charset \"{}\")",
        body.len(),
        encoding.name(),
        label
    );

    encoding
        .decode_without_bom_handling_and_without_replacement(body)
        .ok_or_else(|| {
            QueryError::decode(format!("response body is not valid {}", encoding.name()))
        })
}

/// Decode a response body according to its `Content-Type` and parse it as
/// JSON.
pub fn decode_body(content_type: Option<&str>, body: &[u8]) -> Result<Value, QueryError> {
    let text = decode_text(charset(content_type), body)?;

    serde_json::from_str(&text)
        .map_err(|err| QueryError::decode(format!("response body is not valid JSON: {err}")))
}

/// The default fetcher. Issues one blocking `GET` per call.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    agent: ureq::Agent,
    max_body_size: u64,
}

#[derive(Debug, Clone)]
pub struct HttpFetcherBuilder {
    connect_timeout: Duration,
    read_timeout: Duration,
    max_body_size: u64,
}

impl Default for HttpFetcherBuilder {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(30),
            read_timeout: Duration::from_secs(30),
            max_body_size: 64 * 1024 * 1024,
        }
    }
}

impl HttpFetcherBuilder {
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    pub fn read_timeout(mut self, timeout: Duration) -> Self {
        self.read_timeout = timeout;
        self
    }

    /// Responses with a larger body fail with a fetch error.
    pub fn max_body_size(mut self, bytes: u64) -> Self {
        self.max_body_size = bytes;
        self
    }

    pub fn build(self) -> HttpFetcher {
        let agent = ureq::AgentBuilder::new()
            .timeout_connect(self.connect_timeout)
            .timeout_read(self.read_timeout)
            .build();

        HttpFetcher {
            agent,
            max_body_size: self.max_body_size,
        }
    }
}

impl Default for HttpFetcher {
    fn default() -> Self {
        Self::new()
    }
}

impl HttpFetcher {
    pub fn new() -> Self {
        Self::builder().build()
    }

    pub fn builder() -> HttpFetcherBuilder {
        HttpFetcherBuilder::default()
    }
}

impl Fetcher for HttpFetcher {
    fn fetch(&self, location: &str) -> Result<Value, QueryError> {
        tracing::debug!("fetching {}", location);

        let response = match self.agent.get(location).call() {
            Ok(response) => response,
            Err(ureq::Error::Status(code, response)) => {
                return Err(QueryError::fetch(format!(
                    "GET {} returned {} {}",
                    location,
                    code,
                    response.status_text()
                )))
            }
            Err(ureq::Error::Transport(err)) => {
                return Err(QueryError::fetch(format!("GET {location} failed: {err}")))
            }
        };

        let content_type = response.header("Content-Type").map(str::to_owned);
        let mut body = Vec::new();

        response
            .into_reader()
            .take(self.max_body_size + 1)
            .read_to_end(&mut body)
            .map_err(|err| {
                QueryError::fetch(format!("failed to read response from {location}: {err}"))
            })?;

        if body.len() as u64 > self.max_body_size {
            return Err(QueryError::fetch(format!(
                "response from {} is larger than {} bytes",
                location, self.max_body_size
            )));
        }

        decode_body(content_type.as_deref(), &body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::QueryErrorType;
    use serde_json::json;

    #[test]
    fn charset_from_content_type() {
        assert_eq!(charset(None), "utf-8");
        assert_eq!(charset(Some("application/json")), "utf-8");
        assert_eq!(
            charset(Some("application/json; charset=ISO-8859-1")),
            "ISO-8859-1"
        );
        assert_eq!(charset(Some("text/plain; CHARSET = utf-16le")), "utf-16le");
    }

    #[test]
    fn latin1_body() {
        let body = b"{\"name\": \"caf\xe9\"}";
        assert_eq!(
            decode_body(Some("application/json; charset=ISO-8859-1"), body).unwrap(),
            json!({"name": "café"})
        );
    }

    #[test]
    fn latin1_maps_bytes_to_code_points() {
        for content_type in [
            "application/json; charset=ISO-8859-1",
            "application/json; charset=latin1",
            "application/json; charset=iso_8859_1",
        ] {
            assert_eq!(
                decode_body(Some(content_type), b"\"\x80\x9f\xff\"").unwrap(),
                json!("\u{80}\u{9f}\u{ff}"),
                "{content_type}"
            );
        }
    }

    #[test]
    fn windows_1252_is_not_latin1() {
        assert_eq!(
            decode_body(Some("text/json; charset=windows-1252"), b"\"\x80\"").unwrap(),
            json!("\u{20ac}")
        );
    }

    #[test]
    fn ascii_rejects_high_bytes() {
        assert_eq!(
            decode_body(Some("application/json; charset=US-ASCII"), b"[1]").unwrap(),
            json!([1])
        );

        let err = decode_body(Some("application/json; charset=ascii"), b"\"\x80\"").unwrap_err();
        assert_eq!(err.kind, QueryErrorType::DecodeError);
        assert!(err.msg.contains("offset 1"), "{}", err.msg);
    }

    #[test]
    fn utf8_is_the_default() {
        let body = "{\"name\": \"café\"}".as_bytes();
        assert_eq!(decode_body(None, body).unwrap(), json!({"name": "café"}));
    }

    #[test]
    fn malformed_utf8_is_a_decode_error() {
        let err = decode_body(None, b"\"caf\xe9\"").unwrap_err();
        assert_eq!(err.kind, QueryErrorType::DecodeError);
    }

    #[test]
    fn unknown_charset_is_a_decode_error() {
        let err = decode_body(Some("application/json; charset=klingon"), b"{}").unwrap_err();
        assert_eq!(err.kind, QueryErrorType::DecodeError);
        assert_eq!(err.msg, "unknown charset \"klingon\"");
    }

    #[test]
    fn invalid_json_is_a_decode_error() {
        let err = decode_body(None, b"{not json").unwrap_err();
        assert_eq!(err.kind, QueryErrorType::DecodeError);
        assert!(err.msg.starts_with("response body is not valid JSON"));
    }

    #[test]
    fn closures_are_fetchers() {
        let fetcher = |location: &str| -> Result<Value, QueryError> { Ok(json!(location)) };
        assert_eq!(fetcher.fetch("x").unwrap(), json!("x"));
    }
}
