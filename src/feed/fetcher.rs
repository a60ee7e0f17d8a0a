use chrono::{DateTime, Utc};
use futures::StreamExt;
use reqwest::header::{IF_MODIFIED_SINCE, LAST_MODIFIED};
use reqwest::StatusCode;
use std::time::Duration;
use thiserror::Error;

/// Default request timeout.
pub const FETCH_TIMEOUT: Duration = Duration::from_secs(30);
const MAX_FEED_SIZE: usize = 10 * 1024 * 1024; // 10MB

/// `strftime` pattern for RFC 7231 HTTP-dates.
const HTTP_DATE_FORMAT: &str = "%a, %d %b %Y %H:%M:%S GMT";

/// Errors that can occur while fetching a feed.
///
/// Transport failures (see [`FetchError::is_transport`]) are distinct from
/// responses the server actually sent.
#[derive(Debug, Error)]
pub enum FetchError {
    /// Network-level error (DNS, connection, TLS, malformed response, etc.)
    #[error("Request failed: {0}")]
    Network(#[from] reqwest::Error),
    /// HTTP response with a non-2xx, non-304 status code
    #[error("HTTP error: status {0}")]
    HttpStatus(u16),
    /// Request exceeded the timeout
    #[error("Request timed out")]
    Timeout,
    /// Response body exceeded the 10MB size limit
    #[error("Response too large")]
    ResponseTooLarge,
    /// Response was incomplete (received fewer bytes than Content-Length)
    #[error("Incomplete response: expected {expected} bytes, received {received}")]
    IncompleteResponse { expected: u64, received: usize },
}

impl FetchError {
    /// True when no usable HTTP response was obtained.
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            FetchError::Network(_) | FetchError::Timeout | FetchError::IncompleteResponse { .. }
        )
    }
}

/// What a fetch produced.
#[derive(Debug)]
pub enum FetchOutcome {
    /// The server answered 304 to an `If-Modified-Since` request.
    NotModified,
    Fetched {
        body: Vec<u8>,
        /// Parsed `Last-Modified` header, if present and valid.
        last_modified: Option<DateTime<Utc>>,
    },
}

/// Formats a timestamp as an HTTP-date (`Mon, 01 Jan 2024 12:00:00 GMT`).
pub fn format_http_date(ts: DateTime<Utc>) -> String {
    ts.format(HTTP_DATE_FORMAT).to_string()
}

/// Parses an HTTP-date header value. Returns `None` for anything unparseable.
pub fn parse_http_date(value: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc2822(value.trim())
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

/// Performs a single GET, optionally conditional on `since`.
///
/// # Arguments
///
/// * `client` - HTTP client (caller controls configuration)
/// * `url` - Feed URL
/// * `since` - When set, sent as `If-Modified-Since`
/// * `timeout` - Upper bound for the whole request, body included
///
/// # Errors
///
/// - [`FetchError::Network`] / [`FetchError::Timeout`] /
///   [`FetchError::IncompleteResponse`] when no complete response arrived
/// - [`FetchError::HttpStatus`] for any non-success status other than 304
/// - [`FetchError::ResponseTooLarge`] when the body exceeds 10MB
pub async fn fetch_feed(
    client: &reqwest::Client,
    url: &str,
    since: Option<DateTime<Utc>>,
    timeout: Duration,
) -> Result<FetchOutcome, FetchError> {
    tokio::time::timeout(timeout, fetch_inner(client, url, since))
        .await
        .map_err(|_| FetchError::Timeout)?
}

async fn fetch_inner(
    client: &reqwest::Client,
    url: &str,
    since: Option<DateTime<Utc>>,
) -> Result<FetchOutcome, FetchError> {
    let mut request = client.get(url);
    if let Some(since) = since {
        request = request.header(IF_MODIFIED_SINCE, format_http_date(since));
    }

    let response = request.send().await.map_err(FetchError::Network)?;

    if response.status() == StatusCode::NOT_MODIFIED {
        tracing::debug!(url = %url, "Feed not modified");
        return Ok(FetchOutcome::NotModified);
    }

    if !response.status().is_success() {
        return Err(FetchError::HttpStatus(response.status().as_u16()));
    }

    let last_modified = response
        .headers()
        .get(LAST_MODIFIED)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| {
            let parsed = parse_http_date(value);
            if parsed.is_none() {
                tracing::debug!(
                    url = %url,
                    value = %value,
                    "Ignoring unparseable Last-Modified header"
                );
            }
            parsed
        });

    let body = read_limited_bytes(response, MAX_FEED_SIZE).await?;
    tracing::debug!(url = %url, bytes = body.len(), "Fetched feed");

    Ok(FetchOutcome::Fetched {
        body,
        last_modified,
    })
}

async fn read_limited_bytes(
    response: reqwest::Response,
    limit: usize,
) -> Result<Vec<u8>, FetchError> {
    // Capture Content-Length for completeness check
    let expected_length = response.content_length();

    if let Some(len) = expected_length {
        if len as usize > limit {
            return Err(FetchError::ResponseTooLarge);
        }
    }

    let mut bytes = Vec::new();
    let mut stream = response.bytes_stream();

    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(FetchError::Network)?;
        if bytes.len().saturating_add(chunk.len()) > limit {
            return Err(FetchError::ResponseTooLarge);
        }
        bytes.extend_from_slice(&chunk);
    }

    if let Some(expected) = expected_length {
        if (bytes.len() as u64) < expected {
            return Err(FetchError::IncompleteResponse {
                expected,
                received: bytes.len(),
            });
        }
    }

    Ok(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use wiremock::matchers::{header_exists, method};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const VALID_RSS: &str = r#"<?xml version="1.0"?>
<rss version="2.0"><channel>
    <item><guid>1</guid><title>Test</title></item>
</channel></rss>"#;

    fn jan_first() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_format_http_date() {
        assert_eq!(format_http_date(jan_first()), "Mon, 01 Jan 2024 12:00:00 GMT");
    }

    #[test]
    fn test_parse_http_date() {
        assert_eq!(
            parse_http_date("Mon, 01 Jan 2024 12:00:00 GMT"),
            Some(jan_first())
        );
        assert_eq!(parse_http_date("yesterday-ish"), None);
        assert_eq!(parse_http_date(""), None);
    }

    #[tokio::test]
    async fn test_fetch_without_since_sends_no_precondition() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string(VALID_RSS))
            .mount(&mock_server)
            .await;

        let client = reqwest::Client::new();
        let url = format!("{}/feed", mock_server.uri());
        let outcome = fetch_feed(&client, &url, None, FETCH_TIMEOUT).await.unwrap();

        match outcome {
            FetchOutcome::Fetched {
                body,
                last_modified,
            } => {
                assert_eq!(body, VALID_RSS.as_bytes());
                assert_eq!(last_modified, None);
            }
            FetchOutcome::NotModified => panic!("Expected content"),
        }

        let requests = mock_server.received_requests().await.unwrap();
        assert_eq!(requests.len(), 1);
        assert!(!requests[0].headers.contains_key("if-modified-since"));
    }

    #[tokio::test]
    async fn test_fetch_304_not_modified() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(header_exists("If-Modified-Since"))
            .respond_with(ResponseTemplate::new(304))
            .expect(1)
            .mount(&mock_server)
            .await;

        let client = reqwest::Client::new();
        let url = format!("{}/feed", mock_server.uri());
        let outcome = fetch_feed(&client, &url, Some(jan_first()), FETCH_TIMEOUT)
            .await
            .unwrap();
        assert!(matches!(outcome, FetchOutcome::NotModified));

        let requests = mock_server.received_requests().await.unwrap();
        let sent = requests[0]
            .headers
            .get("if-modified-since")
            .and_then(|v| v.to_str().ok());
        assert_eq!(sent, Some("Mon, 01 Jan 2024 12:00:00 GMT"));
    }

    #[tokio::test]
    async fn test_fetch_captures_last_modified() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(header_exists("If-Modified-Since"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string(VALID_RSS)
                    .insert_header("Last-Modified", "Tue, 02 Jan 2024 12:00:00 GMT"),
            )
            .mount(&mock_server)
            .await;

        let client = reqwest::Client::new();
        let url = format!("{}/feed", mock_server.uri());
        let outcome = fetch_feed(&client, &url, Some(jan_first()), FETCH_TIMEOUT)
            .await
            .unwrap();

        match outcome {
            FetchOutcome::Fetched { last_modified, .. } => assert_eq!(
                last_modified,
                Some(Utc.with_ymd_and_hms(2024, 1, 2, 12, 0, 0).unwrap())
            ),
            FetchOutcome::NotModified => panic!("Expected content"),
        }
    }

    #[tokio::test]
    async fn test_fetch_ignores_invalid_last_modified() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string(VALID_RSS)
                    .insert_header("Last-Modified", "not a date"),
            )
            .mount(&mock_server)
            .await;

        let client = reqwest::Client::new();
        let url = format!("{}/feed", mock_server.uri());
        let outcome = fetch_feed(&client, &url, Some(jan_first()), FETCH_TIMEOUT)
            .await
            .unwrap();
        assert!(matches!(
            outcome,
            FetchOutcome::Fetched {
                last_modified: None,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_fetch_404_is_http_error() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&mock_server)
            .await;

        let client = reqwest::Client::new();
        let url = format!("{}/feed", mock_server.uri());
        let err = fetch_feed(&client, &url, None, FETCH_TIMEOUT)
            .await
            .unwrap_err();
        match err {
            FetchError::HttpStatus(404) => {}
            e => panic!("Expected HttpStatus(404), got {:?}", e),
        }
        assert!(!FetchError::HttpStatus(404).is_transport());
    }

    #[tokio::test]
    async fn test_fetch_timeout_is_transport_error() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string(VALID_RSS)
                    .set_delay(Duration::from_secs(2)),
            )
            .mount(&mock_server)
            .await;

        let client = reqwest::Client::new();
        let url = format!("{}/feed", mock_server.uri());
        let err = fetch_feed(&client, &url, None, Duration::from_millis(100))
            .await
            .unwrap_err();
        assert!(matches!(err, FetchError::Timeout));
        assert!(err.is_transport());
    }

    #[tokio::test]
    async fn test_fetch_connection_refused_is_transport_error() {
        let client = reqwest::Client::new();
        // Port 9 (discard) is essentially never listening on test hosts
        let err = fetch_feed(&client, "http://127.0.0.1:9/feed", None, FETCH_TIMEOUT)
            .await
            .unwrap_err();
        assert!(err.is_transport(), "Expected transport error, got {:?}", err);
    }
}
