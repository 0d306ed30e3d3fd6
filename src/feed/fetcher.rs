use std::time::Duration;

use futures::StreamExt;
use thiserror::Error;

/// Response bodies are read through this cap so a hostile or broken
/// upstream cannot exhaust memory.
const MAX_FEED_SIZE: usize = 10 * 1024 * 1024; // 10MB

/// Errors that can occur while fetching a remote document.
///
/// There is deliberately no retry machinery here: each refresh is a single
/// timeout-bounded attempt, and repeated client requests retry naturally
/// via cache TTL expiry.
#[derive(Debug, Error)]
pub enum FetchError {
    /// Network-level error (DNS, connection, TLS, etc.)
    #[error("request failed: {0}")]
    Network(#[from] reqwest::Error),
    /// HTTP response with non-2xx status code
    #[error("HTTP error: status {0}")]
    HttpStatus(u16),
    /// Request (including body read) exceeded the configured timeout
    #[error("request timed out after {0:?}")]
    Timeout(Duration),
    /// Response body exceeded the size limit
    #[error("response too large (limit {0} bytes)")]
    ResponseTooLarge(usize),
}

/// Raw bytes of a fetched document plus the upstream content-type hint.
///
/// The hint is informational — the parser dialect is normally selected by
/// feed kind; the hint exists for callers that want to select a dialect
/// when the kind is not already known.
#[derive(Debug)]
pub struct FetchedDocument {
    pub bytes: Vec<u8>,
    pub content_type: Option<String>,
}

/// Performs a timed, single-attempt GET of `url`.
///
/// The timeout covers the whole exchange: connection, headers, and body
/// read. On timeout the caller sees [`FetchError::Timeout`], which the
/// cache layer treats like any other fetch failure (stale fallback).
pub async fn fetch_document(
    client: &reqwest::Client,
    url: &str,
    timeout: Duration,
) -> Result<FetchedDocument, FetchError> {
    let exchange = async {
        let response = client.get(url).send().await.map_err(FetchError::Network)?;

        if !response.status().is_success() {
            return Err(FetchError::HttpStatus(response.status().as_u16()));
        }

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_owned);

        let bytes = read_limited_bytes(response, MAX_FEED_SIZE).await?;

        Ok(FetchedDocument {
            bytes,
            content_type,
        })
    };

    tokio::time::timeout(timeout, exchange)
        .await
        .map_err(|_| FetchError::Timeout(timeout))?
}

async fn read_limited_bytes(
    response: reqwest::Response,
    limit: usize,
) -> Result<Vec<u8>, FetchError> {
    // Fast path: reject on the Content-Length header before reading
    if let Some(len) = response.content_length() {
        if len as usize > limit {
            return Err(FetchError::ResponseTooLarge(limit));
        }
    }

    let mut bytes = Vec::new();
    let mut stream = response.bytes_stream();

    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(FetchError::Network)?;
        if bytes.len().saturating_add(chunk.len()) > limit {
            return Err(FetchError::ResponseTooLarge(limit));
        }
        bytes.extend_from_slice(&chunk);
    }

    Ok(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::method;
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_fetch_success_with_content_type() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_raw("<rss/>", "application/rss+xml"),
            )
            .mount(&mock_server)
            .await;

        let client = reqwest::Client::new();
        let doc = fetch_document(&client, &mock_server.uri(), Duration::from_secs(5))
            .await
            .unwrap();

        assert_eq!(doc.bytes, b"<rss/>");
        assert_eq!(doc.content_type.as_deref(), Some("application/rss+xml"));
    }

    #[tokio::test]
    async fn test_fetch_404() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&mock_server)
            .await;

        let client = reqwest::Client::new();
        let err = fetch_document(&client, &mock_server.uri(), Duration::from_secs(5))
            .await
            .unwrap_err();

        match err {
            FetchError::HttpStatus(404) => {}
            e => panic!("expected HttpStatus(404), got {e:?}"),
        }
    }

    #[tokio::test]
    async fn test_fetch_5xx_is_not_retried() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503))
            .expect(1) // single attempt, no retries
            .mount(&mock_server)
            .await;

        let client = reqwest::Client::new();
        let err = fetch_document(&client, &mock_server.uri(), Duration::from_secs(5))
            .await
            .unwrap_err();

        match err {
            FetchError::HttpStatus(503) => {}
            e => panic!("expected HttpStatus(503), got {e:?}"),
        }
    }

    #[tokio::test]
    async fn test_fetch_timeout() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string("slow")
                    .set_delay(Duration::from_secs(5)),
            )
            .mount(&mock_server)
            .await;

        let client = reqwest::Client::new();
        let err = fetch_document(&client, &mock_server.uri(), Duration::from_millis(100))
            .await
            .unwrap_err();

        assert!(matches!(err, FetchError::Timeout(_)));
    }

    #[tokio::test]
    async fn test_fetch_oversized_body_rejected() {
        let mock_server = MockServer::start().await;
        let body = vec![b'x'; MAX_FEED_SIZE + 1];
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(body))
            .mount(&mock_server)
            .await;

        let client = reqwest::Client::new();
        let err = fetch_document(&client, &mock_server.uri(), Duration::from_secs(30))
            .await
            .unwrap_err();

        assert!(matches!(err, FetchError::ResponseTooLarge(_)));
    }
}
