//! HTTP client abstraction for testability.
//!
//! All remote access (WMS imagery, object-store listings, tile downloads)
//! goes through the [`AsyncHttpClient`] trait so tests can substitute a mock
//! client. Unlike a plain byte fetch, responses carry the HTTP status and
//! content type: the imagery fallback policy inspects the content type, and
//! the tile downloader must distinguish a missing tile (404, skip) from a
//! transport failure.

use std::future::Future;
use std::time::Duration;

use thiserror::Error;

/// Default request timeout for remote services.
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Errors raised by HTTP transport.
///
/// Non-2xx statuses are not errors at this layer; callers read
/// [`HttpResponse::status`] and apply their own policy.
#[derive(Debug, Error, Clone)]
pub enum FetchError {
    /// Failed to construct the HTTP client.
    #[error("failed to create HTTP client: {0}")]
    Client(String),

    /// The request could not be completed (DNS, connect, timeout, read).
    #[error("request to {url} failed: {reason}")]
    Transport { url: String, reason: String },
}

/// An HTTP response with enough metadata for fallback policies.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    /// HTTP status code.
    pub status: u16,
    /// Value of the `Content-Type` header, if present.
    pub content_type: Option<String>,
    /// Response body.
    pub body: Vec<u8>,
}

impl HttpResponse {
    /// Returns true for 2xx statuses.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Returns true if the content type declares an image.
    pub fn is_image(&self) -> bool {
        self.content_type
            .as_deref()
            .map(|ct| ct.contains("image"))
            .unwrap_or(false)
    }
}

/// Trait for asynchronous HTTP GET operations.
///
/// This abstraction allows for dependency injection and easier testing by
/// enabling mock HTTP clients in tests.
pub trait AsyncHttpClient: Send + Sync {
    /// Performs an HTTP GET request.
    ///
    /// # Arguments
    ///
    /// * `url` - The URL to request
    ///
    /// # Returns
    ///
    /// The response (any status) or a transport error.
    fn get(&self, url: &str) -> impl Future<Output = Result<HttpResponse, FetchError>> + Send;
}

/// Shared clients delegate to the inner implementation.
impl<T: AsyncHttpClient> AsyncHttpClient for std::sync::Arc<T> {
    async fn get(&self, url: &str) -> Result<HttpResponse, FetchError> {
        (**self).get(url).await
    }
}

/// Real HTTP client implementation using reqwest.
#[derive(Debug, Clone)]
pub struct AsyncReqwestClient {
    client: reqwest::Client,
}

impl AsyncReqwestClient {
    /// Creates a new client with the default timeout.
    pub fn new() -> Result<Self, FetchError> {
        Self::with_timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
    }

    /// Creates a new client with a custom request timeout.
    pub fn with_timeout(timeout: Duration) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| FetchError::Client(e.to_string()))?;

        Ok(Self { client })
    }
}

impl AsyncHttpClient for AsyncReqwestClient {
    async fn get(&self, url: &str) -> Result<HttpResponse, FetchError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| FetchError::Transport {
                url: url.to_string(),
                reason: e.to_string(),
            })?;

        let status = response.status().as_u16();
        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|v| v.to_string());

        let body = response
            .bytes()
            .await
            .map_err(|e| FetchError::Transport {
                url: url.to_string(),
                reason: format!("failed to read response: {}", e),
            })?
            .to_vec();

        Ok(HttpResponse {
            status,
            content_type,
            body,
        })
    }
}

#[cfg(test)]
pub mod tests {
    use super::*;
    use std::sync::Mutex;

    /// Mock HTTP client for testing.
    ///
    /// Routes are matched by substring against the requested URL, in
    /// insertion order. Unmatched URLs yield a transport error, and every
    /// requested URL is recorded for assertions.
    pub struct MockAsyncHttpClient {
        routes: Vec<(String, Result<HttpResponse, FetchError>)>,
        pub requests: Mutex<Vec<String>>,
    }

    impl MockAsyncHttpClient {
        pub fn new() -> Self {
            Self {
                routes: Vec::new(),
                requests: Mutex::new(Vec::new()),
            }
        }

        /// Registers a response for URLs containing `pattern`.
        pub fn on(mut self, pattern: &str, response: Result<HttpResponse, FetchError>) -> Self {
            self.routes.push((pattern.to_string(), response));
            self
        }

        /// Registers a successful response with the given content type.
        pub fn on_ok(self, pattern: &str, content_type: &str, body: Vec<u8>) -> Self {
            self.on(
                pattern,
                Ok(HttpResponse {
                    status: 200,
                    content_type: Some(content_type.to_string()),
                    body,
                }),
            )
        }

        /// Registers a status-only response with an empty body.
        pub fn on_status(self, pattern: &str, status: u16) -> Self {
            self.on(
                pattern,
                Ok(HttpResponse {
                    status,
                    content_type: None,
                    body: Vec::new(),
                }),
            )
        }

        /// Returns the number of requests issued so far.
        pub fn request_count(&self) -> usize {
            self.requests.lock().unwrap().len()
        }
    }

    impl AsyncHttpClient for MockAsyncHttpClient {
        async fn get(&self, url: &str) -> Result<HttpResponse, FetchError> {
            self.requests.lock().unwrap().push(url.to_string());

            for (pattern, response) in &self.routes {
                if url.contains(pattern.as_str()) {
                    return response.clone();
                }
            }

            Err(FetchError::Transport {
                url: url.to_string(),
                reason: "no mock route".to_string(),
            })
        }
    }

    #[tokio::test]
    async fn test_mock_client_routes_by_substring() {
        let mock = MockAsyncHttpClient::new()
            .on_ok("tiles/", "image/tiff", vec![1, 2, 3])
            .on_status("missing/", 404);

        let hit = mock.get("https://example.com/tiles/a.tif").await.unwrap();
        assert_eq!(hit.status, 200);
        assert_eq!(hit.body, vec![1, 2, 3]);
        assert!(hit.is_image());

        let miss = mock.get("https://example.com/missing/b.tif").await.unwrap();
        assert_eq!(miss.status, 404);
        assert!(!miss.is_success());

        assert_eq!(mock.request_count(), 2);
    }

    #[tokio::test]
    async fn test_mock_client_unmatched_is_transport_error() {
        let mock = MockAsyncHttpClient::new();
        let result = mock.get("https://example.com/unknown").await;
        assert!(matches!(result, Err(FetchError::Transport { .. })));
    }

    #[test]
    fn test_is_image_checks_content_type() {
        let response = HttpResponse {
            status: 200,
            content_type: Some("image/png".to_string()),
            body: Vec::new(),
        };
        assert!(response.is_image());

        let xml = HttpResponse {
            status: 200,
            content_type: Some("text/xml".to_string()),
            body: Vec::new(),
        };
        assert!(!xml.is_image());
    }
}
