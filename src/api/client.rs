use futures::StreamExt;
use reqwest::redirect::Policy;
use secrecy::{ExposeSecret, SecretString};
use std::time::Duration;
use thiserror::Error;
use url::Url;

use super::types::{ApiErrorBody, NewsApiResponse};
use super::NewsSource;
use crate::config::Config;

pub const DEFAULT_BASE_URL: &str = "https://newsapi.org/v2/";

/// Categories accepted by `/top-headlines`.
pub const CATEGORIES: &[&str] = &[
    "business",
    "entertainment",
    "general",
    "health",
    "science",
    "sports",
    "technology",
];

const MAX_RESPONSE_SIZE: usize = 5 * 1024 * 1024; // 5MB
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(20);

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Request timed out after {0:?}")]
    Timeout(Duration),
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),
    #[error("HTTP error: status {0}")]
    HttpStatus(u16),
    #[error("News API error ({code}): {message}")]
    Api { code: String, message: String },
    #[error("Response too large (exceeds {0} bytes)")]
    ResponseTooLarge(usize),
    #[error("Malformed response: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("Invalid base URL: {0}")]
    InvalidBaseUrl(#[from] url::ParseError),
    #[error("Insecure base URL: HTTPS required (except localhost for testing)")]
    InsecureBaseUrl,
    #[error("No News API key configured (set NEWS_API_KEY or api_key in config.toml)")]
    MissingApiKey,
}

/// HTTP client for the news API.
pub struct NewsClient {
    http: reqwest::Client,
    base_url: Url,
    api_key: Option<SecretString>,
    timeout: Duration,
}

impl std::fmt::Debug for NewsClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NewsClient")
            .field("base_url", &self.base_url.as_str())
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl NewsClient {
    /// Build a client against `base_url`.
    ///
    /// The base URL must be HTTPS so the key never travels in clear text;
    /// plain HTTP is only accepted for localhost (mock servers in tests).
    pub fn new(
        http: reqwest::Client,
        base_url: &str,
        api_key: SecretString,
    ) -> Result<Self, ApiError> {
        Ok(Self {
            http,
            base_url: parse_base_url(base_url)?,
            api_key: Some(api_key),
            timeout: DEFAULT_TIMEOUT,
        })
    }

    /// Build a client from the loaded configuration.
    ///
    /// A missing key is not an error here so the cached tables stay usable
    /// offline; requests fail with [`ApiError::MissingApiKey`] instead.
    pub fn from_config(http: reqwest::Client, config: &Config) -> Result<Self, ApiError> {
        let api_key = config.api_key();
        if api_key.is_none() {
            tracing::warn!("No News API key configured, fetching is disabled");
        }
        Ok(Self {
            http,
            base_url: parse_base_url(&config.base_url)?,
            api_key,
            timeout: Duration::from_secs(config.request_timeout_secs),
        })
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    fn endpoint(&self, path: &str, params: &[(&str, &str)]) -> Result<Url, ApiError> {
        let mut url = self.base_url.join(path)?;
        url.query_pairs_mut().extend_pairs(params);
        Ok(url)
    }

    async fn get(&self, url: Url) -> Result<NewsApiResponse, ApiError> {
        let api_key = self.api_key.as_ref().ok_or(ApiError::MissingApiKey)?;
        tracing::debug!(endpoint = %url.path(), "News API request");

        let request = self
            .http
            .get(url)
            .header("X-Api-Key", api_key.expose_secret());

        // deadline covers the body too, not just the headers
        let exchange = async {
            let response = request.send().await.map_err(ApiError::Network)?;
            let status = response.status();
            let body = read_limited_bytes(response, MAX_RESPONSE_SIZE).await?;
            Ok::<_, ApiError>((status, body))
        };
        let (status, body) = tokio::time::timeout(self.timeout, exchange)
            .await
            .map_err(|_| ApiError::Timeout(self.timeout))??;

        if !status.is_success() {
            return Err(match serde_json::from_slice::<ApiErrorBody>(&body) {
                Ok(err) => ApiError::Api {
                    code: err.code,
                    message: err.message,
                },
                Err(_) => ApiError::HttpStatus(status.as_u16()),
            });
        }

        match serde_json::from_slice::<NewsApiResponse>(&body) {
            Ok(parsed) => {
                tracing::debug!(
                    total = parsed.total_results,
                    returned = parsed.articles.len(),
                    "News API response"
                );
                Ok(parsed)
            }
            Err(decode_err) => match serde_json::from_slice::<ApiErrorBody>(&body) {
                // 200 with an error envelope
                Ok(err) if err.status == "error" => Err(ApiError::Api {
                    code: err.code,
                    message: err.message,
                }),
                _ => Err(ApiError::Decode(decode_err)),
            },
        }
    }
}

#[async_trait::async_trait]
impl NewsSource for NewsClient {
    async fn search(&self, query: &str) -> Result<NewsApiResponse, ApiError> {
        let url = self.endpoint("everything", &[("q", query)])?;
        self.get(url).await
    }

    async fn top_headlines(&self, category: &str) -> Result<NewsApiResponse, ApiError> {
        let url = self.endpoint("top-headlines", &[("category", category)])?;
        self.get(url).await
    }
}

/// Shared HTTP client for the API.
///
/// Redirects are capped at 3 and may never leave HTTPS, since every request
/// carries the API key in a header.
pub fn build_http_client() -> Result<reqwest::Client, reqwest::Error> {
    reqwest::Client::builder()
        .redirect(redirect_policy())
        .user_agent(concat!("offnews/", env!("CARGO_PKG_VERSION")))
        .pool_idle_timeout(Duration::from_secs(30))
        .build()
}

fn redirect_policy() -> Policy {
    Policy::custom(|attempt| {
        if attempt.previous().len() >= 3 {
            return attempt.error("Too many redirects (max 3)");
        }
        let url = attempt.url();
        if url.scheme() != "https" {
            return attempt.error("Refusing redirect away from HTTPS");
        }
        tracing::debug!(
            to = %url,
            hop = attempt.previous().len() + 1,
            "Following redirect"
        );
        attempt.follow()
    })
}

fn parse_base_url(base: &str) -> Result<Url, ApiError> {
    // Url::join drops the last path segment unless it ends in '/'
    let normalized = if base.ends_with('/') {
        base.to_string()
    } else {
        format!("{}/", base)
    };
    let url = Url::parse(&normalized)?;

    match url.scheme() {
        "https" => Ok(url),
        "http" if matches!(url.host_str(), Some("localhost" | "127.0.0.1")) => {
            tracing::warn!(base_url = %url, "Using non-HTTPS News API base URL (localhost only)");
            Ok(url)
        }
        _ => {
            tracing::error!(base_url = %base, "Rejecting non-HTTPS base URL");
            Err(ApiError::InsecureBaseUrl)
        }
    }
}

async fn read_limited_bytes(
    response: reqwest::Response,
    limit: usize,
) -> Result<Vec<u8>, ApiError> {
    if let Some(len) = response.content_length() {
        if len as usize > limit {
            return Err(ApiError::ResponseTooLarge(limit));
        }
    }

    let mut bytes = Vec::new();
    let mut stream = response.bytes_stream();
    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(ApiError::Network)?;
        if bytes.len().saturating_add(chunk.len()) > limit {
            return Err(ApiError::ResponseTooLarge(limit));
        }
        bytes.extend_from_slice(&chunk);
    }
    Ok(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const BODY: &str = r#"{
        "status": "ok",
        "totalResults": 2,
        "articles": [
            {"source":{"id":"bbc-news","name":"BBC News"},"author":"A","title":"First",
             "description":"d1","url":"https://e.com/1","urlToImage":null,
             "publishedAt":"2024-05-01T10:00:00Z","content":"c1"},
            {"source":{"id":null,"name":"Reuters"},"author":null,"title":"Second",
             "description":null,"url":"https://e.com/2","urlToImage":"https://e.com/2.jpg",
             "publishedAt":"2024-05-01T11:00:00Z","content":null}
        ]
    }"#;

    fn client_for(server: &MockServer) -> NewsClient {
        NewsClient::new(
            reqwest::Client::new(),
            &server.uri(),
            SecretString::from("test-key"),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_top_headlines_success() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/top-headlines"))
            .and(query_param("category", "general"))
            .and(header("X-Api-Key", "test-key"))
            .respond_with(ResponseTemplate::new(200).set_body_string(BODY))
            .expect(1)
            .mount(&server)
            .await;

        let response = client_for(&server).top_headlines("general").await.unwrap();
        assert_eq!(response.total_results, 2);
        assert_eq!(response.articles.len(), 2);
        assert_eq!(response.articles[1].source.name, "Reuters");
    }

    #[tokio::test]
    async fn test_search_encodes_query() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/everything"))
            .and(query_param("q", "rust & wasm"))
            .respond_with(ResponseTemplate::new(200).set_body_string(BODY))
            .expect(1)
            .mount(&server)
            .await;

        let response = client_for(&server).search("rust & wasm").await.unwrap();
        assert_eq!(response.articles[0].title, "First");
    }

    #[tokio::test]
    async fn test_base_url_with_path_prefix() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v2/top-headlines"))
            .respond_with(ResponseTemplate::new(200).set_body_string(BODY))
            .mount(&server)
            .await;

        let client = NewsClient::new(
            reqwest::Client::new(),
            &format!("{}/v2", server.uri()),
            SecretString::from("k"),
        )
        .unwrap();
        assert!(client.top_headlines("science").await.is_ok());
    }

    #[tokio::test]
    async fn test_error_envelope_on_401() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(401).set_body_string(
                r#"{"status":"error","code":"apiKeyInvalid","message":"Your API key is invalid."}"#,
            ))
            .mount(&server)
            .await;

        let err = client_for(&server).search("x").await.unwrap_err();
        match err {
            ApiError::Api { code, message } => {
                assert_eq!(code, "apiKeyInvalid");
                assert!(message.contains("invalid"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_plain_500_is_http_status() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
            .mount(&server)
            .await;

        let err = client_for(&server).top_headlines("general").await.unwrap_err();
        assert!(matches!(err, ApiError::HttpStatus(500)));
    }

    #[tokio::test]
    async fn test_error_envelope_with_200() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string(
                r#"{"status":"error","code":"rateLimited","message":"Too many requests"}"#,
            ))
            .mount(&server)
            .await;

        let err = client_for(&server).top_headlines("general").await.unwrap_err();
        assert!(matches!(err, ApiError::Api { ref code, .. } if code == "rateLimited"));
    }

    #[tokio::test]
    async fn test_garbage_body_is_decode_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>nope</html>"))
            .mount(&server)
            .await;

        let err = client_for(&server).top_headlines("general").await.unwrap_err();
        assert!(matches!(err, ApiError::Decode(_)));
    }

    #[tokio::test]
    async fn test_oversized_response_rejected() {
        let server = MockServer::start().await;
        let huge = "x".repeat(MAX_RESPONSE_SIZE + 1);
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string(huge))
            .mount(&server)
            .await;

        let err = client_for(&server).top_headlines("general").await.unwrap_err();
        assert!(matches!(err, ApiError::ResponseTooLarge(_)));
    }

    #[tokio::test]
    async fn test_timeout() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string(BODY)
                    .set_delay(Duration::from_secs(2)),
            )
            .mount(&server)
            .await;

        let client = client_for(&server).with_timeout(Duration::from_millis(100));
        let err = client.top_headlines("general").await.unwrap_err();
        assert!(matches!(err, ApiError::Timeout(_)));
        assert_eq!(err.to_string(), "Request timed out after 100ms");
    }

    #[tokio::test]
    async fn test_timeout_covers_stalled_body() {
        use tokio::io::{AsyncReadExt, AsyncWriteExt};

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let server = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut request = [0u8; 1024];
            let _ = socket.read(&mut request).await;
            socket
                .write_all(b"HTTP/1.1 200 OK\r\nContent-Length: 100000\r\n\r\n{\"status\":")
                .await
                .unwrap();
            tokio::time::sleep(Duration::from_secs(30)).await;
            drop(socket);
        });

        let client = NewsClient::new(
            reqwest::Client::new(),
            &format!("http://127.0.0.1:{}", addr.port()),
            SecretString::from("test-key"),
        )
        .unwrap()
        .with_timeout(Duration::from_millis(200));

        let result = tokio::time::timeout(Duration::from_secs(5), client.top_headlines("general"))
            .await
            .expect("request should give up on its own");
        assert!(matches!(result, Err(ApiError::Timeout(_))));
        server.abort();
    }

    #[test]
    fn test_http_base_url_rejected() {
        let result = NewsClient::new(
            reqwest::Client::new(),
            "http://evil.example.com/v2/",
            SecretString::from("k"),
        );
        assert!(matches!(result, Err(ApiError::InsecureBaseUrl)));
    }

    #[test]
    fn test_https_base_url_allowed() {
        let client = NewsClient::new(
            reqwest::Client::new(),
            DEFAULT_BASE_URL,
            SecretString::from("k"),
        )
        .unwrap();
        assert_eq!(
            client.endpoint("everything", &[("q", "a b")]).unwrap().as_str(),
            "https://newsapi.org/v2/everything?q=a+b"
        );
    }

    #[test]
    fn test_invalid_base_url() {
        let result = NewsClient::new(reqwest::Client::new(), "not a url", SecretString::from("k"));
        assert!(matches!(result, Err(ApiError::InvalidBaseUrl(_))));
    }

    #[tokio::test]
    async fn test_missing_key_fails_without_request() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string(BODY))
            .expect(0)
            .mount(&server)
            .await;

        let config = Config {
            api_key: None,
            base_url: server.uri(),
            ..Config::default()
        };
        let client = NewsClient {
            api_key: None,
            ..NewsClient::from_config(reqwest::Client::new(), &config).unwrap()
        };
        let err = client.top_headlines("general").await.unwrap_err();
        assert!(matches!(err, ApiError::MissingApiKey));
    }

    #[test]
    fn test_from_config_applies_timeout() {
        let config = Config {
            request_timeout_secs: 7,
            ..Config::default()
        };
        let client = NewsClient::from_config(reqwest::Client::new(), &config).unwrap();
        assert_eq!(client.timeout, Duration::from_secs(7));
        assert_eq!(client.base_url.as_str(), DEFAULT_BASE_URL);
    }

    #[test]
    fn test_debug_redacts_key() {
        let client = NewsClient::new(
            reqwest::Client::new(),
            DEFAULT_BASE_URL,
            SecretString::from("super-secret-key-12345"),
        )
        .unwrap();
        let debug = format!("{:?}", client);
        assert!(!debug.contains("super-secret-key-12345"));
        assert!(debug.contains("[REDACTED]"));
    }
}
