//! News API client.
//!
//! Two read-only endpoints: free-text search over `/everything` and
//! per-category `/top-headlines`. The repository depends on the
//! [`NewsSource`] trait rather than the concrete client so it can be driven
//! by a fake in tests.
mod client;
mod types;

pub use client::{build_http_client, ApiError, NewsClient, CATEGORIES, DEFAULT_BASE_URL};
pub use types::{NewsApiResponse, RemoteArticle, Source};

#[async_trait::async_trait]
pub trait NewsSource: Send + Sync {
    /// Free-text search across all articles.
    async fn search(&self, query: &str) -> Result<NewsApiResponse, ApiError>;

    /// Current top headlines for a category such as `"general"`.
    async fn top_headlines(&self, category: &str) -> Result<NewsApiResponse, ApiError>;
}
