//! Shared fixtures for unit tests.
use std::collections::VecDeque;
use std::sync::Mutex;

use crate::api::{ApiError, NewsApiResponse, NewsSource, RemoteArticle, Source};
use crate::domain::{DateFormatter, NewsUseCases};
use crate::repository::NewsRepository;
use crate::storage::Database;

/// Replays canned responses in order, then answers 503.
#[derive(Default)]
pub(crate) struct FakeSource {
    responses: Mutex<VecDeque<Result<NewsApiResponse, ApiError>>>,
}

impl FakeSource {
    pub(crate) fn with(responses: Vec<Result<NewsApiResponse, ApiError>>) -> Self {
        Self {
            responses: Mutex::new(responses.into()),
        }
    }

    fn next(&self) -> Result<NewsApiResponse, ApiError> {
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Err(ApiError::HttpStatus(503)))
    }
}

#[async_trait::async_trait]
impl NewsSource for FakeSource {
    async fn search(&self, _query: &str) -> Result<NewsApiResponse, ApiError> {
        self.next()
    }

    async fn top_headlines(&self, _category: &str) -> Result<NewsApiResponse, ApiError> {
        self.next()
    }
}

pub(crate) fn remote(title: &str, published_at: &str) -> RemoteArticle {
    RemoteArticle {
        source: Source {
            id: None,
            name: "Wire".to_string(),
        },
        author: None,
        title: title.to_string(),
        description: Some(format!("{title} body")),
        url: format!("https://news.example.com/{title}"),
        image_url: None,
        published_at: published_at.to_string(),
        content: None,
    }
}

pub(crate) fn response(titles: &[&str]) -> NewsApiResponse {
    NewsApiResponse {
        status: "ok".to_string(),
        total_results: titles.len() as u32,
        articles: titles
            .iter()
            .map(|t| remote(t, "2024-05-01T12:00:00Z"))
            .collect(),
    }
}

pub(crate) async fn repository(
    responses: Vec<Result<NewsApiResponse, ApiError>>,
) -> NewsRepository<FakeSource> {
    let db = Database::open(":memory:").await.unwrap();
    NewsRepository::new(FakeSource::with(responses), db)
}

pub(crate) async fn use_cases(
    responses: Vec<Result<NewsApiResponse, ApiError>>,
) -> NewsUseCases<FakeSource> {
    NewsUseCases::new(repository(responses).await, DateFormatter::default())
}
