use futures::stream::{BoxStream, Stream, StreamExt};
use thiserror::Error;

use super::article::Article;
use super::dates::DateFormatter;
use crate::api::NewsSource;
use crate::repository::{NewsRepository, RepositoryError};

pub const NO_NEWS_ARTICLES: &str = "No news articles available.";
pub const NO_BOOKMARKED_ARTICLES: &str = "No bookmarked articles available.";
pub const ARTICLE_NOT_FOUND: &str = "Article not found. it is empty";

#[derive(Debug, Error)]
pub enum ArticleError {
    /// A read came back with nothing in it.
    #[error("{0}")]
    Empty(String),

    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

/// Which list an article was opened from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NewsTab {
    #[default]
    Home,
    Bookmarks,
    Search,
}

/// The article whose title matches the current selection, else the first
/// article, else a blank article.
pub fn select_article(current: Option<&Article>, articles: &[Article]) -> Article {
    current
        .and_then(|selected| articles.iter().find(|a| a.title == selected.title))
        .or_else(|| articles.first())
        .cloned()
        .unwrap_or_default()
}

/// Use cases over the repository, speaking in display [`Article`]s.
pub struct NewsUseCases<S> {
    repository: NewsRepository<S>,
    dates: DateFormatter,
}

impl<S> Clone for NewsUseCases<S> {
    fn clone(&self) -> Self {
        Self {
            repository: self.repository.clone(),
            dates: self.dates.clone(),
        }
    }
}

impl<S: NewsSource + 'static> NewsUseCases<S> {
    pub fn new(repository: NewsRepository<S>, dates: DateFormatter) -> Self {
        Self { repository, dates }
    }

    pub fn repository(&self) -> &NewsRepository<S> {
        &self.repository
    }

    pub fn dates(&self) -> &DateFormatter {
        &self.dates
    }

    pub async fn fetch_top_headlines(&self, category: &str) -> Result<usize, ArticleError> {
        Ok(self.repository.fetch_top_headlines(category).await?)
    }

    pub async fn search_news(&self, query: &str) -> Result<Vec<Article>, ArticleError> {
        let rows = self.repository.search_news(query).await?;
        Ok(rows
            .into_iter()
            .map(|row| Article::from_cached(row, &self.dates))
            .collect())
    }

    /// Unbookmark a flagged article, bookmark an unflagged one.
    pub async fn toggle_bookmark(&self, article: &Article) -> Result<(), ArticleError> {
        if article.is_bookmarked {
            self.repository.unbookmark_article(article).await?;
        } else {
            self.repository.bookmark_article(article).await?;
        }
        Ok(())
    }

    /// The cache as display articles; an empty cache is an error.
    pub fn cached_articles(
        &self,
    ) -> impl Stream<Item = Result<Vec<Article>, ArticleError>> + Send + 'static {
        let dates = self.dates.clone();
        self.repository
            .cached_articles()
            .map(move |snapshot| -> Result<Vec<Article>, ArticleError> {
                let rows = snapshot?;
                if rows.is_empty() {
                    return Err(ArticleError::Empty(NO_NEWS_ARTICLES.to_string()));
                }
                Ok(rows
                    .into_iter()
                    .map(|row| Article::from_cached(row, &dates))
                    .collect())
            })
    }

    /// The bookmarks as display articles; no bookmarks is an error.
    pub fn bookmarked_articles(
        &self,
    ) -> impl Stream<Item = Result<Vec<Article>, ArticleError>> + Send + 'static {
        let dates = self.dates.clone();
        self.repository
            .bookmarked_articles()
            .map(move |snapshot| -> Result<Vec<Article>, ArticleError> {
                let rows = snapshot?;
                if rows.is_empty() {
                    return Err(ArticleError::Empty(NO_BOOKMARKED_ARTICLES.to_string()));
                }
                Ok(rows
                    .into_iter()
                    .map(|row| Article::from_bookmarked(row, &dates))
                    .collect())
            })
    }

    /// Look an article up by id in the table behind `tab`.
    ///
    /// Both tables fall back to their first row. An empty cache gives
    /// `Ok(None)`, no bookmarks at all gives [`ArticleError::Empty`].
    pub async fn get_article(
        &self,
        id: i64,
        tab: NewsTab,
    ) -> Result<Option<Article>, ArticleError> {
        match tab {
            NewsTab::Home | NewsTab::Search => {
                let found = self.repository.get_cached_article(id).await?;
                Ok(found.map(|hit| Article::from_cached(hit.into_inner(), &self.dates)))
            }
            NewsTab::Bookmarks => {
                let found = self.repository.get_bookmarked_article(id).await?;
                bookmark_or_empty(found.map(|hit| hit.into_inner()), &self.dates).map(Some)
            }
        }
    }

    /// [`Self::get_article`], re-evaluated whenever the table changes.
    pub fn article_stream(
        &self,
        id: i64,
        tab: NewsTab,
    ) -> BoxStream<'static, Result<Option<Article>, ArticleError>> {
        let dates = self.dates.clone();
        match tab {
            NewsTab::Home | NewsTab::Search => self
                .repository
                .cached_article(id)
                .map(move |found| -> Result<Option<Article>, ArticleError> {
                    Ok(found?.map(|hit| Article::from_cached(hit.into_inner(), &dates)))
                })
                .boxed(),
            NewsTab::Bookmarks => self
                .repository
                .bookmarked_article(id)
                .map(move |found| -> Result<Option<Article>, ArticleError> {
                    bookmark_or_empty(found?.map(|hit| hit.into_inner()), &dates).map(Some)
                })
                .boxed(),
        }
    }
}

fn bookmark_or_empty(
    found: Option<crate::storage::BookmarkedArticle>,
    dates: &DateFormatter,
) -> Result<Article, ArticleError> {
    found
        .map(|row| Article::from_bookmarked(row, dates))
        .ok_or_else(|| ArticleError::Empty(ARTICLE_NOT_FOUND.to_string()))
}
