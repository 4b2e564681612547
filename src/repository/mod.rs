//! News repository.
//!
//! Sits between the API client and the local store. A fetch converts the
//! remote articles, copies bookmark flags onto them by title and swaps the
//! cache contents in one transaction. Bookmarking writes the bookmark row and
//! then mirrors the flag onto the cache; the two writes are independent, and
//! any drift between them is healed by the next fetch.
mod reconcile;

pub use reconcile::apply_bookmark_flags;

use futures::{Stream, StreamExt};
use std::sync::Arc;
use thiserror::Error;

use crate::api::{ApiError, NewsApiResponse, NewsSource};
use crate::domain::Article;
use crate::storage::{BookmarkedArticle, CachedArticle, Database, DatabaseError, Table};

#[derive(Debug, Error)]
pub enum RepositoryError {
    /// The fetch failed before the cache was touched.
    #[error("No internet connection available")]
    NoNetwork(#[source] FetchFailure),

    #[error(transparent)]
    Storage(#[from] DatabaseError),
}

/// Why a fetch was rejected.
#[derive(Debug, Error)]
pub enum FetchFailure {
    #[error(transparent)]
    Api(#[from] ApiError),

    #[error("Invalid published date {value:?} on \"{title}\": {source}")]
    InvalidDate {
        title: String,
        value: String,
        #[source]
        source: chrono::ParseError,
    },
}

impl From<FetchFailure> for RepositoryError {
    fn from(failure: FetchFailure) -> Self {
        RepositoryError::NoNetwork(failure)
    }
}

/// Result of a lookup by id that falls back to the first row.
#[derive(Debug, Clone, PartialEq)]
pub enum Lookup<T> {
    /// The row with the requested id.
    Exact(T),
    /// The requested id was absent; this is the first row of the table.
    Fallback(T),
}

impl<T> Lookup<T> {
    pub fn into_inner(self) -> T {
        match self {
            Lookup::Exact(v) | Lookup::Fallback(v) => v,
        }
    }

    pub fn is_exact(&self) -> bool {
        matches!(self, Lookup::Exact(_))
    }
}

pub struct NewsRepository<S> {
    source: Arc<S>,
    db: Database,
}

impl<S> Clone for NewsRepository<S> {
    fn clone(&self) -> Self {
        Self {
            source: Arc::clone(&self.source),
            db: self.db.clone(),
        }
    }
}

impl<S: NewsSource + 'static> NewsRepository<S> {
    pub fn new(source: S, db: Database) -> Self {
        Self {
            source: Arc::new(source),
            db,
        }
    }

    pub fn database(&self) -> &Database {
        &self.db
    }

    // ========================================================================
    // Fetching
    // ========================================================================

    /// Search the API, replace the cache with the results and return the new
    /// cache contents.
    pub async fn search_news(&self, query: &str) -> Result<Vec<CachedArticle>, RepositoryError> {
        tracing::info!(query = %query, "Searching news");
        let response = self.source.search(query).await.map_err(FetchFailure::from)?;
        self.replace_cache(response).await?;
        Ok(self.db.get_all_cached_articles().await?)
    }

    /// Fetch the top headlines of `category` into the cache and return how
    /// many rows were cached.
    pub async fn fetch_top_headlines(&self, category: &str) -> Result<usize, RepositoryError> {
        tracing::info!(category = %category, "Fetching top headlines");
        let response = self
            .source
            .top_headlines(category)
            .await
            .map_err(FetchFailure::from)?;
        self.replace_cache(response).await
    }

    async fn replace_cache(&self, response: NewsApiResponse) -> Result<usize, RepositoryError> {
        let candidates = reconcile::to_cache_records(response.articles)?;
        let titles = self.db.bookmarked_titles().await?;
        let records = apply_bookmark_flags(&titles, candidates);
        let flagged = records.iter().filter(|a| a.is_bookmarked).count();

        let inserted = self.db.replace_cached_articles(&records).await?;
        tracing::info!(
            inserted,
            flagged,
            total_results = response.total_results,
            "Article cache replaced"
        );
        Ok(inserted)
    }

    // ========================================================================
    // Bookmarks
    // ========================================================================

    /// Store `article` as a bookmark, then flag the matching cache rows.
    pub async fn bookmark_article(&self, article: &Article) -> Result<(), RepositoryError> {
        self.db
            .insert_bookmarked_article(&article.to_bookmark())
            .await?;
        let flagged = self
            .db
            .update_bookmark_status_by_title(&article.title, true)
            .await?;
        tracing::debug!(id = article.id, flagged, "Bookmarked article");
        Ok(())
    }

    /// Drop the bookmark with `article`'s title, then unflag the cache rows.
    pub async fn unbookmark_article(&self, article: &Article) -> Result<(), RepositoryError> {
        let removed = self
            .db
            .delete_bookmarked_article_by_title(&article.title)
            .await?;
        self.db
            .update_bookmark_status_by_title(&article.title, false)
            .await?;
        tracing::debug!(id = article.id, removed, "Removed bookmark");
        Ok(())
    }

    // ========================================================================
    // Lookups
    // ========================================================================

    /// The cached article with `id`, or the first cached article when absent.
    /// `None` only when the cache is empty.
    pub async fn get_cached_article(
        &self,
        id: i64,
    ) -> Result<Option<Lookup<CachedArticle>>, RepositoryError> {
        Ok(lookup_cached(&self.db, id).await?)
    }

    /// Same as [`Self::get_cached_article`] for the bookmarks table.
    pub async fn get_bookmarked_article(
        &self,
        id: i64,
    ) -> Result<Option<Lookup<BookmarkedArticle>>, RepositoryError> {
        Ok(lookup_bookmarked(&self.db, id).await?)
    }

    // ========================================================================
    // Streams
    // ========================================================================

    pub fn cached_articles(
        &self,
    ) -> impl Stream<Item = Result<Vec<CachedArticle>, RepositoryError>> + Send + 'static {
        self.db
            .cached_articles_stream()
            .map(|snapshot| snapshot.map_err(RepositoryError::from))
    }

    pub fn bookmarked_articles(
        &self,
    ) -> impl Stream<Item = Result<Vec<BookmarkedArticle>, RepositoryError>> + Send + 'static {
        self.db
            .bookmarked_articles_stream()
            .map(|snapshot| snapshot.map_err(RepositoryError::from))
    }

    /// Re-evaluates [`Self::get_cached_article`] on every cache change.
    pub fn cached_article(
        &self,
        id: i64,
    ) -> impl Stream<Item = Result<Option<Lookup<CachedArticle>>, RepositoryError>> + Send + 'static
    {
        self.db
            .observe(Table::Cached, move |db| async move { lookup_cached(&db, id).await })
            .map(|snapshot| snapshot.map_err(RepositoryError::from))
    }

    /// Re-evaluates [`Self::get_bookmarked_article`] on every bookmark change.
    pub fn bookmarked_article(
        &self,
        id: i64,
    ) -> impl Stream<Item = Result<Option<Lookup<BookmarkedArticle>>, RepositoryError>> + Send + 'static
    {
        self.db
            .observe(Table::Bookmarks, move |db| async move {
                lookup_bookmarked(&db, id).await
            })
            .map(|snapshot| snapshot.map_err(RepositoryError::from))
    }
}

async fn lookup_cached(
    db: &Database,
    id: i64,
) -> Result<Option<Lookup<CachedArticle>>, DatabaseError> {
    if let Some(article) = db.get_cached_article_by_id(id).await? {
        return Ok(Some(Lookup::Exact(article)));
    }
    let first = db.get_first_cached_article().await?;
    if first.is_some() {
        tracing::debug!(id, "Cached article not found, falling back to first row");
    }
    Ok(first.map(Lookup::Fallback))
}

async fn lookup_bookmarked(
    db: &Database,
    id: i64,
) -> Result<Option<Lookup<BookmarkedArticle>>, DatabaseError> {
    if let Some(article) = db.get_bookmarked_article_by_id(id).await? {
        return Ok(Some(Lookup::Exact(article)));
    }
    let first = db.get_first_bookmarked_article().await?;
    if first.is_some() {
        tracing::debug!(id, "Bookmark not found, falling back to first row");
    }
    Ok(first.map(Lookup::Fallback))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Article, DateFormatter};
    use crate::testing::{repository, response};
    use pretty_assertions::assert_eq;
    use std::time::Duration;

    fn flags(rows: &[CachedArticle]) -> Vec<(String, bool)> {
        rows.iter()
            .map(|r| (r.title.clone(), r.is_bookmarked))
            .collect()
    }

    #[tokio::test]
    async fn test_fetch_fills_cache() {
        let repo = repository(vec![Ok(response(&["One", "Two", "Three"]))]).await;
        assert_eq!(repo.fetch_top_headlines("general").await.unwrap(), 3);

        let rows = repo.database().get_all_cached_articles().await.unwrap();
        assert_eq!(
            flags(&rows),
            vec![
                ("One".to_string(), false),
                ("Two".to_string(), false),
                ("Three".to_string(), false)
            ]
        );
    }

    #[tokio::test]
    async fn test_search_returns_new_cache_contents() {
        let repo = repository(vec![
            Ok(response(&["Old"])),
            Ok(response(&["Rust 2.0", "Cargo news"])),
        ])
        .await;
        repo.fetch_top_headlines("general").await.unwrap();

        let results = repo.search_news("rust").await.unwrap();
        let titles: Vec<&str> = results.iter().map(|r| r.title.as_str()).collect();
        assert_eq!(titles, vec!["Rust 2.0", "Cargo news"]);
    }

    #[tokio::test]
    async fn test_empty_fetch_empties_cache_but_keeps_bookmarks() {
        let repo = repository(vec![Ok(response(&["Stale"])), Ok(response(&[]))]).await;
        repo.fetch_top_headlines("general").await.unwrap();
        let row = repo.database().get_all_cached_articles().await.unwrap()[0].clone();
        repo.bookmark_article(&Article::from_cached(row, &DateFormatter::default()))
            .await
            .unwrap();

        assert_eq!(repo.fetch_top_headlines("general").await.unwrap(), 0);
        assert!(repo.database().get_all_cached_articles().await.unwrap().is_empty());
        assert_eq!(repo.get_cached_article(1).await.unwrap(), None);

        let bookmarks = repo.database().get_all_bookmarked_articles().await.unwrap();
        assert_eq!(bookmarks.len(), 1);
        assert_eq!(bookmarks[0].title, "Stale");
    }

    #[tokio::test]
    async fn test_api_failure_is_no_network_and_keeps_cache() {
        let repo = repository(vec![Ok(response(&["Kept"]))]).await;
        repo.fetch_top_headlines("general").await.unwrap();

        let err = repo.fetch_top_headlines("general").await.unwrap_err();
        assert!(matches!(
            err,
            RepositoryError::NoNetwork(FetchFailure::Api(ApiError::HttpStatus(503)))
        ));
        assert_eq!(err.to_string(), "No internet connection available");

        let rows = repo.database().get_all_cached_articles().await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].title, "Kept");
    }

    #[tokio::test]
    async fn test_bad_date_is_no_network_and_keeps_cache() {
        let mut broken = response(&["A", "B"]);
        broken.articles[1].published_at = "not a date".to_string();
        let repo = repository(vec![Ok(response(&["Kept"])), Ok(broken)]).await;
        repo.fetch_top_headlines("general").await.unwrap();

        let err = repo.fetch_top_headlines("general").await.unwrap_err();
        assert!(matches!(
            err,
            RepositoryError::NoNetwork(FetchFailure::InvalidDate { .. })
        ));

        let rows = repo.database().get_all_cached_articles().await.unwrap();
        assert_eq!(flags(&rows), vec![("Kept".to_string(), false)]);
    }

    #[tokio::test]
    async fn test_bookmark_then_unbookmark_restores_flag() {
        let repo = repository(vec![Ok(response(&["One", "Two"]))]).await;
        repo.fetch_top_headlines("general").await.unwrap();
        let dates = DateFormatter::default();

        let row = repo.database().get_all_cached_articles().await.unwrap()[1].clone();
        let article = Article::from_cached(row.clone(), &dates);

        repo.bookmark_article(&article).await.unwrap();
        let rows = repo.database().get_all_cached_articles().await.unwrap();
        assert_eq!(
            flags(&rows),
            vec![("One".to_string(), false), ("Two".to_string(), true)]
        );
        let saved = repo.database().get_all_bookmarked_articles().await.unwrap();
        assert_eq!(saved.len(), 1);
        assert_eq!(saved[0].id, row.id);
        assert_eq!(saved[0].description.as_deref(), Some("Two body"));

        repo.unbookmark_article(&article).await.unwrap();
        let rows = repo.database().get_all_cached_articles().await.unwrap();
        assert_eq!(
            flags(&rows),
            vec![("One".to_string(), false), ("Two".to_string(), false)]
        );
        assert!(repo
            .database()
            .get_all_bookmarked_articles()
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn test_refetch_carries_bookmark_by_title() {
        let repo = repository(vec![
            Ok(response(&["One", "Two", "Three"])),
            Ok(response(&["Two", "Four", "Five"])),
        ])
        .await;
        repo.fetch_top_headlines("general").await.unwrap();
        let row = repo.database().get_all_cached_articles().await.unwrap()[1].clone();
        repo.bookmark_article(&Article::from_cached(row, &DateFormatter::default()))
            .await
            .unwrap();

        repo.fetch_top_headlines("general").await.unwrap();
        let rows = repo.database().get_all_cached_articles().await.unwrap();
        assert_eq!(
            flags(&rows),
            vec![
                ("Two".to_string(), true),
                ("Four".to_string(), false),
                ("Five".to_string(), false)
            ]
        );
    }

    #[tokio::test]
    async fn test_lookup_exact_fallback_and_empty() {
        let repo = repository(vec![Ok(response(&["First", "Second"]))]).await;
        assert_eq!(repo.get_cached_article(1).await.unwrap(), None);
        assert_eq!(repo.get_bookmarked_article(1).await.unwrap(), None);

        repo.fetch_top_headlines("general").await.unwrap();
        let rows = repo.database().get_all_cached_articles().await.unwrap();

        let exact = repo.get_cached_article(rows[1].id).await.unwrap().unwrap();
        assert!(exact.is_exact());
        assert_eq!(exact.into_inner().title, "Second");

        let fallback = repo.get_cached_article(9_999).await.unwrap().unwrap();
        assert!(!fallback.is_exact());
        assert_eq!(fallback.into_inner().title, "First");
    }

    #[tokio::test]
    async fn test_bookmarked_lookup_falls_back() {
        let repo = repository(vec![Ok(response(&["Only"]))]).await;
        repo.fetch_top_headlines("general").await.unwrap();
        let row = repo.database().get_all_cached_articles().await.unwrap()[0].clone();
        repo.bookmark_article(&Article::from_cached(row.clone(), &DateFormatter::default()))
            .await
            .unwrap();

        let saved = repo.database().get_all_bookmarked_articles().await.unwrap();
        let hit = repo.get_bookmarked_article(row.id + 100).await.unwrap();
        assert_eq!(hit, Some(Lookup::Fallback(saved[0].clone())));
    }

    #[tokio::test]
    async fn test_cached_article_stream_follows_refetch() {
        let repo = repository(vec![
            Ok(response(&["Before"])),
            Ok(response(&["After"])),
        ])
        .await;
        repo.fetch_top_headlines("general").await.unwrap();
        let id = repo.database().get_all_cached_articles().await.unwrap()[0].id;

        let mut stream = Box::pin(repo.cached_article(id));
        let first = tokio::time::timeout(Duration::from_secs(5), stream.next())
            .await
            .unwrap()
            .unwrap()
            .unwrap()
            .unwrap();
        assert!(first.is_exact());
        assert_eq!(first.into_inner().title, "Before");

        repo.fetch_top_headlines("general").await.unwrap();
        let second = tokio::time::timeout(Duration::from_secs(5), stream.next())
            .await
            .unwrap()
            .unwrap()
            .unwrap()
            .unwrap();
        // the old id is gone, the new first row stands in
        assert!(!second.is_exact());
        assert_eq!(second.into_inner().title, "After");
    }
}
