//! Table observation.
//!
//! Each stream yields one snapshot when polled for the first time and another
//! after every committed write to its table. Writes that land while a query
//! is running collapse into a single follow-up snapshot, so a slow consumer
//! always catches up to the latest state instead of replaying history.
use futures::stream::{self, Stream};
use std::future::Future;

use super::schema::Database;
use super::types::{BookmarkedArticle, CachedArticle, DatabaseError, Table};

impl Database {
    /// Re-run `query` every time `table` changes.
    pub fn observe<T, F, Fut>(
        &self,
        table: Table,
        query: F,
    ) -> impl Stream<Item = Result<T, DatabaseError>> + Send + 'static
    where
        T: Send + 'static,
        F: Fn(Database) -> Fut + Send + 'static,
        Fut: Future<Output = Result<T, DatabaseError>> + Send + 'static,
    {
        let rx = self.subscribe(table);
        stream::unfold(
            (self.clone(), rx, query),
            |(db, mut rx, query)| async move {
                // The sender lives inside `db`, so this only errors if the
                // revisions were torn down underneath us.
                rx.changed().await.ok()?;
                let snapshot = query(db.clone()).await;
                Some((snapshot, (db, rx, query)))
            },
        )
    }

    pub fn cached_articles_stream(
        &self,
    ) -> impl Stream<Item = Result<Vec<CachedArticle>, DatabaseError>> + Send + 'static {
        self.observe(Table::Cached, |db| async move {
            db.get_all_cached_articles().await
        })
    }

    pub fn bookmarked_articles_stream(
        &self,
    ) -> impl Stream<Item = Result<Vec<BookmarkedArticle>, DatabaseError>> + Send + 'static {
        self.observe(Table::Bookmarks, |db| async move {
            db.get_all_bookmarked_articles().await
        })
    }
}
