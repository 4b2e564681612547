use sqlx::{QueryBuilder, Sqlite, SqliteConnection};

use super::schema::Database;
use super::types::{CachedArticle, DatabaseError, NewCachedArticle, Table};

/// 6 bound columns per row keeps a batch far below SQLite's 999 parameter limit.
const INSERT_BATCH_SIZE: usize = 50;

const SELECT_CACHED: &str = r#"
    SELECT id, source_name, title, description, image_url, published_date, is_bookmarked
    FROM cached_articles
"#;

impl Database {
    // ========================================================================
    // Cache Mutations
    // ========================================================================

    /// Insert cache records, returns how many rows were written.
    pub async fn insert_cached_articles(
        &self,
        articles: &[NewCachedArticle],
    ) -> Result<usize, DatabaseError> {
        if articles.is_empty() {
            return Ok(0);
        }

        let mut tx = self.pool.begin().await?;
        let inserted = insert_batches(&mut tx, articles).await?;
        tx.commit().await?;

        self.notify(Table::Cached);
        Ok(inserted)
    }

    /// Delete every cached article.
    pub async fn clear_cached_articles(&self) -> Result<u64, DatabaseError> {
        let result = sqlx::query("DELETE FROM cached_articles")
            .execute(&self.pool)
            .await?;

        self.notify(Table::Cached);
        Ok(result.rows_affected())
    }

    /// Clear the cache and insert `articles` as one unit.
    ///
    /// Observers are notified once, after commit, so they go straight from
    /// the old set to the new one without seeing an empty table.
    pub async fn replace_cached_articles(
        &self,
        articles: &[NewCachedArticle],
    ) -> Result<usize, DatabaseError> {
        let mut tx = self.pool.begin().await?;

        let cleared = sqlx::query("DELETE FROM cached_articles")
            .execute(&mut *tx)
            .await?
            .rows_affected();
        let inserted = insert_batches(&mut tx, articles).await?;

        tx.commit().await?;
        tracing::debug!(cleared, inserted, "Replaced article cache");

        self.notify(Table::Cached);
        Ok(inserted)
    }

    /// Set the bookmark flag of every cached article with this exact title.
    pub async fn update_bookmark_status_by_title(
        &self,
        title: &str,
        is_bookmarked: bool,
    ) -> Result<u64, DatabaseError> {
        let result = sqlx::query("UPDATE cached_articles SET is_bookmarked = ? WHERE title = ?")
            .bind(is_bookmarked)
            .bind(title)
            .execute(&self.pool)
            .await?;

        self.notify(Table::Cached);
        Ok(result.rows_affected())
    }

    // ========================================================================
    // Cache Queries
    // ========================================================================

    /// All cached articles in insertion order.
    pub async fn get_all_cached_articles(&self) -> Result<Vec<CachedArticle>, DatabaseError> {
        let rows = sqlx::query_as::<_, CachedArticle>(&format!("{SELECT_CACHED} ORDER BY id"))
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    pub async fn get_cached_article_by_id(
        &self,
        article_id: i64,
    ) -> Result<Option<CachedArticle>, DatabaseError> {
        let row = sqlx::query_as::<_, CachedArticle>(&format!("{SELECT_CACHED} WHERE id = ?"))
            .bind(article_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    /// The oldest row of the cache, if any.
    pub async fn get_first_cached_article(&self) -> Result<Option<CachedArticle>, DatabaseError> {
        let row = sqlx::query_as::<_, CachedArticle>(&format!("{SELECT_CACHED} ORDER BY id LIMIT 1"))
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }
}

async fn insert_batches(
    conn: &mut SqliteConnection,
    articles: &[NewCachedArticle],
) -> Result<usize, DatabaseError> {
    let mut inserted = 0;
    for chunk in articles.chunks(INSERT_BATCH_SIZE) {
        let mut builder: QueryBuilder<Sqlite> = QueryBuilder::new(
            "INSERT INTO cached_articles \
             (source_name, title, description, image_url, published_date, is_bookmarked) ",
        );
        builder.push_values(chunk, |mut b, article| {
            b.push_bind(&article.source_name)
                .push_bind(&article.title)
                .push_bind(&article.description)
                .push_bind(&article.image_url)
                .push_bind(article.published)
                .push_bind(article.is_bookmarked);
        });
        inserted += builder.build().execute(&mut *conn).await?.rows_affected() as usize;
    }
    Ok(inserted)
}
