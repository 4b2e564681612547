use std::collections::HashSet;

use super::schema::Database;
use super::types::{BookmarkedArticle, DatabaseError, Table};

const SELECT_BOOKMARKED: &str = r#"
    SELECT id, source_name, title, description, image_url, published_date
    FROM bookmarked_articles
"#;

impl Database {
    // ========================================================================
    // Bookmark Mutations
    // ========================================================================

    /// Insert a bookmark, replacing any existing row with the same id.
    pub async fn insert_bookmarked_article(
        &self,
        article: &BookmarkedArticle,
    ) -> Result<(), DatabaseError> {
        sqlx::query(
            r#"
            INSERT INTO bookmarked_articles
                (id, source_name, title, description, image_url, published_date)
            VALUES (?, ?, ?, ?, ?, ?)
            ON CONFLICT(id) DO UPDATE SET
                source_name = excluded.source_name,
                title = excluded.title,
                description = excluded.description,
                image_url = excluded.image_url,
                published_date = excluded.published_date
        "#,
        )
        .bind(article.id)
        .bind(&article.source_name)
        .bind(&article.title)
        .bind(&article.description)
        .bind(&article.image_url)
        .bind(article.published)
        .execute(&self.pool)
        .await?;

        self.notify(Table::Bookmarks);
        Ok(())
    }

    /// Delete every bookmark with this exact title, returns how many went.
    pub async fn delete_bookmarked_article_by_title(
        &self,
        title: &str,
    ) -> Result<u64, DatabaseError> {
        let result = sqlx::query("DELETE FROM bookmarked_articles WHERE title = ?")
            .bind(title)
            .execute(&self.pool)
            .await?;

        self.notify(Table::Bookmarks);
        Ok(result.rows_affected())
    }

    // ========================================================================
    // Bookmark Queries
    // ========================================================================

    pub async fn get_all_bookmarked_articles(
        &self,
    ) -> Result<Vec<BookmarkedArticle>, DatabaseError> {
        let rows =
            sqlx::query_as::<_, BookmarkedArticle>(&format!("{SELECT_BOOKMARKED} ORDER BY id"))
                .fetch_all(&self.pool)
                .await?;
        Ok(rows)
    }

    pub async fn get_bookmarked_article_by_id(
        &self,
        article_id: i64,
    ) -> Result<Option<BookmarkedArticle>, DatabaseError> {
        let row =
            sqlx::query_as::<_, BookmarkedArticle>(&format!("{SELECT_BOOKMARKED} WHERE id = ?"))
                .bind(article_id)
                .fetch_optional(&self.pool)
                .await?;
        Ok(row)
    }

    /// The bookmark with the lowest id, if any.
    pub async fn get_first_bookmarked_article(
        &self,
    ) -> Result<Option<BookmarkedArticle>, DatabaseError> {
        let row = sqlx::query_as::<_, BookmarkedArticle>(&format!(
            "{SELECT_BOOKMARKED} ORDER BY id LIMIT 1"
        ))
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    /// Titles of every bookmark, for reconciling freshly fetched articles.
    pub async fn bookmarked_titles(&self) -> Result<HashSet<String>, DatabaseError> {
        let rows: Vec<(String,)> = sqlx::query_as("SELECT title FROM bookmarked_articles")
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(|(title,)| title).collect())
    }
}
