use sqlx::{
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
    SqlitePool,
};
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;

use super::types::{is_lock_message, DatabaseError, Table};

// ============================================================================
// Change Notification
// ============================================================================

/// Per-table revision counters.
///
/// Every committed write bumps the counter of the table it touched; observers
/// hold a `watch::Receiver` and re-query when it changes.
pub(crate) struct TableRevisions {
    cached: watch::Sender<u64>,
    bookmarks: watch::Sender<u64>,
}

impl TableRevisions {
    fn new() -> Self {
        Self {
            cached: watch::channel(0).0,
            bookmarks: watch::channel(0).0,
        }
    }

    fn sender(&self, table: Table) -> &watch::Sender<u64> {
        match table {
            Table::Cached => &self.cached,
            Table::Bookmarks => &self.bookmarks,
        }
    }
}

// ============================================================================
// Database
// ============================================================================

#[derive(Clone)]
pub struct Database {
    pub(crate) pool: SqlitePool,
    revisions: Arc<TableRevisions>,
}

impl Database {
    /// Open a database connection and run migrations
    ///
    /// `":memory:"` opens a private in-memory database (used by tests).
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError::InstanceLocked` if another process has the
    /// database locked, `DatabaseError::Migration` if the schema could not be
    /// created, and `DatabaseError::Other` for anything else.
    pub async fn open(path: &str) -> Result<Self, DatabaseError> {
        let url = format!("sqlite:{}?mode=rwc", path);

        // Create the file user-only before SQLite gets to it
        #[cfg(unix)]
        if path != ":memory:" {
            use std::os::unix::fs::{OpenOptionsExt, PermissionsExt};
            let db_path = std::path::Path::new(path);
            if db_path.exists() {
                let perms = std::fs::Permissions::from_mode(0o600);
                if let Err(e) = std::fs::set_permissions(db_path, perms) {
                    tracing::warn!(path = %path, error = %e, "Failed to set database file permissions");
                }
            } else if db_path.parent().is_some_and(|p| p.exists()) {
                // If creation fails, SQLite reports the error at connect time.
                let _file = std::fs::OpenOptions::new()
                    .write(true)
                    .create_new(true)
                    .mode(0o600)
                    .open(db_path)
                    .ok();
            }
        }

        let options = SqliteConnectOptions::from_str(&url)
            .map_err(DatabaseError::from_sqlx)?
            .pragma("busy_timeout", "5000");
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .acquire_timeout(Duration::from_secs(10))
            .connect_with(options)
            .await
            .map_err(DatabaseError::from_sqlx)?;

        let db = Self {
            pool,
            revisions: Arc::new(TableRevisions::new()),
        };
        db.migrate().await.map_err(|e| {
            if is_lock_message(&e.to_string()) {
                DatabaseError::InstanceLocked
            } else {
                DatabaseError::Migration(e.to_string())
            }
        })?;

        tracing::debug!(path = %path, "Database opened");
        Ok(db)
    }

    /// Create both tables inside one transaction. Idempotent.
    async fn migrate(&self) -> Result<(), sqlx::Error> {
        let mut tx = self.pool.begin().await?;

        // AUTOINCREMENT so ids are never handed out twice, even after the
        // table is cleared: bookmarks borrow these ids.
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS cached_articles (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                source_name TEXT NOT NULL,
                title TEXT NOT NULL,
                description TEXT,
                image_url TEXT,
                published_date TEXT NOT NULL,
                is_bookmarked INTEGER NOT NULL DEFAULT 0
            )
        "#,
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS bookmarked_articles (
                id INTEGER PRIMARY KEY,
                source_name TEXT NOT NULL,
                title TEXT NOT NULL,
                description TEXT,
                image_url TEXT,
                published_date TEXT NOT NULL
            )
        "#,
        )
        .execute(&mut *tx)
        .await?;

        // Both flag updates and unbookmarking go through the title
        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_cached_articles_title ON cached_articles(title)",
        )
        .execute(&mut *tx)
        .await?;
        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_bookmarked_articles_title ON bookmarked_articles(title)",
        )
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(())
    }

    /// Announce a committed write to every observer of `table`.
    pub(crate) fn notify(&self, table: Table) {
        self.revisions
            .sender(table)
            .send_modify(|rev| *rev = rev.wrapping_add(1));
        tracing::trace!(?table, "Table changed");
    }

    /// Subscribe to revisions of `table`. The receiver starts out marked as
    /// changed so the first `changed().await` resolves immediately.
    pub(crate) fn subscribe(&self, table: Table) -> watch::Receiver<u64> {
        let mut rx = self.revisions.sender(table).subscribe();
        rx.mark_changed();
        rx
    }
}
