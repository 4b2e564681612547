use chrono::{DateTime, FixedOffset};
use thiserror::Error;

// ============================================================================
// Error Types
// ============================================================================

/// Database-specific errors with user-friendly messages
#[derive(Debug, Error)]
pub enum DatabaseError {
    /// Another process holds a lock on the database file
    #[error("The offnews database is locked by another process. Please close it and try again.")]
    InstanceLocked,

    /// Migration failed
    #[error("Database migration failed: {0}")]
    Migration(String),

    /// Generic database error
    #[error("Database error: {0}")]
    Other(#[from] sqlx::Error),
}

impl DatabaseError {
    /// Check if a sqlx error indicates database locking
    pub(crate) fn from_sqlx(err: sqlx::Error) -> Self {
        if is_lock_message(&err.to_string()) {
            return DatabaseError::InstanceLocked;
        }
        DatabaseError::Other(err)
    }
}

/// SQLITE_BUSY (5), SQLITE_LOCKED (6) and SQLITE_CANTOPEN (14) all surface
/// as one of these messages.
pub(crate) fn is_lock_message(message: &str) -> bool {
    let message = message.to_lowercase();
    message.contains("database is locked")
        || message.contains("database table is locked")
        || message.contains("sqlite_busy")
        || message.contains("sqlite_locked")
        || message.contains("unable to open database file")
}

// ============================================================================
// Tables
// ============================================================================

/// The two observable tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Table {
    /// Rolling cache of the latest fetch, replaced wholesale.
    Cached,
    /// User-curated bookmarks, mutated one row at a time.
    Bookmarks,
}

// ============================================================================
// Data Structures
// ============================================================================

/// A row of `cached_articles`.
///
/// `is_bookmarked` mirrors "a bookmark with the same title exists" and is the
/// only column updated after insertion.
#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct CachedArticle {
    pub id: i64,
    pub source_name: String,
    pub title: String,
    pub description: Option<String>,
    pub image_url: Option<String>,
    #[sqlx(rename = "published_date")]
    pub published: DateTime<FixedOffset>,
    pub is_bookmarked: bool,
}

/// A cache record that has not been inserted yet (no id).
#[derive(Debug, Clone, PartialEq)]
pub struct NewCachedArticle {
    pub source_name: String,
    pub title: String,
    pub description: Option<String>,
    pub image_url: Option<String>,
    pub published: DateTime<FixedOffset>,
    pub is_bookmarked: bool,
}

/// A row of `bookmarked_articles`.
///
/// The id is taken from the article that was bookmarked, so a bookmark created
/// from the cache shares its id with the cache row it came from. Cache ids are
/// never reused, which keeps these ids unique across fetches.
#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct BookmarkedArticle {
    pub id: i64,
    pub source_name: String,
    pub title: String,
    pub description: Option<String>,
    pub image_url: Option<String>,
    #[sqlx(rename = "published_date")]
    pub published: DateTime<FixedOffset>,
}
