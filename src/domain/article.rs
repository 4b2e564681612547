use chrono::{DateTime, FixedOffset, Utc};

use super::dates::DateFormatter;
use crate::storage::{BookmarkedArticle, CachedArticle};

/// An article ready for display, built from either table.
#[derive(Debug, Clone, PartialEq)]
pub struct Article {
    pub id: i64,
    pub source_name: String,
    /// Empty when the source had none.
    pub description: String,
    pub title: String,
    pub image_url: Option<String>,
    pub published: DateTime<FixedOffset>,
    pub published_display: String,
    pub is_bookmarked: bool,
}

impl Default for Article {
    fn default() -> Self {
        Self {
            id: 0,
            source_name: String::new(),
            description: String::new(),
            title: String::new(),
            image_url: None,
            published: DateTime::<Utc>::default().fixed_offset(),
            published_display: String::new(),
            is_bookmarked: false,
        }
    }
}

impl Article {
    pub fn from_cached(row: CachedArticle, dates: &DateFormatter) -> Self {
        Self {
            id: row.id,
            source_name: row.source_name,
            description: row.description.unwrap_or_default(),
            title: row.title,
            image_url: row.image_url,
            published_display: dates.format(&row.published),
            published: row.published,
            is_bookmarked: row.is_bookmarked,
        }
    }

    pub fn from_bookmarked(row: BookmarkedArticle, dates: &DateFormatter) -> Self {
        Self {
            id: row.id,
            source_name: row.source_name,
            description: row.description.unwrap_or_default(),
            title: row.title,
            image_url: row.image_url,
            published_display: dates.format(&row.published),
            published: row.published,
            is_bookmarked: true,
        }
    }

    /// The bookmark row for this article. It keeps the article's id.
    pub fn to_bookmark(&self) -> BookmarkedArticle {
        BookmarkedArticle {
            id: self.id,
            source_name: self.source_name.clone(),
            title: self.title.clone(),
            description: (!self.description.is_empty()).then(|| self.description.clone()),
            image_url: self.image_url.clone(),
            published: self.published,
        }
    }
}
