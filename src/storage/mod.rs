mod bookmarks;
mod cached;
mod observe;
mod schema;
mod types;

pub use schema::Database;
pub use types::{BookmarkedArticle, CachedArticle, DatabaseError, NewCachedArticle, Table};
