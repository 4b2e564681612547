//! Offline-first news reader.
//!
//! Headlines and search results from NewsAPI are cached in SQLite next to a
//! durable bookmark table; the cache's bookmark flags are kept in step with
//! the bookmarks by title.
pub mod api;
pub mod config;
pub mod connectivity;
pub mod domain;
pub mod presentation;
pub mod repository;
pub mod storage;

#[cfg(test)]
mod testing;
