//! Per-screen view-models.
//!
//! Each view-model owns a `watch` channel with its screen state. `start`
//! sets the state to loading and spawns a task that folds the matching
//! use-case stream into it; identical consecutive states are not re-sent.
use futures::StreamExt;
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use super::state::{BookmarkUiState, DetailsUiState, HomeUiState, ScreenState, SearchUiState};
use crate::api::NewsSource;
use crate::domain::{Article, ArticleError, NewsTab, NewsUseCases};

/// Apply `update` and notify receivers only if the state actually changed.
fn publish<T: Clone + PartialEq>(state: &watch::Sender<T>, update: impl FnOnce(&mut T)) {
    state.send_if_modified(|current| {
        let before = current.clone();
        update(current);
        *current != before
    });
}

// ============================================================================
// Home
// ============================================================================

pub struct HomeViewModel<S> {
    use_cases: NewsUseCases<S>,
    state: Arc<watch::Sender<HomeUiState>>,
}

impl<S: NewsSource + 'static> HomeViewModel<S> {
    pub fn new(use_cases: NewsUseCases<S>) -> Self {
        Self {
            use_cases,
            state: Arc::new(watch::channel(HomeUiState::default()).0),
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<HomeUiState> {
        self.state.subscribe()
    }

    pub fn state(&self) -> HomeUiState {
        self.state.borrow().clone()
    }

    /// Follow the article cache until the returned task is aborted.
    pub fn start(&self) -> JoinHandle<()> {
        publish(&self.state, |s| s.screen_state = ScreenState::Loading);
        let state = Arc::clone(&self.state);
        let mut articles = Box::pin(self.use_cases.cached_articles());
        tokio::spawn(async move {
            while let Some(result) = articles.next().await {
                match &result {
                    Ok(list) => tracing::debug!(count = list.len(), "Home articles updated"),
                    Err(e) => tracing::debug!(error = %e, "Home articles unavailable"),
                }
                publish(&state, |s| s.apply(result));
            }
        })
    }

    pub fn set_currently_selected_article(&self, article: Article) {
        publish(&self.state, |s| s.current_selected_article = Some(article));
    }
}

// ============================================================================
// Bookmarks
// ============================================================================

pub struct BookmarkViewModel<S> {
    use_cases: NewsUseCases<S>,
    state: Arc<watch::Sender<BookmarkUiState>>,
}

impl<S: NewsSource + 'static> BookmarkViewModel<S> {
    pub fn new(use_cases: NewsUseCases<S>) -> Self {
        Self {
            use_cases,
            state: Arc::new(watch::channel(BookmarkUiState::default()).0),
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<BookmarkUiState> {
        self.state.subscribe()
    }

    pub fn state(&self) -> BookmarkUiState {
        self.state.borrow().clone()
    }

    pub fn start(&self) -> JoinHandle<()> {
        publish(&self.state, |s| s.screen_state = ScreenState::Loading);
        let state = Arc::clone(&self.state);
        let mut bookmarks = Box::pin(self.use_cases.bookmarked_articles());
        tokio::spawn(async move {
            while let Some(result) = bookmarks.next().await {
                if let Err(e) = &result {
                    tracing::debug!(error = %e, "Bookmarks unavailable");
                }
                publish(&state, |s| s.apply(result));
            }
        })
    }
}

// ============================================================================
// Details
// ============================================================================

pub struct DetailsViewModel<S> {
    use_cases: NewsUseCases<S>,
    state: Arc<watch::Sender<DetailsUiState>>,
}

impl<S: NewsSource + 'static> DetailsViewModel<S> {
    pub fn new(use_cases: NewsUseCases<S>) -> Self {
        Self {
            use_cases,
            state: Arc::new(watch::channel(DetailsUiState::default()).0),
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<DetailsUiState> {
        self.state.subscribe()
    }

    pub fn state(&self) -> DetailsUiState {
        self.state.borrow().clone()
    }

    /// Follow article `id` in the table behind `tab`.
    pub fn load(&self, id: i64, tab: NewsTab) -> JoinHandle<()> {
        let state = Arc::clone(&self.state);
        let mut article = self.use_cases.article_stream(id, tab);
        tokio::spawn(async move {
            while let Some(result) = article.next().await {
                if let Err(e) = &result {
                    tracing::debug!(id, error = %e, "Failed to get article");
                }
                publish(&state, |s| s.apply(result));
            }
        })
    }

    pub async fn toggle_bookmark(&self, article: &Article) -> Result<(), ArticleError> {
        self.use_cases.toggle_bookmark(article).await.map_err(|e| {
            tracing::warn!(id = article.id, error = %e, "Failed to toggle bookmark");
            e
        })
    }
}

// ============================================================================
// Search
// ============================================================================

pub struct SearchViewModel<S> {
    use_cases: NewsUseCases<S>,
    state: Arc<watch::Sender<SearchUiState>>,
}

impl<S: NewsSource + 'static> SearchViewModel<S> {
    pub fn new(use_cases: NewsUseCases<S>) -> Self {
        Self {
            use_cases,
            state: Arc::new(watch::channel(SearchUiState::default()).0),
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<SearchUiState> {
        self.state.subscribe()
    }

    pub fn state(&self) -> SearchUiState {
        self.state.borrow().clone()
    }

    pub fn update_search_query(&self, query: &str) {
        publish(&self.state, |s| s.search_query = query.to_string());
    }

    /// Search for the current query. Results land in the article cache; a
    /// failure is logged and leaves the state as it was.
    pub async fn search_news(&self) {
        let query = self.state.borrow().search_query.clone();
        match self.use_cases.search_news(&query).await {
            Ok(articles) => {
                tracing::info!(query = %query, count = articles.len(), "Search completed");
                publish(&self.state, |s| s.is_search_completed = true);
            }
            Err(e) => tracing::warn!(query = %query, error = %e, "Search failed"),
        }
    }

    pub fn reset_search_state(&self) {
        publish(&self.state, |s| *s = SearchUiState::default());
    }
}
