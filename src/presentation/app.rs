use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use super::state::{AppState, WindowWidthClass};
use crate::api::NewsSource;
use crate::domain::{Article, ArticleError, NewsTab, NewsUseCases};

/// Application-level view-model: tab, selected article, loading and
/// connectivity flags.
pub struct MainViewModel<S> {
    use_cases: NewsUseCases<S>,
    default_category: String,
    state: Arc<watch::Sender<AppState>>,
}

impl<S> Clone for MainViewModel<S> {
    fn clone(&self) -> Self {
        Self {
            use_cases: self.use_cases.clone(),
            default_category: self.default_category.clone(),
            state: Arc::clone(&self.state),
        }
    }
}

impl<S: NewsSource + 'static> MainViewModel<S> {
    pub fn new(use_cases: NewsUseCases<S>, default_category: impl Into<String>) -> Self {
        Self {
            use_cases,
            default_category: default_category.into(),
            state: Arc::new(watch::channel(AppState::default()).0),
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<AppState> {
        self.state.subscribe()
    }

    pub fn state(&self) -> AppState {
        self.state.borrow().clone()
    }

    /// Fetch headlines into the cache, raising the loading flag meanwhile.
    pub async fn fetch_top_headlines(&self, category: &str) -> Result<usize, ArticleError> {
        self.state.send_modify(|s| s.is_loading = true);
        let result = self.use_cases.fetch_top_headlines(category).await;
        self.state.send_modify(|s| s.is_loading = false);

        match &result {
            Ok(count) => tracing::info!(category = %category, count, "Top headlines fetched"),
            Err(e) => tracing::warn!(category = %category, error = %e, "Top headlines fetch failed"),
        }
        result
    }

    pub fn update_selected_article(&self, article: Article) {
        self.state.send_modify(|s| s.current_article = Some(article));
    }

    pub fn update_selected_tab(&self, tab: NewsTab) {
        self.state.send_modify(|s| s.current_tab = tab);
    }

    pub fn update_window_width(&self, width: u32) {
        let class = WindowWidthClass::from_width(width);
        self.state.send_if_modified(|s| {
            let changed = s.width_class != class;
            s.width_class = class;
            changed
        });
    }

    /// Refresh the default category. Errors are logged and dropped.
    pub async fn on_network_available(&self) {
        let category = self.default_category.clone();
        let _ = self.fetch_top_headlines(&category).await;
    }

    /// Mirror `online` into the offline flag and refetch on every transition
    /// to online, including an online initial value.
    pub fn drive_connectivity(&self, mut online: watch::Receiver<bool>) -> JoinHandle<()> {
        let vm = self.clone();
        tokio::spawn(async move {
            let mut was_online = *online.borrow_and_update();
            vm.state.send_modify(|s| s.is_offline = !was_online);
            if was_online {
                vm.on_network_available().await;
            }

            while online.changed().await.is_ok() {
                let now_online = *online.borrow_and_update();
                vm.state.send_modify(|s| s.is_offline = !now_online);
                if now_online && !was_online {
                    tracing::info!("Back online, refreshing headlines");
                    vm.on_network_available().await;
                }
                was_online = now_online;
            }
        })
    }
}
