//! Screen state structs and the reducers that fold use-case results into them.
use crate::domain::{select_article, Article, ArticleError, NewsTab};

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ScreenState {
    #[default]
    Loading,
    Success,
    Error(String),
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct HomeUiState {
    pub articles: Vec<Article>,
    pub current_selected_article: Option<Article>,
    pub screen_state: ScreenState,
}

impl HomeUiState {
    /// Keep the selection if its title is still listed, otherwise select the
    /// first article.
    pub fn apply(&mut self, result: Result<Vec<Article>, ArticleError>) {
        match result {
            Ok(articles) => {
                let selected = select_article(self.current_selected_article.as_ref(), &articles);
                self.current_selected_article = Some(selected);
                self.articles = articles;
                self.screen_state = ScreenState::Success;
            }
            Err(e) => self.screen_state = ScreenState::Error(e.to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct BookmarkUiState {
    pub bookmarks: Vec<Article>,
    pub screen_state: ScreenState,
}

impl BookmarkUiState {
    pub fn apply(&mut self, result: Result<Vec<Article>, ArticleError>) {
        match result {
            Ok(bookmarks) => {
                self.bookmarks = bookmarks;
                self.screen_state = ScreenState::Success;
            }
            Err(e) => self.screen_state = ScreenState::Error(e.to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct DetailsUiState {
    pub article: Option<Article>,
    pub screen_state: ScreenState,
}

impl DetailsUiState {
    pub fn apply(&mut self, result: Result<Option<Article>, ArticleError>) {
        match result {
            Ok(article) => {
                self.article = article;
                self.screen_state = ScreenState::Success;
            }
            Err(e) => self.screen_state = ScreenState::Error(e.to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SearchUiState {
    pub search_query: String,
    pub is_search_completed: bool,
}

/// Window width buckets, in density-independent pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WindowWidthClass {
    #[default]
    Compact,
    Medium,
    Expanded,
}

impl WindowWidthClass {
    pub fn from_width(width: u32) -> Self {
        match width {
            0..=599 => WindowWidthClass::Compact,
            600..=839 => WindowWidthClass::Medium,
            _ => WindowWidthClass::Expanded,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavigationLayout {
    BottomBar,
    NavigationRail,
}

/// Application-wide state shared by every screen.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct AppState {
    pub current_tab: NewsTab,
    pub current_article: Option<Article>,
    pub is_loading: bool,
    pub is_offline: bool,
    pub width_class: WindowWidthClass,
}

impl AppState {
    pub fn navigation_layout(&self) -> NavigationLayout {
        if self.width_class == WindowWidthClass::Compact {
            NavigationLayout::BottomBar
        } else {
            NavigationLayout::NavigationRail
        }
    }

    /// Tabs offered in the navigation. Search needs the expanded layout.
    pub fn available_tabs(&self) -> Vec<NewsTab> {
        let mut tabs = vec![NewsTab::Home, NewsTab::Bookmarks];
        if self.width_class == WindowWidthClass::Expanded {
            tabs.push(NewsTab::Search);
        }
        tabs
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::NO_NEWS_ARTICLES;
    use pretty_assertions::assert_eq;

    fn titled(id: i64, title: &str) -> Article {
        Article {
            id,
            title: title.to_string(),
            ..Article::default()
        }
    }

    #[test]
    fn test_home_keeps_selection_by_title() {
        let mut state = HomeUiState {
            current_selected_article: Some(titled(1, "B")),
            ..HomeUiState::default()
        };
        state.apply(Ok(vec![titled(5, "A"), titled(6, "B")]));
        assert_eq!(state.screen_state, ScreenState::Success);
        assert_eq!(state.current_selected_article, Some(titled(6, "B")));
        assert_eq!(state.articles.len(), 2);
    }

    #[test]
    fn test_home_selects_first_without_selection() {
        let mut state = HomeUiState::default();
        state.apply(Ok(vec![titled(5, "A"), titled(6, "B")]));
        assert_eq!(state.current_selected_article, Some(titled(5, "A")));
    }

    #[test]
    fn test_home_error_keeps_articles() {
        let mut state = HomeUiState::default();
        state.apply(Ok(vec![titled(5, "A")]));
        state.apply(Err(ArticleError::Empty(NO_NEWS_ARTICLES.to_string())));
        assert_eq!(
            state.screen_state,
            ScreenState::Error("No news articles available.".to_string())
        );
        assert_eq!(state.articles.len(), 1);
    }

    #[test]
    fn test_details_apply() {
        let mut state = DetailsUiState::default();
        assert_eq!(state.screen_state, ScreenState::Loading);
        state.apply(Ok(Some(titled(2, "X"))));
        assert_eq!(state.article, Some(titled(2, "X")));
        assert_eq!(state.screen_state, ScreenState::Success);
    }

    #[test]
    fn test_width_classes() {
        assert_eq!(WindowWidthClass::from_width(360), WindowWidthClass::Compact);
        assert_eq!(WindowWidthClass::from_width(600), WindowWidthClass::Medium);
        assert_eq!(WindowWidthClass::from_width(1280), WindowWidthClass::Expanded);
    }

    #[test]
    fn test_layout_and_tabs() {
        let compact = AppState::default();
        assert_eq!(compact.navigation_layout(), NavigationLayout::BottomBar);
        assert_eq!(compact.available_tabs(), vec![NewsTab::Home, NewsTab::Bookmarks]);

        let medium = AppState {
            width_class: WindowWidthClass::Medium,
            ..AppState::default()
        };
        assert_eq!(medium.navigation_layout(), NavigationLayout::NavigationRail);
        assert!(!medium.available_tabs().contains(&NewsTab::Search));

        let expanded = AppState {
            width_class: WindowWidthClass::Expanded,
            ..AppState::default()
        };
        assert!(expanded.available_tabs().contains(&NewsTab::Search));
    }
}
