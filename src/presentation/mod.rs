//! View-models and their screen state.
mod app;
mod screens;
mod state;

pub use app::MainViewModel;
pub use screens::{BookmarkViewModel, DetailsViewModel, HomeViewModel, SearchViewModel};
pub use state::{
    AppState, BookmarkUiState, DetailsUiState, HomeUiState, NavigationLayout, ScreenState,
    SearchUiState, WindowWidthClass,
};
