//! Display model and use cases on top of the repository.
mod article;
mod dates;
mod use_cases;

pub use article::Article;
pub use dates::{format_date, format_date_with, DateFormatter};
pub use use_cases::{
    select_article, ArticleError, NewsTab, NewsUseCases, ARTICLE_NOT_FOUND,
    NO_BOOKMARKED_ARTICLES, NO_NEWS_ARTICLES,
};
