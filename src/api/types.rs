use serde::Deserialize;

/// Envelope returned by both `/everything` and `/top-headlines`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewsApiResponse {
    pub status: String,
    pub total_results: u32,
    pub articles: Vec<RemoteArticle>,
}

/// An article exactly as the API sends it.
///
/// `published_at` stays a string here; it is parsed when the article is
/// turned into a cache record.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RemoteArticle {
    pub source: Source,
    pub author: Option<String>,
    pub title: String,
    pub description: Option<String>,
    pub url: String,
    #[serde(rename = "urlToImage")]
    pub image_url: Option<String>,
    #[serde(rename = "publishedAt")]
    pub published_at: String,
    pub content: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Source {
    pub id: Option<String>,
    pub name: String,
}

/// Body of a failed request: `{"status":"error","code":"...","message":"..."}`.
#[derive(Debug, Deserialize)]
pub(crate) struct ApiErrorBody {
    pub status: String,
    pub code: String,
    pub message: String,
}
