use chrono::DateTime;
use std::collections::HashSet;

use super::FetchFailure;
use crate::api::RemoteArticle;
use crate::storage::NewCachedArticle;

/// Set each candidate's bookmark flag to "a bookmark with this exact title
/// exists". Order and every other field are left as they are.
pub fn apply_bookmark_flags(
    bookmarked_titles: &HashSet<String>,
    candidates: Vec<NewCachedArticle>,
) -> Vec<NewCachedArticle> {
    candidates
        .into_iter()
        .map(|mut article| {
            article.is_bookmarked = bookmarked_titles.contains(&article.title);
            article
        })
        .collect()
}

/// Convert a remote article into a cache record, unflagged.
pub(crate) fn to_cache_record(remote: RemoteArticle) -> Result<NewCachedArticle, FetchFailure> {
    let published = DateTime::parse_from_rfc3339(&remote.published_at).map_err(|source| {
        FetchFailure::InvalidDate {
            title: remote.title.clone(),
            value: remote.published_at.clone(),
            source,
        }
    })?;

    Ok(NewCachedArticle {
        source_name: remote.source.name,
        title: remote.title,
        description: remote.description,
        image_url: remote.image_url,
        published,
        is_bookmarked: false,
    })
}

/// Convert a whole batch; one malformed date rejects all of it.
pub(crate) fn to_cache_records(
    articles: Vec<RemoteArticle>,
) -> Result<Vec<NewCachedArticle>, FetchFailure> {
    articles.into_iter().map(to_cache_record).collect()
}
