use chrono::format::{Item, StrftimeItems};
use chrono::{DateTime, FixedOffset, SecondsFormat};
use std::fmt::Write;

/// ISO-8601 with offset, `Z` for UTC: `2024-05-01T12:00:00Z`.
pub fn format_date(published: &DateTime<FixedOffset>) -> String {
    published.to_rfc3339_opts(SecondsFormat::AutoSi, true)
}

/// Format with a strftime `pattern`. An empty or invalid pattern falls back
/// to [`format_date`].
pub fn format_date_with(published: &DateTime<FixedOffset>, pattern: &str) -> String {
    let items: Vec<Item<'_>> = StrftimeItems::new(pattern).collect();
    if pattern.trim().is_empty() || items.iter().any(|item| matches!(item, Item::Error)) {
        tracing::warn!(pattern = %pattern, "Invalid date pattern, using ISO-8601");
        return format_date(published);
    }

    let mut out = String::new();
    match write!(out, "{}", published.format_with_items(items.iter())) {
        Ok(()) => out,
        Err(_) => {
            tracing::warn!(pattern = %pattern, "Date pattern failed to render, using ISO-8601");
            format_date(published)
        }
    }
}

/// Renders publication timestamps for display, with an optional strftime
/// pattern from the configuration.
#[derive(Debug, Clone, Default)]
pub struct DateFormatter {
    pattern: Option<String>,
}

impl DateFormatter {
    pub fn new(pattern: Option<String>) -> Self {
        Self { pattern }
    }

    pub fn format(&self, published: &DateTime<FixedOffset>) -> String {
        match &self.pattern {
            Some(pattern) => format_date_with(published, pattern),
            None => format_date(published),
        }
    }
}
