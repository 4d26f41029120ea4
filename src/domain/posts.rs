//! Presentation-independent helpers for post text and timestamps.

use time::{OffsetDateTime, format_description::FormatItem, macros::format_description};

/// Characters of post text used when a post is shown as a short label.
pub const LABEL_LIMIT_CHARS: usize = 15;
/// Characters of post text used as the detail page title.
pub const TITLE_LIMIT_CHARS: usize = 30;

pub const HUMAN_DATE_FORMAT: &[FormatItem<'static>] =
    format_description!("[day padding:none] [month repr:long] [year]");

/// Truncate text to at most `limit` characters, respecting char boundaries.
pub fn truncate_chars(text: &str, limit: usize) -> &str {
    match text.char_indices().nth(limit) {
        Some((index, _)) => &text[..index],
        None => text,
    }
}

pub fn label(text: &str) -> &str {
    truncate_chars(text, LABEL_LIMIT_CHARS)
}

pub fn title(text: &str) -> &str {
    truncate_chars(text, TITLE_LIMIT_CHARS)
}

pub fn format_human_date(value: OffsetDateTime) -> String {
    value
        .format(HUMAN_DATE_FORMAT)
        .unwrap_or_else(|_| value.date().to_string())
}
