//! Page-number pagination helpers.
//!
//! Pages are 1-based. A requested page is clamped into `1..=num_pages`, and an
//! empty collection still has exactly one (empty) page.

use serde::Serialize;
use url::form_urlencoded;

/// Raw `page` value from a request query string. When the parameter repeats,
/// the last occurrence wins.
pub fn page_query_value(query: Option<&str>) -> Option<String> {
    let query = query?;
    form_urlencoded::parse(query.as_bytes())
        .filter(|(name, _)| name == "page")
        .last()
        .map(|(_, value)| value.into_owned())
}

/// Requested page number for a request query string.
pub fn page_from_query(query: Option<&str>) -> u64 {
    parse_page_param(page_query_value(query).as_deref())
}

/// Parse the raw `page` query value. Anything that is not a positive integer
/// resolves to the first page; numbers too large for `u64` saturate so they
/// clamp to the last page.
pub fn parse_page_param(raw: Option<&str>) -> u64 {
    let Some(value) = raw.map(str::trim) else {
        return 1;
    };
    let digits = value.strip_prefix('+').unwrap_or(value);
    if digits.is_empty() || !digits.bytes().all(|byte| byte.is_ascii_digit()) {
        return 1;
    }
    digits.parse::<u64>().unwrap_or(u64::MAX).max(1)
}

/// Window into an ordered collection, computed from its total size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageWindow {
    pub number: u64,
    pub num_pages: u64,
    pub per_page: u64,
    pub total: u64,
}

impl PageWindow {
    pub fn resolve(requested: u64, total: u64, per_page: u64) -> Self {
        let per_page = per_page.max(1);
        let num_pages = total.div_ceil(per_page).max(1);
        let number = requested.clamp(1, num_pages);
        Self {
            number,
            num_pages,
            per_page,
            total,
        }
    }

    pub fn offset(&self) -> u64 {
        (self.number - 1) * self.per_page
    }

    pub fn limit(&self) -> u64 {
        self.per_page
    }
}

/// A single page of results plus the navigation data templates need.
#[derive(Debug, Clone, Serialize)]
pub struct NumberedPage<T> {
    pub items: Vec<T>,
    pub number: u64,
    pub num_pages: u64,
    pub total: u64,
}

impl<T> NumberedPage<T> {
    pub fn new(items: Vec<T>, window: PageWindow) -> Self {
        Self {
            items,
            number: window.number,
            num_pages: window.num_pages,
            total: window.total,
        }
    }

    pub fn has_previous(&self) -> bool {
        self.number > 1
    }

    pub fn has_next(&self) -> bool {
        self.number < self.num_pages
    }

    pub fn previous_page_number(&self) -> Option<u64> {
        self.has_previous().then(|| self.number - 1)
    }

    pub fn next_page_number(&self) -> Option<u64> {
        self.has_next().then(|| self.number + 1)
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> NumberedPage<U> {
        NumberedPage {
            items: self.items.into_iter().map(f).collect(),
            number: self.number,
            num_pages: self.num_pages,
            total: self.total,
        }
    }
}
