//! Cache key definitions.

use crate::application::pagination::page_query_value;

/// Key for a cached global index response: the raw `page` query value.
///
/// `/` and `/?page=1` render the same page but are stored separately, as are
/// `?page=abc` and other values that resolve to page 1.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct IndexKey {
    page: Option<String>,
}

impl IndexKey {
    pub fn new(page: Option<&str>) -> Self {
        Self {
            page: page.map(str::to_string),
        }
    }

    /// Build a key from a request query string, ignoring unrelated parameters.
    pub fn from_query(query: Option<&str>) -> Self {
        Self {
            page: page_query_value(query),
        }
    }

    pub fn page(&self) -> Option<&str> {
        self.page.as_deref()
    }
}
