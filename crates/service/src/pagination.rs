//! Pagination utilities for list endpoints
//!
//! `Pagination` deserializes straight from `?page=&per_page=` query strings.

use serde::{Deserialize, Serialize};

/// Pagination parameters
#[derive(Clone, Copy, Debug, Deserialize)]
#[serde(default)]
pub struct Pagination {
    /// 1-based page index
    pub page: u32,
    /// items per page
    pub per_page: u32,
}

impl Pagination {
    /// Clamp to sane defaults and convert to a 0-based page index for `fetch_page`
    pub fn normalize(self) -> (u64, u64) {
        let page = if self.page == 0 { 1 } else { self.page };
        let per_page = self.per_page.clamp(1, 100);
        ((page - 1) as u64, per_page as u64)
    }
}

impl Default for Pagination {
    fn default() -> Self { Self { page: 1, per_page: 20 } }
}

/// One page of results plus the totals needed to render pagers.
#[derive(Clone, Debug, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub page: u64,
    pub per_page: u64,
    pub total_items: u64,
    pub total_pages: u64,
}

#[cfg(test)]
mod tests {
    use super::Pagination;

    #[test]
    fn normalize_clamps_zero_to_defaults() {
        let (idx, per) = Pagination { page: 0, per_page: 0 }.normalize();
        assert_eq!(idx, 0);
        assert_eq!(per, 1);
    }

    #[test]
    fn normalize_clamps_upper_bound() {
        let (idx, per) = Pagination { page: 5, per_page: 1000 }.normalize();
        assert_eq!(idx, 4);
        assert_eq!(per, 100);
    }

    #[test]
    fn missing_query_fields_use_defaults() {
        let p: Pagination = serde_json::from_str(r#"{"page": 3}"#).unwrap();
        assert_eq!(p.page, 3);
        assert_eq!(p.per_page, 20);
    }
}
