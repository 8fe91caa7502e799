//! Offset pagination for catalog browsing
//!
//! Pages are 1-based. `has_more` is computed exactly: stores are asked for one
//! row beyond the page and the extra row is dropped before returning.

use crate::error::MarqueeError;
use serde::{Deserialize, Serialize};

/// Fixed catalog page size
pub const DEFAULT_PAGE_SIZE: usize = 12;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    page: usize,
    page_size: usize,
}

impl PageRequest {
    pub fn new(page: usize, page_size: usize) -> Result<Self, MarqueeError> {
        if page == 0 {
            return Err(MarqueeError::validation_field(
                "page must be 1 or greater",
                "page",
            ));
        }
        if page_size == 0 {
            return Err(MarqueeError::validation_field(
                "page_size must be greater than 0",
                "page_size",
            ));
        }
        Ok(Self { page, page_size })
    }

    pub fn page(&self) -> usize {
        self.page
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    /// Rows to skip
    pub fn offset(&self) -> usize {
        (self.page - 1).saturating_mul(self.page_size)
    }

    /// Rows to request from the store (one extra to detect a next page)
    pub fn fetch_limit(&self) -> usize {
        self.page_size + 1
    }
}

/// Query string for catalog listing
#[derive(Debug, Clone, Deserialize)]
pub struct PageParams {
    pub page: Option<usize>,
}

impl PageParams {
    pub fn to_request(&self, page_size: usize) -> Result<PageRequest, MarqueeError> {
        PageRequest::new(self.page.unwrap_or(1), page_size)
    }
}

/// One page of catalog rows
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CatalogPage<T> {
    pub movies: Vec<T>,
    pub has_more: bool,
}

impl<T> CatalogPage<T> {
    /// Build a page from rows fetched with [`PageRequest::fetch_limit`]
    pub fn from_overfetch(mut rows: Vec<T>, request: &PageRequest) -> Self {
        let has_more = rows.len() > request.page_size();
        rows.truncate(request.page_size());
        Self {
            movies: rows,
            has_more,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_offset_is_one_based() {
        let first = PageRequest::new(1, 12).unwrap();
        let third = PageRequest::new(3, 12).unwrap();
        assert_eq!(first.offset(), 0);
        assert_eq!(third.offset(), 24);
        assert_eq!(third.fetch_limit(), 13);
    }

    #[test]
    fn test_page_zero_is_rejected() {
        assert!(PageRequest::new(0, 12).is_err());
    }

    #[test]
    fn test_exactly_full_last_page_has_no_more() {
        let request = PageRequest::new(1, 3).unwrap();
        let page = CatalogPage::from_overfetch(vec![1, 2, 3], &request);
        assert_eq!(page.movies.len(), 3);
        assert!(!page.has_more);
    }

    #[test]
    fn test_overfetched_row_signals_more() {
        let request = PageRequest::new(1, 3).unwrap();
        let page = CatalogPage::from_overfetch(vec![1, 2, 3, 4], &request);
        assert_eq!(page.movies, vec![1, 2, 3]);
        assert!(page.has_more);
    }

    #[test]
    fn test_missing_page_param_defaults_to_first() {
        let params = PageParams { page: None };
        assert_eq!(params.to_request(12).unwrap().page(), 1);
    }
}
