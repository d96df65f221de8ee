//! Pagination types shared by every listing page

use serde::{Deserialize, Serialize};

/// Pagination parameters for list queries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListParams {
    /// Page number (1-indexed)
    pub page: u32,
    /// Number of items per page
    pub per_page: u32,
}

impl Default for ListParams {
    fn default() -> Self {
        Self {
            page: 1,
            per_page: 10,
        }
    }
}

impl ListParams {
    /// Create new pagination parameters
    pub fn new(page: u32, per_page: u32) -> Self {
        Self {
            page: page.max(1),
            per_page: per_page.clamp(1, 100),
        }
    }

    /// Parse a raw `?page=` value. Anything that is not a positive integer
    /// selects the first page.
    pub fn from_query(raw: Option<&str>, per_page: u32) -> Self {
        let page = raw
            .and_then(|p| p.trim().parse::<u32>().ok())
            .filter(|p| *p > 0)
            .unwrap_or(1);
        Self::new(page, per_page)
    }

    /// Clamp the page number to the last page for `total` items.
    /// An empty listing still has one (empty) page.
    pub fn clamp_to(self, total: i64) -> Self {
        let last = last_page(total, self.per_page);
        Self {
            page: self.page.min(last),
            per_page: self.per_page,
        }
    }

    /// Calculate the offset for database queries
    pub fn offset(&self) -> i64 {
        (self.page.saturating_sub(1) as i64) * self.per_page as i64
    }

    /// Get the limit for database queries
    pub fn limit(&self) -> i64 {
        self.per_page as i64
    }
}

fn last_page(total: i64, per_page: u32) -> u32 {
    if total <= 0 || per_page == 0 {
        return 1;
    }
    let per_page = per_page as i64;
    (((total + per_page - 1) / per_page) as u32).max(1)
}

/// Paginated result container
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PagedResult<T> {
    /// Items in the current page
    pub items: Vec<T>,
    /// Total number of items across all pages
    pub total: i64,
    /// Current page number (1-indexed)
    pub page: u32,
    /// Number of items per page
    pub per_page: u32,
}

impl<T> PagedResult<T> {
    /// Create a new paginated result
    pub fn new(items: Vec<T>, total: i64, params: &ListParams) -> Self {
        Self {
            items,
            total,
            page: params.page,
            per_page: params.per_page,
        }
    }

    /// Calculate the total number of pages (at least one)
    pub fn total_pages(&self) -> u32 {
        last_page(self.total, self.per_page)
    }

    /// Check if there is a next page
    pub fn has_next(&self) -> bool {
        self.page < self.total_pages()
    }

    /// Check if there is a previous page
    pub fn has_prev(&self) -> bool {
        self.page > 1
    }

    /// Summary for templates, without the items
    pub fn page_info(&self) -> PageInfo {
        PageInfo {
            number: self.page,
            total_pages: self.total_pages(),
            total: self.total,
            has_next: self.has_next(),
            has_prev: self.has_prev(),
            next: self.has_next().then(|| self.page + 1),
            prev: self.has_prev().then(|| self.page - 1),
        }
    }
}

impl<T> Default for PagedResult<T> {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            total: 0,
            page: 1,
            per_page: 10,
        }
    }
}

/// Pager state handed to templates
#[derive(Debug, Clone, Serialize)]
pub struct PageInfo {
    pub number: u32,
    pub total_pages: u32,
    pub total: i64,
    pub has_next: bool,
    pub has_prev: bool,
    pub next: Option<u32>,
    pub prev: Option<u32>,
}
