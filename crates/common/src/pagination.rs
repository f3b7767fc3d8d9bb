//! Page-number pagination shared by the service and HTTP layers.
//!
//! Provides a `Pagination` request struct, helpers to normalize inputs and a
//! `Page` container describing one slice of a result set.

use serde::Serialize;

pub const DEFAULT_PAGE_SIZE: u64 = 20;
pub const MAX_PAGE_SIZE: u64 = 100;

/// Pagination parameters
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Pagination {
    /// 1-based page index
    pub page: u64,
    /// items per page
    pub per_page: u64,
}

impl Pagination {
    pub fn new(page: u64, per_page: u64) -> Self {
        Self { page, per_page }
    }

    /// Clamp to sane defaults and return `(zero_based_page_index, per_page)`.
    pub fn normalize(self) -> (u64, u64) {
        let page = if self.page == 0 { 1 } else { self.page };
        let per_page = self.per_page.clamp(1, MAX_PAGE_SIZE);
        (page - 1, per_page)
    }

    /// Build from raw query-string values.
    ///
    /// A missing, unparsable or non-positive `page_size` falls back to the
    /// default; oversize values are capped. `page` is returned as given so the
    /// caller can reject out-of-range pages.
    pub fn from_query(page: Option<&str>, page_size: Option<&str>) -> Result<Self, InvalidPage> {
        let page = match page.map(str::trim).filter(|p| !p.is_empty()) {
            None => 1,
            Some("last") => u64::MAX,
            Some(raw) => match raw.parse::<u64>() {
                Ok(p) if p > 0 => p,
                _ => return Err(InvalidPage),
            },
        };
        let per_page = page_size
            .and_then(|s| s.trim().parse::<u64>().ok())
            .filter(|s| *s > 0)
            .map(|s| s.min(MAX_PAGE_SIZE))
            .unwrap_or(DEFAULT_PAGE_SIZE);
        Ok(Self { page, per_page })
    }
}

impl Default for Pagination {
    fn default() -> Self { Self { page: 1, per_page: DEFAULT_PAGE_SIZE } }
}

/// Requested page does not exist.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InvalidPage;

/// One page of results plus the totals needed to render navigation links.
#[derive(Debug, Clone, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    /// total number of matching rows across all pages
    pub total: u64,
    /// 1-based page index actually served
    pub page: u64,
    pub per_page: u64,
}

impl<T> Page<T> {
    pub fn num_pages(&self) -> u64 {
        num_pages(self.total, self.per_page)
    }

    pub fn has_next(&self) -> bool {
        self.page < self.num_pages()
    }

    pub fn has_previous(&self) -> bool {
        self.page > 1
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            total: self.total,
            page: self.page,
            per_page: self.per_page,
        }
    }
}

/// Number of pages for `total` rows; an empty result still has one (empty) page.
pub fn num_pages(total: u64, per_page: u64) -> u64 {
    let per_page = per_page.max(1);
    total.div_ceil(per_page).max(1)
}

/// Resolve the requested page against the total row count.
///
/// `u64::MAX` stands for "last page". Pages past the end are rejected.
pub fn resolve_page(opts: Pagination, total: u64) -> Result<Pagination, InvalidPage> {
    let (_, per_page) = opts.normalize();
    let last = num_pages(total, per_page);
    let page = if opts.page == u64::MAX { last } else { opts.page.max(1) };
    if page > last {
        return Err(InvalidPage);
    }
    Ok(Pagination { page, per_page })
}
