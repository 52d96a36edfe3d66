use common::CategoryId;

/// Page size used when the caller asks for none, or for one out of range.
pub const DEFAULT_LIMIT: i64 = 20;

/// Largest page size a caller may request.
pub const MAX_LIMIT: i64 = 100;

/// A clamped pagination window.
///
/// `page` is 1-based. Pages below 1 are clamped to 1. A limit outside
/// `1..=MAX_LIMIT` falls back to `DEFAULT_LIMIT`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    page: i64,
    limit: i64,
}

impl Page {
    pub fn new(page: Option<i64>, limit: Option<i64>) -> Self {
        let page = page.filter(|p| *p >= 1).unwrap_or(1);
        let limit = limit
            .filter(|l| (1..=MAX_LIMIT).contains(l))
            .unwrap_or(DEFAULT_LIMIT);
        Self { page, limit }
    }

    pub fn page(&self) -> i64 {
        self.page
    }

    pub fn limit(&self) -> i64 {
        self.limit
    }

    /// Number of rows to skip, `(page - 1) * limit`.
    pub fn offset(&self) -> i64 {
        (self.page - 1).saturating_mul(self.limit)
    }
}

impl Default for Page {
    fn default() -> Self {
        Self::new(None, None)
    }
}

/// Filter for product listings.
#[derive(Debug, Clone, Default)]
pub struct ProductQuery {
    pub page: Page,
    /// Restrict to products in this category.
    pub category_id: Option<CategoryId>,
}

impl ProductQuery {
    pub fn new(page: Page) -> Self {
        Self {
            page,
            category_id: None,
        }
    }

    pub fn category(mut self, category_id: CategoryId) -> Self {
        self.category_id = Some(category_id);
        self
    }
}
