use serde::{Deserialize, Serialize};
use thiserror::Error;
use ts_rs::TS;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PaginationError {
    #[error("page must be >= 1 and within the addressable range")]
    InvalidPage,
    #[error("page_size must be between 1 and {max}")]
    InvalidPageSize { max: u64 },
}

/// Raw `page` / `page_size` query parameters.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, TS)]
pub struct PageParams {
    pub page: Option<u64>,
    pub page_size: Option<u64>,
}

impl PageParams {
    pub fn new(page: u64, page_size: u64) -> Self {
        Self {
            page: Some(page),
            page_size: Some(page_size),
        }
    }

    pub fn resolve(&self, default_page_size: u64, max_page_size: u64) -> Result<Page, PaginationError> {
        let page = self.page.unwrap_or(1);
        if page == 0 {
            return Err(PaginationError::InvalidPage);
        }
        let page_size = self.page_size.unwrap_or(default_page_size);
        if page_size == 0 || page_size > max_page_size {
            return Err(PaginationError::InvalidPageSize { max: max_page_size });
        }
        // The offset is bound as a signed 64-bit integer.
        match (page - 1).checked_mul(page_size) {
            Some(offset) if offset <= i64::MAX as u64 => Ok(Page { page, page_size }),
            _ => Err(PaginationError::InvalidPage),
        }
    }
}

/// Validated page window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub page: u64,
    pub page_size: u64,
}

impl Page {
    pub fn offset(&self) -> u64 {
        self.page.saturating_sub(1).saturating_mul(self.page_size)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct Paginated<T> {
    pub items: Vec<T>,
    pub total: u64,
    pub page: u64,
    pub page_size: u64,
    pub pages: u64,
}

impl<T> Paginated<T> {
    pub fn new(items: Vec<T>, total: u64, page: Page) -> Self {
        Self {
            items,
            total,
            page: page.page,
            page_size: page.page_size,
            pages: total.div_ceil(page.page_size),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolve_applies_defaults_and_bounds() {
        let page = PageParams::default().resolve(50, 100).unwrap();
        assert_eq!(page, Page { page: 1, page_size: 50 });
        assert_eq!(page.offset(), 0);

        assert_eq!(
            PageParams::new(0, 10).resolve(50, 100),
            Err(PaginationError::InvalidPage)
        );
        assert_eq!(
            PageParams::new(1, 101).resolve(50, 100),
            Err(PaginationError::InvalidPageSize { max: 100 })
        );
        assert_eq!(
            PageParams::new(1, 0).resolve(50, 100),
            Err(PaginationError::InvalidPageSize { max: 100 })
        );
    }

    #[test]
    fn rejects_pages_past_the_offset_range() {
        assert_eq!(
            PageParams::new(u64::MAX, 50).resolve(50, 100),
            Err(PaginationError::InvalidPage)
        );
        assert_eq!(
            PageParams::new(300_000_000_000_000_000, 50).resolve(50, 100),
            Err(PaginationError::InvalidPage)
        );

        let last = i64::MAX as u64 / 100 + 1;
        let page = PageParams::new(last, 100).resolve(50, 100).unwrap();
        assert!(page.offset() <= i64::MAX as u64);
        assert_eq!(
            PageParams::new(last + 1, 100).resolve(50, 100),
            Err(PaginationError::InvalidPage)
        );

        let forged = Page { page: u64::MAX, page_size: 100 };
        assert_eq!(forged.offset(), u64::MAX);
    }

    #[test]
    fn pages_is_ceiling_of_total() {
        let page = PageParams::new(3, 20).resolve(50, 100).unwrap();
        assert_eq!(page.offset(), 40);

        let paginated = Paginated::new(vec!["a"; 5], 45, page);
        assert_eq!(paginated.pages, 3);
        assert_eq!(Paginated::<u8>::new(Vec::new(), 0, page).pages, 0);
        assert_eq!(Paginated::<u8>::new(Vec::new(), 40, page).pages, 2);
    }
}
