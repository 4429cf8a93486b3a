//! Pagination for scan listings

use fqs_common::models::PageRequest;

/// Page size when the client doesn't ask for one
pub const DEFAULT_PAGE_SIZE: i64 = 20;

/// Largest page a client may request
pub const MAX_PAGE_SIZE: i64 = 100;

/// Pagination metadata calculated from total results
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    /// Current page number (1-indexed)
    pub page: i64,
    pub page_size: i64,
    pub total_pages: i64,
    /// Offset for SQL LIMIT/OFFSET query
    pub offset: i64,
}

impl Pagination {
    pub fn page_request(&self) -> PageRequest {
        PageRequest::new(self.page, self.page_size)
    }
}

/// Calculate pagination metadata from total results and requested page
///
/// The page is clamped to [1, total_pages] and the page size to
/// [1, MAX_PAGE_SIZE].
///
/// # Examples
/// ```
/// use fqs_scanner::pagination::calculate_pagination;
///
/// // 45 scans, 20 per page = 3 pages (20 + 20 + 5)
/// let p = calculate_pagination(45, 2, Some(20));
/// assert_eq!(p.page, 2);
/// assert_eq!(p.total_pages, 3);
/// assert_eq!(p.offset, 20);
///
/// // Requesting out-of-bounds page gets clamped
/// let p = calculate_pagination(45, 99, Some(20));
/// assert_eq!(p.page, 3);
/// assert_eq!(p.offset, 40);
/// ```
pub fn calculate_pagination(total_results: i64, requested_page: i64, page_size: Option<i64>) -> Pagination {
    let page_size = page_size.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE);
    let total_pages = (total_results.max(0) + page_size - 1) / page_size;
    let page = requested_page.max(1).min(total_pages.max(1));
    let offset = (page - 1) * page_size;

    Pagination {
        page,
        page_size,
        total_pages,
        offset,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pagination_normal() {
        let p = calculate_pagination(250, 2, Some(100));
        assert_eq!(p.page, 2);
        assert_eq!(p.total_pages, 3);
        assert_eq!(p.offset, 100);
    }

    #[test]
    fn test_pagination_default_page_size() {
        let p = calculate_pagination(41, 1, None);
        assert_eq!(p.page_size, DEFAULT_PAGE_SIZE);
        assert_eq!(p.total_pages, 3);
    }

    #[test]
    fn test_pagination_out_of_bounds() {
        let p = calculate_pagination(150, 99, Some(100));
        assert_eq!(p.page, 2);
        assert_eq!(p.offset, 100);

        let p = calculate_pagination(150, 0, Some(100));
        assert_eq!(p.page, 1);
        assert_eq!(p.offset, 0);
    }

    #[test]
    fn test_pagination_page_size_clamped() {
        assert_eq!(calculate_pagination(10, 1, Some(0)).page_size, 1);
        assert_eq!(calculate_pagination(10, 1, Some(5000)).page_size, MAX_PAGE_SIZE);
    }

    #[test]
    fn test_pagination_empty() {
        let p = calculate_pagination(0, 1, None);
        assert_eq!(p.page, 1);
        assert_eq!(p.total_pages, 0);
        assert_eq!(p.offset, 0);
        assert_eq!(p.page_request(), PageRequest::new(1, DEFAULT_PAGE_SIZE));
    }
}
