//! Page arithmetic for list endpoints.
//!
//! A [`PageRequest`] is a validated `(pageNumber, pageSize)` pair. [`PageInfo`]
//! derives the navigation metadata from a total row count, and [`Page`] is the
//! JSON envelope every list endpoint returns. Asking for a page past the end is
//! not an error; the page simply comes back empty.

use serde::Serialize;

pub const DEFAULT_PAGE_NUMBER: i64 = 1;
pub const DEFAULT_PAGE_SIZE: i64 = 10;
pub const MAX_PAGE_SIZE: i64 = 100;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PageRequestError {
    #[error("Page number must be greater than 0")]
    PageNumber,
    #[error("Page size must be between 1 and {MAX_PAGE_SIZE}")]
    PageSize,
}

impl PageRequestError {
    /// Query parameter the error refers to.
    pub fn field(&self) -> &'static str {
        match self {
            PageRequestError::PageNumber => "pageNumber",
            PageRequestError::PageSize => "pageSize",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    page_number: i64,
    page_size: i64,
}

impl PageRequest {
    pub fn new(page_number: i64, page_size: i64) -> Result<Self, PageRequestError> {
        if page_number < 1 {
            return Err(PageRequestError::PageNumber);
        }
        if !(1..=MAX_PAGE_SIZE).contains(&page_size) {
            return Err(PageRequestError::PageSize);
        }
        Ok(Self {
            page_number,
            page_size,
        })
    }

    pub fn page_number(&self) -> i64 {
        self.page_number
    }

    pub fn page_size(&self) -> i64 {
        self.page_size
    }

    /// Rows to skip. Saturates instead of overflowing for absurd page numbers,
    /// which then just yield an empty page.
    pub fn offset(&self) -> i64 {
        (self.page_number - 1).saturating_mul(self.page_size)
    }

    pub fn limit(&self) -> i64 {
        self.page_size
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            page_number: DEFAULT_PAGE_NUMBER,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PageInfo {
    pub total_count: i64,
    pub page_number: i64,
    pub page_size: i64,
    pub total_pages: i64,
    pub has_previous: bool,
    pub has_next: bool,
}

impl PageInfo {
    pub fn new(total_count: i64, request: PageRequest) -> Self {
        let total_count = total_count.max(0);
        let total_pages = (total_count as u64).div_ceil(request.page_size as u64) as i64;
        Self {
            total_count,
            page_number: request.page_number,
            page_size: request.page_size,
            total_pages,
            has_previous: request.page_number > 1,
            has_next: request.page_number < total_pages,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Page<T> {
    pub data: Vec<T>,
    #[serde(flatten)]
    pub info: PageInfo,
}

impl<T> Page<T> {
    pub fn new(data: Vec<T>, total_count: i64, request: PageRequest) -> Self {
        Self {
            data,
            info: PageInfo::new(total_count, request),
        }
    }
}

/// `%term%` LIKE pattern for a search box value, or `None` when blank.
/// `%`, `_` and `\` in the term match literally (use with `ESCAPE '\'`).
pub fn like_pattern(search: Option<&str>) -> Option<String> {
    let term = search.map(str::trim).filter(|s| !s.is_empty())?;
    let mut pattern = String::with_capacity(term.len() + 2);
    pattern.push('%');
    for ch in term.chars() {
        if matches!(ch, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(ch);
    }
    pattern.push('%');
    Some(pattern)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn third_page_of_twenty_five_is_last() {
        let info = PageInfo::new(25, PageRequest::new(3, 10).expect("valid request"));
        assert_eq!(info.total_pages, 3);
        assert!(!info.has_next);
        assert!(info.has_previous);
    }

    #[test]
    fn empty_table_has_no_pages() {
        let info = PageInfo::new(0, PageRequest::default());
        assert_eq!(info.total_pages, 0);
        assert!(!info.has_next);
        assert!(!info.has_previous);
    }

    #[test]
    fn rejects_out_of_range_parameters() {
        assert_eq!(PageRequest::new(0, 10), Err(PageRequestError::PageNumber));
        assert_eq!(PageRequest::new(1, 0), Err(PageRequestError::PageSize));
        assert_eq!(PageRequest::new(1, 101), Err(PageRequestError::PageSize));
        assert!(PageRequest::new(1, 100).is_ok());
    }

    #[test]
    fn offset_saturates() {
        let req = PageRequest::new(i64::MAX, 100).expect("valid request");
        assert_eq!(req.offset(), i64::MAX);
    }

    #[test]
    fn like_pattern_escapes_wildcards() {
        assert_eq!(like_pattern(Some("  ")), None);
        assert_eq!(like_pattern(None), None);
        assert_eq!(like_pattern(Some(" Al ")).as_deref(), Some("%Al%"));
        assert_eq!(like_pattern(Some("50%_")).as_deref(), Some("%50\\%\\_%"));
    }

    proptest! {
        #[test]
        fn page_info_is_consistent(count in 0i64..1_000_000, size in 1i64..=MAX_PAGE_SIZE, page in 1i64..20_000) {
            let info = PageInfo::new(count, PageRequest::new(page, size).expect("valid request"));
            prop_assert_eq!(info.total_pages, (count + size - 1) / size);
            prop_assert!(info.total_pages * size >= count);
            prop_assert!((info.total_pages - 1).max(0) * size < count.max(1));
            prop_assert_eq!(info.has_previous, page > 1);
            prop_assert_eq!(info.has_next, page < info.total_pages);
            if info.has_next {
                prop_assert!(page * size < count);
            }
        }
    }
}
