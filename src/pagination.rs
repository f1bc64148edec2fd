//! Page/limit parsing shared by every list endpoint.

/// Default page when the query parameter is missing or not numeric.
pub const DEFAULT_PAGE: i64 = 1;

/// Default page size when the query parameter is missing or not numeric.
pub const DEFAULT_LIMIT: i64 = 10;

/// Upper bound on the page size.
pub const MAX_LIMIT: i64 = 100;

/// A pagination cursor derived from raw query input. Never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    pub page: i64,
    pub limit: i64,
    pub skip: i64,
}

/// Pagination failures, mapped to API errors at the handler boundary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PaginationError {
    /// Page parsed but is below 1
    InvalidPage,
    /// Limit parsed but is outside [1, MAX_LIMIT]
    InvalidLimit,
    /// Requested page is beyond the last page; carries the valid page count
    OutOfRange { total_pages: i64 },
}

impl std::fmt::Display for PaginationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PaginationError::InvalidPage => write!(f, "Page must be a positive integer"),
            PaginationError::InvalidLimit => {
                write!(f, "Limit must be between 1 and {}", MAX_LIMIT)
            }
            PaginationError::OutOfRange { total_pages } => {
                write!(f, "There are only {} page(s)", total_pages)
            }
        }
    }
}

impl std::error::Error for PaginationError {}

impl Pagination {
    /// Build a cursor from raw `page`/`limit` query values.
    ///
    /// Missing or non-numeric input falls back to the defaults. Input that
    /// parses to a value outside the allowed range is rejected rather than
    /// clamped, so `page=-5` is an error instead of a negative offset.
    pub fn from_query(
        page: Option<&str>,
        limit: Option<&str>,
    ) -> Result<Self, PaginationError> {
        let page = match page.map(str::trim).filter(|s| !s.is_empty()) {
            Some(raw) => match raw.parse::<i64>() {
                Ok(p) if p >= 1 => p,
                Ok(_) => return Err(PaginationError::InvalidPage),
                Err(_) => DEFAULT_PAGE,
            },
            None => DEFAULT_PAGE,
        };

        let limit = match limit.map(str::trim).filter(|s| !s.is_empty()) {
            Some(raw) => match raw.parse::<i64>() {
                Ok(l) if (1..=MAX_LIMIT).contains(&l) => l,
                Ok(_) => return Err(PaginationError::InvalidLimit),
                Err(_) => DEFAULT_LIMIT,
            },
            None => DEFAULT_LIMIT,
        };

        Ok(Self {
            page,
            limit,
            skip: (page - 1) * limit,
        })
    }

    /// Total pages for a counted collection under this cursor's limit.
    pub fn total_pages(&self, total: i64) -> i64 {
        (total + self.limit - 1) / self.limit
    }

    /// Verify the cursor's page against a total count.
    ///
    /// Requesting a page beyond the last one fails with `OutOfRange` rather
    /// than silently returning an empty page. An empty collection (zero
    /// pages) accepts any page.
    pub fn ensure_in_bounds(&self, total: i64) -> Result<i64, PaginationError> {
        let total_pages = self.total_pages(total);
        if self.page > total_pages && total_pages > 0 {
            return Err(PaginationError::OutOfRange { total_pages });
        }
        Ok(total_pages)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parses_page_and_limit() {
        let p = Pagination::from_query(Some("2"), Some("10")).unwrap();
        assert_eq!(
            p,
            Pagination {
                page: 2,
                limit: 10,
                skip: 10
            }
        );
    }

    #[test]
    fn test_defaults_for_missing_or_garbage_input() {
        let p = Pagination::from_query(Some("abc"), Some("")).unwrap();
        assert_eq!(
            p,
            Pagination {
                page: 1,
                limit: 10,
                skip: 0
            }
        );

        let p = Pagination::from_query(None, None).unwrap();
        assert_eq!(p.page, 1);
        assert_eq!(p.limit, 10);
        assert_eq!(p.skip, 0);
    }

    #[test]
    fn test_negative_page_is_rejected() {
        assert_eq!(
            Pagination::from_query(Some("-5"), None),
            Err(PaginationError::InvalidPage)
        );
        assert_eq!(
            Pagination::from_query(Some("0"), None),
            Err(PaginationError::InvalidPage)
        );
    }

    #[test]
    fn test_limit_bounds() {
        assert_eq!(
            Pagination::from_query(None, Some("0")),
            Err(PaginationError::InvalidLimit)
        );
        assert_eq!(
            Pagination::from_query(None, Some("101")),
            Err(PaginationError::InvalidLimit)
        );
        let p = Pagination::from_query(None, Some("100")).unwrap();
        assert_eq!(p.limit, 100);
    }

    #[test]
    fn test_total_pages_rounds_up() {
        let p = Pagination::from_query(Some("1"), Some("10")).unwrap();
        assert_eq!(p.total_pages(25), 3);
        assert_eq!(p.total_pages(30), 3);
        assert_eq!(p.total_pages(31), 4);
        assert_eq!(p.total_pages(0), 0);
    }

    #[test]
    fn test_out_of_range_page() {
        let p = Pagination::from_query(Some("4"), Some("10")).unwrap();
        let err = p.ensure_in_bounds(25).unwrap_err();
        assert_eq!(err, PaginationError::OutOfRange { total_pages: 3 });
        assert_eq!(err.to_string(), "There are only 3 page(s)");
    }

    #[test]
    fn test_last_page_is_in_bounds() {
        let p = Pagination::from_query(Some("3"), Some("10")).unwrap();
        assert_eq!(p.ensure_in_bounds(25).unwrap(), 3);
        assert_eq!(p.skip, 20); // leaves 5 items on the last page
    }

    #[test]
    fn test_empty_collection_accepts_any_page() {
        let p = Pagination::from_query(Some("7"), Some("10")).unwrap();
        assert_eq!(p.ensure_in_bounds(0).unwrap(), 0);
    }
}
