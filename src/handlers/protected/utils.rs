use serde::Deserialize;

use crate::database::search::DEFAULT_SEARCH_LIMIT;
use crate::error::ApiError;

/// Default and upper bound for a `limit` query parameter.
#[derive(Debug, Clone, Copy)]
pub struct PageBounds {
    pub default: usize,
    pub max: usize,
}

pub const PROMPT_PAGE: PageBounds = PageBounds { default: 100, max: 1000 };
pub const VARIABLE_PAGE: PageBounds = PageBounds { default: 100, max: 1000 };
pub const HISTORY_PAGE: PageBounds = PageBounds { default: 20, max: 100 };
pub const RECENT_PAGE: PageBounds = PageBounds { default: 10, max: 50 };
pub const SEARCH_PAGE: PageBounds = PageBounds {
    default: DEFAULT_SEARCH_LIMIT,
    max: 100,
};

/// `?limit=&offset=` for list endpoints. Out-of-range limits are clamped.
#[derive(Debug, Default, Deserialize)]
pub struct PageQuery {
    pub limit: Option<usize>,
    pub offset: Option<usize>,
}

impl PageQuery {
    pub fn limit(&self, bounds: PageBounds) -> usize {
        self.limit.unwrap_or(bounds.default).clamp(1, bounds.max)
    }

    pub fn offset(&self) -> usize {
        self.offset.unwrap_or(0)
    }
}

/// Repository deletes report `false` only when the store is not configured.
pub fn require_deleted(deleted: bool) -> Result<(), ApiError> {
    if deleted {
        Ok(())
    } else {
        Err(ApiError::service_unavailable("Document store unavailable"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn limits_are_clamped() {
        let q = PageQuery::default();
        assert_eq!(q.limit(HISTORY_PAGE), 20);
        assert_eq!(q.offset(), 0);

        let q = PageQuery {
            limit: Some(5000),
            offset: Some(7),
        };
        assert_eq!(q.limit(PROMPT_PAGE), 1000);
        assert_eq!(q.limit(RECENT_PAGE), 50);
        assert_eq!(q.offset(), 7);

        let q = PageQuery {
            limit: Some(0),
            offset: None,
        };
        assert_eq!(q.limit(SEARCH_PAGE), 1);
    }

    #[test]
    fn soft_delete_failure_is_unavailable() {
        assert!(require_deleted(true).is_ok());
        assert_eq!(require_deleted(false).unwrap_err().status_code(), 503);
    }
}
