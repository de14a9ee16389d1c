//! Data-access layer. Every call that acts for a user takes that user's
//! [`Session`](crate::auth::Session) as an argument.

pub mod blog;
pub mod campaigns;
pub mod donations;
pub mod newsletter;
pub mod notifications;
pub mod profiles;
pub mod withdrawals;

use serde::Deserialize;
use utoipa::IntoParams;

const DEFAULT_PAGE_SIZE: u64 = 20;
const MAX_PAGE_SIZE: u64 = 100;
// Offsets are bound as signed 64-bit integers.
const MAX_OFFSET: u64 = i64::MAX as u64;

#[derive(Debug, Default, Clone, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct PageQuery {
    /// Page size, 1 to 100. Defaults to 20.
    #[param(required = false)]
    pub limit: Option<u64>,
    /// Number of rows to skip. Defaults to 0.
    #[param(required = false)]
    pub offset: Option<u64>,
}

impl PageQuery {
    pub fn limit(&self) -> u64 {
        self.limit.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE)
    }

    pub fn offset(&self) -> u64 {
        self.offset.unwrap_or(0).min(MAX_OFFSET)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_defaults_and_bounds() {
        let page = PageQuery::default();
        assert_eq!((page.limit(), page.offset()), (20, 0));

        let page = PageQuery {
            limit: Some(0),
            offset: Some(u64::MAX),
        };
        assert_eq!(page.limit(), 1);
        assert_eq!(page.offset(), i64::MAX as u64);

        let page = PageQuery {
            limit: Some(1_000),
            offset: Some(40),
        };
        assert_eq!((page.limit(), page.offset()), (100, 40));
    }
}
