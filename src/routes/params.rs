use serde::Deserialize;
use utoipa::{IntoParams, ToSchema};

const DEFAULT_PER_PAGE: u64 = 20;
const MAX_PER_PAGE: u64 = 100;
/// Largest offset Postgres accepts for `OFFSET`.
const MAX_OFFSET: u64 = i64::MAX as u64;

#[derive(Debug, Default, Clone, Copy, Deserialize, ToSchema)]
pub struct Pagination {
    pub page: Option<u64>,
    pub per_page: Option<u64>,
}

impl Pagination {
    /// Returns `(page, per_page, offset)` with page ≥ 1, per_page in 1..=100
    /// and the offset saturating at `i64::MAX`.
    pub fn normalize(&self) -> (u64, u64, u64) {
        let page = self.page.unwrap_or(1).max(1);
        let per_page = self
            .per_page
            .unwrap_or(DEFAULT_PER_PAGE)
            .clamp(1, MAX_PER_PAGE);
        let offset = (page - 1).saturating_mul(per_page).min(MAX_OFFSET);
        (page, per_page, offset)
    }
}

// Query structs keep pagination fields inline: flattening breaks numeric
// parsing in urlencoded queries.

#[derive(Debug, Default, Deserialize, ToSchema, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct BookingListQuery {
    pub page: Option<u64>,
    pub per_page: Option<u64>,
    /// Alias of `per_page`.
    pub limit: Option<u64>,
    pub status: Option<String>,
    /// Inclusive, `YYYY-MM-DD`.
    pub date_from: Option<String>,
    /// Inclusive, `YYYY-MM-DD`.
    pub date_to: Option<String>,
    pub customer_email: Option<String>,
}

impl BookingListQuery {
    pub fn pagination(&self) -> Pagination {
        Pagination {
            page: self.page,
            per_page: self.per_page.or(self.limit),
        }
    }
}

#[derive(Debug, Default, Deserialize, ToSchema, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct CustomerListQuery {
    pub page: Option<u64>,
    pub per_page: Option<u64>,
    pub limit: Option<u64>,
    /// Matches name, email or phone.
    pub search: Option<String>,
}

impl CustomerListQuery {
    pub fn pagination(&self) -> Pagination {
        Pagination {
            page: self.page,
            per_page: self.per_page.or(self.limit),
        }
    }
}

#[derive(Debug, Default, Deserialize, ToSchema, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct SearchQuery {
    pub q: Option<String>,
}

#[derive(Debug, Default, Deserialize, ToSchema, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct SlotQuery {
    /// `YYYY-MM-DD`
    pub date: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pagination_is_clamped() {
        let p = Pagination {
            page: Some(0),
            per_page: Some(500),
        };
        assert_eq!(p.normalize(), (1, 100, 0));

        let p = Pagination {
            page: Some(3),
            per_page: None,
        };
        assert_eq!(p.normalize(), (3, 20, 40));
    }

    #[test]
    fn huge_page_saturates_the_offset() {
        let p = Pagination {
            page: Some(u64::MAX),
            per_page: Some(100),
        };
        assert_eq!(p.normalize(), (u64::MAX, 100, i64::MAX as u64));
    }

    #[test]
    fn limit_is_an_alias_for_per_page() {
        let q = BookingListQuery {
            limit: Some(5),
            ..Default::default()
        };
        assert_eq!(q.pagination().normalize(), (1, 5, 0));
    }
}
