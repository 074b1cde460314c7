//! Listing, filtering and pagination of users

use serde::{Deserialize, Serialize};

use super::role::{Role, UserStatus};

pub const DEFAULT_PAGE: u64 = 1;
pub const DEFAULT_LIMIT: u64 = 10;
pub const MAX_LIMIT: u64 = 100;

/// Columns a listing may be sorted by
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortField {
    #[default]
    CreatedAt,
    UpdatedAt,
    LastLogin,
    Name,
    Email,
    Role,
    Status,
}

impl SortField {
    /// Parse a client-supplied field name, falling back to `createdAt`
    pub fn parse_lenient(value: Option<&str>) -> Self {
        match value {
            Some("updatedAt") => SortField::UpdatedAt,
            Some("lastLogin") => SortField::LastLogin,
            Some("name") => SortField::Name,
            Some("email") => SortField::Email,
            Some("role") => SortField::Role,
            Some("status") => SortField::Status,
            _ => SortField::CreatedAt,
        }
    }

    /// Backing column name
    pub fn column(&self) -> &'static str {
        match self {
            SortField::CreatedAt => "created_at",
            SortField::UpdatedAt => "updated_at",
            SortField::LastLogin => "last_login",
            SortField::Name => "name",
            SortField::Email => "email",
            SortField::Role => "role",
            SortField::Status => "status",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

impl SortOrder {
    /// Only the literal `asc` selects ascending order
    pub fn parse_lenient(value: Option<&str>) -> Self {
        match value {
            Some("asc") => SortOrder::Asc,
            _ => SortOrder::Desc,
        }
    }

    pub fn as_sql(&self) -> &'static str {
        match self {
            SortOrder::Asc => "ASC",
            SortOrder::Desc => "DESC",
        }
    }
}

/// Validated listing request
#[derive(Debug, Clone, PartialEq)]
pub struct UserQuery {
    pub page: u64,
    pub limit: u64,
    pub sort_by: SortField,
    pub sort_order: SortOrder,
    pub search: Option<String>,
    pub role: Option<Role>,
    pub status: Option<UserStatus>,
}

impl Default for UserQuery {
    fn default() -> Self {
        Self {
            page: DEFAULT_PAGE,
            limit: DEFAULT_LIMIT,
            sort_by: SortField::default(),
            sort_order: SortOrder::default(),
            search: None,
            role: None,
            status: None,
        }
    }
}

impl UserQuery {
    /// Number of records to skip; saturates for pages far past the end
    pub fn offset(&self) -> u64 {
        self.page.saturating_sub(1).saturating_mul(self.limit)
    }
}

/// Raw query-string parameters of the listing endpoint
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListUsersParams {
    pub page: Option<String>,
    pub limit: Option<String>,
    pub sort_by: Option<String>,
    pub sort_order: Option<String>,
    pub search: Option<String>,
    pub role: Option<String>,
    pub status: Option<String>,
}

fn positive_or(value: Option<&str>, default: u64) -> u64 {
    value
        .and_then(|v| v.trim().parse::<u64>().ok())
        .filter(|v| *v > 0)
        .unwrap_or(default)
}

impl From<ListUsersParams> for UserQuery {
    fn from(params: ListUsersParams) -> Self {
        let search = params
            .search
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty());

        Self {
            page: positive_or(params.page.as_deref(), DEFAULT_PAGE),
            limit: positive_or(params.limit.as_deref(), DEFAULT_LIMIT).min(MAX_LIMIT),
            sort_by: SortField::parse_lenient(params.sort_by.as_deref()),
            sort_order: SortOrder::parse_lenient(params.sort_order.as_deref()),
            search,
            // Values outside the enumerations are ignored rather than rejected.
            role: params.role.as_deref().and_then(|r| r.parse().ok()),
            status: params.status.as_deref().and_then(|s| s.parse().ok()),
        }
    }
}

/// Pagination metadata attached to a listing
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub total: u64,
    pub total_pages: u64,
    pub current_page: u64,
    pub page_size: u64,
    pub has_next_page: bool,
    pub has_prev_page: bool,
    pub next_page: Option<u64>,
    pub prev_page: Option<u64>,
}

impl Pagination {
    pub fn new(page: u64, limit: u64, total: u64) -> Self {
        let total_pages = total.div_ceil(limit.max(1));
        let has_next_page = page < total_pages;
        let has_prev_page = page > 1;

        Self {
            total,
            total_pages,
            current_page: page,
            page_size: limit,
            has_next_page,
            has_prev_page,
            next_page: has_next_page.then(|| page + 1),
            prev_page: has_prev_page.then(|| page - 1),
        }
    }
}

/// One page of results
#[derive(Debug, Clone)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub pagination: Pagination,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn params_fall_back_to_defaults() {
        let query = UserQuery::from(ListUsersParams {
            page: Some("zero".into()),
            limit: Some("0".into()),
            sort_by: Some("password".into()),
            sort_order: Some("ASC".into()),
            search: Some("   ".into()),
            role: Some("owner".into()),
            status: Some("deleted".into()),
        });

        assert_eq!(query, UserQuery::default());
    }

    #[test]
    fn params_are_parsed_and_limit_is_capped() {
        let query = UserQuery::from(ListUsersParams {
            page: Some("3".into()),
            limit: Some("500".into()),
            sort_by: Some("email".into()),
            sort_order: Some("asc".into()),
            search: Some(" ali ".into()),
            role: Some("manager".into()),
            status: Some("banned".into()),
        });

        assert_eq!(query.page, 3);
        assert_eq!(query.limit, MAX_LIMIT);
        assert_eq!(query.offset(), 200);
        assert_eq!(query.sort_by, SortField::Email);
        assert_eq!(query.sort_order, SortOrder::Asc);
        assert_eq!(query.search.as_deref(), Some("ali"));
        assert_eq!(query.role, Some(Role::Manager));
        assert_eq!(query.status, Some(UserStatus::Banned));
    }

    #[test]
    fn offset_saturates_for_huge_pages() {
        let query = UserQuery {
            page: u64::MAX,
            limit: MAX_LIMIT,
            ..Default::default()
        };
        assert_eq!(query.offset(), u64::MAX);

        let meta = Pagination::new(u64::MAX, MAX_LIMIT, 3);
        assert!(!meta.has_next_page);
        assert_eq!(meta.next_page, None);
        assert_eq!(meta.prev_page, Some(u64::MAX - 1));
    }

    #[test]
    fn pagination_bounds_agree_with_flags() {
        let total = 23;
        let limit = 5;
        for page in 1..=7u64 {
            let meta = Pagination::new(page, limit, total);
            assert_eq!(meta.total_pages, 5);
            assert_eq!(meta.has_next_page, page * limit < total);
            assert_eq!(meta.has_prev_page, page > 1);
            assert_eq!(meta.next_page.is_some(), meta.has_next_page);
            assert_eq!(meta.prev_page, (page > 1).then(|| page - 1));
        }
    }

    #[test]
    fn pagination_of_empty_collection() {
        let meta = Pagination::new(1, 10, 0);
        assert_eq!(meta.total_pages, 0);
        assert!(!meta.has_next_page);
        assert!(!meta.has_prev_page);
        assert_eq!(meta.next_page, None);
    }
}
