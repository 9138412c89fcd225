use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::cmp::Ordering;
use utoipa::ToSchema;

use crate::validation::FieldError;

const DEFAULT_LIMIT: usize = 20;
const MAX_LIMIT: usize = 100;

/// A user record from the identity provider's admin API.
///
/// Only the fields used for filtering are typed; the rest pass through.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct AdminUser {
    pub id: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub email_confirmed_at: Option<String>,
    #[serde(default)]
    pub banned_until: Option<String>,
    #[serde(default)]
    #[schema(value_type = Object)]
    pub user_metadata: Map<String, Value>,
    #[serde(flatten)]
    #[schema(value_type = Object)]
    pub extra: Map<String, Value>,
}

impl AdminUser {
    pub fn username(&self) -> Option<&str> {
        self.user_metadata.get("username").and_then(Value::as_str)
    }

    pub fn status(&self) -> UserStatus {
        if is_set(&self.banned_until) {
            UserStatus::Suspended
        } else if !is_set(&self.email_confirmed_at) {
            UserStatus::Pending
        } else {
            UserStatus::Active
        }
    }
}

fn is_set(value: &Option<String>) -> bool {
    value.as_deref().is_some_and(|v| !v.is_empty())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum UserStatus {
    Active,
    Suspended,
    Pending,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StatusFilter {
    #[default]
    All,
    Only(UserStatus),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortBy {
    #[default]
    CreatedAt,
    Email,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

/// Raw query string for `GET /admin/users`
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserListQuery {
    pub page: Option<String>,
    pub limit: Option<String>,
    pub search: Option<String>,
    pub sort_by: Option<String>,
    pub sort_order: Option<String>,
    pub status: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserListParams {
    pub page: usize,
    pub limit: usize,
    pub search: Option<String>,
    pub sort_by: SortBy,
    pub sort_order: SortOrder,
    pub status: StatusFilter,
}

impl Default for UserListParams {
    fn default() -> Self {
        Self {
            page: 1,
            limit: DEFAULT_LIMIT,
            search: None,
            sort_by: SortBy::default(),
            sort_order: SortOrder::default(),
            status: StatusFilter::default(),
        }
    }
}

impl TryFrom<UserListQuery> for UserListParams {
    type Error = Vec<FieldError>;

    fn try_from(query: UserListQuery) -> Result<Self, Self::Error> {
        let mut issues = Vec::new();
        let mut params = UserListParams::default();

        if let Some(page) = query.page {
            match page.parse::<usize>() {
                Ok(p) if p >= 1 => params.page = p,
                _ => issues.push(FieldError::new("page", "Must be a positive integer")),
            }
        }

        if let Some(limit) = query.limit {
            match limit.parse::<usize>() {
                Ok(l) if (1..=MAX_LIMIT).contains(&l) => params.limit = l,
                _ => issues.push(FieldError::new(
                    "limit",
                    format!("Must be an integer between 1 and {}", MAX_LIMIT),
                )),
            }
        }

        params.search = query
            .search
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty());

        match query.sort_by.as_deref() {
            None | Some("created_at") => {}
            Some("email") => params.sort_by = SortBy::Email,
            Some(_) => issues.push(FieldError::new("sortBy", "Expected 'created_at' | 'email'")),
        }

        match query.sort_order.as_deref() {
            None | Some("desc") => {}
            Some("asc") => params.sort_order = SortOrder::Asc,
            Some(_) => issues.push(FieldError::new("sortOrder", "Expected 'asc' | 'desc'")),
        }

        match query.status.as_deref() {
            None | Some("all") => {}
            Some("active") => params.status = StatusFilter::Only(UserStatus::Active),
            Some("suspended") => params.status = StatusFilter::Only(UserStatus::Suspended),
            Some("pending") => params.status = StatusFilter::Only(UserStatus::Pending),
            Some(_) => issues.push(FieldError::new(
                "status",
                "Expected 'all' | 'active' | 'suspended' | 'pending'",
            )),
        }

        if issues.is_empty() {
            Ok(params)
        } else {
            Err(issues)
        }
    }
}

/// A user with its derived status
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct UserSummary {
    #[serde(flatten)]
    pub user: AdminUser,
    pub status: UserStatus,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct UserPage {
    pub users: Vec<UserSummary>,
    /// Matches after filtering, before paging
    pub total: usize,
    pub page: usize,
    pub limit: usize,
}

impl UserListParams {
    /// Filter, sort and page the full user list in memory
    pub fn apply(&self, users: Vec<AdminUser>) -> UserPage {
        let needle = self.search.as_ref().map(|s| s.to_lowercase());

        let mut matched: Vec<AdminUser> = users
            .into_iter()
            .filter(|user| match &needle {
                Some(needle) => {
                    let email_hit = user
                        .email
                        .as_deref()
                        .is_some_and(|e| e.to_lowercase().contains(needle));
                    let username_hit = user
                        .username()
                        .is_some_and(|u| u.to_lowercase().contains(needle));
                    email_hit || username_hit
                }
                None => true,
            })
            .filter(|user| match self.status {
                StatusFilter::All => true,
                StatusFilter::Only(status) => user.status() == status,
            })
            .collect();

        matched.sort_by(|a, b| {
            let ordering = match self.sort_by {
                SortBy::Email => compare_email(a, b),
                SortBy::CreatedAt => a.created_at.cmp(&b.created_at),
            };
            match self.sort_order {
                SortOrder::Asc => ordering,
                SortOrder::Desc => ordering.reverse(),
            }
        });

        let total = matched.len();
        let start = self.page.saturating_sub(1).saturating_mul(self.limit);
        let users = matched
            .into_iter()
            .skip(start)
            .take(self.limit)
            .map(|user| UserSummary {
                status: user.status(),
                user,
            })
            .collect();

        UserPage {
            users,
            total,
            page: self.page,
            limit: self.limit,
        }
    }
}

fn compare_email(a: &AdminUser, b: &AdminUser) -> Ordering {
    let a = a.email.as_deref().unwrap_or("").to_lowercase();
    let b = b.email.as_deref().unwrap_or("").to_lowercase();
    a.cmp(&b)
}
