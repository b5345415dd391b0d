use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::domain::customer::{Customer, CustomerId};

/// Queries shorter than this fall back to the recently active listing.
pub const MIN_QUERY_CHARS: usize = 2;

#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
pub struct SearchRequest {
    #[serde(default, alias = "q")]
    pub query: String,
    #[serde(default)]
    pub limit: Option<u32>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SearchMode {
    /// Most recently active customers, by last order date descending.
    Recent { limit: u32 },
    /// Case-insensitive substring over name, email and phone, busiest first.
    Text { needle: String, like_pattern: String, limit: u32 },
}

impl SearchRequest {
    pub fn new(query: impl Into<String>, limit: Option<u32>) -> Self {
        Self { query: query.into(), limit }
    }

    pub fn mode(&self, default_limit: u32, max_limit: u32) -> SearchMode {
        let max_limit = max_limit.max(1);
        let limit = self.limit.unwrap_or(default_limit).clamp(1, max_limit);
        let trimmed = self.query.trim();

        if trimmed.chars().count() < MIN_QUERY_CHARS {
            return SearchMode::Recent { limit };
        }

        SearchMode::Text {
            needle: trimmed.to_lowercase(),
            like_pattern: format!("%{}%", escape_like(trimmed)),
            limit,
        }
    }
}

impl SearchMode {
    pub fn limit(&self) -> u32 {
        match self {
            Self::Recent { limit } | Self::Text { limit, .. } => *limit,
        }
    }

    /// In-process equivalent of the SQL filter.
    pub fn matches(&self, customer: &Customer) -> bool {
        match self {
            Self::Recent { .. } => true,
            Self::Text { needle, .. } => [
                Some(customer.name.as_str()),
                customer.email.as_deref(),
                customer.phone.as_deref(),
            ]
            .into_iter()
            .flatten()
            .any(|value| value.to_lowercase().contains(needle.as_str())),
        }
    }
}

/// Escapes `LIKE` wildcards so they match literally with `ESCAPE '\'`.
pub fn escape_like(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for ch in raw.chars() {
        if matches!(ch, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped
}

/// Projection used by autocomplete widgets.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientSearchResult {
    pub id: CustomerId,
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub instagram: Option<String>,
    pub total_orders: u32,
    pub last_order_date: Option<NaiveDate>,
}

impl From<&Customer> for ClientSearchResult {
    fn from(customer: &Customer) -> Self {
        Self {
            id: customer.id,
            name: customer.name.clone(),
            email: customer.email.clone(),
            phone: customer.phone.clone(),
            instagram: customer.instagram.clone(),
            total_orders: customer.total_orders,
            last_order_date: customer.last_order_date,
        }
    }
}
