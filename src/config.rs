//! Client configuration.

use std::env;

/// Default name of the last-modified attribute.
pub const DEFAULT_UPDATED_TIMESTAMP_FIELD: &str = "UpdatedTimestamp";

/// Settings of a [`DynamoDbClient`](crate::client::DynamoDbClient).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ClientConfig {
    /// The table every request addresses.
    pub table_name: String,
    /// Last-modified attribute stamped on every update.
    pub updated_timestamp_field: String,
    /// Cap on pages fetched by a single drain; unbounded when `None`.
    pub max_pages: Option<usize>,
    /// Page size applied to reads that do not set one.
    pub default_page_size: Option<i32>,
}

impl ClientConfig {
    /// Configuration for `table_name` with every other setting at its default.
    pub fn new(table_name: impl Into<String>) -> Self {
        Self {
            table_name: table_name.into(),
            ..Default::default()
        }
    }

    /// Create configuration from environment variables.
    ///
    /// Reads `DYNAMODB_TABLE_NAME`, `DYNAMODB_UPDATED_TIMESTAMP_FIELD`,
    /// `DYNAMODB_MAX_PAGES` and `DYNAMODB_PAGE_SIZE`. Unset or unparsable
    /// variables keep their default.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let default = Self::default();
        Self {
            table_name: lookup("DYNAMODB_TABLE_NAME").unwrap_or(default.table_name),
            updated_timestamp_field: lookup("DYNAMODB_UPDATED_TIMESTAMP_FIELD")
                .filter(|field| !field.is_empty())
                .unwrap_or(default.updated_timestamp_field),
            max_pages: lookup("DYNAMODB_MAX_PAGES")
                .and_then(|value| value.parse().ok())
                .or(default.max_pages),
            default_page_size: lookup("DYNAMODB_PAGE_SIZE")
                .and_then(|value| value.parse().ok())
                .filter(|size| *size > 0)
                .or(default.default_page_size),
        }
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            table_name: String::new(),
            updated_timestamp_field: DEFAULT_UPDATED_TIMESTAMP_FIELD.to_owned(),
            max_pages: None,
            default_page_size: None,
        }
    }
}
