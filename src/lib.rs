#![deny(missing_docs)]
#![deny(warnings)]

//! # DynamoDB Expr
//!
//! Compiles declarative key, filter, projection and update descriptions into
//! Amazon DynamoDB expression strings with their placeholder tables, and
//! drives paginated reads over them.
//!
//! ## Overview
//!
//! - Key conditions over the primary index or a `<index>PK`/`<index>SK`
//!   secondary index, with sort-key operators inferred from the key value
//! - Filter expressions from ordered predicate lists
//! - `SET` update expressions with counters, list appends and nested paths,
//!   always stamping a last-modified attribute
//! - Lazy, cancellable page sequences with an optional page cap
//!
//! ## Quick Example
//!
//! ```rust
//! use dynamodb_expr::{common, read};
//! use serde_json::json;
//!
//! let query: read::query::Query<serde_json::Value> = read::query::Query {
//!     key: common::key::Key {
//!         partition_key: "USER#1".to_string(),
//!         sort_key: Some("ORDER#".to_string()),
//!         index_name: Some("GSI1".to_string()),
//!         sort_key_operator: None,
//!     },
//!     option: serde_json::from_value(json!({
//!         "filter": [{"field": "Status", "type": "const", "keyword": "shipped"}],
//!     }))
//!     .unwrap(),
//!     selection: None,
//!     table_name: "orders".to_string(),
//! };
//! let input: read::query::QueryInput = query.try_into().unwrap();
//! assert_eq!(
//!     input.key_condition_expression,
//!     "#GSI1PK = :gsipk AND begins_with(#GSI1SK, :gsisk)"
//! );
//! assert_eq!(
//!     input.multiple_read_input.filter_expression.as_deref(),
//!     Some("#Status = :Status")
//! );
//! ```
//!
//! ## Modules
//!
//! - [`mod@common`] - Placeholder tables, keys, filters, projections and operators
//! - [`mod@read`] - Point lookups, queries, scans and pagination
//! - [`mod@write`] - Puts, updates, deletes and bulk delete
//! - [`mod@execute`] - The store seam and its AWS SDK implementation
//! - [`mod@client`] - Table-bound façade over the operations

/// Table-bound client façade.
pub mod client;

pub mod common;

/// Client configuration.
pub mod config;

/// Error type and result alias.
pub mod error;

pub mod execute;

/// Read operations: point lookups, queries, scans and pagination.
pub mod read;

/// Write operations: puts, updates, single and bulk deletes.
pub mod write;

#[cfg(test)]
mod testing;
