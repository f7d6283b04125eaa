//! Read operations for retrieving rows.
//!
//! Requests compile into input structs first and are then sent through an
//! [`Execute`](crate::execute::Execute) implementation.

/// Shared read arguments, paging options and page types.
pub mod common;

/// Point lookup by primary key or through a secondary index.
pub mod get_item;

/// Lazy page sequences and cancellation.
pub mod paginate;

/// Query operation.
pub mod query;

/// Scan operation.
pub mod scan;
