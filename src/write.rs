//! Write operations for modifying rows.

/// Single-row and bulk delete.
pub mod delete_item;

/// Put item operation.
pub mod put_item;

/// Update expression compilation and the update item operation.
pub mod update_item;
