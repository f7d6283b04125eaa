//! Common building blocks for compiled expressions.
//!
//! This module provides the placeholder tables every compiler stage produces,
//! together with the key, filter, projection and operator descriptions used by
//! read and write requests.

/// Filter expression building from predicate descriptors.
pub mod condition;

/// Key descriptors and key-condition compilation.
pub mod key;

/// Sort-key operator table.
pub mod operator;

/// Attribute selection for projection expressions.
pub mod selection;

use crate::error::{Error, Result};

use aws_sdk_dynamodb::types;
use std::collections;

/// Separator between components of an encoded key value.
pub const KEY_SEPARATOR: char = '#';

/// Separator between the low and high bound of a range literal.
pub const RANGE_SEPARATOR: char = '/';

/// Raw row as returned by the store.
pub type Item = collections::HashMap<String, types::AttributeValue>;

pub(crate) fn add_placeholder(keys: &[String], identifier: &str) -> (String, Vec<String>) {
    let placeholder = format!("#{identifier}");
    let mut new_keys = Vec::with_capacity(keys.len() + 1);
    new_keys.extend_from_slice(keys);
    new_keys.push(placeholder.clone());
    (placeholder, new_keys)
}

/// Split a `low/high` literal into its two bounds.
pub(crate) fn split_bounds(literal: &str) -> Result<(&str, &str)> {
    literal
        .split_once(RANGE_SEPARATOR)
        .ok_or_else(|| Error::MalformedRange(literal.to_string()))
}

/// Extend `values` with `incoming`, failing when a token is already bound to another value.
fn extend_values(
    values: &mut collections::HashMap<String, types::AttributeValue>,
    incoming: collections::HashMap<String, types::AttributeValue>,
) -> Result<()> {
    for (token, value) in incoming {
        match values.get(&token) {
            Some(existing) if *existing != value => {
                return Err(Error::PlaceholderCollision(token));
            }
            _ => {
                values.insert(token, value);
            }
        }
    }
    Ok(())
}

fn get_expression(left: String, operator: &str, right: String) -> String {
    if left.is_empty() {
        right
    } else if right.is_empty() {
        left
    } else {
        format!("{left}{operator}{right}")
    }
}

/// A compiled expression together with its placeholder tables.
///
/// Every `#name` and `:value` token referenced by `expression` has an entry in
/// `expression_attribute_names` or `expression_attribute_values` respectively.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ExpressionInput {
    /// The expression text.
    pub expression: String,
    /// Name placeholders (`#token` to attribute name).
    pub expression_attribute_names: collections::HashMap<String, String>,
    /// Value placeholders (`:token` to attribute value).
    pub expression_attribute_values: collections::HashMap<String, types::AttributeValue>,
}

impl ExpressionInput {
    pub(crate) fn merge(operator: &str, items: Vec<Self>) -> Self {
        let mut operation = Self::default();
        for item in items {
            operation
                .expression_attribute_names
                .extend(item.expression_attribute_names);
            operation
                .expression_attribute_values
                .extend(item.expression_attribute_values);
            operation.expression = get_expression(operation.expression, operator, item.expression);
        }
        operation
    }

    /// Like [`merge`](Self::merge), but a value token bound to two different
    /// values is a [`Error::PlaceholderCollision`].
    pub(crate) fn try_merge(operator: &str, items: Vec<Self>) -> Result<Self> {
        let mut operation = Self::default();
        for item in items {
            extend_values(
                &mut operation.expression_attribute_values,
                item.expression_attribute_values,
            )?;
            operation
                .expression_attribute_names
                .extend(item.expression_attribute_names);
            operation.expression = get_expression(operation.expression, operator, item.expression);
        }
        Ok(operation)
    }

    /// Like [`merge_into`](Self::merge_into), rejecting value tokens already
    /// bound to another value.
    pub(crate) fn try_merge_into(
        self,
        names: &mut Option<collections::HashMap<String, String>>,
        values: &mut Option<collections::HashMap<String, types::AttributeValue>>,
    ) -> Result<String> {
        if let Some(existing) = values {
            for (token, value) in &self.expression_attribute_values {
                if existing.get(token).is_some_and(|bound| bound != value) {
                    return Err(Error::PlaceholderCollision(token.clone()));
                }
            }
        }
        Ok(self.merge_into(names, values))
    }

    pub(crate) fn merge_into(
        self,
        names: &mut Option<collections::HashMap<String, String>>,
        values: &mut Option<collections::HashMap<String, types::AttributeValue>>,
    ) -> String {
        match names {
            Some(existing) => existing.extend(self.expression_attribute_names),
            None => *names = Some(self.expression_attribute_names),
        }
        if !self.expression_attribute_values.is_empty() {
            match values {
                Some(existing) => existing.extend(self.expression_attribute_values),
                None => *values = Some(self.expression_attribute_values),
            }
        }
        self.expression
    }
}
