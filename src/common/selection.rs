use crate::common;

use indexmap::IndexMap;
use std::{collections, str};

/// Separator between fields of a projection list.
const FIELD_SEPARATOR: char = ',';

/// Map for selecting attributes in projection expressions.
///
/// ```rust
/// use dynamodb_expr::common::selection;
///
/// let selection: selection::SelectionMap = "Id, Name".parse().unwrap();
/// assert_eq!(
///     selection,
///     selection::SelectionMap::Leaves(vec!["Id".to_string(), "Name".to_string()])
/// );
/// ```
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum SelectionMap {
    /// Leaf selection - a flat list of attribute names to select.
    Leaves(Vec<String>),
    /// Node selection - nested selection for hierarchical attribute paths.
    Node(IndexMap<String, SelectionMap>),
}

impl str::FromStr for SelectionMap {
    type Err = std::convert::Infallible;

    /// Parse a comma-separated field list; blank entries are skipped and a
    /// leading `#` on a field is dropped.
    fn from_str(fields: &str) -> Result<Self, Self::Err> {
        let leaves = fields
            .split(FIELD_SEPARATOR)
            .map(|field| field.trim().trim_start_matches(common::KEY_SEPARATOR))
            .filter(|field| !field.is_empty())
            .map(str::to_string)
            .collect();
        Ok(Self::Leaves(leaves))
    }
}

impl From<SelectionMap> for common::ExpressionInput {
    fn from(selection_map: SelectionMap) -> Self {
        selection_map.get_selection_operation_recursive(&[])
    }
}

impl SelectionMap {
    /// Whether the selection names no attribute at all.
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Leaves(leaves) => leaves.is_empty(),
            Self::Node(map) => map.values().all(Self::is_empty),
        }
    }

    pub(crate) fn get_selection_operation_recursive(
        self,
        keys: &[String],
    ) -> common::ExpressionInput {
        let operations: Vec<_> = match self {
            Self::Leaves(leaves) => leaves
                .into_iter()
                .map(|leaf| {
                    let (placeholder, new_keys) = common::add_placeholder(keys, &leaf);
                    let expression_attribute_names =
                        collections::HashMap::from([(placeholder, leaf)]);
                    let expression = new_keys.join(".");
                    common::ExpressionInput {
                        expression,
                        expression_attribute_names,
                        ..Default::default()
                    }
                })
                .collect(),
            Self::Node(map) => map
                .into_iter()
                .filter(|(_, value)| !value.is_empty())
                .map(|(key, value)| {
                    let (placeholder, new_keys) = common::add_placeholder(keys, &key);
                    let mut operation = value.get_selection_operation_recursive(&new_keys);
                    operation
                        .expression_attribute_names
                        .insert(placeholder, key);
                    operation
                })
                .collect(),
        };
        common::ExpressionInput::merge(", ", operations)
    }
}
