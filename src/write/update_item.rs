use crate::common;
use crate::error::{Error, Result};
use crate::execute::Execute;

use aws_sdk_dynamodb::types;
use chrono::{DateTime, SecondsFormat, Utc};
use indexmap::IndexMap;
use serde::Serialize;
use serde_dynamo::to_attribute_value;
use serde_json::Value;
use std::collections;

/// Separator for attribute path components.
const PATH_SEPARATOR: &str = ".";

/// Separator for value token components.
const TOKEN_SEPARATOR: &str = "_";

/// Prefix of a function directive key (`Fn:<function>:<field>`).
const FUNCTION_PREFIX: &str = "Fn:";

const DIRECTIVE_SEPARATOR: char = ':';

/// Value placeholder bound to the number zero, used by counters.
const ZERO_VALUE: &str = ":_Zero";

/// How a single field is updated.
///
/// ```rust
/// use dynamodb_expr::write::update_item;
///
/// let assign = update_item::UpdateEntry::Assign("Jane".to_string());
/// let increment = update_item::UpdateEntry::Increment("1".to_string());
/// ```
#[derive(Clone, Debug, PartialEq)]
pub enum UpdateEntry<T> {
    /// Replace the attribute value.
    Assign(T),
    /// Append values to the end of a list attribute.
    ListAppend(T),
    /// Add to a numeric attribute, starting from zero when missing.
    Increment(T),
    /// Subtract from a numeric attribute, starting from zero when missing.
    Decrement(T),
    /// Update fields of a map attribute.
    Nested(UpdateMap<T>),
}

/// Ordered map of field updates.
///
/// Empty nested maps set nothing. Value tokens join the path with `_`, so a
/// field `a_b` next to a nested `a.b` is a [`Error::PlaceholderCollision`]
/// unless both carry the same value.
pub type UpdateMap<T> = IndexMap<String, UpdateEntry<T>>;

/// Parse an object using `Fn:<function>:<field>` keys for counters and list appends.
///
/// Supported functions are `list_append`, `increase` and `decrease`. Object
/// values of plain keys become nested updates.
///
/// ```rust
/// use dynamodb_expr::write::update_item;
/// use serde_json::json;
///
/// let fields = json!({"Name": "Jane", "Fn:increase:Visits": 1});
/// let update_map = update_item::parse_update_map(fields.as_object().unwrap().clone()).unwrap();
/// assert_eq!(update_map["Visits"], update_item::UpdateEntry::Increment(json!(1)));
/// ```
pub fn parse_update_map(fields: serde_json::Map<String, Value>) -> Result<UpdateMap<Value>> {
    let mut update_map = UpdateMap::with_capacity(fields.len());
    for (key, value) in fields {
        if key.starts_with(FUNCTION_PREFIX) {
            let segments: Vec<&str> = key.split(DIRECTIVE_SEPARATOR).collect();
            let [_, function, field] = segments.as_slice() else {
                return Err(Error::MalformedFunctionDirective(key.clone()));
            };
            let entry = match *function {
                "list_append" => UpdateEntry::ListAppend(value),
                "increase" => UpdateEntry::Increment(value),
                "decrease" => UpdateEntry::Decrement(value),
                other => return Err(Error::UnsupportedFunction(other.to_string())),
            };
            update_map.insert(field.to_string(), entry);
        } else {
            let entry = match value {
                Value::Object(nested) => UpdateEntry::Nested(parse_update_map(nested)?),
                other => UpdateEntry::Assign(other),
            };
            update_map.insert(key, entry);
        }
    }
    Ok(update_map)
}

fn get_assignment(
    name_path: &str,
    value_placeholder: &str,
    value: types::AttributeValue,
) -> common::ExpressionInput {
    common::ExpressionInput {
        expression: format!("{name_path} = {value_placeholder}"),
        expression_attribute_values: collections::HashMap::from([(
            value_placeholder.to_string(),
            value,
        )]),
        ..Default::default()
    }
}

fn get_set_expression_recursive<T: Serialize>(
    update_map: UpdateMap<T>,
    path: &[String],
) -> Result<common::ExpressionInput> {
    let mut operations = Vec::with_capacity(update_map.len());
    for (field, entry) in update_map {
        let mut new_path = Vec::with_capacity(path.len() + 1);
        new_path.extend_from_slice(path);
        new_path.push(field.clone());
        let name_path = new_path
            .iter()
            .map(|segment| format!("#{segment}"))
            .collect::<Vec<_>>()
            .join(PATH_SEPARATOR);
        let value_placeholder = format!(":{}", new_path.join(TOKEN_SEPARATOR));
        let mut operation = match entry {
            UpdateEntry::Assign(value) => {
                get_assignment(&name_path, &value_placeholder, to_attribute_value(value)?)
            }
            UpdateEntry::ListAppend(value) => common::ExpressionInput {
                expression: format!(
                    "{name_path} = list_append({name_path}, {value_placeholder})"
                ),
                expression_attribute_values: collections::HashMap::from([(
                    value_placeholder,
                    to_attribute_value(value)?,
                )]),
                ..Default::default()
            },
            UpdateEntry::Increment(value) => {
                get_counter(&name_path, "+", value_placeholder, to_attribute_value(value)?)
            }
            UpdateEntry::Decrement(value) => {
                get_counter(&name_path, "-", value_placeholder, to_attribute_value(value)?)
            }
            UpdateEntry::Nested(nested) => {
                let operation = get_set_expression_recursive(nested, &new_path)?;
                if operation.expression.is_empty() {
                    continue;
                }
                operation
            }
        };
        operation
            .expression_attribute_names
            .insert(format!("#{field}"), field);
        operations.push(operation);
    }
    common::ExpressionInput::try_merge(", ", operations)
}

fn get_counter(
    name_path: &str,
    sign: &str,
    value_placeholder: String,
    value: types::AttributeValue,
) -> common::ExpressionInput {
    common::ExpressionInput {
        expression: format!(
            "{name_path} = if_not_exists({name_path}, {ZERO_VALUE}) {sign} {value_placeholder}"
        ),
        expression_attribute_values: collections::HashMap::from([
            (value_placeholder, value),
            (
                ZERO_VALUE.to_string(),
                types::AttributeValue::N("0".to_string()),
            ),
        ]),
        ..Default::default()
    }
}

impl<T: Serialize> TryFrom<UpdateMap<T>> for common::ExpressionInput {
    type Error = Error;

    fn try_from(update_map: UpdateMap<T>) -> Result<Self> {
        let mut operation = get_set_expression_recursive(update_map, &[])?;
        if operation.expression.is_empty() {
            return Err(Error::EmptyUpdate);
        }
        operation.expression = format!("SET {}", operation.expression);
        Ok(operation)
    }
}

/// Compiled update request.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct UpdateItemInput {
    /// `PK` and optional `SK` of the row.
    pub keys: common::Item,
    /// The `SET` update expression.
    pub update_expression: String,
    /// Name placeholders of the update expression.
    pub expression_attribute_names: Option<collections::HashMap<String, String>>,
    /// Value placeholders of the update expression.
    pub expression_attribute_values: Option<common::Item>,
    /// The table to update.
    pub table_name: String,
}

/// Update item operation.
///
/// The timestamp field is always written last with `updated_at`, replacing
/// any caller entry for it.
///
/// ```rust
/// use chrono::{TimeZone, Utc};
/// use dynamodb_expr::{common, write};
/// use serde_json::json;
///
/// let update_item = write::update_item::UpdateItem {
///     key: common::key::Key {
///         partition_key: "USER#1".to_string(),
///         sort_key: Some("PROFILE".to_string()),
///         ..Default::default()
///     },
///     fields: write::update_item::UpdateMap::from([
///         ("Name".to_string(), write::update_item::UpdateEntry::Assign(json!("Jane"))),
///     ]),
///     updated_timestamp_field: "UpdatedTimestamp".to_string(),
///     updated_at: Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap(),
///     table_name: "users".to_string(),
/// };
/// let input: write::update_item::UpdateItemInput = update_item.try_into().unwrap();
/// assert_eq!(
///     input.update_expression,
///     "SET #Name = :Name, #UpdatedTimestamp = :UpdatedTimestamp"
/// );
/// ```
#[derive(Clone, Debug, PartialEq)]
pub struct UpdateItem<T> {
    /// Key of the row to update.
    pub key: common::key::Key,
    /// Field updates, compiled in order.
    pub fields: UpdateMap<T>,
    /// Name of the last-modified attribute.
    pub updated_timestamp_field: String,
    /// Value written to the last-modified attribute.
    pub updated_at: DateTime<Utc>,
    /// The table to update.
    pub table_name: String,
}

impl<T: Serialize> TryFrom<UpdateItem<T>> for UpdateItemInput {
    type Error = Error;

    fn try_from(update_item: UpdateItem<T>) -> Result<Self> {
        let mut fields = update_item.fields;
        fields.shift_remove(&update_item.updated_timestamp_field);
        let fields_operation = get_set_expression_recursive(fields, &[])?;
        let field = update_item.updated_timestamp_field;
        let timestamp = update_item
            .updated_at
            .to_rfc3339_opts(SecondsFormat::Millis, true);
        let mut timestamp_operation = get_assignment(
            &format!("#{field}"),
            &format!(":{field}"),
            types::AttributeValue::S(timestamp),
        );
        timestamp_operation
            .expression_attribute_names
            .insert(format!("#{field}"), field);
        let operation =
            common::ExpressionInput::try_merge(", ", vec![fields_operation, timestamp_operation])?;
        let mut expression_attribute_names = None;
        let mut expression_attribute_values = None;
        let expression = operation.merge_into(
            &mut expression_attribute_names,
            &mut expression_attribute_values,
        );
        Ok(Self {
            keys: common::Item::from(&update_item.key),
            update_expression: format!("SET {expression}"),
            expression_attribute_names,
            expression_attribute_values,
            table_name: update_item.table_name,
        })
    }
}

impl<T: Serialize> UpdateItem<T> {
    /// Apply the update and return the updated attributes.
    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(name = "dynamodb_expr.update_item", skip_all, err)
    )]
    pub async fn send<E: Execute>(self, executor: &E) -> Result<Option<common::Item>> {
        let update_item: UpdateItemInput = self.try_into()?;
        executor.update_item(update_item).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{self, MockExecutor};

    use chrono::TimeZone;
    use rstest::rstest;
    use serde_json::json;

    struct Unserializable;

    impl Serialize for Unserializable {
        fn serialize<S: serde::Serializer>(&self, _: S) -> Result<S::Ok, S::Error> {
            Err(serde::ser::Error::custom("unserializable"))
        }
    }

    fn updated_at() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap()
    }

    #[rstest]
    #[case::plain("Name", json!("Jane"), UpdateMap::from([("Name".to_string(), UpdateEntry::Assign(json!("Jane")))]))]
    #[case::list_append("Fn:list_append:Tags", json!(["a"]), UpdateMap::from([("Tags".to_string(), UpdateEntry::ListAppend(json!(["a"])))]))]
    #[case::increase("Fn:increase:Visits", json!(1), UpdateMap::from([("Visits".to_string(), UpdateEntry::Increment(json!(1)))]))]
    #[case::decrease("Fn:decrease:Stock", json!(2), UpdateMap::from([("Stock".to_string(), UpdateEntry::Decrement(json!(2)))]))]
    #[case::nested(
        "Profile",
        json!({"City": "Oslo"}),
        UpdateMap::from([(
            "Profile".to_string(),
            UpdateEntry::Nested(UpdateMap::from([("City".to_string(), UpdateEntry::Assign(json!("Oslo")))])),
        )])
    )]
    fn test_parse_update_map(
        #[case] key: &str,
        #[case] value: Value,
        #[case] expected: UpdateMap<Value>,
    ) {
        let fields = serde_json::Map::from_iter([(key.to_string(), value)]);
        let actual = parse_update_map(fields).unwrap();
        assert_eq!(actual, expected);
    }

    #[rstest]
    #[case::two_segments("Fn:increase")]
    #[case::four_segments("Fn:increase:a:b")]
    fn test_parse_malformed_directive(#[case] key: &str) {
        let fields = serde_json::Map::from_iter([(key.to_string(), json!(1))]);
        let actual = parse_update_map(fields);
        assert!(matches!(actual, Err(Error::MalformedFunctionDirective(directive)) if directive == key));
    }

    #[test]
    fn test_parse_unsupported_function() {
        let fields = serde_json::Map::from_iter([("Fn:multiply:a".to_string(), json!(2))]);
        let actual = parse_update_map(fields);
        assert!(matches!(actual, Err(Error::UnsupportedFunction(function)) if function == "multiply"));
    }

    #[rstest]
    #[case::assign(
        UpdateMap::from(
            [
                (
                    "a".to_string(),
                    UpdateEntry::Assign(
                        json!("b")
                    )
                ),
            ]
        ),
        common::ExpressionInput {
            expression: "SET #a = :a".to_string(),
            expression_attribute_names: collections::HashMap::from(
                [
                    ("#a".to_string(), "a".to_string()),
                ]
            ),
            expression_attribute_values: collections::HashMap::from(
                [
                    (
                        ":a".to_string(),
                        types::AttributeValue::S(
                            "b".to_string()
                        )
                    ),
                ]
            ),
        }
    )]
    #[case::list_append(
        UpdateMap::from(
            [
                (
                    "a".to_string(),
                    UpdateEntry::ListAppend(
                        json!(["b"])
                    )
                ),
            ]
        ),
        common::ExpressionInput {
            expression: "SET #a = list_append(#a, :a)".to_string(),
            expression_attribute_names: collections::HashMap::from(
                [
                    ("#a".to_string(), "a".to_string()),
                ]
            ),
            expression_attribute_values: collections::HashMap::from(
                [
                    (
                        ":a".to_string(),
                        types::AttributeValue::L(
                            vec![
                                types::AttributeValue::S(
                                    "b".to_string()
                                ),
                            ]
                        )
                    ),
                ]
            ),
        }
    )]
    #[case::counters(
        UpdateMap::from(
            [
                (
                    "a".to_string(),
                    UpdateEntry::Increment(
                        json!(1)
                    )
                ),
                (
                    "b".to_string(),
                    UpdateEntry::Decrement(
                        json!(2)
                    )
                ),
            ]
        ),
        common::ExpressionInput {
            expression: "SET #a = if_not_exists(#a, :_Zero) + :a, #b = if_not_exists(#b, :_Zero) - :b".to_string(),
            expression_attribute_names: collections::HashMap::from(
                [
                    ("#a".to_string(), "a".to_string()),
                    ("#b".to_string(), "b".to_string()),
                ]
            ),
            expression_attribute_values: collections::HashMap::from(
                [
                    (
                        ":a".to_string(),
                        types::AttributeValue::N(
                            "1".to_string()
                        )
                    ),
                    (
                        ":b".to_string(),
                        types::AttributeValue::N(
                            "2".to_string()
                        )
                    ),
                    (
                        ":_Zero".to_string(),
                        types::AttributeValue::N(
                            "0".to_string()
                        )
                    ),
                ]
            ),
        }
    )]
    #[case::nested_three_levels(
        UpdateMap::from(
            [
                (
                    "a".to_string(),
                    UpdateEntry::Nested(
                        UpdateMap::from(
                            [
                                (
                                    "b".to_string(),
                                    UpdateEntry::Nested(
                                        UpdateMap::from(
                                            [
                                                (
                                                    "c".to_string(),
                                                    UpdateEntry::Increment(
                                                        json!(5)
                                                    )
                                                ),
                                            ]
                                        )
                                    )
                                ),
                                (
                                    "d".to_string(),
                                    UpdateEntry::Assign(
                                        json!(true)
                                    )
                                ),
                            ]
                        )
                    )
                ),
            ]
        ),
        common::ExpressionInput {
            expression: "SET #a.#b.#c = if_not_exists(#a.#b.#c, :_Zero) + :a_b_c, #a.#d = :a_d".to_string(),
            expression_attribute_names: collections::HashMap::from(
                [
                    ("#a".to_string(), "a".to_string()),
                    ("#b".to_string(), "b".to_string()),
                    ("#c".to_string(), "c".to_string()),
                    ("#d".to_string(), "d".to_string()),
                ]
            ),
            expression_attribute_values: collections::HashMap::from(
                [
                    (
                        ":a_b_c".to_string(),
                        types::AttributeValue::N(
                            "5".to_string()
                        )
                    ),
                    (
                        ":a_d".to_string(),
                        types::AttributeValue::Bool(true)
                    ),
                    (
                        ":_Zero".to_string(),
                        types::AttributeValue::N(
                            "0".to_string()
                        )
                    ),
                ]
            ),
        }
    )]
    fn test_update_map_to_expression(
        #[case] update_map: UpdateMap<Value>,
        #[case] expected: common::ExpressionInput,
    ) {
        let actual: common::ExpressionInput = update_map.try_into().unwrap();
        assert_eq!(actual, expected);
    }

    #[test]
    fn test_empty_nested_map_is_skipped() {
        let fields = json!({"Name": "x", "Profile": {}, "Address": {"Geo": {}}});
        let update_map = parse_update_map(fields.as_object().cloned().unwrap_or_default()).unwrap();
        let actual: common::ExpressionInput = update_map.try_into().unwrap();
        let expected = common::ExpressionInput {
            expression: "SET #Name = :Name".to_string(),
            expression_attribute_names: collections::HashMap::from([(
                "#Name".to_string(),
                "Name".to_string(),
            )]),
            expression_attribute_values: collections::HashMap::from([(
                ":Name".to_string(),
                types::AttributeValue::S("x".to_string()),
            )]),
        };
        assert_eq!(actual, expected);
    }

    #[rstest]
    #[case::empty(json!({}))]
    #[case::only_empty_nested(json!({"Profile": {}}))]
    #[case::deep_empty_nested(json!({"Profile": {"Address": {}}}))]
    fn test_update_without_actions(#[case] fields: Value) {
        let update_map = parse_update_map(fields.as_object().cloned().unwrap_or_default()).unwrap();
        let actual: Result<common::ExpressionInput> = update_map.try_into();
        assert!(matches!(actual, Err(Error::EmptyUpdate)));
    }

    #[rstest]
    #[case::different_values(json!({"a_b": 1, "a": {"b": 2}}), Some(":a_b"))]
    #[case::equal_values(json!({"a_b": 1, "a": {"b": 1}}), None)]
    fn test_flattened_token_collision(#[case] fields: Value, #[case] expected: Option<&str>) {
        let update_map = parse_update_map(fields.as_object().cloned().unwrap_or_default()).unwrap();
        let actual: Result<common::ExpressionInput> = update_map.try_into();
        match expected {
            Some(expected) => assert!(
                matches!(actual, Err(Error::PlaceholderCollision(token)) if token == expected)
            ),
            None => assert!(actual.is_ok()),
        }
    }

    #[test]
    fn test_update_item_with_only_empty_nested_map_stamps_timestamp() {
        let update_item = UpdateItem {
            key: common::key::Key {
                partition_key: "a".to_string(),
                ..Default::default()
            },
            fields: UpdateMap::from([(
                "Profile".to_string(),
                UpdateEntry::Nested(UpdateMap::<Value>::new()),
            )]),
            updated_timestamp_field: "UpdatedTimestamp".to_string(),
            updated_at: updated_at(),
            table_name: "t".to_string(),
        };
        let actual: UpdateItemInput = update_item.try_into().unwrap();
        assert_eq!(
            actual.update_expression,
            "SET #UpdatedTimestamp = :UpdatedTimestamp"
        );
        assert_eq!(
            actual.expression_attribute_names,
            Some(collections::HashMap::from([(
                "#UpdatedTimestamp".to_string(),
                "UpdatedTimestamp".to_string(),
            )]))
        );
    }

    #[rstest]
    #[case::appends_timestamp(
        UpdateItem {
            key: common::key::Key {
                partition_key: "a".to_string(),
                sort_key: Some("b".to_string()),
                ..Default::default()
            },
            fields: UpdateMap::from(
                [
                    (
                        "c".to_string(),
                        UpdateEntry::Assign(
                            json!("d")
                        )
                    ),
                ]
            ),
            updated_timestamp_field: "UpdatedTimestamp".to_string(),
            updated_at: updated_at(),
            table_name: "t".to_string(),
        },
        UpdateItemInput {
            keys: collections::HashMap::from(
                [
                    (
                        "PK".to_string(),
                        types::AttributeValue::S(
                            "a".to_string()
                        )
                    ),
                    (
                        "SK".to_string(),
                        types::AttributeValue::S(
                            "b".to_string()
                        )
                    ),
                ]
            ),
            update_expression: "SET #c = :c, #UpdatedTimestamp = :UpdatedTimestamp".to_string(),
            expression_attribute_names: Some(
                collections::HashMap::from(
                    [
                        ("#c".to_string(), "c".to_string()),
                        ("#UpdatedTimestamp".to_string(), "UpdatedTimestamp".to_string()),
                    ]
                )
            ),
            expression_attribute_values: Some(
                collections::HashMap::from(
                    [
                        (
                            ":c".to_string(),
                            types::AttributeValue::S(
                                "d".to_string()
                            )
                        ),
                        (
                            ":UpdatedTimestamp".to_string(),
                            types::AttributeValue::S(
                                "2024-01-02T03:04:05.000Z".to_string()
                            )
                        ),
                    ]
                )
            ),
            table_name: "t".to_string(),
        }
    )]
    #[case::overrides_caller_timestamp(
        UpdateItem {
            key: common::key::Key {
                partition_key: "a".to_string(),
                ..Default::default()
            },
            fields: UpdateMap::from(
                [
                    (
                        "Modified".to_string(),
                        UpdateEntry::Assign(
                            json!("yesterday")
                        )
                    ),
                ]
            ),
            updated_timestamp_field: "Modified".to_string(),
            updated_at: updated_at(),
            table_name: "t".to_string(),
        },
        UpdateItemInput {
            keys: collections::HashMap::from(
                [
                    (
                        "PK".to_string(),
                        types::AttributeValue::S(
                            "a".to_string()
                        )
                    ),
                ]
            ),
            update_expression: "SET #Modified = :Modified".to_string(),
            expression_attribute_names: Some(
                collections::HashMap::from(
                    [
                        ("#Modified".to_string(), "Modified".to_string()),
                    ]
                )
            ),
            expression_attribute_values: Some(
                collections::HashMap::from(
                    [
                        (
                            ":Modified".to_string(),
                            types::AttributeValue::S(
                                "2024-01-02T03:04:05.000Z".to_string()
                            )
                        ),
                    ]
                )
            ),
            table_name: "t".to_string(),
        }
    )]
    fn test_update_item(#[case] args: UpdateItem<Value>, #[case] expected: UpdateItemInput) {
        let actual: UpdateItemInput = args.try_into().unwrap();
        assert_eq!(actual, expected);
    }

    #[tokio::test]
    async fn test_failed_compilation_sends_nothing() {
        let executor = MockExecutor::default();
        let update_item = UpdateItem {
            key: common::key::Key {
                partition_key: "a".to_string(),
                ..Default::default()
            },
            fields: UpdateMap::from([(
                "a".to_string(),
                UpdateEntry::Assign(Unserializable),
            )]),
            updated_timestamp_field: "UpdatedTimestamp".to_string(),
            updated_at: updated_at(),
            table_name: "t".to_string(),
        };
        let actual = update_item.send(&executor).await;
        assert!(actual.is_err());
        assert!(executor.updates().is_empty());
    }

    #[tokio::test]
    async fn test_send_returns_updated_attributes() {
        let executor = MockExecutor::default().with_item(testing::item(1));
        let update_item = UpdateItem {
            key: common::key::Key {
                partition_key: "P1".to_string(),
                ..Default::default()
            },
            fields: UpdateMap::from([("a".to_string(), UpdateEntry::Assign(json!(1)))]),
            updated_timestamp_field: "UpdatedTimestamp".to_string(),
            updated_at: updated_at(),
            table_name: "t".to_string(),
        };
        let actual = update_item.send(&executor).await.unwrap();
        assert_eq!(actual, Some(testing::item(1)));
        assert_eq!(executor.updates().len(), 1);
    }
}
