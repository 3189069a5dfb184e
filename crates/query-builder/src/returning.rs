//! The parsed shape of a caller's selection request.
//!
//! Callers hand us loosely-typed JSON. It is classified here, once, into a
//! tagged variant so the compiler can match on structure instead of
//! re-sniffing value shapes at every level.

use indexmap::IndexMap;
use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// Keys with argument/alias meaning inside a nested field map. Everything
/// else selects fields.
const RESERVED_KEYS: &[&str] = &[
    "where",
    "limit",
    "offset",
    "order_by",
    "distinct_on",
    "alias",
    "returning",
];

/// A selection shape: one field, a list of shapes, or a keyed map.
#[derive(Clone, Debug, PartialEq)]
pub enum ReturningSpec {
    /// A field name, rendered verbatim.
    Leaf(String),
    List(Vec<ReturningSpec>),
    Tree(IndexMap<String, FieldSpec>),
}

impl ReturningSpec {
    /// Classifies a loose JSON value. `None` for values that do not select
    /// anything (booleans, numbers, null).
    pub fn from_value(value: Value) -> Option<ReturningSpec> {
        match value {
            Value::String(leaf) => Some(ReturningSpec::Leaf(leaf.trim().to_string())),
            Value::Array(items) => Some(ReturningSpec::List(
                items
                    .into_iter()
                    .filter_map(ReturningSpec::from_value)
                    .collect(),
            )),
            Value::Object(map) => Some(ReturningSpec::Tree(
                map.into_iter()
                    .map(|(key, value)| (key, FieldSpec::from_value(value)))
                    .collect(),
            )),
            _ => None,
        }
    }
}

impl<'de> Deserialize<'de> for ReturningSpec {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Value::deserialize(deserializer)?;
        ReturningSpec::from_value(value)
            .ok_or_else(|| serde::de::Error::custom("expected a string, list or map selection"))
    }
}

/// The value under a key of a [`ReturningSpec::Tree`].
#[derive(Clone, Debug, PartialEq)]
pub enum FieldSpec {
    /// `true` (or a truthy number, or null) includes the field with a
    /// synthesized body where one is needed; `false` drops it.
    Toggle(bool),
    /// An explicit sub-selection: string, list or plain field map.
    Selection(ReturningSpec),
    /// The `{"columns": […]}` marker: a column-function call.
    ColumnCall(Vec<String>),
    /// A map that carried reserved keys: arguments, alias and an optional
    /// explicit sub-selection.
    Nested(Box<NestedQuery>),
}

impl FieldSpec {
    pub fn from_value(value: Value) -> FieldSpec {
        match value {
            Value::Bool(include) => FieldSpec::Toggle(include),
            Value::Number(number) => {
                FieldSpec::Toggle(number.as_f64().is_some_and(|number| number != 0.0))
            }
            Value::Null => FieldSpec::Toggle(true),
            Value::String(leaf) => {
                FieldSpec::Selection(ReturningSpec::Leaf(leaf.trim().to_string()))
            }
            Value::Array(items) => FieldSpec::Selection(ReturningSpec::List(
                items
                    .into_iter()
                    .filter_map(ReturningSpec::from_value)
                    .collect(),
            )),
            Value::Object(map) => FieldSpec::from_map(map),
        }
    }

    fn from_map(map: serde_json::Map<String, Value>) -> FieldSpec {
        if let Some(columns) = column_call(&map) {
            return FieldSpec::ColumnCall(columns);
        }
        if map.keys().any(|key| RESERVED_KEYS.contains(&key.as_str())) {
            return FieldSpec::Nested(Box::new(NestedQuery::from_map(map)));
        }
        FieldSpec::Selection(ReturningSpec::Tree(
            map.into_iter()
                .map(|(key, value)| (key, FieldSpec::from_value(value)))
                .collect(),
        ))
    }
}

impl<'de> Deserialize<'de> for FieldSpec {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(FieldSpec::from_value(Value::deserialize(deserializer)?))
    }
}

/// Matches the column-call marker: a single-key map whose `columns` value
/// is a list of strings.
fn column_call(map: &serde_json::Map<String, Value>) -> Option<Vec<String>> {
    if map.len() != 1 {
        return None;
    }
    let Value::Array(items) = map.get("columns")? else {
        return None;
    };
    items
        .iter()
        .map(|item| item.as_str().map(str::to_string))
        .collect()
}

/// A nested field with arguments, parsed out of a reserved-key map.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct NestedQuery {
    pub alias: Option<String>,
    pub r#where: Option<Value>,
    pub limit: Option<Value>,
    pub offset: Option<Value>,
    pub order_by: Option<Value>,
    pub distinct_on: Option<Value>,
    pub returning: Option<ReturningSpec>,
    /// Plain keys that sat beside the reserved ones.
    pub fields: IndexMap<String, FieldSpec>,
}

impl NestedQuery {
    fn from_map(map: serde_json::Map<String, Value>) -> NestedQuery {
        let mut nested = NestedQuery::default();
        for (key, value) in map {
            match key.as_str() {
                "alias" => nested.alias = value.as_str().map(str::to_string),
                "where" => nested.r#where = Some(value),
                "limit" => nested.limit = Some(value),
                "offset" => nested.offset = Some(value),
                "order_by" => nested.order_by = Some(value),
                "distinct_on" => nested.distinct_on = Some(value),
                "returning" => nested.returning = ReturningSpec::from_value(value),
                _ => {
                    nested.fields.insert(key, FieldSpec::from_value(value));
                }
            }
        }
        nested
    }

    /// The reserved key's value by argument name, for binding.
    pub(crate) fn argument_value(&self, name: &str) -> Option<&Value> {
        match name {
            "where" => self.r#where.as_ref(),
            "limit" => self.limit.as_ref(),
            "offset" => self.offset.as_ref(),
            "order_by" => self.order_by.as_ref(),
            "distinct_on" => self.distinct_on.as_ref(),
            _ => None,
        }
    }
}

/// Splits a `field:alias` map key. The part before the first colon is the
/// field name; a blank alias part is ignored.
pub(crate) fn split_alias(key: &str) -> (&str, Option<&str>) {
    match key.split_once(':') {
        Some((field, alias)) if !alias.trim().is_empty() => (field.trim(), Some(alias.trim())),
        Some((field, _)) => (field.trim(), None),
        None => (key.trim(), None),
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn classifies_strings_and_lists() {
        assert_eq!(
            ReturningSpec::from_value(json!("  id ")),
            Some(ReturningSpec::Leaf("id".to_string()))
        );
        let spec = ReturningSpec::from_value(json!(["id", { "name": true }])).unwrap();
        let ReturningSpec::List(items) = spec else {
            panic!("expected a list")
        };
        assert_eq!(items.len(), 2);
        assert_eq!(items[0], ReturningSpec::Leaf("id".to_string()));
        assert!(matches!(items[1], ReturningSpec::Tree(_)));
    }

    #[test]
    fn classifies_the_column_call_marker() {
        let spec = FieldSpec::from_value(json!({ "columns": ["price", "quantity"] }));
        assert_eq!(
            spec,
            FieldSpec::ColumnCall(vec!["price".to_string(), "quantity".to_string()])
        );

        // Anything other than a pure string list is an ordinary selection.
        let spec = FieldSpec::from_value(json!({ "columns": ["price", 3] }));
        assert!(matches!(spec, FieldSpec::Selection(_)));
    }

    #[test]
    fn a_reserved_key_makes_a_nested_query() {
        let spec = FieldSpec::from_value(json!({
            "where": { "done": { "_eq": true } },
            "limit": 5,
            "alias": "openItems",
            "title": true
        }));
        let FieldSpec::Nested(nested) = spec else {
            panic!("expected a nested query")
        };
        assert_eq!(nested.alias.as_deref(), Some("openItems"));
        assert!(nested.r#where.is_some());
        assert_eq!(nested.limit, Some(json!(5)));
        assert!(nested.fields.contains_key("title"));
    }

    #[test]
    fn a_plain_map_stays_a_tree() {
        let spec = FieldSpec::from_value(json!({ "id": true, "name": true }));
        assert!(matches!(
            spec,
            FieldSpec::Selection(ReturningSpec::Tree(_))
        ));
    }

    #[test]
    fn numbers_and_null_toggle() {
        assert_eq!(FieldSpec::from_value(json!(1)), FieldSpec::Toggle(true));
        assert_eq!(FieldSpec::from_value(json!(0)), FieldSpec::Toggle(false));
        assert_eq!(FieldSpec::from_value(json!(null)), FieldSpec::Toggle(true));
    }

    #[test]
    fn splits_alias_keys() {
        assert_eq!(split_alias("name"), ("name", None));
        assert_eq!(split_alias("name:label"), ("name", Some("label")));
        assert_eq!(split_alias("name: "), ("name", None));
    }
}
