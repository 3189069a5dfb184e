use indexmap::IndexMap;
use serde::Deserialize;
use serde_json::Value;

use crate::returning::{FieldSpec, ReturningSpec};

/// What the caller wants done to the collection.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationKind {
    Query,
    Subscription,
    Insert,
    Update,
    Delete,
}

impl OperationKind {
    /// The GraphQL operation keyword this kind compiles to.
    pub fn keyword(self) -> &'static str {
        match self {
            OperationKind::Query => "query",
            OperationKind::Subscription => "subscription",
            OperationKind::Insert | OperationKind::Update | OperationKind::Delete => "mutation",
        }
    }

    pub(crate) fn is_mutation(self) -> bool {
        matches!(
            self,
            OperationKind::Insert | OperationKind::Update | OperationKind::Delete
        )
    }

    pub(crate) fn is_read(self) -> bool {
        matches!(self, OperationKind::Query | OperationKind::Subscription)
    }
}

/// A declarative request against one collection.
///
/// This is the loosely-typed caller surface: everything except `operation`
/// and `collection` is optional, and the selection shapes under `returning`
/// and `aggregate` are classified into [`ReturningSpec`] at deserialization
/// time. Which optional pieces are present drives both field-name
/// resolution and argument binding.
#[derive(Clone, Debug, Deserialize)]
pub struct QueryRequest {
    pub operation: OperationKind,
    pub collection: String,
    /// Argument values keyed by argument name. Consulted per argument, and
    /// bound wholesale to an argument literally named `where`.
    #[serde(default)]
    pub r#where: Option<IndexMap<String, Value>>,
    /// The selection to return. Absent means "synthesize defaults".
    #[serde(default)]
    pub returning: Option<ReturningSpec>,
    /// Shape map for the `_aggregate` variant; its presence selects the
    /// aggregate field.
    #[serde(default)]
    pub aggregate: Option<IndexMap<String, FieldSpec>>,
    /// Single insert payload; selects the `_one` variant when `objects` is
    /// absent.
    #[serde(default)]
    pub object: Option<Value>,
    /// Bulk insert payload.
    #[serde(default)]
    pub objects: Option<Value>,
    /// Primary-key values; their presence selects the `_by_pk` variant.
    #[serde(default)]
    pub pk_columns: Option<IndexMap<String, Value>>,
    /// Update payload, bound to the argument named `_set`.
    #[serde(default, alias = "_set")]
    pub set_values: Option<Value>,
    #[serde(default)]
    pub limit: Option<Value>,
    #[serde(default)]
    pub offset: Option<Value>,
    #[serde(default)]
    pub order_by: Option<Value>,
    #[serde(default)]
    pub distinct_on: Option<Value>,
    /// Fragment definitions appended verbatim after the operation.
    #[serde(default)]
    pub fragments: Vec<String>,
    /// Starting value for `v{n}` variable numbering, so documents built in
    /// sequence never reuse a name.
    #[serde(default)]
    pub var_counter: usize,
}

impl QueryRequest {
    pub fn new(operation: OperationKind, collection: impl Into<String>) -> Self {
        QueryRequest {
            operation,
            collection: collection.into(),
            r#where: None,
            returning: None,
            aggregate: None,
            object: None,
            objects: None,
            pk_columns: None,
            set_values: None,
            limit: None,
            offset: None,
            order_by: None,
            distinct_on: None,
            fragments: Vec::new(),
            var_counter: 0,
        }
    }

    /// Adds one entry to the argument bag.
    #[must_use]
    pub fn with_argument(mut self, name: impl Into<String>, value: Value) -> Self {
        self.r#where
            .get_or_insert_with(IndexMap::new)
            .insert(name.into(), value);
        self
    }

    #[must_use]
    pub fn with_returning(mut self, returning: ReturningSpec) -> Self {
        self.returning = Some(returning);
        self
    }

    #[must_use]
    pub fn with_aggregate(mut self, aggregate: IndexMap<String, FieldSpec>) -> Self {
        self.aggregate = Some(aggregate);
        self
    }

    #[must_use]
    pub fn with_pk_column(mut self, name: impl Into<String>, value: Value) -> Self {
        self.pk_columns
            .get_or_insert_with(IndexMap::new)
            .insert(name.into(), value);
        self
    }

    #[must_use]
    pub fn with_object(mut self, object: Value) -> Self {
        self.object = Some(object);
        self
    }

    #[must_use]
    pub fn with_objects(mut self, objects: Value) -> Self {
        self.objects = Some(objects);
        self
    }

    #[must_use]
    pub fn with_set_values(mut self, set_values: Value) -> Self {
        self.set_values = Some(set_values);
        self
    }

    #[must_use]
    pub fn with_limit(mut self, limit: Value) -> Self {
        self.limit = Some(limit);
        self
    }

    #[must_use]
    pub fn with_order_by(mut self, order_by: Value) -> Self {
        self.order_by = Some(order_by);
        self
    }

    #[must_use]
    pub fn with_fragment(mut self, fragment: impl Into<String>) -> Self {
        self.fragments.push(fragment.into());
        self
    }

    #[must_use]
    pub fn with_var_counter(mut self, var_counter: usize) -> Self {
        self.var_counter = var_counter;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deserializes_a_loose_request() {
        let request: QueryRequest = serde_json::from_value(serde_json::json!({
            "operation": "update",
            "collection": "widgets",
            "pk_columns": { "id": 7 },
            "_set": { "name": "renamed" },
            "returning": ["id", "name"]
        }))
        .unwrap();

        assert_eq!(request.operation, OperationKind::Update);
        assert_eq!(request.collection, "widgets");
        assert_eq!(request.pk_columns.unwrap()["id"], serde_json::json!(7));
        assert!(request.set_values.is_some());
        assert!(matches!(request.returning, Some(ReturningSpec::List(_))));
    }

    #[test]
    fn rejects_a_boolean_returning() {
        let result = serde_json::from_value::<QueryRequest>(serde_json::json!({
            "operation": "query",
            "collection": "widgets",
            "returning": true
        }));
        assert!(result.is_err());
    }
}
