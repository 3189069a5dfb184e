//! Root-field argument binding.

use graphql_registry::MetaField;
use serde_json::Value;

use crate::{
    diagnostics::{self, Diagnostic},
    request::QueryRequest,
    variables::VariableBinder,
    BuildError,
};

/// Binds every root-field argument that has a source on the request,
/// iterating the field's arguments in declaration order. Per argument the
/// first matching source wins; arguments with no source are omitted.
///
/// Returns `(argument name, variable name)` pairs in binding order.
pub(crate) fn bind_root(
    field: &MetaField,
    field_name: &str,
    request: &QueryRequest,
    variables: &mut VariableBinder,
    diagnostics: &mut Vec<Diagnostic>,
) -> Result<Vec<(String, String)>, BuildError> {
    let by_pk = field_name.ends_with("_by_pk");
    let has_plural_payload = field.argument("objects").is_some();
    if has_plural_payload
        && field.argument("object").is_some()
        && (request.object.is_some() || request.objects.is_some())
    {
        diagnostics::record(
            diagnostics,
            Diagnostic::AmbiguousInsertPayload {
                field_name: field_name.to_string(),
            },
        );
    }

    let mut bound = Vec::new();
    for (name, argument) in &field.args {
        if let Some(value) = resolve_value(name, request, by_pk, has_plural_payload) {
            let variable = variables.bind(&argument.ty, value)?;
            bound.push((name.clone(), variable));
        }
    }
    Ok(bound)
}

fn resolve_value(
    name: &str,
    request: &QueryRequest,
    by_pk: bool,
    has_plural_payload: bool,
) -> Option<Value> {
    // Primary-key columns: an argument literally named pk_columns takes the
    // whole map, anything else on a by-pk field binds by column name.
    if by_pk {
        if name == "pk_columns" {
            if let Some(pk_columns) = &request.pk_columns {
                return Some(to_object(pk_columns));
            }
        } else if let Some(value) = request
            .pk_columns
            .as_ref()
            .and_then(|columns| columns.get(name))
        {
            return Some(value.clone());
        }
    }

    // Update payload.
    if name == "_set" {
        if let Some(set_values) = &request.set_values {
            return Some(set_values.clone());
        }
    }

    // Insert payload; a single object is coerced into the plural argument.
    if name == "objects" {
        if let Some(objects) = &request.objects {
            return Some(objects.clone());
        }
        if let Some(object) = &request.object {
            return Some(Value::Array(vec![object.clone()]));
        }
    }
    if name == "object" {
        if has_plural_payload {
            return None;
        }
        if let Some(object) = &request.object {
            return Some(object.clone());
        }
    }

    // The argument bag.
    if let Some(value) = request.r#where.as_ref().and_then(|bag| bag.get(name)) {
        return Some(value.clone());
    }

    // distinct_on, reads only.
    if name == "distinct_on" && request.operation.is_read() {
        if let Some(value) = &request.distinct_on {
            return Some(value.clone());
        }
    }

    // Same-named request fields; an argument named where takes the whole
    // bag, which is the boolean-expression convention.
    match name {
        "where" => request.r#where.as_ref().map(to_object),
        "limit" => request.limit.clone(),
        "offset" => request.offset.clone(),
        "order_by" => request.order_by.clone(),
        _ => None,
    }
}

fn to_object(map: &indexmap::IndexMap<String, Value>) -> Value {
    Value::Object(map.clone().into_iter().collect())
}

#[cfg(test)]
mod tests {
    use graphql_registry::{MetaField, TypeKind, TypeRef};
    use serde_json::json;

    use super::*;
    use crate::request::OperationKind;

    fn scalar(name: &str) -> TypeRef {
        TypeRef::named(TypeKind::Scalar, name)
    }

    fn bind(
        field: &MetaField,
        field_name: &str,
        request: &QueryRequest,
    ) -> (Vec<(String, String)>, Vec<Diagnostic>) {
        let mut variables = VariableBinder::new(request.var_counter);
        let mut diagnostics = Vec::new();
        let bound = bind_root(field, field_name, request, &mut variables, &mut diagnostics)
            .unwrap();
        (bound, diagnostics)
    }

    #[test]
    fn binds_the_whole_bag_to_a_where_argument() {
        let field = MetaField::new("widgets", scalar("widgets"))
            .with_argument("where", TypeRef::named(TypeKind::InputObject, "widgets_bool_exp"))
            .with_argument("limit", scalar("Int"));
        let request = QueryRequest::new(OperationKind::Query, "widgets")
            .with_argument("status", json!({ "_eq": "open" }))
            .with_limit(json!(10));

        let (bound, diagnostics) = bind(&field, "widgets", &request);
        assert!(diagnostics.is_empty());
        assert_eq!(
            bound,
            [
                ("where".to_string(), "v0".to_string()),
                ("limit".to_string(), "v1".to_string())
            ]
        );
    }

    #[test]
    fn the_bag_binds_generic_arguments_by_name() {
        let field = MetaField::new("user", scalar("users")).with_argument("id", scalar("uuid"));
        let request =
            QueryRequest::new(OperationKind::Query, "user").with_argument("id", json!("abc"));

        let (bound, _) = bind(&field, "user", &request);
        assert_eq!(bound, [("id".to_string(), "v0".to_string())]);
    }

    #[test]
    fn by_pk_fields_bind_pk_columns_by_name() {
        let field = MetaField::new("widgets_by_pk", scalar("widgets"))
            .with_argument("id", scalar("uuid"));
        let request = QueryRequest::new(OperationKind::Query, "widgets")
            .with_pk_column("id", json!(7));

        let (bound, _) = bind(&field, "widgets_by_pk", &request);
        assert_eq!(bound, [("id".to_string(), "v0".to_string())]);
    }

    #[test]
    fn update_by_pk_binds_the_whole_pk_columns_map() {
        let field = MetaField::new("update_widgets_by_pk", scalar("widgets"))
            .with_argument(
                "pk_columns",
                TypeRef::named(TypeKind::InputObject, "widgets_pk_columns_input"),
            )
            .with_argument(
                "_set",
                TypeRef::named(TypeKind::InputObject, "widgets_set_input"),
            );
        let request = QueryRequest::new(OperationKind::Update, "widgets")
            .with_pk_column("id", json!(7))
            .with_set_values(json!({ "name": "renamed" }));

        let (bound, _) = bind(&field, "update_widgets_by_pk", &request);
        assert_eq!(
            bound,
            [
                ("pk_columns".to_string(), "v0".to_string()),
                ("_set".to_string(), "v1".to_string())
            ]
        );
    }

    #[test]
    fn ambiguous_insert_payloads_prefer_the_plural_argument() {
        let field = MetaField::new("insert_widgets", scalar("widgets_mutation_response"))
            .with_argument(
                "objects",
                TypeRef::list(TypeRef::named(TypeKind::InputObject, "widgets_insert_input")),
            )
            .with_argument(
                "object",
                TypeRef::named(TypeKind::InputObject, "widgets_insert_input"),
            );
        let request = QueryRequest::new(OperationKind::Insert, "widgets")
            .with_object(json!({ "name": "a" }));

        let (bound, diagnostics) = bind(&field, "insert_widgets", &request);
        assert_eq!(bound, [("objects".to_string(), "v0".to_string())]);
        assert_eq!(
            diagnostics,
            [Diagnostic::AmbiguousInsertPayload {
                field_name: "insert_widgets".to_string()
            }]
        );
    }

    #[test]
    fn distinct_on_binds_for_reads_only() {
        let field = MetaField::new("widgets", scalar("widgets")).with_argument(
            "distinct_on",
            TypeRef::list(TypeRef::named(TypeKind::Enum, "widgets_select_column")),
        );

        let read = QueryRequest::new(OperationKind::Query, "widgets");
        let read = QueryRequest {
            distinct_on: Some(json!(["name"])),
            ..read
        };
        let (bound, _) = bind(&field, "widgets", &read);
        assert_eq!(bound.len(), 1);

        let written = QueryRequest::new(OperationKind::Delete, "widgets");
        let written = QueryRequest {
            distinct_on: Some(json!(["name"])),
            ..written
        };
        let (bound, _) = bind(&field, "delete_widgets", &written);
        assert!(bound.is_empty());
    }
}
