//! Resolution of the root field a request targets, by naming convention.

use graphql_registry::{MetaField, Registry};

use crate::{
    request::{OperationKind, QueryRequest},
    BuildError,
};

/// The resolved root field together with the name that matched.
#[derive(Debug)]
pub(crate) struct ResolvedField<'a> {
    pub name: String,
    pub field: &'a MetaField,
}

/// Candidate field names in priority order for the request, following the
/// collection naming conventions: aggregate first, then by-pk variants,
/// then singular insert, then the bulk mutation names, and the bare
/// collection as the last resort.
pub(crate) fn candidates(request: &QueryRequest) -> Vec<String> {
    let collection = &request.collection;
    let mut names = Vec::new();

    if request.aggregate.is_some() {
        names.push(format!("{collection}_aggregate"));
    }
    if request.pk_columns.is_some() {
        match request.operation {
            OperationKind::Query | OperationKind::Subscription => {
                names.push(format!("{collection}_by_pk"));
            }
            OperationKind::Update => names.push(format!("update_{collection}_by_pk")),
            OperationKind::Delete => names.push(format!("delete_{collection}_by_pk")),
            OperationKind::Insert => {}
        }
    }
    match request.operation {
        OperationKind::Insert => {
            if request.object.is_some() && request.objects.is_none() {
                names.push(format!("insert_{collection}_one"));
            }
            names.push(format!("insert_{collection}"));
        }
        OperationKind::Update => names.push(format!("update_{collection}")),
        OperationKind::Delete => names.push(format!("delete_{collection}")),
        OperationKind::Query | OperationKind::Subscription => {}
    }
    names.push(collection.clone());
    names
}

/// Walks the candidates in order and returns the first field the
/// operation's root type declares.
pub(crate) fn resolve<'a>(
    registry: &'a Registry,
    request: &QueryRequest,
) -> Result<ResolvedField<'a>, BuildError> {
    let root_name = match request.operation {
        OperationKind::Query => Some(registry.query_type.as_str()),
        OperationKind::Subscription => registry.subscription_type.as_deref(),
        OperationKind::Insert | OperationKind::Update | OperationKind::Delete => {
            registry.mutation_type.as_deref()
        }
    };
    let root = root_name
        .and_then(|name| registry.lookup_type(name))
        .ok_or(BuildError::MissingOperationRoot(request.operation.keyword()))?;

    let names = candidates(request);
    for name in &names {
        if let Some(field) = root.field(name) {
            return Ok(ResolvedField {
                name: name.clone(),
                field,
            });
        }
    }
    Err(BuildError::UnresolvedField {
        root_type: root.name().to_string(),
        collection: request.collection.clone(),
        candidates: names,
    })
}

#[cfg(test)]
mod tests {
    use graphql_registry::{MetaField, ObjectType, TypeKind, TypeRef};
    use rstest::rstest;
    use serde_json::json;

    use super::*;

    #[rstest]
    #[case::plain_query(
        QueryRequest::new(OperationKind::Query, "widgets"),
        &["widgets"]
    )]
    #[case::query_by_pk(
        QueryRequest::new(OperationKind::Query, "widgets").with_pk_column("id", json!(1)),
        &["widgets_by_pk", "widgets"]
    )]
    #[case::aggregate_before_by_pk(
        QueryRequest::new(OperationKind::Query, "widgets")
            .with_pk_column("id", json!(1))
            .with_aggregate(Default::default()),
        &["widgets_aggregate", "widgets_by_pk", "widgets"]
    )]
    #[case::subscription_by_pk(
        QueryRequest::new(OperationKind::Subscription, "widgets").with_pk_column("id", json!(1)),
        &["widgets_by_pk", "widgets"]
    )]
    #[case::update_by_pk(
        QueryRequest::new(OperationKind::Update, "widgets").with_pk_column("id", json!(1)),
        &["update_widgets_by_pk", "update_widgets", "widgets"]
    )]
    #[case::delete_by_pk(
        QueryRequest::new(OperationKind::Delete, "widgets").with_pk_column("id", json!(1)),
        &["delete_widgets_by_pk", "delete_widgets", "widgets"]
    )]
    #[case::insert_single_object(
        QueryRequest::new(OperationKind::Insert, "widgets").with_object(json!({})),
        &["insert_widgets_one", "insert_widgets", "widgets"]
    )]
    #[case::insert_bulk(
        QueryRequest::new(OperationKind::Insert, "widgets").with_objects(json!([{}])),
        &["insert_widgets", "widgets"]
    )]
    #[case::insert_ignores_pk_columns(
        QueryRequest::new(OperationKind::Insert, "widgets")
            .with_objects(json!([{}]))
            .with_pk_column("id", json!(1)),
        &["insert_widgets", "widgets"]
    )]
    fn candidate_order(#[case] request: QueryRequest, #[case] expected: &[&str]) {
        assert_eq!(candidates(&request), expected);
    }

    fn widgets_type() -> TypeRef {
        TypeRef::named(TypeKind::Object, "widgets")
    }

    fn registry() -> Registry {
        let mut registry = Registry {
            query_type: "query_root".to_string(),
            mutation_type: Some("mutation_root".to_string()),
            subscription_type: None,
            ..Default::default()
        };
        let query_root = ObjectType::new(
            "query_root",
            [
                MetaField::new("widgets", TypeRef::list(widgets_type())),
                MetaField::new("widgets_by_pk", widgets_type()),
                MetaField::new("widgets_aggregate", TypeRef::named(TypeKind::Object, "widgets_aggregate")),
            ],
        );
        let mutation_root = ObjectType::new(
            "mutation_root",
            [
                MetaField::new("insert_widgets", widgets_type()),
                MetaField::new("insert_widgets_one", widgets_type()),
                MetaField::new("delete_widgets", widgets_type()),
            ],
        );
        registry
            .types
            .insert("query_root".to_string(), query_root.into());
        registry
            .types
            .insert("mutation_root".to_string(), mutation_root.into());
        registry
    }

    #[test]
    fn by_pk_wins_over_the_bare_collection() {
        let registry = registry();
        let request = QueryRequest::new(OperationKind::Query, "widgets")
            .with_pk_column("id", json!(1));
        let resolved = resolve(&registry, &request).unwrap();
        assert_eq!(resolved.name, "widgets_by_pk");
    }

    #[test]
    fn aggregate_wins_over_by_pk() {
        let registry = registry();
        let request = QueryRequest::new(OperationKind::Query, "widgets")
            .with_pk_column("id", json!(1))
            .with_aggregate(Default::default());
        let resolved = resolve(&registry, &request).unwrap();
        assert_eq!(resolved.name, "widgets_aggregate");
    }

    #[test]
    fn single_object_inserts_prefer_the_one_variant() {
        let registry = registry();
        let request =
            QueryRequest::new(OperationKind::Insert, "widgets").with_object(json!({ "name": "a" }));
        let resolved = resolve(&registry, &request).unwrap();
        assert_eq!(resolved.name, "insert_widgets_one");

        let request = QueryRequest::new(OperationKind::Insert, "widgets")
            .with_objects(json!([{ "name": "a" }]));
        let resolved = resolve(&registry, &request).unwrap();
        assert_eq!(resolved.name, "insert_widgets");
    }

    #[test]
    fn unresolved_fields_report_every_candidate() {
        let request = QueryRequest::new(OperationKind::Update, "widgets")
            .with_pk_column("id", json!(1));
        let err = resolve(&registry(), &request).unwrap_err();
        let BuildError::UnresolvedField {
            root_type,
            candidates,
            ..
        } = err
        else {
            panic!("expected an unresolved field error")
        };
        assert_eq!(root_type, "mutation_root");
        assert_eq!(
            candidates,
            ["update_widgets_by_pk", "update_widgets", "widgets"]
        );
    }

    #[test]
    fn a_missing_root_is_an_error() {
        let request = QueryRequest::new(OperationKind::Subscription, "widgets");
        let err = resolve(&registry(), &request).unwrap_err();
        assert!(matches!(err, BuildError::MissingOperationRoot("subscription")));
    }
}
