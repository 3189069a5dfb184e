//! Serde model for the wire format of an introspection result, plus the
//! conversion into the indexed [`Registry`].

use std::collections::BTreeMap;

use indexmap::IndexMap;
use serde::Deserialize;

use crate::{
    EnumType, InputObjectType, InterfaceType, MetaField, MetaInputValue, MetaType, ObjectType,
    Registry, ScalarType, SchemaError, TypeKind, TypeRef, UnionType,
};

/// The `__schema` object of an introspection response.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IntrospectionSchema {
    pub query_type: Option<RootType>,
    pub mutation_type: Option<RootType>,
    pub subscription_type: Option<RootType>,
    #[serde(default)]
    pub types: Vec<IntrospectionType>,
}

#[derive(Debug, Deserialize)]
pub struct RootType {
    pub name: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IntrospectionType {
    pub kind: TypeKind,
    pub name: Option<String>,
    #[serde(default)]
    pub fields: Option<Vec<IntrospectionField>>,
}

#[derive(Debug, Deserialize)]
pub struct IntrospectionField {
    pub name: String,
    #[serde(default)]
    pub args: Vec<IntrospectionInputValue>,
    #[serde(rename = "type")]
    pub ty: TypeRef,
}

#[derive(Debug, Deserialize)]
pub struct IntrospectionInputValue {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: TypeRef,
}

/// Deserializes raw introspection JSON, peeling the standard envelopes:
/// `{"data": {"__schema": …}}`, `{"__schema": …}` or the bare schema object.
pub(crate) fn parse(document: &str) -> Result<IntrospectionSchema, SchemaError> {
    let mut value: serde_json::Value = serde_json::from_str(document)?;
    for key in ["data", "__schema"] {
        if let Some(inner) = value.get_mut(key) {
            value = inner.take();
        }
    }
    Ok(serde_json::from_value(value)?)
}

impl IntrospectionSchema {
    pub(crate) fn into_registry(self) -> Result<Registry, SchemaError> {
        let query_type = self.query_type.ok_or(SchemaError::MissingQueryRoot)?.name;
        let mut types = BTreeMap::new();

        for ty in self.types {
            let Some(name) = ty.name else {
                return Err(SchemaError::UnnamedType { kind: ty.kind });
            };
            // Reserved introspection machinery is never a query target.
            if name.starts_with("__") {
                continue;
            }
            let meta = match ty.kind {
                TypeKind::Scalar => MetaType::Scalar(ScalarType { name: name.clone() }),
                TypeKind::Object => MetaType::Object(ObjectType {
                    name: name.clone(),
                    fields: convert_fields(ty.fields),
                }),
                TypeKind::Interface => MetaType::Interface(InterfaceType {
                    name: name.clone(),
                    fields: convert_fields(ty.fields),
                }),
                TypeKind::Union => MetaType::Union(UnionType { name: name.clone() }),
                TypeKind::Enum => MetaType::Enum(EnumType { name: name.clone() }),
                TypeKind::InputObject => {
                    MetaType::InputObject(InputObjectType { name: name.clone() })
                }
                TypeKind::List | TypeKind::NonNull => {
                    return Err(SchemaError::UnexpectedWrapper { name, kind: ty.kind });
                }
            };
            types.insert(name, meta);
        }

        Ok(Registry {
            types,
            query_type,
            mutation_type: self.mutation_type.map(|ty| ty.name),
            subscription_type: self.subscription_type.map(|ty| ty.name),
        })
    }
}

fn convert_fields(fields: Option<Vec<IntrospectionField>>) -> IndexMap<String, MetaField> {
    fields
        .unwrap_or_default()
        .into_iter()
        .map(|field| {
            let args = field
                .args
                .into_iter()
                .map(|arg| (arg.name.clone(), MetaInputValue { name: arg.name, ty: arg.ty }))
                .collect();
            (
                field.name.clone(),
                MetaField {
                    name: field.name,
                    ty: field.ty,
                    args,
                },
            )
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use crate::Registry;

    fn schema_json() -> serde_json::Value {
        json!({
            "queryType": { "name": "query_root" },
            "mutationType": { "name": "mutation_root" },
            "types": [
                {
                    "kind": "OBJECT",
                    "name": "query_root",
                    "fields": [
                        {
                            "name": "widgets",
                            "args": [
                                {
                                    "name": "limit",
                                    "type": { "kind": "SCALAR", "name": "Int" }
                                }
                            ],
                            "type": {
                                "kind": "NON_NULL",
                                "ofType": {
                                    "kind": "LIST",
                                    "ofType": {
                                        "kind": "NON_NULL",
                                        "ofType": { "kind": "OBJECT", "name": "widgets" }
                                    }
                                }
                            }
                        }
                    ]
                },
                {
                    "kind": "OBJECT",
                    "name": "widgets",
                    "fields": [
                        {
                            "name": "id",
                            "type": {
                                "kind": "NON_NULL",
                                "ofType": { "kind": "SCALAR", "name": "uuid" }
                            }
                        }
                    ]
                },
                { "kind": "SCALAR", "name": "uuid" },
                { "kind": "SCALAR", "name": "Int" },
                { "kind": "OBJECT", "name": "__Schema", "fields": [] }
            ]
        })
    }

    #[test]
    fn ingests_a_data_enveloped_document() {
        let document = json!({ "data": { "__schema": schema_json() } }).to_string();
        let registry = Registry::from_introspection_json(&document).unwrap();

        assert_eq!(registry.query_type, "query_root");
        assert_eq!(registry.mutation_type.as_deref(), Some("mutation_root"));
        assert_eq!(registry.subscription_type, None);

        let root = registry.lookup_type("query_root").unwrap();
        let widgets = root.field("widgets").unwrap();
        assert_eq!(widgets.ty.unwrapped().unwrap().to_string(), "[widgets!]!");
        assert!(widgets.argument("limit").is_some());
    }

    #[test]
    fn ingests_a_bare_schema_object() {
        let document = schema_json().to_string();
        let registry = Registry::from_introspection_json(&document).unwrap();
        assert!(registry.lookup_type("widgets").is_some());
    }

    #[test]
    fn filters_introspection_machinery_types() {
        let document = json!({ "__schema": schema_json() }).to_string();
        let registry = Registry::from_introspection_json(&document).unwrap();
        assert!(registry.lookup_type("__Schema").is_none());
    }

    #[test]
    fn rejects_a_document_without_a_query_root() {
        let document = json!({ "__schema": { "types": [] } }).to_string();
        let err = Registry::from_introspection_json(&document).unwrap_err();
        assert_eq!(
            err.to_string(),
            "the introspection document declares no queryType"
        );
    }
}
