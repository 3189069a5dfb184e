//! Schema index over a GraphQL introspection document.
//!
//! A [`Registry`] is built once per schema load and consulted read-only
//! afterwards: the query builder resolves root operation types, field
//! descriptors and wrapped type references through it. Nothing in here
//! mutates after construction, so a `&Registry` can be shared freely
//! across threads.

use std::collections::BTreeMap;

mod introspection;
mod type_ref;
mod types;

pub use introspection::IntrospectionSchema;
pub use type_ref::{TypeKind, TypeRef, UnwrappedType};
pub use types::*;

/// Errors raised while ingesting an introspection document or resolving a
/// type reference against it. All of these indicate a malformed or
/// incomplete schema and abort the caller's operation.
#[derive(Debug, thiserror::Error)]
pub enum SchemaError {
    #[error("could not deserialize the introspection document: {0}")]
    Json(#[from] serde_json::Error),

    #[error("the introspection document declares no queryType")]
    MissingQueryRoot,

    #[error("found a {kind:?} type with no name")]
    UnnamedType { kind: TypeKind },

    #[error("a {kind:?} type reference is missing its inner ofType")]
    MissingInnerType { kind: TypeKind },

    #[error("schema type {name} has wrapper kind {kind:?}")]
    UnexpectedWrapper { name: String, kind: TypeKind },
}

/// The schema index: every named type plus the root operation type names.
#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct Registry {
    pub types: BTreeMap<String, MetaType>,
    pub query_type: String,
    pub mutation_type: Option<String>,
    pub subscription_type: Option<String>,
}

impl Registry {
    /// Builds the index from raw introspection JSON.
    ///
    /// Accepts the standard envelopes: `{"data": {"__schema": …}}`,
    /// `{"__schema": …}` or the bare schema object. Reserved `__*`
    /// introspection machinery types are dropped during ingestion.
    pub fn from_introspection_json(document: &str) -> Result<Self, SchemaError> {
        introspection::parse(document)?.into_registry()
    }

    /// Builds the index from an already deserialized introspection schema.
    pub fn from_introspection(schema: IntrospectionSchema) -> Result<Self, SchemaError> {
        schema.into_registry()
    }

    pub fn lookup_type(&self, name: &str) -> Option<&MetaType> {
        self.types.get(name)
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self {
            types: BTreeMap::new(),
            query_type: "Query".to_string(),
            mutation_type: None,
            subscription_type: None,
        }
    }
}
