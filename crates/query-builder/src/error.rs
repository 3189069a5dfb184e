use indexmap::IndexMap;

/// Fatal compilation failures. Anything recoverable is a
/// [`Diagnostic`](crate::Diagnostic) instead.
#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    #[error(transparent)]
    Schema(#[from] graphql_registry::SchemaError),

    #[error("the schema exposes no {0} root")]
    MissingOperationRoot(&'static str),

    #[error("no field found for {collection} on {root_type}, tried: {}", candidates.join(", "))]
    UnresolvedField {
        root_type: String,
        collection: String,
        candidates: Vec<String>,
    },

    #[error("the schema does not define type {name}, returned by {field_name}")]
    UnknownPayloadType { name: String, field_name: String },

    #[error("generated document failed to parse: {source}")]
    MalformedDocument {
        document: String,
        variables: IndexMap<String, serde_json::Value>,
        source: graphql_parser::query::ParseError,
    },
}
