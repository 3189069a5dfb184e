//! Compiles declarative collection requests into GraphQL documents.
//!
//! Given a [`Registry`] built from schema introspection and a
//! [`QueryRequest`], [`build`] resolves the root field by naming
//! convention, binds every argument value to a `$v{n}` variable, compiles
//! the requested selection (synthesizing sensible defaults where the
//! caller gave none), normalizes bulk mutation envelopes and renders a
//! parse-validated document.
//!
//! Compilation is pure: the registry is only read, and all per-call state
//! (variable numbering, diagnostics) lives in the returned
//! [`CompiledQuery`].
#![cfg_attr(test, allow(unused_crate_dependencies))]

mod arguments;
mod diagnostics;
mod error;
mod mutation;
mod render;
mod request;
mod returning;
mod root_field;
mod selection;
mod variables;

pub use diagnostics::Diagnostic;
pub use error::BuildError;
pub use request::{OperationKind, QueryRequest};
pub use returning::{FieldSpec, NestedQuery, ReturningSpec};

use graphql_registry::Registry;
use indexmap::IndexMap;

use crate::{
    selection::{SelectionCompiler, SelectionNode},
    variables::VariableBinder,
};

/// A compiled document plus everything the caller needs to execute it.
#[derive(Clone, Debug)]
pub struct CompiledQuery {
    /// The rendered executable document, fragments included.
    pub query: String,
    /// Variable values keyed by variable name, in declaration order.
    pub variables: IndexMap<String, serde_json::Value>,
    /// The root field the request resolved to.
    pub field_name: String,
    /// Where `v{n}` numbering ended; thread this into the next request.
    pub next_var_counter: usize,
    /// Non-fatal problems encountered while compiling.
    pub diagnostics: Vec<Diagnostic>,
}

/// Compiles one request against the schema index.
pub fn build(registry: &Registry, request: &QueryRequest) -> Result<CompiledQuery, BuildError> {
    let resolved = root_field::resolve(registry, request)?;
    let payload_name = resolved.field.ty.unwrapped()?.base_name.to_string();
    let payload = registry
        .lookup_type(&payload_name)
        .ok_or_else(|| BuildError::UnknownPayloadType {
            name: payload_name.clone(),
            field_name: resolved.name.clone(),
        })?;

    let mut diagnostics = Vec::new();
    let mut variables = VariableBinder::new(request.var_counter);

    let arguments = arguments::bind_root(
        resolved.field,
        &resolved.name,
        request,
        &mut variables,
        &mut diagnostics,
    )?;

    let mut compiler = SelectionCompiler::new(registry, &mut variables, &mut diagnostics);
    let selection = match (&request.aggregate, &request.returning) {
        _ if payload.is_leaf() => Vec::new(),
        (Some(aggregate), _) => compiler.merge_with_defaults(payload, aggregate)?,
        (None, Some(ReturningSpec::Tree(entries))) => {
            compiler.merge_with_defaults(payload, entries)?
        }
        (None, Some(spec)) => {
            let nodes = compiler.compile_spec(payload, spec)?;
            if nodes.is_empty() {
                selection::default_selection(registry, payload)
            } else {
                nodes
            }
        }
        (None, None) => selection::default_selection(registry, payload),
    };
    let selection = mutation::normalize_envelope(
        registry,
        request.operation,
        &resolved.name,
        payload,
        selection,
        &mut diagnostics,
    );

    let root = SelectionNode {
        field_name: resolved.name.clone(),
        alias: None,
        arguments,
        children: selection,
    };
    let document = render::render_document(
        request.operation,
        variables.declarations(),
        &root,
        &request.fragments,
    );

    let next_var_counter = variables.counter();
    let variables = variables.into_values();
    let parse_error = graphql_parser::parse_query::<String>(&document).err();
    if let Some(source) = parse_error {
        tracing::error!("generated an unparseable document: {source}");
        return Err(BuildError::MalformedDocument {
            document,
            variables,
            source,
        });
    }
    tracing::debug!(field_name = %resolved.name, "compiled document");

    Ok(CompiledQuery {
        query: document,
        variables,
        field_name: resolved.name,
        next_var_counter,
        diagnostics,
    })
}
