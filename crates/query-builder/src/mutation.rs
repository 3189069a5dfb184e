//! Bulk mutation envelope normalization.

use graphql_registry::{MetaType, Registry};

use crate::{
    diagnostics::{self, Diagnostic},
    request::OperationKind,
    selection::{self, SelectionNode},
};

/// Rewraps a bulk mutation selection into `affected_rows` plus
/// `returning { … }`, when the payload type declares that envelope.
///
/// By-pk and `_one` variants return the row type directly and are left
/// untouched, as is anything that is not a mutation.
pub(crate) fn normalize_envelope(
    registry: &Registry,
    operation: OperationKind,
    field_name: &str,
    payload: &MetaType,
    selection: Vec<SelectionNode>,
    diagnostics: &mut Vec<Diagnostic>,
) -> Vec<SelectionNode> {
    if !operation.is_mutation() || field_name.ends_with("_by_pk") || field_name.ends_with("_one") {
        return selection;
    }
    if payload.field("affected_rows").is_none() || payload.field("returning").is_none() {
        diagnostics::record(
            diagnostics,
            Diagnostic::MissingMutationEnvelope {
                field_name: field_name.to_string(),
                type_name: payload.name().to_string(),
            },
        );
        return selection;
    }

    let mut inner: Vec<SelectionNode> = selection
        .into_iter()
        .filter(|node| node.field_name != "affected_rows")
        .collect();
    if inner.is_empty() {
        inner = returning_element(registry, payload)
            .map(|element| selection::default_selection(registry, element))
            .unwrap_or_else(|| vec![SelectionNode::leaf("__typename")]);
    }

    let mut returning = SelectionNode::leaf("returning");
    returning.children = inner;
    vec![SelectionNode::leaf("affected_rows"), returning]
}

fn returning_element<'a>(registry: &'a Registry, payload: &MetaType) -> Option<&'a MetaType> {
    let field = payload.field("returning")?;
    let unwrapped = field.ty.unwrapped().ok()?;
    registry.lookup_type(unwrapped.base_name)
}
