//! Compilation of [`ReturningSpec`] shapes into selection trees.

use graphql_registry::{MetaField, MetaType, Registry};
use indexmap::IndexMap;
use serde_json::Value;

use crate::{
    diagnostics::{self, Diagnostic},
    returning::{split_alias, FieldSpec, NestedQuery, ReturningSpec},
    variables::VariableBinder,
    BuildError,
};

/// One field of the document under construction.
#[derive(Clone, Debug, PartialEq)]
pub(crate) struct SelectionNode {
    pub field_name: String,
    pub alias: Option<String>,
    /// Argument name → variable name, without the `$` sigil.
    pub arguments: Vec<(String, String)>,
    pub children: Vec<SelectionNode>,
}

impl SelectionNode {
    pub fn leaf(field_name: impl Into<String>) -> Self {
        SelectionNode {
            field_name: field_name.into(),
            alias: None,
            arguments: Vec::new(),
            children: Vec::new(),
        }
    }
}

/// Walks a selection spec against the schema, producing nodes, binding
/// nested arguments and recording diagnostics for anything it has to skip.
pub(crate) struct SelectionCompiler<'a> {
    registry: &'a Registry,
    variables: &'a mut VariableBinder,
    diagnostics: &'a mut Vec<Diagnostic>,
}

impl<'a> SelectionCompiler<'a> {
    pub fn new(
        registry: &'a Registry,
        variables: &'a mut VariableBinder,
        diagnostics: &'a mut Vec<Diagnostic>,
    ) -> Self {
        SelectionCompiler {
            registry,
            variables,
            diagnostics,
        }
    }

    pub fn compile_spec(
        &mut self,
        parent: &MetaType,
        spec: &ReturningSpec,
    ) -> Result<Vec<SelectionNode>, BuildError> {
        match spec {
            // A bare string is whitespace-joined field names.
            ReturningSpec::Leaf(joined) => {
                Ok(joined.split_whitespace().map(SelectionNode::leaf).collect())
            }
            ReturningSpec::List(items) => self.compile_list(parent, items),
            ReturningSpec::Tree(entries) => self.compile_tree(parent, entries),
        }
    }

    fn compile_list(
        &mut self,
        parent: &MetaType,
        items: &[ReturningSpec],
    ) -> Result<Vec<SelectionNode>, BuildError> {
        let mut nodes = Vec::new();
        for item in items {
            match item {
                // A string inside a list is a single field, kept verbatim.
                ReturningSpec::Leaf(leaf) => {
                    if !leaf.is_empty() {
                        nodes.push(SelectionNode::leaf(leaf));
                    }
                }
                ReturningSpec::Tree(entries) => nodes.extend(self.compile_tree(parent, entries)?),
                ReturningSpec::List(inner) => nodes.extend(self.compile_list(parent, inner)?),
            }
        }
        Ok(nodes)
    }

    pub fn compile_tree(
        &mut self,
        parent: &MetaType,
        entries: &IndexMap<String, FieldSpec>,
    ) -> Result<Vec<SelectionNode>, BuildError> {
        let mut nodes = Vec::new();
        for (key, spec) in entries {
            if let Some(node) = self.compile_field(parent, key, spec)? {
                nodes.push(node);
            }
        }
        Ok(nodes)
    }

    /// Default fields first, then the caller's entries: a caller key whose
    /// base name matches a default displaces it, and the compiled field is
    /// appended after the survivors.
    pub fn merge_with_defaults(
        &mut self,
        parent: &MetaType,
        entries: &IndexMap<String, FieldSpec>,
    ) -> Result<Vec<SelectionNode>, BuildError> {
        let mut nodes = default_leaf_fields(self.registry, parent);
        for (key, spec) in entries {
            let (base, _) = split_alias(key);
            nodes.retain(|node| node.field_name != base);
            if let Some(node) = self.compile_field(parent, key, spec)? {
                nodes.push(node);
            }
        }
        if nodes.is_empty() {
            nodes = synthesized_selection(self.registry, parent);
        }
        Ok(nodes)
    }

    fn compile_field(
        &mut self,
        parent: &MetaType,
        key: &str,
        spec: &FieldSpec,
    ) -> Result<Option<SelectionNode>, BuildError> {
        if matches!(spec, FieldSpec::Toggle(false)) {
            return Ok(None);
        }

        let (field_name, key_alias) = split_alias(key);
        let Some(field) = parent.field(field_name) else {
            diagnostics::record(
                self.diagnostics,
                Diagnostic::UnknownField {
                    type_name: parent.name().to_string(),
                    field_name: field_name.to_string(),
                },
            );
            return Ok(None);
        };

        let base_name = field.ty.unwrapped()?.base_name;
        let base_type = self.registry.lookup_type(base_name);

        let mut node = SelectionNode {
            field_name: field_name.to_string(),
            alias: key_alias.map(str::to_string),
            arguments: Vec::new(),
            children: Vec::new(),
        };

        match spec {
            FieldSpec::Toggle(_) => {}
            FieldSpec::ColumnCall(columns) => match field.argument("columns") {
                Some(argument) => {
                    let variable = self
                        .variables
                        .bind(&argument.ty, Value::from(columns.clone()))?;
                    node.arguments.push(("columns".to_string(), variable));
                }
                None => diagnostics::record(
                    self.diagnostics,
                    Diagnostic::MissingColumnsArgument {
                        type_name: parent.name().to_string(),
                        field_name: field_name.to_string(),
                    },
                ),
            },
            FieldSpec::Selection(selection) => match base_type {
                Some(base_type) => node.children = self.compile_spec(base_type, selection)?,
                None => tracing::debug!(
                    "type {base_name} behind {field_name} is not indexed, rendering it bare"
                ),
            },
            FieldSpec::Nested(nested) => {
                if let Some(alias) = &nested.alias {
                    node.alias = Some(alias.clone());
                }
                self.bind_field_arguments(field, nested, &mut node)?;
                match base_type {
                    Some(base_type) => {
                        node.children = if field_name.ends_with("_aggregate") {
                            // On aggregate fields everything that is not an
                            // argument merges into one return map.
                            let mut children = self.compile_tree(base_type, &nested.fields)?;
                            if let Some(returning) = &nested.returning {
                                children.extend(self.compile_spec(base_type, returning)?);
                            }
                            children
                        } else if let Some(returning) = &nested.returning {
                            self.compile_spec(base_type, returning)?
                        } else {
                            self.compile_tree(base_type, &nested.fields)?
                        };
                    }
                    None => tracing::debug!(
                        "type {base_name} behind {field_name} is not indexed, rendering it bare"
                    ),
                }
            }
        }

        if node.children.is_empty() {
            if let Some(base_type) = base_type {
                if !base_type.is_leaf() {
                    node.children = synthesized_selection(self.registry, base_type);
                }
            }
        }

        Ok(Some(node))
    }

    /// Binds the reserved keys the field actually declares as arguments, in
    /// declaration order.
    fn bind_field_arguments(
        &mut self,
        field: &MetaField,
        nested: &NestedQuery,
        node: &mut SelectionNode,
    ) -> Result<(), BuildError> {
        for (name, argument) in &field.args {
            let Some(value) = nested.argument_value(name) else {
                continue;
            };
            let variable = self.variables.bind(&argument.ty, value.clone())?;
            node.arguments.push((name.clone(), variable));
        }
        Ok(())
    }
}

/// The selection used when the caller asked for nothing: every default
/// field, or the minimal synthesized shape when there are none.
pub(crate) fn default_selection(registry: &Registry, ty: &MetaType) -> Vec<SelectionNode> {
    let defaults = default_leaf_fields(registry, ty);
    if defaults.is_empty() {
        synthesized_selection(registry, ty)
    } else {
        defaults
    }
}

/// The default fields of a type: those whose unwrapped base type is a
/// scalar or an enum.
pub(crate) fn default_leaf_fields(registry: &Registry, ty: &MetaType) -> Vec<SelectionNode> {
    let Some(fields) = ty.fields() else {
        return Vec::new();
    };
    fields
        .values()
        .filter(|field| {
            field
                .ty
                .unwrapped()
                .ok()
                .and_then(|unwrapped| registry.lookup_type(unwrapped.base_name))
                .is_some_and(MetaType::is_leaf)
        })
        .map(|field| SelectionNode::leaf(&field.name))
        .collect()
}

/// Fills an empty sub-selection with something valid: aggregate containers
/// get their `aggregate { count }` shape, ordinary objects `id`, with
/// `__typename` as the last resort.
pub(crate) fn synthesized_selection(registry: &Registry, ty: &MetaType) -> Vec<SelectionNode> {
    if ty.name().ends_with("_aggregate") {
        if let Some(aggregate) = ty.field("aggregate") {
            let fields_type = aggregate
                .ty
                .unwrapped()
                .ok()
                .and_then(|unwrapped| registry.lookup_type(unwrapped.base_name));
            let child = match fields_type.and_then(|ty| ty.field("count")) {
                Some(count) => SelectionNode::leaf(&count.name),
                None => SelectionNode::leaf("__typename"),
            };
            let mut node = SelectionNode::leaf("aggregate");
            node.children.push(child);
            return vec![node];
        }
        return vec![SelectionNode::leaf("__typename")];
    }
    if ty.field("id").is_some() {
        return vec![SelectionNode::leaf("id")];
    }
    vec![SelectionNode::leaf("__typename")]
}
