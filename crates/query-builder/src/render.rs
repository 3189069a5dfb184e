//! Rendering of the final document text.

use inflector::Inflector;
use itertools::Itertools;

use crate::{request::OperationKind, selection::SelectionNode, variables::Declaration};

/// Two-space-indented output buffer.
struct Buffer {
    inner: String,
    indent: usize,
}

impl Buffer {
    fn new() -> Self {
        Buffer {
            inner: String::new(),
            indent: 0,
        }
    }

    fn line(&mut self, text: &str) {
        for _ in 0..self.indent {
            self.inner.push_str("  ");
        }
        self.inner.push_str(text);
        self.inner.push('\n');
    }
}

/// `Query` / `Mutation` / `Subscription` plus the PascalCase field name.
pub(crate) fn operation_name(operation: OperationKind, field_name: &str) -> String {
    let prefix = match operation {
        OperationKind::Query => "Query",
        OperationKind::Subscription => "Subscription",
        OperationKind::Insert | OperationKind::Update | OperationKind::Delete => "Mutation",
    };
    format!("{prefix}{}", field_name.to_pascal_case())
}

/// Renders the whole executable document: operation header with variable
/// declarations, the selection tree, then any fragments verbatim.
pub(crate) fn render_document(
    operation: OperationKind,
    declarations: &[Declaration],
    root: &SelectionNode,
    fragments: &[String],
) -> String {
    let mut buffer = Buffer::new();

    let mut header = format!(
        "{} {}",
        operation.keyword(),
        operation_name(operation, &root.field_name)
    );
    if !declarations.is_empty() {
        let list = declarations.iter().format_with(", ", |declaration, f| {
            f(&format_args!("${}: {}", declaration.name, declaration.ty))
        });
        header.push_str(&format!("({list})"));
    }
    header.push_str(" {");
    buffer.line(&header);

    buffer.indent += 1;
    write_node(&mut buffer, root);
    buffer.indent -= 1;
    buffer.line("}");

    for fragment in fragments {
        let fragment = fragment.trim();
        if !fragment.is_empty() {
            buffer.line(fragment);
        }
    }

    buffer.inner
}

fn write_node(buffer: &mut Buffer, node: &SelectionNode) {
    let mut line = match &node.alias {
        Some(alias) if alias != &node.field_name => format!("{alias}: {}", node.field_name),
        _ => node.field_name.clone(),
    };
    if !node.arguments.is_empty() {
        let arguments = node.arguments.iter().format_with(", ", |(name, variable), f| {
            f(&format_args!("{name}: ${variable}"))
        });
        line.push_str(&format!("({arguments})"));
    }

    if node.children.is_empty() {
        buffer.line(&line);
        return;
    }
    line.push_str(" {");
    buffer.line(&line);
    buffer.indent += 1;
    for child in &node.children {
        write_node(buffer, child);
    }
    buffer.indent -= 1;
    buffer.line("}");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_operations_after_the_resolved_field() {
        assert_eq!(
            operation_name(OperationKind::Query, "widgets_by_pk"),
            "QueryWidgetsByPk"
        );
        assert_eq!(
            operation_name(OperationKind::Delete, "delete_widgets"),
            "MutationDeleteWidgets"
        );
        assert_eq!(
            operation_name(OperationKind::Subscription, "widgets_aggregate"),
            "SubscriptionWidgetsAggregate"
        );
    }
}
