use std::fmt;

/// A non-fatal problem encountered while compiling a request.
///
/// Diagnostics never abort compilation: the offending piece is skipped or
/// replaced with something valid and the document still builds. Each one is
/// logged as it happens and returned on
/// [`CompiledQuery::diagnostics`](crate::CompiledQuery) so callers can
/// surface them.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Diagnostic {
    /// A selection key did not match any field on the parent type.
    UnknownField {
        type_name: String,
        field_name: String,
    },
    /// The insert field declares both `objects` and `object`; the plural
    /// form won.
    AmbiguousInsertPayload { field_name: String },
    /// A bulk mutation whose payload type lacks the
    /// `affected_rows`/`returning` envelope.
    MissingMutationEnvelope {
        field_name: String,
        type_name: String,
    },
    /// A column-function spec on a field that declares no `columns`
    /// argument.
    MissingColumnsArgument {
        type_name: String,
        field_name: String,
    },
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Diagnostic::UnknownField {
                type_name,
                field_name,
            } => {
                write!(f, "unknown field {field_name} on {type_name}, skipping it")
            }
            Diagnostic::AmbiguousInsertPayload { field_name } => {
                write!(
                    f,
                    "{field_name} declares both objects and object, binding the plural form"
                )
            }
            Diagnostic::MissingMutationEnvelope {
                field_name,
                type_name,
            } => {
                write!(
                    f,
                    "{field_name} returns {type_name} which has no affected_rows/returning envelope"
                )
            }
            Diagnostic::MissingColumnsArgument {
                type_name,
                field_name,
            } => {
                write!(
                    f,
                    "{type_name}.{field_name} declares no columns argument, rendering it bare"
                )
            }
        }
    }
}

/// Records a diagnostic, logging it at the point of recovery.
pub(crate) fn record(diagnostics: &mut Vec<Diagnostic>, diagnostic: Diagnostic) {
    tracing::warn!("{diagnostic}");
    diagnostics.push(diagnostic);
}
