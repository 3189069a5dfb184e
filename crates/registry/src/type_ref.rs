use std::fmt;

use crate::SchemaError;

/// The `__TypeKind` values an introspection document can report.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TypeKind {
    Scalar,
    Object,
    Interface,
    Union,
    Enum,
    InputObject,
    List,
    NonNull,
}

impl TypeKind {
    pub fn is_wrapper(self) -> bool {
        matches!(self, TypeKind::List | TypeKind::NonNull)
    }
}

/// A possibly wrapped type reference, exactly as introspection reports it:
/// `[widgets!]!` arrives as `NON_NULL → LIST → NON_NULL → widgets`.
///
/// Wrapper nodes (`LIST`, `NON_NULL`) carry `of_type` and no `name`;
/// terminal nodes carry `name` and no `of_type`.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TypeRef {
    pub kind: TypeKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub of_type: Option<Box<TypeRef>>,
}

impl TypeRef {
    pub fn named(kind: TypeKind, name: impl Into<String>) -> Self {
        TypeRef {
            kind,
            name: Some(name.into()),
            of_type: None,
        }
    }

    pub fn list(inner: TypeRef) -> Self {
        TypeRef {
            kind: TypeKind::List,
            name: None,
            of_type: Some(Box::new(inner)),
        }
    }

    pub fn non_null(inner: TypeRef) -> Self {
        TypeRef {
            kind: TypeKind::NonNull,
            name: None,
            of_type: Some(Box::new(inner)),
        }
    }

    /// Strips the wrappers down to the terminal named type.
    ///
    /// This is the single place wrapping is interpreted; every consumer
    /// works from the returned [`UnwrappedType`] instead of walking
    /// `of_type` chains itself.
    pub fn unwrapped(&self) -> Result<UnwrappedType<'_>, SchemaError> {
        let mut current = self;
        let mut is_non_null = false;
        let mut is_list = false;
        let mut is_list_item_non_null = false;

        if current.kind == TypeKind::NonNull {
            is_non_null = true;
            current = current.inner()?;
        }
        if current.kind == TypeKind::List {
            is_list = true;
            current = current.inner()?;
            if current.kind == TypeKind::NonNull {
                is_list_item_non_null = true;
                current = current.inner()?;
            }
        }

        match current.name.as_deref() {
            Some(base_name) if !current.kind.is_wrapper() => Ok(UnwrappedType {
                base_name,
                is_list,
                is_non_null,
                is_list_item_non_null,
            }),
            _ => Err(SchemaError::UnnamedType { kind: current.kind }),
        }
    }

    fn inner(&self) -> Result<&TypeRef, SchemaError> {
        self.of_type
            .as_deref()
            .ok_or(SchemaError::MissingInnerType { kind: self.kind })
    }
}

/// A type reference with its wrappers interpreted: `[widgets!]!` becomes
/// `base_name: "widgets"` with all three flags set.
///
/// The `Display` impl renders the canonical wire syntax back out, which is
/// what variable declarations use.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct UnwrappedType<'a> {
    pub base_name: &'a str,
    pub is_list: bool,
    pub is_non_null: bool,
    pub is_list_item_non_null: bool,
}

impl fmt::Display for UnwrappedType<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_list {
            f.write_str("[")?;
            f.write_str(self.base_name)?;
            if self.is_list_item_non_null {
                f.write_str("!")?;
            }
            f.write_str("]")?;
        } else {
            f.write_str(self.base_name)?;
        }
        if self.is_non_null {
            f.write_str("!")?;
        }
        Ok(())
    }
}
