use indexmap::IndexMap;

use crate::TypeRef;

/// A named schema type, as indexed by [`Registry::types`](crate::Registry).
#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub enum MetaType {
    Scalar(ScalarType),
    Object(ObjectType),
    Interface(InterfaceType),
    Union(UnionType),
    Enum(EnumType),
    InputObject(InputObjectType),
}

impl MetaType {
    pub fn name(&self) -> &str {
        match self {
            MetaType::Scalar(inner) => &inner.name,
            MetaType::Object(inner) => &inner.name,
            MetaType::Interface(inner) => &inner.name,
            MetaType::Union(inner) => &inner.name,
            MetaType::Enum(inner) => &inner.name,
            MetaType::InputObject(inner) => &inner.name,
        }
    }

    /// Output fields in declaration order, for the kinds that have them.
    pub fn fields(&self) -> Option<&IndexMap<String, MetaField>> {
        match self {
            MetaType::Object(inner) => Some(&inner.fields),
            MetaType::Interface(inner) => Some(&inner.fields),
            _ => None,
        }
    }

    pub fn field(&self, name: &str) -> Option<&MetaField> {
        self.fields().and_then(|fields| fields.get(name))
    }

    /// Scalars and enums render without a sub-selection.
    pub fn is_leaf(&self) -> bool {
        matches!(self, MetaType::Scalar(_) | MetaType::Enum(_))
    }
}

#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct ScalarType {
    pub name: String,
}

#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct ObjectType {
    pub name: String,
    pub fields: IndexMap<String, MetaField>,
}

impl ObjectType {
    pub fn new(name: impl Into<String>, fields: impl IntoIterator<Item = MetaField>) -> Self {
        ObjectType {
            name: name.into(),
            fields: fields
                .into_iter()
                .map(|field| (field.name.clone(), field))
                .collect(),
        }
    }
}

#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct InterfaceType {
    pub name: String,
    pub fields: IndexMap<String, MetaField>,
}

#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct UnionType {
    pub name: String,
}

#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct EnumType {
    pub name: String,
}

#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct InputObjectType {
    pub name: String,
}

impl From<ScalarType> for MetaType {
    fn from(value: ScalarType) -> Self {
        MetaType::Scalar(value)
    }
}

impl From<ObjectType> for MetaType {
    fn from(value: ObjectType) -> Self {
        MetaType::Object(value)
    }
}

impl From<InterfaceType> for MetaType {
    fn from(value: InterfaceType) -> Self {
        MetaType::Interface(value)
    }
}

impl From<UnionType> for MetaType {
    fn from(value: UnionType) -> Self {
        MetaType::Union(value)
    }
}

impl From<EnumType> for MetaType {
    fn from(value: EnumType) -> Self {
        MetaType::Enum(value)
    }
}

impl From<InputObjectType> for MetaType {
    fn from(value: InputObjectType) -> Self {
        MetaType::InputObject(value)
    }
}

/// A field declaration: result type plus arguments, in declaration order.
#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct MetaField {
    pub name: String,
    pub ty: TypeRef,
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub args: IndexMap<String, MetaInputValue>,
}

impl MetaField {
    pub fn new(name: impl Into<String>, ty: TypeRef) -> Self {
        MetaField {
            name: name.into(),
            ty,
            args: IndexMap::new(),
        }
    }

    #[must_use]
    pub fn with_argument(mut self, name: impl Into<String>, ty: TypeRef) -> Self {
        let name = name.into();
        self.args.insert(name.clone(), MetaInputValue { name, ty });
        self
    }

    pub fn argument(&self, name: &str) -> Option<&MetaInputValue> {
        self.args.get(name)
    }
}

#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct MetaInputValue {
    pub name: String,
    pub ty: TypeRef,
}
