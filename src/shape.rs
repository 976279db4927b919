//! Shapes: what a structured type looks like from the outside
//!
//! An [`InputShape`] lists the fields a constructor accepts and how each is
//! passed; an [`OutputShape`] lists the fields that can be read back and
//! how. Field types may mention the type parameters declared in
//! [`ShapeGenerics`]; [`resolve`](crate::provider::shape) substitutes them
//! for a concrete parametrization.

use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::sync::Arc;

use bindery_value::Value;
use indexmap::IndexMap;

use crate::pipeline::ParseError;
use crate::types::{NormType, TypeVar};

// ============================================================================
// Defaults
// ============================================================================

#[derive(Clone)]
pub struct DefaultFactory(Arc<dyn Fn() -> Value + Send + Sync>);

impl DefaultFactory {
    pub fn new<F>(f: F) -> Self
    where
        F: Fn() -> Value + Send + Sync + 'static,
    {
        DefaultFactory(Arc::new(f))
    }

    pub fn produce(&self) -> Value {
        (self.0)()
    }
}

impl fmt::Debug for DefaultFactory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("DefaultFactory(..)")
    }
}

#[derive(Debug, Clone, Default)]
pub enum DefaultPolicy {
    #[default]
    NoDefault,
    Value(Value),
    Factory(DefaultFactory),
}

impl DefaultPolicy {
    pub fn is_set(&self) -> bool {
        !matches!(self, DefaultPolicy::NoDefault)
    }

    /// Materialize the default, if there is one.
    pub fn produce(&self) -> Option<Value> {
        match self {
            DefaultPolicy::NoDefault => None,
            DefaultPolicy::Value(value) => Some(value.clone()),
            DefaultPolicy::Factory(factory) => Some(factory.produce()),
        }
    }
}

// ============================================================================
// Fields
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParamKind {
    Positional,
    Keyword,
}

#[derive(Debug, Clone)]
pub struct InputField {
    pub id: String,
    pub ty: NormType,
    pub default: DefaultPolicy,
    pub is_required: bool,
    pub metadata: BTreeMap<String, Value>,
    pub param_name: String,
    pub param_kind: ParamKind,
}

impl InputField {
    /// Keyword field whose parameter name equals its id.
    pub fn new(id: impl Into<String>, ty: NormType) -> Self {
        let id = id.into();
        Self {
            param_name: id.clone(),
            id,
            ty,
            default: DefaultPolicy::NoDefault,
            is_required: true,
            metadata: BTreeMap::new(),
            param_kind: ParamKind::Keyword,
        }
    }

    /// Set a default; a field with a default is optional.
    pub fn with_default(mut self, default: DefaultPolicy) -> Self {
        self.is_required = !default.is_set();
        self.default = default;
        self
    }

    pub fn positional(mut self) -> Self {
        self.param_kind = ParamKind::Positional;
        self
    }
}

/// How a field value is read from an instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Accessor {
    /// Record field
    Attr(String),
    /// Dict item
    Item(String),
    /// Sequence position
    Index(usize),
}

impl Accessor {
    pub fn read<'v>(&self, instance: &'v Value) -> Option<&'v Value> {
        match (self, instance) {
            (Accessor::Attr(name), Value::Record { fields, .. }) => {
                fields.iter().find(|(k, _)| k == name).map(|(_, v)| v)
            }
            (Accessor::Item(key), Value::Dict(_)) => instance.get(key),
            (Accessor::Index(i), _) => instance.as_items().and_then(|items| items.get(*i)),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct OutputField {
    pub id: String,
    pub ty: NormType,
    pub default: DefaultPolicy,
    pub metadata: BTreeMap<String, Value>,
    pub accessor: Accessor,
    /// An optional field may be absent from the instance
    pub is_required: bool,
}

impl OutputField {
    /// Field read as a record attribute named like its id.
    pub fn new(id: impl Into<String>, ty: NormType) -> Self {
        let id = id.into();
        Self {
            accessor: Accessor::Attr(id.clone()),
            id,
            ty,
            default: DefaultPolicy::NoDefault,
            metadata: BTreeMap::new(),
            is_required: true,
        }
    }

    pub fn with_default(mut self, default: DefaultPolicy) -> Self {
        self.default = default;
        self
    }

    pub fn optional(mut self) -> Self {
        self.is_required = false;
        self
    }

    pub fn with_accessor(mut self, accessor: Accessor) -> Self {
        self.accessor = accessor;
        self
    }
}

// ============================================================================
// Constructors
// ============================================================================

/// Arguments handed to a constructor.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConstructorArgs {
    pub positional: Vec<Value>,
    pub keyword: IndexMap<String, Value>,
    /// Unknown keys collected into the kwargs parameter
    pub extra_kwargs: IndexMap<String, Value>,
}

#[derive(Clone)]
pub struct Constructor(Arc<dyn Fn(ConstructorArgs) -> Result<Value, ParseError> + Send + Sync>);

impl Constructor {
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(ConstructorArgs) -> Result<Value, ParseError> + Send + Sync + 'static,
    {
        Constructor(Arc::new(f))
    }

    pub fn call(&self, args: ConstructorArgs) -> Result<Value, ParseError> {
        (self.0)(args)
    }
}

impl fmt::Debug for Constructor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Constructor(..)")
    }
}

// ============================================================================
// Shapes
// ============================================================================

/// Declared type parameters and parametrized bases of a model.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ShapeGenerics {
    pub params: Vec<TypeVar>,
    pub bases: Vec<NormType>,
}

#[derive(Debug, Clone)]
pub struct InputShape {
    pub fields: Vec<InputField>,
    pub constructor: Constructor,
    /// Whether the constructor accepts arbitrary extra keywords
    pub kwargs: bool,
    /// Ids declared by the model itself rather than inherited
    pub overriden: HashSet<String>,
    pub generics: ShapeGenerics,
}

impl InputShape {
    pub fn field(&self, id: &str) -> Option<&InputField> {
        self.fields.iter().find(|f| f.id == id)
    }
}

#[derive(Debug, Clone)]
pub struct OutputShape {
    pub fields: Vec<OutputField>,
    pub overriden: HashSet<String>,
    pub generics: ShapeGenerics,
}

impl OutputShape {
    pub fn field(&self, id: &str) -> Option<&OutputField> {
        self.fields.iter().find(|f| f.id == id)
    }

    /// Append computed fields that are not already present.
    pub fn extend(&mut self, fields: impl IntoIterator<Item = OutputField>) {
        for field in fields {
            if self.field(&field.id).is_none() {
                self.overriden.insert(field.id.clone());
                self.fields.push(field);
            }
        }
    }
}

/// Shapes that carry generic field types.
pub trait GenericShape: Clone {
    fn generics(&self) -> &ShapeGenerics;
    fn overriden(&self) -> &HashSet<String>;
    fn field_types(&self) -> Vec<(&str, &NormType)>;
    /// Replace field types by id; ids not in `types` keep theirs.
    fn with_field_types(&self, types: &IndexMap<String, NormType>) -> Self;
}

impl GenericShape for InputShape {
    fn generics(&self) -> &ShapeGenerics {
        &self.generics
    }

    fn overriden(&self) -> &HashSet<String> {
        &self.overriden
    }

    fn field_types(&self) -> Vec<(&str, &NormType)> {
        self.fields.iter().map(|f| (f.id.as_str(), &f.ty)).collect()
    }

    fn with_field_types(&self, types: &IndexMap<String, NormType>) -> Self {
        let mut shape = self.clone();
        for field in &mut shape.fields {
            if let Some(ty) = types.get(&field.id) {
                field.ty = ty.clone();
            }
        }
        shape
    }
}

impl GenericShape for OutputShape {
    fn generics(&self) -> &ShapeGenerics {
        &self.generics
    }

    fn overriden(&self) -> &HashSet<String> {
        &self.overriden
    }

    fn field_types(&self) -> Vec<(&str, &NormType)> {
        self.fields.iter().map(|f| (f.id.as_str(), &f.ty)).collect()
    }

    fn with_field_types(&self, types: &IndexMap<String, NormType>) -> Self {
        let mut shape = self.clone();
        for field in &mut shape.fields {
            if let Some(ty) = types.get(&field.id) {
                field.ty = ty.clone();
            }
        }
        shape
    }
}
