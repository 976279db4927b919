//! Model catalog: the shapes of user types
//!
//! The resolution core never introspects types itself; it asks the recipe
//! for shapes. The catalog is the built-in answer: models and enums are
//! registered by name, either by hand with [`ModelDef`] / [`EnumDef`] or
//! through `#[derive(Model)]` and [`ModelCatalog::register`].

use std::collections::HashSet;
use std::sync::Arc;

use bindery_value::Value;
use indexmap::IndexMap;
use tracing::debug;

use crate::mediator::Mediator;
use crate::pipeline::{parser, serializer, ParseError, Parser, SerializeError, Serializer};
use crate::provider::{
    CannotProvide, InputShapeRequest, OutputShapeRequest, ParserRequest, ProvideResult, SerializerRequest,
    StaticProvider, TypeHierarchy,
};
use crate::shape::{
    Accessor, Constructor, DefaultFactory, DefaultPolicy, InputField, InputShape, OutputField, OutputShape,
    ShapeGenerics,
};
use crate::typed::Describe;
use crate::types::{normalize, LiteralValue, NormType, NormalizeError, Origin, TypeHint, TypeVar};

// ============================================================================
// Definitions
// ============================================================================

/// How instances of a model are represented.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ModelKind {
    /// [`Value::Record`] read by attribute
    #[default]
    Class,
    /// [`Value::Dict`] read by key
    TypedDict,
}

#[derive(Debug, Clone)]
pub struct FieldDef {
    pub id: String,
    pub ty: TypeHint,
    pub default: DefaultPolicy,
    pub required: bool,
}

impl FieldDef {
    pub fn new(id: impl Into<String>, ty: TypeHint) -> Self {
        Self { id: id.into(), ty, default: DefaultPolicy::NoDefault, required: true }
    }

    pub fn default(mut self, value: impl Into<Value>) -> Self {
        self.default = DefaultPolicy::Value(value.into());
        self.required = false;
        self
    }

    pub fn default_factory<F>(mut self, f: F) -> Self
    where
        F: Fn() -> Value + Send + Sync + 'static,
    {
        self.default = DefaultPolicy::Factory(DefaultFactory::new(f));
        self.required = false;
        self
    }

    /// May be absent without a default; only meaningful for typed dicts.
    pub fn optional(mut self) -> Self {
        self.required = false;
        self
    }
}

#[derive(Debug, Clone, Default)]
pub struct ModelDef {
    pub name: String,
    pub params: Vec<TypeVar>,
    pub bases: Vec<TypeHint>,
    /// Fields declared by the model itself
    pub fields: Vec<FieldDef>,
    pub kwargs: bool,
    pub kind: ModelKind,
}

impl ModelDef {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into(), ..Self::default() }
    }

    pub fn param(mut self, param: TypeVar) -> Self {
        self.params.push(param);
        self
    }

    pub fn base(mut self, base: TypeHint) -> Self {
        self.bases.push(base);
        self
    }

    pub fn field(mut self, field: FieldDef) -> Self {
        self.fields.push(field);
        self
    }

    /// The constructor accepts arbitrary extra keywords.
    pub fn kwargs(mut self) -> Self {
        self.kwargs = true;
        self
    }

    pub fn typed_dict(mut self) -> Self {
        self.kind = ModelKind::TypedDict;
        self
    }
}

#[derive(Debug, Clone)]
pub struct EnumDef {
    pub name: String,
    pub members: Vec<(String, LiteralValue)>,
}

impl EnumDef {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into(), members: Vec::new() }
    }

    pub fn member(mut self, name: impl Into<String>, value: impl Into<LiteralValue>) -> Self {
        self.members.push((name.into(), value.into()));
        self
    }
}

#[derive(Debug, Clone)]
pub enum CatalogEntry {
    Model(ModelDef),
    Enum(EnumDef),
}

impl CatalogEntry {
    pub fn name(&self) -> &str {
        match self {
            CatalogEntry::Model(m) => &m.name,
            CatalogEntry::Enum(e) => &e.name,
        }
    }
}

// ============================================================================
// Catalog
// ============================================================================

#[derive(Debug, Clone, Default)]
pub struct ModelCatalog {
    entries: IndexMap<String, CatalogEntry>,
}

impl ModelCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace an entry.
    pub fn add(&mut self, entry: CatalogEntry) -> &mut Self {
        debug!(name = entry.name(), "registering catalog entry");
        self.entries.insert(entry.name().to_string(), entry);
        self
    }

    pub fn model(mut self, def: ModelDef) -> Self {
        self.add(CatalogEntry::Model(def));
        self
    }

    pub fn enumeration(mut self, def: EnumDef) -> Self {
        self.add(CatalogEntry::Enum(def));
        self
    }

    /// Register a type together with every type its description mentions.
    pub fn register<T: Describe>(mut self) -> Self {
        let mut entries = Vec::new();
        T::collect_entries(&mut entries);
        for entry in entries {
            self.add(entry);
        }
        self
    }

    pub fn get(&self, name: &str) -> Option<&CatalogEntry> {
        self.entries.get(name)
    }

    fn model_def(&self, ty: &NormType) -> Result<&ModelDef, CannotProvide> {
        let name = ty.model_name().ok_or_else(CannotProvide::unsupported)?;
        match self.entries.get(name) {
            Some(CatalogEntry::Model(def)) => Ok(def),
            _ => Err(CannotProvide::new(format!("{name} is not a registered model"))),
        }
    }

    fn enum_def(&self, ty: &NormType) -> Result<&EnumDef, CannotProvide> {
        let name = ty.model_name().ok_or_else(CannotProvide::unsupported)?;
        match self.entries.get(name) {
            Some(CatalogEntry::Enum(def)) if ty.args().is_empty() => Ok(def),
            _ => Err(CannotProvide::unsupported()),
        }
    }

    /// All fields of a model with inherited ones first, the way record
    /// fields are ordered: bases are visited right to left and a
    /// redeclared field keeps the position it was first declared at.
    fn collect_fields<'a>(
        &'a self,
        def: &'a ModelDef,
        out: &mut IndexMap<String, &'a FieldDef>,
        seen: &mut HashSet<&'a str>,
    ) -> Result<(), NormalizeError> {
        if !seen.insert(def.name.as_str()) {
            return Ok(());
        }
        for base in def.bases.iter().rev() {
            let base = normalize(base)?;
            if let Some(CatalogEntry::Model(base_def)) = base.model_name().and_then(|n| self.entries.get(n)) {
                self.collect_fields(base_def, out, seen)?;
            }
        }
        for field in &def.fields {
            out.insert(field.id.clone(), field);
        }
        Ok(())
    }

    fn shape_parts(&self, def: &ModelDef) -> Result<(Vec<(FieldDef, NormType)>, ShapeGenerics), NormalizeError> {
        let mut fields = IndexMap::new();
        self.collect_fields(def, &mut fields, &mut HashSet::new())?;
        let fields = fields
            .into_values()
            .map(|f| Ok::<_, NormalizeError>((f.clone(), normalize(&f.ty)?)))
            .collect::<Result<Vec<_>, NormalizeError>>()?;
        let generics = ShapeGenerics {
            params: def.params.clone(),
            bases: def.bases.iter().map(normalize).collect::<Result<_, _>>()?,
        };
        Ok((fields, generics))
    }
}

fn own_ids(def: &ModelDef) -> HashSet<String> {
    def.fields.iter().map(|f| f.id.clone()).collect()
}

fn constructor(def: &ModelDef, ids: Vec<String>) -> Constructor {
    let name = def.name.clone();
    let kind = def.kind;
    Constructor::new(move |mut args| {
        let mut fields: Vec<(String, Value)> = Vec::with_capacity(ids.len() + args.extra_kwargs.len());
        for id in &ids {
            if let Some(value) = args.keyword.shift_remove(id) {
                fields.push((id.clone(), value));
            }
        }
        fields.extend(args.extra_kwargs);
        Ok(match kind {
            ModelKind::Class => Value::Record { type_name: name.clone(), fields },
            ModelKind::TypedDict => Value::dict(fields),
        })
    })
}

impl StaticProvider for ModelCatalog {
    fn provide_input_shape(&self, _: &mut Mediator<'_>, request: &InputShapeRequest) -> ProvideResult<Arc<InputShape>> {
        let def = self.model_def(&request.loc.ty)?;
        let (fields, generics) = self.shape_parts(def)?;
        let ids = fields.iter().map(|(f, _)| f.id.clone()).collect();
        let fields = fields
            .into_iter()
            .map(|(f, ty)| {
                let mut field = InputField::new(&f.id, ty).with_default(f.default.clone());
                field.is_required = f.required;
                field
            })
            .collect();
        Ok(Arc::new(InputShape {
            fields,
            constructor: constructor(def, ids),
            kwargs: def.kwargs,
            overriden: own_ids(def),
            generics,
        }))
    }

    fn provide_output_shape(
        &self,
        _: &mut Mediator<'_>,
        request: &OutputShapeRequest,
    ) -> ProvideResult<Arc<OutputShape>> {
        let def = self.model_def(&request.loc.ty)?;
        let (fields, generics) = self.shape_parts(def)?;
        let fields = fields
            .into_iter()
            .map(|(f, ty)| {
                let accessor = match def.kind {
                    ModelKind::Class => Accessor::Attr(f.id.clone()),
                    ModelKind::TypedDict => Accessor::Item(f.id.clone()),
                };
                let field = OutputField::new(&f.id, ty).with_default(f.default.clone()).with_accessor(accessor);
                match def.kind {
                    ModelKind::TypedDict if !f.required => field.optional(),
                    _ => field,
                }
            })
            .collect();
        Ok(Arc::new(OutputShape { fields, overriden: own_ids(def), generics }))
    }

    fn provide_parser(&self, _: &mut Mediator<'_>, request: &ParserRequest) -> ProvideResult<Parser> {
        let def = self.enum_def(&request.loc.ty)?.clone();
        Ok(parser(move |data| {
            match def.members.iter().find(|(_, value)| value.matches(data)) {
                Some((member, _)) => Ok(Value::Enum { type_name: def.name.clone(), member: member.clone() }),
                None => Err(ParseError::NotLiteral {
                    value: data.clone(),
                    allowed: def.members.iter().map(|(_, v)| v.clone()).collect(),
                }),
            }
        }))
    }

    fn provide_serializer(&self, _: &mut Mediator<'_>, request: &SerializerRequest) -> ProvideResult<Serializer> {
        let def = self.enum_def(&request.loc.ty)?.clone();
        Ok(serializer(move |data| match data {
            Value::Enum { type_name, member } if *type_name == def.name => def
                .members
                .iter()
                .find(|(name, _)| name == member)
                .map(|(_, value)| value.to_value())
                .ok_or_else(|| SerializeError::InvalidValue {
                    message: format!("{member} is not a member of {}", def.name),
                }),
            other => Err(SerializeError::mismatch(def.name.as_str(), other)),
        }))
    }
}

impl TypeHierarchy for ModelCatalog {
    fn is_subclass(&self, child: &Origin, parent: &Origin) -> bool {
        if child == parent {
            return true;
        }
        let Origin::Model(name) = child else {
            return *child == Origin::Bool && *parent == Origin::Int;
        };
        let Some(CatalogEntry::Model(def)) = self.entries.get(name) else {
            return false;
        };
        def.bases
            .iter()
            .filter_map(|base| normalize(base).ok())
            .filter_map(|base| base.origin().cloned())
            .any(|base| self.is_subclass(&base, parent))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::{Loc, Provider};

    fn catalog() -> ModelCatalog {
        ModelCatalog::new()
            .model(
                ModelDef::new("Base")
                    .field(FieldDef::new("id", TypeHint::int()))
                    .field(FieldDef::new("tag", TypeHint::str()).default("none")),
            )
            .model(
                ModelDef::new("Item")
                    .base(TypeHint::model("Base"))
                    .field(FieldDef::new("tag", TypeHint::str()))
                    .field(FieldDef::new("price", TypeHint::float())),
            )
            .enumeration(EnumDef::new("Color").member("RED", 1i64).member("GREEN", 2i64))
    }

    #[test]
    fn test_inherited_fields_come_first() {
        let recipe: Vec<Arc<dyn Provider>> = vec![Arc::new(catalog())];
        let mut mediator = Mediator::new(&recipe);
        let shape = mediator
            .provide(InputShapeRequest { loc: Loc::of(NormType::model("Item")) })
            .expect("shape");
        let ids: Vec<_> = shape.fields.iter().map(|f| f.id.as_str()).collect();
        assert_eq!(ids, ["id", "tag", "price"]);
        // redeclared without a default
        assert!(shape.field("tag").is_some_and(|f| f.is_required));
        assert!(shape.overriden.contains("tag") && !shape.overriden.contains("id"));
    }

    #[test]
    fn test_constructor_builds_records_in_field_order() {
        let recipe: Vec<Arc<dyn Provider>> = vec![Arc::new(catalog())];
        let mut mediator = Mediator::new(&recipe);
        let shape = mediator
            .provide(InputShapeRequest { loc: Loc::of(NormType::model("Base")) })
            .expect("shape");
        let mut args = crate::shape::ConstructorArgs::default();
        args.keyword.insert("tag".into(), Value::str("x"));
        args.keyword.insert("id".into(), Value::Int(1));
        assert_eq!(
            shape.constructor.call(args),
            Ok(Value::record("Base", [("id", Value::Int(1)), ("tag", Value::str("x"))]))
        );
    }

    #[test]
    fn test_enum_round_trip() {
        let recipe: Vec<Arc<dyn Provider>> = vec![Arc::new(catalog())];
        let mut mediator = Mediator::new(&recipe);
        let color = NormType::model("Color");
        let p = mediator.provide(ParserRequest::new(Loc::of(color.clone()))).expect("parser");
        let s = mediator.provide(SerializerRequest::new(Loc::of(color))).expect("serializer");
        let green = p(&Value::Int(2)).expect("parse");
        assert_eq!(green, Value::Enum { type_name: "Color".into(), member: "GREEN".into() });
        assert_eq!(s(&green), Ok(Value::Int(2)));
        assert!(p(&Value::Int(3)).is_err());
    }

    #[test]
    fn test_hierarchy_follows_bases() {
        let catalog = catalog();
        assert!(catalog.is_subclass(&Origin::model("Item"), &Origin::model("Base")));
        assert!(!catalog.is_subclass(&Origin::model("Base"), &Origin::model("Item")));
    }
}
