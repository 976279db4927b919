//! Retort: the factory that owns a recipe and its caches
//!
//! A retort turns type hints into compiled parsers and serializers. Each
//! request is normalized, looked up in the retort's own cache and, on a
//! miss, resolved by a fresh [`Mediator`] over the recipe: user providers
//! first, then the catalog and the built-in providers.

use std::collections::HashMap;
use std::sync::Arc;

use bindery_value::{ConversionError, FromValue, Value};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::catalog::ModelCatalog;
use crate::concrete::leaf_providers;
use crate::mediator::Mediator;
use crate::model::ModelProvider;
use crate::name_layout::{BuiltinNameLayoutProvider, ExtraIn, NamingRules};
use crate::pipeline::{ParseError, Parser, SerializeError, Serializer};
use crate::provider::facade::RecipeEntry;
use crate::provider::{
    provide_generic_resolved_shape, CannotProvide, ConfigError, InputShapeRequest, Loc, OutputShapeRequest,
    ParserRequest, ProvideError, Provider, Provision, RequestKind, SerializerRequest, ShapeRequest, ValueProvider,
};
use crate::shape::{InputShape, OutputShape};
use crate::typed::Typed;
use crate::types::{NormType, NormalizeError, TypeHint, TypeNormalizer};

#[derive(Error, Debug, Clone, PartialEq)]
pub enum RetortError {
    #[error("no {kind} available for type {ty}\n{cause}")]
    NoProvider { kind: RequestKind, ty: String, cause: CannotProvide },

    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Normalize(#[from] NormalizeError),

    #[error("parse error: {0}")]
    Parse(#[from] ParseError),

    #[error("serialize error: {0}")]
    Serialize(#[from] SerializeError),

    #[error("conversion error: {0}")]
    Conversion(#[from] ConversionError),
}

/// Retort-wide defaults. Per-type [`NamingRules`] override the naming ones.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetortConfig {
    /// Reject input of another kind instead of coercing it
    pub strict_coercion: bool,
    /// Attach the path of the failing element to parse and serialize errors
    pub debug_path: bool,
    /// Leave fields equal to their default out of the output
    pub omit_default: bool,
    /// Policy for input keys no field claims
    pub extra_in: ExtraIn,
}

impl Default for RetortConfig {
    fn default() -> Self {
        Self {
            strict_coercion: true,
            debug_path: true,
            omit_default: false,
            extra_in: ExtraIn::Skip,
        }
    }
}

#[derive(Default)]
pub struct RetortBuilder {
    recipe: Vec<Arc<dyn Provider>>,
    error: Option<ConfigError>,
    config: RetortConfig,
    catalog: ModelCatalog,
}

impl RetortBuilder {
    /// Append one recipe entry. Entries added first are asked first.
    pub fn recipe(mut self, entry: RecipeEntry) -> Self {
        match entry {
            Ok(provider) => self.recipe.push(provider),
            Err(e) => {
                self.error.get_or_insert(e);
            }
        }
        self
    }

    pub fn recipes(self, entries: impl IntoIterator<Item = RecipeEntry>) -> Self {
        entries.into_iter().fold(self, RetortBuilder::recipe)
    }

    pub fn provider(mut self, provider: Arc<dyn Provider>) -> Self {
        self.recipe.push(provider);
        self
    }

    pub fn config(mut self, config: RetortConfig) -> Self {
        self.config = config;
        self
    }

    pub fn catalog(mut self, catalog: ModelCatalog) -> Self {
        self.catalog = catalog;
        self
    }

    /// Register a derived type in the catalog.
    pub fn register<T: crate::typed::Describe>(mut self) -> Self {
        self.catalog = self.catalog.register::<T>();
        self
    }

    /// Fails with the first invalid recipe entry.
    pub fn build(mut self) -> Result<Retort, RetortError> {
        match self.error.take() {
            Some(e) => Err(e.into()),
            None => Ok(self.assemble()),
        }
    }

    fn assemble(self) -> Retort {
        let catalog = Arc::new(self.catalog);
        let mut recipe = self.recipe;
        recipe.push(catalog.clone());
        recipe.extend(leaf_providers());
        recipe.push(Arc::new(ModelProvider));
        recipe.push(Arc::new(BuiltinNameLayoutProvider::new(
            self.config.omit_default,
            self.config.extra_in.clone(),
        )));
        recipe.push(Arc::new(ValueProvider::new(Provision::Naming(Arc::new(NamingRules::default())))));

        debug!(providers = recipe.len(), "built retort");
        Retort {
            recipe,
            catalog,
            config: self.config,
            normalizer: TypeNormalizer::new(),
            parsers: RwLock::new(HashMap::new()),
            serializers: RwLock::new(HashMap::new()),
        }
    }
}

/// Compiles and caches conversion routines for one recipe.
///
/// Routines are `Send + Sync`, so a retort can be shared between threads.
pub struct Retort {
    recipe: Vec<Arc<dyn Provider>>,
    catalog: Arc<ModelCatalog>,
    config: RetortConfig,
    normalizer: TypeNormalizer,
    parsers: RwLock<HashMap<ParserRequest, Parser>>,
    serializers: RwLock<HashMap<SerializerRequest, Serializer>>,
}

impl Default for Retort {
    fn default() -> Self {
        RetortBuilder::default().assemble()
    }
}

fn no_provider(kind: RequestKind, ty: &NormType, e: ProvideError) -> RetortError {
    match e {
        ProvideError::Cannot(cause) => RetortError::NoProvider { kind, ty: ty.to_string(), cause },
        ProvideError::Config(e) => RetortError::Config(e),
    }
}

impl Retort {
    pub fn builder() -> RetortBuilder {
        RetortBuilder::default()
    }

    pub fn config(&self) -> &RetortConfig {
        &self.config
    }

    pub fn catalog(&self) -> &Arc<ModelCatalog> {
        &self.catalog
    }

    pub fn parser(&self, hint: &TypeHint) -> Result<Parser, RetortError> {
        let ty = self.normalizer.normalize(hint)?;
        let request = ParserRequest {
            loc: Loc::of(ty.clone()),
            strict_coercion: self.config.strict_coercion,
            debug_path: self.config.debug_path,
        };
        if let Some(parser) = self.parsers.read().get(&request) {
            return Ok(parser.clone());
        }

        debug!(%ty, "parser cache miss");
        let mut mediator = Mediator::new(&self.recipe);
        let parser = mediator
            .provide(request.clone())
            .map_err(|e| no_provider(RequestKind::Parser, &ty, e))?;
        self.parsers.write().insert(request, parser.clone());
        Ok(parser)
    }

    pub fn serializer(&self, hint: &TypeHint) -> Result<Serializer, RetortError> {
        let ty = self.normalizer.normalize(hint)?;
        let request = SerializerRequest { loc: Loc::of(ty.clone()), debug_path: self.config.debug_path };
        if let Some(serializer) = self.serializers.read().get(&request) {
            return Ok(serializer.clone());
        }

        debug!(%ty, "serializer cache miss");
        let mut mediator = Mediator::new(&self.recipe);
        let serializer = mediator
            .provide(request.clone())
            .map_err(|e| no_provider(RequestKind::Serializer, &ty, e))?;
        self.serializers.write().insert(request, serializer.clone());
        Ok(serializer)
    }

    pub fn load(&self, data: &Value, hint: &TypeHint) -> Result<Value, RetortError> {
        Ok(self.parser(hint)?(data)?)
    }

    pub fn dump(&self, value: &Value, hint: &TypeHint) -> Result<Value, RetortError> {
        Ok(self.serializer(hint)?(value)?)
    }

    /// Parse decoded JSON.
    pub fn load_json(&self, json: serde_json::Value, hint: &TypeHint) -> Result<Value, RetortError> {
        self.load(&Value::from_json(json), hint)
    }

    pub fn dump_json(&self, value: &Value, hint: &TypeHint) -> Result<serde_json::Value, RetortError> {
        Ok(self.dump(value, hint)?.to_json()?)
    }

    /// Parse into a Rust type.
    pub fn load_as<T: Typed + FromValue>(&self, data: &Value) -> Result<T, RetortError> {
        Ok(T::from_value(self.load(data, &T::type_hint())?)?)
    }

    pub fn dump_from<T: Typed + Into<Value>>(&self, value: T) -> Result<Value, RetortError> {
        self.dump(&value.into(), &T::type_hint())
    }

    /// Generic-resolved input shape of a model.
    pub fn input_shape(&self, hint: &TypeHint) -> Result<Arc<InputShape>, RetortError> {
        self.shape::<InputShapeRequest>(hint, RequestKind::InputShape)
    }

    pub fn output_shape(&self, hint: &TypeHint) -> Result<Arc<OutputShape>, RetortError> {
        self.shape::<OutputShapeRequest>(hint, RequestKind::OutputShape)
    }

    fn shape<R: ShapeRequest>(&self, hint: &TypeHint, kind: RequestKind) -> Result<Arc<R::Shape>, RetortError> {
        let ty = self.normalizer.normalize(hint)?;
        let mut mediator = Mediator::new(&self.recipe);
        provide_generic_resolved_shape::<R>(&mut mediator, &Loc::of(ty.clone())).map_err(|e| no_provider(kind, &ty, e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{FieldDef, ModelDef};

    fn point_retort() -> Retort {
        let catalog = ModelCatalog::new().model(
            ModelDef::new("Point")
                .field(FieldDef::new("x", TypeHint::int()))
                .field(FieldDef::new("y", TypeHint::int()).default(0i64)),
        );
        Retort::builder().catalog(catalog).build().expect("retort")
    }

    #[test]
    fn test_parsers_are_cached_per_request() {
        let retort = point_retort();
        let first = retort.parser(&TypeHint::model("Point")).expect("parser");
        let second = retort.parser(&TypeHint::model("Point")).expect("parser");
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(retort.parsers.read().len(), 1);
    }

    #[test]
    fn test_unknown_model_reports_no_provider() {
        let retort = point_retort();
        match retort.parser(&TypeHint::model("Missing")) {
            Err(RetortError::NoProvider { kind, ty, .. }) => {
                assert_eq!(kind, RequestKind::Parser);
                assert_eq!(ty, "Missing");
            }
            other => panic!("unexpected result: {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn test_config_loads_from_partial_json() {
        let config: RetortConfig = serde_json::from_str(r#"{"debug_path": false}"#).expect("config");
        assert!(config.strict_coercion);
        assert!(!config.debug_path);
        assert_eq!(config.extra_in, ExtraIn::Skip);
    }

    #[test]
    fn test_lenient_config_coerces_scalars() {
        let retort = Retort::builder()
            .config(RetortConfig { strict_coercion: false, ..RetortConfig::default() })
            .build()
            .expect("retort");
        assert_eq!(retort.load(&Value::str("42"), &TypeHint::int()), Ok(Value::Int(42)));
    }

    #[test]
    fn test_invalid_recipe_entry_fails_build() {
        let built = Retort::builder()
            .recipe(crate::provider::facade::parser_for(TypeHint::var("T"), |v| Ok(v.clone())))
            .build();
        assert!(matches!(built, Err(RetortError::Config(_))));
    }
}
