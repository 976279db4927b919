//! Shape resolution for parametrized models

use std::sync::Arc;

use bindery_value::Value;
use indexmap::IndexMap;
use tracing::trace;

use super::checker::RequestChecker;
use super::error::{CannotProvide, ProvideError, ProvideResult};
use super::request::{InputShapeRequest, Loc, OutputShapeRequest, ShapeRequest};
use super::StaticProvider;
use crate::mediator::Mediator;
use crate::shape::{Constructor, GenericShape, InputShape, OutputField, OutputShape};
use crate::types::generics::Bindings;
use crate::types::NormType;

/// Shape of `loc.ty` with every type parameter replaced by the argument
/// it is bound to, through all bases.
///
/// Shapes are requested for bare origins; a parametrization only changes
/// field types. Bases are merged right to left so that the leftmost base
/// wins, and fields the model declares itself replace inherited ones.
pub fn provide_generic_resolved_shape<R: ShapeRequest>(
    mediator: &mut Mediator<'_>,
    loc: &Loc,
) -> ProvideResult<Arc<R::Shape>> {
    match resolve_members::<R>(mediator, loc, &loc.ty)? {
        Some((shape, members)) => Ok(Arc::new(shape.with_field_types(&members))),
        None => Err(CannotProvide::new(format!("no {} for {}", R::KIND, loc.ty)).into()),
    }
}

type Members<S> = (Arc<S>, IndexMap<String, NormType>);

fn resolve_members<R: ShapeRequest>(
    mediator: &mut Mediator<'_>,
    loc: &Loc,
    ty: &NormType,
) -> ProvideResult<Option<Members<R::Shape>>> {
    let bare = ty.bare();
    let shape = match mediator.provide(R::at(loc.with_type(bare.clone()))) {
        Ok(shape) => shape,
        Err(ProvideError::Cannot(_)) => return Ok(None),
        Err(e) => return Err(e),
    };

    let generics = shape.generics();
    let bindings = Bindings::bind(&bare.to_string(), &generics.params, ty.args())?;
    trace!(%ty, bases = generics.bases.len(), "resolving shape members");

    let mut members = IndexMap::new();
    for base in generics.bases.iter().rev() {
        let base = bindings.substitute(base)?;
        if let Some((_, inherited)) = resolve_members::<R>(mediator, loc, &base)? {
            members.extend(inherited);
        }
    }
    for (id, field_ty) in shape.field_types() {
        if shape.overriden().contains(id) || !members.contains_key(id) {
            members.insert(id.to_string(), bindings.substitute(field_ty)?);
        }
    }
    Ok(Some((shape, members)))
}

/// Adds computed fields to whatever output shape the rest of the recipe
/// gives for matching types.
pub struct ShapeExtender {
    checker: RequestChecker,
    fields: Vec<OutputField>,
}

impl ShapeExtender {
    pub fn new(checker: RequestChecker, fields: Vec<OutputField>) -> Self {
        Self { checker, fields }
    }
}

impl StaticProvider for ShapeExtender {
    fn provide_output_shape(
        &self,
        mediator: &mut Mediator<'_>,
        request: &OutputShapeRequest,
    ) -> ProvideResult<Arc<OutputShape>> {
        self.checker.check(mediator.request_stack(), &request.clone().into())?;
        let base = mediator.delegate::<OutputShapeRequest>()?;
        let mut shape = (*base).clone();
        shape.extend(self.fields.iter().cloned());
        Ok(Arc::new(shape))
    }
}

/// Gives `target` the shape of `prototype`.
///
/// Parsed values are records named after `target`.
pub struct SimilarShapeProvider {
    target: NormType,
    prototype: NormType,
    for_input: bool,
    for_output: bool,
}

impl SimilarShapeProvider {
    pub fn new(target: NormType, prototype: NormType) -> Self {
        Self { target, prototype, for_input: true, for_output: true }
    }

    pub fn input_only(mut self) -> Self {
        self.for_output = false;
        self
    }

    pub fn output_only(mut self) -> Self {
        self.for_input = false;
        self
    }

    fn check(&self, enabled: bool, loc: &Loc) -> Result<(), CannotProvide> {
        if enabled && loc.ty == self.target {
            Ok(())
        } else {
            Err(CannotProvide::unsupported())
        }
    }
}

impl StaticProvider for SimilarShapeProvider {
    fn provide_input_shape(
        &self,
        mediator: &mut Mediator<'_>,
        request: &InputShapeRequest,
    ) -> ProvideResult<Arc<InputShape>> {
        self.check(self.for_input, &request.loc)?;
        let prototype = mediator.provide(InputShapeRequest::at(request.loc.with_type(self.prototype.clone())))?;

        let mut shape = (*prototype).clone();
        let inner = prototype.constructor.clone();
        let name = self.target.model_name().unwrap_or_default().to_string();
        shape.constructor = Constructor::new(move |args| match inner.call(args)? {
            Value::Record { fields, .. } => Ok(Value::Record { type_name: name.clone(), fields }),
            other => Ok(other),
        });
        Ok(Arc::new(shape))
    }

    fn provide_output_shape(
        &self,
        mediator: &mut Mediator<'_>,
        request: &OutputShapeRequest,
    ) -> ProvideResult<Arc<OutputShape>> {
        self.check(self.for_output, &request.loc)?;
        mediator.provide(OutputShapeRequest::at(request.loc.with_type(self.prototype.clone())))
    }
}
