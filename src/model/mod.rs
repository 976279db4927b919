//! Parsers and serializers for models
//!
//! A model routine is assembled from three answers of the recipe: the
//! generic-resolved shape, the name layout for that shape, and one routine
//! per field. The layout is validated against the shape before anything
//! is compiled, so a broken configuration fails when the routine is built
//! rather than when data arrives.

mod dump;
mod parse;

use std::sync::Arc;

use tracing::debug;

use crate::mediator::Mediator;
use crate::name_layout::{validate_input_layout, validate_output_layout, InpExtraMove, OutExtraMove};
use crate::pipeline::{Parser, Serializer};
use crate::provider::{
    provide_generic_resolved_shape, CannotProvide, InputNameLayoutRequest, InputShapeRequest, Loc,
    OutputNameLayoutRequest, OutputShapeRequest, ParserRequest, ProvideResult, SerializerRequest, StaticProvider,
};

use dump::{ModelSerializer, OutputPlan};
use parse::{InputPlan, ModelParser};

/// Builds routines for every type some provider has a shape for.
#[derive(Debug, Clone, Copy, Default)]
pub struct ModelProvider;

fn model_name(loc: &Loc) -> Result<String, CannotProvide> {
    loc.ty.model_name().map(str::to_string).ok_or_else(CannotProvide::unsupported)
}

impl StaticProvider for ModelProvider {
    fn provide_parser(&self, mediator: &mut Mediator<'_>, request: &ParserRequest) -> ProvideResult<Parser> {
        let name = model_name(&request.loc)?;
        let shape = provide_generic_resolved_shape::<InputShapeRequest>(mediator, &request.loc)?;
        let layout = mediator.provide(InputNameLayoutRequest { loc: request.loc.clone(), shape: shape.clone() })?;
        validate_input_layout(&request.loc.ty.to_string(), &shape, &layout)?;

        let targets: &[String] = match &layout.extra_move {
            Some(InpExtraMove::Targets(ids)) => ids,
            _ => &[],
        };
        let used = layout.crown.field_ids();
        let mut plans = Vec::with_capacity(shape.fields.len());
        for field in &shape.fields {
            let parser = if used.contains(&field.id.as_str()) || targets.contains(&field.id) {
                let loc = Loc::field(field.ty.clone(), &field.id, field.is_required);
                Some(mediator.provide(request.nested(loc))?)
            } else {
                None
            };
            plans.push(InputPlan { field: field.clone(), parser });
        }

        debug!(model = %name, fields = plans.len(), "compiled model parser");
        let model = ModelParser::new(plans, &layout, shape.constructor.clone(), request.debug_path);
        Ok(Arc::new(move |data| model.parse(data)))
    }

    fn provide_serializer(
        &self,
        mediator: &mut Mediator<'_>,
        request: &SerializerRequest,
    ) -> ProvideResult<Serializer> {
        let name = model_name(&request.loc)?;
        let shape = provide_generic_resolved_shape::<OutputShapeRequest>(mediator, &request.loc)?;
        let layout = mediator.provide(OutputNameLayoutRequest { loc: request.loc.clone(), shape: shape.clone() })?;
        validate_output_layout(&request.loc.ty.to_string(), &shape, &layout)?;

        let targets: &[String] = match &layout.extra_move {
            Some(OutExtraMove::Targets(ids)) => ids,
            None => &[],
        };
        let used = layout.crown.field_ids();
        let mut plans = Vec::new();
        for field in &shape.fields {
            if used.contains(&field.id.as_str()) || targets.contains(&field.id) {
                let loc = Loc::field(field.ty.clone(), &field.id, true);
                let serializer = mediator.provide(request.nested(loc))?;
                plans.push(OutputPlan { field: field.clone(), serializer });
            }
        }

        debug!(model = %name, fields = plans.len(), "compiled model serializer");
        let model = ModelSerializer::new(name, plans, &layout, request.debug_path);
        Ok(Arc::new(move |data| model.serialize(data)))
    }
}
