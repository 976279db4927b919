//! Request/provider protocol
//!
//! A provider answers a [`AnyRequest`] with a [`Provision`] or declines
//! with [`CannotProvide`]. Providers are arranged in a recipe; the
//! [`Mediator`](crate::mediator::Mediator) asks them in order and the first
//! one that accepts wins.
//!
//! Most providers handle a few request kinds and implement
//! [`StaticProvider`], which dispatches by kind and declines the rest.
//! Wrappers that must see every request implement [`Provider`] directly.

pub mod basics;
pub mod checker;
pub mod error;
pub mod facade;
pub mod request;
pub mod shape;

use crate::mediator::Mediator;
use crate::name_layout::{InputNameLayout, NamingRules, OutputNameLayout};
use crate::pipeline::{Parser, Serializer};
use crate::shape::{InputShape, OutputShape};
use std::sync::Arc;

pub use basics::{
    BoundingProvider, Chain, ChainStep, ChainingProvider, FactoryProvider, MergingProvider, PipelineProvider,
    ValueProvider,
};
pub use shape::{provide_generic_resolved_shape, ShapeExtender, SimilarShapeProvider};
pub use checker::{create_request_checker, BuiltinHierarchy, Pred, RequestChecker, TypeForm, TypeHierarchy};
pub use error::{CannotProvide, ConfigError, ProvideError, ProvideResult};
pub use request::{
    AnyRequest, FieldLoc, InputNameLayoutRequest, InputShapeRequest, Loc, NamingRequest,
    OutputNameLayoutRequest, OutputShapeRequest, ParserRequest, Provision, Request, RequestKind,
    SerializerRequest, ShapeRequest,
};

/// Something that can answer requests.
pub trait Provider: Send + Sync {
    fn apply(&self, mediator: &mut Mediator<'_>, request: &AnyRequest) -> ProvideResult<Provision>;
}

/// Provider dispatching on the request kind.
///
/// Every method declines by default.
#[allow(unused_variables)]
pub trait StaticProvider: Send + Sync {
    fn provide_parser(&self, mediator: &mut Mediator<'_>, request: &ParserRequest) -> ProvideResult<Parser> {
        Err(CannotProvide::unsupported().into())
    }

    fn provide_serializer(
        &self,
        mediator: &mut Mediator<'_>,
        request: &SerializerRequest,
    ) -> ProvideResult<Serializer> {
        Err(CannotProvide::unsupported().into())
    }

    fn provide_input_shape(
        &self,
        mediator: &mut Mediator<'_>,
        request: &InputShapeRequest,
    ) -> ProvideResult<Arc<InputShape>> {
        Err(CannotProvide::unsupported().into())
    }

    fn provide_output_shape(
        &self,
        mediator: &mut Mediator<'_>,
        request: &OutputShapeRequest,
    ) -> ProvideResult<Arc<OutputShape>> {
        Err(CannotProvide::unsupported().into())
    }

    fn provide_input_name_layout(
        &self,
        mediator: &mut Mediator<'_>,
        request: &InputNameLayoutRequest,
    ) -> ProvideResult<Arc<InputNameLayout>> {
        Err(CannotProvide::unsupported().into())
    }

    fn provide_output_name_layout(
        &self,
        mediator: &mut Mediator<'_>,
        request: &OutputNameLayoutRequest,
    ) -> ProvideResult<Arc<OutputNameLayout>> {
        Err(CannotProvide::unsupported().into())
    }

    fn provide_naming(&self, mediator: &mut Mediator<'_>, request: &NamingRequest) -> ProvideResult<Arc<NamingRules>> {
        Err(CannotProvide::unsupported().into())
    }
}

impl<T: StaticProvider> Provider for T {
    fn apply(&self, mediator: &mut Mediator<'_>, request: &AnyRequest) -> ProvideResult<Provision> {
        Ok(match request {
            AnyRequest::Parser(r) => Provision::Parser(self.provide_parser(mediator, r)?),
            AnyRequest::Serializer(r) => Provision::Serializer(self.provide_serializer(mediator, r)?),
            AnyRequest::InputShape(r) => Provision::InputShape(self.provide_input_shape(mediator, r)?),
            AnyRequest::OutputShape(r) => Provision::OutputShape(self.provide_output_shape(mediator, r)?),
            AnyRequest::InputNameLayout(r) => {
                Provision::InputNameLayout(self.provide_input_name_layout(mediator, r)?)
            }
            AnyRequest::OutputNameLayout(r) => {
                Provision::OutputNameLayout(self.provide_output_name_layout(mediator, r)?)
            }
            AnyRequest::Naming(r) => Provision::Naming(self.provide_naming(mediator, r)?),
        })
    }
}
