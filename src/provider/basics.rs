//! Provider combinators

use std::sync::Arc;

use super::checker::RequestChecker;
use super::error::{CannotProvide, ProvideError, ProvideResult};
use super::request::{AnyRequest, Provision, RequestKind};
use super::Provider;
use crate::mediator::Mediator;
use crate::pipeline::{parser_pipeline, serializer_pipeline, Parser, Serializer};

/// Applies `provider` only to requests accepted by `checker`.
pub struct BoundingProvider {
    checker: RequestChecker,
    provider: Arc<dyn Provider>,
}

impl BoundingProvider {
    pub fn new(checker: RequestChecker, provider: Arc<dyn Provider>) -> Self {
        Self { checker, provider }
    }
}

impl Provider for BoundingProvider {
    fn apply(&self, mediator: &mut Mediator<'_>, request: &AnyRequest) -> ProvideResult<Provision> {
        self.checker.check(mediator.request_stack(), request)?;
        self.provider.apply(mediator, request)
    }
}

/// Tries each provider in turn; the first success wins.
pub struct MergingProvider {
    providers: Vec<Arc<dyn Provider>>,
}

impl MergingProvider {
    pub fn new(providers: Vec<Arc<dyn Provider>>) -> Self {
        Self { providers }
    }
}

impl Provider for MergingProvider {
    fn apply(&self, mediator: &mut Mediator<'_>, request: &AnyRequest) -> ProvideResult<Provision> {
        let mut failures = Vec::new();
        for provider in &self.providers {
            match provider.apply(mediator, request) {
                Ok(provision) => return Ok(provision),
                Err(ProvideError::Cannot(e)) => failures.push(e),
                Err(e) => return Err(e),
            }
        }
        Err(CannotProvide::aggregate("no merged provider accepted the request", failures).into())
    }
}

/// Answers one request kind with a fixed provision.
pub struct ValueProvider {
    provision: Provision,
}

impl ValueProvider {
    pub fn new(provision: Provision) -> Self {
        Self { provision }
    }
}

impl Provider for ValueProvider {
    fn apply(&self, _: &mut Mediator<'_>, request: &AnyRequest) -> ProvideResult<Provision> {
        if request.kind() == self.provision.kind() {
            Ok(self.provision.clone())
        } else {
            Err(CannotProvide::unsupported().into())
        }
    }
}

/// Answers one request kind with a provision built per request.
pub struct FactoryProvider {
    kind: RequestKind,
    factory: Arc<dyn Fn(&AnyRequest) -> Provision + Send + Sync>,
}

impl FactoryProvider {
    pub fn new<F>(kind: RequestKind, factory: F) -> Self
    where
        F: Fn(&AnyRequest) -> Provision + Send + Sync + 'static,
    {
        Self { kind, factory: Arc::new(factory) }
    }
}

impl Provider for FactoryProvider {
    fn apply(&self, _: &mut Mediator<'_>, request: &AnyRequest) -> ProvideResult<Provision> {
        if request.kind() != self.kind {
            return Err(CannotProvide::unsupported().into());
        }
        let provision = (self.factory)(request);
        if provision.kind() != self.kind {
            return Err(super::ConfigError::ProvisionMismatch {
                expected: self.kind,
                got: provision.kind(),
            }
            .into());
        }
        Ok(provision)
    }
}

// ============================================================================
// Chaining
// ============================================================================

/// Where a chained step runs relative to the rest of the chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Chain {
    /// The step sees the raw data, the rest of the chain sees its output
    First,
    /// The rest of the chain runs first, the step sees its output
    Last,
}

#[derive(Clone)]
pub enum ChainStep {
    Parser(Parser),
    Serializer(Serializer),
}

/// Wraps whatever the rest of the recipe produces for a request with an
/// extra step.
pub struct ChainingProvider {
    chain: Chain,
    step: ChainStep,
}

impl ChainingProvider {
    pub fn new(chain: Chain, step: ChainStep) -> Self {
        Self { chain, step }
    }
}

impl Provider for ChainingProvider {
    fn apply(&self, mediator: &mut Mediator<'_>, request: &AnyRequest) -> ProvideResult<Provision> {
        match (request, &self.step) {
            (AnyRequest::Parser(_), ChainStep::Parser(step)) => {
                let next = mediator.delegate::<super::ParserRequest>()?;
                let steps = match self.chain {
                    Chain::First => vec![step.clone(), next],
                    Chain::Last => vec![next, step.clone()],
                };
                Ok(Provision::Parser(parser_pipeline(steps)))
            }
            (AnyRequest::Serializer(_), ChainStep::Serializer(step)) => {
                let next = mediator.delegate::<super::SerializerRequest>()?;
                let steps = match self.chain {
                    Chain::First => vec![step.clone(), next],
                    Chain::Last => vec![next, step.clone()],
                };
                Ok(Provision::Serializer(serializer_pipeline(steps)))
            }
            _ => Err(CannotProvide::unsupported().into()),
        }
    }
}

/// Composes the routines several providers give for the same request.
///
/// Parsers run in the listed order and serializers in reverse, so a
/// pipeline and its inverse mirror each other.
pub struct PipelineProvider {
    elements: Vec<Arc<dyn Provider>>,
}

impl PipelineProvider {
    pub fn new(elements: Vec<Arc<dyn Provider>>) -> Self {
        Self { elements }
    }
}

impl Provider for PipelineProvider {
    fn apply(&self, mediator: &mut Mediator<'_>, request: &AnyRequest) -> ProvideResult<Provision> {
        match request {
            AnyRequest::Parser(_) => {
                let mut steps = Vec::with_capacity(self.elements.len());
                for element in &self.elements {
                    match element.apply(mediator, request)? {
                        Provision::Parser(p) => steps.push(p),
                        other => {
                            return Err(super::ConfigError::ProvisionMismatch {
                                expected: RequestKind::Parser,
                                got: other.kind(),
                            }
                            .into())
                        }
                    }
                }
                Ok(Provision::Parser(parser_pipeline(steps)))
            }
            AnyRequest::Serializer(_) => {
                let mut steps = Vec::with_capacity(self.elements.len());
                for element in self.elements.iter().rev() {
                    match element.apply(mediator, request)? {
                        Provision::Serializer(s) => steps.push(s),
                        other => {
                            return Err(super::ConfigError::ProvisionMismatch {
                                expected: RequestKind::Serializer,
                                got: other.kind(),
                            }
                            .into())
                        }
                    }
                }
                Ok(Provision::Serializer(serializer_pipeline(steps)))
            }
            _ => Err(CannotProvide::unsupported().into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::{parser, ParseError};
    use crate::provider::{create_request_checker, Loc, ParserRequest};
    use crate::types::{normalize, TypeHint};
    use bindery_value::Value;

    fn add(n: i64) -> Parser {
        parser(move |v| match v {
            Value::Int(x) => Ok(Value::Int(x + n)),
            other => Err(ParseError::mismatch("int", other)),
        })
    }

    fn times(n: i64) -> Parser {
        parser(move |v| match v {
            Value::Int(x) => Ok(Value::Int(x * n)),
            other => Err(ParseError::mismatch("int", other)),
        })
    }

    fn int_request() -> ParserRequest {
        ParserRequest::new(Loc::of(normalize(&TypeHint::int()).expect("normalize")))
    }

    fn resolve(recipe: Vec<Arc<dyn Provider>>) -> ProvideResult<Parser> {
        let mut mediator = Mediator::new(&recipe);
        mediator.provide(int_request())
    }

    #[test]
    fn test_bounding_provider_filters() {
        let str_only = create_request_checker(TypeHint::str()).expect("checker");
        let recipe: Vec<Arc<dyn Provider>> = vec![
            Arc::new(BoundingProvider::new(str_only, Arc::new(ValueProvider::new(Provision::Parser(add(100)))))),
            Arc::new(ValueProvider::new(Provision::Parser(add(1)))),
        ];
        let p = resolve(recipe).expect("provide");
        assert_eq!(p(&Value::Int(1)), Ok(Value::Int(2)));
    }

    #[test]
    fn test_chain_order() {
        let first: Vec<Arc<dyn Provider>> = vec![
            Arc::new(ChainingProvider::new(Chain::First, ChainStep::Parser(add(1)))),
            Arc::new(ValueProvider::new(Provision::Parser(times(10)))),
        ];
        assert_eq!(resolve(first).expect("provide")(&Value::Int(1)), Ok(Value::Int(20)));

        let last: Vec<Arc<dyn Provider>> = vec![
            Arc::new(ChainingProvider::new(Chain::Last, ChainStep::Parser(add(1)))),
            Arc::new(ValueProvider::new(Provision::Parser(times(10)))),
        ];
        assert_eq!(resolve(last).expect("provide")(&Value::Int(1)), Ok(Value::Int(11)));
    }

    #[test]
    fn test_merging_provider_takes_first_success() {
        let str_only = create_request_checker(TypeHint::str()).expect("checker");
        let merged = MergingProvider::new(vec![
            Arc::new(BoundingProvider::new(str_only, Arc::new(ValueProvider::new(Provision::Parser(add(5)))))),
            Arc::new(ValueProvider::new(Provision::Parser(add(7)))),
            Arc::new(ValueProvider::new(Provision::Parser(add(9)))),
        ]);
        let p = resolve(vec![Arc::new(merged)]).expect("provide");
        assert_eq!(p(&Value::Int(0)), Ok(Value::Int(7)));
    }

    #[test]
    fn test_pipeline_provider_composes_in_order() {
        let pipeline = PipelineProvider::new(vec![
            Arc::new(ValueProvider::new(Provision::Parser(add(1)))),
            Arc::new(ValueProvider::new(Provision::Parser(times(3)))),
        ]);
        let p = resolve(vec![Arc::new(pipeline)]).expect("provide");
        assert_eq!(p(&Value::Int(1)), Ok(Value::Int(6)));
    }

    #[test]
    fn test_factory_provider_checks_kind() {
        let factory = FactoryProvider::new(RequestKind::Parser, |_| Provision::Parser(add(2)));
        let p = resolve(vec![Arc::new(factory)]).expect("provide");
        assert_eq!(p(&Value::Int(1)), Ok(Value::Int(3)));
    }
}
