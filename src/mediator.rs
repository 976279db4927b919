//! Resolution loop
//!
//! The mediator walks the recipe for one request at a time. Every request
//! opens a frame on the request stack; the frame remembers how far the
//! recipe was searched so that a provider can hand the same request to the
//! rest of the chain with [`Mediator::provide_from_next`].

use std::sync::Arc;

use tracing::trace;

use crate::provider::{AnyRequest, CannotProvide, ProvideError, ProvideResult, Provider, Provision, Request};
use crate::recursion::RecursionGuard;

pub struct Mediator<'r> {
    recipe: &'r [Arc<dyn Provider>],
    stack: Vec<AnyRequest>,
    /// Next recipe index per frame
    cursors: Vec<usize>,
    guard: RecursionGuard,
}

impl<'r> Mediator<'r> {
    pub fn new(recipe: &'r [Arc<dyn Provider>]) -> Self {
        Self {
            recipe,
            stack: Vec::new(),
            cursors: Vec::new(),
            guard: RecursionGuard::default(),
        }
    }

    /// Resolve a typed request from the top of the recipe.
    pub fn provide<R: Request>(&mut self, request: R) -> ProvideResult<R::Output> {
        R::extract(self.provide_any(request.into())?)
    }

    pub fn provide_any(&mut self, request: AnyRequest) -> ProvideResult<Provision> {
        if self.stack.contains(&request) {
            return match self.guard.stub(&request) {
                Some(stub) => Ok(stub),
                None => Err(CannotProvide::new(format!("recursive resolution of {request}")).into()),
            };
        }

        self.stack.push(request);
        self.cursors.push(0);
        let result = self.search(0);
        self.cursors.pop();
        if let Some(request) = self.stack.pop() {
            match &result {
                Ok(provision) => self.guard.saturate(&request, provision),
                Err(_) => self.guard.discard(&request),
            }
        }
        result
    }

    /// Resolve the current request with the providers after the one that
    /// is running.
    pub fn provide_from_next(&mut self) -> ProvideResult<Provision> {
        let start = self
            .cursors
            .last()
            .copied()
            .ok_or_else(|| CannotProvide::new("no request is being resolved"))?;
        self.search(start)
    }

    /// Typed [`provide_from_next`](Self::provide_from_next).
    pub fn delegate<R: Request>(&mut self) -> ProvideResult<R::Output> {
        R::extract(self.provide_from_next()?)
    }

    /// Requests being resolved, outermost first. The last one is current.
    pub fn request_stack(&self) -> &[AnyRequest] {
        &self.stack
    }

    fn search(&mut self, start: usize) -> ProvideResult<Provision> {
        let recipe = self.recipe;
        let Some(request) = self.stack.last().cloned() else {
            return Err(CannotProvide::new("no request is being resolved").into());
        };

        let mut failures = Vec::new();
        for (index, provider) in recipe.iter().enumerate().skip(start) {
            if let Some(cursor) = self.cursors.last_mut() {
                *cursor = index + 1;
            }
            match provider.apply(self, &request) {
                Ok(provision) => {
                    trace!(%request, index, "resolved");
                    return Ok(provision);
                }
                Err(ProvideError::Cannot(e)) => failures.push(e),
                Err(e) => return Err(e),
            }
        }
        Err(CannotProvide::aggregate(format!("cannot provide {request}"), failures).into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::{parser, ParseError, Parser};
    use crate::provider::{Loc, ParserRequest, StaticProvider};
    use crate::types::NormType;
    use bindery_value::Value;
    use std::sync::Mutex;

    struct Constant(i64);

    impl StaticProvider for Constant {
        fn provide_parser(&self, _: &mut Mediator<'_>, _: &ParserRequest) -> ProvideResult<Parser> {
            let n = self.0;
            Ok(parser(move |_| Ok(Value::Int(n))))
        }
    }

    struct Declines(&'static str);

    impl StaticProvider for Declines {
        fn provide_parser(&self, _: &mut Mediator<'_>, _: &ParserRequest) -> ProvideResult<Parser> {
            Err(CannotProvide::new(self.0).into())
        }
    }

    /// Doubles whatever the rest of the chain produces.
    struct Doubler;

    impl StaticProvider for Doubler {
        fn provide_parser(&self, mediator: &mut Mediator<'_>, _: &ParserRequest) -> ProvideResult<Parser> {
            let next = mediator.delegate::<ParserRequest>()?;
            Ok(parser(move |v| match next(v)? {
                Value::Int(n) => Ok(Value::Int(n * 2)),
                other => Err(ParseError::mismatch("int", &other)),
            }))
        }
    }

    struct StackRecorder(Mutex<usize>);

    impl StaticProvider for StackRecorder {
        fn provide_parser(&self, mediator: &mut Mediator<'_>, _: &ParserRequest) -> ProvideResult<Parser> {
            *self.0.lock().expect("lock") = mediator.request_stack().len();
            Err(CannotProvide::unsupported().into())
        }
    }

    fn request() -> ParserRequest {
        ParserRequest::new(Loc::of(NormType::Any))
    }

    fn run(recipe: &[Arc<dyn Provider>]) -> ProvideResult<Value> {
        let mut mediator = Mediator::new(recipe);
        let parser = mediator.provide(request())?;
        Ok(parser(&Value::None).expect("parse"))
    }

    #[test]
    fn test_first_provider_wins() {
        let recipe: Vec<Arc<dyn Provider>> = vec![Arc::new(Constant(1)), Arc::new(Constant(2))];
        assert_eq!(run(&recipe).expect("provide"), Value::Int(1));
    }

    #[test]
    fn test_declines_are_aggregated() {
        let recipe: Vec<Arc<dyn Provider>> = vec![Arc::new(Declines("first")), Arc::new(Declines("second"))];
        match run(&recipe) {
            Err(ProvideError::Cannot(e)) => {
                assert_eq!(e.sub_errors().len(), 2);
                assert!(e.mentions("second"));
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn test_provide_from_next_resumes_after_current() {
        let recipe: Vec<Arc<dyn Provider>> =
            vec![Arc::new(Doubler), Arc::new(Doubler), Arc::new(Constant(3))];
        assert_eq!(run(&recipe).expect("provide"), Value::Int(12));
    }

    #[test]
    fn test_stack_is_popped_after_failure() {
        let recorder = Arc::new(StackRecorder(Mutex::new(0)));
        let recipe: Vec<Arc<dyn Provider>> = vec![recorder.clone()];
        let mut mediator = Mediator::new(&recipe);
        assert!(mediator.provide(request()).is_err());
        assert_eq!(*recorder.0.lock().expect("lock"), 1);
        assert!(mediator.request_stack().is_empty());
    }
}
