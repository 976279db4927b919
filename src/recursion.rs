//! Recursion guard: stubs for self-referencing types
//!
//! Resolving a parser for `Node { children: list[Node] }` asks for the
//! parser of `Node` again while the first request is still on the stack.
//! The guard answers the inner request with a stub that forwards to a
//! cell. When the outer request finishes, every stub registered for it is
//! saturated with the result. A stub holds a weak handle: the finished
//! routine owns its stubs, so a strong one would form a cycle, and the
//! stubs can only run while that routine is alive anyway.

use std::collections::HashMap;
use std::sync::{Arc, OnceLock, Weak};

use bindery_value::Value;
use tracing::debug;

use crate::pipeline::{ParseError, SerializeError};
use crate::provider::{AnyRequest, ParserRequest, Provision, SerializerRequest};

type ParseFn = dyn Fn(&Value) -> Result<Value, ParseError> + Send + Sync;
type SerializeFn = dyn Fn(&Value) -> Result<Value, SerializeError> + Send + Sync;

type Cell<F> = Arc<OnceLock<Weak<F>>>;

#[derive(Default)]
pub(crate) struct RecursionGuard {
    parser_stubs: HashMap<ParserRequest, Vec<Cell<ParseFn>>>,
    serializer_stubs: HashMap<SerializerRequest, Vec<Cell<SerializeFn>>>,
}

impl RecursionGuard {
    /// A stub for a request that is already being resolved, or `None` when
    /// the request kind has no stub policy.
    pub fn stub(&mut self, request: &AnyRequest) -> Option<Provision> {
        match request {
            AnyRequest::Parser(r) => {
                let cell: Cell<ParseFn> = Arc::new(OnceLock::new());
                self.parser_stubs.entry(r.clone()).or_default().push(cell.clone());
                debug!(loc = %r.loc, "stubbing recursive parser");
                Some(Provision::Parser(Arc::new(move |data: &Value| {
                    match cell.get().and_then(Weak::upgrade) {
                        Some(target) => target(data),
                        None => Err(ParseError::Unsaturated),
                    }
                })))
            }
            AnyRequest::Serializer(r) => {
                let cell: Cell<SerializeFn> = Arc::new(OnceLock::new());
                self.serializer_stubs.entry(r.clone()).or_default().push(cell.clone());
                debug!(loc = %r.loc, "stubbing recursive serializer");
                Some(Provision::Serializer(Arc::new(move |data: &Value| {
                    match cell.get().and_then(Weak::upgrade) {
                        Some(target) => target(data),
                        None => Err(SerializeError::Unsaturated),
                    }
                })))
            }
            _ => None,
        }
    }

    /// Point every stub of `request` at the finished routine.
    pub fn saturate(&mut self, request: &AnyRequest, provision: &Provision) {
        match (request, provision) {
            (AnyRequest::Parser(r), Provision::Parser(parser)) => {
                if let Some(cells) = self.parser_stubs.remove(r) {
                    debug!(loc = %r.loc, stubs = cells.len(), "saturating parser stubs");
                    for cell in cells {
                        let _ = cell.set(Arc::downgrade(parser));
                    }
                }
            }
            (AnyRequest::Serializer(r), Provision::Serializer(serializer)) => {
                if let Some(cells) = self.serializer_stubs.remove(r) {
                    debug!(loc = %r.loc, stubs = cells.len(), "saturating serializer stubs");
                    for cell in cells {
                        let _ = cell.set(Arc::downgrade(serializer));
                    }
                }
            }
            _ => self.discard(request),
        }
    }

    /// Drop the stubs of a request whose resolution failed.
    pub fn discard(&mut self, request: &AnyRequest) {
        match request {
            AnyRequest::Parser(r) => {
                self.parser_stubs.remove(r);
            }
            AnyRequest::Serializer(r) => {
                self.serializer_stubs.remove(r);
            }
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::Parser;
    use crate::provider::Loc;
    use crate::types::NormType;

    fn request() -> AnyRequest {
        ParserRequest::new(Loc::of(NormType::model("Node"))).into()
    }

    fn stub_parser(guard: &mut RecursionGuard) -> Parser {
        match guard.stub(&request()) {
            Some(Provision::Parser(p)) => p,
            other => panic!("unexpected provision: {other:?}"),
        }
    }

    #[test]
    fn test_unsaturated_stub_reports_usage_error() {
        let mut guard = RecursionGuard::default();
        let stub = stub_parser(&mut guard);
        assert_eq!(stub(&Value::None), Err(ParseError::Unsaturated));
    }

    #[test]
    fn test_saturated_stub_forwards() {
        let mut guard = RecursionGuard::default();
        let stub = stub_parser(&mut guard);
        let real: Parser = Arc::new(|_: &Value| Ok(Value::Int(7)));
        guard.saturate(&request(), &Provision::Parser(real.clone()));
        assert_eq!(stub(&Value::None), Ok(Value::Int(7)));
    }

    #[test]
    fn test_discarded_stub_stays_unsaturated() {
        let mut guard = RecursionGuard::default();
        let stub = stub_parser(&mut guard);
        guard.discard(&request());
        let real: Parser = Arc::new(|_: &Value| Ok(Value::Int(7)));
        guard.saturate(&request(), &Provision::Parser(real));
        assert_eq!(stub(&Value::None), Err(ParseError::Unsaturated));
    }

    #[test]
    fn test_shape_requests_have_no_stub() {
        let mut guard = RecursionGuard::default();
        let req = AnyRequest::InputShape(crate::provider::InputShapeRequest {
            loc: Loc::of(NormType::model("Node")),
        });
        assert!(guard.stub(&req).is_none());
    }
}
