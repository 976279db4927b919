//! Requests and the provisions that answer them

use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use super::error::{ConfigError, ProvideError, ProvideResult};
use crate::name_layout::{InputNameLayout, NamingRules, OutputNameLayout};
use crate::pipeline::{Parser, Serializer};
use crate::shape::{GenericShape, InputShape, OutputShape};
use crate::types::NormType;

// ============================================================================
// Locations
// ============================================================================

/// The field a request is made for.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FieldLoc {
    pub id: String,
    pub is_required: bool,
}

/// What a request is about: a type, optionally as a field of a model.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Loc {
    pub ty: NormType,
    pub field: Option<FieldLoc>,
}

impl Loc {
    pub fn of(ty: NormType) -> Self {
        Self { ty, field: None }
    }

    pub fn field(ty: NormType, id: impl Into<String>, is_required: bool) -> Self {
        Self {
            ty,
            field: Some(FieldLoc { id: id.into(), is_required }),
        }
    }

    pub fn field_id(&self) -> Option<&str> {
        self.field.as_ref().map(|f| f.id.as_str())
    }

    /// Same location with another type.
    pub fn with_type(&self, ty: NormType) -> Self {
        Self { ty, field: self.field.clone() }
    }
}

impl fmt::Display for Loc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.field {
            Some(field) => write!(f, "field {:?}: {}", field.id, self.ty),
            None => write!(f, "{}", self.ty),
        }
    }
}

// ============================================================================
// Request variants
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ParserRequest {
    pub loc: Loc,
    pub strict_coercion: bool,
    pub debug_path: bool,
}

impl ParserRequest {
    pub fn new(loc: Loc) -> Self {
        Self { loc, strict_coercion: true, debug_path: true }
    }

    /// Request for a nested location with the same settings.
    pub fn nested(&self, loc: Loc) -> Self {
        Self { loc, ..self.clone() }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SerializerRequest {
    pub loc: Loc,
    pub debug_path: bool,
}

impl SerializerRequest {
    pub fn new(loc: Loc) -> Self {
        Self { loc, debug_path: true }
    }

    pub fn nested(&self, loc: Loc) -> Self {
        Self { loc, ..self.clone() }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct InputShapeRequest {
    pub loc: Loc,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct OutputShapeRequest {
    pub loc: Loc,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NamingRequest {
    pub loc: Loc,
}

/// Layout requests are identified by their location; the shape is a
/// function of it.
#[derive(Debug, Clone)]
pub struct InputNameLayoutRequest {
    pub loc: Loc,
    pub shape: Arc<InputShape>,
}

#[derive(Debug, Clone)]
pub struct OutputNameLayoutRequest {
    pub loc: Loc,
    pub shape: Arc<OutputShape>,
}

macro_rules! eq_by_loc {
    ($($ty:ty),*) => {$(
        impl PartialEq for $ty {
            fn eq(&self, other: &Self) -> bool {
                self.loc == other.loc
            }
        }

        impl Eq for $ty {}

        impl Hash for $ty {
            fn hash<H: Hasher>(&self, state: &mut H) {
                self.loc.hash(state)
            }
        }
    )*};
}

eq_by_loc!(InputNameLayoutRequest, OutputNameLayoutRequest);

// ============================================================================
// AnyRequest / Provision
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RequestKind {
    Parser,
    Serializer,
    InputShape,
    OutputShape,
    InputNameLayout,
    OutputNameLayout,
    Naming,
}

impl fmt::Display for RequestKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RequestKind::Parser => "parser",
            RequestKind::Serializer => "serializer",
            RequestKind::InputShape => "input shape",
            RequestKind::OutputShape => "output shape",
            RequestKind::InputNameLayout => "input name layout",
            RequestKind::OutputNameLayout => "output name layout",
            RequestKind::Naming => "naming rules",
        };
        f.write_str(name)
    }
}

/// The closed set of requests a provider can be asked.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum AnyRequest {
    Parser(ParserRequest),
    Serializer(SerializerRequest),
    InputShape(InputShapeRequest),
    OutputShape(OutputShapeRequest),
    InputNameLayout(InputNameLayoutRequest),
    OutputNameLayout(OutputNameLayoutRequest),
    Naming(NamingRequest),
}

impl AnyRequest {
    pub fn loc(&self) -> &Loc {
        match self {
            AnyRequest::Parser(r) => &r.loc,
            AnyRequest::Serializer(r) => &r.loc,
            AnyRequest::InputShape(r) => &r.loc,
            AnyRequest::OutputShape(r) => &r.loc,
            AnyRequest::InputNameLayout(r) => &r.loc,
            AnyRequest::OutputNameLayout(r) => &r.loc,
            AnyRequest::Naming(r) => &r.loc,
        }
    }

    pub fn kind(&self) -> RequestKind {
        match self {
            AnyRequest::Parser(_) => RequestKind::Parser,
            AnyRequest::Serializer(_) => RequestKind::Serializer,
            AnyRequest::InputShape(_) => RequestKind::InputShape,
            AnyRequest::OutputShape(_) => RequestKind::OutputShape,
            AnyRequest::InputNameLayout(_) => RequestKind::InputNameLayout,
            AnyRequest::OutputNameLayout(_) => RequestKind::OutputNameLayout,
            AnyRequest::Naming(_) => RequestKind::Naming,
        }
    }
}

impl fmt::Display for AnyRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} for {}", self.kind(), self.loc())
    }
}

/// An answer to a request.
#[derive(Clone)]
pub enum Provision {
    Parser(Parser),
    Serializer(Serializer),
    InputShape(Arc<InputShape>),
    OutputShape(Arc<OutputShape>),
    InputNameLayout(Arc<InputNameLayout>),
    OutputNameLayout(Arc<OutputNameLayout>),
    Naming(Arc<NamingRules>),
}

impl Provision {
    pub fn kind(&self) -> RequestKind {
        match self {
            Provision::Parser(_) => RequestKind::Parser,
            Provision::Serializer(_) => RequestKind::Serializer,
            Provision::InputShape(_) => RequestKind::InputShape,
            Provision::OutputShape(_) => RequestKind::OutputShape,
            Provision::InputNameLayout(_) => RequestKind::InputNameLayout,
            Provision::OutputNameLayout(_) => RequestKind::OutputNameLayout,
            Provision::Naming(_) => RequestKind::Naming,
        }
    }
}

impl fmt::Debug for Provision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Provision::Parser(_) => f.write_str("Provision::Parser(..)"),
            Provision::Serializer(_) => f.write_str("Provision::Serializer(..)"),
            Provision::InputShape(shape) => f.debug_tuple("Provision::InputShape").field(shape).finish(),
            Provision::OutputShape(shape) => f.debug_tuple("Provision::OutputShape").field(shape).finish(),
            Provision::InputNameLayout(layout) => {
                f.debug_tuple("Provision::InputNameLayout").field(layout).finish()
            }
            Provision::OutputNameLayout(layout) => {
                f.debug_tuple("Provision::OutputNameLayout").field(layout).finish()
            }
            Provision::Naming(rules) => f.debug_tuple("Provision::Naming").field(rules).finish(),
        }
    }
}

// ============================================================================
// Typed requests
// ============================================================================

/// A request variant together with the type of its answer.
pub trait Request: Clone + Into<AnyRequest> {
    type Output;
    const KIND: RequestKind;

    fn extract(provision: Provision) -> ProvideResult<Self::Output>;
    fn wrap(output: Self::Output) -> Provision;
}

fn mismatch(expected: RequestKind, got: &Provision) -> ProvideError {
    ConfigError::ProvisionMismatch { expected, got: got.kind() }.into()
}

macro_rules! request {
    ($req:ident, $variant:ident, $output:ty) => {
        impl From<$req> for AnyRequest {
            fn from(r: $req) -> Self {
                AnyRequest::$variant(r)
            }
        }

        impl Request for $req {
            type Output = $output;
            const KIND: RequestKind = RequestKind::$variant;

            fn extract(provision: Provision) -> ProvideResult<Self::Output> {
                match provision {
                    Provision::$variant(out) => Ok(out),
                    other => Err(mismatch(Self::KIND, &other)),
                }
            }

            fn wrap(output: Self::Output) -> Provision {
                Provision::$variant(output)
            }
        }
    };
}

request!(ParserRequest, Parser, Parser);
request!(SerializerRequest, Serializer, Serializer);
request!(InputShapeRequest, InputShape, Arc<InputShape>);
request!(OutputShapeRequest, OutputShape, Arc<OutputShape>);
request!(InputNameLayoutRequest, InputNameLayout, Arc<InputNameLayout>);
request!(OutputNameLayoutRequest, OutputNameLayout, Arc<OutputNameLayout>);
request!(NamingRequest, Naming, Arc<NamingRules>);

/// Shape requests, generic over the input and output side.
pub trait ShapeRequest: Request<Output = Arc<Self::Shape>> {
    type Shape: GenericShape;

    fn at(loc: Loc) -> Self;
}

impl ShapeRequest for InputShapeRequest {
    type Shape = InputShape;

    fn at(loc: Loc) -> Self {
        InputShapeRequest { loc }
    }
}

impl ShapeRequest for OutputShapeRequest {
    type Shape = OutputShape;

    fn at(loc: Loc) -> Self {
        OutputShapeRequest { loc }
    }
}
