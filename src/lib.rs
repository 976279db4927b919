//! bindery: type-directed data binding
//!
//! Given a type description, a [`Retort`] compiles a parser that turns
//! untyped data (decoded JSON, say) into a typed [`Value`] and a serializer
//! that turns it back. Routines are not written by hand: they are assembled
//! by asking an ordered recipe of providers.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────┐
//! │ Retort      recipe, config, caches           │
//! ├──────────────────────────────────────────────┤
//! │ Mediator    walks the recipe per request     │
//! │   recursion guard: stub, then saturate       │
//! ├──────────────────────────────────────────────┤
//! │ Providers                                    │
//! │   user recipe  (facade::parser_for, ...)     │
//! │   catalog      shapes of models and enums    │
//! │   concrete     scalars, unions, containers   │
//! │   model        shape + layout -> routine     │
//! │   name_layout  naming rules -> crowns        │
//! └──────────────────────────────────────────────┘
//! ```
//!
//! ## Example
//!
//! ```
//! use bindery::{Model, Retort};
//!
//! #[derive(Model, Debug, PartialEq)]
//! struct Point {
//!     x: i64,
//!     #[model(default)]
//!     y: i64,
//! }
//!
//! let retort = Retort::builder().register::<Point>().build().unwrap();
//! let data = bindery::Value::from_json(serde_json::json!({"x": 1}));
//! let point: Point = retort.load_as(&data).unwrap();
//! assert_eq!(point, Point { x: 1, y: 0 });
//! ```

extern crate self as bindery;

pub mod catalog;
pub mod concrete;
pub mod mediator;
pub mod model;
pub mod name_layout;
pub mod pipeline;
pub mod provider;
pub mod recursion;
pub mod retort;
pub mod shape;
pub mod typed;
pub mod types;

pub use bindery_derive::Model;
pub use bindery_value::{ConversionError, FromValue, Value, ValueType};

pub use catalog::{CatalogEntry, EnumDef, FieldDef, ModelCatalog, ModelDef};
pub use mediator::Mediator;
pub use name_layout::{ExtraIn, ExtraOut, NameStyle, NamingRules};
pub use pipeline::{ParseError, Parser, Path, PathElement, SerializeError, Serializer};
pub use provider::{facade, CannotProvide, ConfigError, ProvideError, Provider, StaticProvider};
pub use retort::{Retort, RetortBuilder, RetortConfig, RetortError};
pub use typed::{Describe, Typed};
pub use types::{LiteralValue, NormType, Origin, TypeHint, TypeVar};

#[doc(hidden)]
pub mod __private {
    pub use std::boxed::Box;
    pub use std::default::Default;
    pub use std::result::Result::{self, Err, Ok};
    pub use std::string::String;
    pub use std::vec;
    pub use std::vec::Vec;
    pub use std::convert::{From, TryFrom};
}
