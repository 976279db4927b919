//! Name layouts: where each field lives in the external data
//!
//! A layout is a crown, a tree whose branches are dicts or lists and
//! whose leaves name a field. The input crown also says what to do with
//! keys and items no leaf claims; the output crown carries sieves that
//! decide whether a field is emitted at all.

mod builder;
pub mod naming;

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use bindery_value::Value;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

pub use builder::BuiltinNameLayoutProvider;
pub(crate) use builder::{validate_input_layout, validate_output_layout};
pub use naming::{ExtraIn, ExtraOut, MapTarget, NameStyle, NamingRules, PathSegment, RenameFn};

// ============================================================================
// Input crowns
// ============================================================================

/// Unknown keys of an input dict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DictExtraPolicy {
    Skip,
    Forbid,
    Collect,
}

/// Surplus items of an input list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ListExtraPolicy {
    Skip,
    Forbid,
}

#[derive(Debug, Clone, PartialEq)]
pub struct InpDictCrown {
    pub map: IndexMap<String, InpCrown>,
    pub extra: DictExtraPolicy,
}

#[derive(Debug, Clone, PartialEq)]
pub struct InpListCrown {
    pub items: Vec<InpCrown>,
    pub extra: ListExtraPolicy,
}

#[derive(Debug, Clone, PartialEq)]
pub enum InpCrown {
    Dict(InpDictCrown),
    List(InpListCrown),
    /// Leaf holding a field id
    Field(String),
    /// Position that is read and ignored
    None,
}

/// Where collected extra data goes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InpExtraMove {
    Targets(Vec<String>),
    Kwargs,
}

#[derive(Debug, Clone, PartialEq)]
pub struct InputNameLayout {
    pub crown: InpCrown,
    pub extra_move: Option<InpExtraMove>,
}

// ============================================================================
// Output crowns
// ============================================================================

/// Decides whether a field value is emitted.
#[derive(Clone)]
pub struct Sieve(Arc<dyn Fn(&Value) -> bool + Send + Sync>);

impl Sieve {
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(&Value) -> bool + Send + Sync + 'static,
    {
        Sieve(Arc::new(f))
    }

    pub fn keep(&self, value: &Value) -> bool {
        (self.0)(value)
    }
}

impl fmt::Debug for Sieve {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Sieve(..)")
    }
}

#[derive(Debug, Clone)]
pub struct OutDictCrown {
    pub map: IndexMap<String, OutCrown>,
    /// Keyed like `map`; only field leaves have sieves
    pub sieves: HashMap<String, Sieve>,
}

#[derive(Debug, Clone)]
pub struct OutListCrown {
    pub items: Vec<OutCrown>,
}

#[derive(Debug, Clone)]
pub enum OutCrown {
    Dict(OutDictCrown),
    List(OutListCrown),
    Field(String),
    /// Filler emitted as the placeholder value
    None(Value),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutExtraMove {
    Targets(Vec<String>),
}

#[derive(Debug, Clone)]
pub struct OutputNameLayout {
    pub crown: OutCrown,
    pub extra_move: Option<OutExtraMove>,
}

// ============================================================================
// Crown traversal
// ============================================================================

impl InpCrown {
    /// Field ids of all leaves, in crown order.
    pub fn field_ids(&self) -> Vec<&str> {
        let mut out = Vec::new();
        self.collect_ids(&mut out);
        out
    }

    fn collect_ids<'a>(&'a self, out: &mut Vec<&'a str>) {
        match self {
            InpCrown::Dict(d) => d.map.values().for_each(|c| c.collect_ids(out)),
            InpCrown::List(l) => l.items.iter().for_each(|c| c.collect_ids(out)),
            InpCrown::Field(id) => out.push(id),
            InpCrown::None => {}
        }
    }
}

impl OutCrown {
    pub fn field_ids(&self) -> Vec<&str> {
        let mut out = Vec::new();
        self.collect_ids(&mut out);
        out
    }

    fn collect_ids<'a>(&'a self, out: &mut Vec<&'a str>) {
        match self {
            OutCrown::Dict(d) => d.map.values().for_each(|c| c.collect_ids(out)),
            OutCrown::List(l) => l.items.iter().for_each(|c| c.collect_ids(out)),
            OutCrown::Field(id) => out.push(id),
            OutCrown::None(_) => {}
        }
    }
}
