//! Built-in leaf providers
//!
//! Each provider recognizes the types it handles by their normal form and
//! declines everything else. Containers ask the mediator for the routines
//! of their arguments.

mod collection;
mod scalar;
mod union;

pub use collection::{DictProvider, IterableProvider, TupleProvider};
pub use scalar::ScalarProvider;
pub use union::{LiteralProvider, UnionProvider};

use std::sync::Arc;

use crate::provider::Provider;

/// All leaf providers, in recipe order.
pub fn leaf_providers() -> Vec<Arc<dyn Provider>> {
    vec![
        Arc::new(ScalarProvider),
        Arc::new(LiteralProvider),
        Arc::new(UnionProvider),
        Arc::new(IterableProvider),
        Arc::new(TupleProvider),
        Arc::new(DictProvider),
    ]
}
