//! Shortcuts for building recipe entries
//!
//! ```ignore
//! let recipe = vec![
//!     facade::parser_for("id", |v| Ok(v.clone()))?,
//!     facade::name_mapping(TypeHint::model("User"), NamingRules::new().name_style(NameStyle::CamelLower))?,
//! ];
//! ```

use std::sync::Arc;

use bindery_value::Value;

use super::basics::{BoundingProvider, Chain, ChainStep, ChainingProvider, ValueProvider};
use super::checker::{create_request_checker, Pred};
use super::error::ConfigError;
use super::request::Provision;
use super::shape::{ShapeExtender, SimilarShapeProvider};
use super::Provider;
use crate::name_layout::NamingRules;
use crate::pipeline::{parser, serializer, ParseError, SerializeError};
use crate::shape::OutputField;
use crate::types::{normalize, TypeHint};

pub type RecipeEntry = Result<Arc<dyn Provider>, ConfigError>;

/// Gate `provider` behind a predicate.
pub fn bound(pred: impl Into<Pred>, provider: Arc<dyn Provider>) -> RecipeEntry {
    let checker = create_request_checker(pred)?;
    Ok(Arc::new(BoundingProvider::new(checker, provider)))
}

/// Use `f` as the parser for requests matching `pred`.
pub fn parser_for<F>(pred: impl Into<Pred>, f: F) -> RecipeEntry
where
    F: Fn(&Value) -> Result<Value, ParseError> + Send + Sync + 'static,
{
    bound(pred, Arc::new(ValueProvider::new(Provision::Parser(parser(f)))))
}

pub fn serializer_for<F>(pred: impl Into<Pred>, f: F) -> RecipeEntry
where
    F: Fn(&Value) -> Result<Value, SerializeError> + Send + Sync + 'static,
{
    bound(pred, Arc::new(ValueProvider::new(Provision::Serializer(serializer(f)))))
}

/// Run `f` before or after the parser the rest of the recipe builds.
pub fn chained_parser<F>(pred: impl Into<Pred>, chain: Chain, f: F) -> RecipeEntry
where
    F: Fn(&Value) -> Result<Value, ParseError> + Send + Sync + 'static,
{
    bound(pred, Arc::new(ChainingProvider::new(chain, ChainStep::Parser(parser(f)))))
}

pub fn chained_serializer<F>(pred: impl Into<Pred>, chain: Chain, f: F) -> RecipeEntry
where
    F: Fn(&Value) -> Result<Value, SerializeError> + Send + Sync + 'static,
{
    bound(pred, Arc::new(ChainingProvider::new(chain, ChainStep::Serializer(serializer(f)))))
}

/// Naming rules for the models matching `pred`.
pub fn name_mapping(pred: impl Into<Pred>, rules: NamingRules) -> RecipeEntry {
    bound(pred, Arc::new(ValueProvider::new(Provision::Naming(Arc::new(rules)))))
}

/// Extra output fields for the models matching `pred`.
pub fn extend_output(pred: impl Into<Pred>, fields: Vec<OutputField>) -> RecipeEntry {
    let checker = create_request_checker(pred)?;
    Ok(Arc::new(ShapeExtender::new(checker, fields)))
}

/// Let `target` borrow the shape of `prototype`.
pub fn similar_shape(target: &TypeHint, prototype: &TypeHint) -> RecipeEntry {
    Ok(Arc::new(SimilarShapeProvider::new(normalize(target)?, normalize(prototype)?)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mediator::Mediator;
    use crate::provider::{Loc, NamingRequest, ParserRequest};
    use crate::types::NormType;

    #[test]
    fn test_parser_for_is_bound_to_its_type() {
        let recipe = vec![
            parser_for(TypeHint::str(), |_| Ok(Value::str("str"))).expect("entry"),
            parser_for("count", |_| Ok(Value::Int(0))).expect("entry"),
        ];
        let mut mediator = Mediator::new(&recipe);

        let by_type = mediator
            .provide(ParserRequest::new(Loc::of(normalize(&TypeHint::str()).expect("normalize"))))
            .expect("provide");
        assert_eq!(by_type(&Value::None), Ok(Value::str("str")));

        let by_name = mediator
            .provide(ParserRequest::new(Loc::field(NormType::Any, "count", true)))
            .expect("provide");
        assert_eq!(by_name(&Value::None), Ok(Value::Int(0)));

        assert!(mediator.provide(ParserRequest::new(Loc::of(NormType::Any))).is_err());
    }

    #[test]
    fn test_name_mapping_answers_naming_requests() {
        let recipe = vec![name_mapping(TypeHint::model("User"), NamingRules::new().as_list()).expect("entry")];
        let mut mediator = Mediator::new(&recipe);
        let rules = mediator
            .provide(NamingRequest { loc: Loc::of(NormType::model("User")) })
            .expect("provide");
        assert!(rules.as_list);
    }

    #[test]
    fn test_type_variables_are_rejected() {
        assert!(matches!(
            parser_for(TypeHint::var("T"), |v| Ok(v.clone())),
            Err(ConfigError::InvalidPredicate(_))
        ));
    }
}
