//! Building crowns from naming rules

use std::collections::{btree_map, BTreeMap, HashMap, HashSet};
use std::sync::Arc;

use bindery_value::Value;
use indexmap::map::Entry;
use indexmap::IndexMap;
use tracing::debug;

use super::naming::{ExtraIn, ExtraOut, MapTarget, NamingRules};
use super::{
    DictExtraPolicy, InpCrown, InpDictCrown, InpExtraMove, InpListCrown, InputNameLayout, ListExtraPolicy,
    OutCrown, OutDictCrown, OutExtraMove, OutListCrown, OutputNameLayout, Sieve,
};
use crate::mediator::Mediator;
use crate::pipeline::{Path, PathElement};
use crate::provider::{
    ConfigError, InputNameLayoutRequest, NamingRequest, OutputNameLayoutRequest, ProvideResult, StaticProvider,
};
use crate::shape::{DefaultPolicy, InputShape, OutputShape};

/// Derives layouts from the [`NamingRules`] the recipe gives for a type.
#[derive(Debug, Clone, Default)]
pub struct BuiltinNameLayoutProvider {
    omit_default: bool,
    extra_in: ExtraIn,
}

impl BuiltinNameLayoutProvider {
    /// Defaults for rules that leave `omit_default` or `extra_in` unset.
    pub fn new(omit_default: bool, extra_in: ExtraIn) -> Self {
        Self { omit_default, extra_in }
    }
}

impl StaticProvider for BuiltinNameLayoutProvider {
    fn provide_input_name_layout(
        &self,
        mediator: &mut Mediator<'_>,
        request: &InputNameLayoutRequest,
    ) -> ProvideResult<Arc<InputNameLayout>> {
        let rules = mediator.provide(NamingRequest { loc: request.loc.clone() })?;
        let shape = &request.shape;
        let ty = request.loc.ty.to_string();

        let extra_in = rules.extra_in.clone().unwrap_or_else(|| self.extra_in.clone());
        let (policy, extra_move) = match extra_in {
            ExtraIn::Skip => (DictExtraPolicy::Skip, None),
            ExtraIn::Forbid => (DictExtraPolicy::Forbid, None),
            ExtraIn::CollectFields(ids) => {
                for id in &ids {
                    if shape.field(id).is_none() {
                        return Err(ConfigError::UnknownExtraTarget { field: id.clone(), ty }.into());
                    }
                }
                (DictExtraPolicy::Collect, Some(InpExtraMove::Targets(ids)))
            }
            ExtraIn::CollectKwargs => {
                if !shape.kwargs {
                    return Err(ConfigError::NoKwargs { ty }.into());
                }
                (DictExtraPolicy::Collect, Some(InpExtraMove::Kwargs))
            }
        };
        let targets: &[String] = match &extra_move {
            Some(InpExtraMove::Targets(ids)) => ids,
            _ => &[],
        };

        let ids = shape
            .fields
            .iter()
            .map(|f| f.id.as_str())
            .filter(|id| !rules.is_skipped(id) && !targets.iter().any(|t| t == id));
        let leaves = field_paths(&rules, ids)?;
        let tree = build_tree(&leaves, rules.as_list)?;
        let list_extra = match policy {
            DictExtraPolicy::Forbid => ListExtraPolicy::Forbid,
            _ => ListExtraPolicy::Skip,
        };
        let crown = to_input_crown(tree, policy, list_extra, true);
        debug!(%ty, fields = leaves.len(), "built input name layout");
        Ok(Arc::new(InputNameLayout { crown, extra_move }))
    }

    fn provide_output_name_layout(
        &self,
        mediator: &mut Mediator<'_>,
        request: &OutputNameLayoutRequest,
    ) -> ProvideResult<Arc<OutputNameLayout>> {
        let rules = mediator.provide(NamingRequest { loc: request.loc.clone() })?;
        let shape = &request.shape;
        let ty = request.loc.ty.to_string();

        let extra_move = match &rules.extra_out {
            ExtraOut::Skip => None,
            ExtraOut::Merge(ids) => {
                for id in ids {
                    if shape.field(id).is_none() {
                        return Err(ConfigError::UnknownExtraTarget { field: id.clone(), ty }.into());
                    }
                }
                Some(OutExtraMove::Targets(ids.clone()))
            }
        };
        let targets: &[String] = match &extra_move {
            Some(OutExtraMove::Targets(ids)) => ids,
            None => &[],
        };

        let ids = shape
            .fields
            .iter()
            .map(|f| f.id.as_str())
            .filter(|id| !rules.is_skipped(id) && !targets.iter().any(|t| t == id));
        let leaves = field_paths(&rules, ids)?;
        let tree = build_tree(&leaves, rules.as_list)?;
        if extra_move.is_some() && !matches!(tree, Node::Dict(_)) {
            return Err(ConfigError::InvalidLayout {
                ty,
                reason: "extra data can only be merged into a dict".to_string(),
            }
            .into());
        }
        let omit_default = rules.omit_default.unwrap_or(self.omit_default);
        let crown = to_output_crown(tree, shape, omit_default);
        debug!(%ty, fields = leaves.len(), omit_default, "built output name layout");
        Ok(Arc::new(OutputNameLayout { crown, extra_move }))
    }
}

// ============================================================================
// Paths
// ============================================================================

fn field_paths<'a>(
    rules: &NamingRules,
    ids: impl Iterator<Item = &'a str>,
) -> Result<Vec<(Vec<PathElement>, String)>, ConfigError> {
    let mut leaves = Vec::new();
    for (position, id) in ids.enumerate() {
        let path = match rules.map.get(id) {
            Some(MapTarget::Key(key)) => vec![PathElement::Key(key.clone())],
            Some(MapTarget::Path(segments)) if segments.is_empty() => {
                return Err(ConfigError::InvalidLayout {
                    ty: id.to_string(),
                    reason: "a field can not be mapped to an empty path".to_string(),
                })
            }
            Some(MapTarget::Path(segments)) => segments.iter().map(PathElement::from).collect(),
            None if rules.as_list => vec![PathElement::Index(position)],
            None => vec![PathElement::Key(rules.convert_name(id)?)],
        };
        leaves.push((path, id.to_string()));
    }
    Ok(leaves)
}

/// Intermediate crown shared by both directions.
#[derive(Debug)]
enum Node {
    Dict(IndexMap<String, Node>),
    List(BTreeMap<usize, Node>),
    Leaf(String),
}

impl Node {
    fn branch_for(element: &PathElement) -> Node {
        match element {
            PathElement::Key(_) => Node::Dict(IndexMap::new()),
            PathElement::Index(_) => Node::List(BTreeMap::new()),
        }
    }
}

fn build_tree(leaves: &[(Vec<PathElement>, String)], as_list: bool) -> Result<Node, ConfigError> {
    let mut root = match leaves.first() {
        Some((path, _)) => Node::branch_for(&path[0]),
        None if as_list => Node::List(BTreeMap::new()),
        None => Node::Dict(IndexMap::new()),
    };
    for (path, id) in leaves {
        insert(&mut root, path, id, &mut Vec::new())?;
    }
    Ok(root)
}

fn insert(node: &mut Node, path: &[PathElement], id: &str, prefix: &mut Vec<PathElement>) -> Result<(), ConfigError> {
    let Some((head, rest)) = path.split_first() else {
        return Ok(());
    };
    prefix.push(head.clone());
    let fresh = || match rest.first() {
        Some(next) => Node::branch_for(next),
        None => Node::Leaf(id.to_string()),
    };
    let child = match (node, head) {
        (Node::Dict(map), PathElement::Key(key)) => match map.entry(key.clone()) {
            Entry::Occupied(e) => e.into_mut(),
            Entry::Vacant(e) if rest.is_empty() => {
                e.insert(fresh());
                return Ok(());
            }
            Entry::Vacant(e) => e.insert(fresh()),
        },
        (Node::List(map), PathElement::Index(index)) => match map.entry(*index) {
            btree_map::Entry::Occupied(e) => e.into_mut(),
            btree_map::Entry::Vacant(e) if rest.is_empty() => {
                e.insert(fresh());
                return Ok(());
            }
            btree_map::Entry::Vacant(e) => e.insert(fresh()),
        },
        _ => return Err(ConfigError::InconsistentPath { path: Path(prefix.clone()) }),
    };
    match child {
        Node::Leaf(_) if rest.is_empty() => Err(ConfigError::DuplicatePath { path: Path(prefix.clone()) }),
        Node::Leaf(_) => Err(ConfigError::PathConflict { path: Path(prefix.clone()) }),
        _ if rest.is_empty() => Err(ConfigError::PathConflict { path: Path(prefix.clone()) }),
        branch => insert(branch, rest, id, prefix),
    }
}

fn to_input_crown(node: Node, policy: DictExtraPolicy, list_extra: ListExtraPolicy, root: bool) -> InpCrown {
    // Collecting happens at the root only; nested dicts skip unknown keys.
    let nested = match policy {
        DictExtraPolicy::Collect => DictExtraPolicy::Skip,
        other => other,
    };
    match node {
        Node::Leaf(id) => InpCrown::Field(id),
        Node::Dict(map) => InpCrown::Dict(InpDictCrown {
            map: map
                .into_iter()
                .map(|(k, child)| (k, to_input_crown(child, nested, list_extra, false)))
                .collect(),
            extra: if root { policy } else { nested },
        }),
        Node::List(map) => {
            let len = map.keys().next_back().map_or(0, |max| max + 1);
            let mut items = vec![InpCrown::None; len];
            for (index, child) in map {
                items[index] = to_input_crown(child, nested, list_extra, false);
            }
            InpCrown::List(InpListCrown { items, extra: list_extra })
        }
    }
}

fn to_output_crown(node: Node, shape: &OutputShape, omit_default: bool) -> OutCrown {
    match node {
        Node::Leaf(id) => OutCrown::Field(id),
        Node::Dict(map) => {
            let mut sieves = HashMap::new();
            let mut out = IndexMap::with_capacity(map.len());
            for (key, child) in map {
                if let Node::Leaf(id) = &child {
                    if let Some(sieve) = omit_default.then(|| default_sieve(shape, id)).flatten() {
                        sieves.insert(key.clone(), sieve);
                    }
                }
                out.insert(key, to_output_crown(child, shape, omit_default));
            }
            OutCrown::Dict(OutDictCrown { map: out, sieves })
        }
        Node::List(map) => {
            let len = map.keys().next_back().map_or(0, |max| max + 1);
            let mut items = vec![OutCrown::None(Value::None); len];
            for (index, child) in map {
                items[index] = to_output_crown(child, shape, omit_default);
            }
            OutCrown::List(OutListCrown { items })
        }
    }
}

/// Sieve dropping a field that equals its default.
fn default_sieve(shape: &OutputShape, id: &str) -> Option<Sieve> {
    match shape.field(id)?.default.clone() {
        DefaultPolicy::NoDefault => None,
        DefaultPolicy::Value(default) => Some(Sieve::new(move |value| *value != default)),
        DefaultPolicy::Factory(factory) => Some(Sieve::new(move |value| *value != factory.produce())),
    }
}

// ============================================================================
// Validation
// ============================================================================

/// Checks every input layout, whoever provided it.
pub(crate) fn validate_input_layout(ty: &str, shape: &InputShape, layout: &InputNameLayout) -> Result<(), ConfigError> {
    let used = check_leaves(ty, layout.crown.field_ids(), |id| shape.field(id).is_some())?;

    let targets: Vec<&str> = match &layout.extra_move {
        Some(InpExtraMove::Targets(ids)) => ids.iter().map(String::as_str).collect(),
        Some(InpExtraMove::Kwargs) if !shape.kwargs => {
            return Err(ConfigError::NoKwargs { ty: ty.to_string() })
        }
        _ => Vec::new(),
    };
    for target in &targets {
        if used.contains(target) {
            return Err(ConfigError::ExtraTargetInCrown { field: target.to_string() });
        }
        if shape.field(target).is_none() {
            return Err(ConfigError::UnknownExtraTarget { field: target.to_string(), ty: ty.to_string() });
        }
    }

    if layout.extra_move.is_none() && collects(&layout.crown) {
        return Err(ConfigError::InvalidLayout {
            ty: ty.to_string(),
            reason: "extra data is collected but has nowhere to go".to_string(),
        });
    }

    check_list_order(shape, &layout.crown)?;

    let skipped: Vec<String> = shape
        .fields
        .iter()
        .filter(|f| f.is_required && !used.contains(f.id.as_str()) && !targets.contains(&f.id.as_str()))
        .map(|f| f.id.clone())
        .collect();
    if !skipped.is_empty() {
        return Err(ConfigError::SkippedRequired { ty: ty.to_string(), fields: skipped });
    }
    Ok(())
}

pub(crate) fn validate_output_layout(ty: &str, shape: &OutputShape, layout: &OutputNameLayout) -> Result<(), ConfigError> {
    let used = check_leaves(ty, layout.crown.field_ids(), |id| shape.field(id).is_some())?;
    if let Some(OutExtraMove::Targets(ids)) = &layout.extra_move {
        for target in ids {
            if used.contains(target.as_str()) {
                return Err(ConfigError::ExtraTargetInCrown { field: target.clone() });
            }
            if shape.field(target).is_none() {
                return Err(ConfigError::UnknownExtraTarget { field: target.clone(), ty: ty.to_string() });
            }
        }
    }
    Ok(())
}

fn check_leaves<'a>(
    ty: &str,
    ids: Vec<&'a str>,
    exists: impl Fn(&str) -> bool,
) -> Result<HashSet<&'a str>, ConfigError> {
    let mut used = HashSet::new();
    for id in ids {
        if !exists(id) {
            return Err(ConfigError::UnknownField { field: id.to_string(), ty: ty.to_string() });
        }
        if !used.insert(id) {
            return Err(ConfigError::DuplicateField { field: id.to_string() });
        }
    }
    Ok(used)
}

fn collects(crown: &InpCrown) -> bool {
    match crown {
        InpCrown::Dict(d) => d.extra == DictExtraPolicy::Collect || d.map.values().any(collects),
        InpCrown::List(l) => l.items.iter().any(collects),
        _ => false,
    }
}

/// In a list crown, short input drops trailing items, so once a field
/// is optional every later one must be too.
fn check_list_order(shape: &InputShape, crown: &InpCrown) -> Result<(), ConfigError> {
    match crown {
        InpCrown::Dict(d) => d.map.values().try_for_each(|c| check_list_order(shape, c)),
        InpCrown::List(l) => {
            let mut seen_optional = false;
            for item in &l.items {
                if let InpCrown::Field(id) = item {
                    let required = shape.field(id).is_some_and(|f| f.is_required);
                    if required && seen_optional {
                        return Err(ConfigError::RequiredAfterOptional { field: id.clone() });
                    }
                    seen_optional |= !required;
                } else {
                    check_list_order(shape, item)?;
                }
            }
            Ok(())
        }
        _ => Ok(()),
    }
}
