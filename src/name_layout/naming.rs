//! Naming rules: how field ids become external names

use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::pipeline::PathElement;
use crate::provider::ConfigError;

/// Case conventions for generated names. Field ids are `snake_case`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NameStyle {
    /// `snake_case`
    Snake,
    /// `kebab-case`
    Kebab,
    /// `camelCase`
    CamelLower,
    /// `CamelCase`
    Camel,
    /// `lowercase`
    Lower,
    /// `UPPERCASE`
    Upper,
    /// `UPPER_SNAKE_CASE`
    UpperSnake,
    /// `Camel_Snake`
    CamelSnake,
    /// `dot.case`
    Dot,
    /// `Camel.Dot`
    CamelDot,
    /// `UPPER.DOT`
    UpperDot,
}

fn title(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
        None => String::new(),
    }
}

impl NameStyle {
    /// Convert a `snake_case` name.
    pub fn apply(self, name: &str) -> String {
        let words = || name.split('_');
        match self {
            NameStyle::Snake => name.to_string(),
            NameStyle::Kebab => words().collect::<Vec<_>>().join("-"),
            NameStyle::CamelLower => {
                let mut parts = words();
                let head = parts.next().unwrap_or_default().to_lowercase();
                parts.fold(head, |acc, w| acc + &title(w))
            }
            NameStyle::Camel => words().map(title).collect(),
            NameStyle::Lower => name.replace('_', "").to_lowercase(),
            NameStyle::Upper => name.replace('_', "").to_uppercase(),
            NameStyle::UpperSnake => name.to_uppercase(),
            NameStyle::CamelSnake => words().map(title).collect::<Vec<_>>().join("_"),
            NameStyle::Dot => words().collect::<Vec<_>>().join(".").to_lowercase(),
            NameStyle::CamelDot => words().map(title).collect::<Vec<_>>().join("."),
            NameStyle::UpperDot => words().map(str::to_uppercase).collect::<Vec<_>>().join("."),
        }
    }
}

pub fn is_snake_case(name: &str) -> bool {
    name.to_lowercase() == name
}

/// Custom rename function, used instead of a [`NameStyle`].
#[derive(Clone)]
pub struct RenameFn(pub Arc<dyn Fn(&str) -> String + Send + Sync>);

impl fmt::Debug for RenameFn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("RenameFn(..)")
    }
}

/// Explicit target of a field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MapTarget {
    Key(String),
    /// Nested location, e.g. `["meta", "id"]` or `["items", 0]`
    Path(Vec<PathSegment>),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PathSegment {
    Index(usize),
    Key(String),
}

impl From<&PathSegment> for PathElement {
    fn from(segment: &PathSegment) -> Self {
        match segment {
            PathSegment::Key(key) => PathElement::Key(key.clone()),
            PathSegment::Index(index) => PathElement::Index(*index),
        }
    }
}

impl From<&str> for MapTarget {
    fn from(key: &str) -> Self {
        MapTarget::Key(key.to_string())
    }
}

/// What happens to input keys no field claims.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtraIn {
    #[default]
    Skip,
    Forbid,
    /// Collect into these dict-typed fields
    CollectFields(Vec<String>),
    /// Collect into the constructor's kwargs
    CollectKwargs,
}

/// What happens to extra data on output.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtraOut {
    #[default]
    Skip,
    /// Merge the contents of these dict fields into the root mapping
    Merge(Vec<String>),
}

/// Naming configuration for one type.
///
/// Options left as `None` fall back to the retort-wide settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NamingRules {
    pub skip: Vec<String>,
    pub only: Option<Vec<String>>,
    pub map: IndexMap<String, MapTarget>,
    pub name_style: Option<NameStyle>,
    #[serde(skip)]
    pub rename: Option<RenameFn>,
    pub trim_trailing_underscore: bool,
    pub as_list: bool,
    pub omit_default: Option<bool>,
    pub extra_in: Option<ExtraIn>,
    pub extra_out: ExtraOut,
}

impl Default for NamingRules {
    fn default() -> Self {
        Self {
            skip: Vec::new(),
            only: None,
            map: IndexMap::new(),
            name_style: None,
            rename: None,
            trim_trailing_underscore: true,
            as_list: false,
            omit_default: None,
            extra_in: None,
            extra_out: ExtraOut::Skip,
        }
    }
}

impl NamingRules {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn skip<I: IntoIterator<Item = S>, S: Into<String>>(mut self, ids: I) -> Self {
        self.skip.extend(ids.into_iter().map(Into::into));
        self
    }

    pub fn only<I: IntoIterator<Item = S>, S: Into<String>>(mut self, ids: I) -> Self {
        self.only = Some(ids.into_iter().map(Into::into).collect());
        self
    }

    pub fn map(mut self, id: impl Into<String>, target: impl Into<MapTarget>) -> Self {
        self.map.insert(id.into(), target.into());
        self
    }

    pub fn map_path(mut self, id: impl Into<String>, path: Vec<PathSegment>) -> Self {
        self.map.insert(id.into(), MapTarget::Path(path));
        self
    }

    pub fn name_style(mut self, style: NameStyle) -> Self {
        self.name_style = Some(style);
        self
    }

    pub fn rename_with<F>(mut self, f: F) -> Self
    where
        F: Fn(&str) -> String + Send + Sync + 'static,
    {
        self.rename = Some(RenameFn(Arc::new(f)));
        self
    }

    pub fn trim_trailing_underscore(mut self, trim: bool) -> Self {
        self.trim_trailing_underscore = trim;
        self
    }

    pub fn as_list(mut self) -> Self {
        self.as_list = true;
        self
    }

    pub fn omit_default(mut self, omit: bool) -> Self {
        self.omit_default = Some(omit);
        self
    }

    pub fn extra_in(mut self, policy: ExtraIn) -> Self {
        self.extra_in = Some(policy);
        self
    }

    pub fn extra_out(mut self, policy: ExtraOut) -> Self {
        self.extra_out = policy;
        self
    }

    pub fn is_skipped(&self, id: &str) -> bool {
        self.skip.iter().any(|s| s == id)
            || self.only.as_ref().is_some_and(|only| !only.iter().any(|s| s == id))
    }

    /// External name generated for a field id that has no explicit mapping.
    pub fn convert_name(&self, id: &str) -> Result<String, ConfigError> {
        let name = if self.trim_trailing_underscore {
            id.trim_end_matches('_')
        } else {
            id
        };
        if let Some(rename) = &self.rename {
            return Ok((rename.0)(name));
        }
        match self.name_style {
            Some(style) => {
                if !is_snake_case(id) {
                    return Err(ConfigError::NotSnakeCase { name: id.to_string() });
                }
                Ok(style.apply(name))
            }
            None => Ok(name.to_string()),
        }
    }
}
