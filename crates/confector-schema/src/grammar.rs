//! Per-kind configuration grammars.
//!
//! A schema author may attach a `config` object to every property definition.
//! Which keys are allowed, which are required and what shape their values must
//! have is declared per value kind as a static [`ConfigGrammar`]. Grammars are
//! `const` data: a grammar listing the same parameter name twice fails to
//! compile.

use std::fmt;

use serde_json::{Map, Value};

use crate::error::{SchemaError, SchemaResult};
use crate::kind::ValueKind;

/// Accepted values of the `format` parameter of date properties.
pub const DATE_FORMATS: [&str; 3] = ["MonthSlashYear", "DayDotMonthDotYear", "Year"];

/// Expected shape of a single config value.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Shape {
    String,
    Bool,
    StringList,
    /// List whose elements are strings or `null` (e.g. enum logos).
    OptionalStringList,
    /// One of [`DATE_FORMATS`].
    DateFormat,
    /// `{"target_tag": <string>, "target_ident": <string>}`.
    LinkTarget,
    /// Wire name of a value kind, e.g. `"KubunInt"`.
    KindName,
    Object,
}

impl Shape {
    /// Returns `true` if `value` has this shape.
    pub fn matches(&self, value: &Value) -> bool {
        match self {
            Self::String => value.is_string(),
            Self::Bool => value.is_boolean(),
            Self::StringList => value
                .as_array()
                .is_some_and(|items| items.iter().all(Value::is_string)),
            Self::OptionalStringList => value
                .as_array()
                .is_some_and(|items| items.iter().all(|v| v.is_string() || v.is_null())),
            Self::DateFormat => value
                .as_str()
                .is_some_and(|s| DATE_FORMATS.contains(&s)),
            Self::LinkTarget => value.as_object().is_some_and(|target| {
                target.get("target_tag").is_some_and(Value::is_string)
                    && target.get("target_ident").is_some_and(Value::is_string)
            }),
            Self::KindName => value
                .as_str()
                .is_some_and(|s| ValueKind::resolve(s).is_ok()),
            Self::Object => value.is_object(),
        }
    }
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::String => write!(f, "string"),
            Self::Bool => write!(f, "boolean"),
            Self::StringList => write!(f, "list of strings"),
            Self::OptionalStringList => write!(f, "list of strings or nulls"),
            Self::DateFormat => write!(f, "one of {}", DATE_FORMATS.join(", ")),
            Self::LinkTarget => write!(f, "object with string target_tag and target_ident"),
            Self::KindName => write!(f, "value kind name"),
            Self::Object => write!(f, "object"),
        }
    }
}

/// One named parameter of a config grammar.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ConfigParam {
    pub name: &'static str,
    pub shape: Shape,
    pub optional: bool,
}

impl ConfigParam {
    pub const fn required(name: &'static str, shape: Shape) -> Self {
        Self {
            name,
            shape,
            optional: false,
        }
    }

    pub const fn optional(name: &'static str, shape: Shape) -> Self {
        Self {
            name,
            shape,
            optional: true,
        }
    }
}

/// Ordered set of config parameters with unique names.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ConfigGrammar {
    params: &'static [ConfigParam],
}

impl ConfigGrammar {
    pub const EMPTY: Self = Self::new(&[]);

    /// Build a grammar. Panics (at compile time, for `const` grammars) on a
    /// duplicate parameter name.
    pub const fn new(params: &'static [ConfigParam]) -> Self {
        assert!(names_unique(params), "duplicate config parameter name");
        Self { params }
    }

    pub fn params(&self) -> &'static [ConfigParam] {
        self.params
    }

    pub fn param(&self, name: &str) -> Option<&'static ConfigParam> {
        self.params.iter().find(|p| p.name == name)
    }

    /// Check a config object against this grammar.
    ///
    /// A key holding `null` counts as missing. Keys the grammar does not
    /// declare are accepted.
    pub fn validate(&self, config: &Map<String, Value>, property: &str) -> SchemaResult<()> {
        for param in self.params {
            match config.get(param.name) {
                None | Some(Value::Null) => {
                    if !param.optional {
                        return Err(SchemaError::MissingConfigParameter {
                            property: property.to_string(),
                            parameter: param.name.to_string(),
                        });
                    }
                }
                Some(value) => {
                    if !param.shape.matches(value) {
                        return Err(SchemaError::InvalidConfigParameter {
                            property: property.to_string(),
                            parameter: param.name.to_string(),
                            found: value.to_string(),
                            expected: param.shape.to_string(),
                        });
                    }
                }
            }
        }
        Ok(())
    }
}

const fn str_eq(a: &str, b: &str) -> bool {
    let (a, b) = (a.as_bytes(), b.as_bytes());
    if a.len() != b.len() {
        return false;
    }
    let mut i = 0;
    while i < a.len() {
        if a[i] != b[i] {
            return false;
        }
        i += 1;
    }
    true
}

const fn names_unique(params: &[ConfigParam]) -> bool {
    let mut i = 0;
    while i < params.len() {
        let mut j = i + 1;
        while j < params.len() {
            if str_eq(params[i].name, params[j].name) {
                return false;
            }
            j += 1;
        }
        i += 1;
    }
    true
}

pub const NUMERIC: ConfigGrammar =
    ConfigGrammar::new(&[ConfigParam::optional("suffix", Shape::String)]);

pub const ENUM: ConfigGrammar = ConfigGrammar::new(&[
    ConfigParam::required("variants", Shape::StringList),
    ConfigParam::optional("ordered", Shape::Bool),
    ConfigParam::optional("logos", Shape::OptionalStringList),
]);

pub const DATE: ConfigGrammar =
    ConfigGrammar::new(&[ConfigParam::optional("format", Shape::DateFormat)]);

pub const LINK: ConfigGrammar = ConfigGrammar::new(&[
    ConfigParam::optional("navigate", Shape::Bool),
    ConfigParam::optional("target", Shape::LinkTarget),
    ConfigParam::optional("reverse_ident", Shape::String),
    ConfigParam::optional("show_cover", Shape::Bool),
]);

pub const LIST: ConfigGrammar = ConfigGrammar::new(&[
    ConfigParam::required("subtype", Shape::KindName),
    ConfigParam::optional("subconfig", Shape::Object),
]);

pub const URL: ConfigGrammar = ConfigGrammar::new(&[
    ConfigParam::optional("show_favicon", Shape::Bool),
    ConfigParam::optional("as_button", Shape::Bool),
]);

pub const HIERARCHIES: ConfigGrammar =
    ConfigGrammar::new(&[ConfigParam::required("structure", Shape::Object)]);
