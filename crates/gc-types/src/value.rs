//! Config values, config dicts and the reserved bookkeeping keys.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::text::split_top_level;

/// Canonical source string a config was expanded from.
pub const CFGSTR_KEY: &str = "_cfgstr";
/// Name of the base config a config was derived from.
pub const CFGNAME_KEY: &str = "_cfgname";
/// Caller supplied tag.
pub const CFGTYPE_KEY: &str = "_cfgtype";
/// Position within the expansion group.
pub const CFGINDEX_KEY: &str = "_cfgindex";

/// Keys that are bookkeeping, never user parameters.
pub const INTERNAL_CFGKEYS: [&str; 4] = [CFGSTR_KEY, CFGNAME_KEY, CFGTYPE_KEY, CFGINDEX_KEY];

/// Separator between a config name and its options.
pub const NAMEVARSEP: &str = ":";

pub fn is_reserved_key(key: &str) -> bool {
    INTERNAL_CFGKEYS.contains(&key)
}

/// A parameter dictionary. Keys iterate in sorted order.
pub type ConfigDict = BTreeMap<String, ConfigValue>;

/// A single parameter value.
///
/// `List` holds candidate values that expand combinatorially; `Tuple` is a
/// literal sequence that is never expanded.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ConfigValue {
    #[default]
    None,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    List(Vec<ConfigValue>),
    Tuple(Vec<ConfigValue>),
    Dict(ConfigDict),
}

impl ConfigValue {
    pub fn is_none(&self) -> bool {
        matches!(self, Self::None)
    }

    pub fn as_list(&self) -> Option<&[ConfigValue]> {
        match self {
            Self::List(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_dict(&self) -> Option<&ConfigDict> {
        match self {
            Self::Dict(dict) => Some(dict),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Numeric view of ints and floats.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Int(v) => Some(*v as f64),
            Self::Float(v) => Some(*v),
            _ => None,
        }
    }
}

fn write_seq(f: &mut fmt::Formatter<'_>, items: &[ConfigValue]) -> fmt::Result {
    for (idx, item) in items.iter().enumerate() {
        if idx > 0 {
            write!(f, ", ")?;
        }
        write!(f, "{item}")?;
    }
    Ok(())
}

impl fmt::Display for ConfigValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::None => write!(f, "None"),
            Self::Bool(true) => write!(f, "True"),
            Self::Bool(false) => write!(f, "False"),
            Self::Int(v) => write!(f, "{v}"),
            Self::Float(v) => {
                if v.is_nan() {
                    write!(f, "nan")
                } else if v.is_infinite() {
                    write!(f, "{}", if *v > 0.0 { "inf" } else { "-inf" })
                } else if v.fract() == 0.0 && v.abs() < 1e16 {
                    write!(f, "{v:.1}")
                } else {
                    write!(f, "{v}")
                }
            }
            Self::Str(s) => write!(f, "{s}"),
            Self::List(items) => {
                write!(f, "[")?;
                write_seq(f, items)?;
                write!(f, "]")
            }
            Self::Tuple(items) => {
                write!(f, "(")?;
                write_seq(f, items)?;
                if items.len() == 1 {
                    write!(f, ",")?;
                }
                write!(f, ")")
            }
            Self::Dict(dict) => {
                write!(f, "{{")?;
                for (idx, (key, value)) in dict.iter().enumerate() {
                    if idx > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{key}: {value}")?;
                }
                write!(f, "}}")
            }
        }
    }
}

impl From<bool> for ConfigValue {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<i64> for ConfigValue {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<i32> for ConfigValue {
    fn from(v: i32) -> Self {
        Self::Int(v as i64)
    }
}

impl From<usize> for ConfigValue {
    fn from(v: usize) -> Self {
        Self::Int(v as i64)
    }
}

impl From<f64> for ConfigValue {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<&str> for ConfigValue {
    fn from(v: &str) -> Self {
        Self::Str(v.to_string())
    }
}

impl From<String> for ConfigValue {
    fn from(v: String) -> Self {
        Self::Str(v)
    }
}

impl From<Option<&str>> for ConfigValue {
    fn from(v: Option<&str>) -> Self {
        v.map_or(Self::None, Self::from)
    }
}

impl<T: Into<ConfigValue>> From<Vec<T>> for ConfigValue {
    fn from(items: Vec<T>) -> Self {
        Self::List(items.into_iter().map(Into::into).collect())
    }
}

impl From<ConfigDict> for ConfigValue {
    fn from(dict: ConfigDict) -> Self {
        Self::Dict(dict)
    }
}

/// Build a [`ConfigDict`] from `key => value` pairs.
#[macro_export]
macro_rules! cfgdict {
    () => {
        $crate::ConfigDict::new()
    };
    ($($key:expr => $value:expr),+ $(,)?) => {{
        let mut dict = $crate::ConfigDict::new();
        $(dict.insert($key.to_string(), $crate::ConfigValue::from($value));)+
        dict
    }};
}

/// Interpret an option value string.
///
/// `true`/`false`/`none` (any case) become literals, `[a,b]` becomes a
/// candidate list, `(a,b)` a tuple, then int, then float, else the string
/// itself.
pub fn smart_cast(text: &str) -> ConfigValue {
    match text.to_lowercase().as_str() {
        "true" => return ConfigValue::Bool(true),
        "false" => return ConfigValue::Bool(false),
        "none" => return ConfigValue::None,
        _ => {}
    }
    if text.len() >= 2 && text.starts_with('[') && text.ends_with(']') {
        return ConfigValue::List(cast_items(&text[1..text.len() - 1]));
    }
    if text.len() >= 2 && text.starts_with('(') && text.ends_with(')') {
        return ConfigValue::Tuple(cast_items(&text[1..text.len() - 1]));
    }
    let trimmed = text.trim();
    if let Ok(v) = trimmed.parse::<i64>() {
        return ConfigValue::Int(v);
    }
    if let Ok(v) = trimmed.parse::<f64>() {
        return ConfigValue::Float(v);
    }
    ConfigValue::Str(text.to_string())
}

fn cast_items(inner: &str) -> Vec<ConfigValue> {
    if inner.trim().is_empty() {
        return Vec::new();
    }
    split_top_level(inner, ',')
        .into_iter()
        .map(|item| smart_cast(item.trim()))
        .collect()
}
