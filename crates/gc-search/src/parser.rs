//! Config-string grammar: `name[subx]:key=val,key=[v1,v2],...`.

use gc_types::{
    check_balanced, malformed_option, smart_cast, split_top_level, CfgResult, ConfigDict,
    ConfigValue, GrammarError, ValidationError, NAMEVARSEP,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use tracing::trace;

/// Picks a subset of an expansion: `[N]`, `[N,M]`, `[A:B]` or `[A:B:C]`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum IndexSelector {
    Indices(Vec<usize>),
    Slice {
        start: Option<usize>,
        stop: Option<usize>,
        step: Option<usize>,
    },
}

impl IndexSelector {
    pub fn index(index: usize) -> Self {
        Self::Indices(vec![index])
    }

    pub fn range(start: usize, stop: usize) -> Self {
        Self::Slice {
            start: Some(start),
            stop: Some(stop),
            step: None,
        }
    }

    /// Parse the text between the selector brackets.
    pub fn parse(text: &str) -> Result<Self, GrammarError> {
        let invalid = |message: String| GrammarError::InvalidSelector {
            selector: text.to_string(),
            message,
        };
        let parse_part = |part: &str| -> Result<Option<usize>, GrammarError> {
            let part = part.trim();
            if part.is_empty() {
                return Ok(None);
            }
            part.parse::<usize>()
                .map(Some)
                .map_err(|_| invalid(format!("{part:?} is not a non-negative integer")))
        };

        let body = text.trim();
        if body.is_empty() {
            return Err(invalid("empty selector".to_string()));
        }
        if body.contains(':') {
            let parts: Vec<&str> = body.split(':').collect();
            if parts.len() > 3 {
                return Err(invalid("too many ':' in slice".to_string()));
            }
            let start = parse_part(parts[0])?;
            let stop = parse_part(parts[1])?;
            let step = match parts.get(2) {
                Some(part) => parse_part(part)?,
                None => None,
            };
            if step == Some(0) {
                return Err(invalid("slice step cannot be zero".to_string()));
            }
            return Ok(Self::Slice { start, stop, step });
        }
        let indices = body
            .split(',')
            .map(|part| parse_part(part)?.ok_or_else(|| invalid("empty index".to_string())))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self::Indices(indices))
    }

    /// Apply the selector to `items`. Slices clamp; explicit indices must exist.
    pub fn select<T: Clone>(&self, items: &[T]) -> CfgResult<Vec<T>> {
        match self {
            Self::Indices(indices) => indices
                .iter()
                .map(|&index| {
                    items.get(index).cloned().ok_or_else(|| {
                        ValidationError::IndexOutOfRange {
                            index,
                            len: items.len(),
                        }
                        .into()
                    })
                })
                .collect(),
            Self::Slice { start, stop, step } => {
                let len = items.len();
                let start = start.unwrap_or(0).min(len);
                let stop = stop.unwrap_or(len).min(len);
                if start >= stop {
                    return Ok(Vec::new());
                }
                Ok(items[start..stop]
                    .iter()
                    .step_by(step.unwrap_or(1))
                    .cloned()
                    .collect())
            }
        }
    }
}

impl fmt::Display for IndexSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let opt = |v: &Option<usize>| v.map(|v| v.to_string()).unwrap_or_default();
        match self {
            Self::Indices(indices) => {
                let parts: Vec<String> = indices.iter().map(|i| i.to_string()).collect();
                write!(f, "{}", parts.join(","))
            }
            Self::Slice { start, stop, step } => {
                write!(f, "{}:{}", opt(start), opt(stop))?;
                if step.is_some() {
                    write!(f, ":{}", opt(step))?;
                }
                Ok(())
            }
        }
    }
}

/// One config-string token split into its parts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedCfgString {
    /// Everything before the first `[` or `:`. May be empty.
    pub cfgname: String,
    /// Raw, unexpanded option text after the separator.
    pub cfgopt_strs: String,
    pub subx: Option<IndexSelector>,
}

/// Split `name[subx]:options` into its parts.
///
/// The whole token must be consumed; anything left over after the name and
/// selector that is not introduced by `:` is a grammar error.
pub fn parse_cfgstr_name_options(cfgstr: &str) -> CfgResult<ParsedCfgString> {
    let name_end = cfgstr
        .find(|c: char| c == '[' || c == ':')
        .unwrap_or(cfgstr.len());
    let cfgname = cfgstr[..name_end].to_string();
    let mut rest = &cfgstr[name_end..];

    let mut subx = None;
    if let Some(after_open) = rest.strip_prefix('[') {
        let close = after_open
            .find(']')
            .ok_or_else(|| GrammarError::UnclosedSelector {
                cfgstr: cfgstr.to_string(),
            })?;
        subx = Some(IndexSelector::parse(&after_open[..close])?);
        rest = &after_open[close + 1..];
    }

    let cfgopt_strs = if rest.is_empty() {
        String::new()
    } else if let Some(opts) = rest.strip_prefix(NAMEVARSEP) {
        opts.to_string()
    } else {
        return Err(GrammarError::UnparseableName {
            cfgstr: cfgstr.to_string(),
            remainder: rest.to_string(),
        }
        .into());
    };

    Ok(ParsedCfgString {
        cfgname,
        cfgopt_strs,
        subx,
    })
}

/// Split an option string on commas that are not nested in brackets/parens.
pub fn split_cfgopt_strs(cfgopt_strs: &str) -> CfgResult<Vec<&str>> {
    check_balanced(cfgopt_strs)?;
    Ok(split_top_level(cfgopt_strs, ','))
}

/// Byte offsets of `=` outside any brackets.
fn top_level_equals(fragment: &str) -> Vec<usize> {
    let mut depth: i32 = 0;
    let mut found = Vec::new();
    for (idx, c) in fragment.char_indices() {
        match c {
            '[' | '(' => depth += 1,
            ']' | ')' => depth -= 1,
            '=' if depth == 0 => found.push(idx),
            _ => {}
        }
    }
    found
}

/// Parse `key=value` fragments into a dict. A bare `key` means `key=True`.
pub fn parse_cfgopt_fragments(fragments: &[&str], smartcast: bool) -> CfgResult<ConfigDict> {
    let mut cfg_options = ConfigDict::new();
    for fragment in fragments.iter().copied().map(str::trim).filter(|f| !f.is_empty()) {
        let (key, value) = match top_level_equals(fragment).as_slice() {
            [] => (fragment, ConfigValue::Bool(true)),
            [pos] => {
                let raw = fragment[pos + 1..].trim();
                let value = if smartcast {
                    smart_cast(raw)
                } else {
                    ConfigValue::Str(raw.to_string())
                };
                (fragment[..*pos].trim_end(), value)
            }
            _ => return Err(malformed_option!(fragment, "more than one '='")),
        };
        if key.is_empty() {
            return Err(malformed_option!(fragment, "missing key"));
        }
        trace!(key, %value, "parsed option fragment");
        cfg_options.insert(key.to_string(), value);
    }
    Ok(cfg_options)
}

/// Parse an option string into overrides without expanding candidate lists.
///
/// Every key present in `alias_keys` is renamed to its target.
pub fn noexpand_parse_cfgstrs(
    cfgopt_strs: &str,
    alias_keys: Option<&BTreeMap<String, String>>,
) -> CfgResult<ConfigDict> {
    let fragments = split_cfgopt_strs(cfgopt_strs)?;
    let mut cfg_options = parse_cfgopt_fragments(&fragments, true)?;
    if let Some(alias_keys) = alias_keys {
        for (old, new) in alias_keys {
            if let Some(value) = cfg_options.remove(old) {
                cfg_options.insert(new.clone(), value);
            }
        }
    }
    Ok(cfg_options)
}
