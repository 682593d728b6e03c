//! Dict utilities: Cartesian expansion, intersection, subsetting.

use crate::value::{ConfigDict, ConfigValue};

/// Cartesian product of `axes`, with the last axis varying fastest.
fn product<'a, I>(axes: I) -> Vec<ConfigDict>
where
    I: IntoIterator<Item = (&'a str, Vec<ConfigValue>)>,
{
    let mut result: Vec<ConfigDict> = vec![ConfigDict::new()];
    for (name, values) in axes {
        let mut next = Vec::with_capacity(result.len() * values.len());
        for existing in &result {
            for value in &values {
                let mut combo = existing.clone();
                combo.insert(name.to_string(), value.clone());
                next.push(combo);
            }
        }
        result = next;
    }
    result
}

/// Expand every [`ConfigValue::List`] entry of `varied_dict` into the full
/// Cartesian product.
///
/// Keys are walked in sorted order and the last sorted key varies fastest.
/// Non-list values are copied into every combination. An empty candidate
/// list yields no combinations at all; an empty dict yields one empty dict.
pub fn all_dict_combinations(varied_dict: &ConfigDict) -> Vec<ConfigDict> {
    product(varied_dict.iter().map(|(key, value)| {
        let candidates = match value {
            ConfigValue::List(items) => items.clone(),
            other => vec![other.clone()],
        };
        (key.as_str(), candidates)
    }))
}

/// Cartesian product over explicitly ordered dimensions. The last dimension
/// varies fastest.
pub fn iter_all_dict_combinations_ordered(dims: &[(String, Vec<ConfigValue>)]) -> Vec<ConfigDict> {
    product(dims.iter().map(|(name, values)| (name.as_str(), values.clone())))
}

/// Entries of `a` that are present in `b` with an equal value.
pub fn dict_intersection(a: &ConfigDict, b: &ConfigDict) -> ConfigDict {
    a.iter()
        .filter(|(key, value)| b.get(*key) == Some(*value))
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect()
}

/// Entries shared with an identical value by every dict. Empty for no dicts.
pub fn dict_intersection_all<'a, I>(dicts: I) -> ConfigDict
where
    I: IntoIterator<Item = &'a ConfigDict>,
{
    let mut iter = dicts.into_iter();
    let Some(first) = iter.next() else {
        return ConfigDict::new();
    };
    iter.fold(first.clone(), |acc, dict| dict_intersection(&acc, dict))
}

/// Copy of `dict` restricted to `keys`. Missing keys are skipped.
pub fn dict_subset<S: AsRef<str>>(dict: &ConfigDict, keys: &[S]) -> ConfigDict {
    keys.iter()
        .filter_map(|key| {
            dict.get_key_value(key.as_ref())
                .map(|(k, v)| (k.clone(), v.clone()))
        })
        .collect()
}

/// Remove `keys` from `dict` in place.
pub fn delete_dict_keys<S: AsRef<str>>(dict: &mut ConfigDict, keys: &[S]) {
    for key in keys {
        dict.remove(key.as_ref());
    }
}

/// Drop repeated dicts, keeping the first occurrence.
pub fn unique_keep_order(dicts: Vec<ConfigDict>) -> Vec<ConfigDict> {
    let mut unique: Vec<ConfigDict> = Vec::with_capacity(dicts.len());
    for dict in dicts {
        if !unique.contains(&dict) {
            unique.push(dict);
        }
    }
    unique
}
