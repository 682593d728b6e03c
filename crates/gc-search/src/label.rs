//! Short deterministic labels for expanded configs.

use gc_types::{
    delete_dict_keys, dict_intersection_all, multi_replace, wrap_text, CfgResult, ConfigDict,
    ConfigValue, CFGNAME_KEY, INTERNAL_CFGKEYS, NAMEVARSEP,
};
use std::collections::BTreeSet;

use crate::parser::{parse_cfgopt_fragments, parse_cfgstr_name_options, split_cfgopt_strs};

/// Display width used by [`make_cfglbls`].
pub const LABEL_WRAP_WIDTH: usize = 50;

const LABEL_STRIP: [(&str, &str); 2] = [(" ", ""), ("'", "")];

fn compact_items<'a, I>(items: I) -> String
where
    I: IntoIterator<Item = (&'a String, &'a ConfigValue)>,
{
    let joined = items
        .into_iter()
        .map(|(key, value)| format!("{key}={value}"))
        .collect::<Vec<_>>()
        .join(",");
    multi_replace(&joined, &LABEL_STRIP)
}

fn name_of(value: Option<&ConfigValue>) -> String {
    match value {
        None | Some(ConfigValue::None) => String::new(),
        Some(ConfigValue::Str(name)) => name.clone(),
        Some(other) => other.to_string(),
    }
}

/// Label one config as `name:key1=val1,key2=val2`.
///
/// `name` defaults to the config's `_cfgname`. Keys in `nonlbl_keys` are
/// dropped; keys in `key_order` come first, the rest follow sorted. When the
/// name carries its own options (`test:K=[1,2,3]`), those options are shown
/// ahead of the label except where the config already has the key.
pub fn get_cfg_lbl<S: AsRef<str>>(
    cfg: &ConfigDict,
    name: Option<&str>,
    nonlbl_keys: &[S],
    key_order: Option<&[&str]>,
) -> CfgResult<String> {
    let name = match name {
        Some(name) => name.to_string(),
        None => name_of(cfg.get(CFGNAME_KEY)),
    };

    let mut clean_cfg = cfg.clone();
    delete_dict_keys(&mut clean_cfg, nonlbl_keys);
    let key_order = key_order.unwrap_or_default();
    let ordered = key_order
        .iter()
        .filter_map(|key| clean_cfg.get_key_value(*key))
        .chain(
            clean_cfg
                .iter()
                .filter(|(key, _)| !key_order.contains(&key.as_str())),
        );
    let lbl = compact_items(ordered);

    if !name.contains(NAMEVARSEP) {
        return Ok(format!("{name}{NAMEVARSEP}{lbl}"));
    }

    let parsed = parse_cfgstr_name_options(&name)?;
    let fragments = split_cfgopt_strs(&parsed.cfgopt_strs)?;
    let mut name_options = parse_cfgopt_fragments(&fragments, false)?;
    name_options.retain(|key, _| !cfg.contains_key(key));
    let prefix = compact_items(&name_options);
    let parts: Vec<&str> = [prefix.as_str(), lbl.as_str()]
        .into_iter()
        .filter(|part| !part.is_empty())
        .collect();
    Ok(format!("{}{NAMEVARSEP}{}", parsed.cfgname, parts.join(",")))
}

/// Split configs into the entries shared by all of them and the per-config
/// remainder.
///
/// A `default_cfg` takes part in the intersection, so only entries matching
/// the defaults can be shared. In recursive mode a key whose value is a dict
/// in every config is partitioned the same way one level down.
pub fn partition_varied_cfg_list(
    cfg_list: &[ConfigDict],
    default_cfg: Option<&ConfigDict>,
    recursive: bool,
) -> (ConfigDict, Vec<ConfigDict>) {
    let mut nonvaried_cfg = dict_intersection_all(default_cfg.into_iter().chain(cfg_list));
    let nonvaried_keys: Vec<String> = nonvaried_cfg.keys().cloned().collect();
    let mut varied_cfg_list: Vec<ConfigDict> = cfg_list
        .iter()
        .map(|cfg| {
            let mut cfg = cfg.clone();
            delete_dict_keys(&mut cfg, &nonvaried_keys);
            cfg
        })
        .collect();

    if recursive {
        let varied_keys: BTreeSet<String> = varied_cfg_list
            .iter()
            .flat_map(|cfg| cfg.keys().cloned())
            .collect();
        for key in varied_keys {
            let subdicts: Option<Vec<ConfigDict>> = varied_cfg_list
                .iter()
                .map(|cfg| cfg.get(&key).and_then(ConfigValue::as_dict).cloned())
                .collect();
            let Some(subdicts) = subdicts else {
                continue;
            };
            let (nonvaried_sub, varied_subs) = partition_varied_cfg_list(&subdicts, None, true);
            nonvaried_cfg.insert(key.clone(), ConfigValue::Dict(nonvaried_sub));
            for (cfg, sub) in varied_cfg_list.iter_mut().zip(varied_subs) {
                cfg.insert(key.clone(), ConfigValue::Dict(sub));
            }
        }
    }
    (nonvaried_cfg, varied_cfg_list)
}

/// Label each config by only the entries that differ across the list.
///
/// Names come from `mainkey`; if any config lacks it every name is empty.
pub fn get_varied_cfg_lbls(
    cfg_list: &[ConfigDict],
    default_cfg: Option<&ConfigDict>,
    mainkey: &str,
) -> CfgResult<Vec<String>> {
    let cfgname_list: Vec<String> = if cfg_list.iter().all(|cfg| cfg.contains_key(mainkey)) {
        cfg_list.iter().map(|cfg| name_of(cfg.get(mainkey))).collect()
    } else {
        vec![String::new(); cfg_list.len()]
    };
    let (_, varied_cfg_list) = partition_varied_cfg_list(cfg_list, default_cfg, false);
    varied_cfg_list
        .iter()
        .zip(&cfgname_list)
        .map(|(cfg, name)| get_cfg_lbl(cfg, Some(name.as_str()), &INTERNAL_CFGKEYS, None))
        .collect()
}

/// Grid-search labels: only keys that actually vary in `varied_dict`.
///
/// Keys missing from `varied_dict`, keys with a single candidate and `None`
/// values are left out. Labels are wrapped to [`LABEL_WRAP_WIDTH`].
pub fn make_cfglbls(cfgdict_list: &[ConfigDict], varied_dict: &ConfigDict) -> Vec<String> {
    cfgdict_list
        .iter()
        .map(|cfgdict| {
            let items: Vec<String> = cfgdict
                .iter()
                .filter(|(key, value)| {
                    let num_candidates = match varied_dict.get(*key) {
                        None => return false,
                        Some(ConfigValue::List(vals)) => vals.len(),
                        Some(_) => 1,
                    };
                    num_candidates != 1 && !value.is_none()
                })
                .map(|(key, value)| format!("{key}: {value}"))
                .collect();
            let cfglbl = multi_replace(
                &items.join(", "),
                &[("'", ""), ("}", ""), ("{", ""), (": ", "=")],
            );
            wrap_text(&cfglbl, LABEL_WRAP_WIDTH).join("\n")
        })
        .collect()
}
