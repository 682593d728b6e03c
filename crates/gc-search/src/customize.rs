//! Merging parsed overrides onto base configs and expanding config-string lists.

use gc_types::{
    all_dict_combinations, is_reserved_key, CfgResult, ConfigDict, ConfigValue, GrammarError,
    KeySchema, ValidationError, CFGINDEX_KEY, CFGNAME_KEY, CFGSTR_KEY, CFGTYPE_KEY, NAMEVARSEP,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use tracing::{debug, warn};

use crate::defaults::{lookup_base_cfg_list, NamedDefaults};
use crate::parser::{noexpand_parse_cfgstrs, parse_cfgstr_name_options};

/// How override keys are renamed and checked.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyPolicy {
    /// Old key -> new key, applied right after parsing.
    #[serde(default)]
    pub alias_keys: Option<BTreeMap<String, String>>,
    /// Permitted override keys. Falls back to the base config's keys.
    #[serde(default)]
    pub valid_keys: Option<Vec<String>>,
    /// Reject override keys that are not permitted.
    #[serde(default = "KeyPolicy::default_strict")]
    pub strict: bool,
}

impl KeyPolicy {
    const fn default_strict() -> bool {
        true
    }

    /// Accept any override key.
    pub fn lenient() -> Self {
        Self {
            strict: false,
            ..Self::default()
        }
    }

    pub fn with_alias(mut self, old: impl Into<String>, new: impl Into<String>) -> Self {
        self.alias_keys
            .get_or_insert_with(BTreeMap::new)
            .insert(old.into(), new.into());
        self
    }

    pub fn with_valid_keys<S: Into<String>>(mut self, keys: impl IntoIterator<Item = S>) -> Self {
        self.valid_keys = Some(keys.into_iter().map(Into::into).collect());
        self
    }

    fn validate(&self, cfg_options: &ConfigDict, base_cfg: &ConfigDict) -> CfgResult<()> {
        if !self.strict || cfg_options.is_empty() {
            return Ok(());
        }
        let (allowed, schema): (Vec<&str>, KeySchema) = match &self.valid_keys {
            Some(keys) => (keys.iter().map(String::as_str).collect(), KeySchema::ValidKeys),
            None => {
                let base_keys: Vec<&str> = base_cfg
                    .keys()
                    .map(String::as_str)
                    .filter(|key| !is_reserved_key(key))
                    .collect();
                if base_keys.is_empty() {
                    warn!(
                        keys = ?cfg_options.keys().collect::<Vec<_>>(),
                        "strict key check skipped: no valid keys and an empty base config"
                    );
                    return Ok(());
                }
                (base_keys, KeySchema::BaseConfig)
            }
        };
        let unknown: Vec<String> = cfg_options
            .keys()
            .filter(|key| is_reserved_key(key) || !allowed.contains(&key.as_str()))
            .cloned()
            .collect();
        if unknown.is_empty() {
            Ok(())
        } else {
            Err(ValidationError::UnknownKeys {
                keys: unknown,
                schema,
            }
            .into())
        }
    }
}

impl Default for KeyPolicy {
    fn default() -> Self {
        Self {
            alias_keys: None,
            valid_keys: None,
            strict: Self::default_strict(),
        }
    }
}

/// Customize `base_cfg` with the overrides in `cfgopt_strs` and expand any
/// candidate lists.
///
/// Every resulting config carries `_cfgtype`, `_cfgname`, a sequential
/// `_cfgindex` starting at `offset`, and the shared source string `_cfgstr`.
/// The caller's `base_cfg` is never modified.
pub fn customize_base_cfg(
    cfgname: &str,
    cfgopt_strs: &str,
    base_cfg: &ConfigDict,
    cfgtype: Option<&str>,
    policy: &KeyPolicy,
    offset: usize,
) -> CfgResult<Vec<ConfigDict>> {
    let cfg_options = noexpand_parse_cfgstrs(cfgopt_strs, policy.alias_keys.as_ref())?;
    policy.validate(&cfg_options, base_cfg)?;

    let mut cfg = base_cfg.clone();
    cfg.extend(cfg_options);
    cfg.insert(CFGTYPE_KEY.to_string(), ConfigValue::from(cfgtype));
    cfg.insert(CFGNAME_KEY.to_string(), ConfigValue::from(cfgname));

    let cfgstr = if cfgopt_strs.is_empty() {
        cfgname.to_string()
    } else {
        format!("{cfgname}{NAMEVARSEP}{cfgopt_strs}")
    };

    let mut cfg_combo = all_dict_combinations(&cfg);
    for (combox, cfg_) in cfg_combo.iter_mut().enumerate() {
        cfg_.insert(CFGINDEX_KEY.to_string(), ConfigValue::from(offset + combox));
        cfg_.insert(CFGSTR_KEY.to_string(), ConfigValue::from(cfgstr.as_str()));
    }
    if cfg_combo.is_empty() {
        warn!(cfgstr = %cfgstr, "expansion produced no configs (empty candidate list)");
    }
    debug!(cfgstr = %cfgstr, count = cfg_combo.len(), "customized base config");
    Ok(cfg_combo)
}

/// One element of an expanded config-string group.
#[derive(Debug, Clone, PartialEq)]
pub enum CfgNode {
    Single(ConfigDict),
    /// Configs kept together: one `::` segment, or one base in nested mode.
    Group(Vec<ConfigDict>),
}

impl CfgNode {
    pub fn configs(&self) -> &[ConfigDict] {
        match self {
            Self::Single(cfg) => std::slice::from_ref(cfg),
            Self::Group(cfgs) => cfgs,
        }
    }
}

pub type CfgCombo = Vec<CfgNode>;

fn into_configs(combo: CfgCombo) -> Vec<ConfigDict> {
    let mut cfgs = Vec::new();
    for node in combo {
        match node {
            CfgNode::Single(cfg) => cfgs.push(cfg),
            CfgNode::Group(group) => cfgs.extend(group),
        }
    }
    cfgs
}

/// Flatten parsed groups into one config list, in order.
pub fn flatten_cfg_combos(combos: &[CfgCombo]) -> Vec<ConfigDict> {
    combos
        .iter()
        .flat_map(|combo| combo.iter().flat_map(|node| node.configs().iter().cloned()))
        .collect()
}

/// Knobs for [`parse_cfgstr_list2`].
#[derive(Debug, Clone)]
pub struct ParseOptions<'a> {
    pub named_defaults: Option<&'a NamedDefaults>,
    /// Stamped into every config as `_cfgtype`.
    pub cfgtype: Option<String>,
    pub keys: KeyPolicy,
    /// One flat group per input token (`true`) or one group per base (`false`).
    pub expand_nested: bool,
    /// Merged into every config of a `::` joined token.
    pub special_join_dict: Option<ConfigDict>,
    /// Keep each base's expansion together as a [`CfgNode::Group`].
    pub is_nestedcfgtype: bool,
    /// Handed to computed named defaults.
    pub metadata: Option<&'a Value>,
}

impl Default for ParseOptions<'_> {
    fn default() -> Self {
        Self {
            named_defaults: None,
            cfgtype: None,
            keys: KeyPolicy::default(),
            expand_nested: true,
            special_join_dict: None,
            is_nestedcfgtype: false,
            metadata: None,
        }
    }
}

impl<'a> ParseOptions<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_named_defaults(mut self, named_defaults: &'a NamedDefaults) -> Self {
        self.named_defaults = Some(named_defaults);
        self
    }

    pub fn with_cfgtype(mut self, cfgtype: impl Into<String>) -> Self {
        self.cfgtype = Some(cfgtype.into());
        self
    }

    pub fn with_keys(mut self, keys: KeyPolicy) -> Self {
        self.keys = keys;
        self
    }

    pub fn with_strict(mut self, strict: bool) -> Self {
        self.keys.strict = strict;
        self
    }

    pub fn with_expand_nested(mut self, expand_nested: bool) -> Self {
        self.expand_nested = expand_nested;
        self
    }

    pub fn with_special_join_dict(mut self, special_join_dict: ConfigDict) -> Self {
        self.special_join_dict = Some(special_join_dict);
        self
    }

    pub fn with_nested_cfgtype(mut self, is_nestedcfgtype: bool) -> Self {
        self.is_nestedcfgtype = is_nestedcfgtype;
        self
    }

    pub fn with_metadata(mut self, metadata: &'a Value) -> Self {
        self.metadata = Some(metadata);
        self
    }
}

/// Expand a list of config strings into config groups.
///
/// Supported token forms:
/// - `name`, `name:key=val,...`, `name:key=[v1,v2]`
/// - `name[subx]:...` keeps only the selected part of each base's expansion
/// - `name1:opts::name2:opts` binds the segments together (no crossing)
/// - `name=:opts` declares a named default for the rest of this call; it is
///   only used when no registry was supplied
///
/// With `expand_nested` each token yields one group. Otherwise each base
/// (or joined token) yields its own group.
pub fn parse_cfgstr_list2<S: AsRef<str>>(
    cfgstr_list: &[S],
    options: &ParseOptions<'_>,
) -> CfgResult<Vec<CfgCombo>> {
    let mut dyndef_named_defaults = NamedDefaults::new();
    let mut cfgstr_list_ = Vec::with_capacity(cfgstr_list.len());
    for cfgstr in cfgstr_list {
        let cfgstr: &str = cfgstr.as_ref();
        if !cfgstr.contains("=:") {
            cfgstr_list_.push(cfgstr);
            continue;
        }
        let parsed = parse_cfgstr_name_options(cfgstr)?;
        let cfgname = parsed
            .cfgname
            .strip_suffix('=')
            .ok_or_else(|| GrammarError::InlineDefault {
                cfgstr: cfgstr.to_string(),
            })?;
        let base_cfg_list =
            lookup_base_cfg_list(cfgname, options.named_defaults, options.metadata)?;
        let cfg_options =
            noexpand_parse_cfgstrs(&parsed.cfgopt_strs, options.keys.alias_keys.as_ref())?;
        let declared: Vec<ConfigDict> = base_cfg_list
            .into_iter()
            .map(|mut base| {
                base.extend(cfg_options.clone());
                base
            })
            .collect();
        debug!(cfgname, bases = declared.len(), "declared inline named default");
        dyndef_named_defaults.insert(cfgname, declared);
    }

    let named_defaults = match options.named_defaults {
        None if !dyndef_named_defaults.is_empty() => Some(&dyndef_named_defaults),
        Some(registry) => {
            if !dyndef_named_defaults.is_empty() {
                warn!(
                    names = ?dyndef_named_defaults.names(),
                    "inline named defaults ignored because a registry was supplied"
                );
            }
            Some(registry)
        }
        None => None,
    };

    let mut cfg_combos_list: Vec<CfgCombo> = Vec::new();
    for cfgstr in cfgstr_list_ {
        let mut cfg_combos: CfgCombo = Vec::new();
        if cfgstr.contains("::") {
            let segments: Vec<&str> = cfgstr.split("::").collect();
            let segment_options = ParseOptions {
                named_defaults,
                special_join_dict: None,
                is_nestedcfgtype: false,
                ..options.clone()
            };
            let special_combo_list = parse_cfgstr_list2(&segments, &segment_options)?;
            let mut groups: CfgCombo = special_combo_list
                .into_iter()
                .map(|combo| {
                    let mut cfgs = into_configs(combo);
                    if let Some(join) = &options.special_join_dict {
                        for cfg in &mut cfgs {
                            cfg.extend(join.clone());
                        }
                    }
                    CfgNode::Group(cfgs)
                })
                .collect();
            debug!(cfgstr, segments = segments.len(), "expanded joined config string");
            if options.expand_nested {
                cfg_combos.append(&mut groups);
            } else {
                cfg_combos_list.push(groups);
            }
        } else {
            let parsed = parse_cfgstr_name_options(cfgstr)?;
            let base_cfg_list =
                lookup_base_cfg_list(&parsed.cfgname, named_defaults, options.metadata)?;
            for base_cfg in &base_cfg_list {
                let cfg_combo = customize_base_cfg(
                    &parsed.cfgname,
                    &parsed.cfgopt_strs,
                    base_cfg,
                    options.cfgtype.as_deref(),
                    &options.keys,
                    cfg_combos.len(),
                )?;
                let cfg_combo = match &parsed.subx {
                    Some(subx) => subx.select(&cfg_combo)?,
                    None => cfg_combo,
                };
                let nodes: CfgCombo = if options.is_nestedcfgtype {
                    vec![CfgNode::Group(cfg_combo)]
                } else {
                    cfg_combo.into_iter().map(CfgNode::Single).collect()
                };
                if options.expand_nested {
                    cfg_combos.extend(nodes);
                } else {
                    cfg_combos_list.push(nodes);
                }
            }
        }
        if options.expand_nested {
            cfg_combos_list.push(cfg_combos);
        }
    }
    Ok(cfg_combos_list)
}

/// Non-strict parse of a config-string list, flattened into one list.
pub fn parse_cfg_list<S: AsRef<str>>(
    cfgstr_list: &[S],
    options: &ParseOptions<'_>,
) -> CfgResult<Vec<ConfigDict>> {
    let options = options.clone().with_strict(false);
    let cfg_combos_list = parse_cfgstr_list2(cfgstr_list, &options)?;
    Ok(flatten_cfg_combos(&cfg_combos_list))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::label::{get_cfg_lbl, get_varied_cfg_lbls};
    use gc_types::{cfgdict, dict_subset, CfgError, ConfigNameError, INTERNAL_CFGKEYS};
    use proptest::prelude::*;
    use serde_json::json;

    fn strip_index(cfg: &ConfigDict) -> ConfigDict {
        let mut cfg = cfg.clone();
        cfg.remove(CFGINDEX_KEY);
        cfg
    }

    fn lenient<'a>() -> ParseOptions<'a> {
        ParseOptions::new().with_strict(false)
    }

    #[test]
    fn customize_expands_candidate_lists() {
        let cfgs = customize_base_cfg(
            "default",
            "dsize=1000,per_name=[1,2]",
            &ConfigDict::new(),
            None,
            &KeyPolicy::default(),
            0,
        )
        .unwrap();
        assert_eq!(cfgs.len(), 2);
        for (idx, cfg) in cfgs.iter().enumerate() {
            assert_eq!(cfg["dsize"], ConfigValue::Int(1000));
            assert_eq!(cfg["per_name"], ConfigValue::from(idx + 1));
            assert_eq!(cfg[CFGNAME_KEY], ConfigValue::from("default"));
            assert_eq!(cfg[CFGINDEX_KEY], ConfigValue::from(idx));
            assert_eq!(cfg[CFGTYPE_KEY], ConfigValue::None);
            assert_eq!(
                cfg[CFGSTR_KEY],
                ConfigValue::from("default:dsize=1000,per_name=[1,2]")
            );
        }
        assert_eq!(
            dict_subset(&cfgs[0], &["dsize"]),
            dict_subset(&cfgs[1], &["dsize"])
        );
    }

    #[test]
    fn customize_uses_offset_and_bare_cfgstr() {
        let base = cfgdict! {"K" => 4};
        let cfgs = customize_base_cfg("knn", "", &base, Some("query"), &KeyPolicy::default(), 5)
            .unwrap();
        assert_eq!(cfgs.len(), 1);
        assert_eq!(cfgs[0][CFGINDEX_KEY], ConfigValue::Int(5));
        assert_eq!(cfgs[0][CFGSTR_KEY], ConfigValue::from("knn"));
        assert_eq!(cfgs[0][CFGTYPE_KEY], ConfigValue::from("query"));
        assert_eq!(base, cfgdict! {"K" => 4});
    }

    #[test]
    fn strict_rejects_keys_outside_valid_set() {
        let policy = KeyPolicy::default().with_valid_keys(["a"]);
        let err = customize_base_cfg("x", "b=1", &ConfigDict::new(), None, &policy, 0).unwrap_err();
        assert_eq!(
            err,
            CfgError::Validation(ValidationError::UnknownKeys {
                keys: vec!["b".to_string()],
                schema: KeySchema::ValidKeys,
            })
        );
    }

    #[test]
    fn strict_lists_every_offending_key() {
        let base = cfgdict! {"a" => 1};
        let err = customize_base_cfg("x", "a=2,zz=3,b=[1,2]", &base, None, &KeyPolicy::default(), 0)
            .unwrap_err();
        match err {
            CfgError::Validation(ValidationError::UnknownKeys { keys, schema }) => {
                assert_eq!(keys, vec!["b".to_string(), "zz".to_string()]);
                assert_eq!(schema, KeySchema::BaseConfig);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn strict_rejects_reserved_override() {
        let base = cfgdict! {"a" => 1};
        assert!(customize_base_cfg("x", "_cfgindex=9", &base, None, &KeyPolicy::default(), 0)
            .is_err());
    }

    #[test]
    fn lenient_accepts_new_keys_and_aliases() {
        let policy = KeyPolicy::lenient().with_alias("k", "K");
        let base = cfgdict! {"a" => 1};
        let cfgs = customize_base_cfg("x", "k=3,new=y", &base, None, &policy, 0).unwrap();
        assert_eq!(cfgs[0]["K"], ConfigValue::Int(3));
        assert_eq!(cfgs[0]["new"], ConfigValue::from("y"));
        assert!(!cfgs[0].contains_key("k"));
    }

    #[test]
    fn empty_candidate_list_is_an_empty_sweep() {
        let cfgs = customize_base_cfg("x", "a=[]", &ConfigDict::new(), None, &KeyPolicy::lenient(), 0)
            .unwrap();
        assert!(cfgs.is_empty());
    }

    #[test]
    fn recustomizing_cfgstr_reproduces_configs() {
        let base = cfgdict! {"K" => 1, "p" => 0.5, "mode" => "fast"};
        let cfgs = customize_base_cfg(
            "knn",
            "K=[1,3,5],p=[0.1,0.2],mode=slow",
            &base,
            Some("t"),
            &KeyPolicy::default(),
            0,
        )
        .unwrap();
        assert_eq!(cfgs.len(), 6);
        for cfg in &cfgs {
            let cfgstr = cfg[CFGSTR_KEY].as_str().unwrap();
            let parsed = parse_cfgstr_name_options(cfgstr).unwrap();
            let again = customize_base_cfg(
                &parsed.cfgname,
                &parsed.cfgopt_strs,
                &base,
                Some("t"),
                &KeyPolicy::default(),
                0,
            )
            .unwrap();
            assert!(again.iter().any(|other| strip_index(other) == strip_index(cfg)));
        }
    }

    #[test]
    fn example_plain_varied_and_joined_tokens() {
        let cfgstr_list = ["name", "name:f=1", "name:b=[1,2]", "name1:f=1::name2:f=1,b=2"];
        let options = lenient().with_special_join_dict(cfgdict! {"joined" => true});
        let cfg_combos_list = parse_cfgstr_list2(&cfgstr_list, &options).unwrap();
        assert_eq!(cfg_combos_list.len(), 4);
        assert!(matches!(cfg_combos_list[3][0], CfgNode::Group(_)));

        let cfg_list = flatten_cfg_combos(&cfg_combos_list);
        let labels = get_varied_cfg_lbls(&cfg_list, None, CFGNAME_KEY).unwrap();
        assert_eq!(
            labels,
            vec![
                "name:",
                "name:f=1",
                "name:b=1",
                "name:b=2",
                "name1:f=1,joined=True",
                "name2:b=2,f=1,joined=True",
            ]
        );
    }

    #[test]
    fn joined_token_labels() {
        let options = ParseOptions::new().with_special_join_dict(cfgdict! {"joined" => true});
        let cfg_combos_list =
            parse_cfgstr_list2(&["name1:f=1::name2:f=1,b=2"], &options).unwrap();
        let labels: Vec<String> = flatten_cfg_combos(&cfg_combos_list)
            .iter()
            .map(|cfg| get_cfg_lbl(cfg, None, &INTERNAL_CFGKEYS, None).unwrap())
            .collect();
        assert!(labels.contains(&"name1:f=1,joined=True".to_string()));
        assert!(labels.contains(&"name2:b=2,f=1,joined=True".to_string()));
    }

    #[test]
    fn inline_named_default() {
        let cfgstr_list = ["base=:f=2,c=[1,2]", "base:f=1", "base:b=[1,2]"];
        let cfg_combos_list = parse_cfgstr_list2(&cfgstr_list, &lenient()).unwrap();
        assert_eq!(cfg_combos_list.len(), 2);
        let cfg_list = flatten_cfg_combos(&cfg_combos_list);
        let labels = get_varied_cfg_lbls(&cfg_list, None, CFGNAME_KEY).unwrap();
        assert_eq!(
            labels,
            vec![
                "base:c=1,f=1",
                "base:c=2,f=1",
                "base:b=1,c=1,f=2",
                "base:b=1,c=2,f=2",
                "base:b=2,c=1,f=2",
                "base:b=2,c=2,f=2",
            ]
        );
    }

    #[test]
    fn inline_default_requires_trailing_equals() {
        let err = parse_cfgstr_list2(&["base:f=:x"], &lenient()).unwrap_err();
        assert!(matches!(err, CfgError::Grammar(GrammarError::InlineDefault { .. })));
    }

    #[test]
    fn inline_default_ignored_with_registry() {
        let registry = NamedDefaults::new().add_dict("base", cfgdict! {"f" => 0});
        let options = ParseOptions::new().with_named_defaults(&registry);
        let cfg_list =
            parse_cfg_list(&["base=:f=2", "base"], &options).unwrap();
        assert_eq!(cfg_list.len(), 1);
        assert_eq!(cfg_list[0]["f"], ConfigValue::Int(0));
    }

    #[test]
    fn unknown_name_propagates() {
        let registry = NamedDefaults::new().add_dict("default", cfgdict! {"K" => 1});
        let options = ParseOptions::new().with_named_defaults(&registry);
        let err = parse_cfgstr_list2(&["default", "missing:K=2"], &options).unwrap_err();
        assert_eq!(
            err,
            CfgError::ConfigName(ConfigNameError {
                name: "missing".to_string(),
                available: vec!["default".to_string()],
            })
        );
    }

    #[test]
    fn multiple_bases_continue_the_index() {
        let registry = NamedDefaults::new()
            .add_static("pair", vec![cfgdict! {"K" => 1, "p" => 0}, cfgdict! {"K" => 2, "p" => 0}]);
        let options = ParseOptions::new().with_named_defaults(&registry);
        let cfg_combos_list = parse_cfgstr_list2(&["pair:p=[1,2]"], &options).unwrap();
        let indices: Vec<ConfigValue> = flatten_cfg_combos(&cfg_combos_list)
            .iter()
            .map(|cfg| cfg[CFGINDEX_KEY].clone())
            .collect();
        assert_eq!(indices, (0..4usize).map(ConfigValue::from).collect::<Vec<_>>());

        let grouped = parse_cfgstr_list2(
            &["pair:p=[1,2]"],
            &options.clone().with_expand_nested(false),
        )
        .unwrap();
        assert_eq!(grouped.len(), 2);
        assert_eq!(grouped[1][0].configs()[0][CFGINDEX_KEY], ConfigValue::Int(0));
    }

    #[test]
    fn joined_token_stays_one_entry_without_expansion() {
        let cfgstr_list = ["a:x=[1,2]::b:y=[3,4]", "c"];
        let options = lenient().with_expand_nested(false);
        let cfg_combos_list = parse_cfgstr_list2(&cfgstr_list, &options).unwrap();
        let shape: Vec<Vec<usize>> = cfg_combos_list
            .iter()
            .map(|combo| combo.iter().map(|node| node.configs().len()).collect())
            .collect();
        assert_eq!(shape, vec![vec![2, 2], vec![1]]);
        assert!(cfg_combos_list[0].iter().all(|node| matches!(node, CfgNode::Group(_))));
        assert!(matches!(cfg_combos_list[1][0], CfgNode::Single(_)));
        assert_eq!(cfg_combos_list[0][1].configs()[1]["y"], ConfigValue::Int(4));

        let nested = parse_cfgstr_list2(&cfgstr_list, &options.clone().with_nested_cfgtype(true))
            .unwrap();
        let shape: Vec<Vec<usize>> = nested
            .iter()
            .map(|combo| combo.iter().map(|node| node.configs().len()).collect())
            .collect();
        assert_eq!(shape, vec![vec![2, 2], vec![1]]);
        assert!(matches!(nested[1][0], CfgNode::Group(_)));
        assert_eq!(flatten_cfg_combos(&nested), flatten_cfg_combos(&cfg_combos_list));
    }

    #[test]
    fn strict_accepts_padded_keys() {
        let base = cfgdict! {"a" => 0};
        let parsed = parse_cfgstr_name_options("n: a = 1").unwrap();
        let cfgs = customize_base_cfg(
            &parsed.cfgname,
            &parsed.cfgopt_strs,
            &base,
            None,
            &KeyPolicy::default(),
            0,
        )
        .unwrap();
        assert_eq!(cfgs[0]["a"], ConfigValue::Int(1));
        assert_eq!(
            get_cfg_lbl(&cfgs[0], None, &INTERNAL_CFGKEYS, None).unwrap(),
            "n:a=1"
        );
    }

    #[test]
    fn nested_cfgtype_keeps_groups() {
        let options = lenient().with_nested_cfgtype(true);
        let cfg_combos_list = parse_cfgstr_list2(&["a:x=[1,2,3]", "b"], &options).unwrap();
        assert_eq!(cfg_combos_list.len(), 2);
        assert_eq!(cfg_combos_list[0].len(), 1);
        assert_eq!(cfg_combos_list[0][0].configs().len(), 3);
    }

    #[test]
    fn selector_trims_expansion() {
        let cfg_list = parse_cfg_list(&["name[1]:b=[1,2,3]", "other[0:2]:c=[7,8,9]"], &ParseOptions::new())
            .unwrap();
        assert_eq!(cfg_list.len(), 3);
        assert_eq!(cfg_list[0]["b"], ConfigValue::Int(2));
        assert_eq!(cfg_list[0][CFGINDEX_KEY], ConfigValue::Int(1));
        assert_eq!(cfg_list[2]["c"], ConfigValue::Int(8));
    }

    #[test]
    fn empty_joined_segment_is_identity() {
        let cfg_combos_list = parse_cfgstr_list2(&["name1:f=1::"], &lenient()).unwrap();
        let groups = &cfg_combos_list[0];
        assert_eq!(groups.len(), 2);
        let empty = &groups[1].configs()[0];
        assert_eq!(empty[CFGNAME_KEY], ConfigValue::from(""));
        assert!(empty.keys().all(|key| gc_types::is_reserved_key(key)));
    }

    #[test]
    fn computed_defaults_receive_metadata() {
        let registry = NamedDefaults::new().add_computed("sized", |metadata| {
            let n = metadata
                .and_then(|m| m.get("n"))
                .and_then(Value::as_i64)
                .unwrap_or(1);
            (0..n).map(|i| cfgdict! {"seed" => i}).collect()
        });
        let meta = json!({"n": 3});
        let options = ParseOptions::new()
            .with_named_defaults(&registry)
            .with_metadata(&meta)
            .with_cfgtype("exp");
        let cfg_list = parse_cfg_list(&["sized"], &options).unwrap();
        assert_eq!(cfg_list.len(), 3);
        assert!(cfg_list.iter().all(|cfg| cfg[CFGTYPE_KEY] == ConfigValue::from("exp")));
    }

    const SWEEP_KEYS: [&str; 4] = ["K", "p", "rank", "seed"];

    fn sweep_base() -> ConfigDict {
        SWEEP_KEYS
            .iter()
            .map(|key| (key.to_string(), ConfigValue::Int(0)))
            .collect()
    }

    fn option_string(keys: &[&str], candidates: &[Vec<i64>]) -> String {
        keys.iter()
            .zip(candidates)
            .map(|(key, values)| match values.as_slice() {
                [single] => format!("{key}={single}"),
                values => {
                    let items: Vec<String> = values.iter().map(i64::to_string).collect();
                    format!("{key}=[{}]", items.join(","))
                }
            })
            .collect::<Vec<_>>()
            .join(",")
    }

    proptest! {
        #[test]
        fn cfgstr_recustomizes_to_an_equal_config(
            keys in proptest::sample::subsequence(SWEEP_KEYS.to_vec(), 0..=4),
            candidates in proptest::collection::vec(proptest::collection::vec(0i64..50, 1..4), 4),
        ) {
            let base = sweep_base();
            let cfgopt_strs = option_string(&keys, &candidates);
            let cfgs = customize_base_cfg("knn", &cfgopt_strs, &base, None, &KeyPolicy::default(), 0)
                .unwrap();
            let expected: usize = candidates.iter().take(keys.len()).map(Vec::len).product();
            prop_assert_eq!(cfgs.len(), expected);
            for cfg in &cfgs {
                let parsed = parse_cfgstr_name_options(cfg[CFGSTR_KEY].as_str().unwrap()).unwrap();
                let again = customize_base_cfg(
                    &parsed.cfgname,
                    &parsed.cfgopt_strs,
                    &base,
                    None,
                    &KeyPolicy::default(),
                    0,
                )
                .unwrap();
                prop_assert!(again.iter().any(|other| strip_index(other) == strip_index(cfg)));
            }
        }

        #[test]
        fn labels_are_stable_and_reparse_to_themselves(
            keys in proptest::sample::subsequence(SWEEP_KEYS.to_vec(), 0..=4),
            candidates in proptest::collection::vec(proptest::collection::vec(0i64..50, 1..4), 4),
        ) {
            let base = sweep_base();
            let cfgopt_strs = option_string(&keys, &candidates);
            let cfgs = customize_base_cfg("knn", &cfgopt_strs, &base, None, &KeyPolicy::default(), 0)
                .unwrap();
            for cfg in &cfgs {
                let lbl = get_cfg_lbl(cfg, None, &INTERNAL_CFGKEYS, None).unwrap();
                prop_assert_eq!(&lbl, &get_cfg_lbl(cfg, None, &INTERNAL_CFGKEYS, None).unwrap());
                prop_assert!(!lbl.contains(' '));

                let parsed = parse_cfgstr_name_options(&lbl).unwrap();
                let relabeled = customize_base_cfg(
                    &parsed.cfgname,
                    &parsed.cfgopt_strs,
                    &base,
                    None,
                    &KeyPolicy::default(),
                    0,
                )
                .unwrap();
                prop_assert_eq!(relabeled.len(), 1);
                prop_assert_eq!(
                    get_cfg_lbl(&relabeled[0], None, &INTERNAL_CFGKEYS, None).unwrap(),
                    lbl
                );
            }
        }
    }

    #[test]
    fn key_policy_serde_defaults_to_strict() {
        let policy: KeyPolicy = serde_json::from_str("{}").unwrap();
        assert_eq!(policy, KeyPolicy::default());
        assert!(policy.strict);
    }
}
