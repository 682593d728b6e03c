//! # gc-search
//!
//! Config-string grid search for gridcfg.
//!
//! Turns compact strings such as `knn:K=[1,3,5],p=0.5` into enumerated
//! parameter dicts, resolves named base configs, validates overrides, labels
//! each result by what actually varies, and drives scored sweeps over a grid
//! basis.

mod customize;
mod defaults;
mod label;
mod param;
mod parser;
mod search;

pub use customize::{
    customize_base_cfg, flatten_cfg_combos, parse_cfg_list, parse_cfgstr_list2, CfgCombo,
    CfgNode, KeyPolicy, ParseOptions,
};
pub use defaults::{lookup_base_cfg_list, DefaultsProducer, NamedDefault, NamedDefaults};
pub use label::{
    get_cfg_lbl, get_varied_cfg_lbls, make_cfglbls, partition_varied_cfg_list, LABEL_WRAP_WIDTH,
};
pub use param::{HideIf, ParamInfo, ParamInfoList};
pub use parser::{
    noexpand_parse_cfgstrs, parse_cfgopt_fragments, parse_cfgstr_name_options,
    split_cfgopt_strs, IndexSelector, ParsedCfgString,
};
pub use search::{
    constrain_cfgdict_list, get_cfgdict_lbl_list_subset, get_cfgdict_list_subset,
    grid_search_generator, make_constrained_cfg_and_lbl_list, testdata_grid_search,
    ConstraintFn, DimensionBasis, GridSearch, ScoreLabel, ScoreStats, SortedColumns,
};

pub use gc_types::{CfgError, CfgResult, ConfigDict, ConfigValue};
