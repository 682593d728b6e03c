//! Per-parameter metadata used to render labels and seed grid searches.

use gc_types::{CfgResult, ConfigDict, ConfigValue, ValidationError};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use crate::parser::IndexSelector;
use crate::search::{make_constrained_cfg_and_lbl_list, ConstraintFn, DimensionBasis};

/// When a parameter is left out of a label.
#[derive(Clone)]
pub enum HideIf {
    /// Hide when the parameter equals this value.
    Value(ConfigValue),
    /// Hide when the predicate holds for the whole config.
    Predicate(Arc<dyn Fn(&ConfigDict) -> bool + Send + Sync>),
}

impl HideIf {
    pub fn predicate<F>(predicate: F) -> Self
    where
        F: Fn(&ConfigDict) -> bool + Send + Sync + 'static,
    {
        Self::Predicate(Arc::new(predicate))
    }

    fn hides(&self, value: &ConfigValue, cfg: &ConfigDict) -> bool {
        match self {
            Self::Value(hidden) => value == hidden,
            Self::Predicate(predicate) => predicate(cfg),
        }
    }
}

impl fmt::Debug for HideIf {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Value(value) => f.debug_tuple("Value").field(value).finish(),
            Self::Predicate(_) => f.write_str("Predicate(..)"),
        }
    }
}

impl From<ConfigValue> for HideIf {
    fn from(value: ConfigValue) -> Self {
        Self::Value(value)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ItemStyle {
    Keyed,
    Flag,
}

/// Description of one parameter: default, label prefix, sweep values and
/// hide rules. The actual value lives in the config being described.
#[derive(Debug, Clone)]
pub struct ParamInfo {
    pub varname: String,
    pub default: ConfigValue,
    pub shortprefix: Option<String>,
    /// Candidate values for grid searches.
    pub varyvals: Vec<ConfigValue>,
    pub varyslice: Option<IndexSelector>,
    pub hideif_list: Vec<HideIf>,
    /// Values the parameter may take. Anything else fails to render.
    pub valid_values: Option<Vec<ConfigValue>>,
    style: ItemStyle,
}

impl ParamInfo {
    pub fn new(varname: impl Into<String>, default: impl Into<ConfigValue>) -> Self {
        Self {
            varname: varname.into(),
            default: default.into(),
            shortprefix: None,
            varyvals: Vec::new(),
            varyslice: None,
            hideif_list: Vec::new(),
            valid_values: None,
            style: ItemStyle::Keyed,
        }
    }

    /// A boolean flag rendered as `name` / `noname`. Hidden when `false`.
    ///
    /// By convention the varname ends in `_on`, which is dropped from labels.
    pub fn flag(varname: impl Into<String>) -> Self {
        Self {
            hideif_list: vec![HideIf::Value(ConfigValue::Bool(false))],
            style: ItemStyle::Flag,
            ..Self::new(varname, false)
        }
    }

    pub fn with_default(mut self, default: impl Into<ConfigValue>) -> Self {
        self.default = default.into();
        self
    }

    pub fn with_shortprefix(mut self, shortprefix: impl Into<String>) -> Self {
        self.shortprefix = Some(shortprefix.into());
        self
    }

    pub fn with_varyvals<V: Into<ConfigValue>>(mut self, varyvals: Vec<V>) -> Self {
        self.varyvals = varyvals.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_varyslice(mut self, varyslice: IndexSelector) -> Self {
        self.varyslice = Some(varyslice);
        self
    }

    pub fn with_hideif(mut self, hideif: impl Into<HideIf>) -> Self {
        self.append_hideif(hideif.into());
        self
    }

    /// Drop every hide rule, including the flag default.
    pub fn without_hideif(mut self) -> Self {
        self.hideif_list.clear();
        self
    }

    pub fn with_valid_values<V: Into<ConfigValue>>(mut self, valid_values: Vec<V>) -> Self {
        self.valid_values = Some(valid_values.into_iter().map(Into::into).collect());
        self
    }

    pub fn append_hideif(&mut self, hideif: HideIf) {
        self.hideif_list.push(hideif);
    }

    pub fn is_flag(&self) -> bool {
        self.style == ItemStyle::Flag
    }

    /// The parameter's value in `cfg`, or its default when absent.
    pub fn value_in<'a>(&'a self, cfg: &'a ConfigDict) -> &'a ConfigValue {
        cfg.get(&self.varname).unwrap_or(&self.default)
    }

    pub fn is_hidden(&self, cfg: &ConfigDict) -> bool {
        let value = self.value_in(cfg);
        self.hideif_list.iter().any(|hideif| hideif.hides(value, cfg))
    }

    /// Render the label item regardless of hide rules.
    pub fn make_itemstr(&self, cfg: &ConfigDict) -> CfgResult<String> {
        let value = self.value_in(cfg);
        if let Some(valid_values) = &self.valid_values {
            if !valid_values.contains(value) {
                return Err(ValidationError::InvalidValue {
                    varname: self.varname.clone(),
                    value: value.to_string(),
                    valid_values: valid_values.iter().map(ToString::to_string).collect(),
                }
                .into());
            }
        }
        match self.style {
            ItemStyle::Keyed => Ok(match &self.shortprefix {
                Some(prefix) => format!("{prefix}{value}"),
                None => format!("{}={value}", self.varname),
            }),
            ItemStyle::Flag => {
                let itemstr = match &self.shortprefix {
                    Some(prefix) => prefix.clone(),
                    None => self.varname.replace("_on", ""),
                };
                match value {
                    ConfigValue::Bool(true) => Ok(itemstr),
                    ConfigValue::Bool(false) => Ok(format!("no{itemstr}")),
                    other => Err(ValidationError::NotBoolean {
                        varname: self.varname.clone(),
                        value: other.to_string(),
                    }
                    .into()),
                }
            }
        }
    }

    /// Label item, or an empty string when hidden.
    pub fn get_itemstr(&self, cfg: &ConfigDict) -> CfgResult<String> {
        if self.is_hidden(cfg) {
            Ok(String::new())
        } else {
            self.make_itemstr(cfg)
        }
    }
}

/// A named group of parameters with an optional joint constraint.
#[derive(Clone, Default)]
pub struct ParamInfoList {
    pub name: String,
    pub params: Vec<ParamInfo>,
    pub constraint_func: Option<ConstraintFn>,
}

impl fmt::Debug for ParamInfoList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ParamInfoList")
            .field("name", &self.name)
            .field("params", &self.params)
            .field("constraint_func", &self.constraint_func.as_ref().map(|_| ".."))
            .finish()
    }
}

impl ParamInfoList {
    pub fn new(name: impl Into<String>, params: Vec<ParamInfo>) -> Self {
        Self {
            name: name.into(),
            params,
            constraint_func: None,
        }
    }

    pub fn with_constraint<F>(mut self, constraint_func: F) -> Self
    where
        F: Fn(&mut ConfigDict) -> bool + Send + Sync + 'static,
    {
        self.constraint_func = Some(Arc::new(constraint_func));
        self
    }

    /// Apply `hideif` to every parameter in the list.
    pub fn with_hideif(mut self, hideif: impl Into<HideIf>) -> Self {
        self.append_hideif(hideif.into());
        self
    }

    pub fn append_hideif(&mut self, hideif: HideIf) {
        for param in &mut self.params {
            param.append_hideif(hideif.clone());
        }
    }

    pub fn aslist(&self) -> &[ParamInfo] {
        &self.params
    }

    /// One entry per parameter: the value from `dict`, else the default.
    pub fn updated_cfgdict(&self, dict: &ConfigDict) -> ConfigDict {
        self.params
            .iter()
            .map(|param| (param.varname.clone(), param.value_in(dict).clone()))
            .collect()
    }

    pub fn get_varnames(&self) -> Vec<String> {
        self.params.iter().map(|param| param.varname.clone()).collect()
    }

    pub fn get_varydict(&self) -> ConfigDict {
        self.params
            .iter()
            .map(|param| {
                (
                    param.varname.clone(),
                    ConfigValue::List(param.varyvals.clone()),
                )
            })
            .collect()
    }

    /// Sweep slices of the parameters that declare one. `None` if none do.
    pub fn get_slicedict(&self) -> Option<BTreeMap<String, IndexSelector>> {
        let slice_dict: BTreeMap<String, IndexSelector> = self
            .params
            .iter()
            .filter_map(|param| {
                param
                    .varyslice
                    .clone()
                    .map(|slice| (param.varname.clone(), slice))
            })
            .collect();
        (!slice_dict.is_empty()).then_some(slice_dict)
    }

    pub fn get_grid_basis(&self) -> Vec<DimensionBasis> {
        self.params
            .iter()
            .map(|param| DimensionBasis::new(param.varname.clone(), param.varyvals.clone()))
            .collect()
    }

    /// Constrained configs and labels for this list's sweep.
    ///
    /// Parameters without a slice use `defaultslice` only when at least one
    /// parameter declares a slice.
    pub fn get_gridsearch_input(
        &self,
        defaultslice: &IndexSelector,
    ) -> CfgResult<(Vec<ConfigDict>, Vec<String>)> {
        let varied_dict = self.get_varydict();
        let slice_dict = self.get_slicedict();
        make_constrained_cfg_and_lbl_list(
            &varied_dict,
            self.constraint_func
                .as_deref()
                .map(|f| f as &dyn Fn(&mut ConfigDict) -> bool),
            slice_dict.as_ref(),
            defaultslice,
        )
    }

    /// Comma-joined label items of the visible parameters.
    pub fn get_cfg_itemstr(&self, cfg: &ConfigDict) -> CfgResult<String> {
        let mut items = Vec::with_capacity(self.params.len());
        for param in &self.params {
            let itemstr = param.get_itemstr(cfg)?;
            if !itemstr.is_empty() {
                items.push(itemstr);
            }
        }
        Ok(items.join(","))
    }
}
