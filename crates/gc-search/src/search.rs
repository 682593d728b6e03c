//! Grid enumeration, score bookkeeping and constrained config lists.

use csv::{Terminator, WriterBuilder};
use gc_types::{
    all_dict_combinations, dict_subset, iter_all_dict_combinations_ordered, unique_keep_order,
    CfgError, CfgResult, ConfigDict, ConfigValue, GridSearchError,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::label::make_cfglbls;
use crate::parser::IndexSelector;

/// Joint constraint over a config. May edit the config; `false` rejects it.
pub type ConstraintFn = Arc<dyn Fn(&mut ConfigDict) -> bool + Send + Sync>;

/// One named axis of a grid and the points along it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DimensionBasis {
    pub dimension_name: String,
    pub dimension_point_list: Vec<ConfigValue>,
}

impl DimensionBasis {
    pub fn new<V: Into<ConfigValue>>(
        dimension_name: impl Into<String>,
        dimension_point_list: Vec<V>,
    ) -> Self {
        Self {
            dimension_name: dimension_name.into(),
            dimension_point_list: dimension_point_list.into_iter().map(Into::into).collect(),
        }
    }
}

impl fmt::Display for DimensionBasis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {}",
            self.dimension_name,
            ConfigValue::List(self.dimension_point_list.clone())
        )
    }
}

/// Every point of the grid, in basis order with the last dimension varying
/// fastest.
pub fn grid_search_generator(grid_basis: &[DimensionBasis]) -> Vec<ConfigDict> {
    let dims: Vec<(String, Vec<ConfigValue>)> = grid_basis
        .iter()
        .map(|basis| (basis.dimension_name.clone(), basis.dimension_point_list.clone()))
        .collect();
    iter_all_dict_combinations_ordered(&dims)
}

// ---------------------------------------------------------------------------
// Scores
// ---------------------------------------------------------------------------

/// Which recorded score to sort or summarize by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoreLabel {
    /// `tp_score - tn_score`.
    #[default]
    ScoreDiff,
    TpScore,
    TnScore,
}

impl ScoreLabel {
    pub const ALL: [ScoreLabel; 3] = [Self::ScoreDiff, Self::TpScore, Self::TnScore];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ScoreDiff => "score_diff",
            Self::TpScore => "tp_score",
            Self::TnScore => "tn_score",
        }
    }
}

impl fmt::Display for ScoreLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ScoreLabel {
    type Err = CfgError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|label| label.as_str() == s)
            .ok_or_else(|| {
                GridSearchError::UnknownScoreLabel {
                    label: s.to_string(),
                }
                .into()
            })
    }
}

/// Summary of a group of scores. `std` is the population deviation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreStats {
    pub count: usize,
    pub mean: f64,
    pub std: f64,
    pub min: f64,
    pub max: f64,
    /// How many scores equal `min`.
    pub n_min: usize,
    /// How many scores equal `max`.
    pub n_max: usize,
}

impl ScoreStats {
    /// `None` for an empty slice.
    pub fn from_scores(scores: &[f64]) -> Option<Self> {
        if scores.is_empty() {
            return None;
        }
        let count = scores.len();
        let mean = scores.iter().sum::<f64>() / count as f64;
        let variance = scores.iter().map(|s| (s - mean).powi(2)).sum::<f64>() / count as f64;
        let min = scores.iter().copied().fold(f64::INFINITY, f64::min);
        let max = scores.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        Some(Self {
            count,
            mean,
            std: variance.sqrt(),
            min,
            max,
            n_min: scores.iter().filter(|&&s| s == min).count(),
            n_max: scores.iter().filter(|&&s| s == max).count(),
        })
    }
}

impl fmt::Display for ScoreStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{{mean: {:.3}, std: {:.3}, max: {:.3}, min: {:.3}, count: {}}}",
            self.mean, self.std, self.max, self.min, self.count
        )
    }
}

/// Parameter and score columns reordered best-first.
#[derive(Debug, Clone, PartialEq)]
pub struct SortedColumns {
    pub score_lbls: Vec<ScoreLabel>,
    pub param_lbls: Vec<String>,
    pub score_columns: Vec<Vec<f64>>,
    pub param_columns: Vec<Vec<ConfigValue>>,
}

impl SortedColumns {
    pub fn num_rows(&self) -> usize {
        self.score_columns.first().map_or(0, Vec::len)
    }
}

// ---- Grid search ----

/// Exhaustive sweep over a grid basis with one recorded result per point.
///
/// Results must be appended in iteration order: the i-th result belongs to
/// the i-th config.
#[derive(Debug, Clone, Serialize)]
pub struct GridSearch {
    pub label: Option<String>,
    pub grid_basis: Vec<DimensionBasis>,
    cfgdict_list: Vec<ConfigDict>,
    tp_score_list: Vec<f64>,
    tn_score_list: Vec<f64>,
    score_diff_list: Vec<f64>,
}

impl GridSearch {
    pub fn new(grid_basis: Vec<DimensionBasis>, label: Option<&str>) -> Self {
        let cfgdict_list = grid_search_generator(&grid_basis);
        debug!(
            label = label.unwrap_or_default(),
            num_configs = cfgdict_list.len(),
            "grid search materialized"
        );
        Self {
            label: label.map(str::to_string),
            grid_basis,
            cfgdict_list,
            tp_score_list: Vec::new(),
            tn_score_list: Vec::new(),
            score_diff_list: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.cfgdict_list.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cfgdict_list.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ConfigDict> {
        self.cfgdict_list.iter()
    }

    pub fn cfgdict_list(&self) -> &[ConfigDict] {
        &self.cfgdict_list
    }

    pub fn num_results(&self) -> usize {
        self.score_diff_list.len()
    }

    /// Record the scores for the next config in iteration order.
    pub fn append_result(&mut self, tp_score: f64, tn_score: f64) -> CfgResult<()> {
        if self.num_results() >= self.len() {
            return Err(GridSearchError::ResultOverflow {
                attempted: self.num_results() + 1,
                num_configs: self.len(),
            }
            .into());
        }
        self.score_diff_list.push(tp_score - tn_score);
        self.tp_score_list.push(tp_score);
        self.tn_score_list.push(tn_score);
        Ok(())
    }

    /// Score every config that has no result yet, in order.
    pub fn evaluate<F>(&mut self, mut scorer: F) -> CfgResult<()>
    where
        F: FnMut(&ConfigDict) -> (f64, f64),
    {
        for idx in self.num_results()..self.len() {
            let (tp_score, tn_score) = scorer(&self.cfgdict_list[idx]);
            self.append_result(tp_score, tn_score)?;
        }
        Ok(())
    }

    pub fn score_list(&self, score_lbl: ScoreLabel) -> &[f64] {
        match score_lbl {
            ScoreLabel::ScoreDiff => &self.score_diff_list,
            ScoreLabel::TpScore => &self.tp_score_list,
            ScoreLabel::TnScore => &self.tn_score_list,
        }
    }

    /// Result columns in `score_diff`, `tp_score`, `tn_score` order.
    pub fn get_score_list_and_lbls(&self) -> (Vec<&[f64]>, Vec<ScoreLabel>) {
        let lbls = ScoreLabel::ALL.to_vec();
        let scores = lbls.iter().map(|lbl| self.score_list(*lbl)).collect();
        (scores, lbls)
    }

    /// Input columns, one per dimension in basis order.
    pub fn get_param_list_and_lbls(&self) -> (Vec<String>, Vec<Vec<ConfigValue>>) {
        let names: Vec<String> = self
            .grid_basis
            .iter()
            .map(|basis| basis.dimension_name.clone())
            .collect();
        let columns = names
            .iter()
            .map(|name| {
                self.cfgdict_list
                    .iter()
                    .map(|cfg| cfg.get(name).cloned().unwrap_or_default())
                    .collect()
            })
            .collect();
        (names, columns)
    }

    pub fn get_param_lbls(&self, exclude_unvaried_dimension: bool) -> Vec<String> {
        self.grid_basis
            .iter()
            .filter(|basis| !exclude_unvaried_dimension || basis.dimension_point_list.len() > 1)
            .map(|basis| basis.dimension_name.clone())
            .collect()
    }

    /// Scored rows sorted by `score_lbl`, best first. Ties keep the later row
    /// first.
    pub fn get_sorted_columns_and_labels(&self, score_lbl: ScoreLabel) -> SortedColumns {
        let sort_vals = self.score_list(score_lbl);
        let mut order: Vec<usize> = (0..sort_vals.len()).collect();
        order.sort_by(|&a, &b| sort_vals[a].total_cmp(&sort_vals[b]));
        order.reverse();

        let (score_lists, score_lbls) = self.get_score_list_and_lbls();
        let (param_lbls, param_lists) = self.get_param_list_and_lbls();
        SortedColumns {
            score_lbls,
            param_lbls,
            score_columns: score_lists
                .iter()
                .map(|col| order.iter().map(|&idx| col[idx]).collect())
                .collect(),
            param_columns: param_lists
                .iter()
                .map(|col| order.iter().map(|&idx| col[idx].clone()).collect())
                .collect(),
        }
    }

    /// Parameters of the config ranked `rank` (0 = best) by `score_lbl`.
    pub fn get_rank_cfgdict(&self, rank: usize, score_lbl: ScoreLabel) -> CfgResult<ConfigDict> {
        let sorted = self.get_sorted_columns_and_labels(score_lbl);
        if rank >= sorted.num_rows() {
            return Err(GridSearchError::RankOutOfRange {
                rank,
                scored: sorted.num_rows(),
            }
            .into());
        }
        Ok(sorted
            .param_lbls
            .into_iter()
            .zip(sorted.param_columns)
            .map(|(name, col)| (name, col[rank].clone()))
            .collect())
    }

    /// Score statistics grouped by the value of `param_lbl`, in first-seen
    /// order.
    pub fn get_dimension_stats(
        &self,
        param_lbl: &str,
        score_lbl: ScoreLabel,
    ) -> CfgResult<Vec<(ConfigValue, ScoreStats)>> {
        let (param_lbls, param_lists) = self.get_param_list_and_lbls();
        let pos = param_lbls
            .iter()
            .position(|name| name == param_lbl)
            .ok_or_else(|| GridSearchError::UnknownParam {
                param: param_lbl.to_string(),
            })?;

        let mut groups: Vec<(ConfigValue, Vec<f64>)> = Vec::new();
        for (value, score) in param_lists[pos].iter().zip(self.score_list(score_lbl)) {
            match groups.iter_mut().find(|(seen, _)| seen == value) {
                Some((_, scores)) => scores.push(*score),
                None => groups.push((value.clone(), vec![*score])),
            }
        }
        Ok(groups
            .into_iter()
            .filter_map(|(value, scores)| ScoreStats::from_scores(&scores).map(|s| (value, s)))
            .collect())
    }

    pub fn get_dimension_stats_str(
        &self,
        param_lbl: &str,
        score_lbl: ScoreLabel,
    ) -> CfgResult<String> {
        let stats = self.get_dimension_stats(param_lbl, score_lbl)?;
        let mut out = format!("stats({param_lbl}) = {{\n");
        for (value, stat) in &stats {
            out.push_str(&format!("    {value}: {stat},\n"));
        }
        out.push('}');
        Ok(out)
    }

    /// Results as CSV text, best first, with `# ` comment lines describing the
    /// search. `max_lines` limits the number of data rows.
    pub fn get_csv_results(
        &self,
        max_lines: Option<usize>,
        score_lbl: ScoreLabel,
    ) -> CfgResult<String> {
        let sorted = self.get_sorted_columns_and_labels(score_lbl);
        let num_rows = max_lines.map_or(sorted.num_rows(), |max| max.min(sorted.num_rows()));

        let basis_str: Vec<String> = self.grid_basis.iter().map(ToString::to_string).collect();
        let mut text = String::new();
        text.push_str("# title = Grid Search Results CSV\n");
        text.push_str(&format!(
            "# label = {}\n",
            self.label.as_deref().unwrap_or("None")
        ));
        text.push_str(&format!("# grid_basis = [{}]\n", basis_str.join(", ")));
        text.push_str(&format!("# num_rows={num_rows}\n"));

        let mut writer = WriterBuilder::new()
            .terminator(Terminator::Any(b'\n'))
            .from_writer(Vec::new());
        let header: Vec<String> = sorted
            .score_lbls
            .iter()
            .map(ToString::to_string)
            .chain(sorted.param_lbls.iter().cloned())
            .collect();
        writer.write_record(&header).map_err(csv_error)?;
        for row in 0..num_rows {
            let record: Vec<String> = sorted
                .score_columns
                .iter()
                .map(|col| format!("{:.3}", col[row]))
                .chain(sorted.param_columns.iter().map(|col| match &col[row] {
                    ConfigValue::Float(v) => format!("{v:.3}"),
                    other => other.to_string(),
                }))
                .collect();
            writer.write_record(&record).map_err(csv_error)?;
        }
        let bytes = writer.into_inner().map_err(csv_error)?;
        text.push_str(&String::from_utf8(bytes).map_err(csv_error)?);
        Ok(text)
    }
}

fn csv_error(err: impl fmt::Display) -> CfgError {
    GridSearchError::Csv {
        message: err.to_string(),
    }
    .into()
}

impl<'a> IntoIterator for &'a GridSearch {
    type Item = &'a ConfigDict;
    type IntoIter = std::slice::Iter<'a, ConfigDict>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Three-dimensional demo grid, fully scored.
pub fn testdata_grid_search() -> CfgResult<GridSearch> {
    let grid_basis = vec![
        DimensionBasis::new("p", vec![0.5, 0.8, 0.9, 1.0]),
        DimensionBasis::new("K", vec![2, 3, 4, 5]),
        DimensionBasis::new("dcvs_clip_max", vec![0.1, 0.2, 0.5, 1.0]),
    ];
    let mut gridsearch = GridSearch::new(grid_basis, Some("testdata_gridsearch"));
    gridsearch.evaluate(|cfgdict| {
        let num = |key: &str| cfgdict.get(key).and_then(ConfigValue::as_f64).unwrap_or(0.0);
        let tp_score = num("p") + num("K").sqrt();
        let tn_score = num("p") * num("K") / num("dcvs_clip_max");
        (tp_score, tn_score)
    })?;
    Ok(gridsearch)
}

// ---------------------------------------------------------------------------
// Constrained config lists
// ---------------------------------------------------------------------------

/// Apply `constraint_func` to a copy of each config, keeping accepted,
/// non-empty, not yet seen results.
pub fn constrain_cfgdict_list(
    cfgdict_list: Vec<ConfigDict>,
    constraint_func: &dyn Fn(&mut ConfigDict) -> bool,
) -> Vec<ConfigDict> {
    let mut constrained: Vec<ConfigDict> = Vec::with_capacity(cfgdict_list.len());
    for mut cfg in cfgdict_list {
        if constraint_func(&mut cfg) && !cfg.is_empty() && !constrained.contains(&cfg) {
            constrained.push(cfg);
        }
    }
    constrained
}

/// Expand `varied_dict` into configs and grid labels.
///
/// With a `slice_dict`, each candidate list is first cut by its slice, or by
/// `defaultslice` when the key has none. Labels are computed against the
/// unsliced `varied_dict`.
pub fn make_constrained_cfg_and_lbl_list(
    varied_dict: &ConfigDict,
    constraint_func: Option<&dyn Fn(&mut ConfigDict) -> bool>,
    slice_dict: Option<&BTreeMap<String, IndexSelector>>,
    defaultslice: &IndexSelector,
) -> CfgResult<(Vec<ConfigDict>, Vec<String>)> {
    let sliced;
    let varied_dict_ = match slice_dict {
        None => varied_dict,
        Some(slice_dict) => {
            let mut restricted = ConfigDict::new();
            for (key, value) in varied_dict {
                let value = match value {
                    ConfigValue::List(candidates) => {
                        let selector = slice_dict.get(key).unwrap_or(defaultslice);
                        ConfigValue::List(selector.select(candidates)?)
                    }
                    other => other.clone(),
                };
                restricted.insert(key.clone(), value);
            }
            sliced = restricted;
            &sliced
        }
    };

    let cfgdict_list_ = all_dict_combinations(varied_dict_);
    let num_expanded = cfgdict_list_.len();
    let cfgdict_list = match constraint_func {
        Some(constraint_func) => constrain_cfgdict_list(cfgdict_list_, constraint_func),
        None => cfgdict_list_,
    };
    if cfgdict_list.is_empty() && num_expanded > 0 {
        warn!(num_expanded, "constraint rejected every config");
    }
    debug!(
        num_expanded,
        num_kept = cfgdict_list.len(),
        "built constrained config list"
    );
    let cfglbl_list = make_cfglbls(&cfgdict_list, varied_dict);
    Ok((cfgdict_list, cfglbl_list))
}

/// Restrict every config to `keys` and drop repeated rows, keeping the first.
pub fn get_cfgdict_list_subset<S: AsRef<str>>(
    cfgdict_list: &[ConfigDict],
    keys: &[S],
) -> Vec<ConfigDict> {
    unique_keep_order(
        cfgdict_list
            .iter()
            .map(|cfgdict| dict_subset(cfgdict, keys))
            .collect(),
    )
}

/// [`get_cfgdict_list_subset`] over the keys of `varied_dict`, with labels.
pub fn get_cfgdict_lbl_list_subset(
    cfgdict_list: &[ConfigDict],
    varied_dict: &ConfigDict,
) -> (Vec<ConfigDict>, Vec<String>) {
    let keys: Vec<&str> = varied_dict.keys().map(String::as_str).collect();
    let cfgdict_sublist = get_cfgdict_list_subset(cfgdict_list, &keys);
    let cfglbl_sublist = make_cfglbls(&cfgdict_sublist, varied_dict);
    (cfgdict_sublist, cfglbl_sublist)
}
