//! Named-default registry and base-config lookup.

use gc_types::{CfgResult, ConfigDict, ConfigNameError};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// Producer for computed named defaults. Receives the caller's metadata.
pub type DefaultsProducer = Arc<dyn Fn(Option<&Value>) -> Vec<ConfigDict> + Send + Sync>;

/// A registered base: either a fixed list or a list computed on lookup.
#[derive(Clone)]
pub enum NamedDefault {
    Static(Vec<ConfigDict>),
    Computed(DefaultsProducer),
}

impl NamedDefault {
    fn resolve(&self, metadata: Option<&Value>) -> Vec<ConfigDict> {
        match self {
            Self::Static(list) => list.clone(),
            Self::Computed(producer) => producer(metadata),
        }
    }
}

impl fmt::Debug for NamedDefault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Static(list) => f.debug_tuple("Static").field(list).finish(),
            Self::Computed(_) => f.write_str("Computed(..)"),
        }
    }
}

impl From<Vec<ConfigDict>> for NamedDefault {
    fn from(list: Vec<ConfigDict>) -> Self {
        Self::Static(list)
    }
}

impl From<ConfigDict> for NamedDefault {
    fn from(dict: ConfigDict) -> Self {
        Self::Static(vec![dict])
    }
}

/// Base configs addressable by name.
#[derive(Debug, Clone, Default)]
pub struct NamedDefaults {
    entries: BTreeMap<String, NamedDefault>,
}

impl NamedDefaults {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_static(mut self, name: impl Into<String>, cfgs: Vec<ConfigDict>) -> Self {
        self.insert(name, NamedDefault::Static(cfgs));
        self
    }

    /// Register a single dict; it resolves to a one-element list.
    pub fn add_dict(mut self, name: impl Into<String>, cfg: ConfigDict) -> Self {
        self.insert(name, cfg);
        self
    }

    pub fn add_computed<F>(mut self, name: impl Into<String>, producer: F) -> Self
    where
        F: Fn(Option<&Value>) -> Vec<ConfigDict> + Send + Sync + 'static,
    {
        self.insert(name, NamedDefault::Computed(Arc::new(producer)));
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, entry: impl Into<NamedDefault>) {
        self.entries.insert(name.into(), entry.into());
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    pub fn names(&self) -> Vec<String> {
        self.entries.keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Resolve `cfgname` to its base configs.
///
/// Without a registry every name resolves to a single empty base.
pub fn lookup_base_cfg_list(
    cfgname: &str,
    named_defaults: Option<&NamedDefaults>,
    metadata: Option<&Value>,
) -> CfgResult<Vec<ConfigDict>> {
    let Some(registry) = named_defaults else {
        return Ok(vec![ConfigDict::new()]);
    };
    let entry = registry
        .entries
        .get(cfgname)
        .ok_or_else(|| ConfigNameError {
            name: cfgname.to_string(),
            available: registry.names(),
        })?;
    Ok(entry.resolve(metadata))
}
