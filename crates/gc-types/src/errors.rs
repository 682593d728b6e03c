use thiserror::Error;

/// Main error type for gridcfg
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CfgError {
    #[error("Grammar error: {0}")]
    Grammar(#[from] GrammarError),

    #[error("Config name error: {0}")]
    ConfigName(#[from] ConfigNameError),

    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Grid search error: {0}")]
    GridSearch(#[from] GridSearchError),
}

/// Malformed config strings
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GrammarError {
    #[error("cannot isolate config name in {cfgstr:?}: unexpected trailing input {remainder:?}")]
    UnparseableName { cfgstr: String, remainder: String },

    #[error("unclosed index selector in {cfgstr:?}")]
    UnclosedSelector { cfgstr: String },

    #[error("invalid index selector [{selector}]: {message}")]
    InvalidSelector { selector: String, message: String },

    #[error("unbalanced brackets in {text:?}")]
    UnbalancedBrackets { text: String },

    #[error("malformed option {fragment:?}: {message}")]
    MalformedOption { fragment: String, message: String },

    #[error("inline named default {cfgstr:?} must look like name=:options")]
    InlineDefault { cfgstr: String },
}

/// Reference to a named default that was never registered
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown configuration name {name:?} (registered: {available:?})")]
pub struct ConfigNameError {
    pub name: String,
    pub available: Vec<String>,
}

/// Where strict-mode keys are checked against
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeySchema {
    ValidKeys,
    BaseConfig,
}

impl std::fmt::Display for KeySchema {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ValidKeys => write!(f, "valid set"),
            Self::BaseConfig => write!(f, "default options"),
        }
    }
}

/// Override or rendering checks that failed
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("keys specified not in {schema}: {keys:?}")]
    UnknownKeys { keys: Vec<String>, schema: KeySchema },

    #[error("not a boolean: {varname}={value}")]
    NotBoolean { varname: String, value: String },

    #[error("{varname}={value} is not one of {valid_values:?}")]
    InvalidValue {
        varname: String,
        value: String,
        valid_values: Vec<String>,
    },

    #[error("index {index} out of range for {len} configs")]
    IndexOutOfRange { index: usize, len: usize },
}

/// Grid-search driver errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GridSearchError {
    #[error("append_result called {attempted} times but the grid only has {num_configs} points")]
    ResultOverflow { attempted: usize, num_configs: usize },

    #[error("unknown score label: {label}")]
    UnknownScoreLabel { label: String },

    #[error("unknown grid parameter: {param}")]
    UnknownParam { param: String },

    #[error("rank {rank} out of range for {scored} scored points")]
    RankOutOfRange { rank: usize, scored: usize },

    #[error("CSV rendering failed: {message}")]
    Csv { message: String },
}

/// Result type alias for gridcfg operations
pub type CfgResult<T> = Result<T, CfgError>;

/// Macro for creating malformed-option errors
#[macro_export]
macro_rules! malformed_option {
    ($fragment:expr, $($arg:tt)*) => {
        $crate::CfgError::Grammar($crate::GrammarError::MalformedOption {
            fragment: $fragment.to_string(),
            message: format!($($arg)*),
        })
    };
}
