//! # gc-types
//!
//! Shared data model for gridcfg: config values and dicts, the reserved
//! bookkeeping keys, dict combination utilities, string helpers and the error
//! taxonomy used across the workspace.

pub mod value;
pub mod dict;
pub mod text;
pub mod errors;

pub use value::*;
pub use dict::*;
pub use text::*;
pub use errors::*;
