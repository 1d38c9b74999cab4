//! Configuration for arenas, dispatch and parallel wrapping
//!
//! Every section has defaults, so a partial JSON document (or none) is enough:
//!
//! ```
//! use vexir::config::{IrConfig, UnknownTagPolicy};
//!
//! let config = IrConfig::from_json_str(r#"{ "unknown_tags": "reject" }"#).unwrap();
//! assert_eq!(config.unknown_tags, UnknownTagPolicy::Reject);
//! assert_eq!(config.budget.max_statements, 65_536);
//! ```

use serde::{Deserialize, Serialize};

use crate::arena::ArenaBudget;
use crate::error::{Error, Result};
pub use crate::parallel::ParallelConfig;

/// What the factory does with a discriminant it has no variant for
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnknownTagPolicy {
    /// Return `Stmt::Unknown` with a warning diagnostic
    #[default]
    Degrade,
    /// Fail with `UnsupportedVariant`
    Reject,
}

/// Top-level configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IrConfig {
    /// Arena allocation limits
    pub budget: ArenaBudget,
    /// Unknown-tag handling
    pub unknown_tags: UnknownTagPolicy,
    /// Parallel wrapping
    pub parallel: ParallelConfig,
}

impl IrConfig {
    /// Parses a JSON document; absent sections keep their defaults
    pub fn from_json_str(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| Error::invalid("config", e.to_string()))
    }
}
