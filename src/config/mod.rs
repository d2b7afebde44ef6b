//! # Configuration System
//!
//! TOML-based configuration for the control plane: engine limits, retry
//! budgets, and loading of rule collection documents.
//!
//! ## Example Configuration
//!
//! ```toml
//! [engine]
//! web_acl_max_depth = 3
//! rule_group_max_depth = 2
//!
//! [retry]
//! timeout_secs = 300
//! associated_item_timeout_secs = 60
//! initial_backoff_ms = 500
//! max_backoff_ms = 10000
//! ```

mod error;
mod loader;
mod types;
mod validation;

pub use error::{ConfigError, ConfigResult};
pub use loader::ConfigLoader;
pub use types::{ControlPlaneConfig, EngineConfig, RetryConfig};
pub use validation::{
    BasicValidator, ValidationError, ValidationResult, ValidationSeverity, Validator,
};
