//! # R0N WAF Control
//!
//! Control-plane core for a managed web application firewall: the rule
//! statement tree, its depth-bounded grammar, the transforms between the
//! configuration tree and the remote engine's wire objects, and rule
//! collections updated under optimistic locking.
//!
//! ## Flow
//!
//! A [`waf::RuleCollection`] loaded by [`config::ConfigLoader`] is checked
//! against a [`waf::Grammar`], expanded into [`waf::wire`] objects and sent
//! through a [`waf::ControlApi`] by [`waf::CollectionClient`]. Reads come back
//! through the flatten transform with rules sorted by priority.
//!
//! ## Modules
//!
//! - [`config`]: TOML configuration, validators, rule collection loading
//! - [`waf`]: statement model, grammar, expand/flatten, collection client

pub mod config;
pub mod waf;
