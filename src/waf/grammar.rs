//! Depth-bounded statement grammar.
//!
//! [`Grammar::allowed_variants`] is the single source of truth for which
//! statement variants may appear at a given position. The walk in
//! [`Grammar::validate_statement`] applies it to a whole tree and adds the
//! per-variant field constraints the remote engine would otherwise reject.

use super::composite::{
    AggregateKeyType, ManagedRuleGroupConfig, ManagedRuleGroupStatement, RateBasedStatement,
    ResponseInspection, EVALUATION_WINDOWS, MAX_CUSTOM_KEYS, MAX_RATE_LIMIT, MIN_RATE_LIMIT,
};
use super::error::{WafError, WafResult};
use super::field::{FieldToMatch, TextTransformation};
use super::statement::{Statement, VariantTag};
use crate::config::{EngineConfig, ValidationError, ValidationResult};
use std::collections::{BTreeSet, HashSet};
use std::fmt;
use tracing::warn;

/// Largest size a size constraint may compare against
pub const MAX_SIZE_CONSTRAINT: i64 = 21_474_836_480;

/// Position of a statement subtree within a rule
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GrammarContext {
    /// Root statement of a rule group rule
    RuleGroupRoot,
    /// Root statement of a web ACL rule
    WebAclRoot,
    /// Scope-down statement of a rate based or managed rule group statement
    ScopeDown,
}

impl fmt::Display for GrammarContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::RuleGroupRoot => write!(f, "rule group root"),
            Self::WebAclRoot => write!(f, "web ACL root"),
            Self::ScopeDown => write!(f, "scope-down"),
        }
    }
}

/// Statement grammar parameterized by the maximum logical nesting depths
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Grammar {
    web_acl_max_depth: usize,
    rule_group_max_depth: usize,
}

impl Default for Grammar {
    fn default() -> Self {
        Self::from_config(&EngineConfig::default())
    }
}

impl Grammar {
    /// Create a grammar with explicit depth limits
    #[must_use]
    pub fn new(web_acl_max_depth: usize, rule_group_max_depth: usize) -> Self {
        Self {
            web_acl_max_depth,
            rule_group_max_depth,
        }
    }

    /// Create a grammar from the `[engine]` configuration section
    #[must_use]
    pub fn from_config(config: &EngineConfig) -> Self {
        Self::new(config.web_acl_max_depth, config.rule_group_max_depth)
    }

    /// Remaining depth at the entry point of `context`
    #[must_use]
    pub fn max_depth(&self, context: GrammarContext) -> usize {
        match context {
            GrammarContext::WebAclRoot => self.web_acl_max_depth,
            GrammarContext::RuleGroupRoot => self.rule_group_max_depth,
            GrammarContext::ScopeDown => self.web_acl_max_depth.saturating_sub(1),
        }
    }

    /// Variants legal in `context` with `depth` logical levels remaining
    #[must_use]
    pub fn allowed_variants(&self, context: GrammarContext, depth: usize) -> BTreeSet<VariantTag> {
        let mut allowed: BTreeSet<VariantTag> = VariantTag::LEAVES.into_iter().collect();
        if depth > 0 {
            allowed.extend(VariantTag::LOGICAL);
        }
        if context == GrammarContext::WebAclRoot && depth == self.web_acl_max_depth {
            allowed.extend(VariantTag::ROOT_ONLY);
        }
        allowed
    }

    /// Check whether a single variant is legal at a position
    #[must_use]
    pub fn allows(&self, context: GrammarContext, depth: usize, tag: VariantTag) -> bool {
        self.allowed_variants(context, depth).contains(&tag)
    }

    /// Validate a statement tree rooted in `context`.
    ///
    /// `path` prefixes every reported field path.
    pub fn validate_statement(
        &self,
        statement: &Statement,
        context: GrammarContext,
        path: &str,
    ) -> ValidationResult {
        let mut result = ValidationResult::new();
        let mut walk = Walk {
            grammar: self,
            result: &mut result,
        };
        walk.statement(statement, context, self.max_depth(context), path);
        result
    }

    /// Validate a statement tree and fail on the first error
    ///
    /// # Errors
    ///
    /// Returns [`WafError::Validation`] naming the offending path.
    pub fn check(&self, statement: &Statement, context: GrammarContext) -> WafResult<()> {
        ensure_valid(self.validate_statement(statement, context, "statement"))
    }
}

/// Convert a validation result into the first error it holds
///
/// # Errors
///
/// Returns [`WafError::Validation`] for the first error-severity entry.
pub fn ensure_valid(result: ValidationResult) -> WafResult<()> {
    match result.errors_only().first() {
        None => Ok(()),
        Some(first) => {
            warn!(
                "Rejected configuration with {} error(s), first at {}",
                result.errors_only().len(),
                first.field
            );
            Err(WafError::validation(&first.field, &first.message))
        },
    }
}

struct Walk<'a> {
    grammar: &'a Grammar,
    result: &'a mut ValidationResult,
}

impl Walk<'_> {
    fn error(&mut self, path: impl Into<String>, message: impl Into<String>) {
        self.result.add_error(ValidationError::error(path, message));
    }

    fn statement(
        &mut self,
        statement: &Statement,
        context: GrammarContext,
        depth: usize,
        path: &str,
    ) {
        let tag = statement.tag();
        let here = format!("{path}.{tag}");
        if !self.grammar.allows(context, depth, tag) {
            let reason = if tag.is_logical() {
                "exceeds the maximum nesting depth".to_string()
            } else {
                format!("is not allowed in a {context} statement at this depth")
            };
            self.error(here, format!("{tag} {reason}"));
            return;
        }

        match statement {
            Statement::And(s) => self.children(&s.statements, context, depth, &here),
            Statement::Or(s) => self.children(&s.statements, context, depth, &here),
            Statement::Not(s) => {
                self.statement(&s.statement, context, depth - 1, &format!("{here}.statement"));
            },
            Statement::ByteMatch(s) => {
                if s.search_string.is_empty() {
                    self.error(format!("{here}.search_string"), "must not be empty");
                }
                self.field(&s.field_to_match, &here);
                self.transformations(&s.text_transformations, &here);
            },
            Statement::GeoMatch(s) => {
                if s.country_codes.is_empty() {
                    self.error(
                        format!("{here}.country_codes"),
                        "at least one country code is required",
                    );
                }
                for (i, code) in s.country_codes.iter().enumerate() {
                    if code.len() != 2 || !code.chars().all(|c| c.is_ascii_uppercase()) {
                        self.error(
                            format!("{here}.country_codes[{i}]"),
                            format!("'{code}' is not a two-letter country code"),
                        );
                    }
                }
            },
            Statement::IpSetReference(s) => self.arn(&s.arn, &here),
            Statement::LabelMatch(s) => {
                if s.key.is_empty() {
                    self.error(format!("{here}.key"), "must not be empty");
                }
            },
            Statement::RegexMatch(s) => {
                if s.regex_string.is_empty() {
                    self.error(format!("{here}.regex_string"), "must not be empty");
                } else if let Err(e) = regex::Regex::new(&s.regex_string) {
                    self.result.add_error(ValidationError::warning(
                        format!("{here}.regex_string"),
                        format!("expression does not parse locally: {e}"),
                    ));
                }
                self.field(&s.field_to_match, &here);
                self.transformations(&s.text_transformations, &here);
            },
            Statement::RegexPatternSetReference(s) => {
                self.arn(&s.arn, &here);
                self.field(&s.field_to_match, &here);
                self.transformations(&s.text_transformations, &here);
            },
            Statement::SizeConstraint(s) => {
                if !(0..=MAX_SIZE_CONSTRAINT).contains(&s.size) {
                    self.error(
                        format!("{here}.size"),
                        format!("{} is outside 0..={MAX_SIZE_CONSTRAINT}", s.size),
                    );
                }
                self.field(&s.field_to_match, &here);
                self.transformations(&s.text_transformations, &here);
            },
            Statement::SqliMatch(s) => {
                self.field(&s.field_to_match, &here);
                self.transformations(&s.text_transformations, &here);
            },
            Statement::XssMatch(s) => {
                self.field(&s.field_to_match, &here);
                self.transformations(&s.text_transformations, &here);
            },
            Statement::RateBased(s) => self.rate_based(s, depth, &here),
            Statement::ManagedRuleGroup(s) => self.managed(s, depth, &here),
            Statement::RuleGroupReference(s) => self.arn(&s.arn, &here),
        }
    }

    fn children(
        &mut self,
        statements: &[Statement],
        context: GrammarContext,
        depth: usize,
        path: &str,
    ) {
        for (i, child) in statements.iter().enumerate() {
            self.statement(child, context, depth - 1, &format!("{path}.statements[{i}]"));
        }
    }

    fn scope_down(&mut self, statement: Option<&Statement>, depth: usize, path: &str) {
        if let Some(statement) = statement {
            self.statement(
                statement,
                GrammarContext::ScopeDown,
                depth.saturating_sub(1),
                &format!("{path}.scope_down_statement"),
            );
        }
    }

    fn rate_based(&mut self, s: &RateBasedStatement, depth: usize, path: &str) {
        if !(MIN_RATE_LIMIT..=MAX_RATE_LIMIT).contains(&s.limit) {
            self.error(
                format!("{path}.limit"),
                format!("{} is outside {MIN_RATE_LIMIT}..={MAX_RATE_LIMIT}", s.limit),
            );
        }
        if let Some(window) = s.evaluation_window_sec {
            if !EVALUATION_WINDOWS.contains(&window) {
                self.error(
                    format!("{path}.evaluation_window_sec"),
                    format!("{window} must be one of {EVALUATION_WINDOWS:?}"),
                );
            }
        }

        let custom = s.aggregate_key_type == AggregateKeyType::CustomKeys;
        let keys_path = format!("{path}.custom_keys");
        if custom && s.custom_keys.is_empty() {
            self.error(&keys_path, "required when aggregate_key_type is CUSTOM_KEYS");
        }
        if !custom && !s.custom_keys.is_empty() {
            self.error(&keys_path, "only allowed when aggregate_key_type is CUSTOM_KEYS");
        }
        if s.custom_keys.len() > MAX_CUSTOM_KEYS {
            self.error(&keys_path, format!("at most {MAX_CUSTOM_KEYS} keys are allowed"));
        }
        for (i, key) in s.custom_keys.iter().enumerate() {
            if let Some(transformations) = key.text_transformations() {
                let key_path = format!("{keys_path}[{i}].{}", key.kind());
                self.transformations(transformations, &key_path);
            }
        }

        let forwarded = s.aggregate_key_type == AggregateKeyType::ForwardedIp;
        let config_path = format!("{path}.forwarded_ip_config");
        match (forwarded, s.forwarded_ip_config.is_some()) {
            (true, false) => {
                self.error(config_path, "required when aggregate_key_type is FORWARDED_IP");
            },
            (false, true) => {
                self.error(config_path, "only allowed when aggregate_key_type is FORWARDED_IP");
            },
            _ => {},
        }

        self.scope_down(s.scope_down_statement.as_deref(), depth, path);
    }

    fn managed(&mut self, s: &ManagedRuleGroupStatement, depth: usize, path: &str) {
        if s.name.is_empty() {
            self.error(format!("{path}.name"), "must not be empty");
        }
        if s.vendor_name.is_empty() {
            self.error(format!("{path}.vendor_name"), "must not be empty");
        }
        for (i, config) in s.managed_rule_group_configs.iter().enumerate() {
            self.managed_config(config, &format!("{path}.managed_rule_group_configs[{i}]"));
        }
        self.scope_down(s.scope_down_statement.as_deref(), depth, path);
    }

    fn managed_config(&mut self, config: &ManagedRuleGroupConfig, path: &str) {
        let here = format!("{path}.{}", config.kind());
        match config {
            ManagedRuleGroupConfig::AtpRuleSet(set) => {
                self.not_empty(&set.login_path, &format!("{here}.login_path"));
                if let Some(inspection) = &set.response_inspection {
                    self.response_inspection(inspection, &here);
                }
            },
            ManagedRuleGroupConfig::AcfpRuleSet(set) => {
                self.not_empty(&set.creation_path, &format!("{here}.creation_path"));
                let page = format!("{here}.registration_page_path");
                self.not_empty(&set.registration_page_path, &page);
                if let Some(inspection) = &set.response_inspection {
                    self.response_inspection(inspection, &here);
                }
            },
            _ => {},
        }
    }

    fn response_inspection(&mut self, inspection: &ResponseInspection, path: &str) {
        let here = format!("{path}.response_inspection.{}", inspection.kind());
        if !inspection.has_indicators() {
            self.error(&here, "at least one success or failure indicator is required");
        }
        if let ResponseInspection::StatusCode {
            success_codes,
            failure_codes,
        } = inspection
        {
            for code in success_codes.iter().chain(failure_codes) {
                if !(0..=999).contains(code) {
                    self.error(&here, format!("{code} is not a status code"));
                }
            }
        }
    }

    fn not_empty(&mut self, value: &str, path: &str) {
        if value.is_empty() {
            self.error(path, "must not be empty");
        }
    }

    fn arn(&mut self, arn: &str, path: &str) {
        if !arn.starts_with("arn:") {
            self.error(format!("{path}.arn"), format!("'{arn}' is not an ARN"));
        }
    }

    fn field(&mut self, field: &FieldToMatch, path: &str) {
        if let Some(name) = field.name() {
            if name.is_empty() {
                let name_path = format!("{path}.field_to_match.{}.name", field.kind());
                self.error(name_path, "must not be empty");
            }
        }
    }

    fn transformations(&mut self, transformations: &[TextTransformation], path: &str) {
        let path = format!("{path}.text_transformations");
        if transformations.is_empty() {
            self.error(path, "at least one text transformation is required");
            return;
        }
        let mut seen = HashSet::new();
        for t in transformations {
            if !seen.insert(t.priority) {
                self.error(&path, format!("duplicate priority {}", t.priority));
            }
        }
    }
}
