//! Configuration tree to wire representation.
//!
//! The structural mapping is total over the configuration types, so the
//! per-node functions cannot fail. [`Expander`] runs the grammar over the
//! whole input first and only then maps it, so nothing grammar-illegal ever
//! reaches the wire.

use super::action::{
    CustomHttpHeader, CustomRequestHandling, CustomResponse, DefaultAction, ImmunityConfig,
    OverrideAction, RuleAction,
};
use super::composite::{
    AcfpRuleSet, AtpRuleSet, ManagedRuleGroupConfig, ManagedRuleGroupStatement, NamedKey,
    RateBasedStatement, RateLimitKey, ResponseInspection, RuleActionOverride,
    RuleGroupReferenceStatement, TransformedKey,
};
use super::error::WafResult;
use super::field::{FieldToMatch, JsonMatchPattern, MatchPattern, TextTransformation};
use super::grammar::{Grammar, GrammarContext};
use super::rule::{
    AssociationConfig, CollectionKind, Disposition, Rule, RuleCollection, VisibilityConfig,
};
use super::statement::{ForwardedIpConfig, Statement};
use super::wire::*;
use tracing::debug;

/// Grammar-checked expansion
#[derive(Debug, Clone, Copy, Default)]
pub struct Expander {
    grammar: Grammar,
}

impl Expander {
    /// Create an expander enforcing `grammar`
    #[must_use]
    pub fn new(grammar: Grammar) -> Self {
        Self { grammar }
    }

    /// Grammar in use
    #[must_use]
    pub fn grammar(&self) -> &Grammar {
        &self.grammar
    }

    /// Expand a statement tree rooted in `context`
    ///
    /// # Errors
    ///
    /// Returns a validation error if the tree violates the grammar.
    pub fn expand(
        &self,
        statement: &Statement,
        context: GrammarContext,
    ) -> WafResult<WireStatement> {
        self.grammar.check(statement, context)?;
        Ok(expand_statement(statement))
    }

    /// Expand one rule whose statement is rooted in `context`
    ///
    /// # Errors
    ///
    /// Returns a validation error if the rule's statement violates the grammar.
    pub fn expand_rule(&self, rule: &Rule, context: GrammarContext) -> WafResult<WireRule> {
        self.grammar.check(&rule.statement, context)?;
        Ok(expand_rule(rule))
    }

    /// Expand a whole collection, rule list included
    ///
    /// # Errors
    ///
    /// Returns a validation error if any rule or collection-level constraint
    /// is violated.
    pub fn expand_collection(&self, collection: &RuleCollection) -> WafResult<WireCollection> {
        collection.check(&self.grammar)?;
        debug!(
            "Expanding {} '{}' with {} rule(s)",
            collection.kind.as_str(),
            collection.name,
            collection.rules.len()
        );
        Ok(expand_collection(collection))
    }
}

/// Expand a statement without consulting the grammar
pub fn expand_statement(statement: &Statement) -> WireStatement {
    let mut wire = WireStatement::default();
    match statement {
        Statement::And(s) => {
            wire.and_statement = Some(WireStatementList {
                statements: s.statements.iter().map(expand_statement).collect(),
            });
        },
        Statement::Or(s) => {
            wire.or_statement = Some(WireStatementList {
                statements: s.statements.iter().map(expand_statement).collect(),
            });
        },
        Statement::Not(s) => {
            wire.not_statement = Some(WireNotStatement {
                statement: Box::new(expand_statement(&s.statement)),
            });
        },
        Statement::ByteMatch(s) => {
            wire.byte_match_statement = Some(WireByteMatchStatement {
                field_to_match: expand_field(&s.field_to_match),
                positional_constraint: s.positional_constraint,
                search_string: s.search_string.as_bytes().to_vec(),
                text_transformations: expand_transformations(&s.text_transformations),
            });
        },
        Statement::GeoMatch(s) => {
            wire.geo_match_statement = Some(WireGeoMatchStatement {
                country_codes: s.country_codes.clone(),
                forwarded_ip_config: s.forwarded_ip_config.as_ref().map(expand_forwarded_ip),
            });
        },
        Statement::IpSetReference(s) => {
            wire.ip_set_reference_statement = Some(WireIpSetReferenceStatement {
                arn: s.arn.clone(),
                ip_set_forwarded_ip_config: s.ip_set_forwarded_ip_config.as_ref().map(|c| {
                    WireIpSetForwardedIpConfig {
                        header_name: c.header_name.clone(),
                        fallback_behavior: c.fallback_behavior,
                        position: c.position,
                    }
                }),
            });
        },
        Statement::LabelMatch(s) => {
            wire.label_match_statement = Some(WireLabelMatchStatement {
                key: s.key.clone(),
                scope: s.scope,
            });
        },
        Statement::RegexMatch(s) => {
            wire.regex_match_statement = Some(WireRegexMatchStatement {
                regex_string: s.regex_string.clone(),
                field_to_match: expand_field(&s.field_to_match),
                text_transformations: expand_transformations(&s.text_transformations),
            });
        },
        Statement::RegexPatternSetReference(s) => {
            wire.regex_pattern_set_reference_statement =
                Some(WireRegexPatternSetReferenceStatement {
                    arn: s.arn.clone(),
                    field_to_match: expand_field(&s.field_to_match),
                    text_transformations: expand_transformations(&s.text_transformations),
                });
        },
        Statement::SizeConstraint(s) => {
            wire.size_constraint_statement = Some(WireSizeConstraintStatement {
                comparison_operator: s.comparison_operator,
                size: s.size,
                field_to_match: expand_field(&s.field_to_match),
                text_transformations: expand_transformations(&s.text_transformations),
            });
        },
        Statement::SqliMatch(s) => {
            wire.sqli_match_statement = Some(WireSqliMatchStatement {
                field_to_match: expand_field(&s.field_to_match),
                text_transformations: expand_transformations(&s.text_transformations),
                sensitivity_level: s.sensitivity_level,
            });
        },
        Statement::XssMatch(s) => {
            wire.xss_match_statement = Some(WireXssMatchStatement {
                field_to_match: expand_field(&s.field_to_match),
                text_transformations: expand_transformations(&s.text_transformations),
            });
        },
        Statement::RateBased(s) => {
            wire.rate_based_statement = Some(Box::new(expand_rate_based(s)));
        },
        Statement::ManagedRuleGroup(s) => {
            wire.managed_rule_group_statement = Some(Box::new(expand_managed(s)));
        },
        Statement::RuleGroupReference(s) => {
            wire.rule_group_reference_statement = Some(expand_rule_group_reference(s));
        },
    }
    wire
}

fn expand_scope_down(statement: Option<&Statement>) -> Option<Box<WireStatement>> {
    statement.map(|s| Box::new(expand_statement(s)))
}

fn expand_rate_based(s: &RateBasedStatement) -> WireRateBasedStatement {
    WireRateBasedStatement {
        limit: s.limit,
        aggregate_key_type: s.aggregate_key_type,
        evaluation_window_sec: s.evaluation_window_sec,
        forwarded_ip_config: s.forwarded_ip_config.as_ref().map(expand_forwarded_ip),
        custom_keys: s.custom_keys.iter().map(expand_rate_limit_key).collect(),
        scope_down_statement: expand_scope_down(s.scope_down_statement.as_deref()),
    }
}

fn expand_rate_limit_key(key: &RateLimitKey) -> WireRateLimitKey {
    let mut wire = WireRateLimitKey::default();
    let named = |k: &NamedKey| WireNamedKey {
        name: k.name.clone(),
        text_transformations: expand_transformations(&k.text_transformations),
    };
    let transformed = |k: &TransformedKey| WireTransformedKey {
        text_transformations: expand_transformations(&k.text_transformations),
    };
    match key {
        RateLimitKey::Cookie(k) => wire.cookie = Some(named(k)),
        RateLimitKey::ForwardedIp => wire.forwarded_ip = Some(Empty {}),
        RateLimitKey::HttpMethod => wire.http_method = Some(Empty {}),
        RateLimitKey::Header(k) => wire.header = Some(named(k)),
        RateLimitKey::Ip => wire.ip = Some(Empty {}),
        RateLimitKey::Ja3Fingerprint { fallback_behavior } => {
            wire.ja3_fingerprint = Some(WireFingerprint {
                fallback_behavior: *fallback_behavior,
            });
        },
        RateLimitKey::Ja4Fingerprint { fallback_behavior } => {
            wire.ja4_fingerprint = Some(WireFingerprint {
                fallback_behavior: *fallback_behavior,
            });
        },
        RateLimitKey::LabelNamespace { namespace } => {
            wire.label_namespace = Some(WireLabelNamespace {
                namespace: namespace.clone(),
            });
        },
        RateLimitKey::QueryArgument(k) => wire.query_argument = Some(named(k)),
        RateLimitKey::QueryString(k) => wire.query_string = Some(transformed(k)),
        RateLimitKey::UriPath(k) => wire.uri_path = Some(transformed(k)),
    }
    wire
}

fn expand_managed(s: &ManagedRuleGroupStatement) -> WireManagedRuleGroupStatement {
    WireManagedRuleGroupStatement {
        name: s.name.clone(),
        vendor_name: s.vendor_name.clone(),
        version: s.version.clone(),
        excluded_rules: expand_names(&s.excluded_rules),
        rule_action_overrides: expand_overrides(&s.rule_action_overrides),
        managed_rule_group_configs: s
            .managed_rule_group_configs
            .iter()
            .map(expand_managed_config)
            .collect(),
        scope_down_statement: expand_scope_down(s.scope_down_statement.as_deref()),
    }
}

fn expand_managed_config(config: &ManagedRuleGroupConfig) -> WireManagedRuleGroupConfig {
    let mut wire = WireManagedRuleGroupConfig::default();
    match config {
        ManagedRuleGroupConfig::LoginPath(path) => wire.login_path = Some(path.clone()),
        ManagedRuleGroupConfig::PayloadType(kind) => wire.payload_type = Some(*kind),
        ManagedRuleGroupConfig::UsernameField { identifier } => {
            wire.username_field = Some(WireFieldIdentifier {
                identifier: identifier.clone(),
            });
        },
        ManagedRuleGroupConfig::PasswordField { identifier } => {
            wire.password_field = Some(WireFieldIdentifier {
                identifier: identifier.clone(),
            });
        },
        ManagedRuleGroupConfig::BotControlRuleSet {
            inspection_level,
            enable_machine_learning,
        } => {
            wire.bot_control_rule_set = Some(WireBotControlRuleSet {
                inspection_level: *inspection_level,
                enable_machine_learning: *enable_machine_learning,
            });
        },
        ManagedRuleGroupConfig::AtpRuleSet(set) => wire.atp_rule_set = Some(expand_atp(set)),
        ManagedRuleGroupConfig::AcfpRuleSet(set) => wire.acfp_rule_set = Some(expand_acfp(set)),
    }
    wire
}

fn identifier(identifier: &str) -> WireFieldIdentifier {
    WireFieldIdentifier {
        identifier: identifier.to_string(),
    }
}

fn expand_atp(set: &AtpRuleSet) -> WireAtpRuleSet {
    WireAtpRuleSet {
        login_path: set.login_path.clone(),
        request_inspection: set.request_inspection.as_ref().map(|r| WireRequestInspection {
            payload_type: r.payload_type,
            username_field: identifier(&r.username_field),
            password_field: identifier(&r.password_field),
        }),
        response_inspection: set.response_inspection.as_ref().map(expand_response_inspection),
        enable_regex_in_path: set.enable_regex_in_path,
    }
}

fn expand_acfp(set: &AcfpRuleSet) -> WireAcfpRuleSet {
    WireAcfpRuleSet {
        creation_path: set.creation_path.clone(),
        registration_page_path: set.registration_page_path.clone(),
        request_inspection: set.request_inspection.as_ref().map(|r| {
            WireRequestInspectionAcfp {
                payload_type: r.payload_type,
                username_field: r.username_field.as_deref().map(identifier),
                password_field: r.password_field.as_deref().map(identifier),
                email_field: r.email_field.as_deref().map(identifier),
                phone_number_fields: r.phone_number_fields.iter().map(|f| identifier(f)).collect(),
                address_fields: r.address_fields.iter().map(|f| identifier(f)).collect(),
            }
        }),
        response_inspection: set.response_inspection.as_ref().map(expand_response_inspection),
        enable_regex_in_path: set.enable_regex_in_path,
    }
}

fn expand_response_inspection(inspection: &ResponseInspection) -> WireResponseInspection {
    let mut wire = WireResponseInspection::default();
    match inspection {
        ResponseInspection::BodyContains {
            success_strings,
            failure_strings,
        } => {
            wire.body_contains = Some(WireBodyContains {
                success_strings: success_strings.clone(),
                failure_strings: failure_strings.clone(),
            });
        },
        ResponseInspection::Header {
            name,
            success_values,
            failure_values,
        } => {
            wire.header = Some(WireResponseHeader {
                name: name.clone(),
                success_values: success_values.clone(),
                failure_values: failure_values.clone(),
            });
        },
        ResponseInspection::Json {
            identifier,
            success_values,
            failure_values,
        } => {
            wire.json = Some(WireResponseJson {
                identifier: identifier.clone(),
                success_values: success_values.clone(),
                failure_values: failure_values.clone(),
            });
        },
        ResponseInspection::StatusCode {
            success_codes,
            failure_codes,
        } => {
            wire.status_code = Some(WireStatusCode {
                success_codes: success_codes.clone(),
                failure_codes: failure_codes.clone(),
            });
        },
    }
    wire
}

fn expand_rule_group_reference(s: &RuleGroupReferenceStatement) -> WireRuleGroupReferenceStatement {
    WireRuleGroupReferenceStatement {
        arn: s.arn.clone(),
        excluded_rules: expand_names(&s.excluded_rules),
        rule_action_overrides: expand_overrides(&s.rule_action_overrides),
    }
}

fn expand_overrides(overrides: &[RuleActionOverride]) -> Vec<WireRuleActionOverride> {
    overrides
        .iter()
        .map(|o| WireRuleActionOverride {
            name: o.name.clone(),
            action_to_use: expand_rule_action(&o.action_to_use),
        })
        .collect()
}

fn expand_names<'a>(names: impl IntoIterator<Item = &'a String>) -> Vec<WireNamed> {
    names
        .into_iter()
        .map(|name| WireNamed { name: name.clone() })
        .collect()
}

fn expand_forwarded_ip(config: &ForwardedIpConfig) -> WireForwardedIpConfig {
    WireForwardedIpConfig {
        header_name: config.header_name.clone(),
        fallback_behavior: config.fallback_behavior,
    }
}

/// Expand a transformation chain, keeping caller order
pub fn expand_transformations(
    transformations: &[TextTransformation],
) -> Vec<WireTextTransformation> {
    transformations
        .iter()
        .map(|t| WireTextTransformation {
            priority: t.priority,
            kind: t.kind,
        })
        .collect()
}

/// Expand an inspected request component
pub fn expand_field(field: &FieldToMatch) -> WireFieldToMatch {
    let mut wire = WireFieldToMatch::default();
    match field {
        FieldToMatch::AllQueryArguments => wire.all_query_arguments = Some(Empty {}),
        FieldToMatch::Body { oversize_handling } => {
            wire.body = Some(WireBody {
                oversize_handling: *oversize_handling,
            });
        },
        FieldToMatch::Cookies {
            match_pattern,
            match_scope,
            oversize_handling,
        } => {
            let (all, included, excluded) = split_pattern(match_pattern);
            wire.cookies = Some(WireCookies {
                match_pattern: WireCookieMatchPattern {
                    all,
                    included_cookies: included,
                    excluded_cookies: excluded,
                },
                match_scope: *match_scope,
                oversize_handling: *oversize_handling,
            });
        },
        FieldToMatch::HeaderOrder { oversize_handling } => {
            wire.header_order = Some(WireHeaderOrder {
                oversize_handling: *oversize_handling,
            });
        },
        FieldToMatch::Headers {
            match_pattern,
            match_scope,
            oversize_handling,
        } => {
            let (all, included, excluded) = split_pattern(match_pattern);
            wire.headers = Some(WireHeaders {
                match_pattern: WireHeaderMatchPattern {
                    all,
                    included_headers: included,
                    excluded_headers: excluded,
                },
                match_scope: *match_scope,
                oversize_handling: *oversize_handling,
            });
        },
        FieldToMatch::Ja3Fingerprint { fallback_behavior } => {
            wire.ja3_fingerprint = Some(WireFingerprint {
                fallback_behavior: *fallback_behavior,
            });
        },
        FieldToMatch::Ja4Fingerprint { fallback_behavior } => {
            wire.ja4_fingerprint = Some(WireFingerprint {
                fallback_behavior: *fallback_behavior,
            });
        },
        FieldToMatch::JsonBody {
            match_pattern,
            match_scope,
            invalid_fallback_behavior,
            oversize_handling,
        } => {
            let match_pattern = match match_pattern {
                JsonMatchPattern::All => WireJsonMatchPattern {
                    all: Some(Empty {}),
                    included_paths: None,
                },
                JsonMatchPattern::IncludedPaths(paths) => WireJsonMatchPattern {
                    all: None,
                    included_paths: Some(paths.clone()),
                },
            };
            wire.json_body = Some(WireJsonBody {
                match_pattern,
                match_scope: *match_scope,
                invalid_fallback_behavior: *invalid_fallback_behavior,
                oversize_handling: *oversize_handling,
            });
        },
        FieldToMatch::Method => wire.method = Some(Empty {}),
        FieldToMatch::QueryString => wire.query_string = Some(Empty {}),
        FieldToMatch::SingleHeader { name } => {
            wire.single_header = Some(WireNamed { name: name.clone() });
        },
        FieldToMatch::SingleQueryArgument { name } => {
            wire.single_query_argument = Some(WireNamed { name: name.clone() });
        },
        FieldToMatch::UriPath => wire.uri_path = Some(Empty {}),
    }
    wire
}

type SplitPattern = (Option<Empty>, Option<Vec<String>>, Option<Vec<String>>);

fn split_pattern(pattern: &MatchPattern) -> SplitPattern {
    match pattern {
        MatchPattern::All => (Some(Empty {}), None, None),
        MatchPattern::Included(names) => (None, Some(names.clone()), None),
        MatchPattern::Excluded(names) => (None, None, Some(names.clone())),
    }
}

fn expand_headers(headers: &[CustomHttpHeader]) -> Vec<WireCustomHttpHeader> {
    headers
        .iter()
        .map(|h| WireCustomHttpHeader {
            name: h.name.clone(),
            value: h.value.clone(),
        })
        .collect()
}

fn expand_request_action(handling: Option<&CustomRequestHandling>) -> WireRequestAction {
    WireRequestAction {
        custom_request_handling: handling.map(|h| WireCustomRequestHandling {
            insert_headers: expand_headers(&h.insert_headers),
        }),
    }
}

fn expand_block_action(response: Option<&CustomResponse>) -> WireBlockAction {
    WireBlockAction {
        custom_response: response.map(|r| WireCustomResponse {
            response_code: r.response_code,
            custom_response_body_key: r.custom_response_body_key.clone(),
            response_headers: expand_headers(&r.response_headers),
        }),
    }
}

/// Expand a rule action
pub fn expand_rule_action(action: &RuleAction) -> WireRuleAction {
    let mut wire = WireRuleAction::default();
    match action {
        RuleAction::Allow {
            custom_request_handling,
        } => wire.allow = Some(expand_request_action(custom_request_handling.as_ref())),
        RuleAction::Block { custom_response } => {
            wire.block = Some(expand_block_action(custom_response.as_ref()));
        },
        RuleAction::Captcha {
            custom_request_handling,
        } => wire.captcha = Some(expand_request_action(custom_request_handling.as_ref())),
        RuleAction::Challenge {
            custom_request_handling,
        } => wire.challenge = Some(expand_request_action(custom_request_handling.as_ref())),
        RuleAction::Count {
            custom_request_handling,
        } => wire.count = Some(expand_request_action(custom_request_handling.as_ref())),
    }
    wire
}

fn expand_override_action(action: OverrideAction) -> WireOverrideAction {
    match action {
        OverrideAction::Count => WireOverrideAction {
            count: Some(Empty {}),
            none: None,
        },
        OverrideAction::None => WireOverrideAction {
            count: None,
            none: Some(Empty {}),
        },
    }
}

fn expand_default_action(action: &DefaultAction) -> WireDefaultAction {
    match action {
        DefaultAction::Allow {
            custom_request_handling,
        } => WireDefaultAction {
            allow: Some(expand_request_action(custom_request_handling.as_ref())),
            block: None,
        },
        DefaultAction::Block { custom_response } => WireDefaultAction {
            allow: None,
            block: Some(expand_block_action(custom_response.as_ref())),
        },
    }
}

fn expand_visibility(config: &VisibilityConfig) -> WireVisibilityConfig {
    WireVisibilityConfig {
        sampled_requests_enabled: config.sampled_requests_enabled,
        cloudwatch_metrics_enabled: config.cloudwatch_metrics_enabled,
        metric_name: config.metric_name.clone(),
    }
}

fn expand_immunity(config: &ImmunityConfig) -> WireImmunityConfig {
    WireImmunityConfig {
        immunity_time_property: config
            .immunity_time
            .map(|immunity_time| WireImmunityTimeProperty { immunity_time }),
    }
}

fn expand_association(config: &AssociationConfig) -> WireAssociationConfig {
    WireAssociationConfig {
        request_body: config
            .request_body
            .iter()
            .map(|limit| {
                (
                    limit.resource_type.as_str().to_string(),
                    WireRequestBodyConfig {
                        default_size_inspection_limit: limit.default_size_inspection_limit,
                    },
                )
            })
            .collect(),
    }
}

/// Expand a rule without consulting the grammar
pub fn expand_rule(rule: &Rule) -> WireRule {
    let (action, override_action) = match &rule.disposition {
        Disposition::Action(action) => (Some(expand_rule_action(action)), None),
        Disposition::OverrideAction(action) => (None, Some(expand_override_action(*action))),
    };
    WireRule {
        name: rule.name.clone(),
        priority: rule.priority,
        action,
        override_action,
        statement: expand_statement(&rule.statement),
        rule_labels: expand_names(&rule.rule_labels),
        visibility_config: expand_visibility(&rule.visibility_config),
        captcha_config: rule.captcha_config.as_ref().map(expand_immunity),
        challenge_config: rule.challenge_config.as_ref().map(expand_immunity),
    }
}

/// Expand a rule list, keeping its order
pub fn expand_rules(rules: &[Rule]) -> Vec<WireRule> {
    rules.iter().map(expand_rule).collect()
}

/// Expand a collection without consulting the grammar
pub fn expand_collection(collection: &RuleCollection) -> WireCollection {
    let mut wire = WireCollection {
        name: collection.name.clone(),
        description: collection.description.clone(),
        default_action: None,
        capacity: None,
        rules: expand_rules(&collection.rules),
        custom_response_bodies: collection
            .custom_response_bodies
            .iter()
            .map(|(key, body)| {
                (
                    key.clone(),
                    WireCustomResponseBody {
                        content_type: body.content_type,
                        content: body.content.clone(),
                    },
                )
            })
            .collect(),
        visibility_config: expand_visibility(&collection.visibility_config),
        captcha_config: None,
        challenge_config: None,
        association_config: None,
    };
    match &collection.kind {
        CollectionKind::WebAcl {
            default_action,
            captcha_config,
            challenge_config,
            association_config,
        } => {
            wire.default_action = Some(expand_default_action(default_action));
            wire.captcha_config = captcha_config.as_ref().map(expand_immunity);
            wire.challenge_config = challenge_config.as_ref().map(expand_immunity);
            wire.association_config = association_config.as_ref().map(expand_association);
        },
        CollectionKind::RuleGroup { capacity } => wire.capacity = Some(*capacity),
    }
    wire
}

/// Expand a regex pattern set body
pub fn expand_regex_patterns(patterns: &[String]) -> Vec<WireRegex> {
    patterns
        .iter()
        .map(|regex_string| WireRegex {
            regex_string: regex_string.clone(),
        })
        .collect()
}
