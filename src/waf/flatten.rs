//! Wire representation to configuration tree.
//!
//! Inverse of [`super::expand`]. Wire unions are flat structs of optional
//! members, so every union is checked for exactly one populated member and
//! anything else is reported as [`WafError::MalformedWire`] with the path of
//! the offending object. Rule lists come back sorted by ascending priority.

use super::action::{
    CustomHttpHeader, CustomRequestHandling, CustomResponse, CustomResponseBody, DefaultAction,
    ImmunityConfig, OverrideAction, RuleAction,
};
use super::composite::{
    AcfpRequestInspection, AcfpRuleSet, AtpRuleSet, ManagedRuleGroupConfig,
    ManagedRuleGroupStatement, NamedKey, RateBasedStatement, RateLimitKey, RequestInspection,
    ResponseInspection, RuleActionOverride, RuleGroupReferenceStatement, TransformedKey,
};
use super::error::{WafError, WafResult};
use super::field::{FieldToMatch, JsonMatchPattern, MatchPattern, TextTransformation};
use super::rule::{
    AssociatedResourceType, AssociationConfig, CollectionKind, Disposition, RequestBodyLimit,
    Rule, RuleCollection, Scope, VisibilityConfig,
};
use super::statement::{
    AndStatement, ByteMatchStatement, ForwardedIpConfig, GeoMatchStatement,
    IpSetForwardedIpConfig, IpSetReferenceStatement, LabelMatchStatement, NotStatement,
    OrStatement, RegexMatchStatement, RegexPatternSetReferenceStatement, SizeConstraintStatement,
    SqliMatchStatement, Statement, XssMatchStatement,
};
use super::wire::*;

fn exactly_one<T>(found: Vec<T>, path: &str, what: &str) -> WafResult<T> {
    let count = found.len();
    let mut found = found.into_iter();
    match (found.next(), count) {
        (Some(item), 1) => Ok(item),
        (None, _) => Err(WafError::malformed(path, format!("no {what} member is set"))),
        _ => Err(WafError::malformed(
            path,
            format!("{count} {what} members are set, expected exactly one"),
        )),
    }
}

/// Flatten a wire statement tree
///
/// # Errors
///
/// Returns [`WafError::MalformedWire`] if a union has zero or several members
/// set or a search string is not UTF-8.
pub fn flatten_statement(wire: &WireStatement) -> WafResult<Statement> {
    statement(wire, "Statement")
}

fn statement(w: &WireStatement, path: &str) -> WafResult<Statement> {
    let mut found = Vec::with_capacity(1);

    if let Some(s) = &w.and_statement {
        found.push(Statement::And(AndStatement {
            statements: children(&s.statements, &format!("{path}.AndStatement"))?,
        }));
    }
    if let Some(s) = &w.or_statement {
        found.push(Statement::Or(OrStatement {
            statements: children(&s.statements, &format!("{path}.OrStatement"))?,
        }));
    }
    if let Some(s) = &w.not_statement {
        found.push(Statement::Not(NotStatement {
            statement: Box::new(statement(
                &s.statement,
                &format!("{path}.NotStatement.Statement"),
            )?),
        }));
    }
    if let Some(s) = &w.byte_match_statement {
        let here = format!("{path}.ByteMatchStatement");
        let search_string = String::from_utf8(s.search_string.clone()).map_err(|e| {
            WafError::malformed(format!("{here}.SearchString"), format!("not UTF-8: {e}"))
        })?;
        found.push(Statement::ByteMatch(ByteMatchStatement {
            field_to_match: field(&s.field_to_match, &here)?,
            positional_constraint: s.positional_constraint,
            search_string,
            text_transformations: flatten_transformations(&s.text_transformations),
        }));
    }
    if let Some(s) = &w.geo_match_statement {
        found.push(Statement::GeoMatch(GeoMatchStatement {
            country_codes: s.country_codes.clone(),
            forwarded_ip_config: s.forwarded_ip_config.as_ref().map(forwarded_ip),
        }));
    }
    if let Some(s) = &w.ip_set_reference_statement {
        found.push(Statement::IpSetReference(IpSetReferenceStatement {
            arn: s.arn.clone(),
            ip_set_forwarded_ip_config: s.ip_set_forwarded_ip_config.as_ref().map(|c| {
                IpSetForwardedIpConfig {
                    header_name: c.header_name.clone(),
                    fallback_behavior: c.fallback_behavior,
                    position: c.position,
                }
            }),
        }));
    }
    if let Some(s) = &w.label_match_statement {
        found.push(Statement::LabelMatch(LabelMatchStatement {
            key: s.key.clone(),
            scope: s.scope,
        }));
    }
    if let Some(s) = &w.regex_match_statement {
        found.push(Statement::RegexMatch(RegexMatchStatement {
            regex_string: s.regex_string.clone(),
            field_to_match: field(&s.field_to_match, &format!("{path}.RegexMatchStatement"))?,
            text_transformations: flatten_transformations(&s.text_transformations),
        }));
    }
    if let Some(s) = &w.regex_pattern_set_reference_statement {
        let here = format!("{path}.RegexPatternSetReferenceStatement");
        found.push(Statement::RegexPatternSetReference(
            RegexPatternSetReferenceStatement {
                arn: s.arn.clone(),
                field_to_match: field(&s.field_to_match, &here)?,
                text_transformations: flatten_transformations(&s.text_transformations),
            },
        ));
    }
    if let Some(s) = &w.size_constraint_statement {
        found.push(Statement::SizeConstraint(SizeConstraintStatement {
            comparison_operator: s.comparison_operator,
            size: s.size,
            field_to_match: field(&s.field_to_match, &format!("{path}.SizeConstraintStatement"))?,
            text_transformations: flatten_transformations(&s.text_transformations),
        }));
    }
    if let Some(s) = &w.sqli_match_statement {
        found.push(Statement::SqliMatch(SqliMatchStatement {
            field_to_match: field(&s.field_to_match, &format!("{path}.SqliMatchStatement"))?,
            text_transformations: flatten_transformations(&s.text_transformations),
            sensitivity_level: s.sensitivity_level,
        }));
    }
    if let Some(s) = &w.xss_match_statement {
        found.push(Statement::XssMatch(XssMatchStatement {
            field_to_match: field(&s.field_to_match, &format!("{path}.XssMatchStatement"))?,
            text_transformations: flatten_transformations(&s.text_transformations),
        }));
    }
    if let Some(s) = &w.rate_based_statement {
        found.push(Statement::RateBased(Box::new(rate_based(
            s,
            &format!("{path}.RateBasedStatement"),
        )?)));
    }
    if let Some(s) = &w.managed_rule_group_statement {
        found.push(Statement::ManagedRuleGroup(Box::new(managed(
            s,
            &format!("{path}.ManagedRuleGroupStatement"),
        )?)));
    }
    if let Some(s) = &w.rule_group_reference_statement {
        let here = format!("{path}.RuleGroupReferenceStatement");
        found.push(Statement::RuleGroupReference(RuleGroupReferenceStatement {
            arn: s.arn.clone(),
            excluded_rules: names(&s.excluded_rules),
            rule_action_overrides: overrides(&s.rule_action_overrides, &here)?,
        }));
    }

    exactly_one(found, path, "statement")
}

fn children(statements: &[WireStatement], path: &str) -> WafResult<Vec<Statement>> {
    statements
        .iter()
        .enumerate()
        .map(|(i, child)| statement(child, &format!("{path}.Statements[{i}]")))
        .collect()
}

fn scope_down(wire: Option<&WireStatement>, path: &str) -> WafResult<Option<Box<Statement>>> {
    wire.map(|s| statement(s, &format!("{path}.ScopeDownStatement")).map(Box::new))
        .transpose()
}

fn rate_based(s: &WireRateBasedStatement, path: &str) -> WafResult<RateBasedStatement> {
    Ok(RateBasedStatement {
        limit: s.limit,
        aggregate_key_type: s.aggregate_key_type,
        evaluation_window_sec: s.evaluation_window_sec,
        forwarded_ip_config: s.forwarded_ip_config.as_ref().map(forwarded_ip),
        custom_keys: s
            .custom_keys
            .iter()
            .enumerate()
            .map(|(i, key)| rate_limit_key(key, &format!("{path}.CustomKeys[{i}]")))
            .collect::<WafResult<_>>()?,
        scope_down_statement: scope_down(s.scope_down_statement.as_deref(), path)?,
    })
}

fn rate_limit_key(w: &WireRateLimitKey, path: &str) -> WafResult<RateLimitKey> {
    let named = |k: &WireNamedKey| NamedKey {
        name: k.name.clone(),
        text_transformations: flatten_transformations(&k.text_transformations),
    };
    let transformed = |k: &WireTransformedKey| TransformedKey {
        text_transformations: flatten_transformations(&k.text_transformations),
    };

    let mut found = Vec::with_capacity(1);
    if let Some(k) = &w.cookie {
        found.push(RateLimitKey::Cookie(named(k)));
    }
    if w.forwarded_ip.is_some() {
        found.push(RateLimitKey::ForwardedIp);
    }
    if w.http_method.is_some() {
        found.push(RateLimitKey::HttpMethod);
    }
    if let Some(k) = &w.header {
        found.push(RateLimitKey::Header(named(k)));
    }
    if w.ip.is_some() {
        found.push(RateLimitKey::Ip);
    }
    if let Some(k) = &w.ja3_fingerprint {
        found.push(RateLimitKey::Ja3Fingerprint {
            fallback_behavior: k.fallback_behavior,
        });
    }
    if let Some(k) = &w.ja4_fingerprint {
        found.push(RateLimitKey::Ja4Fingerprint {
            fallback_behavior: k.fallback_behavior,
        });
    }
    if let Some(k) = &w.label_namespace {
        found.push(RateLimitKey::LabelNamespace {
            namespace: k.namespace.clone(),
        });
    }
    if let Some(k) = &w.query_argument {
        found.push(RateLimitKey::QueryArgument(named(k)));
    }
    if let Some(k) = &w.query_string {
        found.push(RateLimitKey::QueryString(transformed(k)));
    }
    if let Some(k) = &w.uri_path {
        found.push(RateLimitKey::UriPath(transformed(k)));
    }
    exactly_one(found, path, "custom key")
}

fn managed(s: &WireManagedRuleGroupStatement, path: &str) -> WafResult<ManagedRuleGroupStatement> {
    Ok(ManagedRuleGroupStatement {
        name: s.name.clone(),
        vendor_name: s.vendor_name.clone(),
        version: s.version.clone(),
        excluded_rules: names(&s.excluded_rules),
        rule_action_overrides: overrides(&s.rule_action_overrides, path)?,
        managed_rule_group_configs: s
            .managed_rule_group_configs
            .iter()
            .enumerate()
            .map(|(i, c)| managed_config(c, &format!("{path}.ManagedRuleGroupConfigs[{i}]")))
            .collect::<WafResult<_>>()?,
        scope_down_statement: scope_down(s.scope_down_statement.as_deref(), path)?,
    })
}

fn managed_config(
    w: &WireManagedRuleGroupConfig,
    path: &str,
) -> WafResult<ManagedRuleGroupConfig> {
    let mut found = Vec::with_capacity(1);
    if let Some(login_path) = &w.login_path {
        found.push(ManagedRuleGroupConfig::LoginPath(login_path.clone()));
    }
    if let Some(kind) = w.payload_type {
        found.push(ManagedRuleGroupConfig::PayloadType(kind));
    }
    if let Some(f) = &w.username_field {
        found.push(ManagedRuleGroupConfig::UsernameField {
            identifier: f.identifier.clone(),
        });
    }
    if let Some(f) = &w.password_field {
        found.push(ManagedRuleGroupConfig::PasswordField {
            identifier: f.identifier.clone(),
        });
    }
    if let Some(b) = &w.bot_control_rule_set {
        found.push(ManagedRuleGroupConfig::BotControlRuleSet {
            inspection_level: b.inspection_level,
            enable_machine_learning: b.enable_machine_learning,
        });
    }
    if let Some(set) = &w.atp_rule_set {
        let here = format!("{path}.AWSManagedRulesATPRuleSet");
        found.push(ManagedRuleGroupConfig::AtpRuleSet(AtpRuleSet {
            login_path: set.login_path.clone(),
            request_inspection: set.request_inspection.as_ref().map(|r| RequestInspection {
                payload_type: r.payload_type,
                username_field: r.username_field.identifier.clone(),
                password_field: r.password_field.identifier.clone(),
            }),
            response_inspection: set
                .response_inspection
                .as_ref()
                .map(|r| response_inspection(r, &here))
                .transpose()?,
            enable_regex_in_path: set.enable_regex_in_path,
        }));
    }
    if let Some(set) = &w.acfp_rule_set {
        let here = format!("{path}.AWSManagedRulesACFPRuleSet");
        found.push(ManagedRuleGroupConfig::AcfpRuleSet(AcfpRuleSet {
            creation_path: set.creation_path.clone(),
            registration_page_path: set.registration_page_path.clone(),
            request_inspection: set.request_inspection.as_ref().map(acfp_request_inspection),
            response_inspection: set
                .response_inspection
                .as_ref()
                .map(|r| response_inspection(r, &here))
                .transpose()?,
            enable_regex_in_path: set.enable_regex_in_path,
        }));
    }
    exactly_one(found, path, "managed rule group config")
}

fn identifiers(wire: &[WireFieldIdentifier]) -> Vec<String> {
    wire.iter().map(|f| f.identifier.clone()).collect()
}

fn acfp_request_inspection(w: &WireRequestInspectionAcfp) -> AcfpRequestInspection {
    let identifier = |f: &WireFieldIdentifier| f.identifier.clone();
    AcfpRequestInspection {
        payload_type: w.payload_type,
        username_field: w.username_field.as_ref().map(identifier),
        password_field: w.password_field.as_ref().map(identifier),
        email_field: w.email_field.as_ref().map(identifier),
        phone_number_fields: identifiers(&w.phone_number_fields),
        address_fields: identifiers(&w.address_fields),
    }
}

fn response_inspection(w: &WireResponseInspection, parent: &str) -> WafResult<ResponseInspection> {
    let mut found = Vec::with_capacity(1);
    if let Some(b) = &w.body_contains {
        found.push(ResponseInspection::BodyContains {
            success_strings: b.success_strings.clone(),
            failure_strings: b.failure_strings.clone(),
        });
    }
    if let Some(h) = &w.header {
        found.push(ResponseInspection::Header {
            name: h.name.clone(),
            success_values: h.success_values.clone(),
            failure_values: h.failure_values.clone(),
        });
    }
    if let Some(j) = &w.json {
        found.push(ResponseInspection::Json {
            identifier: j.identifier.clone(),
            success_values: j.success_values.clone(),
            failure_values: j.failure_values.clone(),
        });
    }
    if let Some(c) = &w.status_code {
        found.push(ResponseInspection::StatusCode {
            success_codes: c.success_codes.clone(),
            failure_codes: c.failure_codes.clone(),
        });
    }
    exactly_one(found, &format!("{parent}.ResponseInspection"), "response inspection")
}

fn overrides(wire: &[WireRuleActionOverride], path: &str) -> WafResult<Vec<RuleActionOverride>> {
    wire.iter()
        .enumerate()
        .map(|(i, o)| {
            Ok(RuleActionOverride {
                name: o.name.clone(),
                action_to_use: rule_action(
                    &o.action_to_use,
                    &format!("{path}.RuleActionOverrides[{i}].ActionToUse"),
                )?,
            })
        })
        .collect()
}

fn names(wire: &[WireNamed]) -> Vec<String> {
    wire.iter().map(|n| n.name.clone()).collect()
}

fn forwarded_ip(config: &WireForwardedIpConfig) -> ForwardedIpConfig {
    ForwardedIpConfig {
        header_name: config.header_name.clone(),
        fallback_behavior: config.fallback_behavior,
    }
}

/// Flatten a transformation chain, keeping wire order
pub fn flatten_transformations(wire: &[WireTextTransformation]) -> Vec<TextTransformation> {
    wire.iter()
        .map(|t| TextTransformation::new(t.priority, t.kind))
        .collect()
}

/// Flatten an inspected request component
///
/// # Errors
///
/// Returns [`WafError::MalformedWire`] unless exactly one component and one
/// match pattern member are set.
pub fn flatten_field(wire: &WireFieldToMatch) -> WafResult<FieldToMatch> {
    field(wire, "FieldToMatch")
}

fn field(w: &WireFieldToMatch, parent: &str) -> WafResult<FieldToMatch> {
    let path = format!("{parent}.FieldToMatch");
    let mut found = Vec::with_capacity(1);

    if w.all_query_arguments.is_some() {
        found.push(FieldToMatch::AllQueryArguments);
    }
    if let Some(b) = &w.body {
        found.push(FieldToMatch::Body {
            oversize_handling: b.oversize_handling,
        });
    }
    if let Some(c) = &w.cookies {
        let p = &c.match_pattern;
        found.push(FieldToMatch::Cookies {
            match_pattern: pattern(
                p.all,
                p.included_cookies.as_ref(),
                p.excluded_cookies.as_ref(),
                &format!("{path}.Cookies.MatchPattern"),
            )?,
            match_scope: c.match_scope,
            oversize_handling: c.oversize_handling,
        });
    }
    if let Some(h) = &w.header_order {
        found.push(FieldToMatch::HeaderOrder {
            oversize_handling: h.oversize_handling,
        });
    }
    if let Some(h) = &w.headers {
        let p = &h.match_pattern;
        found.push(FieldToMatch::Headers {
            match_pattern: pattern(
                p.all,
                p.included_headers.as_ref(),
                p.excluded_headers.as_ref(),
                &format!("{path}.Headers.MatchPattern"),
            )?,
            match_scope: h.match_scope,
            oversize_handling: h.oversize_handling,
        });
    }
    if let Some(j) = &w.ja3_fingerprint {
        found.push(FieldToMatch::Ja3Fingerprint {
            fallback_behavior: j.fallback_behavior,
        });
    }
    if let Some(j) = &w.ja4_fingerprint {
        found.push(FieldToMatch::Ja4Fingerprint {
            fallback_behavior: j.fallback_behavior,
        });
    }
    if let Some(j) = &w.json_body {
        let mut patterns = Vec::with_capacity(1);
        if j.match_pattern.all.is_some() {
            patterns.push(JsonMatchPattern::All);
        }
        if let Some(paths) = &j.match_pattern.included_paths {
            patterns.push(JsonMatchPattern::IncludedPaths(paths.clone()));
        }
        found.push(FieldToMatch::JsonBody {
            match_pattern: exactly_one(
                patterns,
                &format!("{path}.JsonBody.MatchPattern"),
                "match pattern",
            )?,
            match_scope: j.match_scope,
            invalid_fallback_behavior: j.invalid_fallback_behavior,
            oversize_handling: j.oversize_handling,
        });
    }
    if w.method.is_some() {
        found.push(FieldToMatch::Method);
    }
    if w.query_string.is_some() {
        found.push(FieldToMatch::QueryString);
    }
    if let Some(n) = &w.single_header {
        found.push(FieldToMatch::SingleHeader {
            name: n.name.clone(),
        });
    }
    if let Some(n) = &w.single_query_argument {
        found.push(FieldToMatch::SingleQueryArgument {
            name: n.name.clone(),
        });
    }
    if w.uri_path.is_some() {
        found.push(FieldToMatch::UriPath);
    }

    exactly_one(found, &path, "field to match")
}

fn pattern(
    all: Option<Empty>,
    included: Option<&Vec<String>>,
    excluded: Option<&Vec<String>>,
    path: &str,
) -> WafResult<MatchPattern> {
    let mut found = Vec::with_capacity(1);
    if all.is_some() {
        found.push(MatchPattern::All);
    }
    if let Some(names) = included {
        found.push(MatchPattern::Included(names.clone()));
    }
    if let Some(names) = excluded {
        found.push(MatchPattern::Excluded(names.clone()));
    }
    exactly_one(found, path, "match pattern")
}

fn headers(wire: &[WireCustomHttpHeader]) -> Vec<CustomHttpHeader> {
    wire.iter()
        .map(|h| CustomHttpHeader::new(&h.name, &h.value))
        .collect()
}

fn request_handling(wire: &WireRequestAction) -> Option<CustomRequestHandling> {
    wire.custom_request_handling
        .as_ref()
        .map(|h| CustomRequestHandling {
            insert_headers: headers(&h.insert_headers),
        })
}

fn custom_response(wire: &WireBlockAction) -> Option<CustomResponse> {
    wire.custom_response.as_ref().map(|r| CustomResponse {
        response_code: r.response_code,
        custom_response_body_key: r.custom_response_body_key.clone(),
        response_headers: headers(&r.response_headers),
    })
}

fn rule_action(w: &WireRuleAction, path: &str) -> WafResult<RuleAction> {
    let mut found = Vec::with_capacity(1);
    if let Some(a) = &w.allow {
        found.push(RuleAction::Allow {
            custom_request_handling: request_handling(a),
        });
    }
    if let Some(b) = &w.block {
        found.push(RuleAction::Block {
            custom_response: custom_response(b),
        });
    }
    if let Some(a) = &w.captcha {
        found.push(RuleAction::Captcha {
            custom_request_handling: request_handling(a),
        });
    }
    if let Some(a) = &w.challenge {
        found.push(RuleAction::Challenge {
            custom_request_handling: request_handling(a),
        });
    }
    if let Some(a) = &w.count {
        found.push(RuleAction::Count {
            custom_request_handling: request_handling(a),
        });
    }
    exactly_one(found, path, "action")
}

fn override_action(w: &WireOverrideAction, path: &str) -> WafResult<OverrideAction> {
    let mut found = Vec::with_capacity(1);
    if w.count.is_some() {
        found.push(OverrideAction::Count);
    }
    if w.none.is_some() {
        found.push(OverrideAction::None);
    }
    exactly_one(found, path, "override action")
}

fn default_action(w: &WireDefaultAction, path: &str) -> WafResult<DefaultAction> {
    let mut found = Vec::with_capacity(1);
    if let Some(a) = &w.allow {
        found.push(DefaultAction::Allow {
            custom_request_handling: request_handling(a),
        });
    }
    if let Some(b) = &w.block {
        found.push(DefaultAction::Block {
            custom_response: custom_response(b),
        });
    }
    exactly_one(found, path, "default action")
}

fn visibility(wire: &WireVisibilityConfig) -> VisibilityConfig {
    VisibilityConfig {
        sampled_requests_enabled: wire.sampled_requests_enabled,
        cloudwatch_metrics_enabled: wire.cloudwatch_metrics_enabled,
        metric_name: wire.metric_name.clone(),
    }
}

fn immunity(wire: &WireImmunityConfig) -> ImmunityConfig {
    ImmunityConfig {
        immunity_time: wire.immunity_time_property.as_ref().map(|p| p.immunity_time),
    }
}

/// Flatten one rule
///
/// # Errors
///
/// Returns [`WafError::MalformedWire`] if the rule has both or neither of
/// `Action` and `OverrideAction`, or if its statement is malformed.
pub fn flatten_rule(wire: &WireRule) -> WafResult<Rule> {
    rule(wire, &format!("Rules[{}]", wire.name))
}

fn rule(w: &WireRule, path: &str) -> WafResult<Rule> {
    let disposition = match (&w.action, &w.override_action) {
        (Some(action), None) => {
            Disposition::Action(rule_action(action, &format!("{path}.Action"))?)
        },
        (None, Some(action)) => {
            let here = format!("{path}.OverrideAction");
            Disposition::OverrideAction(override_action(action, &here)?)
        },
        (Some(_), Some(_)) => {
            return Err(WafError::malformed(path, "both Action and OverrideAction are set"));
        },
        (None, None) => {
            return Err(WafError::malformed(path, "neither Action nor OverrideAction is set"));
        },
    };

    Ok(Rule {
        name: w.name.clone(),
        priority: w.priority,
        disposition,
        statement: statement(&w.statement, &format!("{path}.Statement"))?,
        rule_labels: w.rule_labels.iter().map(|l| l.name.clone()).collect(),
        visibility_config: visibility(&w.visibility_config),
        captcha_config: w.captcha_config.as_ref().map(immunity),
        challenge_config: w.challenge_config.as_ref().map(immunity),
    })
}

/// Flatten a rule list, sorted by ascending priority.
///
/// Rules sharing a priority keep their wire order.
///
/// # Errors
///
/// Returns the first [`WafError::MalformedWire`] found in any rule.
pub fn flatten_rules(wire: &[WireRule]) -> WafResult<Vec<Rule>> {
    let mut rules = wire
        .iter()
        .map(flatten_rule)
        .collect::<WafResult<Vec<_>>>()?;
    rules.sort_by_key(|r| r.priority);
    Ok(rules)
}

fn association(wire: &WireAssociationConfig) -> WafResult<AssociationConfig> {
    let request_body = wire
        .request_body
        .iter()
        .map(|(key, config)| -> WafResult<RequestBodyLimit> {
            let resource_type = key.parse::<AssociatedResourceType>().map_err(|message| {
                WafError::malformed(format!("AssociationConfig.RequestBody.{key}"), message)
            })?;
            Ok(RequestBodyLimit {
                resource_type,
                default_size_inspection_limit: config.default_size_inspection_limit,
            })
        })
        .collect::<WafResult<_>>()?;
    Ok(AssociationConfig { request_body })
}

/// Flatten a collection read back from the service
///
/// # Errors
///
/// Returns [`WafError::MalformedWire`] if the body is neither a web ACL nor a
/// rule group, or if any rule is malformed.
pub fn flatten_collection(wire: &WireCollection, scope: Scope) -> WafResult<RuleCollection> {
    let kind = match (&wire.default_action, wire.capacity) {
        (Some(action), None) => CollectionKind::WebAcl {
            default_action: default_action(action, "DefaultAction")?,
            captcha_config: wire.captcha_config.as_ref().map(immunity),
            challenge_config: wire.challenge_config.as_ref().map(immunity),
            association_config: wire.association_config.as_ref().map(association).transpose()?,
        },
        (None, Some(capacity)) => {
            let web_acl_only = [
                ("CaptchaConfig", wire.captcha_config.is_some()),
                ("ChallengeConfig", wire.challenge_config.is_some()),
                ("AssociationConfig", wire.association_config.is_some()),
            ];
            if let Some((member, _)) = web_acl_only.iter().find(|(_, set)| *set) {
                return Err(WafError::malformed(
                    &wire.name,
                    format!("{member} is only valid on a web ACL"),
                ));
            }
            CollectionKind::RuleGroup { capacity }
        },
        (Some(_), Some(_)) => {
            return Err(WafError::malformed(
                &wire.name,
                "both DefaultAction and Capacity are set",
            ));
        },
        (None, None) => {
            return Err(WafError::malformed(
                &wire.name,
                "neither DefaultAction nor Capacity is set",
            ));
        },
    };

    Ok(RuleCollection {
        name: wire.name.clone(),
        description: wire.description.clone(),
        scope,
        kind,
        rules: flatten_rules(&wire.rules)?,
        custom_response_bodies: wire
            .custom_response_bodies
            .iter()
            .map(|(key, body)| {
                (
                    key.clone(),
                    CustomResponseBody {
                        content_type: body.content_type,
                        content: body.content.clone(),
                    },
                )
            })
            .collect(),
        visibility_config: visibility(&wire.visibility_config),
    })
}

/// Flatten a regex pattern set body
pub fn flatten_regex_patterns(wire: &[WireRegex]) -> Vec<String> {
    wire.iter().map(|r| r.regex_string.clone()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::waf::expand::{expand_rule, expand_statement};
    use crate::waf::field::TextTransformationType;
    use serde_json::json;

    fn wire_rule(name: &str, priority: i32) -> WireRule {
        serde_json::from_value(json!({
            "Name": name,
            "Priority": priority,
            "Action": { "Block": {} },
            "Statement": {
                "GeoMatchStatement": { "CountryCodes": ["US"] }
            },
            "VisibilityConfig": {
                "SampledRequestsEnabled": true,
                "CloudWatchMetricsEnabled": true,
                "MetricName": name
            }
        }))
        .unwrap()
    }

    fn priorities(rules: &[Rule]) -> Vec<i32> {
        rules.iter().map(|r| r.priority).collect()
    }

    #[test]
    fn test_rules_sorted_by_priority() {
        let wire: Vec<WireRule> = [50, 5, 23, 19]
            .iter()
            .map(|p| wire_rule(&format!("rule-{p}"), *p))
            .collect();
        assert_eq!(priorities(&flatten_rules(&wire).unwrap()), vec![5, 19, 23, 50]);

        let single = vec![wire_rule("only", 10)];
        assert_eq!(priorities(&flatten_rules(&single).unwrap()), vec![10]);

        assert!(flatten_rules(&[]).unwrap().is_empty());
    }

    #[test]
    fn test_equal_priorities_keep_wire_order() {
        let wire = vec![wire_rule("b", 1), wire_rule("a", 1), wire_rule("c", 0)];
        let names: Vec<String> = flatten_rules(&wire)
            .unwrap()
            .into_iter()
            .map(|r| r.name)
            .collect();
        assert_eq!(names, vec!["c", "b", "a"]);
    }

    #[test]
    fn test_empty_marker_flattens_to_variant() {
        let wire: WireFieldToMatch =
            serde_json::from_value(json!({ "AllQueryArguments": {} })).unwrap();
        assert_eq!(flatten_field(&wire).unwrap(), FieldToMatch::AllQueryArguments);
    }

    #[test]
    fn test_no_member_is_malformed() {
        let err = flatten_statement(&WireStatement::default()).unwrap_err();
        match err {
            WafError::MalformedWire { path, message } => {
                assert_eq!(path, "Statement");
                assert!(message.contains("no statement member"));
            },
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_several_members_are_malformed() {
        let wire: WireStatement = serde_json::from_value(json!({
            "AndStatement": { "Statements": [
                {
                    "GeoMatchStatement": { "CountryCodes": ["US"] },
                    "LabelMatchStatement": { "Key": "a", "Scope": "LABEL" }
                }
            ]}
        }))
        .unwrap();
        let err = flatten_statement(&wire).unwrap_err();
        match err {
            WafError::MalformedWire { path, .. } => {
                assert_eq!(path, "Statement.AndStatement.Statements[0]");
            },
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_non_utf8_search_string_is_malformed() {
        let wire = WireStatement {
            byte_match_statement: Some(WireByteMatchStatement {
                field_to_match: WireFieldToMatch {
                    uri_path: Some(Empty {}),
                    ..WireFieldToMatch::default()
                },
                positional_constraint: crate::waf::statement::PositionalConstraint::Exactly,
                search_string: vec![0xff, 0xfe],
                text_transformations: vec![],
            }),
            ..WireStatement::default()
        };
        assert!(matches!(
            flatten_statement(&wire),
            Err(WafError::MalformedWire { .. })
        ));
    }

    #[test]
    fn test_rule_round_trip() {
        let wire = wire_rule("geo", 7);
        let rule = flatten_rule(&wire).unwrap();
        assert_eq!(rule.action(), Some(&RuleAction::block()));
        assert_eq!(expand_rule(&rule), wire);
    }

    #[test]
    fn test_rate_based_without_window_round_trips() {
        let original = json!({
            "RateBasedStatement": {
                "Limit": 10000,
                "AggregateKeyType": "IP",
                "ScopeDownStatement": {
                    "GeoMatchStatement": { "CountryCodes": ["US", "NL"] }
                }
            }
        });
        let wire: WireStatement = serde_json::from_value(original.clone()).unwrap();
        let statement = flatten_statement(&wire).unwrap();
        match &statement {
            Statement::RateBased(s) => assert_eq!(s.evaluation_window_sec, None),
            other => panic!("unexpected statement: {other:?}"),
        }

        let back = serde_json::to_value(expand_statement(&statement)).unwrap();
        assert!(back["RateBasedStatement"].get("EvaluationWindowSec").is_none());
        assert_eq!(back, original);
    }

    #[test]
    fn test_present_but_empty_lists_read_back_as_omitted() {
        let wire: WireRule = serde_json::from_value(json!({
            "Name": "managed",
            "Priority": 1,
            "OverrideAction": { "None": {} },
            "Statement": {
                "ManagedRuleGroupStatement": {
                    "Name": "AWSManagedRulesCommonRuleSet",
                    "VendorName": "AWS",
                    "ExcludedRules": [],
                    "RuleActionOverrides": []
                }
            },
            "RuleLabels": [],
            "VisibilityConfig": {
                "SampledRequestsEnabled": true,
                "CloudWatchMetricsEnabled": true,
                "MetricName": "managed"
            }
        }))
        .unwrap();
        let rule = flatten_rule(&wire).unwrap();
        assert!(rule.rule_labels.is_empty());

        let back = serde_json::to_value(expand_rule(&rule)).unwrap();
        assert!(back.get("RuleLabels").is_none());
        let managed = &back["Statement"]["ManagedRuleGroupStatement"];
        assert!(managed.get("ExcludedRules").is_none());
        assert!(managed.get("RuleActionOverrides").is_none());
        assert_eq!(managed["VendorName"], "AWS");
    }

    #[test]
    fn test_fingerprint_members() {
        let wire: WireRateLimitKey =
            serde_json::from_value(json!({ "JA3Fingerprint": { "FallbackBehavior": "MATCH" } }))
                .unwrap();
        assert!(matches!(
            rate_limit_key(&wire, "CustomKeys[0]").unwrap(),
            RateLimitKey::Ja3Fingerprint { .. }
        ));

        let wire: WireFieldToMatch =
            serde_json::from_value(json!({ "JA4Fingerprint": { "FallbackBehavior": "NO_MATCH" } }))
                .unwrap();
        let field = flatten_field(&wire).unwrap();
        assert_eq!(field.kind(), "ja4_fingerprint");
        assert_eq!(crate::waf::expand::expand_field(&field), wire);
    }

    #[test]
    fn test_account_takeover_config_round_trips() {
        let wire: WireManagedRuleGroupConfig = serde_json::from_value(json!({
            "AWSManagedRulesATPRuleSet": {
                "LoginPath": "/api/login",
                "RequestInspection": {
                    "PayloadType": "JSON",
                    "UsernameField": { "Identifier": "/username" },
                    "PasswordField": { "Identifier": "/password" }
                },
                "ResponseInspection": {
                    "StatusCode": { "SuccessCodes": [200], "FailureCodes": [401, 403] }
                },
                "EnableRegexInPath": false
            }
        }))
        .unwrap();
        let config = managed_config(&wire, "ManagedRuleGroupConfigs[0]").unwrap();
        match &config {
            ManagedRuleGroupConfig::AtpRuleSet(set) => {
                assert_eq!(set.login_path, "/api/login");
                let inspection = set.request_inspection.as_ref().unwrap();
                assert_eq!(inspection.username_field, "/username");
            },
            other => panic!("unexpected config: {other:?}"),
        }

        let mut group = ManagedRuleGroupStatement::new("AWS", "AWSManagedRulesATPRuleSet");
        group.managed_rule_group_configs.push(config);
        let expanded = expand_statement(&Statement::ManagedRuleGroup(Box::new(group)));
        let sent = expanded.managed_rule_group_statement.unwrap();
        assert_eq!(sent.managed_rule_group_configs, vec![wire]);
    }

    #[test]
    fn test_response_inspection_needs_one_member() {
        let wire: WireManagedRuleGroupConfig = serde_json::from_value(json!({
            "AWSManagedRulesACFPRuleSet": {
                "CreationPath": "/signup",
                "RegistrationPagePath": "/register",
                "ResponseInspection": {
                    "BodyContains": { "SuccessStrings": ["welcome"], "FailureStrings": [] },
                    "Header": { "Name": "x-result", "SuccessValues": ["ok"], "FailureValues": [] }
                }
            }
        }))
        .unwrap();
        match managed_config(&wire, "Configs[0]").unwrap_err() {
            WafError::MalformedWire { path, .. } => assert_eq!(
                path,
                "Configs[0].AWSManagedRulesACFPRuleSet.ResponseInspection"
            ),
            other => panic!("unexpected error: {other}"),
        }
    }

    fn wire_web_acl(extra: serde_json::Value) -> WireCollection {
        let mut body = json!({
            "Name": "edge",
            "DefaultAction": { "Allow": {} },
            "Rules": [],
            "VisibilityConfig": {
                "SampledRequestsEnabled": true,
                "CloudWatchMetricsEnabled": true,
                "MetricName": "edge"
            }
        });
        if let (Some(body), Some(extra)) = (body.as_object_mut(), extra.as_object()) {
            body.extend(extra.clone());
        }
        serde_json::from_value(body).unwrap()
    }

    #[test]
    fn test_web_acl_settings_round_trip() {
        let wire = wire_web_acl(json!({
            "ChallengeConfig": { "ImmunityTimeProperty": { "ImmunityTime": 300 } },
            "AssociationConfig": {
                "RequestBody": {
                    "CLOUDFRONT": { "DefaultSizeInspectionLimit": "KB_32" }
                }
            }
        }));
        let collection = flatten_collection(&wire, Scope::Cloudfront).unwrap();
        match &collection.kind {
            CollectionKind::WebAcl {
                captcha_config,
                challenge_config,
                association_config,
                ..
            } => {
                assert!(captcha_config.is_none());
                assert_eq!(challenge_config.as_ref().unwrap().immunity_time, Some(300));
                let limits = &association_config.as_ref().unwrap().request_body;
                assert_eq!(limits[0].resource_type, AssociatedResourceType::Cloudfront);
            },
            other => panic!("unexpected kind: {other:?}"),
        }
        assert_eq!(crate::waf::expand::expand_collection(&collection), wire);
    }

    #[test]
    fn test_unknown_resource_type_is_malformed() {
        let wire = wire_web_acl(json!({
            "AssociationConfig": {
                "RequestBody": { "LOAD_BALANCER": { "DefaultSizeInspectionLimit": "KB_16" } }
            }
        }));
        match flatten_collection(&wire, Scope::Regional).unwrap_err() {
            WafError::MalformedWire { path, .. } => {
                assert_eq!(path, "AssociationConfig.RequestBody.LOAD_BALANCER");
            },
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_rule_group_rejects_web_acl_settings() {
        let mut wire = wire_web_acl(json!({
            "CaptchaConfig": { "ImmunityTimeProperty": { "ImmunityTime": 300 } }
        }));
        wire.default_action = None;
        wire.capacity = Some(100);
        let err = flatten_collection(&wire, Scope::Regional).unwrap_err();
        assert!(err.to_string().contains("CaptchaConfig is only valid on a web ACL"));
    }

    #[test]
    fn test_both_actions_are_malformed() {
        let mut wire = wire_rule("geo", 7);
        wire.override_action = Some(WireOverrideAction {
            count: Some(Empty {}),
            none: None,
        });
        assert!(flatten_rule(&wire).is_err());
    }

    #[test]
    fn test_transformation_order_preserved() {
        let wire: WireStatement = serde_json::from_value(json!({
            "SqliMatchStatement": {
                "FieldToMatch": { "Body": {} },
                "TextTransformations": [
                    { "Priority": 5, "Type": "URL_DECODE" },
                    { "Priority": 2, "Type": "HTML_ENTITY_DECODE" }
                ]
            }
        }))
        .unwrap();
        let statement = flatten_statement(&wire).unwrap();
        match &statement {
            Statement::SqliMatch(s) => assert_eq!(
                s.text_transformations,
                vec![
                    TextTransformation::new(5, TextTransformationType::UrlDecode),
                    TextTransformation::new(2, TextTransformationType::HtmlEntityDecode),
                ]
            ),
            other => panic!("unexpected statement: {other:?}"),
        }
        assert_eq!(expand_statement(&statement), wire);
    }
}
