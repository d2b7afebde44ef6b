//! Wire representation exchanged with the remote rule engine.
//!
//! Field names follow the service's JSON schema exactly, including the
//! irregular capitalization of `ARN`, `IPSet*`, `ForwardedIP*`, `JA3*`, `JA4*`,
//! `ACFP`, `ATP` and `HTTPMethod`. Every union is a flat struct of optional members here; the
//! flatten transform is responsible for rejecting objects with zero or
//! several members set.
//!
//! Absent members are omitted, present members without parameters serialize
//! as [`Empty`] (`{}`), and empty optional lists are omitted.

use super::action::ResponseContentType;
use super::composite::{AggregateKeyType, InspectionLevel, PayloadType};
use super::field::{
    BodyParsingFallbackBehavior, FallbackBehavior, MatchScope, OversizeHandling,
    TextTransformationType,
};
use super::rule::SizeInspectionLimit;
use super::statement::{
    ComparisonOperator, ForwardedIpPosition, LabelMatchScope, PositionalConstraint,
    SensitivityLevel,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Present member without parameters, `{}` on the wire
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Empty {}

/// Base64 encoding for binary wire members
pub mod blob {
    use base64::engine::general_purpose::STANDARD;
    use base64::Engine as _;
    use serde::de::Error as _;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&STANDARD.encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        STANDARD.decode(encoded.as_bytes()).map_err(D::Error::custom)
    }
}

/// Transformation step
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct WireTextTransformation {
    pub priority: i32,
    #[serde(rename = "Type")]
    pub kind: TextTransformationType,
}

/// Optional size handling only
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct WireBody {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub oversize_handling: Option<OversizeHandling>,
}

/// Cookie selection; exactly one member
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct WireCookieMatchPattern {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub all: Option<Empty>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub included_cookies: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub excluded_cookies: Option<Vec<String>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct WireCookies {
    pub match_pattern: WireCookieMatchPattern,
    pub match_scope: MatchScope,
    pub oversize_handling: OversizeHandling,
}

/// Header selection; exactly one member
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct WireHeaderMatchPattern {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub all: Option<Empty>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub included_headers: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub excluded_headers: Option<Vec<String>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct WireHeaders {
    pub match_pattern: WireHeaderMatchPattern,
    pub match_scope: MatchScope,
    pub oversize_handling: OversizeHandling,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct WireHeaderOrder {
    pub oversize_handling: OversizeHandling,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct WireFingerprint {
    pub fallback_behavior: FallbackBehavior,
}

/// JSON element selection; exactly one member
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct WireJsonMatchPattern {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub all: Option<Empty>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub included_paths: Option<Vec<String>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct WireJsonBody {
    pub match_pattern: WireJsonMatchPattern,
    pub match_scope: MatchScope,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub invalid_fallback_behavior: Option<BodyParsingFallbackBehavior>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub oversize_handling: Option<OversizeHandling>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct WireNamed {
    pub name: String,
}

/// Inspected request component; exactly one member
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct WireFieldToMatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub all_query_arguments: Option<Empty>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<WireBody>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cookies: Option<WireCookies>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub header_order: Option<WireHeaderOrder>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub headers: Option<WireHeaders>,
    #[serde(
        rename = "JA3Fingerprint",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub ja3_fingerprint: Option<WireFingerprint>,
    #[serde(
        rename = "JA4Fingerprint",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub ja4_fingerprint: Option<WireFingerprint>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub json_body: Option<WireJsonBody>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub method: Option<Empty>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub query_string: Option<Empty>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub single_header: Option<WireNamed>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub single_query_argument: Option<WireNamed>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uri_path: Option<Empty>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct WireForwardedIpConfig {
    pub header_name: String,
    pub fallback_behavior: FallbackBehavior,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct WireIpSetForwardedIpConfig {
    pub header_name: String,
    pub fallback_behavior: FallbackBehavior,
    pub position: ForwardedIpPosition,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct WireStatementList {
    pub statements: Vec<WireStatement>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct WireNotStatement {
    pub statement: Box<WireStatement>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct WireByteMatchStatement {
    pub field_to_match: WireFieldToMatch,
    pub positional_constraint: PositionalConstraint,
    #[serde(with = "blob")]
    pub search_string: Vec<u8>,
    pub text_transformations: Vec<WireTextTransformation>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct WireGeoMatchStatement {
    pub country_codes: Vec<String>,
    #[serde(
        rename = "ForwardedIPConfig",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub forwarded_ip_config: Option<WireForwardedIpConfig>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct WireIpSetReferenceStatement {
    #[serde(rename = "ARN")]
    pub arn: String,
    #[serde(
        rename = "IPSetForwardedIPConfig",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub ip_set_forwarded_ip_config: Option<WireIpSetForwardedIpConfig>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct WireLabelMatchStatement {
    pub key: String,
    pub scope: LabelMatchScope,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct WireRegexMatchStatement {
    pub regex_string: String,
    pub field_to_match: WireFieldToMatch,
    pub text_transformations: Vec<WireTextTransformation>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct WireRegexPatternSetReferenceStatement {
    #[serde(rename = "ARN")]
    pub arn: String,
    pub field_to_match: WireFieldToMatch,
    pub text_transformations: Vec<WireTextTransformation>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct WireSizeConstraintStatement {
    pub comparison_operator: ComparisonOperator,
    pub size: i64,
    pub field_to_match: WireFieldToMatch,
    pub text_transformations: Vec<WireTextTransformation>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct WireSqliMatchStatement {
    pub field_to_match: WireFieldToMatch,
    pub text_transformations: Vec<WireTextTransformation>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sensitivity_level: Option<SensitivityLevel>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct WireXssMatchStatement {
    pub field_to_match: WireFieldToMatch,
    pub text_transformations: Vec<WireTextTransformation>,
}

/// Named key component of a custom rate aggregation key
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct WireNamedKey {
    pub name: String,
    pub text_transformations: Vec<WireTextTransformation>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct WireTransformedKey {
    pub text_transformations: Vec<WireTextTransformation>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct WireLabelNamespace {
    pub namespace: String,
}

/// Custom rate aggregation key; exactly one member
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct WireRateLimitKey {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cookie: Option<WireNamedKey>,
    #[serde(rename = "ForwardedIP", default, skip_serializing_if = "Option::is_none")]
    pub forwarded_ip: Option<Empty>,
    #[serde(rename = "HTTPMethod", default, skip_serializing_if = "Option::is_none")]
    pub http_method: Option<Empty>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub header: Option<WireNamedKey>,
    #[serde(rename = "IP", default, skip_serializing_if = "Option::is_none")]
    pub ip: Option<Empty>,
    #[serde(rename = "JA3Fingerprint", default, skip_serializing_if = "Option::is_none")]
    pub ja3_fingerprint: Option<WireFingerprint>,
    #[serde(rename = "JA4Fingerprint", default, skip_serializing_if = "Option::is_none")]
    pub ja4_fingerprint: Option<WireFingerprint>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label_namespace: Option<WireLabelNamespace>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub query_argument: Option<WireNamedKey>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub query_string: Option<WireTransformedKey>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uri_path: Option<WireTransformedKey>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct WireRateBasedStatement {
    pub limit: i64,
    pub aggregate_key_type: AggregateKeyType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub evaluation_window_sec: Option<i64>,
    #[serde(
        rename = "ForwardedIPConfig",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub forwarded_ip_config: Option<WireForwardedIpConfig>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub custom_keys: Vec<WireRateLimitKey>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope_down_statement: Option<Box<WireStatement>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct WireRuleActionOverride {
    pub name: String,
    pub action_to_use: WireRuleAction,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct WireFieldIdentifier {
    pub identifier: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct WireBotControlRuleSet {
    pub inspection_level: InspectionLevel,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enable_machine_learning: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct WireRequestInspection {
    pub payload_type: PayloadType,
    pub username_field: WireFieldIdentifier,
    pub password_field: WireFieldIdentifier,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct WireRequestInspectionAcfp {
    pub payload_type: PayloadType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username_field: Option<WireFieldIdentifier>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password_field: Option<WireFieldIdentifier>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email_field: Option<WireFieldIdentifier>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub phone_number_fields: Vec<WireFieldIdentifier>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub address_fields: Vec<WireFieldIdentifier>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct WireBodyContains {
    #[serde(default)]
    pub success_strings: Vec<String>,
    #[serde(default)]
    pub failure_strings: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct WireResponseHeader {
    pub name: String,
    #[serde(default)]
    pub success_values: Vec<String>,
    #[serde(default)]
    pub failure_values: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct WireResponseJson {
    pub identifier: String,
    #[serde(default)]
    pub success_values: Vec<String>,
    #[serde(default)]
    pub failure_values: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct WireStatusCode {
    #[serde(default)]
    pub success_codes: Vec<i32>,
    #[serde(default)]
    pub failure_codes: Vec<i32>,
}

/// Login or registration outcome indicator; exactly one member
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct WireResponseInspection {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body_contains: Option<WireBodyContains>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub header: Option<WireResponseHeader>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub json: Option<WireResponseJson>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status_code: Option<WireStatusCode>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct WireAtpRuleSet {
    pub login_path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_inspection: Option<WireRequestInspection>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_inspection: Option<WireResponseInspection>,
    #[serde(default)]
    pub enable_regex_in_path: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct WireAcfpRuleSet {
    pub creation_path: String,
    pub registration_page_path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_inspection: Option<WireRequestInspectionAcfp>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_inspection: Option<WireResponseInspection>,
    #[serde(default)]
    pub enable_regex_in_path: bool,
}

/// Managed rule group parameter; exactly one member
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct WireManagedRuleGroupConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub login_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload_type: Option<PayloadType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username_field: Option<WireFieldIdentifier>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password_field: Option<WireFieldIdentifier>,
    #[serde(
        rename = "AWSManagedRulesBotControlRuleSet",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub bot_control_rule_set: Option<WireBotControlRuleSet>,
    #[serde(
        rename = "AWSManagedRulesATPRuleSet",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub atp_rule_set: Option<WireAtpRuleSet>,
    #[serde(
        rename = "AWSManagedRulesACFPRuleSet",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub acfp_rule_set: Option<WireAcfpRuleSet>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct WireManagedRuleGroupStatement {
    pub name: String,
    pub vendor_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub excluded_rules: Vec<WireNamed>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub rule_action_overrides: Vec<WireRuleActionOverride>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub managed_rule_group_configs: Vec<WireManagedRuleGroupConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope_down_statement: Option<Box<WireStatement>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct WireRuleGroupReferenceStatement {
    #[serde(rename = "ARN")]
    pub arn: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub excluded_rules: Vec<WireNamed>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub rule_action_overrides: Vec<WireRuleActionOverride>,
}

/// Statement node; exactly one member
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct WireStatement {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub and_statement: Option<WireStatementList>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub or_statement: Option<WireStatementList>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub not_statement: Option<WireNotStatement>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub byte_match_statement: Option<WireByteMatchStatement>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub geo_match_statement: Option<WireGeoMatchStatement>,
    #[serde(
        rename = "IPSetReferenceStatement",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub ip_set_reference_statement: Option<WireIpSetReferenceStatement>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label_match_statement: Option<WireLabelMatchStatement>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub regex_match_statement: Option<WireRegexMatchStatement>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub regex_pattern_set_reference_statement: Option<WireRegexPatternSetReferenceStatement>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size_constraint_statement: Option<WireSizeConstraintStatement>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sqli_match_statement: Option<WireSqliMatchStatement>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub xss_match_statement: Option<WireXssMatchStatement>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rate_based_statement: Option<Box<WireRateBasedStatement>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub managed_rule_group_statement: Option<Box<WireManagedRuleGroupStatement>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rule_group_reference_statement: Option<WireRuleGroupReferenceStatement>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct WireCustomHttpHeader {
    pub name: String,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct WireCustomRequestHandling {
    pub insert_headers: Vec<WireCustomHttpHeader>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct WireCustomResponse {
    pub response_code: i32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_response_body_key: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub response_headers: Vec<WireCustomHttpHeader>,
}

/// Allow, count, CAPTCHA or challenge parameters
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct WireRequestAction {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_request_handling: Option<WireCustomRequestHandling>,
}

/// Block parameters
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct WireBlockAction {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_response: Option<WireCustomResponse>,
}

/// Rule action; exactly one member
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct WireRuleAction {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allow: Option<WireRequestAction>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub block: Option<WireBlockAction>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub captcha: Option<WireRequestAction>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub challenge: Option<WireRequestAction>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub count: Option<WireRequestAction>,
}

/// Override action; exactly one member
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct WireOverrideAction {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub count: Option<Empty>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub none: Option<Empty>,
}

/// Default action; exactly one member
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct WireDefaultAction {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allow: Option<WireRequestAction>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub block: Option<WireBlockAction>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct WireVisibilityConfig {
    pub sampled_requests_enabled: bool,
    #[serde(rename = "CloudWatchMetricsEnabled")]
    pub cloudwatch_metrics_enabled: bool,
    pub metric_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct WireImmunityTimeProperty {
    pub immunity_time: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct WireImmunityConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub immunity_time_property: Option<WireImmunityTimeProperty>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct WireRule {
    pub name: String,
    pub priority: i32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action: Option<WireRuleAction>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub override_action: Option<WireOverrideAction>,
    pub statement: WireStatement,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub rule_labels: Vec<WireNamed>,
    pub visibility_config: WireVisibilityConfig,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub captcha_config: Option<WireImmunityConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub challenge_config: Option<WireImmunityConfig>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct WireCustomResponseBody {
    pub content_type: ResponseContentType,
    pub content: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct WireRequestBodyConfig {
    pub default_size_inspection_limit: SizeInspectionLimit,
}

/// Request body limits keyed by resource type name
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct WireAssociationConfig {
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub request_body: BTreeMap<String, WireRequestBodyConfig>,
}

/// Web ACL or rule group body.
///
/// Web ACLs carry `DefaultAction` and the web ACL level settings, rule
/// groups carry `Capacity`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct WireCollection {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_action: Option<WireDefaultAction>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub capacity: Option<i64>,
    pub rules: Vec<WireRule>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub custom_response_bodies: BTreeMap<String, WireCustomResponseBody>,
    pub visibility_config: WireVisibilityConfig,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub captcha_config: Option<WireImmunityConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub challenge_config: Option<WireImmunityConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub association_config: Option<WireAssociationConfig>,
}

/// One entry of a regex pattern set
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct WireRegex {
    pub regex_string: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_empty_marker_is_object() {
        let field = WireFieldToMatch {
            all_query_arguments: Some(Empty {}),
            ..WireFieldToMatch::default()
        };
        assert_eq!(
            serde_json::to_value(&field).unwrap(),
            json!({ "AllQueryArguments": {} })
        );
    }

    #[test]
    fn test_irregular_member_names() {
        let statement: WireStatement = serde_json::from_value(json!({
            "IPSetReferenceStatement": {
                "ARN": "arn:aws:wafv2:us-east-1:123456789012:regional/ipset/x/1",
                "IPSetForwardedIPConfig": {
                    "HeaderName": "X-Forwarded-For",
                    "FallbackBehavior": "MATCH",
                    "Position": "FIRST"
                }
            }
        }))
        .unwrap();
        let reference = statement.ip_set_reference_statement.unwrap();
        assert_eq!(
            reference.ip_set_forwarded_ip_config.unwrap().position,
            ForwardedIpPosition::First
        );
    }

    #[test]
    fn test_search_string_is_base64() {
        let statement = WireByteMatchStatement {
            field_to_match: WireFieldToMatch {
                uri_path: Some(Empty {}),
                ..WireFieldToMatch::default()
            },
            positional_constraint: PositionalConstraint::StartsWith,
            search_string: b"/admin".to_vec(),
            text_transformations: vec![WireTextTransformation {
                priority: 0,
                kind: TextTransformationType::None,
            }],
        };
        let json = serde_json::to_value(&statement).unwrap();
        assert_eq!(json["SearchString"], "L2FkbWlu");
        assert_eq!(json["TextTransformations"][0]["Type"], "NONE");

        let back: WireByteMatchStatement = serde_json::from_value(json).unwrap();
        assert_eq!(back.search_string, b"/admin");
    }

    #[test]
    fn test_managed_rule_set_member_names() {
        let config: WireManagedRuleGroupConfig = serde_json::from_value(json!({
            "AWSManagedRulesACFPRuleSet": {
                "CreationPath": "/signup",
                "RegistrationPagePath": "/register",
                "RequestInspection": {
                    "PayloadType": "JSON",
                    "EmailField": { "Identifier": "/email" },
                    "PhoneNumberFields": [{ "Identifier": "/phone" }]
                },
                "EnableRegexInPath": true
            }
        }))
        .unwrap();
        let acfp = config.acfp_rule_set.unwrap();
        assert!(acfp.enable_regex_in_path);
        let inspection = acfp.request_inspection.unwrap();
        assert_eq!(inspection.email_field.unwrap().identifier, "/email");
        assert_eq!(inspection.phone_number_fields.len(), 1);
        assert!(inspection.address_fields.is_empty());
    }

    #[test]
    fn test_rate_window_is_optional() {
        let statement: WireRateBasedStatement = serde_json::from_value(json!({
            "Limit": 10000,
            "AggregateKeyType": "IP"
        }))
        .unwrap();
        assert_eq!(statement.evaluation_window_sec, None);
        let json = serde_json::to_value(&statement).unwrap();
        assert!(json.get("EvaluationWindowSec").is_none());
    }

    #[test]
    fn test_invalid_base64_rejected() {
        let result: Result<WireByteMatchStatement, _> = serde_json::from_value(json!({
            "FieldToMatch": { "UriPath": {} },
            "PositionalConstraint": "EXACTLY",
            "SearchString": "not base64!",
            "TextTransformations": []
        }));
        assert!(result.is_err());
    }
}
