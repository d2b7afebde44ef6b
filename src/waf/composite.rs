//! Root-only statements: rate limiting and rule group evaluation.

use super::action::RuleAction;
use super::block;
use super::field::{FallbackBehavior, TextTransformation};
use super::statement::{ForwardedIpConfig, Statement};
use serde::{Deserialize, Serialize};

/// Allowed rate evaluation windows in seconds
pub const EVALUATION_WINDOWS: [i64; 4] = [60, 120, 300, 600];

/// Lowest accepted request limit
pub const MIN_RATE_LIMIT: i64 = 100;

/// Highest accepted request limit
pub const MAX_RATE_LIMIT: i64 = 2_000_000_000;

/// Maximum number of custom aggregation keys
pub const MAX_CUSTOM_KEYS: usize = 5;

/// How requests are grouped for rate counting
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AggregateKeyType {
    /// Connection source address
    #[default]
    Ip,
    /// Address taken from a header
    ForwardedIp,
    /// Combination of custom keys
    CustomKeys,
    /// Every request in scope shares one counter
    Constant,
}

/// Rate limiting over a request window
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateBasedStatement {
    /// Requests allowed per window per aggregation key
    pub limit: i64,
    /// Grouping mode
    #[serde(default)]
    pub aggregate_key_type: AggregateKeyType,
    /// Window length in seconds, service default when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub evaluation_window_sec: Option<i64>,
    /// Required iff `aggregate_key_type` is `FORWARDED_IP`
    #[serde(default, with = "block")]
    pub forwarded_ip_config: Option<ForwardedIpConfig>,
    /// Required iff `aggregate_key_type` is `CUSTOM_KEYS`
    #[serde(default)]
    pub custom_keys: Vec<RateLimitKey>,
    /// Narrows which requests are counted
    #[serde(default, with = "block")]
    pub scope_down_statement: Option<Box<Statement>>,
}

impl RateBasedStatement {
    /// Per-address limit with the default window and no scope-down
    pub fn per_ip(limit: i64) -> Self {
        Self {
            limit,
            aggregate_key_type: AggregateKeyType::Ip,
            evaluation_window_sec: None,
            forwarded_ip_config: None,
            custom_keys: Vec::new(),
            scope_down_statement: None,
        }
    }

    /// Restrict counting to requests matching `statement`
    #[must_use]
    pub fn with_scope_down(mut self, statement: Statement) -> Self {
        self.scope_down_statement = Some(Box::new(statement));
        self
    }
}

/// Named request component with a transformation chain
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NamedKey {
    /// Cookie, header or argument name
    pub name: String,
    /// Transformation chain
    pub text_transformations: Vec<TextTransformation>,
}

/// Unnamed request component with a transformation chain
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransformedKey {
    /// Transformation chain
    pub text_transformations: Vec<TextTransformation>,
}

/// One component of a custom rate aggregation key
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RateLimitKey {
    /// Cookie value
    Cookie(NamedKey),
    /// Forwarded client address
    ForwardedIp,
    /// HTTP method
    HttpMethod,
    /// Header value
    Header(NamedKey),
    /// Connection source address
    Ip,
    /// TLS client hello fingerprint
    Ja3Fingerprint {
        /// Key value when no fingerprint is available
        fallback_behavior: FallbackBehavior,
    },
    /// TLS client hello fingerprint, JA4 flavor
    Ja4Fingerprint {
        /// Key value when no fingerprint is available
        fallback_behavior: FallbackBehavior,
    },
    /// Labels in a namespace
    LabelNamespace {
        /// Namespace, ending with a colon
        namespace: String,
    },
    /// Query argument value
    QueryArgument(NamedKey),
    /// Raw query string
    QueryString(TransformedKey),
    /// URI path
    UriPath(TransformedKey),
}

impl RateLimitKey {
    /// Configuration name of the populated variant
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Cookie(_) => "cookie",
            Self::ForwardedIp => "forwarded_ip",
            Self::HttpMethod => "http_method",
            Self::Header(_) => "header",
            Self::Ip => "ip",
            Self::Ja3Fingerprint { .. } => "ja3_fingerprint",
            Self::Ja4Fingerprint { .. } => "ja4_fingerprint",
            Self::LabelNamespace { .. } => "label_namespace",
            Self::QueryArgument(_) => "query_argument",
            Self::QueryString(_) => "query_string",
            Self::UriPath(_) => "uri_path",
        }
    }

    /// Transformation chain, for key kinds that carry one
    pub fn text_transformations(&self) -> Option<&[TextTransformation]> {
        match self {
            Self::Cookie(key) | Self::Header(key) | Self::QueryArgument(key) => {
                Some(&key.text_transformations)
            },
            Self::QueryString(key) | Self::UriPath(key) => Some(&key.text_transformations),
            _ => None,
        }
    }
}

/// Replacement action for one rule inside a rule group
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleActionOverride {
    /// Rule name within the group
    pub name: String,
    /// Action to use instead of the rule's own
    pub action_to_use: RuleAction,
}

/// Where a login page expects credentials
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PayloadType {
    /// JSON body
    Json,
    /// URL-encoded form
    FormEncoded,
}

/// Bot control inspection level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum InspectionLevel {
    /// Self-identifying bots
    Common,
    /// Targeted bots as well
    Targeted,
}

/// How a protected login or registration endpoint reports its outcome.
///
/// Exactly one indicator kind per configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseInspection {
    /// Strings in the response body
    BodyContains {
        /// Strings marking success
        #[serde(default)]
        success_strings: Vec<String>,
        /// Strings marking failure
        #[serde(default)]
        failure_strings: Vec<String>,
    },
    /// Value of a response header
    Header {
        /// Header name
        name: String,
        /// Values marking success
        #[serde(default)]
        success_values: Vec<String>,
        /// Values marking failure
        #[serde(default)]
        failure_values: Vec<String>,
    },
    /// Value at a JSON pointer in the response body
    Json {
        /// JSON pointer
        identifier: String,
        /// Values marking success
        #[serde(default)]
        success_values: Vec<String>,
        /// Values marking failure
        #[serde(default)]
        failure_values: Vec<String>,
    },
    /// Response status code
    StatusCode {
        /// Codes marking success
        #[serde(default)]
        success_codes: Vec<i32>,
        /// Codes marking failure
        #[serde(default)]
        failure_codes: Vec<i32>,
    },
}

impl ResponseInspection {
    /// Configuration name of the populated variant
    pub fn kind(&self) -> &'static str {
        match self {
            Self::BodyContains { .. } => "body_contains",
            Self::Header { .. } => "header",
            Self::Json { .. } => "json",
            Self::StatusCode { .. } => "status_code",
        }
    }

    /// Whether any success or failure indicator is configured
    pub fn has_indicators(&self) -> bool {
        match self {
            Self::BodyContains {
                success_strings,
                failure_strings,
            } => !success_strings.is_empty() || !failure_strings.is_empty(),
            Self::Header {
                success_values,
                failure_values,
                ..
            }
            | Self::Json {
                success_values,
                failure_values,
                ..
            } => !success_values.is_empty() || !failure_values.is_empty(),
            Self::StatusCode {
                success_codes,
                failure_codes,
            } => !success_codes.is_empty() || !failure_codes.is_empty(),
        }
    }
}

/// Credential fields of a login request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestInspection {
    /// Credential payload format
    pub payload_type: PayloadType,
    /// Username field identifier
    pub username_field: String,
    /// Password field identifier
    pub password_field: String,
}

/// Fields of an account creation request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AcfpRequestInspection {
    /// Payload format
    pub payload_type: PayloadType,
    /// Username field identifier
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username_field: Option<String>,
    /// Password field identifier
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password_field: Option<String>,
    /// Email field identifier
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email_field: Option<String>,
    /// Phone number field identifiers
    #[serde(default)]
    pub phone_number_fields: Vec<String>,
    /// Address field identifiers
    #[serde(default)]
    pub address_fields: Vec<String>,
}

/// Account takeover prevention settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AtpRuleSet {
    /// Login endpoint path
    pub login_path: String,
    /// Where the credentials are
    #[serde(default, with = "block")]
    pub request_inspection: Option<RequestInspection>,
    /// How login outcomes are reported
    #[serde(default, with = "block")]
    pub response_inspection: Option<ResponseInspection>,
    /// Treat paths as regular expressions
    #[serde(default)]
    pub enable_regex_in_path: bool,
}

/// Account creation fraud prevention settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AcfpRuleSet {
    /// Account creation endpoint path
    pub creation_path: String,
    /// Registration page path
    pub registration_page_path: String,
    /// Where the account fields are
    #[serde(default, with = "block")]
    pub request_inspection: Option<AcfpRequestInspection>,
    /// How creation outcomes are reported
    #[serde(default, with = "block")]
    pub response_inspection: Option<ResponseInspection>,
    /// Treat paths as regular expressions
    #[serde(default)]
    pub enable_regex_in_path: bool,
}

/// Parameter passed to a managed rule group
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ManagedRuleGroupConfig {
    /// Login endpoint path
    LoginPath(String),
    /// Credential payload format
    PayloadType(PayloadType),
    /// Username field identifier
    UsernameField {
        /// JSON pointer or form field name
        identifier: String,
    },
    /// Password field identifier
    PasswordField {
        /// JSON pointer or form field name
        identifier: String,
    },
    /// Bot control settings
    BotControlRuleSet {
        /// Inspection level
        inspection_level: InspectionLevel,
        /// Machine-learning analysis, service default when unset
        #[serde(default, skip_serializing_if = "Option::is_none")]
        enable_machine_learning: Option<bool>,
    },
    /// Account takeover prevention settings
    AtpRuleSet(AtpRuleSet),
    /// Account creation fraud prevention settings
    AcfpRuleSet(AcfpRuleSet),
}

impl ManagedRuleGroupConfig {
    /// Configuration name of the populated variant
    pub fn kind(&self) -> &'static str {
        match self {
            Self::LoginPath(_) => "login_path",
            Self::PayloadType(_) => "payload_type",
            Self::UsernameField { .. } => "username_field",
            Self::PasswordField { .. } => "password_field",
            Self::BotControlRuleSet { .. } => "bot_control_rule_set",
            Self::AtpRuleSet(_) => "atp_rule_set",
            Self::AcfpRuleSet(_) => "acfp_rule_set",
        }
    }
}

/// Evaluate a vendor-managed rule group
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManagedRuleGroupStatement {
    /// Group name
    pub name: String,
    /// Vendor name
    pub vendor_name: String,
    /// Pinned version, latest when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    /// Rules to count instead of applying
    #[serde(default)]
    pub excluded_rules: Vec<String>,
    /// Per-rule action overrides
    #[serde(default)]
    pub rule_action_overrides: Vec<RuleActionOverride>,
    /// Group parameters
    #[serde(default)]
    pub managed_rule_group_configs: Vec<ManagedRuleGroupConfig>,
    /// Narrows which requests the group sees
    #[serde(default, with = "block")]
    pub scope_down_statement: Option<Box<Statement>>,
}

impl ManagedRuleGroupStatement {
    /// Unpinned group with no overrides
    pub fn new(vendor_name: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            vendor_name: vendor_name.into(),
            version: None,
            excluded_rules: Vec::new(),
            rule_action_overrides: Vec::new(),
            managed_rule_group_configs: Vec::new(),
            scope_down_statement: None,
        }
    }
}

/// Evaluate a customer-owned rule group
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleGroupReferenceStatement {
    /// Rule group ARN
    pub arn: String,
    /// Rules to count instead of applying
    #[serde(default)]
    pub excluded_rules: Vec<String>,
    /// Per-rule action overrides
    #[serde(default)]
    pub rule_action_overrides: Vec<RuleActionOverride>,
}
