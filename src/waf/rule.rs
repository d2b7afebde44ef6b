//! Rules and rule collections (web ACLs and rule groups).

use super::action::{CustomResponseBody, DefaultAction, ImmunityConfig, OverrideAction, RuleAction};
use super::block;
use super::grammar::GrammarContext;
use super::statement::Statement;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// Metrics and sampling settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VisibilityConfig {
    /// Store samples of matching requests
    pub sampled_requests_enabled: bool,
    /// Publish metrics
    pub cloudwatch_metrics_enabled: bool,
    /// Metric name
    pub metric_name: String,
}

impl VisibilityConfig {
    /// Metrics and sampling on, under `metric_name`
    pub fn enabled(metric_name: impl Into<String>) -> Self {
        Self {
            sampled_requests_enabled: true,
            cloudwatch_metrics_enabled: true,
            metric_name: metric_name.into(),
        }
    }
}

/// What a rule does on match.
///
/// Rules whose statement evaluates a rule group carry an override action;
/// every other rule carries a plain action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Disposition {
    /// Action for ordinary rules
    Action(RuleAction),
    /// Override for rule group evaluation
    OverrideAction(OverrideAction),
}

/// A named, prioritized condition with its action
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rule {
    /// Unique within the collection
    pub name: String,
    /// Evaluation order, lower first
    pub priority: i32,
    /// Action or override action
    #[serde(flatten)]
    pub disposition: Disposition,
    /// Root condition
    pub statement: Statement,
    /// Labels added to matching requests
    #[serde(default)]
    pub rule_labels: BTreeSet<String>,
    /// Metrics settings
    pub visibility_config: VisibilityConfig,
    /// CAPTCHA immunity override
    #[serde(default, with = "block")]
    pub captcha_config: Option<ImmunityConfig>,
    /// Challenge immunity override
    #[serde(default, with = "block")]
    pub challenge_config: Option<ImmunityConfig>,
}

impl Rule {
    /// Rule with a plain action, metrics named after the rule
    pub fn new(
        name: impl Into<String>,
        priority: i32,
        action: RuleAction,
        statement: Statement,
    ) -> Self {
        let name = name.into();
        Self {
            visibility_config: VisibilityConfig::enabled(name.clone()),
            name,
            priority,
            disposition: Disposition::Action(action),
            statement,
            rule_labels: BTreeSet::new(),
            captcha_config: None,
            challenge_config: None,
        }
    }

    /// Rule evaluating a rule group under an override action
    pub fn with_override(
        name: impl Into<String>,
        priority: i32,
        override_action: OverrideAction,
        statement: Statement,
    ) -> Self {
        let mut rule = Self::new(name, priority, RuleAction::count(), statement);
        rule.disposition = Disposition::OverrideAction(override_action);
        rule
    }

    /// Plain action, if this rule has one
    pub fn action(&self) -> Option<&RuleAction> {
        match &self.disposition {
            Disposition::Action(action) => Some(action),
            Disposition::OverrideAction(_) => None,
        }
    }

    /// Override action, if this rule has one
    pub fn override_action(&self) -> Option<OverrideAction> {
        match &self.disposition {
            Disposition::OverrideAction(action) => Some(*action),
            Disposition::Action(_) => None,
        }
    }
}

/// Where a collection is deployed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Scope {
    /// Regional resources
    #[default]
    Regional,
    /// CDN distributions
    Cloudfront,
}

impl Scope {
    /// Service name of the scope
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Regional => "REGIONAL",
            Self::Cloudfront => "CLOUDFRONT",
        }
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Scope {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "REGIONAL" => Ok(Self::Regional),
            "CLOUDFRONT" => Ok(Self::Cloudfront),
            other => Err(format!("unknown scope '{other}'")),
        }
    }
}

/// Collection flavor and its flavor-specific settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CollectionKind {
    /// Web ACL attached to protected resources
    WebAcl {
        /// Action when no rule matches
        default_action: DefaultAction,
        /// CAPTCHA immunity for rules without their own setting
        #[serde(default, with = "block")]
        captcha_config: Option<ImmunityConfig>,
        /// Challenge immunity for rules without their own setting
        #[serde(default, with = "block")]
        challenge_config: Option<ImmunityConfig>,
        /// Request body inspection limits per protected resource type
        #[serde(default, with = "block")]
        association_config: Option<AssociationConfig>,
    },
    /// Reusable rule group
    RuleGroup {
        /// Capacity units reserved for the group
        capacity: i64,
    },
}

impl CollectionKind {
    /// Grammar context for the root statement of this kind's rules
    pub fn root_context(&self) -> GrammarContext {
        match self {
            Self::WebAcl { .. } => GrammarContext::WebAclRoot,
            Self::RuleGroup { .. } => GrammarContext::RuleGroupRoot,
        }
    }

    /// Human readable kind
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::WebAcl { .. } => "web_acl",
            Self::RuleGroup { .. } => "rule_group",
        }
    }
}

/// Resource type a web ACL can protect
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AssociatedResourceType {
    /// CDN distribution
    Cloudfront,
    /// REST API stage
    ApiGateway,
    /// User pool
    CognitoUserPool,
    /// Container service
    AppRunnerService,
    /// Verified access instance
    VerifiedAccessInstance,
}

impl AssociatedResourceType {
    /// Every resource type
    pub const ALL: [Self; 5] = [
        Self::Cloudfront,
        Self::ApiGateway,
        Self::CognitoUserPool,
        Self::AppRunnerService,
        Self::VerifiedAccessInstance,
    ];

    /// Service name of the resource type
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Cloudfront => "CLOUDFRONT",
            Self::ApiGateway => "API_GATEWAY",
            Self::CognitoUserPool => "COGNITO_USER_POOL",
            Self::AppRunnerService => "APP_RUNNER_SERVICE",
            Self::VerifiedAccessInstance => "VERIFIED_ACCESS_INSTANCE",
        }
    }

    /// Scope of the web ACLs that can protect this resource type
    pub fn scope(&self) -> Scope {
        match self {
            Self::Cloudfront => Scope::Cloudfront,
            _ => Scope::Regional,
        }
    }
}

impl fmt::Display for AssociatedResourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for AssociatedResourceType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| format!("unknown resource type '{s}'"))
    }
}

/// Request body bytes inspected before oversize handling applies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SizeInspectionLimit {
    /// 16 KB
    #[serde(rename = "KB_16")]
    Kb16,
    /// 32 KB
    #[serde(rename = "KB_32")]
    Kb32,
    /// 48 KB
    #[serde(rename = "KB_48")]
    Kb48,
    /// 64 KB
    #[serde(rename = "KB_64")]
    Kb64,
}

/// Body inspection limit for one protected resource type
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestBodyLimit {
    /// Protected resource type
    pub resource_type: AssociatedResourceType,
    /// Inspection limit
    pub default_size_inspection_limit: SizeInspectionLimit,
}

/// Web ACL settings that depend on the protected resource type
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssociationConfig {
    /// At most one entry per resource type
    #[serde(default)]
    pub request_body: Vec<RequestBodyLimit>,
}

/// Ordered set of rules sharing one visibility configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleCollection {
    /// Collection name
    pub name: String,
    /// Free-form description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Deployment scope
    #[serde(default)]
    pub scope: Scope,
    /// Web ACL or rule group settings
    #[serde(flatten)]
    pub kind: CollectionKind,
    /// Rules; order carries no meaning, priority does
    #[serde(default)]
    pub rules: Vec<Rule>,
    /// Response bodies referenced by key from block actions
    #[serde(default)]
    pub custom_response_bodies: BTreeMap<String, CustomResponseBody>,
    /// Metrics settings
    pub visibility_config: VisibilityConfig,
}

impl RuleCollection {
    /// Empty web ACL
    pub fn web_acl(name: impl Into<String>, default_action: DefaultAction) -> Self {
        Self::empty(
            name.into(),
            CollectionKind::WebAcl {
                default_action,
                captcha_config: None,
                challenge_config: None,
                association_config: None,
            },
        )
    }

    /// Empty rule group
    pub fn rule_group(name: impl Into<String>, capacity: i64) -> Self {
        Self::empty(name.into(), CollectionKind::RuleGroup { capacity })
    }

    fn empty(name: String, kind: CollectionKind) -> Self {
        Self {
            visibility_config: VisibilityConfig::enabled(name.clone()),
            name,
            description: None,
            scope: Scope::Regional,
            kind,
            rules: Vec::new(),
            custom_response_bodies: BTreeMap::new(),
        }
    }

    /// Add a rule, builder style
    #[must_use]
    pub fn with_rule(mut self, rule: Rule) -> Self {
        self.rules.push(rule);
        self
    }
}

/// Opaque version stamp for optimistic concurrency
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LockToken(String);

impl LockToken {
    /// Wrap a token returned by the service
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// Raw token
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for LockToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_rule() -> Rule {
        Rule::new("geo", 3, RuleAction::block(), Statement::geo(["US"]))
    }

    #[test]
    fn test_rule_disposition_accessors() {
        let rule = sample_rule();
        assert_eq!(rule.action(), Some(&RuleAction::block()));
        assert_eq!(rule.override_action(), None);

        let rule = Rule::with_override(
            "managed",
            1,
            OverrideAction::None,
            Statement::geo(["US"]),
        );
        assert_eq!(rule.override_action(), Some(OverrideAction::None));
        assert!(rule.action().is_none());
    }

    #[test]
    fn test_rule_config_document() {
        let json = serde_json::to_value(sample_rule()).unwrap();
        assert_eq!(json["name"], "geo");
        assert_eq!(json["priority"], 3);
        assert!(json["action"]["block"].is_object());
        assert!(json.get("override_action").is_none());
        assert_eq!(json["captcha_config"], serde_json::json!([]));
        assert_eq!(json["rule_labels"], serde_json::json!([]));

        let back: Rule = serde_json::from_value(json).unwrap();
        assert_eq!(back, sample_rule());
    }

    #[test]
    fn test_empty_collection_serializes_rules() {
        let collection = RuleCollection::rule_group("group", 100);
        let json = serde_json::to_value(&collection).unwrap();
        assert_eq!(json["rules"], serde_json::json!([]));
        assert_eq!(json["rule_group"]["capacity"], 100);
        assert_eq!(collection.kind.root_context(), GrammarContext::RuleGroupRoot);
    }

    #[test]
    fn test_scope_parse() {
        assert_eq!("CLOUDFRONT".parse::<Scope>().unwrap(), Scope::Cloudfront);
        assert!("global".parse::<Scope>().is_err());
        assert_eq!(Scope::Regional.to_string(), "REGIONAL");
    }

    #[test]
    fn test_resource_type_names() {
        for resource_type in AssociatedResourceType::ALL {
            let json = serde_json::to_value(resource_type).unwrap();
            assert_eq!(json, resource_type.as_str());
            let parsed = resource_type.as_str().parse::<AssociatedResourceType>();
            assert_eq!(parsed, Ok(resource_type));
        }
        assert_eq!(AssociatedResourceType::Cloudfront.scope(), Scope::Cloudfront);
        assert_eq!(AssociatedResourceType::CognitoUserPool.scope(), Scope::Regional);
        assert_eq!(
            serde_json::to_value(SizeInspectionLimit::Kb48).unwrap(),
            serde_json::json!("KB_48")
        );
    }

    #[test]
    fn test_web_acl_settings_default_to_absent() {
        let collection: RuleCollection = serde_json::from_value(serde_json::json!({
            "name": "edge",
            "web_acl": { "default_action": { "allow": {} } },
            "visibility_config": {
                "sampled_requests_enabled": true,
                "cloudwatch_metrics_enabled": true,
                "metric_name": "edge"
            }
        }))
        .unwrap();
        assert_eq!(
            collection,
            RuleCollection::web_acl(
                "edge",
                DefaultAction::Allow {
                    custom_request_handling: None
                }
            )
        );
    }
}
