//! Rule-level editing and collection-wide validation.

use super::error::{WafError, WafResult};
use super::grammar::{ensure_valid, Grammar};
use super::rule::{AssociationConfig, CollectionKind, Disposition, Rule, RuleCollection, Scope};
use crate::config::{ValidationError, ValidationResult};
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

/// Allowed custom response status codes
const RESPONSE_CODES: std::ops::RangeInclusive<i32> = 200..=600;

impl RuleCollection {
    /// Find a rule by name
    pub fn rule(&self, name: &str) -> Option<&Rule> {
        self.rules.iter().find(|r| r.name == name)
    }

    /// Replace the rule with the same name, or append it.
    ///
    /// Returns the rule that was replaced.
    pub fn upsert_rule(&mut self, rule: Rule) -> Option<Rule> {
        match self.rules.iter_mut().find(|r| r.name == rule.name) {
            Some(existing) => Some(std::mem::replace(existing, rule)),
            None => {
                self.rules.push(rule);
                None
            },
        }
    }

    /// Remove a rule by name; removing an absent rule is not an error
    pub fn remove_rule(&mut self, name: &str) -> Option<Rule> {
        let index = self.rules.iter().position(|r| r.name == name)?;
        Some(self.rules.remove(index))
    }

    /// Validate every rule against `grammar` plus collection-wide constraints
    pub fn validate(&self, grammar: &Grammar) -> ValidationResult {
        let mut result = ValidationResult::new();

        if self.name.is_empty() {
            result.add_error(ValidationError::error("name", "Collection name cannot be empty"));
        }
        if self.visibility_config.metric_name.is_empty() {
            result.add_error(ValidationError::error(
                "visibility_config.metric_name",
                "Metric name cannot be empty",
            ));
        }
        match &self.kind {
            CollectionKind::WebAcl {
                default_action,
                association_config,
                ..
            } => {
                if let Some(key) = default_action.response_body_key() {
                    self.check_body_key(key, "default_action", &mut result);
                }
                if let Some(config) = association_config {
                    self.check_association(config, &mut result);
                }
            },
            CollectionKind::RuleGroup { capacity } => {
                if *capacity <= 0 {
                    result.add_error(ValidationError::error(
                        "rule_group.capacity",
                        "Capacity must be positive",
                    ));
                }
            },
        }

        let context = self.kind.root_context();
        let mut seen = HashSet::new();
        for rule in &self.rules {
            let path = format!("rules[{}]", rule.name);
            if rule.name.is_empty() {
                result.add_error(ValidationError::error(
                    "rules[].name",
                    "Rule name cannot be empty",
                ));
            }
            if !seen.insert(rule.name.as_str()) {
                result.add_error(ValidationError::error(
                    &path,
                    format!("Duplicate rule name: {}", rule.name),
                ));
            }

            result.merge(grammar.validate_statement(
                &rule.statement,
                context,
                &format!("{path}.statement"),
            ));

            let group = rule.statement.tag().is_rule_group();
            match &rule.disposition {
                Disposition::OverrideAction(_) if !group => {
                    result.add_error(ValidationError::error(
                        format!("{path}.override_action"),
                        "override_action is only allowed for rule group statements",
                    ));
                },
                Disposition::Action(_) if group => {
                    result.add_error(ValidationError::error(
                        format!("{path}.action"),
                        "rule group statements require override_action instead of action",
                    ));
                },
                Disposition::Action(action) => {
                    if let Some(code) = action.response_code() {
                        if !RESPONSE_CODES.contains(&code) {
                            result.add_error(ValidationError::error(
                                format!("{path}.action.block.custom_response.response_code"),
                                format!("{code} is outside 200..=600"),
                            ));
                        }
                    }
                    if let Some(key) = action.response_body_key() {
                        self.check_body_key(key, &format!("{path}.action"), &mut result);
                    }
                },
                Disposition::OverrideAction(_) => {},
            }
        }

        result
    }

    fn check_body_key(&self, key: &str, path: &str, result: &mut ValidationResult) {
        if !self.custom_response_bodies.contains_key(key) {
            result.add_error(ValidationError::error(
                format!("{path}.block.custom_response.custom_response_body_key"),
                format!("'{key}' is not defined in custom_response_bodies"),
            ));
        }
    }

    fn check_association(&self, config: &AssociationConfig, result: &mut ValidationResult) {
        let mut seen = HashSet::new();
        for limit in &config.request_body {
            let path = format!("association_config.request_body[{}]", limit.resource_type);
            if !seen.insert(limit.resource_type) {
                result.add_error(ValidationError::error(&path, "Duplicate resource type"));
            }
            if limit.resource_type.scope() != self.scope {
                result.add_error(ValidationError::error(
                    &path,
                    format!("{} cannot be associated in scope {}", limit.resource_type, self.scope),
                ));
            }
        }
    }

    /// Validate and fail on the first error
    ///
    /// # Errors
    ///
    /// Returns [`WafError::Validation`] for the first violated constraint.
    pub fn check(&self, grammar: &Grammar) -> WafResult<()> {
        ensure_valid(self.validate(grammar))
    }
}

/// Identifier of a single rule inside a web ACL.
///
/// Formatted as `collection_id/collection_name/scope/rule_name`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RuleId {
    /// Collection identifier
    pub collection_id: String,
    /// Collection name
    pub collection_name: String,
    /// Collection scope
    pub scope: Scope,
    /// Rule name
    pub rule_name: String,
}

impl fmt::Display for RuleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{}/{}/{}",
            self.collection_id, self.collection_name, self.scope, self.rule_name
        )
    }
}

impl FromStr for RuleId {
    type Err = WafError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.split('/').collect();
        let [id, name, scope, rule] = parts.as_slice() else {
            return Err(WafError::validation(
                "id",
                format!("'{s}' is not of the form id/name/scope/rule_name"),
            ));
        };
        if [id, name, rule].iter().any(|part| part.is_empty()) {
            return Err(WafError::validation("id", format!("'{s}' has an empty component")));
        }
        let scope = scope
            .parse::<Scope>()
            .map_err(|message| WafError::validation("id", message))?;
        Ok(Self {
            collection_id: (*id).to_string(),
            collection_name: (*name).to_string(),
            scope,
            rule_name: (*rule).to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::waf::action::{
        CustomResponse, CustomResponseBody, DefaultAction, OverrideAction, ResponseContentType,
        RuleAction,
    };
    use crate::waf::composite::{ManagedRuleGroupStatement, RateBasedStatement};
    use crate::waf::rule::{AssociatedResourceType, RequestBodyLimit, SizeInspectionLimit};
    use crate::waf::statement::Statement;

    fn web_acl() -> RuleCollection {
        RuleCollection::web_acl(
            "edge",
            DefaultAction::Allow {
                custom_request_handling: None,
            },
        )
    }

    fn geo_rule(name: &str, priority: i32) -> Rule {
        Rule::new(name, priority, RuleAction::block(), Statement::geo(["US"]))
    }

    #[test]
    fn test_upsert_replaces_by_name() {
        let mut collection = web_acl();
        assert!(collection.upsert_rule(geo_rule("a", 1)).is_none());
        assert!(collection.upsert_rule(geo_rule("b", 2)).is_none());

        let replaced = collection.upsert_rule(geo_rule("a", 9)).unwrap();
        assert_eq!(replaced.priority, 1);
        assert_eq!(collection.rules.len(), 2);
        assert_eq!(collection.rule("a").unwrap().priority, 9);
    }

    #[test]
    fn test_remove_is_idempotent() {
        let mut collection = web_acl().with_rule(geo_rule("a", 1));
        assert!(collection.remove_rule("a").is_some());
        assert!(collection.remove_rule("a").is_none());
        assert!(collection.rules.is_empty());
    }

    #[test]
    fn test_duplicate_names_rejected() {
        let collection = web_acl()
            .with_rule(geo_rule("a", 1))
            .with_rule(geo_rule("a", 2));
        let result = collection.validate(&Grammar::default());
        assert!(!result.is_valid());
        assert!(result.errors()[0].message.contains("Duplicate"));
    }

    #[test]
    fn test_override_action_requires_rule_group_statement() {
        let collection = web_acl().with_rule(Rule::with_override(
            "geo",
            1,
            OverrideAction::Count,
            Statement::geo(["US"]),
        ));
        assert!(collection.check(&Grammar::default()).is_err());

        let managed = Statement::ManagedRuleGroup(Box::new(ManagedRuleGroupStatement::new(
            "AWS",
            "AWSManagedRulesKnownBadInputsRuleSet",
        )));
        let collection = web_acl().with_rule(Rule::with_override(
            "managed",
            1,
            OverrideAction::None,
            managed.clone(),
        ));
        assert!(collection.check(&Grammar::default()).is_ok());

        let collection = web_acl().with_rule(Rule::new("managed", 1, RuleAction::block(), managed));
        assert!(collection.check(&Grammar::default()).is_err());
    }

    #[test]
    fn test_rule_group_rejects_rate_based() {
        let collection = RuleCollection::rule_group("group", 50).with_rule(Rule::new(
            "rate",
            1,
            RuleAction::block(),
            Statement::RateBased(Box::new(RateBasedStatement::per_ip(1000))),
        ));
        let err = collection.check(&Grammar::default()).unwrap_err();
        assert!(err.to_string().contains("rules[rate].statement.rate_based_statement"));
    }

    #[test]
    fn test_response_body_keys_must_exist() {
        let block = RuleAction::Block {
            custom_response: Some(CustomResponse {
                response_code: 429,
                custom_response_body_key: Some("slow-down".to_string()),
                response_headers: vec![],
            }),
        };
        let mut collection =
            web_acl().with_rule(Rule::new("geo", 1, block, Statement::geo(["US"])));
        assert!(collection.check(&Grammar::default()).is_err());

        collection.custom_response_bodies.insert(
            "slow-down".to_string(),
            CustomResponseBody {
                content_type: ResponseContentType::TextPlain,
                content: "slow down".to_string(),
            },
        );
        assert!(collection.check(&Grammar::default()).is_ok());
    }

    #[test]
    fn test_request_body_limits_follow_scope() {
        let limit = |resource_type| RequestBodyLimit {
            resource_type,
            default_size_inspection_limit: SizeInspectionLimit::Kb32,
        };
        let mut collection = web_acl();
        if let CollectionKind::WebAcl {
            association_config, ..
        } = &mut collection.kind
        {
            *association_config = Some(AssociationConfig {
                request_body: vec![
                    limit(AssociatedResourceType::ApiGateway),
                    limit(AssociatedResourceType::CognitoUserPool),
                ],
            });
        }
        assert!(collection.check(&Grammar::default()).is_ok());

        collection.scope = Scope::Cloudfront;
        let result = collection.validate(&Grammar::default());
        assert_eq!(result.errors().len(), 2);
        assert!(result.errors()[0].message.contains("cannot be associated in scope CLOUDFRONT"));

        collection.scope = Scope::Regional;
        if let CollectionKind::WebAcl {
            association_config: Some(config),
            ..
        } = &mut collection.kind
        {
            config.request_body.push(limit(AssociatedResourceType::ApiGateway));
        }
        let err = collection.check(&Grammar::default()).unwrap_err();
        assert!(err.to_string().contains("Duplicate resource type"));
    }

    #[test]
    fn test_rule_id_parse_and_format() {
        let id: RuleId = "a1b2/edge/REGIONAL/block-bots".parse().unwrap();
        assert_eq!(id.collection_id, "a1b2");
        assert_eq!(id.collection_name, "edge");
        assert_eq!(id.scope, Scope::Regional);
        assert_eq!(id.rule_name, "block-bots");
        assert_eq!(id.to_string(), "a1b2/edge/REGIONAL/block-bots");
    }

    #[test]
    fn test_rule_id_rejects_bad_input() {
        assert!("a1b2/edge/REGIONAL".parse::<RuleId>().is_err());
        assert!("a1b2/edge/GLOBAL/rule".parse::<RuleId>().is_err());
        assert!("a1b2//REGIONAL/rule".parse::<RuleId>().is_err());
        assert!("a/b/REGIONAL/c/d".parse::<RuleId>().is_err());
    }
}
