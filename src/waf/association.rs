//! Rule group associations: one rule of a web ACL that evaluates a single
//! rule group, managed through the web ACL's ARN.

use super::action::OverrideAction;
use super::client::{CollectionClient, CollectionKey, CollectionType, ControlApi};
use super::composite::{
    ManagedRuleGroupStatement, RuleActionOverride, RuleGroupReferenceStatement,
};
use super::error::{Operation, WafError, WafResult};
use super::rule::{Rule, RuleCollection, Scope};
use super::state::CollectionState;
use super::statement::Statement;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tracing::{debug, info};

impl CollectionKey {
    /// Key of the web ACL named by `arn`.
    ///
    /// Web ACL ARNs end in `scope/webacl/name/id`, where the scope is
    /// `regional` or `global`.
    ///
    /// # Errors
    ///
    /// Returns [`WafError::Validation`] if `arn` is not a web ACL ARN.
    pub fn from_web_acl_arn(arn: &str) -> WafResult<Self> {
        let invalid =
            || WafError::validation("web_acl_arn", format!("'{arn}' is not a web ACL ARN"));

        let parts: Vec<&str> = arn.splitn(6, ':').collect();
        let ["arn", _, "wafv2", _, _, resource] = parts.as_slice() else {
            return Err(invalid());
        };
        let segments: Vec<&str> = resource.split('/').collect();
        let [scope, "webacl", name, id] = segments.as_slice() else {
            return Err(invalid());
        };
        if name.is_empty() || id.is_empty() {
            return Err(invalid());
        }
        let scope = match *scope {
            "regional" => Scope::Regional,
            "global" => Scope::Cloudfront,
            _ => return Err(invalid()),
        };
        Ok(Self {
            collection_type: CollectionType::WebAcl,
            id: (*id).to_string(),
            name: (*name).to_string(),
            scope,
        })
    }
}

/// Rule group a web ACL rule evaluates
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssociatedGroup {
    /// Customer-owned rule group
    RuleGroupReference {
        /// Rule group ARN
        arn: String,
        /// Per-rule action overrides
        #[serde(default)]
        rule_action_overrides: Vec<RuleActionOverride>,
    },
    /// Vendor-managed rule group
    ManagedRuleGroup {
        /// Vendor name
        vendor_name: String,
        /// Group name
        name: String,
        /// Pinned version, latest when unset
        #[serde(default, skip_serializing_if = "Option::is_none")]
        version: Option<String>,
        /// Per-rule action overrides
        #[serde(default)]
        rule_action_overrides: Vec<RuleActionOverride>,
    },
}

impl AssociatedGroup {
    /// Kind of group this is
    pub fn group_type(&self) -> GroupType {
        match self {
            Self::RuleGroupReference { .. } => GroupType::Custom,
            Self::ManagedRuleGroup { .. } => GroupType::Managed,
        }
    }

    /// ARN for custom groups, `vendor:name[:version]` for managed ones
    pub fn identifier(&self) -> String {
        match self {
            Self::RuleGroupReference { arn, .. } => arn.clone(),
            Self::ManagedRuleGroup {
                vendor_name,
                name,
                version: Some(version),
                ..
            } => format!("{vendor_name}:{name}:{version}"),
            Self::ManagedRuleGroup {
                vendor_name, name, ..
            } => format!("{vendor_name}:{name}"),
        }
    }

    /// Statement evaluating the group
    pub fn to_statement(&self) -> Statement {
        match self {
            Self::RuleGroupReference {
                arn,
                rule_action_overrides,
            } => Statement::RuleGroupReference(RuleGroupReferenceStatement {
                arn: arn.clone(),
                excluded_rules: Vec::new(),
                rule_action_overrides: rule_action_overrides.clone(),
            }),
            Self::ManagedRuleGroup {
                vendor_name,
                name,
                version,
                rule_action_overrides,
            } => {
                let mut group = ManagedRuleGroupStatement::new(vendor_name, name);
                group.version = version.clone();
                group.rule_action_overrides = rule_action_overrides.clone();
                Statement::ManagedRuleGroup(Box::new(group))
            },
        }
    }

    /// Group evaluated by `statement`, if it evaluates one
    pub fn from_statement(statement: &Statement) -> Option<Self> {
        match statement {
            Statement::RuleGroupReference(s) => Some(Self::RuleGroupReference {
                arn: s.arn.clone(),
                rule_action_overrides: s.rule_action_overrides.clone(),
            }),
            Statement::ManagedRuleGroup(s) => Some(Self::ManagedRuleGroup {
                vendor_name: s.vendor_name.clone(),
                name: s.name.clone(),
                version: s.version.clone(),
                rule_action_overrides: s.rule_action_overrides.clone(),
            }),
            _ => None,
        }
    }
}

/// A web ACL rule that evaluates one rule group
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleGroupAssociation {
    /// ARN of the web ACL holding the rule
    pub web_acl_arn: String,
    /// Rule name, unique within the web ACL
    pub rule_name: String,
    /// Rule priority, unique within the web ACL
    pub priority: i32,
    /// Override for the group's actions
    #[serde(default)]
    pub override_action: OverrideAction,
    /// Evaluated group
    #[serde(flatten)]
    pub group: AssociatedGroup,
}

impl RuleGroupAssociation {
    /// Identifier of this association
    pub fn id(&self) -> AssociationId {
        AssociationId {
            web_acl_arn: self.web_acl_arn.clone(),
            rule_name: self.rule_name.clone(),
            group_type: self.group.group_type(),
            group_identifier: self.group.identifier(),
        }
    }

    /// Web ACL rule for this association, metrics named after the rule
    pub fn to_rule(&self) -> Rule {
        Rule::with_override(
            self.rule_name.clone(),
            self.priority,
            self.override_action,
            self.group.to_statement(),
        )
    }

    /// Association described by `rule`, if it evaluates a rule group
    pub fn from_rule(web_acl_arn: impl Into<String>, rule: &Rule) -> Option<Self> {
        Some(Self {
            web_acl_arn: web_acl_arn.into(),
            rule_name: rule.name.clone(),
            priority: rule.priority,
            override_action: rule.override_action().unwrap_or_default(),
            group: AssociatedGroup::from_statement(&rule.statement)?,
        })
    }

    /// Key of the web ACL holding the rule
    ///
    /// # Errors
    ///
    /// Returns [`WafError::Validation`] if the web ACL ARN is malformed.
    pub fn web_acl_key(&self) -> WafResult<CollectionKey> {
        CollectionKey::from_web_acl_arn(&self.web_acl_arn)
    }
}

/// Kind of an associated rule group
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GroupType {
    /// Customer-owned, identified by ARN
    Custom,
    /// Vendor-managed, identified by `vendor:name[:version]`
    Managed,
}

impl GroupType {
    /// Identifier form of the type
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Custom => "custom",
            Self::Managed => "managed",
        }
    }
}

/// Identifier of a rule group association.
///
/// Formatted as `web_acl_arn,rule_name,group_type,group_identifier`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AssociationId {
    /// ARN of the web ACL
    pub web_acl_arn: String,
    /// Rule name
    pub rule_name: String,
    /// Group kind
    pub group_type: GroupType,
    /// Group ARN or `vendor:name[:version]`
    pub group_identifier: String,
}

impl fmt::Display for AssociationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{},{},{},{}",
            self.web_acl_arn,
            self.rule_name,
            self.group_type.as_str(),
            self.group_identifier
        )
    }
}

impl FromStr for AssociationId {
    type Err = WafError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = |message: String| WafError::validation("id", message);

        let parts: Vec<&str> = s.split(',').collect();
        let [arn, rule, kind, identifier] = parts.as_slice() else {
            return Err(invalid(format!(
                "'{s}' is not of the form web_acl_arn,rule_name,group_type,group_identifier"
            )));
        };
        if [arn, rule, identifier].iter().any(|part| part.is_empty()) {
            return Err(invalid(format!("'{s}' has an empty component")));
        }
        CollectionKey::from_web_acl_arn(arn)?;

        let group_type = match *kind {
            "custom" => {
                if !identifier.starts_with("arn:") {
                    return Err(invalid(format!("custom group '{identifier}' must be an ARN")));
                }
                GroupType::Custom
            },
            "managed" => {
                let names: Vec<&str> = identifier.split(':').collect();
                if !(2..=3).contains(&names.len()) || names.iter().any(|n| n.is_empty()) {
                    return Err(invalid(format!(
                        "managed group '{identifier}' is not of the form vendor:name[:version]"
                    )));
                }
                GroupType::Managed
            },
            other => {
                return Err(invalid(format!(
                    "group type '{other}' must be 'custom' or 'managed'"
                )))
            },
        };
        Ok(Self {
            web_acl_arn: (*arn).to_string(),
            rule_name: (*rule).to_string(),
            group_type,
            group_identifier: (*identifier).to_string(),
        })
    }
}

fn check_priority_free(
    collection: &RuleCollection,
    association: &RuleGroupAssociation,
) -> WafResult<()> {
    let clash = collection
        .rules
        .iter()
        .find(|r| r.priority == association.priority && r.name != association.rule_name);
    match clash {
        Some(rule) => Err(WafError::validation(
            "priority",
            format!(
                "rule '{}' already has priority {} in web ACL {}",
                rule.name, association.priority, collection.name
            ),
        )),
        None => Ok(()),
    }
}

impl<A: ControlApi> CollectionClient<A> {
    /// Add a rule evaluating a rule group to an existing web ACL
    ///
    /// # Errors
    ///
    /// Returns `Validation` if the ARN is malformed or the web ACL already
    /// has a rule with the same name or priority, `NotFound` if the web ACL
    /// does not exist, `Conflict` if it changed between the read and the
    /// write, otherwise the last remote error.
    pub async fn associate(
        &self,
        association: &RuleGroupAssociation,
    ) -> WafResult<CollectionState> {
        let key = association.web_acl_key()?;
        let state = self.read(&key).await?;
        if state.collection.rule(&association.rule_name).is_some() {
            return Err(WafError::validation(
                "rule_name",
                format!(
                    "rule '{}' already exists in web ACL {}",
                    association.rule_name, state.collection.name
                ),
            ));
        }
        check_priority_free(&state.collection, association)?;

        let mut collection = state.collection.clone();
        collection.upsert_rule(association.to_rule());
        let updated = self.update(&state, &collection).await?;
        info!("Associated {}", association.id());
        Ok(updated)
    }

    /// Read an association; `None` if the web ACL or its rule is gone
    ///
    /// # Errors
    ///
    /// Returns `Validation` if the ARN is malformed, otherwise any error of
    /// [`CollectionClient::read`] other than `NotFound`.
    pub async fn association(
        &self,
        id: &AssociationId,
    ) -> WafResult<Option<RuleGroupAssociation>> {
        let key = CollectionKey::from_web_acl_arn(&id.web_acl_arn)?;
        let Some(state) = self.find(&key).await? else {
            return Ok(None);
        };
        Ok(state
            .collection
            .rule(&id.rule_name)
            .and_then(|rule| RuleGroupAssociation::from_rule(&id.web_acl_arn, rule)))
    }

    /// Replace the rule of an existing association
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the web ACL has no rule of that name,
    /// `Validation` if another rule holds the priority, `Conflict` if the
    /// web ACL changed between the read and the write, otherwise the last
    /// remote error.
    pub async fn update_association(
        &self,
        association: &RuleGroupAssociation,
    ) -> WafResult<CollectionState> {
        let key = association.web_acl_key()?;
        let state = self.read(&key).await?;
        if state.collection.rule(&association.rule_name).is_none() {
            return Err(WafError::NotFound {
                resource: format!("{key}/{}", association.rule_name),
                operation: Operation::Update,
            });
        }
        check_priority_free(&state.collection, association)?;

        let mut collection = state.collection.clone();
        collection.upsert_rule(association.to_rule());
        self.update(&state, &collection).await
    }

    /// Remove the rule of an association; a missing rule or web ACL succeeds
    ///
    /// # Errors
    ///
    /// Returns `Validation` if the ARN is malformed, `Conflict` if the web
    /// ACL changed between the read and the write, otherwise the last
    /// remote error.
    pub async fn disassociate(&self, id: &AssociationId) -> WafResult<()> {
        let key = CollectionKey::from_web_acl_arn(&id.web_acl_arn)?;
        let Some(state) = self.find(&key).await? else {
            debug!("Web ACL for association {} already deleted", id);
            return Ok(());
        };

        let mut collection = state.collection.clone();
        if collection.remove_rule(&id.rule_name).is_none() {
            debug!("Association {} already removed", id);
            return Ok(());
        }

        match self.update(&state, &collection).await {
            Ok(_) => {
                info!("Disassociated {}", id);
                Ok(())
            },
            Err(e) if e.is_not_found() => Ok(()),
            Err(e) => Err(e),
        }
    }
}
