//! Web Application Firewall Control Plane
//!
//! Rule statement trees and the collections that hold them:
//! - Statement, field-to-match and action models
//! - Depth-bounded grammar per root context
//! - Expand (configuration tree to wire) and flatten (wire to configuration tree)
//! - Rule-level editing and collection validation
//! - Control API seam with retry and optimistic locking
//! - Rule group associations addressed by web ACL ARN

mod action;
mod association;
mod block;
mod client;
mod collection;
mod composite;
mod error;
mod expand;
mod field;
mod flatten;
mod grammar;
mod retry;
mod rule;
mod state;
mod statement;
pub mod wire;

pub use action::{
    CustomHttpHeader, CustomRequestHandling, CustomResponse, CustomResponseBody, DefaultAction,
    ImmunityConfig, OverrideAction, ResponseContentType, RuleAction,
};
pub use association::{AssociatedGroup, AssociationId, GroupType, RuleGroupAssociation};
pub use client::{
    CollectionClient, CollectionKey, CollectionType, ControlApi, CreatedCollection,
    RemoteCollection,
};
pub use collection::RuleId;
pub use composite::{
    AcfpRequestInspection, AcfpRuleSet, AggregateKeyType, AtpRuleSet, InspectionLevel,
    ManagedRuleGroupConfig, ManagedRuleGroupStatement, NamedKey, PayloadType, RateBasedStatement,
    RateLimitKey, RequestInspection, ResponseInspection, RuleActionOverride,
    RuleGroupReferenceStatement, TransformedKey, EVALUATION_WINDOWS, MAX_CUSTOM_KEYS,
    MAX_RATE_LIMIT, MIN_RATE_LIMIT,
};
pub use error::{Operation, WafError, WafResult};
pub use expand::{
    expand_collection, expand_field, expand_regex_patterns, expand_rule, expand_rule_action,
    expand_rules, expand_statement, expand_transformations, Expander,
};
pub use field::{
    BodyParsingFallbackBehavior, FallbackBehavior, FieldToMatch, JsonMatchPattern, MatchPattern,
    MatchScope, OversizeHandling, TextTransformation, TextTransformationType,
};
pub use flatten::{
    flatten_collection, flatten_field, flatten_regex_patterns, flatten_rule, flatten_rules,
    flatten_statement, flatten_transformations,
};
pub use grammar::{ensure_valid, Grammar, GrammarContext, MAX_SIZE_CONSTRAINT};
pub use retry::RetryPolicy;
pub use rule::{
    AssociatedResourceType, AssociationConfig, CollectionKind, Disposition, LockToken,
    RequestBodyLimit, Rule, RuleCollection, Scope, SizeInspectionLimit, VisibilityConfig,
};
pub use state::CollectionState;
pub use statement::{
    AndStatement, ByteMatchStatement, ComparisonOperator, ForwardedIpConfig, ForwardedIpPosition,
    GeoMatchStatement, IpSetForwardedIpConfig, IpSetReferenceStatement, LabelMatchScope,
    LabelMatchStatement, NotStatement, OrStatement, PositionalConstraint, RegexMatchStatement,
    RegexPatternSetReferenceStatement, SensitivityLevel, SizeConstraintStatement,
    SqliMatchStatement, Statement, VariantTag, XssMatchStatement,
};
