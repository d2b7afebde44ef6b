//! Rule statement tree
//!
//! A [`Statement`] is a tagged union: exactly one variant is populated per
//! node by construction. Logical connectives own their children directly
//! (`Vec` / `Box`), so the tree is an ordinary owned value that the
//! transforms borrow and never mutate.

use super::block;
use super::composite::{
    ManagedRuleGroupStatement, RateBasedStatement, RuleGroupReferenceStatement,
};
use super::field::{FallbackBehavior, FieldToMatch, TextTransformation};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A single condition node of a rule
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Statement {
    /// All children must match
    #[serde(rename = "and_statement")]
    And(AndStatement),
    /// Any child must match
    #[serde(rename = "or_statement")]
    Or(OrStatement),
    /// The child must not match
    #[serde(rename = "not_statement")]
    Not(NotStatement),
    /// String match against a request component
    #[serde(rename = "byte_match_statement")]
    ByteMatch(ByteMatchStatement),
    /// Country of origin match
    #[serde(rename = "geo_match_statement")]
    GeoMatch(GeoMatchStatement),
    /// Source address in an IP set
    #[serde(rename = "ip_set_reference_statement")]
    IpSetReference(IpSetReferenceStatement),
    /// Label added by an earlier rule
    #[serde(rename = "label_match_statement")]
    LabelMatch(LabelMatchStatement),
    /// Inline regular expression
    #[serde(rename = "regex_match_statement")]
    RegexMatch(RegexMatchStatement),
    /// Regular expressions from a pattern set
    #[serde(rename = "regex_pattern_set_reference_statement")]
    RegexPatternSetReference(RegexPatternSetReferenceStatement),
    /// Component size comparison
    #[serde(rename = "size_constraint_statement")]
    SizeConstraint(SizeConstraintStatement),
    /// SQL injection detection
    #[serde(rename = "sqli_match_statement")]
    SqliMatch(SqliMatchStatement),
    /// Cross-site scripting detection
    #[serde(rename = "xss_match_statement")]
    XssMatch(XssMatchStatement),
    /// Request rate limiting with an optional scope-down condition
    #[serde(rename = "rate_based_statement")]
    RateBased(Box<RateBasedStatement>),
    /// Vendor-managed rule group
    #[serde(rename = "managed_rule_group_statement")]
    ManagedRuleGroup(Box<ManagedRuleGroupStatement>),
    /// Customer rule group
    #[serde(rename = "rule_group_reference_statement")]
    RuleGroupReference(RuleGroupReferenceStatement),
}

/// Discriminant of a [`Statement`], used by the grammar
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum VariantTag {
    /// AND
    And,
    /// OR
    Or,
    /// NOT
    Not,
    /// Byte match
    ByteMatch,
    /// Geo match
    GeoMatch,
    /// IP set reference
    IpSetReference,
    /// Label match
    LabelMatch,
    /// Regex match
    RegexMatch,
    /// Regex pattern set reference
    RegexPatternSetReference,
    /// Size constraint
    SizeConstraint,
    /// SQL injection match
    SqliMatch,
    /// XSS match
    XssMatch,
    /// Rate based
    RateBased,
    /// Managed rule group
    ManagedRuleGroup,
    /// Rule group reference
    RuleGroupReference,
}

impl VariantTag {
    /// Leaf matchers, legal at every depth
    pub const LEAVES: [VariantTag; 9] = [
        Self::ByteMatch,
        Self::GeoMatch,
        Self::IpSetReference,
        Self::LabelMatch,
        Self::RegexMatch,
        Self::RegexPatternSetReference,
        Self::SizeConstraint,
        Self::SqliMatch,
        Self::XssMatch,
    ];

    /// Logical connectives
    pub const LOGICAL: [VariantTag; 3] = [Self::And, Self::Or, Self::Not];

    /// Variants only legal at the root of a web ACL rule
    pub const ROOT_ONLY: [VariantTag; 3] = [
        Self::RateBased,
        Self::ManagedRuleGroup,
        Self::RuleGroupReference,
    ];

    /// Check if this is a leaf matcher
    pub fn is_leaf(&self) -> bool {
        Self::LEAVES.contains(self)
    }

    /// Check if this is a logical connective
    pub fn is_logical(&self) -> bool {
        Self::LOGICAL.contains(self)
    }

    /// Check if this evaluates a rule group
    pub fn is_rule_group(&self) -> bool {
        matches!(self, Self::ManagedRuleGroup | Self::RuleGroupReference)
    }

    /// Configuration block name
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::And => "and_statement",
            Self::Or => "or_statement",
            Self::Not => "not_statement",
            Self::ByteMatch => "byte_match_statement",
            Self::GeoMatch => "geo_match_statement",
            Self::IpSetReference => "ip_set_reference_statement",
            Self::LabelMatch => "label_match_statement",
            Self::RegexMatch => "regex_match_statement",
            Self::RegexPatternSetReference => "regex_pattern_set_reference_statement",
            Self::SizeConstraint => "size_constraint_statement",
            Self::SqliMatch => "sqli_match_statement",
            Self::XssMatch => "xss_match_statement",
            Self::RateBased => "rate_based_statement",
            Self::ManagedRuleGroup => "managed_rule_group_statement",
            Self::RuleGroupReference => "rule_group_reference_statement",
        }
    }
}

impl fmt::Display for VariantTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Statement {
    /// Discriminant of the populated variant
    pub fn tag(&self) -> VariantTag {
        match self {
            Self::And(_) => VariantTag::And,
            Self::Or(_) => VariantTag::Or,
            Self::Not(_) => VariantTag::Not,
            Self::ByteMatch(_) => VariantTag::ByteMatch,
            Self::GeoMatch(_) => VariantTag::GeoMatch,
            Self::IpSetReference(_) => VariantTag::IpSetReference,
            Self::LabelMatch(_) => VariantTag::LabelMatch,
            Self::RegexMatch(_) => VariantTag::RegexMatch,
            Self::RegexPatternSetReference(_) => VariantTag::RegexPatternSetReference,
            Self::SizeConstraint(_) => VariantTag::SizeConstraint,
            Self::SqliMatch(_) => VariantTag::SqliMatch,
            Self::XssMatch(_) => VariantTag::XssMatch,
            Self::RateBased(_) => VariantTag::RateBased,
            Self::ManagedRuleGroup(_) => VariantTag::ManagedRuleGroup,
            Self::RuleGroupReference(_) => VariantTag::RuleGroupReference,
        }
    }

    /// AND over the given children
    pub fn and(statements: Vec<Statement>) -> Self {
        Self::And(AndStatement { statements })
    }

    /// OR over the given children
    pub fn or(statements: Vec<Statement>) -> Self {
        Self::Or(OrStatement { statements })
    }

    /// Negation of `statement`
    pub fn not(statement: Statement) -> Self {
        Self::Not(NotStatement {
            statement: Box::new(statement),
        })
    }

    /// Country match without forwarded IP handling
    pub fn geo<I, S>(country_codes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::GeoMatch(GeoMatchStatement {
            country_codes: country_codes.into_iter().map(Into::into).collect(),
            forwarded_ip_config: None,
        })
    }

    /// Number of nested logical levels below this node
    pub fn logical_depth(&self) -> usize {
        match self {
            Self::And(s) => 1 + max_depth(&s.statements),
            Self::Or(s) => 1 + max_depth(&s.statements),
            Self::Not(s) => 1 + s.statement.logical_depth(),
            _ => 0,
        }
    }
}

fn max_depth(statements: &[Statement]) -> usize {
    statements
        .iter()
        .map(Statement::logical_depth)
        .max()
        .unwrap_or(0)
}

/// Conjunction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AndStatement {
    /// Children, evaluated in order
    pub statements: Vec<Statement>,
}

/// Disjunction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrStatement {
    /// Children, evaluated in order
    pub statements: Vec<Statement>,
}

/// Negation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotStatement {
    /// Negated child
    pub statement: Box<Statement>,
}

/// Where the search string must occur
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PositionalConstraint {
    /// Whole component equals the string
    Exactly,
    /// Component starts with the string
    StartsWith,
    /// Component ends with the string
    EndsWith,
    /// String occurs anywhere
    Contains,
    /// String occurs as a whole word
    ContainsWord,
}

/// Size comparison operator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ComparisonOperator {
    /// Equal
    Eq,
    /// Not equal
    Ne,
    /// Less or equal
    Le,
    /// Less than
    Lt,
    /// Greater or equal
    Ge,
    /// Greater than
    Gt,
}

/// Whether a label match names one label or a namespace
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LabelMatchScope {
    /// Exact label
    Label,
    /// Label namespace
    Namespace,
}

/// SQL injection detection sensitivity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SensitivityLevel {
    /// Fewer false positives
    Low,
    /// More detections
    High,
}

/// Which address of a forwarded-for header an IP set checks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ForwardedIpPosition {
    /// Leftmost address
    First,
    /// Rightmost address
    Last,
    /// Any address in the header
    Any,
}

/// Take the client address from a header instead of the connection
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForwardedIpConfig {
    /// Header carrying the address
    pub header_name: String,
    /// Result when the header is missing or invalid
    pub fallback_behavior: FallbackBehavior,
}

/// Forwarded IP handling for IP set references
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IpSetForwardedIpConfig {
    /// Header carrying the address
    pub header_name: String,
    /// Result when the header is missing or invalid
    pub fallback_behavior: FallbackBehavior,
    /// Address to use from a list
    pub position: ForwardedIpPosition,
}

/// String match
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ByteMatchStatement {
    /// Inspected component
    pub field_to_match: FieldToMatch,
    /// Where the string must occur
    pub positional_constraint: PositionalConstraint,
    /// Text to look for; sent as raw bytes
    pub search_string: String,
    /// Transformation chain
    pub text_transformations: Vec<TextTransformation>,
}

/// Country match
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeoMatchStatement {
    /// ISO 3166 alpha-2 codes
    pub country_codes: Vec<String>,
    /// Forwarded IP handling
    #[serde(default, with = "block")]
    pub forwarded_ip_config: Option<ForwardedIpConfig>,
}

/// IP set membership
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IpSetReferenceStatement {
    /// IP set ARN
    pub arn: String,
    /// Forwarded IP handling
    #[serde(default, with = "block")]
    pub ip_set_forwarded_ip_config: Option<IpSetForwardedIpConfig>,
}

/// Label match
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabelMatchStatement {
    /// Label or namespace string
    pub key: String,
    /// Match kind
    pub scope: LabelMatchScope,
}

/// Inline regular expression
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegexMatchStatement {
    /// Expression
    pub regex_string: String,
    /// Inspected component
    pub field_to_match: FieldToMatch,
    /// Transformation chain
    pub text_transformations: Vec<TextTransformation>,
}

/// Regex pattern set reference
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegexPatternSetReferenceStatement {
    /// Pattern set ARN
    pub arn: String,
    /// Inspected component
    pub field_to_match: FieldToMatch,
    /// Transformation chain
    pub text_transformations: Vec<TextTransformation>,
}

/// Component size comparison
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SizeConstraintStatement {
    /// Operator applied as `component <op> size`
    pub comparison_operator: ComparisonOperator,
    /// Size in bytes
    pub size: i64,
    /// Inspected component
    pub field_to_match: FieldToMatch,
    /// Transformation chain
    pub text_transformations: Vec<TextTransformation>,
}

/// SQL injection detection
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SqliMatchStatement {
    /// Inspected component
    pub field_to_match: FieldToMatch,
    /// Transformation chain
    pub text_transformations: Vec<TextTransformation>,
    /// Detection sensitivity, service default when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sensitivity_level: Option<SensitivityLevel>,
}

/// Cross-site scripting detection
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct XssMatchStatement {
    /// Inspected component
    pub field_to_match: FieldToMatch,
    /// Transformation chain
    pub text_transformations: Vec<TextTransformation>,
}
