//! Expand/flatten behavior over whole rules and collections.

use r0n_waf_control::config::{ConfigLoader, ControlPlaneConfig};
use r0n_waf_control::waf::wire::{WireCollection, WireRule, WireStatement};
use r0n_waf_control::waf::*;
use serde_json::json;
use std::collections::BTreeSet;

fn tt(priority: i32, kind: TextTransformationType) -> Vec<TextTransformation> {
    vec![TextTransformation::new(priority, kind)]
}

fn ip_set_arn() -> String {
    "arn:aws:wafv2:eu-west-1:123456789012:regional/ipset/blocked/a1b2".to_string()
}

/// One statement per leaf variant, each with a different field to match.
fn leaves() -> Vec<Statement> {
    vec![
        Statement::ByteMatch(ByteMatchStatement {
            field_to_match: FieldToMatch::AllQueryArguments,
            positional_constraint: PositionalConstraint::ContainsWord,
            search_string: "select".to_string(),
            text_transformations: tt(0, TextTransformationType::Lowercase),
        }),
        Statement::GeoMatch(GeoMatchStatement {
            country_codes: vec!["US".to_string(), "CA".to_string()],
            forwarded_ip_config: Some(ForwardedIpConfig {
                header_name: "X-Forwarded-For".to_string(),
                fallback_behavior: FallbackBehavior::NoMatch,
            }),
        }),
        Statement::IpSetReference(IpSetReferenceStatement {
            arn: ip_set_arn(),
            ip_set_forwarded_ip_config: Some(IpSetForwardedIpConfig {
                header_name: "X-Client-IP".to_string(),
                fallback_behavior: FallbackBehavior::Match,
                position: ForwardedIpPosition::Last,
            }),
        }),
        Statement::LabelMatch(LabelMatchStatement {
            key: "awswaf:managed:aws:bot-control:".to_string(),
            scope: LabelMatchScope::Namespace,
        }),
        Statement::RegexMatch(RegexMatchStatement {
            regex_string: "^/wp-(admin|login)".to_string(),
            field_to_match: FieldToMatch::UriPath,
            text_transformations: tt(1, TextTransformationType::NormalizePath),
        }),
        Statement::RegexPatternSetReference(RegexPatternSetReferenceStatement {
            arn: "arn:aws:wafv2:eu-west-1:123456789012:regional/regexpatternset/x/1".to_string(),
            field_to_match: FieldToMatch::SingleHeader {
                name: "user-agent".to_string(),
            },
            text_transformations: tt(0, TextTransformationType::None),
        }),
        Statement::SizeConstraint(SizeConstraintStatement {
            comparison_operator: ComparisonOperator::Gt,
            size: 8192,
            field_to_match: FieldToMatch::Body {
                oversize_handling: Some(OversizeHandling::Match),
            },
            text_transformations: tt(0, TextTransformationType::None),
        }),
        Statement::SqliMatch(SqliMatchStatement {
            field_to_match: FieldToMatch::JsonBody {
                match_pattern: JsonMatchPattern::IncludedPaths(vec!["/query".to_string()]),
                match_scope: MatchScope::Value,
                invalid_fallback_behavior: Some(BodyParsingFallbackBehavior::EvaluateAsString),
                oversize_handling: Some(OversizeHandling::Continue),
            },
            text_transformations: tt(0, TextTransformationType::UrlDecode),
            sensitivity_level: Some(SensitivityLevel::High),
        }),
        Statement::XssMatch(XssMatchStatement {
            field_to_match: FieldToMatch::Cookies {
                match_pattern: MatchPattern::Excluded(vec!["session".to_string()]),
                match_scope: MatchScope::All,
                oversize_handling: OversizeHandling::NoMatch,
            },
            text_transformations: tt(0, TextTransformationType::HtmlEntityDecode),
        }),
        Statement::XssMatch(XssMatchStatement {
            field_to_match: FieldToMatch::Headers {
                match_pattern: MatchPattern::All,
                match_scope: MatchScope::Key,
                oversize_handling: OversizeHandling::Continue,
            },
            text_transformations: tt(0, TextTransformationType::JsDecode),
        }),
        Statement::SizeConstraint(SizeConstraintStatement {
            comparison_operator: ComparisonOperator::Le,
            size: 0,
            field_to_match: FieldToMatch::HeaderOrder {
                oversize_handling: OversizeHandling::Match,
            },
            text_transformations: tt(0, TextTransformationType::None),
        }),
        Statement::ByteMatch(ByteMatchStatement {
            field_to_match: FieldToMatch::Ja3Fingerprint {
                fallback_behavior: FallbackBehavior::NoMatch,
            },
            positional_constraint: PositionalConstraint::Exactly,
            search_string: "e7d705a3286e19ea42f587b344ee6865".to_string(),
            text_transformations: tt(0, TextTransformationType::None),
        }),
        Statement::ByteMatch(ByteMatchStatement {
            field_to_match: FieldToMatch::Method,
            positional_constraint: PositionalConstraint::Exactly,
            search_string: "TRACE".to_string(),
            text_transformations: tt(0, TextTransformationType::None),
        }),
        Statement::ByteMatch(ByteMatchStatement {
            field_to_match: FieldToMatch::SingleQueryArgument {
                name: "action".to_string(),
            },
            positional_constraint: PositionalConstraint::StartsWith,
            search_string: "exec".to_string(),
            text_transformations: tt(0, TextTransformationType::CmdLine),
        }),
        Statement::ByteMatch(ByteMatchStatement {
            field_to_match: FieldToMatch::QueryString,
            positional_constraint: PositionalConstraint::EndsWith,
            search_string: "..".to_string(),
            text_transformations: tt(0, TextTransformationType::UrlDecodeUni),
        }),
        Statement::ByteMatch(ByteMatchStatement {
            field_to_match: FieldToMatch::Ja4Fingerprint {
                fallback_behavior: FallbackBehavior::Match,
            },
            positional_constraint: PositionalConstraint::Exactly,
            search_string: "t13d1516h2_8daaf6152771_02713d6af862".to_string(),
            text_transformations: tt(0, TextTransformationType::None),
        }),
    ]
}

fn rate_based() -> Statement {
    Statement::RateBased(Box::new(RateBasedStatement {
        limit: 2000,
        aggregate_key_type: AggregateKeyType::CustomKeys,
        evaluation_window_sec: Some(60),
        forwarded_ip_config: None,
        custom_keys: vec![
            RateLimitKey::Header(NamedKey {
                name: "x-api-key".to_string(),
                text_transformations: tt(0, TextTransformationType::None),
            }),
            RateLimitKey::Ip,
            RateLimitKey::HttpMethod,
            RateLimitKey::LabelNamespace {
                namespace: "tenant:".to_string(),
            },
            RateLimitKey::UriPath(TransformedKey {
                text_transformations: tt(0, TextTransformationType::Lowercase),
            }),
        ],
        scope_down_statement: Some(Box::new(Statement::and(vec![
            Statement::not(leaves()[3].clone()),
            leaves()[1].clone(),
        ]))),
    }))
}

fn managed() -> Statement {
    Statement::ManagedRuleGroup(Box::new(ManagedRuleGroupStatement {
        name: "AWSManagedRulesATPRuleSet".to_string(),
        vendor_name: "AWS".to_string(),
        version: Some("Version_1.0".to_string()),
        excluded_rules: vec!["SignalMissingCredential".to_string()],
        rule_action_overrides: vec![RuleActionOverride {
            name: "VolumetricIpHigh".to_string(),
            action_to_use: RuleAction::Captcha {
                custom_request_handling: None,
            },
        }],
        managed_rule_group_configs: vec![
            ManagedRuleGroupConfig::LoginPath("/login".to_string()),
            ManagedRuleGroupConfig::PayloadType(PayloadType::Json),
            ManagedRuleGroupConfig::UsernameField {
                identifier: "/username".to_string(),
            },
            ManagedRuleGroupConfig::PasswordField {
                identifier: "/password".to_string(),
            },
        ],
        scope_down_statement: Some(Box::new(leaves()[0].clone())),
    }))
}

fn account_creation() -> Statement {
    let mut group = ManagedRuleGroupStatement::new("AWS", "AWSManagedRulesACFPRuleSet");
    group.managed_rule_group_configs = vec![ManagedRuleGroupConfig::AcfpRuleSet(AcfpRuleSet {
        creation_path: "/api/accounts".to_string(),
        registration_page_path: "/signup".to_string(),
        request_inspection: Some(AcfpRequestInspection {
            payload_type: PayloadType::FormEncoded,
            username_field: Some("username".to_string()),
            password_field: Some("password".to_string()),
            email_field: Some("email".to_string()),
            phone_number_fields: vec!["phone".to_string()],
            address_fields: vec![],
        }),
        response_inspection: Some(ResponseInspection::Json {
            identifier: "/status".to_string(),
            success_values: vec!["created".to_string()],
            failure_values: vec!["rejected".to_string()],
        }),
        enable_regex_in_path: true,
    })];
    Statement::ManagedRuleGroup(Box::new(group))
}

fn rule_group_reference() -> Statement {
    Statement::RuleGroupReference(RuleGroupReferenceStatement {
        arn: "arn:aws:wafv2:eu-west-1:123456789012:regional/rulegroup/common/c3d4".to_string(),
        excluded_rules: vec![],
        rule_action_overrides: vec![RuleActionOverride {
            name: "legacy".to_string(),
            action_to_use: RuleAction::count(),
        }],
    })
}

fn full_web_acl() -> RuleCollection {
    let mut collection = RuleCollection::web_acl(
        "edge",
        DefaultAction::Block {
            custom_response: Some(CustomResponse {
                response_code: 403,
                custom_response_body_key: Some("denied".to_string()),
                response_headers: vec![CustomHttpHeader::new("x-blocked-by", "waf")],
            }),
        },
    );
    collection.description = Some("edge protection".to_string());
    collection.custom_response_bodies.insert(
        "denied".to_string(),
        CustomResponseBody {
            content_type: ResponseContentType::ApplicationJson,
            content: "{\"error\":\"denied\"}".to_string(),
        },
    );

    for (i, leaf) in leaves().into_iter().enumerate() {
        let mut rule = Rule::new(format!("leaf-{i}"), 10 + i as i32, RuleAction::count(), leaf);
        rule.rule_labels = BTreeSet::from([format!("edge:leaf:{i}")]);
        collection.rules.push(rule);
    }

    let mut nested = Rule::new(
        "nested",
        1,
        RuleAction::Allow {
            custom_request_handling: Some(CustomRequestHandling {
                insert_headers: vec![CustomHttpHeader::new("x-trusted", "1")],
            }),
        },
        Statement::or(vec![
            Statement::and(vec![leaves()[2].clone(), Statement::not(leaves()[4].clone())]),
            leaves()[5].clone(),
        ]),
    );
    nested.captcha_config = Some(ImmunityConfig {
        immunity_time: Some(300),
    });
    nested.challenge_config = Some(ImmunityConfig { immunity_time: None });

    if let CollectionKind::WebAcl {
        captcha_config,
        association_config,
        ..
    } = &mut collection.kind
    {
        *captcha_config = Some(ImmunityConfig {
            immunity_time: Some(600),
        });
        *association_config = Some(AssociationConfig {
            request_body: vec![RequestBodyLimit {
                resource_type: AssociatedResourceType::ApiGateway,
                default_size_inspection_limit: SizeInspectionLimit::Kb64,
            }],
        });
    }

    collection
        .with_rule(Rule::with_override("signup", 5, OverrideAction::Count, account_creation()))
        .with_rule(nested)
        .with_rule(Rule::new("rate", 2, RuleAction::block(), rate_based()))
        .with_rule(Rule::with_override("managed", 3, OverrideAction::None, managed()))
        .with_rule(Rule::with_override(
            "group",
            4,
            OverrideAction::Count,
            rule_group_reference(),
        ))
}

#[test]
fn test_rate_based_rule_end_to_end() {
    let rule = Rule::new(
        "rate-limit",
        1,
        RuleAction::count(),
        Statement::RateBased(Box::new(
            RateBasedStatement::per_ip(10000).with_scope_down(Statement::geo(["US", "NL"])),
        )),
    );

    let wire = Expander::default()
        .expand_rule(&rule, GrammarContext::WebAclRoot)
        .unwrap();
    let json = serde_json::to_value(&wire).unwrap();
    let rate = &json["Statement"]["RateBasedStatement"];
    assert_eq!(rate["Limit"], 10000);
    assert_eq!(rate["AggregateKeyType"], "IP");
    assert_eq!(
        rate["ScopeDownStatement"]["GeoMatchStatement"]["CountryCodes"],
        json!(["US", "NL"])
    );
    assert_eq!(json["Action"], json!({ "Count": {} }));

    assert_eq!(flatten_rule(&wire).unwrap(), rule);
}

#[test]
fn test_every_variant_round_trips() {
    let collection = full_web_acl();
    let wire = Expander::default().expand_collection(&collection).unwrap();
    let flattened = flatten_collection(&wire, Scope::Regional).unwrap();

    let mut expected = collection.clone();
    expected.rules.sort_by_key(|r| r.priority);
    assert_eq!(flattened, expected);
}

#[test]
fn test_wire_round_trips_through_json() {
    let wire = expand_collection(&full_web_acl());
    let json = serde_json::to_string(&wire).unwrap();
    let parsed: WireCollection = serde_json::from_str(&json).unwrap();
    assert_eq!(parsed, wire);

    let again = expand_collection(&flatten_collection(&parsed, Scope::Regional).unwrap());
    let mut sorted = wire.clone();
    sorted.rules.sort_by_key(|r| r.priority);
    assert_eq!(again, sorted);
}

#[test]
fn test_service_document_round_trips() {
    let document = json!({
        "Name": "bots",
        "Priority": 0,
        "OverrideAction": { "None": {} },
        "Statement": {
            "ManagedRuleGroupStatement": {
                "VendorName": "AWS",
                "Name": "AWSManagedRulesBotControlRuleSet",
                "ManagedRuleGroupConfigs": [
                    {
                        "AWSManagedRulesBotControlRuleSet": {
                            "InspectionLevel": "TARGETED",
                            "EnableMachineLearning": true
                        }
                    }
                ],
                "ScopeDownStatement": {
                    "NotStatement": {
                        "Statement": {
                            "ByteMatchStatement": {
                                "FieldToMatch": { "UriPath": {} },
                                "PositionalConstraint": "STARTS_WITH",
                                "SearchString": "L2hlYWx0aA==",
                                "TextTransformations": [{ "Priority": 0, "Type": "NONE" }]
                            }
                        }
                    }
                }
            }
        },
        "VisibilityConfig": {
            "SampledRequestsEnabled": false,
            "CloudWatchMetricsEnabled": true,
            "MetricName": "bots"
        }
    });

    let wire: WireRule = serde_json::from_value(document.clone()).unwrap();
    let rule = flatten_rule(&wire).unwrap();
    match &rule.statement {
        Statement::ManagedRuleGroup(group) => match group.scope_down_statement.as_deref() {
            Some(Statement::Not(not)) => match not.statement.as_ref() {
                Statement::ByteMatch(byte_match) => {
                    assert_eq!(byte_match.search_string, "/health");
                },
                other => panic!("unexpected statement: {other:?}"),
            },
            other => panic!("unexpected scope-down: {other:?}"),
        },
        other => panic!("unexpected statement: {other:?}"),
    }

    let back = Expander::default()
        .expand_rule(&rule, GrammarContext::WebAclRoot)
        .unwrap();
    assert_eq!(serde_json::to_value(back).unwrap(), document);
}

#[test]
fn test_empty_collection_keeps_rule_list() {
    let wire: WireCollection = serde_json::from_value(json!({
        "Name": "empty",
        "Capacity": 10,
        "Rules": [],
        "VisibilityConfig": {
            "SampledRequestsEnabled": false,
            "CloudWatchMetricsEnabled": false,
            "MetricName": "empty"
        }
    }))
    .unwrap();
    let collection = flatten_collection(&wire, Scope::Cloudfront).unwrap();
    assert!(collection.rules.is_empty());

    let config = serde_json::to_value(&collection).unwrap();
    assert_eq!(config["rules"], json!([]));
    assert_eq!(config["scope"], "CLOUDFRONT");

    let expanded = serde_json::to_value(expand_collection(&collection)).unwrap();
    assert_eq!(expanded["Rules"], json!([]));
}

#[test]
fn test_scope_down_cannot_nest_rate_based() {
    let statement = Statement::RateBased(Box::new(
        RateBasedStatement::per_ip(1000).with_scope_down(Statement::RateBased(Box::new(
            RateBasedStatement::per_ip(1000),
        ))),
    ));
    let err = Expander::default()
        .expand(&statement, GrammarContext::WebAclRoot)
        .unwrap_err();
    assert!(matches!(err, WafError::Validation { .. }));

    let managed_in_scope = Statement::ManagedRuleGroup(Box::new(ManagedRuleGroupStatement {
        scope_down_statement: Some(Box::new(managed())),
        ..ManagedRuleGroupStatement::new("AWS", "AWSManagedRulesCommonRuleSet")
    }));
    assert!(Expander::default()
        .expand(&managed_in_scope, GrammarContext::WebAclRoot)
        .is_err());
}

#[test]
fn test_rule_group_root_rejects_root_only_variants() {
    let expander = Expander::default();
    for statement in [rate_based(), managed(), rule_group_reference()] {
        assert!(expander
            .expand(&statement, GrammarContext::RuleGroupRoot)
            .is_err());
        assert!(expander.expand(&statement, GrammarContext::WebAclRoot).is_ok());
    }
}

#[test]
fn test_malformed_wire_statement() {
    let wire: WireStatement = serde_json::from_value(json!({
        "NotStatement": { "Statement": {} }
    }))
    .unwrap();
    match flatten_statement(&wire).unwrap_err() {
        WafError::MalformedWire { path, .. } => {
            assert_eq!(path, "Statement.NotStatement.Statement");
        },
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn test_collection_document_through_loader() {
    let document = r#"
        name = "shop"
        description = "storefront"

        [[web_acl.default_action.block.custom_response]]
        response_code = 429
        custom_response_body_key = "slow"

        [custom_response_bodies.slow]
        content_type = "TEXT_PLAIN"
        content = "slow down"

        [visibility_config]
        sampled_requests_enabled = true
        cloudwatch_metrics_enabled = true
        metric_name = "shop"

        [[rules]]
        name = "throttle"
        priority = 20

        [rules.action.block]

        [rules.statement.rate_based_statement]
        limit = 500
        evaluation_window_sec = 120

        [[rules.statement.rate_based_statement.scope_down_statement]]

        [rules.statement.rate_based_statement.scope_down_statement.byte_match_statement]
        positional_constraint = "STARTS_WITH"
        search_string = "/checkout"
        field_to_match = "uri_path"
        text_transformations = [{ priority = 0, type = "NONE" }]

        [rules.visibility_config]
        sampled_requests_enabled = true
        cloudwatch_metrics_enabled = true
        metric_name = "throttle"

        [[rules]]
        name = "common"
        priority = 10
        override_action = "none"

        [rules.statement.managed_rule_group_statement]
        vendor_name = "AWS"
        name = "AWSManagedRulesCommonRuleSet"

        [rules.visibility_config]
        sampled_requests_enabled = true
        cloudwatch_metrics_enabled = true
        metric_name = "common"
    "#;

    let collection = ConfigLoader::new()
        .load_collection_str(&ControlPlaneConfig::default(), document)
        .unwrap();
    assert_eq!(collection.rules.len(), 2);

    let wire = expand_collection(&collection);
    let json = serde_json::to_value(&wire).unwrap();
    assert_eq!(
        json["DefaultAction"]["Block"]["CustomResponse"]["ResponseCode"],
        429
    );
    assert_eq!(json["Rules"][0]["Name"], "throttle");
    assert_eq!(
        json["Rules"][0]["Statement"]["RateBasedStatement"]["ScopeDownStatement"]
            ["ByteMatchStatement"]["SearchString"],
        "L2NoZWNrb3V0"
    );
    assert_eq!(json["Rules"][1]["OverrideAction"], json!({ "None": {} }));

    let names: Vec<String> = flatten_collection(&wire, Scope::Regional)
        .unwrap()
        .rules
        .into_iter()
        .map(|r| r.name)
        .collect();
    assert_eq!(names, vec!["common", "throttle"]);
}
