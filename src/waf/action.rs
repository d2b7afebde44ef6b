//! Rule actions and their request/response customizations

use super::block;
use serde::{Deserialize, Serialize};

/// Header inserted into a forwarded request or a custom response
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomHttpHeader {
    /// Header name
    pub name: String,
    /// Header value
    pub value: String,
}

impl CustomHttpHeader {
    /// Create a header
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// Headers to add to a request that is let through
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomRequestHandling {
    /// Headers to insert
    pub insert_headers: Vec<CustomHttpHeader>,
}

/// Response returned instead of the default block page
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomResponse {
    /// HTTP status code, 200..=600
    pub response_code: i32,
    /// Key into the collection's custom response bodies
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_response_body_key: Option<String>,
    /// Extra response headers
    #[serde(default)]
    pub response_headers: Vec<CustomHttpHeader>,
}

/// Content type of a custom response body
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ResponseContentType {
    /// text/plain
    TextPlain,
    /// text/html
    TextHtml,
    /// application/json
    ApplicationJson,
}

/// Reusable response body referenced by key from block actions
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomResponseBody {
    /// Body content type
    pub content_type: ResponseContentType,
    /// Body content
    pub content: String,
}

/// Action taken when a rule's statement matches
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleAction {
    /// Let the request through
    Allow {
        /// Headers to add
        #[serde(default, with = "block")]
        custom_request_handling: Option<CustomRequestHandling>,
    },
    /// Reject the request
    Block {
        /// Response to send
        #[serde(default, with = "block")]
        custom_response: Option<CustomResponse>,
    },
    /// Run a CAPTCHA check
    Captcha {
        /// Headers to add
        #[serde(default, with = "block")]
        custom_request_handling: Option<CustomRequestHandling>,
    },
    /// Run a silent browser challenge
    Challenge {
        /// Headers to add
        #[serde(default, with = "block")]
        custom_request_handling: Option<CustomRequestHandling>,
    },
    /// Count and continue
    Count {
        /// Headers to add
        #[serde(default, with = "block")]
        custom_request_handling: Option<CustomRequestHandling>,
    },
}

impl RuleAction {
    /// Plain allow
    pub fn allow() -> Self {
        Self::Allow {
            custom_request_handling: None,
        }
    }

    /// Plain block
    pub fn block() -> Self {
        Self::Block {
            custom_response: None,
        }
    }

    /// Plain count
    pub fn count() -> Self {
        Self::Count {
            custom_request_handling: None,
        }
    }

    /// Custom response body key referenced by a block action
    pub fn response_body_key(&self) -> Option<&str> {
        match self {
            Self::Block {
                custom_response: Some(response),
            } => response.custom_response_body_key.as_deref(),
            _ => None,
        }
    }

    /// Custom response status code, if any
    pub fn response_code(&self) -> Option<i32> {
        match self {
            Self::Block {
                custom_response: Some(response),
            } => Some(response.response_code),
            _ => None,
        }
    }
}

/// Action override for rules that evaluate a rule group
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverrideAction {
    /// Count every match of the group instead of acting on it
    Count,
    /// Keep the group's own actions
    #[default]
    None,
}

/// Action for requests that match no rule of a web ACL
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DefaultAction {
    /// Let the request through
    Allow {
        /// Headers to add
        #[serde(default, with = "block")]
        custom_request_handling: Option<CustomRequestHandling>,
    },
    /// Reject the request
    Block {
        /// Response to send
        #[serde(default, with = "block")]
        custom_response: Option<CustomResponse>,
    },
}

impl DefaultAction {
    /// Custom response body key referenced by a block action
    pub fn response_body_key(&self) -> Option<&str> {
        match self {
            Self::Block {
                custom_response: Some(response),
            } => response.custom_response_body_key.as_deref(),
            _ => None,
        }
    }
}

/// How long a solved CAPTCHA or challenge stays valid
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImmunityConfig {
    /// Seconds, or the service default when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub immunity_time: Option<i64>,
}
