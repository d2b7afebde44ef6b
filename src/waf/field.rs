//! Request components a matcher inspects, and the text transformations
//! applied to them before matching.

use serde::{Deserialize, Serialize};

/// Transformation applied to the inspected component before matching
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TextTransformationType {
    /// No transformation
    None,
    /// Collapse runs of whitespace
    CompressWhiteSpace,
    /// HTML entity decode
    HtmlEntityDecode,
    /// Lowercase
    Lowercase,
    /// Strip command-line obfuscation
    CmdLine,
    /// URL decode
    UrlDecode,
    /// Base64 decode
    Base64Decode,
    /// Hex decode
    HexDecode,
    /// MD5 digest
    Md5,
    /// Replace C-style comments with a space
    ReplaceComments,
    /// Decode ANSI C escape sequences
    EscapeSeqDecode,
    /// Decode SQL hex literals
    SqlHexDecode,
    /// CSS escape decode
    CssDecode,
    /// JavaScript escape decode
    JsDecode,
    /// Normalize path
    NormalizePath,
    /// Normalize Windows path
    NormalizePathWin,
    /// Remove null bytes
    RemoveNulls,
    /// Replace null bytes with a space
    ReplaceNulls,
    /// Base64 decode, lenient alphabet
    Base64DecodeExt,
    /// URL decode including %u escapes
    UrlDecodeUni,
    /// UTF-8 to Unicode
    Utf8ToUnicode,
}

/// One step of a matcher's transformation chain.
///
/// The remote engine applies steps in ascending `priority`; this crate carries
/// the list in caller order and never sorts it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextTransformation {
    /// Evaluation order among the matcher's transformations
    pub priority: i32,
    /// Transformation kind
    #[serde(rename = "type")]
    pub kind: TextTransformationType,
}

impl TextTransformation {
    /// Create a transformation step
    pub fn new(priority: i32, kind: TextTransformationType) -> Self {
        Self { priority, kind }
    }
}

/// What to do with request components larger than the inspection limit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OversizeHandling {
    /// Inspect what fits
    Continue,
    /// Treat as a match
    Match,
    /// Treat as no match
    NoMatch,
}

/// Which parts of a key/value component are inspected
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MatchScope {
    /// Keys and values
    All,
    /// Keys only
    Key,
    /// Values only
    Value,
}

/// Result to use when a header or fingerprint cannot be evaluated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FallbackBehavior {
    /// Treat as a match
    Match,
    /// Treat as no match
    NoMatch,
}

/// Handling of a JSON body that fails to parse
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BodyParsingFallbackBehavior {
    /// Treat as a match
    Match,
    /// Treat as no match
    NoMatch,
    /// Inspect the body as plain text
    EvaluateAsString,
}

/// Selection of cookies or headers to inspect
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchPattern {
    /// Every entry
    All,
    /// Only these names
    Included(Vec<String>),
    /// Everything except these names
    Excluded(Vec<String>),
}

/// Selection of JSON body elements to inspect
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JsonMatchPattern {
    /// The whole document
    All,
    /// Only these JSON pointers
    IncludedPaths(Vec<String>),
}

/// Part of the web request a matcher inspects.
///
/// Variants without parameters are explicit "present, no parameters"
/// markers; they expand to `{}` on the wire, never to an absent field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldToMatch {
    /// All query arguments
    AllQueryArguments,
    /// Request body
    Body {
        /// Oversize body handling
        #[serde(default, skip_serializing_if = "Option::is_none")]
        oversize_handling: Option<OversizeHandling>,
    },
    /// Request cookies
    Cookies {
        /// Cookies to inspect
        match_pattern: MatchPattern,
        /// Keys, values or both
        match_scope: MatchScope,
        /// Oversize handling
        oversize_handling: OversizeHandling,
    },
    /// Header names in the order they were sent
    HeaderOrder {
        /// Oversize handling
        oversize_handling: OversizeHandling,
    },
    /// Request headers
    Headers {
        /// Headers to inspect
        match_pattern: MatchPattern,
        /// Keys, values or both
        match_scope: MatchScope,
        /// Oversize handling
        oversize_handling: OversizeHandling,
    },
    /// TLS client hello fingerprint
    Ja3Fingerprint {
        /// Result when no fingerprint is available
        fallback_behavior: FallbackBehavior,
    },
    /// TLS client hello fingerprint, JA4 flavor
    Ja4Fingerprint {
        /// Result when no fingerprint is available
        fallback_behavior: FallbackBehavior,
    },
    /// Parsed JSON body
    JsonBody {
        /// Elements to inspect
        match_pattern: JsonMatchPattern,
        /// Keys, values or both
        match_scope: MatchScope,
        /// Behavior on unparseable JSON
        #[serde(default, skip_serializing_if = "Option::is_none")]
        invalid_fallback_behavior: Option<BodyParsingFallbackBehavior>,
        /// Oversize handling
        #[serde(default, skip_serializing_if = "Option::is_none")]
        oversize_handling: Option<OversizeHandling>,
    },
    /// HTTP method
    Method,
    /// Raw query string
    QueryString,
    /// One header by name
    SingleHeader {
        /// Header name, lowercase
        name: String,
    },
    /// One query argument by name
    SingleQueryArgument {
        /// Argument name, lowercase
        name: String,
    },
    /// URI path
    UriPath,
}

impl FieldToMatch {
    /// Configuration name of the populated variant
    pub fn kind(&self) -> &'static str {
        match self {
            Self::AllQueryArguments => "all_query_arguments",
            Self::Body { .. } => "body",
            Self::Cookies { .. } => "cookies",
            Self::HeaderOrder { .. } => "header_order",
            Self::Headers { .. } => "headers",
            Self::Ja3Fingerprint { .. } => "ja3_fingerprint",
            Self::Ja4Fingerprint { .. } => "ja4_fingerprint",
            Self::JsonBody { .. } => "json_body",
            Self::Method => "method",
            Self::QueryString => "query_string",
            Self::SingleHeader { .. } => "single_header",
            Self::SingleQueryArgument { .. } => "single_query_argument",
            Self::UriPath => "uri_path",
        }
    }

    /// Header or argument name for the single-name variants
    pub fn name(&self) -> Option<&str> {
        match self {
            Self::SingleHeader { name } | Self::SingleQueryArgument { name } => Some(name),
            _ => None,
        }
    }
}
