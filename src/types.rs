// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

/**
 * Bountyy Oy - Kettu Core Types
 * Scan results, discovered parameters and proof-of-concept records
 *
 * @copyright 2026 Bountyy Oy
 * @license Proprietary
 */

use serde::{Deserialize, Serialize};

/// Special characters probed per parameter during discovery.
///
/// A character that reflects unmodified lands in `ParamResult::chars`; one
/// the server transforms lands in `ParamResult::bad_chars` and prunes any
/// payload containing it.
pub const CHAR_ALPHABET: &[char] = &[
    '<', '>', '"', '\'', '`', ';', '|', '(', ')', '{', '}', '[', ']', ':', '.', '+', '-', '=',
    '$',
];

/// Marker class carried by event-handler payloads. A parsed response that
/// contains a rendered element with this class is a DOM-level verdict.
pub const DOM_MARKER_CLASS: &str = "kettu";

/// Sentinel param name for header-level blind probes.
pub const HEADER_PROBE_PARAM: &str = "(header:referer)";

/// Sentinel param name for path-segment probes.
pub const PATH_PROBE_PARAM: &str = "(path)";

/// Where a parameter was found on the target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParamLocation {
    Query,
    Fragment,
    Body,
}

impl std::fmt::Display for ParamLocation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ParamLocation::Query => write!(f, "query"),
            ParamLocation::Fragment => write!(f, "fragment"),
            ParamLocation::Body => write!(f, "body"),
        }
    }
}

/// Discovery output for a single parameter. Read-only after discovery.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParamResult {
    pub name: String,
    pub location: ParamLocation,
    pub reflected: bool,
    /// Alphabet characters the server reflects unmodified.
    pub chars: Vec<String>,
    /// Probed characters the server filtered or escaped.
    pub bad_chars: Vec<String>,
    /// Injection context tags observed for the reflection point,
    /// e.g. `inHTML`, `inJS-double`, `inATTR`.
    pub injected_contexts: Vec<String>,
    /// Parameter sub-type tag (currently `NUM` for numeric values).
    pub ptype: Option<String>,
    /// Source snippet around the reflection point.
    pub reflected_code: String,
}

impl ParamResult {
    pub fn new(name: &str, location: ParamLocation) -> Self {
        Self {
            name: name.to_string(),
            location,
            reflected: false,
            chars: Vec::new(),
            bad_chars: Vec::new(),
            injected_contexts: Vec::new(),
            ptype: None,
            reflected_code: String::new(),
        }
    }

    /// Inject-type suffix derived from the parameter sub-type,
    /// e.g. `-PTYPE-NUM`.
    pub fn ptype_suffix(&self) -> String {
        match &self.ptype {
            Some(t) => format!("-PTYPE-{}", t),
            None => String::new(),
        }
    }
}

/// Finding kind: V = verified (triggered), R = reflected only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PocKind {
    V,
    R,
}

impl PocKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            PocKind::V => "V",
            PocKind::R => "R",
        }
    }
}

/// A proof-of-concept finding.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Poc {
    #[serde(rename = "Type")]
    pub kind: String,
    #[serde(rename = "InjectType")]
    pub inject_type: String,
    #[serde(rename = "Method")]
    pub method: String,
    #[serde(rename = "Data")]
    pub data: String,
    #[serde(rename = "Param")]
    pub param: String,
    #[serde(rename = "Payload")]
    pub payload: String,
    #[serde(rename = "Evidence")]
    pub evidence: String,
    #[serde(rename = "CWE")]
    pub cwe: String,
    #[serde(rename = "Severity")]
    pub severity: String,
    #[serde(rename = "PoCType")]
    pub poc_type: String,
    #[serde(rename = "MessageID")]
    pub message_id: i64,
    #[serde(rename = "MessageStr")]
    pub message_str: String,
    #[serde(rename = "RawHTTPRequest", skip_serializing_if = "Option::is_none")]
    pub raw_http_request: Option<String>,
    #[serde(rename = "RawHTTPResponse", skip_serializing_if = "Option::is_none")]
    pub raw_http_response: Option<String>,
}

impl Poc {
    pub fn is_verified(&self) -> bool {
        self.kind == "V"
    }
}

/// Final scan output. Mutated only by the driver and the aggregator.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanResult {
    pub target: String,
    pub started_at: String,
    pub completed_at: String,
    pub duration_seconds: f64,
    pub params: Vec<ParamResult>,
    pub pocs: Vec<Poc>,
}

impl ScanResult {
    pub fn new(target: &str) -> Self {
        Self {
            target: target.to_string(),
            started_at: chrono::Utc::now().to_rfc3339(),
            completed_at: String::new(),
            duration_seconds: 0.0,
            params: Vec::new(),
            pocs: Vec::new(),
        }
    }
}

/// A job's type is verification-eligible unless it is an out-of-band probe:
/// blind payloads confirm through the callback listener, never through the
/// response in hand.
pub fn is_verification_eligible(inject_type: &str) -> bool {
    !inject_type.contains("toBlind")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ptype_suffix() {
        let mut p = ParamResult::new("page", ParamLocation::Query);
        assert_eq!(p.ptype_suffix(), "");
        p.ptype = Some("NUM".to_string());
        assert_eq!(p.ptype_suffix(), "-PTYPE-NUM");
    }

    #[test]
    fn test_verification_eligibility() {
        assert!(is_verification_eligible("inHTML-URL"));
        assert!(is_verification_eligible("inJS-double"));
        assert!(!is_verification_eligible("toBlind-PTYPE-NUM"));
    }

    #[test]
    fn test_poc_json_field_names() {
        let poc = Poc {
            kind: "V".to_string(),
            inject_type: "inHTML-URL".to_string(),
            method: "GET".to_string(),
            data: "https://target.example/?q=x".to_string(),
            param: "q".to_string(),
            payload: "<svg onload=alert(1)>".to_string(),
            evidence: String::new(),
            cwe: "CWE-79".to_string(),
            severity: "High".to_string(),
            poc_type: "plain".to_string(),
            message_id: 3,
            message_str: "Triggered XSS Payload".to_string(),
            raw_http_request: None,
            raw_http_response: None,
        };
        let json = serde_json::to_string(&poc).unwrap();
        assert!(json.contains("\"Type\":\"V\""));
        assert!(json.contains("\"InjectType\":\"inHTML-URL\""));
        assert!(json.contains("\"CWE\":\"CWE-79\""));
        assert!(json.contains("\"MessageID\":3"));
        assert!(!json.contains("RawHTTPRequest"));
    }
}
