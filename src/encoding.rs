// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

//! Payload encoders applied when expanding the test matrix.

use serde::{Deserialize, Serialize};

/// Encoder applied to a payload before it is spliced into a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum Encoder {
    /// Identity.
    #[default]
    Plain,
    UrlEncode,
    UrlDoubleEncode,
    HtmlEncode,
}

impl Encoder {
    /// The full encoder set the matrix fans out over.
    pub const ALL: [Encoder; 4] = [
        Encoder::Plain,
        Encoder::UrlEncode,
        Encoder::UrlDoubleEncode,
        Encoder::HtmlEncode,
    ];

    pub fn apply(&self, payload: &str) -> String {
        match self {
            Encoder::Plain => payload.to_string(),
            Encoder::UrlEncode => urlencoding::encode(payload).into_owned(),
            Encoder::UrlDoubleEncode => {
                urlencoding::encode(&urlencoding::encode(payload)).into_owned()
            }
            Encoder::HtmlEncode => html_escape::encode_quoted_attribute(payload).into_owned(),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Encoder::Plain => "plain",
            Encoder::UrlEncode => "urlEncode",
            Encoder::UrlDoubleEncode => "urlDoubleEncode",
            Encoder::HtmlEncode => "htmlEncode",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_is_identity() {
        assert_eq!(Encoder::Plain.apply("<svg onload=alert(1)>"), "<svg onload=alert(1)>");
    }

    #[test]
    fn test_url_encoders() {
        assert_eq!(Encoder::UrlEncode.apply("<x>"), "%3Cx%3E");
        assert_eq!(Encoder::UrlDoubleEncode.apply("<x>"), "%253Cx%253E");
    }

    #[test]
    fn test_html_encoder_escapes_quotes() {
        let encoded = Encoder::HtmlEncode.apply("\"><svg>");
        assert!(!encoded.contains('"'));
        assert!(!encoded.contains('<'));
    }

    #[test]
    fn test_all_has_four_distinct_encoders() {
        let out: std::collections::HashSet<String> =
            Encoder::ALL.iter().map(|e| e.apply("<\"x\">")).collect();
        assert_eq!(out.len(), 4);
    }
}
