// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

/**
 * Bountyy Oy - Probe Request Builder
 * Turns (target, param, payload, context, placement, encoder) into a
 * concrete HTTP probe plus its metadata
 *
 * @copyright 2026 Bountyy Oy
 * @license Proprietary
 */

use url::Url;

use crate::config::ScanOptions;
use crate::encoding::Encoder;
use crate::types::{HEADER_PROBE_PARAM, PATH_PROBE_PARAM};

/// How a payload lands in the existing parameter value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placement {
    /// Concatenate onto the existing value.
    Append,
    /// Substitute the existing value.
    Replace,
}

/// A concrete HTTP probe. Compared through `dedup_key`, never by identity.
#[derive(Debug, Clone)]
pub struct ProbeRequest {
    pub method: String,
    pub url: Url,
    pub body: Option<String>,
    pub headers: Vec<(String, String)>,
}

impl ProbeRequest {
    pub fn host(&self) -> String {
        self.url.host_str().unwrap_or("unknown").to_string()
    }

    /// Explicit deduplication key: method, URL, body, header set.
    pub fn dedup_key(&self) -> String {
        let mut headers: Vec<String> =
            self.headers.iter().map(|(k, v)| format!("{}:{}", k, v)).collect();
        headers.sort();
        format!(
            "{} {} {} {}",
            self.method,
            self.url,
            self.body.as_deref().unwrap_or(""),
            headers.join("|")
        )
    }

    /// Raw request text for `--output-request` dumps.
    pub fn dump(&self) -> String {
        let mut path = self.url.path().to_string();
        if let Some(q) = self.url.query() {
            path.push('?');
            path.push_str(q);
        }
        let mut out = format!("{} {} HTTP/1.1\r\nHost: {}\r\n", self.method, path, self.host());
        for (name, value) in &self.headers {
            out.push_str(&format!("{}: {}\r\n", name, value));
        }
        out.push_str("\r\n");
        if let Some(body) = &self.body {
            out.push_str(body);
        }
        out
    }
}

/// Metadata carried alongside every probe.
#[derive(Debug, Clone)]
pub struct JobMeta {
    pub param: String,
    pub payload: String,
    pub inject_type: String,
    pub encoder: Encoder,
}

/// One element of the test matrix: a probe plus its metadata.
#[derive(Debug, Clone)]
pub struct Job {
    pub request: ProbeRequest,
    pub meta: JobMeta,
}

/// Splice an encoded payload into a raw `a=1&b=2` pair list without
/// decoding the existing values. Returns the new pair list; the param is
/// appended as a fresh pair when absent.
fn splice_pairs(raw: &str, param: &str, encoded: &str, placement: Placement) -> String {
    let mut found = false;
    let mut pairs: Vec<String> = Vec::new();
    if !raw.is_empty() {
        for pair in raw.split('&') {
            let (name, value) = pair.split_once('=').unwrap_or((pair, ""));
            if name == param {
                found = true;
                let new_value = match placement {
                    Placement::Append => format!("{}{}", value, encoded),
                    Placement::Replace => encoded.to_string(),
                };
                pairs.push(format!("{}={}", name, new_value));
            } else {
                pairs.push(pair.to_string());
            }
        }
    }
    if !found {
        pairs.push(format!("{}={}", param, encoded));
    }
    pairs.join("&")
}

fn body_has_param(data: &str, param: &str) -> bool {
    data.split('&')
        .any(|pair| pair.split_once('=').map(|(n, _)| n).unwrap_or(pair) == param)
}

/// Build a probe against the parameter's original location: the URL query,
/// the fragment (fragment-only targets) or the form body.
pub fn build_param_probe(
    target: &Url,
    param: &str,
    payload: &str,
    inject_type: &str,
    placement: Placement,
    encoder: Encoder,
    options: &ScanOptions,
) -> Job {
    let encoded = encoder.apply(payload);
    let mut url = target.clone();
    let mut method = options.method.clone();
    let mut body = None;

    if let Some(data) = options.data.as_deref() {
        if body_has_param(data, param) {
            method = "POST".to_string();
            body = Some(splice_pairs(data, param, &encoded, placement));
        }
    }

    if body.is_none() {
        let fragment_only = target.query().map(|q| q.is_empty()).unwrap_or(true)
            && target.fragment().map(|f| !f.is_empty()).unwrap_or(false);
        if fragment_only {
            let spliced = splice_pairs(target.fragment().unwrap_or(""), param, &encoded, placement);
            url.set_fragment(Some(&spliced));
        } else {
            let spliced = splice_pairs(target.query().unwrap_or(""), param, &encoded, placement);
            url.set_query(Some(&spliced));
        }
        if options.data.is_some() {
            // Keep the configured body on probes that target the URL.
            method = "POST".to_string();
            body = options.data.clone();
        }
    }

    Job {
        request: ProbeRequest {
            method,
            url,
            body,
            headers: Vec::new(),
        },
        meta: JobMeta {
            param: param.to_string(),
            payload: payload.to_string(),
            inject_type: inject_type.to_string(),
            encoder,
        },
    }
}

/// Build a header-level probe: the payload rides in a request header and
/// the URL stays untouched.
pub fn build_header_probe(
    target: &Url,
    header: &str,
    payload: &str,
    inject_type: &str,
    options: &ScanOptions,
) -> Job {
    Job {
        request: ProbeRequest {
            method: options.method.clone(),
            url: target.clone(),
            body: options.data.clone(),
            headers: vec![(header.to_string(), payload.to_string())],
        },
        meta: JobMeta {
            param: HEADER_PROBE_PARAM.to_string(),
            payload: payload.to_string(),
            inject_type: inject_type.to_string(),
            encoder: Encoder::Plain,
        },
    }
}

/// Build a probe for a rewritten URL path (path-reflection matrix entries).
pub fn build_path_probe(url: Url, payload: &str, inject_type: &str, options: &ScanOptions) -> Job {
    Job {
        request: ProbeRequest {
            method: options.method.clone(),
            url,
            body: None,
            headers: Vec::new(),
        },
        meta: JobMeta {
            param: PATH_PROBE_PARAM.to_string(),
            payload: payload.to_string(),
            inject_type: inject_type.to_string(),
            encoder: Encoder::Plain,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn options() -> ScanOptions {
        ScanOptions::default()
    }

    #[test]
    fn test_append_onto_existing_query_param() {
        let target = Url::parse("https://target.example/search?q=hello&page=2").unwrap();
        let job = build_param_probe(
            &target,
            "q",
            "PAYLOAD",
            "inHTML-URL",
            Placement::Append,
            Encoder::Plain,
            &options(),
        );
        assert!(job.request.url.query().unwrap().contains("q=helloPAYLOAD"));
        assert!(job.request.url.query().unwrap().contains("page=2"));
        assert_eq!(job.meta.param, "q");
    }

    #[test]
    fn test_replace_substitutes_value() {
        let target = Url::parse("https://target.example/?q=hello").unwrap();
        let job = build_param_probe(
            &target,
            "q",
            "PAYLOAD",
            "inHTML",
            Placement::Replace,
            Encoder::Plain,
            &options(),
        );
        assert_eq!(job.request.url.query().unwrap(), "q=PAYLOAD");
    }

    #[test]
    fn test_new_param_is_appended() {
        let target = Url::parse("https://target.example/?q=1").unwrap();
        let job = build_param_probe(
            &target,
            "redirect",
            "x",
            "inHTML",
            Placement::Append,
            Encoder::Plain,
            &options(),
        );
        assert!(job.request.url.query().unwrap().contains("redirect=x"));
    }

    #[test]
    fn test_fragment_only_target_hits_fragment() {
        let target = Url::parse("https://target.example/app#view=home").unwrap();
        let job = build_param_probe(
            &target,
            "view",
            "PAYLOAD",
            "inHTML",
            Placement::Append,
            Encoder::Plain,
            &options(),
        );
        assert!(job.request.url.fragment().unwrap().contains("view=homePAYLOAD"));
        assert!(job.request.url.query().is_none() || job.request.url.query() == Some(""));
    }

    #[test]
    fn test_body_param_switches_to_post() {
        let target = Url::parse("https://target.example/login").unwrap();
        let mut opts = options();
        opts.data = Some("user=admin&comment=hi".to_string());
        let job = build_param_probe(
            &target,
            "comment",
            "PAYLOAD",
            "inHTML-FORM",
            Placement::Append,
            Encoder::Plain,
            &opts,
        );
        assert_eq!(job.request.method, "POST");
        assert_eq!(job.request.body.as_deref(), Some("user=admin&comment=hiPAYLOAD"));
    }

    #[test]
    fn test_header_probe_keeps_url() {
        let target = Url::parse("https://target.example/?q=1").unwrap();
        let job = build_header_probe(&target, "Referer", "//cb.example/x", "toBlind", &options());
        assert_eq!(job.request.url.as_str(), "https://target.example/?q=1");
        assert_eq!(job.request.headers[0].0, "Referer");
        assert_eq!(job.meta.param, HEADER_PROBE_PARAM);
    }

    #[test]
    fn test_dedup_key_covers_body_and_headers() {
        let target = Url::parse("https://target.example/?q=1").unwrap();
        let a = build_header_probe(&target, "Referer", "x", "toBlind", &options());
        let b = build_header_probe(&target, "Referer", "y", "toBlind", &options());
        let c = build_header_probe(&target, "Referer", "x", "toBlind", &options());
        assert_ne!(a.request.dedup_key(), b.request.dedup_key());
        assert_eq!(a.request.dedup_key(), c.request.dedup_key());
    }

    #[test]
    fn test_dump_contains_request_line_and_host() {
        let target = Url::parse("https://target.example/a?q=1").unwrap();
        let job = build_param_probe(
            &target,
            "q",
            "x",
            "inHTML",
            Placement::Append,
            Encoder::Plain,
            &options(),
        );
        let dump = job.request.dump();
        assert!(dump.starts_with("GET /a?q=1x HTTP/1.1"));
        assert!(dump.contains("Host: target.example"));
    }
}
