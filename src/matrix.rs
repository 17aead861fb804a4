// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

/**
 * Bountyy Oy - Payload Matrix Builder
 * Composes the payload x parameter x encoder test set from discovery
 * output, custom/remote/blind payload sources and DOM URL candidates
 *
 * @copyright 2026 Bountyy Oy
 * @license Proprietary
 */

use std::collections::HashMap;

use reqwest::Client;
use tracing::{info, warn};
use url::Url;

use crate::config::ScanOptions;
use crate::encoding::Encoder;
use crate::payloads::{self, CALLBACK_SENTINEL};
use crate::request::{build_header_probe, build_param_probe, build_path_probe, Job, Placement};
use crate::types::ParamResult;

/// The composed test set: HTTP jobs plus DOM URLs destined for the
/// headless verifier.
#[derive(Debug, Default)]
pub struct Matrix {
    pub jobs: Vec<Job>,
    pub dom_urls: Vec<String>,
}

/// Header targeted by the blind header-level probe.
const BLIND_HEADER: &str = "Referer";

/// Optimization test: a payload is infeasible for a parameter when it
/// contains any character the server was observed to filter.
pub fn payload_is_feasible(payload: &str, bad_chars: &[String]) -> bool {
    !bad_chars.iter().any(|c| !c.is_empty() && payload.contains(c.as_str()))
}

/// Content types worth testing with markup payloads.
fn content_type_allowed(policy: &HashMap<String, String>) -> bool {
    policy
        .get("Content-Type")
        .map(|ct| ct.contains("text/html") || ct.contains("application/xhtml"))
        .unwrap_or(false)
}

fn add(jobs: &mut HashMap<String, Job>, job: Job) {
    jobs.entry(job.request.dedup_key()).or_insert(job);
}

/// Build the full matrix. Duplicate requests are collapsed through the
/// explicit request key.
pub async fn build_matrix(
    target: &Url,
    options: &ScanOptions,
    client: &Client,
    params: &HashMap<String, ParamResult>,
    policy: &HashMap<String, String>,
    path_reflection: &HashMap<usize, String>,
) -> Matrix {
    let mut jobs: HashMap<String, Job> = HashMap::new();
    let mut dom_urls: Vec<String> = Vec::new();

    if !options.only_custom_payload {
        add_path_jobs(&mut jobs, target, options, path_reflection);
    }

    let markup_ok = options.skip_discovery || content_type_allowed(policy);

    if markup_ok {
        if let Some(file) = &options.custom_payload_file {
            match tokio::fs::read_to_string(file).await {
                Ok(content) => {
                    let mut count = 0;
                    for payload in content.lines().map(str::trim).filter(|l| !l.is_empty()) {
                        count += 1;
                        for (name, param) in params {
                            if !options.check_inspection_param(name) {
                                continue;
                            }
                            let ty = format!("inHTML{}", param.ptype_suffix());
                            for encoder in Encoder::ALL {
                                add(
                                    &mut jobs,
                                    build_param_probe(
                                        target,
                                        name,
                                        payload,
                                        &ty,
                                        Placement::Append,
                                        encoder,
                                        options,
                                    ),
                                );
                            }
                        }
                    }
                    info!("Added your {} custom xss payloads", count);
                }
                Err(e) => warn!("Custom XSS payload load fail: {}", e),
            }
        }
    }

    let fragment_only = target.query().map(|q| q.is_empty()).unwrap_or(true)
        && target.fragment().map(|f| !f.is_empty()).unwrap_or(false);
    let url_params: Vec<String> = if fragment_only {
        pair_names(target.fragment().unwrap_or(""))
    } else {
        pair_names(target.query().unwrap_or(""))
    };
    let body_params: Vec<String> = options
        .data
        .as_deref()
        .map(pair_names)
        .unwrap_or_default();

    if markup_ok && !options.only_custom_payload {
        // Common payloads on parameters already present on the target.
        for name in url_params.iter().filter(|n| options.check_inspection_param(n)) {
            for payload in payloads::common_payloads() {
                for encoder in Encoder::ALL {
                    add(
                        &mut jobs,
                        build_param_probe(
                            target,
                            name,
                            &payload,
                            "inHTML-URL",
                            Placement::Append,
                            encoder,
                            options,
                        ),
                    );
                }
            }
        }
        for name in body_params.iter().filter(|n| options.check_inspection_param(n)) {
            for payload in payloads::common_payloads() {
                for encoder in Encoder::ALL {
                    add(
                        &mut jobs,
                        build_param_probe(
                            target,
                            name,
                            &payload,
                            "inHTML-FORM",
                            Placement::Append,
                            encoder,
                            options,
                        ),
                    );
                }
            }
        }

        if options.use_headless {
            let dom_payloads = if options.use_deep_dom {
                payloads::deep_dom_xss_payloads()
            } else {
                payloads::dom_xss_payloads()
            };
            for name in url_params.iter().chain(body_params.iter()) {
                if !options.check_inspection_param(name) {
                    continue;
                }
                // Only parameters with an empty reflection profile go to
                // the browser; the rest are covered by HTTP probes.
                let unprofiled = params
                    .get(name)
                    .map(|p| p.chars.is_empty() && p.bad_chars.is_empty())
                    .unwrap_or(true);
                if !unprofiled {
                    continue;
                }
                for payload in &dom_payloads {
                    if let Some(durl) = dom_url(target, name, payload, fragment_only) {
                        if !dom_urls.contains(&durl) {
                            dom_urls.push(durl);
                        }
                    }
                }
            }
        }

        // Context payloads on parameters discovery profiled.
        for (name, param) in params {
            if !options.check_inspection_param(name) {
                continue;
            }
            let suffix = param.ptype_suffix();

            for ctx in &param.injected_contexts {
                let list = if ctx.contains("inJS") {
                    let quote_reflects = (ctx.contains("double")
                        && param.chars.iter().any(|c| c == "\""))
                        || (ctx.contains("single") && param.chars.iter().any(|c| c == "'"));
                    if quote_reflects {
                        payloads::in_js_payloads(ctx)
                    } else {
                        payloads::in_js_break_script_payloads(ctx)
                    }
                } else if ctx.contains("inATTR") {
                    payloads::attr_payloads(ctx)
                } else {
                    payloads::html_payloads(ctx)
                };

                let ty = format!("{}{}", ctx, suffix);
                for payload in list {
                    if !payload_is_feasible(&payload, &param.bad_chars) {
                        continue;
                    }
                    for encoder in Encoder::ALL {
                        add(
                            &mut jobs,
                            build_param_probe(
                                target,
                                name,
                                &payload,
                                &ty,
                                Placement::Append,
                                encoder,
                                options,
                            ),
                        );
                    }
                }
            }

            // Common payloads for parameters absent from the original URL.
            // Body-form parameters qualify too: they get this coverage on
            // top of their inHTML-FORM probes.
            if !url_params.contains(name) {
                let ty = format!("inHTML{}", suffix);
                for payload in payloads::common_payloads() {
                    if !payload_is_feasible(&payload, &param.bad_chars) {
                        continue;
                    }
                    for encoder in Encoder::ALL {
                        add(
                            &mut jobs,
                            build_param_probe(
                                target,
                                name,
                                &payload,
                                &ty,
                                Placement::Append,
                                encoder,
                                options,
                            ),
                        );
                    }
                }
            }
        }
    } else if !markup_ok {
        info!(
            "Type is '{}', testing only custom/blind payloads",
            policy.get("Content-Type").map(String::as_str).unwrap_or("")
        );
    }

    if let Some(blind) = &options.blind_url {
        let callback = if blind.starts_with("http://") || blind.starts_with("https://") {
            blind.clone()
        } else {
            format!("//{}", blind)
        };

        for template in payloads::blind_payloads() {
            let payload = template.replace(CALLBACK_SENTINEL, &callback);
            add(
                &mut jobs,
                build_header_probe(target, BLIND_HEADER, &payload, "toBlind", options),
            );
        }

        for (name, param) in params {
            if !options.check_inspection_param(name) {
                continue;
            }
            let ty = format!("toBlind{}", param.ptype_suffix());
            for template in payloads::blind_payloads() {
                let payload = template.replace(CALLBACK_SENTINEL, &callback);
                for encoder in Encoder::ALL {
                    add(
                        &mut jobs,
                        build_param_probe(
                            target,
                            name,
                            &payload,
                            &ty,
                            Placement::Append,
                            encoder,
                            options,
                        ),
                    );
                }
            }
        }
        info!("Added your blind XSS ({})", blind);
    }

    for source in &options.remote_payloads {
        let list = payloads::remote_payloads(client, *source).await;
        for payload in list {
            if payload.is_empty() {
                continue;
            }
            for (name, param) in params {
                if !options.check_inspection_param(name) {
                    continue;
                }
                let ty = format!("inHTML{}", param.ptype_suffix());
                for encoder in Encoder::ALL {
                    add(
                        &mut jobs,
                        build_param_probe(
                            target,
                            name,
                            &payload,
                            &ty,
                            Placement::Append,
                            encoder,
                            options,
                        ),
                    );
                }
            }
        }
    }

    // Stable dispatch order keeps repeated scans comparable.
    let mut jobs: Vec<Job> = jobs.into_values().collect();
    jobs.sort_by(|a, b| a.request.dedup_key().cmp(&b.request.dedup_key()));

    Matrix { jobs, dom_urls }
}

fn pair_names(raw: &str) -> Vec<String> {
    raw.split('&')
        .map(|pair| pair.split_once('=').map(|(n, _)| n).unwrap_or(pair))
        .filter(|n| !n.is_empty())
        .map(str::to_string)
        .collect()
}

fn add_path_jobs(
    jobs: &mut HashMap<String, Job>,
    target: &Url,
    options: &ScanOptions,
    path_reflection: &HashMap<usize, String>,
) {
    let segments: Vec<String> = target
        .path_segments()
        .map(|s| s.filter(|p| !p.is_empty()).map(str::to_string).collect())
        .unwrap_or_default();

    for (&idx, tag) in path_reflection {
        let Some(contexts) = tag.strip_prefix("Injected:") else {
            continue;
        };
        for ctx in contexts.split('/').filter(|c| !c.is_empty()) {
            let list = if ctx.contains("inJS") {
                payloads::in_js_payloads(ctx)
            } else if ctx.contains("inATTR") {
                payloads::attr_payloads(ctx)
            } else {
                payloads::html_payloads(ctx)
            };
            for payload in list {
                let mut probe_url = target.clone();
                if segments.is_empty() {
                    probe_url.set_path(&format!("/{}", payload));
                } else if idx < segments.len() {
                    let mut rewritten = segments.clone();
                    rewritten[idx] = format!("{}{}", rewritten[idx], payload);
                    probe_url.set_path(&format!("/{}", rewritten.join("/")));
                } else {
                    continue;
                }
                add(jobs, build_path_probe(probe_url, &payload, ctx, options));
            }
        }
    }
}

/// Rewrite one parameter to a DOM payload, producing a URL for the
/// headless verifier rather than an HTTP job.
fn dom_url(target: &Url, param: &str, payload: &str, fragment_only: bool) -> Option<String> {
    let mut url = target.clone();
    if fragment_only {
        let spliced: Vec<String> = url
            .fragment()
            .unwrap_or("")
            .split('&')
            .map(|pair| {
                let (name, _) = pair.split_once('=').unwrap_or((pair, ""));
                if name == param {
                    format!("{}={}", name, payload)
                } else {
                    pair.to_string()
                }
            })
            .collect();
        url.set_fragment(Some(&spliced.join("&")));
    } else {
        let pairs: Vec<(String, String)> = url
            .query_pairs()
            .map(|(n, v)| {
                if n == param {
                    (n.to_string(), payload.to_string())
                } else {
                    (n.to_string(), v.to_string())
                }
            })
            .collect();
        let query = url::form_urlencoded::Serializer::new(String::new())
            .extend_pairs(pairs)
            .finish();
        url.set_query(Some(&query));
    }
    Some(url.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ParamLocation, HEADER_PROBE_PARAM};

    fn reflecting_param(name: &str) -> ParamResult {
        let mut p = ParamResult::new(name, ParamLocation::Query);
        p.reflected = true;
        p.chars = vec!["<".to_string(), ">".to_string(), "\"".to_string()];
        p.injected_contexts = vec!["inHTML".to_string()];
        p
    }

    fn client() -> Client {
        Client::new()
    }

    #[tokio::test]
    async fn test_common_payloads_fan_out_over_encoders() {
        let target = Url::parse("https://target.example/?q=1").unwrap();
        let options = ScanOptions::default();
        let mut params = HashMap::new();
        params.insert("q".to_string(), reflecting_param("q"));
        let mut policy = HashMap::new();
        policy.insert("Content-Type".to_string(), "text/html".to_string());

        let matrix =
            build_matrix(&target, &options, &client(), &params, &policy, &HashMap::new()).await;
        assert!(!matrix.jobs.is_empty());
        let url_typed = matrix
            .jobs
            .iter()
            .filter(|j| j.meta.inject_type == "inHTML-URL")
            .count();
        assert!(url_typed > 0);
        // Every job passed through the dedup map.
        let mut keys: Vec<String> = matrix.jobs.iter().map(|j| j.request.dedup_key()).collect();
        keys.sort();
        keys.dedup();
        assert_eq!(keys.len(), matrix.jobs.len());
    }

    #[tokio::test]
    async fn test_disallowed_content_type_skips_markup_payloads() {
        let target = Url::parse("https://target.example/?q=1").unwrap();
        let options = ScanOptions::default();
        let mut params = HashMap::new();
        params.insert("q".to_string(), reflecting_param("q"));
        let mut policy = HashMap::new();
        policy.insert("Content-Type".to_string(), "application/json".to_string());

        let matrix =
            build_matrix(&target, &options, &client(), &params, &policy, &HashMap::new()).await;
        assert!(matrix.jobs.is_empty());
    }

    #[tokio::test]
    async fn test_blind_probes_target_referer_header() {
        let target = Url::parse("https://target.example/?q=1").unwrap();
        let options = ScanOptions {
            blind_url: Some("x.example".to_string()),
            ..Default::default()
        };
        let mut params = HashMap::new();
        params.insert("q".to_string(), reflecting_param("q"));

        let matrix = build_matrix(
            &target,
            &options,
            &client(),
            &params,
            &HashMap::new(),
            &HashMap::new(),
        )
        .await;

        let header_jobs: Vec<_> = matrix
            .jobs
            .iter()
            .filter(|j| j.meta.param == HEADER_PROBE_PARAM)
            .collect();
        assert!(!header_jobs.is_empty());
        assert!(header_jobs.iter().all(|j| {
            j.meta.inject_type.starts_with("toBlind")
                && j.request.headers.iter().any(|(n, v)| n == "Referer" && v.contains("//x.example"))
        }));

        // Param-level blind probes carry the type prefix too.
        assert!(matrix
            .jobs
            .iter()
            .filter(|j| j.meta.param == "q")
            .all(|j| j.meta.inject_type.starts_with("toBlind")));
    }

    #[tokio::test]
    async fn test_bad_chars_prune_payloads() {
        let target = Url::parse("https://target.example/?q=1").unwrap();
        let options = ScanOptions::default();
        let mut param = reflecting_param("q");
        // Everything the markup payloads need got filtered server-side.
        param.chars.clear();
        param.bad_chars = vec!["<".to_string(), ">".to_string(), "\"".to_string(), "'".to_string()];
        let mut params = HashMap::new();
        params.insert("q".to_string(), param);
        let mut policy = HashMap::new();
        policy.insert("Content-Type".to_string(), "text/html".to_string());

        let matrix =
            build_matrix(&target, &options, &client(), &params, &policy, &HashMap::new()).await;
        // inHTML-URL common probes are not feasibility-filtered, but the
        // context-driven sub-matrix must be empty.
        assert!(matrix.jobs.iter().all(|j| j.meta.inject_type != "inHTML"));
    }

    #[tokio::test]
    async fn test_dom_urls_for_unprofiled_params() {
        let target = Url::parse("https://target.example/?q=1&id=2").unwrap();
        let options = ScanOptions {
            use_headless: true,
            ..Default::default()
        };
        let mut params = HashMap::new();
        params.insert("q".to_string(), reflecting_param("q"));
        let unprofiled = ParamResult::new("id", ParamLocation::Query);
        params.insert("id".to_string(), unprofiled);
        let mut policy = HashMap::new();
        policy.insert("Content-Type".to_string(), "text/html".to_string());

        let matrix =
            build_matrix(&target, &options, &client(), &params, &policy, &HashMap::new()).await;
        assert!(!matrix.dom_urls.is_empty());
        // Only the unprofiled parameter is rewritten.
        assert!(matrix.dom_urls.iter().all(|u| u.contains("id=")));
        assert!(matrix.dom_urls.iter().all(|u| u.contains("q=1")));
    }

    #[tokio::test]
    async fn test_path_reflection_jobs() {
        let target = Url::parse("https://target.example/app/view?q=1").unwrap();
        let options = ScanOptions::default();
        let mut path_reflection = HashMap::new();
        path_reflection.insert(1usize, "Injected:/inHTML".to_string());

        let matrix = build_matrix(
            &target,
            &options,
            &client(),
            &HashMap::new(),
            &HashMap::new(),
            &path_reflection,
        )
        .await;

        assert!(!matrix.jobs.is_empty());
        assert!(matrix
            .jobs
            .iter()
            .all(|j| j.meta.param == crate::types::PATH_PROBE_PARAM));
        assert!(matrix.jobs.iter().all(|j| j.request.url.path().starts_with("/app/view")));
    }

    #[tokio::test]
    async fn test_only_custom_payload_suppresses_generated_sets() {
        let target = Url::parse("https://target.example/?q=1").unwrap();
        let options = ScanOptions {
            only_custom_payload: true,
            ..Default::default()
        };
        let mut params = HashMap::new();
        params.insert("q".to_string(), reflecting_param("q"));
        let mut policy = HashMap::new();
        policy.insert("Content-Type".to_string(), "text/html".to_string());
        let mut path_reflection = HashMap::new();
        path_reflection.insert(0usize, "Injected:/inHTML".to_string());

        let matrix =
            build_matrix(&target, &options, &client(), &params, &policy, &path_reflection).await;
        assert!(matrix.jobs.is_empty());
    }

    #[tokio::test]
    async fn test_body_params_qualify_for_extra_common_coverage() {
        let target = Url::parse("https://target.example/login?q=1").unwrap();
        let options = ScanOptions {
            data: Some("comment=hi".to_string()),
            ..Default::default()
        };
        let mut params = HashMap::new();
        let mut q = reflecting_param("q");
        q.injected_contexts.clear();
        params.insert("q".to_string(), q);
        let mut comment = reflecting_param("comment");
        comment.injected_contexts.clear();
        comment.location = ParamLocation::Body;
        params.insert("comment".to_string(), comment);
        // Discovered body-side but absent from the configured data, so its
        // extra common probes survive dedup against the form sub-matrix.
        let mut track = reflecting_param("track");
        track.injected_contexts.clear();
        track.location = ParamLocation::Body;
        params.insert("track".to_string(), track);
        let mut policy = HashMap::new();
        policy.insert("Content-Type".to_string(), "text/html".to_string());

        let matrix =
            build_matrix(&target, &options, &client(), &params, &policy, &HashMap::new()).await;

        // The form sub-matrix covers the configured body param.
        assert!(matrix
            .jobs
            .iter()
            .any(|j| j.meta.param == "comment" && j.meta.inject_type == "inHTML-FORM"));
        // Absent from the URL, a body-side param qualifies for the extra
        // common-payload set.
        assert!(matrix
            .jobs
            .iter()
            .any(|j| j.meta.param == "track" && j.meta.inject_type == "inHTML"));
        // The extra probes for the configured body param are request-level
        // duplicates of its form probes and collapse into them.
        assert!(matrix
            .jobs
            .iter()
            .filter(|j| j.meta.param == "comment")
            .all(|j| j.meta.inject_type == "inHTML-FORM"));
        // A param already on the URL gets no extra common set.
        assert!(!matrix
            .jobs
            .iter()
            .any(|j| j.meta.param == "q" && j.meta.inject_type == "inHTML"));
    }

    #[tokio::test]
    async fn test_custom_payload_file_feeds_matrix() {
        let path = std::env::temp_dir().join("kettu-custom-payloads-test.txt");
        std::fs::write(&path, "<custom1>\n\n<custom2>\n").unwrap();

        let target = Url::parse("https://target.example/?q=1").unwrap();
        let options = ScanOptions {
            custom_payload_file: Some(path.clone()),
            only_custom_payload: true,
            ..Default::default()
        };
        let mut params = HashMap::new();
        params.insert("q".to_string(), reflecting_param("q"));
        let mut policy = HashMap::new();
        policy.insert("Content-Type".to_string(), "text/html".to_string());

        let matrix =
            build_matrix(&target, &options, &client(), &params, &policy, &HashMap::new()).await;
        std::fs::remove_file(&path).ok();

        assert!(!matrix.jobs.is_empty());
        assert!(matrix.jobs.iter().all(|j| j.meta.inject_type == "inHTML"));
        let payloads: Vec<&str> = matrix.jobs.iter().map(|j| j.meta.payload.as_str()).collect();
        assert!(payloads.contains(&"<custom1>"));
        assert!(payloads.contains(&"<custom2>"));
    }

    #[test]
    fn test_feasibility_predicate() {
        let bad = vec!["<".to_string()];
        assert!(!payload_is_feasible("<svg onload=alert(1)>", &bad));
        assert!(payload_is_feasible("\" onmouseover=alert(1) x=\"", &bad));
        assert!(payload_is_feasible("anything", &[]));
    }
}
