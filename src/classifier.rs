// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

/**
 * Bountyy Oy - Response Classifier
 * Turns (job, response, verdicts) into typed findings and tracks
 * per-parameter confirmation state
 *
 * @copyright 2026 Bountyy Oy
 * @license Proprietary
 */

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::config::ScanOptions;
use crate::headless::HeadlessVerifier;
use crate::http_client::HttpResponse;
use crate::output;
use crate::request::Job;
use crate::types::{is_verification_eligible, Poc, PocKind};
use crate::verify;

/// Per-parameter confirmation map, shared across workers.
///
/// Best-effort short-circuit: workers racing on the same parameter may
/// each emit one V before observing the flag; never more than one per
/// in-flight job.
pub struct VerdictStatus {
    inner: RwLock<HashMap<String, bool>>,
}

impl VerdictStatus {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(HashMap::new()),
        }
    }

    pub fn seed<'a>(&self, params: impl Iterator<Item = &'a String>) {
        let mut map = self.inner.write();
        for p in params {
            map.entry(p.clone()).or_insert(false);
        }
    }

    pub fn is_confirmed(&self, param: &str) -> bool {
        self.inner.read().get(param).copied().unwrap_or(false)
    }

    pub fn confirm(&self, param: &str) {
        self.inner.write().insert(param.to_string(), true);
    }

    pub fn all_confirmed(&self) -> bool {
        let map = self.inner.read();
        !map.is_empty() && map.values().all(|v| *v)
    }
}

impl Default for VerdictStatus {
    fn default() -> Self {
        Self::new()
    }
}

/// Classifies worker output into V / R findings.
pub struct Classifier {
    options: Arc<ScanOptions>,
    target: String,
    pub verdicts: Arc<VerdictStatus>,
    results: mpsc::UnboundedSender<Poc>,
    verifier: Option<Arc<dyn HeadlessVerifier>>,
}

impl Classifier {
    pub fn new(
        options: Arc<ScanOptions>,
        target: String,
        verdicts: Arc<VerdictStatus>,
        results: mpsc::UnboundedSender<Poc>,
        verifier: Option<Arc<dyn HeadlessVerifier>>,
    ) -> Self {
        Self {
            options,
            target,
            verdicts,
            results,
            verifier,
        }
    }

    /// Classify one executed job. `vds` is the DOM-object verdict, `vrs`
    /// the raw-reflection verdict, both already context-filtered by the
    /// worker.
    pub async fn classify(&self, job: &Job, response: &HttpResponse, vds: bool, vrs: bool, message_id: i64) {
        let ty = job.meta.inject_type.as_str();
        if !is_verification_eligible(ty) {
            // Blind probes confirm out-of-band through the callback host.
            return;
        }
        let param = job.meta.param.as_str();

        if ty.contains("inJS") {
            if !vrs || self.verdicts.is_confirmed(param) {
                return;
            }
            if self.is_escape_protected(response, &job.meta.payload) {
                debug!("Escaped reflection for '{}', skipping protected injection", param);
                return;
            }
            match &self.verifier {
                Some(verifier) => {
                    if self.dialog_triggered(verifier, job.request.url.as_str()).await {
                        info!("Triggered XSS Payload (found dialog in headless)");
                        self.emit(
                            PocKind::V,
                            job,
                            response,
                            "CWE-79",
                            "High",
                            String::new(),
                            "Triggered XSS Payload (found dialog in headless)".to_string(),
                            message_id,
                        )
                        .await;
                    } else {
                        warn!("Reflected Payload in JS: {}={}", param, job.meta.payload);
                        self.emit(
                            PocKind::R,
                            job,
                            response,
                            "CWE-79",
                            "Medium",
                            String::new(),
                            format!("Reflected Payload in JS: {}={}", param, job.meta.payload),
                            message_id,
                        )
                        .await;
                    }
                }
                None => {
                    let code = verify::code_view(&response.body, &job.meta.payload);
                    warn!("Reflected Payload in JS: {}={}", param, job.meta.payload);
                    self.emit(
                        PocKind::R,
                        job,
                        response,
                        "CWE-79",
                        "Medium",
                        code,
                        format!("Reflected Payload in JS: {}={}", param, job.meta.payload),
                        message_id,
                    )
                    .await;
                }
            }
        } else if ty.contains("inATTR") {
            if vds && !self.verdicts.is_confirmed(param) {
                let code = verify::code_view(&response.body, &job.meta.payload);
                info!("Triggered XSS Payload (found DOM Object): {}={}", param, job.meta.payload);
                self.emit(
                    PocKind::V,
                    job,
                    response,
                    "CWE-83",
                    "High",
                    code,
                    format!("Triggered XSS Payload (found DOM Object): {}={}", param, job.meta.payload),
                    message_id,
                )
                .await;
            } else if vrs && !self.verdicts.is_confirmed(param) {
                let code = verify::code_view(&response.body, &job.meta.payload);
                warn!("Reflected Payload in Attribute: {}={}", param, job.meta.payload);
                self.emit(
                    PocKind::R,
                    job,
                    response,
                    "CWE-83",
                    "Medium",
                    code,
                    format!("Reflected Payload in Attribute: {}={}", param, job.meta.payload),
                    message_id,
                )
                .await;
            }
        } else {
            if vds && !self.verdicts.is_confirmed(param) {
                let code = verify::code_view(&response.body, &job.meta.payload);
                info!("Triggered XSS Payload (found DOM Object): {}={}", param, job.meta.payload);
                self.emit(
                    PocKind::V,
                    job,
                    response,
                    "CWE-79",
                    "High",
                    code,
                    format!("Triggered XSS Payload (found DOM Object): {}={}", param, job.meta.payload),
                    message_id,
                )
                .await;
            } else if vrs && !self.verdicts.is_confirmed(param) {
                let code = verify::code_view(&response.body, &job.meta.payload);
                warn!("Reflected Payload in HTML: {}={}", param, job.meta.payload);
                self.emit(
                    PocKind::R,
                    job,
                    response,
                    "CWE-79",
                    "Medium",
                    code,
                    format!("Reflected Payload in HTML: {}={}", param, job.meta.payload),
                    message_id,
                )
                .await;
            }
        }
    }

    /// Verified finding from the headless DOM pool.
    pub async fn emit_headless(&self, url: &str) {
        info!("Triggered XSS Payload (found dialog in headless)");
        let poc = Poc {
            kind: "V".to_string(),
            inject_type: "headless".to_string(),
            method: "GET".to_string(),
            data: url.to_string(),
            param: String::new(),
            payload: String::new(),
            evidence: String::new(),
            cwe: "CWE-79".to_string(),
            severity: "High".to_string(),
            poc_type: self.options.poc_type.as_str().to_string(),
            message_id: 0,
            message_str: "Triggered XSS Payload (found dialog in headless)".to_string(),
            raw_http_request: None,
            raw_http_response: None,
        };
        let (_, show_v) = self.options.poc_filter();
        if show_v {
            output::print_poc(&poc, &self.options);
        }
        output::found_action(&self.options, &self.target, url, "VULN").await;
        let _ = self.results.send(poc);
    }

    /// A reflection preceded by a backslash the payload itself does not
    /// carry means the server escaped the breakout; nothing executes.
    fn is_escape_protected(&self, response: &HttpResponse, payload: &str) -> bool {
        verify::verify_reflection(&response.body, &format!("\\{}", payload))
            && !payload.contains('\\')
    }

    async fn dialog_triggered(&self, verifier: &Arc<dyn HeadlessVerifier>, url: &str) -> bool {
        let verifier = Arc::clone(verifier);
        let url = url.to_string();
        tokio::task::spawn_blocking(move || verifier.triggers_dialog(&url))
            .await
            .unwrap_or(false)
    }

    #[allow(clippy::too_many_arguments)]
    async fn emit(
        &self,
        kind: PocKind,
        job: &Job,
        response: &HttpResponse,
        cwe: &str,
        severity: &str,
        evidence: String,
        message: String,
        message_id: i64,
    ) {
        if kind == PocKind::V {
            self.verdicts.confirm(&job.meta.param);
        }

        let data = output::make_poc(job.request.url.as_str(), &job.request, &self.options);
        let mut poc = Poc {
            kind: kind.as_str().to_string(),
            inject_type: job.meta.inject_type.clone(),
            method: job.request.method.clone(),
            data,
            param: job.meta.param.clone(),
            payload: job.meta.payload.clone(),
            evidence,
            cwe: cwe.to_string(),
            severity: severity.to_string(),
            poc_type: self.options.poc_type.as_str().to_string(),
            message_id,
            message_str: message,
            raw_http_request: None,
            raw_http_response: None,
        };
        if self.options.output_request {
            poc.raw_http_request = Some(job.request.dump());
        }
        if self.options.output_response {
            poc.raw_http_response = Some(response.body.clone());
        }

        let (show_r, show_v) = self.options.poc_filter();
        let show = match kind {
            PocKind::V => show_v,
            PocKind::R => show_r,
        };
        if show {
            output::print_poc(&poc, &self.options);
        }

        let tag = match kind {
            PocKind::V => "VULN",
            PocKind::R => "WEAK",
        };
        output::found_action(&self.options, &self.target, job.request.url.as_str(), tag).await;

        let _ = self.results.send(poc);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encoding::Encoder;
    use crate::request::{build_param_probe, Placement};
    use std::collections::HashMap as StdHashMap;
    use url::Url;

    struct NeverTriggers;
    impl HeadlessVerifier for NeverTriggers {
        fn triggers_dialog(&self, _url: &str) -> bool {
            false
        }
    }

    struct AlwaysTriggers;
    impl HeadlessVerifier for AlwaysTriggers {
        fn triggers_dialog(&self, _url: &str) -> bool {
            true
        }
    }

    fn job_for(payload: &str, inject_type: &str) -> Job {
        let target = Url::parse("https://target.example/?q=1").unwrap();
        build_param_probe(
            &target,
            "q",
            payload,
            inject_type,
            Placement::Append,
            Encoder::Plain,
            &ScanOptions::default(),
        )
    }

    fn response_with(body: &str) -> HttpResponse {
        HttpResponse {
            status_code: 200,
            headers: StdHashMap::new(),
            body: body.to_string(),
            duration_ms: 5,
        }
    }

    fn classifier(
        verifier: Option<Arc<dyn HeadlessVerifier>>,
    ) -> (Classifier, mpsc::UnboundedReceiver<Poc>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let c = Classifier::new(
            Arc::new(ScanOptions::default()),
            "https://target.example/?q=1".to_string(),
            Arc::new(VerdictStatus::new()),
            tx,
            verifier,
        );
        (c, rx)
    }

    #[tokio::test]
    async fn test_html_dom_verdict_yields_verified() {
        let (c, mut rx) = classifier(None);
        let job = job_for("<svg class=kettu onload=alert(1)>", "inHTML-URL");
        let response = response_with("<html><svg class=kettu onload=alert(1)></html>");
        c.classify(&job, &response, true, true, 7).await;

        let poc = rx.recv().await.unwrap();
        assert_eq!(poc.kind, "V");
        assert_eq!(poc.cwe, "CWE-79");
        assert_eq!(poc.severity, "High");
        assert_eq!(poc.message_id, 7);
        assert!(c.verdicts.is_confirmed("q"));
    }

    #[tokio::test]
    async fn test_html_reflection_yields_weak() {
        let (c, mut rx) = classifier(None);
        let job = job_for("<x>probe</x>", "inHTML-URL");
        let response = response_with("<html>&lt;x&gt;<x>probe</x></html>");
        c.classify(&job, &response, false, true, 1).await;

        let poc = rx.recv().await.unwrap();
        assert_eq!(poc.kind, "R");
        assert_eq!(poc.severity, "Medium");
        assert!(!c.verdicts.is_confirmed("q"));
    }

    #[tokio::test]
    async fn test_attr_dom_verdict_uses_cwe_83() {
        let (c, mut rx) = classifier(None);
        let job = job_for("\" onmouseover=alert(1) class=kettu x=\"", "inATTR-double");
        let response = response_with("<input value=\"\" onmouseover=alert(1) class=kettu x=\"\">");
        c.classify(&job, &response, true, true, 1).await;

        let poc = rx.recv().await.unwrap();
        assert_eq!(poc.kind, "V");
        assert_eq!(poc.cwe, "CWE-83");
    }

    #[tokio::test]
    async fn test_escaped_js_reflection_is_protected() {
        let (c, mut rx) = classifier(None);
        let payload = "\";alert(1);//";
        let job = job_for(payload, "inJS-double");
        // The server prefixed the breakout quote with a backslash.
        let body = format!("<script>var q = \"\\{}\";</script>", payload);
        let response = response_with(&body);
        c.classify(&job, &response, false, true, 1).await;
        drop(c);
        assert!(rx.recv().await.is_none());
    }

    #[tokio::test]
    async fn test_backslash_payload_bypasses_protection_check() {
        let (c, mut rx) = classifier(None);
        let payload = "\\\";alert(1);//";
        let job = job_for(payload, "inJS-double");
        let body = format!("<script>var q = \"{}\";</script>", payload);
        let response = response_with(&body);
        c.classify(&job, &response, false, true, 1).await;

        let poc = rx.recv().await.unwrap();
        assert_eq!(poc.kind, "R");
        assert!(poc.inject_type.contains("inJS"));
    }

    #[tokio::test]
    async fn test_js_reflection_with_headless_trigger_is_verified() {
        let (c, mut rx) = classifier(Some(Arc::new(AlwaysTriggers)));
        let payload = "\";alert(1);//";
        let job = job_for(payload, "inJS-double");
        let body = format!("<script>var q = \"{}\";</script>", payload);
        c.classify(&job, &response_with(&body), false, true, 1).await;

        let poc = rx.recv().await.unwrap();
        assert_eq!(poc.kind, "V");
        assert!(c.verdicts.is_confirmed("q"));
    }

    #[tokio::test]
    async fn test_js_reflection_without_trigger_is_weak() {
        let (c, mut rx) = classifier(Some(Arc::new(NeverTriggers)));
        let payload = "\";alert(1);//";
        let job = job_for(payload, "inJS-double");
        let body = format!("<script>var q = \"{}\";</script>", payload);
        c.classify(&job, &response_with(&body), false, true, 1).await;

        let poc = rx.recv().await.unwrap();
        assert_eq!(poc.kind, "R");
    }

    #[tokio::test]
    async fn test_blind_type_emits_nothing() {
        let (c, mut rx) = classifier(None);
        let job = job_for("\"><script src=//cb.example/x></script>", "toBlind");
        let response = response_with("<html>\"><script src=//cb.example/x></script></html>");
        c.classify(&job, &response, true, true, 1).await;
        drop(c);
        assert!(rx.recv().await.is_none());
    }

    #[tokio::test]
    async fn test_confirmed_param_suppresses_weak_findings() {
        let (c, mut rx) = classifier(None);
        c.verdicts.seed([&"q".to_string()].into_iter());
        c.verdicts.confirm("q");
        let job = job_for("<x>probe</x>", "inHTML-URL");
        let response = response_with("<html><x>probe</x></html>");
        c.classify(&job, &response, false, true, 1).await;
        drop(c);
        assert!(rx.recv().await.is_none());
    }

    #[tokio::test]
    async fn test_headless_poc_shape() {
        let (c, mut rx) = classifier(None);
        c.emit_headless("https://target.example/?q=<svg onload=alert(1)>").await;
        let poc = rx.recv().await.unwrap();
        assert_eq!(poc.kind, "V");
        assert_eq!(poc.inject_type, "headless");
        assert_eq!(poc.method, "GET");
        assert!(poc.param.is_empty());
    }

    #[test]
    fn test_verdict_status_all_confirmed() {
        let v = VerdictStatus::new();
        assert!(!v.all_confirmed());
        let names = vec!["a".to_string(), "b".to_string()];
        v.seed(names.iter());
        assert!(!v.all_confirmed());
        v.confirm("a");
        v.confirm("b");
        assert!(v.all_confirmed());
    }
}
