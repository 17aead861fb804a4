// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

/**
 * Bountyy Oy - Worker Pool & Dispatcher
 * Rate-limited probe execution over a shared job channel, with a parallel
 * DOM pool feeding the headless verifier
 *
 * @copyright 2026 Bountyy Oy
 * @license Proprietary
 */

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinSet;
use tracing::{debug, info};

use crate::classifier::Classifier;
use crate::config::ScanOptions;
use crate::har::MessageSink;
use crate::headless::HeadlessVerifier;
use crate::http_client;
use crate::rate_limiter::HostGate;
use crate::request::Job;
use crate::types::is_verification_eligible;
use crate::verify;

/// Shared handles every worker needs.
pub struct PoolContext {
    pub options: Arc<ScanOptions>,
    pub client: reqwest::Client,
    pub gate: Arc<HostGate>,
    pub classifier: Arc<Classifier>,
    pub messages: Arc<MessageSink>,
    pub verifier: Option<Arc<dyn HeadlessVerifier>>,
}

/// Run the HTTP worker pool and, when headless is enabled, the DOM pool.
/// Returns once every job and DOM URL has been consumed.
pub async fn run_pool(jobs: Vec<Job>, dom_urls: Vec<String>, ctx: Arc<PoolContext>) {
    let total = jobs.len() + dom_urls.len();
    info!(
        "[ Make {} workers ] [ Allocated {} queries ]",
        ctx.options.concurrency,
        jobs.len()
    );

    let progress = Arc::new(AtomicUsize::new(0));
    let mut pools = JoinSet::new();

    if ctx.verifier.is_some() && !dom_urls.is_empty() {
        let ctx = Arc::clone(&ctx);
        let progress = Arc::clone(&progress);
        pools.spawn(async move {
            run_dom_pool(dom_urls, ctx, progress, total).await;
        });
    }

    {
        let ctx = Arc::clone(&ctx);
        let progress = Arc::clone(&progress);
        pools.spawn(async move {
            run_http_pool(jobs, ctx, progress, total).await;
        });
    }

    while pools.join_next().await.is_some() {}
}

async fn run_http_pool(
    jobs: Vec<Job>,
    ctx: Arc<PoolContext>,
    progress: Arc<AtomicUsize>,
    total: usize,
) {
    let (tx, rx) = mpsc::channel::<Job>(1);
    let rx = Arc::new(Mutex::new(rx));

    let mut workers = JoinSet::new();
    for _ in 0..ctx.options.concurrency {
        let ctx = Arc::clone(&ctx);
        let rx = Arc::clone(&rx);
        let progress = Arc::clone(&progress);
        workers.spawn(async move {
            loop {
                let job = { rx.lock().await.recv().await };
                let Some(job) = job else { break };
                process_job(&job, &ctx).await;
                let done = progress.fetch_add(1, Ordering::Relaxed) + 1;
                if done % 100 == 0 {
                    debug!("[{}/{} queries] scanning", done, total);
                }
            }
        });
    }

    for job in jobs {
        if tx.send(job).await.is_err() {
            break;
        }
    }
    drop(tx);

    while workers.join_next().await.is_some() {}
}

async fn process_job(job: &Job, ctx: &PoolContext) {
    // Speed-up: once every parameter is confirmed there is nothing left
    // to learn from the remaining queries.
    if ctx.classifier.verdicts.all_confirmed() {
        return;
    }
    let eligible = is_verification_eligible(&job.meta.inject_type);
    if ctx.classifier.verdicts.is_confirmed(&job.meta.param) && !eligible {
        return;
    }

    ctx.gate.block(&job.request.host()).await;

    let response = match http_client::execute(&ctx.client, &job.request).await {
        Ok(response) => response,
        Err(e) => {
            // Spurious transport errors are non-fatal; drop the job.
            debug!("Probe failed ({}): {}", job.request.url, e);
            return;
        }
    };
    let message_id = ctx.messages.issue();

    let vds = verify::verify_dom_marker(&response.body);
    let mut vrs = verify::verify_reflection(&response.body, &job.meta.payload);
    if vrs {
        let abs = verify::abstraction(&response.body, &job.meta.payload);
        if !verify::context_matches(&abs, &job.meta.inject_type) {
            vrs = false;
        }
    }

    ctx.classifier.classify(job, &response, vds, vrs, message_id).await;
}

async fn run_dom_pool(
    dom_urls: Vec<String>,
    ctx: Arc<PoolContext>,
    progress: Arc<AtomicUsize>,
    total: usize,
) {
    let Some(verifier) = ctx.verifier.clone() else {
        return;
    };
    let (tx, rx) = mpsc::channel::<String>(1);
    let rx = Arc::new(Mutex::new(rx));

    let mut workers = JoinSet::new();
    for _ in 0..ctx.options.dom_concurrency() {
        let ctx = Arc::clone(&ctx);
        let rx = Arc::clone(&rx);
        let verifier = Arc::clone(&verifier);
        let progress = Arc::clone(&progress);
        workers.spawn(async move {
            loop {
                let url = { rx.lock().await.recv().await };
                let Some(url) = url else { break };
                let triggered = {
                    let verifier = Arc::clone(&verifier);
                    let check_url = url.clone();
                    tokio::task::spawn_blocking(move || verifier.triggers_dialog(&check_url))
                        .await
                        .unwrap_or(false)
                };
                if triggered {
                    ctx.classifier.emit_headless(&url).await;
                }
                let done = progress.fetch_add(1, Ordering::Relaxed) + 1;
                if done % 100 == 0 {
                    debug!("[{}/{} queries] scanning", done, total);
                }
            }
        });
    }

    for url in dom_urls {
        if tx.send(url).await.is_err() {
            break;
        }
    }
    drop(tx);

    while workers.join_next().await.is_some() {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::VerdictStatus;
    use crate::types::Poc;

    struct AlwaysTriggers;
    impl HeadlessVerifier for AlwaysTriggers {
        fn triggers_dialog(&self, _url: &str) -> bool {
            true
        }
    }

    fn pool_context(
        verifier: Option<Arc<dyn HeadlessVerifier>>,
    ) -> (Arc<PoolContext>, mpsc::UnboundedReceiver<Poc>) {
        let options = Arc::new(ScanOptions {
            concurrency: 4,
            ..Default::default()
        });
        let (tx, rx) = mpsc::unbounded_channel();
        let classifier = Arc::new(Classifier::new(
            Arc::clone(&options),
            "https://target.example/".to_string(),
            Arc::new(VerdictStatus::new()),
            tx,
            verifier.clone(),
        ));
        let ctx = Arc::new(PoolContext {
            options,
            client: reqwest::Client::new(),
            gate: Arc::new(HostGate::from_millis(0)),
            classifier,
            messages: Arc::new(MessageSink::new()),
            verifier,
        });
        (ctx, rx)
    }

    #[tokio::test]
    async fn test_empty_matrix_drains_immediately() {
        let (ctx, _rx) = pool_context(None);
        run_pool(Vec::new(), Vec::new(), ctx).await;
    }

    #[tokio::test]
    async fn test_dom_pool_emits_headless_findings() {
        let (ctx, mut rx) = pool_context(Some(Arc::new(AlwaysTriggers)));
        let dom_urls = vec![
            "https://target.example/?q=%3Csvg%20onload%3Dalert(1)%3E".to_string(),
            "https://target.example/?id=%3Cimg%20src%3Dx%3E".to_string(),
        ];
        run_pool(Vec::new(), dom_urls, ctx).await;

        let mut found = Vec::new();
        while let Ok(poc) = rx.try_recv() {
            found.push(poc);
        }
        assert_eq!(found.len(), 2);
        assert!(found.iter().all(|p| p.kind == "V" && p.inject_type == "headless"));
    }
}
