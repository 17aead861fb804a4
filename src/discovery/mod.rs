// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

/**
 * Bountyy Oy - Discovery Coordinator
 * Runs static analysis, parameter analysis and optional BAV in parallel
 *
 * @copyright 2026 Bountyy Oy
 * @license Proprietary
 */

pub mod bav;
pub mod parameter_analysis;
pub mod static_analysis;

use std::collections::HashMap;
use std::sync::Arc;

use reqwest::Client;
use tokio::sync::mpsc;
use tracing::info;
use url::Url;

use crate::config::ScanOptions;
use crate::rate_limiter::HostGate;
use crate::types::{ParamResult, Poc};

/// Everything discovery hands to the matrix builder. Read-only thereafter.
#[derive(Debug, Default)]
pub struct DiscoveryOutcome {
    pub policy: HashMap<String, String>,
    pub path_reflection: HashMap<usize, String>,
    pub params: HashMap<String, ParamResult>,
}

/// Run the 2-3 discovery analyses concurrently and wait for all of them.
/// BAV findings surface through the results channel independently of the
/// XSS classification pipeline.
pub async fn run_discovery(
    target: &Url,
    options: &Arc<ScanOptions>,
    client: &Client,
    gate: &Arc<HostGate>,
    results: &mpsc::UnboundedSender<Poc>,
) -> DiscoveryOutcome {
    let tasks = if options.use_bav { "SA PA BAV" } else { "SA PA" };
    info!("[{}] Waiting for analysis", tasks);

    let ((policy, path_reflection), params, _) = tokio::join!(
        static_analysis::static_analysis(target, options, client, gate),
        parameter_analysis::parameter_analysis(target, options, client, gate),
        async {
            if options.use_bav {
                bav::run_bav_analysis(target, options, client, gate, results).await;
            }
        },
    );

    DiscoveryOutcome {
        policy,
        path_reflection,
        params,
    }
}
