// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

/**
 * Bountyy Oy - Per-Host Rate Gate
 * Minimum inter-request delay enforcement, keyed by host
 *
 * @copyright 2026 Bountyy Oy
 * @license Proprietary
 */

use governor::{
    clock::DefaultClock,
    state::{InMemoryState, NotKeyed},
    Quota, RateLimiter as GovernorRateLimiter,
};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::debug;

type HostLimiter = GovernorRateLimiter<NotKeyed, InMemoryState, DefaultClock>;

/// Per-host token gate.
///
/// `block(host)` does not return until at least the configured delay has
/// elapsed since the previous `block` for the same host. Hosts share no
/// ordering; a zero delay makes the gate a no-op. Safe for concurrent
/// callers: workers simply stall on the gate.
pub struct HostGate {
    delay: Duration,
    gates: RwLock<HashMap<String, Arc<HostLimiter>>>,
}

impl HostGate {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            gates: RwLock::new(HashMap::new()),
        }
    }

    pub fn from_millis(delay_ms: u64) -> Self {
        Self::new(Duration::from_millis(delay_ms))
    }

    pub async fn block(&self, host: &str) {
        if self.delay.is_zero() {
            return;
        }
        let Some(quota) = Quota::with_period(self.delay) else {
            return;
        };

        let limiter = {
            let gates = self.gates.read().await;
            gates.get(host).cloned()
        };
        let limiter = match limiter {
            Some(l) => l,
            None => {
                let mut gates = self.gates.write().await;
                Arc::clone(gates.entry(host.to_string()).or_insert_with(|| {
                    debug!("Opening rate gate for {} ({}ms period)", host, self.delay.as_millis());
                    Arc::new(GovernorRateLimiter::direct(quota))
                }))
            }
        };

        limiter.until_ready().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;

    #[tokio::test]
    async fn test_zero_delay_is_noop() {
        let gate = HostGate::from_millis(0);
        let start = Instant::now();
        for _ in 0..50 {
            gate.block("target.example").await;
        }
        assert!(start.elapsed() < Duration::from_millis(50));
    }

    #[tokio::test]
    async fn test_consecutive_blocks_observe_delay() {
        let gate = HostGate::from_millis(80);
        gate.block("target.example").await;
        let start = Instant::now();
        gate.block("target.example").await;
        // Scheduling slack: the second call must wait out most of the period.
        assert!(start.elapsed() >= Duration::from_millis(60));
    }

    #[tokio::test]
    async fn test_distinct_hosts_share_no_ordering() {
        let gate = HostGate::from_millis(200);
        gate.block("a.example").await;
        let start = Instant::now();
        gate.block("b.example").await;
        assert!(start.elapsed() < Duration::from_millis(100));
    }
}
