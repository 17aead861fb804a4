// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

/**
 * Bountyy Oy - Headless Dialog Oracle
 * Boolean verdict: does navigating to a URL trigger a JavaScript dialog?
 *
 * @copyright 2026 Bountyy Oy
 * @license Proprietary
 */

use std::time::Duration;

use anyhow::Result;
use headless_chrome::{Browser, LaunchOptions};
use tracing::debug;

/// Yes/no dialog oracle for a URL. Implementations must treat their own
/// failures as "no trigger".
pub trait HeadlessVerifier: Send + Sync {
    fn triggers_dialog(&self, url: &str) -> bool;
}

/// Chromium-backed verifier. Hooks `alert`/`confirm`/`prompt` before
/// navigation and reads the trigger flag back after the page settles.
pub struct ChromiumVerifier {
    timeout: Duration,
}

impl ChromiumVerifier {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    fn check(&self, url: &str) -> Result<bool> {
        let browser = Browser::new(
            LaunchOptions::default_builder()
                .headless(true)
                .idle_browser_timeout(self.timeout)
                .build()
                .map_err(|e| anyhow::anyhow!("Browser launch error: {}", e))?,
        )?;
        let tab = browser.new_tab()?;

        let setup_js = r#"
            window.__dialogTriggered = false;
            window.alert = function() { window.__dialogTriggered = true; };
            window.confirm = function() { window.__dialogTriggered = true; return true; };
            window.prompt = function() { window.__dialogTriggered = true; return ''; };
        "#;

        tab.navigate_to("about:blank")?;
        tab.evaluate(setup_js, false)?;
        tab.navigate_to(url)?;
        std::thread::sleep(Duration::from_secs(2));

        let result = tab.evaluate("window.__dialogTriggered === true", false)?;
        Ok(result.value.and_then(|v| v.as_bool()).unwrap_or(false))
    }
}

impl HeadlessVerifier for ChromiumVerifier {
    fn triggers_dialog(&self, url: &str) -> bool {
        match self.check(url) {
            Ok(triggered) => triggered,
            Err(e) => {
                debug!("Headless check failed for {}: {}", url, e);
                false
            }
        }
    }
}
