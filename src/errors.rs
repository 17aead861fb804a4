// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

/**
 * Bountyy Oy - Scan Error Types
 * Fatal error surface of the scan driver
 *
 * @copyright 2026 Bountyy Oy
 * @license Proprietary
 */

use thiserror::Error;

/// Errors that abort a scan before or during startup.
///
/// Everything else (per-job transport failures, payload load failures,
/// headless verifier errors) is recovered locally and only visible through
/// log output and the absence of corresponding findings.
#[derive(Error, Debug)]
pub enum ScanError {
    /// The target could not be parsed as an absolute URL.
    #[error("invalid target URL '{url}': {source}")]
    InvalidTarget {
        url: String,
        #[source]
        source: url::ParseError,
    },

    /// Configuration rejected before any I/O was performed.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// The initial validation request against the target failed.
    #[error("target unreachable: {0}")]
    TargetUnreachable(#[from] reqwest::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = ScanError::Configuration("skip-discovery requires parameters".to_string());
        assert!(err.to_string().contains("configuration error"));
    }
}
