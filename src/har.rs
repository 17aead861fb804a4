// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

//! Message-id correlator. An opaque sink that hands out one id per
//! executed probe so findings can be matched to recorded traffic.

use std::sync::atomic::{AtomicI64, Ordering};

pub struct MessageSink {
    counter: AtomicI64,
}

impl MessageSink {
    pub fn new() -> Self {
        Self {
            counter: AtomicI64::new(0),
        }
    }

    /// Issue the next message id.
    pub fn issue(&self) -> i64 {
        self.counter.fetch_add(1, Ordering::Relaxed) + 1
    }

    /// Number of ids issued so far; eventually consistent.
    pub fn issued(&self) -> i64 {
        self.counter.load(Ordering::Relaxed)
    }
}

impl Default for MessageSink {
    fn default() -> Self {
        Self::new()
    }
}
