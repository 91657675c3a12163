// src/config.rs
// =============================================================================
// This file defines the configuration record handed to the link checker.
//
// Every option the checker understands lives in one immutable struct.
// The CLI builds it from flags, an embedding application can build it by
// hand or deserialize it from JSON. Nothing else in the crate reads options
// from anywhere but this struct.
//
// Rust concepts:
// - Default: A trait that gives a type its "zero" value
// - serde(default): Missing fields fall back to the Default impl
// - Enums with data: SchedulePolicy carries different data per variant
// =============================================================================

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::time::Duration;

/// Pool width used when no request delay is configured.
pub const DEFAULT_CONCURRENCY: usize = 10;

/// Per-probe timeout used when none is configured.
pub const DEFAULT_TIMEOUT_SECS: u64 = 10;

/// Redirect hops followed before a probe gives up.
pub const DEFAULT_MAX_REDIRECTS: usize = 5;

// All options recognized by the checker
//
// #[serde(default)] means a JSON object only needs the fields it wants
// to change, e.g. {"allow_dupe": true}
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CheckConfig {
    /// Duplicate URLs do not cause failure
    pub allow_dupe: bool,
    /// Redirected URLs do not cause failure
    pub allow_redirect: bool,
    /// SSL errors do not cause failure
    pub allow_ssl: bool,
    /// Timeouts do not cause failure
    pub allow_timeout: bool,
    /// Status codes treated as OK even though they are not 2xx
    pub allowed_status_codes: BTreeSet<u16>,
    /// Base URL used to resolve relative links
    pub base_url: Option<String>,
    /// Seconds to wait between requests; forces serial probing
    pub request_delay: Option<u64>,
    /// Per-probe timeout in seconds
    pub timeout: Option<u64>,
    /// URLs containing any of these patterns are never reported as failures
    pub white_list: Vec<String>,
    /// Report Markdown link syntax problems
    pub markdown: bool,
    /// Number of probes in flight when probing in parallel
    pub concurrency: usize,
    /// Maximum redirect hops before a probe is reported as a redirect failure
    pub max_redirects: usize,
}

impl Default for CheckConfig {
    fn default() -> Self {
        Self {
            allow_dupe: false,
            allow_redirect: false,
            allow_ssl: false,
            allow_timeout: false,
            allowed_status_codes: BTreeSet::new(),
            base_url: None,
            request_delay: None,
            timeout: None,
            white_list: Vec::new(),
            markdown: false,
            concurrency: DEFAULT_CONCURRENCY,
            max_redirects: DEFAULT_MAX_REDIRECTS,
        }
    }
}

// How the scheduler runs probes
//
// Chosen once, when the scheduler is built:
// - Serial: one probe at a time with a pause in between (avoids rate limits)
// - Parallel: up to `width` probes at the same time, no pause
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulePolicy {
    Serial { delay: Duration },
    Parallel { width: usize },
}

impl CheckConfig {
    /// Picks the scheduling policy: a configured delay always means serial.
    pub fn schedule_policy(&self) -> SchedulePolicy {
        match self.request_delay {
            Some(secs) => SchedulePolicy::Serial {
                delay: Duration::from_secs(secs),
            },
            None => SchedulePolicy::Parallel {
                // A width of zero would never make progress
                width: self.concurrency.max(1),
            },
        }
    }

    /// The timeout applied to every individual probe.
    pub fn probe_timeout(&self) -> Duration {
        Duration::from_secs(self.timeout.unwrap_or(DEFAULT_TIMEOUT_SECS))
    }

    /// True when `url` matches one of the white-list patterns.
    ///
    /// Patterns match as plain substrings, so `example.com` white-lists
    /// every link on that host.
    pub fn is_white_listed(&self, url: &str) -> bool {
        self.white_list
            .iter()
            .filter(|pattern| !pattern.is_empty())
            .any(|pattern| url.contains(pattern.as_str()))
    }
}
