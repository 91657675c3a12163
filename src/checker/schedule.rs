// src/checker/schedule.rs
// =============================================================================
// This module runs the prober over every unique URL.
//
// How it works:
// 1. A driver task owns the list of URLs and starts probes according to
//    the policy (parallel pool, or one at a time with a delay)
// 2. Each finished probe is sent over a channel
// 3. The caller's side of the channel receives outcomes in completion order,
//    reports each one through the progress callback, and collects them
//
// The progress callback runs synchronously on the caller's task and must be
// cheap. On a multi-threaded runtime the driver keeps probing while the
// callback runs; on a current-thread runtime (the #[tokio::test] default)
// a slow callback stalls the probes too, since both share one thread.
// Every URL is probed exactly once, and one failing probe never stops the
// others.
//
// Rust concepts:
// - tokio::spawn: Runs a future as an independent task
// - mpsc channel: Multi-producer, single-consumer message passing
// - Arc: Shared ownership of the prober between tasks
// - buffer_unordered: Runs up to N futures at once
// =============================================================================

use futures::stream::{self, StreamExt};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use super::http::{FailureKind, Probe, ProbeOutcome};
use crate::config::SchedulePolicy;

pub struct Scheduler {
    prober: Arc<dyn Probe>,
    policy: SchedulePolicy,
    timeout: Duration,
}

impl Scheduler {
    // Parameters:
    //   prober: does the actual checking
    //   policy: parallel pool or serial with delay, fixed for the scheduler's life
    //   timeout: upper bound for each individual probe
    pub fn new(prober: Arc<dyn Probe>, policy: SchedulePolicy, timeout: Duration) -> Self {
        Self {
            prober,
            policy,
            timeout,
        }
    }

    pub fn policy(&self) -> SchedulePolicy {
        self.policy
    }

    // Probes every URL once and returns all outcomes
    //
    // `on_complete` is called once per finished probe, in completion order.
    // The returned Vec is in completion order too.
    pub async fn run<F>(&self, urls: Vec<String>, mut on_complete: F) -> Vec<ProbeOutcome>
    where
        F: FnMut(&ProbeOutcome),
    {
        let total = urls.len();
        debug!(total, policy = ?self.policy, "scheduling probes");

        let (tx, mut rx) = mpsc::unbounded_channel();
        let driver = tokio::spawn(drive(
            Arc::clone(&self.prober),
            self.policy,
            self.timeout,
            urls,
            tx,
        ));

        let mut outcomes = Vec::with_capacity(total);
        while let Some(outcome) = rx.recv().await {
            on_complete(&outcome);
            outcomes.push(outcome);
        }

        // The channel closes when the driver finishes; a panic in a prober
        // would surface here
        if let Err(e) = driver.await {
            warn!(error = %e, "probe driver stopped early");
        }

        outcomes
    }
}

// Starts probes and forwards their outcomes
async fn drive(
    prober: Arc<dyn Probe>,
    policy: SchedulePolicy,
    timeout: Duration,
    urls: Vec<String>,
    tx: mpsc::UnboundedSender<ProbeOutcome>,
) {
    match policy {
        SchedulePolicy::Serial { delay } => {
            for (i, url) in urls.into_iter().enumerate() {
                // Pause between requests, not before the first one
                if i > 0 && !delay.is_zero() {
                    tokio::time::sleep(delay).await;
                }
                let outcome = bounded_probe(prober.as_ref(), url, timeout).await;
                if tx.send(outcome).is_err() {
                    return;
                }
            }
        }
        SchedulePolicy::Parallel { width } => {
            let probes = urls.into_iter().map(|url| {
                let prober = Arc::clone(&prober);
                async move { bounded_probe(prober.as_ref(), url, timeout).await }
            });

            // Run up to `width` probes at once, yield results as they complete
            let mut finished = stream::iter(probes).buffer_unordered(width.max(1));
            while let Some(outcome) = finished.next().await {
                if tx.send(outcome).is_err() {
                    return;
                }
            }
        }
    }
}

// Runs one probe, turning an elapsed timeout into a Timeout outcome
//
// The clock starts when the probe starts, not when it was queued, so a busy
// pool never eats into a probe's time budget.
async fn bounded_probe(prober: &dyn Probe, url: String, timeout: Duration) -> ProbeOutcome {
    match tokio::time::timeout(timeout, prober.probe(&url)).await {
        Ok(outcome) => outcome,
        Err(_) => ProbeOutcome::failed(
            url,
            FailureKind::Timeout,
            format!("no response within {:?}", timeout),
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::collections::HashSet;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use std::time::Instant;

    // Fake prober that records how many probes run at the same time
    #[derive(Default)]
    struct CountingProber {
        in_flight: AtomicUsize,
        max_in_flight: AtomicUsize,
        calls: Mutex<Vec<String>>,
        latency: Duration,
    }

    impl CountingProber {
        fn with_latency(latency: Duration) -> Self {
            Self {
                latency,
                ..Self::default()
            }
        }
    }

    #[async_trait]
    impl Probe for CountingProber {
        async fn probe(&self, url: &str) -> ProbeOutcome {
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_in_flight.fetch_max(now, Ordering::SeqCst);
            self.calls.lock().unwrap().push(url.to_string());

            if url.contains("slow") {
                tokio::time::sleep(Duration::from_secs(60)).await;
            } else {
                tokio::time::sleep(self.latency).await;
            }

            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            if url.contains("down") {
                ProbeOutcome::failed(url, FailureKind::ConnectionError, "refused")
            } else {
                ProbeOutcome {
                    url: url.to_string(),
                    status_code: Some(200),
                    failure: FailureKind::None,
                    final_url: None,
                    message: None,
                }
            }
        }
    }

    fn urls(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("https://site{i}.example/")).collect()
    }

    #[tokio::test]
    async fn test_pool_never_exceeds_width() {
        let prober = Arc::new(CountingProber::with_latency(Duration::from_millis(20)));
        let scheduler = Scheduler::new(
            prober.clone(),
            SchedulePolicy::Parallel { width: 10 },
            Duration::from_secs(5),
        );

        let outcomes = scheduler.run(urls(25), |_| {}).await;

        assert_eq!(outcomes.len(), 25);
        assert!(prober.max_in_flight.load(Ordering::SeqCst) <= 10);
        assert!(prober.max_in_flight.load(Ordering::SeqCst) > 1);

        // Each URL exactly once
        let calls = prober.calls.lock().unwrap();
        let unique: HashSet<_> = calls.iter().collect();
        assert_eq!(calls.len(), 25);
        assert_eq!(unique.len(), 25);
    }

    #[tokio::test]
    async fn test_serial_runs_one_at_a_time_with_delay() {
        let prober = Arc::new(CountingProber::default());
        let delay = Duration::from_millis(50);
        let scheduler = Scheduler::new(
            prober.clone(),
            SchedulePolicy::Serial { delay },
            Duration::from_secs(5),
        );

        let started = Instant::now();
        let outcomes = scheduler.run(urls(3), |_| {}).await;

        assert_eq!(outcomes.len(), 3);
        assert_eq!(prober.max_in_flight.load(Ordering::SeqCst), 1);
        // Two gaps between three requests
        assert!(started.elapsed() >= delay * 2);
        // Serial keeps input order
        let got: Vec<_> = outcomes.iter().map(|o| o.url.clone()).collect();
        assert_eq!(got, urls(3));
    }

    #[tokio::test]
    async fn test_timeout_and_failures_do_not_stop_others() {
        let prober = Arc::new(CountingProber::default());
        let scheduler = Scheduler::new(
            prober,
            SchedulePolicy::Parallel { width: 2 },
            Duration::from_millis(100),
        );
        let input = vec![
            "https://slow.example/".to_string(),
            "https://down.example/".to_string(),
            "https://fine.example/".to_string(),
        ];

        let outcomes = scheduler.run(input, |_| {}).await;
        assert_eq!(outcomes.len(), 3);

        let failure_of = |url: &str| {
            outcomes
                .iter()
                .find(|o| o.url == url)
                .map(|o| o.failure)
                .unwrap()
        };
        assert_eq!(failure_of("https://slow.example/"), FailureKind::Timeout);
        assert_eq!(failure_of("https://down.example/"), FailureKind::ConnectionError);
        assert_eq!(failure_of("https://fine.example/"), FailureKind::None);
    }

    #[tokio::test]
    async fn test_callback_sees_every_completion() {
        let prober = Arc::new(CountingProber::with_latency(Duration::from_millis(5)));
        let scheduler = Scheduler::new(
            prober,
            SchedulePolicy::Parallel { width: 4 },
            Duration::from_secs(5),
        );

        let mut seen = Vec::new();
        let outcomes = scheduler.run(urls(12), |o| seen.push(o.url.clone())).await;

        // The callback order is the completion order, which is also the
        // order of the returned outcomes
        let returned: Vec<_> = outcomes.iter().map(|o| o.url.clone()).collect();
        assert_eq!(seen, returned);
        assert_eq!(seen.len(), 12);
    }

    #[tokio::test]
    async fn test_empty_input() {
        let scheduler = Scheduler::new(
            Arc::new(CountingProber::default()),
            SchedulePolicy::Parallel { width: 10 },
            Duration::from_secs(1),
        );
        let mut calls = 0;
        let outcomes = scheduler.run(Vec::new(), |_| calls += 1).await;
        assert!(outcomes.is_empty());
        assert_eq!(calls, 0);
    }
}
