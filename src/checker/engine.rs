// src/checker/engine.rs
// =============================================================================
// The link checker: wires extractor, deduplicator, scheduler and classifier.
//
//   text -> extract -> dedupe -> schedule probes -> classify -> CheckReport
//
// Only document-level problems (not text, bad base URL) come back as
// errors. Everything that goes wrong with individual links is in the report.
// =============================================================================

use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info};
use url::Url;

use super::classify::{build_report, classify_one, Bucket, CheckReport};
use super::dedupe::dedupe;
use super::extract::extract_links;
use super::http::{HttpProber, Probe, ProbeOutcome, ProbeSettings};
use super::schedule::Scheduler;
use crate::config::CheckConfig;
use crate::error::CheckError;

/// Sent to the progress callback each time a probe finishes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProgressEvent {
    pub url: String,
    pub outcome: ProbeOutcome,
    pub bucket: Bucket,
    /// Probes finished so far, including this one
    pub completed: usize,
    pub total: usize,
}

pub struct LinkChecker {
    config: CheckConfig,
    base_url: Option<Url>,
    scheduler: Scheduler,
}

impl LinkChecker {
    /// Builds a checker that probes over HTTP.
    pub fn new(config: CheckConfig) -> Result<Self, CheckError> {
        let prober = HttpProber::new(&ProbeSettings::from_config(&config))?;
        Self::with_prober(config, Arc::new(prober))
    }

    /// Builds a checker around any prober (used by tests and embedders).
    pub fn with_prober(config: CheckConfig, prober: Arc<dyn Probe>) -> Result<Self, CheckError> {
        let base_url = config
            .base_url
            .as_deref()
            .map(|raw| {
                Url::parse(raw).map_err(|source| CheckError::InvalidBaseUrl {
                    url: raw.to_string(),
                    source,
                })
            })
            .transpose()?;

        let scheduler = Scheduler::new(prober, config.schedule_policy(), config.probe_timeout());

        Ok(Self {
            config,
            base_url,
            scheduler,
        })
    }

    pub fn config(&self) -> &CheckConfig {
        &self.config
    }

    // Checks every link in a document
    //
    // `on_progress` is called once per unique URL as soon as its probe
    // finishes, in completion order.
    #[tracing::instrument(skip_all, fields(len = text.len()))]
    pub async fn check<F>(&self, text: &str, mut on_progress: F) -> Result<CheckReport, CheckError>
    where
        F: FnMut(&ProgressEvent),
    {
        let extraction = extract_links(text, self.base_url.as_ref(), self.config.markdown)?;
        let dedup = dedupe(&extraction.occurrences, self.config.allow_dupe);

        let total = dedup.groups.len();
        info!(
            occurrences = extraction.occurrences.len(),
            unique = total,
            duplicates = dedup.duplicates().count(),
            "links extracted"
        );

        let duplicate: HashMap<&str, bool> = dedup
            .groups
            .iter()
            .map(|g| (g.url.as_str(), g.duplicate))
            .collect();

        let mut completed = 0;
        let outcomes = self
            .scheduler
            .run(dedup.unique_urls(), |outcome| {
                completed += 1;
                let is_duplicate = duplicate.get(outcome.url.as_str()).copied().unwrap_or(false);
                let bucket = classify_one(&outcome.url, is_duplicate, outcome, &self.config);
                on_progress(&ProgressEvent {
                    url: outcome.url.clone(),
                    outcome: outcome.clone(),
                    bucket,
                    completed,
                    total,
                });
            })
            .await;

        let report = build_report(&dedup, outcomes, extraction.diagnostics, &self.config);
        debug!(
            ok = report.ok.len(),
            errors = report.errors.len(),
            success = report.success(&self.config),
            "report built"
        );
        Ok(report)
    }
}
