// src/checker/classify.rs
// =============================================================================
// This module sorts probe outcomes into buckets and builds the final report.
//
// Every unique URL lands in exactly one bucket. The first rule that matches
// wins:
//   1. white-listed      -> white_listed
//   2. duplicate         -> duplicates
//   3. timed out         -> timeouts
//   4. SSL error         -> ssl_errors
//   5. redirected        -> redirects
//   6. status not 2xx and not explicitly allowed -> errors
//   7. everything else   -> ok
//
// Buckets hold occurrences, not just URLs, so every place a problem
// appears in the document can be reported.
// =============================================================================

use serde::Serialize;
use std::collections::HashMap;

use super::dedupe::{Dedup, UrlGroup};
use super::extract::Occurrence;
use super::http::{FailureKind, ProbeOutcome};
use super::markdown::MarkdownDiagnostic;
use crate::config::CheckConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Bucket {
    Ok,
    Errors,
    SslErrors,
    Timeouts,
    Redirects,
    WhiteListed,
    Duplicates,
}

impl Bucket {
    pub fn label(self) -> &'static str {
        match self {
            Bucket::Ok => "OK",
            Bucket::Errors => "Errors",
            Bucket::SslErrors => "SSL errors",
            Bucket::Timeouts => "Timeouts",
            Bucket::Redirects => "Redirects",
            Bucket::WhiteListed => "White listed",
            Bucket::Duplicates => "Duplicates",
        }
    }
}

/// One unique URL in a bucket, with all of its occurrences.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BucketEntry {
    pub url: String,
    pub occurrences: Vec<Occurrence>,
    /// What the probe saw; None only if the URL was never probed
    pub outcome: Option<ProbeOutcome>,
}

/// The aggregate result of checking one document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CheckReport {
    pub ok: Vec<BucketEntry>,
    pub errors: Vec<BucketEntry>,
    pub ssl_errors: Vec<BucketEntry>,
    pub timeouts: Vec<BucketEntry>,
    pub redirects: Vec<BucketEntry>,
    pub white_listed: Vec<BucketEntry>,
    pub duplicates: Vec<BucketEntry>,
    /// Markdown syntax warnings; never affect success
    pub diagnostics: Vec<MarkdownDiagnostic>,
}

impl CheckReport {
    pub fn bucket(&self, bucket: Bucket) -> &[BucketEntry] {
        match bucket {
            Bucket::Ok => &self.ok,
            Bucket::Errors => &self.errors,
            Bucket::SslErrors => &self.ssl_errors,
            Bucket::Timeouts => &self.timeouts,
            Bucket::Redirects => &self.redirects,
            Bucket::WhiteListed => &self.white_listed,
            Bucket::Duplicates => &self.duplicates,
        }
    }

    fn bucket_mut(&mut self, bucket: Bucket) -> &mut Vec<BucketEntry> {
        match bucket {
            Bucket::Ok => &mut self.ok,
            Bucket::Errors => &mut self.errors,
            Bucket::SslErrors => &mut self.ssl_errors,
            Bucket::Timeouts => &mut self.timeouts,
            Bucket::Redirects => &mut self.redirects,
            Bucket::WhiteListed => &mut self.white_listed,
            Bucket::Duplicates => &mut self.duplicates,
        }
    }

    /// True when nothing in the report should fail the run.
    ///
    /// `errors` always fails. Timeouts, SSL errors, redirects and duplicates
    /// fail unless the matching allowance is set. An empty bucket never fails.
    pub fn success(&self, config: &CheckConfig) -> bool {
        self.errors.is_empty()
            && (self.timeouts.is_empty() || config.allow_timeout)
            && (self.ssl_errors.is_empty() || config.allow_ssl)
            && (self.redirects.is_empty() || config.allow_redirect)
            && (self.duplicates.is_empty() || config.allow_dupe)
    }

    /// Number of unique URLs across all buckets.
    pub fn total_urls(&self) -> usize {
        ALL_BUCKETS.iter().map(|b| self.bucket(*b).len()).sum()
    }
}

pub const ALL_BUCKETS: [Bucket; 7] = [
    Bucket::Ok,
    Bucket::Errors,
    Bucket::SslErrors,
    Bucket::Timeouts,
    Bucket::Redirects,
    Bucket::WhiteListed,
    Bucket::Duplicates,
];

// Picks the bucket for one URL
//
// Pure function of the URL, whether it is a duplicate, the probe outcome
// and the configuration. Used both for live progress events and for the
// final report, so the two always agree.
pub fn classify_one(
    url: &str,
    duplicate: bool,
    outcome: &ProbeOutcome,
    config: &CheckConfig,
) -> Bucket {
    if config.is_white_listed(url) {
        return Bucket::WhiteListed;
    }
    if duplicate {
        return Bucket::Duplicates;
    }
    match outcome.failure {
        FailureKind::Timeout => return Bucket::Timeouts,
        FailureKind::SslError => return Bucket::SslErrors,
        _ => {}
    }
    if outcome.redirected() {
        return Bucket::Redirects;
    }

    let allowed = outcome
        .status_code
        .is_some_and(|code| config.allowed_status_codes.contains(&code));
    if outcome.is_success_status() || allowed {
        Bucket::Ok
    } else {
        // Includes connection errors and unresolvable URLs: no status at all
        Bucket::Errors
    }
}

// Builds the report once all probes have finished
//
// Parameters:
//   dedup: occurrence groups, one per unique URL
//   outcomes: one outcome per unique URL, in any order
//   diagnostics: Markdown warnings from the extractor
//   config: allowances and white list
pub fn build_report(
    dedup: &Dedup,
    outcomes: Vec<ProbeOutcome>,
    diagnostics: Vec<MarkdownDiagnostic>,
    config: &CheckConfig,
) -> CheckReport {
    let mut by_url: HashMap<String, ProbeOutcome> = outcomes
        .into_iter()
        .map(|outcome| (outcome.url.clone(), outcome))
        .collect();

    let mut report = CheckReport {
        diagnostics,
        ..CheckReport::default()
    };

    // Walk the groups, not the outcomes: every extracted URL must end up in
    // a bucket even if its probe went missing
    for UrlGroup {
        url,
        occurrences,
        duplicate,
    } in &dedup.groups
    {
        let outcome = by_url.remove(url);
        let bucket = match &outcome {
            Some(outcome) => classify_one(url, *duplicate, outcome, config),
            None if config.is_white_listed(url) => Bucket::WhiteListed,
            None if *duplicate => Bucket::Duplicates,
            None => Bucket::Errors,
        };

        report.bucket_mut(bucket).push(BucketEntry {
            url: url.clone(),
            occurrences: occurrences.clone(),
            outcome,
        });
    }

    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checker::dedupe::dedupe;
    use crate::checker::extract::extract_links;
    use std::collections::BTreeSet;

    fn outcome(url: &str, status: Option<u16>, failure: FailureKind) -> ProbeOutcome {
        ProbeOutcome {
            url: url.to_string(),
            status_code: status,
            failure,
            final_url: None,
            message: None,
        }
    }

    fn report_for(text: &str, outcomes: Vec<ProbeOutcome>, config: &CheckConfig) -> CheckReport {
        let extraction = extract_links(text, None, false).unwrap();
        let dedup = dedupe(&extraction.occurrences, config.allow_dupe);
        build_report(&dedup, outcomes, Vec::new(), config)
    }

    #[test]
    fn test_ok_scenario() {
        let config = CheckConfig::default();
        let report = report_for(
            "http://200.example",
            vec![outcome("http://200.example/", Some(200), FailureKind::None)],
            &config,
        );
        assert_eq!(report.ok.len(), 1);
        assert!(report.success(&config));
    }

    #[test]
    fn test_not_found_with_and_without_allowance() {
        let outcomes = vec![outcome("http://404.example/", Some(404), FailureKind::None)];

        let config = CheckConfig::default();
        let report = report_for("http://404.example", outcomes.clone(), &config);
        assert_eq!(report.errors.len(), 1);
        assert!(!report.success(&config));

        let config = CheckConfig {
            allowed_status_codes: BTreeSet::from([404]),
            ..CheckConfig::default()
        };
        let report = report_for("http://404.example", outcomes, &config);
        assert_eq!(report.ok.len(), 1);
        assert!(report.errors.is_empty());
        assert!(report.success(&config));
    }

    #[test]
    fn test_duplicate_scenario() {
        let config = CheckConfig::default();
        let report = report_for(
            "See http://good.example and http://good.example again",
            vec![outcome("http://good.example/", Some(200), FailureKind::None)],
            &config,
        );
        assert_eq!(report.duplicates.len(), 1);
        assert_eq!(report.duplicates[0].occurrences.len(), 2);
        assert!(report.ok.is_empty());
        assert!(!report.success(&config));

        let allowed = CheckConfig {
            allow_dupe: true,
            ..CheckConfig::default()
        };
        let report = report_for(
            "See http://good.example and http://good.example again",
            vec![outcome("http://good.example/", Some(200), FailureKind::None)],
            &allowed,
        );
        assert!(report.duplicates.is_empty());
        assert_eq!(report.ok[0].occurrences.len(), 2);
        assert!(report.success(&allowed));
    }

    #[test]
    fn test_precedence_order() {
        let config = CheckConfig {
            white_list: vec!["listed".to_string()],
            ..CheckConfig::default()
        };
        let timeout = outcome("u", None, FailureKind::Timeout);
        let ssl = outcome("u", None, FailureKind::SslError);
        let mut redirect = outcome("u", Some(404), FailureKind::Redirected);
        redirect.final_url = Some("https://moved.example/".to_string());

        // White list beats everything, duplicate beats status
        assert_eq!(classify_one("https://listed.example/", true, &timeout, &config), Bucket::WhiteListed);
        assert_eq!(classify_one("https://a.example/", true, &timeout, &config), Bucket::Duplicates);
        assert_eq!(classify_one("https://a.example/", false, &timeout, &config), Bucket::Timeouts);
        assert_eq!(classify_one("https://a.example/", false, &ssl, &config), Bucket::SslErrors);
        // A redirect that ends in 404 is still a redirect
        assert_eq!(classify_one("https://a.example/", false, &redirect, &config), Bucket::Redirects);
    }

    #[test]
    fn test_network_failures_are_errors() {
        let config = CheckConfig {
            allowed_status_codes: BTreeSet::from([500]),
            ..CheckConfig::default()
        };
        for failure in [FailureKind::ConnectionError, FailureKind::Unresolvable] {
            let o = outcome("u", None, failure);
            assert_eq!(classify_one("https://a.example/", false, &o, &config), Bucket::Errors);
        }
        let server_error = outcome("u", Some(500), FailureKind::None);
        assert_eq!(classify_one("https://a.example/", false, &server_error, &config), Bucket::Ok);
    }

    #[test]
    fn test_white_list_never_fails() {
        let config = CheckConfig {
            white_list: vec!["flaky.example".to_string()],
            ..CheckConfig::default()
        };
        for failure in [
            FailureKind::Timeout,
            FailureKind::SslError,
            FailureKind::Redirected,
            FailureKind::ConnectionError,
        ] {
            let report = report_for(
                "https://flaky.example/x",
                vec![outcome("https://flaky.example/x", Some(500), failure)],
                &config,
            );
            assert_eq!(report.white_listed.len(), 1);
            assert!(report.success(&config));
        }
    }

    #[test]
    fn test_success_truth_table() {
        let entry = BucketEntry {
            url: "https://a.example/".to_string(),
            occurrences: Vec::new(),
            outcome: None,
        };

        // Allowances only matter for non-empty buckets
        let flags = [
            (Bucket::Timeouts, CheckConfig { allow_timeout: true, ..CheckConfig::default() }),
            (Bucket::SslErrors, CheckConfig { allow_ssl: true, ..CheckConfig::default() }),
            (Bucket::Redirects, CheckConfig { allow_redirect: true, ..CheckConfig::default() }),
            (Bucket::Duplicates, CheckConfig { allow_dupe: true, ..CheckConfig::default() }),
        ];
        for (bucket, allowing) in flags {
            let mut report = CheckReport::default();
            assert!(report.success(&CheckConfig::default()));

            report.bucket_mut(bucket).push(entry.clone());
            assert!(!report.success(&CheckConfig::default()), "{bucket:?} should fail");
            assert!(report.success(&allowing), "{bucket:?} should be allowed");
        }

        // Errors can't be allowed away, and OK / white-listed never fail
        let mut report = CheckReport::default();
        report.ok.push(entry.clone());
        report.white_listed.push(entry.clone());
        assert!(report.success(&CheckConfig::default()));
        report.errors.push(entry);
        let everything = CheckConfig {
            allow_dupe: true,
            allow_redirect: true,
            allow_ssl: true,
            allow_timeout: true,
            ..CheckConfig::default()
        };
        assert!(!report.success(&everything));
    }

    #[test]
    fn test_every_url_in_exactly_one_bucket() {
        let text = "http://a.example http://b.example http://a.example [rel](docs/x.md) http://c.example";
        let config = CheckConfig {
            white_list: vec!["c.example".to_string()],
            ..CheckConfig::default()
        };
        let outcomes = vec![
            outcome("http://a.example/", Some(200), FailureKind::None),
            outcome("http://b.example/", None, FailureKind::Timeout),
            outcome("docs/x.md", None, FailureKind::Unresolvable),
            outcome("http://c.example/", Some(404), FailureKind::None),
        ];
        let report = report_for(text, outcomes, &config);

        let mut seen: Vec<&str> = ALL_BUCKETS
            .iter()
            .flat_map(|b| report.bucket(*b).iter().map(|e| e.url.as_str()))
            .collect();
        seen.sort();
        assert_eq!(
            seen,
            vec!["docs/x.md", "http://a.example/", "http://b.example/", "http://c.example/"]
        );
        assert_eq!(report.total_urls(), 4);
        assert_eq!(report.errors[0].url, "docs/x.md");
    }

    #[test]
    fn test_missing_outcome_still_reported() {
        let config = CheckConfig::default();
        let report = report_for("http://lost.example", Vec::new(), &config);
        assert_eq!(report.errors.len(), 1);
        assert_eq!(report.errors[0].outcome, None);
    }
}
