// src/checker/mod.rs
// =============================================================================
// This module contains all link checking logic.
//
// Submodules, in the order data flows through them:
// - extract: Finds URLs in the document and records where they are
// - markdown: Markdown-specific helpers for extract (relative links, syntax)
// - dedupe: Groups repeated URLs so each one is probed once
// - http: Checks a single URL over HTTP
// - schedule: Runs probes in parallel or one at a time
// - classify: Sorts outcomes into buckets and builds the report
// - engine: LinkChecker, which ties the steps together
//
// This file (mod.rs) is the module root - it ties everything together and
// exports the public API that other parts of the crate can use.
// =============================================================================

mod classify;
mod dedupe;
mod engine;
mod extract;
mod http;
mod markdown;
mod schedule;

// Re-export public items from submodules
// This lets users write `checker::LinkChecker` instead of
// `checker::engine::LinkChecker`
pub use classify::{build_report, classify_one, Bucket, BucketEntry, CheckReport, ALL_BUCKETS};
pub use dedupe::{dedupe, Dedup, UrlGroup};
pub use engine::{LinkChecker, ProgressEvent};
pub use extract::{decode_document, extract_links, Extraction, Location, Occurrence};
pub use http::{FailureKind, HttpProber, Probe, ProbeOutcome, ProbeSettings};
pub use markdown::{MarkdownDiagnostic, SyntaxIssue};
pub use schedule::Scheduler;
