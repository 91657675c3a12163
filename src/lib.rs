// src/lib.rs
// =============================================================================
// link-warden: finds broken, redirected and slow links in documents.
//
// Typical use:
//
//   let checker = LinkChecker::new(CheckConfig::default())?;
//   let report = checker.check(&text, |event| println!("{}", event.url)).await?;
//   if !report.success(checker.config()) { ... }
//
// The binary in main.rs is one consumer of this API; anything that wants to
// print, store or post the report differently can build on the same types.
// =============================================================================

pub mod checker;
pub mod config;
pub mod error;

pub use checker::{
    decode_document, Bucket, BucketEntry, CheckReport, FailureKind, LinkChecker, Location,
    MarkdownDiagnostic, Occurrence, ProbeOutcome, ProgressEvent,
};
pub use config::{CheckConfig, SchedulePolicy};
pub use error::CheckError;
