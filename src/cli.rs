// src/cli.rs
// =============================================================================
// This file defines our command-line interface using the `clap` crate.
//
// We use the "derive" API which lets us define the CLI structure using
// Rust structs and attributes (the #[...] things). The parsed flags are
// turned into a CheckConfig once; the checker never sees the flags.
// =============================================================================

use clap::Parser;
use std::collections::BTreeSet;
use std::path::PathBuf;

use link_warden::CheckConfig;

#[derive(Parser, Debug)]
#[command(
    name = "link-warden",
    version,
    about = "Checks the links in text and Markdown files",
    long_about = "link-warden finds every URL in the given files and checks that it still works. \
                  Broken links, redirects, timeouts, SSL problems and duplicate links are reported, \
                  and the exit code is non-zero when anything is wrong - handy in CI."
)]
pub struct Cli {
    /// Files to check
    pub files: Vec<PathBuf>,

    /// Comma separated files to check (alternative to positional files)
    #[arg(short = 'f', long = "files", value_delimiter = ',')]
    pub file_list: Vec<PathBuf>,

    /// Comma separated status codes to allow, e.g. 403,429
    #[arg(short = 'a', long = "allow", value_delimiter = ',')]
    pub allow: Vec<u16>,

    /// Duplicate URLs are allowed
    #[arg(long)]
    pub allow_dupe: bool,

    /// SSL errors are allowed
    #[arg(long)]
    pub allow_ssl: bool,

    /// Redirected URLs are allowed
    #[arg(long)]
    pub allow_redirect: bool,

    /// URLs that time out are allowed
    #[arg(long)]
    pub allow_timeout: bool,

    /// Base URL to use for relative links
    #[arg(long)]
    pub base_url: Option<String>,

    /// Seconds to wait between requests (checks links one at a time)
    #[arg(short = 'd', long = "request-delay")]
    pub request_delay: Option<u64>,

    /// Per-request timeout in seconds (default: 10)
    #[arg(short = 't', long = "set-timeout")]
    pub timeout: Option<u64>,

    /// Validate Markdown (find missing spaces between links)
    #[arg(long = "validate-markdown")]
    pub validate_markdown: bool,

    /// Comma separated URL patterns to white list
    #[arg(short = 'w', long = "white-list", value_delimiter = ',')]
    pub white_list: Vec<String>,

    /// Print the report as JSON instead of a summary
    #[arg(long)]
    pub json: bool,

    /// More logging (-v debug, -vv trace). RUST_LOG overrides this.
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

impl Cli {
    /// Positional files followed by --files entries.
    pub fn all_files(&self) -> Vec<PathBuf> {
        self.files
            .iter()
            .chain(self.file_list.iter())
            .cloned()
            .collect()
    }

    pub fn to_config(&self) -> CheckConfig {
        CheckConfig {
            allow_dupe: self.allow_dupe,
            allow_redirect: self.allow_redirect,
            allow_ssl: self.allow_ssl,
            allow_timeout: self.allow_timeout,
            allowed_status_codes: self.allow.iter().copied().collect::<BTreeSet<_>>(),
            base_url: self.base_url.clone(),
            request_delay: self.request_delay,
            timeout: self.timeout,
            white_list: self.white_list.clone(),
            markdown: self.validate_markdown,
            ..CheckConfig::default()
        }
    }
}
