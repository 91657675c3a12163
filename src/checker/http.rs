// src/checker/http.rs
// =============================================================================
// This module checks whether a single URL is alive by making HTTP requests.
//
// Key functionality:
// - Makes an HTTP HEAD request first (lightweight, no body download)
// - Falls back to GET when the server refuses HEAD
// - Follows redirects up to a limit and remembers where they ended
// - Turns every kind of failure (timeout, SSL, DNS, ...) into data
//
// A probe never fails as a Rust error: whatever happens, it returns exactly
// one ProbeOutcome. It also never retries.
//
// Rust concepts:
// - Traits: `Probe` lets the scheduler work with fake probers in tests
// - async-trait: Allows async methods on trait objects (dyn Probe)
// - Error source chains: std::error::Error::source() walks nested errors
// =============================================================================

use async_trait::async_trait;
use reqwest::{redirect, Client, Method, StatusCode};
use serde::{Deserialize, Serialize};
use std::error::Error as StdError;
use std::time::Duration;
use tracing::{debug, trace};
use url::Url;

use crate::config::{CheckConfig, DEFAULT_MAX_REDIRECTS, DEFAULT_TIMEOUT_SECS};
use crate::error::CheckError;

// Why a probe did not end in a plain response
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// Got a response without redirects
    None,
    /// No response within the timeout
    Timeout,
    /// SSL/TLS certificate or handshake error
    SslError,
    /// Connection refused, DNS failure or other transport error
    ConnectionError,
    /// At least one redirect was followed, or the redirect limit was hit
    Redirected,
    /// Relative URL with no base, or a URL that does not parse
    Unresolvable,
}

// The result of checking one unique URL
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProbeOutcome {
    /// The URL that was checked
    pub url: String,
    /// HTTP status of the final response, None if there was no response
    pub status_code: Option<u16>,
    pub failure: FailureKind,
    /// Where redirects ended up
    #[serde(skip_serializing_if = "Option::is_none")]
    pub final_url: Option<String>,
    /// Optional message with more details
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl ProbeOutcome {
    fn response(url: String, status: StatusCode, requested: &Url, final_url: &Url) -> Self {
        let redirected = final_url != requested;
        Self {
            status_code: Some(status.as_u16()),
            failure: if redirected {
                FailureKind::Redirected
            } else {
                FailureKind::None
            },
            final_url: redirected.then(|| final_url.to_string()),
            message: Some(format!("HTTP {}", status.as_u16())),
            url,
        }
    }

    /// An outcome without any HTTP response.
    pub fn failed(url: impl Into<String>, failure: FailureKind, message: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            status_code: None,
            failure,
            final_url: None,
            message: Some(message.into()),
        }
    }

    /// True when the probe followed (or gave up on) a redirect.
    pub fn redirected(&self) -> bool {
        self.failure == FailureKind::Redirected
    }

    /// True for a 2xx final response.
    pub fn is_success_status(&self) -> bool {
        matches!(self.status_code, Some(code) if (200..300).contains(&code))
    }
}

// Anything that can check a URL
//
// The real implementation is HttpProber. Tests plug in fakes so the
// scheduler and engine can be tested without a network.
#[async_trait]
pub trait Probe: Send + Sync {
    async fn probe(&self, url: &str) -> ProbeOutcome;
}

#[derive(Debug, Clone)]
pub struct ProbeSettings {
    pub timeout: Duration,
    pub max_redirects: usize,
    pub user_agent: String,
}

impl Default for ProbeSettings {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            max_redirects: DEFAULT_MAX_REDIRECTS,
            user_agent: format!("link-warden/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

impl ProbeSettings {
    pub fn from_config(config: &CheckConfig) -> Self {
        Self {
            timeout: config.probe_timeout(),
            max_redirects: config.max_redirects,
            ..Self::default()
        }
    }
}

// Checks links over HTTP with reqwest
//
// The client is built once and shared by every probe (connection pooling).
// Cloning an HttpProber is cheap: reqwest::Client is reference counted.
#[derive(Debug, Clone)]
pub struct HttpProber {
    client: Client,
}

impl HttpProber {
    pub fn new(settings: &ProbeSettings) -> Result<Self, CheckError> {
        let max_redirects = settings.max_redirects;

        // Give up on loops straight away instead of waiting for the hop limit
        let policy = redirect::Policy::custom(move |attempt| {
            if attempt.previous().len() >= max_redirects {
                attempt.error("too many redirects")
            } else if attempt.previous().contains(attempt.url()) {
                attempt.error("redirect loop")
            } else {
                attempt.follow()
            }
        });

        let client = Client::builder()
            .timeout(settings.timeout)
            .redirect(policy)
            .user_agent(settings.user_agent.as_str())
            .build()?;

        Ok(Self { client })
    }

    async fn send(&self, method: Method, url: Url) -> Result<reqwest::Response, reqwest::Error> {
        self.client.request(method, url).send().await
    }
}

#[async_trait]
impl Probe for HttpProber {
    async fn probe(&self, url: &str) -> ProbeOutcome {
        let parsed = match Url::parse(url) {
            Ok(parsed) if matches!(parsed.scheme(), "http" | "https") => parsed,
            Ok(parsed) => {
                return ProbeOutcome::failed(
                    url,
                    FailureKind::Unresolvable,
                    format!("unsupported scheme '{}'", parsed.scheme()),
                )
            }
            Err(url::ParseError::RelativeUrlWithoutBase) => {
                return ProbeOutcome::failed(
                    url,
                    FailureKind::Unresolvable,
                    "relative URL and no base URL configured",
                )
            }
            Err(e) => return ProbeOutcome::failed(url, FailureKind::Unresolvable, e.to_string()),
        };

        // First, try a HEAD request (faster, no body download)
        let head = self.send(Method::HEAD, parsed.clone()).await;

        // Some servers don't implement HEAD or refuse it; ask again with GET.
        // The GET body is never read, dropping the response closes it.
        let result = match head {
            Ok(response) if head_rejected(response.status()) => {
                trace!(%url, status = %response.status(), "HEAD rejected, retrying with GET");
                self.send(Method::GET, parsed.clone()).await
            }
            other => other,
        };

        let outcome = match result {
            Ok(response) => {
                ProbeOutcome::response(url.to_string(), response.status(), &parsed, response.url())
            }
            Err(e) => categorize_error(url, &e),
        };

        debug!(
            %url,
            status = ?outcome.status_code,
            failure = ?outcome.failure,
            "probe finished"
        );
        outcome
    }
}

// Status codes servers use to say "I don't do HEAD"
fn head_rejected(status: StatusCode) -> bool {
    matches!(
        status,
        StatusCode::METHOD_NOT_ALLOWED
            | StatusCode::NOT_IMPLEMENTED
            | StatusCode::BAD_REQUEST
            | StatusCode::FORBIDDEN
    )
}

// Categorizes different error types from reqwest
//
// reqwest errors can happen for many reasons:
// - Network timeout
// - Too many redirects / redirect loop
// - SSL certificate issues (usually wrapped inside a connect error)
// - DNS resolution failure, connection refused
fn categorize_error(url: &str, error: &reqwest::Error) -> ProbeOutcome {
    let (failure, message) = if error.is_timeout() {
        (FailureKind::Timeout, "request timed out".to_string())
    } else if error.is_redirect() {
        (FailureKind::Redirected, redirect_message(error))
    } else if error.source().is_some_and(is_tls_failure) {
        (FailureKind::SslError, format!("SSL error: {}", innermost_message(error)))
    } else {
        (FailureKind::ConnectionError, innermost_message(error))
    };

    ProbeOutcome::failed(url, failure, message)
}

fn redirect_message(error: &reqwest::Error) -> String {
    match error.url() {
        Some(last) => format!("{} (last hop {})", innermost_message(error), last),
        None => innermost_message(error),
    }
}

// Looks for certificate/TLS wording anywhere in the error source chain
//
// reqwest wraps TLS errors several layers deep (hyper -> io -> rustls), and
// exposes no is_tls() helper, so the text of each layer is inspected.
// Callers pass the source of the reqwest error: its own message contains
// the URL, and a host like ssl.example must not count.
pub(crate) fn is_tls_failure(error: &(dyn StdError + 'static)) -> bool {
    let mut current: Option<&(dyn StdError + 'static)> = Some(error);
    while let Some(err) = current {
        let text = err.to_string().to_ascii_lowercase();
        if ["certificate", "tls", "ssl", "handshake"]
            .iter()
            .any(|needle| text.contains(needle))
        {
            return true;
        }
        current = err.source();
    }
    false
}

// The most specific message in the chain ("connection refused" rather
// than "error sending request for url ...")
fn innermost_message(error: &(dyn StdError + 'static)) -> String {
    let mut current = error;
    while let Some(source) = current.source() {
        current = source;
    }
    current.to_string()
}

// -----------------------------------------------------------------------------
// BEGINNER NOTES:
//
// 1. Why HEAD first?
//    - HEAD asks for the headers only, so no page body is downloaded
//    - Most servers answer HEAD exactly like GET
//    - A few answer 405 Method Not Allowed; for those we ask again with GET
//
// 2. What is async_trait?
//    - Plain async fns in traits can't be used through `dyn Trait` yet
//    - #[async_trait] rewrites them to return boxed futures, which can
//
// 3. What does `Ok(parsed) if ...` mean?
//    - A match guard: the arm only matches when the condition holds
// -----------------------------------------------------------------------------
