//! Page verification over discovered navigation URLs.
//!
//! Every URL is loaded in the browser provider and judged on status, error
//! markers, redirect target and content. Footer links of each loaded page are
//! then checked over plain HTTP, once per distinct href.

use crate::checks::{
    self, CheckResult, ERROR_PAGE_REASON, MISSING_CONTENT_REASON, has_meaningful_title_or_heading,
    has_obvious_404, is_unexpected_final_url, to_slug,
};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use sitesweep_scanner::browser::{BrowserPage, LoadState};
use sitesweep_scanner::extractor::extract_footer_links;
use sitesweep_scanner::{FooterLink, FooterSource, ScanError, Timeouts};
use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UrlPageCheck {
    pub url: String,
    pub status: Option<u16>,
    pub final_url: String,
    pub result: CheckResult,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FooterLinkCheck {
    pub source_page_url: String,
    pub link_text: String,
    pub href: String,
    pub status: Option<u16>,
    pub final_url: String,
    pub result: CheckResult,
    pub reason: String,
    pub source: FooterSource,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UrlVerificationReport {
    pub pages_checked: Vec<UrlPageCheck>,
    pub footer_links_checked: Vec<FooterLinkCheck>,
}

/// HTTP outcome of one footer href.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FooterOutcome {
    pub status: Option<u16>,
    pub final_url: String,
    pub result: CheckResult,
    pub reason: String,
}

/// Checks footer hrefs over HTTP and remembers each answer for the run.
pub struct FooterChecker {
    client: Client,
    timeout: Duration,
    cache: HashMap<String, FooterOutcome>,
}

impl FooterChecker {
    pub fn new(timeout: Duration) -> Result<Self, ScanError> {
        let client = Client::builder()
            .user_agent(concat!("Sitesweep/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self::with_client(client, timeout))
    }

    pub fn with_client(client: Client, timeout: Duration) -> Self {
        Self {
            client,
            timeout,
            cache: HashMap::new(),
        }
    }

    pub fn cached(&self) -> usize {
        self.cache.len()
    }

    pub async fn check(&mut self, href: &str) -> FooterOutcome {
        if let Some(outcome) = self.cache.get(href) {
            return outcome.clone();
        }

        debug!("Requesting footer link {}", href);
        let outcome = match self.client.get(href).timeout(self.timeout).send().await {
            Ok(response) => {
                let status = response.status().as_u16();
                let final_url = response.url().to_string();
                if checks::status_in_range(Some(status)) {
                    FooterOutcome {
                        status: Some(status),
                        final_url,
                        result: CheckResult::Pass,
                        reason: checks::ALL_CHECKS_PASSED.to_string(),
                    }
                } else {
                    FooterOutcome {
                        status: Some(status),
                        final_url,
                        result: CheckResult::Fail,
                        reason: checks::status_reason(Some(status)),
                    }
                }
            }
            Err(e) => FooterOutcome {
                status: None,
                final_url: href.to_string(),
                result: CheckResult::Fail,
                reason: format!("Footer link request failed: {}", e),
            },
        };

        self.cache.insert(href.to_string(), outcome.clone());
        outcome
    }
}

pub const FINAL_SCREENSHOT: &str = "url-verification-final.png";

pub struct VerifyOptions {
    pub base_url: String,
    pub timeouts: Timeouts,
    /// Directory for per-page screenshots; `None` disables them.
    pub screenshot_dir: Option<PathBuf>,
}

/// Load each URL, judge it, and check its footer links.
///
/// Never fails as a whole: navigation errors become FAIL rows.
pub async fn verify_pages(
    page: &mut dyn BrowserPage,
    urls: &[String],
    options: &VerifyOptions,
    footer: &mut FooterChecker,
) -> UrlVerificationReport {
    let mut report = UrlVerificationReport::default();
    info!("Verifying {} pages", urls.len());

    if let Some(dir) = &options.screenshot_dir
        && let Err(e) = tokio::fs::create_dir_all(dir).await
    {
        warn!("Cannot create screenshot dir {}: {}", dir.display(), e);
    }

    for url in urls {
        let navigation = match page.goto(url, options.timeouts.navigation).await {
            Ok(navigation) => navigation,
            Err(e) => {
                warn!("Navigation to {} failed: {}", url, e);
                report.pages_checked.push(UrlPageCheck {
                    url: url.clone(),
                    status: None,
                    final_url: url.clone(),
                    result: CheckResult::Fail,
                    reason: format!("Navigation failed: {}", e),
                });
                continue;
            }
        };

        if let Err(e) = page
            .wait_for_load_state(LoadState::DomContentLoaded, options.timeouts.navigation)
            .await
        {
            debug!("DOM content wait on {} ended early: {}", url, e);
        }

        let status = navigation.status;
        let final_url = navigation.final_url;

        let mut reasons = Vec::new();
        if !checks::status_in_range(status) {
            reasons.push(checks::status_reason(status));
        }
        if has_obvious_404(page).await {
            reasons.push(ERROR_PAGE_REASON.to_string());
        }
        if is_unexpected_final_url(&final_url) {
            reasons.push(format!("Unexpected final URL: {}", final_url));
        }
        if !has_meaningful_title_or_heading(page, &options.timeouts).await {
            reasons.push(MISSING_CONTENT_REASON.to_string());
        }
        let (result, reason) = checks::verdict(&reasons);
        debug!("{} {} ({})", result, url, reason);

        report.pages_checked.push(UrlPageCheck {
            url: url.clone(),
            status,
            final_url: final_url.clone(),
            result,
            reason,
        });

        if let Some(dir) = &options.screenshot_dir {
            let path = dir.join(format!("{}.png", to_slug(&final_url)));
            match page.screenshot(&path, true).await {
                Ok(()) => debug!("Saved screenshot {}", path.display()),
                Err(ScanError::Unsupported(what)) => debug!("Skipping screenshot: {} unsupported", what),
                Err(e) => warn!("Screenshot of {} failed: {}", final_url, e),
            }
        }

        let links = match extract_footer_links(page, &final_url, &options.base_url).await {
            Ok(links) => links,
            Err(e) => {
                warn!("Footer extraction on {} failed: {}", final_url, e);
                continue;
            }
        };

        for link in links {
            let outcome = footer.check(&link.href).await;
            report.footer_links_checked.push(footer_row(url, link, outcome));
        }
    }

    if let Some(dir) = &options.screenshot_dir {
        let path = dir.join(FINAL_SCREENSHOT);
        if let Err(e) = page.screenshot(&path, true).await {
            debug!("Final screenshot skipped: {}", e);
        }
    }

    info!(
        "Verified {} pages and {} footer links ({} distinct)",
        report.pages_checked.len(),
        report.footer_links_checked.len(),
        footer.cached()
    );
    report
}

fn footer_row(source_page_url: &str, link: FooterLink, outcome: FooterOutcome) -> FooterLinkCheck {
    FooterLinkCheck {
        source_page_url: source_page_url.to_string(),
        link_text: link.link_text,
        href: link.href,
        status: outcome.status,
        final_url: outcome.final_url,
        result: outcome.result,
        reason: outcome.reason,
        source: link.source,
    }
}
