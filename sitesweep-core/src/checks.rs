//! Page-level checks shared by URL verification and the mobile sweep.

use serde::{Deserialize, Serialize};
use sitesweep_scanner::browser::BrowserPage;
use sitesweep_scanner::{Locator, Timeouts};
use std::fmt;
use tracing::debug;
use url::Url;

pub const ALL_CHECKS_PASSED: &str = "All checks passed";
pub const ERROR_PAGE_REASON: &str = "Page appears to be an error/404 page";
pub const MISSING_CONTENT_REASON: &str = "Missing meaningful title and visible heading";

const NOT_FOUND_MARKERS: [&str; 3] = ["404", "not found", "page not found"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum CheckResult {
    Pass,
    Fail,
}

impl CheckResult {
    pub fn as_str(&self) -> &'static str {
        match self {
            CheckResult::Pass => "PASS",
            CheckResult::Fail => "FAIL",
        }
    }

    pub fn is_pass(&self) -> bool {
        matches!(self, CheckResult::Pass)
    }
}

impl fmt::Display for CheckResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Collapse failure reasons into a result and a single reason string.
pub fn verdict(reasons: &[String]) -> (CheckResult, String) {
    if reasons.is_empty() {
        (CheckResult::Pass, ALL_CHECKS_PASSED.to_string())
    } else {
        (CheckResult::Fail, reasons.join("; "))
    }
}

pub fn status_in_range(status: Option<u16>) -> bool {
    matches!(status, Some(200..=399))
}

pub fn status_reason(status: Option<u16>) -> String {
    let shown = status
        .map(|s| s.to_string())
        .unwrap_or_else(|| "N/A".to_string());
    format!("HTTP status {} is outside 200-399", shown)
}

pub fn is_unexpected_final_url(final_url: &str) -> bool {
    let lower = final_url.to_lowercase();
    lower.contains("/404") || lower.ends_with("/not-found")
}

/// File-name slug for screenshots: `/pricing/plans?x=1` becomes `pricing-plans-x-1`.
pub fn to_slug(url: &str) -> String {
    let (path, query) = match Url::parse(url) {
        Ok(parsed) => (
            parsed.path().to_string(),
            parsed.query().map(|q| format!("?{}", q)).unwrap_or_default(),
        ),
        Err(_) => (url.to_string(), String::new()),
    };

    let path = dash_runs(path.trim_matches('/'));
    let path = if path.is_empty() {
        "home".to_string()
    } else {
        path
    };
    let query = dash_runs(&query).trim_matches('-').to_string();

    [path, query]
        .into_iter()
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join("-")
        .to_lowercase()
}

fn dash_runs(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut in_run = false;
    for c in input.chars() {
        if c.is_ascii_alphanumeric() {
            out.push(c);
            in_run = false;
        } else if !in_run {
            out.push('-');
            in_run = true;
        }
    }
    out
}

fn mentions_not_found(text: &str) -> bool {
    let lower = text.to_lowercase();
    NOT_FOUND_MARKERS.iter().any(|marker| lower.contains(marker))
}

/// Title or first heading reads like an error page.
pub async fn has_obvious_404(page: &dyn BrowserPage) -> bool {
    let title = page.title().await.unwrap_or_default();
    let heading = page
        .text_content(&Locator::css(r#"h1, h2, [role="heading"]"#))
        .await
        .unwrap_or_else(|e| {
            debug!("No heading for 404 check: {}", e);
            None
        })
        .unwrap_or_default();

    mentions_not_found(&title) || mentions_not_found(&heading)
}

/// A title longer than three characters or a visible non-trivial heading.
pub async fn has_meaningful_title_or_heading(page: &dyn BrowserPage, timeouts: &Timeouts) -> bool {
    let title = page.title().await.unwrap_or_default();
    if title.trim().chars().count() > 3 {
        return true;
    }

    let heading = Locator::css(r#"h1, [role="heading"]"#);
    match page.is_visible(&heading, timeouts.visibility).await {
        Ok(true) => {}
        Ok(false) => return false,
        Err(e) => {
            debug!("Heading visibility check failed: {}", e);
            return false;
        }
    }

    page.text_content(&heading)
        .await
        .ok()
        .flatten()
        .is_some_and(|text| text.trim().chars().count() > 1)
}

/// Status, error-page and content checks common to every page sweep.
pub async fn basic_page_reasons(
    page: &dyn BrowserPage,
    status: Option<u16>,
    timeouts: &Timeouts,
) -> Vec<String> {
    let mut reasons = Vec::new();
    if !status_in_range(status) {
        reasons.push(status_reason(status));
    }
    if has_obvious_404(page).await {
        reasons.push(ERROR_PAGE_REASON.to_string());
    }
    if !has_meaningful_title_or_heading(page, timeouts).await {
        reasons.push(MISSING_CONTENT_REASON.to_string());
    }
    reasons
}
