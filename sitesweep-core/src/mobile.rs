//! Mobile responsiveness sweep.

use crate::checks::{self, CheckResult, basic_page_reasons, to_slug};
use serde::{Deserialize, Serialize};
use sitesweep_scanner::browser::{BrowserPage, LayoutMetrics, LoadState};
use sitesweep_scanner::prober::MenuProber;
use sitesweep_scanner::{DeviceProfile, ScanError, Timeouts};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

pub const LAYOUT_UNAVAILABLE_NOTE: &str = "layout metrics unavailable";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MobileCheck {
    pub url: String,
    pub status: Option<u16>,
    pub final_url: String,
    pub result: CheckResult,
    pub reason: String,
    pub viewport_width: u32,
    pub scroll_width: u32,
    pub has_horizontal_scroll: bool,
    pub offscreen_elements_count: u32,
    pub menu_opened: bool,
    /// Relative to the reports dir; empty when no screenshot could be taken.
    pub screenshot_path: String,
    pub notes: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MobileReport {
    pub mobile_checks: Vec<MobileCheck>,
}

pub struct MobileOptions {
    pub device: DeviceProfile,
    pub timeouts: Timeouts,
    pub reports_dir: PathBuf,
}

impl MobileOptions {
    pub fn new(reports_dir: impl Into<PathBuf>) -> Self {
        Self {
            device: DeviceProfile::iphone_13_pro_max(),
            timeouts: Timeouts::default(),
            reports_dir: reports_dir.into(),
        }
    }

    fn screenshot_relative(&self, slug: &str) -> String {
        format!("screenshots/mobile/{}.png", slug)
    }
}

/// Layout failures for one page. `None` metrics means the provider cannot measure.
pub fn layout_reasons(metrics: Option<&LayoutMetrics>) -> Vec<String> {
    let Some(metrics) = metrics else {
        return Vec::new();
    };
    let mut reasons = Vec::new();
    if metrics.has_horizontal_scroll {
        reasons.push("Horizontal scroll detected".to_string());
    }
    if metrics.offscreen_elements_count > 0 {
        reasons.push(format!(
            "Detected {} off-screen key elements",
            metrics.offscreen_elements_count
        ));
    }
    reasons
}

/// Emulate the phone profile, then check every URL on it.
pub async fn check_mobile_pages(
    page: &mut dyn BrowserPage,
    urls: &[String],
    options: &MobileOptions,
) -> Result<MobileReport, ScanError> {
    page.emulate_device(&options.device).await?;
    info!("Checking {} pages as {}", urls.len(), options.device.name);

    let prober = MenuProber::new(options.timeouts);
    let screenshot_dir = options.reports_dir.join("screenshots").join("mobile");
    if let Err(e) = tokio::fs::create_dir_all(&screenshot_dir).await {
        warn!("Cannot create screenshot dir {}: {}", screenshot_dir.display(), e);
    }

    let mut report = MobileReport::default();
    for url in urls {
        let check = check_one(page, url, options, &prober, &screenshot_dir).await;
        debug!("{} {} ({})", check.result, check.url, check.reason);
        report.mobile_checks.push(check);
    }
    Ok(report)
}

async fn check_one(
    page: &mut dyn BrowserPage,
    url: &str,
    options: &MobileOptions,
    prober: &MenuProber,
    screenshot_dir: &Path,
) -> MobileCheck {
    let slug = to_slug(url);
    let mut check = MobileCheck {
        url: url.to_string(),
        status: None,
        final_url: url.to_string(),
        result: CheckResult::Pass,
        reason: checks::ALL_CHECKS_PASSED.to_string(),
        viewport_width: 0,
        scroll_width: 0,
        has_horizontal_scroll: false,
        offscreen_elements_count: 0,
        menu_opened: false,
        screenshot_path: String::new(),
        notes: String::new(),
    };

    match page.goto(url, options.timeouts.navigation).await {
        Ok(navigation) => {
            if let Err(e) = page
                .wait_for_load_state(LoadState::DomContentLoaded, options.timeouts.navigation)
                .await
            {
                debug!("DOM content wait on {} ended early: {}", url, e);
            }
            check.status = navigation.status;
            check.final_url = navigation.final_url;

            let mut reasons = basic_page_reasons(page, check.status, &options.timeouts).await;
            let mut notes = Vec::new();

            match page.layout_metrics().await {
                Ok(metrics) => {
                    check.viewport_width = metrics.viewport_width;
                    check.scroll_width = metrics.scroll_width;
                    check.has_horizontal_scroll = metrics.has_horizontal_scroll;
                    check.offscreen_elements_count = metrics.offscreen_elements_count;
                    reasons.extend(layout_reasons(Some(&metrics)));
                }
                Err(ScanError::Unsupported(_)) => notes.push(LAYOUT_UNAVAILABLE_NOTE.to_string()),
                Err(e) => {
                    warn!("Layout metrics on {} failed: {}", url, e);
                    notes.push(LAYOUT_UNAVAILABLE_NOTE.to_string());
                }
            }

            let menu = prober.open_mobile_menu(page).await;
            check.menu_opened = menu.menu_opened;
            notes.push(menu.notes);
            if menu.hamburger_detected && !menu.menu_opened {
                reasons.push("Hamburger menu not usable after interaction".to_string());
            }

            let (result, reason) = checks::verdict(&reasons);
            check.result = result;
            check.reason = reason;
            check.notes = notes.join("; ");
        }
        Err(e) => {
            warn!("Navigation to {} failed: {}", url, e);
            check.result = CheckResult::Fail;
            check.reason = format!("Navigation failed: {}", e);
        }
    }

    let path = screenshot_dir.join(format!("{}.png", slug));
    if take_screenshot(page, &path).await {
        check.screenshot_path = options.screenshot_relative(&slug);
    }

    check
}

/// Full page first, viewport only when that fails.
async fn take_screenshot(page: &mut dyn BrowserPage, path: &Path) -> bool {
    match page.screenshot(path, true).await {
        Ok(()) => return true,
        Err(ScanError::Unsupported(what)) => {
            debug!("Skipping screenshot: {} unsupported", what);
            return false;
        }
        Err(e) => debug!("Full-page screenshot failed, retrying viewport: {}", e),
    }

    match page.screenshot(path, false).await {
        Ok(()) => true,
        Err(e) => {
            warn!("Screenshot {} failed: {}", path.display(), e);
            false
        }
    }
}
