use sitesweep_core::checks::CheckResult;
use sitesweep_core::mobile::{MobileCheck, MobileReport};
use sitesweep_core::report::{
    ReportPaths, render_mobile_html, render_url_verification_html, write_mobile_report,
    write_url_verification_report,
};
use sitesweep_core::verify::{FooterLinkCheck, UrlPageCheck, UrlVerificationReport};
use sitesweep_scanner::FooterSource;
use std::error::Error;
use std::fs;
use tempfile::TempDir;

// ============================================================================
// Fixtures
// ============================================================================

fn page(url: &str, result: CheckResult, reason: &str) -> UrlPageCheck {
    UrlPageCheck {
        url: url.to_string(),
        status: Some(200),
        final_url: url.to_string(),
        result,
        reason: reason.to_string(),
    }
}

fn footer_link(text: &str, source: FooterSource) -> FooterLinkCheck {
    FooterLinkCheck {
        source_page_url: "https://falaya.com/".to_string(),
        link_text: text.to_string(),
        href: "https://falaya.com/privacy".to_string(),
        status: None,
        final_url: "https://falaya.com/privacy".to_string(),
        result: CheckResult::Fail,
        reason: "Footer link request failed: timed out".to_string(),
        source,
    }
}

fn verification_report() -> UrlVerificationReport {
    UrlVerificationReport {
        pages_checked: vec![
            page("https://falaya.com/", CheckResult::Pass, "All checks passed"),
            page(
                "https://falaya.com/pricing?a=1&b=2",
                CheckResult::Fail,
                "Unexpected final URL: <script>alert('x')</script>",
            ),
        ],
        footer_links_checked: vec![
            footer_link("Privacy", FooterSource::Semantic),
            footer_link("Terms & \"Conditions\"", FooterSource::ViewportHeuristic),
        ],
    }
}

fn mobile_check(screenshot_path: &str) -> MobileCheck {
    MobileCheck {
        url: "https://falaya.com/sell".to_string(),
        status: Some(200),
        final_url: "https://falaya.com/sell".to_string(),
        result: CheckResult::Fail,
        reason: "Horizontal scroll detected".to_string(),
        viewport_width: 428,
        scroll_width: 640,
        has_horizontal_scroll: true,
        offscreen_elements_count: 0,
        menu_opened: true,
        screenshot_path: screenshot_path.to_string(),
        notes: "Menu opened; visible items: 4".to_string(),
    }
}

// ============================================================================
// URL verification report
// ============================================================================

#[test]
fn test_url_report_files_written() -> Result<(), Box<dyn Error>> {
    let dir = TempDir::new()?;
    let paths = ReportPaths::new(dir.path().join("reports"));
    let report = verification_report();

    write_url_verification_report(&paths, &report)?;

    let json: serde_json::Value = serde_json::from_str(&fs::read_to_string(paths.url_report_json())?)?;
    assert_eq!(json["pagesChecked"].as_array().unwrap().len(), 2);
    assert_eq!(json["pagesChecked"][1]["result"], "FAIL");
    assert_eq!(json["pagesChecked"][0]["finalUrl"], "https://falaya.com/");
    assert_eq!(json["footerLinksChecked"][0]["sourcePageUrl"], "https://falaya.com/");
    assert_eq!(json["footerLinksChecked"][0]["status"], serde_json::Value::Null);
    assert_eq!(json["footerLinksChecked"][1]["source"], "viewportHeuristic");

    let html = fs::read_to_string(paths.url_report_html())?;
    assert!(html.starts_with("<!doctype html>"));
    assert!(html.contains(r#"<select id="filter-pages">"#));
    assert!(html.contains(r#"<select id="filter-footer">"#));
    Ok(())
}

#[test]
fn test_url_report_escapes_values() {
    let html = render_url_verification_html(&verification_report());

    assert!(!html.contains("<script>alert"));
    assert!(html.contains("&lt;script&gt;alert(&#039;x&#039;)&lt;/script&gt;"));
    assert!(html.contains("https://falaya.com/pricing?a=1&amp;b=2"));
    assert!(html.contains("Terms &amp; &quot;Conditions&quot;"));
}

#[test]
fn test_url_report_summary_and_row_tags() {
    let html = render_url_verification_html(&verification_report());

    assert!(html.contains("<span>Total pages: 2</span>"));
    assert!(html.contains("<span>Page PASS: 1</span>"));
    assert!(html.contains("<span>Page FAIL: 1</span>"));
    assert!(html.contains("<span>Footer FAIL: 2</span>"));
    assert!(html.contains("<span>Heuristic footer rows: 1</span>"));
    assert_eq!(html.matches(r#"<tr data-result="FAIL">"#).count(), 3);
    assert_eq!(html.matches(r#"<tr data-result="PASS">"#).count(), 1);
    assert!(html.contains("<td>N/A</td>"));
}

#[test]
fn test_heuristic_footer_rows_are_marked() {
    let html = render_url_verification_html(&verification_report());

    assert_eq!(html.matches(r#"class="heuristic""#).count(), 1);
    assert!(html.contains("<td>footer</td>"));
}

// ============================================================================
// Mobile report
// ============================================================================

#[test]
fn test_mobile_report_files_written() -> Result<(), Box<dyn Error>> {
    let dir = TempDir::new()?;
    let paths = ReportPaths::new(dir.path());
    let report = MobileReport {
        mobile_checks: vec![mobile_check("screenshots/mobile/sell.png")],
    };

    write_mobile_report(&paths, &report)?;

    let json: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(paths.mobile_report_json())?)?;
    assert_eq!(json["mobileChecks"][0]["viewportWidth"], 428);
    assert_eq!(json["mobileChecks"][0]["hasHorizontalScroll"], true);
    assert_eq!(json["mobileChecks"][0]["screenshotPath"], "screenshots/mobile/sell.png");

    let html = fs::read_to_string(paths.mobile_report_html())?;
    assert!(html.contains(r#"<a href="screenshots/mobile/sell.png">Screenshot</a>"#));
    assert!(html.contains("<span>FAIL: 1</span>"));
    assert!(html.contains("<td>true</td>"));
    Ok(())
}

#[test]
fn test_mobile_row_without_screenshot() {
    let html = render_mobile_html(&MobileReport {
        mobile_checks: vec![mobile_check("")],
    });

    assert!(!html.contains("Screenshot</a>"));
    assert!(html.contains(r#"<select id="filter-mobile">"#));
}

#[test]
fn test_empty_reports_render() {
    let html = render_mobile_html(&MobileReport::default());
    assert!(html.contains("<span>Total: 0</span>"));

    let html = render_url_verification_html(&UrlVerificationReport::default());
    assert!(html.contains("<span>Total footer links: 0</span>"));
}
