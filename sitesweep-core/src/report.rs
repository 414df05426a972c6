// Report generation: JSON payloads, self-contained HTML, console summary

use crate::cache::write_json_file;
use crate::checks::CheckResult;
use crate::mobile::{MobileCheck, MobileReport};
use crate::verify::{FooterLinkCheck, UrlPageCheck, UrlVerificationReport};
use colored::Colorize;
use sitesweep_scanner::normalize::extract_url_path;
use sitesweep_scanner::{DiscoveredUrls, FooterSource, Section};
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

pub const CACHE_FILE: &str = "discovered-urls.json";
pub const URL_REPORT_JSON: &str = "url-verification-report.json";
pub const URL_REPORT_HTML: &str = "url-verification-report.html";
pub const MOBILE_REPORT_JSON: &str = "mobile-responsive-report.json";
pub const MOBILE_REPORT_HTML: &str = "mobile-responsive-report.html";

const DIVIDER: &str = "━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━";

/// Every output location, derived from one reports directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportPaths {
    pub reports_dir: PathBuf,
}

impl ReportPaths {
    pub fn new(reports_dir: impl Into<PathBuf>) -> Self {
        Self {
            reports_dir: reports_dir.into(),
        }
    }

    pub fn cache_path(&self) -> PathBuf {
        self.reports_dir.join(CACHE_FILE)
    }

    pub fn url_report_json(&self) -> PathBuf {
        self.reports_dir.join(URL_REPORT_JSON)
    }

    pub fn url_report_html(&self) -> PathBuf {
        self.reports_dir.join(URL_REPORT_HTML)
    }

    pub fn mobile_report_json(&self) -> PathBuf {
        self.reports_dir.join(MOBILE_REPORT_JSON)
    }

    pub fn mobile_report_html(&self) -> PathBuf {
        self.reports_dir.join(MOBILE_REPORT_HTML)
    }

    pub fn url_screenshots_dir(&self) -> PathBuf {
        self.reports_dir.join("screenshots").join("url")
    }

    pub fn mobile_screenshots_dir(&self) -> PathBuf {
        self.reports_dir.join("screenshots").join("mobile")
    }
}

pub fn escape_html(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#039;"),
            _ => out.push(c),
        }
    }
    out
}

const BASE_CSS: &str = "
    body { font-family: Segoe UI, sans-serif; margin: 20px; background: #f7f9fc; color: #1f2937; }
    h1, h2 { margin: 0 0 12px; }
    .card { background: #fff; border-radius: 8px; padding: 16px; margin-bottom: 16px; box-shadow: 0 1px 3px rgba(0,0,0,0.08); }
    table { width: 100%; border-collapse: collapse; font-size: 13px; }
    th, td { border: 1px solid #e5e7eb; padding: 8px; text-align: left; vertical-align: top; }
    th { background: #f3f4f6; position: sticky; top: 0; }
    tr[data-result='PASS'] td.result { color: #15803d; font-weight: 600; }
    tr[data-result='FAIL'] td.result { color: #b91c1c; font-weight: 700; }
    .controls { margin-bottom: 10px; }
    .summary span { display: inline-block; margin-right: 12px; font-weight: 600; }
    .heuristic { color: #b45309; font-style: italic; }
    a { color: #1d4ed8; }
";

const FILTER_SCRIPT: &str = "
  <script>
    (function () {
      var select = document.getElementById('filter-__ID__');
      var rows = document.querySelectorAll('#__ID__ tbody tr');
      select.addEventListener('change', function () {
        var selected = select.value;
        rows.forEach(function (row) {
          var state = row.getAttribute('data-result');
          row.style.display = (selected === 'ALL' || state === selected) ? '' : 'none';
        });
      });
    })();
  </script>";

fn filter_script(table_id: &str) -> String {
    FILTER_SCRIPT.replace("__ID__", table_id)
}

fn filter_controls(table_id: &str) -> String {
    format!(
        r#"
      <div class="controls">
        <label>Filter:
          <select id="filter-{id}">
            <option value="ALL">All</option>
            <option value="PASS">PASS only</option>
            <option value="FAIL">FAIL only</option>
          </select>
        </label>
      </div>"#,
        id = table_id
    )
}

fn base_html(title: &str, body: &str) -> String {
    let mut html = String::new();
    html.push_str("<!doctype html>\n<html lang=\"en\">\n<head>\n");
    html.push_str("  <meta charset=\"utf-8\" />\n");
    html.push_str("  <meta name=\"viewport\" content=\"width=device-width, initial-scale=1\" />\n");
    html.push_str(&format!("  <title>{}</title>\n", escape_html(title)));
    html.push_str("  <style>");
    html.push_str(BASE_CSS);
    html.push_str("  </style>\n</head>\n<body>\n");
    html.push_str(body);
    html.push_str("\n</body>\n</html>\n");
    html
}

fn status_cell(status: Option<u16>) -> String {
    status
        .map(|s| s.to_string())
        .unwrap_or_else(|| "N/A".to_string())
}

fn count_passed<'a>(results: impl Iterator<Item = &'a CheckResult>) -> usize {
    results.filter(|r| r.is_pass()).count()
}

fn footer_source_cell(source: FooterSource) -> &'static str {
    match source {
        FooterSource::Semantic => "footer",
        FooterSource::ViewportHeuristic => {
            r#"<span class="heuristic" title="No footer landmark; lower confidence">viewport heuristic</span>"#
        }
    }
}

fn page_row(row: &UrlPageCheck) -> String {
    format!(
        r#"<tr data-result="{result}">
      <td>{url}</td>
      <td>{status}</td>
      <td>{final_url}</td>
      <td class="result">{result}</td>
      <td>{reason}</td>
    </tr>"#,
        result = row.result,
        url = escape_html(&row.url),
        status = status_cell(row.status),
        final_url = escape_html(&row.final_url),
        reason = escape_html(&row.reason),
    )
}

fn footer_row(row: &FooterLinkCheck) -> String {
    format!(
        r#"<tr data-result="{result}">
      <td>{source_page}</td>
      <td>{text}</td>
      <td>{href}</td>
      <td>{status}</td>
      <td>{final_url}</td>
      <td class="result">{result}</td>
      <td>{reason}</td>
      <td>{source}</td>
    </tr>"#,
        result = row.result,
        source_page = escape_html(&row.source_page_url),
        text = escape_html(&row.link_text),
        href = escape_html(&row.href),
        status = status_cell(row.status),
        final_url = escape_html(&row.final_url),
        reason = escape_html(&row.reason),
        source = footer_source_cell(row.source),
    )
}

fn mobile_row(row: &MobileCheck) -> String {
    let evidence = if row.screenshot_path.is_empty() {
        "N/A".to_string()
    } else {
        format!(
            r#"<a href="{}">Screenshot</a>"#,
            escape_html(&row.screenshot_path)
        )
    };

    format!(
        r#"<tr data-result="{result}">
      <td>{url}</td>
      <td>{status}</td>
      <td>{final_url}</td>
      <td class="result">{result}</td>
      <td>{reason}</td>
      <td>{viewport}</td>
      <td>{scroll}</td>
      <td>{horizontal}</td>
      <td>{offscreen}</td>
      <td>{menu}</td>
      <td>{notes}</td>
      <td>{evidence}</td>
    </tr>"#,
        result = row.result,
        url = escape_html(&row.url),
        status = status_cell(row.status),
        final_url = escape_html(&row.final_url),
        reason = escape_html(&row.reason),
        viewport = row.viewport_width,
        scroll = row.scroll_width,
        horizontal = row.has_horizontal_scroll,
        offscreen = row.offscreen_elements_count,
        menu = row.menu_opened,
        notes = escape_html(&row.notes),
        evidence = evidence,
    )
}

fn join_rows<T>(rows: &[T], render: fn(&T) -> String) -> String {
    rows.iter().map(render).collect::<Vec<_>>().join("\n")
}

pub fn render_url_verification_html(report: &UrlVerificationReport) -> String {
    let pages = &report.pages_checked;
    let footer = &report.footer_links_checked;
    let pass_pages = count_passed(pages.iter().map(|p| &p.result));
    let pass_footer = count_passed(footer.iter().map(|f| &f.result));
    let heuristic_rows = footer.iter().filter(|f| f.source.is_heuristic()).count();

    let mut body = String::new();
    body.push_str(&format!(
        r#"
    <div class="card">
      <h1>URL verification</h1>
      <div class="summary">
        <span>Total pages: {}</span>
        <span>Page PASS: {}</span>
        <span>Page FAIL: {}</span>
        <span>Total footer links: {}</span>
        <span>Footer PASS: {}</span>
        <span>Footer FAIL: {}</span>
        <span>Heuristic footer rows: {}</span>
      </div>
    </div>
"#,
        pages.len(),
        pass_pages,
        pages.len() - pass_pages,
        footer.len(),
        pass_footer,
        footer.len() - pass_footer,
        heuristic_rows,
    ));

    body.push_str("\n    <div class=\"card\">\n      <h2>Pages Checked</h2>");
    body.push_str(&filter_controls("pages"));
    body.push_str(
        r#"
      <table id="pages">
        <thead>
          <tr><th>URL</th><th>Status</th><th>Final URL</th><th>Result</th><th>Reason</th></tr>
        </thead>
        <tbody>
"#,
    );
    body.push_str(&join_rows(pages, page_row));
    body.push_str("\n        </tbody>\n      </table>\n    </div>\n");

    body.push_str("\n    <div class=\"card\">\n      <h2>Footer Links Checked</h2>");
    body.push_str(&filter_controls("footer"));
    body.push_str(
        r#"
      <table id="footer">
        <thead>
          <tr><th>Source Page</th><th>Link Text</th><th>Href</th><th>Status</th><th>Final URL</th><th>Result</th><th>Reason</th><th>Found In</th></tr>
        </thead>
        <tbody>
"#,
    );
    body.push_str(&join_rows(footer, footer_row));
    body.push_str("\n        </tbody>\n      </table>\n    </div>\n");

    body.push_str(&filter_script("pages"));
    body.push_str(&filter_script("footer"));

    base_html("URL Verification Report", &body)
}

pub fn render_mobile_html(report: &MobileReport) -> String {
    let checks = &report.mobile_checks;
    let pass = count_passed(checks.iter().map(|c| &c.result));

    let mut body = String::new();
    body.push_str(&format!(
        r#"
    <div class="card">
      <h1>Mobile responsive</h1>
      <div class="summary">
        <span>Total: {}</span>
        <span>PASS: {}</span>
        <span>FAIL: {}</span>
      </div>
    </div>
"#,
        checks.len(),
        pass,
        checks.len() - pass,
    ));

    body.push_str("\n    <div class=\"card\">");
    body.push_str(&filter_controls("mobile"));
    body.push_str(
        r#"
      <table id="mobile">
        <thead>
          <tr>
            <th>URL</th><th>Status</th><th>Final URL</th><th>Result</th><th>Reason</th>
            <th>Viewport</th><th>ScrollWidth</th><th>Horizontal Scroll</th><th>Offscreen Elements</th>
            <th>Menu Opened</th><th>Notes</th><th>Evidence</th>
          </tr>
        </thead>
        <tbody>
"#,
    );
    body.push_str(&join_rows(checks, mobile_row));
    body.push_str("\n        </tbody>\n      </table>\n    </div>\n");
    body.push_str(&filter_script("mobile"));

    base_html("Mobile Responsive Report", &body)
}

pub fn save_report(content: &str, path: &Path) -> std::io::Result<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent)?;
    }
    let mut file = File::create(path)?;
    file.write_all(content.as_bytes())?;
    Ok(())
}

/// Write `url-verification-report.{json,html}` under the reports dir.
pub fn write_url_verification_report(
    paths: &ReportPaths,
    report: &UrlVerificationReport,
) -> std::io::Result<()> {
    write_json_file(&paths.url_report_json(), report)?;
    save_report(&render_url_verification_html(report), &paths.url_report_html())
}

/// Write `mobile-responsive-report.{json,html}` under the reports dir.
pub fn write_mobile_report(paths: &ReportPaths, report: &MobileReport) -> std::io::Result<()> {
    write_json_file(&paths.mobile_report_json(), report)?;
    save_report(&render_mobile_html(report), &paths.mobile_report_html())
}

/// Console summary of a discovery pass.
pub fn generate_discovery_report(discovered: &DiscoveredUrls) -> String {
    let mut report = String::new();
    report.push_str(&format!("{}\n\n", DIVIDER));
    report.push_str(&format!("{}\n", "# Discovery summary:".bold()));
    report.push_str(&format!("  Base URL: {}\n", discovered.base_url.cyan()));
    report.push_str(&format!(
        "  Generated at: {}\n",
        discovered.generated_at.format("%Y-%m-%d %H:%M:%S UTC")
    ));
    report.push_str(&format!("  Nav URLs: {}\n", discovered.nav_urls.len()));
    report.push_str(&format!(
        "  Section URLs: {}\n",
        discovered.total_section_urls()
    ));
    report.push_str(&format!("  Direct URLs: {}\n", discovered.direct_urls.len()));
    report.push_str(&format!("\n{}\n\n", DIVIDER));

    for section in Section::ALL {
        let urls = discovered.section(section);
        report.push_str(&format!(
            "## {} {}\n",
            section.label().bold(),
            format!("({})", urls.len()).dimmed()
        ));
        if urls.is_empty() {
            report.push_str(&format!("  {}\n", "no links found".yellow()));
        }
        for url in urls {
            report.push_str(&format!("  {}\n", extract_url_path(url).green()));
        }
        report.push('\n');
    }

    if !discovered.direct_urls.is_empty() {
        report.push_str(&format!("## {}\n", "Direct links".bold()));
        for url in &discovered.direct_urls {
            report.push_str(&format!("  {}\n", extract_url_path(url).cyan()));
        }
        report.push('\n');
    }

    report.push_str(&format!("## {}\n", "Navigation".bold()));
    for url in &discovered.nav_urls {
        report.push_str(&format!("  {}\n", extract_url_path(url)));
    }

    report
}

/// Console summary of a verification run.
pub fn generate_verification_summary(report: &UrlVerificationReport, paths: &ReportPaths) -> String {
    let pages = &report.pages_checked;
    let footer = &report.footer_links_checked;
    let pass_pages = count_passed(pages.iter().map(|p| &p.result));
    let pass_footer = count_passed(footer.iter().map(|f| &f.result));

    let mut out = String::new();
    out.push_str(&format!("{}\n\n", DIVIDER));
    out.push_str(&format!(
        "  Pages:  {} checked, {} passed, {} failed\n",
        pages.len(),
        pass_pages.to_string().green(),
        colour_failures(pages.len() - pass_pages)
    ));
    out.push_str(&format!(
        "  Footer: {} checked, {} passed, {} failed\n",
        footer.len(),
        pass_footer.to_string().green(),
        colour_failures(footer.len() - pass_footer)
    ));
    for page in pages.iter().filter(|p| !p.result.is_pass()) {
        out.push_str(&format!("  {} {} {}\n", "FAIL".red().bold(), page.url, page.reason.dimmed()));
    }
    out.push_str(&format!(
        "\n  Report: {}\n",
        paths.url_report_html().display().to_string().cyan()
    ));
    out
}

/// Console summary of a mobile run.
pub fn generate_mobile_summary(report: &MobileReport, paths: &ReportPaths) -> String {
    let checks = &report.mobile_checks;
    let pass = count_passed(checks.iter().map(|c| &c.result));

    let mut out = String::new();
    out.push_str(&format!("{}\n\n", DIVIDER));
    out.push_str(&format!(
        "  Mobile: {} checked, {} passed, {} failed\n",
        checks.len(),
        pass.to_string().green(),
        colour_failures(checks.len() - pass)
    ));
    for check in checks.iter().filter(|c| !c.result.is_pass()) {
        out.push_str(&format!("  {} {} {}\n", "FAIL".red().bold(), check.url, check.reason.dimmed()));
    }
    out.push_str(&format!(
        "\n  Report: {}\n",
        paths.mobile_report_html().display().to_string().cyan()
    ));
    out
}

fn colour_failures(count: usize) -> colored::ColoredString {
    if count == 0 {
        count.to_string().green()
    } else {
        count.to_string().red().bold()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_html_all_specials() {
        assert_eq!(
            escape_html(r#"<a href="x">Tom & Jerry's</a>"#),
            "&lt;a href=&quot;x&quot;&gt;Tom &amp; Jerry&#039;s&lt;/a&gt;"
        );
        assert_eq!(escape_html("plain"), "plain");
    }

    #[test]
    fn test_report_paths_layout() {
        let paths = ReportPaths::new("/tmp/reports");
        assert_eq!(paths.cache_path(), PathBuf::from("/tmp/reports/discovered-urls.json"));
        assert_eq!(
            paths.url_report_html(),
            PathBuf::from("/tmp/reports/url-verification-report.html")
        );
        assert_eq!(
            paths.mobile_report_json(),
            PathBuf::from("/tmp/reports/mobile-responsive-report.json")
        );
        assert_eq!(
            paths.mobile_screenshots_dir(),
            PathBuf::from("/tmp/reports/screenshots/mobile")
        );
        assert_eq!(paths.url_screenshots_dir(), PathBuf::from("/tmp/reports/screenshots/url"));
    }

    #[test]
    fn test_filter_script_targets_table() {
        let script = filter_script("footer");
        assert!(script.contains("getElementById('filter-footer')"));
        assert!(script.contains("'#footer tbody tr'"));
        assert!(!script.contains("__ID__"));
    }

    #[test]
    fn test_discovery_report_lists_sections() {
        colored::control::set_override(false);
        let mut discovered = DiscoveredUrls::new("https://falaya.com".to_string());
        discovered
            .section_urls
            .insert(Section::Sell, vec!["https://falaya.com/sell/homes".to_string()]);
        discovered.nav_urls.insert("https://falaya.com/sell/homes".to_string());
        discovered.direct_urls.insert("https://falaya.com/login".to_string());

        let report = generate_discovery_report(&discovered);
        assert!(report.contains("Nav URLs: 1"));
        assert!(report.contains("## Sell (1)"));
        assert!(report.contains("  /sell/homes"));
        assert!(report.contains("## Direct links"));
        assert!(report.contains("  /login"));
        assert!(report.contains("## Why Falaya (0)"));
    }
}
