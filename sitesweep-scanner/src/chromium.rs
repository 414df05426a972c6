//! Headless Chrome provider built on `chromiumoxide`.
//!
//! Every DOM query is one `Runtime.evaluate` of [`DOM_DRIVER`] with a JSON
//! command spliced in. The script owns locator resolution, visibility and
//! the footer fallback; this side only deserializes its replies.

use crate::browser::{
    AnchorRow, AnchorScope, BrowserPage, DeviceProfile, FooterScan, LayoutMetrics, LoadState,
    Locator, NavigationResponse,
};
use crate::error::{Result, ScanError};
use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::cdp::browser_protocol::emulation::{
    SetDeviceMetricsOverrideParams, SetUserAgentOverrideParams,
};
use chromiumoxide::cdp::browser_protocol::input::{DispatchMouseEventParams, DispatchMouseEventType};
use chromiumoxide::page::{Page, ScreenshotParams};
use futures::StreamExt;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::{Duration, Instant};
use tokio::task::JoinHandle;
use tracing::debug;

const POLL_INTERVAL: Duration = Duration::from_millis(100);
const NETWORK_QUIET: Duration = Duration::from_millis(500);

/// Launch options for the Chrome process.
#[derive(Debug, Clone)]
pub struct ChromiumConfig {
    pub headless: bool,
    pub window_size: (u32, u32),
    pub args: Vec<String>,
}

impl ChromiumConfig {
    pub fn headful(mut self) -> Self {
        self.headless = false;
        self
    }

    fn to_browser_config(&self) -> Result<BrowserConfig> {
        let mut config = BrowserConfig::builder();

        if !self.headless {
            config = config.with_head();
        }

        config = config.arg(format!(
            "--window-size={},{}",
            self.window_size.0, self.window_size.1
        ));

        // fresh profile per launch
        let user_data_dir =
            std::env::temp_dir().join(format!("sitesweep-chrome-{}", uuid::Uuid::new_v4()));
        config = config.arg(format!("--user-data-dir={}", user_data_dir.display()));

        for arg in &self.args {
            config = config.arg(arg.clone());
        }

        config
            .build()
            .map_err(|e| ScanError::Browser(format!("invalid browser configuration: {}", e)))
    }
}

impl Default for ChromiumConfig {
    fn default() -> Self {
        Self {
            headless: true,
            window_size: (1920, 1080),
            args: vec![
                "--no-sandbox".to_string(),
                "--disable-dev-shm-usage".to_string(),
            ],
        }
    }
}

pub struct ChromiumBrowser {
    browser: Browser,
    handler_task: JoinHandle<()>,
}

impl ChromiumBrowser {
    pub async fn launch(config: ChromiumConfig) -> Result<Self> {
        debug!("Launching Chrome with {:?}", config);
        let (browser, mut handler) = Browser::launch(config.to_browser_config()?)
            .await
            .map_err(|e| ScanError::Browser(format!("failed to launch Chrome: {}", e)))?;

        let handler_task = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    debug!("Browser handler error: {}", e);
                }
            }
        });

        Ok(Self {
            browser,
            handler_task,
        })
    }

    /// A new tab sized to the desktop profile.
    pub async fn new_page(&self) -> Result<ChromiumPage> {
        let page = self
            .browser
            .new_page("about:blank")
            .await
            .map_err(browser_error)?;
        let mut page = ChromiumPage { page };
        page.emulate_device(&DeviceProfile::desktop()).await?;
        Ok(page)
    }

    pub async fn close(mut self) -> Result<()> {
        let closed = self.browser.close().await.map_err(browser_error);
        self.handler_task.abort();
        closed.map(|_| ())
    }
}

pub struct ChromiumPage {
    page: Page,
}

#[derive(Serialize)]
struct Command<'a> {
    op: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    locator: Option<&'a Locator>,
    #[serde(skip_serializing_if = "Option::is_none")]
    name: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    scope: Option<AnchorScope>,
}

impl<'a> Command<'a> {
    fn new(op: &'a str) -> Self {
        Self {
            op,
            locator: None,
            name: None,
            scope: None,
        }
    }

    fn on(op: &'a str, locator: &'a Locator) -> Self {
        Self {
            locator: Some(locator),
            ..Self::new(op)
        }
    }
}

/// Reply for commands that act on the first match of a locator.
#[derive(Deserialize)]
struct ElementReply<T> {
    found: bool,
    value: Option<T>,
}

#[derive(Deserialize)]
struct Point {
    x: f64,
    y: f64,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct DocumentState {
    ready_state: String,
    resource_count: usize,
}

impl ChromiumPage {
    async fn run<T: DeserializeOwned>(&self, command: &Command<'_>) -> Result<T> {
        let input = serde_json::to_string(command)
            .map_err(|e| ScanError::ParseError(e.to_string()))?;
        let script = DOM_DRIVER.replace("__INPUT__", &input);
        self.eval(&script).await
    }

    async fn eval<T: DeserializeOwned>(&self, script: &str) -> Result<T> {
        let result = self.page.evaluate(script).await.map_err(browser_error)?;
        result
            .into_value()
            .map_err(|e| ScanError::Browser(format!("unexpected script result: {}", e)))
    }

    async fn element<T: DeserializeOwned>(&self, command: &Command<'_>) -> Result<Option<T>> {
        let reply: ElementReply<T> = self.run(command).await?;
        if reply.found {
            Ok(reply.value)
        } else {
            Err(ScanError::ElementNotFound(
                command.locator.map(|l| l.to_string()).unwrap_or_default(),
            ))
        }
    }

    /// Repeat an action command until the element is rendered and the action ran.
    async fn act<T: DeserializeOwned>(
        &self,
        op: &str,
        locator: &Locator,
        timeout: Duration,
    ) -> Result<T> {
        let command = Command::on(op, locator);
        let start = Instant::now();
        loop {
            if let Some(value) = self.element::<T>(&command).await? {
                return Ok(value);
            }
            if start.elapsed() >= timeout {
                return Err(ScanError::Timeout {
                    action: format!("{} {}", op, locator),
                    timeout,
                });
            }
            tokio::time::sleep(POLL_INTERVAL).await;
        }
    }

    async fn document_state(&self) -> Result<DocumentState> {
        self.eval(
            "({ readyState: document.readyState, \
               resourceCount: performance.getEntriesByType('resource').length })",
        )
        .await
    }
}

#[async_trait]
impl BrowserPage for ChromiumPage {
    async fn goto(&mut self, url: &str, timeout: Duration) -> Result<NavigationResponse> {
        match tokio::time::timeout(timeout, self.page.goto(url)).await {
            Ok(Ok(_)) => {}
            Ok(Err(e)) => return Err(browser_error(e)),
            Err(_) => {
                return Err(ScanError::Timeout {
                    action: format!("navigate to {}", url),
                    timeout,
                });
            }
        }

        let status: u16 = self
            .eval(
                "(function () { var e = performance.getEntriesByType('navigation')[0]; \
                 return e && e.responseStatus ? e.responseStatus : 0; })()",
            )
            .await
            .unwrap_or(0);
        let final_url = self.current_url().await?;

        Ok(NavigationResponse {
            status: (status > 0).then_some(status),
            final_url,
        })
    }

    async fn wait_for_load_state(&mut self, state: LoadState, timeout: Duration) -> Result<()> {
        let start = Instant::now();
        let mut last_count = None;
        let mut quiet_since = Instant::now();

        loop {
            let doc = self.document_state().await?;
            let done = match state {
                LoadState::DomContentLoaded => doc.ready_state != "loading",
                LoadState::NetworkIdle => {
                    if last_count != Some(doc.resource_count) {
                        last_count = Some(doc.resource_count);
                        quiet_since = Instant::now();
                    }
                    doc.ready_state == "complete" && quiet_since.elapsed() >= NETWORK_QUIET
                }
            };
            if done {
                return Ok(());
            }
            if start.elapsed() >= timeout {
                return Err(ScanError::Timeout {
                    action: format!("wait for {:?}", state),
                    timeout,
                });
            }
            tokio::time::sleep(POLL_INTERVAL).await;
        }
    }

    async fn current_url(&self) -> Result<String> {
        self.eval("window.location.href").await
    }

    async fn title(&self) -> Result<String> {
        self.eval("document.title").await
    }

    async fn anchors(&self, scope: AnchorScope) -> Result<Vec<AnchorRow>> {
        self.run(&Command {
            scope: Some(scope),
            ..Command::new("anchors")
        })
        .await
    }

    async fn footer_anchors(&self) -> Result<FooterScan> {
        self.run(&Command::new("footer")).await
    }

    async fn is_visible(&self, locator: &Locator, _timeout: Duration) -> Result<bool> {
        self.run(&Command::on("visible", locator)).await
    }

    async fn count_visible(&self, locator: &Locator) -> Result<usize> {
        self.run(&Command::on("count", locator)).await
    }

    async fn tag_name(&self, locator: &Locator) -> Result<String> {
        self.element::<String>(&Command::on("tag", locator))
            .await?
            .ok_or_else(|| ScanError::ElementNotFound(locator.to_string()))
    }

    async fn attribute(&self, locator: &Locator, name: &str) -> Result<Option<String>> {
        self.element(&Command {
            name: Some(name),
            ..Command::on("attr", locator)
        })
        .await
    }

    async fn text_content(&self, locator: &Locator) -> Result<Option<String>> {
        match self.element(&Command::on("text", locator)).await {
            Err(ScanError::ElementNotFound(_)) => Ok(None),
            other => other,
        }
    }

    async fn scroll_into_view(&mut self, locator: &Locator, timeout: Duration) -> Result<()> {
        self.act::<bool>("scroll", locator, timeout).await.map(|_| ())
    }

    async fn hover(&mut self, locator: &Locator, timeout: Duration) -> Result<()> {
        let point: Point = self.act("hover", locator, timeout).await?;
        // synthetic events fire in the page; the real move triggers CSS :hover
        let params = DispatchMouseEventParams::new(DispatchMouseEventType::MouseMoved, point.x, point.y);
        if let Err(e) = self.page.execute(params).await {
            debug!("Mouse move for {} failed: {}", locator, e);
        }
        Ok(())
    }

    async fn click(&mut self, locator: &Locator, timeout: Duration) -> Result<()> {
        self.act::<bool>("click", locator, timeout).await.map(|_| ())
    }

    async fn emulate_device(&mut self, device: &DeviceProfile) -> Result<()> {
        debug!("Emulating {}", device.name);
        self.page
            .execute(SetDeviceMetricsOverrideParams::new(
                i64::from(device.width),
                i64::from(device.height),
                device.device_scale_factor,
                device.mobile,
            ))
            .await
            .map_err(browser_error)?;

        if let Some(user_agent) = &device.user_agent {
            self.page
                .execute(SetUserAgentOverrideParams::new(user_agent.clone()))
                .await
                .map_err(browser_error)?;
        }
        Ok(())
    }

    async fn layout_metrics(&self) -> Result<LayoutMetrics> {
        self.run(&Command::new("layout")).await
    }

    async fn screenshot(&mut self, path: &Path, full_page: bool) -> Result<()> {
        let bytes = self
            .page
            .screenshot(ScreenshotParams::builder().full_page(full_page).build())
            .await
            .map_err(browser_error)?;

        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(path, bytes).await?;
        Ok(())
    }
}

fn browser_error(e: impl std::fmt::Display) -> ScanError {
    ScanError::Browser(e.to_string())
}

/// In-page command interpreter. `__INPUT__` is replaced by a JSON command.
const DOM_DRIVER: &str = r#"(function () {
  var input = __INPUT__;

  function collapse(s) { return (s || '').replace(/\s+/g, ' ').trim(); }

  function rendered(el) {
    if (!el || !el.isConnected) return false;
    var style = window.getComputedStyle(el);
    if (style.display === 'none' || style.visibility === 'hidden') return false;
    var rect = el.getBoundingClientRect();
    return rect.width > 0 || rect.height > 0;
  }

  function accessibleName(el) {
    var label = el.getAttribute('aria-label');
    if (label) return label.trim();
    var text = collapse(el.innerText || el.textContent);
    return text || collapse(el.value);
  }

  function all(loc) {
    var nodes;
    if (loc.kind === 'css') {
      nodes = Array.prototype.slice.call(document.querySelectorAll(loc.selector));
      if (loc.hasText != null) {
        var text = loc.hasText.toLowerCase();
        nodes = nodes.filter(function (el) {
          return collapse(el.textContent).toLowerCase().indexOf(text) !== -1;
        });
      }
      return nodes;
    }
    var selector = loc.role === 'link'
      ? 'a[href], [role="link"]'
      : 'button, [role="button"], input[type="button"], input[type="submit"]';
    var name = loc.name.toLowerCase();
    return Array.prototype.slice.call(document.querySelectorAll(selector)).filter(function (el) {
      return accessibleName(el).toLowerCase().indexOf(name) !== -1;
    });
  }

  function first() {
    var nodes = all(input.locator);
    return nodes.length ? nodes[0] : null;
  }

  function rows(anchors) {
    return anchors.map(function (a) {
      return { text: collapse(a.textContent), href: a.getAttribute('href') || '' };
    });
  }

  function reply(el, value) {
    return el ? { found: true, value: value } : { found: false, value: null };
  }

  function fire(el, types) {
    types.forEach(function (type) {
      el.dispatchEvent(new MouseEvent(type, { bubbles: true, cancelable: true, view: window }));
    });
  }

  var el;
  switch (input.op) {
    case 'anchors': {
      var root = document.body;
      if (input.scope === 'headerRegion') {
        root = document.querySelector('header') || document.querySelector('nav') || document.body;
      }
      return root ? rows(Array.prototype.slice.call(root.querySelectorAll('a[href]'))) : [];
    }
    case 'footer': {
      var footer = document.querySelector('footer');
      if (footer) {
        return { source: 'semantic', rows: rows(Array.prototype.slice.call(footer.querySelectorAll('a[href]'))) };
      }
      var lowerBound = window.innerHeight * 0.75;
      var below = Array.prototype.slice.call(document.querySelectorAll('a[href]')).filter(function (a) {
        return a.getBoundingClientRect().top >= lowerBound;
      });
      return { source: 'viewportHeuristic', rows: rows(below) };
    }
    case 'visible':
      return rendered(first());
    case 'count':
      return all(input.locator).filter(rendered).length;
    case 'tag':
      el = first();
      return reply(el, el ? el.tagName.toLowerCase() : null);
    case 'attr':
      el = first();
      return reply(el, el ? el.getAttribute(input.name) : null);
    case 'text':
      el = first();
      return reply(el, el ? collapse(el.textContent) : null);
    case 'scroll':
      el = first();
      if (el && rendered(el)) el.scrollIntoView({ block: 'center', inline: 'nearest' });
      return reply(el, el && rendered(el) ? true : null);
    case 'hover':
      el = first();
      if (!el || !rendered(el)) return reply(el, null);
      el.scrollIntoView({ block: 'center', inline: 'nearest' });
      fire(el, ['pointerover', 'pointerenter', 'mouseover', 'mouseenter', 'mousemove']);
      var box = el.getBoundingClientRect();
      return reply(el, { x: box.left + box.width / 2, y: box.top + box.height / 2 });
    case 'click':
      el = first();
      if (!el || !rendered(el)) return reply(el, null);
      el.click();
      return reply(el, true);
    case 'layout': {
      var viewportWidth = document.documentElement.clientWidth;
      var scrollWidth = document.documentElement.scrollWidth;
      var key = [document.querySelector('header'), document.querySelector('main'), document.querySelector('footer')]
        .filter(Boolean);
      var visible = Array.prototype.slice.call(document.querySelectorAll('body *')).filter(function (node) {
        var rect = node.getBoundingClientRect();
        if (rect.width <= 50 || rect.height <= 10) return false;
        var style = window.getComputedStyle(node);
        if (style.display === 'none' || style.visibility === 'hidden' || Number(style.opacity) === 0) return false;
        return rect.bottom >= 0 && rect.top <= window.innerHeight;
      });
      var offscreen = key.concat(visible.slice(0, 10)).filter(function (node) {
        var rect = node.getBoundingClientRect();
        return rect.left < -2 || rect.right > viewportWidth + 2;
      }).length;
      return {
        viewportWidth: viewportWidth,
        scrollWidth: scrollWidth,
        hasHorizontalScroll: scrollWidth > viewportWidth + 2,
        offscreenElementsCount: offscreen
      };
    }
    default:
      throw new Error('unknown command ' + input.op);
  }
})()"#;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::browser::{AnchorRow, AriaRole};
    use crate::result::FooterSource;

    fn data_url(html: &str) -> String {
        format!(
            "data:text/html,{}",
            html.replace(' ', "%20").replace('\n', "%0A")
        )
    }

    #[test]
    fn test_command_json_is_spliced_into_driver() {
        let locator = Locator::css_with_text("header a", "Say \"hi\"");
        let command = Command::on("visible", &locator);
        let json = serde_json::to_string(&command).unwrap();
        assert_eq!(
            json,
            r#"{"op":"visible","locator":{"kind":"css","selector":"header a","hasText":"Say \"hi\""}}"#
        );
        let script = DOM_DRIVER.replace("__INPUT__", &json);
        assert!(script.starts_with("(function () {"));
        assert!(script.contains(r#"var input = {"op":"visible""#));
    }

    #[test]
    fn test_anchor_command_carries_scope() {
        let command = Command {
            scope: Some(AnchorScope::HeaderRegion),
            ..Command::new("anchors")
        };
        assert_eq!(
            serde_json::to_string(&command).unwrap(),
            r#"{"op":"anchors","scope":"headerRegion"}"#
        );
        let locator = Locator::role(AriaRole::Link, "Login");
        let command = Command {
            name: Some("href"),
            ..Command::on("attr", &locator)
        };
        assert!(serde_json::to_string(&command).unwrap().contains(r#""name":"href""#));
    }

    #[test]
    fn test_footer_reply_deserializes() {
        let scan: FooterScan = serde_json::from_str(
            r#"{"source":"viewportHeuristic","rows":[{"text":"Privacy","href":"/privacy"}]}"#,
        )
        .unwrap();
        assert!(scan.source.is_heuristic());
        assert_eq!(scan.rows[0].href, "/privacy");
    }

    #[tokio::test]
    #[ignore] // Requires Chrome to be installed
    async fn test_chromium_reveals_and_reads_page() {
        let browser = ChromiumBrowser::launch(ChromiumConfig::default())
            .await
            .expect("failed to launch Chrome");
        let mut page = browser.new_page().await.expect("failed to open page");

        page.goto(
            "data:text/html,<title>Hi</title><header><a href='/pricing'>Pricing</a></header>",
            Duration::from_secs(10),
        )
        .await
        .expect("navigation failed");

        assert_eq!(page.title().await.unwrap(), "Hi");
        let rows = page.anchors(AnchorScope::HeaderRegion).await.unwrap();
        assert_eq!(rows[0].href, "/pricing");
        assert!(page
            .is_visible(&Locator::role(AriaRole::Link, "pricing"), Duration::from_secs(1))
            .await
            .unwrap());

        browser.close().await.expect("failed to close");
    }

    #[tokio::test]
    #[ignore] // Requires Chrome to be installed
    async fn test_chromium_footer_falls_back_to_bottom_of_viewport() {
        let browser = ChromiumBrowser::launch(ChromiumConfig::default())
            .await
            .expect("failed to launch Chrome");
        let mut page = browser.new_page().await.expect("failed to open page");

        let html = "<html><body style='margin:0'>
            <a href='/pricing'>Pricing</a>
            <div style='height:90vh'></div>
            <a href='/privacy'>Privacy
                policy</a>
        </body></html>";
        page.goto(&data_url(html), Duration::from_secs(10))
            .await
            .expect("navigation failed");

        let scan = page.footer_anchors().await.unwrap();
        assert_eq!(scan.source, FooterSource::ViewportHeuristic);
        assert_eq!(
            scan.rows,
            vec![AnchorRow {
                text: "Privacy policy".to_string(),
                href: "/privacy".to_string(),
            }]
        );

        browser.close().await.expect("failed to close");
    }
}
