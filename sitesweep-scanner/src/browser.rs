//! Browser automation boundary.
//!
//! The discovery engine never touches a browser directly; it drives a
//! [`BrowserPage`]. Each method is a remote call against a live page with a
//! fixed input/output contract, so the same engine runs on top of headless
//! Chrome ([`crate::chromium`]) or plain fetched HTML ([`crate::static_page`]).

use crate::error::Result;
use crate::result::FooterSource;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::time::Duration;

/// Result of navigating to a URL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NavigationResponse {
    /// HTTP status of the main document, when the provider can observe it.
    pub status: Option<u16>,
    /// The URL after redirects.
    pub final_url: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadState {
    DomContentLoaded,
    NetworkIdle,
}

/// Which part of the document an anchor query is rooted at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum AnchorScope {
    /// `header`, else the first `nav`, else `body`.
    HeaderRegion,
    Document,
}

/// An `a[href]` element as seen by the page: text with whitespace runs collapsed
/// to one space and trimmed, and the raw attribute.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnchorRow {
    pub text: String,
    pub href: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FooterScan {
    pub source: FooterSource,
    pub rows: Vec<AnchorRow>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum AriaRole {
    Link,
    Button,
}

impl AriaRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            AriaRole::Link => "link",
            AriaRole::Button => "button",
        }
    }
}

/// How to find an element. Always resolves to the first match in document order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum Locator {
    /// CSS selector, optionally narrowed to elements whose text contains
    /// `has_text` (case-insensitive).
    Css {
        selector: String,
        #[serde(rename = "hasText")]
        has_text: Option<String>,
    },
    /// ARIA role whose accessible name contains `name` (case-insensitive).
    Role { role: AriaRole, name: String },
}

impl Locator {
    pub fn css(selector: impl Into<String>) -> Self {
        Locator::Css {
            selector: selector.into(),
            has_text: None,
        }
    }

    pub fn css_with_text(selector: impl Into<String>, text: impl Into<String>) -> Self {
        Locator::Css {
            selector: selector.into(),
            has_text: Some(text.into()),
        }
    }

    pub fn role(role: AriaRole, name: impl Into<String>) -> Self {
        Locator::Role {
            role,
            name: name.into(),
        }
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Locator::Css {
                selector,
                has_text: Some(text),
            } => write!(f, "{}:has-text(\"{}\")", selector, text),
            Locator::Css {
                selector,
                has_text: None,
            } => f.write_str(selector),
            Locator::Role { role, name } => write!(f, "role={}[name~=/{}/i]", role.as_str(), name),
        }
    }
}

/// Viewport and user agent to emulate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceProfile {
    pub name: String,
    pub width: u32,
    pub height: u32,
    pub device_scale_factor: f64,
    pub mobile: bool,
    pub user_agent: Option<String>,
}

impl DeviceProfile {
    pub fn iphone_13_pro_max() -> Self {
        Self {
            name: "iPhone 13 Pro Max".to_string(),
            width: 428,
            height: 926,
            device_scale_factor: 3.0,
            mobile: true,
            user_agent: Some(
                "Mozilla/5.0 (iPhone; CPU iPhone OS 15_0 like Mac OS X) AppleWebKit/605.1.15 \
                 (KHTML, like Gecko) Version/15.0 Mobile/15E148 Safari/604.1"
                    .to_string(),
            ),
        }
    }

    pub fn desktop() -> Self {
        Self {
            name: "Desktop".to_string(),
            width: 1920,
            height: 1080,
            device_scale_factor: 1.0,
            mobile: false,
            user_agent: None,
        }
    }
}

/// Horizontal layout measurements taken inside the page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LayoutMetrics {
    pub viewport_width: u32,
    pub scroll_width: u32,
    pub has_horizontal_scroll: bool,
    pub offscreen_elements_count: u32,
}

/// One live page in a browser session.
///
/// Element methods act on the first element the locator matches and return
/// `ScanError::ElementNotFound` when nothing matches.
#[async_trait]
pub trait BrowserPage: Send + Sync {
    async fn goto(&mut self, url: &str, timeout: Duration) -> Result<NavigationResponse>;
    async fn wait_for_load_state(&mut self, state: LoadState, timeout: Duration) -> Result<()>;
    async fn current_url(&self) -> Result<String>;
    async fn title(&self) -> Result<String>;

    async fn anchors(&self, scope: AnchorScope) -> Result<Vec<AnchorRow>>;
    async fn footer_anchors(&self) -> Result<FooterScan>;

    async fn is_visible(&self, locator: &Locator, timeout: Duration) -> Result<bool>;
    async fn count_visible(&self, locator: &Locator) -> Result<usize>;
    async fn tag_name(&self, locator: &Locator) -> Result<String>;
    async fn attribute(&self, locator: &Locator, name: &str) -> Result<Option<String>>;
    async fn text_content(&self, locator: &Locator) -> Result<Option<String>>;

    async fn scroll_into_view(&mut self, locator: &Locator, timeout: Duration) -> Result<()>;
    async fn hover(&mut self, locator: &Locator, timeout: Duration) -> Result<()>;
    async fn click(&mut self, locator: &Locator, timeout: Duration) -> Result<()>;

    async fn emulate_device(&mut self, device: &DeviceProfile) -> Result<()>;
    async fn layout_metrics(&self) -> Result<LayoutMetrics>;
    async fn screenshot(&mut self, path: &Path, full_page: bool) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_locator_display() {
        assert_eq!(
            Locator::css_with_text("header a", "Sell").to_string(),
            "header a:has-text(\"Sell\")"
        );
        assert_eq!(Locator::css("footer").to_string(), "footer");
        assert_eq!(
            Locator::role(AriaRole::Button, "Why Falaya").to_string(),
            "role=button[name~=/Why Falaya/i]"
        );
    }

    #[test]
    fn test_locator_json_contract() {
        let value = serde_json::to_value(Locator::css_with_text("nav a", "Login")).unwrap();
        assert_eq!(
            value,
            serde_json::json!({"kind": "css", "selector": "nav a", "hasText": "Login"})
        );
        let value = serde_json::to_value(Locator::role(AriaRole::Link, "Pricing")).unwrap();
        assert_eq!(
            value,
            serde_json::json!({"kind": "role", "role": "link", "name": "Pricing"})
        );
    }
}
