//! HTTP-only browser provider.
//!
//! Fetches documents with `reqwest` and answers DOM queries against the
//! `scraper` tree. Nothing is executed, so interaction is modelled with one
//! rule: hovering or clicking an element un-hides the subtree named by its
//! `aria-controls` and any hidden sibling subtree under the same parent.
//! Subtrees still hidden by markup count as not yet rendered and are left
//! out of anchor queries.

use crate::browser::{
    AnchorRow, AnchorScope, AriaRole, BrowserPage, DeviceProfile, FooterScan, LayoutMetrics,
    LoadState, Locator, NavigationResponse,
};
use crate::error::{Result, ScanError};
use crate::normalize::{is_invalid_href, normalize_url};
use crate::result::FooterSource;
use async_trait::async_trait;
use reqwest::Client;
use scraper::{ElementRef, Html, Selector};
use std::collections::HashSet;
use std::path::Path;
use std::time::Duration;
use tracing::debug;
use url::Url;

const ANCHOR_SELECTOR: &str = "a[href]";
const LINK_ROLE_SELECTOR: &str = "a[href], [role=\"link\"]";
const BUTTON_ROLE_SELECTOR: &str =
    "button, [role=\"button\"], input[type=\"button\"], input[type=\"submit\"]";

pub struct StaticPage {
    client: Client,
    url: String,
    html: String,
    status: Option<u16>,
    /// Document-order indices of hidden elements un-hidden by interaction.
    revealed: HashSet<usize>,
    device: Option<DeviceProfile>,
}

impl StaticPage {
    pub fn new() -> Result<Self> {
        let client = Client::builder()
            .user_agent(concat!("Sitesweep/", env!("CARGO_PKG_VERSION")))
            .redirect(reqwest::redirect::Policy::limited(5))
            .build()?;
        Ok(Self::with_client(client))
    }

    pub fn with_client(client: Client) -> Self {
        Self {
            client,
            url: "about:blank".to_string(),
            html: String::new(),
            status: None,
            revealed: HashSet::new(),
            device: None,
        }
    }

    /// A page already "loaded" with `html` at `url`; no network involved.
    pub fn from_html(url: &str, html: &str) -> Self {
        let mut page = Self::with_client(Client::new());
        page.url = Url::parse(url)
            .map(|u| u.to_string())
            .unwrap_or_else(|_| url.to_string());
        page.html = html.to_string();
        page.status = Some(200);
        page
    }

    pub fn status(&self) -> Option<u16> {
        self.status
    }

    pub fn device(&self) -> Option<&DeviceProfile> {
        self.device.as_ref()
    }

    fn document(&self) -> Html {
        Html::parse_document(&self.html)
    }

    /// Resolve, check it is rendered, and return its index plus the href to follow on click.
    fn interact(&mut self, locator: &Locator, action: &str, timeout: Duration) -> Result<Option<String>> {
        let doc = self.document();
        let element = first_match(&doc, locator)?
            .ok_or_else(|| ScanError::ElementNotFound(locator.to_string()))?;

        if !is_rendered(&doc, element, &self.revealed) {
            return Err(ScanError::Timeout {
                action: format!("{} {}", action, locator),
                timeout,
            });
        }

        for index in reveal_targets(&doc, element) {
            self.revealed.insert(index);
        }

        let follow = if element.value().name() == "a" {
            element
                .value()
                .attr("href")
                .filter(|href| !is_invalid_href(href))
                .and_then(|href| normalize_url(href, &self.url))
        } else {
            None
        };
        Ok(follow)
    }

    fn query<T>(&self, f: impl FnOnce(&Html, &HashSet<usize>) -> Result<T>) -> Result<T> {
        let doc = self.document();
        f(&doc, &self.revealed)
    }
}

#[async_trait]
impl BrowserPage for StaticPage {
    async fn goto(&mut self, url: &str, timeout: Duration) -> Result<NavigationResponse> {
        let target = normalize_url(url, &self.url)
            .or_else(|| Url::parse(url).ok().map(|u| u.to_string()))
            .ok_or_else(|| ScanError::InvalidUrl(url.to_string()))?;

        debug!("Fetching {}", target);
        let response = self.client.get(&target).timeout(timeout).send().await?;
        let status = response.status().as_u16();
        let final_url = response.url().to_string();
        let body = response.text().await?;

        self.url = final_url.clone();
        self.html = body;
        self.status = Some(status);
        self.revealed.clear();

        Ok(NavigationResponse {
            status: Some(status),
            final_url,
        })
    }

    async fn wait_for_load_state(&mut self, _state: LoadState, _timeout: Duration) -> Result<()> {
        // the whole document is present once fetched
        Ok(())
    }

    async fn current_url(&self) -> Result<String> {
        Ok(self.url.clone())
    }

    async fn title(&self) -> Result<String> {
        self.query(|doc, _| {
            let selector = parse_selector("title")?;
            Ok(doc
                .select(&selector)
                .next()
                .map(|el| collapse_text(el))
                .unwrap_or_default())
        })
    }

    async fn anchors(&self, scope: AnchorScope) -> Result<Vec<AnchorRow>> {
        self.query(|doc, revealed| {
            let anchor = parse_selector(ANCHOR_SELECTOR)?;
            let rows = match scope {
                AnchorScope::Document => anchor_rows(doc.select(&anchor), doc, revealed),
                AnchorScope::HeaderRegion => {
                    let root = ["header", "nav", "body"]
                        .into_iter()
                        .find_map(|tag| {
                            parse_selector(tag)
                                .ok()
                                .and_then(|sel| doc.select(&sel).next())
                        })
                        .unwrap_or_else(|| doc.root_element());
                    anchor_rows(root.select(&anchor), doc, revealed)
                }
            };
            Ok(rows)
        })
    }

    async fn footer_anchors(&self) -> Result<FooterScan> {
        self.query(|doc, revealed| {
            let footer = parse_selector("footer")?;
            let anchor = parse_selector(ANCHOR_SELECTOR)?;
            match doc.select(&footer).next() {
                Some(root) => Ok(FooterScan {
                    source: FooterSource::Semantic,
                    rows: anchor_rows(root.select(&anchor), doc, revealed),
                }),
                None => {
                    // no layout, so nothing can be placed in the bottom of the viewport
                    debug!("No <footer> element and no layout information");
                    Ok(FooterScan {
                        source: FooterSource::ViewportHeuristic,
                        rows: Vec::new(),
                    })
                }
            }
        })
    }

    async fn is_visible(&self, locator: &Locator, _timeout: Duration) -> Result<bool> {
        self.query(|doc, revealed| {
            Ok(first_match(doc, locator)?.is_some_and(|el| is_rendered(doc, el, revealed)))
        })
    }

    async fn count_visible(&self, locator: &Locator) -> Result<usize> {
        self.query(|doc, revealed| {
            Ok(all_matches(doc, locator)?
                .into_iter()
                .filter(|el| is_rendered(doc, *el, revealed))
                .count())
        })
    }

    async fn tag_name(&self, locator: &Locator) -> Result<String> {
        self.query(|doc, _| {
            first_match(doc, locator)?
                .map(|el| el.value().name().to_lowercase())
                .ok_or_else(|| ScanError::ElementNotFound(locator.to_string()))
        })
    }

    async fn attribute(&self, locator: &Locator, name: &str) -> Result<Option<String>> {
        self.query(|doc, _| {
            first_match(doc, locator)?
                .map(|el| el.value().attr(name).map(str::to_string))
                .ok_or_else(|| ScanError::ElementNotFound(locator.to_string()))
        })
    }

    async fn text_content(&self, locator: &Locator) -> Result<Option<String>> {
        self.query(|doc, _| Ok(first_match(doc, locator)?.map(collapse_text)))
    }

    async fn scroll_into_view(&mut self, locator: &Locator, timeout: Duration) -> Result<()> {
        let visible = self.is_visible(locator, timeout).await?;
        if visible {
            Ok(())
        } else {
            Err(ScanError::Timeout {
                action: format!("scroll into view {}", locator),
                timeout,
            })
        }
    }

    async fn hover(&mut self, locator: &Locator, timeout: Duration) -> Result<()> {
        self.interact(locator, "hover", timeout)?;
        Ok(())
    }

    async fn click(&mut self, locator: &Locator, timeout: Duration) -> Result<()> {
        if let Some(href) = self.interact(locator, "click", timeout)? {
            self.goto(&href, timeout).await?;
        }
        Ok(())
    }

    async fn emulate_device(&mut self, device: &DeviceProfile) -> Result<()> {
        self.device = Some(device.clone());
        Ok(())
    }

    async fn layout_metrics(&self) -> Result<LayoutMetrics> {
        Err(ScanError::Unsupported("layout metrics".to_string()))
    }

    async fn screenshot(&mut self, _path: &Path, _full_page: bool) -> Result<()> {
        Err(ScanError::Unsupported("screenshots".to_string()))
    }
}

fn parse_selector(selector: &str) -> Result<Selector> {
    Selector::parse(selector)
        .map_err(|e| ScanError::ParseError(format!("invalid selector '{}': {}", selector, e)))
}

fn collapse_text(element: ElementRef<'_>) -> String {
    element
        .text()
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

fn accessible_name(element: ElementRef<'_>) -> String {
    if let Some(label) = element.value().attr("aria-label") {
        return label.trim().to_string();
    }
    let text = collapse_text(element);
    if text.is_empty() {
        element.value().attr("value").unwrap_or_default().trim().to_string()
    } else {
        text
    }
}

fn contains_ignore_case(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

fn all_matches<'a>(doc: &'a Html, locator: &Locator) -> Result<Vec<ElementRef<'a>>> {
    match locator {
        Locator::Css { selector, has_text } => {
            let selector = parse_selector(selector)?;
            Ok(doc
                .select(&selector)
                .filter(|el| {
                    has_text
                        .as_deref()
                        .is_none_or(|text| contains_ignore_case(&collapse_text(*el), text))
                })
                .collect())
        }
        Locator::Role { role, name } => {
            let selector = parse_selector(match role {
                AriaRole::Link => LINK_ROLE_SELECTOR,
                AriaRole::Button => BUTTON_ROLE_SELECTOR,
            })?;
            Ok(doc
                .select(&selector)
                .filter(|el| contains_ignore_case(&accessible_name(*el), name))
                .collect())
        }
    }
}

fn first_match<'a>(doc: &'a Html, locator: &Locator) -> Result<Option<ElementRef<'a>>> {
    Ok(all_matches(doc, locator)?.into_iter().next())
}

/// Hidden by its own markup, regardless of ancestors.
fn is_self_hidden(element: ElementRef<'_>) -> bool {
    let value = element.value();
    if value.attr("hidden").is_some() {
        return true;
    }
    if value
        .attr("aria-hidden")
        .is_some_and(|v| v.eq_ignore_ascii_case("true"))
    {
        return true;
    }
    if value.name() == "input"
        && value
            .attr("type")
            .is_some_and(|t| t.eq_ignore_ascii_case("hidden"))
    {
        return true;
    }
    value.attr("style").is_some_and(|style| {
        let compact: String = style
            .chars()
            .filter(|c| !c.is_whitespace())
            .collect::<String>()
            .to_lowercase();
        compact.contains("display:none") || compact.contains("visibility:hidden")
    })
}

fn element_index(doc: &Html, element: ElementRef<'_>) -> Option<usize> {
    doc.root_element()
        .descendants()
        .filter_map(ElementRef::wrap)
        .position(|el| el == element)
}

fn is_rendered(doc: &Html, element: ElementRef<'_>, revealed: &HashSet<usize>) -> bool {
    let chain = std::iter::once(element).chain(element.ancestors().filter_map(ElementRef::wrap));
    for el in chain {
        if is_self_hidden(el) && !element_index(doc, el).is_some_and(|i| revealed.contains(&i)) {
            return false;
        }
    }
    true
}

/// Elements un-hidden by interacting with `element`.
fn reveal_targets(doc: &Html, element: ElementRef<'_>) -> Vec<usize> {
    let mut targets = Vec::new();

    if let Some(controls) = element.value().attr("aria-controls") {
        for id in controls.split_whitespace() {
            let target = doc
                .root_element()
                .descendants()
                .filter_map(ElementRef::wrap)
                .find(|el| el.value().id() == Some(id));
            if let Some(index) = target.and_then(|el| element_index(doc, el)) {
                targets.push(index);
            }
        }
    }

    if let Some(parent) = element.parent() {
        for sibling in parent.children().filter_map(ElementRef::wrap) {
            if sibling != element && is_self_hidden(sibling)
                && let Some(index) = element_index(doc, sibling)
            {
                targets.push(index);
            }
        }
    }

    targets
}

fn anchor_rows<'a>(
    anchors: impl Iterator<Item = ElementRef<'a>>,
    doc: &Html,
    revealed: &HashSet<usize>,
) -> Vec<AnchorRow> {
    anchors
        .filter(|el| is_rendered(doc, *el, revealed))
        .map(|el| AnchorRow {
            text: collapse_text(el),
            href: el.value().attr("href").unwrap_or_default().to_string(),
        })
        .collect()
}
