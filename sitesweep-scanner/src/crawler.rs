use crate::browser::{AriaRole, BrowserPage, LoadState, Locator};
use crate::error::{Result, ScanError};
use crate::extractor::{InternalLink, collect_all_internal_links, collect_header_links};
use crate::normalize::{is_invalid_href, normalize_internal, normalize_url};
use crate::prober::{MenuProber, ProbeOutcome};
use crate::result::{DiscoveredUrls, MAX_LINKS_PER_SECTION};
use crate::section::Section;
use crate::timeouts::Timeouts;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use tracing::{debug, info, warn};

pub type ProgressCallback = Arc<dyn Fn(String) + Send + Sync>;

/// Labels of account entry points collected as direct links.
pub const DIRECT_LINK_LABELS: [&str; 5] = ["Login", "Signup", "Sign up", "Forgot Password", "Forgot"];

/// Substrings of "text url" that mark an account link when no labelled one was found.
const DIRECT_LINK_KEYWORDS: [&str; 4] = ["login", "sign up", "signup", "forgot"];

/// One navigation discovery pass over a single browser page.
pub struct Crawler {
    timeouts: Timeouts,
    progress_callback: Option<ProgressCallback>,
}

impl Crawler {
    pub fn new(timeouts: Timeouts) -> Self {
        Self {
            timeouts,
            progress_callback: None,
        }
    }

    pub fn with_progress_callback(mut self, callback: ProgressCallback) -> Self {
        self.progress_callback = Some(callback);
        self
    }

    fn report(&self, message: impl Into<String>) {
        if let Some(ref callback) = self.progress_callback {
            callback(message.into());
        }
    }

    /// Crawl the navigation of `base_url`.
    ///
    /// Only a failure to load the root page aborts the pass; every probe,
    /// wait and extraction miss after that is absorbed.
    pub async fn discover_nav_urls(
        &self,
        page: &mut dyn BrowserPage,
        base_url: &str,
    ) -> Result<DiscoveredUrls> {
        info!("Starting navigation discovery of {}", base_url);
        self.report(format!("Loading {}", base_url));

        if let Err(e) = page.goto(base_url, self.timeouts.navigation).await {
            return Err(ScanError::CrawlAborted {
                url: base_url.to_string(),
                reason: e.to_string(),
            });
        }

        if let Err(e) = page
            .wait_for_load_state(LoadState::NetworkIdle, self.timeouts.network_idle)
            .await
        {
            debug!("Network idle wait ended early: {}", e);
        }

        let prober = MenuProber::new(self.timeouts);
        let dismissed = prober.dismiss_cookie_banners(page).await;
        if dismissed > 0 {
            debug!("Dismissed {} consent prompt(s)", dismissed);
        }

        let mut result = DiscoveredUrls::new(base_url.to_string());

        self.report("Collecting header links".to_string());
        let header_links = self.header_links_or_empty(page, base_url).await;
        debug!("Seeded {} URLs from the header", header_links.len());
        result.nav_urls.extend(header_links);

        self.report("Looking for account links".to_string());
        let direct = self.collect_direct_links(page, base_url).await;
        result.nav_urls.extend(direct.iter().cloned());

        let all_internal = match collect_all_internal_links(page, base_url).await {
            Ok(links) => links,
            Err(e) => {
                warn!("Page-wide link scan failed: {}", e);
                Vec::new()
            }
        };

        if direct.is_empty() {
            let fallback = direct_links_by_keyword(&all_internal);
            debug!("Keyword fallback matched {} account links", fallback.len());
            result.nav_urls.extend(fallback.iter().cloned());
            result.direct_urls.extend(fallback);
        } else {
            result.direct_urls.extend(direct);
        }

        let buckets = bucket_by_section(&all_internal);

        for section in Section::ALL {
            self.report(format!("Probing section {}", section));

            match prober.open_section_menu(page, section).await {
                ProbeOutcome::Interacted { strategy, clicked } => {
                    debug!(
                        "Section {} menu: strategy {} (clicked: {})",
                        section, strategy, clicked
                    );
                }
                ProbeOutcome::NotFound => {}
            }

            let after = self.header_links_or_empty(page, base_url).await;
            let mut urls: Vec<String> = after
                .into_iter()
                .filter(|url| Section::classify(url) == Some(section))
                .collect();

            if urls.is_empty() {
                debug!("No header links for {}, using page-wide links", section);
                urls = buckets.get(&section).cloned().unwrap_or_default();
            }

            urls.truncate(MAX_LINKS_PER_SECTION);
            result.nav_urls.extend(urls.iter().cloned());
            result.section_urls.insert(section, urls);
        }

        info!(
            "Discovery complete: {} nav URLs, {} section URLs, {} direct URLs",
            result.nav_urls.len(),
            result.total_section_urls(),
            result.direct_urls.len()
        );

        Ok(result)
    }

    async fn header_links_or_empty(
        &self,
        page: &dyn BrowserPage,
        base_url: &str,
    ) -> Vec<String> {
        collect_header_links(page, base_url).await.unwrap_or_else(|e| {
            warn!("Header link scan failed: {}", e);
            Vec::new()
        })
    }

    /// Labelled account links. Each candidate locator is tried on its own.
    async fn collect_direct_links(
        &self,
        page: &dyn BrowserPage,
        base_url: &str,
    ) -> BTreeSet<String> {
        let mut found = BTreeSet::new();

        for label in DIRECT_LINK_LABELS {
            let candidates = [
                Locator::css_with_text("header a", label),
                Locator::css_with_text("nav a", label),
                Locator::role(AriaRole::Link, label),
            ];

            for locator in &candidates {
                match self.direct_link_href(page, locator, base_url).await {
                    Ok(Some(url)) => {
                        debug!("Direct link {} -> {}", locator, url);
                        found.insert(url);
                    }
                    Ok(None) => {}
                    Err(e) => debug!("Direct link candidate {} failed: {}", locator, e),
                }
            }
        }

        found
    }

    async fn direct_link_href(
        &self,
        page: &dyn BrowserPage,
        locator: &Locator,
        base_url: &str,
    ) -> Result<Option<String>> {
        if !page.is_visible(locator, self.timeouts.visibility).await? {
            return Ok(None);
        }
        let href = page.attribute(locator, "href").await?;
        Ok(href.and_then(|href| normalize_internal(&href, base_url, base_url)))
    }
}

fn direct_links_by_keyword(links: &[InternalLink]) -> Vec<String> {
    links
        .iter()
        .filter(|link| {
            let haystack = format!("{} {}", link.text, link.url).to_lowercase();
            DIRECT_LINK_KEYWORDS.iter().any(|k| haystack.contains(k))
        })
        .map(|link| link.url.clone())
        .collect()
}

fn bucket_by_section(links: &[InternalLink]) -> BTreeMap<Section, Vec<String>> {
    let mut buckets: BTreeMap<Section, Vec<String>> = BTreeMap::new();
    for link in links {
        if let Some(section) = Section::classify(&link.url) {
            buckets.entry(section).or_default().push(link.url.clone());
        }
    }
    buckets
}

/// Re-normalize a URL list against `base_url`, dropping invalid entries.
/// The output is deduplicated and sorted.
pub fn merge_and_normalize_urls<I, S>(base_url: &str, urls: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    urls.into_iter()
        .filter_map(|url| {
            let url = url.as_ref();
            if is_invalid_href(url) {
                None
            } else {
                normalize_url(url, base_url)
            }
        })
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::static_page::StaticPage;
    use std::sync::Mutex;
    use wiremock::{
        Mock, MockServer, ResponseTemplate,
        matchers::{method, path},
    };

    const BASE: &str = "https://falaya.com";

    fn crawler() -> Crawler {
        Crawler::new(Timeouts::fast())
    }

    /// Fixture pages are already loaded, so the crawler's root `goto` goes to wiremock.
    async fn serve(html: &str) -> MockServer {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-type", "text/html")
                    .set_body_bytes(html.as_bytes().to_vec()),
            )
            .mount(&mock_server)
            .await;
        mock_server
    }

    fn at(server: &MockServer, path: &str) -> String {
        format!("{}{}", server.uri(), path)
    }

    #[tokio::test]
    async fn test_discovers_header_and_hamburger_links() {
        let server = serve(
            r#"<html><body><header>
                <a href="/">Home</a>
                <a href="/pricing">Pricing</a>
                <a href="/research#top">Research</a>
                <button aria-controls="sell-menu">Sell</button>
                <div id="sell-menu" hidden><a href="/sell/offer">Get an offer</a></div>
            </header></body></html>"#,
        )
        .await;

        let mut page = StaticPage::new().unwrap();
        let result = crawler()
            .discover_nav_urls(&mut page, &server.uri())
            .await
            .unwrap();

        assert_eq!(result.section(Section::Pricing), [at(&server, "/pricing")]);
        assert_eq!(result.section(Section::Research), [at(&server, "/research")]);
        assert_eq!(result.section(Section::Sell), [at(&server, "/sell/offer")]);
        assert!(result.section(Section::WhyFalaya).is_empty());

        for url in ["/pricing", "/research", "/sell/offer"] {
            assert!(result.nav_urls.contains(&at(&server, url)), "missing {}", url);
        }
        let sorted: Vec<_> = result.nav_urls.iter().cloned().collect();
        let mut expected = sorted.clone();
        expected.sort();
        assert_eq!(sorted, expected);
    }

    #[tokio::test]
    async fn test_section_urls_keep_document_order() {
        let server = serve(
            r#"<html><body><header>
                <a href="/sell/zillow-alternative">Compare</a>
                <a href="/sell/agents">Agents</a>
                <a href="/sell/zillow-alternative/">Compare again</a>
            </header></body></html>"#,
        )
        .await;

        let mut page = StaticPage::new().unwrap();
        let result = crawler()
            .discover_nav_urls(&mut page, &server.uri())
            .await
            .unwrap();

        assert_eq!(
            result.section(Section::Sell),
            [
                at(&server, "/sell/zillow-alternative"),
                at(&server, "/sell/agents")
            ]
        );
    }

    #[tokio::test]
    async fn test_section_falls_back_to_page_wide_links_and_truncates() {
        let mut body = String::from("<html><body><header><a href=\"/\">Home</a></header><main>");
        for i in 0..20 {
            body.push_str(&format!("<a href=\"/features/f{}\">Feature {}</a>", i, i));
        }
        body.push_str("</main></body></html>");
        let server = serve(&body).await;

        let mut page = StaticPage::new().unwrap();
        let result = crawler()
            .discover_nav_urls(&mut page, &server.uri())
            .await
            .unwrap();

        let why = result.section(Section::WhyFalaya);
        assert_eq!(why.len(), MAX_LINKS_PER_SECTION);
        assert_eq!(why[0], at(&server, "/features/f0"));
        assert_eq!(why[14], at(&server, "/features/f14"));
        assert!(result.nav_urls.contains(&at(&server, "/features/f14")));
        assert!(!result.nav_urls.contains(&at(&server, "/features/f15")));
    }

    #[tokio::test]
    async fn test_labelled_direct_links() {
        let server = serve(
            r#"<html><body>
                <header><a href="/auth/login">Login</a><a href="https://app.other.com/signup">Sign up</a></header>
                <main><a href="/help/forgot">Forgot password?</a></main>
            </body></html>"#,
        )
        .await;

        let mut page = StaticPage::new().unwrap();
        let result = crawler()
            .discover_nav_urls(&mut page, &server.uri())
            .await
            .unwrap();

        let direct: Vec<_> = result.direct_urls.iter().cloned().collect();
        assert_eq!(direct, vec![at(&server, "/auth/login"), at(&server, "/help/forgot")]);
        assert!(result.nav_urls.contains(&at(&server, "/help/forgot")));
    }

    #[tokio::test]
    async fn test_direct_links_keyword_fallback() {
        let server = serve(
            r#"<html><body>
                <main><a href="/account/signup-now">Create account</a><a href="/blog">Blog</a></main>
            </body></html>"#,
        )
        .await;

        let mut page = StaticPage::new().unwrap();
        let result = crawler()
            .discover_nav_urls(&mut page, &server.uri())
            .await
            .unwrap();

        assert!(result.direct_urls.contains(&at(&server, "/account/signup-now")));
        assert!(result.nav_urls.contains(&at(&server, "/account/signup-now")));
        assert!(!result.nav_urls.contains(&at(&server, "/blog")));
    }

    #[tokio::test]
    async fn test_root_failure_aborts_crawl() {
        let mut page = StaticPage::new().unwrap();
        let err = crawler()
            .discover_nav_urls(&mut page, "http://127.0.0.1:9/")
            .await
            .unwrap_err();
        match err {
            ScanError::CrawlAborted { url, .. } => assert_eq!(url, "http://127.0.0.1:9/"),
            other => panic!("expected CrawlAborted, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_progress_callback_reports_each_section() {
        let server = serve("<html><body><header></header></body></html>").await;
        let messages = Arc::new(Mutex::new(Vec::new()));
        let sink = messages.clone();

        let crawler = crawler().with_progress_callback(Arc::new(move |msg| {
            sink.lock().unwrap().push(msg);
        }));
        let mut page = StaticPage::new().unwrap();
        crawler.discover_nav_urls(&mut page, &server.uri()).await.unwrap();

        let messages = messages.lock().unwrap();
        for section in Section::ALL {
            assert!(messages.contains(&format!("Probing section {}", section)));
        }
    }

    #[test]
    fn test_merge_and_normalize_urls() {
        let merged = merge_and_normalize_urls(
            BASE,
            [
                "https://falaya.com/sell/",
                "/pricing#plans",
                "https://falaya.com/sell",
                "mailto:x@falaya.com",
                "",
            ],
        );
        assert_eq!(merged, vec!["https://falaya.com/pricing", "https://falaya.com/sell"]);
    }
}
