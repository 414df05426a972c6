//! Link extraction from rendered pages.
//!
//! The page hands back raw anchor rows; everything here is filtering,
//! normalisation and deduplication on this side of the boundary.

use crate::browser::{AnchorRow, AnchorScope, BrowserPage};
use crate::error::Result;
use crate::normalize::normalize_internal;
use crate::result::FooterLink;
use std::collections::HashSet;
use tracing::debug;

/// Placeholder text for footer anchors with no visible text.
pub const EMPTY_LINK_TEXT: &str = "(no text)";

/// An internal link with the first visible text seen for it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InternalLink {
    pub text: String,
    pub url: String,
}

/// Internal links under the header region (header, else nav, else body),
/// deduplicated in document order.
pub async fn collect_header_links(page: &dyn BrowserPage, base_url: &str) -> Result<Vec<String>> {
    let rows = page.anchors(AnchorScope::HeaderRegion).await?;
    let links = header_links_from_rows(&rows, base_url);
    debug!("Header region yielded {} internal links from {} anchors", links.len(), rows.len());
    Ok(links)
}

/// Every internal link in the document, first occurrence wins, document order.
pub async fn collect_all_internal_links(
    page: &dyn BrowserPage,
    base_url: &str,
) -> Result<Vec<InternalLink>> {
    let rows = page.anchors(AnchorScope::Document).await?;
    Ok(internal_links_from_rows(&rows, base_url))
}

/// Footer links of the current page, deduplicated by (text, href).
///
/// Hrefs resolve against `page_url` (the page may have redirected) but must
/// be internal to `base_url`.
pub async fn extract_footer_links(
    page: &dyn BrowserPage,
    page_url: &str,
    base_url: &str,
) -> Result<Vec<FooterLink>> {
    let scan = page.footer_anchors().await?;
    if scan.source.is_heuristic() {
        debug!("No <footer> on {}; using bottom-of-viewport anchors", page_url);
    }

    let mut seen = HashSet::new();
    let mut links = Vec::new();

    for row in &scan.rows {
        let Some(href) = normalize_internal(&row.href, page_url, base_url) else {
            continue;
        };
        if !seen.insert((row.text.clone(), href.clone())) {
            continue;
        }

        let link_text = if row.text.is_empty() {
            EMPTY_LINK_TEXT.to_string()
        } else {
            row.text.clone()
        };

        links.push(FooterLink {
            link_text,
            href,
            source: scan.source,
        });
    }

    Ok(links)
}

pub fn header_links_from_rows(rows: &[AnchorRow], base_url: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    rows.iter()
        .filter_map(|row| normalize_internal(&row.href, base_url, base_url))
        .filter(|url| seen.insert(url.clone()))
        .collect()
}

pub fn internal_links_from_rows(rows: &[AnchorRow], base_url: &str) -> Vec<InternalLink> {
    let mut seen = HashSet::new();
    let mut links = Vec::new();

    for row in rows {
        let Some(url) = normalize_internal(&row.href, base_url, base_url) else {
            continue;
        };
        if seen.insert(url.clone()) {
            links.push(InternalLink {
                text: row.text.clone(),
                url,
            });
        }
    }

    links
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::result::FooterSource;
    use crate::static_page::StaticPage;

    const BASE: &str = "https://falaya.com";

    fn row(text: &str, href: &str) -> AnchorRow {
        AnchorRow {
            text: text.to_string(),
            href: href.to_string(),
        }
    }

    #[test]
    fn test_internal_links_keep_first_text_in_document_order() {
        let rows = vec![
            row("Pricing", "/pricing"),
            row("Home", "/"),
            row("See plans", "/pricing/"),
            row("External", "https://other.com/x"),
            row("Skip", "#main"),
            row("Mail", "mailto:hi@falaya.com"),
        ];
        let links = internal_links_from_rows(&rows, BASE);
        assert_eq!(
            links,
            vec![
                InternalLink {
                    text: "Pricing".to_string(),
                    url: "https://falaya.com/pricing".to_string()
                },
                InternalLink {
                    text: "Home".to_string(),
                    url: "https://falaya.com/".to_string()
                },
            ]
        );
    }

    #[test]
    fn test_header_links_are_normalized_and_deduped_in_order() {
        let rows = vec![
            row("Sell", "/sell"),
            row("Research", "/research#top"),
            row("Research", "/research/"),
            row("", "javascript:void(0)"),
            row("Pricing", "/pricing"),
        ];
        let links = header_links_from_rows(&rows, BASE);
        assert_eq!(
            links,
            vec![
                "https://falaya.com/sell",
                "https://falaya.com/research",
                "https://falaya.com/pricing"
            ]
        );
    }

    #[tokio::test]
    async fn test_collect_header_links_prefers_header_element() {
        let page = StaticPage::from_html(
            BASE,
            r#"<html><body>
                <nav><a href="/blog">Blog</a></nav>
                <header><a href="/pricing">Pricing</a><a href="/sell/">Sell</a></header>
                <main><a href="/research">Research</a></main>
            </body></html>"#,
        );
        let links = collect_header_links(&page, BASE).await.unwrap();
        assert_eq!(links, vec!["https://falaya.com/pricing", "https://falaya.com/sell"]);
    }

    #[tokio::test]
    async fn test_collect_header_links_falls_back_to_nav_then_body() {
        let page = StaticPage::from_html(
            BASE,
            r#"<html><body><nav><a href="/features">Features</a></nav><a href="/blog">Blog</a></body></html>"#,
        );
        let links = collect_header_links(&page, BASE).await.unwrap();
        assert_eq!(links, vec!["https://falaya.com/features"]);

        let page = StaticPage::from_html(
            BASE,
            r#"<html><body><div><a href="/blog">Blog</a></div></body></html>"#,
        );
        let links = collect_header_links(&page, BASE).await.unwrap();
        assert_eq!(links, vec!["https://falaya.com/blog"]);
    }

    #[tokio::test]
    async fn test_footer_links_dedupe_by_text_and_href() {
        let page = StaticPage::from_html(
            BASE,
            r#"<html><body>
                <header><a href="/pricing">Pricing</a></header>
                <footer>
                    <a href="/privacy">Privacy</a>
                    <a href="/privacy">Privacy</a>
                    <a href="/privacy/">Privacy policy</a>
                    <a href="/terms"> </a>
                    <a href="https://twitter.com/falaya">Twitter</a>
                    <a href="tel:123">Call</a>
                </footer>
            </body></html>"#,
        );
        let links = extract_footer_links(&page, BASE, BASE).await.unwrap();
        assert_eq!(links.len(), 3);
        assert_eq!(links[0].link_text, "Privacy");
        assert_eq!(links[0].href, "https://falaya.com/privacy");
        assert_eq!(links[1].link_text, "Privacy policy");
        assert_eq!(links[2].link_text, EMPTY_LINK_TEXT);
        assert_eq!(links[2].href, "https://falaya.com/terms");
        assert!(links.iter().all(|l| l.source == FooterSource::Semantic));
    }

    #[tokio::test]
    async fn test_footer_links_resolve_against_page_url() {
        let page = StaticPage::from_html(
            "https://falaya.com/sell/",
            r#"<html><body><footer><a href="guide">Guide</a></footer></body></html>"#,
        );
        let links = extract_footer_links(&page, "https://falaya.com/sell/", BASE)
            .await
            .unwrap();
        assert_eq!(links[0].href, "https://falaya.com/sell/guide");
    }
}
