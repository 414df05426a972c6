use crate::section::Section;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

pub const MAX_LINKS_PER_SECTION: usize = 15;

/// Output of one discovery pass. Every URL is normalised.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiscoveredUrls {
    pub generated_at: DateTime<Utc>,
    pub base_url: String,
    pub nav_urls: BTreeSet<String>,
    /// Collection order is kept; at most `MAX_LINKS_PER_SECTION` per section.
    pub section_urls: BTreeMap<Section, Vec<String>>,
    pub direct_urls: BTreeSet<String>,
}

impl DiscoveredUrls {
    pub fn new(base_url: String) -> Self {
        Self {
            generated_at: Utc::now(),
            base_url,
            nav_urls: BTreeSet::new(),
            section_urls: BTreeMap::new(),
            direct_urls: BTreeSet::new(),
        }
    }

    pub fn section(&self, section: Section) -> &[String] {
        self.section_urls
            .get(&section)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn total_section_urls(&self) -> usize {
        self.section_urls.values().map(Vec::len).sum()
    }
}

/// Where a footer link was found.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FooterSource {
    /// Inside a `<footer>` landmark.
    Semantic,
    /// No footer landmark; anchors in the bottom quarter of the viewport.
    ViewportHeuristic,
}

impl FooterSource {
    pub fn is_heuristic(&self) -> bool {
        matches!(self, FooterSource::ViewportHeuristic)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FooterLink {
    pub link_text: String,
    pub href: String,
    pub source: FooterSource,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_json_field_names_are_camel_case() {
        let mut discovered = DiscoveredUrls::new("https://falaya.com".to_string());
        discovered.nav_urls.insert("https://falaya.com/pricing".to_string());
        discovered
            .section_urls
            .insert(Section::WhyFalaya, vec!["https://falaya.com/features".to_string()]);

        let value = serde_json::to_value(&discovered).unwrap();
        assert!(value.get("generatedAt").is_some());
        assert_eq!(value["baseUrl"], "https://falaya.com");
        assert_eq!(value["navUrls"][0], "https://falaya.com/pricing");
        assert_eq!(value["sectionUrls"]["Why Falaya"][0], "https://falaya.com/features");
        assert!(value["directUrls"].as_array().unwrap().is_empty());
    }

    #[test]
    fn test_nav_urls_serialize_sorted_without_duplicates() {
        let mut discovered = DiscoveredUrls::new("https://falaya.com".to_string());
        for url in ["https://falaya.com/sell", "https://falaya.com/", "https://falaya.com/sell"] {
            discovered.nav_urls.insert(url.to_string());
        }
        let value = serde_json::to_value(&discovered).unwrap();
        assert_eq!(
            value["navUrls"],
            serde_json::json!(["https://falaya.com/", "https://falaya.com/sell"])
        );
    }

    #[test]
    fn test_section_accessor_defaults_to_empty() {
        let discovered = DiscoveredUrls::new("https://falaya.com".to_string());
        assert!(discovered.section(Section::Sell).is_empty());
        assert_eq!(discovered.total_section_urls(), 0);
    }
}
