use serde::{Deserialize, Serialize};
use std::fmt;
use url::Url;

/// Top-level navigation categories of the site under test.
///
/// Declaration order is the order discovery walks them in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Section {
    #[serde(rename = "Sell")]
    Sell,
    #[serde(rename = "Pricing")]
    Pricing,
    #[serde(rename = "Research")]
    Research,
    #[serde(rename = "Why Falaya")]
    WhyFalaya,
}

/// First match wins. Prefixes are lowercase and do not overlap.
const SECTION_PREFIXES: [(&str, Section); 7] = [
    ("/sell", Section::Sell),
    ("/pricing", Section::Pricing),
    ("/research", Section::Research),
    ("/why-falaya", Section::WhyFalaya),
    ("/about-falaya", Section::WhyFalaya),
    ("/features", Section::WhyFalaya),
    ("/comparison", Section::WhyFalaya),
];

impl Section {
    pub const ALL: [Section; 4] = [
        Section::Sell,
        Section::Pricing,
        Section::Research,
        Section::WhyFalaya,
    ];

    /// The label shown in the site's navigation, used to locate the menu trigger.
    pub fn label(&self) -> &'static str {
        match self {
            Section::Sell => "Sell",
            Section::Pricing => "Pricing",
            Section::Research => "Research",
            Section::WhyFalaya => "Why Falaya",
        }
    }

    /// Classify an absolute URL by its path. Unparseable URLs are unclassified.
    pub fn classify(url: &str) -> Option<Section> {
        let parsed = Url::parse(url).ok()?;
        Self::classify_path(parsed.path())
    }

    pub fn classify_path(path: &str) -> Option<Section> {
        let lowered = path.to_lowercase();
        SECTION_PREFIXES
            .iter()
            .find(|(prefix, _)| lowered.starts_with(prefix))
            .map(|(_, section)| *section)
    }
}

impl fmt::Display for Section {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_table() {
        assert_eq!(Section::classify("https://falaya.com/sell/foo"), Some(Section::Sell));
        assert_eq!(Section::classify("https://falaya.com/pricing"), Some(Section::Pricing));
        assert_eq!(Section::classify("https://falaya.com/research/x"), Some(Section::Research));
        assert_eq!(Section::classify("https://falaya.com/why-falaya"), Some(Section::WhyFalaya));
        assert_eq!(Section::classify("https://falaya.com/about-falaya/team"), Some(Section::WhyFalaya));
        assert_eq!(Section::classify("https://falaya.com/features"), Some(Section::WhyFalaya));
        assert_eq!(Section::classify("https://falaya.com/comparison/zillow"), Some(Section::WhyFalaya));
    }

    #[test]
    fn test_classify_unmatched() {
        assert_eq!(Section::classify("https://falaya.com/blog"), None);
        assert_eq!(Section::classify("https://falaya.com/"), None);
        assert_eq!(Section::classify("not a url"), None);
    }

    #[test]
    fn test_classify_is_case_insensitive() {
        assert_eq!(Section::classify("https://falaya.com/PRICING/Plans"), Some(Section::Pricing));
        assert_eq!(Section::classify_path("/Why-Falaya"), Some(Section::WhyFalaya));
    }

    #[test]
    fn test_classify_ignores_query_and_host() {
        assert_eq!(Section::classify("https://other.com/sell?x=/pricing"), Some(Section::Sell));
        assert_eq!(Section::classify("https://falaya.com/blog?next=/sell"), None);
    }

    #[test]
    fn test_serde_uses_display_names() {
        let json = serde_json::to_string(&Section::WhyFalaya).unwrap();
        assert_eq!(json, "\"Why Falaya\"");
        let parsed: Section = serde_json::from_str("\"Research\"").unwrap();
        assert_eq!(parsed, Section::Research);
    }
}
