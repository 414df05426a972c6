//! URL canonicalisation and same-site filtering.
//!
//! `normalize_url` is the single definition of URL equality in the crate:
//! two hrefs point at the same page iff their normalised strings are equal.

use url::Url;

const INVALID_HREF_PREFIXES: [&str; 3] = ["javascript:", "mailto:", "tel:"];

/// Resolve `raw` against `base` into an absolute, comparable http(s) URL.
///
/// The fragment is dropped and trailing slashes are removed from the path,
/// except for the root path which stays `/`. Returns `None` for anything that
/// fails to parse or is not http/https.
pub fn normalize_url(raw: &str, base: &str) -> Option<String> {
    let base_url = Url::parse(base).ok()?;
    let mut url = base_url.join(raw.trim()).ok()?;
    url.set_fragment(None);

    if !matches!(url.scheme(), "http" | "https") {
        return None;
    }

    let trimmed = url.path().trim_end_matches('/').to_string();
    if trimmed.is_empty() {
        url.set_path("/");
    } else {
        url.set_path(&trimmed);
    }

    Some(url.to_string())
}

/// True iff `candidate` (resolved against `base`) has the same hostname as `base`.
pub fn is_internal_url(candidate: &str, base: &str) -> bool {
    let Ok(base_url) = Url::parse(base) else {
        return false;
    };
    let Ok(parsed) = base_url.join(candidate) else {
        return false;
    };

    match (parsed.host_str(), base_url.host_str()) {
        (Some(host), Some(base_host)) => host == base_host,
        _ => false,
    }
}

/// Hrefs that never point at a page: empty, in-page anchors, and script/mail/phone schemes.
pub fn is_invalid_href(href: &str) -> bool {
    let lowered = href.trim().to_lowercase();
    if lowered.is_empty() || lowered.starts_with('#') {
        return true;
    }
    INVALID_HREF_PREFIXES
        .iter()
        .any(|prefix| lowered.starts_with(prefix))
}

/// Normalise `href` against `page_url` and keep it only if it is internal to `base_url`.
pub fn normalize_internal(href: &str, page_url: &str, base_url: &str) -> Option<String> {
    if is_invalid_href(href) {
        return None;
    }
    let url = normalize_url(href, page_url)?;
    is_internal_url(&url, base_url).then_some(url)
}

/// Extract the path component from a URL
pub fn extract_url_path(url: &str) -> String {
    Url::parse(url)
        .ok()
        .map(|u| {
            let path = u.path().to_string();
            if path.is_empty() || path == "/" {
                "/".to_string()
            } else {
                path
            }
        })
        .unwrap_or_else(|| url.to_string())
}
