// Discovery cache on disk

use serde::Serialize;
use sitesweep_scanner::DiscoveredUrls;
use std::fs;
use std::io;
use std::path::Path;
use tracing::debug;

/// Load a previously written discovery result.
///
/// A missing, unreadable or malformed file means "no cache"; it is never an error.
pub fn load_cached_discovered_urls(path: &Path) -> Option<DiscoveredUrls> {
    let raw = match fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(e) => {
            debug!("No discovery cache at {}: {}", path.display(), e);
            return None;
        }
    };

    match serde_json::from_str(&raw) {
        Ok(cached) => Some(cached),
        Err(e) => {
            debug!("Ignoring malformed discovery cache {}: {}", path.display(), e);
            None
        }
    }
}

/// Pretty-print `data` to `path`, creating parent directories and overwriting.
pub fn write_json_file<T: Serialize>(path: &Path, data: &T) -> io::Result<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent)?;
    }
    let json = serde_json::to_string_pretty(data).map_err(io::Error::other)?;
    fs::write(path, json)
}

#[cfg(test)]
mod tests {
    use super::*;
    use sitesweep_scanner::Section;
    use tempfile::TempDir;

    #[test]
    fn test_missing_file_is_no_cache() {
        let dir = TempDir::new().unwrap();
        assert!(load_cached_discovered_urls(&dir.path().join("nope.json")).is_none());
    }

    #[test]
    fn test_malformed_file_is_no_cache() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("discovered-urls.json");
        fs::write(&path, "{ not json").unwrap();
        assert!(load_cached_discovered_urls(&path).is_none());
    }

    #[test]
    fn test_write_creates_parents_and_overwrites() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("reports").join("nested").join("cache.json");

        let mut first = DiscoveredUrls::new("https://falaya.com".to_string());
        first.nav_urls.insert("https://falaya.com/pricing".to_string());
        write_json_file(&path, &first).unwrap();

        let mut second = DiscoveredUrls::new("https://falaya.com".to_string());
        second
            .section_urls
            .insert(Section::Sell, vec!["https://falaya.com/sell".to_string()]);
        write_json_file(&path, &second).unwrap();

        let loaded = load_cached_discovered_urls(&path).unwrap();
        assert_eq!(loaded, second);

        let raw = fs::read_to_string(&path).unwrap();
        assert!(raw.contains("\n  \"generatedAt\""));
    }
}
