use crate::cache::{load_cached_discovered_urls, write_json_file};
use indicatif::{ProgressBar, ProgressStyle};
use sitesweep_scanner::browser::BrowserPage;
use sitesweep_scanner::{
    Crawler, DiscoveredUrls, ProgressCallback, ScanError, Timeouts, merge_and_normalize_urls,
};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};

/// Options for one discovery run
pub struct DiscoveryOptions {
    pub base_url: String,
    pub cache_path: PathBuf,
    /// Return the cached result when one can be read
    pub reuse_cache: bool,
    pub show_progress: bool,
    pub timeouts: Timeouts,
}

/// Discover navigation URLs, reusing or refreshing the on-disk cache.
///
/// Returns `ScanError::CrawlAborted` when the root page cannot be loaded.
/// A cache that cannot be written is logged and does not fail the run.
pub async fn execute_discovery(
    page: &mut dyn BrowserPage,
    options: DiscoveryOptions,
    progress_callback: Option<ProgressCallback>,
) -> Result<DiscoveredUrls, ScanError> {
    let DiscoveryOptions {
        base_url,
        cache_path,
        reuse_cache,
        show_progress,
        timeouts,
    } = options;

    if reuse_cache && let Some(cached) = load_cached_discovered_urls(&cache_path) {
        info!("Using cached discovery from {}", cache_path.display());
        if let Some(ref callback) = progress_callback {
            callback(format!("Using cached discovery from {}", cache_path.display()));
        }
        return Ok(cached);
    }

    let progress_bar = if show_progress {
        let pb = ProgressBar::new_spinner();
        if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.cyan} {msg}") {
            pb.set_style(style);
        }
        pb.enable_steady_tick(std::time::Duration::from_millis(120));
        pb.set_message("Starting discovery...");
        Some(Arc::new(pb))
    } else {
        None
    };

    let mut crawler = Crawler::new(timeouts);
    let spinner = progress_bar.clone();
    let forward = progress_callback.clone();
    if spinner.is_some() || forward.is_some() {
        crawler = crawler.with_progress_callback(Arc::new(move |message: String| {
            if let Some(ref pb) = spinner {
                pb.set_message(message.clone());
            }
            if let Some(ref callback) = forward {
                callback(message);
            }
        }));
    }

    let outcome = crawler.discover_nav_urls(page, &base_url).await;

    let mut discovered = match outcome {
        Ok(discovered) => discovered,
        Err(e) => {
            if let Some(ref pb) = progress_bar {
                pb.finish_with_message(format!("Discovery failed: {}", e));
            }
            return Err(e);
        }
    };

    discovered.nav_urls = merge_and_normalize_urls(&base_url, &discovered.nav_urls)
        .into_iter()
        .collect();

    if let Some(ref pb) = progress_bar {
        pb.finish_with_message(format!(
            "Discovery complete! {} navigation URLs",
            discovered.nav_urls.len()
        ));
    }

    if let Err(e) = write_json_file(&cache_path, &discovered) {
        warn!("Could not write discovery cache {}: {}", cache_path.display(), e);
    }

    Ok(discovered)
}

/// The sorted, normalised list of pages a sweep should visit.
pub fn urls_to_check(discovered: &DiscoveredUrls) -> Vec<String> {
    merge_and_normalize_urls(&discovered.base_url, &discovered.nav_urls)
}
