pub mod browser;
pub mod chromium;
pub mod crawler;
pub mod error;
pub mod extractor;
pub mod normalize;
pub mod prober;
pub mod result;
pub mod section;
pub mod static_page;
pub mod timeouts;

pub use browser::{BrowserPage, DeviceProfile, Locator};
pub use chromium::{ChromiumBrowser, ChromiumConfig, ChromiumPage};
pub use crawler::{Crawler, ProgressCallback, merge_and_normalize_urls};
pub use error::ScanError;
pub use result::{DiscoveredUrls, FooterLink, FooterSource};
pub use section::Section;
pub use static_page::StaticPage;
pub use timeouts::Timeouts;
