pub mod cache;
pub mod checks;
pub mod discover;
pub mod mobile;
pub mod report;
pub mod verify;

use colored::Colorize;

pub use cache::{load_cached_discovered_urls, write_json_file};
pub use checks::{CheckResult, to_slug};
pub use discover::{DiscoveryOptions, execute_discovery, urls_to_check};
pub use mobile::{MobileCheck, MobileOptions, MobileReport, check_mobile_pages};
pub use report::ReportPaths;
pub use verify::{
    FooterChecker, FooterLinkCheck, UrlPageCheck, UrlVerificationReport, VerifyOptions,
    verify_pages,
};

pub fn print_banner() {
    let banner = r#"
       _ _
   ___(_) |_ ___  _____      _____  ___ _ __
  / __| | __/ _ \/ __\ \ /\ / / _ \/ _ \ '_ \
  \__ \ | ||  __/\__ \\ V  V /  __/  __/ |_) |
  |___/_|\__\___||___/ \_/\_/ \___|\___| .__/
                                       |_|
"#;
    println!("{}", banner.bright_cyan().bold());
    println!(
        "  {} {}\n",
        "navigation discovery and QA sweeps".dimmed(),
        format!("v{}", env!("CARGO_PKG_VERSION")).dimmed()
    );
}
