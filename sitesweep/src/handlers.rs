use anyhow::{Context, bail};
use clap::ArgMatches;
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use sitesweep_core::discover::{DiscoveryOptions, execute_discovery, urls_to_check};
use sitesweep_core::mobile::{MobileOptions, check_mobile_pages};
use sitesweep_core::report::{
    ReportPaths, generate_discovery_report, generate_mobile_summary,
    generate_verification_summary, write_mobile_report, write_url_verification_report,
};
use sitesweep_core::verify::{FooterChecker, VerifyOptions, verify_pages};
use sitesweep_scanner::browser::BrowserPage;
use sitesweep_scanner::{
    ChromiumBrowser, ChromiumConfig, ChromiumPage, DiscoveredUrls, StaticPage, Timeouts,
};
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use tracing::{Level, warn};
use url::Url;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Engine {
    Chromium,
    Static,
}

impl FromStr for Engine {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "chromium" | "chrome" => Ok(Engine::Chromium),
            "static" | "http" => Ok(Engine::Static),
            other => Err(format!("unknown engine '{}'", other)),
        }
    }
}

/// Everything a sweep subcommand needs, resolved from the command line.
#[derive(Debug, Clone, PartialEq)]
pub struct SweepSettings {
    pub base_url: String,
    pub paths: ReportPaths,
    pub engine: Engine,
    pub headful: bool,
    pub use_cache: bool,
    pub screenshots: bool,
    pub quiet: bool,
    pub timeouts: Timeouts,
}

impl SweepSettings {
    pub fn from_matches(args: &ArgMatches) -> anyhow::Result<Self> {
        let url = args
            .get_one::<Url>("url")
            .context("--url has a default and should always be present")?;
        let reports_dir = args
            .get_one::<String>("reports-dir")
            .context("--reports-dir has a default and should always be present")?;
        let engine = args
            .get_one::<String>("engine")
            .map(|raw| Engine::from_str(raw))
            .transpose()
            .map_err(anyhow::Error::msg)?
            .unwrap_or(Engine::Chromium);

        // only `verify` defines --no-screenshots; `mobile` has no --use-cache
        let no_screenshots = optional_flag(args, "no-screenshots");

        Ok(Self {
            base_url: url.as_str().to_string(),
            paths: ReportPaths::new(expand_reports_dir(reports_dir)),
            engine,
            headful: args.get_flag("headful"),
            use_cache: optional_flag(args, "use-cache"),
            screenshots: !no_screenshots,
            quiet: args.get_flag("quiet"),
            timeouts: Timeouts::default(),
        })
    }

    fn discovery_options(&self, reuse_cache: bool) -> DiscoveryOptions {
        DiscoveryOptions {
            base_url: self.base_url.clone(),
            cache_path: self.paths.cache_path(),
            reuse_cache,
            show_progress: !self.quiet,
            timeouts: self.timeouts,
        }
    }
}

fn optional_flag(args: &ArgMatches, id: &str) -> bool {
    args.try_get_one::<bool>(id)
        .ok()
        .flatten()
        .copied()
        .unwrap_or(false)
}

pub fn expand_reports_dir(raw: &str) -> PathBuf {
    PathBuf::from(shellexpand::tilde(raw).as_ref())
}

/// Install the global subscriber. Repeated calls are ignored.
pub fn init_logging(verbose: bool) {
    let level = if verbose { Level::DEBUG } else { Level::WARN };
    let _ = tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}

/// A browser provider plus whatever process backs it.
enum Session {
    Chromium {
        browser: ChromiumBrowser,
        page: ChromiumPage,
    },
    Static(StaticPage),
}

impl Session {
    async fn open(settings: &SweepSettings) -> anyhow::Result<Self> {
        match settings.engine {
            Engine::Static => Ok(Session::Static(StaticPage::new()?)),
            Engine::Chromium => {
                let spinner = spinner(settings.quiet, "Launching Chrome...");
                let mut config = ChromiumConfig::default();
                if settings.headful {
                    config = config.headful();
                }
                let browser = ChromiumBrowser::launch(config)
                    .await
                    .context("could not start Chrome; try --engine static")?;
                let page = browser.new_page().await?;
                if let Some(pb) = spinner {
                    pb.finish_and_clear();
                }
                Ok(Session::Chromium { browser, page })
            }
        }
    }

    fn page(&mut self) -> &mut dyn BrowserPage {
        match self {
            Session::Chromium { page, .. } => page,
            Session::Static(page) => page,
        }
    }

    async fn close(self) {
        if let Session::Chromium { browser, .. } = self
            && let Err(e) = browser.close().await
        {
            warn!("Chrome did not shut down cleanly: {}", e);
        }
    }
}

fn spinner(quiet: bool, message: &str) -> Option<ProgressBar> {
    if quiet {
        return None;
    }
    let pb = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.cyan} {msg}") {
        pb.set_style(style);
    }
    pb.enable_steady_tick(Duration::from_millis(100));
    pb.set_message(message.to_string());
    Some(pb)
}

fn print_divider() {
    println!("{}", "═".repeat(60).bright_blue().bold());
}

fn print_heading(title: &str, settings: &SweepSettings) {
    if settings.quiet {
        return;
    }
    print_divider();
    println!("{}", format!("  {}", title).bright_white().bold());
    print_divider();
    println!("{} Target: {}", "→".blue(), settings.base_url.bright_white());
    println!(
        "{} Reports: {}",
        "→".blue(),
        settings.paths.reports_dir.display().to_string().bright_white()
    );
    println!();
}

async fn discover_with(
    page: &mut dyn BrowserPage,
    settings: &SweepSettings,
    reuse_cache: bool,
) -> anyhow::Result<DiscoveredUrls> {
    let discovered = execute_discovery(page, settings.discovery_options(reuse_cache), None).await?;
    Ok(discovered)
}

fn checked_urls(discovered: &DiscoveredUrls) -> anyhow::Result<Vec<String>> {
    let urls = urls_to_check(discovered);
    if urls.is_empty() {
        bail!("discovery found no navigation URLs to check");
    }
    Ok(urls)
}

pub async fn handle_discover(args: &ArgMatches) -> anyhow::Result<()> {
    let settings = SweepSettings::from_matches(args)?;
    print_heading("SITESWEEP DISCOVERY", &settings);

    let mut session = Session::open(&settings).await?;
    let outcome = discover_with(session.page(), &settings, settings.use_cache).await;
    session.close().await;
    let discovered = outcome?;

    println!("{}", generate_discovery_report(&discovered));
    println!(
        "{} Discovery cache: {}",
        "✓".green().bold(),
        settings.paths.cache_path().display().to_string().bright_white()
    );
    Ok(())
}

pub async fn handle_verify(args: &ArgMatches) -> anyhow::Result<()> {
    let settings = SweepSettings::from_matches(args)?;
    print_heading("SITESWEEP URL VERIFICATION", &settings);

    let mut session = Session::open(&settings).await?;
    let outcome = run_verify(session.page(), &settings).await;
    session.close().await;
    let report = outcome?;

    write_url_verification_report(&settings.paths, &report)
        .context("could not write the URL verification report")?;
    println!("{}", generate_verification_summary(&report, &settings.paths));
    Ok(())
}

async fn run_verify(
    page: &mut dyn BrowserPage,
    settings: &SweepSettings,
) -> anyhow::Result<sitesweep_core::UrlVerificationReport> {
    let discovered = discover_with(page, settings, settings.use_cache).await?;
    let urls = checked_urls(&discovered)?;

    let progress = spinner(settings.quiet, &format!("Verifying {} pages...", urls.len()));
    let mut footer = FooterChecker::new(settings.timeouts.request)?;
    let options = VerifyOptions {
        base_url: settings.base_url.clone(),
        timeouts: settings.timeouts,
        screenshot_dir: settings
            .screenshots
            .then(|| settings.paths.url_screenshots_dir()),
    };
    let report = verify_pages(page, &urls, &options, &mut footer).await;
    if let Some(pb) = progress {
        pb.finish_with_message(format!("Verified {} pages", report.pages_checked.len()));
    }
    Ok(report)
}

pub async fn handle_mobile(args: &ArgMatches) -> anyhow::Result<()> {
    let settings = SweepSettings::from_matches(args)?;
    print_heading("SITESWEEP MOBILE RESPONSIVENESS", &settings);

    let mut session = Session::open(&settings).await?;
    let outcome = run_mobile(session.page(), &settings).await;
    session.close().await;
    let report = outcome?;

    write_mobile_report(&settings.paths, &report)
        .context("could not write the mobile report")?;
    println!("{}", generate_mobile_summary(&report, &settings.paths));
    Ok(())
}

async fn run_mobile(
    page: &mut dyn BrowserPage,
    settings: &SweepSettings,
) -> anyhow::Result<sitesweep_core::MobileReport> {
    let options = MobileOptions {
        timeouts: settings.timeouts,
        ..MobileOptions::new(settings.paths.reports_dir.clone())
    };

    // discovery runs on the phone viewport too
    page.emulate_device(&options.device).await?;
    let discovered = discover_with(page, settings, true).await?;
    let urls = checked_urls(&discovered)?;

    let progress = spinner(settings.quiet, &format!("Checking {} pages on mobile...", urls.len()));
    let report = check_mobile_pages(page, &urls, &options).await?;
    if let Some(pb) = progress {
        pb.finish_with_message(format!("Checked {} pages", report.mobile_checks.len()));
    }
    Ok(report)
}
