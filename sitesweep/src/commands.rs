use crate::CLAP_STYLING;
use clap::{ArgAction, arg, command};
use url::Url;

pub const DEFAULT_URL: &str = "https://falaya.com";
pub const DEFAULT_REPORTS_DIR: &str = "reports";

/// Flags every sweep subcommand shares.
fn sweep_args(cmd: clap::Command) -> clap::Command {
    cmd.arg(
        arg!(-u --"url" <URL>)
            .required(false)
            .help("Root URL of the site to sweep")
            .value_parser(clap::value_parser!(Url))
            .default_value(DEFAULT_URL),
    )
    .arg(
        arg!(--"reports-dir" <PATH>)
            .required(false)
            .help("Directory for the discovery cache, reports and screenshots")
            .default_value(DEFAULT_REPORTS_DIR),
    )
    .arg(
        arg!(--"engine" <ENGINE>)
            .required(false)
            .help("Browser provider: headless Chrome, or plain HTTP fetches")
            .value_parser(["chromium", "static"])
            .default_value("chromium"),
    )
    .arg(
        arg!(--"headful" "Show the Chrome window instead of running headless")
            .action(ArgAction::SetTrue),
    )
}

/// `mobile` always reuses the cache, so only these two take the flag.
fn use_cache_arg() -> clap::Arg {
    arg!(--"use-cache" "Reuse discovered-urls.json when it exists instead of crawling")
        .action(ArgAction::SetTrue)
}

pub fn command_argument_builder() -> clap::Command {
    clap::Command::new("sitesweep")
        .version(env!("CARGO_PKG_VERSION"))
        .bin_name("sitesweep")
        .styles(CLAP_STYLING)
        .arg(
            arg!(-q --"quiet" "Suppress banner and progress spinners")
                .required(false)
                .global(true),
        )
        .arg(
            arg!(-v --"verbose" "Log debug output to stderr")
                .required(false)
                .global(true),
        )
        .subcommand_required(false)
        .subcommand(
            sweep_args(
                command!("discover")
                    .about("Discover navigation URLs, section links and account links, then cache them"),
            )
            .arg(use_cache_arg()),
        )
        .subcommand(
            sweep_args(
                command!("verify")
                    .about("Load every discovered page, judge it, and check its footer links"),
            )
            .arg(use_cache_arg())
            .arg(
                arg!(--"no-screenshots" "Skip per-page screenshots")
                    .action(ArgAction::SetTrue),
            ),
        )
        .subcommand(sweep_args(
            command!("mobile").about(
                "Check every discovered page on a phone viewport, including the hamburger menu. \
                 Reuses discovered-urls.json when present",
            ),
        ))
}
