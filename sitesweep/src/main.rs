use colored::Colorize;
use sitesweep::handlers::{handle_discover, handle_mobile, handle_verify};
use sitesweep::{command_argument_builder, init_logging};
use sitesweep_core::print_banner;

#[tokio::main]
async fn main() {
    let cmd = command_argument_builder();
    let chosen_command = cmd.get_matches();
    let quiet = chosen_command.get_flag("quiet");

    init_logging(chosen_command.get_flag("verbose"));

    // Show banner unless --quiet flag is set
    if !quiet {
        print_banner();
    }

    let outcome = match chosen_command.subcommand() {
        Some(("discover", primary_command)) => handle_discover(primary_command).await,
        Some(("verify", primary_command)) => handle_verify(primary_command).await,
        Some(("mobile", primary_command)) => handle_mobile(primary_command).await,
        None => return,
        _ => unreachable!("clap should ensure we don't get here"),
    };

    if let Err(e) = outcome {
        eprintln!("{} {:#}", "✗".red().bold(), e);
        std::process::exit(1);
    }
}
