// Include handlers module directly from handlers.rs
#[path = "handlers.rs"]
pub mod handlers;

#[path = "commands.rs"]
pub mod commands;

pub const CLAP_STYLING: clap::builder::styling::Styles = clap::builder::styling::Styles::styled()
    .header(clap_cargo::style::HEADER)
    .usage(clap_cargo::style::USAGE)
    .literal(clap_cargo::style::LITERAL)
    .placeholder(clap_cargo::style::PLACEHOLDER)
    .error(clap_cargo::style::ERROR)
    .valid(clap_cargo::style::VALID)
    .invalid(clap_cargo::style::INVALID);

// Re-export commonly used handler functions for convenience
pub use commands::command_argument_builder;
pub use handlers::{Engine, SweepSettings, expand_reports_dir, init_logging};
