//! Command-line argument definitions.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "formbind",
    version,
    about = "Validate and submit configured forms from the command line"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// JSON configuration file layered over the built-in defaults.
    #[arg(long, value_name = "PATH", env = "FORMBIND_CONFIG", global = true)]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Command {
    /// List the registered form keys and their selectors.
    Forms,

    /// Run client-side validation for a form against a JSON record.
    Validate(RecordArgs),

    /// Validate, then submit a JSON record through the configured API.
    Submit(SubmitArgs),
}

#[derive(Parser)]
pub struct RecordArgs {
    /// Form key, e.g. LOGIN.
    #[arg(value_name = "FORM")]
    pub form: String,

    /// Field values as a JSON object.
    #[arg(long, value_name = "JSON", default_value = "{}")]
    pub data: String,
}

#[derive(Parser)]
pub struct SubmitArgs {
    #[command(flatten)]
    pub record: RecordArgs,

    /// Bearer token stored under the configured token name.
    #[arg(long, value_name = "TOKEN", env = "FORMBIND_TOKEN")]
    pub token: Option<String>,

    /// Cookie header used for CSRF detection.
    #[arg(long, value_name = "HEADER", default_value = "")]
    pub cookie: String,

    /// Wait for a scheduled redirect before exiting.
    #[arg(long)]
    pub follow_redirects: bool,
}
