mod cli;
mod config;
mod error;
mod imap;
mod logging;
mod prune;
mod sequence;
mod store;

use std::{path::PathBuf, process::ExitCode};

use anyhow::Result;
use clap::Parser;
use config::Config;

/// Deletes unwanted mail from IMAP folders: whole folders like spam and trash, or only the
/// messages of listed senders.
#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// Configuration file [default: $XDG_CONFIG_HOME/imapprune/config.toml]
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Only process this account
    #[arg(short, long)]
    account: Option<String>,

    /// Really delete. Without this nothing on the server is changed
    #[arg(long)]
    permanent: bool,

    /// Stop at the first failing rule instead of carrying on with the next
    #[arg(long)]
    halt_on_error: bool,
}

fn main() -> Result<ExitCode> {
    logging::init();
    let args = Args::parse();

    let config = Config::load_from_file(args.config.clone())?;
    if cli::run(&args, &config)? {
        Ok(ExitCode::SUCCESS)
    } else {
        Ok(ExitCode::FAILURE)
    }
}
