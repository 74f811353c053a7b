mod cli;
mod config;
mod credentials;
mod error;
mod image;
mod provider;
mod upsert;

use std::process::ExitCode;

use anyhow::Result;
use clap::Parser;
use log::debug;

use cli::{Cli, Command};
use credentials::EnvCredentials;

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    // Parse command line arguments
    let args = Cli::parse();

    match run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            let typed = e.downcast_ref::<error::Error>();
            eprintln!("Error: {:#}", e);
            if let Some(hint) = typed.and_then(|t| t.hint()) {
                eprintln!("Hint: {}", hint);
            }
            ExitCode::from(typed.map_or(1, |t| t.exit_code()))
        }
    }
}

async fn run(args: Cli) -> Result<()> {
    // Load configuration first (before logger init)
    let config = config::Config::load_or_default(args.config.as_deref())?;

    // Progress goes to stdout unless stdout carries JSON
    let target = match &args.command {
        Command::Dns(dns) if dns.json => env_logger::Target::Stderr,
        _ => env_logger::Target::Stdout,
    };

    // Initialize logger with config log level (env var takes precedence)
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(&config.log_level))
        .target(target)
        .format_timestamp(None)
        .format_target(false)
        .init();

    if let Some(path) = &args.config {
        debug!("Loaded configuration from: {}", path.display());
    }

    match args.command {
        Command::Dns(dns) => {
            let report = cli::run_dns(&dns, &config.cloudflare, &EnvCredentials).await?;
            if dns.json {
                cli::print_json(&report)?;
            } else {
                cli::print_report(&report);
            }
        }
        Command::Image(image) => {
            let saved = cli::run_image(&image, &config.image, &EnvCredentials).await?;
            println!("Image saved to: {}", saved.display());
        }
    }

    Ok(())
}
