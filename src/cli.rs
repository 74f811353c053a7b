use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use log::info;

use crate::config::{CloudflareConfig, ImageConfig};
use crate::credentials::CredentialSource;
use crate::error::Result;
use crate::image::{self, ImageClient};
use crate::provider::cloudflare::CloudflareClient;
use crate::upsert::{Outcome, UpsertReport, UpsertRequest, Upserter};

#[derive(Parser, Debug)]
#[command(name = "deploy-kit")]
#[command(about = "Deployment helpers: Cloudflare CNAME upserts and Gemini image generation")]
pub struct Cli {
    /// Path to an optional TOML configuration file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Create (or, with --force, update) a CNAME record <subdomain>.<domain> -> <target>
    Dns(DnsArgs),

    /// Generate an image from a text prompt and save it to a file
    Image(ImageArgs),
}

#[derive(Args, Debug)]
pub struct DnsArgs {
    /// Record label, e.g. "app"
    pub subdomain: String,
    /// Zone name, e.g. "example.com"
    pub domain: String,
    /// Hostname the record points to
    pub target: String,
    /// Route traffic through Cloudflare's proxy
    #[arg(long)]
    pub proxied: bool,
    /// Update the record if it already exists
    #[arg(long)]
    pub force: bool,
    /// Print the result as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Debug)]
pub struct ImageArgs {
    /// Text prompt for image generation
    pub prompt: String,
    /// Output file path
    pub output: PathBuf,
}

/// Validates the arguments and credential, then runs the upsert.
/// Nothing touches the network until both checks pass.
pub async fn run_dns(
    args: &DnsArgs,
    config: &CloudflareConfig,
    credentials: &dyn CredentialSource,
) -> Result<UpsertReport> {
    let request = UpsertRequest::new(&args.subdomain, &args.domain, &args.target)?
        .proxied(args.proxied)
        .force(args.force);
    let token = credentials.get(&config.token_env)?;

    let client = CloudflareClient::new(config, token)?;
    Upserter::new(client).upsert(&request).await
}

pub async fn run_image(
    args: &ImageArgs,
    config: &ImageConfig,
    credentials: &dyn CredentialSource,
) -> Result<PathBuf> {
    let prompt = image::validate_prompt(&args.prompt)?;
    let api_key = credentials.get(&config.key_env)?;

    println!("Generating image for: {}", image::preview(prompt));
    let client = ImageClient::new(config, api_key)?;
    let generated = client.generate(prompt).await?;
    info!(
        "Received {} bytes of {}",
        generated.bytes.len(),
        generated.mime_type
    );

    image::save(&generated, &args.output)
}

pub fn print_report(report: &UpsertReport) {
    match &report.outcome {
        Outcome::Created { record_id } => println!("Created CNAME record (id {})", record_id),
        Outcome::Updated {
            record_id,
            previous_content,
        } => println!(
            "Updated CNAME record (id {}), previously {}",
            record_id, previous_content
        ),
        Outcome::Skipped { existing_content } => {
            println!("Record already exists, pointing to {}", existing_content);
            println!("No changes made. Use --force to update it.");
        }
    }
    println!("  Name:    {}", report.name);
    println!("  Target:  {}", report.target);
    println!(
        "  Proxied: {}",
        if report.proxied { "yes" } else { "no (DNS only)" }
    );
}

pub fn print_json(report: &UpsertReport) -> anyhow::Result<()> {
    let json = serde_json::to_string_pretty(report)?;
    println!("{}", json);
    Ok(())
}
