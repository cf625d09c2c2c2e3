// Entrypoint for the CLI application.
// - Keeps `main` small: parse arguments, build the config and hand the work
//   to `pipeline`.
// - Returns `anyhow::Result` so any fatal error exits non-zero with context.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;

use multislot_upload::api::DarwinClient;
use multislot_upload::config::{validate_api_key, SlotArg, UploadConfig};
use multislot_upload::pipeline::{upload_all, Plan};
use multislot_upload::ui::{confirm_upload, print_plan, print_summary, TerminalObserver};

/// Register files from several local folders as multi-slot items in a
/// dataset and upload them. Files are paired across folders by their
/// natural-sort position.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// API key for authentication with the dataset service
    api_key: String,
    /// Team slug
    team_slug: String,
    /// Dataset slug
    dataset_slug: String,

    /// JSON config file (defaults to <config dir>/multislot-upload/config.json)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Slot and source folder as NAME=FOLDER; repeat once per slot, in order.
    /// Replaces the slots from the config file.
    #[arg(long = "slot", value_name = "NAME=FOLDER")]
    slots: Vec<SlotArg>,

    /// Label sent when confirming each upload
    #[arg(long)]
    batch_name: Option<String>,

    /// Dataset path the items are registered under
    #[arg(long)]
    item_path: Option<String>,

    /// Extra attempts for transient HTTP failures
    #[arg(long)]
    retries: Option<u32>,

    /// Print the registration payload and exit without sending anything
    #[arg(long)]
    dry_run: bool,

    /// Do not ask for confirmation
    #[arg(short, long)]
    yes: bool,

    /// Exit with an error if any file failed to upload
    #[arg(long)]
    strict: bool,
}

fn build_config(cli: &Cli) -> Result<UploadConfig> {
    let mut config = match (&cli.config, UploadConfig::default_path()) {
        (Some(path), _) => UploadConfig::load(path, true)?,
        (None, Some(path)) => UploadConfig::load(&path, false)?,
        (None, None) => UploadConfig::default(),
    };
    config.apply_env();
    if !cli.slots.is_empty() {
        config.set_slots(&cli.slots);
    }
    if let Some(name) = &cli.batch_name {
        config.batch_name = name.clone();
    }
    if let Some(path) = &cli.item_path {
        config.item_path = path.clone();
    }
    if let Some(retries) = cli.retries {
        config.retry.max_retries = retries;
    }
    config.validate()?;
    Ok(config)
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "multislot_upload=info".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    // Nothing touches the filesystem or network before the key shape is checked.
    validate_api_key(&cli.api_key)?;
    let config = build_config(&cli).context("Invalid configuration")?;
    let plan = Plan::prepare(&config).context("Failed to read source folders")?;

    if cli.dry_run {
        print_plan(&plan, &cli.dataset_slug)?;
        return Ok(());
    }
    if !confirm_upload(&plan, &cli.dataset_slug, cli.yes)? {
        println!("Aborted, nothing was registered.");
        return Ok(());
    }

    let client = DarwinClient::new(&config, &cli.api_key, &cli.team_slug)?;
    let mut observer = TerminalObserver::new();
    let report = upload_all(&client, &config, &cli.dataset_slug, &plan, &mut observer)
        .context("Upload run aborted")?;
    print_summary(&report);
    info!(
        "Run finished: {} uploaded, {} failed",
        report.succeeded.len(),
        report.failed.len()
    );

    if cli.strict && !report.failed.is_empty() {
        anyhow::bail!("{} of {} uploads failed", report.failed.len(), report.total());
    }
    Ok(())
}
