use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use eyre::Result;
use reaper_core::ResourceRef;
use reaper_ledger::RunId;
use tracing_subscriber::EnvFilter;

mod commands;

#[derive(Parser, Debug)]
#[command(name = "reaper")]
#[command(about = "Dependency-aware bulk deletion of Amazon Connect resources")]
#[command(version)]
struct Args {
    /// Config file (default: <config dir>/reaper/reaper.json)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Override the configured AWS region
    #[arg(long, global = true)]
    region: Option<String>,

    /// Emit logs as JSON lines on stderr
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Format {
    Text,
    Json,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Write a config file and check the credentials it names
    Init {
        /// Use a named AWS profile instead of the default chain
        #[arg(long)]
        profile: Option<String>,

        /// Where run ledgers are kept
        #[arg(long)]
        ledger_dir: Option<PathBuf>,

        /// Replace an existing config file
        #[arg(long)]
        force: bool,
    },

    /// List Connect instances reachable with the configured credentials
    Instances {
        /// Comma-separated regions (default: the configured region)
        #[arg(long, value_delimiter = ',')]
        regions: Vec<String>,

        /// Query every region that offers Amazon Connect
        #[arg(long, conflicts_with = "regions")]
        all_regions: bool,
    },

    /// Discover dependents and print the deletion plan without deleting
    Plan {
        /// Targets as kind:instance_id/id, or instance:id
        #[arg(required = true)]
        targets: Vec<ResourceRef>,

        #[arg(long, value_enum, default_value_t = Format::Text)]
        format: Format,
    },

    /// Plan and delete the targets and everything that depends on them
    Run {
        /// Targets as kind:instance_id/id, or instance:id
        #[arg(required = true)]
        targets: Vec<ResourceRef>,

        /// Print the plan and stop
        #[arg(long)]
        dry_run: bool,
    },

    /// Continue a cancelled or interrupted run from its ledger
    Resume { run_id: RunId },

    /// Show the recorded outcome of a run
    Summary {
        run_id: RunId,

        #[arg(long, value_enum, default_value_t = Format::Text)]
        format: Format,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    let args = Args::parse();
    init_tracing(args.json);

    let config_path = match &args.config {
        Some(path) => path.clone(),
        None => reaper_cli::config::default_config_path()?,
    };
    let region = args.region.as_deref();

    match args.command {
        Command::Init {
            profile,
            ledger_dir,
            force,
        } => commands::init(&config_path, region, profile, ledger_dir, force).await,
        Command::Instances {
            regions,
            all_regions,
        } => commands::instances(&config_path, region, regions, all_regions).await,
        Command::Plan { targets, format } => {
            commands::plan(&config_path, region, targets, format).await
        }
        Command::Run { targets, dry_run } => {
            commands::run(&config_path, region, targets, dry_run).await
        }
        Command::Resume { run_id } => commands::resume(&config_path, region, run_id).await,
        Command::Summary { run_id, format } => {
            commands::summary(&config_path, region, run_id, format).await
        }
    }
}

/// Logs go to stderr so plans and summaries on stdout stay parseable.
fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}
