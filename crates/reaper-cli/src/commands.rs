use std::path::{Path, PathBuf};
use std::sync::Arc;

use futures::StreamExt;
use reaper_cli::config::{self, ReaperConfig};
use reaper_cli::output;
use reaper_connect::{
    ConnectProvider, CredentialSource, build_sdk_config, list_instances, validate_credentials,
};
use reaper_core::{ResourceRef, regions};
use reaper_engine::{Reaper, RunHandle};
use reaper_ledger::{FileLedger, OutcomeLedger, RunId, RunState};

use crate::Format;

/// Load the config file, falling back to defaults when there is none,
/// and apply a `--region` override.
fn load(config_path: &Path, region: Option<&str>) -> eyre::Result<ReaperConfig> {
    let mut config = match config::load_config(config_path)? {
        Some(config) => config,
        None => {
            tracing::info!(path = %config_path.display(), "no config file, using defaults");
            ReaperConfig::new(regions::DEFAULT_REGION)?
        }
    };
    if let Some(region) = region {
        config.region = region.to_string();
    }
    config.validate()?;
    Ok(config)
}

/// Resolve credentials, record who we are, and open the run ledger.
async fn connect(config: &ReaperConfig) -> eyre::Result<Reaper> {
    let sdk_config = build_sdk_config(&config.region, &config.credentials).await;
    let identity = validate_credentials(&sdk_config).await?;
    tracing::info!(
        account_id = %identity.account_id,
        arn = %identity.arn,
        credentials = %config.credentials.describe(),
        region = %config.region,
        "credentials validated"
    );

    let provider = ConnectProvider::new(&sdk_config).with_caller(identity.arn);
    let ledger = FileLedger::new(config.ledger_dir.clone());
    Ok(Reaper::new(Arc::new(provider), Arc::new(ledger)).await?)
}

pub async fn init(
    config_path: &Path,
    region: Option<&str>,
    profile: Option<String>,
    ledger_dir: Option<PathBuf>,
    force: bool,
) -> eyre::Result<()> {
    if config_path.exists() && !force {
        return Err(eyre::eyre!(
            "config already exists at {} (use --force to replace it)",
            config_path.display()
        ));
    }

    let mut config = ReaperConfig::new(region.unwrap_or(regions::DEFAULT_REGION))?;
    if let Some(profile_name) = profile {
        config.credentials = CredentialSource::Profile { profile_name };
    }
    if let Some(dir) = ledger_dir {
        config.ledger_dir = dir;
    }
    config.validate()?;

    let sdk_config = build_sdk_config(&config.region, &config.credentials).await;
    let identity = validate_credentials(&sdk_config).await?;

    config::save_config(config_path, &config)?;
    println!("wrote {}", config_path.display());
    println!("  account {} as {}", identity.account_id, identity.arn);
    println!("  credentials: {}", config.credentials.describe());
    println!("  ledger: {}", config.ledger_dir.display());
    Ok(())
}

pub async fn instances(
    config_path: &Path,
    region: Option<&str>,
    requested: Vec<String>,
    all_regions: bool,
) -> eyre::Result<()> {
    let config = load(config_path, region)?;
    let region_codes: Vec<String> = if all_regions {
        regions::CONNECT_REGIONS
            .iter()
            .map(|(code, _)| code.to_string())
            .collect()
    } else if requested.is_empty() {
        vec![config.region.clone()]
    } else {
        requested
    };

    let found = list_instances(&region_codes, &config.credentials).await?;
    if found.is_empty() {
        println!("No Connect instances found.");
        return Ok(());
    }
    for instance in &found {
        println!("{}", instance.display_name());
    }
    Ok(())
}

pub async fn plan(
    config_path: &Path,
    region: Option<&str>,
    targets: Vec<ResourceRef>,
    format: Format,
) -> eyre::Result<()> {
    let config = load(config_path, region)?;
    let reaper = connect(&config).await?;
    let plan = reaper.plan_deletion(targets).await?;

    match format {
        Format::Json => {
            let json = serde_json::json!({
                "run_id": plan.run_id(),
                "plan": plan.to_snapshot(),
            });
            println!("{}", serde_json::to_string_pretty(&json)?);
        }
        Format::Text => {
            print!("{}", output::render_plan(&plan));
            print!("{}", output::render_required_actions());
        }
    }
    Ok(())
}

pub async fn run(
    config_path: &Path,
    region: Option<&str>,
    targets: Vec<ResourceRef>,
    dry_run: bool,
) -> eyre::Result<()> {
    let config = load(config_path, region)?;
    let reaper = connect(&config).await?;
    let plan = reaper.plan_deletion(targets).await?;
    print!("{}", output::render_plan(&plan));

    if dry_run {
        println!("dry run: nothing was deleted");
        return Ok(());
    }

    let handle = reaper.execute_plan(plan, config.executor.clone()).await?;
    drive(&reaper, handle).await
}

pub async fn resume(config_path: &Path, region: Option<&str>, run_id: RunId) -> eyre::Result<()> {
    let config = load(config_path, region)?;
    let reaper = connect(&config).await?;
    let handle = reaper.resume(run_id, config.executor.clone()).await?;
    drive(&reaper, handle).await
}

pub async fn summary(
    config_path: &Path,
    region: Option<&str>,
    run_id: RunId,
    format: Format,
) -> eyre::Result<()> {
    let config = load(config_path, region)?;
    let ledger = FileLedger::new(config.ledger_dir.clone());
    let summary = ledger.summarize(run_id).await?;
    if summary.state.is_none() && summary.total() == 0 {
        return Err(eyre::eyre!(
            "run {run_id} not found in {}",
            config.ledger_dir.display()
        ));
    }

    match format {
        Format::Json => println!("{}", serde_json::to_string_pretty(&summary)?),
        Format::Text => print!("{}", output::render_summary(&summary)),
    }
    Ok(())
}

/// Print progress until the run ends, cancelling on Ctrl-C.
async fn drive(reaper: &Reaper, handle: RunHandle) -> eyre::Result<()> {
    let run_id = handle.run_id();
    let cancel = handle.cancel_token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!(run_id = %run_id, "interrupted, letting in-flight deletes finish");
            cancel.cancel();
        }
    });

    let mut progress = handle.progress();
    while let Some(change) = progress.next().await {
        println!("{}", output::render_change(&change));
    }

    let outcome = handle.wait().await?;
    let summary = reaper.summary(run_id).await?;
    print!("{}", output::render_summary(&summary));
    if let Some(detail) = &outcome.detail {
        println!("  {detail}");
    }

    match outcome.state {
        RunState::Completed if summary.failed == 0 => Ok(()),
        RunState::Completed => Err(eyre::eyre!(
            "run {run_id} finished with {} failed and {} skipped resources",
            summary.failed,
            summary.skipped
        )),
        state => Err(eyre::eyre!(
            "run {run_id} {state}; continue with `reaper resume {run_id}`"
        )),
    }
}
