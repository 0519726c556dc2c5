//! ocup - upgrade policy orchestration CLI for OpenShift managed clusters.
//!
//! Schedules cluster and node pool upgrades through the OCM clusters_mgmt API:
//! - Replaces stale upgrade policies
//! - Refuses to interfere with upgrades in flight
//! - Acknowledges version gates when the operator consents

use std::sync::Arc;

use anyhow::Result;
use chrono::Utc;
use clap::Parser;
use colored::Colorize;
use tracing::{debug, error, warn};

use ocup::config::{Args, BUILD_DATE, COMMIT, Command, Config, LogFormat, VERSION};
use ocup::error::UpgradeError;
use ocup::ocm::{OcmClient, Target, UpgradeApi};
use ocup::output;
use ocup::upgrade::{
    RemoteUpgradeReader, TargetVersion, UpgradeCheck, UpgradeCoordinator, UpgradeRequest,
    UpgradeTargetCatalog, validate_upgrade, version,
};

#[tokio::main]
async fn main() {
    let args = Args::parse();
    let config = match Config::from_args(args) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{e}");
            std::process::exit(1);
        }
    };

    // Initialize logging
    if let Err(e) = init_tracing(&config.log_level, config.log_format) {
        eprintln!("Failed to initialize logging: {e}");
        std::process::exit(1);
    }

    debug!(
        "Starting ocup v{} (commit: {}, build: {})",
        VERSION, COMMIT, BUILD_DATE
    );

    if let Err(e) = run(&config).await {
        error!("{}", e);
        std::process::exit(1);
    }
}

/// Initialize tracing subscriber. Logs go to stderr, results to stdout.
fn init_tracing(log_level: &str, format: LogFormat) -> Result<()> {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(log_level))
        .map_err(|e| anyhow::anyhow!("Failed to initialize log filter: {e}"))?;

    let builder = fmt().with_env_filter(filter).with_writer(std::io::stderr);
    match format {
        LogFormat::Json => builder.json().with_target(true).init(),
        LogFormat::Text => builder
            .with_target(false)
            .with_thread_ids(false)
            .with_file(false)
            .with_line_number(false)
            .init(),
    }

    Ok(())
}

/// Main application logic, abandoned on ctrl-c.
async fn run(config: &Config) -> Result<()> {
    config.validate()?;

    let client = OcmClient::new(
        &config.api_url,
        config.token.clone(),
        config.request_timeout,
    )?;
    let api: Arc<dyn UpgradeApi> = Arc::new(client);

    tokio::select! {
        result = execute(api, config) => result,
        _ = tokio::signal::ctrl_c() => {
            warn!("Interrupted; changes already applied remotely are kept");
            Err(anyhow::anyhow!("interrupted"))
        }
    }
}

async fn execute(api: Arc<dyn UpgradeApi>, config: &Config) -> Result<()> {
    match &config.command {
        Command::Upgrade {
            target,
            target_version,
            channel_group,
            ack_for,
            dry_run,
        } => {
            let desired = TargetVersion::parse(target_version, channel_group.as_deref())?;
            let request = UpgradeRequest {
                target: target.target(),
                desired,
                acknowledge_for: ack_for.clone(),
            };
            run_upgrade(api, config.page_size, request, *dry_run).await
        }
        Command::Gates {
            target,
            target_version,
        } => {
            let target = target.target();
            let desired = TargetVersion::parse(target_version, None)?;
            let coordinator = UpgradeCoordinator::new(api, config.page_size);
            let description = coordinator.explain_gates(&target, &desired).await?;
            output::print_gates(&target, &desired, description.as_deref());
            Ok(())
        }
        Command::Versions { target } => {
            let target = target.target();
            let current = current_version(api.as_ref(), &target).await?;
            let upgrades = UpgradeTargetCatalog::new(api)
                .available_upgrades(&current)
                .await?;
            let candidates = upgrades.collect().await?;
            output::print_versions(upgrades.installed(), &candidates);
            Ok(())
        }
        Command::Policies { target } => {
            let target = target.target();
            let reader = RemoteUpgradeReader::new(api, config.page_size);
            let upgrades = reader.scheduled_upgrades(&target).await?;
            output::print_policies(&target, &upgrades);
            Ok(())
        }
    }
}

/// Validate the request against the catalog, then plan or reconcile.
async fn run_upgrade(
    api: Arc<dyn UpgradeApi>,
    page_size: u32,
    request: UpgradeRequest,
    dry_run: bool,
) -> Result<()> {
    let target = &request.target;
    let desired = &request.desired;
    version::check_supported(desired.raw_id())?;

    let current = current_version(api.as_ref(), target).await?;
    let catalog = UpgradeTargetCatalog::new(Arc::clone(&api));
    if validate_upgrade(&catalog, &current, desired).await? == UpgradeCheck::UpToDate {
        println!(
            "{} {} already runs {}",
            "✓".green(),
            target,
            desired.to_string().bold()
        );
        return Ok(());
    }

    let coordinator = UpgradeCoordinator::new(api, page_size);
    let now = Utc::now();

    if dry_run {
        let plan = coordinator.plan(target, desired, now).await?;
        output::print_plan(target, desired, &plan);
        if !plan.is_satisfied() {
            let description = coordinator.explain_gates(target, desired).await?;
            if description.is_some() {
                output::print_gates(target, desired, description.as_deref());
            }
        }
        return Ok(());
    }

    let outcome = coordinator.reconcile(&request, now).await?;
    output::print_outcome(target, desired, &outcome);
    Ok(())
}

async fn current_version(api: &dyn UpgradeApi, target: &Target) -> Result<String, UpgradeError> {
    api.current_version(target)
        .await
        .map_err(|e| UpgradeError::remote("get current version", target, &e))
}
