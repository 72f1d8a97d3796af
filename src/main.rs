// ABOUTME: Entry point for the revlink CLI application.
// ABOUTME: Drives the lifecycle per run: configure, fetch-revisions, upload, activate, teardown.

mod cli;

use clap::Parser;
use cli::{Cli, Commands};
use revlink::config::{self, Config};
use revlink::deploy::{Deployer, RunContext};
use revlink::diagnostics::{Diagnostics, Warning};
use revlink::error::{Error, Result};
use revlink::output::{Output, OutputMode};
use revlink::ssh::Session;
use revlink::types::RevisionKey;
use std::env;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Initialize tracing subscriber based on verbose flag
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("warn")
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .init();

    let mode = if cli.json {
        OutputMode::Json
    } else if cli.quiet {
        OutputMode::Quiet
    } else {
        OutputMode::Normal
    };
    let mut output = Output::new(mode);

    let result = run(cli, &mut output).await;

    if let Err(e) = result {
        output.error(&e.to_string());
        std::process::exit(1);
    }
}

async fn run(cli: Cli, output: &mut Output) -> Result<()> {
    match cli.command {
        Commands::Init { app, host, force } => {
            let cwd = env::current_dir()?;
            config::init_config(&cwd, app.as_deref(), host.as_deref(), force)?;
            output.success(&format!("Wrote {}", config::CONFIG_FILENAME));
            Ok(())
        }
        Commands::Deploy {
            revision,
            dist_dir,
            activate,
        } => {
            let config = Config::discover(&env::current_dir()?)?;
            let revision = RevisionKey::new(&revision)?;
            deploy(&config, revision, dist_dir, activate, output).await
        }
        Commands::Activate { revision } => {
            let config = Config::discover(&env::current_dir()?)?;
            let revision = RevisionKey::new(&revision)?;
            activate(&config, revision, output).await
        }
        Commands::Revisions => {
            let config = Config::discover(&env::current_dir()?)?;
            list_revisions(&config, output).await
        }
    }
}

/// Configure phase: open the one transport session for this run.
async fn connect(config: &Config, output: &Output) -> Result<Deployer<Session>> {
    output.progress(&format!(
        "Connecting to {}:{} as {}...",
        config.host, config.port, config.username
    ));
    let session = Session::connect(config.session_config()?).await?;
    Ok(Deployer::new(config, session))
}

/// Teardown is attempted exactly once per connected run, after success and
/// failure alike; its own failure becomes a warning so it cannot mask an
/// earlier phase error.
async fn teardown(deployer: &mut Deployer<Session>, diagnostics: &mut Diagnostics) {
    if let Err(e) = deployer.teardown().await {
        diagnostics.warn(Warning::ssh_disconnect(e.to_string()));
    }
}

/// Upload a revision, optionally activating it afterwards.
async fn deploy(
    config: &Config,
    revision: RevisionKey,
    dist_dir: PathBuf,
    and_activate: bool,
    output: &mut Output,
) -> Result<()> {
    output.start_timer();
    let mut deployer = connect(config, output).await?;
    let mut ctx = RunContext::new(revision).with_dist_dir(dist_dir);
    let mut diagnostics = Diagnostics::default();

    let result = deploy_phases(&deployer, &mut ctx, and_activate, output, &mut diagnostics).await;

    teardown(&mut deployer, &mut diagnostics).await;
    for warning in diagnostics.warnings() {
        output.warning(&warning.message);
    }
    result?;

    match ctx.activated_revision {
        Some(ref active) => output.success(&format!("Deployed and activated revision {active}")),
        None => output.success(&format!("Uploaded revision {}", ctx.revision_key)),
    }
    Ok(())
}

async fn deploy_phases(
    deployer: &Deployer<Session>,
    ctx: &mut RunContext,
    and_activate: bool,
    output: &Output,
    diagnostics: &mut Diagnostics,
) -> Result<()> {
    deployer.fetch_revisions(ctx).await?;
    output.progress(&format!("{} revision(s) on remote", ctx.revisions.len()));

    output.progress(&format!("Uploading revision {} ...", ctx.revision_key));
    if let Err(e) = deployer.upload(ctx).await {
        // Successfully transferred files and the manifest entry stay in
        // place; there is no rollback.
        diagnostics.warn(Warning::partial_revision(format!(
            "revision directory {} may be incomplete on the remote host",
            deployer.layout().revision_dir(&ctx.revision_key)
        )));
        return Err(e.into());
    }

    if and_activate {
        output.progress(&format!("Activating revision {} ...", ctx.revision_key));
        deployer.activate(ctx).await?;
    }
    Ok(())
}

/// Make a previously uploaded revision live.
async fn activate(config: &Config, revision: RevisionKey, output: &mut Output) -> Result<()> {
    output.start_timer();
    let mut deployer = connect(config, output).await?;
    let mut ctx = RunContext::new(revision);
    let mut diagnostics = Diagnostics::default();

    output.progress(&format!("Activating revision {} ...", ctx.revision_key));
    let result = deployer.activate(&mut ctx).await;

    teardown(&mut deployer, &mut diagnostics).await;
    for warning in diagnostics.warnings() {
        output.warning(&warning.message);
    }
    result?;

    output.success(&format!("Activated revision {}", ctx.revision_key));
    Ok(())
}

/// Print the manifest, newest first, with the active revision marked.
async fn list_revisions(config: &Config, output: &mut Output) -> Result<()> {
    let mut deployer = connect(config, output).await?;
    let mut diagnostics = Diagnostics::default();

    let result = deployer.manifest().await;

    teardown(&mut deployer, &mut diagnostics).await;
    for warning in diagnostics.warnings() {
        output.warning(&warning.message);
    }
    let manifest = result.map_err(Error::from)?;

    if manifest.is_empty() {
        output.progress("No revisions deployed yet");
        return Ok(());
    }

    for record in &manifest {
        let marker = if record.is_active() { "*" } else { " " };
        let when = chrono::DateTime::from_timestamp_millis(record.timestamp)
            .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
            .unwrap_or_else(|| "-".to_string());
        println!("{} {}  {}  {}", marker, record.revision, when, record.deployer);
    }
    Ok(())
}
