//! Agentdeck - deploy agents and MCP servers from a registry catalog
//!
//! Usage:
//!   agentdeck render --request deploy.toml --catalog catalog.json
//!   agentdeck deploy --runtime local ...    # write files, compose up
//!   agentdeck deploy --runtime cluster ...  # write cluster manifests
//!   agentdeck ps | logs | down
//!   agentdeck config show | init

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use console::style;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use agentdeck_core::config::{EngineConfig, to_toml};
use agentdeck_core::context::EngineContext;
use agentdeck_core::desired::DeploymentRequest;
use agentdeck_core::error::ReconcileError;
use agentdeck_core::reconcile::{ReconcileReport, ServiceStatus};
use agentdeck_core::registry::FileCatalog;
use agentdeck_core::runtime::{AiRuntimeConfig, RuntimeTarget};
use agentdeck_core::runtime::local::{COMPOSE_FILE_NAME, GATEWAY_CONFIG_DIR, GATEWAY_CONFIG_FILE};

#[derive(Parser)]
#[command(name = "agentdeck")]
#[command(about = "Deploy agents and MCP servers locally or to a cluster", long_about = None)]
struct Cli {
    /// Path to agentdeck.toml (defaults to the user config directory)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the runtime documents for a deployment request without applying them
    Render {
        #[command(flatten)]
        input: InputArgs,
    },

    /// Apply a deployment request
    ///
    /// - local: write the compose and gateway documents, then `compose up`
    /// - cluster: write the custom resources as multi-document YAML
    Deploy {
        #[command(flatten)]
        input: InputArgs,

        /// Output file for cluster manifests (stdout when omitted)
        #[arg(long)]
        out: Option<PathBuf>,

        /// Output format
        #[arg(short, long, default_value = "table")]
        format: OutputFormat,
    },

    /// Stop and remove the local deployment
    Down,

    /// Show the state of local services
    Ps {
        /// Output format
        #[arg(short, long, default_value = "table")]
        format: OutputFormat,
    },

    /// Show logs from local services
    Logs {
        /// Only show logs for this service
        service: Option<String>,

        /// Number of lines from the end of the logs
        #[arg(long)]
        tail: Option<usize>,
    },

    /// Manage agentdeck.toml
    #[command(subcommand)]
    Config(ConfigCommand),
}

#[derive(clap::Args)]
struct InputArgs {
    /// Target runtime
    #[arg(short, long, default_value = "local")]
    runtime: RuntimeArg,

    /// Deployment request (TOML)
    #[arg(long, default_value = "deploy.toml")]
    request: PathBuf,

    /// Registry catalog export (JSON)
    #[arg(long, default_value = "catalog.json")]
    catalog: PathBuf,
}

#[derive(Subcommand)]
enum ConfigCommand {
    /// Print the effective configuration
    Show,

    /// Write a default configuration file
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum RuntimeArg {
    Local,
    Cluster,
}

impl From<RuntimeArg> for RuntimeTarget {
    fn from(arg: RuntimeArg) -> Self {
        match arg {
            RuntimeArg::Local => RuntimeTarget::Local,
            RuntimeArg::Cluster => RuntimeTarget::Cluster,
        }
    }
}

#[derive(Clone, Copy, ValueEnum, Default)]
enum OutputFormat {
    /// Human-readable table
    #[default]
    Table,
    /// Machine-readable JSON
    Json,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "agentdeck=info,agentdeck_core=info,warn".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let ctx = EngineContext::load(cli.config)?;
    tracing::debug!(
        config = %ctx.config_path().display(),
        working_dir = %ctx.working_dir().display(),
        "Loaded engine context"
    );

    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            trigger.cancel();
        }
    });

    let result = match cli.command {
        Commands::Render { input } => run_render(&ctx, &input),
        Commands::Deploy { input, out, format } => {
            run_deploy(&ctx, &input, out.as_deref(), format, &cancel).await
        }
        Commands::Down => run_down(&ctx, &cancel).await,
        Commands::Ps { format } => run_ps(&ctx, format, &cancel).await,
        Commands::Logs { service, tail } => run_logs(&ctx, service.as_deref(), tail, &cancel).await,
        Commands::Config(command) => run_config(&ctx, command),
    };

    if let Err(err) = &result
        && err
            .downcast_ref::<ReconcileError>()
            .is_some_and(ReconcileError::is_cancelled)
    {
        eprintln!("{} Cancelled", style("✗").red());
        std::process::exit(130);
    }

    result
}

fn load_inputs(input: &InputArgs) -> Result<(FileCatalog, DeploymentRequest)> {
    let catalog = FileCatalog::load(&input.catalog)?;
    let request = DeploymentRequest::load(&input.request)?;
    Ok((catalog, request))
}

fn run_render(ctx: &EngineContext, input: &InputArgs) -> Result<()> {
    let (catalog, request) = load_inputs(input)?;
    let (_, runtime) = ctx.render(&catalog, &request, input.runtime.into())?;

    match runtime {
        AiRuntimeConfig::Local(local) => {
            println!("# {}", COMPOSE_FILE_NAME);
            print!("{}", local.compose.to_yaml()?);
            println!("---");
            println!("# {}/{}", GATEWAY_CONFIG_DIR, GATEWAY_CONFIG_FILE);
            print!("{}", local.gateway.to_yaml()?);
        }
        AiRuntimeConfig::Cluster(manifests) => {
            print!("{}", manifests.to_yaml()?);
        }
    }
    Ok(())
}

async fn run_deploy(
    ctx: &EngineContext,
    input: &InputArgs,
    out: Option<&Path>,
    format: OutputFormat,
    cancel: &CancellationToken,
) -> Result<()> {
    let (catalog, request) = load_inputs(input)?;
    let (desired, runtime) = ctx.render(&catalog, &request, input.runtime.into())?;

    match &runtime {
        AiRuntimeConfig::Local(_) => {
            let report = ctx.reconciler().reconcile(&desired, &runtime, cancel).await?;
            print_report(&report, format)
        }
        AiRuntimeConfig::Cluster(manifests) => {
            let yaml = manifests.to_yaml()?;
            match out {
                Some(path) => {
                    tokio::fs::write(path, &yaml)
                        .await
                        .with_context(|| format!("Failed to write manifests: {}", path.display()))?;
                    println!(
                        "{} Wrote {} resources to {}",
                        style("✓").green(),
                        manifests.len(),
                        path.display()
                    );
                }
                None => print!("{}", yaml),
            }
            Ok(())
        }
    }
}

fn print_report(report: &ReconcileReport, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Table => {
            println!(
                "{} Deployed {} services in {}",
                style("✓").green(),
                report.services.len(),
                report.working_dir.display()
            );
            for service in &report.services {
                println!("  • {}", service);
            }
            println!("  compose  {}", &report.compose_digest[..12.min(report.compose_digest.len())]);
            println!("  gateway  {}", &report.gateway_digest[..12.min(report.gateway_digest.len())]);
            for warning in &report.warnings {
                println!("  {} {}", style("⚠").yellow(), warning);
            }
        }
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(report)?);
        }
    }
    Ok(())
}

async fn run_down(ctx: &EngineContext, cancel: &CancellationToken) -> Result<()> {
    let output = ctx.reconciler().down(cancel).await?;
    let combined = output.combined();
    if !combined.is_empty() {
        println!("{}", combined);
    }
    println!("{} Stopped services in {}", style("✓").green(), ctx.working_dir().display());
    Ok(())
}

async fn run_ps(ctx: &EngineContext, format: OutputFormat, cancel: &CancellationToken) -> Result<()> {
    let statuses = ctx.reconciler().ps(cancel).await?;

    match format {
        OutputFormat::Table => {
            if statuses.is_empty() {
                println!("No services running in {}", ctx.working_dir().display());
            }
            let width = statuses.iter().map(|s| s.service.len()).max().unwrap_or(0);
            for status in &statuses {
                println!("{:width$}  {}", status.service, styled_state(status), width = width);
            }
        }
        OutputFormat::Json => {
            let output: Vec<_> = statuses
                .iter()
                .map(|s| {
                    serde_json::json!({
                        "service": s.service,
                        "state": s.state,
                        "health": s.health,
                        "ready": s.is_ready(),
                    })
                })
                .collect();
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
    }
    Ok(())
}

fn styled_state(status: &ServiceStatus) -> String {
    let label = if status.health.is_empty() {
        status.state.clone()
    } else {
        format!("{} ({})", status.state, status.health)
    };
    if status.is_ready() {
        style(label).green().to_string()
    } else {
        style(label).yellow().to_string()
    }
}

async fn run_logs(
    ctx: &EngineContext,
    service: Option<&str>,
    tail: Option<usize>,
    cancel: &CancellationToken,
) -> Result<()> {
    let logs = ctx.reconciler().logs(service, tail, cancel).await?;
    println!("{}", logs);
    Ok(())
}

fn run_config(ctx: &EngineContext, command: ConfigCommand) -> Result<()> {
    match command {
        ConfigCommand::Show => {
            println!("# {}", ctx.config_path().display());
            println!("# working directory: {}", ctx.working_dir().display());
            print!("{}", to_toml(ctx.config())?);
        }
        ConfigCommand::Init { force } => {
            let path = ctx.config_path();
            if path.exists() && !force {
                anyhow::bail!(
                    "Config file already exists: {} (use --force to overwrite)",
                    path.display()
                );
            }
            ctx.config_store().save(&EngineConfig::default())?;
            println!("{} Wrote {}", style("✓").green(), path.display());
        }
    }
    Ok(())
}
