/// Tufin - k3s bootstrap and WordPress deployment
///
/// Installs a single-node k3s cluster, deploys WordPress backed by MySQL onto
/// it and reports pod status.
mod bootstrap;
mod cli;
mod config;
mod k8s;
mod utils;

use anyhow::{Context, Result};
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::bootstrap::ClusterBootstrap;
use crate::cli::{Cli, Commands, Invocation, NOT_FOUND, USAGE};
use crate::config::{FailurePolicy, Settings};
use crate::k8s::apply::{apply, deployment_plan};
use crate::k8s::manifest::render_manifest;
use crate::k8s::status::{report, OutputFormat};
use crate::k8s::KubernetesClient;

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let (cli, command) = match cli::parse_args(std::env::args_os()) {
        Invocation::Usage { exit_code } => {
            print!("{}", USAGE);
            std::process::exit(exit_code);
        }
        Invocation::NotFound => {
            println!("{}", NOT_FOUND);
            std::process::exit(1);
        }
        Invocation::Invalid(e) => e.exit(),
        Invocation::Run { cli, command } => (cli, command),
    };

    // Initialize tracing
    let log_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("tufin={}", log_level).into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    // Execute command
    let result = match command {
        Commands::Cluster => install_cluster(&cli).await,
        Commands::Deploy { skip_dependents } => deploy(&cli, skip_dependents).await,
        Commands::Status { output } => show_status(&cli, output).await,
        Commands::Manifest => print_manifest(),
    };

    if let Err(e) = result {
        error!("Error: {:#}", e);
        std::process::exit(1);
    }
}

fn load_settings(cli: &Cli) -> Result<Settings> {
    Settings::load(&cli.config).context("Failed to load configuration")
}

async fn connect(cli: &Cli, settings: &Settings) -> Result<KubernetesClient> {
    let home = dirs::home_dir();
    let access = settings.kube_access(cli.kubeconfig.as_deref(), home.as_deref());
    KubernetesClient::connect(&access)
        .await
        .context("Cannot reach the cluster")
}

/// Install k3s through the remote installer
async fn install_cluster(cli: &Cli) -> Result<()> {
    println!("Deploy k3s cluster");

    let settings = load_settings(cli)?;
    let bootstrap = ClusterBootstrap::new(settings.installer.clone());

    bootstrap
        .check_prerequisites()
        .await
        .context("Installer prerequisites missing")?;
    bootstrap.install().await?;

    info!("Next steps:");
    info!("  tufin deploy");
    info!("  tufin status");

    Ok(())
}

/// Create the WordPress and MySQL objects
async fn deploy(cli: &Cli, skip_dependents: bool) -> Result<()> {
    let settings = load_settings(cli)?;
    let policy = if skip_dependents {
        FailurePolicy::SkipDependents
    } else {
        settings.on_failure
    };

    let client = connect(cli, &settings).await?;

    let mut stdout = std::io::stdout().lock();
    apply(&client, deployment_plan(), policy, &mut stdout)
        .await
        .context("Failed to write deployment report")?;

    Ok(())
}

/// Show pod status in the default namespace
async fn show_status(cli: &Cli, output: OutputFormat) -> Result<()> {
    let settings = load_settings(cli)?;
    let client = connect(cli, &settings).await?;

    let mut stdout = std::io::stdout().lock();
    let rows = report(&client, output, &mut stdout).await?;
    info!("{} pods", rows);

    Ok(())
}

/// Print the deployment as a multi-document manifest
fn print_manifest() -> Result<()> {
    let manifest = render_manifest(&deployment_plan()).context("Failed to render manifest")?;
    print!("{}", manifest);
    Ok(())
}
