/// Rudder - Kubernetes manifests through kubectl
///
/// Applies a manifest, prints the composite identity derived from the
/// created objects, and uses that identity for later status checks and
/// teardown. Stands in for the orchestration host that would normally
/// drive the lifecycle adapter.
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use rudder::kubectl::Kubectl;
use rudder::{CompositeId, ManifestLifecycle, ProviderConfig};

#[derive(Parser)]
#[command(name = "rudder")]
#[command(about = "Manage Kubernetes manifests through kubectl", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Provider configuration file path
    #[arg(short, long, default_value = "provider.yaml")]
    config: PathBuf,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Apply a manifest; prints the new resource identity, or re-applies
    /// in place when --id is given
    Apply {
        /// Manifest file to apply ("-" for stdin)
        #[arg(short, long)]
        file: String,

        /// Existing resource identity to update instead of creating
        #[arg(long)]
        id: Option<String>,
    },

    /// Check whether the objects behind an identity still exist
    Status {
        /// Resource identity as printed by apply
        #[arg(long)]
        id: String,
    },

    /// Delete the objects behind an identity, last-created first
    Delete {
        /// Resource identity as printed by apply
        #[arg(long)]
        id: String,
    },

    /// Generate example configuration file
    Init,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Initialize tracing
    let log_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("rudder={}", log_level).into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Execute command
    let result = match cli.command {
        Commands::Apply { ref file, ref id } => apply(&cli, file, id.as_deref()).await,
        Commands::Status { ref id } => status(&cli, id).await,
        Commands::Delete { ref id } => delete(&cli, id).await,
        Commands::Init => init_config(&cli).await,
    };

    if let Err(e) = result {
        error!("Error: {:#}", e);
        std::process::exit(1);
    }
}

/// Load the provider configuration, falling back to an empty one when the
/// file does not exist (kubectl's ambient configuration applies).
fn load_config(cli: &Cli) -> Result<ProviderConfig> {
    if cli.config.exists() {
        ProviderConfig::from_file(&cli.config).context("Failed to load configuration")
    } else {
        Ok(ProviderConfig::default())
    }
}

/// Read the manifest text from a file, or from stdin when "-"
async fn read_manifest(file: &str) -> Result<String> {
    if file == "-" {
        let mut content = String::new();
        tokio::io::AsyncReadExt::read_to_string(&mut tokio::io::stdin(), &mut content)
            .await
            .context("Failed to read manifest from stdin")?;
        Ok(content)
    } else {
        tokio::fs::read_to_string(file)
            .await
            .with_context(|| format!("Failed to read manifest file {}", file))
    }
}

/// Apply a manifest: create a new resource or update an existing one
async fn apply(cli: &Cli, file: &str, id: Option<&str>) -> Result<()> {
    Kubectl::check_installed()
        .await
        .context("kubectl is required")?;

    let config = load_config(cli)?;
    let manifest = read_manifest(file).await?;
    let lifecycle = ManifestLifecycle::new(config);

    match id {
        Some(id) => {
            lifecycle.update(&manifest).await?;
            info!("Updated resource {}", id);
        }
        None => {
            let id = lifecycle.create(&manifest).await?;
            info!("Created resource");
            // The identity goes to stdout so the caller can persist it
            println!("{}", id);
        }
    }

    Ok(())
}

/// Check whether the objects behind an identity still exist
async fn status(cli: &Cli, id: &str) -> Result<()> {
    Kubectl::check_installed()
        .await
        .context("kubectl is required")?;

    let config = load_config(cli)?;
    let lifecycle = ManifestLifecycle::new(config);
    let id = CompositeId::new(id);

    let outcome = lifecycle.read(&id).await?;
    if outcome.present {
        info!("All resources present");
    } else {
        warn!("Resource is gone; the stored identity should be discarded");
    }

    if let Some(multi) = outcome.into_error() {
        anyhow::bail!("{}", multi);
    }

    Ok(())
}

/// Delete the objects behind an identity
async fn delete(cli: &Cli, id: &str) -> Result<()> {
    Kubectl::check_installed()
        .await
        .context("kubectl is required")?;

    let config = load_config(cli)?;
    let lifecycle = ManifestLifecycle::new(config);
    let id = CompositeId::new(id);

    lifecycle.delete(&id).await?;
    info!("✓ Resources deleted successfully");

    Ok(())
}

/// Initialize example configuration file
async fn init_config(cli: &Cli) -> Result<()> {
    if cli.config.exists() {
        anyhow::bail!(
            "Configuration file already exists: {}",
            cli.config.display()
        );
    }

    let example_config = ProviderConfig::example();
    let yaml = serde_yaml::to_string(&example_config)?;

    tokio::fs::write(&cli.config, yaml)
        .await
        .context("Failed to write configuration file")?;

    info!("Example configuration created: {}", cli.config.display());
    info!("");
    info!("Next steps:");
    info!("  1. Edit the configuration to point at your kubeconfig");
    info!("  2. Apply a manifest:");
    info!("     rudder apply -f manifest.yaml");

    Ok(())
}
