//! deckhand - deploy chart-based releases described by a manifest file

use clap::{Args, Parser, Subcommand};
use deckhand_kube::DeployConfig;
use std::path::PathBuf;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

mod commands;
mod error;
mod exit_codes;

use error::{CliError, Result};

#[derive(Parser)]
#[command(name = "deckhand")]
#[command(version)]
#[command(about = "Deploy chart-based releases described by a manifest file", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    #[command(flatten)]
    service: ServiceArgs,

    /// Enable debug output
    #[arg(long, global = true)]
    debug: bool,
}

/// Where the deployment service lives
#[derive(Args, Debug, Clone)]
struct ServiceArgs {
    /// Namespace of the deployment service
    #[arg(
        long,
        global = true,
        env = "DECKHAND_SERVICE_NAMESPACE",
        default_value = deckhand_kube::config::DEFAULT_SERVICE_NAMESPACE
    )]
    service_namespace: String,

    /// Service name of the deployment service
    #[arg(
        long,
        global = true,
        env = "DECKHAND_SERVICE_NAME",
        default_value = deckhand_kube::config::DEFAULT_SERVICE_NAME
    )]
    service_name: String,

    /// Path to the kubeconfig file (default: $KUBECONFIG or ~/.kube/config)
    #[arg(long, global = true)]
    kubeconfig: Option<PathBuf>,

    /// Seconds to wait for a connection to the deployment service
    #[arg(long, global = true, env = "DECKHAND_CONNECT_TIMEOUT", default_value_t = 5)]
    connect_timeout: u64,
}

impl ServiceArgs {
    fn deploy_config(&self) -> DeployConfig {
        let mut config = DeployConfig::default()
            .with_service(&self.service_namespace, &self.service_name)
            .with_connect_timeout(Duration::from_secs(self.connect_timeout));
        if let Some(path) = &self.kubeconfig {
            config = config.with_kubeconfig(path);
        }
        config
    }
}

/// Extra overrides layered after the manifest's own
#[derive(Args, Debug, Clone, Default)]
struct OverrideArgs {
    /// Additional values file(s), merged after the manifest's
    #[arg(short = 'f', long = "values")]
    values: Vec<PathBuf>,

    /// Additional inline overrides (key=value), applied after the manifest's
    #[arg(long = "set")]
    set: Vec<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Install or upgrade the release described by a manifest
    Deploy {
        /// Release manifest path
        manifest: PathBuf,

        #[command(flatten)]
        overrides: OverrideArgs,

        /// Simulate the deployment without changing the cluster
        #[arg(long)]
        dry_run: bool,
    },

    /// Show what a deploy would change in the running release
    Diff {
        /// Release manifest path
        manifest: PathBuf,

        #[command(flatten)]
        overrides: OverrideArgs,
    },

    /// Show the status of the release
    Status {
        /// Release manifest path
        manifest: PathBuf,
    },

    /// Render the chart locally
    #[command(alias = "render")]
    Template {
        /// Release manifest path
        manifest: PathBuf,

        #[command(flatten)]
        overrides: OverrideArgs,
    },

    /// Render the chart locally and check resource policies
    Lint {
        /// Release manifest path
        manifest: PathBuf,

        #[command(flatten)]
        overrides: OverrideArgs,

        /// Exit non-zero when a violation is found
        #[arg(long)]
        strict: bool,
    },

    /// Print the deployment service address
    Endpoint {
        /// Release manifest path
        manifest: PathBuf,
    },
}

fn init_tracing(debug: bool) {
    let filter = if debug {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

async fn run(cli: Cli) -> Result<()> {
    let config = cli.service.deploy_config();

    match cli.command {
        Commands::Deploy {
            manifest,
            overrides,
            dry_run,
        } => {
            commands::deploy::run(&manifest, &overrides.values, &overrides.set, dry_run, &config)
                .await
        }

        Commands::Diff {
            manifest,
            overrides,
        } => commands::diff::run(&manifest, &overrides.values, &overrides.set, &config).await,

        Commands::Status { manifest } => commands::status::run(&manifest, &config).await,

        Commands::Template {
            manifest,
            overrides,
        } => commands::template::run(&manifest, &overrides.values, &overrides.set),

        Commands::Lint {
            manifest,
            overrides,
            strict,
        } => commands::lint::run(&manifest, &overrides.values, &overrides.set, strict),

        Commands::Endpoint { manifest } => commands::endpoint::run(&manifest, &config).await,
    }
}

fn main() {
    miette::set_panic_hook();

    let cli = Cli::parse();
    init_tracing(cli.debug);

    // Every step runs strictly in sequence; one thread is enough
    let result = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(CliError::from)
        .and_then(|runtime| runtime.block_on(run(cli)));

    if let Err(err) = result {
        let code = err.exit_code();
        eprintln!("{:?}", miette::Report::new(err));
        std::process::exit(code);
    }
}
