//! PostgreSQL Volume Operator
//!
//! Command line entry point: provisions the volume claims of a Pgcluster,
//! checks and gates claim deletion, and dispatches pgBackRest commands into
//! database pods.

use clap::builder::FalseyValueParser;
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{error, info, Level};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use pg_volume_operator::domain::ports::VolumeClaimClientRef;
use pg_volume_operator::volume::{ManifestSink, TracingSink, WriterSink};
use pg_volume_operator::{
    BackrestCommand, BackrestDispatcher, BackrestRequest, ClaimGate, ClaimMetrics,
    ClusterVolumeOrchestrator, Error, InMemoryClaimStore, KubeClaimClient, KubePodExecutor,
    ManifestRenderer, Pgcluster, Result, VolumeProvisioner,
};

// =============================================================================
// CLI Arguments
// =============================================================================

/// PostgreSQL Volume Operator - volume claim provisioning for database clusters
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    log_level: String,

    /// Output logs as JSON
    #[arg(long, env = "LOG_JSON", value_parser = FalseyValueParser::new())]
    log_json: bool,

    /// Debug logging, and echo every rendered claim manifest to stdout.
    /// Only "true" enables it from the environment.
    #[arg(long, env = "CRUNCHY_DEBUG", value_parser = debug_flag)]
    debug: bool,

    /// Run in standalone mode (no Kubernetes, claims are kept in memory)
    #[arg(long, env = "STANDALONE", value_parser = FalseyValueParser::new())]
    standalone: bool,

    /// Print claim operation metrics when done
    #[arg(long)]
    metrics: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Create the missing data, WAL and tablespace claims of a cluster
    Provision {
        /// Pgcluster manifest (YAML or JSON)
        #[arg(long)]
        cluster_file: PathBuf,

        /// Target namespace, defaults to the manifest's namespace
        #[arg(long, env = "NAMESPACE")]
        namespace: Option<String>,

        /// Claim name prefix, defaults to the cluster name
        #[arg(long)]
        pvc_prefix: Option<String>,

        /// Use the replica storage for the data volume
        #[arg(long)]
        replica: bool,
    },

    /// Delete a claim if it is labelled for removal
    Delete {
        #[arg(long)]
        name: String,

        #[arg(long, env = "NAMESPACE")]
        namespace: String,
    },

    /// Print whether a claim exists
    Exists {
        #[arg(long)]
        name: String,

        #[arg(long, env = "NAMESPACE")]
        namespace: String,
    },

    /// Run a pgBackRest command inside a database pod
    Backrest {
        #[arg(long, env = "NAMESPACE")]
        namespace: String,

        #[arg(long, env = "PODNAME")]
        pod: String,

        /// Task name (backrest-stanza-create, backrest-info, backrest-backup)
        #[arg(long, env = "COMMAND")]
        command: String,

        #[arg(long, env = "COMMAND_OPTS", default_value = "")]
        command_opts: String,

        #[arg(long, env = "PGBACKREST_REPO_TYPE", default_value = "")]
        repo_type: String,

        /// Run against both the local and the S3 repository
        #[arg(long, env = "PGHA_PGBACKREST_LOCAL_S3_STORAGE", default_value = "false")]
        local_s3_storage: String,
    },
}

// =============================================================================
// Main
// =============================================================================

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    init_logging(&args);

    info!("Starting PostgreSQL Volume Operator");
    info!("  Version: {}", pg_volume_operator::VERSION);
    info!("  Debug: {}", args.debug);
    info!("  Standalone mode: {}", args.standalone);

    let metrics = ClaimMetrics::new()?;

    match &args.command {
        Command::Provision {
            cluster_file,
            namespace,
            pvc_prefix,
            replica,
        } => {
            let client = claim_client(&args).await?;
            let sink: Arc<dyn ManifestSink> = if args.debug {
                Arc::new(WriterSink::new(std::io::stdout()))
            } else {
                Arc::new(TracingSink)
            };
            let provisioner = VolumeProvisioner::new(client, ManifestRenderer::new(sink))
                .with_metrics(metrics.clone());
            let orchestrator = ClusterVolumeOrchestrator::new(provisioner);

            let cluster = load_cluster(cluster_file)?;
            let namespace = namespace
                .clone()
                .or_else(|| cluster.metadata.namespace.clone())
                .ok_or_else(|| Error::Configuration("NAMESPACE env var not set".into()))?;
            let prefix = pvc_prefix.clone().unwrap_or_else(|| cluster.cluster_name());
            let data_spec = if *replica {
                &cluster.spec.replica_storage
            } else {
                &cluster.spec.primary_storage
            };

            let report = orchestrator
                .provision(&cluster, &namespace, &prefix, data_spec)
                .await;
            println!("{}", serde_json::to_string_pretty(&report.volumes)?);

            if let Some((step, e)) = report.failure {
                error!(%step, "Provisioning {} failed", cluster.cluster_name());
                return Err(e);
            }
        }

        Command::Delete { name, namespace } => {
            let gate = ClaimGate::new(claim_client(&args).await?).with_metrics(metrics.clone());
            gate.delete_if_exists(name, namespace).await?;
        }

        Command::Exists { name, namespace } => {
            let gate = ClaimGate::new(claim_client(&args).await?);
            println!("{}", gate.exists(name, namespace).await);
        }

        Command::Backrest {
            namespace,
            pod,
            command,
            command_opts,
            repo_type,
            local_s3_storage,
        } => {
            let request = BackrestRequest {
                namespace: namespace.clone(),
                pod: pod.clone(),
                command: command.parse::<BackrestCommand>()?,
                command_opts: command_opts.clone(),
                repo_type: repo_type.clone(),
                local_s3_storage: parse_bool(local_s3_storage),
            };

            if args.standalone {
                println!("{}", request.compose());
            } else {
                let client = kube::Client::try_default().await?;
                let dispatcher = BackrestDispatcher::new(Arc::new(KubePodExecutor::new(client)));
                dispatcher.dispatch(&request).await?;
            }
        }
    }

    if args.metrics {
        print!("{}", metrics.render()?);
    }

    info!("Operator run complete");
    Ok(())
}

// =============================================================================
// Helpers
// =============================================================================

async fn claim_client(args: &Args) -> Result<VolumeClaimClientRef> {
    if args.standalone {
        return Ok(Arc::new(InMemoryClaimStore::new()));
    }
    let client = kube::Client::try_default().await?;
    Ok(Arc::new(KubeClaimClient::new(client)))
}

fn load_cluster(path: &Path) -> Result<Pgcluster> {
    let raw = std::fs::read_to_string(path)?;
    // YAML is a superset of JSON
    Ok(serde_yaml::from_str(&raw)?)
}

fn debug_flag(value: &str) -> std::result::Result<bool, std::convert::Infallible> {
    Ok(value == "true")
}

/// Unparseable values count as false
fn parse_bool(value: &str) -> bool {
    matches!(value, "1" | "t" | "T" | "true" | "TRUE" | "True")
}

// =============================================================================
// Logging Setup
// =============================================================================

fn init_logging(args: &Args) {
    let level = if args.debug {
        Level::DEBUG
    } else {
        match args.log_level.to_lowercase().as_str() {
            "trace" => Level::TRACE,
            "debug" => Level::DEBUG,
            "info" => Level::INFO,
            "warn" => Level::WARN,
            "error" => Level::ERROR,
            _ => Level::INFO,
        }
    };

    let filter = EnvFilter::from_default_env()
        .add_directive(level.into())
        .add_directive("hyper=warn".parse().expect("static directive"))
        .add_directive("kube=info".parse().expect("static directive"))
        .add_directive("tower=warn".parse().expect("static directive"));

    // Logs go to stderr, stdout carries command output
    if args.log_json {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_target(true).with_writer(std::io::stderr))
            .init();
    }
}
