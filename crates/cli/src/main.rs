use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use kindling_config::ResourceConfig;
use kindling_core::AttrValue;
use kindling_lifecycle::{ClusterState, LifecycleConfig, LifecycleController, LifecycleError};
use kindling_provision::{KindCli, Provisioner};
use tracing::{info, warn};

#[derive(Parser, Debug)]
#[command(name = "kindlingctl", version, about = "Manage kind clusters from attribute files")]
struct Cli {
    /// Output format
    #[arg(short = 'o', long = "output", value_enum, global = true, default_value_t = Output::Human)]
    output: Output,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
enum Output { Human, Json }

#[derive(Subcommand, Debug)]
enum Commands {
    /// Normalize an attribute file and print the cluster config kind would receive
    Render {
        #[arg(short = 'f', long = "file")]
        file: PathBuf,
    },
    /// Create a cluster and write its state record
    Create {
        #[arg(short = 'f', long = "file")]
        file: PathBuf,
        #[arg(long = "state", default_value = "kindling-state.json")]
        state: PathBuf,
    },
    /// Refresh connection details in a state record
    Read {
        #[arg(long = "state", default_value = "kindling-state.json")]
        state: PathBuf,
    },
    /// Delete the cluster named in a state record
    Delete {
        #[arg(long = "state", default_value = "kindling-state.json")]
        state: PathBuf,
    },
    /// List kind clusters
    Clusters,
    /// Delete every cluster whose name starts with a prefix
    Prune {
        #[arg(long = "prefix")]
        prefix: String,
    },
}

fn init_tracing() {
    let env = std::env::var("KINDLING_LOG").unwrap_or_else(|_| "info".to_string());
    let filter = tracing_subscriber::EnvFilter::from_str(&env).unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).with_target(true).with_writer(std::io::stderr).init();
}

fn init_metrics() {
    if let Ok(addr) = std::env::var("KINDLING_METRICS_ADDR") {
        if let Ok(sock) = addr.parse::<std::net::SocketAddr>() {
            let builder = metrics_exporter_prometheus::PrometheusBuilder::new();
            match builder.with_http_listener(sock).install() {
                Ok(_) => tracing::info!(addr = %addr, "Prometheus metrics exporter listening"),
                Err(e) => tracing::warn!(error = %e, "failed to install metrics exporter"),
            }
        } else {
            tracing::warn!(addr = %addr, "invalid KINDLING_METRICS_ADDR; expected host:port");
        }
    }
}

fn load_resource(path: &Path) -> Result<ResourceConfig> {
    let text = std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    let json: serde_json::Value = serde_json::from_str(&text).with_context(|| format!("parsing {}", path.display()))?;
    ResourceConfig::from_attributes(&AttrValue::from_json(json)).map_err(|e| anyhow!("Error parsing kind_config: {}", e))
}

fn load_state(path: &Path) -> Result<ClusterState> {
    let text = std::fs::read_to_string(path).with_context(|| format!("reading state {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("parsing state {}", path.display()))
}

fn save_state(path: &Path, state: &ClusterState) -> Result<()> {
    let text = serde_json::to_string_pretty(state)?;
    std::fs::write(path, text).with_context(|| format!("writing state {}", path.display()))
}

fn lifecycle_err(e: LifecycleError) -> anyhow::Error { anyhow!("{}: {}", e.summary(), e) }

fn print_state(output: Output, state: &ClusterState) -> Result<()> {
    match output {
        Output::Human => {
            println!("{} • {} • {}", state.name, state.node_image, state.endpoint);
            if let Some(p) = &state.kubeconfig_path {
                println!("kubeconfig: {}", p.display());
            }
        }
        // credentials stay in the state file
        Output::Json => println!(
            "{}",
            serde_json::to_string_pretty(&serde_json::json!({
                "id": state.id,
                "name": state.name,
                "node_image": state.node_image,
                "endpoint": state.endpoint,
                "kubeconfig_path": state.kubeconfig_path,
                "completed": state.completed,
            }))?
        ),
    }
    Ok(())
}

fn print_warnings(output: Output, name: &str, warnings: &[String]) -> Result<()> {
    match output {
        Output::Human => {
            println!("deleted {}", name);
            for w in warnings { println!("warning: {}", w); }
        }
        Output::Json => println!("{}", serde_json::to_string_pretty(&serde_json::json!({ "deleted": name, "warnings": warnings }))?),
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    init_metrics();
    let cli = Cli::parse();

    let provisioner: Arc<dyn Provisioner> = Arc::new(KindCli::from_env());
    let ctl = LifecycleController::new(provisioner.clone(), LifecycleConfig::from_env());

    match cli.command {
        Commands::Render { file } => {
            let res = load_resource(&file)?;
            for e in res.kind_config.iter().flat_map(|s| s.containerd_patch_errors()) {
                warn!(error = %e, "containerd config patch is not valid TOML");
            }
            match cli.output {
                Output::Human => match &res.kind_config {
                    Some(spec) => print!("{}", spec.to_yaml()?),
                    None => println!("# {} has no kind_config; kind defaults apply", res.name),
                },
                Output::Json => println!("{}", serde_json::to_string_pretty(&res)?),
            }
        }
        Commands::Create { file, state } => {
            let res = load_resource(&file)?;
            info!(cluster = %res.name, "create invoked");
            let st = ctl.create(&res).await.map_err(lifecycle_err)?;
            save_state(&state, &st)?;
            print_state(cli.output, &st)?;
        }
        Commands::Read { state } => {
            let mut st = load_state(&state)?;
            ctl.read(&mut st).await.map_err(lifecycle_err)?;
            save_state(&state, &st)?;
            print_state(cli.output, &st)?;
        }
        Commands::Delete { state } => {
            let st = load_state(&state)?;
            let outcome = ctl.delete(&st).await.map_err(lifecycle_err)?;
            if let Err(e) = std::fs::remove_file(&state) {
                warn!(error = %e, path = %state.display(), "could not remove state file");
            }
            print_warnings(cli.output, &st.name, &outcome.warnings)?;
        }
        Commands::Clusters => {
            let names = provisioner.list().await?;
            match cli.output {
                Output::Human => for n in &names { println!("{}", n); },
                Output::Json => println!("{}", serde_json::to_string_pretty(&names)?),
            }
        }
        Commands::Prune { prefix } => {
            let targets = matching_clusters(provisioner.list().await?, &prefix);
            info!(prefix = %prefix, count = targets.len(), "prune invoked");
            for name in targets {
                let st = ClusterState { name: name.clone(), ..Default::default() };
                match ctl.delete(&st).await {
                    Ok(outcome) => print_warnings(cli.output, &name, &outcome.warnings)?,
                    Err(e) => warn!(cluster = %name, error = %e, "{}", e.summary()),
                }
            }
        }
    }
    Ok(())
}

fn matching_clusters(names: Vec<String>, prefix: &str) -> Vec<String> {
    names.into_iter().filter(|n| n.starts_with(prefix)).collect()
}
