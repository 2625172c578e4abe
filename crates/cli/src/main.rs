use std::path::PathBuf;
use std::str::FromStr;

use anyhow::{anyhow, Result};
use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use tracing::debug;

use kact_actions::{ActionCatalog, Engine};

mod exec;
mod pick;

#[derive(Parser, Debug)]
#[command(name = "kactl", version, about = "Run templated actions against cluster resources")]
struct Cli {
    /// Output format
    #[arg(short = 'o', long = "output", value_enum, global = true, default_value_t = Output::Human)]
    output: Output,

    /// Kubernetes namespace
    #[arg(long = "ns", global = true, default_value = "default")]
    namespace: String,

    /// Actions config file; a missing file falls back to built-ins only
    #[arg(long = "config", global = true, default_value = "kact.yaml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
enum Output { Human, Json }

#[derive(Subcommand, Debug)]
enum Commands {
    /// List resource kinds served by the cluster
    Kinds,
    /// Show the merged action list for a kind
    Actions {
        /// Kind key, e.g. "pod"
        kind: String,
    },
    /// Pick a resource and run an action against it
    Run {
        /// Resource kind (prompted when omitted)
        #[arg(long = "kind")]
        kind: Option<String>,
        /// Object name (prompted when omitted)
        #[arg(long = "name")]
        name: Option<String>,
        /// Action name (prompted when omitted)
        #[arg(long = "action")]
        action: Option<String>,
        /// Print the resolved argv instead of executing it
        #[arg(long = "dry-run", action = ArgAction::SetTrue)]
        dry_run: bool,
    },
}

fn init_tracing() {
    let env = std::env::var("KACT_LOG").unwrap_or_else(|_| "info".to_string());
    let filter = tracing_subscriber::EnvFilter::from_str(&env)
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).with_target(true).init();
}

#[tokio::main]
async fn main() {
    init_tracing();
    let cli = Cli::parse();
    if let Err(e) = run(cli).await {
        eprintln!("kactl: {:#}", e);
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Kinds => {
            let kinds = kact_kubehub::discover_kinds().await?;
            match cli.output {
                Output::Human => {
                    for k in kinds {
                        let scope = if k.namespaced { "namespaced" } else { "cluster" };
                        println!("{} • {} • {}", k.gvk_key(), k.key(), scope);
                    }
                }
                Output::Json => println!("{}", serde_json::to_string_pretty(&kinds)?),
            }
        }
        Commands::Actions { kind } => {
            let catalog = ActionCatalog::load(Some(cli.config.as_path()))?;
            let candidates = catalog.candidates(&kind.to_lowercase());
            match cli.output {
                Output::Human => {
                    for a in candidates {
                        if a.variables.is_empty() {
                            println!("{:<20} {}", a.name, a.command);
                        } else {
                            let vars: Vec<&str> = a.variables.iter().map(|v| v.name.as_str()).collect();
                            println!("{:<20} {} [vars: {}]", a.name, a.command, vars.join(", "));
                        }
                    }
                }
                Output::Json => println!("{}", serde_json::to_string_pretty(&candidates)?),
            }
        }
        Commands::Run { kind, name, action, dry_run } => {
            let catalog = ActionCatalog::load(Some(cli.config.as_path()))?;
            let engine = Engine::new(catalog);
            let chooser = pick::TermChooser;

            let kinds = kact_kubehub::discover_kinds().await?;
            let entry = match kind {
                Some(k) => kact_kubehub::find_kind(&kinds, &k)
                    .cloned()
                    .ok_or_else(|| anyhow!("unknown kind: {k}"))?,
                None => pick::pick_kind(&chooser, &kinds)?,
            };
            debug!(kind = %entry.gvk_key(), "kind selected");

            let ns = cli.namespace.as_str();
            let objects = kact_kubehub::list_objects(&entry, entry.namespaced.then_some(ns)).await?;
            let obj = match name {
                Some(n) => objects
                    .iter()
                    .find(|o| o.pointer("/metadata/name").and_then(|v| v.as_str()) == Some(n.as_str()))
                    .cloned()
                    .ok_or_else(|| anyhow!("no {} named {n}", entry.key()))?,
                None => pick::pick_object(&chooser, &entry, &objects)?,
            };

            let argv = engine.resolve(&entry.key(), &obj, ns, action.as_deref(), &chooser)?;
            if dry_run {
                match cli.output {
                    Output::Human => println!("{}", argv.join(" ")),
                    Output::Json => println!("{}", serde_json::to_string_pretty(&argv)?),
                }
            } else {
                let code = exec::run(&argv).await?;
                if code != 0 {
                    std::process::exit(code);
                }
            }
        }
    }
    Ok(())
}
