//! Nexus CLI Tool
//!
//! Check medication combinations, resolve drug names, predict undocumented
//! interactions and inspect the audit chain.
//!
//! Usage:
//!   nexus check <drug>... [--data-dir <dir>] [--config <file>]
//!   nexus resolve <name>
//!   nexus predict <drug-a> <drug-b> [--timeout-secs <s>]
//!   nexus verify
//!   nexus chain
//!   nexus graph [--view]

use clap::{Parser, Subcommand};
use nexus_core::predictor::CancelToken;
use nexus_core::{NexusConfig, NexusEngine};
use serde_json::json;
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Parser)]
#[command(name = "nexus")]
#[command(version = "0.1.0")]
#[command(about = "Interaction risk scoring and audit trail for combined medications", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// JSON configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Directory holding the catalog and audit chain (overrides config)
    #[arg(short, long, global = true)]
    data_dir: Option<PathBuf>,

    /// Compact single-line JSON instead of pretty output
    #[arg(long, global = true)]
    compact: bool,

    /// Output file (stdout if not specified)
    #[arg(short, long, global = true)]
    output: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Score a medication list and record it in the audit chain
    Check {
        /// Drug names, brand or generic, dosage allowed ("Dolo 650 mg")
        #[arg(required = true)]
        drugs: Vec<String>,
    },

    /// Resolve a free-text drug name
    Resolve {
        name: String,
    },

    /// Predict interaction likelihood for two drugs (trains first)
    Predict {
        drug_a: String,
        drug_b: String,

        /// Abandon training after this many seconds
        #[arg(long)]
        timeout_secs: Option<u64>,
    },

    /// Verify audit chain integrity
    Verify,

    /// Print the audit chain
    Chain,

    /// Interaction graph summary
    Graph {
        /// Full node/link listing instead of the summary
        #[arg(long)]
        view: bool,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => NexusConfig::load(path)?,
        None => NexusConfig::from_env()?,
    };
    if let Some(dir) = cli.data_dir {
        config = config.with_data_dir(dir);
    }

    let engine = NexusEngine::new(config)?;

    let result: serde_json::Value = match cli.command {
        Commands::Check { drugs } => serde_json::to_value(engine.check_interactions(&drugs)?)?,
        Commands::Resolve { name } => serde_json::to_value(engine.resolve(&name))?,
        Commands::Predict { drug_a, drug_b, timeout_secs } => {
            let cancel = match timeout_secs {
                Some(secs) => CancelToken::with_timeout(Duration::from_secs(secs)),
                None => CancelToken::new(),
            };
            let training = engine.train_predictor_with(&cancel);
            let prediction = engine.predict_interaction(&drug_a, &drug_b);
            json!({
                "drug_a": engine.resolver().canonical(&drug_a),
                "drug_b": engine.resolver().canonical(&drug_b),
                "training": training,
                "prediction": prediction,
            })
        }
        Commands::Verify => {
            let chain = engine.audit_chain();
            json!({
                "valid": engine.verify_ledger(),
                "blocks": chain.len(),
                "head": chain.last().map(|b| b.hash.clone()),
            })
        }
        Commands::Chain => serde_json::to_value(engine.audit_chain())?,
        Commands::Graph { view } => {
            if view {
                serde_json::to_value(engine.graph().to_view())?
            } else {
                serde_json::to_value(engine.analytics_summary())?
            }
        }
    };

    engine.shutdown()?;

    let output_str = if cli.compact {
        serde_json::to_string(&result)?
    } else {
        serde_json::to_string_pretty(&result)?
    };

    if let Some(output_path) = cli.output {
        fs::write(&output_path, &output_str)?;
        eprintln!("Output written to: {}", output_path.display());
    } else {
        println!("{}", output_str);
    }

    Ok(())
}
