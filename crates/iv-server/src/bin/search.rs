//! Run one inverse search from a CSV file without starting the server.

use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use iv_data::CsvLoader;
use iv_server::{service, SearchRequest, SplitSettings};

#[derive(Parser, Debug)]
#[command(name = "iv-search", version, about = "Find feature vectors that hit a target prediction")]
struct Args {
    /// CSV file with a header row
    #[arg(long)]
    data: PathBuf,

    /// JSON request: features, target, target_value, pso_config and optional models
    #[arg(long)]
    request: PathBuf,

    /// Write the response here instead of stdout
    #[arg(long)]
    output: Option<PathBuf>,

    /// Fraction of rows held out for scoring each fitted model
    #[arg(long, default_value_t = iv_data::DEFAULT_TEST_SIZE)]
    test_size: f64,

    #[arg(long, default_value_t = iv_data::DEFAULT_SPLIT_SEED)]
    split_seed: u64,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "iv_server=info,iv_optimizer=info,iv_data=info".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let records = CsvLoader::new().load_records(&args.data)?;
    let raw = std::fs::read_to_string(&args.request)
        .with_context(|| format!("reading {}", args.request.display()))?;
    let value: serde_json::Value =
        serde_json::from_str(&raw).with_context(|| format!("parsing {}", args.request.display()))?;
    let request = SearchRequest::from_value(value)?;

    let split = SplitSettings {
        test_size: args.test_size,
        seed: args.split_seed,
    };
    let response = service::optimize(&records, &request, &split)?;
    let json = serde_json::to_string_pretty(&response)?;

    match args.output {
        Some(path) => {
            std::fs::write(&path, json).with_context(|| format!("writing {}", path.display()))?;
            tracing::info!("Wrote {}", path.display());
        }
        None => println!("{json}"),
    }
    Ok(())
}
