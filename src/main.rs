use clap::{Arg, Command};
use log::LevelFilter;
use phishscore::batch::BulkOrchestrator;
use phishscore::pipeline::EmailAnalyzer;
use phishscore::types::AnalysisRequest;
use phishscore::Config;
use serde::{Deserialize, Serialize};
use std::process;

#[derive(Debug, Deserialize)]
struct BulkRequest {
    emails: Vec<AnalysisRequest>,
}

#[derive(Debug, Serialize)]
struct BulkOutput {
    results: Vec<phishscore::RiskAssessment>,
    summary: phishscore::BatchSummary,
    total_processing_time_ms: f64,
}

#[tokio::main]
async fn main() {
    let matches = Command::new("phishscore")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Phishing risk scoring engine fusing rule-based indicators with a semantic classifier")
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .value_name("FILE")
                .help("Configuration file path")
                .default_value("/etc/phishscore.yaml"),
        )
        .arg(
            Arg::new("generate-config")
                .long("generate-config")
                .value_name("FILE")
                .help("Generate a default configuration file")
                .action(clap::ArgAction::Set),
        )
        .arg(
            Arg::new("analyze")
                .long("analyze")
                .value_name("FILE")
                .help("Analyze a single normalized email (JSON analysis request)")
                .action(clap::ArgAction::Set),
        )
        .arg(
            Arg::new("bulk")
                .long("bulk")
                .value_name("FILE")
                .help("Analyze a batch of emails (JSON bulk request)")
                .action(clap::ArgAction::Set),
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .help("Enable verbose logging")
                .action(clap::ArgAction::SetTrue),
        )
        .get_matches();

    let log_level = if matches.get_flag("verbose") {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };
    env_logger::Builder::from_default_env()
        .filter_level(log_level)
        .init();

    if let Some(generate_path) = matches.get_one::<String>("generate-config") {
        generate_default_config(generate_path);
        return;
    }

    let config_path = matches.get_one::<String>("config").unwrap();
    let config = match load_config(config_path) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error loading configuration: {e}");
            process::exit(1);
        }
    };

    let analyzer = match EmailAnalyzer::new(&config) {
        Ok(analyzer) => analyzer,
        Err(e) => {
            eprintln!("Error initializing analyzer: {e}");
            process::exit(1);
        }
    };

    if let Some(request_file) = matches.get_one::<String>("analyze") {
        analyze_file(&analyzer, request_file).await;
        return;
    }

    if let Some(batch_file) = matches.get_one::<String>("bulk") {
        bulk_analyze_file(&config, analyzer, batch_file).await;
        return;
    }

    eprintln!("Nothing to do: pass --analyze, --bulk or --generate-config");
    process::exit(1);
}

fn load_config(path: &str) -> anyhow::Result<Config> {
    if std::path::Path::new(path).exists() {
        log::info!("Loading configuration from: {path}");
        Config::from_file(path)
    } else {
        log::warn!("Configuration file {path} not found, using defaults");
        Ok(Config::default())
    }
}

fn generate_default_config(path: &str) {
    let config = Config::default();
    match config.to_file(path) {
        Ok(()) => println!("Default configuration written to: {path}"),
        Err(e) => {
            eprintln!("Error writing configuration: {e}");
            process::exit(1);
        }
    }
}

async fn analyze_file(analyzer: &EmailAnalyzer, path: &str) {
    let request: AnalysisRequest = match read_json(path) {
        Ok(request) => request,
        Err(e) => {
            eprintln!("Error reading analysis request: {e}");
            process::exit(1);
        }
    };

    match analyzer
        .analyze(&request.message, request.context.as_ref())
        .await
    {
        Ok(assessment) => print_json(&assessment),
        Err(e) => {
            eprintln!("Validation error: {e}");
            process::exit(1);
        }
    }
}

async fn bulk_analyze_file(config: &Config, analyzer: EmailAnalyzer, path: &str) {
    let request: BulkRequest = match read_json(path) {
        Ok(request) => request,
        Err(e) => {
            eprintln!("Error reading bulk request: {e}");
            process::exit(1);
        }
    };

    let orchestrator = BulkOrchestrator::new(config, analyzer);
    let started = std::time::Instant::now();

    match orchestrator.run_batch(request.emails).await {
        Ok((results, summary)) => {
            let output = BulkOutput {
                results,
                summary,
                total_processing_time_ms: started.elapsed().as_secs_f64() * 1000.0,
            };
            print_json(&output);
        }
        Err(e) => {
            eprintln!("Validation error: {e}");
            process::exit(1);
        }
    }
}

fn read_json<T: serde::de::DeserializeOwned>(path: &str) -> anyhow::Result<T> {
    let content = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&content)?)
}

fn print_json<T: Serialize>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(json) => println!("{json}"),
        Err(e) => {
            eprintln!("Error serializing output: {e}");
            process::exit(1);
        }
    }
}
