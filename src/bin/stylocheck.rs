use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing::info;
use uuid::Uuid;

use stylocheck_lib::models::{AnalysisRecord, LabeledSample};
use stylocheck_lib::services::config_store::save_calibration;
use stylocheck_lib::services::detection::{derive_thresholds, DEFAULT_GRAY_RATIO};
use stylocheck_lib::services::file_parser::extract_text;
use stylocheck_lib::services::{AnalysisStore, AppConfig, ConfigStore, JsonHistoryStore};
use stylocheck_lib::AnalysisEngine;

/// stylocheck: stylometric profiling and AI-authorship scoring for literary text.
#[derive(Parser)]
#[command(name = "stylocheck", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Analyze a text (from --file, --text or stdin) and print the JSON report
    Analyze {
        /// A .txt, .pdf or .docx file
        #[arg(long, conflicts_with = "text")]
        file: Option<PathBuf>,

        /// Inline text
        #[arg(long)]
        text: Option<String>,

        /// Store the report in the analysis history
        #[arg(long)]
        save: bool,
    },

    /// Compare the writing style of two files
    Compare {
        file_a: PathBuf,
        file_b: PathBuf,
    },

    /// Browse stored analyses
    History {
        #[command(subcommand)]
        action: HistoryAction,
    },

    /// Derive perplexity thresholds from a labeled corpus (JSON array of samples)
    Calibrate {
        corpus: PathBuf,

        /// t_low = round(t* x ratio)
        #[arg(long, default_value_t = DEFAULT_GRAY_RATIO)]
        gray_ratio: f64,

        /// Write a calibration file with the derived thresholds
        #[arg(long)]
        write: Option<PathBuf>,
    },

    /// Inspect configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum HistoryAction {
    /// List analyses, newest first
    List {
        #[arg(long, default_value = "0")]
        skip: usize,
        #[arg(long, default_value = "20")]
        limit: usize,
    },
    /// Print one stored analysis
    Show { id: Uuid },
    /// Print the text a stored analysis was run on
    Text { id: Uuid },
    /// Delete one stored analysis
    Delete { id: Uuid },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Print the effective configuration and calibration
    Show,
}

fn load_app_config() -> Result<(AppConfig, Option<PathBuf>)> {
    let mut config = AppConfig::default();
    let mut config_file = None;
    if let Some(dir) = ConfigStore::default_config_dir() {
        let store = ConfigStore::new(dir);
        config = store
            .load()
            .with_context(|| format!("loading {}", store.config_file().display()))?;
        config_file = Some(store.config_file().to_path_buf());
    }
    config.apply_env_overrides();
    Ok((config, config_file))
}

fn history_store(config: &AppConfig) -> JsonHistoryStore {
    let dir = config
        .history_dir
        .clone()
        .or_else(JsonHistoryStore::default_dir)
        .unwrap_or_else(|| PathBuf::from("history"));
    JsonHistoryStore::new(dir)
}

fn read_file(path: &Path) -> Result<Vec<u8>> {
    std::fs::read(path).with_context(|| format!("reading {}", path.display()))
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_default()
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    stylocheck_lib::init_logging();

    let cli = Cli::parse();
    let (config, config_file) = load_app_config()?;

    match cli.command {
        Commands::Analyze { file, text, save } => {
            let engine = AnalysisEngine::from_app_config(&config)?;
            let (input, report) = match (file, text) {
                (Some(path), _) => {
                    let bytes = read_file(&path)?;
                    let input = extract_text(&file_name(&path), &bytes, &engine.calibration().limits)?;
                    let report = engine.analyze(&input).await?;
                    (input, report)
                }
                (None, Some(text)) => {
                    let report = engine.analyze(&text).await?;
                    (text, report)
                }
                (None, None) => {
                    let mut input = String::new();
                    std::io::stdin()
                        .read_to_string(&mut input)
                        .context("reading stdin")?;
                    let report = engine.analyze(&input).await?;
                    (input, report)
                }
            };

            print_json(&report)?;

            if save {
                let record = AnalysisRecord::new(input.trim(), report);
                history_store(&config).save(&record)?;
                eprintln!("Saved analysis {}", record.id);
            }
        }

        Commands::Compare { file_a, file_b } => {
            let engine = AnalysisEngine::from_app_config(&config)?;
            let limits = &engine.calibration().limits;
            let text_a = extract_text(&file_name(&file_a), &read_file(&file_a)?, limits)
                .with_context(|| format!("extracting {}", file_a.display()))?;
            let text_b = extract_text(&file_name(&file_b), &read_file(&file_b)?, limits)
                .with_context(|| format!("extracting {}", file_b.display()))?;
            let result = engine.compare(&text_a, &text_b)?;
            print_json(&result)?;
        }

        Commands::History { action } => {
            let store = history_store(&config);
            match action {
                HistoryAction::List { skip, limit } => print_json(&store.list(skip, limit)?)?,
                HistoryAction::Show { id } => print_json(&store.get(id)?)?,
                HistoryAction::Text { id } => println!("{}", store.get(id)?.text()),
                HistoryAction::Delete { id } => {
                    store.delete(id)?;
                    eprintln!("Deleted analysis {}", id);
                }
            }
        }

        Commands::Calibrate { corpus, gray_ratio, write } => {
            let content = std::fs::read_to_string(&corpus)
                .with_context(|| format!("reading {}", corpus.display()))?;
            let samples: Vec<LabeledSample> =
                serde_json::from_str(&content).context("parsing calibration corpus")?;
            info!("[CALIBRATE] {} samples from {}", samples.len(), corpus.display());

            let report = derive_thresholds(&samples, gray_ratio)?;
            print_json(&report)?;

            if let Some(path) = write {
                let engine = AnalysisEngine::from_app_config(&config)?;
                let mut calibration = engine.calibration().clone();
                calibration.perplexity.t_low = report.t_low;
                calibration.perplexity.t_high = report.t_high;
                calibration.version = format!("ppx-derived-{}", chrono::Utc::now().format("%Y-%m-%d"));
                save_calibration(&path, &calibration)
                    .with_context(|| format!("writing {}", path.display()))?;
                eprintln!("Wrote calibration {} to {}", calibration.version, path.display());
            }
        }

        Commands::Config { action: ConfigAction::Show } => {
            let engine = AnalysisEngine::from_app_config(&config)?;
            print_json(&serde_json::json!({
                "config_file": config_file,
                "config": config,
                "calibration": engine.calibration(),
            }))?;
        }
    }

    Ok(())
}
