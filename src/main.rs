use std::path::PathBuf;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use emocoder::cli::{Cli, Commands};
use emocoder::codebook::Codebook;
use emocoder::config::{self, RunConfig};
use emocoder::pipeline::{
    BatchRunner, ClassificationError, GeminiClient, PromptJournal,
};
use emocoder::storage;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config::default_log_filter())),
        )
        .init();

    let cli = Cli::parse();
    if let Err(e) = run(cli) {
        tracing::error!(error = %e, "run aborted");
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<(), ClassificationError> {
    match cli.command {
        Commands::Classify {
            input,
            output_dir,
            batch_size,
            question,
            codebook,
        } => classify(input, output_dir, batch_size, question, codebook),
        Commands::Derive {
            file,
            threshold,
            codebook,
        } => derive(file, threshold, codebook),
    }
}

fn classify(
    input: PathBuf,
    output_dir: Option<PathBuf>,
    batch_size: Option<usize>,
    question: Option<String>,
    codebook_path: Option<PathBuf>,
) -> Result<(), ClassificationError> {
    let config = RunConfig::from_env(output_dir, batch_size, question)?;
    let codebook = load_codebook(codebook_path)?;
    let records = storage::load_input_records(&input)?;

    std::fs::create_dir_all(&config.output_dir).map_err(|e| {
        ClassificationError::OutputWrite(format!(
            "cannot create output directory {}: {e}",
            config.output_dir.display()
        ))
    })?;

    let timestamp = chrono::Local::now().format("%Y-%m-%d_%H-%M-%S");
    let journal = PromptJournal::new(config.output_dir.join(format!("prompt_log_{timestamp}.txt")));
    tracing::info!(journal = %journal.path().display(), "logging prompts and responses");

    let client = GeminiClient::new(
        &config.base_url,
        &config.model,
        &config.api_key,
        config.request_timeout_secs,
    );
    let outcome = BatchRunner::new(&client, &codebook, &config).run(&records, Some(&journal))?;

    let raw_path = storage::raw_stage_path(&config.output_dir, &input);
    storage::write_raw_stage(&records, &outcome.table, &raw_path)?;

    tracing::info!(
        scored = outcome.stats.scored,
        failed_batches = outcome.stats.failed_batches,
        raw = %raw_path.display(),
        "classification complete"
    );
    Ok(())
}

fn derive(
    file: PathBuf,
    threshold: f64,
    codebook_path: Option<PathBuf>,
) -> Result<(), ClassificationError> {
    if !(0.0..=1.0).contains(&threshold) {
        return Err(ClassificationError::Configuration(format!(
            "threshold must be in [0,1], got {threshold}"
        )));
    }
    let codebook = load_codebook(codebook_path)?;
    let rows = storage::load_raw_stage(&file)?;

    let paths = storage::derived_paths(&file, threshold);
    let stats = storage::write_derived_stage(&rows, &codebook, threshold, &paths)?;
    if stats.rows == 0 {
        tracing::warn!("no rows carried a usable model response");
    }

    tracing::info!(
        rows = stats.rows,
        skipped = stats.skipped,
        detailed = %paths.detailed.display(),
        summary = %paths.summary.display(),
        "derivation complete"
    );
    Ok(())
}

fn load_codebook(path: Option<PathBuf>) -> Result<Codebook, ClassificationError> {
    match path {
        Some(path) => Codebook::load(&path),
        None => Ok(Codebook::builtin()),
    }
}
