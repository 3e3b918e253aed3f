use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "emocoder", version, about = "Emotion coding of survey excerpts with a generative model")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Classify excerpts in batches and persist the raw score table.
    Classify {
        /// Input records, JSON Lines with response_id, id, and text per line
        #[arg(long, value_name = "FILE")]
        input: PathBuf,
        /// Where the raw table and prompt journal are written
        #[arg(long, value_name = "DIR")]
        output_dir: Option<PathBuf>,
        /// Excerpts per model request
        #[arg(long, value_name = "N")]
        batch_size: Option<usize>,
        /// The survey question the excerpts answer, given to the model as context
        #[arg(long, value_name = "TEXT")]
        question: Option<String>,
        /// Override the built-in emotion codebook (JSON entry list)
        #[arg(long, value_name = "FILE")]
        codebook: Option<PathBuf>,
    },
    /// Derive the detailed and top-emotion tables from a raw score file.
    Derive {
        /// A raw score file produced by `classify`
        #[arg(long, value_name = "FILE")]
        file: PathBuf,
        /// Cutoff in [0,1]; a score at or above it marks the emotion present
        #[arg(long, value_name = "SCORE")]
        threshold: f64,
        /// Override the built-in emotion codebook (JSON entry list)
        #[arg(long, value_name = "FILE")]
        codebook: Option<PathBuf>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_classify_with_defaults() {
        let cli = Cli::try_parse_from(["emocoder", "classify", "--input", "records.jsonl"]).unwrap();
        match cli.command {
            Commands::Classify {
                input,
                output_dir,
                batch_size,
                ..
            } => {
                assert_eq!(input, PathBuf::from("records.jsonl"));
                assert!(output_dir.is_none());
                assert!(batch_size.is_none());
            }
            other => panic!("expected classify, got {other:?}"),
        }
    }

    #[test]
    fn parses_derive_with_threshold() {
        let cli = Cli::try_parse_from([
            "emocoder", "derive", "--file", "raw.jsonl", "--threshold", "0.6",
        ])
        .unwrap();
        match cli.command {
            Commands::Derive { file, threshold, .. } => {
                assert_eq!(file, PathBuf::from("raw.jsonl"));
                assert_eq!(threshold, 0.6);
            }
            other => panic!("expected derive, got {other:?}"),
        }
    }

    #[test]
    fn derive_requires_threshold() {
        let result = Cli::try_parse_from(["emocoder", "derive", "--file", "raw.jsonl"]);
        assert!(result.is_err());
    }
}
