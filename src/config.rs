use std::path::PathBuf;

use crate::pipeline::ClassificationError;

/// Application-level constants
pub const APP_NAME: &str = "emocoder";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Batches of this many excerpts unless overridden on the command line.
pub const DEFAULT_BATCH_SIZE: usize = 10;

/// Request timeout for one model call, seconds.
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 300;

/// Public Gemini API endpoint; override with GEMINI_BASE_URL for proxies.
pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";

/// Where raw and derived tables land unless overridden.
pub const DEFAULT_OUTPUT_DIR: &str = "output_files";

pub fn default_log_filter() -> &'static str {
    "info,emocoder=debug"
}

/// Immutable configuration for one classification run, constructed once at
/// startup and passed into each component.
#[derive(Debug, Clone)]
pub struct RunConfig {
    /// Gemini model identifier, e.g. "gemini-2.0-flash".
    pub model: String,
    pub api_key: String,
    pub base_url: String,
    /// The survey question the excerpts answer, included in every prompt.
    pub question: String,
    pub batch_size: usize,
    pub output_dir: PathBuf,
    pub request_timeout_secs: u64,
}

impl RunConfig {
    /// Build a config from the environment plus command-line overrides.
    ///
    /// GEMINI_API_KEY and GEMINI_MODEL are required; GEMINI_BASE_URL is
    /// optional. Fails before any batch is processed.
    pub fn from_env(
        output_dir: Option<PathBuf>,
        batch_size: Option<usize>,
        question: Option<String>,
    ) -> Result<Self, ClassificationError> {
        let api_key = require_env("GEMINI_API_KEY")?;
        let model = require_env("GEMINI_MODEL")?;
        let base_url =
            std::env::var("GEMINI_BASE_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.to_string());

        Self::new(
            model,
            api_key,
            base_url,
            question.unwrap_or_default(),
            batch_size.unwrap_or(DEFAULT_BATCH_SIZE),
            output_dir.unwrap_or_else(|| PathBuf::from(DEFAULT_OUTPUT_DIR)),
        )
    }

    pub fn new(
        model: String,
        api_key: String,
        base_url: String,
        question: String,
        batch_size: usize,
        output_dir: PathBuf,
    ) -> Result<Self, ClassificationError> {
        if batch_size == 0 {
            return Err(ClassificationError::Configuration(
                "batch size must be at least 1".into(),
            ));
        }
        if model.trim().is_empty() {
            return Err(ClassificationError::Configuration(
                "model name must not be empty".into(),
            ));
        }
        Ok(Self {
            model,
            api_key,
            base_url,
            question,
            batch_size,
            output_dir,
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
        })
    }
}

fn require_env(name: &str) -> Result<String, ClassificationError> {
    match std::env::var(name) {
        Ok(value) if !value.trim().is_empty() => Ok(value),
        _ => Err(ClassificationError::Configuration(format!(
            "required environment variable {name} is not set"
        ))),
    }
}
