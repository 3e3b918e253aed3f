//! BatchRunner — orchestrates the classification stage.
//!
//! Filter → batch → prompt → model call → parse → aggregate, strictly one
//! batch at a time. A failed batch contributes zero results and never stops
//! the batches after it.

use std::time::Instant;

use uuid::Uuid;

use super::aggregate::ScoreTable;
use super::batch::{batch_count, batches};
use super::journal::PromptJournal;
use super::parser::parse_batch_response;
use super::prompt::{build_batch_prompt, CLASSIFICATION_SYSTEM_PROMPT};
use super::types::{GenerativeClient, InputRecord};
use super::ClassificationError;
use crate::codebook::Codebook;
use crate::config::RunConfig;

/// Counters for one classification run.
#[derive(Debug, Clone, Default)]
pub struct RunStats {
    pub total_records: usize,
    pub skipped_empty: usize,
    pub batches: usize,
    pub failed_batches: usize,
    pub scored: usize,
    pub duration_ms: u64,
}

/// The accumulated score table plus run counters.
#[derive(Debug)]
pub struct RunOutcome {
    pub table: ScoreTable,
    pub stats: RunStats,
}

/// Runs the full classification stage over a set of input records.
pub struct BatchRunner<'a, C: GenerativeClient> {
    client: &'a C,
    codebook: &'a Codebook,
    config: &'a RunConfig,
}

impl<'a, C: GenerativeClient> BatchRunner<'a, C> {
    pub fn new(client: &'a C, codebook: &'a Codebook, config: &'a RunConfig) -> Self {
        Self {
            client,
            codebook,
            config,
        }
    }

    /// Classify every record with non-empty text, one batch at a time.
    ///
    /// Service and parse failures are recovered at batch granularity: the
    /// batch yields no results and processing continues. Only configuration
    /// problems (bad batch size) abort the run.
    pub fn run(
        &self,
        records: &[InputRecord],
        journal: Option<&PromptJournal>,
    ) -> Result<RunOutcome, ClassificationError> {
        let start = Instant::now();
        let run_id = Uuid::new_v4();

        let eligible: Vec<InputRecord> = records
            .iter()
            .filter(|r| !r.text.trim().is_empty())
            .cloned()
            .collect();
        let skipped_empty = records.len() - eligible.len();
        if skipped_empty > 0 {
            tracing::info!(skipped = skipped_empty, "excluded records with empty text");
        }

        let total_batches = batch_count(eligible.len(), self.config.batch_size);
        tracing::info!(
            run_id = %run_id,
            records = eligible.len(),
            batches = total_batches,
            batch_size = self.config.batch_size,
            model = %self.config.model,
            "beginning classification run"
        );

        let mut table = ScoreTable::new();
        let mut failed_batches = 0;

        for (index, batch) in batches(&eligible, self.config.batch_size)?.enumerate() {
            let batch_num = index + 1;
            tracing::info!(batch = batch_num, total = total_batches, size = batch.len(), "processing batch");

            let prompt = build_batch_prompt(batch, self.codebook, &self.config.question);
            if let Some(journal) = journal {
                if let Err(e) = journal.record_prompt(batch_num, total_batches, &prompt) {
                    tracing::warn!(error = %e, "could not write prompt to journal");
                }
            }

            let raw = match self.client.generate(&prompt, CLASSIFICATION_SYSTEM_PROMPT) {
                Ok(raw) => raw,
                Err(e) => {
                    failed_batches += 1;
                    tracing::error!(
                        batch = batch_num,
                        error = %e,
                        "model call failed, batch contributes no results"
                    );
                    continue;
                }
            };
            if let Some(journal) = journal {
                if let Err(e) = journal.record_response(&raw) {
                    tracing::warn!(error = %e, "could not write response to journal");
                }
            }

            match parse_batch_response(&raw) {
                Ok(items) => {
                    let written = table.absorb(items);
                    tracing::debug!(batch = batch_num, written, "batch aggregated");
                }
                Err(e) => {
                    failed_batches += 1;
                    tracing::error!(
                        batch = batch_num,
                        error = %e,
                        "response unusable, batch contributes no results"
                    );
                }
            }
        }

        let stats = RunStats {
            total_records: records.len(),
            skipped_empty,
            batches: total_batches,
            failed_batches,
            scored: table.len(),
            duration_ms: start.elapsed().as_millis() as u64,
        };
        tracing::info!(
            run_id = %run_id,
            scored = stats.scored,
            failed_batches = stats.failed_batches,
            duration_ms = stats.duration_ms,
            "classification run finished"
        );

        Ok(RunOutcome { table, stats })
    }
}
