use std::collections::HashMap;

use super::types::{Analysis, ExcerptAnalysis};

/// The accumulated mapping from excerpt id to analysis across a whole run.
///
/// Ids are never removed. Writing an id that is already present replaces the
/// earlier analysis (last-writer-wins) — duplicate ids should not occur in a
/// valid input, so each overwrite is logged.
#[derive(Debug, Default)]
pub struct ScoreTable {
    entries: HashMap<String, Analysis>,
}

impl ScoreTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Absorb the parsed elements of one batch. Elements missing an id or an
    /// analysis are dropped — the service may omit an item. Returns the
    /// number of entries written.
    pub fn absorb(&mut self, items: Vec<ExcerptAnalysis>) -> usize {
        let mut written = 0;
        for item in items {
            let (Some(id), Some(analysis)) = (item.id, item.analysis) else {
                tracing::debug!("response element missing id or analysis, dropped");
                continue;
            };
            if self.entries.insert(id.clone(), analysis).is_some() {
                tracing::warn!(excerpt_id = %id, "duplicate excerpt id, keeping the newer analysis");
            }
            written += 1;
        }
        written
    }

    pub fn get(&self, id: &str) -> Option<&Analysis> {
        self.entries.get(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.entries.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
