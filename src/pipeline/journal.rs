use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

use super::ClassificationError;

/// Appends every prompt and raw model response of a run to a plain-text log
/// so a coding session can be audited after the fact.
///
/// Journal failures never abort a run; callers downgrade them to warnings.
pub struct PromptJournal {
    path: PathBuf,
}

impl PromptJournal {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Write the batch banner and the outgoing prompt.
    pub fn record_prompt(
        &self,
        batch_num: usize,
        total_batches: usize,
        prompt: &str,
    ) -> Result<(), ClassificationError> {
        let banner = format!(
            "\n{rule}\nBATCH {batch_num}/{total_batches} - {now}\n{rule}\n\n\
             ---------- PROMPT SENT TO MODEL ----------\n",
            rule = "=".repeat(80),
            now = chrono::Local::now().format("%Y-%m-%d %H:%M:%S"),
        );
        self.append(&banner)?;
        self.append(prompt)?;
        self.append("\n")
    }

    /// Write the full accumulated response text.
    pub fn record_response(&self, response: &str) -> Result<(), ClassificationError> {
        self.append("\n---------- FULL RESPONSE FROM MODEL ----------\n")?;
        self.append(response)?;
        self.append("\n")
    }

    fn append(&self, text: &str) -> Result<(), ClassificationError> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        file.write_all(text.as_bytes())?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn journal_appends_prompt_and_response_sections() {
        let dir = tempfile::tempdir().unwrap();
        let journal = PromptJournal::new(dir.path().join("prompt_log.txt"));

        journal.record_prompt(1, 3, "classify these excerpts").unwrap();
        journal.record_response("[{\"id\": \"N1\"}]").unwrap();
        journal.record_prompt(2, 3, "second batch").unwrap();

        let text = std::fs::read_to_string(journal.path()).unwrap();
        assert!(text.contains("BATCH 1/3"));
        assert!(text.contains("PROMPT SENT TO MODEL"));
        assert!(text.contains("classify these excerpts"));
        assert!(text.contains("FULL RESPONSE FROM MODEL"));
        assert!(text.contains("[{\"id\": \"N1\"}]"));
        assert!(text.contains("BATCH 2/3"));
    }

    #[test]
    fn unwritable_journal_path_errors() {
        let journal = PromptJournal::new(PathBuf::from("/nonexistent-dir/prompt_log.txt"));
        assert!(journal.record_prompt(1, 1, "p").is_err());
    }
}
