//! JSON Lines persistence for the three stages: input records, the raw
//! score table, and the derived detailed/summary tables.

use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::codebook::Codebook;
use crate::pipeline::{
    detailed_row, summary_row, Analysis, ClassificationError, InputRecord, ScoreTable,
};

/// One row of the raw stage: the original record fields plus the serialized
/// analysis for ids that received one.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawRow {
    pub response_id: String,
    pub id: String,
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model_response: Option<String>,
}

/// Load and validate the input record file.
///
/// Every line must carry `response_id` and `id`; a malformed line is fatal.
/// Records with empty or missing text are kept here — the runner excludes
/// them from batching, but they still appear in the raw stage.
pub fn load_input_records(path: &Path) -> Result<Vec<InputRecord>, ClassificationError> {
    let file = File::open(path).map_err(|e| {
        ClassificationError::Validation(format!("cannot read input file {}: {e}", path.display()))
    })?;

    let mut records = Vec::new();
    for (line_num, line) in BufReader::new(file).lines().enumerate() {
        let line = line.map_err(|e| {
            ClassificationError::Validation(format!(
                "cannot read input file {}: {e}",
                path.display()
            ))
        })?;
        if line.trim().is_empty() {
            continue;
        }
        let record: InputRecord = serde_json::from_str(&line).map_err(|e| {
            ClassificationError::Validation(format!(
                "line {} of {} is not a valid record: {e}",
                line_num + 1,
                path.display()
            ))
        })?;
        records.push(record);
    }
    Ok(records)
}

/// Timestamped raw-stage path for an input file, e.g.
/// `output_files/raw_scores_responses_2026-08-05_14-30-00.jsonl`.
pub fn raw_stage_path(output_dir: &Path, input_path: &Path) -> PathBuf {
    let stem = input_path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("records");
    let timestamp = chrono::Local::now().format("%Y-%m-%d_%H-%M-%S");
    output_dir.join(format!("raw_scores_{stem}_{timestamp}.jsonl"))
}

/// Persist the raw stage: one row per input record, carrying the serialized
/// analysis where the score table has one.
pub fn write_raw_stage(
    records: &[InputRecord],
    table: &ScoreTable,
    path: &Path,
) -> Result<(), ClassificationError> {
    let file = File::create(path).map_err(|e| {
        ClassificationError::OutputWrite(format!("cannot create {}: {e}", path.display()))
    })?;
    let mut writer = BufWriter::new(file);

    for record in records {
        let model_response = match table.get(&record.id) {
            Some(analysis) => Some(serde_json::to_string(analysis).map_err(|e| {
                ClassificationError::OutputWrite(format!("cannot serialize analysis: {e}"))
            })?),
            None => None,
        };
        let row = RawRow {
            response_id: record.response_id.clone(),
            id: record.id.clone(),
            text: record.text.clone(),
            model_response,
        };
        write_json_line(&mut writer, &row, path)?;
    }
    writer.flush().map_err(|e| {
        ClassificationError::OutputWrite(format!("cannot write {}: {e}", path.display()))
    })?;

    tracing::info!(path = %path.display(), rows = records.len(), "raw stage written");
    Ok(())
}

/// Load a previously written raw stage. Unreadable or ill-shaped files are
/// fatal — the derivation stage never produces partial results from bad
/// input.
pub fn load_raw_stage(path: &Path) -> Result<Vec<RawRow>, ClassificationError> {
    let file = File::open(path).map_err(|e| {
        ClassificationError::Validation(format!("cannot read raw file {}: {e}", path.display()))
    })?;

    let mut rows = Vec::new();
    for (line_num, line) in BufReader::new(file).lines().enumerate() {
        let line = line.map_err(|e| {
            ClassificationError::Validation(format!("cannot read raw file {}: {e}", path.display()))
        })?;
        if line.trim().is_empty() {
            continue;
        }
        let row: RawRow = serde_json::from_str(&line).map_err(|e| {
            ClassificationError::Validation(format!(
                "line {} of {} is not a valid raw row: {e}",
                line_num + 1,
                path.display()
            ))
        })?;
        rows.push(row);
    }
    Ok(rows)
}

/// Sibling output paths for the two derived tables of a raw file.
#[derive(Debug, Clone)]
pub struct DerivedPaths {
    pub detailed: PathBuf,
    pub summary: PathBuf,
}

pub fn derived_paths(raw_path: &Path, threshold: f64) -> DerivedPaths {
    let stem = raw_path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("raw");
    let dir = raw_path.parent().unwrap_or_else(|| Path::new("."));
    let threshold_label = threshold.to_string().replace('.', "");
    DerivedPaths {
        detailed: dir.join(format!("{stem}_detailed_t{threshold_label}.jsonl")),
        summary: dir.join(format!("{stem}_top_emotion.jsonl")),
    }
}

/// Row counts of one derivation pass.
#[derive(Debug, Clone, Copy, Default)]
pub struct DerivedStats {
    pub rows: usize,
    pub skipped: usize,
}

/// Derive and persist the detailed and top-emotion tables.
///
/// Rows without a model response are skipped; a row whose stored analysis no
/// longer parses is skipped with a warning (it contributes to neither
/// table). Both tables are written even when empty.
pub fn write_derived_stage(
    rows: &[RawRow],
    codebook: &Codebook,
    threshold: f64,
    paths: &DerivedPaths,
) -> Result<DerivedStats, ClassificationError> {
    let mut detailed_writer = create_writer(&paths.detailed)?;
    let mut summary_writer = create_writer(&paths.summary)?;
    let mut stats = DerivedStats::default();

    for row in rows {
        let Some(serialized) = row.model_response.as_deref() else {
            continue;
        };
        let analysis: Analysis = match serde_json::from_str(serialized) {
            Ok(analysis) => analysis,
            Err(e) => {
                stats.skipped += 1;
                tracing::warn!(excerpt_id = %row.id, error = %e, "stored analysis no longer parses, row skipped");
                continue;
            }
        };

        let detailed = detailed_row(&analysis, codebook, threshold);
        let mut detailed_object = base_fields(row);
        detailed_object.insert(
            "final_classification".into(),
            detailed.final_classification.into(),
        );
        detailed_object.insert("is_neutral".into(), detailed.is_neutral.into());
        for flag in &detailed.flags {
            detailed_object.insert(format!("{}_binary", flag.emotion), flag.present.into());
            detailed_object.insert(
                format!("{}_justification", flag.emotion),
                flag.justification.clone().into(),
            );
        }
        write_json_line(
            &mut detailed_writer,
            &serde_json::Value::Object(detailed_object),
            &paths.detailed,
        )?;

        let summary = summary_row(&analysis);
        let mut summary_object = base_fields(row);
        summary_object.insert("top_emotion".into(), summary.top_emotion.into());
        summary_object.insert("top_score".into(), summary.top_score.into());
        summary_object.insert("top_justification".into(), summary.top_justification.into());
        write_json_line(
            &mut summary_writer,
            &serde_json::Value::Object(summary_object),
            &paths.summary,
        )?;

        stats.rows += 1;
    }

    for (writer, path) in [
        (&mut detailed_writer, &paths.detailed),
        (&mut summary_writer, &paths.summary),
    ] {
        writer.flush().map_err(|e| {
            ClassificationError::OutputWrite(format!("cannot write {}: {e}", path.display()))
        })?;
    }

    tracing::info!(
        detailed = %paths.detailed.display(),
        summary = %paths.summary.display(),
        rows = stats.rows,
        skipped = stats.skipped,
        "derived tables written"
    );
    Ok(stats)
}

fn base_fields(row: &RawRow) -> serde_json::Map<String, serde_json::Value> {
    let mut map = serde_json::Map::new();
    map.insert("response_id".into(), row.response_id.clone().into());
    map.insert("id".into(), row.id.clone().into());
    map.insert("text".into(), row.text.clone().into());
    map
}

fn create_writer(path: &Path) -> Result<BufWriter<File>, ClassificationError> {
    let file = File::create(path).map_err(|e| {
        ClassificationError::OutputWrite(format!("cannot create {}: {e}", path.display()))
    })?;
    Ok(BufWriter::new(file))
}

fn write_json_line<W: Write, T: Serialize>(
    writer: &mut W,
    value: &T,
    path: &Path,
) -> Result<(), ClassificationError> {
    let line = serde_json::to_string(value).map_err(|e| {
        ClassificationError::OutputWrite(format!("cannot serialize row: {e}"))
    })?;
    writeln!(writer, "{line}").map_err(|e| {
        ClassificationError::OutputWrite(format!("cannot write {}: {e}", path.display()))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codebook::Emotion;
    use crate::pipeline::{ExcerptAnalysis, ScoredJustification};

    fn write_lines(dir: &Path, name: &str, lines: &[&str]) -> PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, lines.join("\n")).unwrap();
        path
    }

    fn analysis_json(entries: &[(&str, f64)]) -> String {
        let items: Vec<String> = entries
            .iter()
            .map(|(name, score)| {
                format!(r#""{name}": {{"score": {score}, "justification": "{name} seen"}}"#)
            })
            .collect();
        format!("{{{}}}", items.join(","))
    }

    #[test]
    fn loads_valid_input_records() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_lines(
            dir.path(),
            "records.jsonl",
            &[
                r#"{"response_id": "R1", "id": "N1", "text": "first"}"#,
                "",
                r#"{"response_id": "R2", "id": "N2", "text": ""}"#,
            ],
        );
        let records = load_input_records(&path).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].id, "N1");
        // Empty text is kept at load time; exclusion happens before batching.
        assert_eq!(records[1].text, "");
    }

    #[test]
    fn record_missing_required_field_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_lines(
            dir.path(),
            "records.jsonl",
            &[r#"{"response_id": "R1", "text": "no id"}"#],
        );
        let result = load_input_records(&path);
        assert!(matches!(result, Err(ClassificationError::Validation(_))));
    }

    #[test]
    fn record_missing_text_loads_as_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_lines(
            dir.path(),
            "records.jsonl",
            &[r#"{"response_id": "R1", "id": "N1"}"#],
        );
        let records = load_input_records(&path).unwrap();
        assert_eq!(records[0].text, "");
    }

    #[test]
    fn missing_input_file_is_fatal() {
        let result = load_input_records(Path::new("/nonexistent/records.jsonl"));
        assert!(matches!(result, Err(ClassificationError::Validation(_))));
    }

    #[test]
    fn raw_stage_round_trips_and_keeps_unscored_rows() {
        let dir = tempfile::tempdir().unwrap();
        let records = vec![
            InputRecord {
                response_id: "R1".into(),
                id: "N1".into(),
                text: "first".into(),
            },
            InputRecord {
                response_id: "R2".into(),
                id: "N2".into(),
                text: "second".into(),
            },
        ];

        let mut table = ScoreTable::new();
        let mut analysis = Analysis::new();
        analysis.insert(
            Emotion::Enjoyment,
            ScoredJustification {
                score: 0.9,
                justification: "relief".into(),
            },
        );
        table.absorb(vec![ExcerptAnalysis {
            id: Some("N1".into()),
            analysis: Some(analysis),
        }]);

        let path = dir.path().join("raw.jsonl");
        write_raw_stage(&records, &table, &path).unwrap();

        let rows = load_raw_stage(&path).unwrap();
        assert_eq!(rows.len(), 2);
        assert!(rows[0].model_response.is_some());
        assert!(rows[1].model_response.is_none());

        let stored: Analysis = serde_json::from_str(rows[0].model_response.as_ref().unwrap()).unwrap();
        assert_eq!(stored.get(Emotion::Enjoyment).unwrap().score, 0.9);
    }

    #[test]
    fn derived_paths_encode_threshold_without_dot() {
        let paths = derived_paths(Path::new("out/raw_scores_x.jsonl"), 0.5);
        assert!(paths.detailed.ends_with("raw_scores_x_detailed_t05.jsonl"));
        assert!(paths.summary.ends_with("raw_scores_x_top_emotion.jsonl"));
    }

    #[test]
    fn derived_stage_flattens_per_emotion_columns() {
        let dir = tempfile::tempdir().unwrap();
        let rows = vec![RawRow {
            response_id: "R1".into(),
            id: "N1".into(),
            text: "the subsidy is a relief".into(),
            model_response: Some(analysis_json(&[("anger", 0.1), ("enjoyment", 0.9)])),
        }];
        let paths = DerivedPaths {
            detailed: dir.path().join("detailed.jsonl"),
            summary: dir.path().join("summary.jsonl"),
        };
        let stats = write_derived_stage(&rows, &Codebook::builtin(), 0.5, &paths).unwrap();
        assert_eq!(stats.rows, 1);
        assert_eq!(stats.skipped, 0);

        let detailed_text = std::fs::read_to_string(&paths.detailed).unwrap();
        let detailed: serde_json::Value = serde_json::from_str(detailed_text.trim()).unwrap();
        assert_eq!(detailed["final_classification"], "enjoyment");
        assert_eq!(detailed["is_neutral"], 0);
        assert_eq!(detailed["enjoyment_binary"], 1);
        assert_eq!(detailed["anger_binary"], 0);
        assert_eq!(detailed["fear_binary"], 0);
        assert_eq!(detailed["fear_justification"], "N/A");

        let summary_text = std::fs::read_to_string(&paths.summary).unwrap();
        let summary: serde_json::Value = serde_json::from_str(summary_text.trim()).unwrap();
        assert_eq!(summary["top_emotion"], "enjoyment");
        assert_eq!(summary["top_score"], 0.9);
        assert_eq!(summary["response_id"], "R1");
    }

    #[test]
    fn unparseable_stored_analysis_skips_only_that_row() {
        let dir = tempfile::tempdir().unwrap();
        let rows = vec![
            RawRow {
                response_id: "R1".into(),
                id: "N1".into(),
                text: "a".into(),
                model_response: Some("{broken".into()),
            },
            RawRow {
                response_id: "R1".into(),
                id: "N2".into(),
                text: "b".into(),
                model_response: Some(analysis_json(&[("fear", 0.7)])),
            },
            RawRow {
                response_id: "R1".into(),
                id: "N3".into(),
                text: "c".into(),
                model_response: None,
            },
        ];
        let paths = DerivedPaths {
            detailed: dir.path().join("detailed.jsonl"),
            summary: dir.path().join("summary.jsonl"),
        };
        let stats = write_derived_stage(&rows, &Codebook::builtin(), 0.5, &paths).unwrap();
        assert_eq!(stats.rows, 1);
        assert_eq!(stats.skipped, 1);

        let detailed_text = std::fs::read_to_string(&paths.detailed).unwrap();
        assert_eq!(detailed_text.lines().count(), 1);
        assert!(detailed_text.contains("\"N2\""));
    }

    #[test]
    fn ill_shaped_raw_file_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_lines(dir.path(), "raw.jsonl", &["not json at all"]);
        let result = load_raw_stage(&path);
        assert!(matches!(result, Err(ClassificationError::Validation(_))));
    }
}
