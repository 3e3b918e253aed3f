//! Pure derivations over a finished analysis: the threshold-binarized
//! multi-label view and the single dominant-emotion summary.

use serde::Serialize;

use super::types::Analysis;
use crate::codebook::{Codebook, Emotion};

/// Justification recorded for emotions the model did not score.
pub const MISSING_JUSTIFICATION: &str = "N/A";

/// Label used when no emotion meets the threshold.
pub const NEUTRAL_LABEL: &str = "neutral";

/// Placeholder justification for an empty analysis.
pub const NO_DOMINANT_JUSTIFICATION: &str = "No dominant emotion found.";

/// Binary presence flag and justification for one emotion of one excerpt.
#[derive(Debug, Clone, Serialize)]
pub struct EmotionFlag {
    pub emotion: Emotion,
    pub present: u8,
    pub justification: String,
}

/// The threshold-derived multi-label view of one excerpt.
#[derive(Debug, Clone, Serialize)]
pub struct DetailedRow {
    /// One flag per codebook emotion, in codebook order.
    pub flags: Vec<EmotionFlag>,
    pub final_classification: String,
    pub is_neutral: u8,
}

/// The dominant-emotion summary of one excerpt.
#[derive(Debug, Clone, Serialize)]
pub struct SummaryRow {
    pub top_emotion: String,
    pub top_score: f64,
    pub top_justification: String,
}

/// Binarize an analysis against `threshold`.
///
/// Every codebook emotion gets a flag; emotions the model skipped default to
/// score 0.0 with an "N/A" justification. A score equal to the threshold
/// counts as present. The final classification lists flagged emotions in
/// codebook order, or "neutral" when none is flagged.
pub fn detailed_row(analysis: &Analysis, codebook: &Codebook, threshold: f64) -> DetailedRow {
    let mut flags = Vec::with_capacity(codebook.len());
    let mut present_names: Vec<&'static str> = Vec::new();

    for emotion in codebook.emotions() {
        let (score, justification) = match analysis.get(emotion) {
            Some(scored) => (scored.score, scored.justification.clone()),
            None => (0.0, MISSING_JUSTIFICATION.to_string()),
        };
        let present = u8::from(score >= threshold);
        if present == 1 {
            present_names.push(emotion.as_str());
        }
        flags.push(EmotionFlag {
            emotion,
            present,
            justification,
        });
    }

    let (final_classification, is_neutral) = if present_names.is_empty() {
        (NEUTRAL_LABEL.to_string(), 1)
    } else {
        (present_names.join(", "), 0)
    };

    DetailedRow {
        flags,
        final_classification,
        is_neutral,
    }
}

/// Select the dominant emotion of an analysis.
///
/// A fold over the analysis in its own emission order: a later entry wins
/// only with a strictly greater score, so ties go to the emotion seen first.
/// An empty analysis yields the documented neutral default.
pub fn summary_row(analysis: &Analysis) -> SummaryRow {
    let mut best: Option<(Emotion, f64, &str)> = None;
    for (emotion, scored) in analysis.iter() {
        let beats = match best {
            Some((_, best_score, _)) => scored.score > best_score,
            None => true,
        };
        if beats {
            best = Some((emotion, scored.score, &scored.justification));
        }
    }

    match best {
        Some((emotion, score, justification)) => SummaryRow {
            top_emotion: emotion.as_str().to_string(),
            top_score: score,
            top_justification: justification.to_string(),
        },
        None => SummaryRow {
            top_emotion: NEUTRAL_LABEL.to_string(),
            top_score: 0.0,
            top_justification: NO_DOMINANT_JUSTIFICATION.to_string(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::types::ScoredJustification;

    fn analysis(entries: &[(Emotion, f64)]) -> Analysis {
        let mut a = Analysis::new();
        for (emotion, score) in entries {
            a.insert(
                *emotion,
                ScoredJustification {
                    score: *score,
                    justification: format!("{emotion} because"),
                },
            );
        }
        a
    }

    #[test]
    fn binary_flag_follows_inclusive_threshold() {
        let a = analysis(&[(Emotion::Anger, 0.4), (Emotion::Enjoyment, 0.9)]);
        let row = detailed_row(&a, &Codebook::builtin(), 0.5);

        let flag = |e: Emotion| row.flags.iter().find(|f| f.emotion == e).unwrap().present;
        assert_eq!(flag(Emotion::Anger), 0);
        assert_eq!(flag(Emotion::Enjoyment), 1);
        assert_eq!(row.final_classification, "enjoyment");
        assert_eq!(row.is_neutral, 0);
    }

    #[test]
    fn score_equal_to_threshold_counts_as_present() {
        let a = analysis(&[(Emotion::Fear, 0.5)]);
        let row = detailed_row(&a, &Codebook::builtin(), 0.5);
        let fear = row.flags.iter().find(|f| f.emotion == Emotion::Fear).unwrap();
        assert_eq!(fear.present, 1);
    }

    #[test]
    fn all_below_threshold_is_neutral() {
        let a = analysis(&[(Emotion::Anger, 0.2), (Emotion::Sadness, 0.49)]);
        let row = detailed_row(&a, &Codebook::builtin(), 0.5);
        assert_eq!(row.final_classification, "neutral");
        assert_eq!(row.is_neutral, 1);
        assert!(row.flags.iter().all(|f| f.present == 0));
    }

    #[test]
    fn final_classification_lists_flagged_emotions_in_codebook_order() {
        // Emit in reverse codebook order; the label must still follow the codebook.
        let a = analysis(&[
            (Emotion::Surprise, 0.8),
            (Emotion::Sadness, 0.7),
            (Emotion::Anger, 0.9),
        ]);
        let row = detailed_row(&a, &Codebook::builtin(), 0.5);
        assert_eq!(row.final_classification, "anger, sadness, surprise");
    }

    #[test]
    fn missing_emotions_default_to_zero_and_na() {
        let a = analysis(&[(Emotion::Anger, 0.9)]);
        let row = detailed_row(&a, &Codebook::builtin(), 0.5);
        let fear = row.flags.iter().find(|f| f.emotion == Emotion::Fear).unwrap();
        assert_eq!(fear.present, 0);
        assert_eq!(fear.justification, MISSING_JUSTIFICATION);
        // Every codebook emotion gets a flag regardless of the analysis.
        assert_eq!(row.flags.len(), Codebook::builtin().len());
    }

    #[test]
    fn top_emotion_is_argmax() {
        let a = analysis(&[
            (Emotion::Anger, 0.3),
            (Emotion::Enjoyment, 0.9),
            (Emotion::Fear, 0.5),
        ]);
        let row = summary_row(&a);
        assert_eq!(row.top_emotion, "enjoyment");
        assert_eq!(row.top_score, 0.9);
        assert_eq!(row.top_justification, "enjoyment because");
    }

    #[test]
    fn tie_goes_to_the_emotion_seen_first() {
        let a = analysis(&[(Emotion::Fear, 0.3), (Emotion::Sadness, 0.3)]);
        assert_eq!(summary_row(&a).top_emotion, "fear");

        let reversed = analysis(&[(Emotion::Sadness, 0.3), (Emotion::Fear, 0.3)]);
        assert_eq!(summary_row(&reversed).top_emotion, "sadness");
    }

    #[test]
    fn empty_analysis_yields_neutral_default() {
        let row = summary_row(&Analysis::new());
        assert_eq!(row.top_emotion, NEUTRAL_LABEL);
        assert_eq!(row.top_score, 0.0);
        assert_eq!(row.top_justification, NO_DOMINANT_JUSTIFICATION);
    }

    #[test]
    fn detailed_and_summary_agree_on_dominant_emotion() {
        let a = analysis(&[(Emotion::Disgust, 0.8), (Emotion::Anger, 0.6)]);
        let detailed = detailed_row(&a, &Codebook::builtin(), 0.5);
        let summary = summary_row(&a);
        assert!(detailed.final_classification.contains(&summary.top_emotion));
    }
}
