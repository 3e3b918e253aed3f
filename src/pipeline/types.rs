//! Core data types of the classification pipeline.
//!
//! These model the full lifecycle:
//! InputRecord → batch → raw model text → ExcerptAnalysis → ScoreTable.

use serde::de::Error as _;
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use super::ClassificationError;
use crate::codebook::Emotion;

/// One excerpt submitted for classification, as loaded from the record file.
///
/// `text` may be absent on the wire; such records never reach the model but
/// still appear in the raw stage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InputRecord {
    pub response_id: String,
    pub id: String,
    #[serde(default)]
    pub text: String,
}

/// Confidence score and justification for one emotion of one excerpt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredJustification {
    pub score: f64,
    pub justification: String,
}

/// Per-excerpt mapping from emotion to score and justification.
///
/// Entries keep the order the model emitted them in; that order is the
/// tie-break for the dominant-emotion selection, so it must survive both
/// parsing and re-serialization into the raw stage.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Analysis {
    entries: Vec<(Emotion, ScoredJustification)>,
}

impl Analysis {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace an entry. A replaced entry keeps its position.
    pub fn insert(&mut self, emotion: Emotion, scored: ScoredJustification) {
        match self.entries.iter_mut().find(|(e, _)| *e == emotion) {
            Some((_, existing)) => *existing = scored,
            None => self.entries.push((emotion, scored)),
        }
    }

    pub fn get(&self, emotion: Emotion) -> Option<&ScoredJustification> {
        self.entries
            .iter()
            .find(|(e, _)| *e == emotion)
            .map(|(_, s)| s)
    }

    /// Entries in emission order.
    pub fn iter(&self) -> impl Iterator<Item = (Emotion, &ScoredJustification)> {
        self.entries.iter().map(|(e, s)| (*e, s))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Clamp every score into [0,1], returning the emotions that needed it.
    pub fn clamp_scores(&mut self) -> Vec<Emotion> {
        let mut clamped = Vec::new();
        for (emotion, scored) in &mut self.entries {
            if !(0.0..=1.0).contains(&scored.score) {
                scored.score = scored.score.clamp(0.0, 1.0);
                clamped.push(*emotion);
            }
        }
        clamped
    }
}

impl Serialize for Analysis {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (emotion, scored) in &self.entries {
            map.serialize_entry(emotion.as_str(), scored)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for Analysis {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        // serde_json's map type keeps key order (preserve_order feature).
        let map = serde_json::Map::deserialize(deserializer)?;
        let mut analysis = Analysis::new();
        for (name, value) in map {
            let emotion = Emotion::from_str(&name)
                .ok_or_else(|| D::Error::custom(format!("unknown emotion '{name}'")))?;
            let scored: ScoredJustification =
                serde_json::from_value(value).map_err(D::Error::custom)?;
            analysis.insert(emotion, scored);
        }
        Ok(analysis)
    }
}

/// One element of the model's response list.
///
/// Both fields are optional on the wire: the service may omit an item or
/// return an id with no analysis. The aggregator drops incomplete elements.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExcerptAnalysis {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub analysis: Option<Analysis>,
}

/// Generative model abstraction (allows mocking the service in tests).
pub trait GenerativeClient {
    /// Send one prompt with a system instruction and return the full
    /// response text.
    fn generate(&self, prompt: &str, system: &str) -> Result<String, ClassificationError>;
}
