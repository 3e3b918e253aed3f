//! The emotion codebook: the closed set of emotion categories and the
//! classification guidance handed to the model with every batch.
//!
//! Codebook order is significant — it is the column order of the detailed
//! table and the order emotions are listed in the final classification.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::pipeline::ClassificationError;

/// The seven emotion categories the coder recognizes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Emotion {
    Anger,
    Fear,
    Disgust,
    Sadness,
    Enjoyment,
    Surprise,
    Neutral,
}

impl Emotion {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Anger => "anger",
            Self::Fear => "fear",
            Self::Disgust => "disgust",
            Self::Sadness => "sadness",
            Self::Enjoyment => "enjoyment",
            Self::Surprise => "surprise",
            Self::Neutral => "neutral",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "anger" => Some(Self::Anger),
            "fear" => Some(Self::Fear),
            "disgust" => Some(Self::Disgust),
            "sadness" => Some(Self::Sadness),
            "enjoyment" => Some(Self::Enjoyment),
            "surprise" => Some(Self::Surprise),
            "neutral" => Some(Self::Neutral),
            _ => None,
        }
    }

    pub fn all() -> &'static [Emotion] {
        &[
            Self::Anger,
            Self::Fear,
            Self::Disgust,
            Self::Sadness,
            Self::Enjoyment,
            Self::Surprise,
            Self::Neutral,
        ]
    }
}

impl std::fmt::Display for Emotion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Classification guidance for one emotion.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmotionGuide {
    pub description: String,
    pub examples: Vec<String>,
    pub chain_of_thought: String,
}

/// One codebook entry: an emotion plus its guidance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CodebookEntry {
    pub emotion: Emotion,
    #[serde(flatten)]
    pub guide: EmotionGuide,
}

/// Ordered set of emotion categories with their guidance.
#[derive(Debug, Clone)]
pub struct Codebook {
    entries: Vec<CodebookEntry>,
}

impl Codebook {
    /// The built-in codebook used when no override file is given.
    ///
    /// Guidance wording follows the childcare-survey coding manual the tool
    /// was originally written for; override it with `load` for other studies.
    pub fn builtin() -> Self {
        let entry = |emotion: Emotion, description: &str, examples: &[&str], cot: &str| {
            CodebookEntry {
                emotion,
                guide: EmotionGuide {
                    description: description.to_string(),
                    examples: examples.iter().map(|s| s.to_string()).collect(),
                    chain_of_thought: cot.to_string(),
                },
            }
        };

        Self {
            entries: vec![
                entry(
                    Emotion::Anger,
                    "Any instance where the respondent feels blocked from pursuing a goal \
                     and/or treated unfairly.",
                    &[
                        "I still pay 100% of the fee per month regardless of whether my child attends.",
                        "It's SO hard to get a spot. The wait list I'm on is 2 years!",
                    ],
                    "Likely anger if the respondent exhibits behaviours ranging from \
                     dissatisfaction to strong forceful language, or is triggered by deliberate \
                     interference, injustice, betrayal, or observing a rule being broken.",
                ),
                entry(
                    Emotion::Fear,
                    "Any instance where the respondent feels the threat of physical, emotional, \
                     or psychological harm, real or imagined.",
                    &[
                        "We don't know what we will do for our youngest child when we need it.",
                        "Worried there will be such a shortage of good quality care.",
                    ],
                    "Likely fear if the respondent exhibits behaviours from worrying about the \
                     future to helplessness, or is triggered by a perceived threat to the \
                     well-being of themselves or others.",
                ),
                entry(
                    Emotion::Disgust,
                    "Any instance where the respondent feels aversion towards something \
                     offensive or socially/morally reprehensible.",
                    &[
                        "I don't trust facility owners. The ones I've heard of cut corners.",
                        "Government programs always suck.",
                    ],
                    "Likely disgust if the respondent exhibits behaviours from mild dislike to \
                     strong moral judgement, or is triggered by aversive objects or the \
                     perceived perversions or actions of other people.",
                ),
                entry(
                    Emotion::Sadness,
                    "Any instance where the respondent feels disappointment and longing or a \
                     sense of loss for someone or something.",
                    &[
                        "There are huge waitlists, I can't find spots for my younger children.",
                        "Cuts to resources; the centre may not be able to keep running.",
                    ],
                    "Likely sadness if the respondent exhibits behaviours from mild \
                     disappointment to despair, or is triggered by the loss of a valued person, \
                     object, or expectation.",
                ),
                entry(
                    Emotion::Enjoyment,
                    "Any instance where the respondent feels a sense of connection or pleasure.",
                    &[
                        "It cut my daycare cost in half.",
                        "The subsidy is a great relief to us.",
                    ],
                    "Likely enjoyment if the respondent exhibits pleasurable states, often \
                     marked by positive language such as 'love' or 'great', or is triggered by \
                     relief from suffering, achievement, or feeling connected.",
                ),
                entry(
                    Emotion::Surprise,
                    "Any instance where the respondent encounters sudden and unexpected \
                     changes or occurrences.",
                    &[
                        "My fees are $183 a month, which is unheard of from my friends.",
                    ],
                    "Likely surprise if the respondent exhibits the sensation of a sudden \
                     change, possibly transitioning into another emotion, or is triggered by \
                     sudden or unexpected events.",
                ),
                entry(
                    Emotion::Neutral,
                    "Any instance where the respondent states information without evidence of \
                     emotion.",
                    &["Not enough spaces.", "Staff shortages."],
                    "Likely neutral if the respondent provides factual information or \
                     observations lacking any clear emotional tone, with no personal feelings, \
                     opinions, or judgements about the situation.",
                ),
            ],
        }
    }

    /// Load a codebook override from a JSON file (array of entries).
    pub fn load(path: &Path) -> Result<Self, ClassificationError> {
        let text = std::fs::read_to_string(path).map_err(|e| {
            ClassificationError::Validation(format!(
                "cannot read codebook file {}: {e}",
                path.display()
            ))
        })?;
        let entries: Vec<CodebookEntry> = serde_json::from_str(&text).map_err(|e| {
            ClassificationError::Validation(format!(
                "codebook file {} is not a valid entry list: {e}",
                path.display()
            ))
        })?;
        if entries.is_empty() {
            return Err(ClassificationError::Validation(format!(
                "codebook file {} contains no entries",
                path.display()
            )));
        }
        for (i, entry) in entries.iter().enumerate() {
            if entries[..i].iter().any(|e| e.emotion == entry.emotion) {
                return Err(ClassificationError::Validation(format!(
                    "codebook file {} lists '{}' more than once",
                    path.display(),
                    entry.emotion
                )));
            }
        }
        Ok(Self { entries })
    }

    pub fn entries(&self) -> &[CodebookEntry] {
        &self.entries
    }

    /// Emotions in codebook order.
    pub fn emotions(&self) -> impl Iterator<Item = Emotion> + '_ {
        self.entries.iter().map(|e| e.emotion)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Render the codebook as the JSON object sent to the model,
    /// keyed by emotion name in codebook order.
    pub fn as_json(&self) -> serde_json::Value {
        let mut map = serde_json::Map::new();
        for entry in &self.entries {
            map.insert(
                entry.emotion.as_str().to_string(),
                serde_json::json!({
                    "description": entry.guide.description,
                    "examples": entry.guide.examples,
                    "chain_of_thought": entry.guide.chain_of_thought,
                }),
            );
        }
        serde_json::Value::Object(map)
    }
}
