use super::types::InputRecord;
use crate::codebook::Codebook;

pub const CLASSIFICATION_SYSTEM_PROMPT: &str = "You are an expert research assistant \
specializing in the analysis of emotions in text. Your task is to meticulously classify \
the specific emotions conveyed in excerpts from survey responses. For each excerpt, you \
must provide a confidence score and a detailed justification for each emotion listed in \
the provided codebook. Adhere strictly to the codebook definitions and the required JSON \
output format.";

/// Build the classification prompt for one batch.
///
/// The payload strips everything the model does not need (the response
/// grouping id stays out of the wire format). Output is deterministic for a
/// given batch, codebook, and question.
pub fn build_batch_prompt(batch: &[InputRecord], codebook: &Codebook, question: &str) -> String {
    let excerpts: Vec<serde_json::Value> = batch
        .iter()
        .map(|record| serde_json::json!({ "id": record.id, "text": record.text }))
        .collect();
    let payload = serde_json::json!({
        "question_asked": question,
        "excerpts_to_classify": excerpts,
    });

    // Pretty-printing a json! literal cannot fail.
    let payload_json = serde_json::to_string_pretty(&payload).expect("serializable payload");
    let codebook_json =
        serde_json::to_string_pretty(&codebook.as_json()).expect("serializable codebook");

    let mut emotion_lines = String::new();
    let last = codebook.len().saturating_sub(1);
    for (i, entry) in codebook.entries().iter().enumerate() {
        let comma = if i == last { "" } else { "," };
        emotion_lines.push_str(&format!(
            "      \"{}\": {{\"score\": 0.xx, \"justification\": \"...\"}}{comma}\n",
            entry.emotion
        ));
    }

    format!(
        "The following JSON object contains a batch of excerpts from survey responses. \
         Analyze each excerpt individually.\n\n\
         {payload_json}\n\n\
         CODEBOOK:\n{codebook_json}\n\n\
         For EACH excerpt, provide your analysis as a JSON object. Return your complete \
         analysis as a single, valid JSON list, where each object corresponds to one input \
         excerpt and uses the following format:\n\n\
         [\n  {{\n    \"id\": \"(The ID of the first excerpt)\",\n    \"analysis\": {{\n\
         {emotion_lines}    }}\n  }}\n]\n\n\
         Ensure the output is ONLY the JSON list, without any surrounding text or markdown."
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(id: &str, text: &str) -> InputRecord {
        InputRecord {
            response_id: "R1".into(),
            id: id.into(),
            text: text.into(),
        }
    }

    #[test]
    fn prompt_contains_excerpts_and_question() {
        let batch = vec![record("N1", "waitlists are endless"), record("N2", "great relief")];
        let prompt = build_batch_prompt(&batch, &Codebook::builtin(), "Describe the challenges.");
        assert!(prompt.contains("waitlists are endless"));
        assert!(prompt.contains("great relief"));
        assert!(prompt.contains("Describe the challenges."));
        assert!(prompt.contains("\"N1\""));
    }

    #[test]
    fn prompt_strips_response_grouping_id() {
        let batch = vec![record("N1", "some text")];
        let prompt = build_batch_prompt(&batch, &Codebook::builtin(), "");
        assert!(!prompt.contains("response_id"));
        assert!(!prompt.contains("R1"));
    }

    #[test]
    fn format_skeleton_covers_every_codebook_emotion() {
        let codebook = Codebook::builtin();
        let prompt = build_batch_prompt(&[record("N1", "t")], &codebook, "");
        for entry in codebook.entries() {
            assert!(
                prompt.contains(&format!("\"{}\": {{\"score\"", entry.emotion)),
                "missing format line for {}",
                entry.emotion
            );
        }
    }

    #[test]
    fn prompt_is_deterministic() {
        let batch = vec![record("N1", "text")];
        let codebook = Codebook::builtin();
        let a = build_batch_prompt(&batch, &codebook, "Q");
        let b = build_batch_prompt(&batch, &codebook, "Q");
        assert_eq!(a, b);
    }

    #[test]
    fn prompt_demands_bare_json_list() {
        let prompt = build_batch_prompt(&[record("N1", "t")], &Codebook::builtin(), "");
        assert!(prompt.contains("ONLY the JSON list"));
        assert!(prompt.contains("without any surrounding text or markdown"));
    }

    #[test]
    fn system_prompt_pins_codebook_adherence() {
        assert!(CLASSIFICATION_SYSTEM_PROMPT.contains("codebook"));
        assert!(CLASSIFICATION_SYSTEM_PROMPT.contains("JSON"));
    }
}
