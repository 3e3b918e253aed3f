use super::types::ExcerptAnalysis;
use super::ClassificationError;

/// Strip one optional markdown code fence from the response text.
///
/// Handles both ```json and bare ``` fences; text without a fence is
/// returned unchanged (trimmed).
pub fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();

    let inner = if let Some(start) = trimmed.find("```json") {
        let content_start = start + "```json".len();
        match trimmed[content_start..].find("```") {
            Some(end) => &trimmed[content_start..content_start + end],
            None => &trimmed[content_start..],
        }
    } else if let Some(rest) = trimmed.strip_prefix("```") {
        rest.strip_suffix("```").unwrap_or(rest)
    } else {
        trimmed
    };

    inner.trim()
}

/// Decode a model response into per-excerpt analyses.
///
/// The text must be a JSON list after unfencing; anything else is a `Parse`
/// error carrying the offending raw text. Elements that fail to decode
/// individually (wrong shape, unknown emotion, non-numeric score) are
/// dropped with a warning while the rest of the list survives. Scores are
/// clamped into [0,1] here, at the trust boundary.
pub fn parse_batch_response(raw: &str) -> Result<Vec<ExcerptAnalysis>, ClassificationError> {
    let cleaned = strip_code_fence(raw);

    let elements: Vec<serde_json::Value> =
        serde_json::from_str(cleaned).map_err(|e| ClassificationError::Parse {
            reason: format!("response is not a JSON list: {e}"),
            raw: raw.to_string(),
        })?;

    let mut items = Vec::with_capacity(elements.len());
    for (index, element) in elements.into_iter().enumerate() {
        match serde_json::from_value::<ExcerptAnalysis>(element) {
            Ok(mut item) => {
                if let Some(analysis) = item.analysis.as_mut() {
                    for emotion in analysis.clamp_scores() {
                        tracing::warn!(
                            excerpt_id = item.id.as_deref().unwrap_or("?"),
                            emotion = %emotion,
                            "score outside [0,1], clamped"
                        );
                    }
                }
                items.push(item);
            }
            Err(e) => {
                tracing::warn!(index, error = %e, "dropping malformed response element");
            }
        }
    }

    Ok(items)
}
