use crate::domain::analysis::AnalysisResult;
use crate::domain::contract::LlmAnalysisResult;
use crate::domain::questionnaire::Timeframe;
use anyhow::Context;

/// Best-effort extraction of a single JSON object from model text: strips
/// Markdown fences first, then falls back to the outermost brace window.
pub fn extract_json(text: &str) -> Option<String> {
    let trimmed = text.trim();

    if let Some(rest) = trimmed.strip_prefix("```") {
        let body = rest.split_once('\n').map(|(_, b)| b).unwrap_or(rest);
        let inner = match body.rfind("```") {
            Some(end) => &body[..end],
            None => body,
        };
        return Some(inner.trim().to_string());
    }

    let start = trimmed.find('{')?;
    let end = trimmed.rfind('}')?;
    if end <= start {
        return None;
    }
    Some(trimmed[start..=end].trim().to_string())
}

pub fn parse_analysis(
    text: &str,
    pair: &str,
    selected: &[Timeframe],
) -> anyhow::Result<AnalysisResult> {
    let json_str = extract_json(text).unwrap_or_else(|| text.trim().to_string());
    let parsed = serde_json::from_str::<LlmAnalysisResult>(&json_str)
        .with_context(|| format!("LLM output is not valid JSON for the verdict schema: {json_str}"))?;
    parsed.validate_and_into_result(pair, selected)
}
