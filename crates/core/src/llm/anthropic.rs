use crate::config::Settings;
use crate::domain::analysis::AnalysisResult;
use crate::domain::contract::LlmAnalysisResult;
use crate::llm::error::LlmDiagnosticsError;
use crate::llm::json;
use crate::llm::{AnalysisPrompt, LlmClient};
use anyhow::Context;
use reqwest::header::{HeaderMap, HeaderValue};
use serde::{Deserialize, Serialize};
use std::time::Duration;

const ANTHROPIC_VERSION: &str = "2023-06-01";
const DEFAULT_BASE_URL: &str = "https://api.anthropic.com";
const DEFAULT_MODEL: &str = "claude-3-5-sonnet-latest";
const DEFAULT_MAX_TOKENS: u32 = 2048;
const DEFAULT_TEMPERATURE: f64 = 0.2;
const DEFAULT_TIMEOUT_SECS: u64 = 60;

const TOOL_NAME_EMIT_VERDICT: &str = "emit_verdict";

#[derive(Debug, Clone)]
pub struct AnthropicClient {
    http: reqwest::Client,
    api_key: String,
    base_url: String,
    model: String,
    max_tokens: u32,
    temperature: f64,
}

impl AnthropicClient {
    pub fn from_settings(settings: &Settings) -> anyhow::Result<Self> {
        let api_key = settings.require_anthropic_api_key()?.to_string();
        let base_url =
            std::env::var("ANTHROPIC_BASE_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.to_string());
        let model = std::env::var("ANTHROPIC_MODEL").unwrap_or_else(|_| DEFAULT_MODEL.to_string());
        let max_tokens = std::env::var("ANTHROPIC_MAX_TOKENS")
            .ok()
            .and_then(|s| s.parse::<u32>().ok())
            .unwrap_or(DEFAULT_MAX_TOKENS);
        let temperature = std::env::var("ANTHROPIC_TEMPERATURE")
            .ok()
            .and_then(|s| s.parse::<f64>().ok())
            .unwrap_or(DEFAULT_TEMPERATURE);

        let timeout_secs = std::env::var("ANTHROPIC_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
            .unwrap_or(DEFAULT_TIMEOUT_SECS);

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .context("failed to build reqwest client")?;

        Ok(Self {
            http,
            api_key,
            base_url,
            model,
            max_tokens,
            temperature,
        })
    }

    async fn create_message(
        &self,
        req: CreateMessageRequest,
    ) -> anyhow::Result<CreateMessageResponse> {
        let mut headers = HeaderMap::new();
        headers.insert("x-api-key", HeaderValue::from_str(&self.api_key)?);
        headers.insert(
            "anthropic-version",
            HeaderValue::from_static(ANTHROPIC_VERSION),
        );

        let url = format!("{}/v1/messages", self.base_url.trim_end_matches('/'));
        let res = self
            .http
            .post(url)
            .headers(headers)
            .json(&req)
            .send()
            .await
            .context("Anthropic request failed")?;

        let status = res.status();
        let text = res
            .text()
            .await
            .context("failed to read Anthropic response body")?;
        if !status.is_success() {
            return Err(LlmDiagnosticsError {
                stage: "http",
                detail: format!("status={status}"),
                raw_output: Some(text),
            }
            .into());
        }

        serde_json::from_str::<CreateMessageResponse>(&text)
            .with_context(|| format!("failed to decode Anthropic response: {text}"))
    }

    fn tools() -> Vec<Tool> {
        // Strict schema for the verdict contract; timeframe_breakdown keys
        // are validated against the selection after parsing.
        let timeframe_schema = serde_json::json!({
            "type": "object",
            "additionalProperties": false,
            "required": ["probability", "sentiment", "strength", "reasoning"],
            "properties": {
                "probability": {"type": "number"},
                "sentiment": {"type": "string", "enum": ["BULLISH", "BEARISH", "NEUTRAL"]},
                "strength": {"type": "number"},
                "reasoning": {"type": "string"}
            }
        });
        let schema = serde_json::json!({
            "type": "object",
            "additionalProperties": false,
            "required": [
                "overall_probability", "recommendation", "confidence_level", "risk_level",
                "entry_strategy", "exit_strategy", "position_sizing",
                "market_sentiment_summary", "technical_summary", "timeframe_breakdown"
            ],
            "properties": {
                "overall_probability": {"type": "number"},
                "recommendation": {"type": "string", "enum": ["LONG", "SHORT", "NEUTRAL", "AVOID"]},
                "confidence_level": {"type": "number"},
                "risk_level": {"type": "string", "enum": ["LOW", "MEDIUM", "HIGH"]},
                "entry_strategy": {"type": "string"},
                "exit_strategy": {"type": "string"},
                "position_sizing": {"type": "string"},
                "market_sentiment_summary": {"type": "string"},
                "technical_summary": {"type": "string"},
                "timeframe_breakdown": {
                    "type": "object",
                    "additionalProperties": timeframe_schema
                }
            }
        });

        vec![Tool {
            name: TOOL_NAME_EMIT_VERDICT,
            description: "Emit the final trade verdict as structured JSON",
            input_schema: schema,
        }]
    }

    fn tool_choice() -> ToolChoice {
        ToolChoice::Tool {
            name: TOOL_NAME_EMIT_VERDICT,
        }
    }

    fn system_prompt(prompt: &AnalysisPrompt) -> String {
        [
            "You are a multi-timeframe forex analysis engine.".to_string(),
            "Return ONLY valid JSON. Do not wrap in markdown. Do not include any extra keys."
                .to_string(),
            "Use double quotes for all JSON strings. No trailing commas or comments.".to_string(),
            "Output schema:".to_string(),
            "{".to_string(),
            "  \"overall_probability\": 0.0,".to_string(),
            "  \"recommendation\": \"LONG|SHORT|NEUTRAL|AVOID\",".to_string(),
            "  \"confidence_level\": 0.0,".to_string(),
            "  \"risk_level\": \"LOW|MEDIUM|HIGH\",".to_string(),
            "  \"entry_strategy\": \"...\",".to_string(),
            "  \"exit_strategy\": \"...\",".to_string(),
            "  \"position_sizing\": \"...\",".to_string(),
            "  \"market_sentiment_summary\": \"...\",".to_string(),
            "  \"technical_summary\": \"...\",".to_string(),
            "  \"timeframe_breakdown\": {".to_string(),
            "    \"DAILY\": {\"probability\": 0.0, \"sentiment\": \"BULLISH|BEARISH|NEUTRAL\", \"strength\": 0.0, \"reasoning\": \"...\"}".to_string(),
            "  }".to_string(),
            "}".to_string(),
            "Rules:".to_string(),
            "- all probability/confidence/strength values are in [0, 100]".to_string(),
            format!(
                "- timeframe_breakdown must contain EXACTLY these keys: {}",
                prompt.selected_codes().join(", ")
            ),
            "- no other timeframes may appear".to_string(),
        ]
        .join("\n")
    }

    fn user_prompt(prompt: &AnalysisPrompt) -> String {
        let market = match &prompt.market_json {
            Some(v) => format!("\n\nMarket snapshot JSON:\n{v}"),
            None => String::new(),
        };
        format!(
            "Task: Produce a trade verdict for {} across timeframes [{}] from this \
             questionnaire summary.\n\nQuestionnaire JSON:\n{}{market}",
            prompt.pair,
            prompt.selected_codes().join(", "),
            prompt.questionnaire_json
        )
    }

    fn repair_prompt(prompt: &AnalysisPrompt, previous_output: &str) -> String {
        format!(
            "Your previous message did NOT match the verdict schema.\n\n\
TASK: Output ONLY a single JSON object that exactly matches the schema and rules.\n\
- Do NOT include any markdown, prose, or code fences.\n\
- recommendation must be one of LONG, SHORT, NEUTRAL, AVOID.\n\
- risk_level must be one of LOW, MEDIUM, HIGH.\n\
- timeframe_breakdown must contain exactly these keys: {}.\n\n\
INVALID OUTPUT (for reference only; DO NOT copy verbatim):\n{previous_output}",
            prompt.selected_codes().join(", ")
        )
    }

    fn response_text(res: &CreateMessageResponse) -> String {
        let mut out = String::new();
        for block in &res.content {
            if let ContentBlock::Text { text } = block {
                if !out.is_empty() {
                    out.push('\n');
                }
                out.push_str(text);
            }
        }
        out
    }

    fn response_tool_verdict(
        res: &CreateMessageResponse,
    ) -> anyhow::Result<Option<LlmAnalysisResult>> {
        for block in &res.content {
            if let ContentBlock::ToolUse { name, input, .. } = block {
                if name == TOOL_NAME_EMIT_VERDICT {
                    let parsed = serde_json::from_value::<LlmAnalysisResult>(input.clone())
                        .context("failed to decode tool_use.input into LlmAnalysisResult")?;
                    return Ok(Some(parsed));
                }
            }
        }
        Ok(None)
    }

    async fn try_parse_with_repairs(
        &self,
        prompt: &AnalysisPrompt,
        initial_text: String,
    ) -> anyhow::Result<AnalysisResult> {
        match json::parse_analysis(&initial_text, &prompt.pair, &prompt.selected_timeframes) {
            Ok(result) => Ok(result),
            Err(first_err) => {
                let mut last_err = first_err;
                let mut last_text = initial_text;

                for attempt in 1..=2u32 {
                    let repair_req = CreateMessageRequest {
                        model: self.model.clone(),
                        max_tokens: self.max_tokens,
                        temperature: self.temperature,
                        system: Some(Self::system_prompt(prompt)),
                        messages: vec![Message {
                            role: "user",
                            content: Self::repair_prompt(prompt, &last_text),
                        }],
                        tools: Some(Self::tools()),
                        tool_choice: Some(Self::tool_choice()),
                    };

                    let repair_res = self.create_message(repair_req).await?;
                    if let Some(verdict) = Self::response_tool_verdict(&repair_res)? {
                        return verdict
                            .validate_and_into_result(&prompt.pair, &prompt.selected_timeframes);
                    }
                    let repair_text = Self::response_text(&repair_res);
                    match json::parse_analysis(
                        &repair_text,
                        &prompt.pair,
                        &prompt.selected_timeframes,
                    ) {
                        Ok(result) => return Ok(result),
                        Err(err) => {
                            last_err = err;
                            last_text = repair_text;
                            tracing::warn!(
                                attempt,
                                pair = %prompt.pair,
                                error = %last_err,
                                "LLM output still invalid after repair attempt"
                            );
                        }
                    }
                }

                Err(LlmDiagnosticsError {
                    stage: "parse_after_repair",
                    detail: format!("final_error={last_err}"),
                    raw_output: Some(last_text),
                }
                .into())
            }
        }
    }
}

#[async_trait::async_trait]
impl LlmClient for AnthropicClient {
    fn model_name(&self) -> &str {
        &self.model
    }

    async fn generate_analysis(
        &self,
        prompt: &AnalysisPrompt,
    ) -> anyhow::Result<AnalysisResult> {
        let make_req = |max_tokens: u32| CreateMessageRequest {
            model: self.model.clone(),
            max_tokens,
            temperature: self.temperature,
            system: Some(Self::system_prompt(prompt)),
            messages: vec![Message {
                role: "user",
                content: Self::user_prompt(prompt),
            }],
            tools: Some(Self::tools()),
            tool_choice: Some(Self::tool_choice()),
        };

        let mut res = self.create_message(make_req(self.max_tokens)).await?;

        // If the model hit max_tokens, retry once with a higher ceiling.
        if matches!(res.stop_reason.as_deref(), Some("max_tokens")) {
            let bumped = self.max_tokens.saturating_mul(2).max(4096);
            tracing::warn!(
                pair = %prompt.pair,
                from = self.max_tokens,
                to = bumped,
                "Anthropic stop_reason=max_tokens; retrying once with higher max_tokens"
            );
            res = self.create_message(make_req(bumped)).await?;
        }

        // Tool output path.
        if let Some(verdict) = Self::response_tool_verdict(&res)? {
            return verdict.validate_and_into_result(&prompt.pair, &prompt.selected_timeframes);
        }

        // Fallback to text (should be rare).
        let text = Self::response_text(&res);
        self.try_parse_with_repairs(prompt, text).await
    }
}

#[derive(Debug, Clone, Serialize)]
struct CreateMessageRequest {
    model: String,
    max_tokens: u32,
    temperature: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<String>,
    messages: Vec<Message>,

    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<Vec<Tool>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_choice: Option<ToolChoice>,
}

#[derive(Debug, Clone, Serialize)]
struct Message {
    role: &'static str,
    content: String,
}

#[derive(Debug, Clone, Deserialize)]
struct CreateMessageResponse {
    content: Vec<ContentBlock>,

    #[serde(default)]
    stop_reason: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
struct Tool {
    name: &'static str,
    description: &'static str,
    input_schema: serde_json::Value,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type")]
enum ToolChoice {
    #[serde(rename = "tool")]
    Tool { name: &'static str },
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type")]
enum ContentBlock {
    #[serde(rename = "text")]
    Text { text: String },

    #[serde(rename = "tool_use")]
    ToolUse {
        #[serde(default)]
        id: String,
        #[serde(default)]
        name: String,
        #[serde(default)]
        input: serde_json::Value,
    },

    #[serde(other)]
    Unknown,
}
