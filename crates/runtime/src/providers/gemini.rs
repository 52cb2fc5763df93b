//! Gemini `generateContent` gateway.

use crate::model::{FunctionCallIntent, GatewayError, Intent, ModelGateway};
use crate::tools::{Arguments, ToolDescriptor};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info};

pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_MODEL: &str = "gemini-2.5-flash";

// ─────────────────────────────────────────────────────────────────────────────
// API Wire Types
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct ApiRequest<'a> {
    contents: Vec<ApiContent>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools: Vec<ApiTool<'a>>,
}

#[derive(Debug, Serialize)]
struct ApiContent {
    role: &'static str,
    parts: Vec<ApiTextPart>,
}

#[derive(Debug, Serialize)]
struct ApiTextPart {
    text: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ApiTool<'a> {
    function_declarations: Vec<ApiFunctionDeclaration<'a>>,
}

#[derive(Debug, Serialize)]
struct ApiFunctionDeclaration<'a> {
    name: &'a str,
    description: &'a str,
    parameters: &'a Value,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiResponse {
    #[serde(default)]
    candidates: Vec<ApiCandidate>,
    #[serde(default)]
    prompt_feedback: Option<ApiPromptFeedback>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiPromptFeedback {
    #[serde(default)]
    block_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiCandidate {
    #[serde(default)]
    content: Option<ApiCandidateContent>,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiCandidateContent {
    #[serde(default)]
    parts: Vec<ApiResponsePart>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiResponsePart {
    #[serde(default)]
    text: Option<String>,
    #[serde(default)]
    function_call: Option<ApiFunctionCall>,
}

#[derive(Debug, Deserialize)]
struct ApiFunctionCall {
    name: String,
    #[serde(default)]
    args: Option<Arguments>,
}

// ─────────────────────────────────────────────────────────────────────────────
// Gateway Implementation
// ─────────────────────────────────────────────────────────────────────────────

/// Builder for [`GeminiGateway`].
#[derive(Debug, Clone)]
pub struct GeminiGatewayBuilder {
    api_key: String,
    model: String,
    base_url: String,
}

impl GeminiGatewayBuilder {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            model: DEFAULT_MODEL.to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn build(self) -> GeminiGateway {
        GeminiGateway {
            client: reqwest::Client::new(),
            api_key: self.api_key,
            model: self.model,
            base_url: self.base_url,
        }
    }
}

/// Gemini API gateway.
pub struct GeminiGateway {
    client: reqwest::Client,
    api_key: String,
    model: String,
    base_url: String,
}

impl GeminiGateway {
    pub fn builder(api_key: impl Into<String>) -> GeminiGatewayBuilder {
        GeminiGatewayBuilder::new(api_key)
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn endpoint(&self) -> String {
        let base = self.base_url.trim_end_matches('/');
        format!("{base}/models/{}:generateContent", self.model)
    }

    fn build_request<'a>(query: &str, tools: &'a [ToolDescriptor]) -> ApiRequest<'a> {
        let declarations: Vec<ApiFunctionDeclaration<'a>> = tools
            .iter()
            .map(|tool| ApiFunctionDeclaration {
                name: &tool.name,
                description: &tool.description,
                parameters: &tool.parameter_schema,
            })
            .collect();

        let tools = if declarations.is_empty() {
            Vec::new()
        } else {
            vec![ApiTool {
                function_declarations: declarations,
            }]
        };

        ApiRequest {
            contents: vec![ApiContent {
                role: "user",
                parts: vec![ApiTextPart {
                    text: query.to_string(),
                }],
            }],
            tools,
        }
    }

    /// Decide the intent from the first candidate's first part.
    fn response_to_intent(response: ApiResponse) -> Result<Intent, GatewayError> {
        let Some(candidate) = response.candidates.into_iter().next() else {
            let reason = response
                .prompt_feedback
                .and_then(|f| f.block_reason)
                .map_or_else(|| "no candidates".to_string(), |r| format!("prompt blocked: {r}"));
            return Err(GatewayError::InvalidResponse(reason));
        };

        let finish_reason = candidate.finish_reason.unwrap_or_default();
        let mut parts = candidate
            .content
            .map(|content| content.parts)
            .unwrap_or_default()
            .into_iter();
        let first = parts.next().ok_or_else(|| {
            GatewayError::InvalidResponse(format!(
                "candidate has no content parts (finish reason: {finish_reason})"
            ))
        })?;

        if let Some(call) = first.function_call {
            return Ok(Intent::FunctionCall(FunctionCallIntent::new(
                call.name,
                call.args.unwrap_or_default(),
            )));
        }

        let text = first
            .text
            .into_iter()
            .chain(parts.filter_map(|part| part.text))
            .collect::<Vec<_>>()
            .join("");
        Ok(Intent::PlainText(text))
    }
}

impl std::fmt::Display for GeminiGateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "gemini({})", self.model)
    }
}

impl ModelGateway for GeminiGateway {
    async fn interpret(
        &self,
        query: &str,
        tools: &[ToolDescriptor],
    ) -> Result<Intent, GatewayError> {
        let request = Self::build_request(query, tools);
        info!(model = %self.model, tools = tools.len(), "sending query to model");

        let response = self
            .client
            .post(self.endpoint())
            .header("x-goog-api-key", &self.api_key)
            .header("content-type", "application/json")
            .json(&request)
            .send()
            .await
            .map_err(|e| GatewayError::Network(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(GatewayError::Api(format!("{status}: {body}")));
        }

        let api_response: ApiResponse = response
            .json()
            .await
            .map_err(|e| GatewayError::InvalidResponse(e.to_string()))?;
        debug!(candidates = api_response.candidates.len(), "received model response");

        Self::response_to_intent(api_response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn intent_from(value: Value) -> Result<Intent, GatewayError> {
        GeminiGateway::response_to_intent(serde_json::from_value(value).unwrap())
    }

    #[test]
    fn display_and_endpoint() {
        let gateway = GeminiGateway::builder("key")
            .base_url("http://localhost:9999/v1beta/")
            .build();
        assert_eq!(gateway.to_string(), "gemini(gemini-2.5-flash)");
        assert_eq!(
            gateway.endpoint(),
            "http://localhost:9999/v1beta/models/gemini-2.5-flash:generateContent"
        );
    }

    #[test]
    fn request_carries_function_declarations() {
        let tools = vec![
            ToolDescriptor::new(
                "search_papers",
                "Search for papers on arXiv",
                json!({"type": "object", "properties": {"topic": {"type": "string"}}}),
            )
            .unwrap(),
        ];
        let body = serde_json::to_value(GeminiGateway::build_request("find llm papers", &tools))
            .unwrap();

        assert_eq!(body["contents"][0]["role"], "user");
        assert_eq!(body["contents"][0]["parts"][0]["text"], "find llm papers");
        let declaration = &body["tools"][0]["functionDeclarations"][0];
        assert_eq!(declaration["name"], "search_papers");
        assert_eq!(declaration["parameters"]["type"], "object");
    }

    #[test]
    fn request_without_tools_omits_key() {
        let body = serde_json::to_value(GeminiGateway::build_request("hi", &[])).unwrap();
        assert!(body.get("tools").is_none());
    }

    #[test]
    fn function_call_part_becomes_intent() {
        let intent = intent_from(json!({
            "candidates": [{
                "content": {"role": "model", "parts": [
                    {"functionCall": {"name": "search_papers", "args": {"topic": "x"}}},
                    {"text": "ignored"}
                ]},
                "finishReason": "STOP"
            }]
        }))
        .unwrap();

        let Intent::FunctionCall(call) = intent else {
            panic!("expected function call");
        };
        assert_eq!(call.name, "search_papers");
        assert_eq!(call.arguments.get("topic"), Some(&json!("x")));
    }

    #[test]
    fn call_in_second_part_is_not_consulted() {
        let intent = intent_from(json!({
            "candidates": [{"content": {"parts": [
                {"text": "Let me look."},
                {"functionCall": {"name": "extract_info", "args": {}}}
            ]}}]
        }))
        .unwrap();
        assert_eq!(intent, Intent::PlainText("Let me look.".into()));
    }

    #[test]
    fn text_parts_become_plain_text() {
        let intent = intent_from(json!({
            "candidates": [{"content": {"parts": [{"text": "Hello "}, {"text": "there"}]}}]
        }))
        .unwrap();
        assert_eq!(intent, Intent::PlainText("Hello there".into()));
    }

    #[test]
    fn missing_candidates_is_invalid() {
        let err = intent_from(json!({"promptFeedback": {"blockReason": "SAFETY"}})).unwrap_err();
        assert!(err.to_string().contains("SAFETY"));

        let err = intent_from(json!({"candidates": []})).unwrap_err();
        assert!(matches!(err, GatewayError::InvalidResponse(_)));
    }

    #[test]
    fn empty_candidate_is_invalid() {
        let err = intent_from(json!({"candidates": [{"finishReason": "MAX_TOKENS"}]})).unwrap_err();
        assert!(err.to_string().contains("MAX_TOKENS"));
    }
}
