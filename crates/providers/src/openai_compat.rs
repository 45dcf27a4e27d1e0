//! OpenAI-compatible streaming provider.
//!
//! Works with OpenAI, OpenRouter, Ollama, vLLM, Groq and any other endpoint
//! that speaks `/v1/chat/completions` with `stream: true`.
//!
//! Tool-call fragments are forwarded as raw [`ToolCallDelta`]s. Assembling
//! them into whole invocations is the consumer's job.

use async_trait::async_trait;
use futures::{Stream, StreamExt};
use serde::{Deserialize, Serialize};
use supperclub_core::error::ProviderError;
use supperclub_core::message::{Message, Role};
use supperclub_core::provider::*;
use tokio::sync::mpsc;
use tracing::{debug, trace, warn};

/// An OpenAI-compatible streaming provider.
pub struct OpenAiCompatProvider {
    name: String,
    base_url: String,
    api_key: String,
    client: reqwest::Client,
}

impl OpenAiCompatProvider {
    /// Create a new OpenAI-compatible provider.
    pub fn new(
        name: impl Into<String>,
        base_url: impl Into<String>,
        api_key: impl Into<String>,
    ) -> Self {
        let client = reqwest::Client::builder()
            .connect_timeout(std::time::Duration::from_secs(30))
            .build()
            .unwrap_or_default();

        Self {
            name: name.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            client,
        }
    }

    /// Create an OpenAI provider (convenience constructor).
    pub fn openai(api_key: impl Into<String>) -> Self {
        Self::new("openai", "https://api.openai.com/v1", api_key)
    }

    /// Create an OpenRouter provider (convenience constructor).
    pub fn openrouter(api_key: impl Into<String>) -> Self {
        Self::new("openrouter", "https://openrouter.ai/api/v1", api_key)
    }

    /// Create an Ollama provider (convenience constructor).
    pub fn ollama(base_url: Option<&str>) -> Self {
        Self::new(
            "ollama",
            base_url.unwrap_or("http://localhost:11434/v1"),
            "ollama", // Ollama doesn't need a real key
        )
    }

    /// Convert our Message types to OpenAI API format.
    fn to_api_messages(messages: &[Message]) -> Vec<ApiMessage> {
        messages
            .iter()
            .map(|m| ApiMessage {
                role: match m.role {
                    Role::User => "user".into(),
                    Role::Assistant => "assistant".into(),
                    Role::System => "system".into(),
                    Role::Tool => "tool".into(),
                },
                content: Some(m.content.clone()),
                tool_calls: if m.tool_calls.is_empty() {
                    None
                } else {
                    Some(
                        m.tool_calls
                            .iter()
                            .map(|tc| ApiToolCall {
                                id: tc.id.clone(),
                                r#type: "function".into(),
                                function: ApiFunction {
                                    name: tc.name.clone(),
                                    arguments: tc.arguments.clone(),
                                },
                            })
                            .collect(),
                    )
                },
                tool_call_id: m.tool_call_id.clone(),
            })
            .collect()
    }

    /// Convert tool definitions to OpenAI API format.
    fn to_api_tools(tools: &[ToolDefinition]) -> Vec<ApiToolDefinition> {
        tools
            .iter()
            .map(|t| ApiToolDefinition {
                r#type: "function".into(),
                function: ApiToolFunction {
                    name: t.name.clone(),
                    description: t.description.clone(),
                    parameters: t.parameters.clone(),
                },
            })
            .collect()
    }

    /// Build the JSON body for a streaming completion.
    ///
    /// `tools` and `tool_choice` are omitted entirely when no tools are offered.
    fn request_body(request: &ProviderRequest) -> serde_json::Value {
        let mut body = serde_json::json!({
            "model": request.model,
            "messages": Self::to_api_messages(&request.messages),
            "temperature": request.temperature,
            "stream": true,
            "stream_options": { "include_usage": true },
        });

        if let Some(max_tokens) = request.max_tokens {
            body["max_tokens"] = serde_json::json!(max_tokens);
        }

        if !request.tools.is_empty() {
            body["tools"] = serde_json::json!(Self::to_api_tools(&request.tools));
            let choice = request.tool_choice.unwrap_or(ToolChoice::Auto);
            body["tool_choice"] = serde_json::json!(choice.as_str());
        }

        body
    }
}

/// What one SSE `data:` payload amounts to.
#[derive(Debug)]
enum SseData {
    /// A chunk worth forwarding
    Chunk(StreamChunk),
    /// The `[DONE]` sentinel
    Done,
    /// Keep-alives, empty deltas and anything unparseable
    Skip,
}

/// Decode the payload of one `data:` line.
fn decode_data(data: &str) -> SseData {
    let data = data.trim();
    if data == "[DONE]" {
        return SseData::Done;
    }

    let parsed = match serde_json::from_str::<StreamResponse>(data) {
        Ok(p) => p,
        Err(e) => {
            trace!(data = %data, error = %e, "Ignoring unparseable SSE chunk");
            return SseData::Skip;
        }
    };

    let mut chunk = StreamChunk {
        usage: parsed.usage.map(|u| Usage {
            prompt_tokens: u.prompt_tokens,
            completion_tokens: u.completion_tokens,
            total_tokens: u.total_tokens,
        }),
        ..StreamChunk::default()
    };

    if let Some(choice) = parsed.choices.into_iter().next() {
        chunk.content = choice.delta.content.filter(|c| !c.is_empty());
        chunk.tool_calls = choice
            .delta
            .tool_calls
            .unwrap_or_default()
            .into_iter()
            .map(|tc| {
                let (name, arguments) = match tc.function {
                    Some(f) => (f.name, f.arguments),
                    None => (None, None),
                };
                ToolCallDelta {
                    index: tc.index,
                    id: tc.id,
                    name,
                    arguments,
                }
            })
            .collect();
    }

    if chunk.content.is_none() && chunk.tool_calls.is_empty() && chunk.usage.is_none() {
        SseData::Skip
    } else {
        SseData::Chunk(chunk)
    }
}

fn status_error(status: u16, body: String) -> ProviderError {
    match status {
        429 => ProviderError::RateLimited {
            retry_after_secs: 5,
        },
        401 | 403 => ProviderError::AuthenticationFailed(
            "Invalid API key or insufficient permissions".into(),
        ),
        _ => ProviderError::ApiError {
            status_code: status,
            message: body,
        },
    }
}

/// Splits a byte stream into lines without decoding partial characters.
#[derive(Debug, Default)]
struct LineBuffer {
    pending: Vec<u8>,
}

impl LineBuffer {
    fn push(&mut self, bytes: &[u8]) {
        self.pending.extend_from_slice(bytes);
    }

    /// The next complete line, `\r\n` or `\n` terminated.
    fn next_line(&mut self) -> Option<String> {
        let end = self.pending.iter().position(|b| *b == b'\n')?;
        let line: Vec<u8> = self.pending.drain(..=end).collect();
        Some(decode_line(&line[..end]))
    }

    /// Whatever is left once the stream has closed.
    fn take_rest(&mut self) -> Option<String> {
        if self.pending.is_empty() {
            return None;
        }
        let rest = std::mem::take(&mut self.pending);
        Some(decode_line(&rest))
    }
}

fn decode_line(bytes: &[u8]) -> String {
    let text = match std::str::from_utf8(bytes) {
        Ok(text) => text.to_string(),
        Err(e) => {
            warn!(error = %e, "Invalid UTF-8 in SSE line");
            String::from_utf8_lossy(bytes).into_owned()
        }
    };
    text.trim_end_matches('\r').to_string()
}

/// What the reader should do after one SSE line.
enum LineOutcome {
    Continue,
    Done,
    ReceiverGone,
}

type ChunkSender = mpsc::Sender<Result<StreamChunk, ProviderError>>;

async fn handle_line(line: &str, tx: &ChunkSender) -> LineOutcome {
    // Skip empty lines and SSE comments
    if line.is_empty() || line.starts_with(':') {
        return LineOutcome::Continue;
    }
    let Some(data) = line.strip_prefix("data:") else {
        return LineOutcome::Continue;
    };

    match decode_data(data) {
        SseData::Done => LineOutcome::Done,
        SseData::Skip => LineOutcome::Continue,
        SseData::Chunk(chunk) => {
            if tx.send(Ok(chunk)).await.is_err() {
                LineOutcome::ReceiverGone
            } else {
                LineOutcome::Continue
            }
        }
    }
}

/// Read an SSE body and forward decoded chunks until `[DONE]`.
///
/// A body that ends before `[DONE]` is reported as
/// [`ProviderError::StreamInterrupted`].
async fn forward_sse<S, B, E>(body: S, tx: ChunkSender)
where
    S: Stream<Item = Result<B, E>>,
    B: AsRef<[u8]>,
    E: std::fmt::Display,
{
    let mut body = std::pin::pin!(body);
    let mut lines = LineBuffer::default();

    while let Some(chunk_result) = body.next().await {
        let bytes = match chunk_result {
            Ok(b) => b,
            Err(e) => {
                let _ = tx
                    .send(Err(ProviderError::StreamInterrupted(e.to_string())))
                    .await;
                return;
            }
        };
        lines.push(bytes.as_ref());

        while let Some(line) = lines.next_line() {
            match handle_line(&line, &tx).await {
                LineOutcome::Continue => {}
                LineOutcome::Done | LineOutcome::ReceiverGone => return,
            }
        }
    }

    // The body closed; a final line may lack its newline.
    if let Some(line) = lines.take_rest() {
        match handle_line(&line, &tx).await {
            LineOutcome::Continue => {}
            LineOutcome::Done | LineOutcome::ReceiverGone => return,
        }
    }

    warn!("Provider stream closed before [DONE]");
    let _ = tx
        .send(Err(ProviderError::StreamInterrupted(
            "stream ended before [DONE]".into(),
        )))
        .await;
}

#[async_trait]
impl supperclub_core::Provider for OpenAiCompatProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn stream(&self, request: ProviderRequest) -> Result<ChunkReceiver, ProviderError> {
        let url = format!("{}/chat/completions", self.base_url);
        let body = Self::request_body(&request);

        debug!(
            provider = %self.name,
            model = %request.model,
            tools = request.tools.len(),
            "Sending streaming request"
        );

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .header("Accept", "text/event-stream")
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ProviderError::Timeout(e.to_string())
                } else {
                    ProviderError::Network(e.to_string())
                }
            })?;

        let status = response.status().as_u16();
        if status != 200 {
            let error_body = response.text().await.unwrap_or_default();
            warn!(status, body = %error_body, "Provider streaming error");
            return Err(status_error(status, error_body));
        }

        let (tx, rx) = mpsc::channel(64);

        // Spawn task to read the SSE byte stream and forward chunks
        tokio::spawn(forward_sse(response.bytes_stream(), tx));

        Ok(rx)
    }
}

// --- OpenAI API types (internal) ---

#[derive(Debug, Serialize, Deserialize)]
struct ApiMessage {
    role: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_calls: Option<Vec<ApiToolCall>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_call_id: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
struct ApiToolCall {
    id: String,
    r#type: String,
    function: ApiFunction,
}

#[derive(Debug, Serialize, Deserialize)]
struct ApiFunction {
    name: String,
    arguments: String,
}

#[derive(Debug, Serialize, Deserialize)]
struct ApiToolDefinition {
    r#type: String,
    function: ApiToolFunction,
}

#[derive(Debug, Serialize, Deserialize)]
struct ApiToolFunction {
    name: String,
    description: String,
    parameters: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct ApiUsage {
    prompt_tokens: u32,
    completion_tokens: u32,
    total_tokens: u32,
}

// --- Streaming SSE types ---

/// A single SSE `data: {...}` chunk from a streaming response.
#[derive(Debug, Deserialize)]
struct StreamResponse {
    #[serde(default)]
    choices: Vec<StreamChoice>,
    #[serde(default)]
    usage: Option<ApiUsage>,
}

#[derive(Debug, Deserialize)]
struct StreamChoice {
    delta: StreamDelta,
}

#[derive(Debug, Deserialize)]
struct StreamDelta {
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    tool_calls: Option<Vec<StreamToolCallDelta>>,
}

/// A tool call delta. Arrives incrementally across chunks.
#[derive(Debug, Deserialize)]
struct StreamToolCallDelta {
    index: u32,
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    function: Option<StreamFunctionDelta>,
}

#[derive(Debug, Deserialize)]
struct StreamFunctionDelta {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    arguments: Option<String>,
}
