//! The orchestration loop.
//!
//! One run drives rounds of: build context, stream a completion, accumulate
//! tool calls, execute them, append results. It stops on a round with no tool
//! calls, on a provider failure, or when the round budget runs out.

use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use serde_json::Value;
use supperclub_config::AppConfig;
use supperclub_core::error::{ProviderError, ToolError};
use supperclub_core::event::{DomainEvent, EventBus};
use supperclub_core::message::Message;
use supperclub_core::provider::{Provider, ProviderRequest, ToolChoice, ToolDefinition, Usage};
use supperclub_core::tool::{ToolCall, ToolContext, ToolRegistry};
use thiserror::Error;
use tokio::sync::mpsc;
use tracing::{debug, info, trace, warn};

use crate::accumulator::{PendingInvocation, ToolCallAccumulator};
use crate::context::{ContextMode, PresentationPolicy, build_context};
use crate::session::Session;
use crate::stream_event::AgentStreamEvent;

/// Why a run ended without a final answer.
#[derive(Debug, Clone, Error)]
pub enum RunError {
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    #[error("Agent reached maximum iterations ({0}) without completing.")]
    MaxIterations(u32),

    #[error("Caller disconnected")]
    Disconnected,
}

/// Summary of a successful run.
#[derive(Debug, Clone, PartialEq)]
pub struct RunOutcome {
    pub final_text: String,
    pub iterations: u32,
    pub tool_calls_made: usize,
}

enum LoopState {
    AwaitingModel,
    ExecutingTools(Vec<PendingInvocation>),
    Done(String),
    Failed(RunError),
}

struct Round {
    content: String,
    calls: Vec<PendingInvocation>,
    usage: Option<Usage>,
}

/// Forwards events to the caller and remembers once the caller is gone.
struct Emitter<'a> {
    tx: &'a mpsc::Sender<AgentStreamEvent>,
    closed: bool,
}

impl<'a> Emitter<'a> {
    fn new(tx: &'a mpsc::Sender<AgentStreamEvent>) -> Self {
        Self { tx, closed: false }
    }

    async fn send(&mut self, event: AgentStreamEvent) {
        if self.closed {
            return;
        }
        if self.tx.send(event).await.is_err() {
            debug!("Event receiver dropped, no longer forwarding");
            self.closed = true;
        }
    }

    fn is_closed(&self) -> bool {
        self.closed || self.tx.is_closed()
    }
}

/// The core agent loop that orchestrates LLM calls and tool execution.
pub struct AgentLoop {
    /// The LLM provider to use
    provider: Arc<dyn Provider>,

    /// The model to use
    model: String,

    /// Temperature setting
    temperature: f32,

    /// Max tokens per response
    max_tokens: Option<u32>,

    /// Tool registry
    tools: Arc<ToolRegistry>,

    /// Declarations offered in full-context rounds
    definitions: Vec<ToolDefinition>,

    /// Maximum model rounds per run
    max_iterations: u32,

    /// When and how to compact the context
    presentation: PresentationPolicy,

    /// Event bus for domain events
    event_bus: Arc<EventBus>,
}

impl AgentLoop {
    pub fn new(
        provider: Arc<dyn Provider>,
        model: impl Into<String>,
        temperature: f32,
        tools: Arc<ToolRegistry>,
        event_bus: Arc<EventBus>,
    ) -> Self {
        let definitions = tools.definitions();
        Self {
            provider,
            model: model.into(),
            temperature,
            max_tokens: None,
            tools,
            definitions,
            max_iterations: 15,
            presentation: PresentationPolicy::default(),
            event_bus,
        }
    }

    /// Build a loop with the model, limits and presentation policy from `config`.
    pub fn from_config(
        config: &AppConfig,
        provider: Arc<dyn Provider>,
        tools: Arc<ToolRegistry>,
        event_bus: Arc<EventBus>,
    ) -> Self {
        Self::new(
            provider,
            config.default_model.clone(),
            config.default_temperature,
            tools,
            event_bus,
        )
        .with_max_tokens(config.default_max_tokens)
        .with_max_iterations(config.agent.max_iterations)
        .with_presentation(PresentationPolicy::from_config(&config.agent))
    }

    pub fn with_max_iterations(mut self, max: u32) -> Self {
        self.max_iterations = max;
        self
    }

    pub fn with_max_tokens(mut self, max: u32) -> Self {
        self.max_tokens = Some(max);
        self
    }

    pub fn with_presentation(mut self, policy: PresentationPolicy) -> Self {
        self.presentation = policy;
        self
    }

    pub fn event_bus(&self) -> &Arc<EventBus> {
        &self.event_bus
    }

    pub fn tools(&self) -> &Arc<ToolRegistry> {
        &self.tools
    }

    /// Run rounds against `session` until the model answers without tools.
    ///
    /// Events go to `events` as they happen. A terminal failure is also sent
    /// as an [`AgentStreamEvent::Error`] before this returns. If the receiver
    /// goes away, the current round still completes so the history stays
    /// well-formed, but no further round is started.
    pub async fn run(
        &self,
        session: &mut Session,
        ctx: &ToolContext,
        events: &mpsc::Sender<AgentStreamEvent>,
    ) -> Result<RunOutcome, RunError> {
        let mut emitter = Emitter::new(events);
        let mut mode = ContextMode::Full;
        let mut iteration: u32 = 0;
        let mut tool_calls_made = 0;
        let mut state = LoopState::AwaitingModel;

        info!(
            session_id = %session.id,
            messages = session.messages.len(),
            "Starting run"
        );

        let result = loop {
            state = match state {
                LoopState::AwaitingModel => {
                    if emitter.is_closed() {
                        LoopState::Failed(RunError::Disconnected)
                    } else if iteration >= self.max_iterations {
                        LoopState::Failed(RunError::MaxIterations(self.max_iterations))
                    } else {
                        iteration += 1;
                        debug!(session_id = %session.id, iteration, ?mode, "Agent loop iteration");
                        match self.model_round(session, mode, &mut emitter).await {
                            Ok(round) => self.finish_round(session, round, iteration, mode, &mut emitter).await,
                            Err(e) => LoopState::Failed(e.into()),
                        }
                    }
                }
                LoopState::ExecutingTools(calls) => {
                    for invocation in &calls {
                        self.execute_one(session, invocation, ctx, &mut emitter).await;
                    }
                    tool_calls_made += calls.len();

                    if mode == ContextMode::Full
                        && self
                            .presentation
                            .triggered_by(calls.iter().map(|c| c.name.as_str()))
                    {
                        info!(session_id = %session.id, iteration, "Switching to presentation context");
                        mode = ContextMode::Presentation;
                    }
                    LoopState::AwaitingModel
                }
                LoopState::Done(final_text) => {
                    break Ok(RunOutcome {
                        final_text,
                        iterations: iteration,
                        tool_calls_made,
                    });
                }
                LoopState::Failed(err) => break Err(err),
            };
        };

        match &result {
            Ok(outcome) => info!(
                session_id = %session.id,
                iterations = outcome.iterations,
                tool_calls = outcome.tool_calls_made,
                "Run complete"
            ),
            Err(RunError::Disconnected) => {
                info!(session_id = %session.id, iteration, "Caller disconnected, stopping run")
            }
            Err(e) => {
                warn!(session_id = %session.id, iteration, error = %e, "Run failed");
                emitter.send(AgentStreamEvent::Error(e.to_string())).await;
            }
        }

        self.event_bus.publish(DomainEvent::RunFinished {
            session_id: session.id.clone(),
            iterations: iteration,
            error: result.as_ref().err().map(|e| e.to_string()),
            timestamp: Utc::now(),
        });

        result
    }

    fn request_for(&self, history: &[Message], mode: ContextMode) -> ProviderRequest {
        let (tools, tool_choice) = match mode {
            ContextMode::Full if !self.definitions.is_empty() => {
                (self.definitions.clone(), Some(ToolChoice::Auto))
            }
            _ => (Vec::new(), None),
        };
        ProviderRequest {
            model: self.model.clone(),
            messages: build_context(history, mode, &self.presentation),
            temperature: self.temperature,
            max_tokens: self.max_tokens,
            tools,
            tool_choice,
        }
    }

    /// Stream one completion, forwarding text as it arrives.
    async fn model_round(
        &self,
        session: &Session,
        mode: ContextMode,
        emitter: &mut Emitter<'_>,
    ) -> Result<Round, ProviderError> {
        let request = self.request_for(&session.messages, mode);
        let mut stream = self.provider.stream(request).await?;

        let mut content = String::new();
        let mut accumulator = ToolCallAccumulator::new();
        let mut usage = None;

        while let Some(item) = stream.recv().await {
            let chunk = item?;
            if let Some(text) = chunk.content.filter(|t| !t.is_empty()) {
                content.push_str(&text);
                emitter.send(AgentStreamEvent::TextDelta(text)).await;
            }
            accumulator.extend(&chunk.tool_calls);
            if chunk.usage.is_some() {
                usage = chunk.usage;
            }
        }

        Ok(Round {
            content,
            calls: accumulator.finish(),
            usage,
        })
    }

    /// Record the assistant turn and decide what comes next.
    async fn finish_round(
        &self,
        session: &mut Session,
        round: Round,
        iteration: u32,
        mode: ContextMode,
        emitter: &mut Emitter<'_>,
    ) -> LoopState {
        if let Some(usage) = &round.usage {
            trace!(
                session_id = %session.id,
                prompt_tokens = usage.prompt_tokens,
                completion_tokens = usage.completion_tokens,
                "Round usage"
            );
        }

        let message_calls = round.calls.iter().map(|c| c.to_message_call()).collect();
        session
            .messages
            .push(Message::assistant_with_tools(round.content.clone(), message_calls));

        self.event_bus.publish(DomainEvent::RoundCompleted {
            session_id: session.id.clone(),
            iteration,
            tool_calls: round.calls.len(),
            presentation: mode == ContextMode::Presentation,
            timestamp: Utc::now(),
        });

        if round.calls.is_empty() {
            emitter.send(AgentStreamEvent::FinalDone).await;
            LoopState::Done(round.content)
        } else {
            debug!(session_id = %session.id, tool_count = round.calls.len(), "Executing tool calls");
            emitter.send(AgentStreamEvent::ThinkingDone).await;
            LoopState::ExecutingTools(round.calls)
        }
    }

    async fn execute_one(
        &self,
        session: &mut Session,
        invocation: &PendingInvocation,
        ctx: &ToolContext,
        emitter: &mut Emitter<'_>,
    ) {
        emitter
            .send(AgentStreamEvent::ToolCall {
                tool: invocation.name.clone(),
                args: invocation.display_arguments(),
            })
            .await;

        let start = Instant::now();
        let (result, success) = self.invoke(invocation, ctx).await;
        let duration_ms = start.elapsed().as_millis() as u64;

        debug!(
            session_id = %session.id,
            tool = %invocation.name,
            success,
            duration_ms,
            "Tool finished"
        );
        self.event_bus.publish(DomainEvent::ToolExecuted {
            session_id: session.id.clone(),
            tool_name: invocation.name.clone(),
            success,
            duration_ms,
            timestamp: Utc::now(),
        });

        session
            .messages
            .push(Message::tool_result(&invocation.id, result.to_string()));
        emitter
            .send(AgentStreamEvent::ToolResult {
                tool: invocation.name.clone(),
                result,
            })
            .await;
    }

    /// Never fails: every problem becomes an `{error}` payload for the model.
    async fn invoke(&self, invocation: &PendingInvocation, ctx: &ToolContext) -> (Value, bool) {
        if self.tools.get(&invocation.name).is_none() {
            warn!(tool = %invocation.name, "Model requested an unknown tool");
            let err = ToolError::NotFound(invocation.name.clone());
            return (error_payload(err.to_string()), false);
        }

        let arguments = match &invocation.arguments {
            Ok(args) => args.clone(),
            Err(e) => {
                warn!(tool = %invocation.name, error = %e, "Tool arguments are not valid JSON");
                return (
                    error_payload(format!("Tool execution failed: invalid arguments: {e}")),
                    false,
                );
            }
        };

        let call = ToolCall {
            id: invocation.id.clone(),
            name: invocation.name.clone(),
            arguments,
        };
        match self.tools.execute(&call, ctx).await {
            Ok(value) => (value, true),
            Err(e) => {
                warn!(tool = %invocation.name, error = %e, "Tool execution failed");
                (error_payload(format!("Tool execution failed: {e}")), false)
            }
        }
    }
}

fn error_payload(message: String) -> Value {
    serde_json::json!({ "error": message })
}
