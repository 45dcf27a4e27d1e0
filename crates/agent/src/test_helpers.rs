//! Shared test helpers: a scripted streaming provider and stub tools.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use serde_json::Value;
use supperclub_core::error::{ProviderError, ToolError};
use supperclub_core::provider::{
    ChunkReceiver, Provider, ProviderRequest, StreamChunk, ToolCallDelta,
};
use supperclub_core::tool::{Tool, ToolContext};
use tokio::sync::mpsc;

/// What the provider does for one round.
pub enum Script {
    /// Stream these items, then end the round.
    Chunks(Vec<Result<StreamChunk, ProviderError>>),
    /// Fail to open the stream at all.
    Refuse(ProviderError),
}

impl Script {
    pub fn chunks(chunks: Vec<StreamChunk>) -> Self {
        Self::Chunks(chunks.into_iter().map(Ok).collect())
    }
}

/// Replays one [`Script`] per `stream()` call and records every request.
///
/// Once the queue is empty, the `repeat` script (if any) is used forever;
/// otherwise the stream is refused.
pub struct ScriptedProvider {
    rounds: Mutex<VecDeque<Script>>,
    repeat: Option<Vec<StreamChunk>>,
    requests: Mutex<Vec<ProviderRequest>>,
}

impl ScriptedProvider {
    pub fn new(rounds: Vec<Script>) -> Self {
        Self {
            rounds: Mutex::new(rounds.into()),
            repeat: None,
            requests: Mutex::new(Vec::new()),
        }
    }

    /// One round of plain chunks per entry.
    pub fn rounds(rounds: Vec<Vec<StreamChunk>>) -> Self {
        Self::new(rounds.into_iter().map(Script::chunks).collect())
    }

    /// The same round, every time.
    pub fn repeating(round: Vec<StreamChunk>) -> Self {
        Self {
            rounds: Mutex::new(VecDeque::new()),
            repeat: Some(round),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn requests(&self) -> Vec<ProviderRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

#[async_trait::async_trait]
impl Provider for ScriptedProvider {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn stream(&self, request: ProviderRequest) -> Result<ChunkReceiver, ProviderError> {
        self.requests.lock().unwrap().push(request);

        let next = self.rounds.lock().unwrap().pop_front();
        let script = match next {
            Some(script) => script,
            None => match &self.repeat {
                Some(round) => Script::chunks(round.clone()),
                None => {
                    return Err(ProviderError::NotConfigured("script exhausted".into()));
                }
            },
        };

        match script {
            Script::Refuse(err) => Err(err),
            Script::Chunks(items) => {
                let (tx, rx) = mpsc::channel(items.len().max(1));
                for item in items {
                    tx.try_send(item).unwrap();
                }
                Ok(rx)
            }
        }
    }
}

pub fn text(s: &str) -> StreamChunk {
    StreamChunk::text(s)
}

pub fn call_start(index: u32, id: &str, name: &str) -> StreamChunk {
    StreamChunk::tool_deltas(vec![ToolCallDelta::start(index, id, name)])
}

pub fn call_args(index: u32, args: &str) -> StreamChunk {
    StreamChunk::tool_deltas(vec![ToolCallDelta::args(index, args)])
}

/// A whole tool call in two chunks.
pub fn call(index: u32, id: &str, name: &str, args: &str) -> Vec<StreamChunk> {
    vec![call_start(index, id, name), call_args(index, args)]
}

/// A tool that returns a canned result and counts its invocations.
pub struct StubTool {
    name: String,
    result: Result<Value, ToolError>,
    calls: Arc<AtomicUsize>,
    seen: Arc<Mutex<Vec<Value>>>,
}

impl StubTool {
    pub fn ok(name: &str, result: Value) -> Self {
        Self {
            name: name.into(),
            result: Ok(result),
            calls: Arc::new(AtomicUsize::new(0)),
            seen: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn failing(name: &str, reason: &str) -> Self {
        Self {
            result: Err(ToolError::ExecutionFailed {
                tool_name: name.into(),
                reason: reason.into(),
            }),
            ..Self::ok(name, Value::Null)
        }
    }

    pub fn counter(&self) -> Arc<AtomicUsize> {
        self.calls.clone()
    }

    pub fn arguments_log(&self) -> Arc<Mutex<Vec<Value>>> {
        self.seen.clone()
    }
}

pub fn count(counter: &AtomicUsize) -> usize {
    counter.load(Ordering::SeqCst)
}

#[async_trait::async_trait]
impl Tool for StubTool {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        "stub"
    }

    fn parameters_schema(&self) -> Value {
        serde_json::json!({ "type": "object" })
    }

    async fn execute(&self, arguments: Value, _ctx: &ToolContext) -> Result<Value, ToolError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.seen.lock().unwrap().push(arguments);
        self.result.clone()
    }
}
