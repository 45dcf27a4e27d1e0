//! `supperclub plan`: Plan a dinner from the terminal.
//!
//! Text deltas go to stdout as they stream; tool activity is printed as dim
//! status lines on stderr so stdout stays pipeable.

use std::io::Write;
use std::sync::Arc;

use serde_json::Value;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::warn;

use supperclub_agent::{AgentStreamEvent, PlanRequest, Planner};
use supperclub_config::AppConfig;
use supperclub_core::UserLocation;
use supperclub_core::event::EventBus;

const DIM: &str = "\x1b[2m";
const RESET: &str = "\x1b[0m";
const STATUS_WIDTH: usize = 120;

pub fn missing_key_message() -> String {
    format!(
        "No API key found. Set SUPPERCLUB_API_KEY or OPENAI_API_KEY, or add api_key to {}",
        AppConfig::config_dir().join("config.toml").display()
    )
}

/// A location only counts when both coordinates are given.
pub fn location_from_args(
    lat: Option<f64>,
    lng: Option<f64>,
    address: Option<String>,
) -> Option<UserLocation> {
    match (lat, lng) {
        (Some(lat), Some(lng)) => Some(UserLocation::new(lat, lng, address.unwrap_or_default())),
        _ => {
            if address.is_some() {
                warn!("--address without --lat/--lng is ignored");
            }
            None
        }
    }
}

pub async fn run(
    config: AppConfig,
    message: Option<String>,
    location: Option<UserLocation>,
) -> Result<(), Box<dyn std::error::Error>> {
    if !config.has_api_key() {
        return Err(missing_key_message().into());
    }

    let provider = supperclub_providers::build_from_config(&config)
        .default_provider()
        .ok_or("No default provider configured")?;
    let planner = Planner::from_config(&config, provider, Arc::new(EventBus::default()))?;
    let mut renderer = Renderer::default();

    if let Some(msg) = message {
        let request = with_location(PlanRequest::new(msg), location);
        run_turn(&planner, request, &mut renderer).await?;
        return Ok(());
    }

    eprintln!();
    eprintln!("  supperclub planner, interactive mode");
    eprintln!("  Model:   {}", config.default_model);
    eprintln!("  Friends: {}", planner.roster().len());
    match &location {
        Some(loc) => eprintln!("  You:     {}", loc.describe()),
        None => eprintln!("  You:     location unknown (pass --lat/--lng)"),
    }
    eprintln!("  Type 'exit' or Ctrl+D to quit.");
    eprintln!();

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut location = location;

    loop {
        eprint!("  You > ");
        std::io::stderr().flush()?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if matches!(line, "exit" | "quit") {
            break;
        }

        let mut request = PlanRequest::new(line);
        if let Some(id) = renderer.session_id.clone() {
            request = request.with_session(id);
        }
        // The location rides along on the first turn only; the session keeps it after that.
        let request = with_location(request, location.take());
        run_turn(&planner, request, &mut renderer).await?;
        println!();
    }

    eprintln!();
    Ok(())
}

fn with_location(request: PlanRequest, location: Option<UserLocation>) -> PlanRequest {
    match location {
        Some(loc) => request.with_location(loc),
        None => request,
    }
}

async fn run_turn(
    planner: &Planner,
    request: PlanRequest,
    renderer: &mut Renderer,
) -> std::io::Result<()> {
    let mut rx = planner.plan(request).await;
    while let Some(event) = rx.recv().await {
        renderer.render(&event, &mut std::io::stdout(), &mut std::io::stderr())?;
    }
    renderer.finish(&mut std::io::stdout())
}

/// Turns agent events into terminal output.
#[derive(Debug, Default)]
pub struct Renderer {
    pub session_id: Option<String>,
    mid_line: bool,
}

impl Renderer {
    pub fn render(
        &mut self,
        event: &AgentStreamEvent,
        out: &mut impl Write,
        err: &mut impl Write,
    ) -> std::io::Result<()> {
        match event {
            AgentStreamEvent::SessionRef { session_id } => {
                self.session_id = Some(session_id.clone());
            }
            AgentStreamEvent::TextDelta(text) => {
                write!(out, "{text}")?;
                out.flush()?;
                self.mid_line = !text.ends_with('\n');
            }
            AgentStreamEvent::ThinkingDone | AgentStreamEvent::FinalDone => {
                self.finish(out)?;
            }
            AgentStreamEvent::ToolCall { tool, args } => {
                self.finish(out)?;
                let args = match args {
                    Value::String(raw) => raw.clone(),
                    other => other.to_string(),
                };
                writeln!(err, "{DIM}  -> {tool}({}){RESET}", truncate(&args, STATUS_WIDTH))?;
            }
            AgentStreamEvent::ToolResult { tool, result } => {
                let summary = match result.get("error").and_then(Value::as_str) {
                    Some(e) => format!("failed: {e}"),
                    None => result.to_string(),
                };
                writeln!(err, "{DIM}  <- {tool}: {}{RESET}", truncate(&summary, STATUS_WIDTH))?;
            }
            AgentStreamEvent::Error(message) => {
                self.finish(out)?;
                writeln!(err, "  [Error] {message}")?;
            }
        }
        Ok(())
    }

    /// End a partially written line of model text.
    pub fn finish(&mut self, out: &mut impl Write) -> std::io::Result<()> {
        if self.mid_line {
            writeln!(out)?;
            self.mid_line = false;
        }
        out.flush()
    }
}

fn truncate(s: &str, max_chars: usize) -> String {
    if s.chars().count() <= max_chars {
        return s.to_string();
    }
    let mut cut: String = s.chars().take(max_chars).collect();
    cut.push_str("...");
    cut
}
