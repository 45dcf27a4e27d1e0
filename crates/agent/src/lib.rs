//! The orchestration loop, the heart of supperclub.
//!
//! A planning run repeats rounds until the model answers without asking for
//! tools:
//!
//! 1. **Build context**: the full session history, or the compacted
//!    presentation context once the enrichment tool has run
//! 2. **Stream** a completion, forwarding text deltas as they arrive
//! 3. **Accumulate** streamed tool-call fragments into complete calls
//! 4. **Execute** the calls in order and append their results
//!
//! [`Planner`] is the entry point callers use: it binds each request to a
//! session and runs the loop on a background task.

pub mod accumulator;
pub mod context;
pub mod loop_runner;
pub mod planner;
pub mod prompt;
pub mod session;
pub mod stream_event;

#[cfg(test)]
mod test_helpers;

pub use accumulator::{PendingInvocation, ToolCallAccumulator};
pub use context::{ContextMode, PresentationPolicy, build_context, presentation_context};
pub use loop_runner::{AgentLoop, RunError, RunOutcome};
pub use planner::{PlanRequest, Planner};
pub use prompt::system_prompt;
pub use session::{Session, SessionHandle, SessionStore};
pub use stream_event::{AgentStreamEvent, WireEvent};
