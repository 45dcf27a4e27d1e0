//! The caller-facing entry point: binds a request to a session and runs it.

use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use supperclub_config::AppConfig;
use supperclub_core::error::SessionError;
use supperclub_core::event::{DomainEvent, EventBus};
use supperclub_core::location::{self, UserLocation};
use supperclub_core::message::Message;
use supperclub_core::provider::Provider;
use supperclub_core::tool::ToolContext;
use supperclub_tools::{FriendRoster, RosterError, default_registry};
use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::loop_runner::AgentLoop;
use crate::prompt::system_prompt;
use crate::session::{SessionHandle, SessionStore};
use crate::stream_event::AgentStreamEvent;

const EVENT_BUFFER: usize = 64;

/// One planning turn as submitted by a caller.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PlanRequest {
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_location: Option<UserLocation>,
}

impl PlanRequest {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            ..Self::default()
        }
    }

    pub fn with_session(mut self, session_id: impl Into<String>) -> Self {
        self.session_id = Some(session_id.into());
        self
    }

    pub fn with_location(mut self, location: UserLocation) -> Self {
        self.user_location = Some(location);
        self
    }
}

pub struct Planner {
    agent: Arc<AgentLoop>,
    sessions: Arc<SessionStore>,
    roster: Arc<FriendRoster>,
}

impl Planner {
    pub fn new(agent: AgentLoop, sessions: SessionStore, roster: Arc<FriendRoster>) -> Self {
        Self {
            agent: Arc::new(agent),
            sessions: Arc::new(sessions),
            roster,
        }
    }

    /// Wire up the roster, the dining tool set, the loop and the session store.
    pub fn from_config(
        config: &AppConfig,
        provider: Arc<dyn Provider>,
        event_bus: Arc<EventBus>,
    ) -> Result<Self, RosterError> {
        let roster = Arc::new(FriendRoster::load_or_builtin(
            config.tools.friends_path.as_deref(),
        )?);
        let tools = Arc::new(default_registry(&config.tools, roster.clone()));
        let agent = AgentLoop::from_config(config, provider, tools, event_bus);
        Ok(Self::new(
            agent,
            SessionStore::from_config(&config.sessions),
            roster,
        ))
    }

    pub fn roster(&self) -> &Arc<FriendRoster> {
        &self.roster
    }

    pub fn sessions(&self) -> &Arc<SessionStore> {
        &self.sessions
    }

    /// Drop a session. Unknown ids are fine.
    pub async fn clear_session(&self, session_id: &str) -> bool {
        self.sessions.delete(session_id).await
    }

    /// Start a run and return its event stream.
    ///
    /// The first event is always [`AgentStreamEvent::SessionRef`]. The run
    /// itself happens on a spawned task holding the session lock; dropping
    /// the receiver stops it after the current round.
    pub async fn plan(&self, request: PlanRequest) -> mpsc::Receiver<AgentStreamEvent> {
        let (tx, rx) = mpsc::channel(EVENT_BUFFER);
        let known_location = location::known(request.user_location.as_ref()).cloned();

        let existing = match request.session_id.as_deref() {
            Some(id) => self
                .sessions
                .get(id)
                .await
                .map(|handle| (id.to_string(), handle)),
            None => None,
        };
        let new_session = existing.is_none();

        let (session_id, handle): (String, SessionHandle) = match existing {
            Some(found) => found,
            None => {
                let prompt = system_prompt(known_location.as_ref(), &self.roster);
                self.sessions
                    .create(vec![
                        Message::system(prompt),
                        Message::user(request.message.clone()),
                    ])
                    .await
            }
        };

        let _ = tx
            .send(AgentStreamEvent::SessionRef {
                session_id: session_id.clone(),
            })
            .await;

        let Ok(mut guard) = handle.try_lock_owned() else {
            warn!(session_id = %session_id, "Rejected run on busy session");
            let err = SessionError::Busy(session_id);
            let _ = tx.send(AgentStreamEvent::Error(err.to_string())).await;
            return rx;
        };

        if !new_session {
            if let Some(loc) = &known_location {
                guard.messages.push(Message::system(loc.follow_up_note()));
            }
            guard.messages.push(Message::user(request.message));
        }

        info!(session_id = %session_id, new_session, "Planning run accepted");
        self.agent.event_bus().publish(DomainEvent::RunStarted {
            session_id: session_id.clone(),
            new_session,
            timestamp: Utc::now(),
        });

        let agent = self.agent.clone();
        let sessions = self.sessions.clone();
        let ctx = ToolContext::new(request.user_location);
        tokio::spawn(async move {
            // Failures are already reported on the event stream.
            let _ = agent.run(&mut guard, &ctx, &tx).await;
            drop(guard);
            sessions.touch(&session_id).await;
        });

        rx
    }
}
