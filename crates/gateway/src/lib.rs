//! HTTP gateway for supperclub.
//!
//! Exposes the planner over a small REST surface:
//! - `POST   /api/plan`: SSE stream of a planning run (multi-turn via `session_id`)
//! - `GET    /api/friends`: the friend roster
//! - `DELETE /api/session/{id}`: forget a session
//! - `GET    /api/health`: liveness
//!
//! Built on Axum. Each SSE record is `data: {"type", "content"}`; the first
//! is always the `session` record and the stream ends with `data: [DONE]`.

use std::convert::Infallible;
use std::sync::Arc;

use axum::extract::{DefaultBodyLimit, Path, State};
use axum::http::{HeaderValue, Method, StatusCode};
use axum::response::sse::{Event as SseEvent, KeepAlive, Sse};
use axum::response::Json;
use axum::routing::{delete, get, post};
use axum::Router;
use serde::Serialize;
use tokio_stream::wrappers::ReceiverStream;
use tokio_stream::{Stream, StreamExt};
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tracing::{info, warn};

use supperclub_agent::{AgentStreamEvent, PlanRequest, Planner, WireEvent};
use supperclub_config::AppConfig;
use supperclub_core::event::EventBus;
use supperclub_tools::Friend;

/// Shared application state for the gateway.
pub struct GatewayState {
    pub planner: Arc<Planner>,
}

pub type SharedState = Arc<GatewayState>;

/// Build the router with every `/api` route, CORS and request tracing.
///
/// An empty `allowed_origins` allows any origin.
pub fn build_router(state: SharedState, allowed_origins: &[String]) -> Router {
    let api = Router::new()
        .route("/plan", post(plan_handler))
        .route("/friends", get(friends_handler))
        .route("/session/{id}", delete(clear_session_handler))
        .route("/health", get(health_handler))
        .with_state(state);

    Router::new()
        .nest("/api", api)
        .layer(DefaultBodyLimit::max(64 * 1024))
        .layer(cors_layer(allowed_origins))
        .layer(tower_http::trace::TraceLayer::new_for_http())
}

fn cors_layer(allowed_origins: &[String]) -> CorsLayer {
    let origin = if allowed_origins.is_empty() {
        AllowOrigin::from(Any)
    } else {
        let origins: Vec<HeaderValue> = allowed_origins
            .iter()
            .filter_map(|o| match o.parse() {
                Ok(v) => Some(v),
                Err(_) => {
                    warn!(origin = %o, "Ignoring unparseable CORS origin");
                    None
                }
            })
            .collect();
        AllowOrigin::list(origins)
    };

    CorsLayer::new()
        .allow_origin(origin)
        .allow_methods([Method::GET, Method::POST, Method::DELETE])
        .allow_headers(Any)
}

/// Start the gateway HTTP server.
pub async fn start(config: AppConfig) -> Result<(), Box<dyn std::error::Error>> {
    let addr = format!("{}:{}", config.gateway.host, config.gateway.port);

    let provider = supperclub_providers::build_from_config(&config)
        .default_provider()
        .ok_or("No default provider configured; set an API key")?;
    let event_bus = Arc::new(EventBus::default());
    let planner = Planner::from_config(&config, provider, event_bus)?;

    let state = Arc::new(GatewayState {
        planner: Arc::new(planner),
    });
    let app = build_router(state, &config.gateway.allowed_origins);

    info!(addr = %addr, model = %config.default_model, "Gateway starting");
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

// --- Handlers ---

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

#[derive(Serialize)]
struct StatusResponse {
    status: &'static str,
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

async fn friends_handler(State(state): State<SharedState>) -> Json<Vec<Friend>> {
    Json(state.planner.roster().friends.clone())
}

async fn clear_session_handler(
    State(state): State<SharedState>,
    Path(id): Path<String>,
) -> Json<StatusResponse> {
    if state.planner.clear_session(&id).await {
        info!(session_id = %id, "Session cleared");
    }
    Json(StatusResponse { status: "cleared" })
}

/// `POST /api/plan`: run the planner and stream its events.
async fn plan_handler(
    State(state): State<SharedState>,
    Json(request): Json<PlanRequest>,
) -> Result<
    Sse<impl Stream<Item = Result<SseEvent, Infallible>>>,
    (StatusCode, Json<ErrorResponse>),
> {
    if request.message.trim().is_empty() {
        return Err((
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse {
                error: "message must not be empty".into(),
            }),
        ));
    }

    info!(
        message_len = request.message.len(),
        resumed = request.session_id.is_some(),
        "Plan request"
    );
    let rx = state.planner.plan(request).await;

    let events = ReceiverStream::new(rx).filter_map(|event| {
        let wire = match &event {
            AgentStreamEvent::SessionRef { session_id } => WireEvent::session(session_id.clone()),
            other => other.to_wire()?,
        };
        Some(Ok(SseEvent::default().data(wire.to_json())))
    });
    let done = tokio_stream::once(Ok(SseEvent::default().data("[DONE]")));

    Ok(Sse::new(events.chain(done)).keep_alive(KeepAlive::default()))
}
