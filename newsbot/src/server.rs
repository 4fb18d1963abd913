use std::sync::Arc;

use anyhow::{anyhow, Result};
use chrono::{DateTime, Utc};
use common::ServerConfig;
use rocket::http::Status;
use rocket::response::content::RawHtml;
use rocket::serde::json::Json;
use rocket::{get, post, routes, Build, Rocket, State};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use crate::conversation::Turn;
use crate::sessions::{ChatSession, Exchange};

const INDEX_HTML: &str = include_str!("../static/index.html");

/// Application state stored inside Rocket managed state.
#[derive(Clone)]
pub struct AppState {
    pub started_at: DateTime<Utc>,
    /// One session per process; the lock keeps exchanges strictly sequential
    pub session: Arc<Mutex<ChatSession>>,
}

impl AppState {
    pub fn new(session: ChatSession) -> Self {
        Self {
            started_at: Utc::now(),
            session: Arc::new(Mutex::new(session)),
        }
    }
}

/// Response structure for `/api/v1/status`.
#[derive(Serialize)]
struct StatusResponse {
    status: &'static str,
    uptime_seconds: i64,
    turns: usize,
    news_offset: usize,
}

/// Request body for `/api/v1/chat`.
#[derive(Deserialize)]
struct ChatRequest {
    message: String,
}

/// Single-page chat UI
#[get("/")]
async fn index() -> RawHtml<&'static str> {
    RawHtml(INDEX_HTML)
}

#[get("/health")]
async fn health() -> &'static str {
    "OK"
}

/// Status endpoint returning uptime and session counters.
#[get("/api/v1/status")]
async fn status(state: &State<AppState>) -> Json<StatusResponse> {
    let uptime = (Utc::now() - state.started_at).num_seconds();
    let session = state.session.lock().await;

    Json(StatusResponse {
        status: "ok",
        uptime_seconds: uptime,
        turns: session.history().len(),
        news_offset: session.offset(),
    })
}

/// Full conversation history.
#[get("/api/v1/history")]
async fn history(state: &State<AppState>) -> Json<Vec<Turn>> {
    let session = state.session.lock().await;
    Json(session.history().turns().to_vec())
}

/// One exchange over plain HTTP. Blank messages are answered with 204 and no body.
#[post("/api/v1/chat", data = "<body>")]
async fn chat(state: &State<AppState>, body: Json<ChatRequest>) -> Result<Json<Exchange>, Status> {
    let mut session = state.session.lock().await;
    session.handle(&body.message).await.map(Json).ok_or(Status::NoContent)
}

/// Rocket instance with all routes mounted, bound as `server` says.
pub fn build_rocket(state: AppState, server: &ServerConfig) -> Rocket<Build> {
    let figment = rocket::Config::figment()
        .merge(("address", server.bind.clone()))
        .merge(("port", server.port));

    rocket::custom(figment)
        .manage(state)
        .mount("/", routes![index, health, status, history, chat])
        .mount("/ws", routes![crate::sessions::websocket::chat_websocket])
}

/// Launch the server; returns when Rocket shuts down (SIGINT/SIGTERM etc.).
pub async fn launch_rocket(state: AppState, server: &ServerConfig) -> Result<()> {
    tracing::info!(bind = %server.bind, port = server.port, "Starting Rocket HTTP server");
    build_rocket(state, server)
        .launch()
        .await
        .map_err(|e| anyhow!("Rocket failed: {}", e))?;

    tracing::info!("Rocket HTTP server has shut down");
    Ok(())
}
