// Salary Book - Web Server
// JSON API over the workspace lenses with Axum

use anyhow::{Context, Result};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::get,
    Router,
};
use clap::Parser;
use rusqlite::Connection;
use salary_book::{
    find_agent, find_player, open_warehouse, render, AppConfig, RawParams, RequestContext,
    Row, WorkspaceError, VERSION, WORKSPACES,
};
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard};
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "salary-book-server", version, about = "Salary book JSON API")]
struct Args {
    /// Configuration file (defaults to ./salary-book.toml when present)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Override `server.bind`
    #[arg(long)]
    bind: Option<String>,
}

/// Shared application state
#[derive(Clone)]
struct AppState {
    db: Arc<Mutex<Connection>>,
    config: Arc<AppConfig>,
}

impl AppState {
    fn warehouse(&self) -> Result<MutexGuard<'_, Connection>, WorkspaceError> {
        self.db.lock().map_err(|_| {
            WorkspaceError::Unavailable("warehouse connection lock poisoned".to_string())
        })
    }

    /// Each request anchors relative windows on the current local date
    fn request_context(&self) -> RequestContext {
        RequestContext::from_config(&self.config.workspace, chrono::Local::now().date_naive())
    }
}

/// API Response wrapper
#[derive(Serialize)]
struct ApiResponse<T> {
    success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl<T> ApiResponse<T> {
    fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    fn err(message: String) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message),
        }
    }
}

#[derive(Serialize)]
struct WorkspaceSummary {
    name: &'static str,
    title: &'static str,
}

/// Not-found conditions are 404, everything else a 500
fn error_response(err: WorkspaceError) -> Response {
    let status = if err.is_not_found() {
        StatusCode::NOT_FOUND
    } else {
        tracing::error!(error = %err, "request failed");
        StatusCode::INTERNAL_SERVER_ERROR
    };
    (status, Json(ApiResponse::<()>::err(err.to_string()))).into_response()
}

fn respond<T: Serialize>(result: Result<T, WorkspaceError>) -> Response {
    match result {
        Ok(data) => (StatusCode::OK, Json(ApiResponse::ok(data))).into_response(),
        Err(err) => error_response(err),
    }
}

// ============================================================================
// API Handlers
// ============================================================================

/// GET /api/health - Health check
async fn health_check() -> impl IntoResponse {
    Json(ApiResponse::ok(format!("OK ({VERSION})")))
}

/// GET /api/workspaces - Available workspaces
async fn list_workspaces() -> impl IntoResponse {
    let workspaces: Vec<WorkspaceSummary> = WORKSPACES
        .iter()
        .map(|entry| WorkspaceSummary {
            name: entry.name,
            title: entry.title,
        })
        .collect();
    Json(ApiResponse::ok(workspaces))
}

/// GET /api/workspaces/:name - Render one workspace for the query string
async fn get_workspace(
    State(state): State<AppState>,
    Path(name): Path<String>,
    Query(query): Query<BTreeMap<String, String>>,
) -> Response {
    let params: RawParams = query.into_iter().collect();
    let ctx = state.request_context();

    respond(state.warehouse().and_then(|conn| render(&name, &params, &ctx, &*conn)))
}

/// GET /api/players/:id - Player detail
async fn get_player(State(state): State<AppState>, Path(player_id): Path<i64>) -> Response {
    let result: Result<Row, WorkspaceError> =
        state.warehouse().and_then(|conn| find_player(&*conn, player_id));
    respond(result)
}

/// GET /api/agents/:id - Agent detail
async fn get_agent(State(state): State<AppState>, Path(agent_id): Path<i64>) -> Response {
    let result: Result<Row, WorkspaceError> =
        state.warehouse().and_then(|conn| find_agent(&*conn, agent_id));
    respond(result)
}

// ============================================================================
// Main Server
// ============================================================================

fn init_tracing() {
    let filter = EnvFilter::try_from_env("SALARY_BOOK_LOG")
        .unwrap_or_else(|_| EnvFilter::new("info,tower_http=debug"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let args = Args::parse();

    let mut config =
        AppConfig::load(args.config.as_deref()).context("Failed to load configuration")?;
    if let Some(bind) = args.bind {
        config.server.bind = bind;
    }

    let conn = open_warehouse(&config.database).with_context(|| {
        format!(
            "Failed to open warehouse at {}",
            config.database.path.display()
        )
    })?;

    let bind = config.server.bind.clone();
    let state = AppState {
        db: Arc::new(Mutex::new(conn)),
        config: Arc::new(config),
    };

    let api_routes = Router::new()
        .route("/health", get(health_check))
        .route("/workspaces", get(list_workspaces))
        .route("/workspaces/:name", get(get_workspace))
        .route("/players/:id", get(get_player))
        .route("/agents/:id", get(get_agent))
        .with_state(state);

    let app = Router::new().nest("/api", api_routes).layer(
        ServiceBuilder::new()
            .layer(TraceLayer::new_for_http())
            .layer(CorsLayer::permissive()),
    );

    let listener = tokio::net::TcpListener::bind(&bind)
        .await
        .with_context(|| format!("Failed to bind to {bind}"))?;

    tracing::info!(%bind, version = VERSION, "salary book server listening");

    axum::serve(listener, app).await.context("Server error")?;
    Ok(())
}
