//! HTTP trigger surface.

pub mod triggers;

use crate::automation::{Automation, RunGuard, RunOutcome};
use crate::core::Config;
use crate::errors::{AutomationError, RunResult};
use crate::types::RunReport;
use anyhow::Result;
use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use tracing::{error, info};

pub const COMPLETED_MESSAGE: &str = "Run completed, check server logs for progress.";
pub const SKIPPED_MESSAGE: &str = "Run skipped: already in progress.";

#[derive(Clone)]
pub struct AppState {
    pub guard: RunGuard,
    pub runner: Arc<dyn Automation>,
}

impl AppState {
    pub fn new(runner: Arc<dyn Automation>) -> Self {
        Self {
            guard: RunGuard::new(),
            runner,
        }
    }
}

/// Where a run request came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerSource {
    Startup,
    Interval,
    HttpGet,
    HttpPost,
}

impl fmt::Display for TriggerSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TriggerSource::Startup => "startup",
            TriggerSource::Interval => "interval",
            TriggerSource::HttpGet => "GET /run-automation",
            TriggerSource::HttpPost => "POST /run-automation",
        };
        f.write_str(name)
    }
}

/// Attempts one run through the guard and logs how it ended.
///
/// The run lives on its own task: a caller that goes away (a closed HTTP
/// connection) does not cancel a run that was already admitted.
pub async fn dispatch(state: &AppState, source: TriggerSource) -> RunResult<RunOutcome<RunReport>> {
    info!(trigger = %source, "Run requested");
    let state = state.clone();
    let task = tokio::spawn(async move { state.guard.try_run(|| state.runner.run()).await });

    let outcome = match task.await {
        Ok(outcome) => outcome,
        Err(e) => Err(AutomationError::Aborted(e.to_string())),
    };

    match &outcome {
        Ok(RunOutcome::Completed(report)) => {
            info!(trigger = %source, run_id = %report.run_id, "Run completed")
        }
        Ok(RunOutcome::Skipped) => info!(trigger = %source, "Run skipped: already in progress"),
        Err(e) => error!(trigger = %source, "Run failed: {}", e),
    }
    outcome
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(health_check))
        .route("/run-automation", get(run_plain).post(run_structured))
        .with_state(state)
}

async fn health_check() -> &'static str {
    "OK"
}

async fn run_plain(State(state): State<AppState>) -> (StatusCode, String) {
    match dispatch(&state, TriggerSource::HttpGet).await {
        Ok(RunOutcome::Completed(_)) => (StatusCode::OK, COMPLETED_MESSAGE.to_string()),
        Ok(RunOutcome::Skipped) => (StatusCode::OK, SKIPPED_MESSAGE.to_string()),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("Run failed: {}", e),
        ),
    }
}

#[derive(Debug, Serialize)]
pub struct RunResponse {
    pub status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

async fn run_structured(State(state): State<AppState>) -> (StatusCode, Json<RunResponse>) {
    let (code, status, message) = match dispatch(&state, TriggerSource::HttpPost).await {
        Ok(RunOutcome::Completed(_)) => (StatusCode::OK, "success", None),
        Ok(RunOutcome::Skipped) => (
            StatusCode::OK,
            "success",
            Some("run skipped: already in progress".to_string()),
        ),
        Err(e) => (StatusCode::INTERNAL_SERVER_ERROR, "error", Some(e.to_string())),
    };
    (code, Json(RunResponse { status, message }))
}

/// Binds, fires the configured triggers, and serves until Ctrl-C.
pub async fn serve(config: &Config, state: AppState) -> Result<()> {
    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("Server listening on http://{}", addr);

    let background = triggers::spawn(&config.triggers, state.clone());

    axum::serve(listener, build_router(state))
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                error!("could not listen for shutdown signal: {}", e);
                std::future::pending::<()>().await;
            }
            info!("Shutting down");
        })
        .await?;

    for handle in background {
        handle.abort();
    }
    Ok(())
}
