// Account Rules - Web Server
// REST API with Axum exposing plan limits and statistics per account

use account_rules::{
    account_exists, list_account_ids, load_account, open_connection, Account, AccountReport,
    AccountRules, AppConfig, YearlyStatistics,
};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::get,
    Router,
};
use rusqlite::Connection;
use serde::Serialize;
use std::env;
use std::sync::{Arc, Mutex};
use tower_http::cors::CorsLayer;
use tracing::{error, info};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Shared application state
#[derive(Clone)]
struct AppState {
    db: Arc<Mutex<Connection>>,
    rules: Arc<AccountRules>,
}

/// API Response wrapper
#[derive(Serialize)]
struct ApiResponse<T> {
    success: bool,
    data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl<T: Serialize> ApiResponse<T> {
    fn ok(data: T) -> Response {
        let body = Self {
            success: true,
            data: Some(data),
            error: None,
        };
        (StatusCode::OK, Json(body)).into_response()
    }

    fn err(status: StatusCode, message: String) -> Response {
        let body = Self {
            success: false,
            data: None,
            error: Some(message),
        };
        (status, Json(body)).into_response()
    }
}

/// Load an account and apply `f` to it, mapping failures to HTTP errors
fn with_account<T, F>(state: &AppState, account_id: &str, f: F) -> Response
where
    T: Serialize,
    F: FnOnce(&AccountRules, &Account) -> T,
{
    let conn = match state.db.lock() {
        Ok(conn) => conn,
        Err(_) => {
            error!("database mutex poisoned");
            return ApiResponse::<T>::err(
                StatusCode::INTERNAL_SERVER_ERROR,
                "database unavailable".to_string(),
            );
        }
    };

    match account_exists(&conn, account_id) {
        Ok(true) => {}
        Ok(false) => {
            return ApiResponse::<T>::err(
                StatusCode::NOT_FOUND,
                format!("Account not found: {}", account_id),
            )
        }
        Err(e) => {
            error!("Error looking up account {}: {}", account_id, e);
            return ApiResponse::<T>::err(StatusCode::INTERNAL_SERVER_ERROR, e.to_string());
        }
    }

    match load_account(&conn, account_id) {
        Ok(account) => ApiResponse::ok(f(&state.rules, &account)),
        Err(e) => {
            error!("Error loading account {}: {}", account_id, e);
            ApiResponse::<T>::err(StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
        }
    }
}

// ============================================================================
// API Handlers
// ============================================================================

/// GET /api/health - Health check
async fn health_check() -> Response {
    ApiResponse::ok("OK")
}

/// GET /api/accounts - List account ids
async fn get_accounts(State(state): State<AppState>) -> Response {
    let conn = match state.db.lock() {
        Ok(conn) => conn,
        Err(_) => {
            return ApiResponse::<Vec<String>>::err(
                StatusCode::INTERNAL_SERVER_ERROR,
                "database unavailable".to_string(),
            )
        }
    };

    match list_account_ids(&conn) {
        Ok(ids) => ApiResponse::ok(ids),
        Err(e) => {
            error!("Error listing accounts: {}", e);
            ApiResponse::<Vec<String>>::err(StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
        }
    }
}

/// GET /api/accounts/:id/report - Every rule for one account
async fn get_report(State(state): State<AppState>, Path(id): Path<String>) -> Response {
    with_account::<AccountReport, _>(&state, &id, |rules, account| rules.report(account))
}

/// GET /api/accounts/:id/statistics/activities - Activities per year
async fn get_activity_statistics(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Response {
    with_account::<YearlyStatistics, _>(&state, &id, |rules, account| {
        rules.yearly_activities_statistics(account)
    })
}

/// GET /api/accounts/:id/statistics/calls - Calls per year
async fn get_call_statistics(State(state): State<AppState>, Path(id): Path<String>) -> Response {
    with_account::<YearlyStatistics, _>(&state, &id, |rules, account| {
        rules.yearly_call_statistics(account)
    })
}

// ============================================================================
// Main Server
// ============================================================================

fn init_tracing() {
    let log_level = env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "account_rules={},account_rules_server={},tower_http=info",
            log_level, log_level
        ))
    });

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt::layer().with_target(true))
        .init();
}

fn app(state: AppState) -> Router {
    let api_routes = Router::new()
        .route("/health", get(health_check))
        .route("/accounts", get(get_accounts))
        .route("/accounts/:id/report", get(get_report))
        .route("/accounts/:id/statistics/activities", get(get_activity_statistics))
        .route("/accounts/:id/statistics/calls", get(get_call_statistics))
        .with_state(state);

    Router::new()
        .nest("/api", api_routes)
        .layer(CorsLayer::permissive())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    let config = AppConfig::load()?;
    info!("Account Rules server v{}", account_rules::VERSION);

    let db_path = std::path::Path::new(&config.database.path);
    if !db_path.exists() {
        anyhow::bail!(
            "Database not found at {:?}. Run `account-rules init` first.",
            db_path
        );
    }

    let conn = open_connection(db_path)?;
    info!(path = ?db_path, "database opened");

    let state = AppState {
        db: Arc::new(Mutex::new(conn)),
        rules: Arc::new(AccountRules::new(config.subscription.clone())),
    };

    let addr = config.server_addr();
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("Server running on http://{}", addr);

    axum::serve(listener, app(state)).await?;

    Ok(())
}
