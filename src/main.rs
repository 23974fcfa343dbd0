use anyhow::Result;
use axum::{
    handler::Handler,
    http::{HeaderName, HeaderValue, Method},
    middleware::{from_fn, from_fn_with_state},
    response::IntoResponse,
    routing::{any, MethodRouter},
    Json, Router,
};
use chrono::Utc;
use std::sync::Arc;
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    services::ServeDir,
    trace::TraceLayer,
};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod auth;
mod authorize;
mod config;
mod cookies;
mod error;
mod grant;
mod guards;
mod jira;
mod pages;
mod transform;
mod types;

use crate::{
    config::Config,
    grant::GrantExecutor,
    guards::{require_method, require_session, restrict_extensions, AllowedExtensions},
};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub http_client: reqwest::Client,
    pub grants: GrantExecutor,
}

impl AppState {
    pub fn new(config: Config) -> Result<Self> {
        // Every outbound call (token endpoint, Jira, LLM) is bounded by this
        let http_client = reqwest::Client::builder()
            .timeout(config.http_timeout)
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .build()?;

        let grants = GrantExecutor::new(http_client.clone(), config.oauth.clone());

        Ok(Self {
            config: Arc::new(config),
            http_client,
            grants,
        })
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "jira_connect=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = Config::from_env()?;
    info!("Starting {}", config.service_name);

    let app_state = AppState::new(config)?;
    let addr = app_state.config.server_address();
    let app = build_router(app_state);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("service started - {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("service stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("failed to listen for ctrl-c: {}", e);
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!("failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    info!("shutdown signal received");
}

/// `handler` behind the method guard only.
fn allow<H, T>(method: Method, handler: H) -> MethodRouter<AppState>
where
    H: Handler<T, AppState>,
    T: 'static,
{
    any(handler).layer(from_fn_with_state(method, require_method))
}

/// `handler` behind the method guard and the session cookie check.
fn allow_authed<H, T>(method: Method, handler: H) -> MethodRouter<AppState>
where
    H: Handler<T, AppState>,
    T: 'static,
{
    any(handler)
        .layer(from_fn(require_session))
        .layer(from_fn_with_state(method, require_method))
}

fn cors_layer(config: &Config) -> CorsLayer {
    let origins: Vec<HeaderValue> = config
        .cors_allowed_origins
        .iter()
        .filter_map(|origin| {
            HeaderValue::from_str(origin)
                .inspect_err(|e| warn!("Ignoring CORS origin {:?}: {}", origin, e))
                .ok()
        })
        .collect();
    let headers: Vec<HeaderName> = config
        .cors_allowed_headers
        .iter()
        .filter_map(|name| {
            HeaderName::from_bytes(name.as_bytes())
                .inspect_err(|e| warn!("Ignoring CORS header {:?}: {}", name, e))
                .ok()
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_headers(headers)
        .allow_methods([Method::GET, Method::POST])
        .allow_credentials(true)
}

pub fn build_router(app_state: AppState) -> Router {
    let assets: Router<AppState> = Router::new()
        .nest_service("/static", ServeDir::new(&app_state.config.static_dir))
        .nest_service("/f", ServeDir::new(&app_state.config.f_dir))
        .layer(from_fn_with_state(
            AllowedExtensions::web_assets(),
            restrict_extensions,
        ))
        .layer(from_fn_with_state(Method::GET, require_method));

    let cors = cors_layer(&app_state.config);

    Router::new()
        .route("/health", allow(Method::GET, health_check))
        .route("/oauth", allow(Method::POST, auth::generate_token))
        .route("/refresh", allow(Method::POST, auth::refresh_token))
        .route("/auth", allow(Method::GET, pages::consent_redirect))
        .route("/", allow(Method::GET, pages::root))
        .route("/single", allow_authed(Method::POST, jira::single_issue))
        .route("/search", allow_authed(Method::POST, jira::search))
        .route(
            "/transform",
            allow_authed(Method::POST, transform::transform_issue),
        )
        .merge(assets)
        .with_state(app_state)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}

async fn health_check() -> impl IntoResponse {
    let now = Utc::now().format("%a, %d %b %Y %H:%M:%S GMT");
    Json(serde_json::json!({
        "result": format!("Pong at {}", now)
    }))
}
