//! OAuth Flow HTTP Server
//!
//! Lets a remote UI drive authorization flows: the UI renders the consent
//! page the flow asks for and reports every navigation back.

pub mod flow_handlers;

use crate::auth::{CancelHandle, FlowController};
use crate::config::FlowConfig;
use crate::settings::{JsonFileSettingsStore, SettingsStore};
use crate::surface::{DeferredBrowser, Notifier, TracingNotifier};
use axum::{
    routing::{get, post},
    Router as AxumRouter,
};
use dashmap::DashMap;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::Mutex;
use tower_http::trace::TraceLayer;
use tracing::info;
use uuid::Uuid;

/// A running flow and the handles needed to drive or dismiss it
pub struct FlowEntry {
    pub controller: Arc<Mutex<FlowController>>,
    pub cancel: CancelHandle,
    pub browser: Arc<DeferredBrowser>,
}

/// Application state shared across flow handlers
pub struct AppState {
    pub config: FlowConfig,
    pub settings: Arc<dyn SettingsStore>,
    pub notifier: Arc<dyn Notifier>,
    pub flows: DashMap<Uuid, FlowEntry>,
}

impl AppState {
    pub fn new(
        config: FlowConfig,
        settings: Arc<dyn SettingsStore>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            config,
            settings,
            notifier,
            flows: DashMap::new(),
        }
    }
}

/// Routes:
/// - POST /flows - Open a flow and start it
/// - GET /flows/:id - Current flow state
/// - POST /flows/:id/navigate - Report a browser navigation
/// - DELETE /flows/:id - Dismiss a flow
/// - GET /providers - Supported providers
pub fn router(state: Arc<AppState>) -> AxumRouter {
    AxumRouter::new()
        .route("/flows", post(flow_handlers::create_flow))
        .route(
            "/flows/:id",
            get(flow_handlers::get_flow).delete(flow_handlers::dismiss_flow),
        )
        .route("/flows/:id/navigate", post(flow_handlers::navigate_flow))
        .route("/providers", get(flow_handlers::list_providers))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Start the OAuth Flow HTTP server
///
/// Tokens are written to the JSON settings file named by
/// `config.settings_path`, or `~/.oauth_flow/settings.json`.
///
/// # Errors
/// Returns error if the settings store cannot be opened or binding fails
pub async fn start_server(host: &str, port: u16, config: FlowConfig) -> anyhow::Result<()> {
    let store = match &config.settings_path {
        Some(path) => JsonFileSettingsStore::new(path),
        None => JsonFileSettingsStore::open_default(),
    }
    .map_err(|e| anyhow::anyhow!("Failed to open settings store: {}", e))?;

    info!("[OK] Settings store ready at: {}", store.path().display());

    let state = Arc::new(AppState::new(
        config,
        Arc::new(store),
        Arc::new(TracingNotifier),
    ));
    let app = router(state);

    let addr = format!("{}:{}", host, port);
    let listener = TcpListener::bind(&addr).await?;

    info!("[INFO] OAuth Flow server listening on {}", addr);
    info!("[INFO] Available endpoints:");
    info!("  POST   /flows                   - Start an authorization flow");
    info!("  GET    /flows/:id               - Flow state");
    info!("  POST   /flows/:id/navigate      - Report a navigation");
    info!("  DELETE /flows/:id               - Dismiss a flow");
    info!("  GET    /providers               - Supported providers");

    axum::serve(listener, app).await?;

    Ok(())
}
