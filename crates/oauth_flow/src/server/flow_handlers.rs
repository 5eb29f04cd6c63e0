//! Flow Handlers
//!
//! HTTP handlers that open, drive and dismiss authorization flows. The
//! remote UI loads `authorize_url` in its own browser view and posts every
//! navigation it sees to `/flows/:id/navigate`.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::auth::{FlowController, FlowOptions, FlowState, Provider};
use crate::surface::DeferredBrowser;
use crate::FlowError;

use super::{AppState, FlowEntry};

/// Request to open a flow
#[derive(Debug, Deserialize)]
pub struct CreateFlowRequest {
    /// Provider key or service id, e.g. "strava" or "PolarFlow"
    pub provider: String,
    #[serde(default)]
    pub base_url: Option<String>,
    /// Athlete identity for the Polar Flow bind call
    #[serde(default)]
    pub member_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct NavigateRequest {
    pub url: String,
}

/// Flow snapshot returned by every flow endpoint
#[derive(Debug, Serialize)]
pub struct FlowView {
    pub id: Uuid,
    pub provider: Provider,
    #[serde(flatten)]
    pub state: FlowState,
    /// Page the remote UI should display, if any
    pub page: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ProviderInfo {
    pub key: &'static str,
    pub service_id: &'static str,
    pub name: String,
    /// Client id present in the configuration
    pub configured: bool,
    /// Logs in with stored credentials instead of a consent page
    pub browserless: bool,
    pub binds_identity: bool,
}

type HandlerError = (StatusCode, String);

fn view(id: Uuid, controller: &FlowController, browser: &DeferredBrowser) -> FlowView {
    FlowView {
        id,
        provider: controller.provider(),
        state: controller.state().clone(),
        page: browser.loaded_url(),
    }
}

type FlowHandles = (Arc<Mutex<FlowController>>, Arc<DeferredBrowser>);

fn lookup(state: &AppState, id: Uuid) -> Result<FlowHandles, HandlerError> {
    state
        .flows
        .get(&id)
        .map(|entry| (entry.controller.clone(), entry.browser.clone()))
        .ok_or_else(|| (StatusCode::NOT_FOUND, format!("Unknown flow: {}", id)))
}

/// Open a flow and show its consent page
pub async fn create_flow(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateFlowRequest>,
) -> Result<Json<FlowView>, HandlerError> {
    let provider: Provider = req
        .provider
        .parse()
        .map_err(|e: FlowError| (StatusCode::BAD_REQUEST, e.to_string()))?;

    tracing::info!("[INFO] Opening {} flow", provider);

    let mut controller = FlowController::new(
        provider,
        &state.config,
        FlowOptions {
            base_url: req.base_url,
            member_id: req.member_id,
        },
        state.settings.clone(),
        state.notifier.clone(),
    )
    .map_err(|e| (StatusCode::SERVICE_UNAVAILABLE, e.to_string()))?;

    let id = Uuid::new_v4();
    let browser = Arc::new(DeferredBrowser::new());
    let cancel = controller.cancel_handle();
    let controller = Arc::new(Mutex::new(controller));

    // Registered before starting: browserless providers exchange inside start
    state.flows.insert(
        id,
        FlowEntry {
            controller: controller.clone(),
            cancel,
            browser: browser.clone(),
        },
    );

    let mut controller = controller.lock().await;
    controller.start(browser.as_ref()).await;
    let response = view(id, &controller, &browser);
    release_if_finished(&state, id, &controller);

    Ok(Json(response))
}

/// Drop a finished flow, with its HTTP client and tokens. The response that
/// reported the terminal state is the last one the flow serves.
fn release_if_finished(state: &AppState, id: Uuid, controller: &FlowController) {
    if controller.state().is_terminal() && state.flows.remove(&id).is_some() {
        tracing::info!("[OK] Flow {} finished and released", id);
    }
}

pub async fn get_flow(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<FlowView>, HandlerError> {
    let (controller, browser) = lookup(&state, id)?;
    let controller = controller.lock().await;
    Ok(Json(view(id, &controller, &browser)))
}

/// Report a navigation of the remote browser view
pub async fn navigate_flow(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(req): Json<NavigateRequest>,
) -> Result<Json<FlowView>, HandlerError> {
    let (controller, browser) = lookup(&state, id)?;
    let mut controller = controller.lock().await;
    controller.on_navigate(&req.url).await;
    let response = view(id, &controller, &browser);
    release_if_finished(&state, id, &controller);
    Ok(Json(response))
}

/// Dismiss a flow. A pending exchange is abandoned and nothing is stored.
pub async fn dismiss_flow(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<FlowView>, HandlerError> {
    let (_, entry) = state
        .flows
        .remove(&id)
        .ok_or_else(|| (StatusCode::NOT_FOUND, format!("Unknown flow: {}", id)))?;

    // Wakes a navigate call blocked on the network before taking the lock
    entry.cancel.cancel();

    let mut controller = entry.controller.lock().await;
    controller.dismiss();
    tracing::info!("[OK] Flow {} closed", id);

    Ok(Json(view(id, &controller, &entry.browser)))
}

pub async fn list_providers(State(state): State<Arc<AppState>>) -> Json<Vec<ProviderInfo>> {
    let providers = Provider::ALL
        .into_iter()
        .map(|provider| ProviderInfo {
            key: provider.key(),
            service_id: provider.service_id(),
            name: provider.to_string(),
            configured: state
                .config
                .credentials(provider)
                .is_some_and(|c| c.client_id.is_some()),
            browserless: provider.profile().bypasses_browser(),
            binds_identity: provider.profile().needs_bind(),
        })
        .collect();

    Json(providers)
}
