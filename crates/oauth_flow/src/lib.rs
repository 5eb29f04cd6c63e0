//! OAuth Flow Service
//!
//! Drives OAuth 2.0 authorization-code flows against fitness cloud services
//! and stores the resulting tokens in the application settings.
//!
//! # Features
//! - Consent page URL building and redirect interception
//! - Token exchange with per-provider request quirks
//! - Password-grant login for credential-based services
//! - Polar Flow identity bind step
//! - HTTP server with REST API endpoints driving flows

pub mod auth;
pub mod config;
pub mod error;
pub mod server;
pub mod settings;
pub mod surface;

pub use auth::{
    CancelHandle, FlowController, FlowOptions, FlowState, Provider, ProviderProfile, TokenResult,
};
pub use config::FlowConfig;
pub use error::{ExchangeError, FlowError, Result};
pub use server::{start_server, AppState};
pub use settings::{JsonFileSettingsStore, MemorySettingsStore, SettingsStore};
pub use surface::{BrowserSurface, DeferredBrowser, Notifier, TracingNotifier};
