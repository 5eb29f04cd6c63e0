//! UI collaborators: the browser surface and the notification surface

use parking_lot::Mutex;
use tracing::{error, info};

/// Embedded browser the user logs in with.
///
/// Navigations are reported back by the host through
/// [`FlowController::on_navigate`](crate::FlowController::on_navigate).
pub trait BrowserSurface: Send + Sync {
    fn load(&self, url: &str);

    /// Drop cookies so a previous login cannot skip the consent page
    fn clear_session(&self) {}
}

/// Fire-and-forget user notifications
pub trait Notifier: Send + Sync {
    fn show_info(&self, message: &str);

    fn show_error(&self, message: &str, detail: &str);
}

/// Notifier for headless use: messages go to the log
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn show_info(&self, message: &str) {
        info!("[OK] {}", message);
    }

    fn show_error(&self, message: &str, detail: &str) {
        error!("[ERROR] {}: {}", message, detail);
    }
}

/// Browser surface that only remembers what it was asked to load.
/// Used when a remote UI renders the page, e.g. behind the REST server.
#[derive(Debug, Default)]
pub struct DeferredBrowser {
    loaded: Mutex<Option<String>>,
}

impl DeferredBrowser {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn loaded_url(&self) -> Option<String> {
        self.loaded.lock().clone()
    }
}

impl BrowserSurface for DeferredBrowser {
    fn load(&self, url: &str) {
        *self.loaded.lock() = Some(url.to_string());
    }
}
