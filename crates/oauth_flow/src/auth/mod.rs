//! Authorization-code flow core
//!
//! - `provider`: per-provider request shaping and response mapping
//! - `authorize`: consent page URL builder
//! - `redirect`: recognizes the provider redirect among navigations
//! - `exchange`: token and bind requests over a flow-owned HTTP client
//! - `normalize`: token response parsing
//! - `flow`: the state machine tying the steps together

pub mod authorize;
pub mod exchange;
pub mod flow;
pub mod normalize;
pub mod provider;
pub mod redirect;

pub use authorize::authorization_url;
pub use exchange::{ExchangeResponse, TokenExchangeClient, TokenRequest};
pub use flow::{CancelHandle, FlowController, FlowOptions, FlowSession, FlowState};
pub use normalize::{normalize, TokenResult};
pub use provider::{Provider, ProviderProfile};
pub use redirect::intercept;
