use thiserror::Error;

pub type Result<T> = std::result::Result<T, FlowError>;

/// Failure of a single token-exchange (or bind) round trip.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ExchangeError {
    #[error("Network failure: {0}")]
    NetworkFailure(String),

    /// The handshake broke the connection even with relaxed certificate checks.
    #[error("SSL handshake failure: {0}")]
    SslHandshakeFailure(String),

    #[error("Failed to parse token response: {0}")]
    ParseFailure(String),

    #[error("Provider rejected the request ({status}): {detail}")]
    ProviderRejected { status: u16, detail: String },
}

impl ExchangeError {
    /// Certificate problems are ignored at the transport, so only handshake
    /// failures count as recoverable noise.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, ExchangeError::SslHandshakeFailure(_))
    }
}

#[derive(Error, Debug)]
pub enum FlowError {
    #[error("Secure transport unavailable: {0}")]
    TransportUnavailable(String),

    #[error("Unknown provider: {0}")]
    UnknownProvider(String),

    #[error("Invalid URL {url}: {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("Settings store error: {0}")]
    Settings(String),

    #[error(transparent)]
    Exchange(#[from] ExchangeError),
}
