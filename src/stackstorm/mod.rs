// StackStorm integration
// Resolves the per-session connection and proxies execution lookups

mod client;
mod connections;
mod resolver;

use thiserror::Error;

pub use client::{ConnectionCheck, StackStormClient};
pub use connections::{ConnectionEntry, ConnectionsConfig};
pub use resolver::{
    CONNECTION_KEY, CUSTOM_CONNECTION, CustomConnection, ResolvedConnection, StoredConnection,
    resolve,
};

#[derive(Debug, Error)]
pub enum StackStormError {
    #[error("Custom connection selected but no custom connection data found.")]
    MissingCustomConnection,
    #[error("No StackStorm connection configured and no default connection available.")]
    NoConnection,
    #[error("Connection '{0}' not found in preconfigured connections.")]
    UnknownConnection(String),
    #[error("Invalid StackStorm URL: {0}")]
    InvalidUrl(String),
    #[error("Authentication failed: Invalid API key")]
    Unauthorized,
    #[error("Execution {0} not found")]
    ExecutionNotFound(String),
    #[error("StackStorm API error: {body}")]
    Api { status: u16, body: String },
    #[error("Failed to connect to StackStorm: {0}")]
    Request(#[from] reqwest::Error),
}
