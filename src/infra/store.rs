//! Document-store connection supervision.
//!
//! Startup performs exactly one bounded connection attempt: [`prepare`]
//! builds the lazy driver handle without touching the network topology, and
//! [`verify`] forces server selection with a `ping`. Reconnection after a
//! successful startup is the driver's concern.

use std::time::Duration;

use mongodb::{Client, Database, bson::doc, error::ErrorKind, options::ClientOptions};
use thiserror::Error;

use crate::config::StoreUri;

/// Database used when the connection string names none, matching driver
/// shell conventions.
const FALLBACK_DATABASE: &str = "test";

const APP_NAME: &str = "stilo";

/// Operator guidance emitted alongside a startup connection failure.
pub const REMEDIATION_HINTS: [&str; 3] = [
    "check that this host's IP address is on the cluster allow-list",
    "verify the username and password in the connection string",
    "confirm the cluster is active and reachable",
];

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("invalid connection options: {source}")]
    Options {
        #[source]
        source: mongodb::error::Error,
    },
    #[error("store connection failed ({kind}): {message}")]
    Unreachable {
        kind: &'static str,
        message: String,
        reason: Option<String>,
    },
}

impl StoreError {
    fn options(source: mongodb::error::Error) -> Self {
        Self::Options { source }
    }

    fn unreachable(err: mongodb::error::Error) -> Self {
        let (kind, reason) = classify(&err);
        Self::Unreachable {
            kind,
            message: err.to_string(),
            reason,
        }
    }
}

/// Successful connection outcome.
#[derive(Debug, Clone)]
pub struct StoreReady {
    /// Name of the resolved default database.
    pub database: String,
}

/// Build the driver handle for the given connection string.
///
/// The server-selection timeout is overridden with the configured bound so a
/// misconfigured deployment fails fast instead of waiting out the driver
/// default. No cluster I/O happens here, so the returned handle can be wired
/// into the request pipeline immediately while [`verify`] runs.
pub async fn prepare(uri: &StoreUri, selection_timeout: Duration) -> Result<Database, StoreError> {
    let mut options = ClientOptions::parse(uri.as_str())
        .await
        .map_err(StoreError::options)?;
    options.server_selection_timeout = Some(selection_timeout);
    options.app_name.get_or_insert_with(|| APP_NAME.to_string());

    let client = Client::with_options(options).map_err(StoreError::options)?;
    Ok(client
        .default_database()
        .unwrap_or_else(|| client.database(FALLBACK_DATABASE)))
}

/// The single startup connection attempt: ping the store, forcing server
/// selection within the bound configured in [`prepare`].
pub async fn verify(database: Database) -> Result<StoreReady, StoreError> {
    database
        .run_command(doc! { "ping": 1 })
        .await
        .map_err(StoreError::unreachable)?;

    Ok(StoreReady {
        database: database.name().to_string(),
    })
}

fn classify(err: &mongodb::error::Error) -> (&'static str, Option<String>) {
    match err.kind.as_ref() {
        ErrorKind::ServerSelection { message, .. } => {
            ("no reachable servers", Some(message.clone()))
        }
        ErrorKind::Authentication { message, .. } => {
            ("authentication rejected", Some(message.clone()))
        }
        ErrorKind::DnsResolve { message, .. } => ("dns resolution failed", Some(message.clone())),
        ErrorKind::Io(source) => ("io failure", Some(source.to_string())),
        _ => ("driver error", None),
    }
}
