//! Process entry: validate configuration, supervise the store connection,
//! assemble the request pipeline, serve.
//!
//! Exit codes: 2 = store connection string missing, 3 = scheme rejected,
//! 4 = store unreachable at startup, 1 = any other startup failure. Exit
//! decisions live only here.

use std::{future::IntoFuture, process, sync::Arc};

use stilo::{
    config::{self, LoadError},
    infra::{
        error::InfraError,
        http::{self, AppState, RouteMount},
        store::{self, StoreError},
        telemetry,
        uploads::UploadStorage,
    },
    routes,
};
use thiserror::Error;
use tokio::net::TcpListener;
use tracing::{Dispatch, Level, dispatcher, error, info};
use tracing_subscriber::fmt as tracing_fmt;

#[derive(Debug, Error)]
enum StartupError {
    #[error(transparent)]
    Config(#[from] LoadError),
    #[error(transparent)]
    Infra(#[from] InfraError),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("{0}")]
    Unexpected(String),
}

impl StartupError {
    fn unexpected(message: impl Into<String>) -> Self {
        Self::Unexpected(message.into())
    }

    fn exit_code(&self) -> i32 {
        match self {
            Self::Config(LoadError::MissingStoreUri) => 2,
            Self::Config(LoadError::StoreUriScheme { .. }) => 3,
            Self::Store(_) => 4,
            Self::Config(_) | Self::Infra(_) | Self::Unexpected(_) => 1,
        }
    }
}

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        report_startup_error(&error);
        process::exit(error.exit_code());
    }
}

fn report_startup_error(error: &StartupError) {
    if dispatcher::has_been_set() {
        log_startup_error(error);
        return;
    }

    let subscriber = tracing_fmt().with_max_level(Level::ERROR).finish();
    let dispatch = Dispatch::new(subscriber);
    dispatcher::with_default(&dispatch, || {
        log_startup_error(error);
    });
}

fn log_startup_error(error: &StartupError) {
    if let StartupError::Store(StoreError::Unreachable {
        kind,
        message,
        reason,
    }) = error
    {
        error!(
            target = "stilo::startup",
            kind = kind,
            message = %message,
            "store connection failed"
        );
        if let Some(reason) = reason {
            error!(target = "stilo::startup", reason = %reason, "failure reason");
        }
        for hint in store::REMEDIATION_HINTS {
            error!(target = "stilo::startup", hint = hint, "remediation");
        }
        return;
    }

    error!(target = "stilo::startup", error = %error, "startup error");
}

async fn run() -> Result<(), StartupError> {
    let (_cli_args, settings) = config::load_with_cli()?;
    telemetry::init(&settings.logging)?;

    info!(
        target = "stilo::startup",
        uri = %settings.store.uri.redacted(),
        timeout_ms = settings.store.selection_timeout.as_millis() as u64,
        "attempting store connection"
    );

    let database = store::prepare(&settings.store.uri, settings.store.selection_timeout).await?;

    // Single bounded attempt, supervised concurrently with pipeline assembly
    // below: the application is servable before the outcome resolves.
    let supervisor = tokio::spawn(store::verify(database.clone()));

    let uploads = Arc::new(
        UploadStorage::new(settings.uploads.directory.clone()).map_err(InfraError::Io)?,
    );
    let state = AppState {
        store: database,
        uploads,
    };
    let mounts = vec![
        RouteMount::new(routes::auth::MOUNT_PREFIX, routes::auth::router()),
        RouteMount::new(routes::blogs::MOUNT_PREFIX, routes::blogs::router()),
    ];
    let app = http::build_router(state, mounts, settings.http.body_limit);

    let listener = TcpListener::bind(settings.server.addr)
        .await
        .map_err(InfraError::Io)?;
    info!(target = "stilo::startup", addr = %settings.server.addr, "listening");
    let server = tokio::spawn(axum::serve(listener, app.into_make_service()).into_future());

    match supervisor.await {
        Ok(Ok(ready)) => info!(
            target = "stilo::startup",
            database = %ready.database,
            "store connection established"
        ),
        Ok(Err(err)) => return Err(StartupError::Store(err)),
        Err(err) => {
            return Err(StartupError::unexpected(format!(
                "connection supervisor task failed: {err}"
            )));
        }
    }

    server
        .await
        .map_err(|err| StartupError::unexpected(format!("server task failed: {err}")))?
        .map_err(InfraError::Io)?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exit_codes_differentiate_failure_kinds() {
        assert_eq!(
            StartupError::Config(LoadError::MissingStoreUri).exit_code(),
            2
        );
        assert_eq!(
            StartupError::Config(LoadError::StoreUriScheme {
                uri: "redis://host".to_string()
            })
            .exit_code(),
            3
        );
        assert_eq!(
            StartupError::Store(StoreError::Unreachable {
                kind: "no reachable servers",
                message: "server selection timed out".to_string(),
                reason: None,
            })
            .exit_code(),
            4
        );
        assert_eq!(
            StartupError::unexpected("anything else").exit_code(),
            1
        );
    }
}
