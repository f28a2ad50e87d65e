// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::{sync::Arc, time::Duration};

use axum_server::tls_rustls::RustlsConfig;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use takeyourpills_server::{
    api::router,
    auth::{JwksManager, KeyRefresher},
    config::AppConfig,
    logging::init_tracing,
    state::AppState,
    storage::{InMemoryUserStore, UserDatabase, UserStore},
};

/// Time allowed for in-flight requests after a shutdown signal.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(10);

#[tokio::main]
async fn main() {
    let config = match AppConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Configuration error: {e}");
            std::process::exit(1);
        }
    };

    init_tracing(config.log_format);

    // Install the ring crypto provider for rustls (must be done before any TLS operations)
    rustls::crypto::ring::default_provider()
        .install_default()
        .expect("Failed to install rustls crypto provider");

    let store: Arc<dyn UserStore> = match &config.data_dir {
        Some(dir) => {
            let db = UserDatabase::open_in_dir(dir).expect("Failed to open user database");
            info!(data_dir = %dir.display(), "Using redb user store");
            Arc::new(db)
        }
        None => {
            warn!("DATA_DIR not set, users are kept in memory and lost on restart");
            Arc::new(InMemoryUserStore::new())
        }
    };

    let jwks = Arc::new(
        JwksManager::new(config.auth.jwks_url.clone())
            .expect("Failed to build JWKS HTTP client")
            .with_cache_ttl(config.auth.jwks_cache_ttl),
    );

    if config.auth.callback_enabled {
        warn!(
            "POST /api/auth/callback is enabled and trusts client-asserted claims; \
             restrict it at the network edge or set AUTH_CALLBACK_ENABLED=false"
        );
    }

    info!(
        authority = %config.auth.authority,
        issuer = %config.auth.issuer,
        jwks_url = %config.auth.jwks_url,
        "Identity provider configured"
    );

    let state = AppState::new(jwks.clone(), store, config.auth.clone());
    let app = router(state);

    let shutdown = CancellationToken::new();
    let refresher = tokio::spawn(KeyRefresher::new(jwks).run(shutdown.clone()));
    tokio::spawn(watch_signals(shutdown.clone()));

    let addr = config.server.bind_addr().expect("Failed to parse bind address");

    match &config.server.tls {
        Some(tls) => {
            let tls_config = RustlsConfig::from_pem_file(&tls.cert, &tls.key)
                .await
                .expect("Failed to load TLS certificate and key");

            let handle = axum_server::Handle::new();
            let on_shutdown = handle.clone();
            let token = shutdown.clone();
            tokio::spawn(async move {
                token.cancelled().await;
                on_shutdown.graceful_shutdown(Some(SHUTDOWN_GRACE));
            });

            info!(%addr, "TakeYourPills server listening on https://{addr} (docs at /docs)");
            if let Err(e) = axum_server::bind_rustls(addr, tls_config)
                .handle(handle)
                .serve(app.into_make_service())
                .await
            {
                error!(error = %e, "HTTPS server failed");
            }
        }
        None => {
            let listener = tokio::net::TcpListener::bind(addr)
                .await
                .expect("Failed to bind listener");

            info!(%addr, "TakeYourPills server listening on http://{addr} (docs at /docs)");
            if let Err(e) = axum::serve(listener, app)
                .with_graceful_shutdown(shutdown.clone().cancelled_owned())
                .await
            {
                error!(error = %e, "HTTP server failed");
            }
        }
    }

    shutdown.cancel();
    let _ = refresher.await;
    info!("Server stopped");
}

/// Cancel `shutdown` on Ctrl-C or SIGTERM.
async fn watch_signals(shutdown: CancellationToken) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
        _ = shutdown.cancelled() => return,
    }

    info!("Shutdown signal received");
    shutdown.cancel();
}
