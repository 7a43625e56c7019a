//! Warden Server: access-control enforcement service
//!
//! Main entry point that wires all crates together and starts the server.

use std::future::IntoFuture;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tracing_subscriber::{EnvFilter, fmt};

use warden_auth::rbac::{PermissionCache, PermissionResolver};
use warden_auth::revocation::RevocationRegistry;
use warden_auth::store::{PermissionStore, PrincipalDirectory};
use warden_auth::token::TokenService;
use warden_auth::AccessGate;
use warden_cache::CacheManager;
use warden_core::config::AppConfig;
use warden_core::error::AppError;
use warden_database::DatabasePool;
use warden_database::repositories::{PrincipalRepository, RoleRepository};

#[tokio::main]
async fn main() {
    let env = std::env::var("WARDEN_ENV")
        .or_else(|_| std::env::var("APP_ENV"))
        .unwrap_or_else(|_| "development".to_string());

    let config = match AppConfig::load(&env) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load configuration: {e}");
            std::process::exit(1);
        }
    };

    init_logging(&config);
    tracing::info!(env = %env, "Configuration loaded");

    if let Err(e) = config.validate(&env) {
        tracing::error!(error = %e, "Refusing to start with this configuration");
        std::process::exit(1);
    }
    if config.auth.uses_default_secret() {
        tracing::warn!(env = %env, "Signing tokens with the placeholder secret; never deploy this");
    }

    if let Err(e) = run(config).await {
        tracing::error!(error = %e, "Server error");
        std::process::exit(1);
    }
}

/// Initialize tracing/logging
fn init_logging(config: &AppConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.logging.level));

    match config.logging.format.as_str() {
        "json" => {
            fmt()
                .json()
                .with_env_filter(filter)
                .with_target(true)
                .with_thread_ids(true)
                .init();
        }
        _ => {
            fmt()
                .pretty()
                .with_env_filter(filter)
                .with_target(true)
                .init();
        }
    }
}

/// Main server run function
async fn run(config: AppConfig) -> Result<(), AppError> {
    tracing::info!("Starting Warden v{}", env!("CARGO_PKG_VERSION"));

    // ── Step 1: Database connection + migrations ─────────────────
    let db_pool = DatabasePool::connect(&config.database).await?;
    warden_database::migration::run_migrations(db_pool.pool()).await?;
    tracing::info!("Database migrations complete");

    // ── Step 2: Initialize cache ─────────────────────────────────
    tracing::info!(provider = %config.cache.provider, "Initializing cache");
    let cache = Arc::new(CacheManager::new(&config.cache).await?);

    // ── Step 3: Repositories ─────────────────────────────────────
    let directory: Arc<dyn PrincipalDirectory> =
        Arc::new(PrincipalRepository::new(db_pool.pool().clone()));
    let permission_store: Arc<dyn PermissionStore> =
        Arc::new(RoleRepository::new(db_pool.pool().clone()));

    // ── Step 4: Tokens, revocation, permissions ──────────────────
    let tokens = Arc::new(TokenService::new(&config.auth));
    let revocations = Arc::new(RevocationRegistry::new(
        Arc::clone(&tokens),
        Some(Arc::clone(&cache)),
        &config.auth,
        &config.cache,
    ));
    let permission_cache = PermissionCache::new(Arc::clone(&cache), &config.auth, &config.cache);
    let resolver = PermissionResolver::new(permission_store, permission_cache);

    // ── Step 5: Access gate ──────────────────────────────────────
    let gate = Arc::new(AccessGate::new(tokens, revocations, directory, resolver));

    // ── Step 6: Build and start HTTP server ──────────────────────
    let app_state = warden_api::AppState {
        config: Arc::new(config.clone()),
        database: Some(db_pool.clone()),
        cache: Arc::clone(&cache),
        gate,
    };

    let app = warden_api::build_router(app_state);

    let addr = config.server.bind_address();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| AppError::internal(format!("Failed to bind {addr}: {e}")))?;

    tracing::info!(addr = %addr, "Warden server listening");

    // ── Step 7: Graceful shutdown ────────────────────────────────
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let server = axum::serve(listener, app).with_graceful_shutdown(async move {
        shutdown_signal().await;
        tracing::info!("Shutdown signal received, starting graceful shutdown...");
        let _ = shutdown_tx.send(true);
    });

    let grace = Duration::from_secs(config.server.shutdown_grace_seconds);
    tokio::select! {
        result = server.into_future() => {
            result.map_err(|e| AppError::internal(format!("Server error: {e}")))?;
        }
        _ = grace_expired(shutdown_rx, grace) => {
            tracing::warn!(grace_seconds = grace.as_secs(), "Shutdown grace period elapsed, dropping open connections");
        }
    }

    db_pool.close().await;
    tracing::info!("Warden server shut down gracefully");
    Ok(())
}

/// Resolves once shutdown has been requested and `grace` has passed.
async fn grace_expired(mut shutdown_rx: watch::Receiver<bool>, grace: Duration) {
    if shutdown_rx.wait_for(|requested| *requested).await.is_err() {
        std::future::pending::<()>().await;
    }
    tokio::time::sleep(grace).await;
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
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
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
