use actix_web::dev::Server;
use actix_web::{web, App, HttpServer};
use chrono::Utc;
use sqlx::PgPool;
use std::net::TcpListener;
use std::sync::Arc;
use std::time::Duration;

use crate::auth::{AuthService, PasswordHasher};
use crate::configuration::Settings;
use crate::error::{AppError, ValidationError};
use crate::logger::LoggerMiddleware;
use crate::routes;
use crate::security::SecurityHeaders;
use crate::store::{CredentialStore, PgCredentialStore, PgRevocationLedger, RevocationLedger};

const MAX_JSON_BODY_BYTES: usize = 4096;

/// Wires the auth service to the given stores using configured lifetimes and timeouts.
pub fn build_service(
    settings: &Settings,
    store: Arc<dyn CredentialStore>,
    ledger: Arc<dyn RevocationLedger>,
) -> AuthService {
    AuthService::new(
        store,
        ledger,
        PasswordHasher::new(settings.auth.password_hash_cost),
        &settings.jwt,
        settings.auth.store_timeout(),
    )
}

/// Postgres-backed service for the binary
pub fn build_pg_service(settings: &Settings, pool: PgPool) -> AuthService {
    build_service(
        settings,
        Arc::new(PgCredentialStore::new(pool.clone())),
        Arc::new(PgRevocationLedger::new(pool)),
    )
}

/// Malformed or non-JSON bodies become a 400 validation error.
fn json_config() -> web::JsonConfig {
    web::JsonConfig::default()
        .limit(MAX_JSON_BODY_BYTES)
        .error_handler(|err, _req| {
            tracing::debug!(error = %err, "Rejected request body");
            AppError::Validation(vec![ValidationError::InvalidFormat("body".to_string())]).into()
        })
}

pub fn run(listener: TcpListener, service: AuthService) -> Result<Server, std::io::Error> {
    let decoder = service.decoder();
    let service = web::Data::new(service);

    let server = HttpServer::new(move || {
        let decoder = decoder.clone();
        App::new()
            // Global middleware; the last one wrapped runs first
            .wrap(SecurityHeaders)
            .wrap(LoggerMiddleware)

            // Shared state
            .app_data(service.clone())
            .app_data(json_config())

            .configure(|cfg| routes::configure(cfg, &decoder))
    })
    .listen(listener)?
    .run();

    Ok(server)
}

/// Periodically drops blacklist entries whose tokens have expired anyway.
pub fn spawn_blacklist_purge(
    ledger: Arc<dyn RevocationLedger>,
    every: Duration,
) -> tokio::task::JoinHandle<()> {
    let every = every.max(Duration::from_secs(1));

    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        loop {
            ticker.tick().await;
            match ledger.purge_expired(Utc::now()).await {
                Ok(0) => {}
                Ok(purged) => tracing::info!(purged = purged, "Expired blacklist entries purged"),
                Err(e) => tracing::warn!(error = %e, "Blacklist purge failed"),
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{BlacklistEntry, InMemoryRevocationLedger};
    use uuid::Uuid;

    #[tokio::test]
    async fn test_purge_task_drops_expired_entries() {
        let ledger = InMemoryRevocationLedger::new();
        let now = Utc::now();
        ledger
            .revoke(&BlacklistEntry {
                jti: Uuid::new_v4(),
                user_id: Uuid::new_v4(),
                expires_at: now - chrono::Duration::seconds(1),
                blacklisted_at: now - chrono::Duration::seconds(30),
            })
            .await
            .unwrap();

        let handle = spawn_blacklist_purge(Arc::new(ledger.clone()), Duration::from_secs(3600));
        // The first tick fires immediately
        for _ in 0..50 {
            if ledger.is_empty() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        handle.abort();

        assert!(ledger.is_empty());
    }
}
