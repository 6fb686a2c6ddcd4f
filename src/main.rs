use baro_auth::configuration::get_configuration;
use baro_auth::startup::{build_pg_service, run, spawn_blacklist_purge};
use baro_auth::telemetry::init_telemetry;
use sqlx::postgres::PgPoolOptions;
use std::net::TcpListener;

#[tokio::main]
async fn main() -> std::io::Result<()> {
    init_telemetry();

    tracing::info!("Starting application");

    let configuration = match get_configuration() {
        Ok(config) => {
            tracing::info!("Configuration loaded successfully");
            config
        }
        Err(e) => {
            tracing::error!("Failed to read configuration: {}", e);
            return Err(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                "Configuration error"
            ));
        }
    };

    tracing::info!("Attempting to connect to database");

    let pool = PgPoolOptions::new()
        .max_connections(configuration.database.max_connections)
        .acquire_timeout(configuration.database.acquire_timeout())
        .connect(&configuration.database.connection_string())
        .await
        .map_err(|e| {
            tracing::error!("Failed to create connection pool: {}", e);
            std::io::Error::new(
                std::io::ErrorKind::ConnectionRefused,
                "Database connection error"
            )
        })?;

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to run migrations: {}", e);
            std::io::Error::new(std::io::ErrorKind::Other, "Migration error")
        })?;

    tracing::info!("Database ready");

    let service = build_pg_service(&configuration, pool);
    let _purge = spawn_blacklist_purge(
        service.ledger(),
        configuration.auth.blacklist_purge_interval(),
    );

    let address = configuration.application.address();
    let listener = TcpListener::bind(&address)?;
    tracing::info!("Server listening on: {}", address);

    run(listener, service)?.await
}
