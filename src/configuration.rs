use config::ConfigError;
use std::time::Duration;

#[derive(serde::Deserialize, Clone)]
pub struct Settings {
    pub database: DatabaseSettings,
    pub application: ApplicationSettings,
    pub jwt: JwtSettings,
    pub auth: AuthSettings,
}

#[derive(serde::Deserialize, Clone)]
pub struct ApplicationSettings {
    pub host: String,
    pub port: u16,
}

impl ApplicationSettings {
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[derive(serde::Deserialize, Clone)]
pub struct DatabaseSettings {
    pub username: String,
    pub password: String,
    pub port: u16,
    pub host: String,
    pub database_name: String,
    pub max_connections: u32,
    pub acquire_timeout_secs: u64,
}

impl DatabaseSettings {
    pub fn connection_string(&self) -> String {
        format!(
            "postgres://{}:{}@{}:{}/{}",
            self.username, self.password, self.host, self.port, self.database_name
        )
    }

    pub fn connection_string_without_db(&self) -> String {
        format!(
            "postgres://{}:{}@{}:{}",
            self.username, self.password, self.host, self.port
        )
    }

    pub fn acquire_timeout(&self) -> Duration {
        Duration::from_secs(self.acquire_timeout_secs)
    }
}

/// JWT signing and lifetime settings
#[derive(serde::Deserialize, Clone)]
pub struct JwtSettings {
    pub secret: String,
    pub access_token_expiry: i64,   // seconds (e.g., 300 for 5 minutes)
    pub refresh_token_expiry: i64,  // seconds (e.g., 86400 for 1 day)
    pub issuer: String,
}

/// Credential handling and store access settings
#[derive(serde::Deserialize, Clone)]
pub struct AuthSettings {
    pub password_hash_cost: u32,
    pub store_timeout_ms: u64,
    pub blacklist_purge_interval_secs: u64,
}

impl AuthSettings {
    pub fn store_timeout(&self) -> Duration {
        Duration::from_millis(self.store_timeout_ms)
    }

    pub fn blacklist_purge_interval(&self) -> Duration {
        Duration::from_secs(self.blacklist_purge_interval_secs)
    }
}

/// Loads `configuration.{yaml,toml,json}` from the working directory, then
/// applies `APP__SECTION__KEY` environment overrides.
pub fn get_configuration() -> Result<Settings, ConfigError> {
    let settings = config::Config::builder()
        .add_source(config::File::with_name("configuration").required(false))
        .add_source(
            config::Environment::with_prefix("APP")
                .prefix_separator("__")
                .separator("__"),
        )
        .build()?;
    settings.try_deserialize::<Settings>()
}
