use async_trait::async_trait;
use rocket::serde::Deserialize;
use rocket::Config;
use sea_orm::ConnectOptions;
use sea_orm_rocket::{rocket::figment::Figment, Database};
use std::time::Duration;

#[derive(Database, Debug)]
#[database("sea_orm")]
pub struct Db(SeaOrmPool);

#[derive(Debug, Clone)]
pub struct SeaOrmPool {
    pub conn: sea_orm::DatabaseConnection,
}

#[async_trait]
impl sea_orm_rocket::Pool for SeaOrmPool {
    type Error = sea_orm::DbErr;

    type Connection = sea_orm::DatabaseConnection;

    async fn init(_figment: &Figment) -> Result<Self, Self::Error> {
        let config = Config::figment().extract::<ServiceConfig>().unwrap();
        let mut options: ConnectOptions = config.database_url.into();
        options
            .max_connections(config.sqlx_max_connections)
            .min_connections(match config.sqlx_min_connections {
                Some(v) => v,
                None => 2,
            })
            .connect_timeout(Duration::from_secs(match config.sqlx_connect_timeout {
                Some(v) => v,
                None => 8,
            }))
            .idle_timeout(Duration::from_secs(match config.sqlx_idle_timeout {
                Some(v) => v,
                None => 8,
            }))
            .max_lifetime(Duration::from_secs(match config.sqlx_max_lifetime {
                Some(v) => v,
                None => 8,
            }))
            .sqlx_logging(match config.sqlx_logging {
                Some(v) => v,
                None => false,
            })
            .sqlx_logging_level(
                match config.sqlx_logging_level.parse::<log::LevelFilter>() {
                    Ok(level) => level,
                    Err(_) => log::LevelFilter::Info,
                },
            );

        let conn = sea_orm::Database::connect(options).await?;

        Ok(SeaOrmPool { conn })
    }

    fn borrow(&self) -> &Self::Connection {
        &self.conn
    }
}

/// Which submission protocol the relay speaks. `queue_poll` answers with a
/// queue id that has to be polled for the hash; `sync_hash` answers with the
/// hash in the submission response itself.
#[derive(Copy, Clone, Debug, PartialEq, Deserialize)]
#[serde(crate = "rocket::serde", rename_all = "snake_case")]
pub enum RelayMode {
    QueuePoll,
    SyncHash,
}

#[derive(Clone, Deserialize)]
#[serde(crate = "rocket::serde")]
pub struct ServiceConfig {
    pub database_url: String,
    sqlx_max_connections: u32,
    sqlx_min_connections: Option<u32>,
    sqlx_connect_timeout: Option<u64>,
    sqlx_idle_timeout: Option<u64>,
    sqlx_max_lifetime: Option<u64>,
    sqlx_logging: Option<bool>,
    sqlx_logging_level: String,
    pub rust_log: String,
    pub service_log: String,
    pub service_name: String,
    pub table_name: String,
    pub chain: String,
    pub relay_base_url: String,
    pub relay_mode: RelayMode,
    pub relay_auth_token: Option<String>,
    pub allow_untrusted_relay_certificate: bool,
    pub relay_request_timeout_secs: Option<u64>,
    pub resolver_max_attempts: Option<u32>,
    pub resolver_delay_ms: Option<u64>,
    pub function_signature: String,
    pub contract_address: String,
    pub backend_wallet: String,
    pub rpc_url: String,
    pub chain_id: u64,
    pub time_interval_ms: u64,
    pub event_log_dir: Option<String>,
}
