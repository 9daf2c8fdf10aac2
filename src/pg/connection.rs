use crate::util::{sanitize_connection_error, sanitize_url, Result, SchemaError};
use sqlx::postgres::{PgConnectOptions, PgPoolOptions};
use sqlx::{Pool, Postgres};
use std::str::FromStr;
use tracing::debug;

/// One leader transaction plus three snapshot workers.
const MAX_CONNECTIONS: u32 = 4;

/// Oldest server whose catalogs carry every column the queries read
/// (`attgenerated` appeared in 12).
pub const MIN_SERVER_VERSION: i32 = 120000;

pub struct PgConnection {
    pool: Pool<Postgres>,
}

impl PgConnection {
    pub async fn new(connection_string: &str) -> Result<Self> {
        let options = PgConnectOptions::from_str(connection_string)
            .map_err(|e| {
                SchemaError::ConfigError(format!(
                    "Invalid connection string {}: {}",
                    sanitize_url(connection_string),
                    sanitize_connection_error(connection_string, &e.to_string())
                ))
            })?
            .application_name(env!("CARGO_PKG_NAME"))
            // Names rendered by format_type, regprocedure and pg_get_*def
            // come out schema-qualified regardless of the role's settings.
            .options([("search_path", "pg_catalog")]);

        let pool = PgPoolOptions::new()
            .max_connections(MAX_CONNECTIONS)
            .connect_with(options)
            .await
            .map_err(|e| {
                let sanitized_error = sanitize_connection_error(connection_string, &e.to_string());
                SchemaError::DatabaseError(format!(
                    "Failed to connect to {}: {sanitized_error}",
                    sanitize_url(connection_string)
                ))
            })?;

        debug!(url = %sanitize_url(connection_string), "connected");
        Ok(PgConnection { pool })
    }

    pub fn pool(&self) -> &Pool<Postgres> {
        &self.pool
    }

    /// Fails unless the server is at least [`MIN_SERVER_VERSION`].
    pub async fn ensure_supported_version(&self) -> Result<i32> {
        let version: String = sqlx::query_scalar("SELECT current_setting('server_version_num')")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| SchemaError::DatabaseError(format!("Failed to read server version: {e}")))?;
        let version: i32 = version.trim().parse().map_err(|_| {
            SchemaError::DatabaseError(format!("Unexpected server_version_num: {version}"))
        })?;

        if version < MIN_SERVER_VERSION {
            return Err(SchemaError::DatabaseError(format!(
                "PostgreSQL {} is not supported; 12 or later is required",
                version / 10000
            )));
        }
        Ok(version)
    }
}
