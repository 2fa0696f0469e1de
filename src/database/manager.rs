use std::time::Duration;

use sqlx::{postgres::PgPoolOptions, PgPool};
use tracing::info;

use crate::config::DatabaseConfig;
use crate::store::StoreError;

/// Builds the Postgres pool shared by every collection store
pub struct DatabaseManager;

impl DatabaseManager {
    pub async fn connect(url: &str, config: &DatabaseConfig) -> Result<PgPool, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(Duration::from_secs(config.connection_timeout))
            .connect(url)
            .await
            .map_err(|e| StoreError::Connection(e.to_string()))?;

        info!("Created database pool (max {} connections)", config.max_connections);
        Ok(pool)
    }

    /// Pings the pool to ensure connectivity
    pub async fn health_check(pool: &PgPool) -> Result<(), StoreError> {
        sqlx::query("SELECT 1").execute(pool).await?;
        Ok(())
    }

    /// Quote SQL identifier to prevent injection
    pub fn quote_identifier(name: &str) -> String {
        format!("\"{}\"", name.replace('"', "\"\""))
    }

    /// Collection names become table names: [a-zA-Z_][a-zA-Z0-9_]*
    pub fn is_valid_collection_name(name: &str) -> bool {
        let mut chars = name.chars();
        match chars.next() {
            Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
            _ => return false,
        }
        chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validates_collection_names() {
        assert!(DatabaseManager::is_valid_collection_name("users"));
        assert!(DatabaseManager::is_valid_collection_name("_audit_log2"));
        assert!(!DatabaseManager::is_valid_collection_name("2users"));
        assert!(!DatabaseManager::is_valid_collection_name("users-archive"));
        assert!(!DatabaseManager::is_valid_collection_name("users; DROP TABLE x"));
        assert!(!DatabaseManager::is_valid_collection_name(""));
    }

    #[test]
    fn quotes_identifiers() {
        assert_eq!(DatabaseManager::quote_identifier("users"), "\"users\"");
        assert_eq!(DatabaseManager::quote_identifier("a\"b"), "\"a\"\"b\"");
    }
}
