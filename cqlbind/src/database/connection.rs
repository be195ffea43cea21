use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

use crate::config::ConnectionConfig;
use crate::errors::SchemaError;

/// The slice of a live driver session that schema maintenance needs.
#[async_trait]
pub trait SchemaSession: Send + Sync {
    /// Run a single schema statement.
    async fn execute(&self, cql: &str) -> Result<(), SchemaError>;

    /// Column names of `keyspace.table`; empty when the table does not exist.
    async fn table_columns(&self, keyspace: &str, table: &str) -> Result<Vec<String>, SchemaError>;

    /// Field names of the user type `keyspace.type_name`; empty when it does not exist.
    async fn type_fields(&self, keyspace: &str, type_name: &str) -> Result<Vec<String>, SchemaError>;

    /// Request timeout applied to statements that don't set their own.
    fn default_timeout(&self) -> Option<Duration>;

    fn set_default_timeout(&self, timeout: Option<Duration>);

    fn describe(&self) -> String;
}

/// Opens sessions from a resolved connection config.
#[async_trait]
pub trait Connector: Send + Sync {
    async fn connect(&self, config: &ConnectionConfig) -> Result<Arc<dyn SchemaSession>, SchemaError>;
}
