use async_trait::async_trait;
use parking_lot::Mutex;
use scylla::transport::execution_profile::{ExecutionProfile, ExecutionProfileHandle};
use scylla::transport::session::PoolSize;
use scylla::transport::Compression;
use scylla::{Session, SessionBuilder};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

use crate::config::ConnectionConfig;
use crate::errors::SchemaError;
use super::connection::{Connector, SchemaSession};

/// ScyllaDB/Cassandra session wrapper used for schema maintenance
pub struct ScyllaConnection {
    session: Arc<Session>,
    profile: ExecutionProfileHandle,
    request_timeout: Mutex<Option<Duration>>,
    contact_points: Vec<String>,
}

impl ScyllaConnection {
    /// Open a session against the configured cluster.
    ///
    /// The keyspace is not selected here: it may not exist yet, and every
    /// schema statement names its keyspace explicitly.
    pub async fn new(config: &ConnectionConfig) -> Result<Self, SchemaError> {
        let contact_points = config.contact_points();
        info!("Connecting to Cassandra cluster: {:?}", contact_points);

        let request_timeout = config.setup.request_timeout();
        let profile = ExecutionProfile::builder()
            .consistency(config.consistency.into())
            .request_timeout(Some(request_timeout))
            .build()
            .into_handle();

        let mut session_builder = SessionBuilder::new()
            .known_nodes(&contact_points)
            .pool_size(PoolSize::PerShard(config.setup.pool_size()))
            .default_execution_profile_handle(profile.clone());

        if let (Some(ref username), Some(ref password)) = (&config.setup.username, &config.setup.password) {
            session_builder = session_builder.user(username, password);
        }

        if let Some(timeout) = config.setup.connect_timeout() {
            session_builder = session_builder.connection_timeout(timeout);
        }

        if let Some(ref compression) = config.setup.compression {
            let compression = match compression.to_ascii_lowercase().as_str() {
                "lz4" => Compression::Lz4,
                _ => Compression::Snappy,
            };
            session_builder = session_builder.compression(Some(compression));
        }

        for option in config.setup.extra.keys() {
            warn!("Ignoring unsupported setup option '{}'", option);
        }

        let session = session_builder.build().await.map_err(|e| {
            error!("Failed to connect to Cassandra: {}", e);
            SchemaError::ConnectionError(format!("Connection failed: {}", e))
        })?;

        info!(
            "Connected to Cassandra cluster (consistency {}, request timeout {:?})",
            config.consistency, request_timeout
        );

        Ok(Self {
            session: Arc::new(session),
            profile,
            request_timeout: Mutex::new(Some(request_timeout)),
            contact_points,
        })
    }
}

#[async_trait]
impl SchemaSession for ScyllaConnection {
    async fn execute(&self, cql: &str) -> Result<(), SchemaError> {
        debug!("Executing: {}", cql);
        self.session.query_unpaged(cql, ()).await?;
        Ok(())
    }

    async fn table_columns(&self, keyspace: &str, table: &str) -> Result<Vec<String>, SchemaError> {
        let result = self
            .session
            .query_unpaged(
                "SELECT column_name FROM system_schema.columns WHERE keyspace_name = ? AND table_name = ?",
                (keyspace, table),
            )
            .await?;

        let rows = result
            .rows_typed::<(String,)>()
            .map_err(|e| SchemaError::DatabaseError(format!("Failed to read table metadata: {}", e)))?;

        rows.map(|row| {
            row.map(|(name,)| name)
                .map_err(|e| SchemaError::DatabaseError(format!("Failed to read column name: {}", e)))
        })
        .collect()
    }

    async fn type_fields(&self, keyspace: &str, type_name: &str) -> Result<Vec<String>, SchemaError> {
        let result = self
            .session
            .query_unpaged(
                "SELECT field_names FROM system_schema.types WHERE keyspace_name = ? AND type_name = ?",
                (keyspace, type_name),
            )
            .await?;

        let mut rows = result
            .rows_typed::<(Vec<String>,)>()
            .map_err(|e| SchemaError::DatabaseError(format!("Failed to read type metadata: {}", e)))?;

        match rows.next() {
            Some(row) => row
                .map(|(fields,)| fields)
                .map_err(|e| SchemaError::DatabaseError(format!("Failed to read type fields: {}", e))),
            None => Ok(Vec::new()),
        }
    }

    fn default_timeout(&self) -> Option<Duration> {
        *self.request_timeout.lock()
    }

    fn set_default_timeout(&self, timeout: Option<Duration>) {
        // Handles share the profile they point to, so remapping a clone
        // retargets the session's default profile.
        let mut handle = self.profile.clone();
        let profile = handle.pointee_to_builder().request_timeout(timeout).build();
        handle.map_to_another_profile(profile);

        *self.request_timeout.lock() = timeout;
    }

    fn describe(&self) -> String {
        format!("Cassandra - Nodes: {:?}", self.contact_points)
    }
}

/// Connector backed by the `scylla` driver.
#[derive(Debug, Clone, Copy, Default)]
pub struct ScyllaConnector;

#[async_trait]
impl Connector for ScyllaConnector {
    async fn connect(&self, config: &ConnectionConfig) -> Result<Arc<dyn SchemaSession>, SchemaError> {
        let connection = ScyllaConnection::new(config).await?;
        Ok(Arc::new(connection))
    }
}
