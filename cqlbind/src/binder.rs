use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::config::{AppSettings, ConnectionConfig};
use crate::database::{Connector, ScyllaConnector, SchemaSession, TimeoutRetry};
use crate::errors::SchemaError;
use crate::management::{self, SyncOutcome};
use crate::model::{ModelDef, ModelRegistry};

enum ConnectionState {
    Pending,
    Connected(Arc<dyn SchemaSession>),
    Failed(SchemaError),
}

/// An application's handle on its Cassandra cluster.
///
/// Built once at startup by [`CqlBinder::bind`]; there is no teardown, the
/// session lives as long as the binder. Schema changes made through more
/// than one binder (or task) at a time against the same keyspace are not
/// coordinated, so run them from a single place.
pub struct CqlBinder {
    config: ConnectionConfig,
    keyspace: RwLock<String>,
    registry: ModelRegistry,
    connector: Arc<dyn Connector>,
    connection: Mutex<ConnectionState>,
}

impl CqlBinder {
    /// Bind using the `scylla` driver and every model registered with `register_model!`.
    pub async fn bind(settings: &AppSettings) -> Result<Self, SchemaError> {
        Self::bind_with(settings, Arc::new(ScyllaConnector), ModelRegistry::global().clone()).await
    }

    pub async fn bind_with(
        settings: &AppSettings,
        connector: Arc<dyn Connector>,
        registry: ModelRegistry,
    ) -> Result<Self, SchemaError> {
        let config = ConnectionConfig::from_settings(settings)?;
        info!(
            "Binding to keyspace {} on {:?} ({} models registered)",
            config.keyspace,
            config.hosts,
            registry.len()
        );

        let binder = Self {
            keyspace: RwLock::new(config.keyspace.clone()),
            config,
            registry,
            connector,
            connection: Mutex::new(ConnectionState::Pending),
        };

        if binder.config.lazy_connect {
            info!("Lazy connect enabled, deferring connection until first use");
            return Ok(binder);
        }

        match binder.session().await {
            Ok(session) => info!("Bound to {}", session.describe()),
            Err(e) if binder.config.retry_connect => {
                warn!("Initial connection failed, will retry on first use: {}", e);
            }
            Err(e) => return Err(e),
        }

        Ok(binder)
    }

    /// The live session, connecting first if needed.
    ///
    /// A failed connection is retried on the next call only when
    /// `CASSANDRA_RETRY_CONNECT` is set; otherwise the failure sticks.
    pub async fn session(&self) -> Result<Arc<dyn SchemaSession>, SchemaError> {
        let mut state = self.connection.lock().await;
        match &*state {
            ConnectionState::Connected(session) => return Ok(session.clone()),
            ConnectionState::Failed(err) if !self.config.retry_connect => return Err(err.clone()),
            _ => {}
        }

        match self.connector.connect(&self.config).await {
            Ok(session) => {
                *state = ConnectionState::Connected(session.clone());
                Ok(session)
            }
            Err(err) => {
                *state = ConnectionState::Failed(err.clone());
                Err(err)
            }
        }
    }

    pub fn config(&self) -> &ConnectionConfig {
        &self.config
    }

    pub fn registry(&self) -> &ModelRegistry {
        &self.registry
    }

    /// Keyspace that schema operations currently target.
    pub fn keyspace(&self) -> String {
        self.keyspace.read().clone()
    }

    pub fn configured_keyspace(&self) -> &str {
        &self.config.keyspace
    }

    /// Point schema operations at `keyspace`, or back at the configured one
    /// when `None` (or empty). Returns the keyspace that was active before.
    pub fn set_keyspace(&self, keyspace: Option<&str>) -> String {
        let next = match keyspace {
            Some(name) if !name.is_empty() => name.to_string(),
            _ => self.config.keyspace.clone(),
        };
        info!("Switching keyspace to {}", next);
        std::mem::replace(&mut *self.keyspace.write(), next)
    }

    /// Every concrete table model, in enumeration order.
    pub fn models(&self) -> Vec<&'static ModelDef> {
        self.registry.concrete_tables()
    }

    /// Sync every concrete user type, then every concrete table.
    ///
    /// Stops at the first failure; whatever synced before it stays synced.
    pub async fn sync_db(&self) -> Result<(), SchemaError> {
        self.registry.check_lineages()?;
        let session = self.session().await?;
        let keyspace = self.keyspace();

        let types = self.registry.concrete_types();
        let tables = self.registry.concrete_tables();
        info!("Syncing {} types and {} tables in {}", types.len(), tables.len(), keyspace);

        for model in types {
            management::sync_type(session.as_ref(), &self.registry, &keyspace, model).await?;
        }
        for model in tables {
            management::sync_table(session.as_ref(), &self.registry, &keyspace, model).await?;
        }
        Ok(())
    }

    pub async fn sync_table(&self, model: &'static ModelDef) -> Result<SyncOutcome, SchemaError> {
        let session = self.session().await?;
        management::sync_table(session.as_ref(), &self.registry, &self.keyspace(), model).await
    }

    pub async fn sync_type(&self, model: &'static ModelDef) -> Result<SyncOutcome, SchemaError> {
        let session = self.session().await?;
        management::sync_type(session.as_ref(), &self.registry, &self.keyspace(), model).await
    }

    pub async fn create_keyspace_simple(
        &self,
        keyspace: &str,
        replication_factor: u32,
    ) -> Result<(), SchemaError> {
        let session = self.session().await?;
        management::create_keyspace_simple(session.as_ref(), keyspace, replication_factor).await
    }

    pub async fn create_keyspace_network_topology(
        &self,
        keyspace: &str,
        dc_replication: &BTreeMap<String, u32>,
    ) -> Result<(), SchemaError> {
        let session = self.session().await?;
        management::create_keyspace_network_topology(session.as_ref(), keyspace, dc_replication).await
    }
}

/// Drop the binder's active keyspace, retrying once on timeout.
pub async fn drop_keyspace(binder: &CqlBinder) -> Result<(), SchemaError> {
    let handle = binder.session().await?;
    let session: &dyn SchemaSession = handle.as_ref();
    let keyspace = binder.keyspace();
    let keyspace = keyspace.as_str();

    TimeoutRetry::new("drop_keyspace")
        .session(session)
        .execute(|| management::drop_keyspace(session, keyspace))
        .await
}

/// Drop the table of every concrete model, one at a time, retrying each once on timeout.
pub async fn drop_tables(binder: &CqlBinder) -> Result<(), SchemaError> {
    binder.registry().check_lineages()?;
    let handle = binder.session().await?;
    let session: &dyn SchemaSession = handle.as_ref();
    let keyspace = binder.keyspace();
    let keyspace = keyspace.as_str();

    for model in binder.models() {
        TimeoutRetry::new("drop_table")
            .session(session)
            .execute(|| management::drop_table(session, keyspace, model))
            .await?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::columns;
    use crate::config::HostsSetting;
    use crate::testing::{RecordingConnector, RecordingSession};
    use std::time::Duration;

    static ANIMAL: ModelDef = ModelDef::table("Animal")
        .abstract_model()
        .columns(&[columns::uuid("id").partition_key(), columns::text("name")]);
    static DOG: ModelDef = ModelDef::table("Dog").extends("Animal");
    static CAT: ModelDef = ModelDef::table("Cat").extends("Animal");
    static PUPPY: ModelDef = ModelDef::table("Puppy").extends("Dog");
    static ADDRESS: ModelDef = ModelDef::user_type("Address").columns(&[columns::text("street")]);

    fn registry() -> ModelRegistry {
        ModelRegistry::new()
            .with(&ANIMAL)
            .and_then(|r| r.with(&DOG))
            .and_then(|r| r.with(&CAT))
            .and_then(|r| r.with(&PUPPY))
            .and_then(|r| r.with(&ADDRESS))
            .unwrap()
    }

    fn settings() -> AppSettings {
        AppSettings {
            hosts: Some(HostsSetting::List(vec!["127.0.0.1".to_string()])),
            keyspace: Some("pets".to_string()),
            ..AppSettings::default()
        }
    }

    async fn bound(connector: &Arc<RecordingConnector>) -> CqlBinder {
        CqlBinder::bind_with(&settings(), connector.clone(), registry())
            .await
            .unwrap()
    }

    fn session_of(connector: &RecordingConnector) -> &RecordingSession {
        connector.session.as_ref()
    }

    fn timeout() -> SchemaError {
        SchemaError::OperationTimedOut("client timeout".to_string())
    }

    #[tokio::test]
    async fn test_bind_requires_hosts() {
        let connector = Arc::new(RecordingConnector::new());
        let settings = AppSettings {
            hosts: None,
            ..settings()
        };

        let err = CqlBinder::bind_with(&settings, connector.clone(), registry())
            .await
            .err()
            .unwrap();
        assert!(matches!(err, SchemaError::MissingConfiguration(_)));
        assert_eq!(connector.attempts(), 0);
    }

    #[tokio::test]
    async fn test_bind_connects_once_and_stores_keyspace() {
        let connector = Arc::new(RecordingConnector::new());
        let binder = bound(&connector).await;

        assert_eq!(binder.keyspace(), "pets");
        assert_eq!(binder.configured_keyspace(), "pets");
        assert_eq!(connector.attempts(), 1);

        binder.session().await.unwrap();
        assert_eq!(connector.attempts(), 1);
    }

    #[tokio::test]
    async fn test_lazy_connect_defers_connection() {
        let connector = Arc::new(RecordingConnector::new());
        let settings = AppSettings {
            lazy_connect: Some(true),
            ..settings()
        };
        let binder = CqlBinder::bind_with(&settings, connector.clone(), registry())
            .await
            .unwrap();
        assert_eq!(connector.attempts(), 0);

        binder.sync_db().await.unwrap();
        assert_eq!(connector.attempts(), 1);
    }

    #[tokio::test]
    async fn test_eager_connect_failure_is_fatal() {
        let connector = Arc::new(RecordingConnector::failing(vec![SchemaError::ConnectionError(
            "refused".to_string(),
        )]));
        let result = CqlBinder::bind_with(&settings(), connector.clone(), registry()).await;
        assert!(matches!(result, Err(SchemaError::ConnectionError(_))));
    }

    #[tokio::test]
    async fn test_retry_connect_recovers_on_next_use() {
        let connector = Arc::new(RecordingConnector::failing(vec![SchemaError::ConnectionError(
            "refused".to_string(),
        )]));
        let settings = AppSettings {
            retry_connect: Some(true),
            ..settings()
        };

        let binder = CqlBinder::bind_with(&settings, connector.clone(), registry())
            .await
            .unwrap();
        assert_eq!(connector.attempts(), 1);

        binder.session().await.unwrap();
        assert_eq!(connector.attempts(), 2);
    }

    #[tokio::test]
    async fn test_lazy_failure_sticks_without_retry_connect() {
        let connector = Arc::new(RecordingConnector::failing(vec![SchemaError::ConnectionError(
            "refused".to_string(),
        )]));
        let settings = AppSettings {
            lazy_connect: Some(true),
            ..settings()
        };
        let binder = CqlBinder::bind_with(&settings, connector.clone(), registry())
            .await
            .unwrap();

        assert!(binder.session().await.is_err());
        assert!(binder.session().await.is_err());
        assert_eq!(connector.attempts(), 1);
    }

    #[tokio::test]
    async fn test_set_keyspace_and_reset() {
        let connector = Arc::new(RecordingConnector::new());
        let binder = bound(&connector).await;

        let previous = binder.set_keyspace(Some("other"));
        assert_eq!(previous, "pets");
        assert_eq!(binder.keyspace(), "other");

        binder.set_keyspace(None);
        assert_eq!(binder.keyspace(), "pets");

        binder.set_keyspace(Some(""));
        assert_eq!(binder.keyspace(), "pets");
    }

    #[tokio::test]
    async fn test_sync_db_syncs_types_then_every_table() {
        let connector = Arc::new(RecordingConnector::new());
        let binder = bound(&connector).await;

        binder.sync_db().await.unwrap();

        let statements = session_of(&connector).statements();
        assert_eq!(statements.len(), 4);
        assert!(statements[0].starts_with("CREATE TYPE IF NOT EXISTS \"pets\".\"address\""));
        assert!(statements[1].starts_with("CREATE TABLE IF NOT EXISTS \"pets\".\"dog\""));
        assert!(statements[2].starts_with("CREATE TABLE IF NOT EXISTS \"pets\".\"puppy\""));
        assert!(statements[3].starts_with("CREATE TABLE IF NOT EXISTS \"pets\".\"cat\""));
    }

    #[tokio::test]
    async fn test_sync_db_stops_at_first_failure() {
        let connector = Arc::new(RecordingConnector::new());
        let binder = bound(&connector).await;
        session_of(&connector).fail_when(
            "\"puppy\"",
            vec![SchemaError::DatabaseError("conflict".to_string())],
        );

        assert!(binder.sync_db().await.is_err());
        assert!(session_of(&connector).statements_containing("\"cat\"").is_empty());
        assert_eq!(session_of(&connector).statements_containing("\"dog\"").len(), 1);
    }

    #[tokio::test]
    async fn test_sync_uses_active_keyspace() {
        let connector = Arc::new(RecordingConnector::new());
        let binder = bound(&connector).await;
        binder.set_keyspace(Some("staging"));

        binder.sync_table(&CAT).await.unwrap();
        assert_eq!(
            session_of(&connector).statements_containing("\"staging\".\"cat\"").len(),
            1
        );
    }

    #[tokio::test]
    async fn test_drop_tables_drops_each_concrete_model() {
        let connector = Arc::new(RecordingConnector::new());
        let binder = bound(&connector).await;

        drop_tables(&binder).await.unwrap();

        let drops = session_of(&connector).statements_containing("DROP TABLE");
        assert_eq!(
            drops,
            vec![
                "DROP TABLE IF EXISTS \"pets\".\"dog\"",
                "DROP TABLE IF EXISTS \"pets\".\"puppy\"",
                "DROP TABLE IF EXISTS \"pets\".\"cat\"",
            ]
        );
    }

    #[tokio::test]
    async fn test_drop_tables_retries_timeouts() {
        let connector = Arc::new(RecordingConnector::new());
        let binder = bound(&connector).await;
        let session = session_of(&connector);
        session.set_default_timeout(Some(Duration::from_secs(10)));
        session.fail_when("\"puppy\"", vec![timeout()]);

        drop_tables(&binder).await.unwrap();

        assert_eq!(session.statements_containing("\"puppy\"").len(), 2);
        assert_eq!(session.default_timeout(), Some(Duration::from_secs(10)));
    }

    #[tokio::test]
    async fn test_drop_tables_stops_on_other_errors() {
        let connector = Arc::new(RecordingConnector::new());
        let binder = bound(&connector).await;
        session_of(&connector).fail_when(
            "\"dog\"",
            vec![SchemaError::DatabaseError("unauthorized".to_string())],
        );

        let err = drop_tables(&binder).await.unwrap_err();
        assert_eq!(err, SchemaError::DatabaseError("unauthorized".to_string()));
        assert_eq!(session_of(&connector).statements().len(), 1);
    }

    #[tokio::test]
    async fn test_drop_keyspace_gives_up_after_two_timeouts() {
        let connector = Arc::new(RecordingConnector::new());
        let binder = bound(&connector).await;
        session_of(&connector).fail_when("DROP KEYSPACE", vec![timeout(), timeout(), timeout()]);

        let err = drop_keyspace(&binder).await.unwrap_err();
        assert!(err.is_timeout());
        assert_eq!(session_of(&connector).statements().len(), 2);
    }

    #[tokio::test]
    async fn test_drop_keyspace_uses_active_keyspace() {
        let connector = Arc::new(RecordingConnector::new());
        let binder = bound(&connector).await;
        binder.set_keyspace(Some("scratch"));

        drop_keyspace(&binder).await.unwrap();
        assert_eq!(
            session_of(&connector).statements(),
            vec!["DROP KEYSPACE IF EXISTS \"scratch\""]
        );
    }

    static FERRET: ModelDef = ModelDef::table("Ferret").extends("Animl");

    fn registry_with_orphan() -> ModelRegistry {
        registry().with(&FERRET).unwrap()
    }

    #[tokio::test]
    async fn test_sync_db_rejects_model_with_unknown_parent() {
        let connector = Arc::new(RecordingConnector::new());
        let binder = CqlBinder::bind_with(&settings(), connector.clone(), registry_with_orphan())
            .await
            .unwrap();

        let err = binder.sync_db().await.unwrap_err();
        assert!(matches!(err, SchemaError::InvalidModel { ref model, .. } if model == "Ferret"));
        assert!(session_of(&connector).statements().is_empty());
    }

    #[tokio::test]
    async fn test_drop_tables_rejects_model_with_unknown_parent() {
        let connector = Arc::new(RecordingConnector::new());
        let binder = CqlBinder::bind_with(&settings(), connector.clone(), registry_with_orphan())
            .await
            .unwrap();

        let err = drop_tables(&binder).await.unwrap_err();
        assert!(matches!(err, SchemaError::InvalidModel { ref model, .. } if model == "Ferret"));
        assert!(session_of(&connector).statements().is_empty());
    }

    #[tokio::test]
    async fn test_drop_tables_rejects_type_under_table_root() {
        static NOTE: ModelDef = ModelDef::user_type("Note")
            .extends("Animal")
            .columns(&[columns::text("body")]);
        let connector = Arc::new(RecordingConnector::new());
        let binder = CqlBinder::bind_with(&settings(), connector.clone(), registry().with(&NOTE).unwrap())
            .await
            .unwrap();

        let err = drop_tables(&binder).await.unwrap_err();
        assert!(matches!(err, SchemaError::InvalidModel { ref model, .. } if model == "Note"));
        assert!(session_of(&connector).statements().is_empty());
    }

    #[tokio::test]
    async fn test_create_keyspace_simple() {
        let connector = Arc::new(RecordingConnector::new());
        let binder = bound(&connector).await;

        binder.create_keyspace_simple("pets", 1).await.unwrap();
        assert_eq!(session_of(&connector).statements_containing("CREATE KEYSPACE").len(), 1);
    }
}
