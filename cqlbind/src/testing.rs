//! In-memory session and connector doubles for unit tests.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::config::ConnectionConfig;
use crate::database::{Connector, SchemaSession};
use crate::errors::SchemaError;

#[derive(Default)]
pub struct RecordingSession {
    statements: Mutex<Vec<String>>,
    scripted: Mutex<Vec<(String, VecDeque<SchemaError>)>>,
    tables: Mutex<HashMap<(String, String), Vec<String>>>,
    types: Mutex<HashMap<(String, String), Vec<String>>>,
    timeout: Mutex<Option<Duration>>,
    timeout_log: Mutex<Vec<Option<Duration>>>,
}

impl RecordingSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail the next statements containing `pattern` with `errors`, in order.
    pub fn fail_when(&self, pattern: &str, errors: Vec<SchemaError>) {
        self.scripted
            .lock()
            .push((pattern.to_string(), errors.into_iter().collect()));
    }

    pub fn with_table(&self, keyspace: &str, table: &str, columns: &[&str]) {
        self.tables.lock().insert(
            (keyspace.to_string(), table.to_string()),
            columns.iter().map(|c| c.to_string()).collect(),
        );
    }

    pub fn with_type(&self, keyspace: &str, type_name: &str, fields: &[&str]) {
        self.types.lock().insert(
            (keyspace.to_string(), type_name.to_string()),
            fields.iter().map(|f| f.to_string()).collect(),
        );
    }

    pub fn statements(&self) -> Vec<String> {
        self.statements.lock().clone()
    }

    pub fn statements_containing(&self, pattern: &str) -> Vec<String> {
        self.statements
            .lock()
            .iter()
            .filter(|s| s.contains(pattern))
            .cloned()
            .collect()
    }

    pub fn timeout_changes(&self) -> usize {
        self.timeout_log.lock().len()
    }
}

#[async_trait]
impl SchemaSession for RecordingSession {
    async fn execute(&self, cql: &str) -> Result<(), SchemaError> {
        self.statements.lock().push(cql.to_string());

        let mut scripted = self.scripted.lock();
        for (pattern, errors) in scripted.iter_mut() {
            if cql.contains(pattern.as_str()) {
                if let Some(err) = errors.pop_front() {
                    return Err(err);
                }
            }
        }
        Ok(())
    }

    async fn table_columns(&self, keyspace: &str, table: &str) -> Result<Vec<String>, SchemaError> {
        Ok(self
            .tables
            .lock()
            .get(&(keyspace.to_string(), table.to_string()))
            .cloned()
            .unwrap_or_default())
    }

    async fn type_fields(&self, keyspace: &str, type_name: &str) -> Result<Vec<String>, SchemaError> {
        Ok(self
            .types
            .lock()
            .get(&(keyspace.to_string(), type_name.to_string()))
            .cloned()
            .unwrap_or_default())
    }

    fn default_timeout(&self) -> Option<Duration> {
        *self.timeout.lock()
    }

    fn set_default_timeout(&self, timeout: Option<Duration>) {
        *self.timeout.lock() = timeout;
        self.timeout_log.lock().push(timeout);
    }

    fn describe(&self) -> String {
        "recording session".to_string()
    }
}

/// Hands out one shared [`RecordingSession`], failing scripted attempts first.
#[derive(Default)]
pub struct RecordingConnector {
    pub session: Arc<RecordingSession>,
    failures: Mutex<VecDeque<SchemaError>>,
    attempts: AtomicU32,
}

impl RecordingConnector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing(errors: Vec<SchemaError>) -> Self {
        Self {
            failures: Mutex::new(errors.into_iter().collect()),
            ..Self::default()
        }
    }

    pub fn attempts(&self) -> u32 {
        self.attempts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Connector for RecordingConnector {
    async fn connect(&self, _config: &ConnectionConfig) -> Result<Arc<dyn SchemaSession>, SchemaError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        if let Some(err) = self.failures.lock().pop_front() {
            return Err(err);
        }
        Ok(self.session.clone())
    }
}
