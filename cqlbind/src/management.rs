//! Schema maintenance: keyspaces, tables and user types.
//!
//! Every function takes the keyspace explicitly; nothing here reads
//! process-wide state. Statements are executed one at a time and are not
//! rolled back when a later one fails.

use std::collections::BTreeMap;
use std::future::Future;
use std::time::Instant;
use tracing::{debug, info, warn};

use crate::columns::Column;
use crate::database::{QueryBuilder, SchemaSession};
use crate::errors::SchemaError;
use crate::metrics;
use crate::model::{ModelDef, ModelKind, ModelRegistry};

/// What a sync did to the live schema.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncOutcome {
    Created,
    Altered { added: Vec<String> },
    Unchanged,
}

async fn timed<T, Fut>(operation: &str, keyspace: &str, fut: Fut) -> Result<T, SchemaError>
where
    Fut: Future<Output = Result<T, SchemaError>>,
{
    let start = Instant::now();
    let result = fut.await;
    metrics::record_operation(operation, keyspace, result.is_ok(), start.elapsed().as_secs_f64());
    result
}

pub async fn create_keyspace_simple(
    session: &dyn SchemaSession,
    keyspace: &str,
    replication_factor: u32,
) -> Result<(), SchemaError> {
    info!("Creating keyspace {} (SimpleStrategy, rf={})", keyspace, replication_factor);
    let query = QueryBuilder::build_create_keyspace_simple(keyspace, replication_factor);
    timed("create_keyspace", keyspace, session.execute(&query)).await
}

pub async fn create_keyspace_network_topology(
    session: &dyn SchemaSession,
    keyspace: &str,
    dc_replication: &BTreeMap<String, u32>,
) -> Result<(), SchemaError> {
    if dc_replication.is_empty() {
        return Err(SchemaError::ConfigError(format!(
            "keyspace {} needs at least one datacenter replication factor",
            keyspace
        )));
    }
    info!("Creating keyspace {} (NetworkTopologyStrategy, {:?})", keyspace, dc_replication);
    let query = QueryBuilder::build_create_keyspace_network_topology(keyspace, dc_replication);
    timed("create_keyspace", keyspace, session.execute(&query)).await
}

pub async fn drop_keyspace(session: &dyn SchemaSession, keyspace: &str) -> Result<(), SchemaError> {
    info!("Dropping keyspace {}", keyspace);
    let query = QueryBuilder::build_drop_keyspace(keyspace);
    timed("drop_keyspace", keyspace, session.execute(&query)).await
}

pub async fn drop_table(
    session: &dyn SchemaSession,
    keyspace: &str,
    model: &ModelDef,
) -> Result<(), SchemaError> {
    if model.kind != ModelKind::Table {
        return Err(SchemaError::invalid_model(model.name, "not a table model"));
    }
    let table = model.cql_name();
    info!("Dropping table {}.{}", keyspace, table);
    let query = QueryBuilder::build_drop_table(keyspace, &table);
    timed("drop_table", keyspace, session.execute(&query)).await
}

/// Create the model's table, or add the columns it is missing.
///
/// Key columns can't be added to an existing table; that case fails before
/// any statement runs. Columns present in the table but not in the model are
/// left alone and reported.
pub async fn sync_table(
    session: &dyn SchemaSession,
    registry: &ModelRegistry,
    keyspace: &str,
    model: &'static ModelDef,
) -> Result<SyncOutcome, SchemaError> {
    if model.kind != ModelKind::Table {
        return Err(SchemaError::invalid_model(model.name, "not a table model"));
    }
    let columns = registry.validate(model)?;
    let table = model.cql_name();
    let target = format!("{}.{}", keyspace, table);

    timed(
        "sync_table",
        keyspace,
        apply_table(session, keyspace, &table, &target, model, &columns),
    )
    .await
}

async fn apply_table(
    session: &dyn SchemaSession,
    keyspace: &str,
    table: &str,
    target: &str,
    model: &ModelDef,
    columns: &[Column],
) -> Result<SyncOutcome, SchemaError> {
    let existing = session.table_columns(keyspace, table).await?;

    let outcome = if existing.is_empty() {
        info!("Creating table {}", target);
        session
            .execute(&QueryBuilder::build_create_table(keyspace, table, columns))
            .await?;
        SyncOutcome::Created
    } else {
        let missing: Vec<&Column> = columns
            .iter()
            .filter(|c| !existing.iter().any(|e| e == c.name))
            .collect();

        if let Some(key) = missing.iter().find(|c| c.is_primary_key()) {
            return Err(SchemaError::invalid_model(
                model.name,
                format!("cannot add primary key column '{}' to existing table {}", key.name, target),
            ));
        }

        let stray: Vec<&str> = existing
            .iter()
            .map(String::as_str)
            .filter(|e| !columns.iter().any(|c| c.name == *e))
            .collect();
        if !stray.is_empty() {
            warn!("Table {} has columns not defined in model {}: {:?}", target, model.name, stray);
        }

        for column in &missing {
            info!("Adding column {} to {}", column.name, target);
            session
                .execute(&QueryBuilder::build_add_column(keyspace, table, column))
                .await?;
        }

        if missing.is_empty() {
            debug!("Table {} is up to date", target);
            SyncOutcome::Unchanged
        } else {
            SyncOutcome::Altered {
                added: missing.iter().map(|c| c.name.to_string()).collect(),
            }
        }
    };

    for column in columns.iter().filter(|c| c.indexed) {
        session
            .execute(&QueryBuilder::build_create_index(keyspace, table, column))
            .await?;
    }

    Ok(outcome)
}

/// Create the user type, or add the fields it is missing.
pub async fn sync_type(
    session: &dyn SchemaSession,
    registry: &ModelRegistry,
    keyspace: &str,
    model: &'static ModelDef,
) -> Result<SyncOutcome, SchemaError> {
    if model.kind != ModelKind::UserType {
        return Err(SchemaError::invalid_model(model.name, "not a user type model"));
    }
    let fields = registry.validate(model)?;
    let type_name = model.cql_name();
    let target = format!("{}.{}", keyspace, type_name);

    timed(
        "sync_type",
        keyspace,
        apply_type(session, keyspace, &type_name, &target, &fields),
    )
    .await
}

async fn apply_type(
    session: &dyn SchemaSession,
    keyspace: &str,
    type_name: &str,
    target: &str,
    fields: &[Column],
) -> Result<SyncOutcome, SchemaError> {
    let existing = session.type_fields(keyspace, type_name).await?;

    if existing.is_empty() {
        info!("Creating type {}", target);
        session
            .execute(&QueryBuilder::build_create_type(keyspace, type_name, fields))
            .await?;
        return Ok(SyncOutcome::Created);
    }

    let mut added = Vec::new();
    for field in fields.iter().filter(|f| !existing.iter().any(|e| e == f.name)) {
        info!("Adding field {} to {}", field.name, target);
        session
            .execute(&QueryBuilder::build_add_field(keyspace, type_name, field))
            .await?;
        added.push(field.name.to_string());
    }

    if added.is_empty() {
        Ok(SyncOutcome::Unchanged)
    } else {
        Ok(SyncOutcome::Altered { added })
    }
}
