//! Bind an application to a Cassandra (or ScyllaDB) cluster once at startup
//! and keep the schema of its registered models in sync.
//!
//! ```no_run
//! use cqlbind::{columns, register_model, AppSettings, CqlBinder, ModelDef};
//!
//! pub static USER: ModelDef = ModelDef::table("User").columns(&[
//!     columns::uuid("id").partition_key(),
//!     columns::text("email").indexed(),
//! ]);
//! register_model!(USER);
//!
//! # async fn run(settings: AppSettings) -> Result<(), cqlbind::SchemaError> {
//! let db = CqlBinder::bind(&settings).await?;
//! db.create_keyspace_simple(db.configured_keyspace(), 1).await?;
//! db.sync_db().await?;
//! # Ok(())
//! # }
//! ```

pub mod binder;
pub mod columns;
pub mod config;
pub mod database;
pub mod errors;
pub mod management;
pub mod metrics;
pub mod model;
pub mod types;

#[cfg(test)]
mod testing;

pub use binder::{drop_keyspace, drop_tables, CqlBinder};
pub use columns::{Column, CqlType};
pub use config::{AppSettings, ConnectionConfig};
pub use database::{Connector, SchemaSession, TimeoutRetry};
pub use errors::SchemaError;
pub use management::SyncOutcome;
pub use model::{ModelDef, ModelKind, ModelRegistry};
pub use types::ConsistencyLevel;

// Used by `register_model!`.
pub use inventory;
