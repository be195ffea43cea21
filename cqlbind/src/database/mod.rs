pub mod connection;
pub mod retry;
pub mod scylla;
pub mod query_builder;

pub use connection::{Connector, SchemaSession};
pub use scylla::{ScyllaConnection, ScyllaConnector};
pub use query_builder::QueryBuilder;
pub use retry::TimeoutRetry;
