use std::collections::BTreeMap;

use crate::columns::{ClusteringOrder, Column, ColumnRole};

/// Double-quote a CQL identifier, escaping embedded quotes.
pub fn quote_identifier(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

fn qualified(keyspace: &str, name: &str) -> String {
    format!("{}.{}", quote_identifier(keyspace), quote_identifier(name))
}

fn column_definition(column: &Column) -> String {
    let mut definition = format!("{} {}", quote_identifier(column.name), column.cql_type);
    if column.role == ColumnRole::Static {
        definition.push_str(" STATIC");
    }
    definition
}

/// Builds the schema statements issued by the management functions.
pub struct QueryBuilder;

impl QueryBuilder {
    pub fn build_create_keyspace_simple(keyspace: &str, replication_factor: u32) -> String {
        format!(
            "CREATE KEYSPACE IF NOT EXISTS {} WITH replication = {{'class': 'SimpleStrategy', 'replication_factor': {}}}",
            quote_identifier(keyspace),
            replication_factor
        )
    }

    pub fn build_create_keyspace_network_topology(
        keyspace: &str,
        dc_replication: &BTreeMap<String, u32>,
    ) -> String {
        let mut replication = String::from("{'class': 'NetworkTopologyStrategy'");
        for (dc, factor) in dc_replication {
            replication.push_str(&format!(", '{}': {}", dc.replace('\'', "''"), factor));
        }
        replication.push('}');

        format!(
            "CREATE KEYSPACE IF NOT EXISTS {} WITH replication = {}",
            quote_identifier(keyspace),
            replication
        )
    }

    pub fn build_drop_keyspace(keyspace: &str) -> String {
        format!("DROP KEYSPACE IF EXISTS {}", quote_identifier(keyspace))
    }

    /// `columns` must already include inherited columns and at least one partition key.
    pub fn build_create_table(keyspace: &str, table: &str, columns: &[Column]) -> String {
        let definitions: Vec<String> = columns.iter().map(column_definition).collect();

        let partition: Vec<String> = columns
            .iter()
            .filter(|c| c.role == ColumnRole::PartitionKey)
            .map(|c| quote_identifier(c.name))
            .collect();
        let clustering: Vec<&Column> = columns
            .iter()
            .filter(|c| c.role == ColumnRole::ClusteringKey)
            .collect();

        let mut primary_key = format!("PRIMARY KEY (({})", partition.join(", "));
        for column in &clustering {
            primary_key.push_str(", ");
            primary_key.push_str(&quote_identifier(column.name));
        }
        primary_key.push(')');

        let mut query = format!(
            "CREATE TABLE IF NOT EXISTS {} ({}, {})",
            qualified(keyspace, table),
            definitions.join(", "),
            primary_key
        );

        if clustering.iter().any(|c| c.order == ClusteringOrder::Descending) {
            let ordering: Vec<String> = clustering
                .iter()
                .map(|c| {
                    let direction = match c.order {
                        ClusteringOrder::Ascending => "ASC",
                        ClusteringOrder::Descending => "DESC",
                    };
                    format!("{} {}", quote_identifier(c.name), direction)
                })
                .collect();
            query.push_str(&format!(" WITH CLUSTERING ORDER BY ({})", ordering.join(", ")));
        }

        query
    }

    pub fn build_add_column(keyspace: &str, table: &str, column: &Column) -> String {
        format!(
            "ALTER TABLE {} ADD {}",
            qualified(keyspace, table),
            column_definition(column)
        )
    }

    pub fn build_create_index(keyspace: &str, table: &str, column: &Column) -> String {
        format!(
            "CREATE INDEX IF NOT EXISTS {} ON {} ({})",
            quote_identifier(&format!("{}_{}_idx", table, column.name)),
            qualified(keyspace, table),
            quote_identifier(column.name)
        )
    }

    pub fn build_drop_table(keyspace: &str, table: &str) -> String {
        format!("DROP TABLE IF EXISTS {}", qualified(keyspace, table))
    }

    pub fn build_create_type(keyspace: &str, type_name: &str, fields: &[Column]) -> String {
        let definitions: Vec<String> = fields
            .iter()
            .map(|f| format!("{} {}", quote_identifier(f.name), f.cql_type))
            .collect();
        format!(
            "CREATE TYPE IF NOT EXISTS {} ({})",
            qualified(keyspace, type_name),
            definitions.join(", ")
        )
    }

    pub fn build_add_field(keyspace: &str, type_name: &str, field: &Column) -> String {
        format!(
            "ALTER TYPE {} ADD {} {}",
            qualified(keyspace, type_name),
            quote_identifier(field.name),
            field.cql_type
        )
    }
}
