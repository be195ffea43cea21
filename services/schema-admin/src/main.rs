mod config;
mod models;

use anyhow::Result;
use clap::{Parser, Subcommand};
use cqlbind::{drop_keyspace, drop_tables, CqlBinder};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "schema-admin")]
#[command(about = "Create, sync and drop the pet store schema in Cassandra")]
struct Args {
    /// Path to the CASSANDRA_* settings file
    #[arg(short, long, default_value = "config/schema-admin.yaml")]
    config: String,

    /// Work against this keyspace instead of the configured one
    #[arg(short, long)]
    keyspace: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Create the keyspace with SimpleStrategy replication
    CreateKeyspace {
        #[arg(long, default_value = "1")]
        replication_factor: u32,
    },
    /// Create or alter every registered type and table
    Sync,
    /// Drop the table of every registered model
    DropTables,
    /// Drop the whole keyspace
    DropKeyspace,
    /// Print the tables and types that would be synced
    ListModels,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "schema_admin=info,cqlbind=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();
    info!("Configuration: {}", args.config);

    let settings = config::load_config(&args.config)?;

    if let Command::ListModels = args.command {
        let registry = cqlbind::ModelRegistry::global();
        registry.validate_all()?;
        for model in registry.concrete_types() {
            println!("type  {:<12} -> {}", model.name, model.cql_name());
        }
        for model in registry.concrete_tables() {
            println!("table {:<12} -> {}", model.name, model.cql_name());
        }
        return Ok(());
    }

    let db = CqlBinder::bind(&settings).await?;
    if let Some(ref keyspace) = args.keyspace {
        db.set_keyspace(Some(keyspace));
    }
    let keyspace = db.keyspace();

    match args.command {
        Command::CreateKeyspace { replication_factor } => {
            db.create_keyspace_simple(&keyspace, replication_factor).await?;
            info!("Keyspace {} ready", keyspace);
        }
        Command::Sync => {
            db.registry().validate_all()?;
            db.sync_db().await?;
            info!("Schema in {} is in sync with {} models", keyspace, db.registry().len());
        }
        Command::DropTables => {
            drop_tables(&db).await?;
            info!("Dropped {} tables from {}", db.models().len(), keyspace);
        }
        Command::DropKeyspace => {
            drop_keyspace(&db).await?;
            info!("Dropped keyspace {}", keyspace);
        }
        Command::ListModels => {}
    }

    Ok(())
}
