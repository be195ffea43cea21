use anyhow::Result;
use config::{Config, Environment, File};
use cqlbind::AppSettings;

/// Load `CASSANDRA_*` settings from `path`, with environment variables on top.
pub fn load_config(path: &str) -> Result<AppSettings> {
    let config = Config::builder()
        .add_source(File::with_name(path).required(false))
        .add_source(
            Environment::default()
                .try_parsing(true)
                .list_separator(",")
                .with_list_parse_key("cassandra_hosts"),
        )
        .build()?;

    Ok(config.try_deserialize()?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use cqlbind::ConnectionConfig;
    use std::io::Write;

    #[test]
    fn test_load_config_from_yaml() {
        let dir = std::env::temp_dir().join(format!("schema-admin-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("settings.yaml");
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(file, "cassandra_hosts: [10.1.0.1, 10.1.0.2]").unwrap();
        writeln!(file, "cassandra_keyspace: pet_store").unwrap();
        writeln!(file, "cassandra_consistency: 4").unwrap();

        let settings = load_config(path.to_str().unwrap()).unwrap();
        let config = ConnectionConfig::from_settings(&settings).unwrap();

        assert_eq!(config.hosts, vec!["10.1.0.1", "10.1.0.2"]);
        assert_eq!(config.keyspace, "pet_store");
        assert_eq!(config.consistency, cqlbind::ConsistencyLevel::Quorum);

        std::fs::remove_dir_all(&dir).unwrap();
    }
}
