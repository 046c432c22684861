// Server registry
//
// Immutable set of server descriptors, loaded once at startup from a JSON array and
// shared read-only behind an `Arc`.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::models::{DatabaseServer, ServerSummary};

#[derive(Error, Debug)]
pub enum RegistryError {
    #[error("Failed to read server registry {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid server registry: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Duplicate server id {0} in registry")]
    DuplicateId(i64),

    #[error("Invalid server {id}: {reason}")]
    InvalidServer { id: i64, reason: String },
}

#[derive(Debug, Default)]
pub struct ServerRegistry {
    /// In file order
    servers: Vec<DatabaseServer>,
    /// Server id to position in `servers`
    index: HashMap<i64, usize>,
}

impl ServerRegistry {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, RegistryError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| RegistryError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let registry = Self::from_json(&raw)?;
        tracing::info!(
            "Loaded {} servers from {}",
            registry.len(),
            path.display()
        );
        Ok(registry)
    }

    pub fn from_json(raw: &str) -> Result<Self, RegistryError> {
        let servers: Vec<DatabaseServer> = serde_json::from_str(raw)?;
        Self::from_servers(servers)
    }

    pub fn from_servers(servers: Vec<DatabaseServer>) -> Result<Self, RegistryError> {
        let mut index = HashMap::with_capacity(servers.len());

        for (position, server) in servers.iter().enumerate() {
            if index.insert(server.id, position).is_some() {
                return Err(RegistryError::DuplicateId(server.id));
            }
            if server.host.trim().is_empty() {
                return Err(RegistryError::InvalidServer {
                    id: server.id,
                    reason: "host is empty".to_string(),
                });
            }
            if server.port == 0 {
                return Err(RegistryError::InvalidServer {
                    id: server.id,
                    reason: "port must be non-zero".to_string(),
                });
            }
        }

        Ok(Self { servers, index })
    }

    pub fn get(&self, id: i64) -> Option<&DatabaseServer> {
        self.index.get(&id).and_then(|&position| self.servers.get(position))
    }

    /// Servers in the order they were configured
    pub fn servers(&self) -> impl Iterator<Item = &DatabaseServer> {
        self.servers.iter()
    }

    pub fn summaries(&self) -> Vec<ServerSummary> {
        self.servers().map(ServerSummary::from).collect()
    }

    pub fn len(&self) -> usize {
        self.servers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.servers.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Dialect;
    use std::io::Write;

    const SAMPLE: &str = r#"[
        {"id": 2, "name": "warehouse", "host": "pg.local", "port": 5432,
         "username": "etl", "password": "s3cret", "database": "dwh", "type": "postgresql"},
        {"id": 1, "name": "crm", "host": "my.local", "port": 3306,
         "username": "app", "password": "pw", "database": "crm", "type": "mysql"}
    ]"#;

    #[test]
    fn test_from_json_keeps_file_order() {
        let registry = ServerRegistry::from_json(SAMPLE).unwrap();
        assert_eq!(registry.len(), 2);
        let ids: Vec<i64> = registry.servers().map(|s| s.id).collect();
        assert_eq!(ids, vec![2, 1]);
        let names: Vec<String> = registry.summaries().into_iter().map(|s| s.name).collect();
        assert_eq!(names, vec!["warehouse", "crm"]);
        assert_eq!(registry.get(2).unwrap().dialect, Dialect::PostgreSql);
        assert!(registry.get(3).is_none());
    }

    #[test]
    fn test_duplicate_id_rejected() {
        let raw = r#"[
            {"id": 1, "name": "a", "host": "h", "port": 1, "username": "u", "password": "p", "database": "d", "type": "mysql"},
            {"id": 1, "name": "b", "host": "h", "port": 1, "username": "u", "password": "p", "database": "d", "type": "oracle"}
        ]"#;
        assert!(matches!(
            ServerRegistry::from_json(raw),
            Err(RegistryError::DuplicateId(1))
        ));
    }

    #[test]
    fn test_unknown_dialect_rejected() {
        let raw = r#"[{"id": 1, "name": "a", "host": "h", "port": 1, "username": "u",
                       "password": "p", "database": "d", "type": "sqlserver"}]"#;
        assert!(matches!(
            ServerRegistry::from_json(raw),
            Err(RegistryError::Parse(_))
        ));
    }

    #[test]
    fn test_zero_port_rejected() {
        let raw = r#"[{"id": 7, "name": "a", "host": "h", "port": 0, "username": "u",
                       "password": "p", "database": "d", "type": "oracle"}]"#;
        assert!(matches!(
            ServerRegistry::from_json(raw),
            Err(RegistryError::InvalidServer { id: 7, .. })
        ));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(SAMPLE.as_bytes()).unwrap();

        let registry = tokio_test::assert_ok!(ServerRegistry::load(file.path()));
        assert_eq!(registry.get(1).unwrap().name, "crm");
    }

    #[test]
    fn test_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = tokio_test::assert_err!(ServerRegistry::load(dir.path().join("servers.json")));
        assert!(matches!(err, RegistryError::Read { .. }));
    }

    #[test]
    fn test_summaries_hide_credentials() {
        let registry = ServerRegistry::from_json(SAMPLE).unwrap();
        let json = serde_json::to_string(&registry.summaries()).unwrap();
        assert!(!json.contains("s3cret"));
        assert!(!json.contains("username"));
        assert!(json.contains("\"type\":\"postgresql\""));
    }
}
