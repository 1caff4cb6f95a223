use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use sila_hierarchy::HierarchyConfig;
use sila_store::{DocumentStore, DocumentsConfig, FileDocumentStore, InMemoryDocumentStore};

use crate::error::{ServerError, ServerResult};

/// Environment variable overriding `server.bind_addr`.
pub const ENV_BIND_ADDR: &str = "SILA_BIND_ADDR";
/// Environment variable overriding `store.connection_string`.
pub const ENV_CONNECTION_STRING: &str = "SILA_STORE_CONNECTION_STRING";
/// Environment variable overriding `store.database`.
pub const ENV_DATABASE: &str = "SILA_STORE_DATABASE";

/// Complete process configuration, loaded from TOML.
///
/// ```toml
/// [server]
/// bind_addr = "127.0.0.1:8080"
///
/// [store]
/// connection_string = "file:///var/lib/sila"
/// database = "inventory"
///
/// [hierarchy]
/// enforce_parent_integrity = false
///
/// [log]
/// level = "info"
/// ```
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SilaConfig {
    pub server: ServerConfig,
    pub store: StoreConfig,
    pub hierarchy: HierarchyConfig,
    pub log: LogConfig,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind_addr: SocketAddr,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 8080)),
        }
    }
}

/// Document store connection settings.
///
/// `connection_string` selects the backend: `memory://` keeps everything in
/// process, `file://<dir>` persists to `<dir>/<database>.json`. Both
/// `connection_string` and `database` are required.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub connection_string: String,
    pub database: String,
    pub operation_timeout_ms: u64,
    pub batch_size: usize,
}

impl Default for StoreConfig {
    fn default() -> Self {
        let documents = DocumentsConfig::default();
        Self {
            connection_string: String::new(),
            database: String::new(),
            operation_timeout_ms: documents.operation_timeout.as_millis() as u64,
            batch_size: documents.batch_size,
        }
    }
}

/// Backend selected by a connection string.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StoreBackend {
    Memory,
    File(PathBuf),
}

impl StoreConfig {
    pub fn backend(&self) -> ServerResult<StoreBackend> {
        let conn = self.connection_string.trim();
        if conn == "memory://" || conn == "memory" {
            return Ok(StoreBackend::Memory);
        }
        match conn.strip_prefix("file://") {
            Some(dir) if !dir.is_empty() => {
                Ok(StoreBackend::File(Path::new(dir).join(format!("{}.json", self.database))))
            }
            _ => Err(ServerError::Config(format!(
                "unsupported store connection string {conn:?} (expected memory:// or file://<dir>)"
            ))),
        }
    }

    pub fn documents_config(&self) -> DocumentsConfig {
        DocumentsConfig {
            operation_timeout: Duration::from_millis(self.operation_timeout_ms),
            batch_size: self.batch_size,
        }
    }

    /// Open the configured backend.
    pub fn open(&self) -> ServerResult<Arc<dyn DocumentStore>> {
        let store: Arc<dyn DocumentStore> = match self.backend()? {
            StoreBackend::Memory => Arc::new(InMemoryDocumentStore::new()),
            StoreBackend::File(path) => Arc::new(FileDocumentStore::open(path)?),
        };
        tracing::info!(
            connection = %self.connection_string,
            database = %self.database,
            "document store opened"
        );
        Ok(store)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// Default filter directive; `RUST_LOG` takes precedence.
    pub level: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".into(),
        }
    }
}

impl SilaConfig {
    pub fn from_toml_str(text: &str) -> ServerResult<Self> {
        toml::from_str(text).map_err(|e| ServerError::Config(e.to_string()))
    }

    pub fn to_toml(&self) -> ServerResult<String> {
        toml::to_string_pretty(self).map_err(|e| ServerError::Config(e.to_string()))
    }

    /// Read `path` (or start from defaults) and apply environment overrides.
    /// The result is not validated.
    pub fn load(path: Option<&Path>) -> ServerResult<Self> {
        let mut config = match path {
            Some(path) => {
                let text = std::fs::read_to_string(path).map_err(|e| {
                    ServerError::Config(format!("cannot read {}: {e}", path.display()))
                })?;
                Self::from_toml_str(&text)?
            }
            None => Self::default(),
        };
        config.apply_overrides(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    /// Override settings from `lookup`, keyed by the `SILA_*` variable names.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) -> ServerResult<()> {
        if let Some(addr) = lookup(ENV_BIND_ADDR) {
            self.server.bind_addr = addr
                .parse()
                .map_err(|e| ServerError::Config(format!("{ENV_BIND_ADDR}={addr:?}: {e}")))?;
        }
        if let Some(conn) = lookup(ENV_CONNECTION_STRING) {
            self.store.connection_string = conn;
        }
        if let Some(database) = lookup(ENV_DATABASE) {
            self.store.database = database;
        }
        Ok(())
    }

    /// Check that the required store settings are present and usable.
    pub fn validate(&self) -> ServerResult<()> {
        if self.store.connection_string.trim().is_empty() {
            return Err(ServerError::Config("store.connection_string is required".into()));
        }
        if self.store.database.trim().is_empty() {
            return Err(ServerError::Config("store.database is required".into()));
        }
        if self.store.operation_timeout_ms == 0 {
            return Err(ServerError::Config(
                "store.operation_timeout_ms must be positive".into(),
            ));
        }
        if self.store.batch_size == 0 {
            return Err(ServerError::Config("store.batch_size must be positive".into()));
        }
        self.store.backend()?;
        Ok(())
    }
}
