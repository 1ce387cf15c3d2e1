use std::collections::HashMap;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Result};
use chrono::Utc;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use tokio::fs;
use tokio::sync::RwLock;
use tracing::{debug, error, info};

/// Lifetime of a stored credential value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StorageScope {
    /// Survives restarts ("remember me")
    Durable,
    /// Lives only as long as the current process
    Session,
}

impl StorageScope {
    /// The scope that is not this one
    pub fn other(self) -> Self {
        match self {
            StorageScope::Durable => StorageScope::Session,
            StorageScope::Session => StorageScope::Durable,
        }
    }
}

/// Key-value persistence with two named scopes
#[async_trait::async_trait]
pub trait CredentialStorage: Send + Sync {
    async fn get(&self, scope: StorageScope, key: &str) -> Result<Option<String>>;

    async fn set(&self, scope: StorageScope, key: &str, value: String) -> Result<()>;

    /// Removing a missing key is not an error
    async fn remove(&self, scope: StorageScope, key: &str) -> Result<()>;
}

/// Purely in-memory storage for both scopes
#[derive(Debug, Default)]
pub struct MemoryStorage {
    values: DashMap<(StorageScope, String), String>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of keys held in a scope
    pub fn len(&self, scope: StorageScope) -> usize {
        self.values.iter().filter(|e| e.key().0 == scope).count()
    }

    pub fn is_empty(&self, scope: StorageScope) -> bool {
        self.len(scope) == 0
    }
}

#[async_trait::async_trait]
impl CredentialStorage for MemoryStorage {
    async fn get(&self, scope: StorageScope, key: &str) -> Result<Option<String>> {
        Ok(self
            .values
            .get(&(scope, key.to_string()))
            .map(|v| v.value().clone()))
    }

    async fn set(&self, scope: StorageScope, key: &str, value: String) -> Result<()> {
        self.values.insert((scope, key.to_string()), value);
        Ok(())
    }

    async fn remove(&self, scope: StorageScope, key: &str) -> Result<()> {
        self.values.remove(&(scope, key.to_string()));
        Ok(())
    }
}

/// On-disk layout of the durable scope
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct StoragePayload {
    values: HashMap<String, String>,
    /// When the file was last written
    saved_at: Option<chrono::DateTime<Utc>>,
}

/// Storage whose durable scope is a JSON file; the session scope stays in memory
pub struct FileStorage {
    path: PathBuf,
    durable: RwLock<HashMap<String, String>>,
    session: DashMap<String, String>,
}

impl FileStorage {
    /// Open the store at `path`, loading existing durable values if the file exists
    pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        let durable = if fs::try_exists(&path).await? {
            let raw = fs::read_to_string(&path).await?;
            let payload: StoragePayload = serde_json::from_str(&raw).map_err(|e| {
                error!(error = %e, path = %path.display(), "Failed to parse credential store");
                anyhow!("Failed to parse credential store {}: {}", path.display(), e)
            })?;
            debug!(
                path = %path.display(),
                keys = payload.values.len(),
                "Loaded credential store"
            );
            payload.values
        } else {
            debug!(path = %path.display(), "No credential store on disk yet");
            HashMap::new()
        };

        Ok(Self {
            path,
            durable: RwLock::new(durable),
            session: DashMap::new(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Write the durable scope to disk
    async fn save(&self, values: &HashMap<String, String>) -> Result<()> {
        let payload = StoragePayload {
            values: values.clone(),
            saved_at: Some(Utc::now()),
        };
        let json = serde_json::to_string_pretty(&payload)?;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).await?;
        }

        fs::write(&self.path, json).await.map_err(|e| {
            error!(error = %e, path = %self.path.display(), "Failed to save credential store");
            anyhow!("Failed to save credential store: {}", e)
        })?;

        debug!(path = %self.path.display(), "Credential store saved");
        Ok(())
    }
}

#[async_trait::async_trait]
impl CredentialStorage for FileStorage {
    async fn get(&self, scope: StorageScope, key: &str) -> Result<Option<String>> {
        match scope {
            StorageScope::Durable => Ok(self.durable.read().await.get(key).cloned()),
            StorageScope::Session => Ok(self.session.get(key).map(|v| v.value().clone())),
        }
    }

    async fn set(&self, scope: StorageScope, key: &str, value: String) -> Result<()> {
        match scope {
            StorageScope::Durable => {
                let mut durable = self.durable.write().await;
                durable.insert(key.to_string(), value);
                self.save(&durable).await
            }
            StorageScope::Session => {
                self.session.insert(key.to_string(), value);
                Ok(())
            }
        }
    }

    async fn remove(&self, scope: StorageScope, key: &str) -> Result<()> {
        match scope {
            StorageScope::Durable => {
                let mut durable = self.durable.write().await;
                if durable.remove(key).is_some() {
                    self.save(&durable).await?;
                    info!(key = %key, "Removed durable credential entry");
                }
                Ok(())
            }
            StorageScope::Session => {
                self.session.remove(key);
                Ok(())
            }
        }
    }
}
