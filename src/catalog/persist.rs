use super::{Catalog, CatalogErr};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::{fs, io};
use tracing::debug;

#[derive(Debug, Error)]
pub enum PersistErr {
    #[error("I/O error on catalog {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("catalog {} is corrupt: {source}", .path.display())]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("catalog {} is invalid: {source}", .path.display())]
    Invalid {
        path: PathBuf,
        #[source]
        source: CatalogErr,
    },
    #[error("failed to serialize catalog: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Where the catalog lives between runs.
#[allow(async_fn_in_trait)]
pub trait CatalogStore {
    /// `None` when nothing has been saved yet.
    async fn load(&self) -> Result<Option<Catalog>, PersistErr>;
    async fn save(&self, catalog: &Catalog) -> Result<(), PersistErr>;
}

/// A pretty-printed JSON document, `<root>/defs.json` by default.
#[derive(Debug, Clone)]
pub struct JsonCatalogStore {
    path: PathBuf,
}

impl JsonCatalogStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn io_err(&self, source: io::Error) -> PersistErr {
        PersistErr::Io {
            path: self.path.clone(),
            source,
        }
    }
}

impl CatalogStore for JsonCatalogStore {
    async fn load(&self) -> Result<Option<Catalog>, PersistErr> {
        let data = match fs::read(&self.path).await {
            Ok(data) => data,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(self.io_err(e)),
        };
        let catalog: Catalog =
            serde_json::from_slice(&data).map_err(|source| PersistErr::Corrupt {
                path: self.path.clone(),
                source,
            })?;
        // table ids become file names
        catalog.validate().map_err(|source| PersistErr::Invalid {
            path: self.path.clone(),
            source,
        })?;
        debug!(path = %self.path.display(), "Loaded catalog");
        Ok(Some(catalog))
    }

    async fn save(&self, catalog: &Catalog) -> Result<(), PersistErr> {
        let data = serde_json::to_vec_pretty(catalog)?;
        if let Some(dir) = self.path.parent() {
            fs::create_dir_all(dir).await.map_err(|e| self.io_err(e))?;
        }
        // write aside and rename so a failed save never leaves half a document behind
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, &data).await.map_err(|e| self.io_err(e))?;
        fs::rename(&tmp, &self.path)
            .await
            .map_err(|e| self.io_err(e))?;
        debug!(path = %self.path.display(), tables = catalog.tables.len(), "Saved catalog");
        Ok(())
    }
}

/// Keeps every saved document in memory.
#[cfg(test)]
#[derive(Debug, Default)]
pub struct MemoryCatalogStore {
    pub saves: std::cell::RefCell<Vec<Vec<u8>>>,
}

#[cfg(test)]
impl MemoryCatalogStore {
    pub fn with(catalog: &Catalog) -> Self {
        let store = Self::default();
        store
            .saves
            .borrow_mut()
            .push(serde_json::to_vec_pretty(catalog).unwrap());
        store
    }

    pub fn save_count(&self) -> usize {
        self.saves.borrow().len()
    }

    pub fn last_saved(&self) -> Option<Vec<u8>> {
        self.saves.borrow().last().cloned()
    }
}

#[cfg(test)]
impl CatalogStore for MemoryCatalogStore {
    async fn load(&self) -> Result<Option<Catalog>, PersistErr> {
        let Some(data) = self.saves.borrow().last().cloned() else {
            return Ok(None);
        };
        let catalog: Catalog = serde_json::from_slice(&data)?;
        catalog.validate().map_err(|source| PersistErr::Invalid {
            path: "memory".into(),
            source,
        })?;
        Ok(Some(catalog))
    }

    async fn save(&self, catalog: &Catalog) -> Result<(), PersistErr> {
        let data = serde_json::to_vec_pretty(catalog)?;
        self.saves.borrow_mut().push(data);
        Ok(())
    }
}
