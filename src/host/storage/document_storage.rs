use std::{
    future::Future,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use fs4::tokio::AsyncFileExt;
use tokio::fs::File;
use tracing::{debug, warn};

use crate::fs::operations::{
    move_aside, read_to_string_if_exists, sibling_path, write_atomically,
};

use super::entities::StoreDocument;

pub const DEFAULT_STORE_NAME: &str = "legal-time-tracker-data";

/// Interface for abstracting where [StoreDocument] lives.
pub trait DocumentStorage {
    /// Reads the whole document. Storage that was never written yields the default document.
    fn load(&self) -> impl Future<Output = Result<StoreDocument>>;

    /// Replaces the whole document.
    fn save(&self, document: &StoreDocument) -> impl Future<Output = Result<()>>;
}

/// The main realization of [DocumentStorage]. The document is kept as pretty printed json in
/// `<dir>/<name>.json`, guarded by an advisory lock on `<dir>/<name>.json.lock`.
pub struct JsonDocumentStorage {
    path: PathBuf,
    lock_path: PathBuf,
}

impl JsonDocumentStorage {
    pub fn new(dir: &Path, name: &str) -> Result<Self, std::io::Error> {
        std::fs::create_dir_all(dir)?;
        let path = dir.join(format!("{name}.json"));
        let lock_path = sibling_path(&path, ".lock");
        Ok(Self { path, lock_path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn open_lock(&self) -> Result<File, std::io::Error> {
        File::options()
            .write(true)
            .create(true)
            .truncate(false)
            .open(&self.lock_path)
            .await
    }

    async fn load_inner(&self) -> Result<StoreDocument> {
        let Some(contents) = read_to_string_if_exists(&self.path).await? else {
            debug!("No store at {:?}, starting empty", self.path);
            return Ok(StoreDocument::default());
        };

        if contents.trim().is_empty() {
            return Ok(StoreDocument::default());
        }

        match serde_json::from_str::<StoreDocument>(&contents) {
            Ok(document) => Ok(document),
            Err(e) if e.is_syntax() || e.is_eof() => {
                // Keep the broken file for inspection and start from an empty store.
                let backup = move_aside(&self.path, ".corrupt").await?;
                warn!(
                    "Store {:?} is not valid json ({e}), moved it to {:?}",
                    self.path, backup
                );
                Ok(StoreDocument::default())
            }
            // Well formed json with records of an unexpected shape. The file is left untouched.
            Err(e) => Err(e).with_context(|| {
                format!("Store {:?} contains records that can't be read", self.path)
            }),
        }
    }
}

impl DocumentStorage for JsonDocumentStorage {
    async fn load(&self) -> Result<StoreDocument> {
        let lock = self.open_lock().await?;
        lock.lock_shared()?;
        let result = self.load_inner().await;
        lock.unlock_async().await?;
        result.with_context(|| format!("Failed to load store {:?}", self.path))
    }

    async fn save(&self, document: &StoreDocument) -> Result<()> {
        let contents = serde_json::to_vec_pretty(document)?;

        // Semi-safe acquire-release for a file
        let lock = self.open_lock().await?;
        lock.lock_exclusive()?;
        let result = write_atomically(&self.path, &contents).await;
        lock.unlock_async().await?;

        result.with_context(|| format!("Failed to write store {:?}", self.path))?;
        debug!("Saved store {:?}", self.path);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use anyhow::Result;
    use serde_json::json;
    use tempfile::tempdir;

    use crate::host::storage::{
        document_storage::{DocumentStorage, JsonDocumentStorage, DEFAULT_STORE_NAME},
        entities::{Client, StoreDocument, TimeEntry},
    };

    fn sample_document() -> Result<StoreDocument> {
        Ok(StoreDocument {
            clients: vec![serde_json::from_value::<Client>(
                json!({ "id": "1", "name": "Acme", "rate": 250 }),
            )?],
            time_entries: vec![serde_json::from_value::<TimeEntry>(
                json!({ "id": "2", "clientId": "1", "minutes": 30 }),
            )?],
        })
    }

    #[tokio::test]
    async fn test_load_without_file() -> Result<()> {
        let dir = tempdir()?;
        let storage = JsonDocumentStorage::new(dir.path(), DEFAULT_STORE_NAME)?;

        assert_eq!(storage.load().await?, StoreDocument::default());
        assert!(!storage.path().exists());
        Ok(())
    }

    #[tokio::test]
    async fn test_save_and_load() -> Result<()> {
        let dir = tempdir()?;
        let storage = JsonDocumentStorage::new(dir.path(), DEFAULT_STORE_NAME)?;
        let document = sample_document()?;

        storage.save(&document).await?;

        let reopened = JsonDocumentStorage::new(dir.path(), DEFAULT_STORE_NAME)?;
        assert_eq!(reopened.load().await?, document);
        assert_eq!(
            storage.path(),
            dir.path().join("legal-time-tracker-data.json")
        );
        Ok(())
    }

    #[tokio::test]
    async fn test_file_layout() -> Result<()> {
        let dir = tempdir()?;
        let storage = JsonDocumentStorage::new(dir.path(), "layout")?;
        storage.save(&sample_document()?).await?;

        let raw: serde_json::Value =
            serde_json::from_str(&tokio::fs::read_to_string(storage.path()).await?)?;

        assert_eq!(
            raw,
            json!({
                "clients": [{ "id": "1", "name": "Acme", "rate": 250 }],
                "timeEntries": [{ "id": "2", "clientId": "1", "minutes": 30 }]
            })
        );
        Ok(())
    }

    #[tokio::test]
    async fn test_missing_collection_reads_empty() -> Result<()> {
        let dir = tempdir()?;
        let storage = JsonDocumentStorage::new(dir.path(), "partial")?;
        tokio::fs::write(storage.path(), r#"{ "clients": [{ "id": "9" }] }"#).await?;

        let document = storage.load().await?;

        assert_eq!(document.clients.len(), 1);
        assert!(document.time_entries.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn test_unexpected_record_shape_keeps_file() -> Result<()> {
        let dir = tempdir()?;
        let storage = JsonDocumentStorage::new(dir.path(), "numeric")?;
        let contents = r#"{"clients":[{"id":"1","name":"Acme"}],"timeEntries":[{"id":"2","clientId":1,"minutes":30}]}"#;
        tokio::fs::write(storage.path(), contents).await?;

        assert!(storage.load().await.is_err());
        assert_eq!(tokio::fs::read_to_string(storage.path()).await?, contents);
        assert!(!dir.path().join("numeric.json.corrupt").exists());
        Ok(())
    }

    #[tokio::test]
    async fn test_corrupt_file_is_moved_aside() -> Result<()> {
        let dir = tempdir()?;
        let storage = JsonDocumentStorage::new(dir.path(), "broken")?;
        tokio::fs::write(storage.path(), "{ \"clients\": [").await?;

        assert_eq!(storage.load().await?, StoreDocument::default());
        assert!(dir.path().join("broken.json.corrupt").exists());
        assert!(!storage.path().exists());

        tokio::fs::write(storage.path(), "not json at all").await?;
        assert_eq!(storage.load().await?, StoreDocument::default());
        assert_eq!(
            tokio::fs::read_to_string(dir.path().join("broken.json.corrupt")).await?,
            "{ \"clients\": ["
        );
        assert_eq!(
            tokio::fs::read_to_string(dir.path().join("broken.json.corrupt.1")).await?,
            "not json at all"
        );
        Ok(())
    }
}
