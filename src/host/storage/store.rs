use anyhow::Result;

use super::{
    document_storage::DocumentStorage,
    entities::{Collection, StoreDocument},
};

/// In-memory view of the persisted document. Every change is flushed before it becomes visible,
/// so the view never runs ahead of the disk.
pub struct Store<S: DocumentStorage> {
    storage: S,
    document: StoreDocument,
}

impl<S: DocumentStorage> Store<S> {
    pub async fn open(storage: S) -> Result<Self> {
        let document = storage.load().await?;
        Ok(Self { storage, document })
    }

    pub fn get<C: Collection>(&self) -> &[C::Record] {
        C::records(&self.document)
    }

    /// Replaces a collection wholesale.
    pub async fn set<C: Collection>(&mut self, records: Vec<C::Record>) -> Result<()> {
        self.transact(|document| *C::records_mut(document) = records)
            .await
    }

    /// Applies `change` to a copy of the document and persists it with a single write. The
    /// in-memory document is only replaced once the write succeeded.
    pub async fn transact<T>(&mut self, change: impl FnOnce(&mut StoreDocument) -> T) -> Result<T> {
        let mut next = self.document.clone();
        let output = change(&mut next);
        self.storage.save(&next).await?;
        self.document = next;
        Ok(output)
    }

    pub fn document(&self) -> &StoreDocument {
        &self.document
    }
}
