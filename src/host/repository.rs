use anyhow::Result;
use tracing::{debug, info};

use crate::utils::clock::Clock;

use super::storage::{
    document_storage::DocumentStorage,
    entities::{
        Client, Clients, Collection, Identified, NewClient, NewTimeEntry, RecordId, TimeEntries,
        TimeEntry,
    },
    ids::IdGenerator,
    store::Store,
};

/// Owns the store and implements every record operation the front-end can request.
/// Constructed once per host and handed to [crate::host::ipc::router::Router].
pub struct Repository<S: DocumentStorage> {
    store: Store<S>,
    ids: IdGenerator,
}

impl<S: DocumentStorage> Repository<S> {
    /// Loads the store from `storage`.
    pub async fn open(storage: S, clock: Box<dyn Clock>) -> Result<Self> {
        let store = Store::open(storage).await?;
        let ids = IdGenerator::new(clock, store.document().ids());
        info!(
            "Opened store with {} clients and {} time entries",
            store.get::<Clients>().len(),
            store.get::<TimeEntries>().len()
        );
        Ok(Self { store, ids })
    }

    pub fn clients(&self) -> &[Client] {
        self.store.get::<Clients>()
    }

    pub async fn add_client(&mut self, client: NewClient) -> Result<Client> {
        let client = client.into_client(self.ids.next_id()?);
        self.append::<Clients>(client).await
    }

    /// Returns [None] when no client has the same id. Nothing is written in that case.
    pub async fn update_client(&mut self, client: Client) -> Result<Option<Client>> {
        self.replace::<Clients>(client).await
    }

    /// Removes the client and every time entry referencing it. Both collections are written
    /// together, and the entries are removed even if the client itself was never stored.
    pub async fn delete_client(&mut self, client_id: &RecordId) -> Result<bool> {
        let (clients_removed, entries_removed) = self
            .store
            .transact(|document| {
                let clients_before = document.clients.len();
                document.clients.retain(|client| client.id != *client_id);

                let entries_before = document.time_entries.len();
                document
                    .time_entries
                    .retain(|entry| !entry.belongs_to(client_id));

                (
                    clients_before - document.clients.len(),
                    entries_before - document.time_entries.len(),
                )
            })
            .await?;
        info!("Deleted client {client_id}: {clients_removed} clients, {entries_removed} time entries removed");
        Ok(true)
    }

    pub fn time_entries(&self) -> &[TimeEntry] {
        self.store.get::<TimeEntries>()
    }

    pub async fn add_time_entry(&mut self, entry: NewTimeEntry) -> Result<TimeEntry> {
        let entry = entry.into_time_entry(self.ids.next_id()?);
        self.append::<TimeEntries>(entry).await
    }

    pub async fn update_time_entry(&mut self, entry: TimeEntry) -> Result<Option<TimeEntry>> {
        self.replace::<TimeEntries>(entry).await
    }

    pub async fn delete_time_entry(&mut self, entry_id: &RecordId) -> Result<bool> {
        self.remove::<TimeEntries>(entry_id).await?;
        Ok(true)
    }

    async fn append<C: Collection>(&mut self, record: C::Record) -> Result<C::Record> {
        let stored = record.clone();
        self.store
            .transact(|document| C::records_mut(document).push(record))
            .await?;
        debug!("Added {} to {}", stored.id(), C::NAME);
        Ok(stored)
    }

    async fn replace<C: Collection>(&mut self, record: C::Record) -> Result<Option<C::Record>> {
        let Some(index) = self
            .store
            .get::<C>()
            .iter()
            .position(|current| current.id() == record.id())
        else {
            debug!("Nothing to update in {} for {}", C::NAME, record.id());
            return Ok(None);
        };

        let updated = record.clone();
        self.store
            .transact(|document| C::records_mut(document)[index] = record)
            .await?;
        debug!("Updated {} in {}", updated.id(), C::NAME);
        Ok(Some(updated))
    }

    async fn remove<C: Collection>(&mut self, id: &RecordId) -> Result<usize> {
        let removed = self
            .store
            .transact(|document| {
                let records = C::records_mut(document);
                let before = records.len();
                records.retain(|record| record.id() != id);
                before - records.len()
            })
            .await?;
        debug!("Removed {removed} records with id {id} from {}", C::NAME);
        Ok(removed)
    }
}
