use std::{borrow::Borrow, fmt::Display};

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// Caller supplied fields of a record. They are never inspected and keep their insertion order.
pub type Fields = Map<String, Value>;

/// Identifier of a stored record. Generated ids are decimal millisecond timestamps, but anything
/// found on disk is accepted as is.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordId(String);

impl RecordId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for RecordId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for RecordId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for RecordId {
    fn from(value: &str) -> Self {
        Self(value.into())
    }
}

impl Borrow<str> for RecordId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

/// Anything stored in a collection is addressed by its id.
pub trait Identified {
    fn id(&self) -> &RecordId;
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Client {
    pub id: RecordId,
    #[serde(flatten)]
    pub fields: Fields,
}

/// Client as sent by the front-end before it was stored.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NewClient {
    #[serde(flatten)]
    pub fields: Fields,
}

impl NewClient {
    pub fn into_client(mut self, id: RecordId) -> Client {
        // Ids are owned by the store. Keeping the caller's one would duplicate the key on disk.
        self.fields.shift_remove("id");
        Client {
            id,
            fields: self.fields,
        }
    }
}

impl Identified for Client {
    fn id(&self) -> &RecordId {
        &self.id
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeEntry {
    pub id: RecordId,
    /// Owning client. Never checked against the client collection. `Some(None)` is an explicit
    /// `null`, kept so it is written back unchanged.
    #[serde(
        rename = "clientId",
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "present"
    )]
    pub client_id: Option<Option<RecordId>>,
    #[serde(flatten)]
    pub fields: Fields,
}

impl TimeEntry {
    pub fn client(&self) -> Option<&RecordId> {
        self.client_id.as_ref().and_then(Option::as_ref)
    }

    pub fn belongs_to(&self, client_id: &RecordId) -> bool {
        self.client() == Some(client_id)
    }
}

/// Tells a `null` apart from a missing key: the key is absent only when serde falls back to the
/// field default.
fn present<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<Option<RecordId>>, D::Error> {
    Option::<RecordId>::deserialize(deserializer).map(Some)
}

impl Identified for TimeEntry {
    fn id(&self) -> &RecordId {
        &self.id
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NewTimeEntry {
    #[serde(
        rename = "clientId",
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "present"
    )]
    pub client_id: Option<Option<RecordId>>,
    #[serde(flatten)]
    pub fields: Fields,
}

impl NewTimeEntry {
    pub fn into_time_entry(mut self, id: RecordId) -> TimeEntry {
        self.fields.shift_remove("id");
        TimeEntry {
            id,
            client_id: self.client_id,
            fields: self.fields,
        }
    }
}

/// The whole persisted state. Missing keys read as empty collections.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StoreDocument {
    #[serde(default)]
    pub clients: Vec<Client>,
    #[serde(rename = "timeEntries", default)]
    pub time_entries: Vec<TimeEntry>,
}

impl StoreDocument {
    pub fn ids(&self) -> impl Iterator<Item = &RecordId> {
        self.clients
            .iter()
            .map(Identified::id)
            .chain(self.time_entries.iter().map(Identified::id))
    }
}

/// A named part of [StoreDocument] that is read and written as one unit.
pub trait Collection {
    type Record: Identified + Clone;

    const NAME: &'static str;

    fn records(document: &StoreDocument) -> &Vec<Self::Record>;

    fn records_mut(document: &mut StoreDocument) -> &mut Vec<Self::Record>;
}

pub struct Clients;

impl Collection for Clients {
    type Record = Client;

    const NAME: &'static str = "clients";

    fn records(document: &StoreDocument) -> &Vec<Client> {
        &document.clients
    }

    fn records_mut(document: &mut StoreDocument) -> &mut Vec<Client> {
        &mut document.clients
    }
}

pub struct TimeEntries;

impl Collection for TimeEntries {
    type Record = TimeEntry;

    const NAME: &'static str = "timeEntries";

    fn records(document: &StoreDocument) -> &Vec<TimeEntry> {
        &document.time_entries
    }

    fn records_mut(document: &mut StoreDocument) -> &mut Vec<TimeEntry> {
        &mut document.time_entries
    }
}
