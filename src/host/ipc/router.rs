use std::{fmt::Display, str::FromStr};

use serde::{de::DeserializeOwned, Serialize};
use serde_json::{json, Value};
use tracing::debug;

use crate::host::{
    integration::{
        shortcut::{create_shortcut, ShortcutSpec, ShortcutWriter},
        CapabilityStatus,
    },
    repository::Repository,
    storage::{
        document_storage::DocumentStorage,
        entities::{Client, NewClient, NewTimeEntry, RecordId, TimeEntry},
    },
};

/// Every channel the front-end may call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    GetClients,
    AddClient,
    UpdateClient,
    DeleteClient,
    GetTimeEntries,
    AddTimeEntry,
    UpdateTimeEntry,
    DeleteTimeEntry,
    CreateDesktopShortcut,
    GetCapabilities,
}

impl Operation {
    pub const ALL: [Operation; 10] = [
        Operation::GetClients,
        Operation::AddClient,
        Operation::UpdateClient,
        Operation::DeleteClient,
        Operation::GetTimeEntries,
        Operation::AddTimeEntry,
        Operation::UpdateTimeEntry,
        Operation::DeleteTimeEntry,
        Operation::CreateDesktopShortcut,
        Operation::GetCapabilities,
    ];

    pub fn channel(&self) -> &'static str {
        match self {
            Operation::GetClients => "get-clients",
            Operation::AddClient => "add-client",
            Operation::UpdateClient => "update-client",
            Operation::DeleteClient => "delete-client",
            Operation::GetTimeEntries => "get-time-entries",
            Operation::AddTimeEntry => "add-time-entry",
            Operation::UpdateTimeEntry => "update-time-entry",
            Operation::DeleteTimeEntry => "delete-time-entry",
            Operation::CreateDesktopShortcut => "create-desktop-shortcut",
            Operation::GetCapabilities => "get-capabilities",
        }
    }
}

impl Display for Operation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.channel())
    }
}

impl FromStr for Operation {
    type Err = DispatchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Operation::ALL
            .into_iter()
            .find(|operation| operation.channel() == s)
            .ok_or_else(|| DispatchError::UnknownChannel(s.to_string()))
    }
}

#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error("unknown channel '{0}'")]
    UnknownChannel(String),

    /// The payload doesn't have the shape the operation needs.
    #[error("invalid payload for '{operation}': {source}")]
    InvalidPayload {
        operation: Operation,
        source: serde_json::Error,
    },

    /// Storage refused the change. The store is left as it was before the call.
    #[error("storage error: {0:#}")]
    Storage(anyhow::Error),

    #[error("failed to encode result of '{operation}': {source}")]
    Encode {
        operation: Operation,
        source: serde_json::Error,
    },
}

impl From<anyhow::Error> for DispatchError {
    fn from(value: anyhow::Error) -> Self {
        DispatchError::Storage(value)
    }
}

/// Optional integrations the router can reach.
pub struct Capabilities {
    pub tray: CapabilityStatus,
    pub shortcut_writer: Box<dyn ShortcutWriter>,
    pub shortcut: ShortcutSpec,
}

/// Maps channels onto [Repository] operations. Created once with the repository it serves.
pub struct Router<S: DocumentStorage> {
    repository: Repository<S>,
    capabilities: Capabilities,
}

impl<S: DocumentStorage> Router<S> {
    pub fn new(repository: Repository<S>, capabilities: Capabilities) -> Self {
        Self {
            repository,
            capabilities,
        }
    }

    pub fn repository(&self) -> &Repository<S> {
        &self.repository
    }

    pub async fn dispatch(
        &mut self,
        channel: &str,
        payload: Option<Value>,
    ) -> Result<Value, DispatchError> {
        let operation = channel.parse::<Operation>()?;
        debug!("Dispatching {operation}");

        match operation {
            Operation::GetClients => to_value(operation, self.repository.clients()),
            Operation::AddClient => {
                let client: NewClient = parse(operation, payload)?;
                to_value(operation, &self.repository.add_client(client).await?)
            }
            Operation::UpdateClient => {
                let client: Client = parse(operation, payload)?;
                to_value(operation, &self.repository.update_client(client).await?)
            }
            Operation::DeleteClient => {
                let id: RecordId = parse(operation, payload)?;
                to_value(operation, &self.repository.delete_client(&id).await?)
            }
            Operation::GetTimeEntries => to_value(operation, self.repository.time_entries()),
            Operation::AddTimeEntry => {
                let entry: NewTimeEntry = parse(operation, payload)?;
                to_value(operation, &self.repository.add_time_entry(entry).await?)
            }
            Operation::UpdateTimeEntry => {
                let entry: TimeEntry = parse(operation, payload)?;
                to_value(operation, &self.repository.update_time_entry(entry).await?)
            }
            Operation::DeleteTimeEntry => {
                let id: RecordId = parse(operation, payload)?;
                to_value(operation, &self.repository.delete_time_entry(&id).await?)
            }
            Operation::CreateDesktopShortcut => to_value(
                operation,
                &create_shortcut(
                    self.capabilities.shortcut_writer.as_ref(),
                    &self.capabilities.shortcut,
                ),
            ),
            Operation::GetCapabilities => Ok(json!({
                "tray": self.capabilities.tray,
                "desktopShortcut": self.capabilities.shortcut_writer.support(),
            })),
        }
    }
}

fn parse<T: DeserializeOwned>(operation: Operation, payload: Option<Value>) -> Result<T, DispatchError> {
    serde_json::from_value(payload.unwrap_or(Value::Null))
        .map_err(|source| DispatchError::InvalidPayload { operation, source })
}

fn to_value(
    operation: Operation,
    value: &(impl Serialize + ?Sized),
) -> Result<Value, DispatchError> {
    serde_json::to_value(value).map_err(|source| DispatchError::Encode { operation, source })
}

#[cfg(test)]
pub(crate) mod tests {
    use std::path::{Path, PathBuf};

    use anyhow::Result;
    use serde_json::{json, Value};
    use tempfile::tempdir;

    use crate::host::{
        integration::{
            shortcut::{MockShortcutWriter, ShortcutSpec},
            CapabilityStatus,
        },
        repository::Repository,
        storage::{document_storage::JsonDocumentStorage, ids::tests::frozen_clock},
    };

    use super::{to_value, Capabilities, DispatchError, Operation, Router};

    pub(crate) fn test_capabilities() -> Capabilities {
        let mut writer = MockShortcutWriter::new();
        writer
            .expect_create()
            .returning(|spec| Ok(PathBuf::from("/desktop").join(&spec.name)));
        writer
            .expect_support()
            .returning(|| CapabilityStatus::Available);
        Capabilities {
            tray: CapabilityStatus::Unavailable {
                reason: "no tray backend for this platform".into(),
            },
            shortcut_writer: Box::new(writer),
            shortcut: ShortcutSpec::new(PathBuf::from("/opt/host"), vec![], None),
        }
    }

    async fn router(dir: &Path) -> Result<Router<JsonDocumentStorage>> {
        let repository =
            Repository::open(JsonDocumentStorage::new(dir, "router")?, frozen_clock()).await?;
        Ok(Router::new(repository, test_capabilities()))
    }

    #[test]
    fn test_channel_names_round_trip() {
        for operation in Operation::ALL {
            assert_eq!(operation.channel().parse::<Operation>().unwrap(), operation);
        }
        assert!(matches!(
            "add-matter".parse::<Operation>(),
            Err(DispatchError::UnknownChannel(_))
        ));
    }

    #[test]
    fn test_encoding_failure_is_not_a_storage_error() {
        let unencodable = std::collections::BTreeMap::from([(vec![1u8], 1)]);

        let error = to_value(Operation::GetClients, &unencodable).unwrap_err();

        assert!(matches!(
            error,
            DispatchError::Encode {
                operation: Operation::GetClients,
                ..
            }
        ));
        assert!(error
            .to_string()
            .starts_with("failed to encode result of 'get-clients'"));
    }

    #[tokio::test]
    async fn test_client_lifecycle() -> Result<()> {
        let dir = tempdir()?;
        let mut router = router(dir.path()).await?;

        let client = router
            .dispatch("add-client", Some(json!({ "name": "Acme" })))
            .await?;
        assert_eq!(client, json!({ "id": "1700000000000", "name": "Acme" }));

        let updated = router
            .dispatch(
                "update-client",
                Some(json!({ "id": "1700000000000", "name": "Acme Corp" })),
            )
            .await?;
        assert_eq!(updated["name"], json!("Acme Corp"));

        let missing = router
            .dispatch("update-client", Some(json!({ "id": "nope", "name": "X" })))
            .await?;
        assert_eq!(missing, Value::Null);

        assert_eq!(
            router.dispatch("get-clients", None).await?,
            json!([{ "id": "1700000000000", "name": "Acme Corp" }])
        );
        Ok(())
    }

    #[tokio::test]
    async fn test_scenario() -> Result<()> {
        let dir = tempdir()?;
        let mut router = router(dir.path()).await?;

        let client = router
            .dispatch("add-client", Some(json!({ "name": "Acme" })))
            .await?;
        let entry = router
            .dispatch(
                "add-time-entry",
                Some(json!({ "clientId": client["id"], "minutes": 30 })),
            )
            .await?;
        assert_eq!(
            entry,
            json!({ "id": "1700000000001", "clientId": "1700000000000", "minutes": 30 })
        );

        assert_eq!(
            router.dispatch("delete-client", Some(client["id"].clone())).await?,
            json!(true)
        );
        assert_eq!(router.dispatch("get-time-entries", None).await?, json!([]));
        assert_eq!(router.dispatch("get-clients", None).await?, json!([]));
        Ok(())
    }

    #[tokio::test]
    async fn test_time_entry_operations() -> Result<()> {
        let dir = tempdir()?;
        let mut router = router(dir.path()).await?;
        let entry = router
            .dispatch("add-time-entry", Some(json!({ "clientId": "c", "minutes": 6 })))
            .await?;

        let updated = router
            .dispatch(
                "update-time-entry",
                Some(json!({ "id": entry["id"], "clientId": "c", "minutes": 12 })),
            )
            .await?;
        assert_eq!(updated["minutes"], json!(12));

        assert_eq!(
            router
                .dispatch("update-time-entry", Some(json!({ "id": "missing" })))
                .await?,
            Value::Null
        );
        assert_eq!(
            router
                .dispatch("delete-time-entry", Some(json!("missing")))
                .await?,
            json!(true)
        );
        assert_eq!(
            router.dispatch("get-time-entries", None).await?,
            json!([updated])
        );

        router
            .dispatch("delete-time-entry", Some(entry["id"].clone()))
            .await?;
        assert_eq!(router.dispatch("get-time-entries", None).await?, json!([]));
        Ok(())
    }

    #[tokio::test]
    async fn test_invalid_requests() -> Result<()> {
        let dir = tempdir()?;
        let mut router = router(dir.path()).await?;

        assert!(matches!(
            router.dispatch("add-invoice", None).await,
            Err(DispatchError::UnknownChannel(_))
        ));
        assert!(matches!(
            router.dispatch("add-client", None).await,
            Err(DispatchError::InvalidPayload {
                operation: Operation::AddClient,
                ..
            })
        ));
        assert!(matches!(
            router
                .dispatch("update-client", Some(json!({ "name": "no id" })))
                .await,
            Err(DispatchError::InvalidPayload { .. })
        ));
        assert_eq!(router.repository().clients().len(), 0);
        Ok(())
    }

    #[tokio::test]
    async fn test_integrations() -> Result<()> {
        let dir = tempdir()?;
        let mut router = router(dir.path()).await?;

        assert_eq!(
            router.dispatch("create-desktop-shortcut", None).await?,
            json!({ "success": true, "status": "available", "path": "/desktop/Legal Time Tracker" })
        );
        assert_eq!(
            router.dispatch("get-capabilities", None).await?,
            json!({
                "tray": { "status": "unavailable", "reason": "no tray backend for this platform" },
                "desktopShortcut": { "status": "available" }
            })
        );
        Ok(())
    }
}
