//! Tray icon with a small menu. A backend per platform implements [TrayBackend]; the rest of
//! the host only sees the actions it reports.

#[cfg(all(windows, feature = "win"))]
pub mod win;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use crate::host::ipc::HostEvent;

use super::{CapabilityStatus, APPLICATION_NAME};

#[derive(Debug, thiserror::Error)]
pub enum TrayError {
    #[error("no tray backend for this platform")]
    Unsupported,
    #[error("failed to create tray icon: {0}")]
    Backend(String),
}

/// Things the user can ask for from the tray.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrayAction {
    Open,
    StartTimer,
    Quit,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TrayMenuItem {
    Action { label: String, action: TrayAction },
    Separator,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrayMenu {
    pub tooltip: String,
    pub items: Vec<TrayMenuItem>,
}

impl Default for TrayMenu {
    fn default() -> Self {
        let action = |label: &str, action| TrayMenuItem::Action {
            label: label.into(),
            action,
        };
        Self {
            tooltip: APPLICATION_NAME.into(),
            items: vec![
                action("Open Legal Time Tracker", TrayAction::Open),
                action("Start Timer", TrayAction::StartTimer),
                TrayMenuItem::Separator,
                action("Quit", TrayAction::Quit),
            ],
        }
    }
}

impl TrayMenu {
    /// Command id a backend uses for the item at `index`. Zero means "nothing selected" to most
    /// toolkits, so ids start at one.
    pub fn command_id(index: usize) -> usize {
        index + 1
    }

    /// Action behind a command id from [TrayMenu::command_id]. Separators have none.
    pub fn action(&self, command_id: usize) -> Option<TrayAction> {
        match self.items.get(command_id.checked_sub(1)?)? {
            TrayMenuItem::Action { action, .. } => Some(*action),
            TrayMenuItem::Separator => None,
        }
    }
}

/// Intended to serve as a contract tray implementations of different platforms must satisfy.
#[cfg_attr(test, mockall::automock)]
pub trait TrayBackend {
    /// Shows the icon with `menu`. Selected menu items are sent into `actions`; a click on the icon
    /// itself is reported as [TrayAction::Open].
    fn install(
        &mut self,
        menu: &TrayMenu,
        actions: mpsc::UnboundedSender<TrayAction>,
    ) -> Result<(), TrayError>;
}

/// Picks the tray implementation of the current platform.
pub fn platform_tray() -> Result<Box<dyn TrayBackend>, TrayError> {
    cfg_if::cfg_if! {
        if #[cfg(all(windows, feature = "win"))] {
            Ok(Box::new(win::WindowsTray::new()))
        } else {
            Err(TrayError::Unsupported)
        }
    }
}

/// Installed tray. The backend has to stay alive for the icon to stay visible.
pub struct Tray {
    pub status: CapabilityStatus,
    pub actions: Option<mpsc::UnboundedReceiver<TrayAction>>,
    _backend: Option<Box<dyn TrayBackend>>,
}

/// Best effort tray creation. Failing to create the icon never stops the host.
pub fn install_tray(backend: Result<Box<dyn TrayBackend>, TrayError>, menu: &TrayMenu) -> Tray {
    let mut backend = match backend {
        Ok(backend) => backend,
        Err(e) => {
            info!("Continuing without tray icon: {e}");
            return Tray {
                status: CapabilityStatus::Unavailable {
                    reason: e.to_string(),
                },
                actions: None,
                _backend: None,
            };
        }
    };

    let (sender, receiver) = mpsc::unbounded_channel();
    match backend.install(menu, sender) {
        Ok(()) => {
            info!("Tray icon created");
            Tray {
                status: CapabilityStatus::Available,
                actions: Some(receiver),
                _backend: Some(backend),
            }
        }
        Err(e) => {
            error!("Failed to create tray icon {e:?}");
            Tray {
                status: CapabilityStatus::Failed {
                    error: e.to_string(),
                },
                actions: None,
                _backend: None,
            }
        }
    }
}

/// Forwards tray actions to the front-end until shutdown or until the tray goes away.
pub async fn forward_tray_actions(
    actions: Option<mpsc::UnboundedReceiver<TrayAction>>,
    events: mpsc::UnboundedSender<HostEvent>,
    shutdown: CancellationToken,
) {
    let Some(mut actions) = actions else {
        return;
    };
    loop {
        tokio::select! {
            _ = shutdown.cancelled() => return,
            action = actions.recv() => match action {
                Some(action) => route_tray_action(action, &events, &shutdown),
                None => return,
            }
        }
    }
}

fn route_tray_action(
    action: TrayAction,
    events: &mpsc::UnboundedSender<HostEvent>,
    shutdown: &CancellationToken,
) {
    debug!("Tray action {action:?}");
    let event = match action {
        TrayAction::Open => HostEvent::ShowWindow,
        TrayAction::StartTimer => HostEvent::StartTimer,
        TrayAction::Quit => {
            shutdown.cancel();
            return;
        }
    };
    if events.send(event).is_err() {
        debug!("Front-end is gone, dropping tray action {action:?}");
    }
}

#[cfg(test)]
mod tests {
    use tokio::sync::mpsc;
    use tokio_util::sync::CancellationToken;

    use crate::host::{integration::CapabilityStatus, ipc::HostEvent};

    use super::{
        forward_tray_actions, install_tray, platform_tray, MockTrayBackend, TrayAction, TrayError,
        TrayMenu, TrayMenuItem,
    };

    #[test]
    fn test_default_menu() {
        let menu = TrayMenu::default();

        assert_eq!(menu.tooltip, "Legal Time Tracker");
        assert_eq!(menu.items.len(), 4);
        assert_eq!(menu.items[2], TrayMenuItem::Separator);
        assert_eq!(
            menu.items[3],
            TrayMenuItem::Action {
                label: "Quit".into(),
                action: TrayAction::Quit
            }
        );
    }

    #[test]
    fn test_command_ids() {
        let menu = TrayMenu::default();

        assert_eq!(menu.action(0), None);
        assert_eq!(menu.action(TrayMenu::command_id(0)), Some(TrayAction::Open));
        assert_eq!(menu.action(TrayMenu::command_id(1)), Some(TrayAction::StartTimer));
        assert_eq!(menu.action(TrayMenu::command_id(2)), None);
        assert_eq!(menu.action(TrayMenu::command_id(3)), Some(TrayAction::Quit));
        assert_eq!(menu.action(TrayMenu::command_id(4)), None);
    }

    #[cfg(not(all(windows, feature = "win")))]
    #[test]
    fn test_missing_backend_is_unavailable() {
        let tray = install_tray(platform_tray(), &TrayMenu::default());

        assert!(matches!(tray.status, CapabilityStatus::Unavailable { .. }));
        assert!(tray.actions.is_none());
    }

    #[test]
    fn test_backend_failure_is_reported() {
        let mut backend = MockTrayBackend::new();
        backend
            .expect_install()
            .returning(|_, _| Err(TrayError::Backend("no status notifier".into())))
            .times(1);

        let tray = install_tray(Ok(Box::new(backend)), &TrayMenu::default());

        assert_eq!(
            tray.status,
            CapabilityStatus::Failed {
                error: "failed to create tray icon: no status notifier".into()
            }
        );
    }

    #[tokio::test]
    async fn test_actions_are_forwarded() {
        let mut backend = MockTrayBackend::new();
        backend.expect_install().returning(|menu, actions| {
            assert_eq!(menu.items.len(), 4);
            actions.send(TrayAction::StartTimer).unwrap();
            actions.send(TrayAction::Open).unwrap();
            actions.send(TrayAction::Quit).unwrap();
            Ok(())
        });

        let tray = install_tray(Ok(Box::new(backend)), &TrayMenu::default());
        assert!(tray.status.is_available());

        let (events, mut received) = mpsc::unbounded_channel();
        let shutdown = CancellationToken::new();
        forward_tray_actions(tray.actions, events, shutdown.clone()).await;

        assert!(shutdown.is_cancelled());
        assert_eq!(received.recv().await, Some(HostEvent::StartTimer));
        assert_eq!(received.recv().await, Some(HostEvent::ShowWindow));
    }
}
