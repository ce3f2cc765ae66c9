//! Optional desktop integrations: the tray icon and the desktop shortcut. Neither is required for
//! the host to work, so their outcome is reported as a [CapabilityStatus] instead of an error.

pub mod shortcut;
pub mod tray;

use serde::Serialize;

pub const APPLICATION_NAME: &str = "Legal Time Tracker";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "kebab-case")]
pub enum CapabilityStatus {
    Available,
    /// The platform or the environment doesn't offer the feature.
    Unavailable { reason: String },
    /// The feature exists but using it went wrong.
    Failed { error: String },
}

impl CapabilityStatus {
    pub fn is_available(&self) -> bool {
        matches!(self, CapabilityStatus::Available)
    }
}
