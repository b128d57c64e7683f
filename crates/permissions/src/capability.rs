//! Capability and grant types.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// A device capability that needs an OS-level permission prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Capability {
    Camera,
    Microphone,
    ReadExternalStorage,
    WriteExternalStorage,
}

/// Outcome of a single permission prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PermissionStatus {
    /// The user (or the OS) granted access.
    Granted,
    /// The user denied access but may be asked again.
    Denied,
    /// The user denied access permanently; only system settings can change it.
    Blocked,
    /// The capability does not exist on this device.
    Unavailable,
}

/// Collected results of one or more permission waves.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Grants {
    statuses: HashMap<Capability, PermissionStatus>,
}

impl Grants {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the status of a capability, replacing any earlier answer.
    pub fn insert(&mut self, capability: Capability, status: PermissionStatus) {
        self.statuses.insert(capability, status);
    }

    /// Merge another wave's results into this one. Later answers win.
    pub fn merge(&mut self, other: Grants) {
        self.statuses.extend(other.statuses);
    }

    pub fn status(&self, capability: Capability) -> Option<PermissionStatus> {
        self.statuses.get(&capability).copied()
    }

    /// True only if the capability was asked for and granted.
    pub fn is_granted(&self, capability: Capability) -> bool {
        self.status(capability) == Some(PermissionStatus::Granted)
    }

    pub fn is_empty(&self) -> bool {
        self.statuses.is_empty()
    }
}

impl FromIterator<(Capability, PermissionStatus)> for Grants {
    fn from_iter<I: IntoIterator<Item = (Capability, PermissionStatus)>>(iter: I) -> Self {
        Self {
            statuses: iter.into_iter().collect(),
        }
    }
}
