use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;

/// Identity and credentials for one leased server.
///
/// All four fields must be non-empty before any provisioning call is made;
/// `Driver::configure` is where that is enforced.
#[derive(Debug, Clone, Default)]
pub struct MachineConfig {
    /// Logical machine name, used as the key-pair label.
    pub name: String,
    /// The server's public IP. Immutable after creation.
    pub ip_address: String,
    /// Robot webservice username.
    pub login: String,
    /// Robot webservice password.
    pub password: String,
    /// Local directory under which the machine's key pair is written.
    pub store_path: PathBuf,
}

/// Option bag handed to `Driver::configure` by the host.
#[derive(Debug, Clone, Default)]
pub struct Options {
    values: HashMap<String, String>,
}

impl Options {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.values.insert(key.into(), value.into());
        self
    }

    /// Value for `key`, or `""` when absent. Mirrors how hosts hand over
    /// flag values: an unset flag and an empty flag are the same thing.
    pub fn string(&self, key: &str) -> &str {
        self.values.get(key).map(String::as_str).unwrap_or("")
    }
}

/// Driver-reported machine state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MachineState {
    Starting,
    Running,
    Stopped,
    Error,
    Unknown,
}

impl fmt::Display for MachineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Starting => "starting",
            Self::Running => "running",
            Self::Stopped => "stopped",
            Self::Error => "error",
            Self::Unknown => "unknown",
        };
        f.write_str(s)
    }
}
