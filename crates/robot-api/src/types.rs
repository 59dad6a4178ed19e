use serde::{Deserialize, Serialize};

// ── Key registration ─────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize)]
pub struct UploadKey {
    pub name: String,
    pub data: String,
}

/// Response envelope for `POST /key`: `{"key": {...}}`.
#[derive(Debug, Clone, Deserialize)]
pub struct KeyEnvelope {
    pub key: SshKey,
}

/// A public key registered with the Robot webservice.
#[derive(Debug, Clone, Deserialize)]
pub struct SshKey {
    pub name: String,
    pub fingerprint: String,
    #[serde(rename = "type")]
    pub key_type: String,
    pub size: u32,
    pub data: String,
}

// ── Linux installation ───────────────────────────────────────────────

#[derive(Debug, Clone, Serialize)]
pub struct InstallLinux {
    pub dist: String,
    pub arch: String,
    pub lang: String,
    pub authorized_key: String,
}

impl InstallLinux {
    /// The base image this driver always installs.
    pub const DIST: &'static str = "Ubuntu 14.04.2 LTS minimal";

    /// Install request for the fixed Ubuntu base image, with SSH access
    /// granted to the key named by `fingerprint`.
    pub fn ubuntu(fingerprint: impl Into<String>) -> Self {
        Self {
            dist: Self::DIST.into(),
            arch: "64".into(),
            lang: "en".into(),
            authorized_key: fingerprint.into(),
        }
    }
}

// ── Hardware reset ───────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize)]
pub struct Reset {
    #[serde(rename = "type")]
    pub reset_type: String,
}

impl Reset {
    /// Hardware reset (power cycle).
    pub fn hardware() -> Self {
        Self {
            reset_type: "hw".into(),
        }
    }
}
