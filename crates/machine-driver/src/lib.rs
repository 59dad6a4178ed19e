pub mod hetzner;
pub mod keys;
pub mod types;

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use types::{MachineState, Options};

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("driver requires the --{0} option")]
    MissingOption(&'static str),

    #[error("unable to generate ssh key pair: {0}")]
    KeyGeneration(#[source] keys::KeyError),

    #[error("unable to read public key: {0}")]
    KeyRead(#[source] std::io::Error),

    #[error("key upload failed: {0}")]
    KeyUpload(#[source] robot_api::Error),

    #[error("install request failed: {0}")]
    InstallRequest(#[source] robot_api::Error),

    #[error("reset request failed: {0}")]
    ResetRequest(#[source] robot_api::Error),

    #[error("{0} is not implemented for this driver")]
    NotImplemented(&'static str),

    #[error("IP address is not set")]
    MissingIpAddress,

    #[error("missing env var: {0}")]
    MissingEnv(String),

    #[error("unknown driver: {0}")]
    UnknownDriver(String),
}

pub type Result<T> = std::result::Result<T, Error>;

/// Capability interface every machine driver implements.
///
/// The trait is total: every verb returns a defined result for every
/// implementer, so drivers backing providers without a given lifecycle
/// operation answer with `Error::NotImplemented` rather than omitting it.
#[async_trait]
pub trait Driver: Send + Sync + std::fmt::Debug {
    /// Driver identifier, as registered with the host.
    fn name(&self) -> &'static str;

    /// Consume host-supplied options. The one validation point: missing
    /// required options fail here, before any provisioning call.
    fn configure(&mut self, options: &Options) -> Result<()>;

    /// Host hook run before `create`.
    async fn pre_create_check(&self) -> Result<()>;

    /// Provision the machine.
    async fn create(&self) -> Result<()>;

    /// The machine's public IP.
    fn ip(&self) -> Result<String>;

    /// Hostname to SSH into.
    fn ssh_hostname(&self) -> Result<String>;

    /// URL of the machine's container daemon.
    fn url(&self) -> Result<String>;

    /// Current machine state as reported by the driver.
    fn state(&self) -> MachineState;

    async fn start(&self) -> Result<()>;
    async fn stop(&self) -> Result<()>;
    async fn restart(&self) -> Result<()>;
    async fn kill(&self) -> Result<()>;
    async fn remove(&self) -> Result<()>;
}

/// Builds a fresh, unconfigured driver for one machine: `(machine_name,
/// store_path)` in, boxed driver out.
pub type DriverFactory = Arc<dyn Fn(&str, &Path) -> Box<dyn Driver> + Send + Sync>;

/// Registry of machine drivers, keyed by driver name.
///
/// Registration is an explicit call the host makes at startup; drivers do
/// not register themselves as a load-time side effect.
#[derive(Clone, Default)]
pub struct DriverRegistry {
    factories: HashMap<String, DriverFactory>,
}

impl DriverRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a driver factory under `name`, replacing any previous one.
    pub fn register(&mut self, name: impl Into<String>, factory: DriverFactory) {
        let name = name.into();
        tracing::info!(driver = %name, "registered machine driver");
        self.factories.insert(name, factory);
    }

    /// Instantiate a driver for one machine.
    pub fn create(&self, name: &str, machine_name: &str, store_path: &Path) -> Result<Box<dyn Driver>> {
        let factory = self
            .factories
            .get(name)
            .ok_or_else(|| Error::UnknownDriver(name.to_string()))?;
        Ok(factory(machine_name, store_path))
    }

    /// Names of all registered drivers.
    pub fn available(&self) -> Vec<&str> {
        self.factories.keys().map(String::as_str).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.factories.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hetzner::RobotDriver;

    fn registry() -> DriverRegistry {
        let mut registry = DriverRegistry::new();
        registry.register(
            "hetzner",
            Arc::new(|machine, store| Box::new(RobotDriver::new(machine, store)) as Box<dyn Driver>),
        );
        registry
    }

    #[test]
    fn registry_builds_registered_driver() {
        let registry = registry();
        assert!(!registry.is_empty());
        assert_eq!(registry.available(), vec!["hetzner"]);

        let driver = registry
            .create("hetzner", "box-1", Path::new("/tmp/store"))
            .unwrap();
        assert_eq!(driver.name(), "hetzner");
    }

    #[test]
    fn registry_rejects_unknown_driver() {
        let err = registry()
            .create("digitalocean", "box-1", Path::new("/tmp/store"))
            .unwrap_err();
        assert!(matches!(err, Error::UnknownDriver(name) if name == "digitalocean"));
    }
}
