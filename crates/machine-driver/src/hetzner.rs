use std::path::PathBuf;

use async_trait::async_trait;
use robot_api::{InstallLinux, RobotClient};
use tracing::{debug, info, warn};

use crate::types::{MachineConfig, MachineState, Options};
use crate::{Driver, Error, Result, keys};

/// Port the provisioned machine's container daemon is expected to listen
/// on. A convention, not something the Robot webservice reports.
const DAEMON_PORT: u16 = 2376;

/// Driver for bare-metal servers managed through the Hetzner Robot
/// webservice.
///
/// The server is already leased; `create` does not order hardware. It
/// registers a fresh SSH key, stages a Linux install on the server at the
/// configured IP, and power-cycles it into the new system. The webservice
/// offers no status query and no start/stop control, so `state` is always
/// `Running` and the remaining lifecycle verbs are `NotImplemented`.
#[derive(Debug)]
pub struct RobotDriver {
    config: MachineConfig,
    base_url: Option<String>,
}

impl RobotDriver {
    pub fn new(machine_name: impl Into<String>, store_path: impl Into<PathBuf>) -> Self {
        Self {
            config: MachineConfig {
                name: machine_name.into(),
                store_path: store_path.into(),
                ..MachineConfig::default()
            },
            base_url: None,
        }
    }

    /// Driver configured from env vars, skipping the options path:
    ///
    /// - `HETZNER_ROBOT_LOGIN` (required)
    /// - `HETZNER_ROBOT_PASSWORD` (required)
    /// - `HETZNER_ROBOT_IP` (required)
    pub fn from_env(
        machine_name: impl Into<String>,
        store_path: impl Into<PathBuf>,
    ) -> Result<Self> {
        dotenvy::dotenv().ok();

        let mut driver = Self::new(machine_name, store_path);
        driver.config.login = env_var("HETZNER_ROBOT_LOGIN")?;
        driver.config.password = env_var("HETZNER_ROBOT_PASSWORD")?;
        driver.config.ip_address = env_var("HETZNER_ROBOT_IP")?;
        Ok(driver)
    }

    /// Point the driver at a non-production Robot endpoint. Used by tests.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    pub fn config(&self) -> &MachineConfig {
        &self.config
    }

    /// Where this machine's private key lands; the public half sits beside
    /// it with a `.pub` suffix.
    pub fn key_path(&self) -> PathBuf {
        self.config
            .store_path
            .join("machines")
            .join(&self.config.name)
            .join("id_ed25519")
    }

    fn client(&self) -> RobotClient {
        match &self.base_url {
            Some(url) => RobotClient::with_base_url(&self.config.login, &self.config.password, url),
            None => RobotClient::new(&self.config.login, &self.config.password),
        }
    }

    /// Generate a key pair on disk and register its public half, returning
    /// the fingerprint the install request needs.
    async fn register_fresh_key(&self, client: &RobotClient) -> Result<String> {
        let key_path = self.key_path();
        debug!(machine = %self.config.name, path = %key_path.display(), "generating ssh key pair");
        keys::generate_keypair(&key_path).map_err(Error::KeyGeneration)?;

        let public_key =
            std::fs::read_to_string(keys::public_key_path(&key_path)).map_err(Error::KeyRead)?;

        let key = client
            .upload_key(&self.config.name, &public_key)
            .await
            .map_err(Error::KeyUpload)?;

        info!(machine = %self.config.name, fingerprint = %key.fingerprint, "robot: public key registered");
        Ok(key.fingerprint)
    }
}

fn env_var(name: &str) -> Result<String> {
    std::env::var(name)
        .ok()
        .filter(|v| !v.is_empty())
        .ok_or_else(|| Error::MissingEnv(name.into()))
}

#[async_trait]
impl Driver for RobotDriver {
    fn name(&self) -> &'static str {
        "hetzner"
    }

    fn configure(&mut self, options: &Options) -> Result<()> {
        self.config.ip_address = options.string("ip-address").to_string();
        self.config.login = options.string("login").to_string();
        self.config.password = options.string("password").to_string();

        if self.config.ip_address.is_empty() {
            return Err(Error::MissingOption("ip-address"));
        }
        if self.config.login.is_empty() {
            return Err(Error::MissingOption("login"));
        }
        if self.config.password.is_empty() {
            return Err(Error::MissingOption("password"));
        }

        Ok(())
    }

    async fn pre_create_check(&self) -> Result<()> {
        Ok(())
    }

    async fn create(&self) -> Result<()> {
        let client = self.client();
        let ip = &self.config.ip_address;

        let fingerprint = self.register_fresh_key(&client).await?;

        match client
            .install_linux(ip, &InstallLinux::ubuntu(fingerprint.as_str()))
            .await
        {
            Ok(()) => {
                info!(server_ip = %ip, dist = InstallLinux::DIST, "robot: linux install staged")
            }
            // A failed install request does not short-circuit: the reset
            // below still runs, and its result is what create returns.
            Err(e) => {
                warn!(server_ip = %ip, error = %Error::InstallRequest(e), "robot: install request failed")
            }
        }

        client.reset(ip).await.map_err(Error::ResetRequest)?;
        info!(server_ip = %ip, "robot: hardware reset issued");

        // The webservice only acknowledged the requests; nothing here
        // confirms the install or the reboot actually completed.
        Ok(())
    }

    fn ip(&self) -> Result<String> {
        if self.config.ip_address.is_empty() {
            return Err(Error::MissingIpAddress);
        }
        Ok(self.config.ip_address.clone())
    }

    fn ssh_hostname(&self) -> Result<String> {
        self.ip()
    }

    fn url(&self) -> Result<String> {
        // Unlike ip(), an unset IP is not an error here: hosts poll this
        // before the machine is configured and expect an empty string.
        if self.config.ip_address.is_empty() {
            return Ok(String::new());
        }
        Ok(format!("tcp://{}:{DAEMON_PORT}", self.config.ip_address))
    }

    fn state(&self) -> MachineState {
        MachineState::Running
    }

    async fn start(&self) -> Result<()> {
        Err(Error::NotImplemented("start"))
    }

    async fn stop(&self) -> Result<()> {
        Err(Error::NotImplemented("stop"))
    }

    async fn restart(&self) -> Result<()> {
        Err(Error::NotImplemented("restart"))
    }

    async fn kill(&self) -> Result<()> {
        Err(Error::NotImplemented("kill"))
    }

    async fn remove(&self) -> Result<()> {
        Err(Error::NotImplemented("remove"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    fn full_options() -> Options {
        Options::new()
            .set("ip-address", "1.2.3.4")
            .set("login", "robot-user")
            .set("password", "hunter2")
    }

    fn configured() -> RobotDriver {
        let mut driver = RobotDriver::new("box-1", "/tmp/store");
        driver.configure(&full_options()).unwrap();
        driver
    }

    #[test]
    fn configure_accepts_complete_options() {
        let driver = configured();
        assert_eq!(driver.config().ip_address, "1.2.3.4");
        assert_eq!(driver.config().login, "robot-user");
        assert_eq!(driver.config().password, "hunter2");
    }

    #[test]
    fn configure_names_each_missing_option() {
        for missing in ["ip-address", "login", "password"] {
            let mut options = full_options();
            options = options.set(missing, "");

            let mut driver = RobotDriver::new("box-1", "/tmp/store");
            let err = driver.configure(&options).unwrap_err();
            assert!(
                matches!(err, Error::MissingOption(name) if name == missing),
                "expected missing {missing}, got {err}"
            );
        }
    }

    #[test]
    fn ip_requires_configuration() {
        let driver = RobotDriver::new("box-1", "/tmp/store");
        assert!(matches!(driver.ip(), Err(Error::MissingIpAddress)));

        assert_eq!(configured().ip().unwrap(), "1.2.3.4");
    }

    #[test]
    fn ssh_hostname_matches_ip() {
        let driver = configured();
        assert_eq!(driver.ssh_hostname().unwrap(), driver.ip().unwrap());
    }

    #[test]
    fn url_is_empty_not_an_error_without_ip() {
        let driver = RobotDriver::new("box-1", "/tmp/store");
        assert_eq!(driver.url().unwrap(), "");

        assert_eq!(configured().url().unwrap(), "tcp://1.2.3.4:2376");
    }

    #[test]
    fn state_is_always_running() {
        assert_eq!(RobotDriver::new("box-1", "/tmp/store").state(), MachineState::Running);
        assert_eq!(configured().state(), MachineState::Running);
    }

    #[tokio::test]
    async fn lifecycle_verbs_are_not_implemented() {
        let driver = configured();
        for (verb, result) in [
            ("start", driver.start().await),
            ("stop", driver.stop().await),
            ("restart", driver.restart().await),
            ("kill", driver.kill().await),
            ("remove", driver.remove().await),
        ] {
            assert!(
                matches!(result, Err(Error::NotImplemented(v)) if v == verb),
                "{verb} should be unimplemented"
            );
        }
    }

    #[tokio::test]
    async fn pre_create_check_passes_unconfigured() {
        let driver = RobotDriver::new("box-1", "/tmp/store");
        driver.pre_create_check().await.unwrap();
    }

    #[test]
    fn key_path_is_scoped_to_the_machine() {
        let driver = RobotDriver::new("box-1", "/var/lib/machine");
        assert_eq!(
            driver.key_path(),
            Path::new("/var/lib/machine/machines/box-1/id_ed25519")
        );
    }
}
