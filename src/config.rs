use std::fs::File;
use std::io::Read;
use std::path::Path;
use std::time::Duration;

use crate::errors::*;

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
pub enum AuthType {
    Plain,
    SSL,
}

/// Where message UIDLs come from.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
pub enum UidMode {
    /// Derived from message headers by the session.
    Emulated,
    /// Taken from the server's `UIDL` command.
    Native,
}

impl Default for UidMode {
    fn default() -> UidMode {
        UidMode::Emulated
    }
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct AccountConfig {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    pub auth: AuthType,
    #[serde(default)]
    pub uid_mode: UidMode,
    /// Socket read and write timeout; none by default.
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

impl AccountConfig {
    pub fn from_toml(config: &str) -> Result<AccountConfig> {
        Ok(toml::from_str(config)?)
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<AccountConfig> {
        let mut config = String::new();
        File::open(path.as_ref())
            .chain_err(|| format!("unable to open the config file '{}'", path.as_ref().display()))?
            .read_to_string(&mut config)?;
        AccountConfig::from_toml(&config)
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }
}
