mod account;
mod auth;
mod provider;

use std::{
    collections::{BTreeMap, HashMap},
    env,
    fs::read_to_string,
    path::{Path, PathBuf},
};

use derive_getters::Getters;
use serde::Deserialize;
use thiserror::Error;

pub use account::AccountConfig;
pub use account::Rule;
pub use provider::ProviderConfig;

use crate::prune::Limits;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("neither XDG_CONFIG_HOME nor HOME is set")]
    NoConfigHome,
    #[error("cannot read config file {path}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("config file {path} is invalid")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("account {account} uses unknown provider {provider}")]
    UnknownProvider { account: String, provider: String },
    #[error("no account named {0} configured")]
    UnknownAccount(String),
    #[error("password_cmd for {user} failed: {reason}")]
    PasswordCmd { user: String, reason: String },
}

/// Bounds of the fetch and match pipeline.
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct PipelineConfig {
    fetch_buffer: usize,
    max_in_flight: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        let limits = Limits::default();
        Self {
            fetch_buffer: limits.fetch_buffer,
            max_in_flight: limits.max_in_flight,
        }
    }
}

impl From<PipelineConfig> for Limits {
    fn from(pipeline: PipelineConfig) -> Self {
        Self {
            fetch_buffer: pipeline.fetch_buffer.max(1),
            max_in_flight: pipeline.max_in_flight.max(1),
        }
    }
}

#[derive(Debug, Deserialize, Getters)]
pub struct Config {
    #[serde(default)]
    #[getter(skip)]
    pipeline: PipelineConfig,
    #[serde(default)]
    providers: HashMap<String, ProviderConfig>,
    accounts: BTreeMap<String, AccountConfig>,
}

impl Config {
    pub fn load_from_file(file: Option<PathBuf>) -> Result<Self, ConfigError> {
        let config_file = match file {
            Some(file) => file,
            None => default_location()?,
        };
        let contents = read_to_string(&config_file).map_err(|source| ConfigError::Read {
            path: config_file.clone(),
            source,
        })?;
        Self::parse(&contents, &config_file)
    }

    fn parse(contents: &str, path: &Path) -> Result<Self, ConfigError> {
        let mut config: Self = toml::from_str(contents).map_err(|source| ConfigError::Parse {
            path: path.to_owned(),
            source,
        })?;
        config
            .providers
            .entry(ProviderConfig::GMX.to_owned())
            .or_insert_with(ProviderConfig::gmx);
        for (account, account_config) in &config.accounts {
            if !config.providers.contains_key(account_config.provider()) {
                return Err(ConfigError::UnknownProvider {
                    account: account.clone(),
                    provider: account_config.provider().clone(),
                });
            }
        }

        Ok(config)
    }

    pub fn limits(&self) -> Limits {
        self.pipeline.into()
    }

    /// The provider `account` connects to. Every account's provider is checked on load.
    pub fn provider_of(&self, account: &AccountConfig) -> Option<&ProviderConfig> {
        self.providers.get(account.provider())
    }

    /// All accounts, or only `name` if given.
    pub fn selected_accounts(
        &self,
        name: Option<&str>,
    ) -> Result<Vec<(&str, &AccountConfig)>, ConfigError> {
        match name {
            None => Ok(self
                .accounts
                .iter()
                .map(|(name, account)| (name.as_str(), account))
                .collect()),
            Some(name) => self
                .accounts
                .get_key_value(name)
                .map(|(name, account)| vec![(name.as_str(), account)])
                .ok_or_else(|| ConfigError::UnknownAccount(name.to_owned())),
        }
    }
}

fn default_location() -> Result<PathBuf, ConfigError> {
    let mut config_dir = if let Ok(config_home) = env::var("XDG_CONFIG_HOME") {
        PathBuf::from(config_home)
    } else {
        let home = env::var("HOME").map_err(|_| ConfigError::NoConfigHome)?;
        let mut config_home = PathBuf::from(home);
        config_home.push(".config");
        config_home
    };
    config_dir.push(env!("CARGO_PKG_NAME"));
    config_dir.push("config.toml");

    Ok(config_dir)
}
