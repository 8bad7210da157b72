use derive_getters::Getters;
use serde::Deserialize;

use super::{auth::AuthConfig, provider::ProviderConfig};

#[derive(Debug, Deserialize, Getters)]
pub struct AccountConfig {
    provider: String,
    auth: AuthConfig,
    #[serde(default)]
    rules: Vec<RuleConfig>,
}

/// One cleanup step as written in the configuration file.
#[derive(Debug, Clone, Deserialize, Getters, PartialEq, Eq)]
pub struct RuleConfig {
    folder: String,
    from: Option<Vec<String>>,
}

/// A cleanup step with its folder resolved against the account's provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rule {
    DeleteAll { folder: String },
    DeleteFrom { folder: String, addresses: Vec<String> },
}

impl Rule {
    pub fn folder(&self) -> &str {
        match self {
            Self::DeleteAll { folder } | Self::DeleteFrom { folder, .. } => folder,
        }
    }
}

impl RuleConfig {
    pub fn resolve(&self, provider: &ProviderConfig) -> Rule {
        let folder = provider.resolve_folder(&self.folder).to_owned();
        match &self.from {
            None => Rule::DeleteAll { folder },
            Some(addresses) => Rule::DeleteFrom {
                folder,
                addresses: addresses.clone(),
            },
        }
    }
}

impl AccountConfig {
    pub fn resolved_rules(&self, provider: &ProviderConfig) -> Vec<Rule> {
        self.rules.iter().map(|rule| rule.resolve(provider)).collect()
    }
}
