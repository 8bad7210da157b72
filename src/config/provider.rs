use derive_getters::Getters;
use serde::Deserialize;

/// Where a mail provider keeps its well-known folders.
#[derive(Debug, Clone, Deserialize, Getters, PartialEq, Eq)]
pub struct WellKnownFolders {
    inbox: String,
    spam: String,
    trash: String,
}

#[derive(Debug, Clone, Deserialize, Getters, PartialEq, Eq)]
pub struct ProviderConfig {
    host: String,
    #[serde(default = "imaps_port")]
    #[getter(skip)]
    port: u16,
    folders: WellKnownFolders,
}

fn imaps_port() -> u16 {
    993
}

impl ProviderConfig {
    pub const GMX: &'static str = "gmx";

    pub fn gmx() -> Self {
        Self {
            host: "imap.gmx.net".to_owned(),
            port: imaps_port(),
            folders: WellKnownFolders {
                inbox: "INBOX".to_owned(),
                spam: "Spamverdacht".to_owned(),
                trash: "Trash".to_owned(),
            },
        }
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    /// Maps the aliases `inbox`, `spam` and `trash` to this provider's folder names. Any other
    /// name is returned as is.
    pub fn resolve_folder<'a>(&'a self, folder: &'a str) -> &'a str {
        match folder {
            "inbox" => &self.folders.inbox,
            "spam" => &self.folders.spam,
            "trash" => &self.folders.trash,
            verbatim => verbatim,
        }
    }
}
