use log::info;

use crate::{
    error::Error,
    store::{MailStore, MailboxHandle},
};

pub struct FolderSession;

impl FolderSession {
    /// Selects `folder`, replacing whatever folder was active on the connection before.
    pub async fn open<S: MailStore>(store: &mut S, folder: &str) -> Result<MailboxHandle, Error> {
        let handle = store.select(folder).await.map_err(|e| {
            Error::at_stage(e, |reason| Error::FolderSelect {
                folder: folder.to_owned(),
                reason,
            })
        })?;
        info!("Selected folder: {} ({} messages)", handle.name(), handle.exists());

        Ok(handle)
    }
}
