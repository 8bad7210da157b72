use std::collections::HashMap;

use futures::{Stream, stream};

use crate::{
    error::StoreError,
    sequence::{SeqNum, SequenceSet},
    store::{MailStore, MailboxHandle, MailboxHandleBuilder, MessageEnvelope},
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Select(String),
    Fetch(String),
    FlagDeleted(String),
    Expunge,
    Logout,
}

impl Call {
    pub fn is_mutating(&self) -> bool {
        matches!(self, Self::FlagDeleted(_) | Self::Expunge)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredMessage {
    pub from: Vec<String>,
    pub subject: String,
    pub deleted: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Failure {
    Select,
    Unauthenticated,
    /// Refuse FETCH after this many envelopes were sent.
    FetchAfter(usize),
    FlagDeleted,
    Expunge,
}

/// In-memory folder tree that records every command issued against it.
#[derive(Debug, Default)]
pub struct RecordingStore {
    folders: HashMap<String, Vec<StoredMessage>>,
    selected: Option<String>,
    failures: Vec<Failure>,
    calls: Vec<Call>,
}

impl RecordingStore {
    pub fn with_folder(mut self, name: &str, messages: &[(&[&str], &str)]) -> Self {
        let messages = messages
            .iter()
            .map(|(from, subject)| StoredMessage {
                from: from.iter().map(|address| (*address).to_owned()).collect(),
                subject: (*subject).to_owned(),
                deleted: false,
            })
            .collect();
        self.folders.insert(name.to_owned(), messages);
        self
    }

    /// The failure fires once, on the first matching command.
    pub fn failing(mut self, failure: Failure) -> Self {
        self.failures.push(failure);
        self
    }

    pub fn calls(&self) -> &[Call] {
        &self.calls
    }

    pub fn mutating_calls(&self) -> usize {
        self.calls.iter().filter(|call| call.is_mutating()).count()
    }

    pub fn messages(&self, folder: &str) -> &[StoredMessage] {
        self.folders.get(folder).map_or(&[], Vec::as_slice)
    }

    fn take_failure(&mut self, matches: impl Fn(&Failure) -> bool) -> Option<Failure> {
        let index = self.failures.iter().position(matches)?;
        Some(self.failures.remove(index))
    }

    fn selected_messages(&mut self) -> Result<&mut Vec<StoredMessage>, StoreError> {
        let selected = self
            .selected
            .as_ref()
            .ok_or_else(|| StoreError::Rejected("no folder selected".to_owned()))?;
        self.folders
            .get_mut(selected)
            .ok_or_else(|| StoreError::Rejected("selected folder vanished".to_owned()))
    }
}

impl MailStore for RecordingStore {
    async fn select(&mut self, folder: &str) -> Result<MailboxHandle, StoreError> {
        self.calls.push(Call::Select(folder.to_owned()));
        self.selected = None;
        match self.take_failure(|f| matches!(f, Failure::Select | Failure::Unauthenticated)) {
            Some(Failure::Unauthenticated) => {
                return Err(StoreError::Unauthenticated("log in first".to_owned()));
            }
            Some(_) => return Err(StoreError::Rejected("mailbox is locked".to_owned())),
            None => {}
        }
        let Some(messages) = self.folders.get(folder) else {
            return Err(StoreError::Rejected(format!("mailbox {folder} doesn't exist")));
        };
        let exists = u32::try_from(messages.len()).expect("test folders should be small");
        self.selected = Some(folder.to_owned());

        Ok(MailboxHandleBuilder::default()
            .name(folder)
            .exists(exists)
            .build()
            .expect("all handle fields should be set"))
    }

    fn fetch_envelopes(
        &mut self,
        set: &SequenceSet,
    ) -> impl Stream<Item = Result<MessageEnvelope, StoreError>> {
        self.calls.push(Call::Fetch(set.to_string()));
        let fail_after = match self.take_failure(|f| matches!(f, Failure::FetchAfter(_))) {
            Some(Failure::FetchAfter(count)) => Some(count),
            _ => None,
        };
        let mut items: Vec<Result<MessageEnvelope, StoreError>> = match self.selected_messages() {
            Ok(messages) => set
                .iter()
                .filter_map(|seq| {
                    let index = usize::try_from(u32::from(seq) - 1).ok()?;
                    messages.get(index).map(|message| {
                        Ok(MessageEnvelope::new(
                            seq,
                            message.from.clone(),
                            message.subject.clone(),
                        ))
                    })
                })
                .collect(),
            Err(error) => vec![Err(error)],
        };
        if let Some(count) = fail_after {
            items.truncate(count);
            items.push(Err(StoreError::Rejected("fetch aborted".to_owned())));
        }

        stream::iter(items)
    }

    async fn flag_deleted(&mut self, set: &SequenceSet) -> Result<(), StoreError> {
        self.calls.push(Call::FlagDeleted(set.to_string()));
        if self
            .take_failure(|f| matches!(f, Failure::FlagDeleted))
            .is_some()
        {
            return Err(StoreError::Rejected("permission denied".to_owned()));
        }
        let messages = self.selected_messages()?;
        for seq in set.iter() {
            let index = usize::try_from(u32::from(seq) - 1).expect("u32 should fit usize");
            if let Some(message) = messages.get_mut(index) {
                message.deleted = true;
            }
        }

        Ok(())
    }

    async fn expunge(&mut self) -> Result<u32, StoreError> {
        self.calls.push(Call::Expunge);
        if self.take_failure(|f| matches!(f, Failure::Expunge)).is_some() {
            return Err(StoreError::Rejected("internal server error".to_owned()));
        }
        let messages = self.selected_messages()?;
        let before = messages.len();
        messages.retain(|message| !message.deleted);

        Ok(u32::try_from(before - messages.len()).expect("test folders should be small"))
    }

    async fn logout(mut self) -> Result<(), StoreError> {
        self.calls.push(Call::Logout);
        Ok(())
    }
}

pub fn seq(num: u32) -> SeqNum {
    SeqNum::try_from(num).expect("test sequence numbers should be non-zero")
}
