#[cfg(test)]
pub mod recording_store;

use derive_builder::Builder;
use derive_getters::Getters;
use futures::Stream;

use crate::{
    error::StoreError,
    sequence::{SeqNum, SequenceSet},
};

/// The folder selected on a connection, as reported by SELECT.
///
/// Valid until the next SELECT or LOGOUT on the same connection. Sequence numbers only have a
/// meaning relative to the handle they were fetched under.
#[derive(Builder, Debug, Getters, Clone, PartialEq, Eq)]
pub struct MailboxHandle {
    #[builder(setter(into))]
    name: String,
    #[getter(skip)]
    exists: u32,
    #[builder(default)]
    #[getter(skip)]
    readonly: bool,
}

impl MailboxHandle {
    /// Number of messages in the folder when it was selected.
    pub fn exists(&self) -> u32 {
        self.exists
    }

    pub fn readonly(&self) -> bool {
        self.readonly
    }

    /// Every message of the folder, or `None` for an empty one.
    pub fn full_range(&self) -> Option<SequenceSet> {
        let last = SeqNum::try_from(self.exists).ok()?;
        Some(SequenceSet::range(SeqNum::FIRST, last))
    }
}

#[derive(Debug, Getters, Clone, PartialEq, Eq)]
pub struct MessageEnvelope {
    #[getter(skip)]
    seq: SeqNum,
    from: Vec<String>,
    subject: String,
}

impl MessageEnvelope {
    pub fn new(seq: SeqNum, from: Vec<String>, subject: impl Into<String>) -> Self {
        Self {
            seq,
            from,
            subject: subject.into(),
        }
    }

    pub fn seq(&self) -> SeqNum {
        self.seq
    }
}

/// The commands the pruning pipeline needs from a mail store connection.
///
/// Implementations sit on one connection and issue commands strictly one after another, which is
/// why every call takes `&mut self`.
pub trait MailStore {
    async fn select(&mut self, folder: &str) -> Result<MailboxHandle, StoreError>;

    /// Streams the envelopes of `set`. The stream ends after the command completed and yields
    /// an error in place of the tagged completion when the server refused the command.
    fn fetch_envelopes(
        &mut self,
        set: &SequenceSet,
    ) -> impl Stream<Item = Result<MessageEnvelope, StoreError>>;

    /// Adds `\Deleted` to every message of `set`.
    async fn flag_deleted(&mut self, set: &SequenceSet) -> Result<(), StoreError>;

    /// Removes every message flagged `\Deleted` and returns how many the server reported gone.
    async fn expunge(&mut self) -> Result<u32, StoreError>;

    async fn logout(self) -> Result<(), StoreError>
    where
        Self: Sized;
}
