use futures::{Stream, StreamExt as _};
use imap_proto::{Address, AttributeValue, MailboxDatum, Response, ResponseCode, Status};
use log::{debug, trace};

use super::command::{execute, quoted, rejected, untagged};
use crate::{
    error::{ConnectionError, StoreError},
    imap::connection::SendCommand,
    sequence::{SeqNum, SequenceSet},
    store::{MailStore, MailboxHandle, MailboxHandleBuilder, MessageEnvelope},
};

/// An authenticated connection.
#[derive(Debug)]
pub struct Session<C: SendCommand> {
    connection: C,
    selected: Option<MailboxHandle>,
}

impl<C: SendCommand> Session<C> {
    pub fn new(connection: C) -> Self {
        Self {
            connection,
            selected: None,
        }
    }

    #[cfg(test)]
    pub fn selected(&self) -> Option<&MailboxHandle> {
        self.selected.as_ref()
    }

    #[cfg(test)]
    pub fn connection(&self) -> &C {
        &self.connection
    }
}

impl<C: SendCommand> MailStore for Session<C> {
    async fn select(&mut self, folder: &str) -> Result<MailboxHandle, StoreError> {
        self.selected = None;
        let command = format!("SELECT {}", quoted(folder));
        debug!("{command}");
        let mut exists = None;
        let code = execute(&mut self.connection, command, |response| match response {
            Response::MailboxData(MailboxDatum::Exists(count)) => {
                exists = Some(count);
                Ok(())
            }
            other => untagged(other),
        })
        .await?;

        let exists = exists.ok_or_else(|| {
            StoreError::Malformed(format!("SELECT {folder} did not report EXISTS"))
        })?;
        let handle = MailboxHandleBuilder::default()
            .name(folder)
            .exists(exists)
            .readonly(matches!(code, Some(ResponseCode::ReadOnly)))
            .build()
            .map_err(|e| StoreError::Malformed(e.to_string()))?;
        trace!("selected = {handle:?}");
        self.selected = Some(handle.clone());

        Ok(handle)
    }

    fn fetch_envelopes(
        &mut self,
        set: &SequenceSet,
    ) -> impl Stream<Item = Result<MessageEnvelope, StoreError>> {
        let command = format!("FETCH {set} (ENVELOPE)");
        debug!("{command}");
        self.connection
            .send(command)
            .filter_map(|response| async move {
                match response {
                    Ok(Response::Fetch(seq, attributes)) => envelope(seq, &attributes).transpose(),
                    Ok(Response::Done {
                        status: Status::Ok, ..
                    }) => None,
                    Ok(Response::Done {
                        status,
                        information,
                        ..
                    }) => Some(Err(rejected(status, information))),
                    Ok(other) => untagged(other).err().map(Err),
                    Err(error) => Some(Err(error.into())),
                }
            })
    }

    async fn flag_deleted(&mut self, set: &SequenceSet) -> Result<(), StoreError> {
        let command = format!("STORE {set} +FLAGS.SILENT (\\Deleted)");
        debug!("{command}");
        execute(&mut self.connection, command, untagged).await?;
        Ok(())
    }

    async fn expunge(&mut self) -> Result<u32, StoreError> {
        debug!("EXPUNGE");
        let mut expunged = 0;
        execute(&mut self.connection, "EXPUNGE".to_owned(), |response| {
            match response {
                Response::Expunge(_) => {
                    expunged += 1;
                    Ok(())
                }
                other => untagged(other),
            }
        })
        .await?;
        if let Some(selected) = &self.selected {
            trace!("{expunged} messages expunged from {}", selected.name());
        }

        Ok(expunged)
    }

    async fn logout(mut self) -> Result<(), StoreError> {
        debug!("LOGOUT");
        execute(&mut self.connection, "LOGOUT".to_owned(), |response| {
            match response {
                Response::Data {
                    status: Status::Bye,
                    ..
                } => Ok(()),
                other => untagged(other),
            }
        })
        .await
        .map(|_| ())
        .or_else(|error| match error {
            // some servers hang up right after BYE
            StoreError::Connection(ConnectionError::Closed { .. }) => Ok(()),
            error => Err(error),
        })
    }
}

/// `None` for FETCH data without an envelope, which servers may send unsolicited at any time,
/// e.g. `* 2 FETCH (FLAGS (\Seen))` when another client changes flags.
fn envelope(
    seq: u32,
    attributes: &[AttributeValue<'_>],
) -> Result<Option<MessageEnvelope>, StoreError> {
    let Some(envelope) = attributes.iter().find_map(|attribute| match attribute {
        AttributeValue::Envelope(envelope) => Some(envelope),
        _ => None,
    }) else {
        trace!("skipping FETCH data without ENVELOPE for message {seq}");
        return Ok(None);
    };
    let seq = SeqNum::try_from(seq)
        .map_err(|e| StoreError::Malformed(format!("FETCH for message {seq}: {e}")))?;

    let from = envelope.from.iter().flatten().filter_map(address).collect();
    let subject = envelope
        .subject
        .as_deref()
        .map(decoded)
        .unwrap_or_default();

    Ok(Some(MessageEnvelope::new(seq, from, subject)))
}

/// Decodes RFC 2047 encoded words. Undecodable input is kept as it came.
fn decoded(raw: &[u8]) -> String {
    let mut header = b"Subject: ".to_vec();
    header.extend_from_slice(raw);
    match mailparse::parse_header(&header) {
        Ok((header, _)) => header.get_value(),
        Err(_) => String::from_utf8_lossy(raw).into_owned(),
    }
}

/// `mailbox@host`. Group markers carry no host and are rendered as the bare mailbox part.
fn address(address: &Address<'_>) -> Option<String> {
    let mailbox = String::from_utf8_lossy(address.mailbox.as_deref()?);
    Some(match address.host.as_deref() {
        Some(host) => format!("{mailbox}@{}", String::from_utf8_lossy(host)),
        None => mailbox.into_owned(),
    })
}
