use std::pin::pin;

use futures::{Stream, StreamExt as _, future::Either, stream};
use log::{debug, trace};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::{
    error::Error,
    sequence::SequenceSet,
    store::{MailStore, MailboxHandle, MessageEnvelope},
};

/// Reads the envelope of every message in a selected folder.
pub struct Fetcher {
    range: Option<SequenceSet>,
}

impl Fetcher {
    pub fn new(handle: &MailboxHandle) -> Self {
        Self {
            range: handle.full_range(),
        }
    }

    /// Single pass over `1:exists`. An empty folder yields nothing without talking to the server.
    pub fn envelopes<'a, S: MailStore>(
        &'a self,
        store: &'a mut S,
    ) -> impl Stream<Item = Result<MessageEnvelope, Error>> {
        match &self.range {
            None => Either::Left(stream::empty()),
            Some(range) => Either::Right(
                store
                    .fetch_envelopes(range)
                    .map(|envelope| envelope.map_err(|e| Error::at_stage(e, Error::Fetch))),
            ),
        }
    }

    /// Drives the fetch and forwards every envelope into `tx`.
    ///
    /// `tx` should be bounded: a full channel stops reading from the connection until the
    /// matchers caught up. Drops `tx` when done, which tells the receiving side the folder is
    /// exhausted.
    pub async fn pump<S: MailStore>(
        &self,
        store: &mut S,
        tx: mpsc::Sender<MessageEnvelope>,
        cancel: &CancellationToken,
    ) -> Result<usize, Error> {
        let mut envelopes = pin!(self.envelopes(store));
        let mut fetched = 0usize;

        loop {
            let next = tokio::select! {
                biased;
                () = cancel.cancelled() => return Err(Error::Cancelled),
                next = envelopes.next() => next,
            };
            let Some(envelope) = next else {
                break;
            };
            let envelope = envelope?;
            trace!("fetched envelope of message {}", envelope.seq());
            tokio::select! {
                biased;
                () = cancel.cancelled() => return Err(Error::Cancelled),
                sent = tx.send(envelope) => {
                    // only an aborted matcher hangs up early
                    if sent.is_err() {
                        return Err(Error::Cancelled);
                    }
                }
            }
            fetched += 1;
        }
        debug!("fetched {fetched} envelopes");

        Ok(fetched)
    }
}
