use std::{collections::HashSet, panic, sync::Arc};

use log::{debug, trace};
use tokio::{
    sync::{Semaphore, mpsc},
    task::{JoinError, JoinSet},
};
use tokio_util::sync::CancellationToken;

use crate::{
    error::Error,
    prune::{
        deletion_set::DeletionSet,
        report::{Match, MatchReport},
    },
    store::MessageEnvelope,
};

/// Sender addresses whose messages should go. Compared verbatim, so `A@x.com` and `a@x.com` are
/// different addresses.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AddressFilter {
    addresses: HashSet<String>,
}

impl AddressFilter {
    pub fn contains(&self, address: &str) -> bool {
        self.addresses.contains(address)
    }

    pub fn is_empty(&self) -> bool {
        self.addresses.is_empty()
    }
}

impl<S: Into<String>> FromIterator<S> for AddressFilter {
    fn from_iter<T: IntoIterator<Item = S>>(iter: T) -> Self {
        Self {
            addresses: iter.into_iter().map(Into::into).collect(),
        }
    }
}

/// The first sender of `envelope` that is on the filter, if any.
pub fn evaluate(envelope: &MessageEnvelope, filter: &AddressFilter) -> Option<Match> {
    let address = envelope
        .from()
        .iter()
        .find(|address| filter.contains(address))?;

    Some(Match {
        address: address.clone(),
        seq: envelope.seq(),
        subject: envelope.subject().clone(),
    })
}

/// Everything a match task writes to.
#[derive(Debug, Clone, Default)]
pub struct Accumulators {
    pub deletions: Arc<DeletionSet>,
    pub report: Arc<MatchReport>,
}

/// Evaluates every envelope arriving on `envelopes` in its own task.
///
/// At most `max_in_flight` evaluations run at once; while all permits are taken, no further
/// envelope is taken off the channel, which in turn holds back the fetch. Returns the number of
/// evaluated envelopes after the channel closed and every task finished.
pub async fn fan_out(
    mut envelopes: mpsc::Receiver<MessageEnvelope>,
    filter: Arc<AddressFilter>,
    accumulators: Accumulators,
    max_in_flight: usize,
    cancel: CancellationToken,
) -> Result<usize, Error> {
    let permits = Arc::new(Semaphore::new(max_in_flight.max(1)));
    let mut tasks = JoinSet::new();
    let mut evaluated = 0usize;

    loop {
        while let Some(finished) = tasks.try_join_next() {
            propagate_panic(finished);
        }
        let permit = tokio::select! {
            biased;
            () = cancel.cancelled() => return Err(Error::Cancelled),
            permit = Arc::clone(&permits).acquire_owned() => permit,
        };
        // the semaphore is never closed
        let Ok(permit) = permit else {
            return Err(Error::Cancelled);
        };

        let envelope = tokio::select! {
            biased;
            () = cancel.cancelled() => return Err(Error::Cancelled),
            envelope = envelopes.recv() => envelope,
        };
        let Some(envelope) = envelope else {
            break;
        };

        evaluated += 1;
        let filter = Arc::clone(&filter);
        let Accumulators { deletions, report } = accumulators.clone();
        tasks.spawn(async move {
            let _permit = permit;
            if let Some(matched) = evaluate(&envelope, &filter) {
                trace!("message {} from {} matches", matched.seq, matched.address);
                deletions.accumulate(matched.seq);
                report.record(matched);
            }
        });
    }

    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => return Err(Error::Cancelled),
            finished = tasks.join_next() => match finished {
                Some(finished) => propagate_panic(finished),
                None => break,
            },
        }
    }
    debug!("evaluated {evaluated} envelopes");

    Ok(evaluated)
}

fn propagate_panic(finished: Result<(), JoinError>) {
    if let Err(error) = finished
        && error.is_panic()
    {
        panic::resume_unwind(error.into_panic());
    }
}
