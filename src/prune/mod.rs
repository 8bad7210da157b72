mod deletion_set;
mod expunger;
mod fetcher;
mod folder_session;
mod matcher;
mod report;
mod stage;

use std::{panic, sync::Arc};

use derive_getters::Getters;
use log::{info, warn};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

pub use expunger::Applied;

use deletion_set::{DeletionSet, RangeEncoding};
use expunger::Expunger;
use fetcher::Fetcher;
use folder_session::FolderSession;
use matcher::{Accumulators, AddressFilter};
use report::ReportSnapshot;
use stage::{Progress, Stage};

use crate::{
    error::Error,
    store::{MailStore, MailboxHandle},
};

/// How much of a folder may be in memory at once.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Limits {
    /// Envelopes fetched but not yet picked up by a match task.
    pub fetch_buffer: usize,
    /// Match tasks running at the same time.
    pub max_in_flight: usize,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            fetch_buffer: 64,
            max_in_flight: 32,
        }
    }
}

#[derive(Debug, Getters)]
pub struct Outcome {
    handle: MailboxHandle,
    deletions: RangeEncoding,
    report: Option<ReportSnapshot>,
    #[getter(skip)]
    applied: Applied,
    #[getter(skip)]
    stage: Stage,
}

impl Outcome {
    pub fn applied(&self) -> Applied {
        self.applied
    }

    /// The stage the folder ended in, `Done` or `DryRunDone`.
    pub fn stage(&self) -> Stage {
        self.stage
    }
}

/// Cleans folders on one mail store connection, one folder at a time.
pub struct Pruner<S: MailStore> {
    store: S,
    limits: Limits,
    cancel: CancellationToken,
}

impl<S: MailStore> Pruner<S> {
    pub fn new(store: S, limits: Limits, cancel: CancellationToken) -> Self {
        Self {
            store,
            limits,
            cancel,
        }
    }

    #[cfg(test)]
    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn into_store(self) -> S {
        self.store
    }

    /// Deletes every message in `folder`. Without `permanent` nothing is changed on the server.
    pub async fn delete_all_messages_in_folder(
        &mut self,
        permanent: bool,
        folder: &str,
    ) -> Result<Outcome, Error> {
        let mut progress = Progress::new(folder);
        let handle = FolderSession::open(&mut self.store, folder).await?;
        progress.advance(Stage::Selected);

        let deletions = DeletionSet::default();
        deletions.add_full_range(1, handle.exists());
        progress.advance(Stage::DeletionReady);

        self.apply(handle, &deletions, None, permanent, progress)
            .await
    }

    /// Deletes every message in `folder` sent from one of `addresses`. The matches are logged
    /// and returned in the outcome, in safe mode as well.
    pub async fn delete_messages_from_addresses<A: Into<String>>(
        &mut self,
        permanent: bool,
        folder: &str,
        addresses: impl IntoIterator<Item = A>,
    ) -> Result<Outcome, Error> {
        let filter: AddressFilter = addresses.into_iter().collect();
        let mut progress = Progress::new(folder);
        let handle = FolderSession::open(&mut self.store, folder).await?;
        progress.advance(Stage::Selected);

        let accumulators = Accumulators::default();
        if filter.is_empty() {
            warn!("no addresses given for {folder}, nothing can match");
        } else {
            self.match_folder(&handle, filter, &accumulators, &mut progress)
                .await?;
        }
        let report = accumulators.report.snapshot();
        report.log();
        progress.advance(Stage::DeletionReady);

        self.apply(
            handle,
            &accumulators.deletions,
            Some(report),
            permanent,
            progress,
        )
        .await
    }

    /// Runs fetch and match to completion. Nothing touches the folder before both finished, so
    /// all sequence numbers refer to the same snapshot.
    async fn match_folder(
        &mut self,
        handle: &MailboxHandle,
        filter: AddressFilter,
        accumulators: &Accumulators,
        progress: &mut Progress,
    ) -> Result<(), Error> {
        let (tx, rx) = mpsc::channel(self.limits.fetch_buffer.max(1));
        let matcher = tokio::spawn(matcher::fan_out(
            rx,
            Arc::new(filter),
            accumulators.clone(),
            self.limits.max_in_flight,
            self.cancel.clone(),
        ));

        progress.advance(Stage::Fetching);
        let fetched = Fetcher::new(handle)
            .pump(&mut self.store, tx, &self.cancel)
            .await;
        progress.advance(Stage::Matching);
        let matched = match matcher.await {
            Ok(matched) => matched,
            Err(error) if error.is_panic() => panic::resume_unwind(error.into_panic()),
            Err(_) => Err(Error::Cancelled),
        };

        let fetched = fetched?;
        let matched = matched?;
        if accumulators.deletions.is_empty() {
            info!("None of {fetched} messages in {} match", handle.name());
        } else {
            info!(
                "{} of {fetched} messages in {} match",
                accumulators.deletions.len(),
                handle.name()
            );
        }
        debug_assert_eq!(fetched, matched, "every fetched envelope should be evaluated");

        Ok(())
    }

    async fn apply(
        &mut self,
        handle: MailboxHandle,
        deletions: &DeletionSet,
        report: Option<ReportSnapshot>,
        permanent: bool,
        mut progress: Progress,
    ) -> Result<Outcome, Error> {
        if self.cancel.is_cancelled() {
            return Err(Error::Cancelled);
        }
        let deletions = deletions.to_range_encoding();
        let applied =
            Expunger::apply(&mut self.store, &handle, &deletions, permanent, &mut progress).await?;
        debug_assert!(progress.stage().is_terminal());

        Ok(Outcome {
            handle,
            deletions,
            report,
            applied,
            stage: progress.stage(),
        })
    }
}
