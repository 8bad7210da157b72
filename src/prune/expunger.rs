use log::{debug, info, warn};

use crate::{
    error::Error,
    prune::{
        deletion_set::RangeEncoding,
        stage::{Progress, Stage},
    },
    sequence::SequenceSet,
    store::{MailStore, MailboxHandle},
};

/// What [`Expunger::apply`] did to the folder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Applied {
    /// Nothing matched, no command was sent.
    Nothing,
    /// Safe mode: no command was sent even though messages matched.
    DryRun { would_delete: usize },
    Expunged { flagged: usize, purged: u32 },
}

pub struct Expunger;

impl Expunger {
    /// Flags every message of `deletions` and purges them, or in safe mode leaves the folder
    /// untouched.
    ///
    /// A failing STORE leaves the folder as it was. A failing EXPUNGE after a successful STORE
    /// leaves the messages in place but flagged `\Deleted`; calling [`Expunger::purge`] finishes
    /// the job.
    pub async fn apply<S: MailStore>(
        store: &mut S,
        handle: &MailboxHandle,
        deletions: &RangeEncoding,
        permanent: bool,
        progress: &mut Progress,
    ) -> Result<Applied, Error> {
        let RangeEncoding::Ranges(set) = deletions else {
            debug!("nothing to delete in {}", handle.name());
            progress.advance(if permanent {
                Stage::Done
            } else {
                Stage::DryRunDone
            });
            return Ok(Applied::Nothing);
        };
        debug_assert!(
            set.iter().all(|seq| u32::from(seq) <= handle.exists()),
            "deletion set should stay within the selected folder"
        );
        if !permanent {
            info!(
                "Safe mode: would delete {} messages in {}",
                set.len(),
                handle.name()
            );
            progress.advance(Stage::DryRunDone);
            return Ok(Applied::DryRun {
                would_delete: set.len(),
            });
        }

        if handle.readonly() {
            warn!("{} is read-only, the server will likely refuse deletion", handle.name());
        }
        progress.advance(Stage::Flagging);
        Self::flag(store, set).await?;
        progress.advance(Stage::Flagged);
        progress.advance(Stage::Expunging);
        let purged = Self::purge(store, set).await?;
        progress.advance(Stage::Done);
        info!(
            "Deleted {} messages permanently from {}",
            set.len(),
            handle.name()
        );

        Ok(Applied::Expunged {
            flagged: set.len(),
            purged,
        })
    }

    pub async fn flag<S: MailStore>(store: &mut S, set: &SequenceSet) -> Result<(), Error> {
        store.flag_deleted(set).await.map_err(|e| {
            Error::at_stage(e, |reason| Error::DeleteFlag {
                set: set.clone(),
                reason,
            })
        })
    }

    /// Removes everything flagged `\Deleted` in the selected folder. `flagged` only names the
    /// messages in the error.
    pub async fn purge<S: MailStore>(store: &mut S, flagged: &SequenceSet) -> Result<u32, Error> {
        store.expunge().await.map_err(|e| {
            warn!("messages {flagged} are flagged as deleted but were not expunged");
            Error::at_stage(e, |reason| Error::Expunge {
                set: flagged.clone(),
                reason,
            })
        })
    }
}

#[cfg(test)]
mod tests {
    use assertables::*;
    use rstest::*;

    use super::*;
    use crate::{
        prune::deletion_set::DeletionSet,
        store::recording_store::{Call, Failure, RecordingStore},
    };

    const FOLDER: &str = "INBOX";

    fn store() -> RecordingStore {
        RecordingStore::default().with_folder(
            FOLDER,
            &[
                (&["one@x.com"], "Subject1"),
                (&["a@x.com"], "Subject2"),
                (&["three@x.com"], "Subject3"),
            ],
        )
    }

    fn ready() -> Progress {
        let mut progress = Progress::new(FOLDER);
        progress.advance(Stage::Selected);
        progress.advance(Stage::DeletionReady);
        progress
    }

    fn deletions(nums: &[u32]) -> RangeEncoding {
        let set = DeletionSet::default();
        for num in nums {
            set.add_full_range(*num, *num);
        }
        set.to_range_encoding()
    }

    #[rstest]
    #[tokio::test]
    async fn test_empty_set_issues_no_command() {
        let mut store = store();
        let handle = assert_ok!(store.select(FOLDER).await);
        let mut progress = ready();

        let applied = assert_ok!(
            Expunger::apply(&mut store, &handle, &deletions(&[]), true, &mut progress).await
        );

        assert_eq!(Applied::Nothing, applied);
        assert_eq!(0, store.mutating_calls());
        assert_eq!(Stage::Done, progress.stage());
    }

    #[rstest]
    #[tokio::test]
    async fn test_safe_mode_issues_no_mutating_command() {
        let mut store = store();
        let handle = assert_ok!(store.select(FOLDER).await);
        let mut progress = ready();

        let applied = assert_ok!(
            Expunger::apply(&mut store, &handle, &deletions(&[1, 2]), false, &mut progress).await
        );

        assert_eq!(Applied::DryRun { would_delete: 2 }, applied);
        assert_eq!(Stage::DryRunDone, progress.stage());
        assert_eq!(0, store.mutating_calls());
        assert!(store.messages(FOLDER).iter().all(|message| !message.deleted));
    }

    #[rstest]
    #[tokio::test]
    async fn test_permanent_flags_then_purges() {
        let mut store = store();
        let handle = assert_ok!(store.select(FOLDER).await);
        let mut progress = ready();

        let applied = assert_ok!(
            Expunger::apply(&mut store, &handle, &deletions(&[2]), true, &mut progress).await
        );

        assert_eq!(
            Applied::Expunged {
                flagged: 1,
                purged: 1
            },
            applied
        );
        assert_eq!(
            &[Call::FlagDeleted("2".to_owned()), Call::Expunge],
            &store.calls()[1..]
        );
        assert_eq!(2, store.messages(FOLDER).len());
        assert_eq!(Stage::Done, progress.stage());
    }

    #[rstest]
    #[tokio::test]
    async fn test_failing_flag_skips_expunge_and_changes_nothing() {
        let mut store = store().failing(Failure::FlagDeleted);
        let handle = assert_ok!(store.select(FOLDER).await);
        let mut progress = ready();

        let error = assert_err!(
            Expunger::apply(&mut store, &handle, &deletions(&[1, 3]), true, &mut progress).await
        );

        assert_matches!(error, Error::DeleteFlag { set, .. } if set.to_string() == "1,3");
        assert!(!store.calls().contains(&Call::Expunge));
        assert_eq!(Stage::Flagging, progress.stage());
        assert_eq!(3, store.messages(FOLDER).len());
        assert!(store.messages(FOLDER).iter().all(|message| !message.deleted));
    }

    #[rstest]
    #[tokio::test]
    async fn test_failing_expunge_leaves_flagged_messages_and_purge_recovers() {
        let mut store = store().failing(Failure::Expunge);
        let handle = assert_ok!(store.select(FOLDER).await);
        let mut progress = ready();

        let error = assert_err!(
            Expunger::apply(&mut store, &handle, &deletions(&[1, 2]), true, &mut progress).await
        );

        let Error::Expunge { set, .. } = error else {
            panic!("failing expunge should surface as expunge error");
        };
        assert_eq!("1:2", set.to_string());
        let listing = store.messages(FOLDER);
        assert_eq!(3, listing.len());
        assert_eq!(
            vec![true, true, false],
            listing.iter().map(|message| message.deleted).collect::<Vec<_>>()
        );

        let purged = assert_ok!(Expunger::purge(&mut store, &set).await);

        assert_eq!(2, purged);
        assert_eq!(1, store.messages(FOLDER).len());
        assert_eq!("Subject3", store.messages(FOLDER)[0].subject);
    }
}
