use std::fmt::{Display, Formatter};

use log::debug;

/// Where a single prune operation on one folder stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Idle,
    Selected,
    Fetching,
    Matching,
    DeletionReady,
    DryRunDone,
    Flagging,
    Flagged,
    Expunging,
    Done,
}

impl Stage {
    fn leads_to(self, next: Self) -> bool {
        use Stage::{
            DeletionReady, Done, DryRunDone, Expunging, Fetching, Flagged, Flagging, Idle, Matching,
            Selected,
        };

        matches!(
            (self, next),
            (Idle, Selected)
                | (Selected, Fetching | DeletionReady)
                | (Fetching, Matching)
                | (Matching, DeletionReady)
                | (DeletionReady, DryRunDone | Flagging | Done)
                | (Flagging, Flagged)
                | (Flagged, Expunging)
                | (Expunging, Done)
        )
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, Self::DryRunDone | Self::Done)
    }
}

impl Display for Stage {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::Selected => "selected",
            Self::Fetching => "fetching",
            Self::Matching => "matching",
            Self::DeletionReady => "deletion ready",
            Self::DryRunDone => "dry run done",
            Self::Flagging => "flagging",
            Self::Flagged => "flagged",
            Self::Expunging => "expunging",
            Self::Done => "done",
        };
        write!(f, "{name}")
    }
}

/// Tracks and logs the stage of the operation on `folder`.
#[derive(Debug)]
pub struct Progress {
    folder: String,
    stage: Stage,
}

impl Progress {
    pub fn new(folder: &str) -> Self {
        Self {
            folder: folder.to_owned(),
            stage: Stage::Idle,
        }
    }

    pub fn advance(&mut self, next: Stage) {
        debug_assert!(
            self.stage.leads_to(next),
            "{} cannot follow {} for {}",
            next,
            self.stage,
            self.folder
        );
        debug!("{}: {} -> {}", self.folder, self.stage, next);
        self.stage = next;
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }
}

#[cfg(test)]
mod tests {
    use rstest::*;

    use super::*;

    #[rstest]
    #[case(&[Stage::Selected, Stage::Fetching, Stage::Matching, Stage::DeletionReady, Stage::DryRunDone])]
    #[case(&[Stage::Selected, Stage::DeletionReady, Stage::Flagging, Stage::Flagged, Stage::Expunging, Stage::Done])]
    #[case(&[Stage::Selected, Stage::DeletionReady, Stage::Done])]
    fn test_progress_follows_valid_paths(#[case] path: &[Stage]) {
        let mut progress = Progress::new("INBOX");
        for stage in path {
            progress.advance(*stage);
        }

        assert!(progress.stage().is_terminal());
    }

    #[rstest]
    #[case(Stage::Idle, Stage::Flagging)]
    #[case(Stage::Matching, Stage::Expunging)]
    #[case(Stage::DeletionReady, Stage::Expunging)]
    #[case(Stage::Done, Stage::Selected)]
    fn test_stage_rejects_skipping_ahead(#[case] from: Stage, #[case] to: Stage) {
        assert!(!from.leads_to(to));
    }
}
