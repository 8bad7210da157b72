use log::{debug, error, info};

use super::RunOptions;
use crate::{
    config::Rule,
    error::Error,
    prune::{Applied, Outcome, Pruner},
    store::MailStore,
};

/// Why [`apply_rules`] did not get to every rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stop {
    /// A rule failed and the run halts on errors.
    Halted,
    Cancelled,
    /// A rule failed in a way that leaves the connection out of step with the server.
    ConnectionLost,
}

#[derive(Debug, Default, PartialEq, Eq)]
pub struct RuleTally {
    pub succeeded: usize,
    pub failed: usize,
    pub stopped: Option<Stop>,
}

/// Applies `rules` in order on one connection.
pub async fn apply_rules<S: MailStore>(
    pruner: &mut Pruner<S>,
    rules: &[Rule],
    options: RunOptions,
) -> RuleTally {
    let mut tally = RuleTally::default();

    for rule in rules {
        let result = match rule {
            Rule::DeleteAll { folder } => {
                pruner
                    .delete_all_messages_in_folder(options.permanent, folder)
                    .await
            }
            Rule::DeleteFrom { folder, addresses } => {
                pruner
                    .delete_messages_from_addresses(options.permanent, folder, addresses)
                    .await
            }
        };

        match result {
            Ok(outcome) => {
                log_outcome(&outcome);
                tally.succeeded += 1;
            }
            Err(error) => {
                error!("Cleaning {} failed: {error}", rule.folder());
                tally.failed += 1;
                if matches!(error, Error::Cancelled) {
                    tally.stopped = Some(Stop::Cancelled);
                } else if options.halt_on_error {
                    tally.stopped = Some(Stop::Halted);
                } else if !error.leaves_connection_usable() {
                    tally.stopped = Some(Stop::ConnectionLost);
                }
                if tally.stopped.is_some() {
                    break;
                }
            }
        }
    }

    tally
}

fn log_outcome(outcome: &Outcome) {
    let folder = outcome.handle().name();
    match outcome.applied() {
        Applied::Nothing => info!("Nothing to delete in {folder}"),
        Applied::DryRun { would_delete } => {
            if let Some(report) = outcome.report() {
                let senders: Vec<&str> = report.addresses().collect();
                info!("{folder}: matching senders {}", senders.join(", "));
            }
            info!(
                "{folder}: {would_delete} messages would be deleted ({})",
                outcome.deletions()
            );
        }
        Applied::Expunged { flagged, purged } => {
            info!("{folder}: flagged {flagged} and purged {purged} messages");
        }
    }
    debug!("{folder} finished in stage {}", outcome.stage());
}
