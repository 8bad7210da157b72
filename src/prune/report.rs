use std::{
    collections::BTreeMap,
    sync::{Mutex, PoisonError},
};

use log::info;

use crate::sequence::SeqNum;

/// A message whose sender is on the filter list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Match {
    pub address: String,
    pub seq: SeqNum,
    pub subject: String,
}

/// Which subjects every filtered address would lose, for the log and for dry runs.
///
/// Subjects are kept per sequence number so the content does not depend on the order in which
/// match tasks finish.
#[derive(Debug, Default)]
pub struct MatchReport {
    matches: Mutex<BTreeMap<String, BTreeMap<SeqNum, String>>>,
}

impl MatchReport {
    pub fn record(&self, matched: Match) {
        let Match {
            address,
            seq,
            subject,
        } = matched;
        self.matches
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(address)
            .or_default()
            .insert(seq, subject);
    }

    pub fn snapshot(&self) -> ReportSnapshot {
        let matches = self.matches.lock().unwrap_or_else(PoisonError::into_inner);
        ReportSnapshot(
            matches
                .iter()
                .map(|(address, subjects)| (address.clone(), subjects.values().cloned().collect()))
                .collect(),
        )
    }
}

/// Address to subjects, subjects in folder order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReportSnapshot(BTreeMap<String, Vec<String>>);

impl ReportSnapshot {
    #[cfg(test)]
    pub fn subjects(&self, address: &str) -> Option<&[String]> {
        self.0.get(address).map(Vec::as_slice)
    }

    pub fn addresses(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn log(&self) {
        if self.is_empty() {
            info!("No messages to delete");
        }
        for (address, subjects) in &self.0 {
            info!("Messages to delete from {address}:");
            for subject in subjects {
                info!("\t{subject}");
            }
        }
    }
}
