//! Drift filter: old candidates minus young candidates, by identifier.
//!
//! A document seen on both sides of the cutoff changed between the two
//! searches and is left for a later cycle.

use crate::message::{CandidateSet, Message};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DriftOutcome {
    /// Messages safe to publish this cycle
    pub stable: Vec<Message>,
    /// Identifiers present in both sets
    pub drifted: Vec<String>,
}

/// Split `old` into stable messages and drifting identifiers
pub fn partition(old: CandidateSet, young: &CandidateSet) -> DriftOutcome {
    let mut outcome = DriftOutcome::default();
    for message in old {
        if young.contains(&message.uri) {
            outcome.drifted.push(message.uri);
        } else {
            outcome.stable.push(message);
        }
    }
    outcome
}

/// Every message of `old` whose identifier is absent from `young`
pub fn filter(old: CandidateSet, young: &CandidateSet) -> Vec<Message> {
    partition(old, young).stable
}
