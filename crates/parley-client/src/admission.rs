// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Per-recipient admission bookkeeping for one delivery.

use std::fmt;

/// Where a recipient stands in the admission phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdmissionState {
    /// Added to the conversation, not yet seen as a participant.
    Requested,
    /// The platform refused to add the recipient.
    Rejected,
    /// Seen as a participant; availability is being polled.
    Polling,
    /// Reached an available state.
    Online,
    /// Never reached an available state within the poll budget.
    Offline,
}

impl AdmissionState {
    fn is_resolved(self) -> bool {
        matches!(
            self,
            AdmissionState::Rejected | AdmissionState::Online | AdmissionState::Offline
        )
    }
}

/// One recipient and its admission state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Admission {
    pub recipient: String,
    pub state: AdmissionState,
}

impl Admission {
    pub fn authorized(&self) -> bool {
        self.state != AdmissionState::Rejected
    }

    pub fn availability_confirmed(&self) -> bool {
        self.state == AdmissionState::Online
    }
}

/// Admission records for the recipients of one delivery.
///
/// Duplicate recipients collapse to one record; recipients are compared by
/// [`contact_key`]. Every record is in exactly one bucket: pending,
/// unauthorized, online, or offline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdmissionLedger {
    entries: Vec<Admission>,
    buildable: bool,
}

impl AdmissionLedger {
    pub fn new<I, S>(recipients: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut entries: Vec<Admission> = Vec::new();
        for recipient in recipients {
            let recipient = recipient.into();
            let key = contact_key(&recipient);
            if entries.iter().any(|e| contact_key(&e.recipient) == key) {
                continue;
            }
            entries.push(Admission {
                recipient,
                state: AdmissionState::Requested,
            });
        }
        Self {
            entries,
            buildable: true,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[Admission] {
        &self.entries
    }

    pub fn recipients(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|e| e.recipient.as_str())
    }

    /// Whether `uri` names one of the recipients.
    pub fn matches(&self, uri: &str) -> bool {
        let key = contact_key(uri);
        self.entries.iter().any(|e| contact_key(&e.recipient) == key)
    }

    /// Whether every add request was accepted.
    pub fn is_buildable(&self) -> bool {
        self.buildable
    }

    /// Marks `recipient` unauthorized. The conversation becomes unbuildable.
    pub fn reject(&mut self, recipient: &str) {
        self.buildable = false;
        if let Some(entry) = self.entry_mut(recipient) {
            entry.state = AdmissionState::Rejected;
        }
    }

    /// Starts polling the recipient matching a newly added participant.
    ///
    /// Returns the recipient if it was awaiting admission. Unknown
    /// participants and repeated announcements return `None`.
    pub fn begin_polling(&mut self, participant_uri: &str) -> Option<String> {
        let entry = self.entry_mut(participant_uri)?;
        if entry.state != AdmissionState::Requested {
            return None;
        }
        entry.state = AdmissionState::Polling;
        Some(entry.recipient.clone())
    }

    /// Records the result of availability polling for `recipient`.
    pub fn resolve(&mut self, recipient: &str, online: bool) {
        if let Some(entry) = self.entry_mut(recipient) {
            if entry.state == AdmissionState::Polling {
                entry.state = if online {
                    AdmissionState::Online
                } else {
                    AdmissionState::Offline
                };
            }
        }
    }

    /// Admission is complete once the conversation is unbuildable or every
    /// recipient is resolved.
    pub fn is_complete(&self) -> bool {
        !self.buildable || self.entries.iter().all(|e| e.state.is_resolved())
    }

    pub fn pending(&self) -> Vec<String> {
        self.bucket(|s| matches!(s, AdmissionState::Requested | AdmissionState::Polling))
    }

    pub fn unauthorized(&self) -> Vec<String> {
        self.bucket(|s| s == AdmissionState::Rejected)
    }

    pub fn online(&self) -> Vec<String> {
        self.bucket(|s| s == AdmissionState::Online)
    }

    pub fn offline(&self) -> Vec<String> {
        self.bucket(|s| s == AdmissionState::Offline)
    }

    /// Every recipient was admitted and none came online.
    pub fn all_offline(&self) -> bool {
        !self.entries.is_empty()
            && self
                .entries
                .iter()
                .all(|e| e.state == AdmissionState::Offline)
    }

    fn bucket(&self, pick: impl Fn(AdmissionState) -> bool) -> Vec<String> {
        self.entries
            .iter()
            .filter(|e| pick(e.state))
            .map(|e| e.recipient.clone())
            .collect()
    }

    fn entry_mut(&mut self, uri: &str) -> Option<&mut Admission> {
        let key = contact_key(uri);
        self.entries
            .iter_mut()
            .find(|e| contact_key(&e.recipient) == key)
    }
}

impl fmt::Display for AdmissionLedger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} recipients: {} online, {} offline, {} unauthorized, {} pending",
            self.len(),
            self.online().len(),
            self.offline().len(),
            self.unauthorized().len(),
            self.pending().len()
        )
    }
}

/// Comparison key for a contact: scheme stripped, ASCII-lowercased.
///
/// `sip:Alice@corp` and `alice@corp` share a key.
pub fn contact_key(uri: &str) -> String {
    strip_scheme(uri).to_ascii_lowercase()
}

/// Prefixes `recipient` with `scheme` unless it already carries one.
pub fn contact_uri(scheme: &str, recipient: &str) -> String {
    if strip_scheme(recipient).len() != recipient.len() {
        recipient.to_string()
    } else {
        format!("{scheme}{recipient}")
    }
}

fn strip_scheme(uri: &str) -> &str {
    match uri.split_once(':') {
        Some((scheme, rest))
            if !scheme.is_empty() && scheme.chars().all(|c| c.is_ascii_alphabetic()) =>
        {
            rest
        }
        _ => uri,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn duplicates_collapse_to_first_spelling() {
        let ledger = AdmissionLedger::new(["alice@corp", "bob@corp", "sip:ALICE@corp"]);
        assert_eq!(ledger.len(), 2);
        assert_eq!(
            ledger.recipients().collect::<Vec<_>>(),
            vec!["alice@corp", "bob@corp"]
        );
    }

    #[test]
    fn contact_uri_adds_scheme_once() {
        assert_eq!(contact_uri("sip:", "alice@corp"), "sip:alice@corp");
        assert_eq!(contact_uri("sip:", "sip:alice@corp"), "sip:alice@corp");
        assert_eq!(contact_uri("sip:", "tel:+15551234"), "tel:+15551234");
    }

    #[test]
    fn participant_uri_matches_bare_recipient() {
        let mut ledger = AdmissionLedger::new(["Alice@Corp"]);
        assert_eq!(
            ledger.begin_polling("sip:alice@corp").as_deref(),
            Some("Alice@Corp")
        );
        // Repeated announcements are ignored.
        assert_eq!(ledger.begin_polling("sip:alice@corp"), None);
        assert_eq!(ledger.begin_polling("sip:mallory@corp"), None);
    }

    #[test]
    fn unknown_participant_matches_no_recipient() {
        let ledger = AdmissionLedger::new(["Alice@Corp"]);
        assert!(ledger.matches("sip:alice@corp"));
        assert!(!ledger.matches("sip:mallory@corp"));
    }

    #[test]
    fn rejection_makes_ledger_unbuildable_and_complete() {
        let mut ledger = AdmissionLedger::new(["a@corp", "b@corp", "c@corp"]);
        ledger.reject("b@corp");
        assert!(!ledger.is_buildable());
        assert!(ledger.is_complete());
        assert_eq!(ledger.unauthorized(), vec!["b@corp".to_string()]);
        assert_eq!(ledger.pending().len(), 2);
        assert!(!ledger.entries()[1].authorized());
    }

    #[test]
    fn completes_when_every_recipient_resolves() {
        let mut ledger = AdmissionLedger::new(["a@corp", "b@corp"]);
        ledger.begin_polling("sip:a@corp");
        ledger.resolve("a@corp", true);
        assert!(!ledger.is_complete());

        ledger.begin_polling("sip:b@corp");
        ledger.resolve("b@corp", false);
        assert!(ledger.is_complete());
        assert!(!ledger.all_offline());
        assert!(ledger.entries()[0].availability_confirmed());
    }

    #[test]
    fn all_offline_needs_every_recipient_offline() {
        let mut ledger = AdmissionLedger::new(["a@corp"]);
        ledger.begin_polling("sip:a@corp");
        ledger.resolve("a@corp", false);
        assert!(ledger.all_offline());

        assert!(!AdmissionLedger::new(Vec::<String>::new()).all_offline());
    }

    #[test]
    fn resolve_ignores_recipients_not_polling() {
        let mut ledger = AdmissionLedger::new(["a@corp"]);
        ledger.resolve("a@corp", true);
        assert_eq!(ledger.entries()[0].state, AdmissionState::Requested);
    }

    #[derive(Debug, Clone)]
    enum Step {
        Reject(usize),
        Join(usize),
        Resolve(usize, bool),
    }

    fn step() -> impl Strategy<Value = Step> {
        prop_oneof![
            (0usize..6).prop_map(Step::Reject),
            (0usize..6).prop_map(Step::Join),
            (0usize..6, any::<bool>()).prop_map(|(i, on)| Step::Resolve(i, on)),
        ]
    }

    proptest! {
        #[test]
        fn every_recipient_is_in_exactly_one_bucket(
            names in proptest::collection::vec("[a-e]", 1..6),
            steps in proptest::collection::vec(step(), 0..20),
        ) {
            let recipients: Vec<String> = names.iter().map(|n| format!("{n}@corp")).collect();
            let mut ledger = AdmissionLedger::new(recipients.clone());

            for step in steps {
                let name = |i: usize| recipients[i % recipients.len()].clone();
                match step {
                    Step::Reject(i) => ledger.reject(&name(i)),
                    Step::Join(i) => { ledger.begin_polling(&format!("sip:{}", name(i))); }
                    Step::Resolve(i, on) => ledger.resolve(&name(i), on),
                }
            }

            let total = ledger.pending().len()
                + ledger.unauthorized().len()
                + ledger.online().len()
                + ledger.offline().len();
            prop_assert_eq!(total, ledger.len());

            if ledger.is_complete() && ledger.is_buildable() {
                prop_assert!(ledger.pending().is_empty());
                prop_assert_eq!(ledger.online().len() + ledger.offline().len(), ledger.len());
            }
        }
    }
}
