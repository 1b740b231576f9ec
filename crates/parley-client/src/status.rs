// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Status reporting: terminal flags to an Up/Down status.
//!
//! Both mappings are pure and check reasons in a fixed priority order, so
//! calling them repeatedly on the same facts always yields the same status.

use parley_core::{Failure, Phase, Status};

/// Snapshot of the sign-in flags of a session.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SignInFacts {
    pub address: String,
    pub timed_out: bool,
    /// Set when no usable client handle was obtained.
    pub init_failure: Option<Failure>,
    pub bad_address: bool,
    pub retries_exhausted: bool,
}

/// Snapshot of the flags of one delivery.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeliveryFacts {
    pub send_timed_out: bool,
    pub admission_timed_out: bool,
    pub conversation_failure: Option<String>,
    pub unauthorized: Vec<String>,
    pub all_offline: bool,
}

/// Priority: timeout > platform init failure > aborted (bad address, then
/// exhausted retries) > Up.
pub fn sign_in_status(facts: &SignInFacts) -> Status {
    if facts.timed_out {
        return Status::down(Failure::Timeout(Phase::SignIn));
    }
    if let Some(failure) = &facts.init_failure {
        return Status::down(failure.clone());
    }
    if facts.bad_address {
        return Status::down(Failure::BadAddress {
            address: facts.address.clone(),
        });
    }
    if facts.retries_exhausted {
        return Status::down(Failure::RetryExhausted);
    }
    Status::up()
}

/// Priority: send timeout > admission timeout > conversation creation
/// failure > unauthorized recipients > all offline > Up.
pub fn delivery_status(facts: &DeliveryFacts) -> Status {
    if facts.send_timed_out {
        return Status::down(Failure::Timeout(Phase::Send));
    }
    if facts.admission_timed_out {
        return Status::down(Failure::Timeout(Phase::Admission));
    }
    if let Some(message) = &facts.conversation_failure {
        return Status::down(Failure::ConversationFailed(message.clone()));
    }
    if !facts.unauthorized.is_empty() {
        return Status::down(Failure::UnauthorizedRecipients(facts.unauthorized.clone()));
    }
    if facts.all_offline {
        return Status::down(Failure::AllRecipientsOffline);
    }
    Status::up()
}

#[cfg(test)]
mod tests {
    use super::*;
    use parley_core::StatusValue;
    use proptest::prelude::*;

    #[test]
    fn clean_facts_are_up() {
        assert_eq!(sign_in_status(&SignInFacts::default()), Status::up());
        assert_eq!(delivery_status(&DeliveryFacts::default()), Status::up());
    }

    #[test]
    fn timeout_wins_over_every_other_sign_in_reason() {
        let facts = SignInFacts {
            address: "alice@corp".into(),
            timed_out: true,
            init_failure: Some(Failure::PlatformUnavailable),
            bad_address: true,
            retries_exhausted: true,
        };
        assert_eq!(
            sign_in_status(&facts).failure,
            Some(Failure::Timeout(Phase::SignIn))
        );
    }

    #[test]
    fn bad_address_names_the_address() {
        let facts = SignInFacts {
            address: "alice@nowhere".into(),
            bad_address: true,
            retries_exhausted: true,
            ..Default::default()
        };
        let status = sign_in_status(&facts);
        assert_eq!(status.value, StatusValue::Down);
        assert!(status.message().contains("alice@nowhere looks invalid"));
    }

    #[test]
    fn exhausted_retries_report_an_aborted_sign_in() {
        let facts = SignInFacts {
            retries_exhausted: true,
            ..Default::default()
        };
        assert_eq!(sign_in_status(&facts).failure, Some(Failure::RetryExhausted));
    }

    #[test]
    fn unauthorized_wins_over_all_offline() {
        let facts = DeliveryFacts {
            unauthorized: vec!["bob@corp".into()],
            all_offline: true,
            ..Default::default()
        };
        assert_eq!(
            delivery_status(&facts).failure,
            Some(Failure::UnauthorizedRecipients(vec!["bob@corp".into()]))
        );
    }

    fn sign_in_facts() -> impl Strategy<Value = SignInFacts> {
        (any::<bool>(), any::<bool>(), any::<bool>(), any::<bool>()).prop_map(
            |(timed_out, init, bad_address, retries_exhausted)| SignInFacts {
                address: "alice@corp".into(),
                timed_out,
                init_failure: init.then(|| Failure::PlatformInit("Client not found: x".into())),
                bad_address,
                retries_exhausted,
            },
        )
    }

    fn delivery_facts() -> impl Strategy<Value = DeliveryFacts> {
        (
            any::<bool>(),
            any::<bool>(),
            any::<bool>(),
            proptest::collection::vec("[a-z]{1,8}@corp", 0..3),
            any::<bool>(),
        )
            .prop_map(
                |(send_timed_out, admission_timed_out, failed, unauthorized, all_offline)| {
                    DeliveryFacts {
                        send_timed_out,
                        admission_timed_out,
                        conversation_failure: failed.then(|| "refused".to_string()),
                        unauthorized,
                        all_offline,
                    }
                },
            )
    }

    proptest! {
        #[test]
        fn sign_in_status_is_idempotent(facts in sign_in_facts()) {
            prop_assert_eq!(sign_in_status(&facts), sign_in_status(&facts));
        }

        #[test]
        fn sign_in_status_is_up_only_without_reasons(facts in sign_in_facts()) {
            let clean = !facts.timed_out
                && facts.init_failure.is_none()
                && !facts.bad_address
                && !facts.retries_exhausted;
            prop_assert_eq!(sign_in_status(&facts).is_up(), clean);
        }

        #[test]
        fn delivery_status_is_idempotent(facts in delivery_facts()) {
            prop_assert_eq!(delivery_status(&facts), delivery_status(&facts));
        }

        #[test]
        fn send_timeout_always_wins(mut facts in delivery_facts()) {
            facts.send_timed_out = true;
            prop_assert_eq!(
                delivery_status(&facts).failure,
                Some(Failure::Timeout(Phase::Send))
            );
        }
    }
}
