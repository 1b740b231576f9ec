// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Integration tests for conversation admission and message delivery.
//!
//! Every test signs in over a scripted MockGateway first, then delivers.
//! Tests run on a paused clock so poll intervals and timeouts are virtual.

use std::time::Duration;

use parley_core::{Availability, Failure, GatewayError, Phase};
use parley_test_utils::{MockGateway, SELF_URI, SendBehavior, TestHarness};
use tokio::time::Instant;

const BOB: &str = "bob@corp.example";
const CAROL: &str = "carol@corp.example";
const DAVE: &str = "dave@corp.example";

async fn settle() {
    tokio::time::sleep(Duration::from_millis(10)).await;
}

fn harness_with(gateway: MockGateway) -> TestHarness {
    TestHarness::builder().with_gateway(gateway).build()
}

// ---- Test 1: Every recipient available ----

#[tokio::test(start_paused = true)]
async fn test_all_available_recipients_receive_one_send() {
    let harness = TestHarness::builder().build();
    let (mut session, _) = harness.open_signed_in().await;

    let status = session.send_message("deploy finished", [BOB, CAROL, DAVE]).await;

    assert!(status.is_up(), "unexpected status: {}", status.message());
    let client = harness.client();
    assert_eq!(client.sent_messages(), vec!["deploy finished".to_string()]);
    assert_eq!(
        client.added_participants(),
        vec![
            format!("sip:{BOB}"),
            format!("sip:{CAROL}"),
            format!("sip:{DAVE}")
        ]
    );

    let report = session.last_delivery().expect("delivery recorded");
    assert!(report.send_invoked);
    assert_eq!(report.ledger.online().len(), 3);
    assert!(report.ledger.unauthorized().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_successful_send_waits_for_settle_delay() {
    let harness = TestHarness::builder().build();
    let (mut session, _) = harness.open_signed_in().await;

    let started = Instant::now();
    let status = session.send_message("hi", [BOB]).await;

    assert!(status.is_up());
    assert!(started.elapsed() >= Duration::from_millis(250));
}

#[tokio::test(start_paused = true)]
async fn test_self_participant_is_never_polled() {
    let harness = TestHarness::builder().build();
    let (mut session, _) = harness.open_signed_in().await;

    session.send_message("hi", [BOB]).await;
    assert_eq!(harness.client().availability_polls(SELF_URI), 0);
    assert_eq!(harness.client().availability_polls(BOB), 1);
}

// ---- Test 2: Unauthorized recipients ----

#[tokio::test(start_paused = true)]
async fn test_rejected_recipient_blocks_send_and_is_listed() {
    let harness = harness_with(MockGateway::new().with_rejected(CAROL));
    let (mut session, _) = harness.open_signed_in().await;

    let status = session.send_message("hi", [BOB, CAROL, DAVE]).await;

    assert_eq!(
        status.failure,
        Some(Failure::UnauthorizedRecipients(vec![CAROL.to_string()]))
    );
    assert_eq!(
        status.message(),
        format!(
            "Conversation cannot be initiated. All participants cannot be added to the conversation: {CAROL}"
        )
    );
    let client = harness.client();
    assert_eq!(client.send_calls(), 0);
    // Adding continues past the failure so every rejection is reported.
    assert_eq!(client.added_participants().len(), 3);
}

#[tokio::test(start_paused = true)]
async fn test_every_rejected_recipient_is_reported_in_order() {
    let harness = harness_with(MockGateway::new().with_rejected(BOB).with_rejected(DAVE));
    let (mut session, _) = harness.open_signed_in().await;

    let status = session.send_message("hi", [BOB, CAROL, DAVE]).await;
    assert_eq!(
        status.failure,
        Some(Failure::UnauthorizedRecipients(vec![
            BOB.to_string(),
            DAVE.to_string()
        ]))
    );
}

// ---- Test 3: Availability polling ----

#[tokio::test(start_paused = true)]
async fn test_all_offline_short_circuits_send() {
    let harness = harness_with(
        MockGateway::new()
            .with_availability(BOB, [Availability::Offline])
            .with_availability(CAROL, [Availability::None]),
    );
    let (mut session, _) = harness.open_signed_in().await;

    let started = Instant::now();
    let status = session.send_message("hi", [BOB, CAROL]).await;
    let elapsed = started.elapsed();

    assert_eq!(status.failure, Some(Failure::AllRecipientsOffline));
    assert_eq!(
        status.message(),
        "All participants offline: no users involved in the conversation received the message."
    );
    let client = harness.client();
    assert_eq!(client.send_calls(), 0);
    // Five misses, then a final reading after the last wait.
    assert_eq!(client.availability_polls(BOB), 6);
    assert_eq!(client.availability_polls(CAROL), 6);
    // Polls for different recipients run concurrently.
    assert!(elapsed >= Duration::from_millis(7500), "{elapsed:?}");
    assert!(elapsed < Duration::from_secs(9), "{elapsed:?}");
}

#[tokio::test(start_paused = true)]
async fn test_partially_offline_recipients_still_get_the_message() {
    let harness = harness_with(MockGateway::new().with_availability(CAROL, [Availability::Offline]));
    let (mut session, _) = harness.open_signed_in().await;

    let status = session.send_message("hi", [BOB, CAROL]).await;

    assert!(status.is_up(), "unexpected status: {}", status.message());
    assert_eq!(harness.client().send_calls(), 1);
    let report = session.last_delivery().expect("delivery recorded");
    assert_eq!(report.ledger.online(), vec![BOB.to_string()]);
    assert_eq!(report.ledger.offline(), vec![CAROL.to_string()]);
}

#[tokio::test(start_paused = true)]
async fn test_recipient_coming_online_stops_polling() {
    let harness = harness_with(MockGateway::new().with_availability(
        BOB,
        [Availability::Offline, Availability::Offline, Availability::Busy],
    ));
    let (mut session, _) = harness.open_signed_in().await;

    let status = session.send_message("hi", [BOB]).await;

    assert!(status.is_up());
    assert_eq!(harness.client().availability_polls(BOB), 3);
}

#[tokio::test(start_paused = true)]
async fn test_recipient_online_after_last_wait_is_not_offline() {
    let harness = harness_with(MockGateway::new().with_availability(
        BOB,
        [
            Availability::Offline,
            Availability::Offline,
            Availability::Offline,
            Availability::Offline,
            Availability::Offline,
            Availability::Free,
        ],
    ));
    let (mut session, _) = harness.open_signed_in().await;

    let started = Instant::now();
    let status = session.send_message("hi", [BOB]).await;
    let elapsed = started.elapsed();

    assert!(status.is_up(), "unexpected status: {}", status.message());
    let client = harness.client();
    assert_eq!(client.availability_polls(BOB), 6);
    assert_eq!(client.send_calls(), 1);
    let report = session.last_delivery().expect("delivery recorded");
    assert_eq!(report.ledger.online(), vec![BOB.to_string()]);
    assert!(report.ledger.offline().is_empty());
    // 5 x 1.5 s of waiting, then the settle delay after the send.
    assert!(elapsed >= Duration::from_millis(7750), "{elapsed:?}");
    assert!(elapsed < Duration::from_secs(9), "{elapsed:?}");
}

#[tokio::test(start_paused = true)]
async fn test_duplicate_recipients_are_added_once() {
    let harness = TestHarness::builder().build();
    let (mut session, _) = harness.open_signed_in().await;

    let upper = BOB.to_uppercase();
    let status = session.send_message("hi", [BOB, upper.as_str(), BOB]).await;

    assert!(status.is_up());
    assert_eq!(harness.client().added_participants().len(), 1);
}

// ---- Test 4: Timeouts ----

#[tokio::test(start_paused = true)]
async fn test_participants_never_announced_times_out_admission() {
    let harness = harness_with(MockGateway::new().with_silent_participants());
    let (mut session, _) = harness.open_signed_in().await;

    let started = Instant::now();
    let status = session.send_message("hi", [BOB]).await;
    let elapsed = started.elapsed();

    assert_eq!(status.failure, Some(Failure::Timeout(Phase::Admission)));
    assert_eq!(
        status.message(),
        "Timeout occurred while adding participants to the conversation."
    );
    assert!(elapsed >= Duration::from_secs(75));
    assert!(elapsed < Duration::from_secs(76));
    assert_eq!(harness.client().send_calls(), 0);

    let report = session.last_delivery().expect("delivery recorded");
    assert_eq!(report.ledger.pending(), vec![BOB.to_string()]);
}

#[tokio::test(start_paused = true)]
async fn test_send_that_never_completes_times_out() {
    let harness = harness_with(MockGateway::new().with_send(SendBehavior::Hang));
    let (mut session, _) = harness.open_signed_in().await;

    let started = Instant::now();
    let status = session.send_message("hi", [BOB]).await;

    assert_eq!(status.failure, Some(Failure::Timeout(Phase::Send)));
    assert_eq!(
        status.message(),
        "Timeout occurred during send instant message procedure."
    );
    assert!(started.elapsed() >= Duration::from_secs(75));
    assert_eq!(harness.client().send_calls(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_configured_budgets_apply() {
    let harness = TestHarness::builder()
        .with_gateway(MockGateway::new().with_silent_participants())
        .with_admission_timeout(3)
        .build();
    let (mut session, _) = harness.open_signed_in().await;

    let started = Instant::now();
    let status = session.send_message("hi", [BOB]).await;

    assert_eq!(status.failure, Some(Failure::Timeout(Phase::Admission)));
    assert!(started.elapsed() < Duration::from_secs(4));
}

// ---- Test 5: Send phase edge cases ----

#[tokio::test(start_paused = true)]
async fn test_send_error_is_not_a_timeout() {
    let harness = harness_with(
        MockGateway::new().with_send(SendBehavior::Fail(GatewayError::Client("refused".into()))),
    );
    let (mut session, _) = harness.open_signed_in().await;

    let started = Instant::now();
    let status = session.send_message("hi", [BOB]).await;

    assert!(status.is_up());
    assert!(started.elapsed() < Duration::from_secs(75));
    assert!(session.last_delivery().expect("recorded").send_invoked);
}

#[tokio::test(start_paused = true)]
async fn test_missing_messaging_modality_skips_send() {
    let harness = harness_with(MockGateway::new().without_messaging());
    let (mut session, _) = harness.open_signed_in().await;

    let status = session.send_message("hi", [BOB]).await;

    assert!(status.is_up());
    assert!(!session.last_delivery().expect("recorded").send_invoked);
}

#[tokio::test(start_paused = true)]
async fn test_messaging_that_cannot_send_is_skipped() {
    let harness = harness_with(MockGateway::new().with_send_disabled());
    let (mut session, _) = harness.open_signed_in().await;

    let status = session.send_message("hi", [BOB]).await;

    assert!(status.is_up());
    assert_eq!(harness.client().send_calls(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_conversation_creation_failure_is_reported() {
    let harness = harness_with(
        MockGateway::new().with_conversation_error(GatewayError::Client("quota reached".into())),
    );
    let (mut session, _) = harness.open_signed_in().await;

    let status = session.send_message("hi", [BOB]).await;

    match status.failure {
        Some(Failure::ConversationFailed(msg)) => assert!(msg.contains("quota reached")),
        other => panic!("expected ConversationFailed, got {other:?}"),
    }
    assert_eq!(harness.client().conversations_created(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_no_recipients_creates_no_conversation() {
    let harness = TestHarness::builder().build();
    let (mut session, _) = harness.open_signed_in().await;

    let status = session.send_message("hi", Vec::<String>::new()).await;

    assert!(status.is_up());
    assert_eq!(harness.client().conversations_created(), 0);
}

// ---- Test 6: Teardown ----

#[tokio::test(start_paused = true)]
async fn test_subscriptions_are_released_after_delivery() {
    let harness = TestHarness::builder().build();
    let (mut session, _) = harness.open_signed_in().await;

    session.send_message("hi", [BOB, CAROL]).await;
    settle().await;

    let client = harness.client();
    assert_eq!(client.conversation_subscriber_count(), 0);
    assert_eq!(client.participant_subscriber_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_subscriptions_are_released_after_admission_timeout() {
    let harness = harness_with(MockGateway::new().with_silent_participants());
    let (mut session, _) = harness.open_signed_in().await;

    session.send_message("hi", [BOB]).await;
    settle().await;

    let client = harness.client();
    assert_eq!(client.conversation_subscriber_count(), 0);
    assert_eq!(client.participant_subscriber_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_each_delivery_starts_clean() {
    let harness = harness_with(MockGateway::new().with_availability(BOB, [Availability::Offline]));
    let (mut session, _) = harness.open_signed_in().await;

    let first = session.send_message("one", [BOB]).await;
    assert_eq!(first.failure, Some(Failure::AllRecipientsOffline));

    let second = session.send_message("two", [CAROL]).await;
    assert!(second.is_up(), "unexpected status: {}", second.message());
    assert_eq!(session.delivery_status(), second);
    assert_eq!(harness.client().conversations_created(), 2);
    assert_eq!(harness.client().sent_messages(), vec!["two".to_string()]);
}
