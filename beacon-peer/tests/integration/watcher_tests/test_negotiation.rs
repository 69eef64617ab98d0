use beacon_core::{ClientSignal, PeerId, SdpKind};
use beacon_peer::WatcherState;
use std::time::Duration;

use crate::integration::{
    SIGNAL_TIMEOUT_MS, SILENCE_MS, candidate_signal, create_test_watcher, host_candidate,
    init_tracing, offer_signal, wait_for_status,
};
use crate::utils::{ConnectionCall, MockConnectionFactory, wait_for_calls};

#[tokio::test]
async fn test_offer_is_answered_to_sender() {
    init_tracing();

    let watcher = create_test_watcher(MockConnectionFactory::new());
    let mut status = watcher.handle.subscribe();
    let broadcaster = PeerId::new();

    watcher
        .relay
        .send(offer_signal(broadcaster, "v=0 offer"))
        .await
        .unwrap();

    let status = wait_for_status(&mut status, |s| s.state == WatcherState::AnswerSent)
        .await
        .expect("offer not answered");
    assert!(status.relay_connected);
    assert!(!status.stream_active);

    let answers = watcher.signaling.answers_to(&broadcaster).await;
    assert_eq!(answers.len(), 1);
    assert_eq!(answers[0].kind, SdpKind::Answer);

    let connections = watcher.factory.connections().await;
    assert_eq!(
        connections[0].calls().await,
        vec![
            ConnectionCall::SetRemote(SdpKind::Offer),
            ConnectionCall::CreateAnswer,
        ]
    );
}

#[tokio::test]
async fn test_candidates_applied_after_offer() {
    init_tracing();

    let watcher = create_test_watcher(MockConnectionFactory::new());
    let broadcaster = PeerId::new();

    watcher
        .relay
        .send(offer_signal(broadcaster, "v=0 offer"))
        .await
        .unwrap();
    for port in [5001, 5002] {
        watcher
            .relay
            .send(candidate_signal(broadcaster, &host_candidate(port)))
            .await
            .unwrap();
    }

    let connection = watcher
        .factory
        .wait_for_connections(&broadcaster, 1, SIGNAL_TIMEOUT_MS)
        .await
        .pop()
        .unwrap();
    let calls = wait_for_calls(&connection, |calls| calls.len() >= 4, SIGNAL_TIMEOUT_MS).await;

    assert_eq!(
        calls,
        vec![
            ConnectionCall::SetRemote(SdpKind::Offer),
            ConnectionCall::CreateAnswer,
            ConnectionCall::AddCandidate(host_candidate(5001)),
            ConnectionCall::AddCandidate(host_candidate(5002)),
        ]
    );
}

#[tokio::test]
async fn test_candidates_before_offer_applied_in_order() {
    init_tracing();

    let watcher = create_test_watcher(MockConnectionFactory::new());
    let broadcaster = PeerId::new();

    for port in [5001, 5002] {
        watcher
            .relay
            .send(candidate_signal(broadcaster, &host_candidate(port)))
            .await
            .unwrap();
    }
    tokio::time::sleep(Duration::from_millis(SILENCE_MS)).await;
    assert!(watcher.factory.connections().await.is_empty());
    assert_eq!(watcher.handle.status().state, WatcherState::Idle);

    watcher
        .relay
        .send(offer_signal(broadcaster, "v=0 offer"))
        .await
        .unwrap();

    let connection = watcher
        .factory
        .wait_for_connections(&broadcaster, 1, SIGNAL_TIMEOUT_MS)
        .await
        .pop()
        .unwrap();
    let calls = wait_for_calls(&connection, |calls| calls.len() >= 4, SIGNAL_TIMEOUT_MS).await;

    assert_eq!(
        calls,
        vec![
            ConnectionCall::SetRemote(SdpKind::Offer),
            ConnectionCall::AddCandidate(host_candidate(5001)),
            ConnectionCall::AddCandidate(host_candidate(5002)),
            ConnectionCall::CreateAnswer,
        ]
    );
}

#[tokio::test]
async fn test_early_candidates_from_other_peers_discarded_on_offer() {
    init_tracing();

    let watcher = create_test_watcher(MockConnectionFactory::new());
    let broadcaster = PeerId::new();
    let stranger = PeerId::new();

    watcher
        .relay
        .send(candidate_signal(stranger, &host_candidate(5001)))
        .await
        .unwrap();
    watcher
        .relay
        .send(candidate_signal(broadcaster, &host_candidate(5002)))
        .await
        .unwrap();
    watcher
        .relay
        .send(offer_signal(broadcaster, "v=0 offer"))
        .await
        .unwrap();

    let connection = watcher
        .factory
        .wait_for_connections(&broadcaster, 1, SIGNAL_TIMEOUT_MS)
        .await
        .pop()
        .unwrap();
    wait_for_calls(
        &connection,
        |calls| calls.contains(&ConnectionCall::CreateAnswer),
        SIGNAL_TIMEOUT_MS,
    )
    .await;
    assert_eq!(connection.applied_candidates().await, vec![host_candidate(5002)]);

    // The stranger's held candidate did not survive the offer.
    watcher
        .relay
        .send(offer_signal(stranger, "v=0 other"))
        .await
        .unwrap();
    let other = watcher
        .factory
        .wait_for_connections(&stranger, 1, SIGNAL_TIMEOUT_MS)
        .await
        .pop()
        .unwrap();
    wait_for_calls(
        &other,
        |calls| calls.contains(&ConnectionCall::CreateAnswer),
        SIGNAL_TIMEOUT_MS,
    )
    .await;
    assert!(other.applied_candidates().await.is_empty());
}

#[tokio::test]
async fn test_new_offer_replaces_session_and_drops_stale_candidates() {
    init_tracing();

    let watcher = create_test_watcher(MockConnectionFactory::new());
    let first = PeerId::new();
    let second = PeerId::new();

    watcher
        .relay
        .send(offer_signal(first, "v=0 first"))
        .await
        .unwrap();
    watcher
        .relay
        .send(offer_signal(second, "v=0 second"))
        .await
        .unwrap();
    watcher
        .relay
        .send(candidate_signal(first, &host_candidate(5001)))
        .await
        .unwrap();
    watcher
        .relay
        .send(candidate_signal(second, &host_candidate(5002)))
        .await
        .unwrap();

    let current = watcher
        .factory
        .wait_for_connections(&second, 1, SIGNAL_TIMEOUT_MS)
        .await
        .pop()
        .unwrap();
    wait_for_calls(
        &current,
        |calls| calls.iter().any(|c| matches!(c, ConnectionCall::AddCandidate(_))),
        SIGNAL_TIMEOUT_MS,
    )
    .await;
    tokio::time::sleep(Duration::from_millis(SILENCE_MS)).await;

    assert_eq!(current.applied_candidates().await, vec![host_candidate(5002)]);

    let previous = watcher.factory.connections_for(&first).await;
    assert_eq!(previous[0].close_count().await, 1);
    assert!(previous[0].applied_candidates().await.is_empty());

    assert_eq!(watcher.signaling.answers_to(&first).await.len(), 1);
    assert_eq!(watcher.signaling.answers_to(&second).await.len(), 1);
}

#[tokio::test]
async fn test_local_candidates_sent_to_broadcaster() {
    init_tracing();

    let watcher = create_test_watcher(MockConnectionFactory::new());
    let mut status = watcher.handle.subscribe();
    let broadcaster = PeerId::new();

    watcher
        .relay
        .send(offer_signal(broadcaster, "v=0 offer"))
        .await
        .unwrap();
    wait_for_status(&mut status, |s| s.state == WatcherState::AnswerSent)
        .await
        .expect("offer not answered");

    let connections = watcher.factory.connections().await;
    connections[0].emit_candidate(&host_candidate(6000)).await;

    assert!(
        watcher
            .signaling
            .wait_for_count(
                |s| matches!(s, ClientSignal::Candidate { target, .. } if *target == broadcaster),
                1,
                SIGNAL_TIMEOUT_MS,
            )
            .await
    );
}
