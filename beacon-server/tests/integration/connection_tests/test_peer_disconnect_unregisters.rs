use beacon_core::{ClientSignal, Payload, ServerSignal};
use serde_json::json;

use crate::integration::{create_test_relay, init_tracing};
use crate::utils::TestPeer;

#[tokio::test]
async fn test_peer_disconnect_unregisters() {
    init_tracing();

    let (relay, registry) = create_test_relay();

    let mut sender = TestPeer::connect(&relay).await;
    let departed = TestPeer::connect(&relay).await;
    let departed_id = departed.peer_id;

    departed.disconnect().await;

    // Frames to a departed peer vanish without an error frame to the sender
    sender
        .send(ClientSignal::Candidate {
            target: departed_id,
            candidate: Payload(json!({ "candidate": "" })),
        })
        .await;

    assert!(sender.is_silent().await);
    assert_eq!(registry.len(), 1);

    // The relay is still routing for everyone else
    sender.send(ClientSignal::Broadcaster).await;
    let late = TestPeer::connect(&relay).await;
    late.send(ClientSignal::Watcher).await;
    assert_eq!(
        sender.recv().await,
        Some(ServerSignal::Watcher { id: late.peer_id })
    );
}
