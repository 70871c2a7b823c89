use duet_client::{
    CallState, MediaCapture, MemoryChannel, NegotiationEngine, RtcOptions, RtcPeerResource,
    SessionCoordinator, SyntheticSource,
};
use duet_core::{PeerId, RoomId, RoomIndex, ServerMessage};
use std::time::Duration;
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::integration::init_tracing;
use crate::utils::{paired, settle};

type RtcCoordinator = SessionCoordinator<MemoryChannel, RtcPeerResource, SyntheticSource>;

async fn rtc_peer(id: u128) -> (RtcCoordinator, MemoryChannel, PeerId) {
    let id = PeerId(Uuid::from_u128(id));
    let channel = MemoryChannel::new();

    let mut engine = NegotiationEngine::new();
    let options = RtcOptions {
        ice_servers: Vec::new(),
        gather_timeout: Duration::from_millis(500),
        loopback_candidates: true,
    };
    let resource = RtcPeerResource::new(options, engine.event_sink())
        .await
        .unwrap();
    engine.install(resource);

    let (events_tx, _) = mpsc::unbounded_channel();
    let coordinator = SessionCoordinator::new(
        channel.clone(),
        engine,
        MediaCapture::new(SyntheticSource::default()),
        events_tx,
    )
    .with_local_id(id.clone());
    (coordinator, channel, id)
}

async fn meet(coordinator: &mut RtcCoordinator, remote: &PeerId) {
    coordinator
        .handle_server_message(ServerMessage::Joined {
            room: RoomId::from("r1"),
            email: "me@test".to_owned(),
            rooms: RoomIndex::new(),
        })
        .await
        .unwrap();
    coordinator
        .handle_server_message(ServerMessage::UserJoined {
            email: "remote@test".to_owned(),
            id: remote.clone(),
            rooms: RoomIndex::new(),
        })
        .await
        .unwrap();
}

async fn relay(from: &MemoryChannel, from_id: &PeerId, to: &mut RtcCoordinator) {
    for msg in from.take_sent() {
        if let Some(relayed) = ServerMessage::relayed(from_id.clone(), msg) {
            to.handle_server_message(relayed).await.unwrap();
        }
    }
}

#[tokio::test]
async fn test_simultaneous_calls_resolve_to_one() {
    init_tracing();
    // Alice has the smaller id and withdraws.
    let (mut alice, mut bob, alice_media, _) = paired(1, 2).await;

    alice.coordinator.initiate_call().await.unwrap();
    bob.coordinator.initiate_call().await.unwrap();
    settle(&mut alice, &mut bob).await;

    assert_eq!(alice.fake.state().rollbacks, 1);
    assert_eq!(bob.fake.state().rollbacks, 0);
    assert_eq!(
        alice.coordinator.state(),
        &CallState::Answering {
            remote: bob.id.clone()
        }
    );
    assert_eq!(
        bob.coordinator.state(),
        &CallState::Connected {
            remote: alice.id.clone()
        }
    );

    alice.coordinator.send_streams().await.unwrap();
    settle(&mut alice, &mut bob).await;

    assert!(matches!(alice.coordinator.state(), CallState::Connected { .. }));
    assert!(matches!(bob.coordinator.state(), CallState::Connected { .. }));
    assert!(alice.errors.is_empty(), "{:?}", alice.errors);
    assert!(bob.errors.is_empty(), "{:?}", bob.errors);
    assert_eq!(alice_media.acquisitions(), 1);
}

#[tokio::test]
async fn test_simultaneous_renegotiation_resolves() {
    init_tracing();
    let (mut alice, mut bob, _, _) = paired(1, 2).await;
    alice.coordinator.initiate_call().await.unwrap();
    settle(&mut alice, &mut bob).await;
    bob.coordinator.send_streams().await.unwrap();
    settle(&mut alice, &mut bob).await;

    alice.coordinator.on_renegotiation_needed().await.unwrap();
    bob.coordinator.on_renegotiation_needed().await.unwrap();
    assert!(matches!(
        alice.coordinator.state(),
        CallState::RenegotiatingOffer { .. }
    ));
    assert!(matches!(
        bob.coordinator.state(),
        CallState::RenegotiatingOffer { .. }
    ));

    settle(&mut alice, &mut bob).await;

    assert_eq!(alice.fake.state().rollbacks, 1);
    assert_eq!(bob.fake.state().rollbacks, 0);
    assert!(matches!(alice.coordinator.state(), CallState::Connected { .. }));
    assert!(matches!(bob.coordinator.state(), CallState::Connected { .. }));
    assert!(!alice.coordinator.engine().is_offer_outstanding());
    assert!(!bob.coordinator.engine().is_offer_outstanding());
    assert!(alice.errors.is_empty(), "{:?}", alice.errors);
    assert!(bob.errors.is_empty(), "{:?}", bob.errors);
}

#[tokio::test]
async fn test_simultaneous_calls_resolve_on_webrtc() {
    init_tracing();
    let (mut alice, alice_channel, alice_id) = rtc_peer(1).await;
    let (mut bob, bob_channel, bob_id) = rtc_peer(2).await;
    meet(&mut alice, &bob_id).await;
    meet(&mut bob, &alice_id).await;

    alice.initiate_call().await.unwrap();
    bob.initiate_call().await.unwrap();

    // Bob keeps his offer, Alice replaces her connection and answers it.
    relay(&alice_channel, &alice_id, &mut bob).await;
    relay(&bob_channel, &bob_id, &mut alice).await;
    assert_eq!(
        alice.state(),
        &CallState::Answering {
            remote: bob_id.clone()
        }
    );
    assert!(!alice.engine().is_offer_outstanding());

    relay(&alice_channel, &alice_id, &mut bob).await;
    assert_eq!(
        bob.state(),
        &CallState::Connected {
            remote: alice_id.clone()
        }
    );

    // Bob's tracks go out in a renegotiation on the established connection.
    bob.process_engine_events().await.unwrap();
    assert!(matches!(bob.state(), CallState::RenegotiatingOffer { .. }));
    relay(&bob_channel, &bob_id, &mut alice).await;
    relay(&alice_channel, &alice_id, &mut bob).await;

    assert!(matches!(bob.state(), CallState::Connected { .. }));
    assert!(!bob.engine().is_offer_outstanding());
    assert!(!alice.engine().is_offer_outstanding());

    alice.shutdown().await;
    bob.shutdown().await;
}
