use duet_client::{CallState, SessionEvent};

use crate::integration::init_tracing;
use crate::utils::{WsTestSession, spawn_server};

fn is_state(evt: &SessionEvent, pred: fn(&CallState) -> bool) -> bool {
    matches!(evt, SessionEvent::StateChanged(state) if pred(state))
}

#[tokio::test]
async fn test_call_over_signaling_service() {
    init_tracing();
    let addr = spawn_server().await.unwrap();

    let mut alice = WsTestSession::connect(addr).await.unwrap();
    let mut bob = WsTestSession::connect(addr).await.unwrap();

    alice.handle.create_room("alice@x.com", "r1").await.unwrap();
    alice
        .wait_for(|e| matches!(e, SessionEvent::Joined { .. }))
        .await
        .unwrap();

    bob.handle.join_room("bob@x.com", "r1").await.unwrap();
    bob.wait_for(|e| is_state(e, |s| matches!(s, CallState::Paired { .. })))
        .await
        .unwrap();
    alice
        .wait_for(|e| is_state(e, |s| matches!(s, CallState::Paired { .. })))
        .await
        .unwrap();

    alice.handle.call().await.unwrap();
    bob.wait_for(|e| is_state(e, |s| matches!(s, CallState::Answering { .. })))
        .await
        .unwrap();
    bob.wait_for(|e| matches!(e, SessionEvent::RemoteTrack(_)))
        .await
        .unwrap();

    bob.handle.send_streams().await.unwrap();
    alice
        .wait_for(|e| matches!(e, SessionEvent::RemoteTrack(_)))
        .await
        .unwrap();

    assert_eq!(alice.source.acquisitions(), 1);
    assert_eq!(bob.source.acquisitions(), 1);

    alice.handle.shutdown().await.unwrap();
    alice
        .wait_for(|e| is_state(e, |s| s == &CallState::Ended))
        .await
        .unwrap();
    assert!(alice.fake.state().closed);
}

#[tokio::test]
async fn test_room_errors_reach_the_client() {
    init_tracing();
    let addr = spawn_server().await.unwrap();

    let mut alice = WsTestSession::connect(addr).await.unwrap();
    let mut bob = WsTestSession::connect(addr).await.unwrap();

    bob.handle.join_room("bob@x.com", "nowhere").await.unwrap();
    match bob
        .wait_for(|e| matches!(e, SessionEvent::RoomError { .. }))
        .await
        .unwrap()
    {
        SessionEvent::RoomError { msg } => assert_eq!(msg, "No room has been created!"),
        other => panic!("Expected room error, got {:?}", other),
    }

    alice.handle.create_room("alice@x.com", "r1").await.unwrap();
    alice
        .wait_for(|e| matches!(e, SessionEvent::Joined { .. }))
        .await
        .unwrap();

    bob.handle.create_room("bob@x.com", "r1").await.unwrap();
    match bob
        .wait_for(|e| matches!(e, SessionEvent::RoomError { .. }))
        .await
        .unwrap()
    {
        SessionEvent::RoomError { msg } => {
            assert_eq!(msg, "A room with this name already exists!")
        }
        other => panic!("Expected room error, got {:?}", other),
    }
}
