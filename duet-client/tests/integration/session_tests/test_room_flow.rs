use duet_client::{CallState, SessionError, SessionEvent};
use duet_core::{ClientMessage, PeerId, RoomId, RoomIndex, ServerMessage};

use crate::integration::init_tracing;
use crate::utils::TestPeer;

#[tokio::test]
async fn test_create_room_sends_request() {
    init_tracing();
    let (mut alice, _) = TestPeer::new(1);

    alice
        .coordinator
        .request_create_room("alice@x.com".into(), RoomId::from("r1"))
        .await
        .unwrap();

    assert_eq!(
        alice.channel.take_sent(),
        vec![ClientMessage::CreateRoom {
            email: "alice@x.com".into(),
            room: RoomId::from("r1"),
        }]
    );
    // Nothing changes until the service confirms.
    assert_eq!(alice.coordinator.state(), &CallState::Idle);
}

#[tokio::test]
async fn test_join_then_pair() {
    init_tracing();
    let (mut bob, _) = TestPeer::new(2);
    let alice = PeerId::new();

    bob.coordinator
        .request_join_room("bob@x.com".into(), RoomId::from("r1"))
        .await
        .unwrap();
    bob.enter_room("r1", &[&alice]).await;

    assert_eq!(
        bob.coordinator.state(),
        &CallState::Paired {
            remote: alice.clone()
        }
    );
    assert_eq!(bob.coordinator.room(), Some(&RoomId::from("r1")));
    assert_eq!(bob.coordinator.rooms()[&RoomId::from("r1")].users.len(), 2);

    let events = bob.drain_events();
    assert!(events.iter().any(|e| matches!(
        e,
        SessionEvent::RemoteJoined { id, .. } if id == &alice
    )));
}

#[tokio::test]
async fn test_room_errors_leave_state_alone() {
    init_tracing();
    let (mut alice, _) = TestPeer::new(1);

    alice
        .coordinator
        .handle_server_message(ServerMessage::DuplicateRoom {
            msg: "A room with this name already exists!".into(),
        })
        .await
        .unwrap();
    alice
        .coordinator
        .handle_server_message(ServerMessage::RoomNotFound {
            msg: "No room has been created!".into(),
        })
        .await
        .unwrap();

    assert_eq!(alice.coordinator.state(), &CallState::Idle);
    let errors: Vec<String> = alice
        .drain_events()
        .into_iter()
        .filter_map(|e| match e {
            SessionEvent::RoomError { msg } => Some(msg),
            _ => None,
        })
        .collect();
    assert_eq!(
        errors,
        vec![
            "A room with this name already exists!".to_owned(),
            "No room has been created!".to_owned(),
        ]
    );
}

#[tokio::test]
async fn test_second_room_request_refused() {
    init_tracing();
    let (mut alice, _) = TestPeer::new(1);
    alice.enter_room("r1", &[]).await;

    let err = alice
        .coordinator
        .request_create_room("alice@x.com".into(), RoomId::from("r2"))
        .await
        .unwrap_err();
    assert!(matches!(err, SessionError::AlreadyInRoom));
    assert!(alice.channel.take_sent().is_empty());
}

#[tokio::test]
async fn test_later_joiner_replaces_remote_before_call() {
    init_tracing();
    let (mut alice, _) = TestPeer::new(1);
    alice.enter_room("r1", &[]).await;

    let bob = PeerId::new();
    let carol = PeerId::new();
    for id in [&bob, &carol] {
        alice
            .coordinator
            .handle_server_message(ServerMessage::UserJoined {
                email: "x@x.com".into(),
                id: id.clone(),
                rooms: RoomIndex::new(),
            })
            .await
            .unwrap();
    }

    assert_eq!(alice.coordinator.state(), &CallState::Paired { remote: carol });
}
