use duet_core::ServerMessage;

use crate::integration::init_tracing;
use crate::utils::TestHub;

#[tokio::test]
async fn test_join_missing_room() {
    init_tracing();
    let mut hub = TestHub::start();

    let bob = hub.connect().await.unwrap();
    hub.join(&bob, "bob@x.com", "nowhere").await.unwrap();

    match hub.next_for(&bob).await.unwrap() {
        ServerMessage::RoomNotFound { msg } => assert_eq!(msg, "No room has been created!"),
        other => panic!("Expected not-found error, got {:?}", other),
    }

    // the failed join did not create the room
    hub.join(&bob, "bob@x.com", "nowhere").await.unwrap();
    assert!(matches!(
        hub.next_for(&bob).await.unwrap(),
        ServerMessage::RoomNotFound { .. }
    ));
}
