//! End-to-end room lifecycle exercised through the same components the
//! websocket duplex drives (`ConnectionHub` + `RoomCoordinator`), connecting
//! handles directly rather than through the auth-gated `/ws` upgrade.

mod test_helpers;

use game_fabric_server::hub::ClientHandle;
use game_fabric_server::protocol::{CreateRoomRequest, RoomStatus};
use game_fabric_server::server::GameFabricServer;
use std::sync::Arc;
use std::sync::atomic::Ordering;
use test_helpers::create_test_server;
use uuid::Uuid;

async fn connect(server: &Arc<GameFabricServer>, user_id: Uuid) -> Uuid {
    let handle_id = Uuid::new_v4();
    let handle = ClientHandle {
        id: handle_id,
        user_id,
        remote_addr: "127.0.0.1:9000".parse().unwrap(),
    };
    server.hub.accept(handle, 32).await.expect("hub should admit a fresh handle");
    handle_id
}

fn new_room_request() -> CreateRoomRequest {
    CreateRoomRequest {
        game_type: "bull".to_string(),
        room_type: "quick".to_string(),
        base_bet: 10,
        max_players: 2,
        password: None,
    }
}

#[tokio::test]
async fn two_players_join_ready_up_and_start_a_game() {
    let server = create_test_server().await;
    let owner = Uuid::new_v4();
    let guest = Uuid::new_v4();

    let owner_handle = connect(&server, owner).await;
    let room = server
        .coordinator
        .create(owner, new_room_request())
        .await
        .expect("owner should be able to create a room");
    server.hub.join_room(owner_handle, room.room_id.clone()).await;

    let guest_handle = connect(&server, guest).await;
    server
        .coordinator
        .join(guest, &room.room_id, None)
        .await
        .expect("guest should be able to join the open room");
    server.hub.join_room(guest_handle, room.room_id.clone()).await;

    assert_eq!(server.hub.current_room(owner_handle).await, Some(room.room_id.clone()));
    assert_eq!(server.hub.current_room(guest_handle).await, Some(room.room_id.clone()));

    server.coordinator.set_ready(owner, &room.room_id, true).await.unwrap();
    server.coordinator.set_ready(guest, &room.room_id, true).await.unwrap();

    let started = server
        .coordinator
        .start(owner, &room.room_id)
        .await
        .expect("both players ready should allow the owner to start");
    assert_eq!(started.status, RoomStatus::InGame);

    let state = server
        .coordinator
        .get_game_state(&room.room_id)
        .await
        .expect("a started room should have dealt game state");
    assert_eq!(state.players.len(), 2);
    assert!(state.players.values().all(|p| !p.private_cards.is_empty()));

    assert_eq!(server.metrics.rooms_created.load(Ordering::Relaxed), 1);
    assert_eq!(server.metrics.joins.load(Ordering::Relaxed), 1);
    assert_eq!(server.metrics.games_started.load(Ordering::Relaxed), 1);
}

#[tokio::test]
async fn leaving_an_empty_room_removes_it() {
    let server = create_test_server().await;
    let owner = Uuid::new_v4();
    let owner_handle = connect(&server, owner).await;

    let room = server.coordinator.create(owner, new_room_request()).await.unwrap();
    server.hub.join_room(owner_handle, room.room_id.clone()).await;

    server.coordinator.leave(owner, &room.room_id).await.unwrap();
    server.hub.leave_room(owner_handle).await;

    assert_eq!(server.hub.current_room(owner_handle).await, None);
    let err = server.coordinator.get_room(&room.room_id).await.unwrap_err();
    assert_eq!(err.code(), "not-found");
}

#[tokio::test]
async fn joining_a_full_room_is_rejected() {
    let server = create_test_server().await;
    let owner = Uuid::new_v4();
    let guest = Uuid::new_v4();
    let latecomer = Uuid::new_v4();

    let room = server.coordinator.create(owner, new_room_request()).await.unwrap();
    server.coordinator.join(guest, &room.room_id, None).await.unwrap();

    let err = server
        .coordinator
        .join(latecomer, &room.room_id, None)
        .await
        .expect_err("a two-player room should reject a third joiner");
    assert_eq!(err.code(), "conflict");
}

#[tokio::test]
async fn starting_before_everyone_is_ready_is_rejected() {
    let server = create_test_server().await;
    let owner = Uuid::new_v4();
    let guest = Uuid::new_v4();

    let room = server.coordinator.create(owner, new_room_request()).await.unwrap();
    server.coordinator.join(guest, &room.room_id, None).await.unwrap();
    server.coordinator.set_ready(owner, &room.room_id, true).await.unwrap();

    let err = server
        .coordinator
        .start(owner, &room.room_id)
        .await
        .expect_err("starting while a player is not ready should be rejected");
    assert_eq!(err.code(), "precondition-failed");
}
