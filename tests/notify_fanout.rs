//! Exercises the cross-instance notify path end to end: a real bound HTTP
//! listener serving the router, this instance's own record registered
//! against it, and a room creation whose notify dispatch round-trips
//! through `POST /internal/room/notify` back into a hub-held connection.

mod test_helpers;

use game_fabric_server::hub::ClientHandle;
use game_fabric_server::protocol::CreateRoomRequest;
use game_fabric_server::registry::{ServiceRecord, ServiceRecordMeta};
use game_fabric_server::server::SERVICE_NAME;
use game_fabric_server::websocket;
use std::time::Duration;
use test_helpers::create_test_server;
use uuid::Uuid;

#[tokio::test]
async fn room_created_notify_round_trips_over_http_into_local_hub() {
    let server = create_test_server().await;

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let app = websocket::router().with_state(server.clone());
    tokio::spawn(async move {
        axum::serve(listener, app.into_make_service()).await.unwrap();
    });

    server
        .registry
        .register(
            ServiceRecord {
                service_name: SERVICE_NAME.to_string(),
                instance_id: server.instance_id,
                address: addr.ip().to_string(),
                port: addr.port(),
                meta: ServiceRecordMeta {
                    machine_id: "test".to_string(),
                    version: "0.0.0".to_string(),
                },
                lease_expires_at: None,
            },
            Duration::from_secs(30),
        )
        .await
        .expect("registering this instance's own record should succeed");

    let lobby_user = Uuid::new_v4();
    let lobby_handle_id = Uuid::new_v4();
    let mut egress = server
        .hub
        .accept(
            ClientHandle {
                id: lobby_handle_id,
                user_id: lobby_user,
                remote_addr: "127.0.0.1:9001".parse().unwrap(),
            },
            32,
        )
        .await
        .expect("hub should admit the lobby-watching connection");

    let owner = Uuid::new_v4();
    server
        .coordinator
        .create(
            owner,
            CreateRoomRequest {
                game_type: "bull".to_string(),
                room_type: "quick".to_string(),
                base_bet: 10,
                max_players: 4,
                password: None,
            },
        )
        .await
        .expect("room creation should succeed");

    // `room_created` fans out lobby-wide, so a connection that never joined
    // any room still receives it — the notify dispatch runs on the worker
    // pool, so give it a moment to land.
    let frame = tokio::time::timeout(Duration::from_secs(2), egress.0.recv())
        .await
        .expect("notify should arrive within the timeout")
        .expect("egress channel should still be open");

    let envelope: serde_json::Value = serde_json::from_str(&frame).unwrap();
    assert_eq!(envelope["type"], "room_created");

    assert_eq!(server.metrics.notify_failures.load(std::sync::atomic::Ordering::Relaxed), 0);
}
