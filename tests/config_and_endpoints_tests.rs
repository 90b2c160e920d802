mod test_helpers;

use game_fabric_server::protocol::CreateRoomRequest;
use game_fabric_server::websocket;
use test_helpers::create_test_server;
use uuid::Uuid;

#[tokio::test]
async fn health_endpoint_returns_ok() {
    let server = create_test_server().await;
    let app = websocket::router().with_state(server);
    let test_server = axum_test::TestServer::new(app).expect("test server should start");

    let response = test_server.get("/health").await;
    response.assert_status_ok();
    response.assert_text("ok");
}

#[tokio::test]
async fn metrics_endpoint_requires_no_auth_and_reflects_room_counters() {
    let server = create_test_server().await;
    server
        .coordinator
        .create(
            Uuid::new_v4(),
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

    let app = websocket::router().with_state(server);
    let test_server = axum_test::TestServer::new(app).expect("test server should start");

    let response = test_server.get("/metrics").await;
    response.assert_status_ok();

    let body: serde_json::Value = response.json();
    assert_eq!(body["rooms"]["created"], 1);
    assert_eq!(body["rooms"]["active"], 1);
}

#[tokio::test]
async fn websocket_route_without_upgrade_headers_is_not_served() {
    // A plain GET carries none of the `Connection`/`Upgrade`/`Sec-WebSocket-*`
    // headers axum's `WebSocketUpgrade` extractor requires, so this never
    // even reaches the token check — it only confirms the route is mounted
    // and does not silently 404.
    let server = create_test_server().await;
    let app = websocket::router().with_state(server);
    let test_server = axum_test::TestServer::new(app).expect("test server should start");

    let response = test_server.get("/ws").await;
    assert_ne!(response.status_code(), axum::http::StatusCode::NOT_FOUND);
}
