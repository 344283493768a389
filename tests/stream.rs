//! WebSocket lifecycle test against a served instance: connect, receive
//! a tick, disconnect, and verify the sampler task is torn down.

use std::sync::Arc;
use std::time::Duration;

use futures::StreamExt;
use netdash::NetdashConfig;
use netdash::api::{AppState, router};
use serde_json::Value;
use tokio::net::TcpListener;
use tokio::time::timeout;
use tokio_tungstenite::connect_async;

#[tokio::test]
async fn streaming_session_lifecycle() {
    let state = AppState::new(Arc::new(NetdashConfig::default())).unwrap();
    let monitor = state.monitor();
    let app = router(state);

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    let url = format!("ws://{addr}/ws/network-monitor/");
    let (mut socket, _response) = connect_async(url).await.expect("websocket connect");

    // The session registers inside the upgrade task, which may lag the
    // client handshake by a beat.
    let mut waited = Duration::ZERO;
    while monitor.session_count() != 1 && waited < Duration::from_secs(5) {
        tokio::time::sleep(Duration::from_millis(50)).await;
        waited += Duration::from_millis(50);
    }
    assert_eq!(monitor.session_count(), 1);

    // The first tick arrives one sampling interval (2s by default) after
    // connect; either a delta or a single diagnostic payload is valid.
    let message = timeout(Duration::from_secs(10), socket.next())
        .await
        .expect("no message within the sampling window")
        .expect("stream ended before the first tick")
        .expect("websocket error");
    let payload: Value = serde_json::from_str(message.to_text().unwrap()).unwrap();
    let is_delta = payload.get("bytes_sent").is_some_and(Value::is_i64)
        && payload.get("bytes_recv").is_some_and(Value::is_i64);
    let is_diagnostic = payload.get("error").is_some_and(Value::is_string);
    assert!(
        is_delta || is_diagnostic,
        "unexpected payload: {payload}"
    );

    socket.close(None).await.unwrap();
    drop(socket);

    // Disconnect must cancel the sampler and deregister the session.
    let mut waited = Duration::ZERO;
    while monitor.session_count() != 0 && waited < Duration::from_secs(5) {
        tokio::time::sleep(Duration::from_millis(100)).await;
        waited += Duration::from_millis(100);
    }
    assert_eq!(monitor.session_count(), 0);
}
