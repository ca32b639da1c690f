use std::net::{SocketAddr, TcpListener};
use std::sync::Arc;
use std::time::Duration;

use futures::{SinkExt, StreamExt};
use note_relay_server::{startup, AppState, ConnectionRegistry, Settings};
use tokio::net::TcpStream;
use tokio::time::{sleep, timeout_at, Instant};
use tokio_tungstenite::{connect_async, tungstenite::Message, MaybeTlsStream, WebSocketStream};

type Client = WebSocketStream<MaybeTlsStream<TcpStream>>;

const POLL_INTERVAL: Duration = Duration::from_millis(20);
const RECV_TIMEOUT: Duration = Duration::from_secs(3);
const QUIET_PERIOD: Duration = Duration::from_millis(300);

struct TestServer {
    addr: SocketAddr,
    registry: Arc<ConnectionRegistry>,
}

impl TestServer {
    fn spawn() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").expect("Failed to bind random port");
        let addr = listener.local_addr().unwrap();

        let mut settings = Settings::with_defaults().expect("Failed to load test config");
        settings.server.workers = 1;
        // Keep server pings out of the way of the assertions below.
        settings.websocket.heartbeat_interval_secs = 30;
        settings.websocket.client_timeout_secs = 60;

        let state = AppState::new(settings);
        let registry = state.registry.clone();
        let server = startup::run(listener, state).expect("Failed to start server");
        actix_rt::spawn(server);

        Self { addr, registry }
    }

    async fn connect(&self) -> Client {
        let (client, _) = connect_async(format!("ws://{}/ws", self.addr))
            .await
            .expect("Failed to connect");
        client
    }

    async fn wait_for_connections(&self, expected: usize) {
        let deadline = Instant::now() + RECV_TIMEOUT;
        while self.registry.connection_count().await != expected {
            assert!(
                Instant::now() < deadline,
                "Timed out waiting for {} connections, have {}",
                expected,
                self.registry.connection_count().await
            );
            sleep(POLL_INTERVAL).await;
        }
    }
}

/// Next text frame, skipping control frames. `None` if nothing arrives in time.
async fn next_text(client: &mut Client, wait: Duration) -> Option<String> {
    let deadline = Instant::now() + wait;
    loop {
        match timeout_at(deadline, client.next()).await {
            Ok(Some(Ok(Message::Text(text)))) => return Some(text),
            Ok(Some(Ok(_))) => continue,
            _ => return None,
        }
    }
}

async fn send(client: &mut Client, text: &str) {
    client.send(Message::Text(text.to_string())).await.expect("Failed to send");
}

#[actix_web::test]
async fn test_three_clients_scenario() {
    let server = TestServer::spawn();
    let mut c1 = server.connect().await;
    let mut c2 = server.connect().await;
    let mut c3 = server.connect().await;
    server.wait_for_connections(3).await;

    let c4 = r#"{"type":"note","payload":{"key":"C4","velocity":90}}"#;
    send(&mut c1, c4).await;

    assert_eq!(next_text(&mut c2, RECV_TIMEOUT).await.as_deref(), Some(c4));
    assert_eq!(next_text(&mut c3, RECV_TIMEOUT).await.as_deref(), Some(c4));
    assert_eq!(next_text(&mut c1, QUIET_PERIOD).await, None);

    c2.close(None).await.expect("Failed to close");
    drop(c2);
    server.wait_for_connections(2).await;

    let d4 = r#"{"type":"note","payload":{"key":"D4","velocity":70}}"#;
    send(&mut c3, d4).await;

    assert_eq!(next_text(&mut c1, RECV_TIMEOUT).await.as_deref(), Some(d4));
    assert_eq!(next_text(&mut c3, QUIET_PERIOD).await, None);
}

#[actix_web::test]
async fn test_each_peer_receives_exactly_once() {
    let server = TestServer::spawn();
    let mut a = server.connect().await;
    let mut b = server.connect().await;
    server.wait_for_connections(2).await;

    let note = r#"{"type":"note","payload":{ "key" : "E4" }}"#;
    send(&mut a, note).await;

    assert_eq!(next_text(&mut b, RECV_TIMEOUT).await.as_deref(), Some(note));
    assert_eq!(next_text(&mut b, QUIET_PERIOD).await, None);
}

#[actix_web::test]
async fn test_unroutable_frames_do_not_drop_the_sender() {
    let server = TestServer::spawn();
    let mut a = server.connect().await;
    let mut b = server.connect().await;
    server.wait_for_connections(2).await;

    send(&mut a, "not json at all").await;
    send(&mut a, r#"{"type":"chat","payload":"hi"}"#).await;
    a.send(Message::Binary(vec![1, 2, 3])).await.unwrap();

    let note = r#"{"type":"note","payload":"F4"}"#;
    send(&mut a, note).await;

    // Only the note comes through, and `a` is still registered.
    assert_eq!(next_text(&mut b, RECV_TIMEOUT).await.as_deref(), Some(note));
    assert_eq!(server.registry.connection_count().await, 2);
}

#[actix_web::test]
async fn test_notes_from_one_sender_arrive_in_order() {
    let server = TestServer::spawn();
    let mut a = server.connect().await;
    let mut b = server.connect().await;
    server.wait_for_connections(2).await;

    let notes: Vec<String> = (0..20)
        .map(|i| format!(r#"{{"type":"note","payload":{}}}"#, i))
        .collect();
    for note in &notes {
        send(&mut a, note).await;
    }

    for note in &notes {
        assert_eq!(next_text(&mut b, RECV_TIMEOUT).await.as_ref(), Some(note));
    }
}

#[actix_web::test]
async fn test_abrupt_disconnect_is_unregistered() {
    let server = TestServer::spawn();
    let mut a = server.connect().await;
    let b = server.connect().await;
    server.wait_for_connections(2).await;

    // No close handshake, just drop the socket.
    drop(b);
    server.wait_for_connections(1).await;

    send(&mut a, r#"{"type":"note","payload":1}"#).await;
    assert_eq!(next_text(&mut a, QUIET_PERIOD).await, None);
    assert_eq!(server.registry.connection_count().await, 1);
}
