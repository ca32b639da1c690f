use std::sync::Arc;
use std::time::{Duration, Instant};

use actix::prelude::*;
use actix_web_actors::ws;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::config::WebSocketConfig;
use crate::websocket::{BroadcastRelay, ConnectionHandle, ConnectionRegistry, Event};

/// Websocket session actor for one relay client.
///
/// Registers itself when started and unregisters when stopped, whatever the
/// cause: client close, protocol error or heartbeat timeout.
pub struct RelaySession {
    id: Uuid,
    peer_addr: String,
    hb: Instant,
    heartbeat_interval: Duration,
    client_timeout: Duration,
    registry: Arc<ConnectionRegistry>,
    relay: Arc<BroadcastRelay>,
}

impl RelaySession {
    pub fn new(
        registry: Arc<ConnectionRegistry>,
        relay: Arc<BroadcastRelay>,
        config: &WebSocketConfig,
        peer_addr: String,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            peer_addr,
            hb: Instant::now(),
            heartbeat_interval: config.heartbeat_interval(),
            client_timeout: config.client_timeout(),
            registry,
            relay,
        }
    }

    fn handle_text(&mut self, text: &str, ctx: &mut <Self as Actor>::Context) {
        let event = match Event::from_text(text) {
            Ok(event) => event,
            Err(e) => {
                warn!("Dropping unroutable frame from {} (id: {}): {}", self.peer_addr, self.id, e);
                return;
            }
        };

        let relay = self.relay.clone();
        let from = self.id;
        // Finish this fan-out before reading the next frame so peers see our notes in order.
        ctx.wait(
            async move {
                relay.dispatch(from, event).await;
            }
            .into_actor(self),
        );
    }

    fn start_heartbeat(&self, ctx: &mut <Self as Actor>::Context) {
        ctx.run_interval(self.heartbeat_interval, |act, ctx| {
            if Instant::now().duration_since(act.hb) > act.client_timeout {
                warn!("Heartbeat timeout for {} (id: {})", act.peer_addr, act.id);
                ctx.stop();
                return;
            }
            ctx.ping(b"");
        });
    }
}

impl Actor for RelaySession {
    type Context = ws::WebsocketContext<Self>;

    fn started(&mut self, ctx: &mut Self::Context) {
        info!("WebSocket connection established with {} (id: {})", self.peer_addr, self.id);

        self.start_heartbeat(ctx);

        let (tx, rx) = mpsc::unbounded_channel::<String>();
        let outbound = futures::stream::unfold(rx, |mut rx| async move {
            rx.recv().await.map(|frame| (frame, rx))
        });
        ctx.add_stream(Box::pin(outbound));

        let registry = self.registry.clone();
        let handle = ConnectionHandle::new(self.id, tx);
        ctx.wait(
            async move {
                registry.register(handle).await;
            }
            .into_actor(self),
        );
    }

    fn stopped(&mut self, _ctx: &mut Self::Context) {
        info!("WebSocket connection closed with {} (id: {})", self.peer_addr, self.id);

        let registry = self.registry.clone();
        let id = self.id;
        actix_rt::spawn(async move {
            registry.unregister(&id).await;
        });
    }
}

/// Frames arriving from the client.
impl StreamHandler<Result<ws::Message, ws::ProtocolError>> for RelaySession {
    fn handle(&mut self, msg: Result<ws::Message, ws::ProtocolError>, ctx: &mut Self::Context) {
        match msg {
            Ok(ws::Message::Ping(msg)) => {
                self.hb = Instant::now();
                ctx.pong(&msg);
            }
            Ok(ws::Message::Pong(_)) => {
                self.hb = Instant::now();
            }
            Ok(ws::Message::Text(text)) => {
                self.hb = Instant::now();
                self.handle_text(&text, ctx);
            }
            Ok(ws::Message::Binary(bin)) => {
                self.hb = Instant::now();
                debug!("Ignoring binary frame from {} of {} bytes", self.peer_addr, bin.len());
            }
            Ok(ws::Message::Close(reason)) => {
                info!("WebSocket closed from {}: {:?}", self.peer_addr, reason);
                ctx.close(reason);
                ctx.stop();
            }
            Ok(_) => {}
            Err(e) => {
                error!("Error handling WebSocket message from {}: {}", self.peer_addr, e);
                ctx.stop();
            }
        }
    }
}

/// Frames queued by the relay for this client.
impl StreamHandler<String> for RelaySession {
    fn handle(&mut self, frame: String, ctx: &mut Self::Context) {
        ctx.text(frame);
    }

    fn finished(&mut self, _ctx: &mut Self::Context) {
        debug!("Outbox closed for connection {}", self.id);
    }
}
