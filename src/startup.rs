use std::net::TcpListener;

use actix_cors::Cors;
use actix_files::Files;
use actix_web::dev::Server;
use actix_web::middleware::Condition;
use actix_web::{web, App, HttpRequest, HttpResponse, HttpServer};
use actix_web_actors::ws;
use tracing::{info, warn};

use crate::error::WebSocketError;
use crate::websocket::RelaySession;
use crate::{health_check, AppState, Settings};

/// WebSocket connection handler
/// This upgrades the HTTP connection to a relay session
async fn websocket_route(
    req: HttpRequest,
    stream: web::Payload,
    state: web::Data<AppState>,
) -> crate::Result<HttpResponse> {
    let peer_addr = req.peer_addr()
        .map(|addr| addr.to_string())
        .unwrap_or_else(|| "unknown".to_string());

    info!("New WebSocket connection request from: {}", peer_addr);

    ws::start(
        RelaySession::new(
            state.registry.clone(),
            state.relay.clone(),
            &state.config.websocket,
            peer_addr.clone(),
        ),
        &req,
        stream,
    )
    .map_err(|e| {
        warn!("Rejected WebSocket handshake from {}: {}", peer_addr, e);
        WebSocketError::HandshakeError(e.to_string()).into()
    })
}

/// Mounts the websocket endpoint, the health probe and the static assets.
/// Static files go last since they are mounted at the root.
pub fn configure(cfg: &mut web::ServiceConfig, settings: &Settings) {
    cfg.route(&settings.websocket.path, web::get().to(websocket_route))
        .route("/health", web::get().to(health_check))
        .service(
            Files::new("/", &settings.static_files.dir)
                .index_file(settings.static_files.index_file.clone()),
        );
}

/// Builds the HTTP server on an already bound listener. The returned server
/// runs until awaited to completion or stopped by a signal.
pub fn run(listener: TcpListener, state: AppState) -> crate::Result<Server> {
    let settings = state.config.clone();
    let workers = (settings.server.workers as usize).max(1);
    let state = web::Data::new(state);

    let server = HttpServer::new(move || {
        // Any origin, so the websocket upgrade still passes when CORS is enabled.
        let cors = Cors::default()
            .allow_any_origin()
            .allow_any_method()
            .allow_any_header()
            .max_age(settings.cors.max_age);

        App::new()
            .wrap(Condition::new(settings.cors.enabled, cors))
            .app_data(state.clone())
            .configure(|cfg| configure(cfg, &settings))
    })
    .listen(listener)?
    .workers(workers)
    .run();

    Ok(server)
}
