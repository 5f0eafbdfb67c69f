//! HTTP transport: the SSE download route and the pause/resume control
//! surface.
//!
//! The download handler spawns the session controller as its own task
//! and streams the event channel back as `text/event-stream`. Dropping
//! the connection drops the channel receiver, which the controller
//! observes as cancellation at its next suspension point.

use std::sync::Arc;
use std::sync::atomic::AtomicBool;

use actix_web::http::header;
use actix_web::{App, HttpRequest, HttpResponse, HttpServer, Responder, get, post, web};
use serde::Deserialize;
use tracing::info;

use crate::api::Credential;
use crate::session::{
    ControlAck, DEFAULT_EVENT_CAPACITY, EventSink, SessionConfig, SessionDeps, SessionRegistry,
    run_session,
};

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    /// Session collaborators handed to each controller task.
    pub deps: SessionDeps,
    /// Live-session registry for the control surface.
    pub registry: Arc<SessionRegistry>,
    /// Session tuning.
    pub config: SessionConfig,
}

#[derive(Debug, Deserialize)]
struct ControlQuery {
    /// Target session; absent means every in-flight session.
    session: Option<u64>,
}

#[get("/book/{book_id}/download")]
async fn download(
    data: web::Data<AppState>,
    path: web::Path<String>,
    req: HttpRequest,
) -> HttpResponse {
    let book_id = path.into_inner();
    let cookie = req
        .headers()
        .get(header::COOKIE)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default()
        .to_string();
    let credential = Credential::new(cookie);

    let (session_id, pause_listener) = data.registry.register();
    let cancelled = Arc::new(AtomicBool::new(false));
    let (sink, rx) = EventSink::channel(DEFAULT_EVENT_CAPACITY);

    info!(session = session_id, %book_id, "download stream opened");

    let deps = data.deps.clone();
    let config = data.config.clone();
    let registry = Arc::clone(&data.registry);
    tokio::spawn(async move {
        run_session(deps, config, book_id, credential, pause_listener, cancelled, sink).await;
        registry.deregister(session_id);
    });

    let body = futures_util::stream::unfold(rx, |mut rx| async move {
        let event = rx.recv().await?;
        Some((
            Ok::<_, std::convert::Infallible>(web::Bytes::from(event.to_sse())),
            rx,
        ))
    });

    HttpResponse::Ok()
        .content_type("text/event-stream")
        .insert_header((header::CACHE_CONTROL, "no-cache"))
        .insert_header((header::ACCESS_CONTROL_ALLOW_ORIGIN, "*"))
        .streaming(body)
}

#[post("/download/pause")]
async fn pause(data: web::Data<AppState>, query: web::Query<ControlQuery>) -> impl Responder {
    let affected = data.registry.pause(query.session);
    info!(affected, target = ?query.session, "pause requested");
    HttpResponse::Ok().json(ControlAck::success())
}

#[post("/download/resume")]
async fn resume(data: web::Data<AppState>, query: web::Query<ControlQuery>) -> impl Responder {
    let affected = data.registry.resume(query.session);
    info!(affected, target = ?query.session, "resume requested");
    HttpResponse::Ok().json(ControlAck::success())
}

/// Runs the HTTP server until shutdown.
///
/// # Errors
///
/// Returns the bind or runtime error from the underlying server.
pub async fn serve(state: AppState, bind_addr: &str, port: u16) -> std::io::Result<()> {
    let data = web::Data::new(state);
    HttpServer::new(move || {
        App::new()
            .app_data(data.clone())
            .service(download)
            .service(pause)
            .service(resume)
    })
    .bind((bind_addr, port))?
    .run()
    .await
}
