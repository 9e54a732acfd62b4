//! HTTP route handlers.
//!
//! All handlers are thin - they delegate to [`SessionManager`] for business
//! logic and report failures as [`PlaybackError`] JSON bodies.
//!
//! [`SessionManager`]: crate::services::SessionManager
//! [`PlaybackError`]: crate::error::PlaybackError

use std::convert::Infallible;
use std::time::Duration;

use axum::{
    extract::{Path, Query, State},
    response::{
        sse::{Event, KeepAlive, Sse},
        IntoResponse,
    },
    routing::{delete, get, post},
    Json, Router,
};
use futures::stream::{Stream, StreamExt};
use serde::Deserialize;
use serde_json::json;
use tokio_stream::wrappers::errors::BroadcastStreamRecvError;
use tokio_stream::wrappers::BroadcastStream;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use uuid::Uuid;

use crate::api::response::{api_ok, api_success};
use crate::api::AppState;
use crate::error::PlaybackResult;
use crate::playlist::PlaylistId;
use crate::types::{ChannelId, SpaceId, UserId};

const SSE_KEEP_ALIVE: Duration = Duration::from_secs(15);

// ─────────────────────────────────────────────────────────────────────────────
// Request Types
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Deserialize)]
struct PlayRequest {
    user: UserId,
    /// Caller's current voice channel; absent when not in one.
    #[serde(default)]
    channel: Option<ChannelId>,
    query: String,
}

#[derive(Deserialize)]
struct VolumeRequest {
    volume: u8,
}

#[derive(Deserialize)]
struct ListenersRequest {
    listeners: usize,
}

#[derive(Deserialize)]
struct UserQuery {
    user: UserId,
}

#[derive(Deserialize)]
struct CreatePlaylistRequest {
    user: UserId,
    name: String,
}

#[derive(Deserialize)]
struct PlayPlaylistRequest {
    user: UserId,
    #[serde(default)]
    channel: Option<ChannelId>,
}

// ─────────────────────────────────────────────────────────────────────────────
// Router
// ─────────────────────────────────────────────────────────────────────────────

/// Creates the Axum router with all routes.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/api/events", get(event_stream))
        .route("/api/guilds", get(list_spaces))
        .route("/api/guilds/{space}", delete(remove_space).get(session_status))
        .route("/api/guilds/{space}/play", post(play))
        .route("/api/guilds/{space}/pause", post(pause))
        .route("/api/guilds/{space}/resume", post(resume))
        .route("/api/guilds/{space}/skip", post(skip))
        .route("/api/guilds/{space}/stop", post(stop))
        .route("/api/guilds/{space}/queue", get(queue))
        .route(
            "/api/guilds/{space}/volume",
            get(get_volume).put(set_volume),
        )
        .route("/api/guilds/{space}/listeners", post(listeners_changed))
        .route(
            "/api/guilds/{space}/playlists",
            get(list_playlists).post(create_playlist),
        )
        .route(
            "/api/guilds/{space}/playlists/{id}",
            get(show_playlist).delete(delete_playlist),
        )
        .route(
            "/api/guilds/{space}/playlists/{id}/play",
            post(play_playlist),
        )
        .route(
            "/api/guilds/{space}/playlists/{id}/tracks",
            post(add_current_to_playlist),
        )
        .route(
            "/api/guilds/{space}/playlists/{id}/tracks/{number}",
            delete(remove_from_playlist),
        )
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

// ─────────────────────────────────────────────────────────────────────────────
// Handlers
// ─────────────────────────────────────────────────────────────────────────────

async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    api_success(json!({
        "status": "ok",
        "service": "cadenza",
        "sessions": state.manager.spaces().len(),
    }))
}

async fn list_spaces(State(state): State<AppState>) -> impl IntoResponse {
    api_success(state.manager.spaces())
}

async fn session_status(
    Path(space): Path<SpaceId>,
    State(state): State<AppState>,
) -> impl IntoResponse {
    api_success(state.manager.session_snapshot(&space).await)
}

async fn remove_space(
    Path(space): Path<SpaceId>,
    State(state): State<AppState>,
) -> impl IntoResponse {
    state.manager.guild_removed(&space).await;
    api_ok()
}

async fn play(
    Path(space): Path<SpaceId>,
    State(state): State<AppState>,
    Json(payload): Json<PlayRequest>,
) -> PlaybackResult<impl IntoResponse> {
    let outcome = state
        .manager
        .play(&space, &payload.user, payload.channel, &payload.query)
        .await?;
    Ok(api_success(outcome))
}

async fn pause(
    Path(space): Path<SpaceId>,
    State(state): State<AppState>,
) -> PlaybackResult<impl IntoResponse> {
    state.manager.pause(&space).await?;
    Ok(api_ok())
}

async fn resume(
    Path(space): Path<SpaceId>,
    State(state): State<AppState>,
) -> PlaybackResult<impl IntoResponse> {
    state.manager.resume(&space).await?;
    Ok(api_ok())
}

async fn skip(
    Path(space): Path<SpaceId>,
    State(state): State<AppState>,
) -> PlaybackResult<impl IntoResponse> {
    state.manager.skip(&space).await?;
    Ok(api_ok())
}

async fn stop(
    Path(space): Path<SpaceId>,
    State(state): State<AppState>,
) -> PlaybackResult<impl IntoResponse> {
    state.manager.stop(&space).await?;
    Ok(api_ok())
}

async fn queue(Path(space): Path<SpaceId>, State(state): State<AppState>) -> impl IntoResponse {
    api_success(state.manager.queue_snapshot(&space).await)
}

async fn get_volume(
    Path(space): Path<SpaceId>,
    State(state): State<AppState>,
) -> impl IntoResponse {
    let volume = state.manager.volume(&space).await;
    api_success(json!({ "space": space, "volume": volume }))
}

async fn set_volume(
    Path(space): Path<SpaceId>,
    State(state): State<AppState>,
    Json(payload): Json<VolumeRequest>,
) -> PlaybackResult<impl IntoResponse> {
    state.manager.set_volume(&space, payload.volume).await?;
    Ok(api_success(json!({ "space": space, "volume": payload.volume })))
}

async fn listeners_changed(
    Path(space): Path<SpaceId>,
    State(state): State<AppState>,
    Json(payload): Json<ListenersRequest>,
) -> impl IntoResponse {
    state.manager.listeners_changed(&space, payload.listeners);
    api_ok()
}

async fn list_playlists(
    Path(space): Path<SpaceId>,
    State(state): State<AppState>,
    Query(query): Query<UserQuery>,
) -> PlaybackResult<impl IntoResponse> {
    let playlists = state.manager.list_playlists(&space, &query.user).await?;
    Ok(api_success(playlists))
}

async fn create_playlist(
    Path(space): Path<SpaceId>,
    State(state): State<AppState>,
    Json(payload): Json<CreatePlaylistRequest>,
) -> PlaybackResult<impl IntoResponse> {
    let playlist = state
        .manager
        .create_playlist(&space, &payload.user, &payload.name)
        .await?;
    Ok(api_success(playlist))
}

async fn show_playlist(
    Path((space, id)): Path<(SpaceId, PlaylistId)>,
    State(state): State<AppState>,
) -> PlaybackResult<impl IntoResponse> {
    Ok(api_success(state.manager.show_playlist(&space, id).await?))
}

async fn delete_playlist(
    Path((space, id)): Path<(SpaceId, PlaylistId)>,
    State(state): State<AppState>,
    Query(query): Query<UserQuery>,
) -> PlaybackResult<impl IntoResponse> {
    state
        .manager
        .delete_playlist(&space, &query.user, id)
        .await?;
    Ok(api_ok())
}

async fn play_playlist(
    Path((space, id)): Path<(SpaceId, PlaylistId)>,
    State(state): State<AppState>,
    Json(payload): Json<PlayPlaylistRequest>,
) -> PlaybackResult<impl IntoResponse> {
    let outcome = state
        .manager
        .play_playlist(&space, &payload.user, payload.channel, id)
        .await?;
    Ok(api_success(outcome))
}

async fn add_current_to_playlist(
    Path((space, id)): Path<(SpaceId, PlaylistId)>,
    State(state): State<AppState>,
    Json(payload): Json<UserQuery>,
) -> PlaybackResult<impl IntoResponse> {
    let track = state
        .manager
        .add_current_to_playlist(&space, &payload.user, id)
        .await?;
    Ok(api_success(track))
}

async fn remove_from_playlist(
    Path((space, id, number)): Path<(SpaceId, PlaylistId, usize)>,
    State(state): State<AppState>,
    Query(query): Query<UserQuery>,
) -> PlaybackResult<impl IntoResponse> {
    let track = state
        .manager
        .remove_from_playlist(&space, &query.user, id, number)
        .await?;
    Ok(api_success(track))
}

/// Streams every domain event as a server-sent event.
///
/// Slow clients that fall behind the broadcast buffer skip the missed events
/// and get a `lagged` event carrying the count.
async fn event_stream(
    State(state): State<AppState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let client_id = Uuid::new_v4();
    log::debug!("[Api] Event stream client {} connected", client_id);

    let stream = BroadcastStream::new(state.event_bridge.subscribe()).filter_map(move |res| {
        let event = match res {
            Ok(event) => Event::default().json_data(&event).ok(),
            Err(BroadcastStreamRecvError::Lagged(n)) => {
                log::warn!(
                    "[Api] Event stream client {} lagged, skipped {} event(s)",
                    client_id,
                    n
                );
                Some(Event::default().event("lagged").data(n.to_string()))
            }
        };
        futures::future::ready(event.map(Ok))
    });

    Sse::new(stream).keep_alive(KeepAlive::new().interval(SSE_KEEP_ALIVE))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::{BroadcastEventBridge, EventEmitter, SessionEvent};
    use crate::playlist::InMemoryPlaylistStore;
    use crate::resolver::test_fixtures::MockResolver;
    use crate::runtime::TokioSpawner;
    use crate::services::{SessionDeps, SessionManager};
    use crate::state::Config;
    use crate::transport::test_fixtures::MockTransport;
    use axum::http::StatusCode;
    use std::sync::Arc;
    use tokio_util::sync::CancellationToken;

    fn app_state() -> AppState {
        let config = Arc::new(Config::default());
        let bridge = Arc::new(BroadcastEventBridge::new(config.event_channel_capacity));
        let deps = SessionDeps {
            config: config.clone(),
            transport: Arc::new(MockTransport::new()),
            emitter: bridge.clone(),
            spawner: TokioSpawner::current(),
            shutdown: CancellationToken::new(),
        };
        let manager = SessionManager::new(
            deps,
            Arc::new(MockResolver::new()),
            Some(Arc::new(InMemoryPlaylistStore::new())),
        );
        AppState {
            manager: Arc::new(manager),
            event_bridge: bridge,
            config,
        }
    }

    fn space() -> Path<SpaceId> {
        Path(SpaceId::new("g1"))
    }

    #[tokio::test(start_paused = true)]
    async fn play_returns_outcome_json() {
        let state = app_state();
        let response = play(
            space(),
            State(state.clone()),
            Json(PlayRequest {
                user: UserId::new("alice"),
                channel: Some(ChannelId::new("c1")),
                query: "song".into(),
            }),
        )
        .await
        .into_response();
        assert_eq!(response.status(), StatusCode::OK);

        let queue = state.manager.queue_snapshot(&SpaceId::new("g1")).await;
        assert_eq!(queue.current.unwrap().title, "song");
    }

    #[tokio::test]
    async fn play_without_channel_is_bad_request() {
        let response = play(
            space(),
            State(app_state()),
            Json(PlayRequest {
                user: UserId::new("alice"),
                channel: None,
                query: "song".into(),
            }),
        )
        .await
        .into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn pause_on_idle_space_is_conflict() {
        let response = pause(space(), State(app_state())).await.into_response();
        assert_eq!(response.status(), StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn stop_is_always_ok() {
        let response = stop(space(), State(app_state())).await.into_response();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn out_of_range_volume_is_rejected() {
        let response = set_volume(space(), State(app_state()), Json(VolumeRequest { volume: 150 }))
            .await
            .into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn unknown_playlist_is_not_found() {
        let response = show_playlist(
            Path((SpaceId::new("g1"), PlaylistId(42))),
            State(app_state()),
        )
        .await
        .into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn events_reach_bridge_subscribers() {
        let state = app_state();
        let mut rx = state.event_bridge.subscribe();
        state.event_bridge.emit_session(SessionEvent::Paused {
            space: SpaceId::new("g1"),
            timestamp: 1,
        });
        assert!(rx.recv().await.is_ok());
    }
}
