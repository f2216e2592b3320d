use std::convert::Infallible;

use axum::{
    extract::{Query, State},
    http::{HeaderMap, StatusCode},
    response::sse::{Event, KeepAlive, Sse},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tokio_stream::{wrappers::errors::BroadcastStreamRecvError, wrappers::BroadcastStream};
use tokio_stream::{Stream, StreamExt};
use tower_http::trace::TraceLayer;

use application::{OnlineUser, RecentMessage, SubmitReceipt};
use domain::{ChatUser, EventId, Nickname, UserId};

use crate::{auth::LoginResponse, error::ApiError, state::AppState, stream::SnapshotFilter};

#[derive(Debug, Deserialize)]
struct LoginPayload {
    nickname: String,
}

#[derive(Debug, Deserialize)]
struct SendMessagePayload {
    content: String,
}

#[derive(Debug, Deserialize)]
struct EventsQuery {
    /// EventSource 无法设置请求头，允许通过查询参数传 token
    token: Option<String>,
}

#[derive(Debug, Serialize)]
struct AcceptedResponse {
    event_id: EventId,
}

#[derive(Debug, Serialize)]
struct RoomSnapshot {
    users: Vec<OnlineUser>,
    messages: Vec<RecentMessage>,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .nest("/api/v1", api_routes())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/login", post(login))
        .route("/room/join", post(join_room))
        .route("/room/leave", post(leave_room))
        .route("/room/users", get(online_users))
        .route("/room/messages", post(send_message).get(recent_messages))
        .route("/room/events", get(room_events))
}

async fn health() -> StatusCode {
    StatusCode::OK
}

async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginPayload>,
) -> Result<Json<LoginResponse>, ApiError> {
    let nickname = Nickname::parse(payload.nickname)?;
    let user = ChatUser::new(UserId::generate(), nickname);
    let token = state.session.issue(&user)?;

    tracing::info!(user_id = %user.id, nickname = %user.nickname.as_str(), "session issued");
    Ok(Json(LoginResponse { token, user }))
}

/// 等待事件落盘并分发后再返回
async fn accepted(receipt: SubmitReceipt) -> Result<(StatusCode, Json<AcceptedResponse>), ApiError> {
    let event_id = receipt.event_id();
    receipt.wait().await?;
    Ok((StatusCode::ACCEPTED, Json(AcceptedResponse { event_id })))
}

async fn join_room(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<(StatusCode, Json<AcceptedResponse>), ApiError> {
    let user = state.session.user_from_headers(&headers)?;
    let receipt = state.chat_service.join(user)?;
    accepted(receipt).await
}

async fn leave_room(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<(StatusCode, Json<AcceptedResponse>), ApiError> {
    let user = state.session.user_from_headers(&headers)?;
    let receipt = state.chat_service.leave(user)?;
    accepted(receipt).await
}

async fn send_message(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<SendMessagePayload>,
) -> Result<(StatusCode, Json<AcceptedResponse>), ApiError> {
    let user = state.session.user_from_headers(&headers)?;
    let receipt = state.chat_service.send_message(user, &payload.content)?;
    accepted(receipt).await
}

async fn online_users(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<Vec<OnlineUser>>, ApiError> {
    state.session.user_from_headers(&headers)?;
    Ok(Json(state.chat_service.online_users()))
}

async fn recent_messages(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<Vec<RecentMessage>>, ApiError> {
    state.session.user_from_headers(&headers)?;
    Ok(Json(state.chat_service.recent_messages()))
}

async fn room_events(
    State(state): State<AppState>,
    Query(query): Query<EventsQuery>,
    headers: HeaderMap,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, ApiError> {
    let user = match query.token.as_deref() {
        Some(token) => state.session.verify(token)?,
        None => state.session.user_from_headers(&headers)?,
    };

    // 先订阅再取快照，快照之后的事件不会丢失
    let receiver = state.chat_service.subscribe();
    let snapshot = RoomSnapshot {
        users: state.chat_service.online_users(),
        messages: state.chat_service.recent_messages(),
    };
    let mut filter = SnapshotFilter::new(&snapshot.users, &snapshot.messages);
    let initial = Event::default()
        .event("snapshot")
        .json_data(&snapshot)
        .map_err(|err| ApiError::internal_server_error(err.to_string()))?;

    tracing::debug!(user_id = %user.id, "event stream opened");

    let live = BroadcastStream::new(receiver).filter_map(move |item| match item {
        Ok(event) if !filter.admit(&event) => None,
        Ok(event) => match Event::default()
            .event("chat")
            .id(event.id().to_string())
            .json_data(&event)
        {
            Ok(sse_event) => Some(Ok(sse_event)),
            Err(err) => {
                tracing::warn!(error = %err, "failed to serialize chat event");
                None
            }
        },
        Err(BroadcastStreamRecvError::Lagged(skipped)) => {
            tracing::warn!(skipped, "event stream lagged behind");
            None
        }
    });

    // 服务关闭时结束实时流，否则优雅关闭会一直等待这个连接
    let live = futures_util::StreamExt::take_until(
        live,
        state.shutdown_token().cancelled_owned(),
    );
    let stream = tokio_stream::once(Ok::<_, Infallible>(initial)).chain(live);
    Ok(Sse::new(stream).keep_alive(KeepAlive::default()))
}
