use axum::{
    extract::{Path, State},
    Json,
};
use serde_json::{Map, Value};
use tracing::info;

use service::file::pin_store::Pin;

use crate::errors::ApiError;
use crate::routes::ServerState;

/// 列出全部图钉
pub async fn list_pins(State(state): State<ServerState>) -> Json<Vec<Pin>> {
    let store = state.pins.clone();
    Json(store.list().await)
}

/// 新建图钉：请求体为任意 JSON 对象，id 与空 replies 由服务端补齐
pub async fn create_pin(
    State(state): State<ServerState>,
    Json(payload): Json<Map<String, Value>>,
) -> Result<Json<Pin>, ApiError> {
    let store = state.pins.clone();
    let pin = store.create(payload).await?;
    info!(id = pin.id, "created pin");
    Ok(Json(pin))
}

/// 追加回复；图钉不存在时返回 404
pub async fn add_reply(
    State(state): State<ServerState>,
    Path(pin_id): Path<u64>,
    Json(payload): Json<Value>,
) -> Result<Json<Pin>, ApiError> {
    let store = state.pins.clone();
    let pin = store.add_reply(pin_id, payload).await?;
    info!(id = pin.id, replies = pin.replies.len(), "appended reply");
    Ok(Json(pin))
}
