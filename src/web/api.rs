use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::{Json, Response},
};
use chrono::Local;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::info;

use super::AppState;
use crate::errors::AppError;
use crate::export::{self, ExportMode};
use crate::groups;
use crate::ingest;
use crate::models::*;

pub async fn health_check() -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "timestamp": chrono::Utc::now().to_rfc3339(),
    }))
}

// Playlist API

pub async fn list_playlists(
    State(state): State<AppState>,
) -> Result<Json<Vec<PlaylistSummary>>, AppError> {
    let playlists = state.database.list_playlists().await?;
    Ok(Json(playlists))
}

pub async fn import_playlist(
    State(state): State<AppState>,
    Json(payload): Json<ImportPlaylistRequest>,
) -> Result<Json<Playlist>, AppError> {
    let content = resolve_content(&state, payload.content, payload.url.as_deref()).await?;
    let channels = ingest::parse_playlist(&content)?;

    let name = payload
        .name
        .filter(|n| !n.trim().is_empty())
        .unwrap_or_else(|| "Untitled Playlist".to_string());

    let playlist = state
        .database
        .create_playlist(&name, payload.url.as_deref(), &channels)
        .await?;
    Ok(Json(playlist))
}

pub async fn get_playlist(
    Path(id): Path<i64>,
    State(state): State<AppState>,
) -> Result<Json<PlaylistWithChannels>, AppError> {
    match state.database.get_playlist_with_channels(id).await? {
        Some(playlist) => Ok(Json(playlist)),
        None => Err(AppError::not_found("playlist", id)),
    }
}

/// Re-import: replaces every channel and resets the group-order preference.
pub async fn reimport_playlist(
    Path(id): Path<i64>,
    State(state): State<AppState>,
    Json(payload): Json<ReimportPlaylistRequest>,
) -> Result<Json<Value>, AppError> {
    let content = resolve_content(&state, payload.content, payload.url.as_deref()).await?;
    let channels = ingest::parse_playlist(&content)?;

    if !state
        .database
        .replace_playlist_channels(id, payload.url.as_deref(), &channels)
        .await?
    {
        return Err(AppError::not_found("playlist", id));
    }
    Ok(Json(json!({ "success": true })))
}

pub async fn rename_playlist(
    Path(id): Path<i64>,
    State(state): State<AppState>,
    Json(payload): Json<RenamePlaylistRequest>,
) -> Result<Json<Playlist>, AppError> {
    if payload.name.trim().is_empty() {
        return Err(AppError::validation("name is required"));
    }

    match state.database.rename_playlist(id, payload.name.trim()).await? {
        Some(playlist) => Ok(Json(playlist)),
        None => Err(AppError::not_found("playlist", id)),
    }
}

pub async fn delete_playlist(
    Path(id): Path<i64>,
    State(state): State<AppState>,
) -> Result<StatusCode, AppError> {
    if state.database.delete_playlist(id).await? {
        info!("Deleted playlist ({})", id);
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::not_found("playlist", id))
    }
}

// Channel API

pub async fn create_channel(
    Path(id): Path<i64>,
    State(state): State<AppState>,
    Json(payload): Json<CreateChannelRequest>,
) -> Result<Json<Channel>, AppError> {
    if payload.name.trim().is_empty() || payload.url.trim().is_empty() {
        return Err(AppError::validation("name and url are required"));
    }

    match state.database.create_channel(id, &payload).await? {
        Some(channel) => Ok(Json(channel)),
        None => Err(AppError::not_found("playlist", id)),
    }
}

pub async fn update_channel(
    Path(id): Path<i64>,
    State(state): State<AppState>,
    Json(payload): Json<UpdateChannelRequest>,
) -> Result<Json<Channel>, AppError> {
    match state.database.update_channel(id, &payload).await? {
        Some(channel) => Ok(Json(channel)),
        None => Err(AppError::not_found("channel", id)),
    }
}

pub async fn delete_channel(
    Path(id): Path<i64>,
    State(state): State<AppState>,
) -> Result<Json<Value>, AppError> {
    if state.database.delete_channel(id).await? {
        Ok(Json(json!({ "success": true })))
    } else {
        Err(AppError::not_found("channel", id))
    }
}

pub async fn batch_channels(
    State(state): State<AppState>,
    Json(payload): Json<BatchChannelRequest>,
) -> Result<Json<Value>, AppError> {
    if payload.ids.is_empty() {
        return Err(AppError::validation("ids must be a non-empty array"));
    }

    match payload.action {
        BatchAction::Move => {
            let group_title = payload
                .data
                .as_ref()
                .and_then(|d| d.group_title.as_deref())
                .ok_or_else(|| AppError::validation("data.groupTitle is required for move"))?;
            state
                .database
                .batch_move_channels(&payload.ids, group_title)
                .await?;
        }
        BatchAction::Delete => {
            state.database.batch_delete_channels(&payload.ids).await?;
        }
    }

    Ok(Json(json!({ "success": true })))
}

pub async fn sort_channels(
    Path(id): Path<i64>,
    State(state): State<AppState>,
    Json(payload): Json<SortChannelsRequest>,
) -> Result<Json<Value>, AppError> {
    if state.database.get_playlist(id).await?.is_none() {
        return Err(AppError::not_found("playlist", id));
    }

    state
        .database
        .reorder_channels(id, &payload.channel_ids)
        .await?;
    Ok(Json(json!({ "success": true })))
}

// Ordering / visibility metadata

pub async fn set_group_order(
    Path(id): Path<i64>,
    State(state): State<AppState>,
    Json(payload): Json<GroupOrderRequest>,
) -> Result<Json<Value>, AppError> {
    if !state.database.set_group_order(id, &payload.group_order).await? {
        return Err(AppError::not_found("playlist", id));
    }
    Ok(Json(json!({ "success": true })))
}

pub async fn set_hidden_groups(
    Path(id): Path<i64>,
    State(state): State<AppState>,
    Json(payload): Json<HiddenGroupsRequest>,
) -> Result<Json<Playlist>, AppError> {
    let hidden = groups::sanitize_hidden_groups(payload.hidden_groups);

    if !state.database.set_hidden_groups(id, &hidden).await? {
        return Err(AppError::not_found("playlist", id));
    }
    fetch_playlist(&state, id).await.map(Json)
}

pub async fn set_hidden_channels(
    Path(id): Path<i64>,
    State(state): State<AppState>,
    Json(payload): Json<HiddenChannelsRequest>,
) -> Result<Json<Playlist>, AppError> {
    if !state
        .database
        .set_hidden_channels(id, &payload.hidden_channels)
        .await?
    {
        return Err(AppError::not_found("playlist", id));
    }
    fetch_playlist(&state, id).await.map(Json)
}

pub async fn rename_group(
    Path(id): Path<i64>,
    State(state): State<AppState>,
    Json(payload): Json<RenameGroupRequest>,
) -> Result<Json<Value>, AppError> {
    if payload.to.trim().is_empty() {
        return Err(AppError::validation("new group name is required"));
    }

    if !state
        .database
        .rename_group(id, &payload.from, payload.to.trim())
        .await?
    {
        return Err(AppError::not_found("playlist", id));
    }
    Ok(Json(json!({ "success": true })))
}

pub async fn delete_group(
    Path(id): Path<i64>,
    State(state): State<AppState>,
    Json(payload): Json<DeleteGroupRequest>,
) -> Result<Json<Value>, AppError> {
    if !state.database.delete_group(id, &payload.name).await? {
        return Err(AppError::not_found("playlist", id));
    }
    Ok(Json(json!({ "success": true })))
}

// Export API

#[derive(Debug, Deserialize)]
pub struct ExportQuery {
    pub full: Option<String>,
    pub download: Option<String>,
}

pub async fn export_playlist(
    Path(id): Path<i64>,
    Query(query): Query<ExportQuery>,
    State(state): State<AppState>,
) -> Result<Response<String>, AppError> {
    let mode = if query_flag(&query.full) {
        ExportMode::Full
    } else {
        ExportMode::Current
    };

    let Some(with_channels) = state.database.get_playlist_with_channels(id).await? else {
        return Err(AppError::not_found("playlist", id));
    };

    let m3u = export::export_playlist(&with_channels.playlist, with_channels.channels, mode)?;

    let builder = Response::builder()
        .header(header::ACCESS_CONTROL_ALLOW_ORIGIN, "*")
        .header(
            header::CACHE_CONTROL,
            "no-store, no-cache, must-revalidate, proxy-revalidate",
        );

    let response = if query_flag(&query.download) {
        let filename = export::export_filename(
            &with_channels.playlist.name,
            mode,
            Local::now().date_naive(),
        );
        builder
            .header(header::CONTENT_TYPE, "application/vnd.apple.mpegurl")
            .header(
                header::CONTENT_DISPOSITION,
                format!(
                    "attachment; filename*=UTF-8''{}",
                    urlencoding::encode(&filename)
                ),
            )
            .body(m3u)
    } else {
        builder
            .header(header::CONTENT_TYPE, "text/plain; charset=utf-8")
            .body(m3u)
    };

    response.map_err(|e| AppError::validation(format!("failed to build response: {}", e)))
}

// Backup API

pub async fn list_backups(
    State(state): State<AppState>,
) -> Result<Json<Vec<BackupInfo>>, AppError> {
    let backups = state.backup.list().await?;
    Ok(Json(backups))
}

pub async fn create_backup(State(state): State<AppState>) -> Result<Json<BackupInfo>, AppError> {
    let backup = state.backup.create().await?;
    Ok(Json(backup))
}

pub async fn delete_backup(
    Path(filename): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<Value>, AppError> {
    state.backup.delete(&filename).await?;
    Ok(Json(json!({ "success": true })))
}

pub async fn restore_backup(
    Path(filename): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<Value>, AppError> {
    state.backup.restore(&filename).await?;
    Ok(Json(json!({ "success": true })))
}

// Helpers

/// Inline content wins over a URL; with neither the request is invalid.
async fn resolve_content(
    state: &AppState,
    content: Option<String>,
    url: Option<&str>,
) -> Result<String, AppError> {
    match content {
        Some(content) if !content.trim().is_empty() => Ok(content),
        _ => match url {
            Some(url) if !url.trim().is_empty() => state.fetcher.fetch(url.trim()).await,
            _ => Err(AppError::validation("no content provided")),
        },
    }
}

/// Query flags accept bare presence (`?full`) and truthy values.
fn query_flag(value: &Option<String>) -> bool {
    match value.as_deref() {
        Some(v) => !matches!(v, "0" | "false" | "no"),
        None => false,
    }
}

async fn fetch_playlist(state: &AppState, id: i64) -> Result<Playlist, AppError> {
    state
        .database
        .get_playlist(id)
        .await?
        .ok_or_else(|| AppError::not_found("playlist", id))
}
