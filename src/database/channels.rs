//! Channel persistence: single-channel CRUD, batch move/delete and the
//! explicit reorder operation.

use tracing::{debug, info};

use super::{map_channel_row, now_str, Database};
use crate::errors::AppError;
use crate::groups;
use crate::models::{Channel, CreateChannelRequest, UpdateChannelRequest};

const CHANNEL_COLUMNS: &str = "id, playlist_id, name, url, tvg_id, tvg_name, tvg_logo, \
     group_title, duration, sort_order, created_at, updated_at";

impl Database {
    pub async fn get_channel(&self, id: i64) -> Result<Option<Channel>, AppError> {
        let row = sqlx::query(&format!(
            "SELECT {CHANNEL_COLUMNS} FROM channels WHERE id = ?"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(map_channel_row).transpose()
    }

    /// Append a channel at `max(order)+1`. If its group is non-empty and not
    /// yet in the playlist's group-order list, the group is appended there.
    /// Returns `None` when the playlist does not exist.
    pub async fn create_channel(
        &self,
        playlist_id: i64,
        request: &CreateChannelRequest,
    ) -> Result<Option<Channel>, AppError> {
        let Some(playlist) = self.get_playlist(playlist_id).await? else {
            return Ok(None);
        };

        let mut transaction = self.pool.begin().await?;
        let now = now_str();

        let next_order: i64 = sqlx::query_scalar(
            "SELECT COALESCE(MAX(sort_order), -1) + 1 FROM channels WHERE playlist_id = ?",
        )
        .bind(playlist_id)
        .fetch_one(&mut *transaction)
        .await?;

        let group_title = request.group_title.clone().unwrap_or_default();

        let result = sqlx::query(
            "INSERT INTO channels
             (playlist_id, name, url, tvg_id, tvg_name, tvg_logo, group_title, duration,
              sort_order, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, -1, ?, ?, ?)",
        )
        .bind(playlist_id)
        .bind(&request.name)
        .bind(&request.url)
        .bind(request.tvg_id.as_deref().unwrap_or(""))
        .bind(request.tvg_name.as_deref().unwrap_or(""))
        .bind(request.tvg_logo.as_deref().unwrap_or(""))
        .bind(&group_title)
        .bind(next_order)
        .bind(&now)
        .bind(&now)
        .execute(&mut *transaction)
        .await?;

        let channel_id = result.last_insert_rowid();

        if !group_title.is_empty() {
            let mut order = playlist.group_order_list()?.unwrap_or_default();
            if groups::append_if_missing(&mut order, &group_title) {
                sqlx::query("UPDATE playlists SET group_order = ?, updated_at = ? WHERE id = ?")
                    .bind(serde_json::to_string(&order)?)
                    .bind(&now)
                    .bind(playlist_id)
                    .execute(&mut *transaction)
                    .await?;
            }
        }

        transaction.commit().await?;
        info!(
            "Added channel '{}' ({}) to playlist ({})",
            request.name, channel_id, playlist_id
        );

        self.get_channel(channel_id).await
    }

    /// Update user-editable fields; omitted fields keep their value.
    pub async fn update_channel(
        &self,
        id: i64,
        request: &UpdateChannelRequest,
    ) -> Result<Option<Channel>, AppError> {
        let Some(existing) = self.get_channel(id).await? else {
            return Ok(None);
        };

        sqlx::query(
            "UPDATE channels SET name = ?, url = ?, tvg_id = ?, tvg_name = ?, tvg_logo = ?,
             group_title = ?, updated_at = ? WHERE id = ?",
        )
        .bind(request.name.as_deref().unwrap_or(&existing.name))
        .bind(request.url.as_deref().unwrap_or(&existing.url))
        .bind(request.tvg_id.as_deref().unwrap_or(&existing.tvg_id))
        .bind(request.tvg_name.as_deref().unwrap_or(&existing.tvg_name))
        .bind(request.tvg_logo.as_deref().unwrap_or(&existing.tvg_logo))
        .bind(
            request
                .group_title
                .as_deref()
                .unwrap_or(&existing.group_title),
        )
        .bind(now_str())
        .bind(id)
        .execute(&self.pool)
        .await?;

        self.get_channel(id).await
    }

    pub async fn delete_channel(&self, id: i64) -> Result<bool, AppError> {
        let deleted = sqlx::query("DELETE FROM channels WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(deleted.rows_affected() > 0)
    }

    /// Move an explicit set of channels to another group, as one statement.
    pub async fn batch_move_channels(
        &self,
        ids: &[i64],
        group_title: &str,
    ) -> Result<u64, AppError> {
        if ids.is_empty() {
            return Ok(0);
        }

        let placeholders = vec!["?"; ids.len()].join(", ");
        let sql = format!(
            "UPDATE channels SET group_title = ?, updated_at = ? WHERE id IN ({placeholders})"
        );
        let mut query = sqlx::query(&sql).bind(group_title).bind(now_str());
        for id in ids {
            query = query.bind(id);
        }

        let result = query.execute(&self.pool).await?;
        info!(
            "Batch moved {} channels to group '{}'",
            result.rows_affected(),
            group_title
        );
        Ok(result.rows_affected())
    }

    /// Delete an explicit set of channels, as one statement.
    pub async fn batch_delete_channels(&self, ids: &[i64]) -> Result<u64, AppError> {
        if ids.is_empty() {
            return Ok(0);
        }

        let placeholders = vec!["?"; ids.len()].join(", ");
        let sql = format!("DELETE FROM channels WHERE id IN ({placeholders})");
        let mut query = sqlx::query(&sql);
        for id in ids {
            query = query.bind(id);
        }

        let result = query.execute(&self.pool).await?;
        info!("Batch deleted {} channels", result.rows_affected());
        Ok(result.rows_affected())
    }

    /// Rewrite `order` to match the given id sequence (dense, zero-based).
    ///
    /// Issued as one update per channel inside a single transaction, which
    /// mirrors the observed behavior of the original editor backend.
    pub async fn reorder_channels(
        &self,
        playlist_id: i64,
        channel_ids: &[i64],
    ) -> Result<(), AppError> {
        let mut transaction = self.pool.begin().await?;
        let now = now_str();

        for (index, channel_id) in channel_ids.iter().enumerate() {
            // The playlist guard keeps foreign ids from touching other lists
            sqlx::query(
                "UPDATE channels SET sort_order = ?, updated_at = ?
                 WHERE id = ? AND playlist_id = ?",
            )
            .bind(index as i64)
            .bind(&now)
            .bind(channel_id)
            .bind(playlist_id)
            .execute(&mut *transaction)
            .await?;
        }

        transaction.commit().await?;
        debug!(
            "Reordered {} channels in playlist ({})",
            channel_ids.len(),
            playlist_id
        );
        Ok(())
    }
}
