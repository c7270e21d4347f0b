//! Playlist persistence: CRUD, channel replacement on re-import, and the
//! group-order / hidden-groups / hidden-channels metadata columns.

use sqlx::Row;
use tracing::{debug, info};

use super::{map_channel_row, map_playlist_row, now_str, Database};
use crate::errors::AppError;
use crate::groups;
use crate::models::{NewChannel, Playlist, PlaylistSummary, PlaylistWithChannels};

const PLAYLIST_COLUMNS: &str = "id, name, url, group_order, hidden_groups, hidden_channels, \
     created_at, updated_at";

impl Database {
    /// All playlists with their channel counts, newest first.
    pub async fn list_playlists(&self) -> Result<Vec<PlaylistSummary>, AppError> {
        let rows = sqlx::query(
            "SELECT p.id, p.name, p.url, p.group_order, p.hidden_groups, p.hidden_channels,
             p.created_at, p.updated_at, COUNT(c.id) AS channel_count
             FROM playlists p
             LEFT JOIN channels c ON c.playlist_id = p.id
             GROUP BY p.id
             ORDER BY p.created_at DESC, p.id DESC",
        )
        .fetch_all(&self.pool)
        .await?;

        let mut playlists = Vec::new();
        for row in &rows {
            playlists.push(PlaylistSummary {
                playlist: map_playlist_row(row)?,
                channel_count: row.get("channel_count"),
            });
        }

        Ok(playlists)
    }

    pub async fn get_playlist(&self, id: i64) -> Result<Option<Playlist>, AppError> {
        let row = sqlx::query(&format!(
            "SELECT {PLAYLIST_COLUMNS} FROM playlists WHERE id = ?"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(map_playlist_row).transpose()
    }

    /// A playlist together with its channels in `order`-ascending sequence.
    pub async fn get_playlist_with_channels(
        &self,
        id: i64,
    ) -> Result<Option<PlaylistWithChannels>, AppError> {
        let Some(playlist) = self.get_playlist(id).await? else {
            return Ok(None);
        };

        let rows = sqlx::query(
            "SELECT id, playlist_id, name, url, tvg_id, tvg_name, tvg_logo, group_title,
             duration, sort_order, created_at, updated_at
             FROM channels WHERE playlist_id = ? ORDER BY sort_order ASC, id ASC",
        )
        .bind(id)
        .fetch_all(&self.pool)
        .await?;

        let mut channels = Vec::with_capacity(rows.len());
        for row in &rows {
            channels.push(map_channel_row(row)?);
        }

        Ok(Some(PlaylistWithChannels { playlist, channels }))
    }

    /// Create a playlist and bulk-insert its imported channels, assigning
    /// the source index as `order`.
    pub async fn create_playlist(
        &self,
        name: &str,
        url: Option<&str>,
        channels: &[NewChannel],
    ) -> Result<Playlist, AppError> {
        let mut transaction = self.pool.begin().await?;
        let now = now_str();

        let result = sqlx::query(
            "INSERT INTO playlists (name, url, created_at, updated_at) VALUES (?, ?, ?, ?)",
        )
        .bind(name)
        .bind(url)
        .bind(&now)
        .bind(&now)
        .execute(&mut *transaction)
        .await?;

        let playlist_id = result.last_insert_rowid();

        for (index, channel) in channels.iter().enumerate() {
            insert_channel(&mut transaction, playlist_id, channel, index as i64, &now).await?;
        }

        transaction.commit().await?;
        info!(
            "Created playlist '{}' ({}) with {} channels",
            name,
            playlist_id,
            channels.len()
        );

        self.get_playlist(playlist_id)
            .await?
            .ok_or_else(|| AppError::not_found("playlist", playlist_id))
    }

    /// Re-import: replace all channels and reset the group-order preference.
    /// Hidden-group/hidden-channel sets are deliberately kept.
    /// Returns `false` when the playlist does not exist.
    pub async fn replace_playlist_channels(
        &self,
        id: i64,
        url: Option<&str>,
        channels: &[NewChannel],
    ) -> Result<bool, AppError> {
        let mut transaction = self.pool.begin().await?;
        let now = now_str();

        let updated = sqlx::query(
            "UPDATE playlists SET url = COALESCE(?, url), group_order = NULL, updated_at = ?
             WHERE id = ?",
        )
        .bind(url)
        .bind(&now)
        .bind(id)
        .execute(&mut *transaction)
        .await?;

        if updated.rows_affected() == 0 {
            transaction.rollback().await?;
            return Ok(false);
        }

        sqlx::query("DELETE FROM channels WHERE playlist_id = ?")
            .bind(id)
            .execute(&mut *transaction)
            .await?;

        for (index, channel) in channels.iter().enumerate() {
            insert_channel(&mut transaction, id, channel, index as i64, &now).await?;
        }

        transaction.commit().await?;
        info!(
            "Re-imported playlist ({}): {} channels replaced",
            id,
            channels.len()
        );
        Ok(true)
    }

    pub async fn rename_playlist(
        &self,
        id: i64,
        name: &str,
    ) -> Result<Option<Playlist>, AppError> {
        let updated = sqlx::query("UPDATE playlists SET name = ?, updated_at = ? WHERE id = ?")
            .bind(name)
            .bind(now_str())
            .bind(id)
            .execute(&self.pool)
            .await?;

        if updated.rows_affected() == 0 {
            return Ok(None);
        }
        self.get_playlist(id).await
    }

    /// Delete a playlist and all of its channels.
    pub async fn delete_playlist(&self, id: i64) -> Result<bool, AppError> {
        let mut transaction = self.pool.begin().await?;

        sqlx::query("DELETE FROM channels WHERE playlist_id = ?")
            .bind(id)
            .execute(&mut *transaction)
            .await?;

        let deleted = sqlx::query("DELETE FROM playlists WHERE id = ?")
            .bind(id)
            .execute(&mut *transaction)
            .await?;

        transaction.commit().await?;
        Ok(deleted.rows_affected() > 0)
    }

    pub async fn set_group_order(&self, id: i64, order: &[String]) -> Result<bool, AppError> {
        self.set_metadata_column(id, "group_order", &serde_json::to_string(order)?)
            .await
    }

    pub async fn set_hidden_groups(&self, id: i64, hidden: &[String]) -> Result<bool, AppError> {
        self.set_metadata_column(id, "hidden_groups", &serde_json::to_string(hidden)?)
            .await
    }

    pub async fn set_hidden_channels(&self, id: i64, hidden: &[i64]) -> Result<bool, AppError> {
        self.set_metadata_column(id, "hidden_channels", &serde_json::to_string(hidden)?)
            .await
    }

    async fn set_metadata_column(
        &self,
        id: i64,
        column: &str,
        value: &str,
    ) -> Result<bool, AppError> {
        // column is one of three fixed names, never user input
        let updated = sqlx::query(&format!(
            "UPDATE playlists SET {column} = ?, updated_at = ? WHERE id = ?"
        ))
        .bind(value)
        .bind(now_str())
        .bind(id)
        .execute(&self.pool)
        .await?;

        debug!("Updated {} for playlist ({})", column, id);
        Ok(updated.rows_affected() > 0)
    }

    /// Rename a group: reassign every channel in it and replace the name in
    /// the group-order list at its current position.
    pub async fn rename_group(&self, id: i64, from: &str, to: &str) -> Result<bool, AppError> {
        let Some(playlist) = self.get_playlist(id).await? else {
            return Ok(false);
        };

        let mut transaction = self.pool.begin().await?;
        let now = now_str();

        sqlx::query(
            "UPDATE channels SET group_title = ?, updated_at = ?
             WHERE playlist_id = ? AND group_title = ?",
        )
        .bind(to)
        .bind(&now)
        .bind(id)
        .bind(from)
        .execute(&mut *transaction)
        .await?;

        if let Some(mut order) = playlist.group_order_list()? {
            if groups::rename_in_order(&mut order, from, to) {
                sqlx::query("UPDATE playlists SET group_order = ?, updated_at = ? WHERE id = ?")
                    .bind(serde_json::to_string(&order)?)
                    .bind(&now)
                    .bind(id)
                    .execute(&mut *transaction)
                    .await?;
            }
        }

        transaction.commit().await?;
        info!("Renamed group '{}' to '{}' in playlist ({})", from, to, id);
        Ok(true)
    }

    /// Delete a group: its channels move to the uncategorized sentinel
    /// (empty group title) and the name leaves the group-order list.
    pub async fn delete_group(&self, id: i64, name: &str) -> Result<bool, AppError> {
        let Some(playlist) = self.get_playlist(id).await? else {
            return Ok(false);
        };

        let mut transaction = self.pool.begin().await?;
        let now = now_str();

        sqlx::query(
            "UPDATE channels SET group_title = '', updated_at = ?
             WHERE playlist_id = ? AND group_title = ?",
        )
        .bind(&now)
        .bind(id)
        .bind(name)
        .execute(&mut *transaction)
        .await?;

        if let Some(mut order) = playlist.group_order_list()? {
            groups::remove_from_order(&mut order, name);
            sqlx::query("UPDATE playlists SET group_order = ?, updated_at = ? WHERE id = ?")
                .bind(serde_json::to_string(&order)?)
                .bind(&now)
                .bind(id)
                .execute(&mut *transaction)
                .await?;
        }

        transaction.commit().await?;
        info!("Deleted group '{}' from playlist ({})", name, id);
        Ok(true)
    }
}

pub(super) async fn insert_channel(
    transaction: &mut sqlx::Transaction<'_, sqlx::Sqlite>,
    playlist_id: i64,
    channel: &NewChannel,
    order: i64,
    now: &str,
) -> Result<(), AppError> {
    sqlx::query(
        "INSERT INTO channels
         (playlist_id, name, url, tvg_id, tvg_name, tvg_logo, group_title, duration, sort_order,
          created_at, updated_at)
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(playlist_id)
    .bind(&channel.name)
    .bind(&channel.url)
    .bind(&channel.tvg_id)
    .bind(&channel.tvg_name)
    .bind(&channel.tvg_logo)
    .bind(&channel.group_title)
    .bind(channel.duration)
    .bind(order)
    .bind(now)
    .bind(now)
    .execute(&mut **transaction)
    .await?;

    Ok(())
}
