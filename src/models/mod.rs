use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// A stored playlist.
///
/// `group_order`, `hidden_groups` and `hidden_channels` are JSON-encoded
/// arrays kept as raw text, exactly as persisted. `None` means "no
/// preference" and is distinct from an empty array.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Playlist {
    pub id: i64,
    pub name: String,
    pub url: Option<String>,
    pub group_order: Option<String>,
    pub hidden_groups: Option<String>,
    pub hidden_channels: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Playlist {
    /// Decode the user-preferred group sequence, if any.
    pub fn group_order_list(&self) -> Result<Option<Vec<String>>, serde_json::Error> {
        self.group_order
            .as_deref()
            .map(serde_json::from_str)
            .transpose()
    }

    /// Decode the hidden group names; an absent column means nothing is hidden.
    pub fn hidden_group_set(&self) -> Result<HashSet<String>, serde_json::Error> {
        match self.hidden_groups.as_deref() {
            Some(raw) => serde_json::from_str(raw),
            None => Ok(HashSet::new()),
        }
    }

    /// Decode the hidden channel ids; an absent column means nothing is hidden.
    pub fn hidden_channel_set(&self) -> Result<HashSet<i64>, serde_json::Error> {
        match self.hidden_channels.as_deref() {
            Some(raw) => serde_json::from_str(raw),
            None => Ok(HashSet::new()),
        }
    }
}

/// A single stream entry belonging to a playlist.
///
/// An empty `group_title` marks the channel as uncategorized. `order` is
/// dense and zero-based within the owning playlist and defines the default
/// channel sequence.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Channel {
    pub id: i64,
    pub playlist_id: i64,
    pub name: String,
    pub url: String,
    pub tvg_id: String,
    pub tvg_name: String,
    pub tvg_logo: String,
    pub group_title: String,
    pub duration: i64,
    pub order: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A normalized channel record produced by the import normalizer, not yet
/// persisted. Missing attributes are empty strings so the record shape stays
/// uniform.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NewChannel {
    pub name: String,
    pub url: String,
    pub tvg_id: String,
    pub tvg_name: String,
    pub tvg_logo: String,
    pub group_title: String,
    pub duration: i64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaylistSummary {
    #[serde(flatten)]
    pub playlist: Playlist,
    pub channel_count: i64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaylistWithChannels {
    #[serde(flatten)]
    pub playlist: Playlist,
    pub channels: Vec<Channel>,
}

// API request payloads. Field names stay camelCase on the wire, matching the
// original editor client.

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportPlaylistRequest {
    pub name: Option<String>,
    pub url: Option<String>,
    pub content: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReimportPlaylistRequest {
    pub url: Option<String>,
    pub content: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RenamePlaylistRequest {
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateChannelRequest {
    pub name: String,
    pub url: String,
    pub group_title: Option<String>,
    pub tvg_id: Option<String>,
    pub tvg_name: Option<String>,
    pub tvg_logo: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateChannelRequest {
    pub name: Option<String>,
    pub url: Option<String>,
    pub group_title: Option<String>,
    pub tvg_id: Option<String>,
    pub tvg_name: Option<String>,
    pub tvg_logo: Option<String>,
}

#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum BatchAction {
    Move,
    Delete,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchChannelRequest {
    pub action: BatchAction,
    pub ids: Vec<i64>,
    pub data: Option<BatchChannelData>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchChannelData {
    pub group_title: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SortChannelsRequest {
    pub channel_ids: Vec<i64>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupOrderRequest {
    pub group_order: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HiddenGroupsRequest {
    pub hidden_groups: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HiddenChannelsRequest {
    pub hidden_channels: Vec<i64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RenameGroupRequest {
    pub from: String,
    pub to: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DeleteGroupRequest {
    pub name: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BackupInfo {
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub size: u64,
}
