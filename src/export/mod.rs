//! Playlist export pipeline.
//!
//! Pure transformation from a playlist's stored channels plus its
//! ordering/visibility metadata to deterministic M3U text. The web layer
//! wraps the result in the proper content-type/disposition headers; nothing
//! here performs I/O.

use std::cmp::Ordering;
use std::collections::HashSet;

use chrono::NaiveDate;
use tracing::debug;

use crate::errors::AppError;
use crate::groups::DEFAULT_GROUP_NAME;
use crate::models::{Channel, Playlist};

/// Which channels an export includes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportMode {
    /// Apply hidden-group and hidden-channel filtering.
    Current,
    /// Ignore all hiding and include everything.
    Full,
}

impl ExportMode {
    /// Version label used in the download filename.
    pub fn version_label(&self) -> &'static str {
        match self {
            Self::Current => "当前版",
            Self::Full => "完整版",
        }
    }
}

/// Run the full pipeline: decode metadata, filter, sort, serialize.
///
/// The input channels must already be in `order`-ascending sequence, which
/// is how the storage layer returns them.
pub fn export_playlist(
    playlist: &Playlist,
    channels: Vec<Channel>,
    mode: ExportMode,
) -> Result<String, AppError> {
    let group_order = playlist.group_order_list()?;
    let hidden_groups = playlist.hidden_group_set()?;
    let hidden_channels = playlist.hidden_channel_set()?;

    let mut visible = match mode {
        ExportMode::Current => filter_channels(channels, &hidden_groups, &hidden_channels),
        ExportMode::Full => channels,
    };

    sort_channels(&mut visible, group_order.as_deref());

    debug!(
        "Exporting playlist '{}' ({:?}): {} channels",
        playlist.name,
        mode,
        visible.len()
    );

    Ok(render_m3u(&visible))
}

/// Group a channel belongs to for ordering and visibility purposes:
/// its `group_title` when non-empty, otherwise the uncategorized sentinel.
pub fn effective_group(channel: &Channel) -> &str {
    if channel.group_title.is_empty() {
        DEFAULT_GROUP_NAME
    } else {
        &channel.group_title
    }
}

/// Drop channels belonging to a hidden group or hidden individually by id.
fn filter_channels(
    channels: Vec<Channel>,
    hidden_groups: &HashSet<String>,
    hidden_channels: &HashSet<i64>,
) -> Vec<Channel> {
    channels
        .into_iter()
        .filter(|c| !hidden_groups.contains(effective_group(c)) && !hidden_channels.contains(&c.id))
        .collect()
}

/// Apply the composite ordering.
///
/// With a group-order list: channels in listed groups come first in list
/// position order, then `order` ascending within a group; channels in
/// unlisted groups follow, clustered lexicographically by group name, then
/// `order` ascending. Without a list the incoming `order`-ascending sequence
/// is kept untouched.
pub fn sort_channels(channels: &mut [Channel], group_order: Option<&[String]>) {
    let Some(group_order) = group_order else {
        return;
    };

    channels.sort_by(|a, b| {
        let group_a = effective_group(a);
        let group_b = effective_group(b);
        let idx_a = group_order.iter().position(|g| g == group_a);
        let idx_b = group_order.iter().position(|g| g == group_b);

        match (idx_a, idx_b) {
            (Some(ia), Some(ib)) => ia.cmp(&ib).then_with(|| a.order.cmp(&b.order)),
            // A recognized group always sorts before an unrecognized one
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => group_a
                .cmp(group_b)
                .then_with(|| a.order.cmp(&b.order)),
        }
    });
}

/// Serialize channels to extended-M3U text with CRLF line endings.
///
/// `tvg-id` is emitted only when non-empty after trimming, `tvg-name` only
/// when non-empty and different from the channel name, `tvg-logo` and
/// `group-title` when non-empty.
pub fn render_m3u(channels: &[Channel]) -> String {
    let mut m3u = String::from("#EXTM3U\r\n");

    for channel in channels {
        let mut attributes = Vec::new();
        if !channel.tvg_id.trim().is_empty() {
            attributes.push(format!("tvg-id=\"{}\"", channel.tvg_id));
        }
        if !channel.tvg_name.is_empty() && channel.tvg_name != channel.name {
            attributes.push(format!("tvg-name=\"{}\"", channel.tvg_name));
        }
        if !channel.tvg_logo.is_empty() {
            attributes.push(format!("tvg-logo=\"{}\"", channel.tvg_logo));
        }
        if !channel.group_title.is_empty() {
            attributes.push(format!("group-title=\"{}\"", channel.group_title));
        }

        let attr_string = if attributes.is_empty() {
            String::new()
        } else {
            format!(" {}", attributes.join(" "))
        };

        m3u.push_str(&format!(
            "#EXTINF:{}{},{}\r\n{}\r\n",
            channel.duration, attr_string, channel.name, channel.url
        ));
    }

    m3u
}

/// Download filename: `<sanitized playlist name>_<YYYYMMDD>_<version>.m3u`.
pub fn export_filename(playlist_name: &str, mode: ExportMode, date: NaiveDate) -> String {
    format!(
        "{}_{}_{}.m3u",
        sanitize_filename(playlist_name),
        date.format("%Y%m%d"),
        mode.version_label()
    )
}

/// Replace characters that are unsafe in filenames with underscores.
fn sanitize_filename(name: &str) -> String {
    name.chars()
        .map(|c| match c {
            '<' | '>' | ':' | '"' | '/' | '\\' | '|' | '?' | '*' => '_',
            other => other,
        })
        .collect()
}
