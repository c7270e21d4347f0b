//! Import normalizer for extended M3U playlists.
//!
//! The format is line oriented: a `#EXTM3U` header, then repeating pairs of
//! `#EXTINF:<duration> [attributes],<name>` and a URL line. Entries whose
//! URL line is missing or looks like another directive are skipped
//! best-effort; name and URL are trimmed; `tvg-id`/`tvg-name` identical to
//! the channel name are normalized to empty so export can reconstruct them.

use tracing::{debug, info};

use crate::errors::AppError;
use crate::models::NewChannel;

/// Parse raw M3U text into normalized channel records.
///
/// The position of each record in the returned vector is its insertion
/// order; callers persist the index as the channel `order`.
pub fn parse_playlist(content: &str) -> Result<Vec<NewChannel>, AppError> {
    if content.trim().is_empty() {
        return Err(AppError::validation("no content provided"));
    }

    let lines: Vec<&str> = content.lines().collect();
    let mut channels = Vec::new();

    let mut i = 0;
    while i < lines.len() {
        let line = lines[i].trim();

        if line.starts_with("#EXTINF:") {
            if let Some(channel) = parse_entry(line, lines.get(i + 1).copied()) {
                channels.push(channel);
                i += 2; // Consumed the URL line as well
            } else {
                debug!("Skipping malformed playlist entry at line {}", i + 1);
                // The next line was not a URL, so it may start another entry
                i += 1;
            }
        } else {
            i += 1;
        }
    }

    if channels.is_empty() {
        return Err(AppError::validation(
            "malformed playlist: no channel entries found",
        ));
    }

    info!("Parsed {} channels from M3U content", channels.len());
    Ok(channels)
}

fn parse_entry(extinf_line: &str, url_line: Option<&str>) -> Option<NewChannel> {
    let url = match url_line {
        Some(url) if !url.trim().is_empty() && !url.trim().starts_with('#') => {
            url.trim().to_string()
        }
        _ => return None,
    };

    // #EXTINF:-1 tvg-id="..." tvg-name="..." group-title="...",Channel Name
    let payload = &extinf_line["#EXTINF:".len()..];
    let comma_pos = payload.rfind(',')?;
    let attributes_part = &payload[..comma_pos];
    let name = payload[comma_pos + 1..].trim().to_string();

    let duration = attributes_part
        .split_whitespace()
        .next()
        .and_then(|token| token.parse::<i64>().ok())
        .unwrap_or(-1);

    let mut channel = NewChannel {
        name,
        url,
        duration,
        ..NewChannel::default()
    };

    for (key, value) in parse_attributes(attributes_part) {
        match key.as_str() {
            "tvg-id" => channel.tvg_id = value,
            "tvg-name" => channel.tvg_name = value,
            "tvg-logo" => channel.tvg_logo = value,
            "group-title" => channel.group_title = value,
            _ => {}
        }
    }

    Some(normalize(channel))
}

/// Apply the normalization rules: trim everything, drop tvg metadata that
/// just duplicates the channel name.
fn normalize(mut channel: NewChannel) -> NewChannel {
    channel.tvg_id = channel.tvg_id.trim().to_string();
    channel.tvg_name = channel.tvg_name.trim().to_string();
    channel.tvg_logo = channel.tvg_logo.trim().to_string();
    channel.group_title = channel.group_title.trim().to_string();

    if channel.tvg_id == channel.name {
        channel.tvg_id.clear();
    }
    if channel.tvg_name == channel.name {
        channel.tvg_name.clear();
    }

    channel
}

/// Scan `key="value"` pairs out of the EXTINF attribute section.
/// Values may contain spaces inside quotes; quotes can be backslash-escaped.
fn parse_attributes(attributes: &str) -> Vec<(String, String)> {
    let mut attrs = Vec::new();
    let mut key = String::new();
    let mut value = String::new();
    let mut in_quotes = false;
    let mut in_value = false;
    let mut escape_next = false;

    let mut flush = |key: &mut String, value: &mut String, in_value: &mut bool| {
        if *in_value && !value.is_empty() {
            attrs.push((
                key.trim().to_string(),
                value.trim_matches('"').to_string(),
            ));
        }
        key.clear();
        value.clear();
        *in_value = false;
    };

    for ch in attributes.chars() {
        if escape_next {
            if in_value {
                value.push(ch);
            } else {
                key.push(ch);
            }
            escape_next = false;
            continue;
        }

        match ch {
            '\\' => escape_next = true,
            '"' if in_value => in_quotes = !in_quotes,
            '=' if !in_quotes && !in_value => in_value = true,
            ' ' | '\t' if !in_quotes => flush(&mut key, &mut value, &mut in_value),
            _ => {
                if in_value {
                    value.push(ch);
                } else {
                    key.push(ch);
                }
            }
        }
    }
    flush(&mut key, &mut value, &mut in_value);

    attrs
}
