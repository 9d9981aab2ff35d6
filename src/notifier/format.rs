//! Rendering of change events into Telegram HTML messages.

use crate::events::{ChangeEvent, MetadataField};
use crate::snapshot_store::TrackRecord;
use chrono::FixedOffset;

/// Telegram rejects messages above 4096 characters; keep some headroom.
pub const MAX_MESSAGE_LENGTH: usize = 4000;

const BLOCK_SEPARATOR: &str = "\n\n";

/// A message ready to be sent, with an optional photo to follow it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedMessage {
    pub text: String,
    pub photo: Option<RenderedPhoto>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedPhoto {
    pub url: String,
    pub caption: String,
}

pub fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

/// Undo [`escape_html`] and drop tags, for the plain-text fallback.
pub fn to_plain_text(html: &str) -> String {
    let mut plain = String::with_capacity(html.len());
    let mut in_tag = false;
    for c in html.chars() {
        match c {
            '<' => in_tag = true,
            '>' if in_tag => in_tag = false,
            _ if !in_tag => plain.push(c),
            _ => {}
        }
    }
    plain
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&amp;", "&")
}

fn format_header(playlist_name: &str, count: usize, added: bool) -> String {
    let symbol = if added { "☆" } else { "♡" };
    let action = if added { "Added to" } else { "Removed from" };
    let noun = if count == 1 { "Song" } else { "Songs" };
    format!(
        "{symbol} <b>{count} {noun} {action} <i>{}</i></b> {symbol}",
        escape_html(playlist_name)
    )
}

fn format_track(track: &TrackRecord, added: bool, offset: &FixedOffset) -> String {
    let mut block = format!(
        "<b>{}</b>\n{}",
        escape_html(&track.name),
        escape_html(&track.artist)
    );
    if let Some(added_at) = track.added_at {
        let label = if added { "Added" } else { "Was added" };
        block.push_str(&format!(
            "\n<i>{} on {}</i>",
            label,
            added_at.with_timezone(offset).format("%Y-%m-%d %H:%M:%S")
        ));
    }
    if let Some(url) = &track.url {
        block.push_str(&format!(
            "\n<a href=\"{}\">Listen on Spotify</a>",
            escape_html(url)
        ));
    }
    block
}

fn format_tracks(playlist_name: &str, tracks: &[TrackRecord], added: bool, offset: &FixedOffset) -> String {
    let mut blocks = vec![format_header(playlist_name, tracks.len(), added)];
    blocks.extend(tracks.iter().map(|t| format_track(t, added, offset)));
    blocks.join(BLOCK_SEPARATOR)
}

fn value_or_empty(value: &Option<String>, tag: &str) -> String {
    match value.as_deref() {
        Some(v) if !v.is_empty() => format!("<{tag}>{}</{tag}>", escape_html(v)),
        _ => "(empty)".to_string(),
    }
}

/// Render consecutive metadata changes of one playlist as a single message.
fn format_metadata(playlist_id: &str, playlist_name: &str, changes: &[&ChangeEvent]) -> RenderedMessage {
    let mut header_name = playlist_name.to_string();
    let mut blocks = Vec::new();
    let mut photo = None;

    for event in changes {
        let ChangeEvent::MetadataChanged {
            field,
            old_value,
            new_value,
            ..
        } = event
        else {
            continue;
        };
        match field {
            MetadataField::Name => {
                if let Some(old) = old_value {
                    header_name = old.clone();
                }
                blocks.push(format!(
                    "Name:\n{} ➔ {}",
                    value_or_empty(old_value, "i"),
                    value_or_empty(new_value, "b")
                ));
            }
            MetadataField::Description => {
                blocks.push(format!(
                    "Description:\n{} ➔ {}",
                    value_or_empty(old_value, "i"),
                    value_or_empty(new_value, "b")
                ));
            }
            MetadataField::Image => {
                let links = match (old_value, new_value) {
                    (Some(old), Some(new)) => format!(
                        "<a href=\"{}\">Previous Image</a> ➔ <a href=\"{}\">New Image</a>",
                        escape_html(old),
                        escape_html(new)
                    ),
                    (None, Some(new)) => {
                        format!("<a href=\"{}\">New Image Added</a>", escape_html(new))
                    }
                    (Some(old), None) => {
                        format!("<a href=\"{}\">Image Removed</a>", escape_html(old))
                    }
                    (None, None) => String::new(),
                };
                blocks.push(format!("<b>Image:</b> Changed\n{}", links).trim_end().to_string());
                photo = new_value.as_ref().map(|url| RenderedPhoto {
                    url: url.clone(),
                    caption: format!(
                        "New cover image for playlist: <b>{}</b>",
                        escape_html(playlist_name)
                    ),
                });
            }
        }
    }

    let mut text = format!("<b>✿ <i>{}</i> updated! ✿</b>", escape_html(&header_name));
    for block in blocks {
        text.push_str(BLOCK_SEPARATOR);
        text.push_str(&block);
    }
    text.push_str(BLOCK_SEPARATOR);
    text.push_str(&format!(
        "<a href=\"https://open.spotify.com/playlist/{}\">Open Playlist</a>",
        escape_html(playlist_id)
    ));

    RenderedMessage { text, photo }
}

/// Render events in order. Metadata events of the same playlist that follow
/// each other are merged into one message.
pub fn render_events(events: &[ChangeEvent], offset: &FixedOffset) -> Vec<RenderedMessage> {
    let mut messages = Vec::new();
    let mut i = 0;
    while i < events.len() {
        match &events[i] {
            ChangeEvent::MetadataChanged {
                playlist_id,
                playlist_name,
                ..
            } => {
                let mut group = vec![&events[i]];
                while let Some(next @ ChangeEvent::MetadataChanged { .. }) = events.get(i + group.len()) {
                    if next.playlist_id() != playlist_id.as_str() {
                        break;
                    }
                    group.push(next);
                }
                i += group.len();
                messages.push(format_metadata(playlist_id, playlist_name, &group));
            }
            ChangeEvent::TracksAdded {
                playlist_name,
                tracks,
                ..
            } => {
                messages.push(RenderedMessage {
                    text: format_tracks(playlist_name, tracks, true, offset),
                    photo: None,
                });
                i += 1;
            }
            ChangeEvent::TracksRemoved {
                playlist_name,
                tracks,
                ..
            } => {
                messages.push(RenderedMessage {
                    text: format_tracks(playlist_name, tracks, false, offset),
                    photo: None,
                });
                i += 1;
            }
        }
    }
    messages
}

/// Split a message at block boundaries into chunks of at most `max_len` characters.
///
/// A single block longer than `max_len` is cut at character boundaries.
pub fn split_message(message: &str, max_len: usize) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut current = String::new();
    let mut current_len = 0;

    for block in message.split(BLOCK_SEPARATOR) {
        let block_len = block.chars().count();
        let separator_len = if current.is_empty() { 0 } else { BLOCK_SEPARATOR.len() };

        if current_len + separator_len + block_len > max_len && !current.is_empty() {
            chunks.push(std::mem::take(&mut current));
            current_len = 0;
        }

        if block_len > max_len {
            let chars: Vec<char> = block.chars().collect();
            for piece in chars.chunks(max_len) {
                chunks.push(piece.iter().collect());
            }
            continue;
        }

        if !current.is_empty() {
            current.push_str(BLOCK_SEPARATOR);
            current_len += BLOCK_SEPARATOR.len();
        }
        current.push_str(block);
        current_len += block_len;
    }

    if !current.trim().is_empty() {
        chunks.push(current);
    }
    chunks
}
