//! Formatting utilities (Slack records → assistant-readable text).
//!
//! Everything here is pure: the same record and options always produce the same
//! text, and missing optional fields render as [`NA`] instead of failing.

use serde_json::Value;

pub const NA: &str = "N/A";

pub const TRUNCATION_MARKER: &str = "...";
pub const CONTENT_TRUNCATION_MARKER: &str = "\n\n... (content truncated)";

pub const MESSAGE_PREVIEW_LIMIT: usize = 100;
pub const TOPIC_PREVIEW_LIMIT: usize = 50;
pub const THREAD_PARENT_LIMIT: usize = 150;
pub const FILE_PREVIEW_LIMIT: usize = 300;
pub const FILE_CONTENT_LIMIT: usize = 50_000;

/// How much of a record to render.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Detail {
    /// Compact view used in confirmations and lists.
    #[default]
    Summary,
    /// Every known field, with placeholders for the missing ones.
    Full,
}

// ============== Primitives ==============

/// Cut `text` to `max` characters, appending [`TRUNCATION_MARKER`] when cut.
pub fn truncate(text: &str, max: usize) -> String {
    truncate_with(text, max, TRUNCATION_MARKER)
}

pub fn truncate_with(text: &str, max: usize, marker: &str) -> String {
    match text.char_indices().nth(max) {
        None => text.to_string(),
        Some((cut, _)) => format!("{}{marker}", &text[..cut]),
    }
}

/// Human file size (`512 bytes`, `1.5 KB`, `2.0 MB`).
pub fn format_size(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = 1024 * 1024;
    if bytes < KB {
        format!("{bytes} bytes")
    } else if bytes < MB {
        format!("{:.1} KB", bytes as f64 / KB as f64)
    } else {
        format!("{:.1} MB", bytes as f64 / MB as f64)
    }
}

/// Unix seconds → `YYYY-MM-DD HH:MM:SS UTC`.
pub fn format_unix_time(secs: i64) -> String {
    match chrono::DateTime::from_timestamp(secs, 0) {
        Some(dt) => dt.format("%Y-%m-%d %H:%M:%S UTC").to_string(),
        None => NA.to_string(),
    }
}

/// Slack message timestamp (`"1700000000.000100"`) → UTC time.
pub fn format_slack_ts(ts: &str) -> String {
    ts.split('.')
        .next()
        .and_then(|secs| secs.parse::<i64>().ok())
        .map(format_unix_time)
        .unwrap_or_else(|| NA.to_string())
}

pub fn yes_no(b: bool) -> &'static str {
    if b {
        "Yes"
    } else {
        "No"
    }
}

/// Non-empty string at a JSON pointer (`"/profile/email"`).
pub fn str_at<'a>(v: &'a Value, pointer: &str) -> Option<&'a str> {
    v.pointer(pointer)
        .and_then(|x| x.as_str())
        .filter(|s| !s.trim().is_empty())
}

pub fn text_or_na<'a>(v: &'a Value, pointer: &str) -> &'a str {
    str_at(v, pointer).unwrap_or(NA)
}

fn u64_at(v: &Value, pointer: &str) -> Option<u64> {
    v.pointer(pointer).and_then(|x| x.as_u64())
}

fn i64_at(v: &Value, pointer: &str) -> Option<i64> {
    v.pointer(pointer).and_then(|x| x.as_i64())
}

fn bool_at(v: &Value, pointer: &str) -> bool {
    v.pointer(pointer).and_then(|x| x.as_bool()).unwrap_or(false)
}

fn len_at(v: &Value, pointer: &str) -> usize {
    v.pointer(pointer)
        .and_then(|x| x.as_array())
        .map(|a| a.len())
        .unwrap_or(0)
}

fn time_or_na(v: &Value, pointer: &str) -> String {
    i64_at(v, pointer)
        .filter(|t| *t > 0)
        .map(format_unix_time)
        .unwrap_or_else(|| NA.to_string())
}

fn mention_or_na(v: &Value, pointer: &str) -> String {
    str_at(v, pointer)
        .map(|id| format!("<@{id}>"))
        .unwrap_or_else(|| NA.to_string())
}

fn bullet(out: &mut String, label: &str, value: impl std::fmt::Display) {
    out.push_str(&format!("• **{label}:** {value}\n"));
}

// ============== Channels ==============

pub fn channel_display_name(ch: &Value) -> String {
    let name = text_or_na(ch, "/name");
    if bool_at(ch, "/is_private") || name == NA {
        name.to_string()
    } else {
        format!("#{name}")
    }
}

pub fn format_channel(ch: &Value, detail: Detail) -> String {
    let mut out = String::new();
    let members = u64_at(ch, "/num_members")
        .map(|n| n.to_string())
        .unwrap_or_else(|| NA.to_string());

    match detail {
        Detail::Summary => {
            bullet(&mut out, "Channel Name", channel_display_name(ch));
            bullet(&mut out, "Channel ID", text_or_na(ch, "/id"));
            bullet(&mut out, "Members", members);
            let topic = str_at(ch, "/topic/value")
                .map(|t| truncate(t, TOPIC_PREVIEW_LIMIT))
                .unwrap_or_else(|| NA.to_string());
            bullet(&mut out, "Topic", topic);
        }
        Detail::Full => {
            out.push_str("📢 **Channel Information**\n\n");
            bullet(&mut out, "Name", channel_display_name(ch));
            bullet(&mut out, "ID", text_or_na(ch, "/id"));
            let kind = if bool_at(ch, "/is_private") {
                "Private"
            } else {
                "Public"
            };
            bullet(&mut out, "Type", format!("{kind} Channel"));
            bullet(&mut out, "Archived", yes_no(bool_at(ch, "/is_archived")));
            bullet(&mut out, "Topic", text_or_na(ch, "/topic/value"));
            bullet(&mut out, "Purpose", text_or_na(ch, "/purpose/value"));
            bullet(&mut out, "Members", members);
            bullet(&mut out, "Created", time_or_na(ch, "/created"));
            bullet(&mut out, "Created by", mention_or_na(ch, "/creator"));
        }
    }
    out
}

/// One list line: `• **#general** (12 members)` plus an optional topic line.
pub fn format_channel_line(ch: &Value) -> String {
    let mut out = format!("• **{}**", channel_display_name(ch));
    if let Some(n) = u64_at(ch, "/num_members") {
        out.push_str(&format!(" ({n} members)"));
    }
    out.push('\n');
    if let Some(topic) = str_at(ch, "/topic/value") {
        out.push_str(&format!("  📝 {}\n", truncate(topic, TOPIC_PREVIEW_LIMIT)));
    }
    out
}

// ============== Users ==============

/// Best human name: real name, then profile real name, then handle.
pub fn user_display_name(user: &Value) -> &str {
    str_at(user, "/real_name")
        .or_else(|| str_at(user, "/profile/real_name"))
        .or_else(|| str_at(user, "/name"))
        .unwrap_or("Unknown")
}

fn is_guest(user: &Value) -> bool {
    bool_at(user, "/is_restricted") || bool_at(user, "/is_ultra_restricted")
}

pub fn format_user(user: &Value, detail: Detail) -> String {
    let mut out = String::new();
    match detail {
        Detail::Summary => {
            out.push_str(&format!(
                "{} (@{})",
                user_display_name(user),
                text_or_na(user, "/name")
            ));
            if bool_at(user, "/is_bot") {
                out.push_str(" 🤖");
            } else if bool_at(user, "/is_owner") {
                out.push_str(" 👑");
            } else if bool_at(user, "/is_admin") {
                out.push_str(" (admin)");
            }
        }
        Detail::Full => {
            out.push_str("👤 **User Information**\n\n");
            bullet(&mut out, "User ID", text_or_na(user, "/id"));
            bullet(&mut out, "Username", text_or_na(user, "/name"));
            bullet(&mut out, "Real Name", text_or_na(user, "/profile/real_name"));
            bullet(
                &mut out,
                "Display Name",
                text_or_na(user, "/profile/display_name"),
            );
            bullet(&mut out, "Title", text_or_na(user, "/profile/title"));
            bullet(&mut out, "Email", text_or_na(user, "/profile/email"));
            bullet(&mut out, "Phone", text_or_na(user, "/profile/phone"));

            out.push_str("\n**Status:**\n");
            out.push_str(&format!(
                "• Emoji: {}\n",
                text_or_na(user, "/profile/status_emoji")
            ));
            out.push_str(&format!(
                "• Text: {}\n",
                text_or_na(user, "/profile/status_text")
            ));

            out.push_str(&format!(
                "\n**Timezone:** {} ({})\n",
                text_or_na(user, "/tz"),
                text_or_na(user, "/tz_label")
            ));

            out.push_str("\n**Account Type:**\n");
            out.push_str(&format!("• Is Bot: {}\n", yes_no(bool_at(user, "/is_bot"))));
            out.push_str(&format!(
                "• Is Admin: {}\n",
                yes_no(bool_at(user, "/is_admin"))
            ));
            out.push_str(&format!(
                "• Is Owner: {}\n",
                yes_no(bool_at(user, "/is_owner"))
            ));
            out.push_str(&format!("• Is Guest: {}\n", yes_no(is_guest(user))));
            if bool_at(user, "/deleted") {
                out.push_str("• Deactivated: Yes\n");
            }

            out.push_str(&format!(
                "\n**Avatar URL:** {}\n",
                text_or_na(user, "/profile/image_192")
            ));
        }
    }
    out
}

// ============== Files ==============

pub fn file_kind(file: &Value) -> FileKind {
    let mime = str_at(file, "/mimetype").unwrap_or("");
    if mime.starts_with("image/") {
        FileKind::Image
    } else if mime.starts_with("video/") {
        FileKind::Video
    } else if ["text/", "application/pdf", "application/msword", "application/vnd."]
        .iter()
        .any(|p| mime.starts_with(p))
    {
        FileKind::Document
    } else {
        FileKind::Other
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FileKind {
    Image,
    Document,
    Video,
    Other,
}

fn size_or_na(file: &Value) -> String {
    u64_at(file, "/size")
        .map(format_size)
        .unwrap_or_else(|| NA.to_string())
}

pub fn format_file(file: &Value, detail: Detail) -> String {
    let mut out = String::new();
    match detail {
        Detail::Summary => {
            bullet(&mut out, "File ID", text_or_na(file, "/id"));
            bullet(&mut out, "Name", text_or_na(file, "/name"));
            bullet(&mut out, "Title", text_or_na(file, "/title"));
            bullet(&mut out, "Size", size_or_na(file));
            bullet(&mut out, "Permalink", text_or_na(file, "/permalink"));
        }
        Detail::Full => {
            out.push_str("📄 **File Information**\n\n");
            out.push_str("**Basic Info:**\n");
            bullet(&mut out, "Name", text_or_na(file, "/name"));
            bullet(&mut out, "ID", text_or_na(file, "/id"));
            bullet(&mut out, "Title", text_or_na(file, "/title"));

            out.push_str("\n**File Details:**\n");
            bullet(&mut out, "MIME Type", text_or_na(file, "/mimetype"));
            bullet(&mut out, "File Type", text_or_na(file, "/filetype"));
            bullet(&mut out, "Size", size_or_na(file));

            out.push_str("\n**Upload Info:**\n");
            bullet(&mut out, "Uploaded by", mention_or_na(file, "/user"));
            bullet(&mut out, "Upload Time", time_or_na(file, "/created"));

            if let (Some(w), Some(h)) = (u64_at(file, "/original_w"), u64_at(file, "/original_h")) {
                out.push_str("\n**Media Info:**\n");
                bullet(&mut out, "Dimensions", format!("{w}x{h} pixels"));
            }

            out.push_str("\n**Sharing:**\n");
            let public = file
                .get("channels")
                .and_then(|c| c.as_array())
                .map(|ids| {
                    ids.iter()
                        .filter_map(|id| id.as_str())
                        .map(|id| format!("<#{id}>"))
                        .collect::<Vec<_>>()
                        .join(", ")
                })
                .filter(|s| !s.is_empty())
                .unwrap_or_else(|| NA.to_string());
            bullet(&mut out, "Public Channels", public);
            bullet(
                &mut out,
                "Private Channels",
                format!("{} channel(s)", len_at(file, "/groups")),
            );
            bullet(
                &mut out,
                "Direct Messages",
                format!("{} conversation(s)", len_at(file, "/ims")),
            );

            out.push_str("\n**Access URLs:**\n");
            bullet(&mut out, "Private URL", text_or_na(file, "/url_private"));
            bullet(&mut out, "Permalink", text_or_na(file, "/permalink"));
            bullet(
                &mut out,
                "Download URL",
                text_or_na(file, "/url_private_download"),
            );

            if let Some(comment) = str_at(file, "/initial_comment/comment") {
                out.push_str(&format!(
                    "\n**Initial Comment:**\n{}\n",
                    truncate(comment, MESSAGE_PREVIEW_LIMIT)
                ));
            }
            if let Some(n) = u64_at(file, "/comments_count").filter(|n| *n > 0) {
                out.push_str(&format!("\n• **Total Comments:** {n}\n"));
            }
            if let Some(preview) = str_at(file, "/preview") {
                out.push_str(&format!(
                    "\n**Preview:**\n{}\n",
                    truncate(preview, FILE_PREVIEW_LIMIT)
                ));
            }
        }
    }
    out
}

/// Numbered list entry used by `list_files`.
pub fn format_file_line(index: usize, file: &Value) -> String {
    let mut out = format!(
        "{index}. **{}**\n",
        str_at(file, "/name").unwrap_or("Unnamed")
    );
    out.push_str(&format!("   • ID: {}\n", text_or_na(file, "/id")));
    if let Some(size) = u64_at(file, "/size") {
        out.push_str(&format!("   • Size: {}\n", format_size(size)));
    }
    if let Some(user) = str_at(file, "/user") {
        out.push_str(&format!("   • Uploaded by: <@{user}>\n"));
    }
    if let Some(created) = i64_at(file, "/created").filter(|t| *t > 0) {
        out.push_str(&format!("   • Uploaded: {}\n", format_unix_time(created)));
    }
    let shared = len_at(file, "/channels");
    if shared > 0 {
        out.push_str(&format!("   • Shared in: {shared} channel(s)\n"));
    }
    out
}

// ============== Messages ==============

/// Confirmation for a message-producing call (`chat.postMessage`, `chat.update`,
/// `chat.scheduleMessage`, ...). `record` is the Web API response.
pub fn format_message_result(heading: &str, record: &Value, detail: Detail) -> String {
    let mut out = format!("✅ **{heading}**\n\n");
    bullet(&mut out, "Channel", text_or_na(record, "/channel"));

    if let Some(id) = str_at(record, "/scheduled_message_id") {
        bullet(&mut out, "Scheduled Message ID", id);
        bullet(&mut out, "Post Time", time_or_na(record, "/post_at"));
    } else {
        bullet(&mut out, "Timestamp", text_or_na(record, "/ts"));
    }

    let text = str_at(record, "/message/text").or_else(|| str_at(record, "/text"));
    let preview = text
        .map(|t| truncate(t, MESSAGE_PREVIEW_LIMIT))
        .unwrap_or_else(|| NA.to_string());
    bullet(&mut out, "Message", preview);

    if let Some(parent) = str_at(record, "/message/thread_ts") {
        if str_at(record, "/ts") != Some(parent) {
            bullet(&mut out, "Thread Reply", format!("Yes (parent: {parent})"));
        }
    }

    let blocks = len_at(record, "/message/blocks");
    if blocks > 0 && detail == Detail::Full {
        bullet(&mut out, "Rich Formatting", format!("{blocks} block(s)"));
    }
    out
}

/// One message inside a thread listing.
pub fn format_thread_message(msg: &Value, limit: usize) -> String {
    let user = str_at(msg, "/user")
        .map(|u| format!("<@{u}>"))
        .or_else(|| str_at(msg, "/bot_id").map(|b| format!("bot {b}")))
        .unwrap_or_else(|| "Unknown".to_string());
    let time = str_at(msg, "/ts")
        .map(format_slack_ts)
        .unwrap_or_else(|| NA.to_string());
    let text = str_at(msg, "/text")
        .map(|t| truncate(t, limit))
        .unwrap_or_else(|| "No text".to_string());
    format!("{user} · {time}\n{text}\n")
}
