//! Channel tools: listing, inspection, lifecycle and membership.

use std::sync::OnceLock;

use async_trait::async_trait;
use regex::Regex;
use serde_json::Value;
use tracing::warn;

use super::{api_args, schema, Session, Tool, ToolArgs, ToolContext, ToolRegistry};
use crate::{
    errors::Error,
    formatting::{
        format_channel, format_channel_line, format_unix_time, str_at, text_or_na, Detail, NA,
    },
    Result,
};

const CHANNELS_PAGE_SIZE: i64 = 200;
const MAX_CHANNEL_PAGES: usize = 10;
const CHANNEL_INFO_MEMBER_LIMIT: u64 = 100;
const CHANNEL_INFO_MEMBERS_SHOWN: usize = 20;
const PUBLIC_CHANNELS_SHOWN: usize = 10;
const PRIVATE_CHANNELS_SHOWN: usize = 5;
const DEFAULT_CHANNEL_TYPES: &str = "public_channel,private_channel";

fn channel_name_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[a-z0-9_-]{1,80}$").expect("valid regex"))
}

pub fn register(reg: &mut ToolRegistry) {
    reg.register(ListChannels);
    reg.register(GetChannelInfo);
    reg.register(CreateChannel);
    reg.register(ArchiveChannel);
    reg.register(SetChannelTopic);
    reg.register(SetChannelPurpose);
    reg.register(JoinChannel);
    reg.register(LeaveChannel);
    reg.register(InviteToChannel);
    reg.register(RemoveFromChannel);
    reg.register(ListChannelMembers);
}

fn channel_only_schema(what: &str) -> Value {
    schema::object()
        .required_string("channel", what)
        .build()
}

fn is_true(ch: &Value, key: &str) -> bool {
    ch.get(key).and_then(Value::as_bool).unwrap_or(false)
}

fn member_ids(resp: &Value) -> Vec<&str> {
    resp.get("members")
        .and_then(Value::as_array)
        .map(|m| m.iter().filter_map(Value::as_str).collect())
        .unwrap_or_default()
}

pub struct ListChannels;

#[async_trait]
impl Tool for ListChannels {
    fn name(&self) -> &'static str {
        "list_channels"
    }

    fn description(&self) -> &'static str {
        "List channels in the workspace, grouped into public, private and archived."
    }

    fn input_schema(&self) -> Value {
        schema::object()
            .boolean("include_archived", "Include archived channels", false)
            .string_default(
                "types",
                "Comma-separated conversation types",
                DEFAULT_CHANNEL_TYPES,
            )
            .build()
    }

    async fn run(&self, ctx: &ToolContext, args: ToolArgs) -> Result<String> {
        let session = ctx.session()?;
        let include_archived = args.bool_or("include_archived", false)?;
        let types = args
            .opt_text("types")?
            .unwrap_or_else(|| DEFAULT_CHANNEL_TYPES.to_string());

        let mut channels: Vec<Value> = Vec::new();
        let mut cursor: Option<String> = None;
        for _ in 0..MAX_CHANNEL_PAGES {
            let resp = session
                .call(
                    "conversations.list",
                    api_args()
                        .set("types", types.as_str())
                        .set("exclude_archived", !include_archived)
                        .set("limit", CHANNELS_PAGE_SIZE)
                        .set_opt("cursor", cursor.take())
                        .build(),
                )
                .await?;
            if let Some(page) = resp.get("channels").and_then(Value::as_array) {
                channels.extend(page.iter().cloned());
            }
            match str_at(&resp, "/response_metadata/next_cursor") {
                Some(next) => cursor = Some(next.to_string()),
                None => break,
            }
        }

        if channels.is_empty() {
            return Ok("No channels found.".to_string());
        }

        let by_name = |a: &&Value, b: &&Value| text_or_na(a, "/name").cmp(text_or_na(b, "/name"));
        let mut public: Vec<&Value> = channels
            .iter()
            .filter(|c| !is_true(c, "is_private") && !is_true(c, "is_archived"))
            .collect();
        let mut private: Vec<&Value> = channels
            .iter()
            .filter(|c| is_true(c, "is_private") && !is_true(c, "is_archived"))
            .collect();
        let archived = channels.iter().filter(|c| is_true(c, "is_archived")).count();
        public.sort_by(by_name);
        private.sort_by(by_name);

        let mut out = format!("📋 **Slack Channels** ({} total)\n\n", channels.len());
        if !public.is_empty() {
            out.push_str("**🔓 Public Channels:**\n");
            for ch in public.iter().take(PUBLIC_CHANNELS_SHOWN) {
                out.push_str(&format_channel_line(ch));
            }
            if public.len() > PUBLIC_CHANNELS_SHOWN {
                out.push_str(&format!(
                    "... and {} more\n",
                    public.len() - PUBLIC_CHANNELS_SHOWN
                ));
            }
            out.push('\n');
        }
        if !private.is_empty() {
            out.push_str("**🔒 Private Channels:**\n");
            for ch in private.iter().take(PRIVATE_CHANNELS_SHOWN) {
                out.push_str(&format_channel_line(ch));
            }
            if private.len() > PRIVATE_CHANNELS_SHOWN {
                out.push_str(&format!(
                    "... and {} more\n",
                    private.len() - PRIVATE_CHANNELS_SHOWN
                ));
            }
            out.push('\n');
        }
        if archived > 0 {
            out.push_str(&format!("**📦 Archived Channels:** {archived} total\n\n"));
        }

        out.push_str("**Summary:**\n");
        out.push_str(&format!("• Public: {}\n", public.len()));
        out.push_str(&format!("• Private: {}\n", private.len()));
        out.push_str(&format!("• Archived: {archived}\n"));
        out.push_str(&format!("• Total: {}\n", channels.len()));
        if cursor.is_some() {
            out.push_str(&format!(
                "\nListing stopped after {MAX_CHANNEL_PAGES} pages; more channels exist.\n"
            ));
        }
        Ok(out)
    }
}

pub struct GetChannelInfo;

#[async_trait]
impl Tool for GetChannelInfo {
    fn name(&self) -> &'static str {
        "get_channel_info"
    }

    fn description(&self) -> &'static str {
        "Show details of one channel: type, topic, purpose, creator, and members for small channels."
    }

    fn input_schema(&self) -> Value {
        channel_only_schema("Channel ID (e.g. C1234567890)")
    }

    async fn run(&self, ctx: &ToolContext, args: ToolArgs) -> Result<String> {
        let session = ctx.session()?;
        let channel = args.id("channel")?;

        let resp = session
            .call(
                "conversations.info",
                api_args()
                    .set("channel", channel.as_str())
                    .set("include_num_members", true)
                    .build(),
            )
            .await?;
        let ch = resp.get("channel").cloned().unwrap_or(Value::Null);
        let mut out = format_channel(&ch, Detail::Full);

        let small = ch
            .get("num_members")
            .and_then(Value::as_u64)
            .is_some_and(|n| n <= CHANNEL_INFO_MEMBER_LIMIT);
        if small {
            let members = match session
                .call(
                    "conversations.members",
                    api_args()
                        .set("channel", channel.as_str())
                        .set("limit", CHANNEL_INFO_MEMBER_LIMIT)
                        .build(),
                )
                .await
            {
                Ok(members) => members,
                Err(Error::Remote(err)) => {
                    warn!(channel = %channel, "Listing channel members failed: {}", err);
                    Value::Null
                }
                Err(other) => return Err(other),
            };
            let ids = member_ids(&members);
            if !ids.is_empty() {
                out.push_str(&format!("\n**Members ({}):**\n", ids.len()));
                let shown: Vec<String> = ids
                    .iter()
                    .take(CHANNEL_INFO_MEMBERS_SHOWN)
                    .map(|id| format!("<@{id}>"))
                    .collect();
                out.push_str(&shown.join(", "));
                if ids.len() > CHANNEL_INFO_MEMBERS_SHOWN {
                    out.push_str(&format!(
                        "\n... and {} more",
                        ids.len() - CHANNEL_INFO_MEMBERS_SHOWN
                    ));
                }
                out.push('\n');
            }
        }
        Ok(out)
    }
}

pub struct CreateChannel;

#[async_trait]
impl Tool for CreateChannel {
    fn name(&self) -> &'static str {
        "create_channel"
    }

    fn description(&self) -> &'static str {
        "Create a public or private channel, optionally setting its purpose."
    }

    fn input_schema(&self) -> Value {
        schema::object()
            .required_string(
                "name",
                "Channel name: up to 80 lowercase letters, digits, hyphens or underscores",
            )
            .boolean("is_private", "Create a private channel", false)
            .string("description", "Channel purpose")
            .string("team_id", "Workspace ID (Enterprise Grid only)")
            .build()
    }

    async fn run(&self, ctx: &ToolContext, args: ToolArgs) -> Result<String> {
        let session = ctx.session()?;
        let raw = args.text("name")?;
        let name = raw.trim().trim_start_matches('#');
        if !channel_name_re().is_match(name) {
            return Err(Error::validation(
                "name",
                "must be 1-80 characters of lowercase letters, digits, '-' or '_'",
            ));
        }
        let is_private = args.bool_or("is_private", false)?;
        let description = args.opt_text("description")?;
        let team_id = args.opt_id("team_id")?;

        let resp = session
            .call(
                "conversations.create",
                api_args()
                    .set("name", name)
                    .set("is_private", is_private)
                    .set_opt("team_id", team_id)
                    .build(),
            )
            .await?;
        let ch = resp.get("channel").cloned().unwrap_or(Value::Null);
        let id = text_or_na(&ch, "/id").to_string();

        let kind = if is_private { "Private" } else { "Public" };
        let mut out = String::from("✅ **Channel Created Successfully**\n\n");
        out.push_str(&format!("• **Name:** #{}\n", text_or_na(&ch, "/name")));
        out.push_str(&format!("• **ID:** {id}\n"));
        out.push_str(&format!("• **Type:** {kind} Channel\n"));
        out.push_str(&format!(
            "• **Creator:** {}\n",
            str_at(&ch, "/creator")
                .map(|c| format!("<@{c}>"))
                .unwrap_or_else(|| NA.to_string())
        ));
        let created = ch
            .get("created")
            .and_then(Value::as_i64)
            .map(format_unix_time)
            .unwrap_or_else(|| NA.to_string());
        out.push_str(&format!("• **Created:** {created}\n"));

        if let Some(purpose) = description {
            if id != NA {
                let set = session
                    .call(
                        "conversations.setPurpose",
                        api_args()
                            .set("channel", id.as_str())
                            .set("purpose", purpose.as_str())
                            .build(),
                    )
                    .await;
                match set {
                    Ok(_) => out.push_str(&format!("• **Purpose:** {purpose}\n")),
                    // The channel exists at this point; report the purpose as unset.
                    Err(Error::Remote(err)) => {
                        warn!(channel = %id, "Setting channel purpose failed: {}", err);
                        let reason = err.code().unwrap_or("request failed");
                        out.push_str(&format!("• **Purpose:** not set ({reason})\n"));
                    }
                    Err(other) => return Err(other),
                }
            }
        }
        Ok(out)
    }
}

/// Calls that take only `channel` and return nothing worth showing.
async fn channel_action(session: &Session<'_>, method: &str, channel: &str) -> Result<Value> {
    session
        .call(method, api_args().set("channel", channel).build())
        .await
}

pub struct ArchiveChannel;

#[async_trait]
impl Tool for ArchiveChannel {
    fn name(&self) -> &'static str {
        "archive_channel"
    }

    fn description(&self) -> &'static str {
        "Archive a channel."
    }

    fn input_schema(&self) -> Value {
        channel_only_schema("Channel ID to archive")
    }

    async fn run(&self, ctx: &ToolContext, args: ToolArgs) -> Result<String> {
        let session = ctx.session()?;
        let channel = args.id("channel")?;
        channel_action(&session, "conversations.archive", &channel).await?;
        Ok(format!(
            "📦 **Channel Archived Successfully**\n\n• **Channel ID:** {channel}\n• **Status:** Archived\n"
        ))
    }
}

pub struct SetChannelTopic;

#[async_trait]
impl Tool for SetChannelTopic {
    fn name(&self) -> &'static str {
        "set_channel_topic"
    }

    fn description(&self) -> &'static str {
        "Set a channel's topic."
    }

    fn input_schema(&self) -> Value {
        schema::object()
            .required_string("channel", "Channel ID")
            .required_string("topic", "New topic")
            .build()
    }

    async fn run(&self, ctx: &ToolContext, args: ToolArgs) -> Result<String> {
        let session = ctx.session()?;
        let channel = args.id("channel")?;
        let topic = args.text("topic")?;
        session
            .call(
                "conversations.setTopic",
                api_args()
                    .set("channel", channel.as_str())
                    .set("topic", topic.as_str())
                    .build(),
            )
            .await?;
        Ok(format!(
            "✅ **Channel Topic Updated**\n\n• **Channel:** {channel}\n• **New Topic:** {topic}\n"
        ))
    }
}

pub struct SetChannelPurpose;

#[async_trait]
impl Tool for SetChannelPurpose {
    fn name(&self) -> &'static str {
        "set_channel_purpose"
    }

    fn description(&self) -> &'static str {
        "Set a channel's purpose (description)."
    }

    fn input_schema(&self) -> Value {
        schema::object()
            .required_string("channel", "Channel ID")
            .required_string("purpose", "New purpose")
            .build()
    }

    async fn run(&self, ctx: &ToolContext, args: ToolArgs) -> Result<String> {
        let session = ctx.session()?;
        let channel = args.id("channel")?;
        let purpose = args.text("purpose")?;
        session
            .call(
                "conversations.setPurpose",
                api_args()
                    .set("channel", channel.as_str())
                    .set("purpose", purpose.as_str())
                    .build(),
            )
            .await?;
        Ok(format!(
            "✅ **Channel Purpose Updated**\n\n• **Channel:** {channel}\n• **New Purpose:** {purpose}\n"
        ))
    }
}

pub struct JoinChannel;

#[async_trait]
impl Tool for JoinChannel {
    fn name(&self) -> &'static str {
        "join_channel"
    }

    fn description(&self) -> &'static str {
        "Join a public channel."
    }

    fn input_schema(&self) -> Value {
        channel_only_schema("Channel ID to join")
    }

    async fn run(&self, ctx: &ToolContext, args: ToolArgs) -> Result<String> {
        let session = ctx.session()?;
        let channel = args.id("channel")?;
        let resp = channel_action(&session, "conversations.join", &channel).await?;
        let ch = resp.get("channel").cloned().unwrap_or(Value::Null);
        Ok(format!(
            "✅ **Joined Channel Successfully**\n\n{}",
            format_channel(&ch, Detail::Summary)
        ))
    }
}

pub struct LeaveChannel;

#[async_trait]
impl Tool for LeaveChannel {
    fn name(&self) -> &'static str {
        "leave_channel"
    }

    fn description(&self) -> &'static str {
        "Leave a channel."
    }

    fn input_schema(&self) -> Value {
        channel_only_schema("Channel ID to leave")
    }

    async fn run(&self, ctx: &ToolContext, args: ToolArgs) -> Result<String> {
        let session = ctx.session()?;
        let channel = args.id("channel")?;
        channel_action(&session, "conversations.leave", &channel).await?;
        Ok(format!(
            "👋 **Left Channel Successfully**\n\n• **Channel ID:** {channel}\n• **Status:** No longer a member\n"
        ))
    }
}

pub struct InviteToChannel;

#[async_trait]
impl Tool for InviteToChannel {
    fn name(&self) -> &'static str {
        "invite_to_channel"
    }

    fn description(&self) -> &'static str {
        "Invite one or more users to a channel."
    }

    fn input_schema(&self) -> Value {
        schema::object()
            .required_string("channel", "Channel ID")
            .required_string("users", "Comma-separated user IDs")
            .build()
    }

    async fn run(&self, ctx: &ToolContext, args: ToolArgs) -> Result<String> {
        let session = ctx.session()?;
        let channel = args.id("channel")?;
        let users = args.csv("users")?;

        let resp = session
            .call(
                "conversations.invite",
                api_args()
                    .set("channel", channel.as_str())
                    .set("users", users.join(","))
                    .build(),
            )
            .await?;
        let ch = resp.get("channel").cloned().unwrap_or(Value::Null);

        let mut out = String::from("✅ **Users Invited Successfully**\n\n");
        out.push_str(&format!(
            "• **Channel:** #{} ({channel})\n",
            text_or_na(&ch, "/name")
        ));
        out.push_str(&format!("• **Invited Users:** {}\n", users.len()));
        for user in &users {
            out.push_str(&format!("  - <@{user}>\n"));
        }
        if let Some(n) = ch.get("num_members").and_then(Value::as_u64) {
            out.push_str(&format!("• **Total Members:** {n}\n"));
        }
        Ok(out)
    }
}

pub struct RemoveFromChannel;

#[async_trait]
impl Tool for RemoveFromChannel {
    fn name(&self) -> &'static str {
        "remove_from_channel"
    }

    fn description(&self) -> &'static str {
        "Remove a user from a channel."
    }

    fn input_schema(&self) -> Value {
        schema::object()
            .required_string("channel", "Channel ID")
            .required_string("user", "User ID to remove")
            .build()
    }

    async fn run(&self, ctx: &ToolContext, args: ToolArgs) -> Result<String> {
        let session = ctx.session()?;
        let channel = args.id("channel")?;
        let user = args.id("user")?;
        session
            .call(
                "conversations.kick",
                api_args()
                    .set("channel", channel.as_str())
                    .set("user", user.as_str())
                    .build(),
            )
            .await?;
        Ok(format!(
            "✅ **User Removed from Channel**\n\n• **Channel:** {channel}\n• **Removed User:** <@{user}>\n"
        ))
    }
}

pub struct ListChannelMembers;

#[async_trait]
impl Tool for ListChannelMembers {
    fn name(&self) -> &'static str {
        "list_channel_members"
    }

    fn description(&self) -> &'static str {
        "List the members of a channel."
    }

    fn input_schema(&self) -> Value {
        schema::object()
            .required_string("channel", "Channel ID")
            .integer("limit", "Maximum number of members to return", 100, 1, 1000)
            .build()
    }

    async fn run(&self, ctx: &ToolContext, args: ToolArgs) -> Result<String> {
        let session = ctx.session()?;
        let channel = args.id("channel")?;
        let limit = args.int_in("limit", 100, 1, 1000)?;

        let resp = session
            .call(
                "conversations.members",
                api_args()
                    .set("channel", channel.as_str())
                    .set("limit", limit)
                    .build(),
            )
            .await?;
        let ids = member_ids(&resp);

        let mut out = format!("👥 **Channel Members** ({} total)\n\n", ids.len());
        out.push_str(&format!("• **Channel ID:** {channel}\n\n"));
        if ids.is_empty() {
            out.push_str("No members found.\n");
            return Ok(out);
        }
        out.push_str("**Members:**\n");
        for (i, id) in ids.iter().enumerate() {
            out.push_str(&format!("{}. <@{id}>\n", i + 1));
        }
        if str_at(&resp, "/response_metadata/next_cursor").is_some() {
            out.push_str("\nMore members exist beyond this limit.\n");
        }
        Ok(out)
    }
}
