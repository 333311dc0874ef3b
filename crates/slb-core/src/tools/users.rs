//! User tools: profiles, directory listing, search, presence, timezone.

use async_trait::async_trait;
use chrono::{Duration as ChronoDuration, Utc};
use serde_json::Value;
use tracing::warn;

use super::{api_args, schema, Tool, ToolArgs, ToolContext, ToolRegistry};
use crate::{
    errors::Error,
    formatting::{format_unix_time, format_user, str_at, user_display_name, Detail},
    utils, Result,
};

const ADMINS_SHOWN: usize = 10;
const REGULAR_USERS_SHOWN: usize = 15;
const BOTS_SHOWN: usize = 5;
const SEARCH_MATCHES_SHOWN: usize = 20;
const SEARCH_SCAN_LIMIT: i64 = 1000;
const CONVERSATIONS_SHOWN: usize = 10;
const GROUP_DMS_SHOWN: usize = 5;
const DEFAULT_CONVERSATION_TYPES: &str = "public_channel,private_channel,mpim,im";

pub fn register(reg: &mut ToolRegistry) {
    reg.register(GetUserInfo);
    reg.register(ListWorkspaceMembers);
    reg.register(SearchSlackUsers);
    reg.register(GetUserPresence);
    reg.register(GetUserTimezone);
    reg.register(GetUserConversations);
}

fn flag(v: &Value, key: &str) -> bool {
    v.get(key).and_then(Value::as_bool).unwrap_or(false)
}

fn members_of(resp: &Value, key: &str) -> Vec<Value> {
    resp.get(key)
        .and_then(Value::as_array)
        .cloned()
        .unwrap_or_default()
}

/// Append `... and N more` when a section was cut.
fn more_line(out: &mut String, total: usize, shown: usize, noun: &str) {
    if total > shown {
        out.push_str(&format!("... and {} more{noun}\n", total - shown));
    }
}

pub struct GetUserInfo;

#[async_trait]
impl Tool for GetUserInfo {
    fn name(&self) -> &'static str {
        "get_user_info"
    }

    fn description(&self) -> &'static str {
        "Show a user's profile. Accepts a user ID or an email address."
    }

    fn input_schema(&self) -> Value {
        schema::object()
            .required_string("user", "User ID (U1234567890) or email address")
            .build()
    }

    async fn run(&self, ctx: &ToolContext, args: ToolArgs) -> Result<String> {
        let session = ctx.session()?;
        let raw = args.text("user")?;
        let query = raw.trim();

        let resp = if utils::looks_like_email(query) {
            session
                .call("users.lookupByEmail", api_args().set("email", query).build())
                .await?
        } else {
            let user = args.id("user")?;
            session
                .call("users.info", api_args().set("user", user).build())
                .await?
        };
        let user = resp.get("user").cloned().unwrap_or(Value::Null);
        Ok(format_user(&user, Detail::Full))
    }
}

pub struct ListWorkspaceMembers;

#[async_trait]
impl Tool for ListWorkspaceMembers {
    fn name(&self) -> &'static str {
        "list_workspace_members"
    }

    fn description(&self) -> &'static str {
        "List workspace members, grouped into admins, regular users and bots."
    }

    fn input_schema(&self) -> Value {
        schema::object()
            .integer("limit", "Maximum number of members to fetch", 100, 1, 1000)
            .build()
    }

    async fn run(&self, ctx: &ToolContext, args: ToolArgs) -> Result<String> {
        let session = ctx.session()?;
        let limit = args.int_in("limit", 100, 1, 1000)?;

        let resp = session
            .call("users.list", api_args().set("limit", limit).build())
            .await?;
        let members = members_of(&resp, "members");
        let active: Vec<&Value> = members.iter().filter(|m| !flag(m, "deleted")).collect();

        let bots: Vec<&Value> = active
            .iter()
            .copied()
            .filter(|m| flag(m, "is_bot") || str_at(m, "/id") == Some("USLACKBOT"))
            .collect();
        let admins: Vec<&Value> = active
            .iter()
            .copied()
            .filter(|m| !bots.contains(m) && (flag(m, "is_admin") || flag(m, "is_owner")))
            .collect();
        let regular: Vec<&Value> = active
            .iter()
            .copied()
            .filter(|m| !bots.contains(m) && !admins.contains(m))
            .collect();

        let mut out = format!(
            "👥 **Workspace Members** ({} active, {} total)\n\n",
            active.len(),
            members.len()
        );
        if active.is_empty() {
            out.push_str("No active members found.\n");
            return Ok(out);
        }

        for (title, group, shown) in [
            ("Admins & Owners", &admins, ADMINS_SHOWN),
            ("Regular Users", &regular, REGULAR_USERS_SHOWN),
            ("Bots", &bots, BOTS_SHOWN),
        ] {
            if group.is_empty() {
                continue;
            }
            out.push_str(&format!("**{title} ({}):**\n", group.len()));
            for (i, m) in group.iter().take(shown).enumerate() {
                out.push_str(&format!("{}. {}\n", i + 1, format_user(m, Detail::Summary)));
            }
            more_line(&mut out, group.len(), shown, "");
            out.push('\n');
        }
        if str_at(&resp, "/response_metadata/next_cursor").is_some() {
            out.push_str("More members exist beyond this limit.\n");
        }
        Ok(out)
    }
}

fn user_matches(member: &Value, needle: &str) -> bool {
    ["/name", "/real_name", "/profile/display_name", "/profile/email", "/profile/title"]
        .iter()
        .filter_map(|p| str_at(member, p))
        .any(|field| field.to_lowercase().contains(needle))
}

pub struct SearchSlackUsers;

#[async_trait]
impl Tool for SearchSlackUsers {
    fn name(&self) -> &'static str {
        "search_slack_users"
    }

    fn description(&self) -> &'static str {
        "Search users by name, display name, email or title."
    }

    fn input_schema(&self) -> Value {
        schema::object()
            .required_string("query", "Text to look for (case-insensitive)")
            .build()
    }

    async fn run(&self, ctx: &ToolContext, args: ToolArgs) -> Result<String> {
        let session = ctx.session()?;
        let query = args.text("query")?;
        let needle = query.trim().to_lowercase();

        let resp = session
            .call("users.list", api_args().set("limit", SEARCH_SCAN_LIMIT).build())
            .await?;
        let members = members_of(&resp, "members");
        let matches: Vec<&Value> = members
            .iter()
            .filter(|m| !flag(m, "deleted") && user_matches(m, &needle))
            .collect();

        if matches.is_empty() {
            return Ok(format!("No users found matching '{query}'"));
        }

        let mut out = format!(
            "🔍 **Search Results for '{query}'** ({} found)\n\n",
            matches.len()
        );
        for (i, user) in matches.iter().take(SEARCH_MATCHES_SHOWN).enumerate() {
            out.push_str(&format!("**{}. {}**\n", i + 1, user_display_name(user)));
            if let Some(name) = str_at(user, "/name") {
                out.push_str(&format!("   • Username: @{name}\n"));
            }
            if let Some(title) = str_at(user, "/profile/title") {
                out.push_str(&format!("   • Title: {title}\n"));
            }
            if let Some(email) = str_at(user, "/profile/email") {
                out.push_str(&format!("   • Email: {email}\n"));
            }
            if flag(user, "is_bot") {
                out.push_str("   • Type: Bot 🤖\n");
            } else if flag(user, "is_owner") {
                out.push_str("   • Type: Owner 👑\n");
            } else if flag(user, "is_admin") {
                out.push_str("   • Type: Admin\n");
            }
            out.push('\n');
        }
        more_line(&mut out, matches.len(), SEARCH_MATCHES_SHOWN, " matches");
        Ok(out)
    }
}

pub struct GetUserPresence;

#[async_trait]
impl Tool for GetUserPresence {
    fn name(&self) -> &'static str {
        "get_user_presence"
    }

    fn description(&self) -> &'static str {
        "Show whether a user is currently active or away."
    }

    fn input_schema(&self) -> Value {
        schema::object()
            .required_string("user", "User ID")
            .build()
    }

    async fn run(&self, ctx: &ToolContext, args: ToolArgs) -> Result<String> {
        let session = ctx.session()?;
        let user = args.id("user")?;

        let presence = session
            .call("users.getPresence", api_args().set("user", user.as_str()).build())
            .await?;
        let info = match session
            .call("users.info", api_args().set("user", user.as_str()).build())
            .await
        {
            Ok(info) => info,
            Err(Error::Remote(err)) => {
                warn!(user = %user, "User lookup failed: {}", err);
                Value::Null
            }
            Err(other) => return Err(other),
        };
        let name = info
            .get("user")
            .map(user_display_name)
            .unwrap_or("Unknown User");

        let mut out = format!("🟢 **User Presence for {name}**\n\n");
        out.push_str(&format!("• **User:** <@{user}>\n"));
        let status = match str_at(&presence, "/presence").unwrap_or("unknown") {
            "active" => "🟢 Active".to_string(),
            "away" => "🟡 Away".to_string(),
            other => format!("⚪ {other}"),
        };
        out.push_str(&format!("• **Status:** {status}\n"));
        if flag(&presence, "auto_away") {
            out.push_str("• **Auto-away:** Yes\n");
        }
        if flag(&presence, "manual_away") {
            out.push_str("• **Manual away:** Yes\n");
        }
        if let Some(ts) = presence.get("last_activity").and_then(Value::as_i64) {
            out.push_str(&format!("• **Last Activity:** {}\n", format_unix_time(ts)));
        }
        if let Some(n) = presence.get("connection_count").and_then(Value::as_u64) {
            out.push_str(&format!("• **Active Connections:** {n}\n"));
        }
        Ok(out)
    }
}

pub struct GetUserTimezone;

#[async_trait]
impl Tool for GetUserTimezone {
    fn name(&self) -> &'static str {
        "get_user_timezone"
    }

    fn description(&self) -> &'static str {
        "Show a user's timezone, UTC offset and current local time."
    }

    fn input_schema(&self) -> Value {
        schema::object()
            .required_string("user", "User ID")
            .build()
    }

    async fn run(&self, ctx: &ToolContext, args: ToolArgs) -> Result<String> {
        let session = ctx.session()?;
        let user = args.id("user")?;

        let resp = session
            .call("users.info", api_args().set("user", user).build())
            .await?;
        let data = resp.get("user").cloned().unwrap_or(Value::Null);

        let mut out = format!(
            "🌍 **Timezone Information for {}**\n\n",
            user_display_name(&data)
        );
        out.push_str(&format!(
            "• **Timezone:** {}\n",
            str_at(&data, "/tz").unwrap_or("Not set")
        ));
        out.push_str(&format!(
            "• **Timezone Label:** {}\n",
            str_at(&data, "/tz_label").unwrap_or("Not set")
        ));
        match data.get("tz_offset").and_then(Value::as_i64) {
            Some(offset) => {
                out.push_str(&format!(
                    "• **UTC Offset:** {:+.1} hours\n",
                    offset as f64 / 3600.0
                ));
                let local = Utc::now() + ChronoDuration::seconds(offset);
                out.push_str(&format!(
                    "• **Current Time:** {}\n",
                    local.format("%Y-%m-%d %H:%M:%S")
                ));
            }
            None => out.push_str("• **UTC Offset:** Not set\n"),
        }
        Ok(out)
    }
}

pub struct GetUserConversations;

#[async_trait]
impl Tool for GetUserConversations {
    fn name(&self) -> &'static str {
        "get_user_conversations"
    }

    fn description(&self) -> &'static str {
        "List the conversations the authenticated user belongs to: channels, DMs and group DMs."
    }

    fn input_schema(&self) -> Value {
        schema::object()
            .string_default(
                "types",
                "Comma-separated conversation types",
                DEFAULT_CONVERSATION_TYPES,
            )
            .integer("limit", "Maximum number of conversations to return", 100, 1, 1000)
            .build()
    }

    async fn run(&self, ctx: &ToolContext, args: ToolArgs) -> Result<String> {
        let session = ctx.session()?;
        let types = args
            .opt_text("types")?
            .unwrap_or_else(|| DEFAULT_CONVERSATION_TYPES.to_string());
        let limit = args.int_in("limit", 100, 1, 1000)?;

        let resp = session
            .call(
                "users.conversations",
                api_args()
                    .set("types", types)
                    .set("limit", limit)
                    .set("exclude_archived", true)
                    .build(),
            )
            .await?;
        let convs = members_of(&resp, "channels");

        let public: Vec<&Value> = convs
            .iter()
            .filter(|c| flag(c, "is_channel") && !flag(c, "is_private"))
            .collect();
        let private: Vec<&Value> = convs
            .iter()
            .filter(|c| (flag(c, "is_channel") || flag(c, "is_group")) && flag(c, "is_private") && !flag(c, "is_mpim"))
            .collect();
        let dms: Vec<&Value> = convs.iter().filter(|c| flag(c, "is_im")).collect();
        let mpims: Vec<&Value> = convs.iter().filter(|c| flag(c, "is_mpim")).collect();

        let mut out = format!("💬 **User Conversations** ({} total)\n\n", convs.len());
        if convs.is_empty() {
            out.push_str("No conversations found.\n");
            return Ok(out);
        }

        let channel_entry = |ch: &Value, lock: &str| {
            let mut line = format!("{lock}#{}", str_at(ch, "/name").unwrap_or("unknown"));
            if let Some(n) = ch.get("num_members").and_then(Value::as_u64) {
                line.push_str(&format!(" ({n} members)"));
            }
            line
        };

        if !public.is_empty() {
            out.push_str(&format!("**Public Channels ({}):**\n", public.len()));
            for (i, ch) in public.iter().take(CONVERSATIONS_SHOWN).enumerate() {
                out.push_str(&format!("{}. {}\n", i + 1, channel_entry(ch, "")));
            }
            more_line(&mut out, public.len(), CONVERSATIONS_SHOWN, "");
            out.push('\n');
        }
        if !private.is_empty() {
            out.push_str(&format!("**Private Channels ({}):**\n", private.len()));
            for (i, ch) in private.iter().take(CONVERSATIONS_SHOWN).enumerate() {
                out.push_str(&format!("{}. {}\n", i + 1, channel_entry(ch, "🔒 ")));
            }
            more_line(&mut out, private.len(), CONVERSATIONS_SHOWN, "");
            out.push('\n');
        }
        if !dms.is_empty() {
            out.push_str(&format!("**Direct Messages ({}):**\n", dms.len()));
            for (i, dm) in dms.iter().take(CONVERSATIONS_SHOWN).enumerate() {
                let with = str_at(dm, "/user").unwrap_or("unknown");
                out.push_str(&format!("{}. DM with <@{with}>\n", i + 1));
            }
            more_line(&mut out, dms.len(), CONVERSATIONS_SHOWN, "");
            out.push('\n');
        }
        if !mpims.is_empty() {
            out.push_str(&format!("**Group DMs ({}):**\n", mpims.len()));
            for (i, g) in mpims.iter().take(GROUP_DMS_SHOWN).enumerate() {
                out.push_str(&format!(
                    "{}. {}\n",
                    i + 1,
                    str_at(g, "/name").unwrap_or("Group DM")
                ));
            }
            more_line(&mut out, mpims.len(), GROUP_DMS_SHOWN, "");
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::{
        errors::{Error, RemoteError},
        testing::configured,
    };

    fn args(v: Value) -> ToolArgs {
        ToolArgs::from_value(v).unwrap()
    }

    #[tokio::test]
    async fn user_info_by_id() {
        let (ctx, slack) = configured();
        slack.respond_ok(
            "users.info",
            json!({"user": {"id": "U1", "name": "ann", "tz": "Europe/Paris", "profile": {"real_name": "Ann Lee", "email": "ann@example.com"}}}),
        );

        let text = GetUserInfo
            .run(&ctx, args(json!({"user": "<@U1>"})))
            .await
            .unwrap();

        assert!(text.starts_with("👤 **User Information**"));
        assert!(text.contains("• **Real Name:** Ann Lee"));
        assert!(text.contains("• **Title:** N/A"));
        assert_eq!(slack.last_args("users.info").unwrap()["user"], "U1");
    }

    #[tokio::test]
    async fn user_info_by_email_uses_lookup() {
        let (ctx, slack) = configured();
        slack.respond_ok("users.lookupByEmail", json!({"user": {"id": "U2", "name": "bob"}}));

        GetUserInfo
            .run(&ctx, args(json!({"user": "bob@example.com"})))
            .await
            .unwrap();

        assert_eq!(slack.methods(), vec!["users.lookupByEmail"]);
        assert_eq!(
            slack.last_args("users.lookupByEmail").unwrap()["email"],
            "bob@example.com"
        );
    }

    #[tokio::test]
    async fn unknown_user_states_not_found_with_remote_detail() {
        let (ctx, slack) = configured();
        slack.respond_err(
            "users.info",
            RemoteError::rejected("user_not_found", "no user with id U404"),
        );

        let err = GetUserInfo
            .run(&ctx, args(json!({"user": "U404"})))
            .await
            .unwrap_err();

        assert!(matches!(
            &err,
            Error::Remote(RemoteError::Rejected { code, .. }) if code == "user_not_found"
        ));
        let text = err.display_text();
        assert!(text.contains("User not found"));
        assert!(text.contains("no user with id U404"));
    }

    #[tokio::test]
    async fn workspace_members_are_grouped() {
        let (ctx, slack) = configured();
        slack.respond_ok(
            "users.list",
            json!({"members": [
                {"id": "U1", "name": "boss", "real_name": "Big Boss", "is_owner": true, "is_admin": true},
                {"id": "U2", "name": "ann", "real_name": "Ann"},
                {"id": "B1", "name": "deploybot", "is_bot": true},
                {"id": "U3", "name": "gone", "deleted": true}
            ]}),
        );

        let text = ListWorkspaceMembers
            .run(&ctx, args(json!({"limit": 50})))
            .await
            .unwrap();

        assert!(text.starts_with("👥 **Workspace Members** (3 active, 4 total)"));
        assert!(text.contains("**Admins & Owners (1):**\n1. Big Boss (@boss) 👑"));
        assert!(text.contains("**Regular Users (1):**\n1. Ann (@ann)"));
        assert!(text.contains("**Bots (1):**\n1. deploybot (@deploybot) 🤖"));
        assert!(!text.contains("gone"));
        assert_eq!(slack.last_args("users.list").unwrap()["limit"], 50);
    }

    #[tokio::test]
    async fn search_is_case_insensitive_and_skips_deleted() {
        let (ctx, slack) = configured();
        slack.respond_ok(
            "users.list",
            json!({"members": [
                {"id": "U1", "name": "ann", "real_name": "Ann Lee", "profile": {"title": "Engineer"}},
                {"id": "U2", "name": "bob", "profile": {"email": "bob@ENG.example.com"}},
                {"id": "U3", "name": "engold", "deleted": true},
                {"id": "U4", "name": "cat"}
            ]}),
        );

        let text = SearchSlackUsers
            .run(&ctx, args(json!({"query": "eng"})))
            .await
            .unwrap();

        assert!(text.contains("(2 found)"));
        assert!(text.contains("**1. Ann Lee**"));
        assert!(text.contains("   • Email: bob@ENG.example.com"));
        assert!(!text.contains("engold"));
        assert_eq!(slack.last_args("users.list").unwrap()["limit"], 1000);
    }

    #[tokio::test]
    async fn search_without_matches() {
        let (ctx, _) = configured();
        let text = SearchSlackUsers
            .run(&ctx, args(json!({"query": "zed"})))
            .await
            .unwrap();
        assert_eq!(text, "No users found matching 'zed'");
    }

    #[tokio::test]
    async fn presence_and_timezone() {
        let (ctx, slack) = configured();
        slack.respond_ok(
            "users.getPresence",
            json!({"presence": "away", "auto_away": true, "last_activity": 1700000000}),
        );
        slack.respond_ok("users.info", json!({"user": {"id": "U1", "real_name": "Ann"}}));
        slack.respond_ok(
            "users.info",
            json!({"user": {"id": "U1", "real_name": "Ann", "tz": "Asia/Kolkata", "tz_label": "India Standard Time", "tz_offset": 19800}}),
        );

        let presence = GetUserPresence
            .run(&ctx, args(json!({"user": "U1"})))
            .await
            .unwrap();
        assert!(presence.starts_with("🟢 **User Presence for Ann**"));
        assert!(presence.contains("• **Status:** 🟡 Away"));
        assert!(presence.contains("• **Auto-away:** Yes"));
        assert!(presence.contains("• **Last Activity:** 2023-11-14 22:13:20 UTC"));

        let tz = GetUserTimezone
            .run(&ctx, args(json!({"user": "U1"})))
            .await
            .unwrap();
        assert!(tz.contains("• **Timezone:** Asia/Kolkata"));
        assert!(tz.contains("• **UTC Offset:** +5.5 hours"));
        assert!(tz.contains("• **Current Time:** "));
        assert_eq!(
            slack.methods(),
            vec!["users.getPresence", "users.info", "users.info"]
        );
    }

    #[tokio::test]
    async fn presence_falls_back_when_profile_is_hidden() {
        let (ctx, slack) = configured();
        slack.respond_ok("users.getPresence", json!({"presence": "active"}));
        slack.respond_err(
            "users.info",
            RemoteError::rejected("user_not_visible", "user_not_visible"),
        );

        let text = GetUserPresence
            .run(&ctx, args(json!({"user": "U9"})))
            .await
            .unwrap();

        assert!(text.starts_with("🟢 **User Presence for Unknown User**"));
        assert!(text.contains("• **User:** <@U9>"));
        assert!(text.contains("• **Status:** 🟢 Active"));
    }

    #[tokio::test]
    async fn conversations_are_grouped_by_kind() {
        let (ctx, slack) = configured();
        slack.respond_ok(
            "users.conversations",
            json!({"channels": [
                {"id": "C1", "name": "general", "is_channel": true, "num_members": 12},
                {"id": "G1", "name": "secret", "is_channel": true, "is_private": true},
                {"id": "D1", "is_im": true, "user": "U9"},
                {"id": "G2", "name": "mpdm-a--b-1", "is_mpim": true, "is_private": true}
            ]}),
        );

        let text = GetUserConversations
            .run(&ctx, ToolArgs::default())
            .await
            .unwrap();

        assert!(text.starts_with("💬 **User Conversations** (4 total)"));
        assert!(text.contains("**Public Channels (1):**\n1. #general (12 members)"));
        assert!(text.contains("**Private Channels (1):**\n1. 🔒 #secret"));
        assert!(text.contains("1. DM with <@U9>"));
        assert!(text.contains("**Group DMs (1):**\n1. mpdm-a--b-1"));
        let sent = slack.last_args("users.conversations").unwrap();
        assert_eq!(sent["types"], DEFAULT_CONVERSATION_TYPES);
        assert_eq!(sent["limit"], 100);
    }
}
