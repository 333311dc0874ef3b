//! Message tools: posting, editing, pins, permalinks, scheduling, threads, DMs.

use async_trait::async_trait;
use serde_json::Value;

use super::{api_args, schema, ApiArgsBuilder, Tool, ToolArgs, ToolContext, ToolRegistry};
use crate::{
    errors::{Error, RemoteError},
    formatting::{
        format_message_result, format_slack_ts, format_thread_message, str_at, text_or_na,
        Detail, MESSAGE_PREVIEW_LIMIT, THREAD_PARENT_LIMIT,
    },
    utils, Result,
};

/// Slack refuses `chat.scheduleMessage` further out than this.
const MAX_SCHEDULE_AHEAD_SECS: i64 = 120 * 24 * 60 * 60;

pub fn register(reg: &mut ToolRegistry) {
    reg.register(SendMessage);
    reg.register(UpdateMessage);
    reg.register(DeleteMessage);
    reg.register(PinMessage);
    reg.register(UnpinMessage);
    reg.register(GetMessagePermalink);
    reg.register(ScheduleMessage);
    reg.register(GetThreadReplies);
    reg.register(SendDirectMessage);
}

/// Attach optional `blocks` / `attachments`. Confirmations mention block counts
/// only when the caller sent blocks.
fn with_rich_content(builder: ApiArgsBuilder, args: &ToolArgs) -> Result<(ApiArgsBuilder, Detail)> {
    let blocks = args.opt_object_array("blocks")?;
    let attachments = args.opt_object_array("attachments")?;
    let detail = if blocks.is_some() {
        Detail::Full
    } else {
        Detail::Summary
    };
    let builder = builder
        .set_opt("blocks", blocks)
        .set_opt("attachments", attachments);
    Ok((builder, detail))
}

fn rich_schema(builder: schema::SchemaBuilder) -> schema::SchemaBuilder {
    builder
        .object_array("blocks", "Block Kit blocks for rich formatting")
        .object_array("attachments", "Legacy message attachments")
}

pub struct SendMessage;

#[async_trait]
impl Tool for SendMessage {
    fn name(&self) -> &'static str {
        "send_message"
    }

    fn description(&self) -> &'static str {
        "Send a message to a Slack channel, optionally as a thread reply or with Block Kit formatting."
    }

    fn input_schema(&self) -> Value {
        rich_schema(
            schema::object()
                .required_string("channel", "Channel ID or name to post in")
                .required_string("text", "Message text (fallback text when blocks are given)")
                .string("thread_ts", "Timestamp of the parent message to reply in a thread"),
        )
        .build()
    }

    async fn run(&self, ctx: &ToolContext, args: ToolArgs) -> Result<String> {
        let session = ctx.session()?;
        let channel = args.id("channel")?;
        let text = args.text("text")?;
        let thread_ts = args.opt_ts("thread_ts")?;
        let (builder, detail) = with_rich_content(
            api_args()
                .set("channel", channel)
                .set("text", text)
                .set_opt("thread_ts", thread_ts),
            &args,
        )?;

        let resp = session.call("chat.postMessage", builder.build()).await?;
        Ok(format_message_result("Message Sent Successfully", &resp, detail))
    }
}

pub struct UpdateMessage;

#[async_trait]
impl Tool for UpdateMessage {
    fn name(&self) -> &'static str {
        "update_message"
    }

    fn description(&self) -> &'static str {
        "Edit an existing message's text or blocks."
    }

    fn input_schema(&self) -> Value {
        rich_schema(
            schema::object()
                .required_string("channel", "Channel ID containing the message")
                .required_string("ts", "Timestamp of the message to update")
                .required_string("text", "New message text"),
        )
        .build()
    }

    async fn run(&self, ctx: &ToolContext, args: ToolArgs) -> Result<String> {
        let session = ctx.session()?;
        let channel = args.id("channel")?;
        let ts = args.ts("ts")?;
        let text = args.text("text")?;
        let (builder, detail) = with_rich_content(
            api_args()
                .set("channel", channel)
                .set("ts", ts)
                .set("text", text),
            &args,
        )?;

        let resp = session.call("chat.update", builder.build()).await?;
        Ok(format_message_result("Message Updated Successfully", &resp, detail))
    }
}

pub struct DeleteMessage;

#[async_trait]
impl Tool for DeleteMessage {
    fn name(&self) -> &'static str {
        "delete_message"
    }

    fn description(&self) -> &'static str {
        "Delete a message from a channel."
    }

    fn input_schema(&self) -> Value {
        schema::object()
            .required_string("channel", "Channel ID containing the message")
            .required_string("ts", "Timestamp of the message to delete")
            .build()
    }

    async fn run(&self, ctx: &ToolContext, args: ToolArgs) -> Result<String> {
        let session = ctx.session()?;
        let channel = args.id("channel")?;
        let ts = args.ts("ts")?;

        let resp = session
            .call(
                "chat.delete",
                api_args().set("channel", channel).set("ts", ts).build(),
            )
            .await?;
        Ok(format!(
            "🗑️ **Message Deleted Successfully**\n\n• **Channel:** {}\n• **Timestamp:** {}\n",
            text_or_na(&resp, "/channel"),
            text_or_na(&resp, "/ts")
        ))
    }
}

/// `pins.add` / `pins.remove` share arguments and output shape.
async fn pin_request(ctx: &ToolContext, args: &ToolArgs, method: &str, heading: &str) -> Result<String> {
    let session = ctx.session()?;
    let channel = args.id("channel")?;
    let timestamp = args.ts("timestamp")?;

    session
        .call(
            method,
            api_args()
                .set("channel", channel.as_str())
                .set("timestamp", timestamp.as_str())
                .build(),
        )
        .await?;
    Ok(format!(
        "{heading}\n\n• **Channel:** {channel}\n• **Message Timestamp:** {timestamp}\n"
    ))
}

fn pin_schema() -> Value {
    schema::object()
        .required_string("channel", "Channel ID containing the message")
        .required_string("timestamp", "Timestamp of the message")
        .build()
}

pub struct PinMessage;

#[async_trait]
impl Tool for PinMessage {
    fn name(&self) -> &'static str {
        "pin_message"
    }

    fn description(&self) -> &'static str {
        "Pin a message to its channel."
    }

    fn input_schema(&self) -> Value {
        pin_schema()
    }

    async fn run(&self, ctx: &ToolContext, args: ToolArgs) -> Result<String> {
        pin_request(ctx, &args, "pins.add", "📌 **Message Pinned Successfully**").await
    }
}

pub struct UnpinMessage;

#[async_trait]
impl Tool for UnpinMessage {
    fn name(&self) -> &'static str {
        "unpin_message"
    }

    fn description(&self) -> &'static str {
        "Remove a pinned message from its channel's pins."
    }

    fn input_schema(&self) -> Value {
        pin_schema()
    }

    async fn run(&self, ctx: &ToolContext, args: ToolArgs) -> Result<String> {
        pin_request(ctx, &args, "pins.remove", "📌 **Message Unpinned Successfully**").await
    }
}

pub struct GetMessagePermalink;

#[async_trait]
impl Tool for GetMessagePermalink {
    fn name(&self) -> &'static str {
        "get_message_permalink"
    }

    fn description(&self) -> &'static str {
        "Get a shareable permalink for a message."
    }

    fn input_schema(&self) -> Value {
        schema::object()
            .required_string("channel", "Channel ID containing the message")
            .required_string("message_ts", "Timestamp of the message")
            .build()
    }

    async fn run(&self, ctx: &ToolContext, args: ToolArgs) -> Result<String> {
        let session = ctx.session()?;
        let channel = args.id("channel")?;
        let message_ts = args.ts("message_ts")?;

        let resp = session
            .call(
                "chat.getPermalink",
                api_args()
                    .set("channel", channel.as_str())
                    .set("message_ts", message_ts.as_str())
                    .build(),
            )
            .await?;
        Ok(format!(
            "🔗 **Message Permalink**\n\n• **Channel:** {channel}\n• **Message Timestamp:** {message_ts}\n• **Permalink:** {}\n",
            text_or_na(&resp, "/permalink")
        ))
    }
}

pub struct ScheduleMessage;

#[async_trait]
impl Tool for ScheduleMessage {
    fn name(&self) -> &'static str {
        "schedule_message"
    }

    fn description(&self) -> &'static str {
        "Schedule a message for later delivery (Unix timestamp, at most 120 days ahead)."
    }

    fn input_schema(&self) -> Value {
        rich_schema(
            schema::object()
                .required_string("channel", "Channel ID to post in")
                .required_string("text", "Message text")
                .required_integer("post_at", "Unix timestamp (seconds) to deliver the message at"),
        )
        .build()
    }

    async fn run(&self, ctx: &ToolContext, args: ToolArgs) -> Result<String> {
        let session = ctx.session()?;
        let channel = args.id("channel")?;
        let text = args.text("text")?;
        let post_at = args.required_int("post_at")?;

        let now = utils::unix_now();
        if post_at <= now {
            return Err(Error::validation("post_at", "must be in the future"));
        }
        if post_at - now > MAX_SCHEDULE_AHEAD_SECS {
            return Err(Error::validation(
                "post_at",
                "must be at most 120 days in the future",
            ));
        }

        let (builder, detail) = with_rich_content(
            api_args()
                .set("channel", channel)
                .set("text", text)
                .set("post_at", post_at),
            &args,
        )?;
        let resp = session.call("chat.scheduleMessage", builder.build()).await?;
        Ok(format_message_result("Message Scheduled Successfully", &resp, detail))
    }
}

pub struct GetThreadReplies;

#[async_trait]
impl Tool for GetThreadReplies {
    fn name(&self) -> &'static str {
        "get_thread_replies"
    }

    fn description(&self) -> &'static str {
        "Read a thread: the parent message followed by its replies."
    }

    fn input_schema(&self) -> Value {
        schema::object()
            .required_string("channel", "Channel ID containing the thread")
            .required_string("thread_ts", "Timestamp of the parent message")
            .integer("limit", "Maximum number of messages to return", 10, 1, 1000)
            .build()
    }

    async fn run(&self, ctx: &ToolContext, args: ToolArgs) -> Result<String> {
        let session = ctx.session()?;
        let channel = args.id("channel")?;
        let thread_ts = args.ts("thread_ts")?;
        let limit = args.int_in("limit", 10, 1, 1000)?;

        let resp = session
            .call(
                "conversations.replies",
                api_args()
                    .set("channel", channel)
                    .set("ts", thread_ts)
                    .set("limit", limit)
                    .build(),
            )
            .await?;

        let messages = resp
            .get("messages")
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .unwrap_or_default();

        let mut out = format!("🧵 **Thread Replies** ({} messages)\n\n", messages.len());
        let Some((parent, replies)) = messages.split_first() else {
            out.push_str("No messages found in thread\n");
            return Ok(out);
        };

        out.push_str("**📝 Parent Message:**\n");
        out.push_str(&format_thread_message(parent, THREAD_PARENT_LIMIT));
        out.push('\n');

        if replies.is_empty() {
            out.push_str("**💬 No replies yet**\n");
        } else {
            out.push_str(&format!("**💬 Replies ({}):**\n", replies.len()));
            for (i, reply) in replies.iter().enumerate() {
                out.push_str(&format!(
                    "\n**{}.** {}",
                    i + 1,
                    format_thread_message(reply, MESSAGE_PREVIEW_LIMIT)
                ));
            }
        }
        Ok(out)
    }
}

pub struct SendDirectMessage;

#[async_trait]
impl Tool for SendDirectMessage {
    fn name(&self) -> &'static str {
        "send_direct_message"
    }

    fn description(&self) -> &'static str {
        "Send a direct message to a user, opening the DM conversation if needed."
    }

    fn input_schema(&self) -> Value {
        rich_schema(
            schema::object()
                .required_string("user", "User ID to message")
                .required_string("text", "Message text"),
        )
        .build()
    }

    async fn run(&self, ctx: &ToolContext, args: ToolArgs) -> Result<String> {
        let session = ctx.session()?;
        let user = args.id("user")?;
        let text = args.text("text")?;
        let (builder, detail) = with_rich_content(api_args().set("text", text), &args)?;

        let opened = session
            .call("conversations.open", api_args().set("users", user.as_str()).build())
            .await?;
        let dm_channel = str_at(&opened, "/channel/id")
            .ok_or_else(|| {
                RemoteError::Transport("conversations.open returned no channel id".to_string())
            })?
            .to_string();

        let resp = session
            .call("chat.postMessage", builder.set("channel", dm_channel).build())
            .await?;
        let mut out = format_message_result("Direct Message Sent Successfully", &resp, detail);
        out.push_str(&format!("• **Recipient:** <@{user}>\n"));
        if let Some(ts) = str_at(&resp, "/ts") {
            out.push_str(&format!("• **Sent:** {}\n", format_slack_ts(ts)));
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::testing::{configured, FakeSlack};

    fn args(v: Value) -> ToolArgs {
        ToolArgs::from_value(v).unwrap()
    }

    fn param_of(err: Error) -> String {
        match err {
            Error::Validation { param, .. } => param,
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    fn assert_no_calls(slack: &FakeSlack) {
        assert!(slack.calls().is_empty(), "unexpected calls: {:?}", slack.methods());
    }

    #[tokio::test]
    async fn send_message_confirms_channel_and_timestamp() {
        let (ctx, slack) = configured();
        slack.respond_ok(
            "chat.postMessage",
            json!({"channel": "C123", "ts": "1700000000.000100", "message": {"text": "hello team"}}),
        );

        let text = SendMessage
            .run(&ctx, args(json!({"channel": "C123", "text": "hello team"})))
            .await
            .unwrap();

        assert!(text.starts_with("✅ **Message Sent Successfully**"));
        assert!(text.contains("• **Channel:** C123"));
        assert!(text.contains("• **Timestamp:** 1700000000.000100"));
        assert!(text.contains("• **Message:** hello team"));
        let sent = slack.last_args("chat.postMessage").unwrap();
        assert_eq!(sent["channel"], "C123");
        assert!(!sent.contains_key("thread_ts"));
    }

    #[tokio::test]
    async fn send_message_threads_and_forwards_blocks() {
        let (ctx, slack) = configured();
        slack.respond_ok(
            "chat.postMessage",
            json!({
                "channel": "C1",
                "ts": "1700000001.000200",
                "message": {
                    "text": "reply",
                    "thread_ts": "1700000000.000100",
                    "blocks": [{"type": "section"}]
                }
            }),
        );

        let text = SendMessage
            .run(
                &ctx,
                args(json!({
                    "channel": "C1",
                    "text": "reply",
                    "thread_ts": "1700000000.000100",
                    "blocks": [{"type": "section"}]
                })),
            )
            .await
            .unwrap();

        assert!(text.contains("Thread Reply:** Yes (parent: 1700000000.000100)"));
        assert!(text.contains("Rich Formatting:** 1 block(s)"));
        let sent = slack.last_args("chat.postMessage").unwrap();
        assert_eq!(sent["thread_ts"], "1700000000.000100");
        assert_eq!(sent["blocks"], json!([{"type": "section"}]));
    }

    #[tokio::test]
    async fn send_message_validates_before_calling() {
        let (ctx, slack) = configured();
        let err = SendMessage
            .run(&ctx, args(json!({"channel": "  ", "text": "hi"})))
            .await
            .unwrap_err();
        assert_eq!(param_of(err), "channel");

        let err = SendMessage
            .run(
                &ctx,
                args(json!({"channel": "C1", "text": "hi", "thread_ts": "soon"})),
            )
            .await
            .unwrap_err();
        assert_eq!(param_of(err), "thread_ts");
        assert_no_calls(&slack);
    }

    #[tokio::test]
    async fn send_message_reports_rejection() {
        let (ctx, slack) = configured();
        slack.respond_err(
            "chat.postMessage",
            RemoteError::rejected("not_in_channel", "not_in_channel"),
        );
        let err = SendMessage
            .run(&ctx, args(json!({"channel": "C1", "text": "hi"})))
            .await
            .unwrap_err();
        assert_eq!(
            err.display_text(),
            "❌ Slack API Error: The bot is not a member of this channel (not_in_channel)"
        );
    }

    #[tokio::test]
    async fn update_and_delete_use_message_timestamp() {
        let (ctx, slack) = configured();
        slack.respond_ok(
            "chat.update",
            json!({"channel": "C1", "ts": "1.2", "text": "edited"}),
        );
        slack.respond_ok("chat.delete", json!({"channel": "C1", "ts": "1.2"}));

        let updated = UpdateMessage
            .run(&ctx, args(json!({"channel": "C1", "ts": "1.2", "text": "edited"})))
            .await
            .unwrap();
        assert!(updated.contains("Message Updated Successfully"));
        assert!(updated.contains("• **Message:** edited"));

        let deleted = DeleteMessage
            .run(&ctx, args(json!({"channel": "C1", "ts": "1.2"})))
            .await
            .unwrap();
        assert!(deleted.contains("Message Deleted Successfully"));
        assert!(deleted.contains("• **Timestamp:** 1.2"));
        assert_eq!(slack.methods(), vec!["chat.update", "chat.delete"]);
    }

    #[tokio::test]
    async fn pins_and_permalinks() {
        let (ctx, slack) = configured();
        slack.respond_ok(
            "chat.getPermalink",
            json!({"permalink": "https://acme.slack.com/archives/C1/p1"}),
        );

        let pinned = PinMessage
            .run(&ctx, args(json!({"channel": "C1", "timestamp": "1.2"})))
            .await
            .unwrap();
        assert!(pinned.contains("Message Pinned Successfully"));
        let unpinned = UnpinMessage
            .run(&ctx, args(json!({"channel": "C1", "timestamp": "1.2"})))
            .await
            .unwrap();
        assert!(unpinned.contains("Unpinned"));
        let link = GetMessagePermalink
            .run(&ctx, args(json!({"channel": "C1", "message_ts": "1.2"})))
            .await
            .unwrap();
        assert!(link.contains("https://acme.slack.com/archives/C1/p1"));

        assert_eq!(
            slack.methods(),
            vec!["pins.add", "pins.remove", "chat.getPermalink"]
        );
        assert_eq!(slack.last_args("pins.add").unwrap()["timestamp"], "1.2");
    }

    #[tokio::test]
    async fn schedule_rejects_past_and_far_future() {
        let (ctx, slack) = configured();
        let now = utils::unix_now();

        let err = ScheduleMessage
            .run(
                &ctx,
                args(json!({"channel": "C1", "text": "hi", "post_at": now - 10})),
            )
            .await
            .unwrap_err();
        assert_eq!(param_of(err), "post_at");

        let err = ScheduleMessage
            .run(
                &ctx,
                args(json!({"channel": "C1", "text": "hi", "post_at": now + MAX_SCHEDULE_AHEAD_SECS + 3600})),
            )
            .await
            .unwrap_err();
        assert_eq!(param_of(err), "post_at");
        assert_no_calls(&slack);
    }

    #[tokio::test]
    async fn schedule_reports_id_and_post_time() {
        let (ctx, slack) = configured();
        let post_at = utils::unix_now() + 3600;
        slack.respond_ok(
            "chat.scheduleMessage",
            json!({"channel": "C1", "scheduled_message_id": "Q1", "post_at": post_at, "message": {"text": "later"}}),
        );

        let text = ScheduleMessage
            .run(
                &ctx,
                args(json!({"channel": "C1", "text": "later", "post_at": post_at})),
            )
            .await
            .unwrap();
        assert!(text.contains("• **Scheduled Message ID:** Q1"));
        assert!(text.contains("UTC"));
        assert_eq!(
            slack.last_args("chat.scheduleMessage").unwrap()["post_at"],
            json!(post_at)
        );
    }

    #[tokio::test]
    async fn thread_replies_show_parent_then_replies() {
        let (ctx, slack) = configured();
        let long = "p".repeat(THREAD_PARENT_LIMIT + 20);
        slack.respond_ok(
            "conversations.replies",
            json!({"messages": [
                {"user": "U1", "ts": "1700000000.000100", "text": long},
                {"user": "U2", "ts": "1700000060.000100", "text": "first reply"}
            ]}),
        );

        let text = GetThreadReplies
            .run(
                &ctx,
                args(json!({"channel": "C1", "thread_ts": "1700000000.000100", "limit": 5})),
            )
            .await
            .unwrap();

        assert!(text.starts_with("🧵 **Thread Replies** (2 messages)"));
        assert!(text.contains(&format!("{}...", "p".repeat(THREAD_PARENT_LIMIT))));
        assert!(text.contains("**💬 Replies (1):**"));
        assert!(text.contains("<@U2> · 2023-11-14 22:14:20 UTC"));
        assert_eq!(slack.last_args("conversations.replies").unwrap()["limit"], 5);
    }

    #[tokio::test]
    async fn thread_limit_is_bounded() {
        let (ctx, slack) = configured();
        let err = GetThreadReplies
            .run(
                &ctx,
                args(json!({"channel": "C1", "thread_ts": "1.2", "limit": 0})),
            )
            .await
            .unwrap_err();
        assert_eq!(param_of(err), "limit");
        assert_no_calls(&slack);
    }

    #[tokio::test]
    async fn direct_message_opens_conversation_first() {
        let (ctx, slack) = configured();
        slack.respond_ok("conversations.open", json!({"channel": {"id": "D42"}}));
        slack.respond_ok(
            "chat.postMessage",
            json!({"channel": "D42", "ts": "1700000000.000100", "message": {"text": "psst"}}),
        );

        let text = SendDirectMessage
            .run(&ctx, args(json!({"user": "<@U7>", "text": "psst"})))
            .await
            .unwrap();

        assert_eq!(slack.methods(), vec!["conversations.open", "chat.postMessage"]);
        assert_eq!(slack.last_args("conversations.open").unwrap()["users"], "U7");
        assert_eq!(slack.last_args("chat.postMessage").unwrap()["channel"], "D42");
        assert!(text.contains("• **Channel:** D42"));
        assert!(text.contains("• **Recipient:** <@U7>"));
    }
}
