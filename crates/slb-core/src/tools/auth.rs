//! Credential tools: `set_slack_token`, `test_slack_connection`.

use async_trait::async_trait;
use serde_json::Value;
use tracing::warn;

use super::{api_args, schema, Tool, ToolArgs, ToolContext, ToolRegistry};
use crate::{
    domain::AuthInfo,
    errors::Error,
    formatting::{str_at, text_or_na, NA},
    Result,
};

pub fn register(reg: &mut ToolRegistry) {
    reg.register(SetSlackToken);
    reg.register(TestSlackConnection);
}

fn or_na(v: &Option<String>) -> &str {
    v.as_deref().unwrap_or(NA)
}

pub struct SetSlackToken;

#[async_trait]
impl Tool for SetSlackToken {
    fn name(&self) -> &'static str {
        "set_slack_token"
    }

    fn description(&self) -> &'static str {
        "Set or replace the Slack API token. Accepts a bot token (xoxb-) or user token (xoxp-); the token is verified with Slack before it is used."
    }

    fn input_schema(&self) -> Value {
        schema::object()
            .required_string("token", "Slack bot token (xoxb-...) or user token (xoxp-...)")
            .build()
    }

    async fn run(&self, ctx: &ToolContext, args: ToolArgs) -> Result<String> {
        let raw = args.text("token")?;
        let auth: AuthInfo = ctx.credentials().validate_and_set(&raw, ctx.caller()).await?;
        let kind = ctx
            .credentials()
            .token_kind()
            .map(|k| k.label())
            .unwrap_or(NA);

        let mut out = String::from("✅ **Slack token set successfully**\n\n");
        out.push_str(&format!("• **Token Type:** {kind}\n"));
        out.push_str(&format!("• **Bot ID:** {}\n", or_na(&auth.bot_id)));
        out.push_str(&format!("• **User ID:** {}\n", or_na(&auth.user_id)));
        out.push_str(&format!("• **Team:** {}\n", or_na(&auth.team)));
        out.push_str(&format!("• **Team ID:** {}\n", or_na(&auth.team_id)));
        Ok(out)
    }
}

pub struct TestSlackConnection;

#[async_trait]
impl Tool for TestSlackConnection {
    fn name(&self) -> &'static str {
        "test_slack_connection"
    }

    fn description(&self) -> &'static str {
        "Check the Slack connection and show the authenticated identity, workspace details, and API settings."
    }

    fn input_schema(&self) -> Value {
        schema::object().build()
    }

    async fn run(&self, ctx: &ToolContext, _args: ToolArgs) -> Result<String> {
        let session = ctx.session()?;
        let auth = AuthInfo::from_response(&session.call("auth.test", api_args().build()).await?);
        let team = match session.call("team.info", api_args().build()).await {
            Ok(team) => team,
            Err(Error::Remote(err)) => {
                warn!("Workspace lookup failed: {}", err);
                Value::Null
            }
            Err(other) => return Err(other),
        };

        let mut out = String::from("✅ **Slack Connection Successful**\n\n");
        out.push_str("**Authentication Details:**\n");
        out.push_str(&format!("• Bot ID: {}\n", or_na(&auth.bot_id)));
        out.push_str(&format!("• User ID: {}\n", or_na(&auth.user_id)));
        out.push_str(&format!("• Team: {}\n", or_na(&auth.team)));
        out.push_str(&format!("• Team ID: {}\n", or_na(&auth.team_id)));
        out.push_str(&format!("• Workspace URL: {}\n", or_na(&auth.url)));

        if team.get("team").is_some_and(Value::is_object) {
            out.push_str("\n**Workspace Information:**\n");
            out.push_str(&format!("• Name: {}\n", text_or_na(&team, "/team/name")));
            out.push_str(&format!("• Domain: {}\n", text_or_na(&team, "/team/domain")));
            out.push_str(&format!(
                "• Email Domain: {}\n",
                text_or_na(&team, "/team/email_domain")
            ));
            out.push_str(&format!(
                "• Icon URL: {}\n",
                str_at(&team, "/team/icon/image_132").unwrap_or(NA)
            ));
        }

        let config = ctx.config();
        out.push_str("\n**API Configuration:**\n");
        out.push_str(&format!("• User-Agent: {}\n", config.user_agent));
        out.push_str(&format!(
            "• Rate Limiting: {}ms minimum interval\n",
            ctx.caller().gate().min_interval().as_millis()
        ));
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use serde_json::json;

    use super::*;
    use crate::{
        errors::RemoteError,
        testing::{configured, test_config, FakeFactory},
        tools::ToolContext,
    };

    #[tokio::test]
    async fn set_token_reports_identity() {
        let factory = FakeFactory::new();
        let slack = factory.slack();
        let ctx = ToolContext::new(Arc::new(test_config(Default::default())), factory.clone());
        slack.respond_ok(
            "auth.test",
            json!({"user_id": "U1", "bot_id": "B1", "team": "Acme", "team_id": "T1"}),
        );

        let args = ToolArgs::from_value(json!({"token": "xoxb-abc"})).unwrap();
        let text = SetSlackToken.run(&ctx, args).await.unwrap();

        assert!(text.contains("Slack token set successfully"));
        assert!(text.contains("• **Token Type:** bot"));
        assert!(text.contains("• **Team:** Acme"));
        assert!(!text.contains("xoxb-abc"));
        assert!(ctx.credentials().is_configured());
        assert_eq!(factory.tokens(), vec!["xoxb-abc".to_string()]);
    }

    #[tokio::test]
    async fn set_token_rejects_bad_prefix_without_network() {
        let factory = FakeFactory::new();
        let slack = factory.slack();
        let ctx = ToolContext::new(Arc::new(test_config(Default::default())), factory.clone());

        let args = ToolArgs::from_value(json!({"token": "hunter2"})).unwrap();
        let err = SetSlackToken.run(&ctx, args).await.unwrap_err();

        assert!(err.display_text().starts_with("❌ Invalid Token Format:"));
        assert_eq!(factory.connects(), 0);
        assert!(slack.calls().is_empty());
    }

    #[tokio::test]
    async fn connection_test_includes_workspace_and_settings() {
        let (ctx, slack) = configured();
        slack.respond_ok(
            "auth.test",
            json!({"user_id": "U1", "team": "Acme", "url": "https://acme.slack.com/"}),
        );
        slack.respond_ok(
            "team.info",
            json!({"team": {"name": "Acme", "domain": "acme"}}),
        );

        let text = TestSlackConnection
            .run(&ctx, ToolArgs::default())
            .await
            .unwrap();

        assert!(text.starts_with("✅ **Slack Connection Successful**"));
        assert!(text.contains("• Bot ID: N/A"));
        assert!(text.contains("• Domain: acme"));
        assert!(text.contains("• Email Domain: N/A"));
        assert!(text.contains("Slack-MCP-Server/1.0 (Rust)"));
        assert_eq!(slack.methods(), vec!["auth.test", "team.info"]);
    }

    #[tokio::test]
    async fn connection_test_without_team_scope_skips_workspace() {
        let (ctx, slack) = configured();
        slack.respond_ok("auth.test", json!({"user_id": "U1", "team": "Acme"}));
        slack.respond_err("team.info", RemoteError::rejected("missing_scope", "missing_scope"));

        let text = TestSlackConnection
            .run(&ctx, ToolArgs::default())
            .await
            .unwrap();

        assert!(text.starts_with("✅ **Slack Connection Successful**"));
        assert!(text.contains("• Team: Acme"));
        assert!(!text.contains("**Workspace Information:**"));
        assert!(text.contains("**API Configuration:**"));
        assert_eq!(slack.methods(), vec!["auth.test", "team.info"]);
    }

    #[tokio::test]
    async fn connection_test_surfaces_rejection() {
        let (ctx, slack) = configured();
        slack.respond_err("auth.test", RemoteError::rejected("invalid_auth", "invalid_auth"));

        let err = TestSlackConnection
            .run(&ctx, ToolArgs::default())
            .await
            .unwrap_err();
        assert!(err.display_text().starts_with("❌ Slack API Error:"));
        assert_eq!(slack.methods(), vec!["auth.test"]);
    }
}
