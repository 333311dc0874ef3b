/// Kind of Slack credential, derived from its prefix.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TokenKind {
    /// `xoxb-`
    Bot,
    /// `xoxp-`
    User,
}

impl TokenKind {
    pub const ALL: [TokenKind; 2] = [TokenKind::Bot, TokenKind::User];

    pub fn prefix(self) -> &'static str {
        match self {
            TokenKind::Bot => "xoxb-",
            TokenKind::User => "xoxp-",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            TokenKind::Bot => "bot",
            TokenKind::User => "user",
        }
    }
}

/// Identity Slack reported for the active token (`auth.test`).
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AuthInfo {
    pub user_id: Option<String>,
    pub bot_id: Option<String>,
    pub team: Option<String>,
    pub team_id: Option<String>,
    pub url: Option<String>,
}

impl AuthInfo {
    pub fn from_response(v: &serde_json::Value) -> Self {
        let get = |k: &str| v.get(k).and_then(|x| x.as_str()).map(|s| s.to_string());
        Self {
            user_id: get("user_id"),
            bot_id: get("bot_id"),
            team: get("team"),
            team_id: get("team_id"),
            url: get("url"),
        }
    }
}
