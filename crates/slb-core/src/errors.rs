/// Outcome of a remote call that did not succeed.
///
/// Every tool handler relies on this two-way split instead of inspecting raw
/// HTTP or JSON failures.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum RemoteError {
    /// Slack understood the request and declined it (`"ok": false`).
    #[error("{code}: {message}")]
    Rejected { code: String, message: String },

    /// Network, timeout, or a response that is not a Web API envelope.
    #[error("{0}")]
    Transport(String),
}

impl RemoteError {
    pub fn rejected(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Rejected {
            code: code.into(),
            message: message.into(),
        }
    }

    /// Remote error code, if Slack supplied one.
    pub fn code(&self) -> Option<&str> {
        match self {
            Self::Rejected { code, .. } => Some(code),
            Self::Transport(_) => None,
        }
    }
}

/// Core error type.
///
/// Anything a tool handler returns is rendered into a failure line by
/// [`Error::display_text`]; nothing here is fatal to the process.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("config error: {0}")]
    Config(String),

    #[error("invalid parameter `{param}`: {reason}")]
    Validation { param: String, reason: String },

    #[error("no Slack token configured")]
    NotConfigured,

    #[error("invalid token format: {0}")]
    InvalidCredentialFormat(String),

    #[error("authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error(transparent)]
    Remote(#[from] RemoteError),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub fn validation(param: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Validation {
            param: param.into(),
            reason: reason.into(),
        }
    }

    /// Category label shown to the assistant.
    pub fn category(&self) -> &'static str {
        match self {
            Self::Config(_) => "Configuration Error",
            Self::Validation { .. } => "Validation Error",
            Self::NotConfigured => "Not Configured",
            Self::InvalidCredentialFormat(_) => "Invalid Token Format",
            Self::AuthenticationFailed(_) => "Authentication Failed",
            Self::Remote(RemoteError::Rejected { .. }) => "Slack API Error",
            Self::Remote(RemoteError::Transport(_)) => "Transport Failure",
        }
    }

    /// Single human-readable failure line for a tool result.
    pub fn display_text(&self) -> String {
        let detail = match self {
            Self::NotConfigured => "No Slack token found. Set SLACK_BOT_TOKEN or call the \
                                    set_slack_token tool first."
                .to_string(),
            Self::InvalidCredentialFormat(reason) => {
                format!("{reason}; token should start with 'xoxb-' (bot) or 'xoxp-' (user)")
            }
            Self::Remote(RemoteError::Rejected { code, message }) => {
                let mut out = match describe_code(code) {
                    Some(phrase) => format!("{phrase} ({code})"),
                    None => code.clone(),
                };
                if !message.is_empty() && message != code {
                    out.push_str(": ");
                    out.push_str(message);
                }
                out
            }
            Self::AuthenticationFailed(code) => {
                let phrase = describe_code(code).unwrap_or("Slack did not accept the token");
                format!("{phrase} ({code})")
            }
            Self::Remote(RemoteError::Transport(msg)) => {
                format!("could not reach Slack: {msg}")
            }
            other => other.to_string(),
        };
        format!("❌ {}: {detail}", self.category())
    }
}

/// Short phrases for the Slack error codes tools hit most often.
fn describe_code(code: &str) -> Option<&'static str> {
    Some(match code {
        "user_not_found" | "users_not_found" => "User not found",
        "user_not_visible" => "User is not visible to this token",
        "channel_not_found" => "Channel not found",
        "not_in_channel" => "The bot is not a member of this channel",
        "already_in_channel" => "User is already in the channel",
        "is_archived" => "Channel is archived",
        "already_archived" => "Channel is already archived",
        "name_taken" => "A channel with that name already exists",
        "message_not_found" => "Message not found",
        "thread_not_found" => "Thread not found",
        "file_not_found" => "File not found",
        "missing_scope" => "Missing required OAuth scope",
        "not_authed" | "invalid_auth" => "Token was rejected",
        "token_revoked" | "account_inactive" => "Token is no longer active",
        "ratelimited" => "Rate limited by Slack",
        "cant_update_message" | "cant_delete_message" => "Not allowed to modify this message",
        "time_in_past" | "time_too_far" => "Invalid schedule time",
        "invalid_arguments" => "Invalid arguments",
        _ => return None,
    })
}
