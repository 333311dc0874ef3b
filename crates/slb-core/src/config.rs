use std::{env, fs, path::Path, time::Duration};

/// User-Agent sent with every Slack request.
pub const USER_AGENT: &str = "Slack-MCP-Server/1.0 (Rust)";

pub const DEFAULT_API_BASE_URL: &str = "https://slack.com/api";

/// Typed configuration for the bridge.
///
/// Only the token is behavior-relevant for tools; the rest are transport knobs.
#[derive(Clone, Debug)]
pub struct Config {
    /// Startup credential (`SLACK_BOT_TOKEN`, falling back to `SLACK_USER_TOKEN`).
    pub slack_token: Option<String>,
    pub api_base_url: String,
    pub user_agent: String,

    /// Minimum spacing between the starts of two remote calls.
    pub min_api_interval: Duration,
    pub request_timeout: Duration,

    /// Upper bound for `upload_file` / `upload_file_to_user` content.
    pub max_upload_bytes: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            slack_token: None,
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            user_agent: USER_AGENT.to_string(),
            min_api_interval: Duration::from_millis(1000),
            request_timeout: Duration::from_millis(30_000),
            max_upload_bytes: 10 * 1024 * 1024,
        }
    }
}

impl Config {
    /// Load from the environment (and `.env` when present).
    ///
    /// A missing token is not an error: the server starts unconfigured.
    pub fn load() -> Self {
        load_dotenv_if_present(Path::new(".env"));

        let defaults = Self::default();

        let slack_token = env_str("SLACK_BOT_TOKEN")
            .and_then(non_empty)
            .or_else(|| env_str("SLACK_USER_TOKEN").and_then(non_empty));

        let api_base_url = env_str("SLACK_API_BASE_URL")
            .and_then(non_empty)
            .map(|s| s.trim_end_matches('/').to_string())
            .unwrap_or(defaults.api_base_url);

        let min_api_interval = env_u64("SLACK_MIN_API_INTERVAL_MS")
            .map(Duration::from_millis)
            .unwrap_or(defaults.min_api_interval);
        let request_timeout = env_u64("SLACK_REQUEST_TIMEOUT_MS")
            .filter(|ms| *ms > 0)
            .map(Duration::from_millis)
            .unwrap_or(defaults.request_timeout);

        let max_upload_bytes = env_usize("SLACK_MAX_UPLOAD_BYTES")
            .filter(|n| *n > 0)
            .unwrap_or(defaults.max_upload_bytes);

        Self {
            slack_token,
            api_base_url,
            user_agent: defaults.user_agent,
            min_api_interval,
            request_timeout,
            max_upload_bytes,
        }
    }
}

fn env_str(key: &str) -> Option<String> {
    env::var(key).ok()
}

fn load_dotenv_if_present(path: &Path) {
    let Ok(contents) = fs::read_to_string(path) else {
        return;
    };

    for (key, val) in parse_dotenv(&contents) {
        if env::var_os(&key).is_some() {
            continue; // do not override existing env
        }
        env::set_var(key, val);
    }
}

fn parse_dotenv(contents: &str) -> Vec<(String, String)> {
    let mut out = Vec::new();
    for raw in contents.lines() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let line = line.strip_prefix("export ").unwrap_or(line);

        let Some((k, v)) = line.split_once('=') else {
            continue;
        };

        let key = k.trim();
        if key.is_empty() {
            continue;
        }

        let mut val = v.trim().to_string();
        // Strip optional surrounding quotes.
        if val.len() >= 2
            && ((val.starts_with('"') && val.ends_with('"'))
                || (val.starts_with('\'') && val.ends_with('\'')))
        {
            val = val[1..val.len() - 1].to_string();
        }

        out.push((key.to_string(), val));
    }
    out
}

fn env_u64(key: &str) -> Option<u64> {
    env_str(key).and_then(|s| s.trim().parse::<u64>().ok())
}

fn env_usize(key: &str) -> Option<usize> {
    env_str(key).and_then(|s| s.trim().parse::<usize>().ok())
}

fn non_empty(s: String) -> Option<String> {
    if s.trim().is_empty() {
        None
    } else {
        Some(s.trim().to_string())
    }
}
