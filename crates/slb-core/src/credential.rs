use std::{
    fmt,
    sync::{Arc, RwLock},
};

use tracing::info;

use crate::{
    domain::{AuthInfo, TokenKind},
    errors::{Error, RemoteError},
    ports::{ApiArgs, ClientFactory, SlackApi},
    remote::RemoteCaller,
    Result,
};

/// A Slack token whose shape has been checked.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential {
    token: String,
    kind: TokenKind,
}

impl Credential {
    pub fn parse(raw: &str) -> Result<Self> {
        let token = raw.trim();
        if token.is_empty() {
            return Err(Error::InvalidCredentialFormat("token is empty".to_string()));
        }

        let kind = TokenKind::ALL
            .into_iter()
            .find(|k| token.starts_with(k.prefix()))
            .ok_or_else(|| {
                Error::InvalidCredentialFormat("unrecognized token prefix".to_string())
            })?;

        if token.len() == kind.prefix().len() {
            return Err(Error::InvalidCredentialFormat(
                "token has no content after its prefix".to_string(),
            ));
        }

        Ok(Self {
            token: token.to_string(),
            kind,
        })
    }

    pub fn kind(&self) -> TokenKind {
        self.kind
    }

    pub fn token(&self) -> &str {
        &self.token
    }
}

// Never print the secret.
impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("kind", &self.kind)
            .field("token", &format_args!("{}***", self.kind.prefix()))
            .finish()
    }
}

struct Active {
    credential: Credential,
    client: Arc<dyn SlackApi>,
    auth: Option<AuthInfo>,
}

/// Holds the single active credential and the client bound to it.
pub struct CredentialHolder {
    factory: Arc<dyn ClientFactory>,
    active: RwLock<Option<Active>>,
}

impl CredentialHolder {
    pub fn new(factory: Arc<dyn ClientFactory>) -> Self {
        Self {
            factory,
            active: RwLock::new(None),
        }
    }

    /// Startup path: check the token's shape and bind a client, no round trip.
    pub fn install(&self, raw: &str) -> Result<TokenKind> {
        let credential = Credential::parse(raw)?;
        let client = self.factory.connect(credential.token())?;
        let kind = credential.kind();
        self.replace(Active {
            credential,
            client,
            auth: None,
        });
        info!("installed {} token from environment", kind.label());
        Ok(kind)
    }

    /// Check the token's shape, then confirm it with one `auth.test` call.
    ///
    /// The active client is only replaced when Slack accepts the token.
    pub async fn validate_and_set(&self, raw: &str, caller: &RemoteCaller) -> Result<AuthInfo> {
        let credential = Credential::parse(raw)?;
        let client = self.factory.connect(credential.token())?;

        let resp = caller
            .call(client.as_ref(), "auth.test", &ApiArgs::new())
            .await
            .map_err(|e| match e {
                RemoteError::Rejected { code, .. } => Error::AuthenticationFailed(code),
                transport => Error::Remote(transport),
            })?;

        let auth = AuthInfo::from_response(&resp);
        let kind = credential.kind();
        self.replace(Active {
            credential,
            client,
            auth: Some(auth.clone()),
        });
        info!(
            team = auth.team.as_deref().unwrap_or("?"),
            "activated {} token",
            kind.label()
        );
        Ok(auth)
    }

    pub fn client(&self) -> Result<Arc<dyn SlackApi>> {
        let guard = self.active.read().unwrap_or_else(|e| e.into_inner());
        guard
            .as_ref()
            .map(|a| a.client.clone())
            .ok_or(Error::NotConfigured)
    }

    pub fn is_configured(&self) -> bool {
        self.token_kind().is_some()
    }

    pub fn token_kind(&self) -> Option<TokenKind> {
        let guard = self.active.read().unwrap_or_else(|e| e.into_inner());
        guard.as_ref().map(|a| a.credential.kind())
    }

    /// Identity confirmed by the last successful `validate_and_set`.
    pub fn auth_info(&self) -> Option<AuthInfo> {
        let guard = self.active.read().unwrap_or_else(|e| e.into_inner());
        guard.as_ref().and_then(|a| a.auth.clone())
    }

    fn replace(&self, next: Active) {
        let mut guard = self.active.write().unwrap_or_else(|e| e.into_inner());
        *guard = Some(next);
    }
}
