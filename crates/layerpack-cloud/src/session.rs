use std::fmt;

use layerpack_core::Invocation;
use secrecy::{ExposeSecret, SecretString};

const ACCESS_KEY_ID: &str = "AWS_ACCESS_KEY_ID";
const SECRET_ACCESS_KEY: &str = "AWS_SECRET_ACCESS_KEY";
const SESSION_TOKEN: &str = "AWS_SESSION_TOKEN";
const PROFILE: &str = "AWS_PROFILE";

/// AWS credentials and region for one run.
///
/// Built once at startup from the environment (and `.env` when present),
/// then passed by reference to whatever talks to AWS. Never mutated.
///
/// When no static keys are configured the AWS CLI falls back to its own
/// credential chain (profiles, SSO, instance roles).
#[derive(Clone)]
pub struct AwsSession {
    pub region: String,
    pub profile: Option<String>,
    access_key_id: Option<String>,
    secret_access_key: Option<SecretString>,
    session_token: Option<SecretString>,
}

impl fmt::Debug for AwsSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AwsSession")
            .field("region", &self.region)
            .field("profile", &self.profile)
            .field("access_key_id", &self.access_key_id)
            .field(
                "secret_access_key",
                &self.secret_access_key.as_ref().map(|_| "[REDACTED]"),
            )
            .field(
                "session_token",
                &self.session_token.as_ref().map(|_| "[REDACTED]"),
            )
            .finish()
    }
}

impl AwsSession {
    /// Load credentials from the process environment.
    pub fn from_env(region: impl Into<String>) -> Result<Self, CredentialsError> {
        // Attempt to load .env file (silently ignore if not found)
        let dotenv_loaded = dotenvy::dotenv().is_ok();
        tracing::debug!(dotenv = dotenv_loaded, "loading AWS session");

        Self::from_lookup(region, |key| {
            std::env::var(key)
                // arch-lint: allow(no-silent-result-drop) reason="unset and non-UTF-8 variables both mean the credential is absent"
                .ok()
        })
    }

    /// Load credentials through an arbitrary variable lookup.
    pub fn from_lookup<F>(region: impl Into<String>, lookup: F) -> Result<Self, CredentialsError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let access_key_id = get(ACCESS_KEY_ID);
        let secret_access_key = get(SECRET_ACCESS_KEY);
        match (&access_key_id, &secret_access_key) {
            (Some(_), None) => return Err(CredentialsError::Incomplete { missing: SECRET_ACCESS_KEY }),
            (None, Some(_)) => return Err(CredentialsError::Incomplete { missing: ACCESS_KEY_ID }),
            _ => {}
        }

        let session = Self {
            region: region.into(),
            profile: get(PROFILE),
            access_key_id,
            secret_access_key: secret_access_key.map(SecretString::from),
            session_token: get(SESSION_TOKEN).map(SecretString::from),
        };

        tracing::debug!(
            region = %session.region,
            static_credentials = session.has_static_credentials(),
            session_token = session.session_token.is_some(),
            "AWS session loaded",
        );
        Ok(session)
    }

    /// A session that relies entirely on the AWS CLI's own credential chain.
    pub fn ambient(region: impl Into<String>) -> Self {
        Self {
            region: region.into(),
            profile: None,
            access_key_id: None,
            secret_access_key: None,
            session_token: None,
        }
    }

    pub fn has_static_credentials(&self) -> bool {
        self.access_key_id.is_some() && self.secret_access_key.is_some()
    }

    pub fn access_key_id(&self) -> Option<&str> {
        self.access_key_id.as_deref()
    }

    /// Attach this session's credentials to an AWS CLI invocation.
    pub fn apply(&self, mut invocation: Invocation) -> Invocation {
        if let (Some(key), Some(secret)) = (&self.access_key_id, &self.secret_access_key) {
            invocation = invocation
                .env(ACCESS_KEY_ID, key)
                .env(SECRET_ACCESS_KEY, secret.expose_secret());
            if let Some(token) = &self.session_token {
                invocation = invocation.env(SESSION_TOKEN, token.expose_secret());
            }
        }
        if let Some(profile) = &self.profile {
            invocation = invocation.env(PROFILE, profile);
        }
        invocation
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CredentialsError {
    #[error("incomplete AWS credentials: {missing} is not set")]
    Incomplete { missing: &'static str },
}
