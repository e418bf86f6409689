//! Resolving bearer tokens to users, locally or through the auth service.

use std::time::Duration;

use async_trait::async_trait;
use common::{User, UserId};
use reqwest::redirect::Policy;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use store::{SessionRepository, UserRepository};

use crate::error::AuthError;
use crate::service::AuthService;

/// Resolves an opaque bearer token to the user it was issued to.
#[async_trait]
pub trait IdentityVerifier: Send + Sync {
    async fn verify(&self, token: &str) -> Result<User, AuthError>;
}

#[async_trait]
impl<S> IdentityVerifier for AuthService<S>
where
    S: UserRepository + SessionRepository,
{
    async fn verify(&self, token: &str) -> Result<User, AuthError> {
        self.authenticate(token).await
    }
}

const DEFAULT_VERIFY_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Serialize)]
struct VerifyRequest<'a> {
    token: &'a str,
}

#[derive(Deserialize)]
struct VerifyResponse {
    valid: bool,
    user: Option<VerifiedUser>,
}

#[derive(Deserialize)]
struct VerifiedUser {
    id: i64,
    email: String,
}

/// Asks the auth service with `POST <base_url>/verify`.
///
/// `200 {valid: true, user}` resolves the user and `401` means the token is
/// invalid. Anything else, redirects included, is [`AuthError::Unavailable`].
#[derive(Debug, Clone)]
pub struct RemoteIdentityVerifier {
    client: Client,
    base_url: String,
    timeout: Duration,
}

impl RemoteIdentityVerifier {
    /// `base_url` is the auth service root, e.g. `"http://auth-service:3001/auth"`.
    pub fn new(base_url: &str) -> reqwest::Result<Self> {
        let client = Client::builder().redirect(Policy::none()).build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            timeout: DEFAULT_VERIFY_TIMEOUT,
        })
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

#[async_trait]
impl IdentityVerifier for RemoteIdentityVerifier {
    #[tracing::instrument(skip_all)]
    async fn verify(&self, token: &str) -> Result<User, AuthError> {
        let response = self
            .client
            .post(format!("{}/verify", self.base_url))
            .timeout(self.timeout)
            .json(&VerifyRequest { token })
            .send()
            .await
            .map_err(|e| {
                tracing::warn!(error = %e, "auth service request failed");
                AuthError::Unavailable(e.to_string())
            })?;

        match response.status() {
            StatusCode::OK => {}
            StatusCode::UNAUTHORIZED => return Err(AuthError::InvalidToken),
            status => {
                tracing::warn!(%status, "auth service answered unexpectedly");
                return Err(AuthError::Unavailable(format!(
                    "auth service answered with HTTP {status}"
                )));
            }
        }

        let body: VerifyResponse = response
            .json()
            .await
            .map_err(|e| AuthError::Unavailable(format!("unreadable auth response: {e}")))?;

        match body {
            VerifyResponse {
                valid: true,
                user: Some(user),
            } => Ok(User {
                id: UserId::new(user.id),
                email: user.email,
            }),
            _ => Err(AuthError::InvalidToken),
        }
    }
}
