//! Login and session resolution.

use std::time::Duration;

use chrono::Utc;
use common::User;
use store::{Session, SessionRepository, StoreError, UserRepository};
use uuid::Uuid;

use crate::error::AuthError;
use crate::password::{hash_password, verify_password};

/// Session lifetime when none is configured.
pub const DEFAULT_SESSION_TTL: Duration = Duration::from_secs(8 * 60 * 60);

/// Result of a successful login.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoginOutcome {
    pub token: String,
    pub user: User,
}

/// Issues and resolves session tokens for the users in `S`.
#[derive(Debug, Clone)]
pub struct AuthService<S> {
    store: S,
    session_ttl: chrono::Duration,
}

impl<S> AuthService<S>
where
    S: UserRepository + SessionRepository,
{
    pub fn new(store: S) -> Self {
        Self {
            store,
            session_ttl: chrono::Duration::zero(),
        }
        .with_session_ttl(DEFAULT_SESSION_TTL)
    }

    pub fn with_session_ttl(mut self, ttl: Duration) -> Self {
        self.session_ttl =
            chrono::Duration::from_std(ttl).unwrap_or_else(|_| chrono::Duration::days(365));
        self
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Checks the credentials and opens a new session.
    #[tracing::instrument(skip(self, password), fields(%email))]
    pub async fn login(&self, email: &str, password: &str) -> Result<LoginOutcome, AuthError> {
        let result = self.try_login(email, password).await;

        let outcome = match &result {
            Ok(_) => "success",
            Err(AuthError::MissingCredentials) => "missing_credentials",
            Err(AuthError::InvalidCredentials) => "invalid_credentials",
            Err(_) => "error",
        };
        metrics::counter!("logins_total", "outcome" => outcome).increment(1);

        match &result {
            Ok(login) => tracing::info!(user_id = %login.user.id, "login succeeded"),
            Err(AuthError::MissingCredentials | AuthError::InvalidCredentials) => {
                tracing::info!(outcome, "login rejected")
            }
            Err(e) => tracing::error!(error = %e, "login failed"),
        }

        result
    }

    async fn try_login(&self, email: &str, password: &str) -> Result<LoginOutcome, AuthError> {
        if email.is_empty() || password.is_empty() {
            return Err(AuthError::MissingCredentials);
        }

        let credentials = self
            .store
            .find_credentials_by_email(email)
            .await?
            .ok_or(AuthError::InvalidCredentials)?;

        if !verify_password(&credentials.password_hash, password)? {
            return Err(AuthError::InvalidCredentials);
        }

        let session = Session {
            token: Uuid::new_v4(),
            user_id: credentials.user.id,
            expires_at: Utc::now() + self.session_ttl,
        };
        self.store.insert_session(session.clone()).await?;

        Ok(LoginOutcome {
            token: session.token.to_string(),
            user: credentials.user,
        })
    }

    /// Resolves a bearer token to its user.
    ///
    /// Unknown, malformed and expired tokens are all [`AuthError::InvalidToken`],
    /// as is a token whose user no longer exists.
    pub async fn authenticate(&self, token: &str) -> Result<User, AuthError> {
        let token = Uuid::parse_str(token).map_err(|_| AuthError::InvalidToken)?;

        let session = self
            .store
            .find_session(token)
            .await?
            .ok_or(AuthError::InvalidToken)?;
        if session.is_expired_at(Utc::now()) {
            tracing::debug!(user_id = %session.user_id, "session expired");
            if let Err(e) = self.store.delete_session(token).await {
                tracing::warn!(error = %e, "failed to delete expired session");
            }
            return Err(AuthError::InvalidToken);
        }

        self.store
            .find_user(session.user_id)
            .await?
            .ok_or(AuthError::InvalidToken)
    }

    /// Deletes every expired session and returns how many were removed.
    pub async fn purge_expired_sessions(&self) -> Result<u64, AuthError> {
        let purged = self.store.delete_expired_sessions(Utc::now()).await?;
        if purged > 0 {
            tracing::info!(purged, "expired sessions purged");
        }
        Ok(purged)
    }

    /// Creates an account.
    pub async fn register(&self, email: &str, password: &str) -> Result<User, AuthError> {
        if email.is_empty() {
            return Err(AuthError::MissingCredentials);
        }
        let hash = hash_password(password)?;

        match self.store.insert_user(email, &hash).await {
            Ok(user) => {
                tracing::info!(user_id = %user.id, "user registered");
                Ok(user)
            }
            Err(StoreError::Conflict(_)) => Err(AuthError::EmailTaken(email.to_string())),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use store::InMemoryStore;

    async fn service_with_user() -> (AuthService<InMemoryStore>, User) {
        let service = AuthService::new(InMemoryStore::new());
        let user = service.register("demo@example.com", "password123").await.unwrap();
        (service, user)
    }

    #[tokio::test]
    async fn login_issues_a_token_that_authenticates() {
        let (service, user) = service_with_user().await;

        let login = service.login("demo@example.com", "password123").await.unwrap();
        assert_eq!(login.user, user);

        let resolved = service.authenticate(&login.token).await.unwrap();
        assert_eq!(resolved, user);
    }

    #[tokio::test]
    async fn wrong_password_and_unknown_email_look_the_same() {
        let (service, _) = service_with_user().await;

        let wrong = service.login("demo@example.com", "nope").await.unwrap_err();
        let unknown = service.login("ghost@example.com", "password123").await.unwrap_err();

        assert!(matches!(wrong, AuthError::InvalidCredentials));
        assert!(matches!(unknown, AuthError::InvalidCredentials));
        assert_eq!(wrong.to_string(), unknown.to_string());
    }

    #[tokio::test]
    async fn missing_fields_are_rejected() {
        let (service, _) = service_with_user().await;
        assert!(matches!(
            service.login("", "password123").await,
            Err(AuthError::MissingCredentials)
        ));
        assert!(matches!(
            service.login("demo@example.com", "").await,
            Err(AuthError::MissingCredentials)
        ));
    }

    #[tokio::test]
    async fn garbage_and_unknown_tokens_are_invalid() {
        let (service, _) = service_with_user().await;
        assert!(matches!(
            service.authenticate("not-a-token").await,
            Err(AuthError::InvalidToken)
        ));
        assert!(matches!(
            service.authenticate(&Uuid::new_v4().to_string()).await,
            Err(AuthError::InvalidToken)
        ));
    }

    #[tokio::test]
    async fn expired_session_is_invalid() {
        let (service, _) = service_with_user().await;
        let service = service.with_session_ttl(Duration::ZERO);

        let login = service.login("demo@example.com", "password123").await.unwrap();
        assert!(matches!(
            service.authenticate(&login.token).await,
            Err(AuthError::InvalidToken)
        ));

        let token = Uuid::parse_str(&login.token).unwrap();
        assert_eq!(service.store().find_session(token).await.unwrap(), None);
    }

    #[tokio::test]
    async fn purge_removes_only_expired_sessions() {
        let (service, _) = service_with_user().await;
        let live = service.login("demo@example.com", "password123").await.unwrap();
        let short = service.clone().with_session_ttl(Duration::ZERO);
        let stale = short.login("demo@example.com", "password123").await.unwrap();

        assert_eq!(service.purge_expired_sessions().await.unwrap(), 1);
        assert_eq!(service.purge_expired_sessions().await.unwrap(), 0);

        let stale = Uuid::parse_str(&stale.token).unwrap();
        assert_eq!(service.store().find_session(stale).await.unwrap(), None);
        assert!(service.authenticate(&live.token).await.is_ok());
    }

    #[tokio::test]
    async fn duplicate_email_is_taken() {
        let (service, _) = service_with_user().await;
        assert!(matches!(
            service.register("demo@example.com", "other").await,
            Err(AuthError::EmailTaken(email)) if email == "demo@example.com"
        ));
    }
}
