use std::sync::Arc;

use async_trait::async_trait;
use tracing::{info, warn};

use crate::config::SecurityConfig;
use crate::constants::auth::MIN_PASSWORD_LENGTH;
use crate::db::{Backend, UserStore};
use crate::domain::{AchievementKind, UserId, streak};
use crate::models::{NewUser, User};
use crate::services::achievement_service::AchievementService;
use crate::services::auth_service::{
    AuthError, AuthService, RegisterRequest, Session, UserProfile,
};
use crate::services::input_guard;
use crate::services::password::{hash_password, verify_password};
use crate::services::sanitize::sanitize_input;
use crate::services::token::{AuthUser, TokenService};

pub struct DefaultAuthService {
    store: Arc<dyn Backend>,
    achievements: Arc<dyn AchievementService>,
    tokens: Arc<TokenService>,
    security: SecurityConfig,
}

fn record_attempt(action: &'static str, outcome: &'static str) {
    metrics::counter!("auth_attempts_total", "action" => action, "outcome" => outcome).increment(1);
}

fn outcome_of<T>(result: &Result<T, AuthError>) -> &'static str {
    match result {
        Ok(_) => "success",
        Err(AuthError::SuspectedInjection { .. }) => "rejected",
        Err(AuthError::InvalidCredentials) => "invalid_credentials",
        Err(AuthError::Validation(_)) => "invalid_input",
        Err(AuthError::Conflict(_)) => "conflict",
        Err(_) => "error",
    }
}

fn guard(fields: &[(&'static str, &str)]) -> Result<(), AuthError> {
    match input_guard::first_suspicious(fields) {
        Some(field) => Err(AuthError::SuspectedInjection { field }),
        None => Ok(()),
    }
}

impl DefaultAuthService {
    #[must_use]
    pub fn new(
        store: Arc<dyn Backend>,
        achievements: Arc<dyn AchievementService>,
        tokens: Arc<TokenService>,
        security: SecurityConfig,
    ) -> Self {
        Self {
            store,
            achievements,
            tokens,
            security,
        }
    }

    async fn load_user(&self, id: UserId) -> Result<User, AuthError> {
        self.store
            .get_user_by_id(id)
            .await?
            .ok_or(AuthError::UserNotFound)
    }

    async fn profile(&self, user: User) -> Result<UserProfile, AuthError> {
        let achievements = self.achievements.user_achievements(user.id).await?;
        Ok(UserProfile { user, achievements })
    }

    async fn open_session(&self, user: User) -> Result<Session, AuthError> {
        let token = self
            .tokens
            .issue(user.id, &user.username)
            .map_err(|e| AuthError::Internal(e.to_string()))?;
        Ok(Session {
            profile: self.profile(user).await?,
            token,
        })
    }

    /// Achievement grants are not transactional with the account change
    /// that triggered them; a failed grant is logged and the request
    /// still succeeds.
    async fn grant(&self, user_id: UserId, achievement: AchievementKind) {
        if let Err(e) = self.achievements.assign(user_id, achievement, 1, true).await {
            warn!(user_id = %user_id, achievement = %achievement, error = %e, "Failed to grant achievement");
        }
    }

    async fn register_inner(&self, request: RegisterRequest) -> Result<Session, AuthError> {
        if request.username.is_empty() || request.email.is_empty() || request.password.is_empty() {
            return Err(AuthError::Validation(
                "Username, email and password are required".to_string(),
            ));
        }

        guard(&[
            ("username", request.username.as_str()),
            ("email", request.email.as_str()),
            ("password", request.password.as_str()),
        ])?;

        let username = sanitize_input(&request.username);
        let email = sanitize_input(&request.email);

        // Nothing left once the stripped punctuation is gone.
        if username.is_empty() || email.is_empty() {
            return Err(AuthError::Validation(
                "Username and email must contain more than punctuation".to_string(),
            ));
        }

        let password_hash = hash_password(&request.password, &self.security).await?;
        let id = self
            .store
            .create_user(NewUser {
                username: username.clone(),
                email,
                password_hash,
            })
            .await?;

        info!(user_id = %id, username = %username, "User registered");
        self.grant(id, AchievementKind::FirstLogin).await;

        let user = self.load_user(id).await?;
        self.open_session(user).await
    }

    async fn login_inner(&self, username: &str, password: &str) -> Result<Session, AuthError> {
        if username.is_empty() || password.is_empty() {
            return Err(AuthError::Validation(
                "Username and password are required".to_string(),
            ));
        }

        guard(&[("username", username), ("password", password)])?;

        let username = sanitize_input(username);
        let Some((user, password_hash)) = self.store.get_credentials(&username).await? else {
            return Err(AuthError::InvalidCredentials);
        };

        if !verify_password(password, &password_hash).await? {
            return Err(AuthError::InvalidCredentials);
        }

        let streak = streak::evaluate(user.last_login, user.login_streak, chrono::Utc::now());
        self.store.update_login_streak(user.id, streak).await?;

        if let Err(e) = self.achievements.record_login_streak(user.id, streak).await {
            warn!(user_id = %user.id, error = %e, "Failed to update daily-login progress");
        }

        info!(user_id = %user.id, streak, "User logged in");

        let user = self.load_user(user.id).await?;
        self.open_session(user).await
    }
}

#[async_trait]
impl AuthService for DefaultAuthService {
    async fn register(&self, request: RegisterRequest) -> Result<Session, AuthError> {
        let result = self.register_inner(request).await;
        record_attempt("register", outcome_of(&result));
        result
    }

    async fn login(&self, username: &str, password: &str) -> Result<Session, AuthError> {
        let result = self.login_inner(username, password).await;
        record_attempt("login", outcome_of(&result));
        result
    }

    async fn current_user(&self, id: UserId) -> Result<UserProfile, AuthError> {
        let user = self.load_user(id).await?;
        self.profile(user).await
    }

    async fn change_password(
        &self,
        id: UserId,
        current_password: &str,
        new_password: &str,
    ) -> Result<(), AuthError> {
        if new_password.len() < MIN_PASSWORD_LENGTH {
            return Err(AuthError::Validation(format!(
                "New password must be at least {MIN_PASSWORD_LENGTH} characters"
            )));
        }

        if current_password == new_password {
            return Err(AuthError::Validation(
                "New password must be different from current password".to_string(),
            ));
        }

        let user = self.load_user(id).await?;
        let (_, password_hash) = self
            .store
            .get_credentials(&user.username)
            .await?
            .ok_or(AuthError::UserNotFound)?;

        if !verify_password(current_password, &password_hash).await? {
            return Err(AuthError::Validation("Current password is incorrect".to_string()));
        }

        let new_hash = hash_password(new_password, &self.security).await?;
        self.store.update_password_hash(id, &new_hash).await?;

        info!(user_id = %id, "Password changed");
        self.grant(id, AchievementKind::SecurityAware).await;

        Ok(())
    }

    fn verify_token(&self, token: &str) -> Result<AuthUser, AuthError> {
        Ok(self.tokens.verify(token)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{AchievementStore, Store, UserStore};
    use crate::models::achievement::catalog;
    use crate::services::achievement_service_impl::DefaultAchievementService;

    async fn service() -> (DefaultAuthService, Arc<Store>) {
        let store = Arc::new(
            Store::with_pool_options("sqlite::memory:", 1, 1)
                .await
                .unwrap(),
        );
        store.sync_catalog(&catalog()).await.unwrap();

        let backend: Arc<dyn Backend> = store.clone();
        let achievements = Arc::new(DefaultAchievementService::new(backend.clone()));
        let security = SecurityConfig {
            argon2_memory_cost_kib: 1024,
            argon2_time_cost: 1,
            argon2_parallelism: 1,
        };
        let service = DefaultAuthService::new(
            backend,
            achievements,
            Arc::new(TokenService::new(b"test-secret", 24)),
            security,
        );
        (service, store)
    }

    fn request(username: &str) -> RegisterRequest {
        RegisterRequest {
            username: username.to_string(),
            email: format!("{username}@example.com"),
            password: "password123".to_string(),
        }
    }

    #[tokio::test]
    async fn test_register_grants_first_login() {
        let (service, _) = service().await;
        let session = service.register(request("alice")).await.unwrap();

        assert_eq!(session.profile.user.username, "alice");
        assert_eq!(session.profile.user.login_streak, 0);
        assert!(session.profile.user.last_login.is_none());
        assert_eq!(session.profile.achievements.len(), 1);
        assert_eq!(
            session.profile.achievements[0].achievement_id,
            AchievementKind::FirstLogin
        );
        assert!(session.profile.achievements[0].completed);

        let verified = service.verify_token(&session.token).unwrap();
        assert_eq!(verified.id, session.profile.user.id);
    }

    #[tokio::test]
    async fn test_register_rejects_injection_before_store() {
        let (service, store) = service().await;
        let mut req = request("x");
        req.username = "admin' OR '1'='1".to_string();

        let result = service.register(req).await;
        assert!(matches!(
            result,
            Err(AuthError::SuspectedInjection { field: "username" })
        ));
        assert!(!store.has_users().await.unwrap());
    }

    #[tokio::test]
    async fn test_register_duplicate_conflicts() {
        let (service, _) = service().await;
        service.register(request("bob")).await.unwrap();
        assert!(matches!(
            service.register(request("bob")).await,
            Err(AuthError::Conflict(_))
        ));
    }

    #[tokio::test]
    async fn test_register_missing_fields() {
        let (service, _) = service().await;
        let mut req = request("carol");
        req.password = String::new();
        assert!(matches!(
            service.register(req).await,
            Err(AuthError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn test_register_punctuation_only_username() {
        let (service, store) = service().await;
        let mut req = request("x");
        req.username = "<>".to_string();

        assert!(matches!(
            service.register(req).await,
            Err(AuthError::Validation(_))
        ));
        assert!(!store.has_users().await.unwrap());
    }

    #[tokio::test]
    async fn test_register_accepts_short_password_and_bare_email() {
        let (service, _) = service().await;
        let mut req = request("gina");
        req.email = "gina".to_string();
        req.password = "abc".to_string();

        let session = service.register(req).await.unwrap();
        assert_eq!(session.profile.user.email, "gina");
        assert!(service.login("gina", "abc").await.is_ok());
    }

    #[tokio::test]
    async fn test_login_starts_streak() {
        let (service, _) = service().await;
        service.register(request("dave")).await.unwrap();

        let session = service.login("dave", "password123").await.unwrap();
        assert_eq!(session.profile.user.login_streak, 1);
        assert!(session.profile.user.last_login.is_some());

        let daily = session
            .profile
            .achievements
            .iter()
            .find(|a| a.achievement_id == AchievementKind::DailyLogin)
            .unwrap();
        assert_eq!(daily.progress, 1);

        // Same-day login keeps the streak.
        let again = service.login("dave", "password123").await.unwrap();
        assert_eq!(again.profile.user.login_streak, 1);
    }

    #[tokio::test]
    async fn test_login_wrong_password() {
        let (service, _) = service().await;
        service.register(request("erin")).await.unwrap();
        assert!(matches!(
            service.login("erin", "wrong-password").await,
            Err(AuthError::InvalidCredentials)
        ));
        assert!(matches!(
            service.login("nobody", "password123").await,
            Err(AuthError::InvalidCredentials)
        ));
    }

    #[tokio::test]
    async fn test_change_password_grants_security_aware() {
        let (service, _) = service().await;
        let session = service.register(request("frank")).await.unwrap();
        let id = session.profile.user.id;

        assert!(matches!(
            service.change_password(id, "wrong-password", "newpassword1").await,
            Err(AuthError::Validation(_))
        ));
        assert!(matches!(
            service.change_password(id, "password123", "short").await,
            Err(AuthError::Validation(_))
        ));

        service
            .change_password(id, "password123", "newpassword1")
            .await
            .unwrap();
        assert!(service.login("frank", "newpassword1").await.is_ok());

        let profile = service.current_user(id).await.unwrap();
        assert!(profile
            .achievements
            .iter()
            .any(|a| a.achievement_id == AchievementKind::SecurityAware && a.completed));
    }
}
