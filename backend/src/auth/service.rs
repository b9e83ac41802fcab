//! Core business logic for the authentication system.
//!
//! Issues and validates the three credential kinds: web session tokens,
//! one-time game login tokens and long-lived plugin API tokens. Every
//! validation path re-reads the current User row, so bans and role changes
//! take effect on the very next request.

use crate::auth::models::*;
use crate::config::Config;
use crate::database::models::{CreateSession, User, VerifyGameTokenRequest};
use crate::errors::{ServiceError, ServiceResult};
use crate::repositories::api_token_repository::ApiTokenRepository;
use crate::repositories::application_repository::ApplicationRepository;
use crate::repositories::game_token_repository::GameTokenRepository;
use crate::repositories::login_attempt_repository::LoginAttemptRepository;
use crate::repositories::session_repository::SessionRepository;
use crate::repositories::user_repository::UserRepository;
use crate::utils::generate_random_string::generate_random_string;
use crate::utils::jwt::JwtUtils;
use crate::utils::token_hash::fingerprint;
use chrono::{Duration, Utc};
use sqlx::SqlitePool;
use uuid::Uuid;

/// Failed attempts per IP or per email tolerated within the rolling window.
const LOGIN_FAILURE_LIMIT: i64 = 5;
/// Rolling window for the login rate limiter, in minutes.
const LOGIN_WINDOW_MINUTES: i64 = 60;
/// Lifetime of a one-time game login token, in minutes.
const GAME_TOKEN_TTL_MINUTES: i64 = 15;

/// Authentication service for login, session and token management
pub struct AuthService<'a> {
    pool: &'a SqlitePool,
    jwt_utils: JwtUtils,
    config: Config,
}

impl<'a> AuthService<'a> {
    /// Create a new AuthService instance
    pub fn new(pool: &'a SqlitePool, config: &Config) -> Self {
        AuthService {
            pool,
            jwt_utils: JwtUtils::from_secret(&config.jwt_secret),
            config: config.clone(),
        }
    }

    /// Authenticate credentials and open a web session.
    ///
    /// Unknown email and wrong password produce the identical
    /// `InvalidCredentials` error so accounts cannot be enumerated. Every
    /// attempt lands in the immutable login-attempt log; once the rolling
    /// window holds enough failures, even a correct password is refused.
    pub async fn login(
        &self,
        request: LoginRequest,
        ip: &str,
        user_agent: Option<String>,
    ) -> ServiceResult<LoginResponse> {
        crate::api::common::validate_request(&request)?;

        let attempts = LoginAttemptRepository::new(self.pool);
        let window_start = Utc::now() - Duration::minutes(LOGIN_WINDOW_MINUTES);

        if attempts
            .count_recent_failures(&request.email, ip, window_start)
            .await?
            >= LOGIN_FAILURE_LIMIT
        {
            attempts.record(&request.email, ip, false).await?;
            tracing::warn!(email = %request.email, %ip, "login rate limit hit");
            return Err(ServiceError::rate_limited(
                "Too many failed login attempts, try again later",
            ));
        }

        let user_repo = UserRepository::new(self.pool);
        let user = user_repo.get_user_by_email(&request.email).await?;

        let user = match user {
            Some(user) if bcrypt::verify(&request.password, &user.password_hash)
                .unwrap_or(false) =>
            {
                user
            }
            _ => {
                attempts.record(&request.email, ip, false).await?;
                tracing::warn!(email = %request.email, %ip, "failed login attempt");
                return Err(ServiceError::InvalidCredentials);
            }
        };

        attempts.record(&request.email, ip, true).await?;

        let now = Utc::now();
        if user.is_currently_banned(now) {
            tracing::warn!(user_id = %user.id, "banned user attempted login");
            return Err(ServiceError::banned(user.ban_reason.clone()));
        }

        let ttl = if request.remember {
            Duration::days(self.config.session_remember_ttl_days)
        } else {
            Duration::hours(self.config.session_ttl_hours)
        };
        let expires_at = now + ttl;

        let session_id = Uuid::now_v7().to_string();
        let token = self
            .jwt_utils
            .generate_token(&user.id, &session_id, user.role.as_str(), ttl)?;

        let session_repo = SessionRepository::new(self.pool);
        session_repo
            .create_session(CreateSession {
                id: session_id,
                user_id: user.id.clone(),
                token_hash: fingerprint(&token),
                expires_at,
                ip: ip.to_string(),
                user_agent,
            })
            .await?;

        user_repo.update_last_login(&user.id, now).await?;

        tracing::info!(user_id = %user.id, "user logged in");

        Ok(LoginResponse {
            session_token: token,
            expires_at,
            user: UserInfo::from_user(&user),
        })
    }

    /// Resolve a session token into a Principal.
    ///
    /// Role, trust level and ban state come from the current User row, never
    /// from the token claims.
    pub async fn validate_session(&self, token: &str) -> ServiceResult<Principal> {
        let claims = self.jwt_utils.validate_token(token)?;

        let session_repo = SessionRepository::new(self.pool);
        let session = session_repo
            .get_session_by_id(&claims.sid)
            .await?
            .ok_or_else(|| ServiceError::unauthenticated("Unknown session"))?;

        let now = Utc::now();
        if !session.is_active
            || session.expires_at <= now
            || session.token_hash != fingerprint(token)
        {
            return Err(ServiceError::unauthenticated("Session is no longer valid"));
        }

        let user = self.require_user(&session.user_id).await?;
        if user.is_currently_banned(now) {
            return Err(ServiceError::banned(user.ban_reason.clone()));
        }

        Ok(Principal::from_user(&user))
    }

    /// Close a session. Idempotent: logging out twice is not an error.
    pub async fn logout(&self, token: &str) -> ServiceResult<()> {
        let claims = self.jwt_utils.validate_token(token)?;

        SessionRepository::new(self.pool)
            .deactivate(&claims.sid)
            .await?;

        Ok(())
    }

    /// Issue a one-time game login token for a user with server access.
    ///
    /// Invalidation of prior unused tokens and the insert run in one
    /// transaction, so at most one live token exists per user even under
    /// concurrent requests.
    pub async fn issue_game_login_token(&self, user_id: &str) -> ServiceResult<IssuedGameToken> {
        let user = self.require_user(user_id).await?;

        let now = Utc::now();
        if user.is_currently_banned(now) {
            return Err(ServiceError::banned(user.ban_reason.clone()));
        }

        let applications = ApplicationRepository::new(self.pool);
        if !applications.has_approved_for_user(&user.id).await? {
            return Err(ServiceError::forbidden(
                "Server access requires an approved application",
            ));
        }

        let token = generate_random_string(40);
        let expires_at = now + Duration::minutes(GAME_TOKEN_TTL_MINUTES);

        let game_tokens = GameTokenRepository::new(self.pool);
        let mut tx = self.pool.begin().await.map_err(anyhow::Error::from)?;

        game_tokens.invalidate_unused(&mut tx, &user.id).await?;
        game_tokens
            .create(
                &mut tx,
                &Uuid::now_v7().to_string(),
                &user.id,
                &fingerprint(&token),
                expires_at,
            )
            .await?;

        tx.commit().await.map_err(anyhow::Error::from)?;

        tracing::info!(user_id = %user.id, "issued game login token");

        Ok(IssuedGameToken { token, expires_at })
    }

    /// Consume a game login token on behalf of the game-server plugin.
    ///
    /// Consumption is a guarded single-shot update; a second verification of
    /// the same token always fails, regardless of expiry.
    pub async fn verify_game_login_token(
        &self,
        request: &VerifyGameTokenRequest,
    ) -> ServiceResult<Principal> {
        crate::api::common::validate_request(request)?;

        let game_tokens = GameTokenRepository::new(self.pool);
        let token = game_tokens
            .get_by_hash(&fingerprint(&request.token))
            .await?
            .ok_or(ServiceError::InvalidToken)?;

        if token.is_used {
            return Err(ServiceError::TokenAlreadyUsed);
        }

        let now = Utc::now();
        if token.expires_at <= now {
            return Err(ServiceError::TokenExpired);
        }

        let user = self.require_user(&token.user_id).await?;

        if !user.nickname.eq_ignore_ascii_case(&request.nickname) {
            tracing::warn!(
                user_id = %user.id,
                claimed = %request.nickname,
                "game token nickname mismatch"
            );
            return Err(ServiceError::IdentityMismatch);
        }

        if user.is_currently_banned(now) {
            return Err(ServiceError::banned(user.ban_reason.clone()));
        }

        if game_tokens.consume(&token.id).await? == 0 {
            // Lost the race against a concurrent verification.
            return Err(ServiceError::TokenAlreadyUsed);
        }

        tracing::info!(user_id = %user.id, "game login token verified");

        Ok(Principal::from_user(&user))
    }

    /// Authenticate a plugin bearer secret.
    ///
    /// Looks up the SHA-256 fingerprint among active API tokens; on a miss
    /// the bearer is retried as a web session token so tooling scripts can
    /// reuse their session. Both paths converge on the same Principal shape.
    pub async fn authenticate_api_token(
        &self,
        bearer: &str,
    ) -> ServiceResult<(Principal, TokenScope)> {
        let api_tokens = ApiTokenRepository::new(self.pool);

        if let Some(token) = api_tokens.get_active_by_hash(&fingerprint(bearer)).await? {
            let now = Utc::now();
            api_tokens.touch_last_used(&token.id, now).await?;

            let user = self.require_user(&token.user_id).await?;
            if user.is_currently_banned(now) {
                return Err(ServiceError::banned(user.ban_reason.clone()));
            }

            return Ok((
                Principal::from_user(&user),
                TokenScope::new(token.permission_list()),
            ));
        }

        let principal = self.validate_session(bearer).await?;
        Ok((principal, TokenScope::wildcard()))
    }

    /// Consume an emailed verification token and mark the email verified.
    pub async fn verify_email(&self, token: &str) -> ServiceResult<UserInfo> {
        let user_repo = UserRepository::new(self.pool);
        let user = user_repo
            .get_user_by_verify_token(token)
            .await?
            .ok_or(ServiceError::InvalidToken)?;

        user_repo.mark_email_verified(&user.id).await?;

        tracing::info!(user_id = %user.id, "email verified");

        let mut user = user;
        user.is_email_verified = true;
        Ok(UserInfo::from_user(&user))
    }

    async fn require_user(&self, user_id: &str) -> ServiceResult<User> {
        UserRepository::new(self.pool)
            .get_user_by_id(user_id)
            .await?
            .ok_or_else(|| ServiceError::not_found("User", user_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::models::UserRole;
    use crate::database::test_support;
    use sqlx::SqlitePool;

    fn login_request(email: &str, password: &str) -> LoginRequest {
        LoginRequest {
            email: email.to_string(),
            password: password.to_string(),
            remember: false,
        }
    }

    /// Gives a user server access by backdating an approved application.
    async fn grant_server_access(pool: &SqlitePool, user_id: &str, nickname: &str) {
        sqlx::query(
            r#"
            INSERT INTO applications
                (id, nickname, email, motivation, plans, status, submitted_ip, submitted_at, user_id)
            VALUES (?, ?, ?, 'x', 'x', 'approved', '127.0.0.1', ?, ?)
            "#,
        )
        .bind(uuid::Uuid::now_v7().to_string())
        .bind(nickname)
        .bind(format!("{}@example.com", nickname.to_lowercase()))
        .bind(chrono::Utc::now())
        .bind(user_id)
        .execute(pool)
        .await
        .unwrap();
    }

    #[tokio::test]
    async fn login_opens_a_session_that_validates() {
        let pool = test_support::pool().await;
        let config = test_support::config();
        let user = test_support::create_user(&pool, "Steve123", UserRole::User).await;

        let service = AuthService::new(&pool, &config);
        let response = service
            .login(login_request(&user.email, "password123"), "1.2.3.4", None)
            .await
            .unwrap();

        let principal = service
            .validate_session(&response.session_token)
            .await
            .unwrap();
        assert_eq!(principal.user_id, user.id);
        assert_eq!(principal.nickname, "Steve123");
        assert_eq!(principal.trust_level, 0);
    }

    #[tokio::test]
    async fn unknown_email_and_wrong_password_are_indistinguishable() {
        let pool = test_support::pool().await;
        let config = test_support::config();
        let user = test_support::create_user(&pool, "Steve123", UserRole::User).await;

        let service = AuthService::new(&pool, &config);

        let unknown = service
            .login(login_request("nobody@example.com", "password123"), "1.2.3.4", None)
            .await
            .unwrap_err();
        let wrong = service
            .login(login_request(&user.email, "not-the-password"), "1.2.3.4", None)
            .await
            .unwrap_err();

        assert!(matches!(unknown, ServiceError::InvalidCredentials));
        assert!(matches!(wrong, ServiceError::InvalidCredentials));
    }

    #[tokio::test]
    async fn sixth_attempt_is_rate_limited_even_with_correct_password() {
        let pool = test_support::pool().await;
        let config = test_support::config();
        let user = test_support::create_user(&pool, "Steve123", UserRole::User).await;

        let service = AuthService::new(&pool, &config);
        for _ in 0..5 {
            let err = service
                .login(login_request(&user.email, "bad"), "1.2.3.4", None)
                .await
                .unwrap_err();
            assert!(matches!(err, ServiceError::InvalidCredentials));
        }

        let err = service
            .login(login_request(&user.email, "password123"), "1.2.3.4", None)
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::RateLimited { .. }));
    }

    #[tokio::test]
    async fn logout_is_idempotent() {
        let pool = test_support::pool().await;
        let config = test_support::config();
        let user = test_support::create_user(&pool, "Steve123", UserRole::User).await;

        let service = AuthService::new(&pool, &config);
        let response = service
            .login(login_request(&user.email, "password123"), "1.2.3.4", None)
            .await
            .unwrap();

        service.logout(&response.session_token).await.unwrap();
        service.logout(&response.session_token).await.unwrap();

        let err = service
            .validate_session(&response.session_token)
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Unauthenticated { .. }));
    }

    #[tokio::test]
    async fn ban_invalidates_the_very_next_validate() {
        let pool = test_support::pool().await;
        let config = test_support::config();
        let user = test_support::create_user(&pool, "Steve123", UserRole::User).await;

        let service = AuthService::new(&pool, &config);
        let response = service
            .login(login_request(&user.email, "password123"), "1.2.3.4", None)
            .await
            .unwrap();
        service
            .validate_session(&response.session_token)
            .await
            .unwrap();

        crate::repositories::user_repository::UserRepository::new(&pool)
            .set_banned(&user.id, "griefing", None)
            .await
            .unwrap();

        let err = service
            .validate_session(&response.session_token)
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Banned { .. }));
    }

    #[tokio::test]
    async fn game_token_requires_server_access() {
        let pool = test_support::pool().await;
        let config = test_support::config();
        let user = test_support::create_user(&pool, "Steve123", UserRole::User).await;

        let service = AuthService::new(&pool, &config);
        let err = service.issue_game_login_token(&user.id).await.unwrap_err();
        assert!(matches!(err, ServiceError::Forbidden { .. }));
    }

    #[tokio::test]
    async fn game_token_is_single_use() {
        let pool = test_support::pool().await;
        let config = test_support::config();
        let user = test_support::create_user(&pool, "Steve123", UserRole::User).await;
        grant_server_access(&pool, &user.id, "Steve123").await;

        let service = AuthService::new(&pool, &config);
        let issued = service.issue_game_login_token(&user.id).await.unwrap();

        let request = VerifyGameTokenRequest {
            token: issued.token.clone(),
            // Case-insensitive match
            nickname: "steve123".to_string(),
        };
        let principal = service.verify_game_login_token(&request).await.unwrap();
        assert_eq!(principal.user_id, user.id);

        let err = service.verify_game_login_token(&request).await.unwrap_err();
        assert!(matches!(err, ServiceError::TokenAlreadyUsed));
    }

    #[tokio::test]
    async fn issuing_a_new_game_token_invalidates_the_previous_one() {
        let pool = test_support::pool().await;
        let config = test_support::config();
        let user = test_support::create_user(&pool, "Steve123", UserRole::User).await;
        grant_server_access(&pool, &user.id, "Steve123").await;

        let service = AuthService::new(&pool, &config);
        let first = service.issue_game_login_token(&user.id).await.unwrap();
        let second = service.issue_game_login_token(&user.id).await.unwrap();

        let err = service
            .verify_game_login_token(&VerifyGameTokenRequest {
                token: first.token,
                nickname: "Steve123".to_string(),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::TokenAlreadyUsed));

        service
            .verify_game_login_token(&VerifyGameTokenRequest {
                token: second.token,
                nickname: "Steve123".to_string(),
            })
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn game_token_rejects_wrong_nickname_and_unknown_token() {
        let pool = test_support::pool().await;
        let config = test_support::config();
        let user = test_support::create_user(&pool, "Steve123", UserRole::User).await;
        grant_server_access(&pool, &user.id, "Steve123").await;

        let service = AuthService::new(&pool, &config);
        let issued = service.issue_game_login_token(&user.id).await.unwrap();

        let err = service
            .verify_game_login_token(&VerifyGameTokenRequest {
                token: issued.token.clone(),
                nickname: "Somebody".to_string(),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::IdentityMismatch));

        let err = service
            .verify_game_login_token(&VerifyGameTokenRequest {
                token: "no-such-token".to_string(),
                nickname: "Steve123".to_string(),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::InvalidToken));
    }

    #[tokio::test]
    async fn expired_game_token_is_rejected() {
        let pool = test_support::pool().await;
        let config = test_support::config();
        let user = test_support::create_user(&pool, "Steve123", UserRole::User).await;
        grant_server_access(&pool, &user.id, "Steve123").await;

        let service = AuthService::new(&pool, &config);
        let issued = service.issue_game_login_token(&user.id).await.unwrap();

        sqlx::query("UPDATE game_login_tokens SET expires_at = ? WHERE user_id = ?")
            .bind(Utc::now() - Duration::minutes(1))
            .bind(&user.id)
            .execute(&pool)
            .await
            .unwrap();

        let err = service
            .verify_game_login_token(&VerifyGameTokenRequest {
                token: issued.token,
                nickname: "Steve123".to_string(),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::TokenExpired));
    }

    #[tokio::test]
    async fn api_token_auth_resolves_and_falls_back_to_sessions() {
        let pool = test_support::pool().await;
        let config = test_support::config();
        let service_account =
            test_support::create_user(&pool, "PluginBot", UserRole::Admin).await;
        let user = test_support::create_user(&pool, "Steve123", UserRole::User).await;

        let secret = "plugin-secret-token";
        ApiTokenRepository::new(&pool)
            .create(
                &Uuid::now_v7().to_string(),
                &service_account.id,
                "plugin",
                &fingerprint(secret),
                r#"["game:verify"]"#,
            )
            .await
            .unwrap();

        let service = AuthService::new(&pool, &config);
        let (principal, scope) = service.authenticate_api_token(secret).await.unwrap();
        assert_eq!(principal.user_id, service_account.id);
        assert!(scope.has_permission("game:verify"));
        assert!(!scope.has_permission("stats:write"));

        // A web session token authenticates through the same entry point.
        let response = service
            .login(login_request(&user.email, "password123"), "1.2.3.4", None)
            .await
            .unwrap();
        let (principal, scope) = service
            .authenticate_api_token(&response.session_token)
            .await
            .unwrap();
        assert_eq!(principal.user_id, user.id);
        assert!(scope.has_permission("stats:write"));

        let err = service.authenticate_api_token("garbage").await.unwrap_err();
        assert!(matches!(err, ServiceError::Unauthenticated { .. }));
    }
}
