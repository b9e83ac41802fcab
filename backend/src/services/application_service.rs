//! Whitelist application business logic.
//!
//! Handles anonymous submission with duplicate and abuse guards, moderator
//! review, and the all-or-nothing provisioning of a new account when an
//! application is approved.

use crate::api::common::{PaginationFilter, validate_request};
use crate::config::Config;
use crate::database::models::{
    Application, ApplicationStatus, CreateUser, ReviewDecision, ReviewRequest,
    SubmitApplicationRequest, UserRole,
};
use crate::errors::{ServiceError, ServiceResult};
use crate::repositories::application_repository::ApplicationRepository;
use crate::repositories::player_stats_repository::PlayerStatsRepository;
use crate::repositories::reputation_repository::ReputationRepository;
use crate::repositories::user_repository::UserRepository;
use crate::services::email_service::EmailService;
use crate::services::user_service::UserService;
use crate::utils::generate_random_string::generate_random_string;
use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use sqlx::SqlitePool;
use uuid::Uuid;

/// Applications tolerated per IP within the rolling window.
const APPLICATIONS_PER_IP_LIMIT: i64 = 10;
/// Rolling window for the per-IP application guard, in hours.
const APPLICATION_WINDOW_HOURS: i64 = 24;

/// Slim status view for the anonymous lookup; applicants have no account
/// yet, so this is keyed by email and omits reviewer identity.
#[derive(Debug, Serialize)]
pub struct ApplicationStatusView {
    pub id: String,
    pub nickname: String,
    pub status: ApplicationStatus,
    pub submitted_at: DateTime<Utc>,
    pub reviewed_at: Option<DateTime<Utc>>,
    pub review_comment: Option<String>,
}

pub struct ApplicationService<'a> {
    /// Shared database connection pool
    pool: &'a SqlitePool,
    /// Email service for notifying approved applicants
    email_service: Option<EmailService>,
    base_url: String,
}

impl<'a> ApplicationService<'a> {
    /// Creates a new ApplicationService instance.
    ///
    /// # Arguments
    /// * `pool` - Reference to SQLite connection pool
    /// * `config` - Application configuration (SMTP settings optional)
    pub fn new(pool: &'a SqlitePool, config: &Config) -> Self {
        let email_service = match config.email_config() {
            Some(email_config) => match EmailService::new(email_config) {
                Ok(service) => Some(service),
                Err(e) => {
                    tracing::warn!(
                        "Failed to initialize email service: {}. Email notifications will be disabled.",
                        e
                    );
                    None
                }
            },
            None => {
                tracing::warn!(
                    "Email configuration not found. Email notifications will be disabled."
                );
                None
            }
        };

        Self {
            pool,
            email_service,
            base_url: config.base_url.clone(),
        }
    }

    /// Accepts an anonymous whitelist application.
    ///
    /// # Errors
    /// Returns `ServiceError` for:
    /// - Validation failures (nickname format, text length bounds)
    /// - A pending or approved application for the same email or nickname
    /// - Too many applications from the submitting IP
    pub async fn submit_application(
        &self,
        request: &SubmitApplicationRequest,
        ip: &str,
    ) -> ServiceResult<Application> {
        validate_request(request)?;

        let repo = ApplicationRepository::new(self.pool);
        let user_repo = UserRepository::new(self.pool);

        if user_repo.email_exists(&request.email).await?
            || user_repo.nickname_exists(&request.nickname).await?
        {
            return Err(ServiceError::duplicate_active(&request.nickname));
        }

        if repo.active_exists(&request.email, &request.nickname).await? {
            return Err(ServiceError::duplicate_active(&request.nickname));
        }

        let window_start = Utc::now() - Duration::hours(APPLICATION_WINDOW_HOURS);
        if repo.count_recent_by_ip(ip, window_start).await? >= APPLICATIONS_PER_IP_LIMIT {
            tracing::warn!(%ip, "application rate limit hit");
            return Err(ServiceError::rate_limited(
                "Too many applications from this address, try again later",
            ));
        }

        let application = repo
            .create(&Uuid::now_v7().to_string(), request, ip)
            .await
            .map_err(|e| {
                let error_msg = e.to_string();
                if error_msg.contains("UNIQUE constraint failed") {
                    ServiceError::duplicate_active(&request.nickname)
                } else {
                    ServiceError::Database { source: e }
                }
            })?;

        // Applicants have no account yet; the audit trail carries no user id.
        tracing::info!(
            application_id = %application.id,
            nickname = %application.nickname,
            %ip,
            "whitelist application submitted"
        );

        Ok(application)
    }

    /// Reviews a pending application.
    ///
    /// Approval provisions the account atomically: the status flip, the new
    /// User row (temporary password, trust level 0, unverified email), the
    /// zeroed stats and reputation rows and the application link commit
    /// together or not at all.
    pub async fn review_application(
        &self,
        application_id: &str,
        reviewer_id: &str,
        request: &ReviewRequest,
    ) -> ServiceResult<Application> {
        validate_request(request)?;

        let repo = ApplicationRepository::new(self.pool);
        let application = repo
            .get_by_id(application_id)
            .await?
            .ok_or_else(|| ServiceError::not_found("Application", application_id))?;

        if application.status != ApplicationStatus::Pending {
            return Err(ServiceError::already_reviewed("Application"));
        }

        match request.decision {
            ReviewDecision::Rejected => {
                let mut conn = self.pool.acquire().await.map_err(anyhow::Error::from)?;
                let rows = repo
                    .mark_reviewed(
                        &mut conn,
                        application_id,
                        ApplicationStatus::Rejected,
                        reviewer_id,
                        request.comment.as_deref(),
                    )
                    .await?;
                drop(conn);
                if rows == 0 {
                    return Err(ServiceError::already_reviewed("Application"));
                }

                tracing::info!(
                    application_id = %application_id,
                    reviewer_id = %reviewer_id,
                    "application rejected"
                );
            }
            ReviewDecision::Approved => {
                let temporary_password = generate_random_string(12);
                let password_hash = UserService::hash_password(&temporary_password)?;
                let verify_token = generate_random_string(32);
                let user_id = Uuid::now_v7().to_string();

                let mut tx = self.pool.begin().await.map_err(anyhow::Error::from)?;

                let rows = repo
                    .mark_reviewed(
                        &mut tx,
                        application_id,
                        ApplicationStatus::Approved,
                        reviewer_id,
                        request.comment.as_deref(),
                    )
                    .await?;
                if rows == 0 {
                    return Err(ServiceError::already_reviewed("Application"));
                }

                let user_repo = UserRepository::new(self.pool);
                let user = user_repo
                    .create_user(
                        &mut tx,
                        CreateUser {
                            id: user_id.clone(),
                            nickname: application.nickname.clone(),
                            email: application.email.clone(),
                            password_hash,
                            role: UserRole::User,
                            email_verify_token: Some(verify_token.clone()),
                        },
                    )
                    .await
                    .map_err(|e| {
                        let error_msg = e.to_string();
                        if error_msg.contains("UNIQUE constraint failed") {
                            ServiceError::duplicate_active(&application.nickname)
                        } else {
                            ServiceError::Database { source: e }
                        }
                    })?;

                PlayerStatsRepository::new(self.pool)
                    .seed(&mut tx, &user.id)
                    .await?;
                ReputationRepository::new(self.pool)
                    .seed(&mut tx, &user.id)
                    .await?;
                repo.link_user(&mut tx, application_id, &user.id).await?;

                tx.commit().await.map_err(anyhow::Error::from)?;

                tracing::info!(
                    application_id = %application_id,
                    reviewer_id = %reviewer_id,
                    user_id = %user.id,
                    "application approved, account provisioned"
                );

                self.try_send_welcome_email(
                    &application.email,
                    &application.nickname,
                    &temporary_password,
                    &verify_token,
                )
                .await;
            }
        }

        repo.get_by_id(application_id)
            .await?
            .ok_or_else(|| ServiceError::not_found("Application", application_id))
    }

    /// Anonymous status lookup by email: the latest application, any status.
    pub async fn status_by_email(&self, email: &str) -> ServiceResult<ApplicationStatusView> {
        let repo = ApplicationRepository::new(self.pool);
        let application = repo
            .latest_by_email(email)
            .await?
            .ok_or_else(|| ServiceError::not_found("Application", email))?;

        Ok(ApplicationStatusView {
            id: application.id,
            nickname: application.nickname,
            status: application.status,
            submitted_at: application.submitted_at,
            reviewed_at: application.reviewed_at,
            review_comment: application.review_comment,
        })
    }

    /// Retrieves an application by ID with existence verification.
    pub async fn get_application_required(&self, id: &str) -> ServiceResult<Application> {
        let repo = ApplicationRepository::new(self.pool);
        repo.get_by_id(id)
            .await?
            .ok_or_else(|| ServiceError::not_found("Application", id))
    }

    pub async fn list_applications(
        &self,
        status: Option<ApplicationStatus>,
        pagination: &PaginationFilter,
    ) -> ServiceResult<(Vec<Application>, u64)> {
        let repo = ApplicationRepository::new(self.pool);
        let applications = repo.list(status, pagination).await?;
        let total = repo.count(status).await?;
        Ok((applications, total))
    }

    /// Attempts to send the welcome email, logging but not failing when the
    /// email service is unavailable.
    async fn try_send_welcome_email(
        &self,
        recipient: &str,
        nickname: &str,
        temporary_password: &str,
        verify_token: &str,
    ) {
        let Some(ref email_service) = self.email_service else {
            tracing::warn!(
                "Email service not configured. Welcome email not sent to {}",
                recipient
            );
            return;
        };

        let verify_url = format!("{}/auth/verify-email?token={}", self.base_url, verify_token);
        match email_service
            .send_welcome_email(recipient, nickname, temporary_password, &verify_url)
            .await
        {
            Ok(_) => {
                tracing::info!("Welcome email sent to {}", recipient);
            }
            Err(e) => {
                tracing::error!("Failed to send welcome email to {}: {}", recipient, e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::test_support;
    use sqlx::SqlitePool;

    fn submit_request(nickname: &str, email: &str) -> SubmitApplicationRequest {
        SubmitApplicationRequest {
            nickname: nickname.to_string(),
            email: email.to_string(),
            discord: Some("steve#0001".to_string()),
            motivation: "I have played on survival servers for years and enjoy building railways."
                .to_string(),
            plans: "Start a farm near spawn and join community builds.".to_string(),
        }
    }

    fn review(decision: ReviewDecision) -> ReviewRequest {
        ReviewRequest {
            decision,
            comment: Some("welcome aboard".to_string()),
        }
    }

    async fn service_setup(pool: &SqlitePool) -> ApplicationService<'_> {
        ApplicationService::new(pool, &test_support::config())
    }

    #[tokio::test]
    async fn happy_path_provisions_a_zeroed_account() {
        let pool = test_support::pool().await;
        let reviewer = test_support::create_user(&pool, "AdminGuy", UserRole::Admin).await;
        let service = service_setup(&pool).await;

        let application = service
            .submit_application(&submit_request("Steve123", "steve@example.com"), "9.9.9.9")
            .await
            .unwrap();
        assert_eq!(application.status, ApplicationStatus::Pending);

        let reviewed = service
            .review_application(&application.id, &reviewer.id, &review(ReviewDecision::Approved))
            .await
            .unwrap();
        assert_eq!(reviewed.status, ApplicationStatus::Approved);

        let user = UserRepository::new(&pool)
            .get_user_by_nickname("Steve123")
            .await
            .unwrap()
            .expect("provisioned user");
        assert_eq!(user.trust_level, 0);
        assert_eq!(user.role, UserRole::User);
        assert!(!user.is_email_verified);
        assert!(user.email_verify_token.is_some());
        assert_eq!(reviewed.user_id.as_deref(), Some(user.id.as_str()));

        // Stats and reputation rows are seeded zeroed in the same commit.
        let stats = PlayerStatsRepository::new(&pool)
            .get(&user.id)
            .await
            .unwrap()
            .expect("stats row");
        assert_eq!(stats.playtime_minutes, 0);
        let record = ReputationRepository::new(&pool)
            .get(&user.id)
            .await
            .unwrap()
            .expect("reputation row");
        assert_eq!(record.reputation_score, 0);
    }

    #[tokio::test]
    async fn duplicate_email_while_pending_is_refused() {
        let pool = test_support::pool().await;
        let service = service_setup(&pool).await;

        service
            .submit_application(&submit_request("Steve123", "steve@example.com"), "9.9.9.9")
            .await
            .unwrap();

        let err = service
            .submit_application(&submit_request("OtherNick", "steve@example.com"), "8.8.8.8")
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::DuplicateActive { .. }));
    }

    #[tokio::test]
    async fn rejected_applicants_may_file_a_fresh_application() {
        let pool = test_support::pool().await;
        let reviewer = test_support::create_user(&pool, "AdminGuy", UserRole::Admin).await;
        let service = service_setup(&pool).await;

        let application = service
            .submit_application(&submit_request("Steve123", "steve@example.com"), "9.9.9.9")
            .await
            .unwrap();
        service
            .review_application(&application.id, &reviewer.id, &review(ReviewDecision::Rejected))
            .await
            .unwrap();

        // The rejected application stays terminal; a brand-new one is fine.
        let second = service
            .submit_application(&submit_request("Steve123", "steve@example.com"), "9.9.9.9")
            .await
            .unwrap();
        assert_ne!(second.id, application.id);

        let err = service
            .review_application(&application.id, &reviewer.id, &review(ReviewDecision::Approved))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::AlreadyReviewed { .. }));
    }

    #[tokio::test]
    async fn per_ip_application_limit() {
        let pool = test_support::pool().await;
        let service = service_setup(&pool).await;

        for i in 0..10 {
            service
                .submit_application(
                    &submit_request(&format!("Player{}", i), &format!("p{}@example.com", i)),
                    "7.7.7.7",
                )
                .await
                .unwrap();
        }

        let err = service
            .submit_application(&submit_request("Player11", "p11@example.com"), "7.7.7.7")
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::RateLimited { .. }));

        // A different address is unaffected.
        service
            .submit_application(&submit_request("Player12", "p12@example.com"), "6.6.6.6")
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn content_gates_reject_short_texts_and_bad_nicknames() {
        let pool = test_support::pool().await;
        let service = service_setup(&pool).await;

        let mut request = submit_request("Steve123", "steve@example.com");
        request.motivation = "too short".to_string();
        let err = service
            .submit_application(&request, "9.9.9.9")
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Validation { .. }));

        let mut request = submit_request("Steve123", "steve@example.com");
        request.nickname = "no spaces allowed".to_string();
        let err = service
            .submit_application(&request, "9.9.9.9")
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Validation { .. }));
    }

    #[tokio::test]
    async fn status_lookup_tracks_the_latest_application() {
        let pool = test_support::pool().await;
        let reviewer = test_support::create_user(&pool, "AdminGuy", UserRole::Admin).await;
        let service = service_setup(&pool).await;

        let err = service.status_by_email("steve@example.com").await.unwrap_err();
        assert!(matches!(err, ServiceError::NotFound { .. }));

        let application = service
            .submit_application(&submit_request("Steve123", "steve@example.com"), "9.9.9.9")
            .await
            .unwrap();
        let view = service.status_by_email("steve@example.com").await.unwrap();
        assert_eq!(view.status, ApplicationStatus::Pending);

        service
            .review_application(&application.id, &reviewer.id, &review(ReviewDecision::Rejected))
            .await
            .unwrap();
        let view = service.status_by_email("steve@example.com").await.unwrap();
        assert_eq!(view.status, ApplicationStatus::Rejected);
        assert_eq!(view.review_comment.as_deref(), Some("welcome aboard"));
    }
}
