//! Trust-level engine.
//!
//! A small per-user state machine over four tiers. Advancement is
//! forward-only and requires a reviewed upgrade application; accumulated
//! playtime and reputation alone never promote anyone. Requirements are
//! recomputed on demand, never stored as trigger state.

use crate::api::common::{PaginationFilter, validate_request};
use crate::database::models::{
    ApplicationStatus, ReviewDecision, ReviewRequest, SubmitTrustLevelRequest,
    TrustLevelApplication,
};
use crate::errors::{ServiceError, ServiceResult};
use crate::repositories::player_stats_repository::PlayerStatsRepository;
use crate::repositories::reputation_repository::ReputationRepository;
use crate::repositories::trust_level_repository::{
    CreateTrustLevelApplication, TrustLevelRepository,
};
use crate::repositories::user_repository::UserRepository;
use serde::Serialize;
use sqlx::SqlitePool;
use uuid::Uuid;

/// Minutes of playtime required to hold each tier.
const PLAYTIME_THRESHOLD_MINUTES: [i64; 4] = [0, 0, 1500, 3000];
/// Reputation score required to hold each tier.
const REPUTATION_THRESHOLD: [i64; 4] = [0, 0, 10, 20];

/// Result of an eligibility check. Lists every unmet requirement, not just
/// a pass/fail flag, so callers can render progress.
#[derive(Debug, Serialize)]
pub struct EligibilityReport {
    pub target_level: i64,
    pub eligible: bool,
    pub missing_requirements: Vec<String>,
}

#[derive(Debug, Clone, Copy)]
struct QualifyingMetrics {
    playtime_minutes: i64,
    reputation_score: i64,
    email_verified: bool,
}

pub struct TrustLevelService<'a> {
    /// Shared database connection pool
    pool: &'a SqlitePool,
}

impl<'a> TrustLevelService<'a> {
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    /// Pure read: reports whether a user currently meets the requirements
    /// for `target_level` and which requirements are unmet. Transition order
    /// is enforced at submission, not here, so progress toward any tier can
    /// be rendered.
    pub async fn check_eligibility(
        &self,
        user_id: &str,
        target_level: i64,
    ) -> ServiceResult<EligibilityReport> {
        if !(1..=3).contains(&target_level) {
            return Err(ServiceError::validation(
                "Target level must be between 1 and 3",
            ));
        }

        let metrics = self.load_metrics(user_id).await?;
        let missing = missing_requirements(&metrics, target_level);

        Ok(EligibilityReport {
            target_level,
            eligible: missing.is_empty(),
            missing_requirements: missing,
        })
    }

    /// Files an upgrade application, snapshotting the qualifying metrics so
    /// later metric changes cannot retroactively invalidate the review.
    pub async fn submit_application(
        &self,
        user_id: &str,
        request: &SubmitTrustLevelRequest,
    ) -> ServiceResult<TrustLevelApplication> {
        validate_request(request)?;

        let user_repo = UserRepository::new(self.pool);
        let user = user_repo
            .get_user_by_id(user_id)
            .await?
            .ok_or_else(|| ServiceError::not_found("User", user_id))?;

        if request.target_level != user.trust_level + 1 {
            return Err(ServiceError::invalid_transition(format!(
                "Cannot move from level {} to level {}; levels advance one at a time",
                user.trust_level, request.target_level
            )));
        }

        let repo = TrustLevelRepository::new(self.pool);
        if repo.pending_for_user(user_id).await?.is_some() {
            return Err(ServiceError::DuplicatePending);
        }

        let metrics = self.load_metrics(user_id).await?;
        let missing = missing_requirements(&metrics, request.target_level);
        if !missing.is_empty() {
            return Err(ServiceError::not_eligible(missing));
        }

        let application = repo
            .create(CreateTrustLevelApplication {
                id: Uuid::now_v7().to_string(),
                user_id: user_id.to_string(),
                current_level: user.trust_level,
                requested_level: request.target_level,
                motivation: request.motivation.clone(),
                playtime_minutes: metrics.playtime_minutes,
                reputation_score: metrics.reputation_score,
                email_verified: metrics.email_verified,
            })
            .await?;

        tracing::info!(
            user_id = %user_id,
            requested_level = request.target_level,
            "trust level application submitted"
        );

        Ok(application)
    }

    /// Reviews a pending upgrade application. Approval writes the new trust
    /// level in the same transaction as the status flip; this is the only
    /// normal-path way a trust level advances.
    pub async fn review_application(
        &self,
        application_id: &str,
        reviewer_id: &str,
        request: &ReviewRequest,
    ) -> ServiceResult<TrustLevelApplication> {
        validate_request(request)?;

        let repo = TrustLevelRepository::new(self.pool);
        let application = repo
            .get_by_id(application_id)
            .await?
            .ok_or_else(|| ServiceError::not_found("Trust level application", application_id))?;

        if application.status != ApplicationStatus::Pending {
            return Err(ServiceError::already_reviewed("Trust level application"));
        }

        let mut tx = self.pool.begin().await.map_err(anyhow::Error::from)?;

        let rows = repo
            .mark_reviewed(
                &mut tx,
                application_id,
                request.decision.as_status(),
                reviewer_id,
                request.comment.as_deref(),
            )
            .await?;
        if rows == 0 {
            return Err(ServiceError::already_reviewed("Trust level application"));
        }

        if request.decision == ReviewDecision::Approved {
            UserRepository::new(self.pool)
                .set_trust_level(&mut tx, &application.user_id, application.requested_level)
                .await?;
        }

        tx.commit().await.map_err(anyhow::Error::from)?;

        tracing::info!(
            application_id = %application_id,
            reviewer_id = %reviewer_id,
            decision = ?request.decision,
            "trust level application reviewed"
        );

        repo.get_by_id(application_id)
            .await?
            .ok_or_else(|| ServiceError::not_found("Trust level application", application_id))
    }

    pub async fn list_applications(
        &self,
        status: Option<ApplicationStatus>,
        pagination: &PaginationFilter,
    ) -> ServiceResult<(Vec<TrustLevelApplication>, u64)> {
        let repo = TrustLevelRepository::new(self.pool);
        let applications = repo.list(status, pagination).await?;
        let total = repo.count(status).await?;
        Ok((applications, total))
    }

    async fn load_metrics(&self, user_id: &str) -> ServiceResult<QualifyingMetrics> {
        let user = UserRepository::new(self.pool)
            .get_user_by_id(user_id)
            .await?
            .ok_or_else(|| ServiceError::not_found("User", user_id))?;

        let playtime_minutes = PlayerStatsRepository::new(self.pool)
            .get(user_id)
            .await?
            .map(|stats| stats.playtime_minutes)
            .unwrap_or(0);

        let reputation_score = ReputationRepository::new(self.pool)
            .get(user_id)
            .await?
            .map(|record| record.reputation_score)
            .unwrap_or(0);

        Ok(QualifyingMetrics {
            playtime_minutes,
            reputation_score,
            email_verified: user.is_email_verified,
        })
    }
}

/// Every tier at or above 1 requires a verified email; tiers 2 and 3 add
/// playtime and reputation floors.
fn missing_requirements(metrics: &QualifyingMetrics, target_level: i64) -> Vec<String> {
    let mut missing = Vec::new();
    let tier = target_level as usize;

    if !metrics.email_verified {
        missing.push("email: not verified".to_string());
    }

    let needed_playtime = PLAYTIME_THRESHOLD_MINUTES[tier];
    if metrics.playtime_minutes < needed_playtime {
        missing.push(format!(
            "playtime: {} of {} minutes",
            metrics.playtime_minutes, needed_playtime
        ));
    }

    let needed_reputation = REPUTATION_THRESHOLD[tier];
    if metrics.reputation_score < needed_reputation {
        missing.push(format!(
            "reputation: {} of {}",
            metrics.reputation_score, needed_reputation
        ));
    }

    missing
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::models::{User, UserRole};
    use crate::database::test_support;
    use chrono::Utc;
    use sqlx::SqlitePool;

    async fn set_metrics(pool: &SqlitePool, user: &User, playtime: i64, reputation: i64) {
        sqlx::query(
            "INSERT INTO player_stats (user_id, playtime_minutes, deaths, kills, updated_at) VALUES (?, ?, 0, 0, ?)",
        )
        .bind(&user.id)
        .bind(playtime)
        .bind(Utc::now())
        .execute(pool)
        .await
        .unwrap();

        sqlx::query(
            "INSERT INTO reputation_records (user_id, reputation_score, positive_votes, negative_votes, updated_at) VALUES (?, ?, 0, 0, ?)",
        )
        .bind(&user.id)
        .bind(reputation)
        .bind(Utc::now())
        .execute(pool)
        .await
        .unwrap();
    }

    async fn verify_email(pool: &SqlitePool, user: &User) {
        UserRepository::new(pool)
            .mark_email_verified(&user.id)
            .await
            .unwrap();
    }

    async fn set_level(pool: &SqlitePool, user: &User, level: i64) {
        let mut conn = pool.acquire().await.unwrap();
        UserRepository::new(pool)
            .set_trust_level(&mut conn, &user.id, level)
            .await
            .unwrap();
    }

    fn upgrade_request(target_level: i64) -> SubmitTrustLevelRequest {
        SubmitTrustLevelRequest {
            target_level,
            motivation: "I want to help build the new spawn area".to_string(),
        }
    }

    fn review(decision: ReviewDecision) -> ReviewRequest {
        ReviewRequest {
            decision,
            comment: None,
        }
    }

    #[tokio::test]
    async fn eligibility_reports_unmet_requirements() {
        let pool = test_support::pool().await;
        let user = test_support::create_user(&pool, "Steve123", UserRole::User).await;
        verify_email(&pool, &user).await;
        set_metrics(&pool, &user, 1600, 12).await;

        let service = TrustLevelService::new(&pool);

        let report = service.check_eligibility(&user.id, 2).await.unwrap();
        assert!(report.eligible);
        assert!(report.missing_requirements.is_empty());

        let report = service.check_eligibility(&user.id, 3).await.unwrap();
        assert!(!report.eligible);
        assert!(
            report
                .missing_requirements
                .iter()
                .any(|m| m.starts_with("playtime"))
        );
        assert!(
            report
                .missing_requirements
                .iter()
                .any(|m| m.starts_with("reputation"))
        );
    }

    #[tokio::test]
    async fn unverified_email_blocks_every_tier() {
        let pool = test_support::pool().await;
        let user = test_support::create_user(&pool, "Steve123", UserRole::User).await;

        let service = TrustLevelService::new(&pool);
        for target in 1..=3 {
            let report = service.check_eligibility(&user.id, target).await.unwrap();
            assert!(!report.eligible);
            assert!(
                report
                    .missing_requirements
                    .iter()
                    .any(|m| m.starts_with("email"))
            );
        }
    }

    #[tokio::test]
    async fn skipping_tiers_is_an_invalid_transition() {
        let pool = test_support::pool().await;
        let user = test_support::create_user(&pool, "Steve123", UserRole::User).await;
        verify_email(&pool, &user).await;
        set_metrics(&pool, &user, 5000, 50).await;

        let service = TrustLevelService::new(&pool);

        // Every (current, target) pair except target == current + 1.
        for current in 0..=2 {
            set_level(&pool, &user, current).await;
            for target in 1..=3 {
                if target == current + 1 {
                    continue;
                }
                let err = service
                    .submit_application(&user.id, &upgrade_request(target))
                    .await
                    .unwrap_err();
                assert!(
                    matches!(err, ServiceError::InvalidTransition { .. }),
                    "current {} target {}",
                    current,
                    target
                );
            }
        }
    }

    #[tokio::test]
    async fn second_pending_application_is_rejected() {
        let pool = test_support::pool().await;
        let user = test_support::create_user(&pool, "Steve123", UserRole::User).await;
        verify_email(&pool, &user).await;
        set_metrics(&pool, &user, 0, 0).await;

        let service = TrustLevelService::new(&pool);
        service
            .submit_application(&user.id, &upgrade_request(1))
            .await
            .unwrap();

        let err = service
            .submit_application(&user.id, &upgrade_request(1))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::DuplicatePending));
    }

    #[tokio::test]
    async fn ineligible_submission_carries_the_missing_list() {
        let pool = test_support::pool().await;
        let user = test_support::create_user(&pool, "Steve123", UserRole::User).await;
        verify_email(&pool, &user).await;
        set_metrics(&pool, &user, 100, 2).await;
        set_level(&pool, &user, 1).await;

        let service = TrustLevelService::new(&pool);
        let err = service
            .submit_application(&user.id, &upgrade_request(2))
            .await
            .unwrap_err();

        match err {
            ServiceError::NotEligible { missing } => {
                assert!(missing.iter().any(|m| m.starts_with("playtime")));
                assert!(missing.iter().any(|m| m.starts_with("reputation")));
            }
            other => panic!("expected NotEligible, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn approval_is_the_only_path_that_promotes() {
        let pool = test_support::pool().await;
        let user = test_support::create_user(&pool, "Steve123", UserRole::User).await;
        let reviewer = test_support::create_user(&pool, "ModGal", UserRole::Moderator).await;
        verify_email(&pool, &user).await;
        set_metrics(&pool, &user, 2000, 15).await;

        let service = TrustLevelService::new(&pool);
        let application = service
            .submit_application(&user.id, &upgrade_request(1))
            .await
            .unwrap();

        // Metrics alone did not promote.
        let user_repo = UserRepository::new(&pool);
        assert_eq!(
            user_repo
                .get_user_by_id(&user.id)
                .await
                .unwrap()
                .unwrap()
                .trust_level,
            0
        );

        let reviewed = service
            .review_application(&application.id, &reviewer.id, &review(ReviewDecision::Approved))
            .await
            .unwrap();
        assert_eq!(reviewed.status, ApplicationStatus::Approved);
        assert_eq!(reviewed.reviewer_id.as_deref(), Some(reviewer.id.as_str()));

        assert_eq!(
            user_repo
                .get_user_by_id(&user.id)
                .await
                .unwrap()
                .unwrap()
                .trust_level,
            1
        );
    }

    #[tokio::test]
    async fn rejection_records_only_and_reviews_are_single_shot() {
        let pool = test_support::pool().await;
        let user = test_support::create_user(&pool, "Steve123", UserRole::User).await;
        let reviewer = test_support::create_user(&pool, "ModGal", UserRole::Moderator).await;
        verify_email(&pool, &user).await;
        set_metrics(&pool, &user, 0, 0).await;

        let service = TrustLevelService::new(&pool);
        let application = service
            .submit_application(&user.id, &upgrade_request(1))
            .await
            .unwrap();

        let reviewed = service
            .review_application(&application.id, &reviewer.id, &review(ReviewDecision::Rejected))
            .await
            .unwrap();
        assert_eq!(reviewed.status, ApplicationStatus::Rejected);

        let user_row = UserRepository::new(&pool)
            .get_user_by_id(&user.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(user_row.trust_level, 0);

        let err = service
            .review_application(&application.id, &reviewer.id, &review(ReviewDecision::Approved))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::AlreadyReviewed { .. }));
    }
}
