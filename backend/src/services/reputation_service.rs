//! Reputation business logic.
//!
//! Reputation is an append-only ledger of signed deltas plus a cached
//! per-user aggregate. The two are only ever written together, in one
//! transaction, so the cache is always replay-derivable from the ledger.

use crate::api::common::validate_request;
use crate::database::models::{
    AdjustReputationRequest, ReputationEvent, ReputationRecord, VoteRequest,
};
use crate::errors::{ServiceError, ServiceResult};
use crate::repositories::reputation_repository::ReputationRepository;
use crate::repositories::user_repository::UserRepository;
use chrono::{Duration, Utc};
use serde::Serialize;
use sqlx::SqlitePool;
use uuid::Uuid;

/// Rolling window within which a voter may rate a given target only once.
const VOTE_COOLDOWN_HOURS: i64 = 24;
/// Ledger entries returned alongside the aggregate.
const RECENT_EVENT_LIMIT: i64 = 20;

#[derive(Debug, Serialize)]
pub struct ReputationSummary {
    pub record: ReputationRecord,
    pub recent_events: Vec<ReputationEvent>,
}

pub struct ReputationService<'a> {
    /// Shared database connection pool
    pool: &'a SqlitePool,
}

impl<'a> ReputationService<'a> {
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    /// Casts a peer vote. Delta bounds (±1) are enforced by the request
    /// payload, self-votes and the 24-hour cooldown here.
    pub async fn vote(
        &self,
        target_user_id: &str,
        voter_id: &str,
        request: &VoteRequest,
    ) -> ServiceResult<ReputationEvent> {
        validate_request(request)?;
        self.adjust_reputation(
            target_user_id,
            Some(voter_id),
            request.delta,
            &request.reason,
            false,
        )
        .await
    }

    /// Applies an admin adjustment. Wider delta bounds (±100, enforced by
    /// the payload), no cooldown, no self-vote restriction.
    pub async fn admin_adjust(
        &self,
        target_user_id: &str,
        admin_id: &str,
        request: &AdjustReputationRequest,
    ) -> ServiceResult<ReputationEvent> {
        validate_request(request)?;
        self.adjust_reputation(
            target_user_id,
            Some(admin_id),
            request.delta,
            &request.reason,
            true,
        )
        .await
    }

    /// Appends a ledger event and folds it into the cached aggregate as one
    /// atomic unit. A crash between the two writes cannot leave the cache
    /// stale relative to the ledger.
    pub async fn adjust_reputation(
        &self,
        target_user_id: &str,
        voter_id: Option<&str>,
        delta: i64,
        reason: &str,
        is_admin_action: bool,
    ) -> ServiceResult<ReputationEvent> {
        if delta == 0 {
            return Err(ServiceError::validation("Delta must not be zero"));
        }

        let user_repo = UserRepository::new(self.pool);
        if user_repo.get_user_by_id(target_user_id).await?.is_none() {
            return Err(ServiceError::not_found("User", target_user_id));
        }

        let repo = ReputationRepository::new(self.pool);

        if !is_admin_action {
            let voter_id = voter_id.ok_or_else(|| {
                ServiceError::validation("Peer votes require a voter identity")
            })?;

            if voter_id == target_user_id {
                return Err(ServiceError::SelfVote);
            }

            if let Some(last) = repo.last_vote_at(voter_id, target_user_id).await? {
                if last > Utc::now() - Duration::hours(VOTE_COOLDOWN_HOURS) {
                    return Err(ServiceError::VoteCooldown);
                }
            }
        }

        let mut tx = self.pool.begin().await.map_err(anyhow::Error::from)?;

        let event = repo
            .append_event(
                &mut tx,
                &Uuid::now_v7().to_string(),
                voter_id,
                target_user_id,
                delta,
                reason,
                is_admin_action,
            )
            .await?;
        repo.apply_delta(&mut tx, target_user_id, delta).await?;

        tx.commit().await.map_err(anyhow::Error::from)?;

        tracing::info!(
            target_user_id = %target_user_id,
            delta,
            is_admin_action,
            "reputation adjusted"
        );

        Ok(event)
    }

    /// Aggregate plus the most recent ledger entries for a user.
    pub async fn summary(&self, user_id: &str) -> ServiceResult<ReputationSummary> {
        let user_repo = UserRepository::new(self.pool);
        if user_repo.get_user_by_id(user_id).await?.is_none() {
            return Err(ServiceError::not_found("User", user_id));
        }

        let repo = ReputationRepository::new(self.pool);
        let record = repo.get(user_id).await?.unwrap_or(ReputationRecord {
            user_id: user_id.to_string(),
            reputation_score: 0,
            positive_votes: 0,
            negative_votes: 0,
            updated_at: Utc::now(),
        });
        let recent_events = repo.events_for(user_id, RECENT_EVENT_LIMIT).await?;

        Ok(ReputationSummary {
            record,
            recent_events,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::models::UserRole;
    use crate::database::test_support;

    fn vote(delta: i64) -> VoteRequest {
        VoteRequest {
            delta,
            reason: "helped me build a farm".to_string(),
        }
    }

    #[tokio::test]
    async fn self_votes_are_rejected() {
        let pool = test_support::pool().await;
        let user = test_support::create_user(&pool, "Steve123", UserRole::User).await;

        let service = ReputationService::new(&pool);
        let err = service.vote(&user.id, &user.id, &vote(1)).await.unwrap_err();
        assert!(matches!(err, ServiceError::SelfVote));
    }

    #[tokio::test]
    async fn vote_cooldown_blocks_within_24_hours() {
        let pool = test_support::pool().await;
        let target = test_support::create_user(&pool, "Steve123", UserRole::User).await;
        let voter = test_support::create_user(&pool, "Alexx", UserRole::User).await;

        let service = ReputationService::new(&pool);
        service.vote(&target.id, &voter.id, &vote(1)).await.unwrap();

        let err = service
            .vote(&target.id, &voter.id, &vote(1))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::VoteCooldown));

        // Backdate the earlier vote beyond the window; voting succeeds again.
        sqlx::query("UPDATE reputation_events SET created_at = ? WHERE voter_id = ?")
            .bind(Utc::now() - Duration::hours(25))
            .bind(&voter.id)
            .execute(&pool)
            .await
            .unwrap();

        service.vote(&target.id, &voter.id, &vote(-1)).await.unwrap();
    }

    #[tokio::test]
    async fn admin_adjustments_skip_cooldown_and_self_vote_rules() {
        let pool = test_support::pool().await;
        let admin = test_support::create_user(&pool, "AdminGuy", UserRole::Admin).await;

        let service = ReputationService::new(&pool);
        let adjust = AdjustReputationRequest {
            delta: 50,
            reason: "event reward".to_string(),
        };
        service
            .admin_adjust(&admin.id, &admin.id, &adjust)
            .await
            .unwrap();
        service
            .admin_adjust(&admin.id, &admin.id, &adjust)
            .await
            .unwrap();

        let summary = service.summary(&admin.id).await.unwrap();
        assert_eq!(summary.record.reputation_score, 100);
    }

    #[tokio::test]
    async fn delta_bounds_are_enforced_at_the_validation_layer() {
        let pool = test_support::pool().await;
        let target = test_support::create_user(&pool, "Steve123", UserRole::User).await;
        let voter = test_support::create_user(&pool, "Alexx", UserRole::User).await;

        let service = ReputationService::new(&pool);
        let err = service
            .vote(&target.id, &voter.id, &vote(2))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Validation { .. }));

        let err = service
            .vote(&target.id, &voter.id, &vote(0))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Validation { .. }));
    }

    #[tokio::test]
    async fn cached_score_always_equals_the_ledger_sum() {
        let pool = test_support::pool().await;
        let target = test_support::create_user(&pool, "Steve123", UserRole::User).await;
        let voter_a = test_support::create_user(&pool, "Alexx", UserRole::User).await;
        let voter_b = test_support::create_user(&pool, "Creeper99", UserRole::User).await;
        let admin = test_support::create_user(&pool, "AdminGuy", UserRole::Admin).await;

        let service = ReputationService::new(&pool);
        service.vote(&target.id, &voter_a.id, &vote(1)).await.unwrap();
        service.vote(&target.id, &voter_b.id, &vote(-1)).await.unwrap();
        service
            .admin_adjust(
                &target.id,
                &admin.id,
                &AdjustReputationRequest {
                    delta: 25,
                    reason: "build contest winner".to_string(),
                },
            )
            .await
            .unwrap();

        let repo = ReputationRepository::new(&pool);
        let record = repo.get(&target.id).await.unwrap().unwrap();
        let ledger_sum = repo.sum_deltas(&target.id).await.unwrap();
        assert_eq!(record.reputation_score, ledger_sum);
        assert_eq!(record.reputation_score, 25);
        assert_eq!(record.positive_votes, 2);
        assert_eq!(record.negative_votes, 1);
    }
}
