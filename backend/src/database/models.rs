//! Rust structs that represent database table mappings.
//!
//! These models define the structure of data as it is stored in and retrieved
//! from the database, together with the validated request payloads that feed
//! them. Note that these may differ from API-specific response models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::{Validate, ValidationError};

/// Site role of a user. Orthogonal to the trust level: an admin's trust
/// level is not implicitly 3.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum UserRole {
    User,
    Moderator,
    Admin,
}

impl UserRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserRole::User => "user",
            UserRole::Moderator => "moderator",
            UserRole::Admin => "admin",
        }
    }

    pub fn is_moderator(&self) -> bool {
        matches!(self, UserRole::Moderator | UserRole::Admin)
    }

    pub fn is_admin(&self) -> bool {
        matches!(self, UserRole::Admin)
    }
}

/// Lifecycle state of a whitelist or trust-level application. Transitions
/// are one-way: pending -> approved | rejected, both terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum ApplicationStatus {
    Pending,
    Approved,
    Rejected,
}

/// Reviewer verdict on a pending application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReviewDecision {
    Approved,
    Rejected,
}

impl ReviewDecision {
    pub fn as_status(&self) -> ApplicationStatus {
        match self {
            ReviewDecision::Approved => ApplicationStatus::Approved,
            ReviewDecision::Rejected => ApplicationStatus::Rejected,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: String,
    pub nickname: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub role: UserRole,
    pub trust_level: i64,
    pub is_banned: bool,
    pub ban_reason: Option<String>,
    pub ban_expires_at: Option<DateTime<Utc>>,
    pub is_email_verified: bool,
    #[serde(skip_serializing)]
    pub email_verify_token: Option<String>,
    pub registered_at: DateTime<Utc>,
    pub last_login_at: Option<DateTime<Utc>>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// A ban is in force when the flag is set and the expiry, if any, is in
    /// the future. Expired temporary bans count as not banned.
    pub fn is_currently_banned(&self, now: DateTime<Utc>) -> bool {
        self.is_banned && self.ban_expires_at.map_or(true, |until| until > now)
    }
}

#[derive(Debug, Clone)]
pub struct CreateUser {
    pub id: String,
    pub nickname: String,
    pub email: String,
    pub password_hash: String,
    pub role: UserRole,
    pub email_verify_token: Option<String>,
}

/// One authenticated browser. Validity requires is_active and an unexpired
/// expires_at; the raw token is never stored, only its fingerprint.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Session {
    pub id: String,
    pub user_id: String,
    #[serde(skip_serializing)]
    pub token_hash: String,
    pub expires_at: DateTime<Utc>,
    pub is_active: bool,
    pub ip: String,
    pub user_agent: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct CreateSession {
    pub id: String,
    pub user_id: String,
    pub token_hash: String,
    pub expires_at: DateTime<Utc>,
    pub ip: String,
    pub user_agent: Option<String>,
}

/// One-time credential bridging a web session to an in-game identity.
/// Once is_used flips it never authenticates again, regardless of expiry.
#[derive(Debug, Clone, FromRow)]
pub struct GameLoginToken {
    pub id: String,
    pub user_id: String,
    pub token_hash: String,
    pub expires_at: DateTime<Utc>,
    pub is_used: bool,
    pub created_at: DateTime<Utc>,
}

/// Longer-lived binding between a verified in-game player and a user.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct GameSession {
    pub id: String,
    pub user_id: String,
    pub player_uuid: String,
    pub nickname: String,
    pub ip: String,
    pub user_agent: Option<String>,
    pub expires_at: DateTime<Utc>,
    pub is_active: bool,
    pub last_login_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

/// Long-lived credential held by the external game-server process. Only a
/// hash of the bearer secret is persisted.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ApiToken {
    pub id: String,
    pub user_id: String,
    pub name: String,
    #[serde(skip_serializing)]
    pub token_hash: String,
    pub permissions: String,
    pub is_active: bool,
    pub last_used_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl ApiToken {
    /// Decodes the stored JSON permission list. A malformed value grants
    /// nothing.
    pub fn permission_list(&self) -> Vec<String> {
        serde_json::from_str(&self.permissions).unwrap_or_default()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Application {
    pub id: String,
    pub nickname: String,
    pub email: String,
    pub discord: Option<String>,
    pub motivation: String,
    pub plans: String,
    pub status: ApplicationStatus,
    pub submitted_ip: String,
    pub submitted_at: DateTime<Utc>,
    pub reviewed_at: Option<DateTime<Utc>>,
    pub reviewer_id: Option<String>,
    pub review_comment: Option<String>,
    pub user_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct PlayerStats {
    pub user_id: String,
    pub playtime_minutes: i64,
    pub deaths: i64,
    pub kills: i64,
    pub updated_at: DateTime<Utc>,
}

/// Cached aggregate of a user's reputation ledger.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ReputationRecord {
    pub user_id: String,
    pub reputation_score: i64,
    pub positive_votes: i64,
    pub negative_votes: i64,
    pub updated_at: DateTime<Utc>,
}

/// Append-only ledger entry. The cached aggregate is always derivable by
/// summing these deltas per user.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ReputationEvent {
    pub id: String,
    pub voter_id: Option<String>,
    pub target_user_id: String,
    pub delta: i64,
    pub reason: String,
    pub is_admin_action: bool,
    pub created_at: DateTime<Utc>,
}

/// A user-initiated request to advance one trust level. The qualifying
/// metrics are snapshotted at submission time so later metric changes do not
/// retroactively invalidate a pending review.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct TrustLevelApplication {
    pub id: String,
    pub user_id: String,
    pub current_level: i64,
    pub requested_level: i64,
    pub motivation: String,
    pub playtime_minutes: i64,
    pub reputation_score: i64,
    pub email_verified: bool,
    pub status: ApplicationStatus,
    pub reviewer_id: Option<String>,
    pub review_comment: Option<String>,
    pub submitted_at: DateTime<Utc>,
    pub reviewed_at: Option<DateTime<Utc>>,
}

// ---------------------------------------------------------------------------
// Request payloads
// ---------------------------------------------------------------------------

/// Whitelist application submitted by a prospective player. The length
/// bounds are content-quality gates, not security boundaries.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct SubmitApplicationRequest {
    #[validate(custom(function = "validate_nickname"))]
    pub nickname: String,

    #[validate(
        email(message = "Must be a valid email"),
        length(max = 255, message = "Email too long")
    )]
    pub email: String,

    #[validate(length(max = 64, message = "Discord handle too long"))]
    pub discord: Option<String>,

    #[validate(length(
        min = 50,
        max = 800,
        message = "Motivation must be between 50-800 characters"
    ))]
    pub motivation: String,

    #[validate(length(
        min = 30,
        max = 600,
        message = "Plans must be between 30-600 characters"
    ))]
    pub plans: String,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct ReviewRequest {
    pub decision: ReviewDecision,

    #[validate(length(max = 500, message = "Comment too long"))]
    pub comment: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct SubmitTrustLevelRequest {
    #[validate(range(min = 1, max = 3, message = "Target level must be between 1-3"))]
    pub target_level: i64,

    #[validate(length(
        min = 10,
        max = 800,
        message = "Motivation must be between 10-800 characters"
    ))]
    pub motivation: String,
}

/// Peer vote. Delta bounds live here, in the validation layer, not in the
/// reputation engine.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct VoteRequest {
    #[validate(range(min = -1, max = 1, message = "Vote delta must be -1 or 1"))]
    pub delta: i64,

    #[validate(length(min = 1, max = 255, message = "Reason must be 1-255 characters"))]
    pub reason: String,
}

/// Admin reputation adjustment. Wider bounds than peer votes.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct AdjustReputationRequest {
    #[validate(range(min = -100, max = 100, message = "Delta must be between -100 and 100"))]
    pub delta: i64,

    #[validate(length(min = 1, max = 255, message = "Reason must be 1-255 characters"))]
    pub reason: String,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct BanUserRequest {
    #[validate(length(min = 1, max = 255, message = "Reason must be 1-255 characters"))]
    pub reason: String,

    pub expires_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct SetTrustLevelRequest {
    #[validate(range(min = 0, max = 3, message = "Trust level must be between 0-3"))]
    pub trust_level: i64,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct ChangePasswordRequest {
    #[validate(length(min = 1, message = "Current password is required"))]
    pub current_password: String,

    #[validate(length(min = 8, max = 128, message = "Password must be 8-128 characters"))]
    pub new_password: String,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateApiTokenRequest {
    #[validate(length(min = 1, max = 64, message = "Name must be 1-64 characters"))]
    pub name: String,

    /// Permission strings such as "game:verify"; "*" grants everything.
    pub permissions: Vec<String>,
}

/// Plugin-side call exchanging a one-time game login token for a principal.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct VerifyGameTokenRequest {
    #[validate(length(min = 1, message = "Token is required"))]
    pub token: String,

    #[validate(length(min = 1, max = 16, message = "Nickname must be 1-16 characters"))]
    pub nickname: String,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateGameSessionRequest {
    #[validate(length(min = 1, max = 16, message = "Nickname must be 1-16 characters"))]
    pub nickname: String,

    #[validate(length(min = 1, max = 36, message = "Player UUID must be 1-36 characters"))]
    pub player_uuid: String,

    #[validate(length(min = 1, max = 64, message = "IP must be 1-64 characters"))]
    pub ip: String,

    #[validate(length(max = 255, message = "User agent too long"))]
    pub user_agent: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CheckGameSessionRequest {
    #[validate(length(min = 1, max = 16, message = "Nickname must be 1-16 characters"))]
    pub nickname: String,

    #[validate(length(min = 1, max = 36, message = "Player UUID must be 1-36 characters"))]
    pub player_uuid: String,

    #[validate(length(min = 1, max = 64, message = "IP must be 1-64 characters"))]
    pub ip: String,
}

/// Periodic stat push from the game-server plugin. Deltas, not totals.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct UpdateStatsRequest {
    #[validate(length(min = 1, max = 16, message = "Nickname must be 1-16 characters"))]
    pub nickname: String,

    #[validate(range(min = 0, max = 1440, message = "Playtime delta must be 0-1440 minutes"))]
    pub playtime_minutes: i64,

    #[validate(range(min = 0, max = 10000, message = "Deaths delta out of range"))]
    pub deaths: i64,

    #[validate(range(min = 0, max = 10000, message = "Kills delta out of range"))]
    pub kills: i64,
}

/// In-game names: 3-16 characters, letters, digits and underscores.
fn validate_nickname(nickname: &str) -> Result<(), ValidationError> {
    let valid = (3..=16).contains(&nickname.len())
        && nickname
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_');

    if valid {
        Ok(())
    } else {
        let mut error = ValidationError::new("nickname");
        error.message =
            Some("Nickname must be 3-16 characters of letters, digits and underscores".into());
        Err(error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nickname_rules() {
        assert!(validate_nickname("Steve123").is_ok());
        assert!(validate_nickname("a_b").is_ok());
        assert!(validate_nickname("ab").is_err());
        assert!(validate_nickname("seventeen_chars__").is_err());
        assert!(validate_nickname("bad name").is_err());
        assert!(validate_nickname("ünïcode").is_err());
    }

    #[test]
    fn ban_expiry_is_respected() {
        let now = Utc::now();
        let mut user = sample_user();
        assert!(!user.is_currently_banned(now));

        user.is_banned = true;
        assert!(user.is_currently_banned(now));

        user.ban_expires_at = Some(now - chrono::Duration::hours(1));
        assert!(!user.is_currently_banned(now));

        user.ban_expires_at = Some(now + chrono::Duration::hours(1));
        assert!(user.is_currently_banned(now));
    }

    #[test]
    fn api_token_permission_list_tolerates_garbage() {
        let mut token = sample_api_token();
        assert_eq!(token.permission_list(), vec!["game:verify".to_string()]);

        token.permissions = "not json".to_string();
        assert!(token.permission_list().is_empty());
    }

    fn sample_user() -> User {
        User {
            id: "u1".to_string(),
            nickname: "Steve123".to_string(),
            email: "steve@example.com".to_string(),
            password_hash: String::new(),
            role: UserRole::User,
            trust_level: 0,
            is_banned: false,
            ban_reason: None,
            ban_expires_at: None,
            is_email_verified: false,
            email_verify_token: None,
            registered_at: Utc::now(),
            last_login_at: None,
            updated_at: Utc::now(),
        }
    }

    fn sample_api_token() -> ApiToken {
        ApiToken {
            id: "t1".to_string(),
            user_id: "u1".to_string(),
            name: "plugin".to_string(),
            token_hash: String::new(),
            permissions: r#"["game:verify"]"#.to_string(),
            is_active: true,
            last_used_at: None,
            created_at: Utc::now(),
        }
    }
}
