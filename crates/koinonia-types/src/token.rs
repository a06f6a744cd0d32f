//! Password reset token types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single-use password reset token
///
/// Valid only while unused and unexpired.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PasswordResetToken {
    pub id: i64,
    pub user_id: i64,
    pub token: String,
    pub expires_at: DateTime<Utc>,
    pub is_used: bool,
    pub created_at: DateTime<Utc>,
}

impl PasswordResetToken {
    /// Whether the token can still be redeemed at `now`
    pub fn is_valid(&self, now: DateTime<Utc>) -> bool {
        !self.is_used && self.expires_at > now
    }
}

/// Payload for persisting a freshly issued token
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewPasswordResetToken {
    pub user_id: i64,
    pub token: String,
    pub expires_at: DateTime<Utc>,
}
