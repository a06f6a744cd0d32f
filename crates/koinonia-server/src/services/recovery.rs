//! Password reset token lifecycle
//!
//! Issuing, redeeming and purging reset tokens. Tokens are single-use,
//! 32 hex chars, valid for one hour. Redemption never says why a token
//! was refused.

use std::sync::Arc;

use chrono::{Duration, Utc};
use rand::Rng;

use koinonia_core::{Error, Result, Storage};
use koinonia_types::{NewPasswordResetToken, PasswordResetToken};

const TOKEN_BYTES: usize = 16;
const TOKEN_TTL_HOURS: i64 = 1;

#[derive(Clone)]
pub struct RecoveryService {
    store: Arc<dyn Storage>,
}

impl RecoveryService {
    pub fn new(store: Arc<dyn Storage>) -> Self {
        Self { store }
    }

    pub async fn issue_token(&self, user_id: i64) -> Result<PasswordResetToken> {
        if self.store.get_user(user_id).await?.is_none() {
            return Err(Error::NotFound("user"));
        }

        let mut bytes = [0u8; TOKEN_BYTES];
        rand::thread_rng().fill(&mut bytes);

        self.store
            .create_password_reset_token(NewPasswordResetToken {
                user_id,
                token: hex::encode(bytes),
                expires_at: Utc::now() + Duration::hours(TOKEN_TTL_HOURS),
            })
            .await
    }

    /// Redeems a token and returns its user. Unknown, used and expired
    /// tokens all fail the same way.
    pub async fn redeem_token(&self, token: &str) -> Result<i64> {
        let row = match self.store.get_password_reset_token(token).await? {
            Some(row) => row,
            None => return Err(Error::InvalidToken),
        };
        if !row.is_valid(Utc::now()) {
            return Err(Error::InvalidToken);
        }
        if !self.store.mark_password_reset_token_used(row.id).await? {
            return Err(Error::InvalidToken);
        }
        Ok(row.user_id)
    }

    /// Removes expired tokens, returning how many were deleted.
    pub async fn purge_expired(&self) -> Result<u64> {
        self.store
            .delete_expired_password_reset_tokens(Utc::now())
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;
    use koinonia_types::{NewUser, UserRole};

    async fn fixture() -> (Arc<dyn Storage>, RecoveryService, i64) {
        let store: Arc<dyn Storage> = Arc::new(MemoryStore::new());
        let user = store
            .create_user(NewUser {
                username: "forgetful".to_string(),
                email: "forgetful@example.com".to_string(),
                password: "hash".to_string(),
                name: "Forgetful".to_string(),
                role: UserRole::Regular,
            })
            .await
            .unwrap();
        let service = RecoveryService::new(store.clone());
        (store, service, user.id)
    }

    #[tokio::test]
    async fn tokens_are_single_use() {
        let (_store, service, user_id) = fixture().await;
        let token = service.issue_token(user_id).await.unwrap();
        assert_eq!(token.token.len(), 32);

        assert_eq!(service.redeem_token(&token.token).await.unwrap(), user_id);
        let err = service.redeem_token(&token.token).await.unwrap_err();
        assert!(matches!(err, Error::InvalidToken));
    }

    #[tokio::test]
    async fn expired_tokens_are_refused_and_purged() {
        let (store, service, user_id) = fixture().await;
        let expired = store
            .create_password_reset_token(NewPasswordResetToken {
                user_id,
                token: "c".repeat(32),
                expires_at: Utc::now() - Duration::minutes(5),
            })
            .await
            .unwrap();

        let err = service.redeem_token(&expired.token).await.unwrap_err();
        assert!(matches!(err, Error::InvalidToken));

        let live = service.issue_token(user_id).await.unwrap();
        assert_eq!(service.purge_expired().await.unwrap(), 1);
        assert!(store
            .get_password_reset_token(&live.token)
            .await
            .unwrap()
            .is_some());
    }

    #[tokio::test]
    async fn unknown_token_and_unknown_user_fail() {
        let (_store, service, _user_id) = fixture().await;
        let err = service.redeem_token("no-such-token").await.unwrap_err();
        assert!(matches!(err, Error::InvalidToken));

        let err = service.issue_token(9999).await.unwrap_err();
        assert!(matches!(err, Error::NotFound("user")));
    }
}
