//! Identity-provider boundary.
//!
//! The provider issues HS256 tokens whose `sub` is the user's UUID. This
//! module verifies them and hands out [`Owner`], the only value the data
//! access layer accepts as a tenancy key.

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use sqlx::{Pool, Sqlite};
use uuid::Uuid;

use crate::database::db::provision;
use crate::error::{AppError, AppResult};

/// A verified identity. Cannot be built from request input.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Owner {
    id: Uuid,
    key: String,
}

impl Owner {
    pub(crate) fn from_verified(id: Uuid) -> Self {
        Self {
            id,
            key: id.hyphenated().to_string(),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Value stored in every `user_id` column.
    pub fn as_str(&self) -> &str {
        &self.key
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub iat: i64,
    pub exp: i64,
}

#[derive(Clone)]
pub struct IdentityVerifier {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
}

impl IdentityVerifier {
    pub fn new(secret: &[u8]) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            validation: Validation::new(Algorithm::HS256),
        }
    }

    pub fn verify(&self, token: &str) -> AppResult<Owner> {
        let data = decode::<Claims>(token, &self.decoding, &self.validation)?;
        let id = Uuid::parse_str(&data.claims.sub).map_err(|_| {
            tracing::warn!(sub = %data.claims.sub, "token subject is not a UUID");
            AppError::Unauthenticated
        })?;
        Ok(Owner::from_verified(id))
    }

    /// Mint a token the way the identity provider would. Used for local
    /// development and tests.
    pub fn issue(&self, user_id: Uuid, ttl: Duration) -> AppResult<String> {
        let now = Utc::now();
        let claims = Claims {
            sub: user_id.hyphenated().to_string(),
            iat: now.timestamp(),
            exp: (now + ttl).timestamp(),
        };
        Ok(encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)?)
    }
}

/// Record the identity. Returns true the first time it is seen.
pub async fn observe(pool: &Pool<Sqlite>, owner: &Owner) -> AppResult<bool> {
    let result = sqlx::query("INSERT OR IGNORE INTO identities (id) VALUES (?)")
        .bind(owner.as_str())
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

/// Runs on every authenticated entry: the identity row is required, the
/// provisioning that follows a first sighting is best effort.
pub async fn sign_in(pool: &Pool<Sqlite>, owner: &Owner) -> AppResult<()> {
    if observe(pool, owner).await? {
        tracing::info!(user = %owner.as_str(), "new identity observed");
        if let Err(err) = provision::ensure_provisioned(pool, owner).await {
            tracing::warn!(user = %owner.as_str(), error = %err, "provisioning failed");
        }
    }
    Ok(())
}

#[cfg(test)]
pub(crate) fn test_owner() -> Owner {
    Owner::from_verified(Uuid::new_v4())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::db::{queries, test_pool};

    #[test]
    fn issued_tokens_verify() {
        let verifier = IdentityVerifier::new(b"secret");
        let user = Uuid::new_v4();
        let token = verifier.issue(user, Duration::hours(1)).unwrap();
        assert_eq!(verifier.verify(&token).unwrap().id(), user);
    }

    #[test]
    fn foreign_signature_is_rejected() {
        let token = IdentityVerifier::new(b"other")
            .issue(Uuid::new_v4(), Duration::hours(1))
            .unwrap();
        let err = IdentityVerifier::new(b"secret").verify(&token).unwrap_err();
        assert!(matches!(err, AppError::Unauthenticated));
    }

    #[test]
    fn expired_token_is_rejected() {
        let verifier = IdentityVerifier::new(b"secret");
        let token = verifier.issue(Uuid::new_v4(), Duration::hours(-2)).unwrap();
        assert!(matches!(verifier.verify(&token), Err(AppError::Unauthenticated)));
    }

    #[tokio::test]
    async fn first_sign_in_provisions_once() {
        let pool = test_pool().await;
        let owner = test_owner();

        assert!(observe(&pool, &owner).await.unwrap());
        assert!(!observe(&pool, &owner).await.unwrap());

        let other = test_owner();
        sign_in(&pool, &other).await.unwrap();
        sign_in(&pool, &other).await.unwrap();
        let categories = queries::list_categories(&pool, &other).await.unwrap();
        assert_eq!(categories.len(), provision::STARTER_CATEGORIES.len());
    }
}
