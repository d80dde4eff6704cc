//! Session service - credential checks and signed session tokens
//!
//! Tokens are HS256 JWTs naming the user. The ledger services never see a
//! token: front-ends resolve it to a [`UserId`] first.

use std::sync::Arc;

use chrono::Utc;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::domain::result::{Error, Result};
use crate::domain::{normalize_username, Argon2Params, User, UserId};
use crate::ports::LedgerStore;

/// Claims carried by a session token
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionClaims {
    /// User id
    pub sub: String,
    pub username: String,
    pub iat: i64,
    pub exp: i64,
}

/// Session service for issuing and resolving tokens
pub struct SessionService {
    store: Arc<dyn LedgerStore>,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    ttl_secs: u64,
    hasher: Argon2Params,
}

impl SessionService {
    pub fn new(store: Arc<dyn LedgerStore>, secret: &str, ttl_secs: u64) -> Self {
        Self::with_hasher(store, secret, ttl_secs, Argon2Params::default())
    }

    pub fn with_hasher(
        store: Arc<dyn LedgerStore>,
        secret: &str,
        ttl_secs: u64,
        hasher: Argon2Params,
    ) -> Self {
        Self {
            store,
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            ttl_secs,
            hasher,
        }
    }

    /// Credential hasher used at registration
    pub fn hasher(&self) -> &Argon2Params {
        &self.hasher
    }

    /// Sign a fresh token for `user`
    pub fn issue(&self, user: &User) -> Result<String> {
        let iat = Utc::now().timestamp();
        let claims = SessionClaims {
            sub: user.id.to_string(),
            username: user.username.clone(),
            iat,
            exp: iat + self.ttl_secs as i64,
        };
        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| Error::Config(format!("Failed to sign session token: {}", e)))
    }

    /// Validate a token (optionally `Bearer `-prefixed) and return its claims
    pub fn claims(&self, token: &str) -> Result<SessionClaims> {
        let token = token.trim();
        let token = token.strip_prefix("Bearer ").unwrap_or(token).trim();
        if token.is_empty() {
            return Err(Error::unauthorized("Missing session token"));
        }

        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;

        decode::<SessionClaims>(token, &self.decoding_key, &validation)
            .map(|data| data.claims)
            .map_err(|e| {
                tracing::warn!(error = %e, "rejected session token");
                Error::unauthorized("Invalid or expired session token")
            })
    }

    /// The calling principal named by a token
    pub fn resolve(&self, token: &str) -> Result<UserId> {
        Ok(UserId::from(self.claims(token)?.sub))
    }

    /// Check credentials and issue a token
    ///
    /// Users registered without a password log in by name alone.
    pub fn login(&self, username: &str, password: Option<&str>) -> Result<String> {
        let username = normalize_username(username)
            .map_err(|_| Error::unauthorized("Invalid username or password"))?;

        let user = self
            .store
            .find_user_by_username(&username)?
            .ok_or_else(|| Error::unauthorized("Invalid username or password"))?;

        if let Some(stored) = user.credential.as_deref() {
            let verified = password.is_some_and(|p| self.hasher.verify(p, stored));
            if !verified {
                tracing::warn!(user_id = %user.id, "login rejected");
                return Err(Error::unauthorized("Invalid username or password"));
            }
        }

        tracing::info!(user_id = %user.id, "login");
        self.issue(&user)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use crate::adapters::duckdb::DuckDbStore;
    use crate::ports::UnitOfWork;

    fn cheap_hasher() -> Argon2Params {
        Argon2Params { time_cost: 1, memory_cost: 1024, parallelism: 1, hash_len: 32 }
    }

    fn setup() -> (Arc<dyn LedgerStore>, SessionService) {
        let store = DuckDbStore::open_in_memory(Duration::from_millis(200)).unwrap();
        store.ensure_schema().unwrap();
        let store: Arc<dyn LedgerStore> = Arc::new(store);
        let sessions = SessionService::with_hasher(Arc::clone(&store), "test-secret", 900, cheap_hasher());
        (store, sessions)
    }

    fn insert(store: &Arc<dyn LedgerStore>, user: &User) {
        let mut uow = store.begin().unwrap();
        uow.insert_user(user).unwrap();
        uow.commit().unwrap();
    }

    #[test]
    fn test_issue_and_resolve() {
        let (_store, sessions) = setup();
        let user = User::new("alice", None);

        let token = sessions.issue(&user).unwrap();
        assert_eq!(sessions.resolve(&token).unwrap(), user.id);
        assert_eq!(sessions.resolve(&format!("Bearer {}", token)).unwrap(), user.id);

        let claims = sessions.claims(&token).unwrap();
        assert_eq!(claims.username, "alice");
        assert_eq!(claims.exp - claims.iat, 900);
    }

    #[test]
    fn test_wrong_secret_is_unauthorized() {
        let (store, sessions) = setup();
        let other = SessionService::new(store, "other-secret", 900);

        let token = other.issue(&User::new("mallory", None)).unwrap();
        assert!(matches!(sessions.resolve(&token), Err(Error::Unauthorized(_))));
        assert!(matches!(sessions.resolve("garbage"), Err(Error::Unauthorized(_))));
        assert!(matches!(sessions.resolve(""), Err(Error::Unauthorized(_))));
    }

    #[test]
    fn test_expired_token_is_unauthorized() {
        let (_store, sessions) = setup();
        let now = Utc::now().timestamp();
        let claims = SessionClaims {
            sub: "u1".to_string(),
            username: "alice".to_string(),
            iat: now - 1000,
            exp: now - 100,
        };
        let token = encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(b"test-secret"),
        )
        .unwrap();

        assert!(matches!(sessions.resolve(&token), Err(Error::Unauthorized(_))));
    }

    #[test]
    fn test_login_with_password() {
        let (store, sessions) = setup();
        let credential = sessions.hasher().hash("hunter2").unwrap();
        let user = User::new("alice", Some(credential));
        insert(&store, &user);

        let token = sessions.login("alice", Some("hunter2")).unwrap();
        assert_eq!(sessions.resolve(&token).unwrap(), user.id);

        assert!(matches!(sessions.login("alice", Some("wrong")), Err(Error::Unauthorized(_))));
        assert!(matches!(sessions.login("alice", None), Err(Error::Unauthorized(_))));
    }

    #[test]
    fn test_login_without_credential_and_unknown_user() {
        let (store, sessions) = setup();
        let user = User::new("bob", None);
        insert(&store, &user);

        assert!(sessions.login("bob", None).is_ok());
        assert!(matches!(sessions.login("nobody", None), Err(Error::Unauthorized(_))));
    }
}
