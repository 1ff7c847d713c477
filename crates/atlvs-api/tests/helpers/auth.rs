//! Access tokens for integration tests, signed like the hosted provider does.

use atlvs_gate::auth::jwt::{AccessTokenClaims, UserMetadata};
use jsonwebtoken::{encode, EncodingKey, Header};
use uuid::Uuid;

pub const TEST_JWT_SECRET: &str = "integration-test-secret-with-at-least-32-chars";

pub struct TestUser {
    pub id: Uuid,
    pub email: String,
    pub token: String,
}

impl TestUser {
    pub fn new(email: &str) -> Self {
        let id = Uuid::new_v4();
        Self {
            id,
            email: email.to_string(),
            token: mint_token(id, email, 3600),
        }
    }
}

/// HS256 token for `user_id`, expiring `ttl_seconds` from now (negative for
/// an already expired token).
pub fn mint_token(user_id: Uuid, email: &str, ttl_seconds: i64) -> String {
    let now = chrono::Utc::now().timestamp();
    let claims = AccessTokenClaims {
        sub: user_id.to_string(),
        email: Some(email.to_string()),
        aud: "authenticated".to_string(),
        exp: now + ttl_seconds,
        iat: Some(now),
        user_metadata: UserMetadata {
            email_verified: Some(true),
        },
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(TEST_JWT_SECRET.as_bytes()),
    )
    .expect("token encodes")
}

pub fn bearer(user: &TestUser) -> String {
    format!("Bearer {}", user.token)
}
