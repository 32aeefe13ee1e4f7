// JWT verification for bearer credentials

use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::auth::error::AuthError;
use crate::auth::models::{Identity, Role};

/// JWT claims structure
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub role: Role,
    pub exp: i64,
    pub iat: i64,
}

/// Turns a bearer credential into an [`Identity`]
///
/// Issuing credentials is somebody else's job; this side only verifies.
pub trait IdentityVerifier: Send + Sync {
    fn verify(&self, bearer: &str) -> Result<Identity, AuthError>;
}

/// HS256 verifier sharing its secret with the issuer
pub struct JwtVerifier {
    key: DecodingKey,
    validation: Validation,
}

impl JwtVerifier {
    pub fn new(secret: &str) -> Self {
        Self {
            key: DecodingKey::from_secret(secret.as_bytes()),
            validation: Validation::new(Algorithm::HS256),
        }
    }
}

impl IdentityVerifier for JwtVerifier {
    fn verify(&self, bearer: &str) -> Result<Identity, AuthError> {
        let claims = decode::<Claims>(bearer, &self.key, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => AuthError::ExpiredToken,
                _ => AuthError::InvalidToken,
            })?;
        Ok(Identity {
            user_id: claims.sub,
            role: claims.role,
        })
    }
}

/// Sign a token the way the issuing service does
#[cfg(test)]
pub fn issue(secret: &str, user_id: Uuid, role: Role, ttl_secs: i64) -> String {
    use jsonwebtoken::{encode, EncodingKey, Header};

    let now = chrono::Utc::now().timestamp();
    let claims = Claims {
        sub: user_id,
        role,
        iat: now,
        exp: now + ttl_secs,
    };
    encode(&Header::default(), &claims, &EncodingKey::from_secret(secret.as_bytes()))
        .expect("test token encodes")
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const SECRET: &str = "test_secret_key_for_testing_purposes";

    #[test]
    fn test_valid_token_yields_identity() {
        let user_id = Uuid::new_v4();
        let token = issue(SECRET, user_id, Role::Admin, 900);
        let identity = JwtVerifier::new(SECRET).verify(&token).unwrap();
        assert_eq!(identity.user_id, user_id);
        assert_eq!(identity.role, Role::Admin);
    }

    #[test]
    fn test_expired_token_is_rejected() {
        // Past the default 60s leeway
        let token = issue(SECRET, Uuid::new_v4(), Role::User, -500);
        assert!(matches!(
            JwtVerifier::new(SECRET).verify(&token),
            Err(AuthError::ExpiredToken)
        ));
    }

    #[test]
    fn test_wrong_secret_is_rejected() {
        let token = issue("secret1", Uuid::new_v4(), Role::User, 900);
        assert!(matches!(
            JwtVerifier::new("secret2").verify(&token),
            Err(AuthError::InvalidToken)
        ));
    }

    #[test]
    fn test_malformed_tokens_are_rejected() {
        let verifier = JwtVerifier::new(SECRET);
        assert!(verifier.verify("").is_err());
        assert!(verifier.verify("not.a.token").is_err());
        assert!(verifier
            .verify("eyJhbGciOiJIUzI1NiIsInR5cCI6IkpXVCJ9.invalid.signature")
            .is_err());
    }

    proptest! {
        #[test]
        fn prop_random_strings_never_verify(garbage in "[a-zA-Z0-9._-]{0,80}") {
            prop_assert!(JwtVerifier::new(SECRET).verify(&garbage).is_err());
        }
    }
}
