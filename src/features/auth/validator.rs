use jsonwebtoken::{decode, decode_header, Algorithm, DecodingKey, Validation};
use std::time::Duration;
use uuid::Uuid;

use super::model::{AuthenticatedUser, Claims};
use crate::core::error::AppError;

/// Validates HS256 access tokens signed with the shared session secret
pub struct JwtValidator {
    decoding_key: DecodingKey,
    leeway: u64,
}

impl JwtValidator {
    pub fn new(secret: &str, leeway: Duration) -> Self {
        Self {
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            leeway: leeway.as_secs(),
        }
    }

    pub fn validate_token(&self, token: &str) -> Result<AuthenticatedUser, AppError> {
        let header = decode_header(token)
            .map_err(|e| AppError::Unauthorized(format!("Invalid token header: {}", e)))?;

        if header.alg != Algorithm::HS256 {
            return Err(AppError::Unauthorized(format!(
                "Unsupported algorithm: {:?}. Only HS256 is allowed",
                header.alg
            )));
        }

        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = self.leeway;
        validation.validate_nbf = true;
        validation.set_required_spec_claims(&["exp", "sub"]);

        let token_data = decode::<Claims>(token, &self.decoding_key, &validation)
            .map_err(|e| AppError::Unauthorized(e.to_string()))?;

        // Subject must be the user's UUID
        let user_id = Uuid::parse_str(&token_data.claims.sub)
            .map_err(|_| AppError::Unauthorized("Token subject is not a user id".to_string()))?;

        Ok(AuthenticatedUser::new(user_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::test_helpers::{issue_token, TEST_JWT_SECRET};

    fn validator() -> JwtValidator {
        JwtValidator::new(TEST_JWT_SECRET, Duration::from_secs(0))
    }

    #[test]
    fn test_valid_token_yields_user() {
        let user_id = Uuid::new_v4();
        let token = issue_token(user_id, 3600);

        let user = validator().validate_token(&token).unwrap();
        assert_eq!(user.user_id, user_id);
    }

    #[test]
    fn test_expired_token_rejected() {
        let token = issue_token(Uuid::new_v4(), -3600);
        assert!(matches!(
            validator().validate_token(&token),
            Err(AppError::Unauthorized(_))
        ));
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let token = issue_token(Uuid::new_v4(), 3600);
        let other = JwtValidator::new("another-secret-that-is-long-enough-123", Duration::ZERO);
        assert!(other.validate_token(&token).is_err());
    }

    #[test]
    fn test_garbage_rejected() {
        assert!(validator().validate_token("not-a-jwt").is_err());
    }
}
