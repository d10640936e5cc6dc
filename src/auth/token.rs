use crate::db::models::Role;
use crate::error::{AppError, AuthError};
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Claims {
    pub user_id: String,
    pub role: Role,
    pub iat: i64,
    pub exp: i64,
}

/// Source of "now" for token issuance and validation.
#[cfg_attr(test, mockall::automock)]
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Issues and validates HS256-signed access tokens. The secret and TTL are
/// fixed at construction.
#[derive(Clone)]
pub struct TokenService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    ttl: Duration,
    clock: Arc<dyn Clock>,
}

impl TokenService {
    pub fn new(secret: &str, ttl_secs: i64) -> Self {
        Self::with_clock(secret, ttl_secs, Arc::new(SystemClock))
    }

    pub fn with_clock(secret: &str, ttl_secs: i64, clock: Arc<dyn Clock>) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            ttl: Duration::seconds(ttl_secs),
            clock,
        }
    }

    pub fn issue(&self, user_id: Uuid, role: Role) -> Result<String, AppError> {
        let now = self.clock.now();
        let claims = Claims {
            user_id: user_id.to_string(),
            role,
            iat: now.timestamp(),
            exp: (now + self.ttl).timestamp(),
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| AppError::InternalError(format!("token signing failed: {}", e)))
    }

    /// Checks the signature first, then the `[iat, exp)` window against the
    /// service clock.
    pub fn validate(&self, token: &str) -> Result<(Uuid, Role), AppError> {
        let claims = self.decode(token)?;

        let now = self.clock.now().timestamp();
        if now >= claims.exp {
            return Err(AuthError::TokenExpired.into());
        }
        if now < claims.iat {
            return Err(AuthError::InvalidToken.into());
        }

        let user_id = Uuid::parse_str(&claims.user_id).map_err(|_| AuthError::InvalidToken)?;
        Ok((user_id, claims.role))
    }

    fn decode(&self, token: &str) -> Result<Claims, AppError> {
        let mut validation = Validation::new(Algorithm::HS256);
        // expiry is checked against the injected clock in validate()
        validation.validate_exp = false;
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp", "iat"]);

        let data = decode::<Claims>(token, &self.decoding_key, &validation).map_err(|e| {
            match AppError::from(e) {
                AppError::InternalError(_) => AppError::AuthError(AuthError::InvalidToken),
                other => other,
            }
        })?;
        Ok(data.claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn clock_at(at: DateTime<Utc>) -> Arc<dyn Clock> {
        let mut clock = MockClock::new();
        clock.expect_now().return_const(at);
        Arc::new(clock)
    }

    fn start() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_issue_then_validate() {
        let service = TokenService::new("test_secret", 3600);
        let user_id = Uuid::now_v7();
        let token = service.issue(user_id, Role::Patient).unwrap();

        let (subject, role) = service.validate(&token).unwrap();
        assert_eq!(subject, user_id);
        assert_eq!(role, Role::Patient);
    }

    #[test]
    fn test_token_expires_after_ttl() {
        let user_id = Uuid::now_v7();
        let issuer = TokenService::with_clock("test_secret", 60, clock_at(start()));
        let token = issuer.issue(user_id, Role::Doctor).unwrap();

        let just_before = TokenService::with_clock("test_secret", 60, clock_at(start() + Duration::seconds(59)));
        assert_eq!(just_before.validate(&token).unwrap(), (user_id, Role::Doctor));

        let at_expiry = TokenService::with_clock("test_secret", 60, clock_at(start() + Duration::seconds(60)));
        assert!(matches!(
            at_expiry.validate(&token),
            Err(AppError::AuthError(AuthError::TokenExpired))
        ));
    }

    #[test]
    fn test_token_from_the_future_is_rejected() {
        let issuer = TokenService::with_clock("test_secret", 60, clock_at(start()));
        let token = issuer.issue(Uuid::now_v7(), Role::Patient).unwrap();

        let earlier = TokenService::with_clock("test_secret", 60, clock_at(start() - Duration::seconds(5)));
        assert!(matches!(earlier.validate(&token), Err(AppError::AuthError(AuthError::InvalidToken))));
    }

    #[test]
    fn test_tampered_token_is_rejected() {
        let service = TokenService::new("test_secret", 3600);
        let token = service.issue(Uuid::now_v7(), Role::Patient).unwrap();

        let mut chars: Vec<char> = token.chars().collect();
        let idx = chars.len() / 2;
        chars[idx] = if chars[idx] == 'A' { 'B' } else { 'A' };
        let tampered: String = chars.into_iter().collect();

        assert!(matches!(service.validate(&tampered), Err(AppError::AuthError(_))));
    }

    #[test]
    fn test_wrong_secret_is_rejected() {
        let token = TokenService::new("secret_a", 3600).issue(Uuid::now_v7(), Role::Admin).unwrap();
        let result = TokenService::new("secret_b", 3600).validate(&token);
        assert!(matches!(result, Err(AppError::AuthError(AuthError::InvalidToken))));
    }

    #[test]
    fn test_garbage_is_rejected() {
        let service = TokenService::new("test_secret", 3600);
        for token in ["", "invalid_token", "a.b.c"] {
            assert!(matches!(service.validate(token), Err(AppError::AuthError(AuthError::InvalidToken))));
        }
    }
}
