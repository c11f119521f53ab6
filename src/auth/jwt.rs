use std::time::Duration;

use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::{header::AUTHORIZATION, request::Parts},
};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use time::{Duration as TimeDuration, OffsetDateTime};
use tracing::{debug, error, warn};
use uuid::Uuid;

use super::claims::Claims;
use crate::{
    config::JwtConfig,
    error::{ApiError, AuthError, ConfigError, VerifyError},
    state::AppState,
};

#[derive(Clone)]
struct KeyPair {
    encoding: EncodingKey,
    decoding: DecodingKey,
}

/// Signing and verification keys plus the claims every token must carry.
#[derive(Clone)]
pub struct JwtKeys {
    keys: Option<KeyPair>,
    pub issuer: String,
    pub audience: String,
    pub ttl: Duration,
}

impl JwtKeys {
    pub fn from_config(cfg: &JwtConfig) -> Self {
        let keys = cfg.secret.as_deref().filter(|s| !s.is_empty()).map(|secret| KeyPair {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
        });
        Self {
            keys,
            issuer: cfg.issuer.clone(),
            audience: cfg.audience.clone(),
            ttl: Duration::from_secs(cfg.ttl_minutes_clamped() as u64 * 60),
        }
    }

    fn pair(&self) -> Result<&KeyPair, ConfigError> {
        self.keys.as_ref().ok_or_else(|| {
            error!("JWT_SECRET is not configured");
            ConfigError::SecretMissing
        })
    }

    /// Issues a token for the given identity.
    pub fn sign(&self, user_id: Uuid, email: &str, name: &str) -> Result<String, ApiError> {
        let now = OffsetDateTime::now_utc();
        let exp = i64::try_from(self.ttl.as_secs())
            .ok()
            .and_then(|secs| now.checked_add(TimeDuration::seconds(secs)))
            .ok_or_else(|| ApiError::Internal(anyhow::anyhow!("token lifetime out of range")))?;
        let claims = Claims {
            sub: user_id,
            email: email.to_string(),
            name: name.to_string(),
            iat: now.unix_timestamp() as usize,
            exp: exp.unix_timestamp() as usize,
            iss: self.issuer.clone(),
            aud: self.audience.clone(),
        };
        self.encode(&claims)
    }

    pub fn encode(&self, claims: &Claims) -> Result<String, ApiError> {
        let pair = self.pair()?;
        let token = encode(&Header::default(), claims, &pair.encoding)
            .map_err(|e| ApiError::Internal(e.into()))?;
        debug!(user_id = %claims.sub, "jwt signed");
        Ok(token)
    }

    /// Checks presence first, then configuration, then signature and claims.
    pub fn verify(&self, token: Option<&str>) -> Result<Claims, VerifyError> {
        let token = match token.map(str::trim) {
            Some(t) if !t.is_empty() => t,
            _ => {
                warn!("no token provided");
                return Err(AuthError::MissingToken.into());
            }
        };
        let pair = self.pair()?;

        let mut validation = Validation::default();
        validation.set_audience(std::slice::from_ref(&self.audience));
        validation.set_issuer(std::slice::from_ref(&self.issuer));

        match decode::<Claims>(token, &pair.decoding, &validation) {
            Ok(data) => {
                debug!(user_id = %data.claims.sub, "jwt verified");
                Ok(data.claims)
            }
            Err(e) => {
                warn!(error = %e, "token verification failed");
                Err(AuthError::InvalidToken.into())
            }
        }
    }
}

impl FromRef<AppState> for JwtKeys {
    fn from_ref(state: &AppState) -> Self {
        JwtKeys::from_config(&state.config.jwt)
    }
}

/// Claims of the caller, taken from `Authorization: Bearer <token>`.
pub struct AuthUser(pub Claims);

impl AuthUser {
    pub fn id(&self) -> Uuid {
        self.0.sub
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
    JwtKeys: FromRef<S>,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let keys = JwtKeys::from_ref(state);
        let header = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok());

        let token = match header {
            None => None,
            Some(value) => Some(
                value
                    .strip_prefix("Bearer ")
                    .or_else(|| value.strip_prefix("bearer "))
                    .ok_or_else(|| {
                        warn!("unsupported authorization scheme");
                        ApiError::Auth(AuthError::InvalidToken)
                    })?,
            ),
        };

        let claims = keys.verify(token)?;
        Ok(AuthUser(claims))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MAX_TTL_MINUTES;

    fn config(secret: Option<&str>) -> JwtConfig {
        JwtConfig {
            secret: secret.map(str::to_string),
            issuer: "test-issuer".into(),
            audience: "test-aud".into(),
            ttl_minutes: 5,
        }
    }

    fn keys(secret: &str) -> JwtKeys {
        JwtKeys::from_config(&config(Some(secret)))
    }

    fn claims_expiring_in(keys: &JwtKeys, seconds: i64) -> Claims {
        let now = OffsetDateTime::now_utc();
        Claims {
            sub: Uuid::new_v4(),
            email: "staff@brightsteps.test".into(),
            name: "Ms. Rivera".into(),
            iat: now.unix_timestamp() as usize,
            exp: (now + TimeDuration::seconds(seconds)).unix_timestamp() as usize,
            iss: keys.issuer.clone(),
            aud: keys.audience.clone(),
        }
    }

    #[test]
    fn verify_returns_signed_claims() {
        let keys = keys("dev-secret");
        let claims = claims_expiring_in(&keys, 600);
        let token = keys.encode(&claims).expect("sign");
        assert_eq!(keys.verify(Some(&token)).expect("verify"), claims);
    }

    #[test]
    fn sign_embeds_identity() {
        let keys = keys("dev-secret");
        let user_id = Uuid::new_v4();
        let token = keys.sign(user_id, "a@b.co", "A").expect("sign");
        let claims = keys.verify(Some(&token)).expect("verify");
        assert_eq!(claims.sub, user_id);
        assert_eq!(claims.email, "a@b.co");
        assert_eq!(claims.iss, "test-issuer");
        assert_eq!(claims.aud, "test-aud");
        assert!(claims.exp > claims.iat);
    }

    #[test]
    fn verify_rejects_other_secret() {
        let good = keys("secret-one");
        let other = keys("secret-two");
        let token = other.encode(&claims_expiring_in(&other, 600)).expect("sign");
        assert_eq!(
            good.verify(Some(&token)).unwrap_err(),
            VerifyError::Auth(AuthError::InvalidToken)
        );
    }

    #[test]
    fn verify_rejects_expired_token() {
        let keys = keys("dev-secret");
        // beyond the default 60s leeway
        let token = keys.encode(&claims_expiring_in(&keys, -600)).expect("sign");
        assert_eq!(
            keys.verify(Some(&token)).unwrap_err(),
            VerifyError::Auth(AuthError::InvalidToken)
        );
    }

    #[test]
    fn verify_rejects_malformed_token() {
        let keys = keys("dev-secret");
        for token in ["abc123", "not.a.jwt", "a.b"] {
            assert_eq!(
                keys.verify(Some(token)).unwrap_err(),
                VerifyError::Auth(AuthError::InvalidToken)
            );
        }
    }

    #[test]
    fn verify_rejects_wrong_audience() {
        let issuing = keys("same-secret");
        let mut checking = keys("same-secret");
        checking.audience = "other-aud".into();
        let token = issuing.encode(&claims_expiring_in(&issuing, 600)).expect("sign");
        assert!(checking.verify(Some(&token)).is_err());
    }

    #[test]
    fn missing_token_is_auth_error_even_without_secret() {
        let configured = keys("dev-secret");
        let unconfigured = JwtKeys::from_config(&config(None));
        for keys in [&configured, &unconfigured] {
            assert_eq!(
                keys.verify(None).unwrap_err(),
                VerifyError::Auth(AuthError::MissingToken)
            );
            assert_eq!(
                keys.verify(Some("")).unwrap_err(),
                VerifyError::Auth(AuthError::MissingToken)
            );
        }
    }

    #[test]
    fn unset_secret_is_config_error_for_any_token() {
        let signer = keys("dev-secret");
        let valid = signer.encode(&claims_expiring_in(&signer, 600)).expect("sign");
        let unconfigured = JwtKeys::from_config(&config(None));
        for token in [valid.as_str(), "garbage"] {
            assert_eq!(
                unconfigured.verify(Some(token)).unwrap_err(),
                VerifyError::Config(ConfigError::SecretMissing)
            );
        }
        let empty = JwtKeys::from_config(&config(Some("")));
        assert_eq!(
            empty.verify(Some("garbage")).unwrap_err(),
            VerifyError::Config(ConfigError::SecretMissing)
        );
    }

    #[test]
    fn oversized_ttl_is_clamped_instead_of_overflowing() {
        let mut cfg = config(Some("dev-secret"));
        cfg.ttl_minutes = i64::MAX;
        let keys = JwtKeys::from_config(&cfg);
        assert_eq!(keys.ttl, Duration::from_secs(MAX_TTL_MINUTES as u64 * 60));

        let token = keys.sign(Uuid::new_v4(), "a@b.co", "A").expect("sign");
        let claims = keys.verify(Some(&token)).expect("verify");
        assert_eq!((claims.exp - claims.iat) as i64, MAX_TTL_MINUTES * 60);
    }

    #[test]
    fn sign_rejects_lifetime_past_the_calendar() {
        let mut keys = keys("dev-secret");
        keys.ttl = Duration::from_secs(u64::MAX);
        let err = keys.sign(Uuid::new_v4(), "a@b.co", "A").unwrap_err();
        assert!(matches!(err, ApiError::Internal(_)));
    }

    #[test]
    fn sign_without_secret_is_config_error() {
        let unconfigured = JwtKeys::from_config(&config(None));
        let err = unconfigured.sign(Uuid::new_v4(), "a@b.co", "A").unwrap_err();
        assert!(matches!(err, ApiError::Config(ConfigError::SecretMissing)));
    }
}
