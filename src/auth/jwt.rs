use std::time::Duration;

use axum::extract::FromRef;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use time::{Duration as TimeDuration, OffsetDateTime};
use tracing::{debug, error, warn};

use super::{claims::Claims, extractors::Principal};
use crate::{config::JwtConfig, state::AppState};

/// Mints bearer tokens and answers ownership questions about verified ones.
#[derive(Clone)]
pub struct TokenIssuer {
    encoding: EncodingKey,
    decoding: DecodingKey,
    algorithm: Algorithm,
    issuer: String,
    audience: String,
    ttl: Duration,
}

impl FromRef<AppState> for TokenIssuer {
    fn from_ref(state: &AppState) -> Self {
        state.tokens.clone()
    }
}

impl TokenIssuer {
    pub fn new(cfg: &JwtConfig) -> Self {
        Self {
            encoding: EncodingKey::from_secret(cfg.secret.as_bytes()),
            decoding: DecodingKey::from_secret(cfg.secret.as_bytes()),
            algorithm: cfg.algorithm,
            issuer: cfg.issuer.clone(),
            audience: cfg.audience.clone(),
            ttl: Duration::from_secs((cfg.ttl_minutes.max(0) as u64) * 60),
        }
    }

    /// Returns `None` instead of failing when the identity is unusable.
    pub fn generate_token(&self, user_id: i64, username: &str) -> Option<String> {
        if user_id <= 0 || username.trim().is_empty() {
            error!(user_id, "jwt generation refused, invalid user id or username");
            return None;
        }
        let now = OffsetDateTime::now_utc();
        let exp = now + TimeDuration::seconds(self.ttl.as_secs() as i64);
        let claims = Claims {
            sub: username.to_owned(),
            jti: Some(user_id.to_string()),
            iat: now.unix_timestamp() as usize,
            exp: exp.unix_timestamp() as usize,
            iss: self.issuer.clone(),
            aud: self.audience.clone(),
        };
        match encode(&Header::new(self.algorithm), &claims, &self.encoding) {
            Ok(token) => {
                debug!(user_id, "jwt signed");
                Some(token)
            }
            Err(e) => {
                error!(error = %e, user_id, "jwt signing failed");
                None
            }
        }
    }

    /// Ownership check: does the caller's token name `target_user_id`?
    pub fn validate_token(&self, principal: Option<&Principal>, target_user_id: i64) -> bool {
        let Some(principal) = principal else {
            warn!(target_user_id, "ownership check without an authenticated caller");
            return false;
        };
        match principal.claims.jti.as_deref() {
            Some(jti) if jti == target_user_id.to_string() => true,
            Some(jti) => {
                warn!(
                    caller = %jti,
                    target_user_id,
                    "caller attempted to access another user's resource"
                );
                false
            }
            None => {
                warn!(target_user_id, "token carries no user id claim");
                false
            }
        }
    }

    /// Re-issues a token for an identity the caller has already proven.
    pub fn renew_token(&self, principal: &Principal) -> Option<String> {
        let user_id = principal
            .claims
            .jti
            .as_deref()
            .and_then(|v| v.parse::<i64>().ok())
            .unwrap_or(0);
        self.generate_token(user_id, &principal.claims.sub)
    }

    pub fn verify(&self, token: &str) -> anyhow::Result<Claims> {
        let mut validation = Validation::new(self.algorithm);
        validation.set_audience(std::slice::from_ref(&self.audience));
        validation.set_issuer(std::slice::from_ref(&self.issuer));
        let data = decode::<Claims>(token, &self.decoding, &validation)?;
        debug!(sub = %data.claims.sub, "jwt verified");
        Ok(data.claims)
    }
}
