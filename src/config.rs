use anyhow::Context;
use jsonwebtoken::Algorithm;
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
    pub algorithm: Algorithm,
    pub issuer: String,
    pub audience: String,
    pub ttl_minutes: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SmtpConfig {
    pub server: String,
    pub port: u16,
    pub enable_tls: bool,
    pub from_address: String,
    pub password: String,
    pub subject: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub database_url: String,
    pub jwt: JwtConfig,
    pub smtp: SmtpConfig,
    pub mail_queue_capacity: usize,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = std::env::var("DATABASE_URL").context("DATABASE_URL")?;
        let jwt = JwtConfig {
            secret: std::env::var("JWT_SECRET").context("JWT_SECRET")?,
            algorithm: parse_algorithm(std::env::var("JWT_ALGORITHM").ok().as_deref())?,
            issuer: std::env::var("JWT_ISSUER").unwrap_or_else(|_| "core-user-service".into()),
            audience: std::env::var("JWT_AUDIENCE")
                .unwrap_or_else(|_| "core-user-service-clients".into()),
            ttl_minutes: env_parse("JWT_TTL_MINUTES").unwrap_or(60),
        };
        let smtp = SmtpConfig {
            server: std::env::var("SMTP_SERVER").context("SMTP_SERVER")?,
            port: env_parse("SMTP_PORT").unwrap_or(587),
            enable_tls: env_parse("SMTP_ENABLE_TLS").unwrap_or(true),
            from_address: std::env::var("SMTP_FROM_ADDRESS").context("SMTP_FROM_ADDRESS")?,
            password: std::env::var("SMTP_PASSWORD").context("SMTP_PASSWORD")?,
            subject: std::env::var("SMTP_SUBJECT")
                .unwrap_or_else(|_| "Your temporary passcode".into()),
        };
        Ok(Self {
            database_url,
            jwt,
            smtp,
            mail_queue_capacity: env_parse("MAIL_QUEUE_CAPACITY").unwrap_or(256),
        })
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|v| v.trim().parse::<T>().ok())
}

/// Tokens are signed with a shared secret, so only the HMAC family is usable.
pub fn parse_algorithm(raw: Option<&str>) -> anyhow::Result<Algorithm> {
    let algorithm = match raw.map(str::trim).filter(|v| !v.is_empty()) {
        Some(v) => v
            .to_ascii_uppercase()
            .parse::<Algorithm>()
            .with_context(|| format!("unknown JWT_ALGORITHM {v}"))?,
        None => Algorithm::HS256,
    };
    anyhow::ensure!(
        matches!(
            algorithm,
            Algorithm::HS256 | Algorithm::HS384 | Algorithm::HS512
        ),
        "JWT_ALGORITHM must be a symmetric HMAC algorithm, got {algorithm:?}"
    );
    Ok(algorithm)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn algorithm_defaults_to_hs256() {
        assert_eq!(parse_algorithm(None).unwrap(), Algorithm::HS256);
        assert_eq!(parse_algorithm(Some("  ")).unwrap(), Algorithm::HS256);
    }

    #[test]
    fn algorithm_accepts_hmac_family() {
        assert_eq!(parse_algorithm(Some("hs384")).unwrap(), Algorithm::HS384);
        assert_eq!(parse_algorithm(Some("HS512")).unwrap(), Algorithm::HS512);
    }

    #[test]
    fn algorithm_rejects_asymmetric_and_garbage() {
        assert!(parse_algorithm(Some("RS256")).is_err());
        assert!(parse_algorithm(Some("nope")).is_err());
    }
}
