use std::time::Duration;

use crate::bookings::catalog::ServiceCatalog;

/// Reset links must not outlive an hour.
const MAX_RESET_TTL_MINUTES: i64 = 60;

#[derive(Debug, Clone)]
pub struct JwtConfig {
    pub secret: String,
    pub issuer: String,
    pub audience: String,
    pub ttl_minutes: i64,
    pub reset_ttl_minutes: i64,
}

#[derive(Debug, Clone)]
pub struct MailConfig {
    pub api_url: Option<String>,
    pub api_key: Option<String>,
    pub from: String,
    pub base_url: String,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: Option<String>,
    pub jwt: JwtConfig,
    pub mail: MailConfig,
    pub verify_ttl_hours: i64,
    pub upstream_timeout: Duration,
    pub cookie_secure: bool,
    pub catalog: ServiceCatalog,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = std::env::var("DATABASE_URL").ok().filter(|v| !v.is_empty());
        let jwt = JwtConfig {
            secret: std::env::var("JWT_SECRET")?,
            issuer: std::env::var("JWT_ISSUER").unwrap_or_else(|_| "pawstay".into()),
            audience: std::env::var("JWT_AUDIENCE").unwrap_or_else(|_| "pawstay-users".into()),
            ttl_minutes: env_parse("JWT_TTL_MINUTES").unwrap_or(60 * 24 * 7),
            reset_ttl_minutes: env_parse::<i64>("RESET_TTL_MINUTES")
                .unwrap_or(MAX_RESET_TTL_MINUTES)
                .clamp(1, MAX_RESET_TTL_MINUTES),
        };
        let mail = MailConfig {
            api_url: std::env::var("MAIL_API_URL").ok().filter(|v| !v.is_empty()),
            api_key: std::env::var("MAIL_API_KEY").ok().filter(|v| !v.is_empty()),
            from: std::env::var("MAIL_FROM").unwrap_or_else(|_| "no-reply@pawstay.local".into()),
            base_url: std::env::var("APP_BASE_URL")
                .unwrap_or_else(|_| "http://localhost:3000".into()),
        };
        let catalog = match std::env::var("SERVICE_CATALOG") {
            Ok(raw) if !raw.trim().is_empty() => ServiceCatalog::parse(&raw)?,
            _ => ServiceCatalog::default(),
        };

        Ok(Self {
            database_url,
            jwt,
            mail,
            verify_ttl_hours: env_parse("EMAIL_VERIFY_TTL_HOURS").unwrap_or(24),
            upstream_timeout: Duration::from_secs(env_parse("UPSTREAM_TIMEOUT_SECS").unwrap_or(5)),
            cookie_secure: env_parse("COOKIE_SECURE").unwrap_or(false),
            catalog,
        })
    }

    /// Settings used by unit and handler tests.
    #[cfg(test)]
    pub fn for_tests() -> Self {
        Self {
            database_url: None,
            jwt: JwtConfig {
                secret: "test".into(),
                issuer: "test-issuer".into(),
                audience: "test-aud".into(),
                ttl_minutes: 5,
                reset_ttl_minutes: 60,
            },
            mail: MailConfig {
                api_url: None,
                api_key: None,
                from: "no-reply@test.local".into(),
                base_url: "http://app.test".into(),
            },
            verify_ttl_hours: 24,
            upstream_timeout: Duration::from_secs(2),
            cookie_secure: false,
            catalog: ServiceCatalog::default(),
        }
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|v| v.parse::<T>().ok())
}
