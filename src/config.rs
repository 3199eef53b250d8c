//! Typed configuration read from the environment (after `.env` is loaded).

use std::env;
use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;

use crate::db::PoolOptions;
use crate::infrastructure::cloudinary::CloudinaryCredentials;
use crate::infrastructure::mailer::MailgunCredentials;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),
    #[error("{name} has invalid value '{value}'")]
    Invalid { name: &'static str, value: String },
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    pub pool: PoolOptions,
}

#[derive(Debug, Clone)]
pub struct AuthConfig {
    pub token_ttl: chrono::Duration,
    pub reset_token_ttl: chrono::Duration,
    pub frontend_url: String,
    pub mail_from: String,
}

#[derive(Debug, Clone)]
pub struct RateLimitConfig {
    pub per_second: f64,
    pub burst: u32,
    pub max_clients: usize,
    pub idle: Duration,
}

#[derive(Debug, Clone)]
pub struct PaymentConfig {
    pub secret_key: Option<String>,
    pub publishable_key: String,
    pub currency: String,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub auth: AuthConfig,
    pub rate_limit: RateLimitConfig,
    pub payment: PaymentConfig,
    pub cloudinary: Option<CloudinaryCredentials>,
    pub mailgun: Option<MailgunCredentials>,
}

fn optional(name: &'static str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.trim().is_empty())
}

fn or_default(name: &'static str, default: &str) -> String {
    optional(name).unwrap_or_else(|| default.to_string())
}

fn parsed<T: FromStr>(name: &'static str, default: T) -> Result<T, ConfigError> {
    match optional(name) {
        None => Ok(default),
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { name, value }),
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        let url = optional("DATABASE_URL").ok_or(ConfigError::Missing("DATABASE_URL"))?;

        let cloudinary = match (
            optional("CLOUDINARY_NAME"),
            optional("CLOUDINARY_KEY"),
            optional("CLOUDINARY_SECRET"),
        ) {
            (Some(cloud_name), Some(api_key), Some(api_secret)) => Some(CloudinaryCredentials {
                cloud_name,
                api_key,
                api_secret,
            }),
            _ => None,
        };

        let mailgun = match (optional("MAILGUN_DOMAIN"), optional("MAILGUN_API_KEY")) {
            (Some(domain), Some(api_key)) => Some(MailgunCredentials { domain, api_key }),
            _ => None,
        };

        let per_second: f64 = parsed("RATE_LIMIT_PER_SECOND", 10.0)?;
        if per_second.is_nan() || per_second <= 0.0 {
            return Err(ConfigError::Invalid {
                name: "RATE_LIMIT_PER_SECOND",
                value: per_second.to_string(),
            });
        }

        Ok(Config {
            server: ServerConfig {
                host: or_default("HOST", "0.0.0.0"),
                port: parsed("PORT", 8080)?,
            },
            database: DatabaseConfig {
                url,
                pool: PoolOptions {
                    max_size: parsed("DB_POOL_SIZE", 10)?,
                    connect_timeout: Duration::from_secs(parsed("DB_CONNECT_TIMEOUT_SECS", 3)?),
                    statement_timeout: Duration::from_millis(parsed(
                        "DB_STATEMENT_TIMEOUT_MS",
                        3000,
                    )?),
                },
            },
            auth: AuthConfig {
                token_ttl: chrono::Duration::hours(parsed("TOKEN_TTL_HOURS", 24)?),
                reset_token_ttl: chrono::Duration::minutes(parsed("RESET_TOKEN_TTL_MINUTES", 60)?),
                frontend_url: or_default("FRONTEND_URL", "http://localhost:3000"),
                mail_from: or_default("MAIL_FROM", "no-reply@shopit.local"),
            },
            rate_limit: RateLimitConfig {
                per_second,
                burst: parsed("RATE_LIMIT_BURST", 20)?,
                max_clients: parsed("RATE_LIMIT_MAX_CLIENTS", 10_000)?,
                idle: Duration::from_secs(parsed("RATE_LIMIT_IDLE_SECS", 300)?),
            },
            payment: PaymentConfig {
                secret_key: optional("STRIPE_SECRET"),
                publishable_key: or_default("STRIPE_KEY", ""),
                currency: or_default("PAYMENT_CURRENCY", "usd"),
            },
            cloudinary,
            mailgun,
        })
    }
}
