use crate::error::{AppError, Result};
use rust_decimal::Decimal;
use std::env;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub cors: CorsConfig,
    pub auth: AuthConfig,
    pub checkout: CheckoutConfig,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub max_body_size: usize,
}

#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub acquire_timeout_secs: u64,
}

#[derive(Debug, Clone)]
pub struct CorsConfig {
    pub allowed_origins: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct AuthConfig {
    pub jwt_secret: String,
    pub token_expiry_days: i64,
}

#[derive(Debug, Clone)]
pub struct CheckoutConfig {
    /// Charged once per invoice, i.e. once per shop in a checkout.
    pub shipping_fee: Decimal,
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            server: ServerConfig {
                host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
                port: parse_var("PORT", "3000")?,
                max_body_size: parse_var("MAX_BODY_SIZE", "10485760")?,
            },
            database: DatabaseConfig {
                url: env::var("DB_URL")?,
                max_connections: parse_var("DB_MAX_CONNECTIONS", "20")?,
                acquire_timeout_secs: parse_var("DB_ACQUIRE_TIMEOUT_SECS", "5")?,
            },
            cors: CorsConfig {
                allowed_origins: split_origins(&env::var("FRONTEND_URL")?),
            },
            auth: AuthConfig {
                jwt_secret: env::var("JWT_SECRET")
                    .map_err(|_| AppError::ConfigError("JWT_SECRET not set".to_string()))?,
                token_expiry_days: parse_var("JWT_EXPIRY_DAYS", "30")?,
            },
            checkout: CheckoutConfig {
                shipping_fee: parse_var("SHIPPING_FEE", "0")?,
            },
        })
    }

    pub fn server_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

fn parse_var<T: std::str::FromStr>(name: &str, default: &str) -> Result<T> {
    env::var(name)
        .unwrap_or_else(|_| default.to_string())
        .parse()
        .map_err(|_| AppError::ConfigError(format!("Invalid {} value", name)))
}

fn split_origins(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn origins_are_trimmed_and_empty_entries_dropped() {
        let origins = split_origins("http://a.test, http://b.test ,,");
        assert_eq!(origins, vec!["http://a.test", "http://b.test"]);
    }
}
