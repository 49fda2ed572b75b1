//! API configuration module.
//!
//! Configuration is layered with the `config` crate:
//!
//! ```text
//! built-in defaults  ──►  moinho.toml (optional)  ──►  MOINHO_* environment
//!                                                       MOINHO_SERVER__PORT=9000
//!                                                       MOINHO_AUTH__JWT_SECRET=...
//! ```

use config::{Config, Environment, File};
use rust_decimal::Decimal;
use serde::Deserialize;
use tracing::warn;

use moinho_core::CurrencyFormat;

/// Secrets shorter than this are accepted with a warning.
const MIN_SECRET_LEN: usize = 32;

/// API configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub auth: AuthConfig,
    pub checkout: CheckoutConfig,
    pub postal: PostalConfig,
    pub display: DisplayConfig,
    pub log: LogConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// SQLite file path
    pub path: String,
    pub max_connections: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    /// HS256 signing secret
    pub jwt_secret: String,

    /// Access token lifetime in seconds
    pub token_lifetime_secs: i64,
}

/// Mercado Pago pre-approval (monthly subscription) settings.
#[derive(Debug, Clone, Deserialize)]
pub struct CheckoutConfig {
    pub base_url: String,

    /// Without a token, subscription requests fail with an upstream error.
    pub access_token: Option<String>,

    /// Plan name shown on the checkout page
    pub reason: String,

    /// Monthly amount
    pub amount: Decimal,

    pub currency: String,

    /// Where the checkout sends the payer afterwards
    pub back_url: String,

    pub timeout_secs: u64,
}

/// Postal-code lookup (ViaCEP-compatible) settings.
#[derive(Debug, Clone, Deserialize)]
pub struct PostalConfig {
    pub base_url: String,
    pub timeout_secs: u64,
}

/// How money totals are rendered in list footers.
#[derive(Debug, Clone, Deserialize)]
pub struct DisplayConfig {
    pub currency_symbol: String,
    pub thousands_separator: String,
    pub decimal_separator: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LogConfig {
    /// Default `EnvFilter` directive when `RUST_LOG` is unset
    pub filter: String,

    /// JSON lines instead of human-readable output
    pub json: bool,
}

impl AppConfig {
    /// Loads configuration from defaults, `moinho.toml`, and `MOINHO_*`
    /// environment variables, in that order.
    pub fn load() -> Result<Self, ConfigError> {
        let config = Self::builder()?
            .add_source(File::with_name("moinho").required(false))
            .add_source(
                Environment::with_prefix("MOINHO")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let app_config: AppConfig = config.try_deserialize()?;
        app_config.validate()?;
        Ok(app_config)
    }

    fn builder() -> Result<config::ConfigBuilder<config::builder::DefaultState>, ConfigError> {
        Ok(Config::builder()
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.port", 8080)?
            .set_default("database.path", "moinho.db")?
            .set_default("database.max_connections", 5)?
            .set_default("auth.jwt_secret", "moinho-dev-secret-change-in-production")?
            .set_default("auth.token_lifetime_secs", 86_400)?
            .set_default("checkout.base_url", "https://api.mercadopago.com")?
            .set_default("checkout.reason", "Assinatura Plano PRO")?
            .set_default("checkout.amount", "30")?
            .set_default("checkout.currency", "BRL")?
            .set_default("checkout.back_url", "http://localhost:3000/")?
            .set_default("checkout.timeout_secs", 15)?
            .set_default("postal.base_url", "https://viacep.com.br")?
            .set_default("postal.timeout_secs", 10)?
            .set_default("display.currency_symbol", "R$")?
            .set_default("display.thousands_separator", ".")?
            .set_default("display.decimal_separator", ",")?
            .set_default("log.filter", "info,moinho=debug,sqlx=warn")?
            .set_default("log.json", false)?)
    }

    /// Rejects unusable values and warns about risky ones.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server.port == 0 {
            return Err(ConfigError::InvalidValue("server.port".to_string()));
        }
        if self.database.path.trim().is_empty() {
            return Err(ConfigError::MissingRequired("database.path".to_string()));
        }
        if self.auth.jwt_secret.is_empty() {
            return Err(ConfigError::MissingRequired("auth.jwt_secret".to_string()));
        }
        if self.auth.token_lifetime_secs <= 0 {
            return Err(ConfigError::InvalidValue("auth.token_lifetime_secs".to_string()));
        }
        if self.display.thousands_separator.chars().count() != 1
            || self.display.decimal_separator.chars().count() != 1
        {
            return Err(ConfigError::InvalidValue("display separators".to_string()));
        }

        if self.auth.jwt_secret.len() < MIN_SECRET_LEN {
            warn!(
                min = MIN_SECRET_LEN,
                "auth.jwt_secret is short; set MOINHO_AUTH__JWT_SECRET in production"
            );
        }
        if self.checkout.access_token.as_deref().map_or(true, str::is_empty) {
            warn!("checkout.access_token is not set; subscriptions will fail");
        }
        Ok(())
    }

    /// The currency format for rendered totals.
    pub fn currency_format(&self) -> CurrencyFormat {
        let first = |s: &str, fallback: char| s.chars().next().unwrap_or(fallback);
        CurrencyFormat {
            symbol: self.display.currency_symbol.clone(),
            thousands_separator: first(&self.display.thousands_separator, '.'),
            decimal_separator: first(&self.display.decimal_separator, ','),
            space_after_symbol: true,
        }
    }

    /// Built-in defaults, ignoring files and environment.
    pub fn defaults() -> Result<Self, ConfigError> {
        Ok(Self::builder()?.build()?.try_deserialize()?)
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

/// Configuration error types.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for {0}")]
    InvalidValue(String),

    #[error("Missing required configuration: {0}")]
    MissingRequired(String),

    #[error("Failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = AppConfig::defaults().unwrap();
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.checkout.amount, Decimal::from(30));
        assert_eq!(config.checkout.currency, "BRL");
        assert!(config.checkout.access_token.is_none());
        assert!(config.validate().is_ok());
        assert_eq!(config.bind_addr(), "0.0.0.0:8080");
    }

    #[test]
    fn test_currency_format_from_display() {
        let config = AppConfig::defaults().unwrap();
        assert_eq!(config.currency_format(), CurrencyFormat::brl());
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = AppConfig::defaults().unwrap();
        config.auth.jwt_secret.clear();
        assert!(matches!(config.validate(), Err(ConfigError::MissingRequired(_))));

        let mut config = AppConfig::defaults().unwrap();
        config.display.decimal_separator = ",,".to_string();
        assert!(matches!(config.validate(), Err(ConfigError::InvalidValue(_))));
    }
}
