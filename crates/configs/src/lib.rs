use anyhow::anyhow;
use anyhow::Result;
use serde::Deserialize;
use std::net::IpAddr;

#[derive(Debug, Clone, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub auth: AuthConfig,
    #[serde(default)]
    pub payment: PaymentConfig,
    #[serde(default)]
    pub rate_limit: RateLimitConfig,
    #[serde(default)]
    pub mail: MailConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    #[serde(default)]
    pub worker_threads: Option<usize>,
    /// Base URL used when building links sent to users (confirmation mails).
    #[serde(default = "default_public_url")]
    pub public_url: String,
    #[serde(default = "default_images_dir")]
    pub images_dir: String,
    /// Peers whose `X-Forwarded-For` header is believed; empty means the
    /// socket address is always the client address.
    #[serde(default)]
    pub trusted_proxies: Vec<IpAddr>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".into(),
            port: 8080,
            worker_threads: Some(4),
            public_url: default_public_url(),
            images_dir: default_images_dir(),
            trusted_proxies: Vec::new(),
        }
    }
}

fn default_public_url() -> String { "http://127.0.0.1:8080".into() }
fn default_images_dir() -> String { "static/images".into() }

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default)]
    pub url: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    #[serde(default = "default_min_connections")]
    pub min_connections: u32,
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,
    #[serde(default = "default_idle_timeout")]
    pub idle_timeout_secs: u64,
    #[serde(default = "default_max_lifetime")]
    pub max_lifetime_secs: u64,
    #[serde(default = "default_acquire_timeout")]
    pub acquire_timeout_secs: u64,
    #[serde(default)]
    pub sqlx_logging: bool,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            max_connections: default_max_connections(),
            min_connections: default_min_connections(),
            connect_timeout_secs: default_connect_timeout(),
            idle_timeout_secs: default_idle_timeout(),
            max_lifetime_secs: default_max_lifetime(),
            acquire_timeout_secs: default_acquire_timeout(),
            sqlx_logging: false,
        }
    }
}

fn default_max_connections() -> u32 { 10 }
fn default_min_connections() -> u32 { 2 }
fn default_connect_timeout() -> u64 { 30 }
fn default_idle_timeout() -> u64 { 600 }
fn default_max_lifetime() -> u64 { 3600 }
fn default_acquire_timeout() -> u64 { 30 }

#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    #[serde(default)]
    pub jwt_secret: String,
    #[serde(default = "default_access_minutes")]
    pub access_token_minutes: i64,
    #[serde(default = "default_refresh_days")]
    pub refresh_token_days: i64,
    #[serde(default = "default_confirmation_ttl")]
    pub confirmation_ttl_secs: i64,
    /// A session holding this many active refresh tokens is rotated at the next login.
    #[serde(default = "default_max_active_tokens")]
    pub max_active_tokens: u64,
    /// Registering with this email grants the `admin` role.
    #[serde(default)]
    pub bootstrap_admin_email: Option<String>,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwt_secret: String::new(),
            access_token_minutes: default_access_minutes(),
            refresh_token_days: default_refresh_days(),
            confirmation_ttl_secs: default_confirmation_ttl(),
            max_active_tokens: default_max_active_tokens(),
            bootstrap_admin_email: None,
        }
    }
}

fn default_access_minutes() -> i64 { 15 }
fn default_refresh_days() -> i64 { 30 }
fn default_confirmation_ttl() -> i64 { 1800 }
fn default_max_active_tokens() -> u64 { 5 }

#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum PaymentProvider {
    #[default]
    Test,
    Http,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PaymentConfig {
    #[serde(default)]
    pub provider: PaymentProvider,
    #[serde(default)]
    pub api_base: String,
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_currency")]
    pub currency: String,
    /// Allow clients to request the in-process test gateway per order.
    #[serde(default)]
    pub allow_test_mode: bool,
    #[serde(default = "default_payment_timeout")]
    pub timeout_secs: u64,
}

impl Default for PaymentConfig {
    fn default() -> Self {
        Self {
            provider: PaymentProvider::Test,
            api_base: String::new(),
            api_key: String::new(),
            currency: default_currency(),
            allow_test_mode: false,
            timeout_secs: default_payment_timeout(),
        }
    }
}

fn default_currency() -> String { "inr".into() }
fn default_payment_timeout() -> u64 { 15 }

#[derive(Debug, Clone, Deserialize)]
pub struct RateLimitConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_per_hour")]
    pub requests_per_hour: u32,
    #[serde(default = "default_per_day")]
    pub requests_per_day: u32,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self { enabled: true, requests_per_hour: default_per_hour(), requests_per_day: default_per_day() }
    }
}

fn default_true() -> bool { true }
fn default_per_hour() -> u32 { 750 }
fn default_per_day() -> u32 { 5000 }

#[derive(Debug, Clone, Deserialize)]
pub struct MailConfig {
    #[serde(default = "default_sender")]
    pub sender: String,
    #[serde(default = "default_true")]
    pub enabled: bool,
}

impl Default for MailConfig {
    fn default() -> Self {
        Self { sender: default_sender(), enabled: true }
    }
}

fn default_sender() -> String { "no-reply@storefront.local".into() }

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_format")]
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { format: default_log_format() }
    }
}

fn default_log_format() -> String { "compact".into() }

pub fn load_default() -> Result<AppConfig> {
    let path = std::env::var("CONFIG_PATH").unwrap_or_else(|_| "config.toml".to_string());
    if std::path::Path::new(&path).exists() {
        load_from_file(&path)
    } else {
        Ok(AppConfig::from_env())
    }
}

pub fn load_from_file(path: &str) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path)?;
    let cfg: AppConfig = toml::from_str(&content)?;
    Ok(cfg)
}

impl AppConfig {
    /// Defaults for every section, with env overrides applied.
    pub fn from_env() -> Self {
        let mut cfg = Self::default();
        cfg.apply_env();
        cfg
    }

    pub fn load_and_validate() -> Result<Self> {
        let _ = dotenvy::dotenv();
        let mut cfg = load_default()?;
        cfg.normalize_and_validate()?;
        Ok(cfg)
    }

    pub fn normalize_and_validate(&mut self) -> Result<()> {
        self.apply_env();
        self.server.normalize()?;
        self.database.validate()?;
        self.auth.validate()?;
        self.payment.validate()?;
        self.rate_limit.validate()?;
        Ok(())
    }

    fn apply_env(&mut self) {
        // 环境变量仅在配置文件未提供对应值时生效
        fill_from_env(&mut self.database.url, "DATABASE_URL");
        fill_from_env(&mut self.auth.jwt_secret, "JWT_SECRET_KEY");
        fill_from_env(&mut self.payment.api_key, "PAYMENT_API_KEY");
        if let Ok(host) = std::env::var("SERVER_HOST") {
            if !host.trim().is_empty() {
                self.server.host = host;
            }
        }
        if let Some(port) = std::env::var("SERVER_PORT").ok().and_then(|p| p.parse().ok()) {
            self.server.port = port;
        }
    }
}

fn fill_from_env(slot: &mut String, key: &str) {
    if slot.trim().is_empty() {
        if let Ok(v) = std::env::var(key) {
            *slot = v;
        }
    }
}

impl ServerConfig {
    fn normalize(&mut self) -> Result<()> {
        if self.host.trim().is_empty() {
            self.host = "127.0.0.1".to_string();
        }
        if self.port == 0 {
            return Err(anyhow!("server.port must be in 1..=65535"));
        }
        match self.worker_threads {
            Some(w) if w > 0 => {}
            _ => self.worker_threads = Some(4),
        }
        self.public_url = self.public_url.trim_end_matches('/').to_string();
        Ok(())
    }
}

impl DatabaseConfig {
    pub fn validate(&self) -> Result<()> {
        if self.url.trim().is_empty() {
            return Err(anyhow!("database.url is empty; set it in config.toml or DATABASE_URL"));
        }
        let lower = self.url.to_lowercase();
        if !(lower.starts_with("postgresql://") || lower.starts_with("postgres://") || lower.starts_with("sqlite:")) {
            return Err(anyhow!("database.url must start with postgres://, postgresql:// or sqlite:"));
        }
        if self.min_connections == 0 {
            return Err(anyhow!("database.min_connections must be >= 1"));
        }
        if self.max_connections < self.min_connections {
            return Err(anyhow!("database.max_connections must be >= min_connections"));
        }
        if self.connect_timeout_secs == 0 || self.acquire_timeout_secs == 0 {
            return Err(anyhow!("database timeouts must be positive seconds"));
        }
        Ok(())
    }
}

impl AuthConfig {
    pub fn validate(&self) -> Result<()> {
        if self.jwt_secret.trim().is_empty() {
            return Err(anyhow!("auth.jwt_secret is empty; set it in config.toml or JWT_SECRET_KEY"));
        }
        if self.access_token_minutes <= 0 || self.refresh_token_days <= 0 || self.confirmation_ttl_secs <= 0 {
            return Err(anyhow!("auth token lifetimes must be positive"));
        }
        if self.max_active_tokens == 0 {
            return Err(anyhow!("auth.max_active_tokens must be >= 1"));
        }
        Ok(())
    }
}

impl PaymentConfig {
    pub fn validate(&self) -> Result<()> {
        if self.provider == PaymentProvider::Http && self.api_base.trim().is_empty() {
            return Err(anyhow!("payment.api_base is required for the http provider"));
        }
        if self.currency.trim().is_empty() {
            return Err(anyhow!("payment.currency is empty"));
        }
        Ok(())
    }
}

impl RateLimitConfig {
    pub fn validate(&self) -> Result<()> {
        if self.enabled && (self.requests_per_hour == 0 || self.requests_per_day == 0) {
            return Err(anyhow!("rate_limit windows must allow at least one request"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid() -> AppConfig {
        let mut cfg = AppConfig::default();
        cfg.database.url = "sqlite::memory:".into();
        cfg.auth.jwt_secret = "secret".into();
        cfg
    }

    #[test]
    fn parses_partial_toml_with_defaults() {
        let cfg: AppConfig = toml::from_str(
            r#"
            [server]
            host = "0.0.0.0"
            port = 9000
            trusted_proxies = ["10.0.0.2"]

            [database]
            url = "postgres://localhost/shop"

            [payment]
            provider = "http"
            api_base = "https://pay.example.com/v1"
            "#,
        )
        .unwrap();
        assert_eq!(cfg.server.port, 9000);
        assert_eq!(cfg.server.trusted_proxies, vec!["10.0.0.2".parse::<IpAddr>().unwrap()]);
        assert_eq!(cfg.database.max_connections, 10);
        assert_eq!(cfg.auth.confirmation_ttl_secs, 1800);
        assert_eq!(cfg.auth.max_active_tokens, 5);
        assert_eq!(cfg.payment.provider, PaymentProvider::Http);
        assert_eq!(cfg.rate_limit.requests_per_hour, 750);
        assert_eq!(cfg.rate_limit.requests_per_day, 5000);
    }

    #[test]
    fn accepts_sqlite_and_postgres_urls() {
        let mut cfg = valid();
        assert!(cfg.normalize_and_validate().is_ok());
        cfg.database.url = "postgres://u:p@localhost/db".into();
        assert!(cfg.normalize_and_validate().is_ok());
    }

    #[test]
    fn rejects_unknown_scheme() {
        let mut cfg = valid();
        cfg.database.url = "mysql://localhost/db".into();
        assert!(cfg.normalize_and_validate().is_err());
    }

    #[test]
    fn rejects_inverted_pool_bounds() {
        let mut cfg = valid();
        cfg.database.min_connections = 5;
        cfg.database.max_connections = 2;
        assert!(cfg.normalize_and_validate().is_err());
    }

    #[test]
    fn http_provider_needs_api_base() {
        let mut cfg = valid();
        cfg.payment.provider = PaymentProvider::Http;
        assert!(cfg.normalize_and_validate().is_err());
        cfg.payment.api_base = "https://pay.example.com".into();
        assert!(cfg.normalize_and_validate().is_ok());
    }

    #[test]
    fn zero_workers_fall_back_to_four() {
        let mut cfg = valid();
        cfg.server.worker_threads = Some(0);
        cfg.server.public_url = "http://shop.example.com/".into();
        cfg.normalize_and_validate().unwrap();
        assert_eq!(cfg.server.worker_threads, Some(4));
        assert_eq!(cfg.server.public_url, "http://shop.example.com");
    }
}
