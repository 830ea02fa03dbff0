use std::env;

#[derive(Clone, Debug)]
pub struct Config {
    pub port: u16,
    pub database_url: String,
    pub jwt_secret: String,
    pub admin_user: String,
    pub admin_password: Option<String>,
    pub admin_pass_hash: Option<String>,
    pub brand: String,
    pub smtp: SmtpConfig,
}

#[derive(Clone, Debug, Default)]
pub struct SmtpConfig {
    /// Mail dispatch is disabled entirely when no host is configured.
    pub host: Option<String>,
    pub port: u16,
    pub username: String,
    pub password: String,
    pub from: String,
    pub admin_to: String,
    pub reply_to: String,
}

impl Config {
    pub fn from_env() -> Self {
        Self {
            port: env::var("PORT")
                .ok()
                .and_then(|value| value.parse().ok())
                .unwrap_or(8080),
            database_url: env::var("DATABASE_URL")
                .unwrap_or_else(|_| "sqlite://./data/slotbook.db".to_string()),
            jwt_secret: env::var("JWT_SECRET").unwrap_or_else(|_| "change-me".to_string()),
            admin_user: env::var("ADMIN_USER").unwrap_or_else(|_| "admin".to_string()),
            admin_password: env::var("ADMIN_PASSWORD").ok(),
            admin_pass_hash: env::var("ADMIN_PASS_HASH").ok(),
            brand: env::var("BRAND_NAME").unwrap_or_else(|_| "Slotbook".to_string()),
            smtp: SmtpConfig::from_env(),
        }
    }
}

impl SmtpConfig {
    pub fn from_env() -> Self {
        let from = env::var("SMTP_FROM")
            .or_else(|_| env::var("SMTP_USER"))
            .unwrap_or_default();
        Self {
            host: env::var("SMTP_HOST").ok().filter(|host| !host.trim().is_empty()),
            port: env::var("SMTP_PORT")
                .ok()
                .and_then(|value| value.parse().ok())
                .unwrap_or(587),
            username: env::var("SMTP_USER").unwrap_or_default(),
            password: env::var("SMTP_PASS").unwrap_or_default(),
            admin_to: env::var("ADMIN_EMAIL").unwrap_or_default(),
            reply_to: env::var("REPLY_TO_EMAIL").unwrap_or_else(|_| from.clone()),
            from,
        }
    }
}
