//! CLI argument parsing, validation, and startup helpers.

use std::num::NonZeroU32;
use std::time::Duration;

use crate::ServerConfig;
use crate::db::Database;
use crate::token_service::StaticCredentials;
use clap::Parser;
use tracing::{error, info};

const MIN_JWT_SECRET_LENGTH: usize = 32;
const MAX_ACCESS_TOKEN_HOURS: i64 = 24 * 365;

/// Subject the configured admin account logs in as, unless overridden.
pub const DEFAULT_ADMIN_SUBJECT: &str = "7ea078fa-aac0-4364-8f5f-ba69b136b8f7";

#[derive(clap::ValueEnum, Clone, Debug, Default)]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
    Compact,
}

#[derive(Parser, Debug, Clone)]
#[command(name = "folio", about = "Bearer token authentication service")]
pub struct Args {
    /// Port to listen on
    #[arg(short, long, env = "APP_PORT", default_value = "8080")]
    pub port: u16,

    /// Path to SQLite database file (":memory:" for a throwaway database)
    #[arg(short, long, env = "DATABASE_PATH", default_value = "folio.db")]
    pub database: String,

    /// Path to file containing JWT secret. Prefer using JWT_SECRET env var instead
    #[arg(long)]
    pub jwt_secret_file: Option<String>,

    /// Access token lifetime in hours (at most one year)
    #[arg(long, env = "JWT_EXPIRY_HOURS", default_value = "1",
        value_parser = clap::value_parser!(u64).range(1..=MAX_ACCESS_TOKEN_HOURS as u64))]
    pub access_token_hours: u64,

    /// Issue a new refresh token on every refresh and revoke the presented one
    #[arg(long)]
    pub rotate_refresh_tokens: bool,

    /// Per-IP request limit for /auth endpoints. 0 disables rate limiting
    #[arg(long, env = "MAX_REQUEST_PER_SECOND", default_value = "20")]
    pub max_requests_per_second: u32,

    /// Seconds between sweeps of expired refresh tokens
    #[arg(long, default_value = "3600",
        value_parser = clap::value_parser!(u64).range(1..))]
    pub cleanup_interval_secs: u64,

    /// Username of the admin account. The password is read from ADMIN_PASSWORD
    #[arg(long, env = "ADMIN_USERNAME", default_value = "admin")]
    pub admin_username: String,

    /// Subject embedded in tokens issued to the admin account
    #[arg(long, env = "ADMIN_SUBJECT", default_value = DEFAULT_ADMIN_SUBJECT)]
    pub admin_subject: String,

    /// Log output format
    #[arg(short, long, default_value = "pretty")]
    pub log_format: LogFormat,
}

/// Initialize logging based on the specified format.
pub fn init_logging(format: &LogFormat) {
    match format {
        LogFormat::Pretty => tracing_subscriber::fmt::init(),
        LogFormat::Json => tracing_subscriber::fmt().json().init(),
        LogFormat::Compact => tracing_subscriber::fmt().compact().init(),
    }
}

/// Read and clear a secret environment variable.
fn take_env_secret(name: &str) -> Option<String> {
    let value = std::env::var(name).ok()?;
    // SAFETY: We're single-threaded at this point during startup,
    // and no other code is reading this environment variable.
    unsafe { std::env::remove_var(name) };
    Some(value)
}

/// Load JWT secret from environment variable or file.
/// Returns None and logs an error if the secret cannot be loaded.
pub fn load_jwt_secret(jwt_secret_file: Option<&str>) -> Option<String> {
    let secret = if let Some(secret) = take_env_secret("JWT_SECRET") {
        secret
    } else if let Some(path) = jwt_secret_file {
        match std::fs::read_to_string(path) {
            Ok(content) => content.trim().to_string(),
            Err(e) => {
                error!(path = %path, error = %e, "Failed to read JWT secret file");
                return None;
            }
        }
    } else {
        error!(
            "JWT secret is required. Set JWT_SECRET environment variable (recommended) or use --jwt-secret-file"
        );
        return None;
    };

    if secret.len() < MIN_JWT_SECRET_LENGTH {
        error!(
            "JWT secret is shorter than {} characters. Use a longer secret",
            MIN_JWT_SECRET_LENGTH
        );
        return None;
    }

    Some(secret)
}

/// Load the admin password from ADMIN_PASSWORD.
/// Returns None and logs an error if it is missing or empty.
pub fn load_admin_password() -> Option<String> {
    match take_env_secret("ADMIN_PASSWORD") {
        Some(password) if !password.is_empty() => Some(password),
        _ => {
            error!("Admin password is required. Set ADMIN_PASSWORD environment variable");
            None
        }
    }
}

/// Build ServerConfig from validated arguments.
pub fn build_config(
    args: &Args,
    db: Database,
    jwt_secret: String,
    admin_password: String,
) -> ServerConfig {
    ServerConfig {
        db,
        jwt_secret: jwt_secret.into_bytes(),
        access_token_lifetime: Duration::from_secs(args.access_token_hours * 60 * 60),
        rotate_refresh_tokens: args.rotate_refresh_tokens,
        credentials: StaticCredentials::new(
            args.admin_username.clone(),
            admin_password,
            args.admin_subject.clone(),
        ),
        max_requests_per_second: NonZeroU32::new(args.max_requests_per_second),
        cleanup_interval: Duration::from_secs(args.cleanup_interval_secs),
    }
}

/// Open the database, logging errors if it fails.
pub async fn open_database(path: &str) -> Option<Database> {
    match Database::open(path).await {
        Ok(db) => {
            info!(path = %path, "Database opened");
            Some(db)
        }
        Err(e) => {
            error!(path = %path, error = %e, "Failed to open database");
            None
        }
    }
}
