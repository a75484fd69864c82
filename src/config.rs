// src/config.rs

use dotenvy::dotenv;
use std::env;

/// Abandoned attempts (never submitted, clock long expired) are dropped
/// from the in-memory registry after this many seconds.
pub const ATTEMPT_RETENTION_SECONDS: i64 = 6 * 60 * 60;

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub jwt_secret: String,
    pub jwt_expiration: u64,
    pub rust_log: String,
    /// Optional bootstrap teacher account, seeded at startup when both are
    /// set and the username does not exist yet.
    pub bootstrap_teacher_username: Option<String>,
    pub bootstrap_teacher_password: Option<String>,
}

impl Config {
    pub fn from_env() -> Self {
        dotenv().ok();

        let database_url = env::var("DATABASE_URL").expect("DATABASE_URL must be set");

        let jwt_secret = env::var("JWT_SECRET").expect("JWT_SECRET must be set");

        let jwt_expiration = env::var("JWT_EXPIRATION_SECONDS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(24 * 60 * 60);

        let rust_log = env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());

        let bootstrap_teacher_username = env::var("BOOTSTRAP_TEACHER_USERNAME").ok();
        let bootstrap_teacher_password = env::var("BOOTSTRAP_TEACHER_PASSWORD").ok();

        Self {
            database_url,
            jwt_secret,
            jwt_expiration,
            rust_log,
            bootstrap_teacher_username,
            bootstrap_teacher_password,
        }
    }
}
