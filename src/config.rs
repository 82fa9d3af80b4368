// src/config.rs

use dotenvy::dotenv;
use std::env;

/// Page size for question bank and quiz listings.
pub const ITEMS_PER_PAGE: i64 = 10;

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub jwt_secret: String,
    /// Long-lived secret behind the answer-sheet access tokens.
    pub quiz_secret: String,
    /// Public origin used when building `{base_url}/quiz?hash=...` links.
    pub base_url: String,
    pub bind_addr: String,
    pub rust_log: String,
}

impl Config {
    pub fn from_env() -> Self {
        dotenv().ok();

        let database_url = env::var("DATABASE_URL")
            .unwrap_or_else(|_| "sqlite://orgquiz.db?mode=rwc".to_string());

        let jwt_secret = env::var("JWT_SECRET").expect("JWT_SECRET must be set");

        let quiz_secret = env::var("QUIZ_SECRET").expect("QUIZ_SECRET must be set");

        let base_url =
            env::var("BASE_URL").unwrap_or_else(|_| "http://localhost:3000".to_string());

        let bind_addr = env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".to_string());

        let rust_log = env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());

        Self {
            database_url,
            jwt_secret,
            quiz_secret,
            base_url,
            bind_addr,
            rust_log,
        }
    }
}
