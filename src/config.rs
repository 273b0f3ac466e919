// src/config.rs

use std::env;
use std::path::PathBuf;

use dotenvy::dotenv;

/// Upper bound on questions declared for one section.
pub const MAX_SECTION_QUESTIONS: i64 = 50;

/// Upper bound on the marks carried by a single question.
pub const MAX_MARK_PER_QUESTION: i64 = 100;

/// Number of syllabus modules covered by the blueprint.
pub const MODULE_COUNT: i64 = 4;

/// Allowed distance of R + U + A from 100%.
pub const PERCENT_TOLERANCE: f64 = 0.5;

/// How many papers the resume list shows.
pub const RECENT_PAPERS_LIMIT: i64 = 20;

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub jwt_secret: String,
    pub jwt_expiration: u64,
    pub rust_log: String,
    pub admin_username: Option<String>,
    pub admin_password: Option<String>,
    /// Directory holding uploaded question and answer images.
    pub media_root: PathBuf,
    pub port: u16,
}

impl Config {
    pub fn from_env() -> Self {
        dotenv().ok();

        let database_url = env::var("DATABASE_URL")
            .unwrap_or_else(|_| "sqlite://exam_composer.db?mode=rwc".to_string());

        let jwt_secret = env::var("JWT_SECRET").expect("JWT_SECRET must be set");

        let jwt_expiration = env::var("JWT_EXPIRATION")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(8 * 3600);

        let rust_log = env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());

        let media_root = env::var("MEDIA_ROOT")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("media"));

        let port = env::var("PORT")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(3000);

        Self {
            database_url,
            jwt_secret,
            jwt_expiration,
            rust_log,
            admin_username: env::var("ADMIN_USERNAME").ok(),
            admin_password: env::var("ADMIN_PASSWORD").ok(),
            media_root,
            port,
        }
    }
}
