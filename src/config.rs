use crate::error::{AppError, Result};

pub const GMAIL_API_URL: &str = "https://gmail.googleapis.com/gmail/v1";

/// Default SQLite file. The parent directory is created at startup if missing.
pub const DB_PATH: &str = "db/tickets.db";

/// Upper bound on per-match snapshot queries in flight during the all-matches read.
pub const READ_CONCURRENCY: usize = 8;

/// How many of the newest inbox messages are scanned for a verification code.
pub const CODE_SCAN_LIMIT: usize = 5;

/// Timeout for outbound calls to the mail API (seconds).
pub const MAIL_TIMEOUT_SECS: u64 = 15;

/// Verification codes are exactly this many digits.
pub const CODE_LENGTH: usize = 6;

#[derive(Debug, Clone)]
pub struct Config {
    pub log_level: String,
    pub db_path: String,
    pub api_port: u16,
    /// Max concurrent per-match reads for GET /getdata (READ_CONCURRENCY)
    pub read_concurrency: usize,
    pub gmail_api_url: String,
    /// Bearer token for the Gmail REST API (GMAIL_ACCESS_TOKEN).
    /// When unset the verification-code endpoint always answers null.
    pub gmail_access_token: Option<String>,
    /// Mailbox user id passed to the Gmail API (CODE_MAILBOX)
    pub code_mailbox: String,
    /// Case-insensitive substring the From header must contain (CODE_SENDER_FILTER)
    pub code_sender_filter: String,
    pub code_scan_limit: usize,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            log_level: std::env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            db_path: std::env::var("DB_PATH").unwrap_or_else(|_| DB_PATH.to_string()),
            api_port: std::env::var("API_PORT")
                .unwrap_or_else(|_| "3000".to_string())
                .parse::<u16>()
                .map_err(|_| AppError::Config("API_PORT must be a valid port number".to_string()))?,
            read_concurrency: std::env::var("READ_CONCURRENCY")
                .ok()
                .and_then(|v| v.parse::<usize>().ok())
                .filter(|n| *n > 0)
                .unwrap_or(READ_CONCURRENCY),
            gmail_api_url: std::env::var("GMAIL_API_URL")
                .unwrap_or_else(|_| GMAIL_API_URL.to_string()),
            gmail_access_token: std::env::var("GMAIL_ACCESS_TOKEN")
                .ok()
                .map(|t| t.trim().to_string())
                .filter(|t| !t.is_empty()),
            code_mailbox: std::env::var("CODE_MAILBOX").unwrap_or_else(|_| "me".to_string()),
            code_sender_filter: std::env::var("CODE_SENDER_FILTER")
                .unwrap_or_else(|_| "fifa".to_string())
                .to_lowercase(),
            code_scan_limit: std::env::var("CODE_SCAN_LIMIT")
                .unwrap_or_else(|_| CODE_SCAN_LIMIT.to_string())
                .parse::<usize>()
                .unwrap_or(CODE_SCAN_LIMIT),
        })
    }
}
