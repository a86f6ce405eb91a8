//! Verification-code lookup for the external login automation.
//!
//! The rest of the service only sees [`CodeProvider`]. [`GmailCodeProvider`]
//! scans the newest messages of a mailbox through the Gmail REST API using a
//! pre-issued access token; token refresh happens outside this process.

mod gmail;

use async_trait::async_trait;
use tracing::warn;

use crate::error::Result;

pub use gmail::GmailCodeProvider;

#[async_trait]
pub trait CodeProvider: Send + Sync {
    /// Latest verification code found in `mailbox`, if any.
    async fn fetch_latest_code(&self, mailbox: &str) -> Result<Option<String>>;
}

/// Used when no mail credentials are configured.
pub struct DisabledCodeProvider;

#[async_trait]
impl CodeProvider for DisabledCodeProvider {
    async fn fetch_latest_code(&self, mailbox: &str) -> Result<Option<String>> {
        warn!(mailbox, "verification code requested but GMAIL_ACCESS_TOKEN is not set");
        Ok(None)
    }
}
