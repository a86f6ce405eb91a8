use std::time::Duration;

use async_trait::async_trait;
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use serde::Deserialize;
use tracing::{debug, info};

use super::CodeProvider;
use crate::config::{Config, CODE_LENGTH, MAIL_TIMEOUT_SECS};
use crate::error::{AppError, Result};

// ---------------------------------------------------------------------------
// Gmail REST shapes (only the fields we read)
// ---------------------------------------------------------------------------

#[derive(Debug, Default, Deserialize)]
struct MessageList {
    #[serde(default)]
    messages: Vec<MessageRef>,
}

#[derive(Debug, Deserialize)]
struct MessageRef {
    id: String,
}

#[derive(Debug, Default, Deserialize)]
struct Message {
    #[serde(default)]
    payload: Option<MessagePart>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MessagePart {
    #[serde(default)]
    mime_type: String,
    #[serde(default)]
    headers: Vec<Header>,
    #[serde(default)]
    body: Option<PartBody>,
    #[serde(default)]
    parts: Vec<MessagePart>,
}

#[derive(Debug, Deserialize)]
struct Header {
    name: String,
    value: String,
}

#[derive(Debug, Default, Deserialize)]
struct PartBody {
    #[serde(default)]
    data: Option<String>,
}

impl MessagePart {
    fn header(&self, name: &str) -> &str {
        self.headers
            .iter()
            .find(|h| h.name.eq_ignore_ascii_case(name))
            .map_or("", |h| h.value.as_str())
    }

    fn data(&self) -> Option<&str> {
        self.body.as_ref()?.data.as_deref().filter(|d| !d.is_empty())
    }
}

// ---------------------------------------------------------------------------
// Provider
// ---------------------------------------------------------------------------

pub struct GmailCodeProvider {
    client: reqwest::Client,
    base_url: String,
    access_token: String,
    sender_filter: String,
    scan_limit: usize,
}

impl GmailCodeProvider {
    pub fn new(cfg: &Config, access_token: String) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(MAIL_TIMEOUT_SECS))
            .build()?;
        Ok(Self {
            client,
            base_url: cfg.gmail_api_url.trim_end_matches('/').to_string(),
            access_token,
            sender_filter: cfg.code_sender_filter.clone(),
            scan_limit: cfg.code_scan_limit.max(1),
        })
    }

    async fn get<T: for<'de> Deserialize<'de>>(&self, url: &str, query: &[(&str, String)]) -> Result<T> {
        let resp = self
            .client
            .get(url)
            .bearer_auth(&self.access_token)
            .query(query)
            .send()
            .await?;
        let status = resp.status();
        if !status.is_success() {
            return Err(AppError::Mail(format!("GET {url} returned {status}")));
        }
        Ok(resp.json::<T>().await?)
    }
}

#[async_trait]
impl CodeProvider for GmailCodeProvider {
    async fn fetch_latest_code(&self, mailbox: &str) -> Result<Option<String>> {
        let list_url = format!("{}/users/{}/messages", self.base_url, mailbox);
        let list: MessageList = self
            .get(&list_url, &[("maxResults", self.scan_limit.to_string())])
            .await?;

        if list.messages.is_empty() {
            info!(mailbox, "mailbox has no messages");
            return Ok(None);
        }

        for m in &list.messages {
            let url = format!("{list_url}/{}", m.id);
            let message: Message = self.get(&url, &[("format", "full".to_string())]).await?;
            if let Some(code) = code_from_message(&message, &self.sender_filter) {
                info!(mailbox, message_id = %m.id, "verification code found");
                return Ok(Some(code));
            }
        }

        info!(
            mailbox,
            scanned = list.messages.len(),
            sender = %self.sender_filter,
            "no verification code in recent messages"
        );
        Ok(None)
    }
}

// ---------------------------------------------------------------------------
// Message parsing
// ---------------------------------------------------------------------------

/// Code from a message whose From header contains `sender_filter` (lowercase).
fn code_from_message(message: &Message, sender_filter: &str) -> Option<String> {
    let payload = message.payload.as_ref()?;
    let from = payload.header("From").to_lowercase();
    if !from.contains(sender_filter) {
        debug!(from = %from, "skipping message from other sender");
        return None;
    }
    extract_code(&message_body(payload))
}

/// Top-level body if present, otherwise the concatenated `text/plain` parts,
/// falling back to the first `text/html` part when no plain text was found.
fn message_body(payload: &MessagePart) -> String {
    if let Some(data) = payload.data() {
        return decode_base64url(data);
    }
    let mut body = String::new();
    walk_parts(&payload.parts, &mut body);
    body
}

fn walk_parts(parts: &[MessagePart], body: &mut String) {
    for p in parts {
        if p.mime_type == "text/plain" && p.data().is_some() {
            body.push_str(&p.data().map(decode_base64url).unwrap_or_default());
        } else if !p.parts.is_empty() {
            walk_parts(&p.parts, body);
        } else if p.mime_type == "text/html" && body.is_empty() {
            if let Some(data) = p.data() {
                body.push_str(&decode_base64url(data));
            }
        }
    }
}

/// Gmail bodies are base64url; tolerate padding and the standard alphabet too.
fn decode_base64url(data: &str) -> String {
    let normalized: String = data
        .trim_end_matches('=')
        .chars()
        .map(|c| match c {
            '+' => '-',
            '/' => '_',
            c => c,
        })
        .filter(|c| !c.is_whitespace())
        .collect();
    URL_SAFE_NO_PAD
        .decode(normalized)
        .map(|bytes| String::from_utf8_lossy(&bytes).into_owned())
        .unwrap_or_default()
}

/// First standalone run of exactly six ASCII digits, after replacing HTML tags
/// with spaces. Digits glued to letters or longer digit runs do not count.
pub fn extract_code(body: &str) -> Option<String> {
    let plain = strip_tags(body);
    plain
        .split(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
        .find(|token| token.len() == CODE_LENGTH && token.bytes().all(|b| b.is_ascii_digit()))
        .map(str::to_string)
}

fn strip_tags(html: &str) -> String {
    let mut out = String::with_capacity(html.len());
    let mut rest = html;
    while let Some(start) = rest.find('<') {
        out.push_str(&rest[..start]);
        let after = &rest[start + 1..];
        match after.find('>') {
            Some(end) if end > 0 => {
                out.push(' ');
                rest = &after[end + 1..];
            }
            _ => {
                out.push('<');
                rest = after;
            }
        }
    }
    out.push_str(rest);
    out
}
