use serde::Deserialize;

// ---------------------------------------------------------------------------
// API response types (mirror routes.rs shapes)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
#[allow(dead_code)]
pub struct MatchInfo {
    pub id: i64,
    pub title: String,
    #[serde(default)]
    pub venue: String,
    #[serde(default)]
    pub date: String,
    #[serde(default)]
    pub home_team: String,
    #[serde(default)]
    pub away_team: String,
    pub last_timestamp: i64,
    pub price_min: f64,
    pub price_max: f64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
#[allow(dead_code)]
pub struct Ticket {
    pub category: String,
    pub price_min: f64,
    pub price_max: f64,
    pub quantity: i64,
    pub timestamp: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MatchEntry {
    #[serde(rename = "match")]
    pub info: MatchInfo,
    pub tickets: Vec<Ticket>,
}

impl MatchEntry {
    pub fn total_quantity(&self) -> i64 {
        self.tickets.iter().map(|t| t.quantity).sum()
    }
}

#[derive(Debug, Clone, Deserialize, Default)]
#[allow(dead_code)]
pub struct CycleInfo {
    pub cycle: u64,
    pub paused: bool,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[allow(dead_code)]
pub struct HealthResponse {
    pub total_matches: Option<i64>,
    pub batches_ingested: Option<u64>,
    pub rows_ingested: Option<u64>,
    pub last_ingest_ts: Option<i64>,
    #[serde(default)]
    pub cycle: CycleInfo,
}

// ---------------------------------------------------------------------------
// App state
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub enum ConnectionStatus {
    Connected,
    Error(String),
    Connecting,
}

#[derive(Debug, Clone)]
pub struct AppState {
    pub status: ConnectionStatus,
    pub matches: Vec<MatchEntry>,
    pub health: HealthResponse,
    pub last_refresh: std::time::Instant,
    pub base_url: String,
}

impl AppState {
    pub fn new(base_url: String) -> Self {
        Self {
            status: ConnectionStatus::Connecting,
            matches: Vec::new(),
            health: HealthResponse::default(),
            last_refresh: std::time::Instant::now(),
            base_url,
        }
    }

    pub fn selected(&self, index: Option<usize>) -> Option<&MatchEntry> {
        index.and_then(|i| self.matches.get(i))
    }

    pub async fn refresh(&mut self, client: &reqwest::Client) {
        let data_url = format!("{}/getdata", self.base_url);
        let health_url = format!("{}/health", self.base_url);

        let (data_res, health_res) = tokio::join!(
            client.get(&data_url).send(),
            client.get(&health_url).send(),
        );

        let resp = match data_res {
            Ok(r) => r,
            Err(e) => {
                self.status = ConnectionStatus::Error(format!("{e}"));
                return;
            }
        };

        match resp.json::<Vec<MatchEntry>>().await {
            Ok(matches) => {
                self.matches = matches;
                self.status = ConnectionStatus::Connected;
                self.last_refresh = std::time::Instant::now();

                if let Ok(h) = health_res {
                    if let Ok(health) = h.json::<HealthResponse>().await {
                        self.health = health;
                    }
                }
            }
            Err(e) => {
                self.status = ConnectionStatus::Error(format!("parse error: {e}"));
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Formatting helpers
// ---------------------------------------------------------------------------

/// `1234.5` → `"1,234.50"`.
pub fn format_price(v: f64) -> String {
    let cents = (v * 100.0).round() as i64;
    let whole = (cents / 100).abs();
    let frac = (cents % 100).abs();

    let digits = whole.to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(c);
    }

    let sign = if cents < 0 { "-" } else { "" };
    format!("{sign}{grouped}.{frac:02}")
}

/// Convert millisecond epoch timestamp to HH:MM:SS (UTC).
pub fn format_time_ms(ms: i64) -> String {
    if ms <= 0 {
        return "—".to_string();
    }
    let secs = (ms / 1_000) as u64;
    let h = (secs / 3600) % 24;
    let m = (secs / 60) % 60;
    let s = secs % 60;
    format!("{h:02}:{m:02}:{s:02}")
}

pub fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let head: String = s.chars().take(max.saturating_sub(1)).collect();
        format!("{head}…")
    }
}
