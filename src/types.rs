use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Match
// ---------------------------------------------------------------------------

/// A tracked event. `title` is the natural key; `id` is the storage identity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Match {
    pub id: i64,
    pub title: String,
    pub venue: String,
    pub date: String,
    pub home_team: String,
    pub away_team: String,
    pub source_link: String,
}

/// Match metadata as submitted with a batch. Everything but `title` is replaced
/// wholesale on every resubmission.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NewMatch {
    pub title: String,
    pub venue: String,
    pub date: String,
    pub home_team: String,
    pub away_team: String,
    pub source_link: String,
}

// ---------------------------------------------------------------------------
// Tickets
// ---------------------------------------------------------------------------

/// One persisted category row. Never updated after insertion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TicketRow {
    pub id: i64,
    pub match_id: i64,
    pub category: String,
    pub price_min: f64,
    pub price_max: f64,
    pub quantity: i64,
    #[serde(rename = "timestamp")]
    pub batch_ts: i64,
}

/// A row that passed normalization and the `quantity > 0 && price_min > 0` filter.
#[derive(Debug, Clone, PartialEq)]
pub struct NewTicket {
    pub category: String,
    pub price_min: f64,
    pub price_max: f64,
    pub quantity: i64,
}

// ---------------------------------------------------------------------------
// Snapshots (derived, never stored)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    pub timestamp: i64,
    pub rows: Vec<TicketRow>,
}

impl Snapshot {
    /// `(min of price_min, max of price_max)` over the rows. None for an empty row set.
    pub fn price_bounds(&self) -> Option<(f64, f64)> {
        let mut rows = self.rows.iter();
        let first = rows.next()?;
        Some(rows.fold((first.price_min, first.price_max), |(lo, hi), r| {
            (lo.min(r.price_min), hi.max(r.price_max))
        }))
    }
}

/// Match projection enriched with its latest batch, as served by GET /getdata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchProjection {
    #[serde(flatten)]
    pub event: Match,
    pub last_timestamp: i64,
    pub price_min: f64,
    pub price_max: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchSummary {
    #[serde(rename = "match")]
    pub event: MatchProjection,
    pub tickets: Vec<TicketRow>,
}

impl MatchSummary {
    /// None when the snapshot has no rows to aggregate.
    pub fn from_snapshot(event: Match, snapshot: Snapshot) -> Option<Self> {
        let (price_min, price_max) = snapshot.price_bounds()?;
        Some(Self {
            event: MatchProjection {
                event,
                last_timestamp: snapshot.timestamp,
                price_min,
                price_max,
            },
            tickets: snapshot.rows,
        })
    }
}

/// Result of one ingest call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct IngestOutcome {
    pub match_id: i64,
    pub batch_ts: i64,
    pub inserted: usize,
    pub dropped: usize,
}

// ---------------------------------------------------------------------------
// Ingest payloads
// ---------------------------------------------------------------------------

/// A numeric field as producers send it: a JSON number or formatted text such as `"1,234"`.
/// Anything else (booleans, objects, arrays) lands in `Other` and never parses.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum NumericField {
    Number(f64),
    Text(String),
    Other(serde_json::Value),
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct MatchPayload {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub stadium: Option<String>,
    #[serde(default)]
    pub fecha: Option<String>,
    #[serde(default)]
    pub local: Option<String>,
    #[serde(default)]
    pub visitante: Option<String>,
    #[serde(default)]
    pub link: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TicketPayload {
    #[serde(default)]
    pub categoria: Option<String>,
    #[serde(default)]
    pub precio_min: Option<NumericField>,
    #[serde(default)]
    pub precio_max: Option<NumericField>,
    #[serde(default)]
    pub cantidad: Option<NumericField>,
}

/// Flat row shape used by older scrapers: match metadata repeated on every row.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LegacyTicketPayload {
    #[serde(default, rename = "match")]
    pub title: Option<String>,
    #[serde(default)]
    pub estadium: Option<String>,
    #[serde(default)]
    pub fecha: Option<String>,
    #[serde(flatten)]
    pub ticket: TicketPayload,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct IngestRequest {
    #[serde(default, rename = "match")]
    pub event: Option<MatchPayload>,
    #[serde(default)]
    pub tickets: Option<Vec<TicketPayload>>,
    #[serde(default)]
    pub resultados: Option<Vec<LegacyTicketPayload>>,
}
