/// Database row types matching `migrations/`. Converted into the API-facing
/// types in `crate::types` before leaving the db module.
use crate::types::{Match, TicketRow};

#[derive(Debug, sqlx::FromRow)]
pub struct MatchRecord {
    pub id: i64,
    pub title: String,
    pub venue: String,
    pub match_date: String,
    pub home_team: String,
    pub away_team: String,
    pub source_link: String,
}

impl From<MatchRecord> for Match {
    fn from(r: MatchRecord) -> Self {
        Match {
            id: r.id,
            title: r.title,
            venue: r.venue,
            date: r.match_date,
            home_team: r.home_team,
            away_team: r.away_team,
            source_link: r.source_link,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
pub struct TicketRecord {
    pub id: i64,
    pub match_id: i64,
    pub category: String,
    pub price_min: f64,
    pub price_max: f64,
    pub quantity: i64,
    pub batch_ts: i64,
}

impl From<TicketRecord> for TicketRow {
    fn from(r: TicketRecord) -> Self {
        TicketRow {
            id: r.id,
            match_id: r.match_id,
            category: r.category,
            price_min: r.price_min,
            price_max: r.price_max,
            quantity: r.quantity,
            batch_ts: r.batch_ts,
        }
    }
}
