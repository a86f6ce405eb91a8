use sqlx::SqlitePool;
use tracing::debug;

use crate::db::models::MatchRecord;
use crate::error::Result;
use crate::ingest::validate_match;
use crate::types::{Match, NewMatch};

const MATCH_COLUMNS: &str =
    "id, title, venue, match_date, home_team, away_team, source_link";

/// One canonical row per match title.
#[derive(Clone)]
pub struct MatchRegistry {
    pool: SqlitePool,
}

impl MatchRegistry {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Insert a new match or replace every mutable field of the existing one.
    /// A single statement, so readers never observe a half-updated row.
    pub async fn upsert_match(&self, m: &NewMatch) -> Result<i64> {
        validate_match(m)?;

        let id = sqlx::query_scalar::<_, i64>(
            r#"
            INSERT INTO matches (title, venue, match_date, home_team, away_team, source_link)
            VALUES (?, ?, ?, ?, ?, ?)
            ON CONFLICT(title) DO UPDATE SET
                venue = excluded.venue,
                match_date = excluded.match_date,
                home_team = excluded.home_team,
                away_team = excluded.away_team,
                source_link = excluded.source_link
            RETURNING id
            "#,
        )
        .bind(&m.title)
        .bind(&m.venue)
        .bind(&m.date)
        .bind(&m.home_team)
        .bind(&m.away_team)
        .bind(&m.source_link)
        .fetch_one(&self.pool)
        .await?;

        debug!(match_id = id, title = %m.title, "match upserted");
        Ok(id)
    }

    /// All matches, ordered by title.
    pub async fn list_matches(&self) -> Result<Vec<Match>> {
        let rows = sqlx::query_as::<_, MatchRecord>(&format!(
            "SELECT {MATCH_COLUMNS} FROM matches ORDER BY title ASC"
        ))
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(Match::from).collect())
    }

    pub async fn find_by_title(&self, title: &str) -> Result<Option<Match>> {
        let row = sqlx::query_as::<_, MatchRecord>(&format!(
            "SELECT {MATCH_COLUMNS} FROM matches WHERE title = ?"
        ))
        .bind(title)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(Match::from))
    }

    pub async fn exists(&self, match_id: i64) -> Result<bool> {
        let found = sqlx::query_scalar::<_, i64>("SELECT id FROM matches WHERE id = ?")
            .bind(match_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(found.is_some())
    }

    pub async fn count(&self) -> Result<i64> {
        let n = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM matches")
            .fetch_one(&self.pool)
            .await?;
        Ok(n)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_pool;
    use crate::error::AppError;

    fn new_match(title: &str, venue: &str, date: &str) -> NewMatch {
        NewMatch {
            title: title.to_string(),
            venue: venue.to_string(),
            date: date.to_string(),
            home_team: "Home".to_string(),
            away_team: "Away".to_string(),
            source_link: "https://example.test/a".to_string(),
        }
    }

    #[tokio::test]
    async fn upsert_same_title_keeps_one_row_with_latest_values() {
        let registry = MatchRegistry::new(test_pool().await);

        let first = registry
            .upsert_match(&new_match("Spain vs Uruguay", "Atlanta", "2026-06-26"))
            .await
            .unwrap();
        let mut second_payload = new_match("Spain vs Uruguay", "Guadalajara", "2026-06-27");
        second_payload.source_link = String::new();
        let second = registry.upsert_match(&second_payload).await.unwrap();

        assert_eq!(first, second);
        let all = registry.list_matches().await.unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].venue, "Guadalajara");
        assert_eq!(all[0].date, "2026-06-27");
        assert_eq!(all[0].source_link, "");
    }

    #[tokio::test]
    async fn distinct_titles_get_distinct_ids() {
        let registry = MatchRegistry::new(test_pool().await);
        let a = registry.upsert_match(&new_match("A vs B", "X", "d")).await.unwrap();
        let b = registry.upsert_match(&new_match("C vs D", "Y", "d")).await.unwrap();
        assert_ne!(a, b);
        assert_eq!(registry.count().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn list_is_ordered_by_title() {
        let registry = MatchRegistry::new(test_pool().await);
        for title in ["Mexico vs Korea", "Brazil vs Morocco", "Germany vs Curacao"] {
            registry.upsert_match(&new_match(title, "v", "d")).await.unwrap();
        }
        let titles: Vec<String> = registry
            .list_matches()
            .await
            .unwrap()
            .into_iter()
            .map(|m| m.title)
            .collect();
        assert_eq!(titles, vec!["Brazil vs Morocco", "Germany vs Curacao", "Mexico vs Korea"]);
    }

    #[tokio::test]
    async fn empty_title_is_rejected_without_writing() {
        let registry = MatchRegistry::new(test_pool().await);
        let err = registry.upsert_match(&new_match("", "v", "d")).await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
        assert_eq!(registry.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn find_by_title_and_exists() {
        let registry = MatchRegistry::new(test_pool().await);
        let id = registry.upsert_match(&new_match("A vs B", "X", "d")).await.unwrap();

        let found = registry.find_by_title("A vs B").await.unwrap().unwrap();
        assert_eq!(found.id, id);
        assert!(registry.find_by_title("nope").await.unwrap().is_none());
        assert!(registry.exists(id).await.unwrap());
        assert!(!registry.exists(id + 100).await.unwrap());
    }
}
