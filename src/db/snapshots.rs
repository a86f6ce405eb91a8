use std::sync::Arc;

use futures_util::{stream, StreamExt, TryStreamExt};
use sqlx::SqlitePool;
use tracing::{debug, info};

use crate::db::models::TicketRecord;
use crate::db::registry::MatchRegistry;
use crate::error::{AppError, Result};
use crate::ingest::normalize_tickets;
use crate::state::BatchClock;
use crate::types::{IngestOutcome, MatchSummary, Snapshot, TicketPayload, TicketRow};

/// Append-only log of ticket rows, grouped into batches by `batch_ts`.
#[derive(Clone)]
pub struct SnapshotStore {
    pool: SqlitePool,
    registry: MatchRegistry,
    clock: Arc<BatchClock>,
    read_concurrency: usize,
}

impl SnapshotStore {
    pub fn new(
        pool: SqlitePool,
        registry: MatchRegistry,
        clock: Arc<BatchClock>,
        read_concurrency: usize,
    ) -> Self {
        Self {
            pool,
            registry,
            clock,
            read_concurrency: read_concurrency.max(1),
        }
    }

    /// Persist one batch for `match_id` under a single fresh timestamp.
    ///
    /// Input problems are rejected before anything is written. Rows failing the
    /// filter are dropped silently. Surviving rows commit together.
    pub async fn ingest_batch(&self, match_id: i64, tickets: &[TicketPayload]) -> Result<IngestOutcome> {
        if tickets.is_empty() {
            return Err(AppError::Validation("no tickets in batch".to_string()));
        }
        if !self.registry.exists(match_id).await? {
            return Err(AppError::NotFound(format!("match id {match_id}")));
        }

        let (rows, stats) = normalize_tickets(tickets);
        let batch_ts = self.clock.mint();

        let mut tx = self.pool.begin().await?;
        for row in &rows {
            sqlx::query(
                r#"
                INSERT INTO tickets (match_id, category, price_min, price_max, quantity, batch_ts)
                VALUES (?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(match_id)
            .bind(&row.category)
            .bind(row.price_min)
            .bind(row.price_max)
            .bind(row.quantity)
            .bind(batch_ts)
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;

        info!(
            match_id,
            batch_ts,
            inserted = rows.len(),
            dropped = stats.dropped(),
            "batch stored: {} rows ({} dropped by filter)",
            rows.len(),
            stats.dropped(),
        );

        Ok(IngestOutcome {
            match_id,
            batch_ts,
            inserted: rows.len(),
            dropped: stats.dropped(),
        })
    }

    /// Rows of the most recent batch for `match_id`, or None when nothing was ever stored.
    pub async fn latest_snapshot(&self, match_id: i64) -> Result<Option<Snapshot>> {
        let records = sqlx::query_as::<_, TicketRecord>(
            r#"
            SELECT id, match_id, category, price_min, price_max, quantity, batch_ts
            FROM tickets
            WHERE match_id = ?
              AND batch_ts = (SELECT MAX(batch_ts) FROM tickets WHERE match_id = ?)
            ORDER BY id ASC
            "#,
        )
        .bind(match_id)
        .bind(match_id)
        .fetch_all(&self.pool)
        .await?;

        let Some(timestamp) = records.first().map(|r| r.batch_ts) else {
            return Ok(None);
        };
        let rows: Vec<TicketRow> = records.into_iter().map(TicketRow::from).collect();
        Ok(Some(Snapshot { timestamp, rows }))
    }

    /// Every match that has at least one batch, in title order, with its latest
    /// snapshot and price bounds. Per-match reads run concurrently up to
    /// `read_concurrency`; output order follows the title order.
    pub async fn latest_snapshots_for_all_matches(&self) -> Result<Vec<MatchSummary>> {
        let matches = self.registry.list_matches().await?;
        let total = matches.len();

        let summaries: Vec<Option<MatchSummary>> = stream::iter(matches)
            .map(|m| async move {
                let snapshot = self.latest_snapshot(m.id).await?;
                Ok::<_, AppError>(snapshot.and_then(|s| MatchSummary::from_snapshot(m, s)))
            })
            .buffered(self.read_concurrency)
            .try_collect()
            .await?;

        let summaries: Vec<MatchSummary> = summaries.into_iter().flatten().collect();
        debug!(
            matches = total,
            with_data = summaries.len(),
            "latest snapshots collected"
        );
        Ok(summaries)
    }

    /// Latest snapshot looked up by title. Unknown title is NotFound; a known
    /// match without any batch yields Ok(None).
    pub async fn historical_snapshot(&self, title: &str) -> Result<Option<Snapshot>> {
        let Some(m) = self.registry.find_by_title(title).await? else {
            return Err(AppError::NotFound(format!("no match titled {title:?}")));
        };
        self.latest_snapshot(m.id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_pool;
    use crate::types::{NewMatch, NumericField};

    async fn setup() -> (MatchRegistry, SnapshotStore) {
        let pool = test_pool().await;
        let registry = MatchRegistry::new(pool.clone());
        let store = SnapshotStore::new(pool, registry.clone(), Arc::new(BatchClock::new()), 4);
        (registry, store)
    }

    async fn add_match(registry: &MatchRegistry, title: &str) -> i64 {
        registry
            .upsert_match(&NewMatch { title: title.to_string(), ..NewMatch::default() })
            .await
            .unwrap()
    }

    fn ticket(category: &str, price_min: f64, price_max: f64, qty: f64) -> TicketPayload {
        TicketPayload {
            categoria: Some(category.to_string()),
            precio_min: Some(NumericField::Number(price_min)),
            precio_max: Some(NumericField::Number(price_max)),
            cantidad: Some(NumericField::Number(qty)),
        }
    }

    #[tokio::test]
    async fn batch_rows_share_one_timestamp() {
        let (registry, store) = setup().await;
        let id = add_match(&registry, "A vs B").await;

        let outcome = store
            .ingest_batch(id, &[ticket("Cat 1", 100.0, 200.0, 2.0), ticket("Cat 2", 50.0, 80.0, 5.0)])
            .await
            .unwrap();
        assert_eq!(outcome.inserted, 2);

        let snap = store.latest_snapshot(id).await.unwrap().unwrap();
        assert_eq!(snap.timestamp, outcome.batch_ts);
        assert_eq!(snap.rows.len(), 2);
        assert!(snap.rows.iter().all(|r| r.batch_ts == outcome.batch_ts && r.match_id == id));
    }

    #[tokio::test]
    async fn successive_batches_get_increasing_timestamps_and_latest_wins() {
        let (registry, store) = setup().await;
        let id = add_match(&registry, "A vs B").await;

        let first = store.ingest_batch(id, &[ticket("Old", 10.0, 20.0, 1.0)]).await.unwrap();
        let second = store
            .ingest_batch(id, &[ticket("New 1", 30.0, 40.0, 1.0), ticket("New 2", 35.0, 45.0, 1.0)])
            .await
            .unwrap();
        assert!(second.batch_ts > first.batch_ts);

        let snap = store.latest_snapshot(id).await.unwrap().unwrap();
        assert_eq!(snap.timestamp, second.batch_ts);
        let categories: Vec<&str> = snap.rows.iter().map(|r| r.category.as_str()).collect();
        assert_eq!(categories, vec!["New 1", "New 2"]);
    }

    #[tokio::test]
    async fn filter_persists_only_valid_rows() {
        let (registry, store) = setup().await;
        let id = add_match(&registry, "A vs B").await;

        let outcome = store
            .ingest_batch(
                id,
                &[ticket("no qty", 5.0, 9.0, 0.0), ticket("no price", 0.0, 9.0, 3.0), ticket("ok", 5.0, 9.0, 3.0)],
            )
            .await
            .unwrap();
        assert_eq!(outcome.inserted, 1);
        assert_eq!(outcome.dropped, 2);

        let snap = store.latest_snapshot(id).await.unwrap().unwrap();
        assert_eq!(snap.rows.len(), 1);
        assert_eq!(snap.rows[0].category, "ok");
        assert_eq!(snap.rows[0].quantity, 3);
    }

    #[tokio::test]
    async fn empty_batch_is_rejected_before_writing() {
        let (registry, store) = setup().await;
        let id = add_match(&registry, "A vs B").await;

        let err = store.ingest_batch(id, &[]).await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
        assert!(store.latest_snapshot(id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn unknown_match_id_is_rejected() {
        let (_registry, store) = setup().await;
        let err = store.ingest_batch(999, &[ticket("x", 1.0, 2.0, 1.0)]).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn all_matches_skips_empty_and_aggregates_bounds() {
        let (registry, store) = setup().await;
        let zeta = add_match(&registry, "Zeta vs Omega").await;
        let _empty = add_match(&registry, "Beta vs Gamma").await;
        let alpha = add_match(&registry, "Alpha vs Delta").await;

        store
            .ingest_batch(
                zeta,
                &[ticket("a", 10.0, 20.0, 1.0), ticket("b", 5.0, 30.0, 1.0), ticket("c", 15.0, 25.0, 1.0)],
            )
            .await
            .unwrap();
        store.ingest_batch(alpha, &[ticket("old", 1.0, 1000.0, 1.0)]).await.unwrap();
        let latest_alpha = store.ingest_batch(alpha, &[ticket("new", 70.0, 90.0, 2.0)]).await.unwrap();

        let all = store.latest_snapshots_for_all_matches().await.unwrap();
        let titles: Vec<&str> = all.iter().map(|s| s.event.event.title.as_str()).collect();
        assert_eq!(titles, vec!["Alpha vs Delta", "Zeta vs Omega"]);

        let alpha_summary = &all[0];
        assert_eq!(alpha_summary.event.last_timestamp, latest_alpha.batch_ts);
        assert_eq!((alpha_summary.event.price_min, alpha_summary.event.price_max), (70.0, 90.0));
        assert_eq!(alpha_summary.tickets.len(), 1);

        let zeta_summary = &all[1];
        assert_eq!((zeta_summary.event.price_min, zeta_summary.event.price_max), (5.0, 30.0));
        assert_eq!(zeta_summary.tickets.len(), 3);
    }

    #[tokio::test]
    async fn fully_filtered_batch_leaves_match_without_snapshot() {
        let (registry, store) = setup().await;
        let id = add_match(&registry, "A vs B").await;

        let outcome = store.ingest_batch(id, &[ticket("sold out", 50.0, 60.0, 0.0)]).await.unwrap();
        assert_eq!(outcome.inserted, 0);
        assert!(store.latest_snapshot(id).await.unwrap().is_none());
        assert!(store.latest_snapshots_for_all_matches().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn historical_snapshot_distinguishes_unknown_from_empty() {
        let (registry, store) = setup().await;
        let id = add_match(&registry, "Known vs Empty").await;

        let err = store.historical_snapshot("Nobody vs Nothing").await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
        assert!(store.historical_snapshot("Known vs Empty").await.unwrap().is_none());

        let outcome = store.ingest_batch(id, &[ticket("Cat 3", 60.0, 75.0, 4.0)]).await.unwrap();
        let snap = store.historical_snapshot("Known vs Empty").await.unwrap().unwrap();
        assert_eq!(snap.timestamp, outcome.batch_ts);
        assert_eq!(snap.rows.len(), 1);
    }
}
