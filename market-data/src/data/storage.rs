//! Candle persistence
//!
//! Rows are keyed by (symbol, timestamp, interval, source). Readers go straight
//! to the pool; writers for the same (symbol, interval, source) are serialized
//! through a per-key async mutex while unrelated keys write in parallel.

use crate::config::PipelineConfig;
use crate::data::{Candle, CandleSeries, Interval};
use crate::error::StoreError;
use serde::Serialize;
use shared::DbPool;
use sqlx::FromRow;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, error, info};

const SCHEMA: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS price_history (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        symbol TEXT NOT NULL,
        timestamp INTEGER NOT NULL,
        open REAL NOT NULL,
        high REAL NOT NULL,
        low REAL NOT NULL,
        close REAL NOT NULL,
        volume REAL NOT NULL,
        interval_type TEXT NOT NULL,
        source TEXT NOT NULL,
        written_at INTEGER NOT NULL,
        UNIQUE(symbol, timestamp, interval_type, source)
    )
    "#,
    "CREATE INDEX IF NOT EXISTS idx_price_history_lookup ON price_history(symbol, interval_type, timestamp)",
    "CREATE INDEX IF NOT EXISTS idx_price_history_time ON price_history(timestamp)",
];

#[derive(Debug, FromRow)]
struct CandleRow {
    symbol: String,
    timestamp: i64,
    open: f64,
    high: f64,
    low: f64,
    close: f64,
    volume: f64,
    interval_type: String,
    source: String,
}

impl TryFrom<CandleRow> for Candle {
    type Error = StoreError;

    fn try_from(row: CandleRow) -> Result<Self, Self::Error> {
        let interval: Interval = row
            .interval_type
            .parse()
            .map_err(|_| StoreError::InvalidRow(format!("unknown interval '{}'", row.interval_type)))?;
        Ok(Candle::new(
            row.symbol,
            row.timestamp,
            row.open,
            row.high,
            row.low,
            row.close,
            row.volume,
            interval,
            row.source,
        ))
    }
}

/// Row counts by symbol and by source
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct StoreStats {
    pub total_records: i64,
    pub symbols: BTreeMap<String, i64>,
    pub sources: BTreeMap<String, i64>,
}

type WriteKey = (String, Interval, String);

/// SQLite-backed candle cache
pub struct CandleStore {
    pool: DbPool,
    sufficiency_ratio: f64,
    retention_days: i64,
    write_locks: RwLock<HashMap<WriteKey, Arc<Mutex<()>>>>,
}

impl CandleStore {
    /// Wrap an existing pool, creating the schema if needed
    pub async fn new(pool: DbPool, config: &PipelineConfig) -> Result<Self, StoreError> {
        for statement in SCHEMA {
            sqlx::query(statement).execute(&pool).await?;
        }
        debug!("price_history schema ready");

        Ok(Self {
            pool,
            sufficiency_ratio: config.sufficiency_ratio,
            retention_days: config.retention_days,
            write_locks: RwLock::new(HashMap::new()),
        })
    }

    /// Open the database at `database_url` and wrap it
    pub async fn connect(database_url: &str, config: &PipelineConfig) -> Result<Self, StoreError> {
        let pool = shared::get_pool(database_url).await?;
        Self::new(pool, config).await
    }

    /// Candles for (symbol, interval) with `start <= timestamp <= end`, ascending.
    /// Where several sources hold the same bar, the most recently written wins.
    pub async fn query(
        &self,
        symbol: &str,
        interval: Interval,
        start: i64,
        end: i64,
    ) -> Result<CandleSeries, StoreError> {
        let rows: Vec<CandleRow> = sqlx::query_as(
            r#"
            SELECT symbol, timestamp, open, high, low, close, volume, interval_type, source
            FROM price_history
            WHERE symbol = ? AND interval_type = ? AND timestamp >= ? AND timestamp <= ?
            ORDER BY timestamp ASC, written_at ASC, id ASC
            "#,
        )
        .bind(symbol)
        .bind(interval.as_str())
        .bind(start)
        .bind(end)
        .fetch_all(&self.pool)
        .await?;

        let candles = rows
            .into_iter()
            .map(Candle::try_from)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(CandleSeries::from_unsorted(candles))
    }

    /// Idempotent write: an existing (symbol, timestamp, interval, source) row
    /// has its OHLCV values overwritten. Returns the number of rows written.
    pub async fn upsert(&self, series: &CandleSeries) -> Result<usize, StoreError> {
        let mut groups: HashMap<WriteKey, Vec<&Candle>> = HashMap::new();
        for candle in series.candles() {
            groups
                .entry((candle.symbol.clone(), candle.interval, candle.source.clone()))
                .or_default()
                .push(candle);
        }

        let written_at = chrono::Utc::now().timestamp();
        let mut written = 0;
        for (key, candles) in groups {
            let lock = self.write_lock(&key).await;
            let _guard = lock.lock().await;

            let mut tx = self.pool.begin().await?;
            for candle in &candles {
                sqlx::query(
                    r#"
                    INSERT INTO price_history
                        (symbol, timestamp, open, high, low, close, volume, interval_type, source, written_at)
                    VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
                    ON CONFLICT(symbol, timestamp, interval_type, source) DO UPDATE SET
                        open = excluded.open,
                        high = excluded.high,
                        low = excluded.low,
                        close = excluded.close,
                        volume = excluded.volume,
                        written_at = excluded.written_at
                    "#,
                )
                .bind(&candle.symbol)
                .bind(candle.timestamp)
                .bind(candle.open)
                .bind(candle.high)
                .bind(candle.low)
                .bind(candle.close)
                .bind(candle.volume)
                .bind(candle.interval.as_str())
                .bind(&candle.source)
                .bind(written_at)
                .execute(&mut *tx)
                .await?;
            }
            tx.commit().await.map_err(|e| {
                error!(symbol = %key.0, interval = %key.1, source = %key.2, "failed to commit candles: {}", e);
                StoreError::Database(e)
            })?;
            written += candles.len();
        }

        debug!(count = written, "candles upserted");
        Ok(written)
    }

    /// True iff `series` holds at least `sufficiency_ratio` of the bars
    /// expected between `start` and `end`.
    pub fn is_sufficient(&self, series: &CandleSeries, start: i64, end: i64, interval: Interval) -> bool {
        is_sufficient(series.len(), start, end, interval, self.sufficiency_ratio)
    }

    /// Delete rows with a bar timestamp before `cutoff`. Returns rows removed.
    pub async fn purge_older_than(&self, cutoff: i64) -> Result<u64, StoreError> {
        let result = sqlx::query("DELETE FROM price_history WHERE timestamp < ?")
            .bind(cutoff)
            .execute(&self.pool)
            .await?;
        let removed = result.rows_affected();
        info!(cutoff, removed, "retention sweep finished");
        Ok(removed)
    }

    /// Retention sweep relative to `now` using the configured retention window
    pub async fn purge_expired(&self, now: i64) -> Result<u64, StoreError> {
        let cutoff = now - chrono::Duration::days(self.retention_days).num_seconds();
        self.purge_older_than(cutoff).await
    }

    pub async fn stats(&self) -> Result<StoreStats, StoreError> {
        let total_records: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM price_history")
            .fetch_one(&self.pool)
            .await?;

        let symbols: Vec<(String, i64)> = sqlx::query_as(
            "SELECT symbol, COUNT(*) FROM price_history GROUP BY symbol",
        )
        .fetch_all(&self.pool)
        .await?;

        let sources: Vec<(String, i64)> = sqlx::query_as(
            "SELECT source, COUNT(*) FROM price_history GROUP BY source",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(StoreStats {
            total_records,
            symbols: symbols.into_iter().collect(),
            sources: sources.into_iter().collect(),
        })
    }

    async fn write_lock(&self, key: &WriteKey) -> Arc<Mutex<()>> {
        if let Some(lock) = self.write_locks.read().await.get(key) {
            return lock.clone();
        }
        self.write_locks
            .write()
            .await
            .entry(key.clone())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }
}

/// `len >= ratio * (end - start) / interval_seconds`, with an empty series
/// never counting as sufficient.
pub fn is_sufficient(len: usize, start: i64, end: i64, interval: Interval, ratio: f64) -> bool {
    if len == 0 {
        return false;
    }
    let expected = (end - start).max(0) / interval.seconds();
    // tolerance keeps exact products like 0.8 * 720 from rounding against us
    len as f64 + 1e-9 >= expected as f64 * ratio
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn store() -> CandleStore {
        let pool = shared::get_memory_pool().await.unwrap();
        CandleStore::new(pool, &PipelineConfig::default()).await.unwrap()
    }

    fn bar(ts: i64, close: f64, source: &str) -> Candle {
        Candle::new("BTC", ts, close, close + 2.0, close - 2.0, close, 5.0, Interval::OneHour, source)
    }

    #[test]
    fn test_sufficiency_threshold() {
        // 30 days of hourly bars: 720 expected, 576 required
        let (start, end) = (0, 30 * 86_400);
        assert!(is_sufficient(576, start, end, Interval::OneHour, 0.8));
        assert!(!is_sufficient(575, start, end, Interval::OneHour, 0.8));
        assert!(!is_sufficient(0, start, end, Interval::OneHour, 0.8));
    }

    #[tokio::test]
    async fn test_upsert_is_idempotent() {
        let store = store().await;
        let series = CandleSeries::from_unsorted((0..5).map(|i| bar(i * 3600, 100.0 + i as f64, "Binance")).collect());

        store.upsert(&series).await.unwrap();
        store.upsert(&series).await.unwrap();

        let read = store.query("BTC", Interval::OneHour, 0, 10 * 3600).await.unwrap();
        assert_eq!(read, series);
        assert_eq!(store.stats().await.unwrap().total_records, 5);
    }

    #[tokio::test]
    async fn test_upsert_overwrites_values() {
        let store = store().await;
        store.upsert(&vec![bar(3600, 100.0, "Binance")].into()).await.unwrap();
        store.upsert(&vec![bar(3600, 150.0, "Binance")].into()).await.unwrap();

        let read = store.query("BTC", Interval::OneHour, 0, 7200).await.unwrap();
        assert_eq!(read.len(), 1);
        assert_eq!(read.candles()[0].close, 150.0);
    }

    #[tokio::test]
    async fn test_sources_kept_apart_but_query_stays_unique() {
        let store = store().await;
        store.upsert(&vec![bar(3600, 100.0, "Binance")].into()).await.unwrap();
        store.upsert(&vec![bar(3600, 101.0, "OKX")].into()).await.unwrap();

        let stats = store.stats().await.unwrap();
        assert_eq!(stats.total_records, 2);
        assert_eq!(stats.sources.get("OKX"), Some(&1));

        let read = store.query("BTC", Interval::OneHour, 0, 7200).await.unwrap();
        assert_eq!(read.len(), 1);
    }

    #[tokio::test]
    async fn test_query_filters_range_and_interval() {
        let store = store().await;
        let hourly: CandleSeries = (0..10).map(|i| bar(i * 3600, 100.0, "Binance")).collect::<Vec<_>>().into();
        store.upsert(&hourly).await.unwrap();

        let mut daily = bar(0, 100.0, "Binance");
        daily.interval = Interval::OneDay;
        store.upsert(&vec![daily].into()).await.unwrap();

        let read = store.query("BTC", Interval::OneHour, 2 * 3600, 5 * 3600).await.unwrap();
        let stamps: Vec<i64> = read.candles().iter().map(|c| c.timestamp).collect();
        assert_eq!(stamps, vec![7200, 10800, 14400, 18000]);
        assert!(store.query("ETH", Interval::OneHour, 0, 36_000).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_purge_older_than() {
        let store = store().await;
        let series: CandleSeries = (0..10).map(|i| bar(i * 3600, 100.0, "Binance")).collect::<Vec<_>>().into();
        store.upsert(&series).await.unwrap();

        let removed = store.purge_older_than(4 * 3600).await.unwrap();
        assert_eq!(removed, 4);
        assert_eq!(store.stats().await.unwrap().total_records, 6);
    }

    #[tokio::test]
    async fn test_concurrent_upserts_of_one_key() {
        // file-backed so the writers really hold separate connections
        let path = std::env::temp_dir().join(format!(
            "candles-{}-{}.db",
            std::process::id(),
            chrono::Utc::now().timestamp_nanos_opt().unwrap_or_default()
        ));
        let url = format!("sqlite://{}", path.display());
        let store = Arc::new(CandleStore::connect(&url, &PipelineConfig::default()).await.unwrap());

        // eight overlapping windows over bars 0..28
        let writers: Vec<_> = (0..8)
            .map(|w| {
                let store = store.clone();
                tokio::spawn(async move {
                    let series: CandleSeries = (w..w + 20)
                        .map(|i| bar(i * 3600, 100.0 + w as f64, "Binance"))
                        .collect::<Vec<_>>()
                        .into();
                    store.upsert(&series).await
                })
            })
            .collect();

        for written in futures::future::join_all(writers).await {
            assert_eq!(written.unwrap().unwrap(), 20);
        }

        let read = store.query("BTC", Interval::OneHour, 0, 100 * 3600).await.unwrap();
        assert_eq!(read.len(), 28);
        assert_eq!(store.stats().await.unwrap().total_records, 28);

        drop(store);
        for suffix in ["", "-wal", "-shm"] {
            let _ = std::fs::remove_file(format!("{}{}", path.display(), suffix));
        }
    }
}
