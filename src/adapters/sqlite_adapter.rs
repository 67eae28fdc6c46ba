//! SQLite price store.
//!
//! One row per (date, ticker) in the `price` table. Writes are upserts so a
//! repeated daily update replaces the stored close.

use crate::domain::error::DualmomError;
use crate::domain::price::PriceObservation;
use crate::ports::config_port::ConfigPort;
use crate::ports::data_port::DataPort;
use chrono::NaiveDate;
use r2d2::{Pool, PooledConnection};
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::params;

pub struct SqliteAdapter {
    pool: Pool<SqliteConnectionManager>,
}

fn query_error(e: rusqlite::Error) -> DualmomError {
    DualmomError::DatabaseQuery {
        reason: e.to_string(),
    }
}

fn parse_date(value: &str) -> Result<NaiveDate, DualmomError> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d").map_err(|e| DualmomError::Database {
        reason: format!("invalid stored date {:?}: {}", value, e),
    })
}

impl SqliteAdapter {
    pub fn from_config(config: &dyn ConfigPort) -> Result<Self, DualmomError> {
        let db_path =
            config
                .get_string("sqlite", "path")
                .ok_or_else(|| DualmomError::ConfigMissing {
                    section: "sqlite".into(),
                    key: "path".into(),
                })?;

        let pool_size = match u32::try_from(config.get_int("sqlite", "pool_size", 4)) {
            Ok(n) if n >= 1 => n,
            _ => {
                return Err(DualmomError::ConfigInvalid {
                    section: "sqlite".into(),
                    key: "pool_size".into(),
                    reason: format!("pool_size must be between 1 and {}", u32::MAX),
                });
            }
        };

        let manager = SqliteConnectionManager::file(&db_path);
        let pool = Pool::builder()
            .max_size(pool_size)
            .build(manager)
            .map_err(|e: r2d2::Error| DualmomError::Database {
                reason: e.to_string(),
            })?;

        let adapter = Self { pool };
        adapter.initialize_schema()?;
        Ok(adapter)
    }

    pub fn in_memory() -> Result<Self, DualmomError> {
        let manager = SqliteConnectionManager::memory();
        let pool = Pool::builder()
            .max_size(1)
            .build(manager)
            .map_err(|e: r2d2::Error| DualmomError::Database {
                reason: e.to_string(),
            })?;

        Ok(Self { pool })
    }

    fn conn(&self) -> Result<PooledConnection<SqliteConnectionManager>, DualmomError> {
        self.pool.get().map_err(|e: r2d2::Error| DualmomError::Database {
            reason: e.to_string(),
        })
    }

    pub fn initialize_schema(&self) -> Result<(), DualmomError> {
        self.conn()?
            .execute_batch(
                "CREATE TABLE IF NOT EXISTS price (
                    date TEXT NOT NULL,
                    ticker TEXT NOT NULL,
                    price REAL NOT NULL,
                    PRIMARY KEY (date, ticker)
                );
                CREATE INDEX IF NOT EXISTS idx_price_ticker ON price(ticker);",
            )
            .map_err(query_error)
    }

    /// Insert or replace each observation in one transaction. Returns rows written.
    pub fn upsert_prices(&self, prices: &[PriceObservation]) -> Result<usize, DualmomError> {
        let mut conn = self.conn()?;
        let tx = conn.transaction().map_err(query_error)?;

        for obs in prices {
            tx.execute(
                "INSERT OR REPLACE INTO price (date, ticker, price) VALUES (?1, ?2, ?3)",
                params![obs.date.format("%Y-%m-%d").to_string(), obs.symbol, obs.price],
            )
            .map_err(query_error)?;
        }

        tx.commit().map_err(query_error)?;
        tracing::debug!(rows = prices.len(), "upserted prices");
        Ok(prices.len())
    }
}

impl DataPort for SqliteAdapter {
    fn fetch_prices(
        &self,
        symbol: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<Vec<PriceObservation>, DualmomError> {
        let conn = self.conn()?;
        let mut stmt = conn
            .prepare(
                "SELECT date, price FROM price
                 WHERE ticker = ?1 AND date >= ?2 AND date <= ?3
                 ORDER BY date ASC",
            )
            .map_err(query_error)?;

        let rows = stmt
            .query_map(
                params![
                    symbol,
                    start_date.format("%Y-%m-%d").to_string(),
                    end_date.format("%Y-%m-%d").to_string()
                ],
                |row| Ok((row.get::<_, String>(0)?, row.get::<_, f64>(1)?)),
            )
            .map_err(query_error)?;

        let mut prices = Vec::new();
        for row in rows {
            let (date_str, price) = row.map_err(query_error)?;
            prices.push(PriceObservation::new(symbol, parse_date(&date_str)?, price));
        }
        Ok(prices)
    }

    fn list_symbols(&self) -> Result<Vec<String>, DualmomError> {
        let conn = self.conn()?;
        let mut stmt = conn
            .prepare("SELECT DISTINCT ticker FROM price ORDER BY ticker")
            .map_err(query_error)?;
        let rows = stmt.query_map([], |row| row.get(0)).map_err(query_error)?;

        let mut symbols = Vec::new();
        for row in rows {
            symbols.push(row.map_err(query_error)?);
        }
        Ok(symbols)
    }

    fn get_data_range(
        &self,
        symbol: &str,
    ) -> Result<Option<(NaiveDate, NaiveDate, usize)>, DualmomError> {
        let conn = self.conn()?;
        let (min, max, count): (Option<String>, Option<String>, i64) = conn
            .query_row(
                "SELECT MIN(date), MAX(date), COUNT(*) FROM price WHERE ticker = ?1",
                params![symbol],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
            )
            .map_err(query_error)?;

        match (min, max) {
            (Some(min), Some(max)) if count > 0 => {
                Ok(Some((parse_date(&min)?, parse_date(&max)?, count as usize)))
            }
            _ => Ok(None),
        }
    }
}
