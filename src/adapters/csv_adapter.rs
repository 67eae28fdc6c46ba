//! CSV price file adapter.
//!
//! A directory holds one `<SYMBOL>.csv` per instrument with `date,price`
//! columns. [`read_price_sheet`] reads the long `date,ticker,price` layout
//! used for bulk imports.

use crate::domain::error::DualmomError;
use crate::domain::price::PriceObservation;
use crate::ports::data_port::DataPort;
use chrono::NaiveDate;
use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};

pub struct CsvAdapter {
    base_path: PathBuf,
}

impl CsvAdapter {
    pub fn new(base_path: PathBuf) -> Self {
        Self { base_path }
    }

    fn csv_path(&self, symbol: &str) -> PathBuf {
        self.base_path.join(format!("{}.csv", symbol))
    }

    fn read_symbol(&self, symbol: &str) -> Result<Vec<PriceObservation>, DualmomError> {
        let path = self.csv_path(symbol);
        if !path.exists() {
            return Ok(Vec::new());
        }
        let file = fs::File::open(&path).map_err(|e| DualmomError::PriceData {
            reason: format!("failed to read {}: {}", path.display(), e),
        })?;
        let mut prices = parse_prices(file, Some(symbol))?;
        prices.sort_by_key(|p| p.date);
        Ok(prices)
    }
}

fn column(headers: &csv::StringRecord, name: &str) -> Result<usize, DualmomError> {
    headers
        .iter()
        .position(|h| h.trim().eq_ignore_ascii_case(name))
        .ok_or_else(|| DualmomError::PriceData {
            reason: format!("missing {} column", name),
        })
}

/// Parse price rows. With `symbol` set, rows need no ticker column.
fn parse_prices<R: Read>(
    reader: R,
    symbol: Option<&str>,
) -> Result<Vec<PriceObservation>, DualmomError> {
    let mut rdr = csv::Reader::from_reader(reader);
    let headers = rdr
        .headers()
        .map_err(|e| DualmomError::PriceData {
            reason: format!("CSV header error: {}", e),
        })?
        .clone();

    let date_col = column(&headers, "date")?;
    let price_col = column(&headers, "price")?;
    let ticker_col = match symbol {
        Some(_) => None,
        None => Some(column(&headers, "ticker")?),
    };

    let mut prices = Vec::new();
    for result in rdr.records() {
        let record = result.map_err(|e| DualmomError::PriceData {
            reason: format!("CSV parse error: {}", e),
        })?;

        let date_str = record.get(date_col).unwrap_or_default().trim();
        let date = NaiveDate::parse_from_str(date_str, "%Y-%m-%d").map_err(|e| {
            DualmomError::PriceData {
                reason: format!("invalid date {:?}: {}", date_str, e),
            }
        })?;

        let price_str = record.get(price_col).unwrap_or_default().trim();
        let price: f64 = price_str
            .replace(',', "")
            .parse()
            .map_err(|e| DualmomError::PriceData {
                reason: format!("invalid price {:?}: {}", price_str, e),
            })?;

        let row_symbol = match (symbol, ticker_col) {
            (Some(s), _) => s.to_string(),
            (None, Some(col)) => record.get(col).unwrap_or_default().trim().to_uppercase(),
            (None, None) => String::new(),
        };
        if row_symbol.is_empty() {
            return Err(DualmomError::PriceData {
                reason: format!("empty ticker on {}", date),
            });
        }

        prices.push(PriceObservation::new(row_symbol, date, price));
    }

    Ok(prices)
}

/// Read a long-format `date,ticker,price` sheet.
pub fn read_price_sheet(path: &Path) -> Result<Vec<PriceObservation>, DualmomError> {
    let file = fs::File::open(path).map_err(|e| DualmomError::PriceData {
        reason: format!("failed to read {}: {}", path.display(), e),
    })?;
    parse_prices(file, None)
}

impl DataPort for CsvAdapter {
    fn fetch_prices(
        &self,
        symbol: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<Vec<PriceObservation>, DualmomError> {
        Ok(self
            .read_symbol(symbol)?
            .into_iter()
            .filter(|p| p.date >= start_date && p.date <= end_date)
            .collect())
    }

    fn list_symbols(&self) -> Result<Vec<String>, DualmomError> {
        let entries = fs::read_dir(&self.base_path).map_err(|e| DualmomError::PriceData {
            reason: format!(
                "failed to read directory {}: {}",
                self.base_path.display(),
                e
            ),
        })?;

        let mut symbols = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| DualmomError::PriceData {
                reason: format!("directory entry error: {}", e),
            })?;
            let name = entry.file_name();
            if let Some(symbol) = name.to_string_lossy().strip_suffix(".csv") {
                symbols.push(symbol.to_string());
            }
        }

        symbols.sort();
        Ok(symbols)
    }

    fn get_data_range(
        &self,
        symbol: &str,
    ) -> Result<Option<(NaiveDate, NaiveDate, usize)>, DualmomError> {
        let prices = self.read_symbol(symbol)?;
        match (prices.first(), prices.last()) {
            (Some(first), Some(last)) => Ok(Some((first.date, last.date, prices.len()))),
            _ => Ok(None),
        }
    }
}
