//! Price history access port.

use crate::domain::error::DualmomError;
use crate::domain::price::PriceObservation;
use chrono::NaiveDate;

pub trait DataPort {
    /// Observations for `symbol` within `start_date..=end_date`, oldest first.
    ///
    /// An unknown symbol yields an empty vector, not an error.
    fn fetch_prices(
        &self,
        symbol: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<Vec<PriceObservation>, DualmomError>;

    fn list_symbols(&self) -> Result<Vec<String>, DualmomError>;

    /// First date, last date and row count, or `None` when the symbol has no rows.
    fn get_data_range(
        &self,
        symbol: &str,
    ) -> Result<Option<(NaiveDate, NaiveDate, usize)>, DualmomError>;
}
