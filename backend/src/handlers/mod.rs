//! HTTP handlers

mod availability;
mod batch;
mod day;
mod expiry;
mod health;
mod stock;

pub use availability::*;
pub use batch::*;
pub use day::*;
pub use expiry::*;
pub use health::*;
pub use stock::*;

use chrono::{NaiveDate, Utc};

use crate::error::AppResult;

/// Operating day used when a request does not name one
pub(crate) fn today() -> NaiveDate {
    Utc::now().date_naive()
}

/// Operating day from a `YYYY-MM-DD` path segment
pub(crate) fn operating_date(raw: &str) -> AppResult<NaiveDate> {
    Ok(shared::parse_operating_date(raw)?)
}
