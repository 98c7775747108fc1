//! Business logic services for kitchen stock

pub mod availability;
pub mod batch;
pub mod day;
pub mod expiry;
pub mod stock;
pub mod waste;

pub use availability::AvailabilityService;
pub use batch::BatchService;
pub use day::DayService;
pub use expiry::ExpiryService;
pub use stock::StockService;
pub use waste::WasteService;
