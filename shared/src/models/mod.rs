//! Domain models for kitchen stock tracking

mod availability;
mod batch;
mod day;
mod expiry;
mod stock;
mod waste;

pub use availability::*;
pub use batch::*;
pub use day::*;
pub use expiry::*;
pub use stock::*;
pub use waste::*;
