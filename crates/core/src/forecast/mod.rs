//! End-of-event spend forecast.

pub mod engine;
pub mod types;


pub use engine::ForecastEngine;
pub use types::{CategoryForecast, ConfidenceWindow, ForecastReport};
