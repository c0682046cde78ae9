//! Concierge - Hotel Bookings Insights Service
//!
//! Loads a cleaned hotel-bookings dataset, precomputes monthly revenue
//! insights, indexes row summaries for nearest-neighbour retrieval, and
//! answers free-text questions over HTTP.

pub mod cli;
pub mod config;
pub mod logs;
pub mod server;
