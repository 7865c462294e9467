//! PiBourse Client Library
//!
//! Price charts, simulation clock and time-travel sessions for the PiBourse
//! stock market game backend

pub mod api;
pub mod chart;
pub mod clock;
pub mod config;
pub mod logging;
pub mod time_travel;
pub mod types;
