//! Metadump - Frame Telemetry Delivery
//!
//! Serializes per-frame analysis results to JSON and delivers them to a
//! remote collector over UDP, TCP or HTTP without blocking the frame loop.

pub mod config;
pub mod dump;
pub mod error;
pub mod http;
pub mod json;
pub mod reactor;
pub mod transport;

pub use error::{Error, Result};
