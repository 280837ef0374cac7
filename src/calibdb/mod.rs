//! Client for the calibdb.net calibration query service.

mod client;
#[cfg(test)]
pub(crate) mod mock;
mod types;

pub use client::{default_user_agent, CalibDbClient};
pub use types::{CalibrationPayload, CalibrationRequest, CalibrationResponse};
