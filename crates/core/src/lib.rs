//! Domain logic for the surety provisioning client.
//!
//! Pure types and functions with no I/O: job configuration and status,
//! the monitor lifecycle, input schema checks, provision derivation,
//! result payloads, chart-series synthesis and method comparison.

pub mod comparison;
pub mod error;
pub mod job;
pub mod lifecycle;
pub mod provision;
pub mod results;
pub mod schema;
pub mod synth;
pub mod types;
