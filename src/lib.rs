//! AANKOOPKOMPAS: house price estimator and bid calculator for France
//!
//! Library crate exposing all modules for use by integration tests
//! and the binary entry point.

pub mod api;
pub mod config;
pub mod estimator;
pub mod registry;
pub mod types;
pub mod valuation;
