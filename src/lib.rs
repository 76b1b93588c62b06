//! MANDI — Market Aggregation & News Data Intelligence
//!
//! Library crate exposing all modules for use by integration tests
//! and the binary entry point.

pub mod config;
pub mod types;
pub mod market;
pub mod sources;
pub mod engine;
pub mod cache;
pub mod dashboard;
