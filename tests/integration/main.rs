//! Integration test harness.
//!
//! `mock_source` provides a scripted in-memory adapter; `refresh_flow`
//! drives full refresh cycles through the public engine API.

mod mock_source;
mod refresh_flow;
