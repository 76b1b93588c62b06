//! Refresh engine — trigger → resolve → commit.

pub mod coordinator;
pub mod resolver;
pub mod scheduler;
