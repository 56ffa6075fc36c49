//! Command handlers. Each is a thin adapter over the application and
//! service layers.

pub mod classify;
pub mod fetch;
pub mod serve;
