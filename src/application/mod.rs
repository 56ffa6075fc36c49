//! Application layer: process wiring and lifecycle.

pub mod runtime;

pub use runtime::{wait_idle, AgentRuntime};
