//! Infrastructure layer module
//!
//! Adapters for everything outside the process:
//! - ACP SDK bridge client
//! - Upstream analysis API client
//! - Configuration loading
//! - Logging
//! - Monitoring HTTP server
//!
//! Infrastructure implementations satisfy the port traits defined in the domain layer.

pub mod acp;
pub mod config;
pub mod logging;
pub mod monitoring;
pub mod upstream;
