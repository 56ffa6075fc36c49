//! Upstream analysis API client.

pub mod client;

pub use client::{UpstreamClient, UpstreamClientConfig};
