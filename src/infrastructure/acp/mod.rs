//! Protocol SDK bridge adapter.

pub mod bridge_client;

pub use bridge_client::AcpBridgeClient;
