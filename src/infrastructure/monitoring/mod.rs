//! Monitoring HTTP surface and job event intake.

pub mod http_server;

pub use http_server::{build_router, MonitoringServer, MonitoringState, ServiceInfo};
