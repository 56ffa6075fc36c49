//! Domain layer: job and service models, error taxonomy and the ports the
//! lifecycle handler depends on.

pub mod errors;
pub mod models;
pub mod ports;
