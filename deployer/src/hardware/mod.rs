//! Hardware capability checks and device-side tooling commands

pub mod bridge;
pub mod sniffer;

pub use bridge::{validate_bridge_config, BridgeValidation};
pub use sniffer::{tzsp_stream_config, TZSP_DEFAULT_PORT};
