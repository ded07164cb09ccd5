//! Titan Deployer Library
//!
//! Safe configuration deployment and recovery for RouterOS appliances over
//! SSH: a script is uploaded and handed to the device's scheduler so the
//! session can be closed before the change cuts it off, after which the device
//! is awaited at its post-change address.

pub mod app;
pub mod audit;
pub mod deploy;
pub mod errors;
pub mod filesys;
pub mod hardware;
pub mod logs;
pub mod probe;
pub mod safety;
pub mod session;
pub mod status;
pub mod storage;
pub mod telemetry;
pub mod utils;
pub mod workers;
