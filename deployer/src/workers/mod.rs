//! Background workers

pub mod traffic;
