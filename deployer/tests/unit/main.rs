//! Integration tests for the deployer library

mod common;

mod test_audit;
mod test_fsm;
mod test_probe;
mod test_reset;
mod test_safety;
mod test_traffic;
