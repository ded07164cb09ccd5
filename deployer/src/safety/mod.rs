//! Dead-man's-switch protection for unattended command batches
//!
//! [`wrap_in_safe_mode`] turns a list of RouterOS commands into a script that
//! arms a reboot before running them and disarms it only once they all
//! succeed. If the commands fail or cut the operator off, the device
//! reboots and comes back online on its own.
//!
//! RouterOS commits configuration as soon as a command runs. The reboot
//! therefore restores reachability (runtime state such as interface flaps is
//! reset) but does **not** revert configuration that was already applied.

pub mod switch;
pub mod wrapper;

pub use switch::{DeadMansSwitch, SwitchState};
pub use wrapper::{wrap_in_safe_mode, SafetyScript};
