//! Safety-wrapped script generation

use crate::errors::DeployerError;
use crate::safety::switch::{DeadMansSwitch, SwitchState};

/// A generated safe-mode script
#[derive(Debug, Clone)]
pub struct SafetyScript {
    /// Name of the reboot schedule armed (and, on success, removed) by the script
    pub schedule_name: String,

    /// Script text, ready to upload or paste into a terminal
    pub text: String,
}

/// Wrap `commands` in the arm / guarded-run / disarm pattern.
///
/// The commands are inserted verbatim and in order. On error the script logs,
/// raises `:error` so the interpreter records a failed run, and leaves the
/// reboot armed. Every call picks a new schedule name.
pub fn wrap_in_safe_mode<S: AsRef<str>>(commands: &[S]) -> Result<SafetyScript, DeployerError> {
    let mut switch = DeadMansSwitch::arm();
    let schedule_name = switch.schedule_name().to_string();
    let arm = switch.arm_command();

    let block = commands
        .iter()
        .map(|c| c.as_ref())
        .collect::<Vec<_>>()
        .join("\n");

    let disarm = switch.disarm()?;
    debug_assert_eq!(switch.state(), SwitchState::Disarmed);

    let text = format!(
        "# --- SAFE MODE WRAPPER ({name}) ---\n\
         :log warning \"SAFE MODE: Scheduling safety reboot in 4 minutes...\"\n\
         {arm}\n\
         \n\
         # --- BEGIN CONFIGURATION ---\n\
         :do {{\n\
         {block}\n\
         }} on-error={{\n\
         \x20   :log error \"SAFE MODE: Script execution failed! Reboot scheduler remains active.\"\n\
         \x20   :error \"Script execution failed.\"\n\
         }}\n\
         # --- END CONFIGURATION ---\n\
         \n\
         :log info \"SAFE MODE: Success! Removing safety reboot scheduler.\"\n\
         {disarm}\n",
        name = schedule_name,
    );

    Ok(SafetyScript { schedule_name, text })
}
