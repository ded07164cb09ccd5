//! Safety wrapper tests

use std::collections::HashSet;

use titan_deployer::safety::{wrap_in_safe_mode, DeadMansSwitch, SwitchState};

#[test]
fn test_arm_precedes_commands_precede_disarm() {
    let commands = [
        "/ip address add address=10.0.0.1/24 interface=ether2",
        "/ip route add gateway=10.0.0.254",
    ];
    let script = wrap_in_safe_mode(&commands).unwrap();
    let text = &script.text;

    let arm = text.find("/system scheduler add").unwrap();
    let first = text.find(commands[0]).unwrap();
    let second = text.find(commands[1]).unwrap();
    let disarm = text.find("/system scheduler remove").unwrap();
    assert!(arm < first && first < second && second < disarm);
}

#[test]
fn test_arm_and_disarm_share_the_schedule_name() {
    let script = wrap_in_safe_mode(&["/system identity set name=core"]).unwrap();
    let name = &script.schedule_name;

    assert!(name.starts_with("SAFE_MODE_ROLLBACK_"));
    assert!(script.text.contains(&format!(
        "/system scheduler add name=\"{}\" interval=4m on-event=\"/system reboot\" start-time=startup",
        name
    )));
    assert!(script
        .text
        .contains(&format!("/system scheduler remove [find name=\"{}\"]", name)));
}

#[test]
fn test_guarded_block_raises_on_error() {
    let script = wrap_in_safe_mode(&["/interface disable ether1"]).unwrap();
    assert!(script.text.contains(":do {\n/interface disable ether1\n} on-error={"));
    assert!(script.text.contains(":error \"Script execution failed.\""));
}

#[test]
fn test_every_wrap_gets_a_new_name() {
    let names: HashSet<String> = (0..50)
        .map(|_| wrap_in_safe_mode(&["/log info x"]).unwrap().schedule_name)
        .collect();
    assert_eq!(names.len(), 50);
}

#[test]
fn test_empty_command_list_still_arms_and_disarms() {
    let script = wrap_in_safe_mode::<&str>(&[]).unwrap();
    assert!(script.text.contains("/system scheduler add"));
    assert!(script.text.contains("/system scheduler remove"));
}

#[test]
fn test_switch_disarms_once() {
    let mut switch = DeadMansSwitch::arm();
    assert!(switch.disarm().is_ok());
    assert_eq!(switch.state(), SwitchState::Disarmed);
    assert!(switch.disarm().is_err());
}
