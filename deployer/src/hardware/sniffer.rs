//! Packet sniffer streaming

/// UDP port Wireshark listens on for TZSP
pub const TZSP_DEFAULT_PORT: u16 = 37008;

/// `/tool sniffer` configuration streaming `interface` traffic as TZSP to
/// `target_ip` on [`TZSP_DEFAULT_PORT`]
pub fn tzsp_stream_config(target_ip: &str, interface: &str) -> String {
    [
        "/tool sniffer".to_string(),
        "set streaming-enabled=yes \\".to_string(),
        format!("    streaming-server={} \\", target_ip),
        format!("    filter-interface={} \\", interface),
        "    filter-stream=yes \\".to_string(),
        "    memory-limit=100kiB \\".to_string(),
        "    only-headers=no".to_string(),
    ]
    .join("\n")
}
