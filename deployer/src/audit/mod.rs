//! Compliance audit
//!
//! Read-only checks of a device against a baseline hardening policy. Each check
//! is one query whose printed value is compared against the expected one.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::errors::DeployerError;
use crate::session::{RemoteSession, SessionConnector, Target};

pub const ADMIN_USER_QUERY: &str = r#"/user print count-only where name="admin""#;
pub const TELNET_ENABLED_QUERY: &str =
    r#"/ip service print count-only where name="telnet" and disabled=no"#;
pub const WWW_ENABLED_QUERY: &str = r#"/ip service print count-only where name="www" and disabled=no"#;
pub const DNS_REMOTE_QUERY: &str = "/ip dns get allow-remote-requests";
pub const INPUT_DROP_QUERY: &str =
    r#"/ip firewall filter print count-only where action="drop" and chain="input""#;

/// Default connect timeout for a scan
pub const AUDIT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum CheckStatus {
    Pass,
    Fail,
    /// Reported but does not fail the report
    Warning,
}

/// Result of one check
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComplianceCheck {
    pub name: String,
    pub description: String,
    pub status: CheckStatus,
    pub details: String,
}

impl ComplianceCheck {
    fn new(name: &str, description: &str, status: CheckStatus, details: impl Into<String>) -> Self {
        Self {
            name: name.to_string(),
            description: description.to_string(),
            status,
            details: details.into(),
        }
    }
}

/// Result of a scan
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComplianceReport {
    pub target_ip: String,
    pub timestamp: DateTime<Utc>,
    pub passed: bool,
    pub checks: Vec<ComplianceCheck>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ComplianceReport {
    fn new(target_ip: &str) -> Self {
        Self {
            target_ip: target_ip.to_string(),
            timestamp: Utc::now(),
            passed: true,
            checks: Vec::new(),
            error: None,
        }
    }

    fn push(&mut self, check: ComplianceCheck) {
        if check.status == CheckStatus::Fail {
            self.passed = false;
        }
        self.checks.push(check);
    }

    fn fail(&mut self, error: String) {
        self.passed = false;
        self.error = Some(error);
    }
}

/// Scan `target` and build its report. Never fails: connection and query
/// errors end up in the report.
pub async fn run_compliance_scan<C: SessionConnector>(
    connector: &C,
    target: &Target,
    connect_timeout: Duration,
) -> ComplianceReport {
    let mut report = ComplianceReport::new(&target.host);

    let mut session = match connector.connect(target, connect_timeout).await {
        Ok(session) => session,
        Err(e) => {
            warn!("Audit connection to {} failed: {}", target, e);
            report.fail("Could not connect to device.".to_string());
            return report;
        }
    };

    info!("Running compliance scan on {}", target);
    if let Err(e) = run_checks(&mut session, &mut report).await {
        report.fail(format!("Error during scan: {}", e));
    }

    if let Err(e) = session.close().await {
        debug!("Ignoring close error after audit: {}", e);
    }

    report
}

async fn run_checks<S: RemoteSession + ?Sized>(
    session: &mut S,
    report: &mut ComplianceReport,
) -> Result<(), DeployerError> {
    let admin = query(session, ADMIN_USER_QUERY).await?;
    report.push(admin_check(&admin));

    let telnet = query(session, TELNET_ENABLED_QUERY).await?;
    let www = query(session, WWW_ENABLED_QUERY).await?;
    report.push(services_check(&telnet, &www));

    let dns = query(session, DNS_REMOTE_QUERY).await?;
    report.push(dns_check(&dns));

    let drops = query(session, INPUT_DROP_QUERY).await?;
    report.push(firewall_check(&drops));

    Ok(())
}

async fn query<S: RemoteSession + ?Sized>(session: &mut S, command: &str) -> Result<String, DeployerError> {
    let output = session.exec(command).await.map_err(DeployerError::from_session)?;
    Ok(output.stdout.trim().to_string())
}

fn admin_check(count: &str) -> ComplianceCheck {
    const NAME: &str = "Admin User Check";
    const DESCRIPTION: &str = "Checks if the default 'admin' user exists.";

    if count == "1" {
        ComplianceCheck::new(
            NAME,
            DESCRIPTION,
            CheckStatus::Fail,
            "Default 'admin' user found. Disable or rename it.",
        )
    } else {
        ComplianceCheck::new(NAME, DESCRIPTION, CheckStatus::Pass, "Default 'admin' user not found.")
    }
}

fn services_check(telnet: &str, www: &str) -> ComplianceCheck {
    const NAME: &str = "Insecure Services Check";
    const DESCRIPTION: &str = "Checks if Telnet or HTTP (Unencrypted) are enabled.";

    let mut enabled = Vec::new();
    if telnet == "1" {
        enabled.push("Telnet ENABLED");
    }
    if www == "1" {
        enabled.push("HTTP (www) ENABLED");
    }

    if enabled.is_empty() {
        ComplianceCheck::new(NAME, DESCRIPTION, CheckStatus::Pass, "Telnet and HTTP are disabled.")
    } else {
        ComplianceCheck::new(
            NAME,
            DESCRIPTION,
            CheckStatus::Fail,
            format!("{}. Disable them immediately.", enabled.join(", ")),
        )
    }
}

fn dns_check(value: &str) -> ComplianceCheck {
    const NAME: &str = "DNS Recursion Check";
    const DESCRIPTION: &str = "Checks if the router is acting as an open DNS resolver.";

    if value == "true" || value == "yes" {
        ComplianceCheck::new(
            NAME,
            DESCRIPTION,
            CheckStatus::Warning,
            "DNS allow-remote-requests is TRUE. Ensure firewall protects UDP/53 from WAN.",
        )
    } else {
        ComplianceCheck::new(NAME, DESCRIPTION, CheckStatus::Pass, "DNS remote requests disabled.")
    }
}

fn firewall_check(count: &str) -> ComplianceCheck {
    const NAME: &str = "Firewall Input Drop";
    const DESCRIPTION: &str = "Checks for at least one Drop rule in the Input chain.";

    match count.parse::<u64>().unwrap_or(0) {
        0 => ComplianceCheck::new(
            NAME,
            DESCRIPTION,
            CheckStatus::Fail,
            "No DROP rules found in Input chain. Router Management is likely exposed.",
        ),
        n => ComplianceCheck::new(
            NAME,
            DESCRIPTION,
            CheckStatus::Pass,
            format!("Found {} drop rules in Input chain.", n),
        ),
    }
}
