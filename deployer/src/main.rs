//! Titan Deployer - Entry Point
//!
//! Deploys configuration scripts to RouterOS appliances without losing them
//! when the change cuts the management session, and recovers them with a
//! factory reset when needed.

use std::collections::HashMap;
use std::env;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, Context};
use colored::Colorize;
use futures::FutureExt;
use tokio::task::JoinHandle;
use tracing::{error, info};

use titan_deployer::app::options::AppOptions;
use titan_deployer::audit::{run_compliance_scan, AUDIT_CONNECT_TIMEOUT};
use titan_deployer::deploy::{DeploymentRequest, Deployer, Resetter, ScriptPayload};
use titan_deployer::hardware::{tzsp_stream_config, validate_bridge_config};
use titan_deployer::logs::{init_logging, LogOptions};
use titan_deployer::probe::{Reachability, TcpProbe};
use titan_deployer::safety::wrap_in_safe_mode;
use titan_deployer::session::openssh::OpenSshConnector;
use titan_deployer::session::{Credentials, Target};
use titan_deployer::status::{Recorder, StatusLevel, StatusReceiver, StatusSink};
use titan_deployer::storage::layout::StorageLayout;
use titan_deployer::storage::settings::Settings;
use titan_deployer::utils::version_info;
use titan_deployer::workers::traffic::{self, TrafficMonitor};

/// Environment variable holding the device password
const PASSWORD_ENV: &str = "TITAN_PASSWORD";

const USAGE: &str = "\
usage: titan [--settings=<file>] <command>

commands:
  --version
  --deploy=<script> --host=<ip> [--new-host=<ip>] [--heavy] [--safe]
  --reset --host=<ip>
  --audit --host=<ip>
  --probe=<ip> [--timeout=<secs>]
  --monitor --host=<ip> [--interface=<name>]
  --wrap=<commands file>
  --validate-bridge=<model> --bridges=<n>
  --tzsp=<collector ip> --interface=<name>

connection flags: --user=<name> (default admin), --port=<n>, --identity=<file>
the password is read from TITAN_PASSWORD";

#[tokio::main]
async fn main() {
    // Parse command line arguments
    let args: Vec<String> = env::args().collect();
    let mut cli_args: HashMap<String, String> = HashMap::new();

    for arg in args.iter().skip(1) {
        if let Some((key, value)) = arg.split_once('=') {
            let clean_key = key.trim_start_matches('-');
            cli_args.insert(clean_key.to_string(), value.to_string());
        } else if arg.starts_with("--") {
            let clean_key = arg.trim_start_matches('-');
            cli_args.insert(clean_key.to_string(), "true".to_string());
        }
    }

    // Print version and exit
    if cli_args.contains_key("version") {
        match serde_json::to_string_pretty(&version_info()) {
            Ok(json) => println!("{}", json),
            Err(e) => eprintln!("{}", e),
        }
        return;
    }

    // Retrieve the settings file
    let layout = match cli_args.get("settings") {
        Some(path) => StorageLayout::for_settings_file(Path::new(path)),
        None => StorageLayout::default(),
    };
    let settings_file = match cli_args.get("settings") {
        Some(path) => titan_deployer::filesys::file::File::new(path),
        None => layout.settings_file(),
    };
    let settings = match Settings::load(&settings_file).await {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!("Unable to read settings file: {}", e);
            std::process::exit(2);
        }
    };

    // Initialize logging
    let log_options = LogOptions {
        log_level: settings.log_level.clone(),
        json_format: settings.json_logs,
        log_dir: settings
            .log_to_file
            .then(|| layout.logs_dir().path().to_path_buf()),
        ..Default::default()
    };
    let _log_guard = match init_logging(log_options) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("Failed to initialize logging: {e}");
            None
        }
    };

    let options = AppOptions::from_settings(layout, &settings);
    info!("Running Titan Deployer {}", version_info().version);

    match dispatch(&cli_args, &options).await {
        Ok(true) => {}
        Ok(false) => std::process::exit(1),
        Err(e) => {
            error!("{:#}", e);
            eprintln!("{} {:#}", "error:".red().bold(), e);
            std::process::exit(2);
        }
    }
}

/// Run the requested command; `Ok(false)` reports an unsuccessful outcome
async fn dispatch(cli_args: &HashMap<String, String>, options: &AppOptions) -> anyhow::Result<bool> {
    if let Some(script) = cli_args.get("deploy") {
        return deploy(cli_args, options, script).await;
    }
    if cli_args.contains_key("reset") {
        let target = target_from_args(cli_args, options)?;
        let (sink, printer) = spawn_status_printer();
        let resetter = Resetter::new(OpenSshConnector::new(options.ssh.clone()), options.reset.clone());
        let outcome = resetter.factory_reset(&target, sink).await;
        finish_printer(printer).await;
        return Ok(outcome.success);
    }
    if cli_args.contains_key("audit") {
        let target = target_from_args(cli_args, options)?;
        let connector = OpenSshConnector::new(options.ssh.clone());
        let report = run_compliance_scan(&connector, &target, AUDIT_CONNECT_TIMEOUT).await;
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(report.passed);
    }
    if let Some(host) = cli_args.get("probe") {
        let timeout = match cli_args.get("timeout") {
            Some(secs) => Duration::from_secs(secs.parse().context("invalid --timeout")?),
            None => options.deploy.timing.probe_timeout(false),
        };
        let (sink, printer) = spawn_status_printer();
        let mut recorder = Recorder::new(sink);
        let outcome = TcpProbe::new(options.probe.clone())
            .wait_until_reachable(host, timeout, &mut recorder)
            .await;
        drop(recorder);
        finish_printer(printer).await;
        return Ok(outcome.is_reachable());
    }
    if cli_args.contains_key("monitor") {
        monitor(cli_args, options).await?;
        return Ok(true);
    }
    if let Some(path) = cli_args.get("wrap") {
        let commands = read_commands(path).await?;
        let script = wrap_in_safe_mode(&commands)?;
        print!("{}", script.text);
        return Ok(true);
    }
    if let Some(model) = cli_args.get("validate-bridge") {
        let bridges = cli_args
            .get("bridges")
            .ok_or_else(|| anyhow!("--bridges is required"))?
            .parse()
            .context("invalid --bridges")?;
        let result = validate_bridge_config(model, bridges)?;
        match &result.error {
            Some(error) => println!("{}", error.yellow()),
            None => println!("{}", "Bridge layout OK".green()),
        }
        return Ok(result.valid);
    }
    if let Some(collector) = cli_args.get("tzsp") {
        let interface = cli_args
            .get("interface")
            .ok_or_else(|| anyhow!("--interface is required"))?;
        println!("{}", tzsp_stream_config(collector, interface));
        return Ok(true);
    }

    println!("{}", USAGE);
    Ok(true)
}

async fn deploy(cli_args: &HashMap<String, String>, options: &AppOptions, script: &str) -> anyhow::Result<bool> {
    let target = target_from_args(cli_args, options)?;
    let payload = if cli_args.contains_key("safe") {
        let commands = read_commands(script).await?;
        ScriptPayload::from(wrap_in_safe_mode(&commands)?)
    } else {
        ScriptPayload::File(PathBuf::from(script))
    };
    let post_change_host = cli_args
        .get("new-host")
        .cloned()
        .unwrap_or_else(|| target.host.clone());
    let request = DeploymentRequest::new(target, payload, post_change_host)
        .with_heavy_payload(cli_args.contains_key("heavy"));

    let (sink, printer) = spawn_status_printer();
    let deployer = Deployer::new(
        OpenSshConnector::new(options.ssh.clone()),
        options.deploy.clone(),
        options.probe.clone(),
    );
    let outcome = deployer.deploy(request, sink).await;
    finish_printer(printer).await;
    Ok(outcome.success)
}

/// Sample interface traffic until interrupted
async fn monitor(cli_args: &HashMap<String, String>, options: &AppOptions) -> anyhow::Result<()> {
    let target = target_from_args(cli_args, options)?;
    let interface = cli_args
        .get("interface")
        .cloned()
        .unwrap_or_else(|| "ether1".to_string());
    let monitor = Arc::new(TrafficMonitor::new(interface));
    let connector = OpenSshConnector::new(options.ssh.clone());

    let reader = monitor.clone();
    let interval = options.traffic.interval;
    let printer = tokio::spawn(async move {
        loop {
            tokio::time::sleep(interval).await;
            let stats = reader.stats().await;
            println!(
                "{}  rx {:>12.0} bps  tx {:>12.0} bps",
                reader.interface().await.bold(),
                stats.rx,
                stats.tx
            );
        }
    });

    traffic::run(
        &options.traffic,
        monitor,
        &connector,
        &target,
        tokio::time::sleep,
        await_shutdown_signal().boxed(),
    )
    .await;
    printer.abort();
    Ok(())
}

fn target_from_args(cli_args: &HashMap<String, String>, options: &AppOptions) -> anyhow::Result<Target> {
    let host = cli_args
        .get("host")
        .ok_or_else(|| anyhow!("--host is required"))?;
    let username = cli_args.get("user").map(String::as_str).unwrap_or("admin");
    let port = match cli_args.get("port") {
        Some(port) => port.parse().context("invalid --port")?,
        None => options.ssh_port,
    };

    let mut credentials = Credentials::new(username);
    if let Ok(password) = env::var(PASSWORD_ENV) {
        credentials = credentials.with_password(password);
    }
    if let Some(identity) = cli_args.get("identity") {
        credentials = credentials.with_identity_file(identity);
    }

    Ok(Target::new(host.clone(), credentials).with_port(port))
}

/// One command per non-empty line
async fn read_commands(path: &str) -> anyhow::Result<Vec<String>> {
    let contents = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("reading {}", path))?;
    Ok(contents
        .lines()
        .map(str::trim_end)
        .filter(|line| !line.trim().is_empty())
        .map(str::to_string)
        .collect())
}

fn spawn_status_printer() -> (StatusSink, JoinHandle<()>) {
    let (sink, rx) = StatusSink::channel();
    (sink, tokio::spawn(print_status(rx)))
}

async fn print_status(mut rx: StatusReceiver) {
    while let Some(event) = rx.recv().await {
        let time = event.timestamp.format("%H:%M:%S").to_string().dimmed();
        match event.level {
            StatusLevel::Info => println!("{} {}", time, event.message),
            StatusLevel::Warn => println!("{} {}", time, event.message.yellow()),
            StatusLevel::Error => println!("{} {}", time, event.message.red().bold()),
        }
    }
}

/// Wait for the printer to drain; the sink was moved into the orchestrator
/// and is dropped by now
async fn finish_printer(printer: JoinHandle<()>) {
    if let Err(e) = printer.await {
        error!("Status printer failed: {}", e);
    }
}

async fn await_shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        if let Ok(mut sigterm) = signal(SignalKind::terminate()) {
            tokio::select! {
                _ = sigterm.recv() => {
                    info!("SIGTERM received, shutting down...");
                }
                _ = tokio::signal::ctrl_c() => {
                    info!("Ctrl+C received, shutting down...");
                }
            }
            return;
        }
    }

    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for Ctrl+C: {}", e);
        return;
    }
    info!("Ctrl+C received, shutting down...");
}
