//! Device transports
//!
//! `SshTransport` drives the system `ssh` client. One control socket per host
//! is kept open for the duration of a task invocation, so consecutive
//! commands reuse the same session. `DryRunTransport` never touches the
//! network and echoes what it would have sent.

use crate::config::{RunnerConfig, TransportKind};
use crate::runner::{self, Invocation};
use anyhow::{Result, bail};
use hostkit::{CommandTransport, Host};
use log::{debug, info};
use pipeline::TransportFactory;
use std::path::PathBuf;
use std::sync::Arc;

/// Build the factory the worker pool uses to open per-host transports
pub fn factory(runner: &RunnerConfig) -> TransportFactory {
    let timeout = runner.connect_timeout;
    match runner.transport {
        TransportKind::Ssh => Arc::new(move |host: &Host| -> Result<Box<dyn CommandTransport>> {
            Ok(Box::new(SshTransport::connect(host, timeout)?))
        }),
        TransportKind::DryRun => Arc::new(|host: &Host| -> Result<Box<dyn CommandTransport>> {
            Ok(Box::new(DryRunTransport::new(host.name())))
        }),
    }
}

/// Wrap configuration lines in a config-mode session
pub fn config_session(commands: &[String]) -> String {
    let mut session = String::from("configure terminal\n");
    for line in commands {
        session.push_str(line);
        session.push('\n');
    }
    session.push_str("end\n");
    session
}

/// Command that persists the running config on `platform`
pub fn save_command(platform: Option<&str>) -> &'static str {
    match platform.map(str::to_ascii_lowercase).as_deref() {
        Some("nxos" | "cisco_nxos") => "copy running-config startup-config",
        _ => "write memory",
    }
}

// ============================================================================
// SSH
// ============================================================================

pub struct SshTransport {
    host: String,
    target: String,
    port: Option<u16>,
    username: Option<String>,
    password: Option<String>,
    platform: Option<String>,
    connect_timeout: u64,
    control_path: PathBuf,
    used: bool,
}

impl SshTransport {
    /// Prepare a session from the host's resolved `ssh` connection profile
    ///
    /// Without a hostname the inventory name is used as the address.
    pub fn connect(host: &Host, connect_timeout: u64) -> Result<Self> {
        let params = host.connection_parameters("ssh");
        let target = params
            .hostname
            .unwrap_or_else(|| host.name().to_string());

        if params.password.is_some() && !runner::command_exists("sshpass") {
            bail!(
                "password authentication for '{}' needs sshpass on PATH",
                host.name()
            );
        }

        let control_path =
            std::env::temp_dir().join(format!("netfleet-{}-%C", std::process::id()));

        debug!("{}: ssh target {}", host.name(), target);
        Ok(Self {
            host: host.name().to_string(),
            target,
            port: params.port,
            username: params.username,
            password: params.password,
            platform: params.platform,
            connect_timeout,
            control_path,
            used: false,
        })
    }

    fn base(&self) -> Invocation {
        let invocation = match &self.password {
            Some(password) => Invocation::new("sshpass")
                .args(["-e", "ssh"])
                .env("SSHPASS", password.as_str()),
            None => Invocation::new("ssh").args(["-o", "BatchMode=yes"]),
        };

        let mut invocation = invocation
            .args(["-T", "-o"])
            .arg(format!("ConnectTimeout={}", self.connect_timeout))
            .args(["-o", "ControlMaster=auto", "-o", "ControlPersist=60", "-o"])
            .arg(format!("ControlPath={}", self.control_path.display()));

        if let Some(port) = self.port {
            invocation = invocation.arg("-p").arg(port.to_string());
        }
        if let Some(user) = &self.username {
            invocation = invocation.arg("-l").arg(user.as_str());
        }
        invocation.arg(self.target.as_str())
    }

    fn run(&mut self, invocation: &Invocation) -> Result<String> {
        self.used = true;
        debug!("{}: {}", self.host, invocation.display());
        runner::run_capture(invocation)
    }
}

impl CommandTransport for SshTransport {
    fn send_command(&mut self, command: &str) -> Result<String> {
        let invocation = self.base().arg(command);
        self.run(&invocation)
    }

    fn send_config(&mut self, commands: &[String]) -> Result<String> {
        let invocation = self.base().stdin(config_session(commands));
        self.run(&invocation)
    }

    fn save_config(&mut self) -> Result<String> {
        let command = save_command(self.platform.as_deref());
        self.send_command(command)
    }

    fn close(&mut self) {
        if !self.used {
            return;
        }
        let exit = Invocation::new("ssh")
            .args(["-O", "exit", "-o"])
            .arg(format!("ControlPath={}", self.control_path.display()))
            .arg(self.target.as_str());
        if !runner::run_quiet(&exit) {
            debug!("{}: no control socket to close", self.host);
        }
        self.used = false;
    }
}

// ============================================================================
// Dry run
// ============================================================================

/// Echoes commands instead of sending them
pub struct DryRunTransport {
    host: String,
}

impl DryRunTransport {
    pub fn new(host: impl Into<String>) -> Self {
        Self { host: host.into() }
    }
}

impl CommandTransport for DryRunTransport {
    fn send_command(&mut self, command: &str) -> Result<String> {
        info!("[dry-run] {}# {}", self.host, command);
        Ok(format!("{}# {}", self.host, command))
    }

    fn send_config(&mut self, commands: &[String]) -> Result<String> {
        let echoed: Vec<String> = commands
            .iter()
            .map(|line| format!("{}(config)# {}", self.host, line))
            .collect();
        info!("[dry-run] {}: {} config lines", self.host, commands.len());
        Ok(echoed.join("\n"))
    }

    fn save_config(&mut self) -> Result<String> {
        self.send_command(save_command(None))
    }
}
