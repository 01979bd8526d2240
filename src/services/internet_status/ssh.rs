//! SSH command status source
//!
//! Runs a status command on the router through the system `ssh` client and
//! reads the `Download:` and `Upload:` values (Mbps) from its output.

use super::{BoxFuture, InternetStatus, Speed, StatusSource};
use crate::config::RouterConfig;
use anyhow::{Context, Result, ensure};
use log::info;
use std::{process::Stdio, time::Duration};
use tokio::process::Command;

const DOWNLOAD_LABEL: &str = "Download:";
const UPLOAD_LABEL: &str = "Upload:";

/// Decimal number following `label`, 0 if the label is absent or unparsable
fn labeled_value(text: &str, label: &str) -> f64 {
    text.find(label)
        .map(|pos| text[pos + label.len()..].trim_start())
        .and_then(|rest| {
            let end = rest
                .find(|c: char| !(c.is_ascii_digit() || c == '.'))
                .unwrap_or(rest.len());
            rest[..end].parse::<f64>().ok()
        })
        .unwrap_or(0.0)
}

/// Extract download and upload throughput from the status command output
pub fn parse_speed_report(text: &str) -> Speed {
    Speed {
        download: labeled_value(text, DOWNLOAD_LABEL),
        upload: labeled_value(text, UPLOAD_LABEL),
    }
}

pub struct SshSource {
    host: String,
    port: u16,
    username: Option<String>,
    password: Option<String>,
    command: String,
    timeout: Duration,
}

impl SshSource {
    pub fn new(config: &RouterConfig) -> Self {
        Self {
            host: config.host.clone(),
            port: config.ssh.port,
            username: config.username.clone(),
            password: config.password.clone(),
            command: config.ssh.command.clone(),
            timeout: config.ssh.timeout,
        }
    }

    fn destination(&self) -> String {
        match &self.username {
            Some(username) => format!("{username}@{}", self.host),
            None => self.host.clone(),
        }
    }

    /// `ssh` invocation, wrapped in `sshpass` when a password is configured
    fn ssh_command(&self) -> Command {
        let mut command = match &self.password {
            Some(password) => {
                let mut command = Command::new("sshpass");
                command.arg("-e").arg("ssh").env("SSHPASS", password);
                command
            }
            None => {
                let mut command = Command::new("ssh");
                command.args(["-o", "BatchMode=yes"]);
                command
            }
        };

        let connect_timeout = self.timeout.as_secs().max(1);

        command
            .args(["-o", &format!("ConnectTimeout={connect_timeout}")])
            .args(["-o", "StrictHostKeyChecking=accept-new"])
            .arg("-p")
            .arg(self.port.to_string())
            .arg(self.destination())
            .arg(&self.command)
            .stdin(Stdio::null())
            .kill_on_drop(true);

        command
    }

    async fn fetch(&self) -> Result<InternetStatus> {
        info!("SSH {}:{} \"{}\"", self.host, self.port, self.command);

        let output = self
            .ssh_command()
            .output()
            .await
            .context("failed to run ssh")?;

        ensure!(
            output.status.success(),
            "ssh command failed with {}: {}",
            output.status,
            String::from_utf8_lossy(&output.stderr).trim()
        );

        let speed = parse_speed_report(&String::from_utf8_lossy(&output.stdout));

        Ok(InternetStatus::derived(speed))
    }
}

impl StatusSource for SshSource {
    fn name(&self) -> &'static str {
        "ssh"
    }

    fn timeout(&self) -> Duration {
        self.timeout
    }

    fn acquire(&self) -> BoxFuture<'_, Result<InternetStatus>> {
        Box::pin(self.fetch())
    }
}
