//! Builds `ssh` invocations for the NETCONF and CLI-session backends.

use tokio::process::Command;

use crate::config::{DeviceConfig, SshConfig};

/// What to run on the far side of the connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SshRemote<'a> {
    /// `ssh -s <host> <name>`, e.g. the `netconf` subsystem.
    Subsystem(&'a str),
    /// `ssh <host> <command>`.
    Exec(&'a str),
}

#[derive(Debug, Clone)]
pub struct SshLauncher {
    ssh: SshConfig,
    username: String,
    password: Option<String>,
}

impl SshLauncher {
    pub fn new(ssh: &SshConfig, device: &DeviceConfig) -> Self {
        Self {
            ssh: ssh.clone(),
            username: device.username.clone(),
            password: device.password.clone(),
        }
    }

    fn uses_sshpass(&self) -> bool {
        self.ssh.use_sshpass && self.password.is_some()
    }

    /// Program to spawn: `sshpass` when password auth is enabled, else the client.
    pub fn program(&self) -> &str {
        if self.uses_sshpass() {
            "sshpass"
        } else {
            &self.ssh.program
        }
    }

    /// Full argument vector for the program returned by [`Self::program`].
    pub fn args(&self, target: &str, port: u16, remote: SshRemote<'_>) -> Vec<String> {
        let mut args = Vec::new();
        if self.uses_sshpass() {
            args.push("-e".to_string());
            args.push(self.ssh.program.clone());
        }

        args.extend([
            "-T".to_string(),
            "-p".to_string(),
            port.to_string(),
            "-l".to_string(),
            self.username.clone(),
            "-o".to_string(),
            format!("ConnectTimeout={}", self.ssh.connect_timeout_secs),
            "-o".to_string(),
            format!("StrictHostKeyChecking={}", self.ssh.strict_host_key_checking),
        ]);
        // Never prompt on a terminal that nobody is watching.
        if !self.uses_sshpass() {
            args.extend(["-o".to_string(), "BatchMode=yes".to_string()]);
        }
        args.extend(self.ssh.extra_args.iter().cloned());

        match remote {
            SshRemote::Subsystem(name) => {
                args.push("-s".to_string());
                args.push(target.to_string());
                args.push(name.to_string());
            }
            SshRemote::Exec(command) => {
                args.push(target.to_string());
                args.push(command.to_string());
            }
        }
        args
    }

    pub fn command(&self, target: &str, port: u16, remote: SshRemote<'_>) -> Command {
        let mut command = Command::new(self.program());
        command.args(self.args(target, port, remote));
        if self.uses_sshpass() {
            if let Some(password) = &self.password {
                command.env("SSHPASS", password);
            }
        }
        command
    }
}
