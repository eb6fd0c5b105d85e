//! GigabitEthernet status summary over an SSH CLI session.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::process::run_process;
use super::ssh::{SshLauncher, SshRemote};
use super::traits::{BackendResult, CommandSessionBackend};

const SHOW_INTERFACES: &str = "show ip interface brief";
const SUMMARY_INTERFACE_PREFIX: &str = "GigabitEthernet";

/// One row of `show ip interface brief`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InterfaceBrief {
    pub name: String,
    pub address: String,
    /// Line status: `up`, `down` or `administratively down`.
    pub status: String,
    pub protocol: String,
}

/// Parse the IOS interface table. Header and malformed lines are skipped.
pub fn parse_interface_brief(output: &str) -> Vec<InterfaceBrief> {
    output
        .lines()
        .filter_map(|line| {
            let cols: Vec<&str> = line.split_whitespace().collect();
            if cols.len() < 6 || cols[0] == "Interface" {
                return None;
            }
            let (protocol, rest) = cols.split_last()?;
            Some(InterfaceBrief {
                name: cols[0].to_string(),
                address: cols[1].to_string(),
                status: rest[4..].join(" "),
                protocol: (*protocol).to_string(),
            })
        })
        .collect()
}

/// `GigabitEthernet1 up, GigabitEthernet2 down -> 1 up, 1 down, 0 administratively down`
pub fn summarize_gigabit(rows: &[InterfaceBrief]) -> String {
    let (mut up, mut down, mut admin_down) = (0_usize, 0_usize, 0_usize);
    let mut entries = Vec::new();

    for row in rows
        .iter()
        .filter(|r| r.name.starts_with(SUMMARY_INTERFACE_PREFIX))
    {
        entries.push(format!("{} {}", row.name, row.status));
        match row.status.as_str() {
            "up" => up += 1,
            "down" => down += 1,
            "administratively down" => admin_down += 1,
            _ => {}
        }
    }

    let tally = format!("{up} up, {down} down, {admin_down} administratively down");
    if entries.is_empty() {
        format!("-> {tally}")
    } else {
        format!("{} -> {tally}", entries.join(", "))
    }
}

/// Runs `show ip interface brief` through the system SSH client.
pub struct SshCommandSession {
    launcher: SshLauncher,
    port: u16,
}

impl SshCommandSession {
    pub fn new(launcher: SshLauncher, port: u16) -> Self {
        Self { launcher, port }
    }
}

#[async_trait]
impl CommandSessionBackend for SshCommandSession {
    fn name(&self) -> &str {
        "ssh"
    }

    async fn interface_summary(&self, target: &str) -> BackendResult<String> {
        let command = self
            .launcher
            .command(target, self.port, SshRemote::Exec(SHOW_INTERFACES));
        let output = run_process(command, None).await?;
        let rows = parse_interface_brief(&output.stdout);
        tracing::debug!(target, rows = rows.len(), "Parsed interface table");
        Ok(summarize_gigabit(&rows))
    }
}
