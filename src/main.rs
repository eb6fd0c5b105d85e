#![warn(clippy::all, clippy::pedantic)]
#![allow(
    clippy::doc_markdown,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    clippy::module_name_repetitions,
    clippy::needless_pass_by_value,
    clippy::too_many_lines,
    clippy::uninlined_format_args
)]

use anyhow::{bail, Context, Result};
use clap::{CommandFactory, Parser, Subcommand, ValueEnum};
use serde_json::json;
use std::io::Write;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

use netopsbot::channels::create_transport;
use netopsbot::command::{create_parser, BackendKind, ParsedCommand};
use netopsbot::infra::{create_poll_loop, shutdown_signal};
use netopsbot::routing::responses;
use netopsbot::Config;

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
enum CompletionShell {
    #[value(name = "bash")]
    Bash,
    #[value(name = "fish")]
    Fish,
    #[value(name = "zsh")]
    Zsh,
    #[value(name = "powershell")]
    PowerShell,
    #[value(name = "elvish")]
    Elvish,
}

/// Chat-driven network operations: Webex commands in, RESTCONF/NETCONF/SSH/Ansible out.
#[derive(Parser, Debug)]
#[command(name = "netopsbot")]
#[command(version)]
#[command(about = "Dispatch chat commands to network devices.", long_about = None)]
struct Cli {
    #[arg(long, global = true)]
    config_dir: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Poll the Webex room and answer commands until Ctrl-C
    #[command(long_about = "\
Poll the Webex room and answer commands until Ctrl-C.

Requires webex.access_token and webex.room_id (or WEBEX_ACCESS_TOKEN / \
WEBEX_ROOM_ID in the environment or a .env file).

Examples:
  netopsbot run
  netopsbot run --interval-ms 2000
  RUST_LOG=netopsbot=debug netopsbot run")]
    Run {
        /// Override dispatcher.poll_interval_ms
        #[arg(long)]
        interval_ms: Option<u64>,
    },

    /// Parse a message offline and print the result as JSON
    #[command(long_about = "\
Parse a message offline and print the result as JSON.

No device or chat service is contacted. Use --method to simulate a \
previously selected backend.

Examples:
  netopsbot parse /66070077 restconf
  netopsbot parse --method netconf /66070077 10.0.15.61 create")]
    Parse {
        /// Backend assumed to be selected (restconf, netconf)
        #[arg(long)]
        method: Option<BackendKind>,

        /// Message text; words are joined with single spaces
        #[arg(required = true, num_args = 1.., allow_hyphen_values = true)]
        message: Vec<String>,
    },

    /// Show the effective configuration (secrets masked)
    Status,

    /// Check chat credentials and required external programs
    Doctor,

    /// Manage configuration
    #[command(long_about = "\
Manage netopsbot configuration.

Examples:
  netopsbot config schema              # print JSON Schema to stdout
  netopsbot config schema > schema.json")]
    Config {
        #[command(subcommand)]
        config_command: ConfigCommands,
    },

    /// Generate shell completion script to stdout
    #[command(long_about = "\
Generate shell completion scripts for `netopsbot`.

Examples:
  source <(netopsbot completions bash)
  netopsbot completions zsh > ~/.zfunc/_netopsbot")]
    Completions {
        /// Target shell
        #[arg(value_enum)]
        shell: CompletionShell,
    },
}

#[derive(Subcommand, Debug)]
enum ConfigCommands {
    /// Dump the full configuration JSON Schema to stdout
    Schema,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Install default crypto provider for Rustls TLS.
    if let Err(e) = rustls::crypto::ring::default_provider().install_default() {
        eprintln!("Warning: Failed to install default crypto provider: {e:?}");
    }

    let cli = Cli::parse();

    if let Some(config_dir) = &cli.config_dir {
        if config_dir.trim().is_empty() {
            bail!("--config-dir cannot be empty");
        }
        std::env::set_var("NETOPSBOT_CONFIG_DIR", config_dir);
    }

    // Completions must remain stdout-only: no config, no logging.
    if let Commands::Completions { shell } = &cli.command {
        let mut stdout = std::io::stdout().lock();
        write_shell_completion(*shell, &mut stdout)?;
        return Ok(());
    }

    dotenvy::dotenv().ok();

    // Initialize logging - respects RUST_LOG env var, defaults to INFO
    let subscriber = fmt::Subscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("setting default subscriber failed")?;

    let mut config = Config::load_or_init().await?;

    match cli.command {
        Commands::Completions { .. } => Ok(()),

        Commands::Run { interval_ms } => {
            if let Some(ms) = interval_ms {
                config.dispatcher.poll_interval_ms = ms;
            }
            config.validate_for_polling()?;
            info!(
                prefix = %config.dispatcher.address_prefix,
                targets = config.dispatcher.allowed_targets.len(),
                "Starting netopsbot"
            );
            let stats = create_poll_loop(&config).run_until(shutdown_signal()).await;
            info!(
                iterations = stats.iterations,
                ignored = stats.ignored,
                duplicates = stats.duplicates,
                "Stopped"
            );
            Ok(())
        }

        Commands::Parse { method, message } => {
            let text = message.join(" ");
            let parser = create_parser(&config.dispatcher);
            let parsed = parser.parse(&text, method);
            let report = json!({
                "message": text,
                "selected": method,
                "parsed": parsed,
                "reply": offline_reply(&parsed, &config),
            });
            println!("{}", serde_json::to_string_pretty(&report)?);
            Ok(())
        }

        Commands::Status => {
            print_status(&config);
            Ok(())
        }

        Commands::Doctor => run_doctor(&config).await,

        Commands::Config { config_command } => match config_command {
            ConfigCommands::Schema => {
                let schema = schemars::schema_for!(Config);
                println!("{}", serde_json::to_string_pretty(&schema)?);
                Ok(())
            }
        },
    }
}

/// Reply text known without contacting a device.
fn offline_reply(parsed: &ParsedCommand, config: &Config) -> Option<String> {
    match parsed {
        ParsedCommand::ParseError { reason } => {
            let targets = netopsbot::command::TargetAllowList::new(
                config.dispatcher.allowed_targets.iter().cloned(),
            );
            responses::parse_error(*reason, &config.dispatcher.address_prefix, &targets.describe())
        }
        ParsedCommand::SelectBackend { backend } => Some(responses::backend_selected(*backend)),
        ParsedCommand::DeviceCommand { .. } => None,
    }
}

fn mask(secret: Option<&str>) -> &'static str {
    match secret {
        Some(s) if !s.trim().is_empty() => "(set)",
        _ => "(not set)",
    }
}

fn print_status(config: &Config) {
    println!("netopsbot status");
    println!();
    println!("Version:      {}", env!("CARGO_PKG_VERSION"));
    println!("Config:       {}", config.config_path.display());
    println!();
    println!("Webex:");
    println!("  API URL:    {}", config.webex.api_url);
    println!("  Token:      {}", mask(config.webex.access_token.as_deref()));
    println!(
        "  Room:       {}",
        config.webex.room_id.as_deref().unwrap_or("(not set)")
    );
    println!();
    println!("Dispatcher:");
    println!("  Prefix:     {}", config.dispatcher.address_prefix);
    println!(
        "  Targets:    {}",
        config.dispatcher.allowed_targets.join(", ")
    );
    println!("  Poll:       {} ms", config.dispatcher.poll_interval_ms);
    println!("  Timeout:    {} s", config.dispatcher.backend_timeout_secs);
    println!("  Dedupe:     {}", config.dispatcher.dedupe_messages);
    println!();
    println!("Device:");
    println!("  Interface:  {}", config.interface.name());
    println!("  User:       {}", config.device.username);
    println!("  Password:   {}", mask(config.device.password.as_deref()));
    println!(
        "  RESTCONF:   {}://<target>:{} (verify TLS: {})",
        config.restconf.scheme, config.restconf.port, config.restconf.verify_tls
    );
    println!("  NETCONF:    port {}", config.netconf.port);
    println!("  SSH:        {} port {}", config.ssh.program, config.ssh.port);
    println!(
        "  Ansible:    {} {}",
        config.ansible.program,
        config.ansible.playbook_path().display()
    );
}

async fn run_doctor(config: &Config) -> Result<()> {
    let mut failures = 0_usize;

    println!("netopsbot doctor");
    println!();

    match config.validate_for_polling() {
        Ok(()) => {
            let transport = create_transport(&config.webex);
            let health = tokio::time::timeout(
                Duration::from_secs(config.webex.request_timeout_secs.max(1)),
                transport.health_check(),
            )
            .await;
            match health {
                Ok(Ok(identity)) => println!("  ✅ {} authenticated as {identity}", transport.name()),
                Ok(Err(e)) => {
                    failures += 1;
                    println!("  ❌ {} health check failed: {e}", transport.name());
                }
                Err(_) => {
                    failures += 1;
                    println!("  ❌ {} health check timed out", transport.name());
                }
            }
        }
        Err(e) => {
            failures += 1;
            println!("  ❌ webex not configured: {e}");
        }
    }

    let mut programs = vec![config.ssh.program.as_str(), config.ansible.program.as_str()];
    if config.ssh.use_sshpass {
        programs.push("sshpass");
    }
    for program in programs {
        match which::which(program) {
            Ok(path) => println!("  ✅ {program} ({})", path.display()),
            Err(_) => {
                failures += 1;
                println!("  ❌ {program} not found on PATH");
            }
        }
    }

    for (label, path) in [
        ("playbook", config.ansible.playbook_path()),
        ("inventory", config.ansible.inventory_path()),
    ] {
        if path.is_file() {
            println!("  ✅ {label} {}", path.display());
        } else {
            failures += 1;
            println!("  ❌ {label} missing: {}", path.display());
        }
    }

    println!();
    if failures > 0 {
        bail!("{failures} check(s) failed");
    }
    println!("All checks passed.");
    Ok(())
}

fn write_shell_completion<W: Write>(shell: CompletionShell, writer: &mut W) -> Result<()> {
    use clap_complete::generate;
    use clap_complete::shells;

    let mut cmd = Cli::command();
    let bin_name = cmd.get_name().to_string();

    match shell {
        CompletionShell::Bash => generate(shells::Bash, &mut cmd, bin_name.clone(), writer),
        CompletionShell::Fish => generate(shells::Fish, &mut cmd, bin_name.clone(), writer),
        CompletionShell::Zsh => generate(shells::Zsh, &mut cmd, bin_name.clone(), writer),
        CompletionShell::PowerShell => {
            generate(shells::PowerShell, &mut cmd, bin_name.clone(), writer);
        }
        CompletionShell::Elvish => generate(shells::Elvish, &mut cmd, bin_name, writer),
    }

    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::{CommandFactory, Parser};
    use netopsbot::command::ErrorReason;

    #[test]
    fn cli_definition_has_no_flag_conflicts() {
        Cli::command().debug_assert();
    }

    #[test]
    fn completions_cli_parses_supported_shells() {
        for shell in ["bash", "fish", "zsh", "powershell", "elvish"] {
            let cli = Cli::try_parse_from(["netopsbot", "completions", shell])
                .expect("completions invocation should parse");
            match cli.command {
                Commands::Completions { .. } => {}
                other => panic!("expected completions command, got {other:?}"),
            }
        }
    }

    #[test]
    fn completion_generation_mentions_binary_name() {
        let mut output = Vec::new();
        write_shell_completion(CompletionShell::Bash, &mut output)
            .expect("completion generation should succeed");
        let script = String::from_utf8(output).expect("completion output should be valid utf-8");
        assert!(
            script.contains("netopsbot"),
            "completion script should reference binary name"
        );
    }

    #[test]
    fn parse_collects_message_words_and_method() {
        let cli = Cli::try_parse_from([
            "netopsbot",
            "parse",
            "--method",
            "netconf",
            "/66070077",
            "10.0.15.61",
            "create",
        ])
        .expect("parse invocation should parse");
        match cli.command {
            Commands::Parse { method, message } => {
                assert_eq!(method, Some(BackendKind::Netconf));
                assert_eq!(message.join(" "), "/66070077 10.0.15.61 create");
            }
            other => panic!("expected parse command, got {other:?}"),
        }
    }

    #[test]
    fn run_accepts_interval_override() {
        let cli = Cli::try_parse_from(["netopsbot", "run", "--interval-ms", "250"])
            .expect("run invocation should parse");
        assert!(matches!(
            cli.command,
            Commands::Run {
                interval_ms: Some(250)
            }
        ));
    }

    #[test]
    fn offline_reply_covers_errors_and_selection() {
        let config = Config::default();
        let select = ParsedCommand::SelectBackend {
            backend: BackendKind::Restconf,
        };
        assert_eq!(
            offline_reply(&select, &config).as_deref(),
            Some("Ok: Restconf")
        );
        assert_eq!(
            offline_reply(&ParsedCommand::error(ErrorReason::MissingPrefix), &config),
            None
        );
        assert_eq!(
            offline_reply(&ParsedCommand::error(ErrorReason::NoIpSpecified), &config).as_deref(),
            Some("Error: No IP specified")
        );
    }

    #[test]
    fn secrets_are_masked() {
        assert_eq!(mask(Some("abc")), "(set)");
        assert_eq!(mask(Some("  ")), "(not set)");
        assert_eq!(mask(None), "(not set)");
    }
}
