use anyhow::{Context, Result};
use directories::UserDirs;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
#[cfg(unix)]
use tokio::fs::File;
use tokio::fs::{self, OpenOptions};
use tokio::io::AsyncWriteExt;

const CONFIG_FILE_NAME: &str = "config.toml";
const CONFIG_DIR_ENV: &str = "NETOPSBOT_CONFIG_DIR";

// ── Top-level config ──────────────────────────────────────────────

/// Top-level netopsbot configuration, loaded from `config.toml`.
///
/// Resolution order: `NETOPSBOT_CONFIG_DIR` env → `~/.netopsbot/config.toml`.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct Config {
    /// Path to config.toml - computed at load time, not serialized
    #[serde(skip)]
    pub config_path: PathBuf,

    /// Webex chat transport (`[webex]`).
    #[serde(default)]
    pub webex: WebexConfig,

    /// Command addressing, allow-list and poll timing (`[dispatcher]`).
    #[serde(default)]
    pub dispatcher: DispatcherConfig,

    /// The loopback interface managed by create/delete/enable/disable/status (`[interface]`).
    #[serde(default)]
    pub interface: InterfaceConfig,

    /// Device login shared by every backend (`[device]`).
    #[serde(default)]
    pub device: DeviceConfig,

    /// RESTCONF backend (`[restconf]`).
    #[serde(default)]
    pub restconf: RestconfConfig,

    /// NETCONF backend (`[netconf]`).
    #[serde(default)]
    pub netconf: NetconfConfig,

    /// SSH client used by the NETCONF and command-session backends (`[ssh]`).
    #[serde(default)]
    pub ssh: SshConfig,

    /// Playbook runner used for running-config backups (`[ansible]`).
    #[serde(default)]
    pub ansible: AnsibleConfig,
}

// ── Webex ────────────────────────────────────────────────────────

/// Webex messaging configuration (`[webex]` section).
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct WebexConfig {
    /// REST base URL. Default: `https://webexapis.com/v1`.
    #[serde(default = "default_webex_api_url")]
    pub api_url: String,
    /// Bot access token. Overridden by `WEBEX_ACCESS_TOKEN`.
    #[serde(default)]
    pub access_token: Option<String>,
    /// Room polled for commands and answered into. Overridden by `WEBEX_ROOM_ID`.
    #[serde(default)]
    pub room_id: Option<String>,
    /// Per-request timeout in seconds. Default: `30`.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

fn default_webex_api_url() -> String {
    "https://webexapis.com/v1".into()
}

fn default_request_timeout_secs() -> u64 {
    30
}

impl Default for WebexConfig {
    fn default() -> Self {
        Self {
            api_url: default_webex_api_url(),
            access_token: None,
            room_id: None,
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

// ── Dispatcher ───────────────────────────────────────────────────

/// Dispatcher configuration (`[dispatcher]` section).
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct DispatcherConfig {
    /// Token every command must start with. Default: `/66070077`.
    #[serde(default = "default_address_prefix")]
    pub address_prefix: String,
    /// Device addresses commands may target. Default: `10.0.15.61`–`10.0.15.65`.
    #[serde(default = "default_allowed_targets")]
    pub allowed_targets: Vec<String>,
    /// Delay before each fetch, in milliseconds. Default: `1000`.
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    /// Upper bound for a single backend call, in seconds. Default: `60`.
    #[serde(default = "default_backend_timeout_secs")]
    pub backend_timeout_secs: u64,
    /// Skip a message whose id was already handled. Default: `true`.
    #[serde(default = "default_true")]
    pub dedupe_messages: bool,
}

fn default_address_prefix() -> String {
    "/66070077".into()
}

fn default_allowed_targets() -> Vec<String> {
    (61..=65).map(|host| format!("10.0.15.{host}")).collect()
}

fn default_poll_interval_ms() -> u64 {
    1000
}

fn default_backend_timeout_secs() -> u64 {
    60
}

fn default_true() -> bool {
    true
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            address_prefix: default_address_prefix(),
            allowed_targets: default_allowed_targets(),
            poll_interval_ms: default_poll_interval_ms(),
            backend_timeout_secs: default_backend_timeout_secs(),
            dedupe_messages: true,
        }
    }
}

impl DispatcherConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn backend_timeout(&self) -> Duration {
        Duration::from_secs(self.backend_timeout_secs)
    }
}

// ── Managed interface ────────────────────────────────────────────

/// Loopback interface configuration (`[interface]` section).
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct InterfaceConfig {
    /// Loopback number; the interface is `Loopback<number>`. Default: `66070077`.
    #[serde(default = "default_interface_number")]
    pub number: u32,
    /// Interface description. Default: `Loopback Interface <number>`.
    #[serde(default)]
    pub description: Option<String>,
    /// IPv4 address assigned on create. Default: `172.0.77.1`.
    #[serde(default = "default_interface_address")]
    pub ipv4_address: String,
    /// Netmask assigned on create. Default: `255.255.255.0`.
    #[serde(default = "default_interface_netmask")]
    pub netmask: String,
}

fn default_interface_number() -> u32 {
    66_070_077
}

fn default_interface_address() -> String {
    "172.0.77.1".into()
}

fn default_interface_netmask() -> String {
    "255.255.255.0".into()
}

impl Default for InterfaceConfig {
    fn default() -> Self {
        Self {
            number: default_interface_number(),
            description: None,
            ipv4_address: default_interface_address(),
            netmask: default_interface_netmask(),
        }
    }
}

impl InterfaceConfig {
    /// Device-side interface name, e.g. `Loopback66070077`.
    pub fn name(&self) -> String {
        format!("Loopback{}", self.number)
    }

    /// Name used in chat replies, e.g. `loopback 66070077`.
    pub fn label(&self) -> String {
        format!("loopback {}", self.number)
    }

    pub fn description(&self) -> String {
        self.description
            .clone()
            .unwrap_or_else(|| format!("Loopback Interface {}", self.number))
    }
}

// ── Device credentials ───────────────────────────────────────────

/// Device login (`[device]` section).
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct DeviceConfig {
    /// Overridden by `DEVICE_USERNAME`. Default: `admin`.
    #[serde(default = "default_device_username")]
    pub username: String,
    /// Overridden by `DEVICE_PASSWORD`.
    #[serde(default)]
    pub password: Option<String>,
}

fn default_device_username() -> String {
    "admin".into()
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            username: default_device_username(),
            password: None,
        }
    }
}

// ── Backends ─────────────────────────────────────────────────────

/// RESTCONF backend (`[restconf]` section).
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct RestconfConfig {
    /// `https` or `http`. Default: `https`.
    #[serde(default = "default_restconf_scheme")]
    pub scheme: String,
    /// Default: `443`.
    #[serde(default = "default_restconf_port")]
    pub port: u16,
    /// Verify device TLS certificates. Lab routers are self-signed. Default: `false`.
    #[serde(default)]
    pub verify_tls: bool,
}

fn default_restconf_scheme() -> String {
    "https".into()
}

fn default_restconf_port() -> u16 {
    443
}

impl Default for RestconfConfig {
    fn default() -> Self {
        Self {
            scheme: default_restconf_scheme(),
            port: default_restconf_port(),
            verify_tls: false,
        }
    }
}

/// NETCONF backend (`[netconf]` section).
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct NetconfConfig {
    /// SSH port of the NETCONF subsystem. Default: `830`.
    #[serde(default = "default_netconf_port")]
    pub port: u16,
}

fn default_netconf_port() -> u16 {
    830
}

impl Default for NetconfConfig {
    fn default() -> Self {
        Self {
            port: default_netconf_port(),
        }
    }
}

/// SSH client configuration (`[ssh]` section).
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SshConfig {
    /// SSH client binary. Default: `ssh`.
    #[serde(default = "default_ssh_program")]
    pub program: String,
    /// Port for CLI sessions. Default: `22`.
    #[serde(default = "default_ssh_port")]
    pub port: u16,
    /// Wrap the client in `sshpass -e` and pass `device.password` via `SSHPASS`.
    /// When false, key-based authentication is assumed. Default: `false`.
    #[serde(default)]
    pub use_sshpass: bool,
    /// `ConnectTimeout` passed to the client. Default: `10`.
    #[serde(default = "default_ssh_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
    /// `StrictHostKeyChecking` value. Default: `accept-new`.
    #[serde(default = "default_strict_host_key_checking")]
    pub strict_host_key_checking: String,
    /// Extra arguments inserted before the destination (e.g. legacy `KexAlgorithms`).
    #[serde(default)]
    pub extra_args: Vec<String>,
}

fn default_ssh_program() -> String {
    "ssh".into()
}

fn default_ssh_port() -> u16 {
    22
}

fn default_ssh_connect_timeout_secs() -> u64 {
    10
}

fn default_strict_host_key_checking() -> String {
    "accept-new".into()
}

impl Default for SshConfig {
    fn default() -> Self {
        Self {
            program: default_ssh_program(),
            port: default_ssh_port(),
            use_sshpass: false,
            connect_timeout_secs: default_ssh_connect_timeout_secs(),
            strict_host_key_checking: default_strict_host_key_checking(),
            extra_args: Vec::new(),
        }
    }
}

/// Running-config backup configuration (`[ansible]` section).
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct AnsibleConfig {
    /// Playbook runner binary. Default: `ansible-playbook`.
    #[serde(default = "default_ansible_program")]
    pub program: String,
    /// Playbook that writes `<backup_prefix>*.txt` into `backup_dir`.
    #[serde(default = "default_ansible_playbook")]
    pub playbook: String,
    #[serde(default = "default_ansible_inventory")]
    pub inventory: String,
    /// Directory the playbook writes backups into. Default: `backups`.
    #[serde(default = "default_backup_dir")]
    pub backup_dir: String,
    /// File name prefix of backup files. Default: `show_run_`.
    #[serde(default = "default_backup_prefix")]
    pub backup_prefix: String,
}

fn default_ansible_program() -> String {
    "ansible-playbook".into()
}

fn default_ansible_playbook() -> String {
    "playbooks/backup_running_config.yml".into()
}

fn default_ansible_inventory() -> String {
    "inventory.ini".into()
}

fn default_backup_dir() -> String {
    "backups".into()
}

fn default_backup_prefix() -> String {
    "show_run_".into()
}

impl Default for AnsibleConfig {
    fn default() -> Self {
        Self {
            program: default_ansible_program(),
            playbook: default_ansible_playbook(),
            inventory: default_ansible_inventory(),
            backup_dir: default_backup_dir(),
            backup_prefix: default_backup_prefix(),
        }
    }
}

impl AnsibleConfig {
    pub fn playbook_path(&self) -> PathBuf {
        expand_path(&self.playbook)
    }

    pub fn inventory_path(&self) -> PathBuf {
        expand_path(&self.inventory)
    }

    pub fn backup_dir_path(&self) -> PathBuf {
        expand_path(&self.backup_dir)
    }
}

/// Expand `~` and `$VARS`; unresolvable input is used verbatim.
pub fn expand_path(raw: &str) -> PathBuf {
    match shellexpand::full(raw) {
        Ok(expanded) => PathBuf::from(expanded.as_ref()),
        Err(_) => PathBuf::from(raw),
    }
}

// ── Config impl ──────────────────────────────────────────────────

impl Default for Config {
    fn default() -> Self {
        let home =
            UserDirs::new().map_or_else(|| PathBuf::from("."), |u| u.home_dir().to_path_buf());

        Self {
            config_path: home.join(".netopsbot").join(CONFIG_FILE_NAME),
            webex: WebexConfig::default(),
            dispatcher: DispatcherConfig::default(),
            interface: InterfaceConfig::default(),
            device: DeviceConfig::default(),
            restconf: RestconfConfig::default(),
            netconf: NetconfConfig::default(),
            ssh: SshConfig::default(),
            ansible: AnsibleConfig::default(),
        }
    }
}

fn default_config_dir() -> Result<PathBuf> {
    let home = UserDirs::new()
        .map(|u| u.home_dir().to_path_buf())
        .context("Could not find home directory")?;
    Ok(home.join(".netopsbot"))
}

fn resolve_config_dir() -> Result<(PathBuf, &'static str)> {
    if let Ok(custom) = std::env::var(CONFIG_DIR_ENV) {
        let custom = custom.trim();
        if !custom.is_empty() {
            return Ok((expand_path(custom), "env"));
        }
    }
    Ok((default_config_dir()?, "default"))
}

fn config_dir_creation_error(path: &Path) -> String {
    format!(
        "Failed to create config directory at {}. Set {CONFIG_DIR_ENV} or pass --config-dir \
         to choose a writable location.",
        path.display()
    )
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

impl Config {
    pub async fn load_or_init() -> Result<Self> {
        let (config_dir, resolution_source) = resolve_config_dir()?;
        Self::load_or_init_in(&config_dir, resolution_source).await
    }

    /// Load `config.toml` from `config_dir`, writing defaults on first run.
    pub async fn load_or_init_in(config_dir: &Path, resolution_source: &str) -> Result<Self> {
        let config_path = config_dir.join(CONFIG_FILE_NAME);

        fs::create_dir_all(config_dir)
            .await
            .with_context(|| config_dir_creation_error(config_dir))?;

        let initialized = !config_path.exists();
        let mut config = if initialized {
            let mut config = Config::default();
            config.config_path = config_path.clone();
            config.save().await?;

            // Restrict permissions on newly created config file (may contain tokens)
            #[cfg(unix)]
            {
                use std::{fs::Permissions, os::unix::fs::PermissionsExt};
                let _ = fs::set_permissions(&config_path, Permissions::from_mode(0o600)).await;
            }
            config
        } else {
            // Warn if config file is world-readable (may contain tokens)
            #[cfg(unix)]
            {
                use std::os::unix::fs::PermissionsExt;
                if let Ok(meta) = fs::metadata(&config_path).await {
                    if meta.permissions().mode() & 0o004 != 0 {
                        tracing::warn!(
                            "Config file {:?} is world-readable (mode {:o}). \
                             Consider restricting with: chmod 600 {:?}",
                            config_path,
                            meta.permissions().mode() & 0o777,
                            config_path,
                        );
                    }
                }
            }

            let contents = fs::read_to_string(&config_path)
                .await
                .context("Failed to read config file")?;
            let mut config: Config =
                toml::from_str(&contents).context("Failed to parse config file")?;
            config.config_path = config_path.clone();
            config
        };

        config.apply_env_overrides();
        config.validate()?;
        tracing::info!(
            path = %config.config_path.display(),
            source = resolution_source,
            initialized,
            "Config loaded"
        );
        Ok(config)
    }

    /// Validate configuration values that would cause runtime failures.
    ///
    /// Called after TOML deserialization and env-override application to catch
    /// obviously invalid values early instead of failing at arbitrary runtime points.
    pub fn validate(&self) -> Result<()> {
        let prefix = &self.dispatcher.address_prefix;
        if prefix.trim().is_empty() {
            anyhow::bail!("dispatcher.address_prefix must not be empty");
        }
        if prefix.trim().split_whitespace().count() != 1 {
            anyhow::bail!("dispatcher.address_prefix must be a single token (got {prefix:?})");
        }
        if self
            .dispatcher
            .allowed_targets
            .iter()
            .all(|t| t.trim().is_empty())
        {
            anyhow::bail!("dispatcher.allowed_targets must list at least one device");
        }
        if self.dispatcher.poll_interval_ms == 0 {
            anyhow::bail!("dispatcher.poll_interval_ms must be greater than 0");
        }
        if self.dispatcher.backend_timeout_secs == 0 {
            anyhow::bail!("dispatcher.backend_timeout_secs must be greater than 0");
        }
        if self.webex.request_timeout_secs == 0 {
            anyhow::bail!("webex.request_timeout_secs must be greater than 0");
        }
        if reqwest::Url::parse(&self.webex.api_url).is_err() {
            anyhow::bail!("webex.api_url is not a valid URL: {}", self.webex.api_url);
        }
        match self.restconf.scheme.as_str() {
            "http" | "https" => {}
            other => anyhow::bail!("restconf.scheme must be http or https (got {other})"),
        }
        if self.ssh.program.trim().is_empty() {
            anyhow::bail!("ssh.program must not be empty");
        }
        if self.ansible.program.trim().is_empty() {
            anyhow::bail!("ansible.program must not be empty");
        }
        Ok(())
    }

    /// Stricter check for `run`: the chat transport needs credentials.
    pub fn validate_for_polling(&self) -> Result<()> {
        self.validate()?;
        if non_empty(self.webex.access_token.clone()).is_none() {
            anyhow::bail!("webex.access_token is not set (config file or WEBEX_ACCESS_TOKEN)");
        }
        if non_empty(self.webex.room_id.clone()).is_none() {
            anyhow::bail!("webex.room_id is not set (config file or WEBEX_ROOM_ID)");
        }
        Ok(())
    }

    /// Apply environment variable overrides to config
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides_from(|key| std::env::var(key).ok());
    }

    /// Apply overrides from an arbitrary key lookup. Empty values are ignored.
    pub fn apply_overrides_from<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| non_empty(lookup(key));

        if let Some(token) = get("WEBEX_ACCESS_TOKEN") {
            self.webex.access_token = Some(token);
        }
        if let Some(room) = get("WEBEX_ROOM_ID") {
            self.webex.room_id = Some(room);
        }
        if let Some(url) = get("WEBEX_API_URL") {
            self.webex.api_url = url;
        }
        if let Some(prefix) = get("NETOPSBOT_PREFIX") {
            self.dispatcher.address_prefix = prefix;
        }
        if let Some(raw) = get("NETOPSBOT_POLL_INTERVAL_MS") {
            match raw.parse::<u64>() {
                Ok(ms) => self.dispatcher.poll_interval_ms = ms,
                Err(_) => tracing::warn!(
                    value = %raw,
                    "Ignoring invalid NETOPSBOT_POLL_INTERVAL_MS (expected milliseconds)"
                ),
            }
        }
        if let Some(username) = get("DEVICE_USERNAME") {
            self.device.username = username;
        }
        if let Some(password) = get("DEVICE_PASSWORD") {
            self.device.password = Some(password);
        }
    }

    pub async fn save(&self) -> Result<()> {
        let toml_str = toml::to_string_pretty(self).context("Failed to serialize config")?;

        let parent_dir = self
            .config_path
            .parent()
            .context("Config path must have a parent directory")?;

        fs::create_dir_all(parent_dir).await.with_context(|| {
            format!(
                "Failed to create config directory: {}",
                parent_dir.display()
            )
        })?;

        let file_name = self
            .config_path
            .file_name()
            .and_then(|v| v.to_str())
            .unwrap_or(CONFIG_FILE_NAME);
        let temp_path = parent_dir.join(format!(".{file_name}.tmp-{}", uuid::Uuid::new_v4()));
        let backup_path = parent_dir.join(format!("{file_name}.bak"));

        let mut temp_file = OpenOptions::new()
            .create_new(true)
            .write(true)
            .open(&temp_path)
            .await
            .with_context(|| {
                format!(
                    "Failed to create temporary config file: {}",
                    temp_path.display()
                )
            })?;
        temp_file
            .write_all(toml_str.as_bytes())
            .await
            .context("Failed to write temporary config contents")?;
        temp_file
            .sync_all()
            .await
            .context("Failed to fsync temporary config file")?;
        drop(temp_file);

        let had_existing_config = self.config_path.exists();
        if had_existing_config {
            fs::copy(&self.config_path, &backup_path)
                .await
                .with_context(|| {
                    format!(
                        "Failed to create config backup before atomic replace: {}",
                        backup_path.display()
                    )
                })?;
        }

        if let Err(e) = fs::rename(&temp_path, &self.config_path).await {
            let _ = fs::remove_file(&temp_path).await;
            if had_existing_config && backup_path.exists() {
                fs::copy(&backup_path, &self.config_path)
                    .await
                    .context("Failed to restore config backup")?;
            }
            anyhow::bail!("Failed to atomically replace config file: {e}");
        }

        sync_directory(parent_dir).await?;

        if had_existing_config {
            let _ = fs::remove_file(&backup_path).await;
        }

        Ok(())
    }
}

async fn sync_directory(path: &Path) -> Result<()> {
    #[cfg(unix)]
    {
        let dir = File::open(path)
            .await
            .with_context(|| format!("Failed to open directory for fsync: {}", path.display()))?;
        dir.sync_all()
            .await
            .with_context(|| format!("Failed to fsync directory metadata: {}", path.display()))?;
        Ok(())
    }

    #[cfg(not(unix))]
    {
        let _ = path;
        Ok(())
    }
}
