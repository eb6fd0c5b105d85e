//! Running-config backup through an `ansible-playbook` run.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use tokio::process::Command;

use super::process::run_process;
use super::traits::{BackendError, BackendResult, OrchestrationBackend};
use crate::config::{AnsibleConfig, DeviceConfig};

pub struct AnsibleBackup {
    program: String,
    playbook: PathBuf,
    inventory: PathBuf,
    backup_dir: PathBuf,
    backup_prefix: String,
    username: String,
    password: Option<String>,
}

impl AnsibleBackup {
    pub fn new(ansible: &AnsibleConfig, device: &DeviceConfig) -> Self {
        Self {
            program: ansible.program.clone(),
            playbook: ansible.playbook_path(),
            inventory: ansible.inventory_path(),
            backup_dir: ansible.backup_dir_path(),
            backup_prefix: ansible.backup_prefix.clone(),
            username: device.username.clone(),
            password: device.password.clone(),
        }
    }

    pub fn args(&self, target: &str) -> Vec<String> {
        vec![
            self.playbook.display().to_string(),
            "-i".to_string(),
            self.inventory.display().to_string(),
            "--limit".to_string(),
            target.to_string(),
            "-e".to_string(),
            format!("backup_dir={}", self.backup_dir.display()),
            "-e".to_string(),
            format!("ansible_user={}", self.username),
        ]
    }
}

/// Newest regular file in `dir` named `<prefix>*` and modified at or after `since`.
pub async fn find_newest_backup(
    dir: &Path,
    prefix: &str,
    since: SystemTime,
) -> BackendResult<Option<PathBuf>> {
    let mut entries = tokio::fs::read_dir(dir).await?;
    let mut newest: Option<(SystemTime, PathBuf)> = None;

    while let Some(entry) = entries.next_entry().await? {
        if !entry.file_name().to_string_lossy().starts_with(prefix) {
            continue;
        }
        let metadata = entry.metadata().await?;
        if !metadata.is_file() {
            continue;
        }
        let modified = metadata.modified()?;
        if modified < since {
            continue;
        }
        if newest.as_ref().map_or(true, |(best, _)| modified > *best) {
            newest = Some((modified, entry.path()));
        }
    }

    Ok(newest.map(|(_, path)| path))
}

#[async_trait]
impl OrchestrationBackend for AnsibleBackup {
    fn name(&self) -> &str {
        "ansible"
    }

    async fn backup_config(&self, target: &str) -> BackendResult<PathBuf> {
        tokio::fs::create_dir_all(&self.backup_dir).await?;
        // Filesystem mtimes can be coarser than the wall clock.
        let started = SystemTime::now()
            .checked_sub(std::time::Duration::from_secs(1))
            .unwrap_or(SystemTime::UNIX_EPOCH);

        let mut command = Command::new(&self.program);
        command.args(self.args(target)).env("ANSIBLE_NOCOLOR", "1");
        if let Some(password) = &self.password {
            command.env("ANSIBLE_NET_PASSWORD", password);
        }

        tracing::info!(target, playbook = %self.playbook.display(), "Running backup playbook");
        run_process(command, None).await?;

        find_newest_backup(&self.backup_dir, &self.backup_prefix, started)
            .await?
            .ok_or_else(|| {
                BackendError::Protocol(format!(
                    "playbook finished but no {}* file appeared in {}",
                    self.backup_prefix,
                    self.backup_dir.display()
                ))
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DispatcherConfig;
    use std::time::Duration;
    use tempfile::TempDir;

    #[cfg(unix)]
    fn write_script(dir: &Path, name: &str, body: &str) -> PathBuf {
        use std::os::unix::fs::PermissionsExt;
        let path = dir.join(name);
        std::fs::write(&path, format!("#!/bin/sh\n{body}")).unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        path
    }

    #[test]
    fn default_playbook_and_inventory_ship_with_the_crate() {
        let root = Path::new(env!("CARGO_MANIFEST_DIR"));
        let config = AnsibleConfig::default();

        let playbook = std::fs::read_to_string(root.join(&config.playbook)).unwrap();
        assert!(playbook.contains("backup_dir"));
        assert!(playbook.contains("ANSIBLE_NET_PASSWORD"));
        assert!(playbook.contains(&format!("{}{{{{ student_id }}}}", config.backup_prefix)));

        let inventory = std::fs::read_to_string(root.join(&config.inventory)).unwrap();
        for target in DispatcherConfig::default().allowed_targets {
            assert!(
                inventory.lines().any(|line| line.trim() == target),
                "{target} missing from inventory"
            );
        }
    }

    #[test]
    fn args_limit_the_run_to_one_target() {
        let backup = AnsibleBackup::new(&AnsibleConfig::default(), &DeviceConfig::default());
        let args = backup.args("10.0.15.65");
        let limit = args.iter().position(|a| a == "--limit").unwrap();
        assert_eq!(args[limit + 1], "10.0.15.65");
        assert!(args.iter().any(|a| a.starts_with("backup_dir=")));
        assert!(args[0].ends_with("backup_running_config.yml"));
    }

    #[tokio::test]
    async fn newest_matching_backup_is_selected() {
        let tmp = TempDir::new().unwrap();
        let since = SystemTime::now() - Duration::from_secs(60);

        tokio::fs::write(tmp.path().join("show_run_old.txt"), "a")
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_millis(20)).await;
        tokio::fs::write(tmp.path().join("other.txt"), "b")
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_millis(20)).await;
        tokio::fs::write(tmp.path().join("show_run_new.txt"), "c")
            .await
            .unwrap();

        let found = find_newest_backup(tmp.path(), "show_run_", since)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found.file_name().unwrap(), "show_run_new.txt");
    }

    #[tokio::test]
    async fn files_older_than_run_are_ignored() {
        let tmp = TempDir::new().unwrap();
        tokio::fs::write(tmp.path().join("show_run_stale.txt"), "a")
            .await
            .unwrap();
        let since = SystemTime::now() + Duration::from_secs(3600);

        assert!(find_newest_backup(tmp.path(), "show_run_", since)
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn missing_directory_is_io_error() {
        let tmp = TempDir::new().unwrap();
        let result = find_newest_backup(
            &tmp.path().join("nope"),
            "show_run_",
            SystemTime::UNIX_EPOCH,
        )
        .await;
        assert!(matches!(result, Err(BackendError::Io(_))));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn failing_playbook_is_reported() {
        let tmp = TempDir::new().unwrap();
        let config = AnsibleConfig {
            program: "false".into(),
            backup_dir: tmp.path().display().to_string(),
            ..AnsibleConfig::default()
        };
        let backup = AnsibleBackup::new(&config, &DeviceConfig::default());
        assert!(matches!(
            backup.backup_config("10.0.15.65").await,
            Err(BackendError::Process { .. })
        ));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn backup_returns_the_file_the_playbook_wrote() {
        let tmp = TempDir::new().unwrap();
        let backups = tmp.path().join("backups");
        // Honors the same contract as playbooks/backup_running_config.yml.
        let runner = write_script(
            tmp.path(),
            "ansible-playbook",
            r#"[ "$ANSIBLE_NET_PASSWORD" = "cisco" ] || exit 7
for arg in "$@"; do
  case "$arg" in
    backup_dir=*) dir="${arg#backup_dir=}" ;;
  esac
done
printf 'hostname CSR1kv\n' > "$dir/show_run_66070077_CSR1kv.txt"
"#,
        );
        let config = AnsibleConfig {
            program: runner.display().to_string(),
            backup_dir: backups.display().to_string(),
            ..AnsibleConfig::default()
        };
        let device = DeviceConfig {
            username: "admin".into(),
            password: Some("cisco".into()),
        };

        let path = AnsibleBackup::new(&config, &device)
            .backup_config("10.0.15.65")
            .await
            .unwrap();
        assert_eq!(path, backups.join("show_run_66070077_CSR1kv.txt"));
        assert_eq!(
            tokio::fs::read_to_string(&path).await.unwrap(),
            "hostname CSR1kv\n"
        );
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn playbook_that_writes_nothing_is_a_protocol_error() {
        let tmp = TempDir::new().unwrap();
        let runner = write_script(tmp.path(), "ansible-playbook", "exit 0\n");
        let config = AnsibleConfig {
            program: runner.display().to_string(),
            backup_dir: tmp.path().join("backups").display().to_string(),
            ..AnsibleConfig::default()
        };

        assert!(matches!(
            AnsibleBackup::new(&config, &DeviceConfig::default())
                .backup_config("10.0.15.65")
                .await,
            Err(BackendError::Protocol(_))
        ));
    }
}
