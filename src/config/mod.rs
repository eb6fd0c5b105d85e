pub mod schema;

#[allow(unused_imports)]
pub use schema::{
    expand_path, AnsibleConfig, Config, DeviceConfig, DispatcherConfig, InterfaceConfig,
    NetconfConfig, RestconfConfig, SshConfig, WebexConfig,
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reexported_config_default_is_constructible() {
        let config = Config::default();

        assert!(!config.dispatcher.address_prefix.is_empty());
        assert!(!config.dispatcher.allowed_targets.is_empty());
        assert!(config.dispatcher.backend_timeout_secs > 0);
    }
}
