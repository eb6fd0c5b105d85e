#![no_main]

use libfuzzer_sys::fuzz_target;
use netopsbot::Config;

fuzz_target!(|data: &[u8]| {
    if let Ok(s) = std::str::from_utf8(data) {
        if let Ok(config) = toml::from_str::<Config>(s) {
            // Validation may reject, but must never panic.
            let _ = config.validate();
            let _ = config.dispatcher.poll_interval();
            let _ = config.ansible.backup_dir_path();
        }
    }
});
