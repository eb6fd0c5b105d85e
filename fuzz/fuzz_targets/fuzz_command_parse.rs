#![no_main]

use libfuzzer_sys::fuzz_target;
use netopsbot::command::{
    BackendKind, CommandParser, DefaultCommandParser, ParsedCommand, TargetAllowList,
};

fuzz_target!(|data: &[u8]| {
    let Ok(text) = std::str::from_utf8(data) else {
        return;
    };
    let parser = DefaultCommandParser::new(
        "/66070077",
        TargetAllowList::new(["10.0.15.61", "10.0.15.62", "10.0.15.63"]),
    );

    for selected in [None, Some(BackendKind::Restconf), Some(BackendKind::Netconf)] {
        let first = parser.parse(text, selected);
        // Same input, same answer.
        assert_eq!(first, parser.parse(text, selected));

        if text.split_whitespace().next() != Some("/66070077") {
            assert!(first.is_unaddressed());
        }
        if let ParsedCommand::DeviceCommand { target, .. } = &first {
            assert!(parser.targets().contains(target));
        }
    }
});
