//! Fuzz address parsing. Parsing must never panic.

#![no_main]

use graph_client::HostAddr;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(input) = std::str::from_utf8(data) else {
        return;
    };
    if let Ok(addr) = input.parse::<HostAddr>() {
        assert!(!addr.host().is_empty());
        let _ = addr.to_string();
    }
});
