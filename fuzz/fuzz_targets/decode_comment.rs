#![no_main]

use issuefold_core::event::codec::{decode_comment, encode_comment};
use issuefold_core::metadata;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(body) = std::str::from_utf8(data) else {
        return;
    };

    if let Ok(Some(event)) = decode_comment(body) {
        let encoded = encode_comment(&event).expect("decoded events re-encode");
        let again = decode_comment(&encoded)
            .expect("encoded events decode")
            .expect("encoded body carries a marker");
        assert_eq!(again, event);
    }

    // Metadata helpers must not panic on arbitrary bodies.
    let _ = metadata::extract(body);
    let _ = metadata::strip(body);
});
