#![no_main]

use ceremony_codec::{decode_flip, decode_flip_hex, rlp};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    // Raw bytes and their text form must never panic the decoder.
    let _ = decode_flip(data);
    if let Ok(text) = std::str::from_utf8(data) {
        let _ = decode_flip_hex(text);
    }

    // Only canonical encodings are accepted, so anything that decodes
    // re-encodes to the exact input.
    if let Ok(item) = rlp::decode(data) {
        assert_eq!(rlp::encode(&item), data);
    }

    // A decoded flip survives its own hex form.
    if let Ok(flip) = decode_flip(data) {
        let again = decode_flip_hex(&flip.to_hex()).expect("re-encoded flip must decode");
        assert_eq!(again.pics, flip.pics);
    }
});
