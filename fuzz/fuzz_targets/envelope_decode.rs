//! Fuzz target for envelope decoding
//!
//! Feeds arbitrary text to both decoders:
//! - Malformed JSON
//! - Unknown event names
//! - Payloads of the wrong shape for their event
//!
//! Decoding should NEVER panic. Anything that decodes must survive an
//! encode/decode cycle unchanged.

#![no_main]

use chatline_proto::{ClientMessage, ServerEvent};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(text) = std::str::from_utf8(data) else {
        return;
    };

    if let Ok(event) = ServerEvent::decode(text) {
        let encoded = event.encode().expect("decoded event must encode");
        let again = ServerEvent::decode(&encoded).expect("encoded event must decode");
        assert_eq!(event, again);
    }

    if let Ok(message) = ClientMessage::decode(text) {
        let encoded = message.encode().expect("decoded message must encode");
        let again = ClientMessage::decode(&encoded).expect("encoded message must decode");
        assert_eq!(message, again);
    }
});
