//! Property-based tests for envelope encoding/decoding.
//!
//! Verifies that the codec is total over the payload space (any string content,
//! including quotes, escapes and non-ASCII) and that the decoder rejects
//! garbage without panicking.

use chatline_proto::{ClientMessage, Message, ProtocolError, ServerEvent, User};
use proptest::prelude::*;

fn arbitrary_message() -> impl Strategy<Value = Message> {
    (any::<String>(), any::<String>(), any::<String>(), any::<u64>())
        .prop_map(|(id, text, sender, timestamp)| Message { id, text, sender, timestamp })
}

fn arbitrary_user() -> impl Strategy<Value = User> {
    (any::<String>(), any::<String>(), any::<String>())
        .prop_map(|(user_id, username, socket_id)| User { user_id, username, socket_id })
}

fn arbitrary_server_event() -> impl Strategy<Value = ServerEvent> {
    prop_oneof![
        prop::collection::vec(arbitrary_message(), 0..8).prop_map(ServerEvent::History),
        arbitrary_message().prop_map(ServerEvent::NewMessage),
        prop::collection::vec(arbitrary_user(), 0..8).prop_map(ServerEvent::UserList),
        (any::<String>(), any::<bool>()).prop_map(|(user_id, is_typing)| {
            ServerEvent::Typing(chatline_proto::TypingPayload { user_id, is_typing })
        }),
    ]
}

fn arbitrary_client_message() -> impl Strategy<Value = ClientMessage> {
    prop_oneof![
        (any::<String>(), any::<String>()).prop_map(|(u, n)| ClientMessage::join(u, n)),
        any::<String>().prop_map(ClientMessage::ping),
        (any::<String>(), any::<bool>()).prop_map(|(u, t)| ClientMessage::typing(u, t)),
        (any::<String>(), any::<String>(), any::<String>())
            .prop_map(|(t, s, u)| ClientMessage::send(t, s, u)),
    ]
}

proptest! {
    #[test]
    fn server_events_survive_the_wire(event in arbitrary_server_event()) {
        let encoded = event.encode().unwrap();
        let decoded = ServerEvent::decode(&encoded).unwrap();
        prop_assert_eq!(decoded, event);
    }

    #[test]
    fn client_messages_survive_the_wire(message in arbitrary_client_message()) {
        let encoded = message.encode().unwrap();
        let decoded = ClientMessage::decode(&encoded).unwrap();
        prop_assert_eq!(decoded, message);
    }

    #[test]
    fn decoder_never_panics(text in any::<String>()) {
        let _ = ServerEvent::decode(&text);
        let _ = ClientMessage::decode(&text);
    }

    #[test]
    fn unknown_event_names_are_reported(name in "[a-z]{1,8}:[a-z]{1,8}") {
        let known = ["message:get", "message:new", "user:list", "user:typing"];
        prop_assume!(!known.contains(&name.as_str()));

        let text = format!(r#"{{"event":"{name}","data":null}}"#);
        prop_assert_eq!(ServerEvent::decode(&text), Err(ProtocolError::UnknownEvent(name)));
    }
}
