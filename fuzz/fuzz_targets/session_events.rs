//! Fuzz target for the client session state machine
//!
//! Drives a session through arbitrary interleavings of user input, server
//! pushes, transport outcomes and clock movement.
//!
//! # Invariants
//!
//! - The session never panics
//! - Nothing but heartbeats precedes the join on a transport without
//!   injected failures
//! - At most one transport is live at a time
//! - The message view never exceeds its cap
//! - Typing signals alternate across every transport, starting with a start
//! - Queued messages are never lost: every accepted send is either on some
//!   transport or still queued

#![no_main]

use std::time::Duration;

use arbitrary::Arbitrary;
use chatline_client::{Environment, Session, SessionAction, SessionConfig, SessionEvent};
use chatline_harness::{SimEnv, SimTransport};
use chatline_proto::{ClientMessage, Message, ServerEvent, TypingPayload, names};
use libfuzzer_sys::fuzz_target;

#[derive(Debug, Clone, Arbitrary)]
struct Scenario {
    seed: u64,
    steps: Vec<Step>,
}

#[derive(Debug, Clone, Arbitrary)]
enum Step {
    Advance { millis: u16 },
    OpenPending { fail_after: Option<u8> },
    OpenStale { attempt: u8 },
    FailPending,
    DropConnection,
    SetUsername { name: String },
    Type { text: String },
    Send { text: String },
    Push { id: u8, typing: bool },
    Follow(bool),
}

fuzz_target!(|scenario: Scenario| {
    let env = SimEnv::with_seed(scenario.seed);
    let config = SessionConfig::default();
    let cap = config.message_cap;
    let mut session: Session<SimTransport, SimEnv> = Session::new(env.clone(), config);

    let mut pending = connects(&session.start(env.now()));
    let mut transports: Vec<SimTransport> = Vec::new();
    let mut reliable: Vec<SimTransport> = Vec::new();
    let mut accepted_sends = 0usize;

    for step in scenario.steps.into_iter().take(256) {
        let actions = match step {
            Step::Advance { millis } => {
                env.advance(Duration::from_millis(u64::from(millis)));
                session.tick(env.now())
            },
            Step::OpenPending { fail_after } => {
                let Some(attempt) = pending.take() else { continue };
                let transport = SimTransport::connected();
                match fail_after {
                    Some(ok) => transport.fail_after(usize::from(ok)),
                    None => reliable.push(transport.clone()),
                }
                transports.push(transport.clone());
                session.transport_opened(attempt, transport, env.now())
            },
            Step::OpenStale { attempt } => {
                let transport = SimTransport::connected();
                transports.push(transport.clone());
                session.transport_opened(u64::from(attempt), transport, env.now())
            },
            Step::FailPending => {
                let Some(attempt) = pending.take() else { continue };
                session.transport_failed(attempt, "refused", env.now())
            },
            Step::DropConnection => {
                if let Some(transport) = transports.last() {
                    transport.drop_connection();
                }
                session.transport_closed("dropped", env.now())
            },
            Step::SetUsername { name } => {
                session.set_username(&name, env.now()).unwrap_or_default()
            },
            Step::Type { text } => session.input_changed(text, env.now()),
            Step::Send { text } => match session.send_message(&text, env.now()) {
                Ok(actions) => {
                    accepted_sends += 1;
                    actions
                },
                Err(_) => Vec::new(),
            },
            Step::Push { id, typing } => {
                session.receive(ServerEvent::NewMessage(Message {
                    id: id.to_string(),
                    text: "x".to_string(),
                    sender: "bob".to_string(),
                    timestamp: u64::from(id),
                }));
                session.receive(ServerEvent::Typing(TypingPayload {
                    user_id: "u-bob".to_string(),
                    is_typing: typing,
                }))
            },
            Step::Follow(following) => {
                session.handle(SessionEvent::SetFollowing(following))
            },
        };

        if let Some(attempt) = connects(&actions) {
            pending = Some(attempt);
        }

        assert!(session.messages().len() <= cap);

        let live = transports.iter().filter(|t| !t.is_closed()).count();
        assert!(live <= 1, "{live} live transports");

        for transport in &reliable {
            let first = transport.sent().into_iter().find(|m| m.name() != names::USER_PING);
            if let Some(first) = first {
                assert_eq!(first.name(), names::USER_JOIN);
            }
        }

        let typing = transports.iter().flat_map(|t| t.sent_named(names::USER_TYPING));
        for (index, message) in typing.enumerate() {
            if let ClientMessage::Typing(payload) = message {
                assert_eq!(payload.is_typing, index % 2 == 0, "typing signal {index} out of turn");
            }
        }

        let delivered: usize = transports
            .iter()
            .map(|t| {
                t.sent()
                    .iter()
                    .filter(|m| matches!(m, ClientMessage::Send(_)))
                    .count()
            })
            .sum();
        assert!(delivered + session.queued_count() >= accepted_sends);
    }
});

fn connects(actions: &[SessionAction]) -> Option<u64> {
    actions.iter().rev().find_map(|action| match action {
        SessionAction::Connect { attempt } => Some(*attempt),
        _ => None,
    })
}
