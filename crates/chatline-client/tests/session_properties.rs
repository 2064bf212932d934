//! Property-based tests for what a session puts on the wire while its
//! connection churns.
//!
//! - Typing signals strictly alternate across every transport the session
//!   used, whatever the drops, reconnects and injected emit failures.

use std::time::Duration;

use chatline_client::{Environment, Session, SessionAction, SessionConfig};
use chatline_core::{ClientIdentity, DEFAULT_TYPING_DEBOUNCE};
use chatline_harness::{SimEnv, SimTransport};
use chatline_proto::{ClientMessage, names};
use proptest::prelude::*;

const TICK: Duration = Duration::from_millis(100);

#[derive(Debug, Clone)]
enum Step {
    Keystroke,
    Idle(u64),
    Send,
    Drop,
    Open { fail_after: Option<usize> },
}

fn step() -> impl Strategy<Value = Step> {
    prop_oneof![
        4 => Just(Step::Keystroke),
        3 => (100u64..4000).prop_map(Step::Idle),
        1 => Just(Step::Send),
        1 => Just(Step::Drop),
        2 => proptest::option::of(0usize..3).prop_map(|fail_after| Step::Open { fail_after }),
    ]
}

fn latest_connect(actions: &[SessionAction]) -> Option<u64> {
    actions.iter().rev().find_map(|action| match action {
        SessionAction::Connect { attempt } => Some(*attempt),
        _ => None,
    })
}

fn typing_flags(transports: &[SimTransport]) -> Vec<bool> {
    transports
        .iter()
        .flat_map(|transport| transport.sent_named(names::USER_TYPING))
        .filter_map(|message| match message {
            ClientMessage::Typing(payload) => Some(payload.is_typing),
            _ => None,
        })
        .collect()
}

proptest! {
    #[test]
    fn typing_alternates_across_reconnects(steps in prop::collection::vec(step(), 0..120)) {
        let env = SimEnv::with_seed(21);
        let mut session: Session<SimTransport, SimEnv> = Session::with_identity(
            env.clone(),
            SessionConfig::default(),
            ClientIdentity::with_user_id("u-1"),
        );
        prop_assert!(session.set_username("ada", env.now()).is_ok());
        let mut pending = latest_connect(&session.start(env.now()));
        let mut transports: Vec<SimTransport> = Vec::new();

        for step in steps {
            let actions = match step {
                Step::Keystroke => session.input_changed("typing".to_string(), env.now()),
                Step::Idle(ms) => {
                    let until = env.now() + Duration::from_millis(ms);
                    let mut actions = Vec::new();
                    while env.now() < until {
                        env.advance(TICK);
                        actions.extend(session.tick(env.now()));
                    }
                    actions
                },
                Step::Send => session.send_message("hello", env.now()).unwrap_or_default(),
                Step::Drop => {
                    if let Some(transport) = transports.last() {
                        transport.drop_connection();
                    }
                    session.transport_closed("dropped", env.now())
                },
                Step::Open { fail_after } => {
                    let Some(attempt) = pending.take() else { continue };
                    let transport = SimTransport::connected();
                    if let Some(ok) = fail_after {
                        transport.fail_after(ok);
                    }
                    transports.push(transport.clone());
                    session.transport_opened(attempt, transport, env.now())
                },
            };
            if let Some(attempt) = latest_connect(&actions) {
                pending = Some(attempt);
            }
        }

        env.advance(DEFAULT_TYPING_DEBOUNCE);
        session.tick(env.now());

        for (index, is_typing) in typing_flags(&transports).into_iter().enumerate() {
            prop_assert_eq!(is_typing, index % 2 == 0, "signal {} out of turn", index);
        }
    }
}
