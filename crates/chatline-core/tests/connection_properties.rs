//! Property-based tests for the connection state machine.
//!
//! Drives the machine with arbitrary handshake outcomes, disconnects and
//! clock advances on a seeded simulation environment, and checks the
//! lifecycle invariants after every step.

use std::time::Duration;

use chatline_core::{
    Backoff, Connection, ConnectionAction, ConnectionState, Environment, ReconnectPolicy,
};
use chatline_harness::SimEnv;
use proptest::prelude::*;

#[derive(Debug, Clone)]
enum Step {
    Succeed,
    Fail,
    Drop,
    Advance(u64),
}

fn step_strategy() -> impl Strategy<Value = Step> {
    prop_oneof![
        2 => Just(Step::Succeed),
        3 => Just(Step::Fail),
        2 => Just(Step::Drop),
        4 => (1u64..25_000).prop_map(Step::Advance),
    ]
}

fn policy_strategy() -> impl Strategy<Value = ReconnectPolicy> {
    (0u32..6, 0u32..6).prop_map(|(attempts, threshold)| ReconnectPolicy {
        reconnection_attempts: attempts,
        restart_threshold: threshold,
        ..ReconnectPolicy::default()
    })
}

proptest! {
    #[test]
    fn lifecycle_invariants_hold(
        seed in any::<u64>(),
        policy in policy_strategy(),
        steps in prop::collection::vec(step_strategy(), 1..120),
    ) {
        let env = SimEnv::with_seed(seed);
        let mut conn = Connection::new(policy.clone());
        let mut last_attempt = 0;
        let mut restart_times: Vec<Duration> = Vec::new();

        let mut actions = conn.start(env.now()).unwrap();

        for step in steps {
            for action in &actions {
                match action {
                    ConnectionAction::OpenTransport { attempt } => {
                        // Attempt IDs are fresh and increasing
                        prop_assert!(*attempt > last_attempt);
                        last_attempt = *attempt;
                    },
                    ConnectionAction::Restart => restart_times.push(env.now()),
                    _ => {},
                }
            }

            let now = env.now();
            actions = match step {
                Step::Succeed => match conn.handle_connected(conn.attempt(), now) {
                    Ok(actions) => {
                        // Every entry into Connected yields exactly one Rejoin
                        prop_assert_eq!(&actions, &vec![ConnectionAction::Rejoin]);
                        prop_assert_eq!(conn.error_count(), 0);
                        actions
                    },
                    Err(_) => {
                        prop_assert_ne!(conn.state(), ConnectionState::Connecting);
                        vec![]
                    },
                },
                Step::Fail => conn
                    .handle_connect_error(conn.attempt(), "refused", &env, now)
                    .unwrap_or_default(),
                Step::Drop => conn.handle_disconnected("reset", &env, now),
                Step::Advance(ms) => {
                    env.advance(Duration::from_millis(ms));
                    conn.tick(&env, env.now())
                },
            };

            prop_assert_eq!(conn.is_connected(), conn.state() == ConnectionState::Connected);
            prop_assert!(conn.retries() <= policy.reconnection_attempts);

            let exhausted = actions
                .iter()
                .filter(|a| matches!(a, ConnectionAction::Exhausted { .. }))
                .count();
            prop_assert!(exhausted <= 1);
        }

        // Restarts never closer than the cooldown
        for pair in restart_times.windows(2) {
            prop_assert!(pair[1] - pair[0] >= policy.restart_cooldown);
        }
    }

    #[test]
    fn backoff_stays_in_bounds(seed in any::<u64>(), draws in 1usize..40) {
        let env = SimEnv::with_seed(seed);
        let policy = ReconnectPolicy::default();
        let mut backoff: Backoff = policy.backoff();

        let floor = policy.delay_min.mul_f64(1.0 - policy.randomization);
        for _ in 0..draws {
            let delay = backoff.next_delay(env.random_unit());
            prop_assert!(delay >= floor, "{delay:?} below {floor:?}");
            prop_assert!(delay <= policy.delay_max, "{delay:?} above max");
        }
    }
}

#[test]
fn stale_attempt_result_is_ignored_after_retry() {
    let env = SimEnv::with_seed(7);
    let mut conn = Connection::new(ReconnectPolicy::default().deterministic());
    conn.start(env.now()).unwrap();

    conn.handle_connect_error(1, "refused", &env, env.now()).unwrap();
    env.advance(Duration::from_secs(1));
    let actions = conn.tick(&env, env.now());
    assert_eq!(actions, vec![ConnectionAction::OpenTransport { attempt: 2 }]);

    // The first attempt's transport finally comes up: too late
    assert!(conn.handle_connected(1, env.now()).is_err());
    assert_eq!(conn.state(), ConnectionState::Connecting);

    assert_eq!(conn.handle_connected(2, env.now()).unwrap(), vec![ConnectionAction::Rejoin]);
}

#[test]
fn ten_failures_then_exhaustion_and_restart() {
    let env = SimEnv::with_seed(11);
    let mut conn = Connection::new(ReconnectPolicy::default());
    conn.start(env.now()).unwrap();

    let mut exhausted = None;
    let mut restart_after = None;
    for _ in 0..100 {
        let actions = conn.handle_connect_error(conn.attempt(), "refused", &env, env.now());
        for action in actions.unwrap_or_default() {
            match action {
                ConnectionAction::Exhausted { attempts, errors } => {
                    exhausted = Some((attempts, errors));
                },
                ConnectionAction::RestartScheduled { after } => restart_after = Some(after),
                _ => {},
            }
        }
        if exhausted.is_some() {
            break;
        }
        env.advance(Duration::from_secs(10));
        conn.tick(&env, env.now());
    }

    assert_eq!(exhausted, Some((10, 11)));
    assert_eq!(restart_after, Some(Duration::from_secs(5)));

    env.advance(Duration::from_secs(5));
    let actions = conn.tick(&env, env.now());
    assert_eq!(actions[0], ConnectionAction::Restart);
    assert_eq!(conn.state(), ConnectionState::Connecting);
    assert_eq!(conn.restarts(), 1);
}
