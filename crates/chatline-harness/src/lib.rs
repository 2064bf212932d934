//! Deterministic simulation harness for Chatline.
//!
//! Implementations of [`chatline_core::Environment`] and
//! [`chatline_core::Transport`] for reproducible tests: a virtual clock that
//! only moves when told to, a seeded RNG, and a transport whose failures are
//! scripted.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod sim_env;
pub mod sim_transport;

pub use sim_env::SimEnv;
pub use sim_transport::SimTransport;
