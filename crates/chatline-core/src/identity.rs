//! Client identity.
//!
//! The client identifier is generated once from 128 bits of environment
//! randomness and never changes afterwards, not even across a last-resort
//! session restart. The username starts empty and is set when the user joins.

use uuid::Builder;

use crate::{env::Environment, error::SessionError};

/// Stable identity of this client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientIdentity {
    user_id: String,
    username: String,
}

impl ClientIdentity {
    /// Generate a fresh identity with an empty username.
    ///
    /// The identifier is a version-4 UUID built from [`Environment::random_u128`],
    /// so simulation runs with the same seed produce the same identifier.
    pub fn generate<E: Environment>(env: &E) -> Self {
        let bytes = env.random_u128().to_be_bytes();
        let user_id = Builder::from_random_bytes(bytes).into_uuid().to_string();
        Self { user_id, username: String::new() }
    }

    /// Identity with a caller-chosen identifier.
    pub fn with_user_id(user_id: impl Into<String>) -> Self {
        Self { user_id: user_id.into(), username: String::new() }
    }

    /// Stable client identifier.
    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    /// Display name. `None` until the user has joined.
    pub fn username(&self) -> Option<&str> {
        if self.username.is_empty() { None } else { Some(&self.username) }
    }

    /// Set the display name.
    ///
    /// The name is trimmed first.
    ///
    /// # Errors
    ///
    /// - `SessionError::Validation` if the trimmed name is empty; the current
    ///   name is left untouched.
    pub fn set_username(&mut self, name: &str) -> Result<(), SessionError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(SessionError::Validation("username is empty"));
        }

        name.clone_into(&mut self.username);
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::time::Instant;

    use super::*;

    #[derive(Clone)]
    struct FixedEnv(u8);

    impl Environment for FixedEnv {
        type Instant = Instant;

        fn now(&self) -> Instant {
            Instant::now()
        }

        fn random_bytes(&self, buffer: &mut [u8]) {
            buffer.fill(self.0);
        }
    }

    #[test]
    fn generated_id_is_a_v4_uuid() {
        let identity = ClientIdentity::generate(&FixedEnv(0xab));
        let id = uuid::Uuid::parse_str(identity.user_id()).unwrap();

        assert_eq!(id.get_version_num(), 4);
        assert_eq!(identity.user_id().len(), 36);
    }

    #[test]
    fn generation_is_deterministic_for_equal_entropy() {
        let a = ClientIdentity::generate(&FixedEnv(7));
        let b = ClientIdentity::generate(&FixedEnv(7));
        let c = ClientIdentity::generate(&FixedEnv(8));

        assert_eq!(a.user_id(), b.user_id());
        assert_ne!(a.user_id(), c.user_id());
    }

    #[test]
    fn username_is_trimmed() {
        let mut identity = ClientIdentity::with_user_id("u-1");
        assert_eq!(identity.username(), None);

        identity.set_username("  ada  ").unwrap();
        assert_eq!(identity.username(), Some("ada"));
    }

    #[test]
    fn blank_username_is_rejected_without_change() {
        let mut identity = ClientIdentity::with_user_id("u-1");
        identity.set_username("ada").unwrap();

        let result = identity.set_username("   ");
        assert!(matches!(result, Err(SessionError::Validation(_))));
        assert_eq!(identity.username(), Some("ada"));
        assert_eq!(identity.user_id(), "u-1");
    }
}
