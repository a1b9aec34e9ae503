// Per-view session identity.
//
// Generated once when a game view is opened and kept for as long as that view
// lives. The server keys connections by it, so a reconnect from the same view
// is recognised as the same participant rather than a second one.

use std::fmt;

use rand::distributions::Alphanumeric;
use rand::Rng;

const SESSION_ID_LEN: usize = 20;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SessionIdentity(String);

impl SessionIdentity {
    pub fn generate() -> Self {
        let id: String = rand::thread_rng()
            .sample_iter(&Alphanumeric)
            .take(SESSION_ID_LEN)
            .map(char::from)
            .collect();
        SessionIdentity(id)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
