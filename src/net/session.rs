use rand::distributions::Alphanumeric;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::game::constants::bot::{SESSION_PREFIX, SESSION_SUFFIX_LEN};

/// Longest session id the engine will act on
pub const MAX_SESSION_ID_LEN: usize = 128;

/// Opaque, client-chosen identifier of a player.
///
/// Nothing proves that a caller owns the id it presents: holding the string is
/// the whole credential. Any caller may act for any session it can name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(String);

impl SessionId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Issue a fresh id for a client that has none
    pub fn generate() -> Self {
        Self(Uuid::new_v4().simple().to_string())
    }

    /// Synthetic id for a bot: `bot-` plus six lowercase base-36 chars
    pub fn generate_bot<R: Rng + ?Sized>(rng: &mut R) -> Self {
        let suffix: String = rng
            .sample_iter(&Alphanumeric)
            .take(SESSION_SUFFIX_LEN)
            .map(|b| (b as char).to_ascii_lowercase())
            .collect();
        Self(format!("{}{}", SESSION_PREFIX, suffix))
    }

    /// Empty or oversized ids are treated as absent sessions
    pub fn is_valid(&self) -> bool {
        !self.0.trim().is_empty() && self.0.len() <= MAX_SESSION_ID_LEN
    }

    /// Display name derived from a bot id: `Bot` plus its last three chars
    pub fn bot_display_name(&self) -> String {
        let chars: Vec<char> = self.0.chars().collect();
        let tail: String = chars[chars.len().saturating_sub(3)..].iter().collect();
        format!("Bot {}", tail.to_uppercase())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for SessionId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}
