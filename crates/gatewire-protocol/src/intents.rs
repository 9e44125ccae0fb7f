//! Gateway intents
//!
//! Bit flags declaring which event categories a session subscribes to.
//! Sent in the Identify payload; the server only dispatches events from
//! subscribed categories.

use bitflags::bitflags;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

bitflags! {
    /// Event categories a session subscribes to
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct Intents: u32 {
        /// Guild create/update/delete
        const GUILDS = 1 << 0;
        /// Member add/update/remove
        const GUILD_MEMBERS = 1 << 1;
        /// Message create/update/delete
        const GUILD_MESSAGES = 1 << 2;
        /// Reaction add/remove
        const GUILD_MESSAGE_REACTIONS = 1 << 3;
        /// Typing start
        const GUILD_MESSAGE_TYPING = 1 << 4;
        /// Presence updates
        const GUILD_PRESENCES = 1 << 5;
        /// Direct messages
        const DIRECT_MESSAGES = 1 << 6;
    }
}

impl Intents {
    /// Every category that does not require privileged access
    #[must_use]
    pub fn unprivileged() -> Self {
        Self::all() - Self::GUILD_PRESENCES - Self::GUILD_MEMBERS
    }
}

impl Default for Intents {
    fn default() -> Self {
        Self::unprivileged()
    }
}

impl Serialize for Intents {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u32(self.bits())
    }
}

impl<'de> Deserialize<'de> for Intents {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let bits = u32::deserialize(deserializer)?;
        // Unknown bits are preserved rather than rejected
        Ok(Self::from_bits_retain(bits))
    }
}
